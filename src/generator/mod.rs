//! Turns a subject into validated quiz content using a generative model.

pub mod client;
pub mod schema;

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use thiserror::Error;

pub use client::{GeminiClient, GenerativeModel, ModelError};
pub use schema::{
    ExpectedShape, GeneratedChoice, GeneratedQuestion, GeneratedQuestionDocument, SchemaViolation,
};

const SAMPLE_OUTPUT: &str = include_str!("../../assets/sample_output.json");

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("invalid generation request: {0}")]
    InvalidRequest(&'static str),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("generative service did not answer within {0:?}")]
    Timeout(Duration),

    #[error("generated content is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("generated content does not match the quiz schema: {0}")]
    Schema(#[from] SchemaViolation),
}

#[derive(Debug, Clone)]
pub struct GenerationParams {
    pub subject: String,
    pub question_count: u32,
    pub choice_count: u32,
}

impl GenerationParams {
    fn check(&self) -> Result<(), GenerationError> {
        if self.subject.trim().is_empty() {
            return Err(GenerationError::InvalidRequest("subject must not be empty"));
        }
        if self.question_count < 1 {
            return Err(GenerationError::InvalidRequest(
                "question count must be at least 1",
            ));
        }
        if self.choice_count < 2 {
            return Err(GenerationError::InvalidRequest(
                "choice count must be at least 2",
            ));
        }
        Ok(())
    }

    fn expected_shape(&self) -> ExpectedShape {
        ExpectedShape {
            question_count: self.question_count as usize,
            choice_count: self.choice_count as usize,
        }
    }
}

pub struct ContentGenerator {
    model: Arc<dyn GenerativeModel>,
    sample: String,
}

impl ContentGenerator {
    pub fn new(model: Arc<dyn GenerativeModel>) -> Self {
        // Re-serialize so the example costs as few prompt tokens as possible.
        let sample = serde_json::from_str::<Value>(SAMPLE_OUTPUT)
            .map(|v| v.to_string())
            .unwrap_or_else(|_| SAMPLE_OUTPUT.to_owned());
        Self { model, sample }
    }

    /// Asks the model for `params.question_count` questions and validates the reply.
    ///
    /// The model call is dropped once `timeout` elapses. Nothing is retried and
    /// nothing is repaired: a reply that fails to parse or validate fails the call.
    pub async fn generate(
        &self,
        params: &GenerationParams,
        timeout: Duration,
    ) -> Result<GeneratedQuestionDocument, GenerationError> {
        params.check()?;

        let prompt = self.build_prompt(params);
        log::debug!(
            "Requesting {} questions x {} choices ({} byte prompt)",
            params.question_count,
            params.choice_count,
            prompt.len()
        );

        let reply = tokio::time::timeout(timeout, self.model.generate_content(&prompt))
            .await
            .map_err(|_| GenerationError::Timeout(timeout))??;
        log::debug!("Received {} byte reply from generative service", reply.len());

        let document: Value = serde_json::from_str(strip_code_fence(&reply))?;
        let validated = schema::validate(&document, params.expected_shape())?;
        Ok(validated)
    }

    pub fn build_prompt(&self, params: &GenerationParams) -> String {
        format!(
            "Given the subject below, generate a series of exactly {q} quiz questions on the subject. \
             Each question must have exactly {c} choices, of which exactly 1 choice is correct and the rest are incorrect. \
             Format your response as a JSON list as per the following example, with no other text:\n\
             {sample}\n\
             The subject is as follows: {subject}",
            q = params.question_count,
            c = params.choice_count,
            sample = self.sample,
            subject = params.subject.trim(),
        )
    }
}

/// Removes one surrounding Markdown code fence, if the model added one.
fn strip_code_fence(reply: &str) -> &str {
    let trimmed = reply.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let Some(body) = rest.strip_suffix("```") else {
        return trimmed;
    };
    // Drop the info string (```json) on the opening line.
    match body.split_once('\n') {
        Some((info, content)) if !info.trim_start().starts_with(['[', '{']) => content.trim(),
        _ => body.trim(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct Canned {
        reply: Result<String, String>,
        prompts: Mutex<Vec<String>>,
    }

    impl Canned {
        fn ok(text: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Ok(text.to_owned()),
                prompts: Mutex::new(Vec::new()),
            })
        }

        fn failing(message: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Err(message.to_owned()),
                prompts: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl GenerativeModel for Canned {
        async fn generate_content(&self, prompt: &str) -> Result<String, ModelError> {
            self.prompts.lock().unwrap().push(prompt.to_owned());
            self.reply.clone().map_err(|body| ModelError::Status {
                status: reqwest::StatusCode::TOO_MANY_REQUESTS,
                body,
            })
        }
    }

    struct Stalled;

    #[async_trait]
    impl GenerativeModel for Stalled {
        async fn generate_content(&self, _prompt: &str) -> Result<String, ModelError> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(String::new())
        }
    }

    fn params(q: u32, c: u32) -> GenerationParams {
        GenerationParams {
            subject: "computer networking".into(),
            question_count: q,
            choice_count: c,
        }
    }

    fn reply(q: usize, c: usize) -> String {
        let questions: Vec<Value> = (0..q)
            .map(|i| {
                let choices: Vec<Value> = (0..c)
                    .map(|j| serde_json::json!({ "text": format!("Choice {j}"), "correct": j == i % c }))
                    .collect();
                serde_json::json!({ "question": format!("Question {i}?"), "choices": choices })
            })
            .collect();
        Value::Array(questions).to_string()
    }

    const TIMEOUT: Duration = Duration::from_secs(5);

    #[test]
    fn prompt_states_counts_constraint_example_and_subject() {
        let generator = ContentGenerator::new(Canned::ok(""));
        let prompt = generator.build_prompt(&params(7, 3));

        assert!(prompt.contains("exactly 7 quiz questions"));
        assert!(prompt.contains("exactly 3 choices"));
        assert!(prompt.contains("exactly 1 choice is correct"));
        assert!(prompt.contains(r#""correct":true"#));
        assert!(prompt.ends_with("The subject is as follows: computer networking"));
    }

    #[tokio::test]
    async fn returns_validated_document() {
        let model = Canned::ok(&reply(5, 4));
        let generator = ContentGenerator::new(model.clone());

        let doc = generator.generate(&params(5, 4), TIMEOUT).await.unwrap();
        assert_eq!(doc.questions.len(), 5);
        assert!(doc.questions.iter().all(|q| q.choices.len() == 4));
        assert_eq!(model.prompts.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn accepts_fenced_reply() {
        let fenced = format!("```json\n{}\n```", reply(5, 2));
        let generator = ContentGenerator::new(Canned::ok(&fenced));
        assert!(generator.generate(&params(5, 2), TIMEOUT).await.is_ok());
    }

    #[tokio::test]
    async fn malformed_text_is_parse_error() {
        let generator = ContentGenerator::new(Canned::ok("Sure! Here are your questions:"));
        let err = generator.generate(&params(5, 4), TIMEOUT).await.unwrap_err();
        assert!(matches!(err, GenerationError::Parse(_)));
    }

    #[tokio::test]
    async fn schema_violation_is_reported() {
        let generator = ContentGenerator::new(Canned::ok(&reply(4, 4)));
        let err = generator.generate(&params(5, 4), TIMEOUT).await.unwrap_err();
        assert!(matches!(
            err,
            GenerationError::Schema(SchemaViolation::QuestionCount { expected: 5, actual: 4 })
        ));
    }

    #[tokio::test]
    async fn model_failure_is_not_retried() {
        let model = Canned::failing("quota exceeded");
        let generator = ContentGenerator::new(model.clone());
        let err = generator.generate(&params(5, 4), TIMEOUT).await.unwrap_err();

        assert!(matches!(err, GenerationError::Model(ModelError::Status { .. })));
        assert_eq!(model.prompts.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn stalled_model_times_out() {
        let generator = ContentGenerator::new(Arc::new(Stalled));
        let err = generator
            .generate(&params(5, 4), Duration::from_millis(20))
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::Timeout(_)));
    }

    #[tokio::test]
    async fn rejects_bad_params_without_calling_model() {
        let model = Canned::ok(&reply(5, 4));
        let generator = ContentGenerator::new(model.clone());

        let mut blank = params(5, 4);
        blank.subject = "  ".into();
        assert!(matches!(
            generator.generate(&blank, TIMEOUT).await,
            Err(GenerationError::InvalidRequest(_))
        ));
        assert!(matches!(
            generator.generate(&params(5, 1), TIMEOUT).await,
            Err(GenerationError::InvalidRequest(_))
        ));
        assert!(model.prompts.lock().unwrap().is_empty());
    }

    #[test]
    fn strip_code_fence_variants() {
        assert_eq!(strip_code_fence("  [1]  "), "[1]");
        assert_eq!(strip_code_fence("```json\n[1]\n```"), "[1]");
        assert_eq!(strip_code_fence("```\n[1]\n```"), "[1]");
        assert_eq!(strip_code_fence("```[1]```"), "[1]");
        assert_eq!(strip_code_fence("```json [1]"), "```json [1]");
    }
}
