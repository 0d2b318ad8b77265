//! Structural contract for quiz content returned by the model.
//!
//! The model is asked for a JSON array shaped like `assets/sample_output.json`.
//! [`validate`] checks a parsed [`serde_json::Value`] against
//! `assets/output_schema.json`, the same document served at `/generator/schema`,
//! with the requested counts pinned through `minItems`/`maxItems`. Only a
//! document that passes is deserialized into [`GeneratedQuestionDocument`].
//! Values are never coerced: the string `"true"` is not a boolean.

use std::sync::LazyLock;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

/// JSON Schema describing the accepted document, served at `/generator/schema`.
pub const OUTPUT_SCHEMA: &str = include_str!("../../assets/output_schema.json");

static BASE_SCHEMA: LazyLock<Result<Value, String>> =
    LazyLock::new(|| serde_json::from_str(OUTPUT_SCHEMA).map_err(|e| e.to_string()));

const QUESTION_FIELD: &str = "question";
const CHOICES_FIELD: &str = "choices";
const TEXT_FIELD: &str = "text";
const CORRECT_FIELD: &str = "correct";

/// Counts the document must match exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpectedShape {
    pub question_count: usize,
    pub choice_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GeneratedQuestionDocument {
    pub questions: Vec<GeneratedQuestion>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedQuestion {
    #[serde(rename = "question")]
    pub text: String,
    pub choices: Vec<GeneratedChoice>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedChoice {
    pub text: String,
    pub correct: bool,
}

/// Question and choice indices are 0-based.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaViolation {
    #[error("document is not a list of questions")]
    NotASequence,

    #[error("expected {expected} questions, got {actual}")]
    QuestionCount { expected: usize, actual: usize },

    #[error("question {question} is not an object")]
    QuestionNotAnObject { question: usize },

    #[error("question {question} has no `question` text")]
    MissingQuestionText { question: usize },

    #[error("question {question} has empty text")]
    EmptyQuestionText { question: usize },

    #[error("question {question} has no `choices` list")]
    MissingChoices { question: usize },

    #[error("question {question}: expected {expected} choices, got {actual}")]
    ChoiceCount {
        question: usize,
        expected: usize,
        actual: usize,
    },

    #[error("question {question}, choice {choice} is not an object")]
    ChoiceNotAnObject { question: usize, choice: usize },

    #[error("question {question}, choice {choice} has no `text`")]
    MissingChoiceText { question: usize, choice: usize },

    #[error("question {question}, choice {choice} has empty text")]
    EmptyChoiceText { question: usize, choice: usize },

    #[error("question {question}, choice {choice} has no boolean `correct` flag")]
    MissingCorrectFlag { question: usize, choice: usize },

    #[error("question {question} must have exactly one correct choice, found {found}")]
    CorrectChoiceCount { question: usize, found: usize },

    #[error("{path}: {message}")]
    Other { path: String, message: String },

    #[error("output schema is unusable: {0}")]
    Unusable(String),
}

impl SchemaViolation {
    /// Document order: root first, then each question, its text, its choices.
    fn rank(&self) -> (usize, usize, usize, usize, usize) {
        use SchemaViolation::*;
        match *self {
            Unusable(_) | NotASequence => (0, 0, 0, 0, 0),
            QuestionCount { .. } => (1, 0, 0, 0, 0),
            QuestionNotAnObject { question } => (2, question, 0, 0, 0),
            MissingQuestionText { question } => (2, question, 1, 0, 0),
            EmptyQuestionText { question } => (2, question, 2, 0, 0),
            MissingChoices { question } => (2, question, 3, 0, 0),
            ChoiceCount { question, .. } => (2, question, 4, 0, 0),
            ChoiceNotAnObject { question, choice } => (2, question, 5, choice, 0),
            MissingChoiceText { question, choice } => (2, question, 5, choice, 1),
            EmptyChoiceText { question, choice } => (2, question, 5, choice, 2),
            MissingCorrectFlag { question, choice } => (2, question, 5, choice, 3),
            CorrectChoiceCount { question, .. } => (2, question, 6, 0, 0),
            Other { .. } => (3, 0, 0, 0, 0),
        }
    }
}

/// The bundled schema with both counts fixed to `expected`.
pub fn shaped_schema(expected: ExpectedShape) -> Result<Value, SchemaViolation> {
    let mut schema = (*BASE_SCHEMA).clone().map_err(SchemaViolation::Unusable)?;
    if !schema.is_object() {
        return Err(SchemaViolation::Unusable("schema is not an object".into()));
    }
    schema["minItems"] = json!(expected.question_count);
    schema["maxItems"] = json!(expected.question_count);

    let choices = &mut schema["items"]["properties"][CHOICES_FIELD];
    if !choices.is_object() {
        return Err(SchemaViolation::Unusable("no `choices` property".into()));
    }
    choices["minItems"] = json!(expected.choice_count);
    choices["maxItems"] = json!(expected.choice_count);
    Ok(schema)
}

pub fn validate(
    document: &Value,
    expected: ExpectedShape,
) -> Result<GeneratedQuestionDocument, SchemaViolation> {
    let schema = shaped_schema(expected)?;
    let validator = jsonschema::draft202012::new(&schema)
        .map_err(|e| SchemaViolation::Unusable(e.to_string()))?;

    let first = validator
        .iter_errors(document)
        .map(|error| {
            classify(
                document,
                &error.instance_path.to_string(),
                &error.schema_path.to_string(),
                expected,
            )
            .unwrap_or_else(|| SchemaViolation::Other {
                path: error.instance_path.to_string(),
                message: error.to_string(),
            })
        })
        .min_by_key(SchemaViolation::rank);
    if let Some(violation) = first {
        return Err(violation);
    }

    serde_json::from_value(document.clone()).map_err(|e| SchemaViolation::Other {
        path: String::new(),
        message: e.to_string(),
    })
}

/// Maps one schema error, located by JSON pointers, to the violation it reports.
fn classify(
    document: &Value,
    instance_path: &str,
    schema_path: &str,
    expected: ExpectedShape,
) -> Option<SchemaViolation> {
    let keyword = schema_path.rsplit('/').next().unwrap_or_default();
    let segments: Vec<&str> = instance_path.split('/').skip(1).collect();
    let at = |pointer: &str| document.pointer(pointer);
    let len = |pointer: &str| at(pointer).and_then(Value::as_array).map_or(0, Vec::len);
    let lacks = |pointer: &str, field: &str| at(pointer).and_then(|v| v.get(field)).is_none();

    let violation = match segments.as_slice() {
        [] => match keyword {
            "type" => SchemaViolation::NotASequence,
            "minItems" | "maxItems" => SchemaViolation::QuestionCount {
                expected: expected.question_count,
                actual: len(""),
            },
            _ => return None,
        },
        [q] => {
            let question = q.parse().ok()?;
            match keyword {
                "type" => SchemaViolation::QuestionNotAnObject { question },
                "required" if lacks(instance_path, QUESTION_FIELD) => {
                    SchemaViolation::MissingQuestionText { question }
                }
                "required" => SchemaViolation::MissingChoices { question },
                _ => return None,
            }
        }
        [q, QUESTION_FIELD] => {
            let question = q.parse().ok()?;
            match keyword {
                "type" => SchemaViolation::MissingQuestionText { question },
                "minLength" | "pattern" => SchemaViolation::EmptyQuestionText { question },
                _ => return None,
            }
        }
        [q, CHOICES_FIELD] => {
            let question = q.parse().ok()?;
            match keyword {
                "type" => SchemaViolation::MissingChoices { question },
                "minItems" | "maxItems" => SchemaViolation::ChoiceCount {
                    question,
                    expected: expected.choice_count,
                    actual: len(instance_path),
                },
                "contains" | "minContains" | "maxContains" => {
                    let found = at(instance_path)
                        .and_then(Value::as_array)
                        .map_or(0, |choices| {
                            choices
                                .iter()
                                .filter(|c| c.get(CORRECT_FIELD) == Some(&Value::Bool(true)))
                                .count()
                        });
                    SchemaViolation::CorrectChoiceCount { question, found }
                }
                _ => return None,
            }
        }
        [q, CHOICES_FIELD, c] => {
            let (question, choice) = (q.parse().ok()?, c.parse().ok()?);
            match keyword {
                "type" => SchemaViolation::ChoiceNotAnObject { question, choice },
                "required" if lacks(instance_path, TEXT_FIELD) => {
                    SchemaViolation::MissingChoiceText { question, choice }
                }
                "required" => SchemaViolation::MissingCorrectFlag { question, choice },
                _ => return None,
            }
        }
        [q, CHOICES_FIELD, c, TEXT_FIELD] => {
            let (question, choice) = (q.parse().ok()?, c.parse().ok()?);
            match keyword {
                "type" => SchemaViolation::MissingChoiceText { question, choice },
                "minLength" | "pattern" => SchemaViolation::EmptyChoiceText { question, choice },
                _ => return None,
            }
        }
        [q, CHOICES_FIELD, c, CORRECT_FIELD] => SchemaViolation::MissingCorrectFlag {
            question: q.parse().ok()?,
            choice: c.parse().ok()?,
        },
        _ => return None,
    };
    Some(violation)
}
