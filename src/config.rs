use std::time::Duration;

use clap::{Args, Parser};

use crate::generator::client::DEFAULT_BASE_URL;

#[derive(Debug, Clone, Parser)]
#[command(name = "quiz-generator-api", about = "Quiz backend with generated quiz content")]
pub struct Settings {
    #[arg(long, env = "BIND_ADDRESS", default_value = "0.0.0.0:8080")]
    pub bind_address: String,

    #[arg(long, env = "DATABASE_URL", default_value = "sqlite://quiz.db?mode=rwc")]
    pub database_url: String,

    #[command(flatten)]
    pub gemini: GeminiSettings,

    #[command(flatten)]
    pub generation: GenerationSettings,
}

#[derive(Debug, Clone, Args)]
pub struct GeminiSettings {
    #[arg(long = "gemini-api-key", env = "GEMINI_API_KEY", hide_env_values = true)]
    pub api_key: String,

    #[arg(long = "gemini-model", env = "GEMINI_MODEL", default_value = "gemini-1.5-flash")]
    pub model: String,

    #[arg(long = "gemini-base-url", env = "GEMINI_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,
}

#[derive(Debug, Clone, Copy, Args)]
pub struct GenerationSettings {
    /// Upper bound for a single call to the generative service.
    #[arg(long, env = "GENERATION_TIMEOUT_SECS", default_value_t = 60)]
    pub generation_timeout_secs: u64,

    #[command(flatten)]
    pub bounds: QuizBounds,
}

impl GenerationSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.generation_timeout_secs)
    }
}

/// Inclusive limits on the size of a generated quiz.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Args)]
pub struct QuizBounds {
    #[arg(long = "min-question-count", env = "MIN_QUESTION_COUNT", default_value_t = 5)]
    pub min_questions: u32,

    #[arg(long = "max-question-count", env = "MAX_QUESTION_COUNT", default_value_t = 20)]
    pub max_questions: u32,

    #[arg(long = "min-choice-count", env = "MIN_CHOICE_COUNT", default_value_t = 2)]
    pub min_choices: u32,

    #[arg(long = "max-choice-count", env = "MAX_CHOICE_COUNT", default_value_t = 6)]
    pub max_choices: u32,
}

impl Default for QuizBounds {
    fn default() -> Self {
        Self {
            min_questions: 5,
            max_questions: 20,
            min_choices: 2,
            max_choices: 6,
        }
    }
}

impl QuizBounds {
    /// Rejects bounds that could never produce a valid quiz.
    pub fn sanity_check(&self) -> Result<(), String> {
        if self.min_questions < 1 {
            return Err("minimum question count must be at least 1".into());
        }
        if self.min_choices < 2 {
            return Err("minimum choice count must be at least 2".into());
        }
        if self.min_questions > self.max_questions {
            return Err(format!(
                "minimum question count {} exceeds maximum {}",
                self.min_questions, self.max_questions
            ));
        }
        if self.min_choices > self.max_choices {
            return Err(format!(
                "minimum choice count {} exceeds maximum {}",
                self.min_choices, self.max_choices
            ));
        }
        Ok(())
    }

    pub fn check(&self, question_count: u32, choice_count: u32) -> Result<(), String> {
        if !(self.min_questions..=self.max_questions).contains(&question_count) {
            return Err(format!(
                "questionCount must be between {} and {}, got {}",
                self.min_questions, self.max_questions, question_count
            ));
        }
        if !(self.min_choices..=self.max_choices).contains(&choice_count) {
            return Err(format!(
                "choiceCount must be between {} and {}, got {}",
                self.min_choices, self.max_choices, choice_count
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_bounds_are_inclusive() {
        let bounds = QuizBounds::default();
        assert!(bounds.check(5, 2).is_ok());
        assert!(bounds.check(20, 6).is_ok());
        assert!(bounds.check(4, 4).is_err());
        assert!(bounds.check(21, 4).is_err());
        assert!(bounds.check(5, 1).is_err());
        assert!(bounds.check(5, 7).is_err());
    }

    #[test]
    fn error_names_the_offending_field() {
        let bounds = QuizBounds::default();
        assert!(bounds.check(3, 4).unwrap_err().contains("questionCount"));
        assert!(bounds.check(5, 10).unwrap_err().contains("choiceCount"));
    }

    #[test]
    fn sanity_check_rejects_inverted_bounds() {
        assert!(QuizBounds::default().sanity_check().is_ok());

        let inverted = QuizBounds {
            min_questions: 10,
            max_questions: 5,
            ..QuizBounds::default()
        };
        assert!(inverted.sanity_check().is_err());

        let single_choice = QuizBounds {
            min_choices: 1,
            ..QuizBounds::default()
        };
        assert!(single_choice.sanity_check().is_err());
    }

    #[test]
    fn parses_from_args() {
        let settings = Settings::try_parse_from([
            "quiz-generator-api",
            "--gemini-api-key",
            "test-key",
            "--max-question-count",
            "8",
            "--generation-timeout-secs",
            "5",
        ])
        .unwrap();

        assert_eq!(settings.gemini.api_key, "test-key");
        assert_eq!(settings.generation.bounds.max_questions, 8);
        assert_eq!(settings.generation.bounds.min_questions, 5);
        assert_eq!(settings.generation.timeout(), Duration::from_secs(5));
    }
}
