//! Creates a quiz from generated content as a single unit of work.
//!
//! `REQUEST_VALIDATED -> QUIZ_SHELL_CREATED -> CONTENT_GENERATED -> QUESTIONS_PERSISTED -> COMMITTED`
//!
//! The shell is staged in memory and the model is called before the
//! transaction opens, so a failed generation writes nothing and the database
//! is never locked across the network call. Shell, questions and choices are
//! then written in one transaction; any error drops it, which rolls back.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use sqlx::SqlitePool;

use crate::config::QuizBounds;
use crate::db::{self, NewQuiz};
use crate::error::Error;
use crate::generator::{ContentGenerator, GeneratedQuestionDocument, GenerationParams};
use crate::models::{ChoiceDocument, QuestionDocument, QuizDocument, User};

const MAX_SUBJECT_LEN: usize = 100;

#[derive(Debug, Clone)]
pub struct QuizRequest {
    pub subject: String,
    pub creator_id: Option<i64>,
    pub question_count: u32,
    pub choice_count: u32,
}

pub struct QuizAssembly {
    db: SqlitePool,
    generator: Arc<ContentGenerator>,
    bounds: QuizBounds,
    timeout: Duration,
}

impl QuizAssembly {
    pub fn new(
        db: SqlitePool,
        generator: Arc<ContentGenerator>,
        bounds: QuizBounds,
        timeout: Duration,
    ) -> Self {
        Self {
            db,
            generator,
            bounds,
            timeout,
        }
    }

    pub async fn create(&self, request: QuizRequest) -> Result<QuizDocument, Error> {
        let creator = self.validate(&request).await?;
        log::debug!("Quiz request validated: subject={:?}", request.subject);

        let shell = NewQuiz {
            subject: request.subject.trim().to_owned(),
            creator_id: creator.as_ref().map(|u| u.id),
            created_at: Utc::now(),
        };

        let params = GenerationParams {
            subject: shell.subject.clone(),
            question_count: request.question_count,
            choice_count: request.choice_count,
        };
        let content = self.generator.generate(&params, self.timeout).await?;
        log::debug!("Generated {} questions for {:?}", content.questions.len(), shell.subject);

        let quiz = self.persist(shell, creator, content).await?;
        log::info!(
            "Created quiz {} on {:?} with {} questions",
            quiz.id,
            quiz.subject,
            quiz.question_count
        );
        Ok(quiz)
    }

    /// Rejects the request before anything is generated or written.
    async fn validate(&self, request: &QuizRequest) -> Result<Option<User>, Error> {
        self.bounds
            .check(request.question_count, request.choice_count)
            .map_err(Error::Validation)?;

        let subject = request.subject.trim();
        if subject.is_empty() {
            return Err(Error::Validation("subject must not be empty".into()));
        }
        if subject.chars().count() > MAX_SUBJECT_LEN {
            return Err(Error::Validation(format!(
                "subject must be at most {MAX_SUBJECT_LEN} characters"
            )));
        }

        match request.creator_id {
            Some(id) => match db::get_user(&self.db, id).await? {
                Some(user) => Ok(Some(user)),
                None => Err(Error::Validation(format!("creator {id} does not exist"))),
            },
            None => Ok(None),
        }
    }

    async fn persist(
        &self,
        shell: NewQuiz,
        creator: Option<User>,
        content: GeneratedQuestionDocument,
    ) -> Result<QuizDocument, Error> {
        let mut tx = self.db.begin().await?;

        // The creator was checked before generation but may have been deleted since.
        let quiz_id = db::insert_quiz(&mut *tx, &shell)
            .await
            .map_err(|e| match &e {
                sqlx::Error::Database(inner) if inner.is_foreign_key_violation() => {
                    Error::Validation("creator no longer exists".into())
                }
                _ => Error::Persistence(e),
            })?;

        let mut questions = Vec::with_capacity(content.questions.len());
        for (position, generated) in content.questions.into_iter().enumerate() {
            let question_id =
                db::insert_question(&mut *tx, quiz_id, position as i64, &generated.text).await?;

            let mut choices = Vec::with_capacity(generated.choices.len());
            for (choice_position, choice) in generated.choices.into_iter().enumerate() {
                let choice_id = db::insert_choice(
                    &mut *tx,
                    question_id,
                    choice_position as i64,
                    &choice.text,
                    choice.correct,
                )
                .await?;
                choices.push(ChoiceDocument {
                    id: choice_id,
                    text: choice.text,
                    correct: choice.correct,
                });
            }

            questions.push(QuestionDocument {
                id: question_id,
                text: generated.text,
                choices,
            });
        }
        log::debug!("Persisted {} questions for quiz {}", questions.len(), quiz_id);

        tx.commit().await?;

        Ok(QuizDocument {
            id: quiz_id,
            subject: shell.subject,
            created_at: shell.created_at,
            creator,
            question_count: questions.len(),
            questions,
        })
    }
}
