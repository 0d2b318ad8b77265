//! Relational storage for users, quizzes and attempts.
//!
//! Delete rules live in `migrations/` as `ON DELETE` clauses:
//! a quiz cascades to its questions and their choices, an attempt cascades to
//! its attempt questions and user choices, and every other reference
//! (quiz creator, attempt quiz/user, answered question/choice) is set to NULL
//! so history survives the referenced row.

use std::collections::HashMap;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::{FromRow, SqliteConnection};

use crate::models::{
    AttemptDocument, AttemptQuestion, Choice, ChoiceDocument, Question, QuestionDocument,
    QuizAttempt, QuizDocument, QuizSummary, User, UserChoice,
};

pub async fn connect(database_url: &str) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true);

    SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
}

pub async fn migrate(pool: &SqlitePool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}

// ---------------------------------------------------------------------------
// Users

pub async fn insert_user(pool: &SqlitePool, username: &str) -> Result<User, sqlx::Error> {
    let created_at = Utc::now();
    let id = sqlx::query("INSERT INTO users (username, created_at) VALUES (?, ?)")
        .bind(username)
        .bind(created_at)
        .execute(pool)
        .await?
        .last_insert_rowid();

    Ok(User {
        id,
        username: username.to_owned(),
        created_at,
    })
}

pub async fn get_user(pool: &SqlitePool, id: i64) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>("SELECT id, username, created_at FROM users WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn list_users(pool: &SqlitePool, limit: i64, offset: i64) -> Result<Vec<User>, sqlx::Error> {
    sqlx::query_as::<_, User>("SELECT id, username, created_at FROM users ORDER BY id LIMIT ? OFFSET ?")
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
}

pub async fn delete_user(pool: &SqlitePool, id: i64) -> Result<bool, sqlx::Error> {
    let res = sqlx::query("DELETE FROM users WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(res.rows_affected() > 0)
}

// ---------------------------------------------------------------------------
// Quizzes

/// A quiz row that has not been written yet.
#[derive(Debug, Clone)]
pub struct NewQuiz {
    pub subject: String,
    pub creator_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

#[derive(FromRow)]
struct QuizRow {
    id: i64,
    subject: String,
    created_at: DateTime<Utc>,
    creator_id: Option<i64>,
}

pub async fn insert_quiz(conn: &mut SqliteConnection, quiz: &NewQuiz) -> Result<i64, sqlx::Error> {
    let res = sqlx::query("INSERT INTO quizzes (subject, created_at, creator_id) VALUES (?, ?, ?)")
        .bind(&quiz.subject)
        .bind(quiz.created_at)
        .bind(quiz.creator_id)
        .execute(conn)
        .await?;
    Ok(res.last_insert_rowid())
}

pub async fn insert_question(
    conn: &mut SqliteConnection,
    quiz_id: i64,
    position: i64,
    text: &str,
) -> Result<i64, sqlx::Error> {
    let res = sqlx::query("INSERT INTO questions (quiz_id, position, text) VALUES (?, ?, ?)")
        .bind(quiz_id)
        .bind(position)
        .bind(text)
        .execute(conn)
        .await?;
    Ok(res.last_insert_rowid())
}

pub async fn insert_choice(
    conn: &mut SqliteConnection,
    question_id: i64,
    position: i64,
    text: &str,
    correct: bool,
) -> Result<i64, sqlx::Error> {
    let res = sqlx::query(
        "INSERT INTO choices (question_id, position, text, is_correct) VALUES (?, ?, ?, ?)",
    )
    .bind(question_id)
    .bind(position)
    .bind(text)
    .bind(correct)
    .execute(conn)
    .await?;
    Ok(res.last_insert_rowid())
}

pub async fn quiz_exists(pool: &SqlitePool, id: i64) -> Result<bool, sqlx::Error> {
    let found: Option<i64> = sqlx::query_scalar("SELECT id FROM quizzes WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(found.is_some())
}

pub async fn get_quiz_document(pool: &SqlitePool, id: i64) -> Result<Option<QuizDocument>, sqlx::Error> {
    let Some(row) = sqlx::query_as::<_, QuizRow>(
        "SELECT id, subject, created_at, creator_id FROM quizzes WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    else {
        return Ok(None);
    };

    let creator = match row.creator_id {
        Some(creator_id) => get_user(pool, creator_id).await?,
        None => None,
    };
    let questions = list_quiz_questions(pool, id).await?;

    Ok(Some(QuizDocument {
        id: row.id,
        subject: row.subject,
        created_at: row.created_at,
        creator,
        question_count: questions.len(),
        questions,
    }))
}

/// Questions of a quiz with their choices, both in stored order.
pub async fn list_quiz_questions(
    pool: &SqlitePool,
    quiz_id: i64,
) -> Result<Vec<QuestionDocument>, sqlx::Error> {
    let questions = sqlx::query_as::<_, Question>(
        "SELECT id, quiz_id, position, text FROM questions WHERE quiz_id = ? ORDER BY position, id",
    )
    .bind(quiz_id)
    .fetch_all(pool)
    .await?;

    let choices = sqlx::query_as::<_, Choice>(
        r#"
        SELECT c.id, c.question_id, c.position, c.text, c.is_correct
        FROM choices c
        JOIN questions q ON q.id = c.question_id
        WHERE q.quiz_id = ?
        ORDER BY c.question_id, c.position, c.id
        "#,
    )
    .bind(quiz_id)
    .fetch_all(pool)
    .await?;

    let mut by_question: HashMap<i64, Vec<ChoiceDocument>> = HashMap::new();
    for choice in choices {
        by_question
            .entry(choice.question_id)
            .or_default()
            .push(choice.into());
    }

    Ok(questions
        .into_iter()
        .map(|q| QuestionDocument {
            choices: by_question.remove(&q.id).unwrap_or_default(),
            id: q.id,
            text: q.text,
        })
        .collect())
}

pub async fn list_quizzes(pool: &SqlitePool, limit: i64, offset: i64) -> Result<Vec<QuizSummary>, sqlx::Error> {
    sqlx::query_as::<_, QuizSummary>(
        r#"
        SELECT q.id, q.subject, q.created_at, q.creator_id, COUNT(qs.id) AS question_count
        FROM quizzes q
        LEFT JOIN questions qs ON qs.quiz_id = q.id
        GROUP BY q.id
        ORDER BY q.id
        LIMIT ? OFFSET ?
        "#,
    )
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await
}

pub async fn delete_quiz(pool: &SqlitePool, id: i64) -> Result<bool, sqlx::Error> {
    let res = sqlx::query("DELETE FROM quizzes WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(res.rows_affected() > 0)
}

// ---------------------------------------------------------------------------
// Questions and choices

pub async fn list_questions(pool: &SqlitePool, limit: i64, offset: i64) -> Result<Vec<Question>, sqlx::Error> {
    sqlx::query_as::<_, Question>(
        "SELECT id, quiz_id, position, text FROM questions ORDER BY id LIMIT ? OFFSET ?",
    )
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await
}

pub async fn get_question(pool: &SqlitePool, id: i64) -> Result<Option<Question>, sqlx::Error> {
    sqlx::query_as::<_, Question>("SELECT id, quiz_id, position, text FROM questions WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn list_question_choices(pool: &SqlitePool, question_id: i64) -> Result<Vec<Choice>, sqlx::Error> {
    sqlx::query_as::<_, Choice>(
        "SELECT id, question_id, position, text, is_correct FROM choices WHERE question_id = ? ORDER BY position, id",
    )
    .bind(question_id)
    .fetch_all(pool)
    .await
}

pub async fn list_choices(pool: &SqlitePool, limit: i64, offset: i64) -> Result<Vec<Choice>, sqlx::Error> {
    sqlx::query_as::<_, Choice>(
        "SELECT id, question_id, position, text, is_correct FROM choices ORDER BY id LIMIT ? OFFSET ?",
    )
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await
}

pub async fn get_choice(pool: &SqlitePool, id: i64) -> Result<Option<Choice>, sqlx::Error> {
    sqlx::query_as::<_, Choice>(
        "SELECT id, question_id, position, text, is_correct FROM choices WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}

// ---------------------------------------------------------------------------
// Attempts

/// Creates an attempt whose questions are presented in `question_order`.
pub async fn insert_attempt(
    pool: &SqlitePool,
    quiz_id: i64,
    user_id: Option<i64>,
    question_order: &[i64],
) -> Result<AttemptDocument, sqlx::Error> {
    let started_at = Utc::now();
    let mut tx = pool.begin().await?;

    let attempt_id = sqlx::query("INSERT INTO quiz_attempts (quiz_id, user_id, started_at) VALUES (?, ?, ?)")
        .bind(quiz_id)
        .bind(user_id)
        .bind(started_at)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

    let mut questions = Vec::with_capacity(question_order.len());
    for (index, question_id) in question_order.iter().enumerate() {
        let sequence_number = index as i64 + 1;
        sqlx::query(
            "INSERT INTO attempt_questions (attempt_id, question_id, sequence_number) VALUES (?, ?, ?)",
        )
        .bind(attempt_id)
        .bind(question_id)
        .bind(sequence_number)
        .execute(&mut *tx)
        .await?;

        questions.push(AttemptQuestion {
            sequence_number,
            question_id: Some(*question_id),
        });
    }

    tx.commit().await?;

    Ok(AttemptDocument {
        id: attempt_id,
        quiz_id: Some(quiz_id),
        user_id,
        started_at,
        questions,
        user_choices: Vec::new(),
    })
}

pub async fn get_attempt(pool: &SqlitePool, id: i64) -> Result<Option<AttemptDocument>, sqlx::Error> {
    let Some(attempt) = sqlx::query_as::<_, QuizAttempt>(
        "SELECT id, quiz_id, user_id, started_at FROM quiz_attempts WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    else {
        return Ok(None);
    };

    let questions = sqlx::query_as::<_, AttemptQuestion>(
        "SELECT sequence_number, question_id FROM attempt_questions WHERE attempt_id = ? ORDER BY sequence_number",
    )
    .bind(id)
    .fetch_all(pool)
    .await?;

    let user_choices = list_user_choices_for_attempt(pool, id).await?;

    Ok(Some(AttemptDocument {
        id: attempt.id,
        quiz_id: attempt.quiz_id,
        user_id: attempt.user_id,
        started_at: attempt.started_at,
        questions,
        user_choices,
    }))
}

pub async fn list_attempts(pool: &SqlitePool, limit: i64, offset: i64) -> Result<Vec<QuizAttempt>, sqlx::Error> {
    sqlx::query_as::<_, QuizAttempt>(
        "SELECT id, quiz_id, user_id, started_at FROM quiz_attempts ORDER BY started_at, id LIMIT ? OFFSET ?",
    )
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await
}

pub async fn list_attempts_for_quiz(pool: &SqlitePool, quiz_id: i64) -> Result<Vec<QuizAttempt>, sqlx::Error> {
    sqlx::query_as::<_, QuizAttempt>(
        "SELECT id, quiz_id, user_id, started_at FROM quiz_attempts WHERE quiz_id = ? ORDER BY started_at, id",
    )
    .bind(quiz_id)
    .fetch_all(pool)
    .await
}

pub async fn list_attempts_for_user(pool: &SqlitePool, user_id: i64) -> Result<Vec<QuizAttempt>, sqlx::Error> {
    sqlx::query_as::<_, QuizAttempt>(
        "SELECT id, quiz_id, user_id, started_at FROM quiz_attempts WHERE user_id = ? ORDER BY started_at, id",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
}

pub async fn delete_attempt(pool: &SqlitePool, id: i64) -> Result<bool, sqlx::Error> {
    let res = sqlx::query("DELETE FROM quiz_attempts WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(res.rows_affected() > 0)
}

pub async fn attempt_has_question(
    pool: &SqlitePool,
    attempt_id: i64,
    question_id: i64,
) -> Result<bool, sqlx::Error> {
    let found: Option<i64> = sqlx::query_scalar(
        "SELECT id FROM attempt_questions WHERE attempt_id = ? AND question_id = ?",
    )
    .bind(attempt_id)
    .bind(question_id)
    .fetch_optional(pool)
    .await?;
    Ok(found.is_some())
}

// ---------------------------------------------------------------------------
// User choices

pub async fn insert_user_choice(
    pool: &SqlitePool,
    attempt_id: i64,
    question_id: i64,
    choice_id: i64,
) -> Result<UserChoice, sqlx::Error> {
    let answered_at = Utc::now();
    let id = sqlx::query(
        "INSERT INTO user_choices (attempt_id, question_id, choice_id, answered_at) VALUES (?, ?, ?, ?)",
    )
    .bind(attempt_id)
    .bind(question_id)
    .bind(choice_id)
    .bind(answered_at)
    .execute(pool)
    .await?
    .last_insert_rowid();

    Ok(UserChoice {
        id,
        attempt_id,
        question_id: Some(question_id),
        choice_id: Some(choice_id),
        answered_at,
    })
}

const USER_CHOICE_COLUMNS: &str = "id, attempt_id, question_id, choice_id, answered_at";

pub async fn list_user_choices_for_attempt(
    pool: &SqlitePool,
    attempt_id: i64,
) -> Result<Vec<UserChoice>, sqlx::Error> {
    sqlx::query_as::<_, UserChoice>(&format!(
        "SELECT {USER_CHOICE_COLUMNS} FROM user_choices WHERE attempt_id = ? ORDER BY id"
    ))
    .bind(attempt_id)
    .fetch_all(pool)
    .await
}

pub async fn list_user_choices_for_question(
    pool: &SqlitePool,
    question_id: i64,
) -> Result<Vec<UserChoice>, sqlx::Error> {
    sqlx::query_as::<_, UserChoice>(&format!(
        "SELECT {USER_CHOICE_COLUMNS} FROM user_choices WHERE question_id = ? ORDER BY id"
    ))
    .bind(question_id)
    .fetch_all(pool)
    .await
}

pub async fn list_user_choices_for_choice(
    pool: &SqlitePool,
    choice_id: i64,
) -> Result<Vec<UserChoice>, sqlx::Error> {
    sqlx::query_as::<_, UserChoice>(&format!(
        "SELECT {USER_CHOICE_COLUMNS} FROM user_choices WHERE choice_id = ? ORDER BY id"
    ))
    .bind(choice_id)
    .fetch_all(pool)
    .await
}
