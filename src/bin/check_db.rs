use std::env;

use dotenv::dotenv;
use quiz_generator_api::db;

#[derive(sqlx::FromRow, Debug)]
struct EmptyQuiz {
    id: i64,
    subject: String,
}

const TABLES: [&str; 7] = [
    "users",
    "quizzes",
    "questions",
    "choices",
    "quiz_attempts",
    "attempt_questions",
    "user_choices",
];

#[actix_web::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    let database_url = env::var("DATABASE_URL")?;
    let pool = db::connect(&database_url).await?;

    for table in TABLES {
        let (count,): (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(&pool)
            .await?;
        println!("{table}: {count}");
    }

    // A committed quiz always has questions; anything listed here is corrupt.
    let empty: Vec<EmptyQuiz> = sqlx::query_as(
        "SELECT q.id, q.subject FROM quizzes q \
         WHERE NOT EXISTS (SELECT 1 FROM questions qs WHERE qs.quiz_id = q.id)",
    )
    .fetch_all(&pool)
    .await?;
    println!("Quizzes without questions: {}", empty.len());
    for quiz in empty {
        println!("  {:?}", quiz);
    }

    Ok(())
}
