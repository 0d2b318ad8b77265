use std::env;

use dotenv::dotenv;
use quiz_generator_api::db;

#[actix_web::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    let database_url = env::var("DATABASE_URL")?;
    let pool = db::connect(&database_url).await?;
    db::migrate(&pool).await?;

    println!("Resetting database...");

    // Children first; attempts would otherwise survive with nulled references.
    let mut tx = pool.begin().await?;
    for table in [
        "user_choices",
        "attempt_questions",
        "quiz_attempts",
        "choices",
        "questions",
        "quizzes",
        "users",
    ] {
        sqlx::query(&format!("DELETE FROM {table}"))
            .execute(&mut *tx)
            .await?;
    }
    sqlx::query("DELETE FROM sqlite_sequence").execute(&mut *tx).await?;
    tx.commit().await?;

    println!("Database reset successfully!");
    Ok(())
}
