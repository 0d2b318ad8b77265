use sqlx::SqlitePool;

use crate::assembly::QuizAssembly;

pub struct AppState {
    pub db: SqlitePool,
    pub assembly: QuizAssembly,
}
