use std::net::TcpListener;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use quiz_generator_api::assembly::QuizAssembly;
use quiz_generator_api::config::QuizBounds;
use quiz_generator_api::db;
use quiz_generator_api::generator::{ContentGenerator, GenerativeModel, ModelError};
use quiz_generator_api::run;
use quiz_generator_api::state::AppState;
use serde_json::{json, Value};
use sqlx::SqlitePool;
use tempfile::TempDir;

pub const GENERATION_TIMEOUT: Duration = Duration::from_millis(300);

/// What the fake model answers with.
#[allow(dead_code)]
#[derive(Debug, Clone)]
pub enum Reply {
    /// A well-formed document with the counts the prompt asks for.
    Valid,
    /// Exactly this text.
    Raw(String),
    /// Like `Valid`, after a delay.
    Slow(Duration),
    /// A service-side failure.
    Fail,
    /// Never answers.
    Hang,
}

#[allow(dead_code)]
pub struct FakeModel {
    reply: Mutex<Reply>,
    calls: AtomicUsize,
    last_prompt: Mutex<Option<String>>,
}

#[allow(dead_code)]
impl FakeModel {
    fn new(reply: Reply) -> Self {
        Self {
            reply: Mutex::new(reply),
            calls: AtomicUsize::new(0),
            last_prompt: Mutex::new(None),
        }
    }

    pub fn set_reply(&self, reply: Reply) {
        *self.reply.lock().unwrap() = reply;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.last_prompt.lock().unwrap().clone()
    }
}

#[async_trait]
impl GenerativeModel for FakeModel {
    async fn generate_content(&self, prompt: &str) -> Result<String, ModelError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_prompt.lock().unwrap() = Some(prompt.to_owned());

        let mut reply = self.reply.lock().unwrap().clone();
        if let Reply::Slow(delay) = reply {
            tokio::time::sleep(delay).await;
            reply = Reply::Valid;
        }
        match reply {
            Reply::Valid | Reply::Slow(_) => {
                let questions = requested(prompt, " quiz questions");
                let choices = requested(prompt, " choices, of which");
                Ok(valid_document(questions, choices).to_string())
            }
            Reply::Raw(text) => Ok(text),
            Reply::Fail => Err(ModelError::Status {
                status: reqwest::StatusCode::SERVICE_UNAVAILABLE,
                body: "model overloaded".into(),
            }),
            Reply::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(ModelError::EmptyResponse)
            }
        }
    }
}

/// Reads the number right before `suffix` in the prompt.
fn requested(prompt: &str, suffix: &str) -> usize {
    let end = prompt.find(suffix).expect("prompt does not state the count");
    let head = &prompt[..end];
    let start = head.rfind(' ').map(|i| i + 1).unwrap_or(0);
    head[start..].parse().expect("count is not a number")
}

/// `questions` questions with `choices` choices each; the first choice is correct.
#[allow(dead_code)]
pub fn valid_document(questions: usize, choices: usize) -> Value {
    let items: Vec<Value> = (0..questions)
        .map(|q| {
            let choices: Vec<Value> = (0..choices)
                .map(|c| json!({ "text": format!("Choice {}.{}", q + 1, c + 1), "correct": c == 0 }))
                .collect();
            json!({ "question": format!("Question {}?", q + 1), "choices": choices })
        })
        .collect();
    Value::Array(items)
}

#[allow(dead_code)]
pub struct TestApp {
    pub address: String,
    pub db_pool: SqlitePool,
    pub api_client: reqwest::Client,
    pub model: Arc<FakeModel>,
    _db_dir: TempDir,
}

#[allow(dead_code)]
impl TestApp {
    pub async fn create_user(&self, username: &str) -> Value {
        let response = self
            .api_client
            .post(&format!("{}/users", &self.address))
            .json(&json!({ "username": username }))
            .send()
            .await
            .expect("Failed to execute request.");
        assert_eq!(201, response.status().as_u16());
        response.json().await.expect("Failed to read JSON")
    }

    pub async fn post_quiz(&self, body: &Value) -> reqwest::Response {
        self.api_client
            .post(&format!("{}/quizzes", &self.address))
            .json(body)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn create_quiz(&self, subject: &str, questions: u32, choices: u32) -> Value {
        let response = self
            .post_quiz(&json!({
                "subject": subject,
                "questionCount": questions,
                "choiceCount": choices
            }))
            .await;
        assert_eq!(201, response.status().as_u16());
        response.json().await.expect("Failed to read JSON")
    }

    pub async fn get(&self, path: &str) -> reqwest::Response {
        self.api_client
            .get(&format!("{}{}", &self.address, path))
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn delete(&self, path: &str) -> reqwest::Response {
        self.api_client
            .delete(&format!("{}{}", &self.address, path))
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn post(&self, path: &str, body: &Value) -> reqwest::Response {
        self.api_client
            .post(&format!("{}{}", &self.address, path))
            .json(body)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn count(&self, table: &str) -> i64 {
        let (count,): (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM {}", table))
            .fetch_one(&self.db_pool)
            .await
            .expect("Failed to count rows");
        count
    }
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with(Reply::Valid).await
}

#[allow(dead_code)]
pub async fn spawn_app_with(reply: Reply) -> TestApp {
    let (pool, db_dir) = configure_database().await;
    let model = Arc::new(FakeModel::new(reply));

    let generator = Arc::new(ContentGenerator::new(model.clone()));
    let assembly = QuizAssembly::new(
        pool.clone(),
        generator,
        QuizBounds::default(),
        GENERATION_TIMEOUT,
    );

    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    let state = AppState {
        db: pool.clone(),
        assembly,
    };
    let server = run(listener, state).expect("Failed to bind address");
    let _ = tokio::spawn(server);

    TestApp {
        address,
        db_pool: pool,
        api_client: reqwest::Client::new(),
        model,
        _db_dir: db_dir,
    }
}

/// Fresh SQLite database per test, removed when the app is dropped.
async fn configure_database() -> (SqlitePool, TempDir) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let url = format!("sqlite://{}?mode=rwc", dir.path().join("quiz.db").display());

    let pool = db::connect(&url).await.expect("Failed to open database");
    db::migrate(&pool).await.expect("Failed to migrate database");

    (pool, dir)
}
