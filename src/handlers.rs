use actix_web::{web, HttpResponse, Responder};
use rand::seq::SliceRandom;

use crate::assembly::QuizRequest;
use crate::db;
use crate::error::{conflict_on_unique, Error};
use crate::generator::schema::OUTPUT_SCHEMA;
use crate::models::{
    AnswerResponse, CreateQuizRequest, CreateUserRequest, PaginationParams, ShuffleParams,
    StartAttemptRequest, SubmitAnswerRequest,
};
use crate::state::AppState;

const MAX_USERNAME_LEN: usize = 25;

#[utoipa::path(
    get,
    path = "/health",
    tag = "System",
    responses(
        (status = 200, description = "Health Check", body = String)
    )
)]
pub async fn health_check() -> impl Responder {
    HttpResponse::Ok().body("OK")
}

#[utoipa::path(
    get,
    path = "/generator/schema",
    tag = "System",
    responses(
        (status = 200, description = "JSON Schema the generated content must satisfy")
    )
)]
pub async fn generator_schema() -> impl Responder {
    HttpResponse::Ok()
        .content_type("application/json")
        .body(OUTPUT_SCHEMA)
}

// ---------------------------------------------------------------------------
// Users

#[utoipa::path(
    post,
    path = "/users",
    tag = "Users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created", body = User),
        (status = 400, description = "Invalid username", body = ErrorResponse),
        (status = 409, description = "Username taken", body = ErrorResponse)
    )
)]
pub async fn create_user(
    data: web::Data<AppState>,
    req: web::Json<CreateUserRequest>,
) -> Result<HttpResponse, Error> {
    let username = req.username.trim();
    if username.is_empty() || username.chars().count() > MAX_USERNAME_LEN {
        return Err(Error::Validation(format!(
            "username must be between 1 and {MAX_USERNAME_LEN} characters"
        )));
    }

    let user = db::insert_user(&data.db, username)
        .await
        .map_err(|e| conflict_on_unique(e, format!("username {username:?} is already taken")))?;
    Ok(HttpResponse::Created().json(user))
}

#[utoipa::path(
    get,
    path = "/users",
    tag = "Users",
    params(PaginationParams),
    responses(
        (status = 200, description = "List Users", body = Vec<User>)
    )
)]
pub async fn list_users(
    data: web::Data<AppState>,
    page: web::Query<PaginationParams>,
) -> Result<HttpResponse, Error> {
    let (limit, offset) = page.limit_offset();
    let users = db::list_users(&data.db, limit, offset).await?;
    Ok(HttpResponse::Ok().json(users))
}

#[utoipa::path(
    get,
    path = "/users/{id}",
    tag = "Users",
    params(("id" = i64, Path, description = "User ID")),
    responses(
        (status = 200, description = "Get User by ID", body = User),
        (status = 404, description = "User not found", body = ErrorResponse)
    )
)]
pub async fn get_user(data: web::Data<AppState>, path: web::Path<i64>) -> Result<HttpResponse, Error> {
    let user = db::get_user(&data.db, path.into_inner())
        .await?
        .ok_or(Error::NotFound("user"))?;
    Ok(HttpResponse::Ok().json(user))
}

#[utoipa::path(
    delete,
    path = "/users/{id}",
    tag = "Users",
    params(("id" = i64, Path, description = "User ID")),
    responses(
        (status = 204, description = "User deleted; their quizzes and attempts are kept"),
        (status = 404, description = "User not found", body = ErrorResponse)
    )
)]
pub async fn delete_user(data: web::Data<AppState>, path: web::Path<i64>) -> Result<HttpResponse, Error> {
    if !db::delete_user(&data.db, path.into_inner()).await? {
        return Err(Error::NotFound("user"));
    }
    Ok(HttpResponse::NoContent().finish())
}

#[utoipa::path(
    get,
    path = "/users/{id}/attempts",
    tag = "Attempts",
    params(("id" = i64, Path, description = "User ID")),
    responses(
        (status = 200, description = "Attempts made by the user", body = Vec<QuizAttempt>)
    )
)]
pub async fn list_user_attempts(
    data: web::Data<AppState>,
    path: web::Path<i64>,
) -> Result<HttpResponse, Error> {
    let attempts = db::list_attempts_for_user(&data.db, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(attempts))
}

// ---------------------------------------------------------------------------
// Quizzes

#[utoipa::path(
    post,
    path = "/quizzes",
    tag = "Quizzes",
    request_body = CreateQuizRequest,
    responses(
        (status = 201, description = "Quiz generated and stored", body = QuizDocument),
        (status = 400, description = "Invalid parameters", body = ErrorResponse),
        (status = 502, description = "Generative service failed or returned invalid content", body = ErrorResponse),
        (status = 504, description = "Generative service timed out", body = ErrorResponse),
        (status = 500, description = "Internal Server Error", body = ErrorResponse)
    )
)]
pub async fn create_quiz(
    data: web::Data<AppState>,
    req: web::Json<CreateQuizRequest>,
) -> Result<HttpResponse, Error> {
    let req = req.into_inner();
    let quiz = data
        .assembly
        .create(QuizRequest {
            subject: req.subject,
            creator_id: req.creator_id,
            question_count: req.question_count,
            choice_count: req.choice_count,
        })
        .await?;
    Ok(HttpResponse::Created().json(quiz))
}

#[utoipa::path(
    get,
    path = "/quizzes",
    tag = "Quizzes",
    params(PaginationParams),
    responses(
        (status = 200, description = "List Quizzes", body = Vec<QuizSummary>)
    )
)]
pub async fn list_quizzes(
    data: web::Data<AppState>,
    page: web::Query<PaginationParams>,
) -> Result<HttpResponse, Error> {
    let (limit, offset) = page.limit_offset();
    let quizzes = db::list_quizzes(&data.db, limit, offset).await?;
    Ok(HttpResponse::Ok().json(quizzes))
}

#[utoipa::path(
    get,
    path = "/quizzes/{id}",
    tag = "Quizzes",
    params(("id" = i64, Path, description = "Quiz ID"), ShuffleParams),
    responses(
        (status = 200, description = "Get Quiz by ID", body = QuizDocument),
        (status = 404, description = "Quiz not found", body = ErrorResponse)
    )
)]
pub async fn get_quiz(
    data: web::Data<AppState>,
    path: web::Path<i64>,
    opts: web::Query<ShuffleParams>,
) -> Result<HttpResponse, Error> {
    let mut quiz = db::get_quiz_document(&data.db, path.into_inner())
        .await?
        .ok_or(Error::NotFound("quiz"))?;
    if opts.shuffle.unwrap_or(false) {
        quiz.questions.shuffle(&mut rand::thread_rng());
    }
    Ok(HttpResponse::Ok().json(quiz))
}

#[utoipa::path(
    delete,
    path = "/quizzes/{id}",
    tag = "Quizzes",
    params(("id" = i64, Path, description = "Quiz ID")),
    responses(
        (status = 204, description = "Quiz deleted with its questions and choices"),
        (status = 404, description = "Quiz not found", body = ErrorResponse)
    )
)]
pub async fn delete_quiz(data: web::Data<AppState>, path: web::Path<i64>) -> Result<HttpResponse, Error> {
    let quiz_id = path.into_inner();
    if !db::delete_quiz(&data.db, quiz_id).await? {
        return Err(Error::NotFound("quiz"));
    }
    log::info!("Deleted quiz {}", quiz_id);
    Ok(HttpResponse::NoContent().finish())
}

#[utoipa::path(
    get,
    path = "/quizzes/{id}/questions",
    tag = "Questions",
    params(("id" = i64, Path, description = "Quiz ID"), ShuffleParams),
    responses(
        (status = 200, description = "Questions of the quiz with their choices", body = Vec<QuestionDocument>),
        (status = 404, description = "Quiz not found", body = ErrorResponse)
    )
)]
pub async fn list_quiz_questions(
    data: web::Data<AppState>,
    path: web::Path<i64>,
    opts: web::Query<ShuffleParams>,
) -> Result<HttpResponse, Error> {
    let quiz_id = path.into_inner();
    if !db::quiz_exists(&data.db, quiz_id).await? {
        return Err(Error::NotFound("quiz"));
    }
    let mut questions = db::list_quiz_questions(&data.db, quiz_id).await?;
    if opts.shuffle.unwrap_or(false) {
        questions.shuffle(&mut rand::thread_rng());
    }
    Ok(HttpResponse::Ok().json(questions))
}

#[utoipa::path(
    get,
    path = "/quizzes/{id}/attempts",
    tag = "Attempts",
    params(("id" = i64, Path, description = "Quiz ID")),
    responses(
        (status = 200, description = "Attempts at the quiz", body = Vec<QuizAttempt>)
    )
)]
pub async fn list_quiz_attempts(
    data: web::Data<AppState>,
    path: web::Path<i64>,
) -> Result<HttpResponse, Error> {
    let attempts = db::list_attempts_for_quiz(&data.db, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(attempts))
}

#[utoipa::path(
    post,
    path = "/quizzes/{id}/attempts",
    tag = "Attempts",
    request_body = StartAttemptRequest,
    params(("id" = i64, Path, description = "Quiz ID")),
    responses(
        (status = 201, description = "Attempt started; questions in presentation order", body = AttemptDocument),
        (status = 400, description = "Unknown user", body = ErrorResponse),
        (status = 404, description = "Quiz not found", body = ErrorResponse)
    )
)]
pub async fn start_attempt(
    data: web::Data<AppState>,
    path: web::Path<i64>,
    req: web::Json<StartAttemptRequest>,
) -> Result<HttpResponse, Error> {
    let quiz_id = path.into_inner();
    if !db::quiz_exists(&data.db, quiz_id).await? {
        return Err(Error::NotFound("quiz"));
    }
    if let Some(user_id) = req.user_id {
        if db::get_user(&data.db, user_id).await?.is_none() {
            return Err(Error::Validation(format!("user {user_id} does not exist")));
        }
    }

    let mut order: Vec<i64> = db::list_quiz_questions(&data.db, quiz_id)
        .await?
        .into_iter()
        .map(|q| q.id)
        .collect();
    order.shuffle(&mut rand::thread_rng());

    let attempt = db::insert_attempt(&data.db, quiz_id, req.user_id, &order).await?;
    Ok(HttpResponse::Created().json(attempt))
}

// ---------------------------------------------------------------------------
// Questions and choices

#[utoipa::path(
    get,
    path = "/questions",
    tag = "Questions",
    params(PaginationParams),
    responses(
        (status = 200, description = "List Questions", body = Vec<Question>)
    )
)]
pub async fn list_questions(
    data: web::Data<AppState>,
    page: web::Query<PaginationParams>,
) -> Result<HttpResponse, Error> {
    let (limit, offset) = page.limit_offset();
    let questions = db::list_questions(&data.db, limit, offset).await?;
    Ok(HttpResponse::Ok().json(questions))
}

#[utoipa::path(
    get,
    path = "/questions/{id}/choices",
    tag = "Questions",
    params(("id" = i64, Path, description = "Question ID")),
    responses(
        (status = 200, description = "Choices of the question", body = Vec<Choice>),
        (status = 404, description = "Question not found", body = ErrorResponse)
    )
)]
pub async fn list_question_choices(
    data: web::Data<AppState>,
    path: web::Path<i64>,
) -> Result<HttpResponse, Error> {
    let question_id = path.into_inner();
    if db::get_question(&data.db, question_id).await?.is_none() {
        return Err(Error::NotFound("question"));
    }
    let choices = db::list_question_choices(&data.db, question_id).await?;
    Ok(HttpResponse::Ok().json(choices))
}

#[utoipa::path(
    get,
    path = "/questions/{id}/user_choices",
    tag = "Attempts",
    params(("id" = i64, Path, description = "Question ID")),
    responses(
        (status = 200, description = "Answers given to the question", body = Vec<UserChoice>)
    )
)]
pub async fn list_question_user_choices(
    data: web::Data<AppState>,
    path: web::Path<i64>,
) -> Result<HttpResponse, Error> {
    let answers = db::list_user_choices_for_question(&data.db, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(answers))
}

#[utoipa::path(
    get,
    path = "/choices",
    tag = "Questions",
    params(PaginationParams),
    responses(
        (status = 200, description = "List Choices", body = Vec<Choice>)
    )
)]
pub async fn list_choices(
    data: web::Data<AppState>,
    page: web::Query<PaginationParams>,
) -> Result<HttpResponse, Error> {
    let (limit, offset) = page.limit_offset();
    let choices = db::list_choices(&data.db, limit, offset).await?;
    Ok(HttpResponse::Ok().json(choices))
}

#[utoipa::path(
    get,
    path = "/choices/{id}/user_choices",
    tag = "Attempts",
    params(("id" = i64, Path, description = "Choice ID")),
    responses(
        (status = 200, description = "Answers that selected the choice", body = Vec<UserChoice>)
    )
)]
pub async fn list_choice_user_choices(
    data: web::Data<AppState>,
    path: web::Path<i64>,
) -> Result<HttpResponse, Error> {
    let answers = db::list_user_choices_for_choice(&data.db, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(answers))
}

// ---------------------------------------------------------------------------
// Attempts

#[utoipa::path(
    get,
    path = "/attempts",
    tag = "Attempts",
    params(PaginationParams),
    responses(
        (status = 200, description = "List Attempts", body = Vec<QuizAttempt>)
    )
)]
pub async fn list_attempts(
    data: web::Data<AppState>,
    page: web::Query<PaginationParams>,
) -> Result<HttpResponse, Error> {
    let (limit, offset) = page.limit_offset();
    let attempts = db::list_attempts(&data.db, limit, offset).await?;
    Ok(HttpResponse::Ok().json(attempts))
}

#[utoipa::path(
    get,
    path = "/attempts/{id}",
    tag = "Attempts",
    params(("id" = i64, Path, description = "Attempt ID")),
    responses(
        (status = 200, description = "Attempt with presentation order and answers", body = AttemptDocument),
        (status = 404, description = "Attempt not found", body = ErrorResponse)
    )
)]
pub async fn get_attempt(data: web::Data<AppState>, path: web::Path<i64>) -> Result<HttpResponse, Error> {
    let attempt = db::get_attempt(&data.db, path.into_inner())
        .await?
        .ok_or(Error::NotFound("attempt"))?;
    Ok(HttpResponse::Ok().json(attempt))
}

#[utoipa::path(
    delete,
    path = "/attempts/{id}",
    tag = "Attempts",
    params(("id" = i64, Path, description = "Attempt ID")),
    responses(
        (status = 204, description = "Attempt deleted with its answers"),
        (status = 404, description = "Attempt not found", body = ErrorResponse)
    )
)]
pub async fn delete_attempt(data: web::Data<AppState>, path: web::Path<i64>) -> Result<HttpResponse, Error> {
    if !db::delete_attempt(&data.db, path.into_inner()).await? {
        return Err(Error::NotFound("attempt"));
    }
    Ok(HttpResponse::NoContent().finish())
}

#[utoipa::path(
    post,
    path = "/attempts/{id}/answers",
    tag = "Attempts",
    request_body = SubmitAnswerRequest,
    params(("id" = i64, Path, description = "Attempt ID")),
    responses(
        (status = 200, description = "Answer recorded", body = AnswerResponse),
        (status = 400, description = "Question or choice does not belong to the attempt", body = ErrorResponse),
        (status = 404, description = "Attempt not found", body = ErrorResponse),
        (status = 409, description = "Question already answered", body = ErrorResponse)
    )
)]
pub async fn submit_answer(
    data: web::Data<AppState>,
    path: web::Path<i64>,
    req: web::Json<SubmitAnswerRequest>,
) -> Result<HttpResponse, Error> {
    let attempt_id = path.into_inner();
    if db::get_attempt(&data.db, attempt_id).await?.is_none() {
        return Err(Error::NotFound("attempt"));
    }
    if !db::attempt_has_question(&data.db, attempt_id, req.question_id).await? {
        return Err(Error::Validation(format!(
            "question {} is not part of attempt {}",
            req.question_id, attempt_id
        )));
    }

    let choice = match db::get_choice(&data.db, req.choice_id).await? {
        Some(c) if c.question_id == req.question_id => c,
        _ => {
            return Err(Error::Validation(format!(
                "choice {} does not belong to question {}",
                req.choice_id, req.question_id
            )))
        }
    };

    db::insert_user_choice(&data.db, attempt_id, req.question_id, choice.id)
        .await
        .map_err(|e| conflict_on_unique(e, "question already answered in this attempt"))?;

    Ok(HttpResponse::Ok().json(AnswerResponse {
        correct: choice.correct,
        message: if choice.correct { "Correct!".to_string() } else { "Incorrect.".to_string() },
    }))
}

#[utoipa::path(
    get,
    path = "/attempts/{id}/user_choices",
    tag = "Attempts",
    params(("id" = i64, Path, description = "Attempt ID")),
    responses(
        (status = 200, description = "Answers recorded for the attempt", body = Vec<UserChoice>)
    )
)]
pub async fn list_attempt_user_choices(
    data: web::Data<AppState>,
    path: web::Path<i64>,
) -> Result<HttpResponse, Error> {
    let answers = db::list_user_choices_for_attempt(&data.db, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(answers))
}
