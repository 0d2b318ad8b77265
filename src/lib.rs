use actix_web::dev::Server;
use actix_web::{middleware, web, App, HttpServer};
use std::net::TcpListener;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::error::{Error, ErrorResponse};
use crate::models::{
    AnswerResponse, AttemptDocument, AttemptQuestion, Choice, ChoiceDocument, CreateQuizRequest,
    CreateUserRequest, PaginationParams, Question, QuestionDocument, QuizAttempt, QuizDocument,
    QuizSummary, StartAttemptRequest, SubmitAnswerRequest, User, UserChoice,
};

pub mod assembly;
pub mod config;
pub mod db;
pub mod error;
pub mod generator;
pub mod handlers;
pub mod models;
pub mod state;

use state::AppState;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health_check,
        handlers::generator_schema,
        handlers::create_user,
        handlers::list_users,
        handlers::get_user,
        handlers::delete_user,
        handlers::list_user_attempts,
        handlers::create_quiz,
        handlers::list_quizzes,
        handlers::get_quiz,
        handlers::delete_quiz,
        handlers::list_quiz_questions,
        handlers::list_quiz_attempts,
        handlers::start_attempt,
        handlers::list_questions,
        handlers::list_question_choices,
        handlers::list_question_user_choices,
        handlers::list_choices,
        handlers::list_choice_user_choices,
        handlers::list_attempts,
        handlers::get_attempt,
        handlers::delete_attempt,
        handlers::submit_answer,
        handlers::list_attempt_user_choices,
    ),
    components(
        schemas(
            User, CreateUserRequest,
            QuizSummary, QuizDocument, QuestionDocument, ChoiceDocument, CreateQuizRequest,
            Question, Choice,
            QuizAttempt, AttemptQuestion, AttemptDocument, UserChoice,
            StartAttemptRequest, SubmitAnswerRequest, AnswerResponse,
            PaginationParams, ErrorResponse
        )
    ),
    tags(
        (name = "System", description = "System endpoints"),
        (name = "Users", description = "Quiz takers and creators"),
        (name = "Quizzes", description = "Generated quizzes"),
        (name = "Questions", description = "Questions and answer choices"),
        (name = "Attempts", description = "Quiz attempts and recorded answers")
    )
)]
pub struct ApiDoc;

pub fn run(listener: TcpListener, state: AppState) -> Result<Server, std::io::Error> {
    let data = web::Data::new(state);

    let server = HttpServer::new(move || {
        // Extractor failures answer with the same payload as every other 400.
        let json_config = web::JsonConfig::default().error_handler(|err, _req| {
            Error::Validation(format!("invalid request body: {}", err)).into()
        });
        let query_config = web::QueryConfig::default().error_handler(|err, _req| {
            Error::Validation(format!("invalid query string: {}", err)).into()
        });
        let path_config = web::PathConfig::default().error_handler(|err, _req| {
            Error::Validation(format!("invalid path: {}", err)).into()
        });

        App::new()
            .app_data(data.clone())
            .app_data(json_config)
            .app_data(query_config)
            .app_data(path_config)
            .wrap(middleware::Logger::default())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", ApiDoc::openapi()),
            )
            .route("/health", web::get().to(handlers::health_check))
            .route("/generator/schema", web::get().to(handlers::generator_schema))
            .service(
                web::scope("/users")
                    .route("", web::post().to(handlers::create_user))
                    .route("", web::get().to(handlers::list_users))
                    .route("/{id}", web::get().to(handlers::get_user))
                    .route("/{id}", web::delete().to(handlers::delete_user))
                    .route("/{id}/attempts", web::get().to(handlers::list_user_attempts)),
            )
            .service(
                web::scope("/quizzes")
                    .route("", web::post().to(handlers::create_quiz))
                    .route("", web::get().to(handlers::list_quizzes))
                    .route("/{id}", web::get().to(handlers::get_quiz))
                    .route("/{id}", web::delete().to(handlers::delete_quiz))
                    .route("/{id}/questions", web::get().to(handlers::list_quiz_questions))
                    .route("/{id}/attempts", web::get().to(handlers::list_quiz_attempts))
                    .route("/{id}/attempts", web::post().to(handlers::start_attempt)),
            )
            .service(
                web::scope("/questions")
                    .route("", web::get().to(handlers::list_questions))
                    .route("/{id}/choices", web::get().to(handlers::list_question_choices))
                    .route("/{id}/user_choices", web::get().to(handlers::list_question_user_choices)),
            )
            .service(
                web::scope("/choices")
                    .route("", web::get().to(handlers::list_choices))
                    .route("/{id}/user_choices", web::get().to(handlers::list_choice_user_choices)),
            )
            .service(
                web::scope("/attempts")
                    .route("", web::get().to(handlers::list_attempts))
                    .route("/{id}", web::get().to(handlers::get_attempt))
                    .route("/{id}", web::delete().to(handlers::delete_attempt))
                    .route("/{id}/answers", web::post().to(handlers::submit_answer))
                    .route("/{id}/user_choices", web::get().to(handlers::list_attempt_user_choices)),
            )
    })
    .listen(listener)?
    .run();

    Ok(server)
}
