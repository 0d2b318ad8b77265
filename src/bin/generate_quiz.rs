//! Runs the generator once and prints the validated content, without touching the database.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use env_logger::Env;
use quiz_generator_api::generator::client::DEFAULT_BASE_URL;
use quiz_generator_api::generator::{ContentGenerator, GeminiClient, GenerationParams};

#[derive(Debug, Parser)]
#[command(name = "generate-quiz", about = "Generate quiz content for a subject and print it as JSON")]
struct Cli {
    /// Subject the questions should cover.
    subject: String,

    #[arg(short = 'q', long, default_value_t = 5)]
    question_count: u32,

    #[arg(short = 'c', long, default_value_t = 4)]
    choice_count: u32,

    #[arg(long, default_value_t = 60)]
    timeout_secs: u64,

    /// Print the prompt instead of calling the service.
    #[arg(long)]
    dry_run: bool,

    #[arg(
        long = "gemini-api-key",
        env = "GEMINI_API_KEY",
        hide_env_values = true,
        required_unless_present = "dry_run"
    )]
    api_key: Option<String>,

    #[arg(long = "gemini-model", env = "GEMINI_MODEL", default_value = "gemini-1.5-flash")]
    model: String,

    #[arg(long = "gemini-base-url", env = "GEMINI_BASE_URL", default_value = DEFAULT_BASE_URL)]
    base_url: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(Env::default().default_filter_or("info"));

    let cli = Cli::parse();
    // A dry run never calls the client, so it needs no key.
    let gemini = GeminiClient::new(
        reqwest::Client::new(),
        cli.api_key.unwrap_or_default(),
        cli.model,
        cli.base_url,
    );
    let generator = ContentGenerator::new(Arc::new(gemini));
    let params = GenerationParams {
        subject: cli.subject,
        question_count: cli.question_count,
        choice_count: cli.choice_count,
    };

    if cli.dry_run {
        println!("{}", generator.build_prompt(&params));
        return Ok(());
    }

    let content = generator
        .generate(&params, Duration::from_secs(cli.timeout_secs))
        .await?;
    println!("{}", serde_json::to_string_pretty(&content)?);
    Ok(())
}
