//! inventory-chat - natural-language chat over an inventory database.

use std::sync::Arc;

use anyhow::Context;
use inventory_chat::api::{self, AppState};
use inventory_chat::cli::{Cli, Command};
use inventory_chat::config::Config;
use inventory_chat::error::ChatError;
use inventory_chat::pipeline::{ChatRequest, Pipeline};
use inventory_chat::{db, llm, logging, setup};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    // A missing .env file is fine.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse_args();
    logging::init_logging(cli.log_file.as_deref());

    if let Err(e) = run(cli).await {
        match e.downcast_ref::<ChatError>() {
            Some(chat_error) => error!("{}: {:#}", chat_error.category(), e),
            None => error!("{:#}", e),
        }
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = resolve_config(&cli)?;

    match cli.command() {
        Command::InitDb => {
            let outcome = setup::init_db(&config).await?;
            info!(?outcome, "init-db finished");
        }
        Command::Serve { .. } => {
            let addr = config.bind_addr()?;
            let pipeline = build_pipeline(&config).await?;
            api::serve(addr, AppState::new(pipeline)).await?;
        }
        Command::Ask {
            question,
            session_id,
        } => {
            let pipeline = build_pipeline(&config).await?;
            let response = pipeline
                .run(&ChatRequest::new(session_id, question))
                .await;
            let json = serde_json::to_string_pretty(&response)
                .context("Failed to serialize response")?;
            println!("{json}");
        }
    }

    Ok(())
}

/// Resolves configuration: file, then environment, then CLI flags.
fn resolve_config(cli: &Cli) -> anyhow::Result<Config> {
    let config_path = cli.config_path();
    info!("Loading config from: {}", config_path.display());

    let mut config = Config::load_from_file(&config_path)?;
    config.apply_env()?;
    cli.apply_to(&mut config);
    config.validate()?;

    info!(
        database = %redact_url(&config.database.url),
        provider = %config.llm.provider,
        model = %config.llm.model,
        "Configuration resolved"
    );
    Ok(config)
}

async fn build_pipeline(config: &Config) -> anyhow::Result<Pipeline> {
    let schema_ddl = config.load_schema_ddl()?;
    let db: Arc<dyn db::DatabaseClient> = Arc::from(db::connect(&config.database.url).await?);
    let llm: Arc<dyn llm::LlmClient> = Arc::from(llm::create_client(&config.llm)?);

    Ok(Pipeline::new(
        llm,
        db,
        schema_ddl,
        config.llm.provider,
        config.llm.model.clone(),
    ))
}

/// Hides the password in a connection URL before logging it.
fn redact_url(raw: &str) -> String {
    match url::Url::parse(raw) {
        Ok(mut parsed) if parsed.password().is_some() => {
            let _ = parsed.set_password(Some("****"));
            parsed.to_string()
        }
        _ => raw.to_string(),
    }
}
