use anyhow::{anyhow, bail};
use chrono::NaiveDate;
use serde_json::{Value, json};
use std::sync::Arc;
use tokenseq::application_port::*;
use tokenseq::domain_model::SubjectId;
use tokenseq::logger::*;
use tokenseq::server::*;
use tokenseq::settings::*;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let logger = Logger::new_bootstrap();

    let project_settings = parse_settings(cli.settings.as_deref())?;
    debug!(?project_settings);
    let logger_config = LogConfig {
        filter: project_settings.log.filter.clone(),
    };
    logger.reload_from_config(&logger_config)?;

    let server = Arc::new(Server::try_new(&project_settings).await?);

    match cli.command {
        Command::Shell => run_shell(server).await,
        command => {
            if command.needs_earlier_state() && server.is_process_local() {
                bail!(
                    "the memory backend forgets tokens when the process exits; \
                     use the `shell` command or the redis backend"
                );
            }
            let output = execute(&server, command).await?;
            println!("{}", serde_json::to_string_pretty(&output)?);
            Ok(())
        }
    }
}

async fn execute(server: &Arc<Server>, command: Command) -> anyhow::Result<Value> {
    let accounts = &server.account_service;
    let output = match command {
        Command::Register => {
            let subject = accounts.register(&server.request_context()).await?;
            json!({ "subject": subject })
        }
        Command::Login { subject } => {
            let details = accounts
                .login(&server.request_context(), &SubjectId(subject))
                .await?;
            serde_json::to_value(&details)?
        }
        Command::Verify { access_token } => {
            let access = accounts
                .authenticate(&server.request_context(), &access_token)
                .await?;
            json!({ "subject": access.subject_id, "access_id": access.access_id })
        }
        Command::Logout { access_token } => {
            accounts
                .logout(&server.request_context(), &access_token)
                .await?;
            json!({ "logged_out": true })
        }
        Command::Refresh { refresh_token } => {
            let details = accounts
                .refresh(&server.request_context(), &refresh_token)
                .await?;
            serde_json::to_value(&details)?
        }
        Command::Allocate { count, day } => {
            let day = match day {
                Some(day) => NaiveDate::parse_from_str(&day, "%Y%m%d")
                    .map_err(|e| anyhow!("invalid day {:?}: {}", day, e))?,
                None => chrono::Local::now().date_naive(),
            };
            let ids = server.allocate_many(day, count).await?;
            json!({ "ids": ids })
        }
        Command::Shell => bail!("already in a shell"),
    };
    Ok(output)
}

async fn run_shell(server: Arc<Server>) -> anyhow::Result<()> {
    let interrupt = server.clone();
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            interrupt.shutdown();
        }
    });

    let shutdown = server.shutdown_token();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            _ = shutdown.cancelled() => break,
            line = lines.next_line() => line?,
        };
        let Some(line) = line else {
            break;
        };
        let words: Vec<&str> = line.split_whitespace().collect();
        if words.is_empty() {
            continue;
        }

        let output = match ShellLine::try_parse_from(words) {
            Ok(parsed) => match execute(&server, parsed.command).await {
                Ok(output) => output,
                Err(e) => json!({ "error": e.to_string() }),
            },
            Err(e) => json!({ "error": e.to_string() }),
        };
        println!("{}", serde_json::to_string(&output)?);
    }

    server.shutdown();
    Ok(())
}
