use std::path::PathBuf;
use std::time::Duration;

use chat_client::{
    ChatApi, ChatClient, ChatError, ChatEvent, ClientConfig, FileCache, HttpChatApi, TransportError,
};
use clap::{Args, Parser, Subcommand};
use frames::{ChatMessage, Draft, SendRequest, ValidationError};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::EnvFilter;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("{}", .0.status_message())]
    Chat(#[from] ChatError),
    #[error("invalid message: {0}")]
    Validation(#[from] ValidationError),
    #[error("request failed: {0}")]
    Transport(#[from] TransportError),
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("health check failed with HTTP {0}")]
    Unhealthy(u16),
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("terminal io failed: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Parser, Debug)]
#[command(name = "chat-cli", about = "Realtime chat hub CLI")]
struct Cli {
    #[arg(long, env = "CHAT_BASE_URL", default_value = "http://127.0.0.1:3000")]
    base_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check that the hub is up.
    Ping,
    /// Interactive session: stdin lines are sent, the room is printed.
    Chat(ChatArgs),
    /// Post one message over REST and print the stored record.
    Send {
        #[arg(long, env = "CHAT_NAME")]
        name: String,
        message: String,
        #[arg(long, default_value = "")]
        client_id: String,
    },
    /// Print the hub's current history.
    History {
        /// Only messages newer than this epoch-ms timestamp.
        #[arg(long)]
        since: Option<i64>,
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

#[derive(Args, Debug)]
struct ChatArgs {
    #[arg(long, env = "CHAT_NAME")]
    name: String,

    #[arg(long, env = "CHAT_CACHE", default_value = ".chat-cache.json")]
    cache: PathBuf,

    #[arg(long, env = "CHAT_BACKOFF_BASE_MS", default_value_t = 2000)]
    backoff_base_ms: u64,

    #[arg(long, env = "CHAT_BACKOFF_MAX_MS", default_value_t = 15_000)]
    backoff_max_ms: u64,

    #[arg(long, env = "CHAT_BACKOFF_MULTIPLIER", default_value_t = 1.5)]
    backoff_multiplier: f64,

    #[arg(long, env = "CHAT_POLL_INTERVAL_MS", default_value_t = 3000)]
    poll_interval_ms: u64,

    #[arg(long, env = "CHAT_COOLDOWN_SECS", default_value_t = 10)]
    cooldown_secs: u64,
}

impl ChatArgs {
    fn client_config(&self, base_url: &str) -> ClientConfig {
        ClientConfig {
            base_url: base_url.to_owned(),
            backoff_base: Duration::from_millis(self.backoff_base_ms),
            backoff_max: Duration::from_millis(self.backoff_max_ms),
            backoff_multiplier: self.backoff_multiplier,
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            cooldown: Duration::from_secs(self.cooldown_secs),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Ping => run_ping(&cli.base_url).await,
        Command::Chat(args) => run_chat(&cli.base_url, args).await,
        Command::Send { name, message, client_id } => run_send(&cli.base_url, &name, &message, &client_id).await,
        Command::History { since, json } => run_history(&cli.base_url, since, json).await,
    }
}

async fn run_ping(base_url: &str) -> Result<(), CliError> {
    let url = format!("{}/healthz", base_url.trim_end_matches('/'));
    let status = reqwest::Client::new().get(url).send().await?.status();
    if !status.is_success() {
        return Err(CliError::Unhealthy(status.as_u16()));
    }
    println!("ok");
    Ok(())
}

async fn run_send(base_url: &str, name: &str, message: &str, client_id: &str) -> Result<(), CliError> {
    let draft = Draft::normalize(name, message, client_id)?;
    let stored = HttpChatApi::new(base_url).send(&SendRequest::from(&draft)).await?;
    println!("{}", serde_json::to_string_pretty(&stored)?);
    Ok(())
}

async fn run_history(base_url: &str, since: Option<i64>, json: bool) -> Result<(), CliError> {
    let api = HttpChatApi::new(base_url);
    let messages = match since {
        Some(since) => api.fetch_since(since).await?,
        None => api.fetch_history().await?,
    };
    if json {
        println!("{}", serde_json::to_string_pretty(&messages)?);
    } else {
        messages.iter().for_each(print_message);
    }
    Ok(())
}

async fn run_chat(base_url: &str, args: ChatArgs) -> Result<(), CliError> {
    let config = args.client_config(base_url);
    let mut client = ChatClient::start(&config, Box::new(FileCache::new(&args.cache)));
    let mut events = client.subscribe();
    let mut status = client.status();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    client.messages().iter().for_each(print_message);
    eprintln!("[{}]", status.borrow_and_update().status_text());

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if line.trim().is_empty() {
                    continue;
                }
                if let Err(e) = client.submit(&args.name, &line).await {
                    eprintln!("{}", CliError::from(e));
                }
            }
            event = events.recv() => match event {
                Ok(ChatEvent::Appended(message)) => print_message(&message),
                Ok(ChatEvent::Replaced(messages)) => {
                    println!("--- {} messages ---", messages.len());
                    messages.iter().for_each(print_message);
                }
                Err(RecvError::Lagged(skipped)) => eprintln!("[skipped {skipped} updates]"),
                Err(RecvError::Closed) => break,
            },
            changed = status.changed() => {
                if changed.is_err() {
                    break;
                }
                eprintln!("[{}]", status.borrow_and_update().status_text());
            }
        }
    }

    client.shutdown();
    Ok(())
}

fn print_message(message: &ChatMessage) {
    println!("{} {}: {}", clock(message.timestamp), message.name, message.message);
}

/// `HH:MM:SS` (UTC) for an epoch-ms timestamp.
fn clock(timestamp_ms: i64) -> String {
    let secs = timestamp_ms.div_euclid(1000);
    let day = secs.rem_euclid(86_400);
    format!("{:02}:{:02}:{:02}", day / 3600, (day % 3600) / 60, day % 60)
}

#[cfg(test)]
#[path = "main_test.rs"]
mod tests;
