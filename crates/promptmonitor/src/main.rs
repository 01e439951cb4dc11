//! `pmon` - CLI for promptmonitor
//!
//! This binary hosts the coordinator, relay and interceptor in one process and
//! provides commands for scanning text, sending requests through the
//! interceptor, and inspecting or editing the persisted state.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::io::Read as _;
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::Context as _;
use clap::Parser;
use tokio::task::JoinHandle;

use promptmonitor::cli::{Cli, Command, ConfigCommand, HistoryCommand, ScanCommand, SendCommand};
use promptmonitor::consent::{FixedPrompt, TerminalPrompt};
use promptmonitor::detector;
use promptmonitor::protocol::DetectionEvent;
use promptmonitor::transport::{EchoTransport, HttpTransport};
use promptmonitor::{
    init_logging, Config, ConsentGate, ConsentPrompt, Coordinator, CoordinatorHandle, Delivery,
    DetectionSink, Interceptor, OutboundRequest, Relay, Storage, SystemClock, Transport,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());

    // Load configuration
    let config = Config::load_from(cli.config.clone())?;

    // Execute the command
    match cli.command {
        Command::Scan(cmd) => handle_scan(&cmd),
        Command::Send(cmd) => handle_send(&config, cmd).await,
        Command::State(cmd) => handle_state(&config, cmd.json).await,
        Command::History(cmd) => handle_history(&config, &cmd).await,
        Command::Dismiss(cmd) => handle_dismiss(&config, &cmd.identifier).await,
        Command::Clear => handle_clear(&config).await,
        Command::Config(cmd) => handle_config(&config, cmd),
    }
}

/// Open the state database and start the coordinator on it.
fn start_coordinator(config: &Config) -> anyhow::Result<CoordinatorHandle> {
    let path = config.database_path();
    let storage = Storage::open(&path)
        .with_context(|| format!("failed to open state database at {}", path.display()))?;
    Ok(Coordinator::new(Box::new(storage), Arc::new(SystemClock), config).spawn())
}

fn handle_scan(cmd: &ScanCommand) -> anyhow::Result<()> {
    let result = detector::scan(&cmd.text);

    if cmd.json {
        let output = serde_json::json!({
            "found": result.found,
            "unique": result.unique,
            "redacted": result.redacted,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    if result.is_empty() {
        println!("No email addresses found.");
        return Ok(());
    }

    println!("Found:    {}", result.found.join(", "));
    println!("Unique:   {}", result.unique.join(", "));
    println!("Redacted: {}", result.redacted);
    Ok(())
}

/// Relays detections while remembering the delivery tasks.
///
/// The CLI exits right after a single request, so it waits for these before
/// shutting down instead of dropping them.
#[derive(Debug)]
struct TrackedRelay {
    relay: Relay,
    pending: Mutex<Vec<JoinHandle<()>>>,
}

impl TrackedRelay {
    fn new(relay: Relay) -> Self {
        Self {
            relay,
            pending: Mutex::new(Vec::new()),
        }
    }

    async fn flush(&self) {
        let pending: Vec<_> = self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect();
        for task in pending {
            let _ = task.await;
        }
    }
}

impl DetectionSink for TrackedRelay {
    fn emit(&self, event: DetectionEvent) {
        let task = self.relay.relay_detection(event);
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(task);
    }
}

fn read_body(cmd: &SendCommand) -> anyhow::Result<String> {
    if let Some(prompt) = &cmd.prompt {
        let body = serde_json::json!({
            "action": "next",
            "messages": [{
                "author": {"role": "user"},
                "content": {"content_type": "text", "parts": [prompt]}
            }]
        });
        return Ok(body.to_string());
    }

    if let Some(path) = &cmd.body_file {
        return std::fs::read_to_string(path)
            .with_context(|| format!("failed to read body from {}", path.display()));
    }

    let mut body = String::new();
    std::io::stdin()
        .read_to_string(&mut body)
        .context("failed to read body from stdin")?;
    Ok(body)
}

async fn handle_send(config: &Config, cmd: SendCommand) -> anyhow::Result<()> {
    let body = read_body(&cmd)?;
    let coordinator = start_coordinator(config)?;

    let relay = Relay::new(Arc::new(coordinator.clone()));
    let _sync = relay.start_sync_loop(config.sync_interval()).await;

    let prompt: Arc<dyn ConsentPrompt> = match cmd.decision {
        Some(decision) => Arc::new(FixedPrompt::new(decision.into())),
        None => Arc::new(TerminalPrompt),
    };
    let transport: Arc<dyn Transport> = if cmd.dry_run {
        Arc::new(EchoTransport)
    } else {
        Arc::new(HttpTransport::new()?)
    };

    let sink = Arc::new(TrackedRelay::new(relay.clone()));
    let interceptor = Interceptor::new(
        &config.interception,
        transport,
        ConsentGate::new(prompt),
        sink.clone(),
        relay.subscribe_cache(),
        Arc::new(SystemClock),
    );

    let delivery = interceptor
        .dispatch(OutboundRequest::post(cmd.url, body))
        .await?;
    sink.flush().await;

    let response = match delivery {
        Delivery::Sent(response) => response,
        Delivery::Cancelled { identifiers } => {
            println!(
                "Request cancelled ({} address(es) flagged). Nothing was sent.",
                identifiers.len()
            );
            return Ok(());
        }
    };

    if cmd.dry_run {
        println!("Would send:");
    } else {
        println!("Status: {}", response.status);
    }
    println!("{}", response.body);
    Ok(())
}

async fn handle_state(config: &Config, json: bool) -> anyhow::Result<()> {
    let coordinator = start_coordinator(config)?;
    let state = coordinator.get_state().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&state)?);
        return Ok(());
    }

    println!("pmon state");
    println!("----------");
    println!("Database:      {}", config.database_path().display());
    println!("History:       {} detections", state.history.len());
    println!("Suppressions:  {} active", state.suppressions.len());
    for entry in &state.suppressions {
        println!(
            "  {}  (until {})",
            entry.identifier,
            entry.expires_at.format("%Y-%m-%d %H:%M UTC")
        );
    }
    Ok(())
}

async fn handle_history(config: &Config, cmd: &HistoryCommand) -> anyhow::Result<()> {
    let coordinator = start_coordinator(config)?;
    let state = coordinator.get_state().await?;
    let items: Vec<_> = state.history.into_iter().take(cmd.limit).collect();

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&items)?);
        return Ok(());
    }

    if items.is_empty() {
        println!("No detections recorded.");
        return Ok(());
    }

    for item in &items {
        println!(
            "{}  {}  {}",
            item.detected_at.format("%Y-%m-%d %H:%M:%S"),
            item.identifier,
            item.source_url
        );
        println!("    {}", item.context_preview);
    }
    Ok(())
}

async fn handle_dismiss(config: &Config, identifier: &str) -> anyhow::Result<()> {
    let coordinator = start_coordinator(config)?;
    let relay = Relay::new(Arc::new(coordinator));
    relay.relay_dismiss(identifier).await?;
    println!("Suppressed {identifier} for 24 hours.");
    Ok(())
}

async fn handle_clear(config: &Config) -> anyhow::Result<()> {
    let coordinator = start_coordinator(config)?;
    coordinator.clear_history().await?;
    println!("History cleared.");
    Ok(())
}

fn handle_config(config: &Config, cmd: ConfigCommand) -> anyhow::Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Storage]");
                println!("  Database path:      {}", config.database_path().display());
                println!();
                println!("[Interception]");
                for endpoint in &config.interception.endpoints {
                    println!("  Endpoint:           {endpoint}");
                }
                println!(
                    "  Preview length:     {}",
                    config.interception.preview_length
                );
                println!();
                println!("[Relay]");
                println!(
                    "  Sync interval (s):  {}",
                    config.relay.sync_interval_secs
                );
                println!();
                println!("[Coordinator]");
                println!(
                    "  Mailbox capacity:   {}",
                    config.coordinator.mailbox_capacity
                );
                println!(
                    "  Observer capacity:  {}",
                    config.coordinator.observer_capacity
                );
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => println!("Configuration error: {e}"),
            }
        }
    }
    Ok(())
}
