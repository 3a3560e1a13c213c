//! Interactive queue follower.
//!
//! Subscribes to organizations over WebSocket, falls back to REST polling
//! while disconnected and prints every update.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin navbat-client -- --org clinic-1 --phone +998901234567
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, TimeZone};
use clap::Parser;
use navbat_client::{
    BackoffConfig, ChannelSubscription, ClientConfig, QueueBoard, QueueClient, QueueUpdate,
    SnapshotTarget,
};
use navbat_server::domain::{OrganizationId, PhoneNumber, QueueItem};
use navbat_shared::logger::setup_logger;
use parking_lot::Mutex;
use rustyline::{DefaultEditor, error::ReadlineError};
use tokio::sync::{broadcast, mpsc};

#[derive(Debug, Parser)]
#[command(name = "navbat-client")]
#[command(about = "Follow Navbat queues in real time", long_about = None)]
struct Args {
    /// Queue server base URL
    #[arg(short, long, env = "NAVBAT_SERVER_URL", default_value = "http://127.0.0.1:8080")]
    server: String,

    /// Access token for the WebSocket endpoint
    #[arg(short, long, env = "NAVBAT_TOKEN")]
    token: Option<String>,

    /// Follow the entries of this phone number
    #[arg(short, long, env = "NAVBAT_PHONE")]
    phone: Option<String>,

    /// Organizations to subscribe to at startup
    #[arg(short, long = "org", env = "NAVBAT_ORGS", value_delimiter = ',')]
    orgs: Vec<String>,

    /// Fallback polling interval in seconds
    #[arg(
        long,
        env = "NAVBAT_POLL_INTERVAL_SECS",
        value_parser = clap::value_parser!(u64).range(1..),
        default_value_t = 5,
    )]
    poll_interval_secs: u64,

    /// Reconnect when the server is silent for this many seconds
    #[arg(
        long,
        env = "NAVBAT_IDLE_TIMEOUT_SECS",
        value_parser = clap::value_parser!(u64).range(1..),
        default_value_t = 60,
    )]
    idle_timeout_secs: u64,

    /// Seconds between application PINGs
    #[arg(
        long,
        env = "NAVBAT_HEARTBEAT_INTERVAL_SECS",
        value_parser = clap::value_parser!(u64).range(1..),
        default_value_t = 25,
    )]
    heartbeat_interval_secs: u64,

    /// First reconnection delay in milliseconds
    #[arg(
        long,
        value_parser = clap::value_parser!(u64).range(1..),
        default_value_t = 1000,
    )]
    backoff_initial_ms: u64,

    /// Upper bound of the reconnection delay in seconds
    #[arg(long, default_value_t = 30)]
    backoff_max_secs: u64,

    #[arg(long, default_value_t = 2.0)]
    backoff_multiplier: f64,

    /// Random spread of each delay, as a ratio (0.2 = ±20%)
    #[arg(long, value_parser = parse_ratio, default_value_t = 0.2)]
    backoff_jitter: f64,
}

fn parse_ratio(value: &str) -> Result<f64, String> {
    let ratio: f64 = value.parse().map_err(|e| format!("{e}"))?;
    if (0.0..=1.0).contains(&ratio) {
        Ok(ratio)
    } else {
        Err(format!("{value} is not between 0 and 1"))
    }
}

impl Args {
    fn config(&self) -> ClientConfig {
        ClientConfig {
            server_url: self.server.clone(),
            token: self.token.clone(),
            backoff: BackoffConfig {
                initial: Duration::from_millis(self.backoff_initial_ms),
                multiplier: self.backoff_multiplier,
                max: Duration::from_secs(self.backoff_max_secs),
                jitter: self.backoff_jitter,
            },
            idle_timeout: Duration::from_secs(self.idle_timeout_secs),
            heartbeat_interval: Duration::from_secs(self.heartbeat_interval_secs),
            poll_interval: Duration::from_secs(self.poll_interval_secs),
            ..ClientConfig::default()
        }
    }
}

enum Command {
    Subscribe(OrganizationId),
    Unsubscribe(OrganizationId),
    State,
    Board(Option<OrganizationId>),
    Help,
    Quit,
}

fn parse_command(line: &str) -> Result<Command, String> {
    let mut parts = line.split_whitespace();
    let name = parts.next().unwrap_or_default();
    let org = |arg: Option<&str>| -> Result<OrganizationId, String> {
        let arg = arg.ok_or_else(|| format!("usage: {name} <org>"))?;
        OrganizationId::try_from(arg).map_err(|e| e.to_string())
    };

    match name {
        "sub" => org(parts.next()).map(Command::Subscribe),
        "unsub" => org(parts.next()).map(Command::Unsubscribe),
        "state" => Ok(Command::State),
        "board" => match parts.next() {
            Some(arg) => org(Some(arg)).map(|id| Command::Board(Some(id))),
            None => Ok(Command::Board(None)),
        },
        "help" | "?" => Ok(Command::Help),
        "quit" | "exit" => Ok(Command::Quit),
        other => Err(format!("unknown command: {other} (try `help`)")),
    }
}

fn format_time(millis: i64) -> String {
    Local
        .timestamp_millis_opt(millis)
        .single()
        .map(|t| t.format("%H:%M:%S").to_string())
        .unwrap_or_else(|| millis.to_string())
}

fn format_item(item: &QueueItem) -> String {
    let position = item
        .position
        .map(|p| format!("#{p}"))
        .unwrap_or_else(|| "-".to_string());
    format!(
        "{} [{}] ticket {} pos {} ~{}min ({} joined {})",
        item.id,
        item.status,
        item.number,
        position,
        item.waiting_time_estimate_minutes,
        item.user_phone,
        format_time(item.joined_at.value()),
    )
}

fn print_update(update: &QueueUpdate) {
    match update {
        QueueUpdate::Event(event) => {
            println!(
                "[{}] {} {}",
                event.organization_id(),
                event.event_type(),
                format_item(event.item())
            );
        }
        QueueUpdate::Snapshot { target, items } => {
            println!("[{target}] snapshot: {} item(s)", items.len());
        }
    }
}

fn print_help() {
    println!("Commands:");
    println!("  sub <org>      subscribe to an organization's queue");
    println!("  unsub <org>    drop the subscription");
    println!("  state          show the connection state and subscriptions");
    println!("  board [org]    show the local view of followed queues");
    println!("  quit           exit");
}

/// Read lines on a blocking thread and hand them to the async side.
fn spawn_readline(lines: mpsc::Sender<String>) {
    std::thread::spawn(move || {
        let mut editor = match DefaultEditor::new() {
            Ok(editor) => editor,
            Err(e) => {
                eprintln!("Failed to start line editor: {e}");
                return;
            }
        };
        loop {
            match editor.readline("navbat> ") {
                Ok(line) => {
                    let line = line.trim().to_string();
                    if line.is_empty() {
                        continue;
                    }
                    let _ = editor.add_history_entry(line.as_str());
                    if lines.blocking_send(line).is_err() {
                        break;
                    }
                }
                Err(ReadlineError::Interrupted | ReadlineError::Eof) => {
                    let _ = lines.blocking_send("quit".to_string());
                    break;
                }
                Err(e) => {
                    eprintln!("Readline error: {e}");
                    let _ = lines.blocking_send("quit".to_string());
                    break;
                }
            }
        }
    });
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    setup_logger(env!("CARGO_BIN_NAME"), "warn");

    let mut initial = Vec::new();
    for org in &args.orgs {
        match OrganizationId::try_from(org.as_str()) {
            Ok(id) => initial.push(id),
            Err(e) => {
                eprintln!("Invalid organization {org:?}: {e}");
                std::process::exit(2);
            }
        }
    }
    let phone = match args.phone.clone().map(PhoneNumber::new).transpose() {
        Ok(phone) => phone,
        Err(e) => {
            eprintln!("Invalid phone number: {e}");
            std::process::exit(2);
        }
    };

    let mut targets: Vec<SnapshotTarget> = initial
        .iter()
        .cloned()
        .map(SnapshotTarget::Organization)
        .collect();
    targets.extend(phone.map(SnapshotTarget::Phone));

    let client = match QueueClient::start(&args.config(), targets) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("Failed to start client: {e}");
            std::process::exit(1);
        }
    };

    let mut subscriptions: HashMap<OrganizationId, ChannelSubscription> = initial
        .into_iter()
        .map(|id| (id.clone(), client.subscribe(id)))
        .collect();

    let board = Arc::new(Mutex::new(QueueBoard::new()));
    let mut updates = client.feed().subscribe();
    let printer_board = board.clone();
    let printer = tokio::spawn(async move {
        loop {
            match updates.recv().await {
                Ok(update) => {
                    print_update(&update);
                    printer_board.lock().apply(&update);
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    eprintln!("(skipped {n} updates)");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    let mut state = client.manager().watch_state();
    let state_printer = tokio::spawn(async move {
        while state.changed().await.is_ok() {
            let current = *state.borrow_and_update();
            println!("* connection {current}");
        }
    });

    let (line_tx, mut line_rx) = mpsc::channel(16);
    spawn_readline(line_tx);
    print_help();

    while let Some(line) = line_rx.recv().await {
        match parse_command(&line) {
            Ok(Command::Subscribe(id)) => {
                if subscriptions.contains_key(&id) {
                    println!("already subscribed to {id}");
                } else {
                    let guard = client.subscribe(id.clone());
                    subscriptions.insert(id.clone(), guard);
                    println!("subscribed to {id}");
                }
            }
            Ok(Command::Unsubscribe(id)) => match subscriptions.remove(&id) {
                Some(_) => println!("unsubscribed from {id}"),
                None => println!("not subscribed to {id}"),
            },
            Ok(Command::State) => {
                let mut channels: Vec<_> = subscriptions.keys().map(ToString::to_string).collect();
                channels.sort();
                println!("state: {}", client.state());
                println!("channels: {}", channels.join(", "));
            }
            Ok(Command::Board(filter)) => {
                let board = board.lock();
                let mut orgs: Vec<OrganizationId> = match filter {
                    Some(id) => vec![id],
                    None => subscriptions.keys().cloned().collect(),
                };
                orgs.sort();
                for org in orgs {
                    let items = board.organization(&org);
                    println!("{org}: {} active", items.len());
                    for item in items {
                        println!("  {}", format_item(&item));
                    }
                }
            }
            Ok(Command::Help) => print_help(),
            Ok(Command::Quit) => break,
            Err(message) => println!("{message}"),
        }
    }

    drop(subscriptions);
    client.shutdown().await;
    printer.abort();
    state_printer.abort();
}
