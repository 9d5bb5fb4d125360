//! Sessions management commands

use anyhow::{Result, bail};
use clap::{Args, Subcommand};
use comfy_table::{Cell, Color, ContentArrangement, Table, presets::UTF8_FULL_CONDENSED};
use courier_core::{AttemptStatus, DeliveryRecord, SessionSnapshot, SessionState};

use crate::client::CourierClient;
use crate::config::ConfigLoader;

/// Sessions management arguments
#[derive(Args, Debug)]
pub struct SessionsArgs {
    /// Owner id sent with every request
    #[arg(long, env = "COURIER_OWNER", global = true, default_value = "default")]
    pub owner: String,

    /// Server URL (defaults to the configured host and port)
    #[arg(long, env = "COURIER_URL", global = true)]
    pub url: Option<String>,

    #[command(subcommand)]
    pub command: SessionsCommands,
}

/// Sessions subcommands
#[derive(Subcommand, Debug)]
pub enum SessionsCommands {
    /// List your sessions
    List,
    /// Create a session and start pairing
    Create {
        /// Display name
        name: String,
    },
    /// Show one session, its pairing code and recent deliveries
    Show {
        /// Session ID
        session_id: String,
    },
    /// Log out and remove a session
    Delete {
        /// Session ID
        session_id: String,
    },
    /// Restart a session's connection
    Reconnect {
        /// Session ID
        session_id: String,
    },
    /// Deliver one message immediately
    Send {
        session_id: String,
        destination: String,
        message: String,
    },
    /// Queue a message for one or more destinations
    Enqueue {
        session_id: String,
        /// Message text
        #[arg(short, long)]
        message: String,
        /// Destination addresses
        #[arg(required = true)]
        destinations: Vec<String>,
    },
}

/// Run sessions command
pub async fn run(args: SessionsArgs) -> Result<()> {
    let base_url = match args.url {
        Some(url) => url,
        None => ConfigLoader::load()?.server.base_url(),
    };
    let client = CourierClient::new(base_url, args.owner);

    match args.command {
        SessionsCommands::List => list_sessions(&client).await,
        SessionsCommands::Create { name } => create_session(&client, &name).await,
        SessionsCommands::Show { session_id } => show_session(&client, &session_id).await,
        SessionsCommands::Delete { session_id } => {
            client.delete_session(&session_id).await?;
            println!("Session {} deleted", session_id);
            Ok(())
        }
        SessionsCommands::Reconnect { session_id } => {
            let session = client.reconnect_session(&session_id).await?;
            println!("Session {} is {}", session.id, session.state);
            Ok(())
        }
        SessionsCommands::Send {
            session_id,
            destination,
            message,
        } => {
            let record = client
                .send_message(&session_id, &destination, &message)
                .await?;
            println!("Sent to {} ({})", record.destination, record.message_id);
            Ok(())
        }
        SessionsCommands::Enqueue {
            session_id,
            message,
            destinations,
        } => {
            check_destinations(&destinations)?;
            let response = client.enqueue(&session_id, destinations, &message).await?;
            println!(
                "Queued {} message(s), {} pending",
                response.queued, response.queue_length
            );
            Ok(())
        }
    }
}

async fn list_sessions(client: &CourierClient) -> Result<()> {
    let sessions = client.list_sessions().await?;
    if sessions.is_empty() {
        println!("No sessions");
        return Ok(());
    }
    println!("{}", sessions_table(&sessions));
    Ok(())
}

fn sessions_table(sessions: &[SessionSnapshot]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("ID").fg(Color::Cyan),
        Cell::new("Name").fg(Color::Cyan),
        Cell::new("State").fg(Color::Cyan),
        Cell::new("Queued").fg(Color::Cyan),
        Cell::new("Sent").fg(Color::Cyan),
        Cell::new("Failed").fg(Color::Cyan),
    ]);

    for session in sessions {
        table.add_row(vec![
            Cell::new(&session.id),
            Cell::new(&session.name),
            Cell::new(session.state).fg(state_color(session.state)),
            Cell::new(session.queue_length),
            Cell::new(session.messages_sent),
            Cell::new(session.messages_failed),
        ]);
    }
    table
}

fn state_color(state: SessionState) -> Color {
    match state {
        SessionState::Connected => Color::Green,
        SessionState::WaitingForPairing | SessionState::Initializing => Color::Yellow,
        SessionState::Disconnected => Color::DarkYellow,
        SessionState::LoggedOut | SessionState::Error => Color::Red,
    }
}

async fn create_session(client: &CourierClient, name: &str) -> Result<()> {
    let session = client.create_session(name).await?;
    println!("Created session {} ({})", session.id, session.name);
    println!("Run `courier sessions show {}` for the pairing code", session.id);
    Ok(())
}

async fn show_session(client: &CourierClient, session_id: &str) -> Result<()> {
    let session = client.get_session(session_id).await?;

    println!("Session: {}", session.name);
    println!("ID: {}", session.id);
    println!("State: {}", session.state);
    println!("Created: {}", session.created_at);
    println!(
        "Messages: {} sent, {} failed, {} queued",
        session.messages_sent, session.messages_failed, session.queue_length
    );
    if let Some(error) = &session.last_error {
        println!("Last error: {}", error);
    }

    if session.state == SessionState::WaitingForPairing {
        match client.pairing_code(session_id).await? {
            Some(code) => println!("Pairing code: {}", code),
            None => println!("Pairing code not yet available"),
        }
    }

    let deliveries = client.deliveries(session_id).await?;
    if !deliveries.is_empty() {
        println!();
        println!("Recent deliveries:");
        for record in &deliveries {
            println!("  {}", describe_delivery(record));
        }
    }
    Ok(())
}

fn describe_delivery(record: &DeliveryRecord) -> String {
    let outcome = match &record.status {
        AttemptStatus::Sent => "sent".to_string(),
        AttemptStatus::Failed { error } => format!("failed: {}", error),
        AttemptStatus::Pending => "pending".to_string(),
    };
    let via = if record.queued { "queue" } else { "direct" };
    format!(
        "{} {} [{}] {}",
        record.attempted_at.format("%H:%M:%S"),
        record.destination,
        via,
        outcome
    )
}

/// Reject a destination list with blank entries before hitting the server
fn check_destinations(destinations: &[String]) -> Result<()> {
    if let Some(blank) = destinations.iter().position(|d| d.trim().is_empty()) {
        bail!("destination #{} is empty", blank + 1);
    }
    Ok(())
}
