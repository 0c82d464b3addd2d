//! CLI for gmsec
//!
//! Subcommands:
//! - `server`: run the WebSocket bus server
//! - `ping`: connect to a bus and time a request/reply round trip

use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;
use gmsec::broker::{Broker, Bus};
use gmsec::config::{Config, load_settings, options};
use gmsec::connection::{Connection, REQUEST_REPUBLISH_NEVER};
use gmsec::message::{MessageKind, ResponseStatus};
use gmsec::transport::start_websocket_server;
use gmsec::utils::logging;
use gmsec::Message;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "gmsec")]
enum Command {
    /// Start the WebSocket bus server
    Server,
    /// Send a request to ourselves over a bus server and print the reply
    Ping {
        /// WebSocket URL of the bus server
        #[arg(long, default_value = "ws://127.0.0.1:9100")]
        url: String,
        /// Reply timeout in milliseconds
        #[arg(long, default_value_t = 5000)]
        timeout_ms: i64,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    let cmd = Command::parse();

    let (what, result) = match cmd {
        Command::Server => ("Server", run_server().await),
        Command::Ping { url, timeout_ms } => {
            logging::init("info");
            ("Ping", run_ping(&url, timeout_ms).await)
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            // No-op if the command already set up logging.
            logging::init("info");
            error!("{} failed: {}", what, e);
            ExitCode::FAILURE
        }
    }
}

async fn run_server() -> Result<(), Box<dyn std::error::Error>> {
    let settings = load_settings()?;
    logging::init(&settings.logging.level);

    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    let bus = Bus::with_broker(Broker::from_settings(&settings.bus)?);

    tokio::select! {
        result = start_websocket_server(addr, bus, settings.clone()) => {
            result?;
            return Err("WebSocket server exited unexpectedly".into());
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received. Exiting gracefully.");
        }
    }

    Ok(())
}

async fn run_ping(url: &str, timeout_ms: i64) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_pairs([(options::MW_ID, "websocket"), (options::MW_SERVER, url)])?;
    let conn = Connection::new(&config)?;
    conn.connect().await?;

    conn.subscribe_with_callback("GMSEC.PING.REQ", |conn, request| {
        let mut reply = Message::new();
        reply.set_kind(MessageKind::Reply);
        reply.set_response_status(ResponseStatus::SuccessfulCompletion);
        if let Err(e) = reply
            .set_subject("GMSEC.PING.RESP")
            .and_then(|_| conn.reply(request, &reply))
        {
            error!("Could not answer ping: {}", e);
        }
    })?;
    conn.subscribe("GMSEC.PING.RESP")?;
    conn.start_auto_dispatch()?;

    let request = Message::with_subject("GMSEC.PING.REQ", MessageKind::Request)?;
    let started = Instant::now();
    let reply = conn
        .request(&request, timeout_ms, REQUEST_REPUBLISH_NEVER)
        .await?;

    conn.disconnect().await?;

    let reply = reply.ok_or_else(|| format!("No reply within {timeout_ms} ms"))?;
    info!("Reply after {:?}", started.elapsed());
    println!("{}", reply.to_xml());
    Ok(())
}
