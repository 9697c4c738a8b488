//! Terminal dashboard that follows a RailGate server.
//!
//! Type `hide` or `show` (then Enter) to suspend and resume updates, `quit`
//! to exit. Run with `--logout` to forget the saved session.

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{oneshot, watch};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use railgate::client::{
    run_agent, HttpTransport, RunOptions, Session, SessionStore, SyncAgent, TerminalSink,
};
use railgate::ClientConfig;

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = match ClientConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            eprintln!("Optional: RAILGATE_SERVER_URL (default: http://127.0.0.1:3000)");
            eprintln!("Optional: RAILGATE_POLL_SECS, RAILGATE_TIMEOUT_MS");
            eprintln!("Optional: RAILGATE_SESSION_PATH, RAILGATE_NO_RECONNECT");
            eprintln!("First run: RAILGATE_USERNAME and RAILGATE_LOCATION");
            std::process::exit(1);
        }
    };

    let sessions = SessionStore::new(&config.session_path);
    if std::env::args().any(|a| a == "--logout") {
        match sessions.clear() {
            Ok(()) => println!("Signed out."),
            Err(e) => {
                eprintln!("Failed to clear session: {}", e);
                std::process::exit(1);
            }
        }
        return;
    }

    let transport = HttpTransport::new(&config.server_url).with_timeout(config.request_timeout);

    let session = match sessions.load() {
        Ok(Some(session)) => session,
        Ok(None) => match (&config.username, &config.location) {
            (Some(username), Some(location)) => match transport.login(username, location).await {
                Ok(login) => {
                    let session = Session {
                        username: login.username,
                        location: login.location,
                        token: login.token,
                    };
                    if let Err(e) = sessions.save(&session) {
                        tracing::warn!("Could not save session: {}", e);
                    }
                    session
                }
                Err(e) => {
                    eprintln!("{}", e);
                    std::process::exit(1);
                }
            },
            _ => {
                eprintln!("Not signed in. Set RAILGATE_USERNAME and RAILGATE_LOCATION.");
                std::process::exit(1);
            }
        },
        Err(e) => {
            eprintln!("Could not read session at {}: {}", sessions.path().display(), e);
            std::process::exit(1);
        }
    };

    tracing::info!(
        "Watching {} as {} ({})",
        config.server_url,
        session.username,
        session.location
    );

    let (visibility, visibility_rx) = watch::channel(true);
    let (stop, shutdown) = oneshot::channel();

    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            match line.trim() {
                "hide" => {
                    let _ = visibility.send(false);
                }
                "show" => {
                    let _ = visibility.send(true);
                }
                "quit" => break,
                _ => {}
            }
        }
        let _ = stop.send(());
    });

    let mut agent = SyncAgent::new();
    let mut sink = TerminalSink::new(std::io::stdout());
    let options = RunOptions {
        poll_interval: config.poll_interval,
        reconnect: config.reconnect,
    };
    run_agent(&mut agent, &transport, options, visibility_rx, &mut sink, shutdown).await;
}
