//! Roombot - conversational front end for a shared-room chores service
//!
//! Each user's dialog is a stack of flows advanced by a pure transition
//! function; a per-user runtime executes the resulting backend calls,
//! persists the stack and renders the top frame.

mod backend;
mod config;
mod console;
mod db;
mod dialog;
mod flows;
mod runtime;

use backend::{Backend, HttpBackend, InMemoryBackend, NewTask, RetryingBackend};
use chrono::{NaiveDate, Utc};
use config::Config;
use console::ConsoleRenderer;
use db::{stale_cutoff, Database};
use runtime::{DatabaseStore, SessionManager};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "roombot=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let config = Config::from_env();
    let ttl = chrono::Duration::from_std(config.session_ttl)?;

    // Ensure database directory exists
    if let Some(parent) = config.db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    tracing::info!(path = %config.db_path.display(), "Opening database");
    let db = Database::open(&config.db_path)?;

    match stale_cutoff(Utc::now(), ttl) {
        Some(cutoff) => {
            let pruned = db.prune_stale_sessions(cutoff)?;
            tracing::info!(pruned, remaining = db.session_count()?, "Pruned stale sessions");
        }
        None => {
            tracing::warn!(ttl_secs = ttl.num_seconds(), "Session TTL too large, nothing pruned");
        }
    }

    let inner: Arc<dyn Backend> = match &config.api_url {
        Some(url) => {
            tracing::info!(%url, "Using HTTP backend");
            Arc::new(HttpBackend::new(url, config.api_secret.clone())?)
        }
        None => {
            tracing::warn!("ROOMBOT_API_URL not set, using an in-memory demo backend");
            Arc::new(demo_backend(config.console_user))
        }
    };
    let backend = Arc::new(RetryingBackend::new(
        inner,
        config.backend_timeout,
        config.backend_attempts,
    ));

    let renderer = Arc::new(ConsoleRenderer::new());
    let manager = SessionManager::new(
        Arc::new(DatabaseStore::new(db, ttl)),
        backend,
        renderer.clone(),
        config.idle_timeout,
    );

    println!("Type /start to begin, /quit to exit.");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else { break };
        if line.trim() == "/quit" {
            break;
        }
        if line.trim().is_empty() {
            continue;
        }
        manager.send(config.console_user, renderer.parse(&line)).await?;
    }

    manager.shutdown().await;
    Ok(())
}

/// A small world for trying the bot without a backend
fn demo_backend(user_id: i64) -> InMemoryBackend {
    let backend = InMemoryBackend::new();
    let roommate = user_id + 1;
    backend.add_user(user_id, "Anna", Some("anna_k"));
    backend.add_user(roommate, "Boris", Some("boris_m"));
    backend.add_user(roommate + 1, "Clara", Some("clara_c"));
    backend.add_room("Flat 9", &[user_id, roommate]);
    let order = backend.add_order(user_id, &[user_id, roommate]);
    let start_date = NaiveDate::from_ymd_opt(2030, 1, 1).and_then(|d| d.and_hms_opt(8, 0, 0));
    if let Some(start_date) = start_date {
        backend.add_task(
            user_id,
            &NewTask {
                name: "Trash duty".to_string(),
                description: None,
                start_date,
                period: 7,
                order_id: order,
            },
        );
    }
    backend
}
