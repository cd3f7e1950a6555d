#![deny(clippy::implicit_return)]
#![allow(clippy::needless_return)]

mod application;
mod configuration;
mod domain;
mod infrastructure;

use std::env;
use std::process;

use anyhow::Error;
use anyhow::Result;
use tokio::sync::mpsc;
use tokio::task;
use yansi::Paint;

use crate::application::cli;
use crate::application::repl;
use crate::configuration::Config;
use crate::configuration::ConfigKey;
use crate::domain::models::Action;
use crate::domain::models::SessionEvent;
use crate::domain::models::Story;
use crate::domain::services::SessionController;
use crate::domain::services::SessionService;
use crate::infrastructure::backends::BackendManager;

fn handle_error(err: Error) {
    eprintln!(
            "{}",
            Paint::red(format!(
                "Oh no! TaleMachine has failed with the following app version and error.\n\nVersion: {}\nCommit: {}\nError: {}",
                env!("CARGO_PKG_VERSION"),
                env!("VERGEN_GIT_DESCRIBE"),
                err
            ))
        );

    let backtrace = err.backtrace();
    if backtrace.to_string() == "disabled backtrace" {
        let args = env::args().collect::<Vec<String>>().join(" ");
        eprintln!("\nRunning the following can help explain further what the issue is:");
        eprintln!("\nRUST_BACKTRACE=1 {args}");
    } else {
        eprintln!("\n{}", backtrace);
    }

    process::exit(1);
}

async fn run() -> Result<()> {
    let story = Story::from_config()?;
    let backend = BackendManager::get()?;

    if let Err(health_err) = backend.health_check().await {
        tracing::warn!(error = ?health_err, "Backend health check failed");
        eprintln!(
            "{}",
            Paint::yellow(format!(
                "Warning: {health_err} ({}). Messages will fail until it is reachable.",
                Config::get(ConfigKey::BackendURL)
            ))
        );
    }

    let (action_tx, mut action_rx) = mpsc::unbounded_channel::<Action>();
    let (event_tx, event_rx) = mpsc::unbounded_channel::<SessionEvent>();

    let mut controller = SessionController::new(backend, story.clone(), event_tx.clone());
    let thread_id = Config::get(ConfigKey::ThreadID);
    if !thread_id.is_empty() {
        controller = controller.with_thread_id(&thread_id);
    }

    let mut background_futures = task::JoinSet::new();
    background_futures.spawn(async move {
        return SessionService::start(controller, event_tx, &mut action_rx).await;
    });

    // The REPL ends once the service closes or drops its event senders, so
    // every queued event is printed before the service result is read.
    let repl_res = repl::start(story, action_tx, event_rx).await;
    if repl_res.is_err() {
        background_futures.shutdown().await;
        return repl_res;
    }

    while let Some(res) = background_futures.join_next().await {
        res??;
    }

    return Ok(());
}

#[tokio::main]
async fn main() {
    std::panic::set_hook(Box::new(|panic_info| {
        better_panic::Settings::auto().create_panic_handler()(panic_info);
    }));

    let file_appender = tracing_appender::rolling::never(cli::log_dir(), "debug.log");
    let (writer, _guard) = tracing_appender::non_blocking(file_appender);
    if env::var("RUST_LOG")
        .unwrap_or_else(|_| return "".to_string())
        .contains("talemachine")
    {
        tracing_subscriber::fmt()
            .json()
            .with_max_level(tracing::Level::DEBUG)
            .with_writer(writer)
            .init();
    }

    let ready_res = cli::parse().await;
    let ready = match ready_res {
        Ok(ready) => ready,
        Err(ready_err) => {
            handle_error(ready_err);
            return;
        }
    };
    if !ready {
        process::exit(0);
    }

    if let Err(err) = run().await {
        handle_error(err);
    }

    process::exit(0);
}
