mod cli;
mod config;
mod errors;
mod logging;
mod wiring;

use std::net::SocketAddr;
use std::process::ExitCode;
use std::time::Duration;

use chrono::{DateTime, Utc};
use clap::Parser;
use tracing::{error, info, warn};

use cli::{Cli, Command};
use config::AppConfig;
use errors::RuntimeError;
use reviewbot_model::MergeRequestState;
use reviewbot_provider::MergeRequestFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(&cli.log_level);

    let cfg = match AppConfig::load(&cli.config) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("configuration error: {e}");
            return ExitCode::from(1);
        }
    };

    match run(cfg, cli.command).await {
        Ok(()) => ExitCode::from(0),
        Err(RuntimeError::RefusedClosedMergeRequest(project_id, iid)) => {
            eprintln!("refusing to review {project_id}!{iid}: closed or merged, pass --force to override");
            ExitCode::from(2)
        }
        Err(e) => {
            error!(error = %e, "reviewbot exited with a runtime error");
            ExitCode::from(2)
        }
    }
}

async fn run(cfg: AppConfig, command: Command) -> Result<(), RuntimeError> {
    let wired = wiring::build(&cfg)?;

    match command {
        Command::Run => serve(&cfg, wired).await,
        Command::Poll { project_id, interval } => poll(wired, project_id, interval).await,
        Command::Review { project_id, iid, force } => review_once(wired, project_id, iid, force).await,
    }
}

async fn serve(cfg: &AppConfig, wired: wiring::Wired) -> Result<(), RuntimeError> {
    let state = reviewbot_server::AppState::new(
        wired.provider_kind,
        wired.webhook_secret,
        wired.bot_username,
        wired.runner,
        wired.table,
        cfg.agent.is_test,
    );
    let app = reviewbot_server::router(state, &cfg.server.webhook_path_prefix);

    let addr: SocketAddr = cfg
        .server
        .bind_addr
        .parse()
        .map_err(|_| errors::ConfigError::Invalid(format!("invalid server.bind_addr '{}'", cfg.server.bind_addr)))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| RuntimeError::Bind(addr.to_string(), e))?;
    info!(%addr, "listening for webhooks");

    axum::serve(listener, app).await.map_err(RuntimeError::Server)
}

async fn poll(wired: wiring::Wired, project_id: String, interval: u64) -> Result<(), RuntimeError> {
    info!(%project_id, interval, "starting poll loop");
    let mut ticker = tokio::time::interval(Duration::from_secs(interval.max(1)));
    let mut since: Option<DateTime<Utc>> = None;

    loop {
        ticker.tick().await;
        let tick_started_at = Utc::now();
        let updated = match since {
            None => {
                wired
                    .provider
                    .list_merge_requests(
                        &project_id,
                        &MergeRequestFilter { state: Some(MergeRequestState::Open), ..Default::default() },
                    )
                    .await?
            }
            Some(since) => wired.provider.get_merge_request_updates(&project_id, since).await?,
        };
        since = Some(tick_started_at);

        for mr in updated {
            if !mr.state.accepts_automatic_review() {
                continue;
            }
            match wired.runner.run(&wired.table, &project_id, mr.iid).await {
                Ok(summary) => info!(iid = mr.iid, ?summary, "poll review completed"),
                Err(e) => warn!(iid = mr.iid, error = %e, "poll review failed"),
            }
        }
    }
}

async fn review_once(wired: wiring::Wired, project_id: String, iid: u64, force: bool) -> Result<(), RuntimeError> {
    let mr = wired.provider.get_merge_request(&project_id, iid).await?;
    if !mr.state.accepts_automatic_review() && !force {
        return Err(RuntimeError::RefusedClosedMergeRequest(project_id, iid));
    }

    let summary = wired.runner.run(&wired.table, &project_id, iid).await?;
    println!("{summary:#?}");
    Ok(())
}
