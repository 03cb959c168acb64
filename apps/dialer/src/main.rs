use std::{path::PathBuf, sync::Arc};

use anyhow::{anyhow, bail, Result};
use clap::Parser;
use client_core::{
    config::load_settings, CallApi, CallController, HttpCallApi, InsightsAnalyzer, PollOutcome,
    StatusSurface,
};
use tracing_subscriber::EnvFilter;

mod terminal;

use terminal::TerminalSurface;

#[derive(Parser, Debug)]
struct Args {
    /// Number to call, in any common US format.
    #[arg(long)]
    phone: String,
    #[arg(long)]
    server_url: Option<String>,
    /// Settings file, defaults to ./dialer.toml when present.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let mut settings = load_settings(args.config.as_deref())?;
    if let Some(server_url) = args.server_url {
        settings.server_url = server_url;
    }

    let filter = EnvFilter::try_new(&settings.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let api: Arc<dyn CallApi> = Arc::new(HttpCallApi::new(settings.server_url.clone()));
    let surface = Arc::new(TerminalSurface::new(settings.server_url.clone()));
    let surface_dyn: Arc<dyn StatusSurface> = surface.clone();
    let controller = CallController::new(api, surface_dyn, settings.poll_policy());

    let call = controller
        .initiate_call(&args.phone)
        .await
        .map_err(|err| anyhow!("call was not placed: {}", err.user_message()))?;

    let cancel = call.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    });

    let report = call.wait().await?;
    match report.outcome {
        PollOutcome::AnalysisComplete { .. } => {
            if surface.insights_url().is_none() {
                bail!("analysis finished without an insights location");
            }
            if let Some(analysis) = &report.analysis {
                let summary = InsightsAnalyzer::new()?.summarize(analysis);
                print!("{summary}");
            }
            Ok(())
        }
        PollOutcome::TimedOut => bail!(
            "no terminal call state after {} status checks",
            report.attempts
        ),
        PollOutcome::Cancelled => {
            println!(
                "Stopped monitoring call {} after {} status checks",
                report.session.call_sid(),
                report.attempts
            );
            Ok(())
        }
    }
}
