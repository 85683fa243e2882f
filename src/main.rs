//! Binary entrypoint for the gallery rotator.
//!
//! Wires the library tasks together and drives them from a line-oriented
//! console on stdin; presentation output goes through `tracing`.

use std::io::{self, BufRead, IsTerminal};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use clap::{ArgAction, Parser};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{Level, info, warn};
use tracing_subscriber::{EnvFilter, fmt};

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

use gallery_rotator::config::Configuration;
use gallery_rotator::events::{Command, ModeState};
use gallery_rotator::mode::ModeController;
use gallery_rotator::presentation::{self, ConsoleSurface};
use gallery_rotator::slots::VisibleSlots;
use gallery_rotator::tasks::controls::ParseCommandError;
use gallery_rotator::tasks::fetcher::{CandidateFetcher, ItunesSearch};
use gallery_rotator::tasks::refresh::RefreshCoordinator;
use gallery_rotator::{candidates, tasks};

#[derive(Debug, Parser)]
#[command(
    name = "gallery-rotator",
    version,
    about = "Search-driven cover gallery with a pausable background rotation"
)]
struct Cli {
    /// Path to YAML config file (defaults apply when omitted)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Override the startup search query
    #[arg(long, value_name = "TEXT")]
    query: Option<String>,

    /// Override the delay between substitutions (e.g. "2s", "500ms")
    #[arg(long, value_name = "DURATION", value_parser = humantime::parse_duration)]
    interval: Option<Duration>,

    /// Deterministic seed for slot selection
    #[arg(long, value_name = "SEED")]
    seed: Option<u64>,

    /// Start with the rotation paused
    #[arg(long)]
    paused: bool,

    /// Increase log verbosity (repeatable)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn apply_overrides(&self, mut cfg: Configuration) -> Configuration {
        if let Some(query) = &self.query {
            cfg.default_query = query.clone();
        }
        if let Some(interval) = self.interval {
            cfg.rotation.interval = interval;
        }
        if self.seed.is_some() {
            cfg.rotation.seed = self.seed;
        }
        cfg
    }
}

fn init_tracing(verbosity: u8) -> Result<()> {
    // map -v to log level
    let level = match verbosity {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let filter = EnvFilter::from_default_env()
        .add_directive(format!("gallery_rotator={level}").parse()?)
        .add_directive("hyper=warn".parse()?)
        .add_directive("reqwest=warn".parse()?);
    fmt().with_env_filter(filter).with_target(false).compact().init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose)?;

    let cfg = match &cli.config {
        Some(path) => Configuration::from_yaml_file(path)
            .with_context(|| format!("failed to load configuration from {}", path.display()))?,
        None => Configuration::default(),
    };
    let cfg = cli
        .apply_overrides(cfg)
        .validated()
        .context("invalid configuration values")?;
    info!("configuration:\n{cfg:#?}");

    // Foreground presentation thread owns the surface; everything else posts to it.
    let (ui, ui_rx) = presentation::channel();
    let foreground = presentation::spawn_foreground(ui_rx, ConsoleSurface::new())
        .context("failed to start presentation thread")?;

    let initial_mode = if cli.paused {
        ModeState::Paused
    } else {
        ModeState::Running
    };
    let mode = ModeController::new(initial_mode, ui.clone());
    mode.set(initial_mode);
    let slots = VisibleSlots::new();
    let (candidates_tx, candidates_rx) = candidates::channel();

    let provider = ItunesSearch::new(&cfg.search).context("failed to build search client")?;
    let fetcher = CandidateFetcher::new(provider, cfg.search.image_field.clone());
    let coordinator = Arc::new(RefreshCoordinator::new(
        fetcher,
        candidates_tx,
        slots.clone(),
        mode.clone(),
        ui.clone(),
    ));

    let (command_tx, command_rx) = mpsc::channel::<Command>(16); // Console/signals -> Controls
    let cancel = CancellationToken::new();

    // stdin lines become commands; EOF ends the session. A plain thread so a
    // pending read never holds up process exit.
    if io::stdin().is_terminal() {
        let commands = command_tx.clone();
        thread::Builder::new().name("console".into()).spawn(move || {
            for line in io::stdin().lock().lines() {
                let line = match line {
                    Ok(line) => line,
                    Err(err) => {
                        warn!("stdin read failed: {err}");
                        break;
                    }
                };
                match line.parse::<Command>() {
                    Ok(cmd) => {
                        if commands.blocking_send(cmd).is_err() {
                            return;
                        }
                    }
                    Err(ParseCommandError::Empty) => {}
                    Err(err) => warn!("{err}"),
                }
            }
            info!("stdin closed");
            let _ = commands.blocking_send(Command::Quit);
        })
        .context("failed to start console thread")?;
    } else {
        tracing::debug!("stdin is not a terminal; console commands disabled");
    }

    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if let Err(err) = tokio::signal::ctrl_c().await {
                warn!("ctrl-c handler failed: {err}");
                return;
            }
            info!("ctrl-c received; initiating shutdown");
            cancel.cancel();
        });
    }

    #[cfg(unix)]
    {
        let cancel = cancel.clone();
        let commands = command_tx.clone();
        tokio::spawn(async move {
            match signal(SignalKind::user_defined1()) {
                Ok(mut sigusr1) => loop {
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        received = sigusr1.recv() => {
                            if received.is_none() {
                                break;
                            }
                            info!("SIGUSR1 received; toggling play/pause");
                            if commands.send(Command::Toggle).await.is_err() {
                                break;
                            }
                        }
                    }
                },
                Err(err) => warn!("failed to register SIGUSR1 handler: {err}"),
            }
        });
    }

    let mut tasks = JoinSet::new();

    // Rotation
    tasks.spawn({
        let mode_rx = mode.subscribe();
        let slots = slots.clone();
        let ui = ui.clone();
        let options = cfg.rotation.clone();
        let cancel = cancel.clone();
        async move {
            tasks::rotation::run(candidates_rx, mode_rx, slots, ui, options, cancel)
                .await
                .context("rotation task failed")
        }
    });

    // Controls
    tasks.spawn({
        let mode = mode.clone();
        let slots = slots.clone();
        let ui = ui.clone();
        let query = cfg.default_query.clone();
        let cancel = cancel.clone();
        async move {
            tasks::controls::run(command_rx, coordinator, mode, slots, ui, query, cancel)
                .await
                .context("controls task failed")
        }
    });
    // Startup fill from the default query
    command_tx
        .send(Command::Refresh(None))
        .await
        .map_err(|_| anyhow!("controls task stopped before startup"))?;

    cancel.cancelled().await;

    while let Some(res) = tasks.join_next().await {
        match res {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::error!("task error: {e:?}"),
            Err(e) => tracing::error!("join error: {e}"),
        }
    }

    ui.shutdown();
    foreground
        .join()
        .map_err(|_| anyhow!("presentation thread panicked"))?;
    Ok(())
}
