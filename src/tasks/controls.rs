use std::str::FromStr;
use std::sync::Arc;

use anyhow::Result;
use thiserror::Error;
use tokio::select;
use tokio::sync::mpsc::Receiver;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::RefreshError;
use crate::events::{Command, ModeState, Notification};
use crate::mode::ModeController;
use crate::presentation::Dispatcher;
use crate::slots::VisibleSlots;
use crate::tasks::fetcher::SearchProvider;
use crate::tasks::refresh::RefreshCoordinator;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseCommandError {
    #[error("empty command")]
    Empty,
    #[error("unknown command {0:?}; try toggle, play, pause, update [query], query <text>, status, about, quit")]
    Unknown(String),
    #[error("`query` needs some text")]
    MissingQuery,
}

impl FromStr for Command {
    type Err = ParseCommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };
        match word.to_ascii_lowercase().as_str() {
            "" => Err(ParseCommandError::Empty),
            "toggle" | "p" => Ok(Self::Toggle),
            "play" | "resume" => Ok(Self::SetMode(ModeState::Running)),
            "pause" => Ok(Self::SetMode(ModeState::Paused)),
            "update" | "refresh" | "u" => Ok(Self::Refresh(
                (!rest.is_empty()).then(|| rest.to_string()),
            )),
            "query" | "q" if rest.is_empty() => Err(ParseCommandError::MissingQuery),
            "query" | "q" => Ok(Self::SetQuery(rest.to_string())),
            "status" | "s" => Ok(Self::Status),
            "about" => Ok(Self::About),
            "quit" | "exit" => Ok(Self::Quit),
            _ => Err(ParseCommandError::Unknown(word.to_string())),
        }
    }
}

pub fn about_notification() -> Notification {
    Notification {
        title: format!("About {}", env!("CARGO_PKG_NAME")),
        message: format!(
            "{} {}\n{}",
            env!("CARGO_PKG_NAME"),
            env!("CARGO_PKG_VERSION"),
            env!("CARGO_PKG_DESCRIPTION")
        ),
    }
}

/// Applies user commands to the mode and refresh machinery.
///
/// Rules:
/// - The play/pause and update controls are disabled while a refresh is in
///   flight; commands for them are dropped with a warning.
/// - Refreshes run on their own task so this loop stays responsive.
/// - `Quit` (or the command source closing) cancels the whole pipeline.
pub async fn run<P: SearchProvider>(
    mut commands: Receiver<Command>,
    coordinator: Arc<RefreshCoordinator<P>>,
    mode: ModeController,
    slots: VisibleSlots,
    ui: Dispatcher,
    initial_query: String,
    cancel: CancellationToken,
) -> Result<()> {
    let mut query = initial_query;
    let mut refreshes: JoinSet<()> = JoinSet::new();

    loop {
        select! {
            biased;
            _ = cancel.cancelled() => break,

            Some(done) = refreshes.join_next() => {
                if let Err(err) = done {
                    warn!("refresh task failed: {err}");
                }
            }

            maybe_cmd = commands.recv() => {
                let Some(cmd) = maybe_cmd else {
                    info!("command input closed; initiating shutdown");
                    cancel.cancel();
                    break;
                };
                // A refresh that finished in this same poll must not count as busy.
                while let Some(done) = refreshes.try_join_next() {
                    if let Err(err) = done {
                        warn!("refresh task failed: {err}");
                    }
                }
                let busy = coordinator.is_busy() || !refreshes.is_empty();
                debug!(?cmd, busy, "command received");
                match cmd {
                    Command::Toggle | Command::SetMode(_) | Command::Refresh(_) if busy => {
                        warn!(?cmd, "controls are disabled while images are updating");
                    }
                    Command::Toggle => {
                        mode.toggle();
                    }
                    Command::SetMode(next) => mode.set(next),
                    Command::Refresh(text) => {
                        if let Some(text) = text {
                            query = text;
                        }
                        let coordinator = Arc::clone(&coordinator);
                        let query = query.clone();
                        refreshes.spawn(async move {
                            match coordinator.refresh(&query).await {
                                Ok(()) => {}
                                Err(RefreshError::InProgress) => {
                                    warn!(query = %query, "refresh rejected; another one is in flight");
                                }
                                Err(RefreshError::Fetch(err)) => {
                                    debug!(query = %query, error = %err, "refresh reported to user");
                                }
                            }
                        });
                    }
                    Command::SetQuery(text) => {
                        info!(query = %text, "search query set");
                        query = text;
                    }
                    Command::Status => {
                        let current = coordinator.current();
                        info!(
                            mode = %mode.current(),
                            query = %query,
                            generation = current.generation(),
                            candidates = current.len(),
                            visible = slots.filled(),
                            updating = busy,
                            "status"
                        );
                        for (index, image) in slots.snapshot().iter().enumerate() {
                            match image {
                                Some(image) => debug!(slot = index, image = %image, "visible"),
                                None => debug!(slot = index, "empty"),
                            }
                        }
                    }
                    Command::About => ui.notify(about_notification()),
                    Command::Quit => {
                        info!("quit requested; initiating shutdown");
                        cancel.cancel();
                        break;
                    }
                }
            }
        }
    }

    // A refresh is never cut short; let it settle before returning.
    while let Some(done) = refreshes.join_next().await {
        if let Err(err) = done {
            warn!("refresh task failed: {err}");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_commands() {
        assert_eq!("toggle".parse::<Command>(), Ok(Command::Toggle));
        assert_eq!(" Pause ".parse::<Command>(), Ok(Command::SetMode(ModeState::Paused)));
        assert_eq!("play".parse::<Command>(), Ok(Command::SetMode(ModeState::Running)));
        assert_eq!("update".parse::<Command>(), Ok(Command::Refresh(None)));
        assert_eq!(
            "update  Daft Punk ".parse::<Command>(),
            Ok(Command::Refresh(Some("Daft Punk".into())))
        );
        assert_eq!(
            "query The Beatles".parse::<Command>(),
            Ok(Command::SetQuery("The Beatles".into()))
        );
        assert_eq!("quit".parse::<Command>(), Ok(Command::Quit));
    }

    #[test]
    fn rejects_malformed_commands() {
        assert_eq!("".parse::<Command>(), Err(ParseCommandError::Empty));
        assert_eq!("query".parse::<Command>(), Err(ParseCommandError::MissingQuery));
        assert_eq!(
            "dance".parse::<Command>(),
            Err(ParseCommandError::Unknown("dance".into()))
        );
    }
}
