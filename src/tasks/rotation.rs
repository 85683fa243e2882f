use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use rand::{SeedableRng, rngs::StdRng};
use tokio::select;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::VISIBLE_SLOTS;
use crate::candidates::CandidateSet;
use crate::config::RotationOptions;
use crate::events::ModeState;
use crate::presentation::Dispatcher;
use crate::slots::{Substitution, VisibleSlots};

/// Position in the reserve part of a candidate set, wrapping back to its start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RotationCursor {
    position: usize,
    len: usize,
}

impl RotationCursor {
    pub fn new(len: usize) -> Self {
        Self {
            position: VISIBLE_SLOTS,
            len,
        }
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn advance(&mut self) {
        self.position += 1;
        if self.position >= self.len {
            self.rewind();
        }
    }

    pub fn rewind(&mut self) {
        self.position = VISIBLE_SLOTS;
    }
}

/// Supervises the rotation: one generation task per installed candidate set.
///
/// Rules:
/// - A new candidate set cancels the running generation and waits for it to
///   finish before the next one starts, so two loops never overlap.
/// - Mode changes never spawn anything; a generation holds in place while paused.
/// - Exits on `cancel` or when the candidate channel closes.
pub async fn run(
    mut candidates: watch::Receiver<Arc<CandidateSet>>,
    mode: watch::Receiver<ModeState>,
    slots: VisibleSlots,
    ui: Dispatcher,
    options: RotationOptions,
    cancel: CancellationToken,
) -> Result<()> {
    let mut rng = match options.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };

    loop {
        let set = candidates.borrow_and_update().clone();
        let generation = cancel.child_token();
        let worker = tokio::spawn(run_generation(
            set,
            mode.clone(),
            slots.clone(),
            ui.clone(),
            options.interval,
            StdRng::from_rng(&mut rng),
            generation.clone(),
        ));

        select! {
            _ = cancel.cancelled() => {
                generation.cancel();
                join_generation(worker).await;
                break;
            }
            changed = candidates.changed() => {
                generation.cancel();
                join_generation(worker).await;
                if changed.is_err() {
                    info!("candidate channel closed; rotation stopping");
                    break;
                }
            }
        }
    }

    Ok(())
}

async fn join_generation(worker: JoinHandle<()>) {
    if let Err(err) = worker.await {
        warn!("rotation generation ended abnormally: {err}");
    }
}

async fn wait_until_running(mode: &mut watch::Receiver<ModeState>) -> bool {
    mode.wait_for(|m| m.is_running()).await.is_ok()
}

async fn run_generation(
    set: Arc<CandidateSet>,
    mut mode: watch::Receiver<ModeState>,
    slots: VisibleSlots,
    ui: Dispatcher,
    interval: Duration,
    mut rng: StdRng,
    cancel: CancellationToken,
) {
    let generation = set.generation();
    if !set.is_rotatable() {
        debug!(generation, candidates = set.len(), "nothing to rotate; idling");
        cancel.cancelled().await;
        return;
    }

    info!(
        generation,
        reserve = set.reserve().len(),
        "rotation generation started"
    );
    let mut cursor = RotationCursor::new(set.len());

    loop {
        let running = mode.borrow_and_update().is_running();
        if !running {
            debug!(generation, position = cursor.position(), "rotation holding");
            select! {
                biased;
                _ = cancel.cancelled() => break,
                resumed = wait_until_running(&mut mode) => {
                    if !resumed {
                        warn!(generation, "mode channel closed; rotation idle until cancelled");
                        cancel.cancelled().await;
                        break;
                    }
                }
            }
            debug!(generation, position = cursor.position(), "rotation resumed");
        }

        step(&set, &mut cursor, &slots, &ui, &mut rng);

        select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = sleep(interval) => {}
        }
    }

    debug!(generation, "rotation generation stopped");
}

/// One cycle: substitute the candidate under the cursor unless it is already visible.
fn step(
    set: &CandidateSet,
    cursor: &mut RotationCursor,
    slots: &VisibleSlots,
    ui: &Dispatcher,
    rng: &mut StdRng,
) {
    let position = cursor.position();
    let Some(candidate) = set.get(position) else {
        warn!(position, len = set.len(), "rotation cursor out of range; rewinding");
        cursor.rewind();
        return;
    };

    let placed = slots.substitute(set.generation(), candidate, rng, |index| {
        ui.set_slot(index, candidate.clone())
    });
    match placed {
        Substitution::Placed(index) => {
            debug!(slot = index, position, image = %candidate, "substituted");
        }
        Substitution::AlreadyVisible => {
            debug!(position, image = %candidate, "already visible; skipping");
        }
        Substitution::Stale => {
            warn!(
                generation = set.generation(),
                "slots belong to another generation; skipping"
            );
        }
    }
    cursor.advance();
}
