use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use tokio::sync::watch;
use tracing::{info, warn};

use crate::VISIBLE_SLOTS;
use crate::candidates::CandidateSet;
use crate::error::RefreshError;
use crate::events::ModeState;
use crate::mode::ModeController;
use crate::presentation::Dispatcher;
use crate::slots::VisibleSlots;
use crate::tasks::fetcher::{CandidateFetcher, SearchProvider};

/// Progress share spread across the bulk slot reset.
pub const APPLY_SHARE: f64 = 0.5;

/// Replaces the candidate set and the visible slots from a new query.
///
/// Rules:
/// - At most one refresh runs at a time; a second caller gets `InProgress`.
/// - Rotation is held (mode forced to paused) for the whole refresh and the
///   previous mode is restored afterwards, on success and failure alike.
/// - A failed fetch leaves candidates and slots untouched and raises an alert.
pub struct RefreshCoordinator<P> {
    fetcher: CandidateFetcher<P>,
    candidates: watch::Sender<Arc<CandidateSet>>,
    slots: VisibleSlots,
    mode: ModeController,
    ui: Dispatcher,
    in_flight: AtomicBool,
    generations: AtomicU64,
}

struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl<P: SearchProvider> RefreshCoordinator<P> {
    pub fn new(
        fetcher: CandidateFetcher<P>,
        candidates: watch::Sender<Arc<CandidateSet>>,
        slots: VisibleSlots,
        mode: ModeController,
        ui: Dispatcher,
    ) -> Self {
        let current = candidates.borrow().generation();
        Self {
            fetcher,
            candidates,
            slots,
            mode,
            ui,
            in_flight: AtomicBool::new(false),
            generations: AtomicU64::new(current),
        }
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    pub fn current(&self) -> Arc<CandidateSet> {
        self.candidates.borrow().clone()
    }

    fn begin(&self) -> Result<InFlight<'_>, RefreshError> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| InFlight(&self.in_flight))
            .map_err(|_| RefreshError::InProgress)
    }

    pub async fn refresh(&self, query: &str) -> Result<(), RefreshError> {
        let _guard = self.begin()?;

        self.ui.reset_progress();
        let resume = self.mode.current();
        self.mode.set(ModeState::Paused);
        self.ui.set_controls_enabled(false);
        info!(query, resume = %resume, "refresh started");

        let result = match self.fetcher.fetch(query, &self.ui).await {
            Ok(set) => {
                self.apply(set);
                Ok(())
            }
            Err(err) => {
                warn!(query, error = %err, "refresh failed; keeping current images");
                self.ui.reset_progress();
                self.ui.notify(err.notification(query));
                Err(err.into())
            }
        };

        self.mode.set(resume);
        self.ui.set_controls_enabled(true);
        result
    }

    fn apply(&self, set: CandidateSet) {
        let generation = self.generations.fetch_add(1, Ordering::AcqRel) + 1;
        let set = Arc::new(set.with_generation(generation));
        self.candidates.send_replace(Arc::clone(&set));

        let step = APPLY_SHARE / VISIBLE_SLOTS as f64;
        self.slots.reset_with(generation, set.visible(), |index, image| {
            self.ui.set_slot(index, image.clone());
            self.ui.advance_progress(step);
        });
        info!(
            generation,
            candidates = set.len(),
            reserve = set.reserve().len(),
            "refresh applied"
        );
    }
}
