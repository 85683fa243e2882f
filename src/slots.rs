use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use rand::Rng;

use crate::VISIBLE_SLOTS;
use crate::events::ImageRef;

/// Outcome of a single rotation substitution attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Substitution {
    Placed(usize),
    AlreadyVisible,
    /// The slots were reset by a newer generation than the caller's.
    Stale,
}

#[derive(Debug)]
struct SlotState {
    generation: u64,
    images: Vec<Option<ImageRef>>,
}

/// The fixed array of displayed images.
///
/// All writes go through one lock so the visibility check and the assignment
/// of a substitution are a single step, and a stale rotation loop can never
/// write over slots that a newer generation has reset.
#[derive(Debug, Clone)]
pub struct VisibleSlots {
    inner: Arc<Mutex<SlotState>>,
}

impl VisibleSlots {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(SlotState {
                generation: 0,
                images: vec![None; VISIBLE_SLOTS],
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SlotState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn generation(&self) -> u64 {
        self.lock().generation
    }

    pub fn get(&self, index: usize) -> Option<ImageRef> {
        self.lock().images.get(index).cloned().flatten()
    }

    pub fn snapshot(&self) -> Vec<Option<ImageRef>> {
        self.lock().images.clone()
    }

    /// Number of slots holding an image.
    pub fn filled(&self) -> usize {
        self.lock().images.iter().flatten().count()
    }

    /// Bulk reset: slot `i` takes `images[i]` (or is cleared when `images` is short).
    pub fn reset(&self, generation: u64, images: &[ImageRef]) {
        self.reset_with(generation, images, |_, _| {});
    }

    /// Like [`reset`](Self::reset), calling `publish` for every filled slot in
    /// index order while the lock is still held.
    pub fn reset_with(
        &self,
        generation: u64,
        images: &[ImageRef],
        mut publish: impl FnMut(usize, &ImageRef),
    ) {
        let mut state = self.lock();
        state.generation = generation;
        for (index, slot) in state.images.iter_mut().enumerate() {
            *slot = images.get(index).cloned();
            if let Some(image) = slot {
                publish(index, image);
            }
        }
    }

    /// Places `candidate` at a uniformly random slot unless it is already shown.
    ///
    /// `publish` runs under the lock, so a placement is reported before any
    /// later reset can be.
    pub fn substitute<R: Rng + ?Sized>(
        &self,
        generation: u64,
        candidate: &ImageRef,
        rng: &mut R,
        publish: impl FnOnce(usize),
    ) -> Substitution {
        let mut state = self.lock();
        if state.generation != generation {
            return Substitution::Stale;
        }
        if state.images.iter().flatten().any(|shown| shown == candidate) {
            return Substitution::AlreadyVisible;
        }
        let index = rng.random_range(0..VISIBLE_SLOTS);
        state.images[index] = Some(candidate.clone());
        publish(index);
        Substitution::Placed(index)
    }
}

impl Default for VisibleSlots {
    fn default() -> Self {
        Self::new()
    }
}
