use std::sync::Arc;

use tokio::sync::watch;

use crate::VISIBLE_SLOTS;
use crate::error::FetchError;
use crate::events::ImageRef;

/// Deduplicated, ordered search results for one generation.
///
/// The first [`VISIBLE_SLOTS`] entries seed the gallery; the remainder is the
/// reserve the rotation cycles through. A set is never edited after
/// construction: a refresh installs a whole new one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateSet {
    generation: u64,
    images: Vec<ImageRef>,
}

impl CandidateSet {
    /// Placeholder installed before the first successful search.
    pub fn empty() -> Self {
        Self {
            generation: 0,
            images: Vec::new(),
        }
    }

    /// Accepts `images` only if there are more of them than visible slots.
    ///
    /// `images` must already be deduplicated.
    pub fn validated(generation: u64, images: Vec<ImageRef>) -> Result<Self, FetchError> {
        debug_assert!(
            {
                let mut seen = std::collections::HashSet::new();
                images.iter().all(|image| seen.insert(image))
            },
            "candidate images must be distinct"
        );
        match images.len() {
            0 => Err(FetchError::EmptyResult),
            n if n <= VISIBLE_SLOTS => Err(FetchError::InsufficientResults(n)),
            _ => Ok(Self { generation, images }),
        }
    }

    pub(crate) fn with_generation(mut self, generation: u64) -> Self {
        self.generation = generation;
        self
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ImageRef> {
        self.images.get(index)
    }

    pub fn images(&self) -> &[ImageRef] {
        &self.images
    }

    /// Entries that seed the visible slots on install.
    pub fn visible(&self) -> &[ImageRef] {
        &self.images[..self.images.len().min(VISIBLE_SLOTS)]
    }

    /// Entries beyond the visible prefix.
    pub fn reserve(&self) -> &[ImageRef] {
        &self.images[self.images.len().min(VISIBLE_SLOTS)..]
    }

    /// True when there is at least one reserve entry to rotate in.
    pub fn is_rotatable(&self) -> bool {
        self.images.len() > VISIBLE_SLOTS
    }
}

impl Default for CandidateSet {
    fn default() -> Self {
        Self::empty()
    }
}

/// Channel carrying the current candidate set; starts with the empty placeholder.
pub fn channel() -> (
    watch::Sender<Arc<CandidateSet>>,
    watch::Receiver<Arc<CandidateSet>>,
) {
    watch::channel(Arc::new(CandidateSet::empty()))
}
