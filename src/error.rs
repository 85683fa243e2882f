use thiserror::Error;

use crate::events::Notification;

pub const SEARCH_ERROR_TITLE: &str = "Search Error!";

/// Why a search could not produce a usable candidate set.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// The query was blank or could not be encoded into a request.
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// Network, HTTP status or response decoding failure.
    #[error("search request failed: {0}")]
    TransportFailure(String),

    /// The provider answered with zero usable results.
    #[error("search returned no results")]
    EmptyResult,

    /// Fewer distinct images than are needed to fill the gallery and rotate.
    #[error("search returned only {0} distinct images")]
    InsufficientResults(usize),
}

impl FetchError {
    /// User-facing alert describing this failure for `query`.
    pub fn notification(&self, query: &str) -> Notification {
        let message = match self {
            Self::EmptyResult => format!(
                "Your search \"{query}\" did not return any results. Please try again."
            ),
            Self::InsufficientResults(_) => format!(
                "Your search \"{query}\" did not return enough results. Please try again."
            ),
            Self::InvalidQuery(_) | Self::TransportFailure(_) => format!(
                "An error occurred during your search \"{query}\". Please try again."
            ),
        };
        Notification {
            title: SEARCH_ERROR_TITLE.to_string(),
            message,
        }
    }
}

#[derive(Debug, Error)]
pub enum RefreshError {
    #[error("a refresh is already in progress")]
    InProgress,

    #[error(transparent)]
    Fetch(#[from] FetchError),
}
