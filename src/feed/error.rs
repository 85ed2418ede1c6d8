#![expect(
    clippy::module_name_repetitions,
    reason = "Error types include the module name to indicate their scope"
)]

use std::error::Error as StdError;
use std::fmt;

/// Feed client error variants.
#[non_exhaustive]
#[derive(Debug)]
pub enum FeedError {
    /// Operation requires a live connection and the client is not connected
    NotConnected,
    /// Subscription request failed
    SubscriptionFailed(String),
    /// Subscription stream lagged and missed messages
    Lagged {
        /// Number of messages that were missed
        count: u64,
    },
}

impl fmt::Display for FeedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotConnected => write!(f, "feed client is not connected"),
            Self::SubscriptionFailed(reason) => write!(f, "subscription failed: {reason}"),
            Self::Lagged { count } => write!(f, "subscription lagged, missed {count} messages"),
        }
    }
}

impl StdError for FeedError {}

impl From<FeedError> for crate::error::Error {
    fn from(e: FeedError) -> Self {
        crate::error::Error::with_source(crate::error::Kind::WebSocket, e)
    }
}
