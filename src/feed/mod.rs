#![expect(
    clippy::module_name_repetitions,
    reason = "Re-exported names intentionally match their modules for API clarity"
)]

//! Stock price feed client.
//!
//! This module provides a STOMP-over-WebSocket client for subscribing to
//! real-time stock price updates.
//!
//! # Available Streams
//!
//! - **All stocks**: bulk update batches whenever any tracked symbol changes
//! - **Single symbol**: one update per message for one ticker
//!
//! One-shot price snapshots can be requested per symbol; the reply arrives
//! through the symbol's stream.
//!
//! # Example
//!
//! ```rust, no_run
//! use stockfeed_client_sdk::feed::Client;
//! use futures::StreamExt;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = Client::default();
//!     client.connect();
//!     client.wait_until_connected().await?;
//!
//!     // Follow every tracked symbol
//!     let stream = client.subscribe_all_stocks()?;
//!     let mut stream = Box::pin(stream);
//!
//!     while let Some(batch) = stream.next().await {
//!         println!("prices: {:?}", batch?);
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod error;
pub mod subscription;
pub mod types;

// Re-export commonly used types
pub use client::Client;
pub use error::FeedError;
pub use subscription::{SubscriptionId, SubscriptionInfo};
pub use types::request::{ALL_STOCKS_TOPIC, PriceRequest, price_request_destination, stock_topic};
pub use types::response::{FeedEvent, PricePayload, PriceUpdate};
