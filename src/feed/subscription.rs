#![expect(
    clippy::module_name_repetitions,
    reason = "Subscription types deliberately include the module name for clarity"
)]

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use async_stream::try_stream;
use dashmap::DashMap;
use futures::Stream;
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;

use super::error::FeedError;
use super::types::request::{ALL_STOCKS_TOPIC, stock_topic};
use super::types::response::{FeedEvent, parse_price_payload};
use crate::Result;
use crate::stomp::Frame;
use crate::ws::ConnectionManager;
use crate::ws::connection::ConnectionState;

#[non_exhaustive]
#[derive(Clone)]
pub struct PriceParser;

impl crate::ws::traits::MessageParser<FeedEvent> for PriceParser {
    fn parse(&self, frame: &Frame) -> Result<Vec<FeedEvent>> {
        let Some(destination) = frame.destination() else {
            // A MESSAGE without a destination cannot be routed.
            return Ok(Vec::new());
        };
        if frame.body.trim().is_empty() {
            return Ok(Vec::new());
        }
        let payload = parse_price_payload(&frame.body)?;
        Ok(vec![FeedEvent {
            destination: destination.to_owned(),
            subscription: frame.header("subscription").map(str::to_owned),
            payload,
        }])
    }
}

/// Deterministic identifier of one registration.
///
/// Derived from the subscription kind and target, so re-subscribing to the
/// same topic overwrites the previous registration rather than duplicating
/// it. The [`Display`](fmt::Display) form is what goes into the STOMP `id`
/// header.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SubscriptionId {
    /// The bulk all-stocks registration
    AllStocks,
    /// A single-symbol registration
    Stock(String),
}

impl SubscriptionId {
    /// Identifier for a single-symbol registration.
    #[must_use]
    pub fn stock<S: Into<String>>(symbol: S) -> Self {
        Self::Stock(symbol.into())
    }

    /// The destination this registration listens on.
    #[must_use]
    pub fn topic(&self) -> String {
        match self {
            Self::AllStocks => ALL_STOCKS_TOPIC.to_owned(),
            Self::Stock(symbol) => stock_topic(symbol),
        }
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AllStocks => f.write_str("all-stocks"),
            Self::Stock(symbol) => write!(f, "stock-{symbol}"),
        }
    }
}

/// Information about an active subscription.
#[non_exhaustive]
#[derive(Debug, Clone)]
pub struct SubscriptionInfo {
    /// Registration identifier
    pub id: SubscriptionId,
    /// Destination the registration listens on
    pub topic: String,
    /// When the subscription was created
    pub created_at: Instant,
}

/// One registry entry: the public info plus the delivery kill switch.
struct Registration {
    info: SubscriptionInfo,
    cancel: CancellationToken,
}

/// Owns the subscription registry and routes messages to subscribers.
///
/// Registrations are keyed by their deterministic [`SubscriptionId`]; each
/// holds a cancellation token that stops its delivery stream the moment the
/// entry is removed or overwritten.
pub struct SubscriptionManager {
    connection: ConnectionManager<FeedEvent, PriceParser>,
    active_subs: DashMap<SubscriptionId, Registration>,
}

impl SubscriptionManager {
    /// Create a new subscription manager.
    #[must_use]
    pub fn new(connection: ConnectionManager<FeedEvent, PriceParser>) -> Self {
        Self {
            connection,
            active_subs: DashMap::new(),
        }
    }

    /// Start the reconnection handler that re-subscribes on connection recovery.
    ///
    /// The source feed this client talks to forgets all subscriptions when a
    /// connection drops; without the replay, updates would silently stop
    /// flowing after a successful reconnect until every consumer manually
    /// re-subscribed.
    pub fn start_reconnection_handler(self: &Arc<Self>) {
        let weak = Arc::downgrade(self);
        let mut state_rx = self.connection.state_receiver();

        tokio::spawn(async move {
            let mut was_connected = state_rx.borrow().is_connected();

            loop {
                // Wait for next state change
                if state_rx.changed().await.is_err() {
                    // Channel closed, connection manager is gone
                    break;
                }

                let state = *state_rx.borrow_and_update();

                if let ConnectionState::Connected { .. } = state {
                    if was_connected {
                        let Some(this) = weak.upgrade() else { break };
                        #[cfg(feature = "tracing")]
                        tracing::debug!("feed reconnected, re-establishing subscriptions");
                        this.resubscribe_all();
                    }
                    was_connected = true;
                }
            }
        });
    }

    /// Re-declare every active registration to the transport.
    fn resubscribe_all(&self) {
        for entry in self.active_subs.iter() {
            let info = &entry.value().info;
            if let Err(e) = self
                .connection
                .send(&Frame::subscribe(&info.id.to_string(), &info.topic))
            {
                #[cfg(feature = "tracing")]
                tracing::warn!(id = %info.id, error = %e, "failed to re-subscribe");
                #[cfg(not(feature = "tracing"))]
                let _ = &e;
            }
        }
    }

    /// Register `id` and open its delivery stream.
    ///
    /// Requires a live connection: while disconnected this logs a warning and
    /// returns [`FeedError::NotConnected`] without registering anything —
    /// consumers re-subscribe once the connection is up. Re-subscribing to an
    /// id that is already registered overwrites the previous registration and
    /// closes its stream.
    pub fn subscribe(
        &self,
        id: SubscriptionId,
    ) -> Result<impl Stream<Item = Result<FeedEvent>> + use<>> {
        if !self.connection.state().is_connected() {
            #[cfg(feature = "tracing")]
            tracing::warn!(id = %id, "cannot subscribe while disconnected");
            return Err(FeedError::NotConnected.into());
        }

        let topic = id.topic();
        let cancel = CancellationToken::new();

        let replaced = self.active_subs.insert(
            id.clone(),
            Registration {
                info: SubscriptionInfo {
                    id: id.clone(),
                    topic: topic.clone(),
                    created_at: Instant::now(),
                },
                cancel: cancel.clone(),
            },
        );

        if let Some(previous) = replaced {
            #[cfg(feature = "tracing")]
            tracing::debug!(id = %id, "overwriting existing subscription");
            previous.cancel.cancel();
            // The server still holds the old declaration under this id;
            // withdraw it before declaring again.
            self.connection.send(&Frame::unsubscribe(&id.to_string()))?;
        }

        self.connection
            .send(&Frame::subscribe(&id.to_string(), &topic))?;

        // Create filtered stream with its own receiver
        let mut rx = self.connection.subscribe();

        Ok(try_stream! {
            loop {
                let msg = tokio::select! {
                    // Cancellation wins over buffered traffic, so delivery
                    // stops the moment the registration is removed.
                    biased;
                    () = cancel.cancelled() => break,
                    msg = rx.recv() => msg,
                };
                match msg {
                    Ok(event) => {
                        if event.destination == topic {
                            yield event;
                        }
                    }
                    Err(RecvError::Lagged(n)) => {
                        #[cfg(feature = "tracing")]
                        tracing::warn!("feed subscription lagged, missed {n} messages");
                        Err(FeedError::Lagged { count: n })?;
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        })
    }

    /// Remove the registration for `id` and stop its delivery.
    ///
    /// No-op if the id is not registered. The UNSUBSCRIBE frame is only sent
    /// while connected; on a dead connection the server has already forgotten
    /// the declaration.
    pub fn unsubscribe(&self, id: &SubscriptionId) -> Result<()> {
        let Some((_, registration)) = self.active_subs.remove(id) else {
            return Ok(());
        };
        registration.cancel.cancel();

        if self.connection.state().is_connected() {
            self.connection.send(&Frame::unsubscribe(&id.to_string()))?;
        }
        Ok(())
    }

    /// Remove every registration; used by disconnect.
    pub fn unsubscribe_all(&self) -> Result<()> {
        let ids: Vec<SubscriptionId> = self
            .active_subs
            .iter()
            .map(|entry| entry.key().clone())
            .collect();

        for id in &ids {
            self.unsubscribe(id)?;
        }
        Ok(())
    }

    /// Get information about all active subscriptions.
    #[must_use]
    pub fn active_subscriptions(&self) -> Vec<SubscriptionInfo> {
        self.active_subs
            .iter()
            .map(|entry| entry.value().info.clone())
            .collect()
    }

    /// Get the number of active subscriptions.
    #[must_use]
    pub fn subscription_count(&self) -> usize {
        self.active_subs.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscription_ids_are_deterministic() {
        assert_eq!(SubscriptionId::AllStocks.to_string(), "all-stocks");
        assert_eq!(SubscriptionId::stock("TCS").to_string(), "stock-TCS");
        assert_eq!(SubscriptionId::stock("TCS"), SubscriptionId::stock("TCS"));
    }

    #[test]
    fn subscription_ids_map_to_topics() {
        assert_eq!(SubscriptionId::AllStocks.topic(), "/topic/stock-prices");
        assert_eq!(
            SubscriptionId::stock("INFY").topic(),
            "/topic/stock-price/INFY"
        );
    }
}
