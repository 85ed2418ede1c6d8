use std::sync::Arc;

use futures::Stream;
use futures::StreamExt as _;
use tokio::sync::watch;

use super::error::FeedError;
use super::subscription::{PriceParser, SubscriptionId, SubscriptionInfo, SubscriptionManager};
use super::types::request::PriceRequest;
use super::types::response::{FeedEvent, PriceUpdate};
use crate::error::Error;
use crate::ws::ConnectionManager;
use crate::ws::config::Config;
use crate::ws::connection::ConnectionState;
use crate::{DEFAULT_ENDPOINT, Result, websocket_endpoint};

/// Client for the streaming stock price feed.
///
/// Each instance owns its own transport and subscription registry, so
/// multiple independent connections can coexist; hold and clone the client
/// rather than sharing module state.
///
/// # Examples
///
/// ```rust, no_run
/// use stockfeed_client_sdk::feed::Client;
/// use futures::StreamExt;
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let client = Client::default();
///     client.connect();
///
///     // Wait until the session is up, then follow a single symbol
///     client.wait_until_connected().await?;
///     let stream = client.subscribe_stock("TCS")?;
///     let mut stream = Box::pin(stream);
///
///     while let Some(update) = stream.next().await {
///         println!("TCS: {:?}", update?);
///     }
///
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

impl Default for Client {
    fn default() -> Self {
        Self::new(DEFAULT_ENDPOINT, Config::default())
            .expect("feed client with default endpoint should succeed")
    }
}

struct ClientInner {
    /// Connection manager for the feed transport
    connection: ConnectionManager<FeedEvent, PriceParser>,
    /// Subscription registry for this client
    subscriptions: Arc<SubscriptionManager>,
}

impl Client {
    /// Create a new feed client against `endpoint`.
    ///
    /// The endpoint is the HTTP URL the server publishes (e.g.
    /// `http://localhost:8080/ws-stock-prices`); the WebSocket URL is derived
    /// from it. No I/O happens until [`connect`](Self::connect).
    pub fn new(endpoint: &str, config: Config) -> Result<Self> {
        let ws_endpoint = websocket_endpoint(endpoint)?;
        let connection = ConnectionManager::new(ws_endpoint, config, PriceParser);
        let subscriptions = Arc::new(SubscriptionManager::new(connection.clone()));

        // Start reconnection handler to re-subscribe on connection recovery
        subscriptions.start_reconnection_handler();

        Ok(Self {
            inner: Arc::new(ClientInner {
                connection,
                subscriptions,
            }),
        })
    }

    /// Start the connection: dial the transport, run the STOMP handshake,
    /// and keep the session alive with bounded linear-backoff reconnection.
    ///
    /// Returns immediately; progress and failures are observable through
    /// [`state_receiver`](Self::state_receiver). A no-op while a session is
    /// already live. After the retry budget is exhausted the client holds
    /// [`ConnectionState::Failed`] and this call starts a fresh cycle.
    pub fn connect(&self) {
        self.inner.connection.connect();
    }

    /// Tear the session down: drop every registration, cancel any pending
    /// reconnection timer, and close the transport.
    ///
    /// Idempotent — calling it while already disconnected is a no-op.
    pub fn disconnect(&self) {
        if let Err(e) = self.inner.subscriptions.unsubscribe_all() {
            #[cfg(feature = "tracing")]
            tracing::warn!(error = %e, "failed to withdraw subscriptions during disconnect");
            #[cfg(not(feature = "tracing"))]
            let _ = &e;
        }
        self.inner.connection.disconnect();
    }

    /// Whether the client is currently connected.
    ///
    /// True iff the state is exactly [`ConnectionState::Connected`];
    /// connecting, reconnecting and failed states all report false.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.inner.connection.state().is_connected()
    }

    /// Get the current connection state.
    #[must_use]
    pub fn connection_state(&self) -> ConnectionState {
        self.inner.connection.state()
    }

    /// Subscribe to connection state changes.
    ///
    /// This is the success/error notification surface: consumers watch for
    /// [`ConnectionState::Connected`] (session up), and for
    /// [`ConnectionState::Failed`] (retry budget exhausted — only an explicit
    /// [`connect`](Self::connect) will try again).
    #[must_use]
    pub fn state_receiver(&self) -> watch::Receiver<ConnectionState> {
        self.inner.connection.state_receiver()
    }

    /// Wait until the connection state reaches [`ConnectionState::Connected`].
    ///
    /// Waits through connecting and reconnecting states.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::NotConnected`] if the retry budget is exhausted
    /// ([`ConnectionState::Failed`]) or the client is dropped while waiting.
    pub async fn wait_until_connected(&self) -> Result<()> {
        let mut state_rx = self.state_receiver();
        loop {
            match *state_rx.borrow_and_update() {
                ConnectionState::Connected { .. } => return Ok(()),
                ConnectionState::Failed => return Err(FeedError::NotConnected.into()),
                ConnectionState::Disconnected
                | ConnectionState::Connecting
                | ConnectionState::Reconnecting { .. } => {}
            }
            if state_rx.changed().await.is_err() {
                return Err(FeedError::NotConnected.into());
            }
        }
    }

    /// Subscribe to bulk updates for every tracked symbol.
    ///
    /// Each message on the all-stocks topic is a batch; the stream yields
    /// the batch exactly as it arrived, in wire order. Requires a live
    /// connection; while disconnected this logs and returns
    /// [`FeedError::NotConnected`] without registering anything. The
    /// registration id is the deterministic [`SubscriptionId::AllStocks`],
    /// so repeated calls overwrite rather than duplicate.
    pub fn subscribe_all_stocks(
        &self,
    ) -> Result<impl Stream<Item = Result<Vec<PriceUpdate>>> + use<>> {
        let stream = self.inner.subscriptions.subscribe(SubscriptionId::AllStocks)?;

        Ok(stream.filter_map(|event_result| async move {
            match event_result {
                Ok(event) => Some(Ok(event.payload.into_updates())),
                Err(e) => Some(Err(e)),
            }
        }))
    }

    /// Subscribe to updates for a single symbol.
    ///
    /// Only single-update frames published on that symbol's topic are
    /// yielded; bulk all-stocks traffic never routes here. Requires a live
    /// connection; see [`subscribe_all_stocks`](Self::subscribe_all_stocks)
    /// for the disconnected behavior. The registration id is
    /// `stock-<symbol>`.
    pub fn subscribe_stock(
        &self,
        symbol: &str,
    ) -> Result<impl Stream<Item = Result<PriceUpdate>> + use<>> {
        let symbol = validated_symbol(symbol)?;
        let stream = self
            .inner
            .subscriptions
            .subscribe(SubscriptionId::stock(symbol))?;

        Ok(stream.filter_map(|event_result| async move {
            match event_result {
                Ok(event) => event.payload.into_single().map(Ok),
                Err(e) => Some(Err(e)),
            }
        }))
    }

    /// Request a one-shot price snapshot for `symbol`.
    ///
    /// Publishes to the application destination; no response correlation is
    /// tracked. The snapshot arrives asynchronously on the symbol's topic —
    /// if something is subscribed there.
    pub fn request_stock_price(&self, symbol: &str) -> Result<()> {
        let symbol = validated_symbol(symbol)?;
        if !self.is_connected() {
            #[cfg(feature = "tracing")]
            tracing::warn!(%symbol, "cannot request a price while disconnected");
            return Err(FeedError::NotConnected.into());
        }

        let frame = PriceRequest::new(symbol).to_frame()?;
        self.inner.connection.send(&frame)
    }

    /// Remove the registration `id` and stop its delivery.
    ///
    /// Other registrations, including ones on the same topic, keep flowing.
    /// No-op if the id is not registered.
    pub fn unsubscribe(&self, id: &SubscriptionId) -> Result<()> {
        self.inner.subscriptions.unsubscribe(id)
    }

    /// Remove the single-symbol registration for `symbol`.
    pub fn unsubscribe_stock(&self, symbol: &str) -> Result<()> {
        self.unsubscribe(&SubscriptionId::stock(symbol))
    }

    /// Remove the bulk all-stocks registration.
    pub fn unsubscribe_all_stocks(&self) -> Result<()> {
        self.unsubscribe(&SubscriptionId::AllStocks)
    }

    /// Remove every active registration.
    pub fn unsubscribe_all(&self) -> Result<()> {
        self.inner.subscriptions.unsubscribe_all()
    }

    /// Get the number of active subscriptions.
    #[must_use]
    pub fn subscription_count(&self) -> usize {
        self.inner.subscriptions.subscription_count()
    }

    /// Get information about all active subscriptions.
    #[must_use]
    pub fn active_subscriptions(&self) -> Vec<SubscriptionInfo> {
        self.inner.subscriptions.active_subscriptions()
    }
}

fn validated_symbol(symbol: &str) -> Result<&str> {
    let symbol = symbol.trim();
    if symbol.is_empty() {
        return Err(Error::validation("symbol must not be empty"));
    }
    Ok(symbol)
}
