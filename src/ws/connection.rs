#![expect(
    clippy::module_name_repetitions,
    reason = "Connection types expose their domain in the name for clarity"
)]

use std::fmt::Debug;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use std::time::{Duration, Instant};

use backoff::backoff::Backoff as _;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt as _, StreamExt as _};
use tokio::net::TcpStream;
use tokio::sync::{Mutex as TokioMutex, broadcast, mpsc, watch};
use tokio::time::{interval, sleep, timeout};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};
use tokio_util::sync::CancellationToken;
use url::Url;

use super::config::{Config, LinearBackoff};
use super::error::WsError;
use super::traits::MessageParser;
use crate::Result;
use crate::stomp::{Command, Frame, HEARTBEAT};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsWrite = SplitSink<WsStream, Message>;
type WsRead = SplitStream<WsStream>;

/// Broadcast channel capacity for incoming messages.
const BROADCAST_CAPACITY: usize = 1024;

/// Maximum time to wait for the CONNECTED handshake reply.
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// Connection state tracking.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Not connected; either never started or torn down by the caller
    Disconnected,
    /// Attempting to connect
    Connecting,
    /// Successfully connected (transport up and STOMP handshake complete)
    Connected {
        /// When the connection was established
        since: Instant,
    },
    /// Reconnecting after failure
    Reconnecting {
        /// Current reconnection attempt number
        attempt: u32,
    },
    /// Retries exhausted; only an explicit reconnect leaves this state
    Failed,
}

impl ConnectionState {
    /// Check if the connection is currently active.
    #[must_use]
    pub const fn is_connected(self) -> bool {
        matches!(self, Self::Connected { .. })
    }
}

/// Manages the feed connection lifecycle, reconnection, and heartbeat.
///
/// This generic connection manager handles all transport concerns:
/// - Establishing the WebSocket connection and the STOMP session on top
/// - Automatic reconnection with bounded linear backoff
/// - Bidirectional heartbeats with silence detection
/// - Broadcasting decoded messages to multiple subscribers
///
/// The manager is created idle; [`connect`](Self::connect) starts the
/// connection loop and [`disconnect`](Self::disconnect) cancels it,
/// including any pending reconnection timer. After the retry budget is
/// exhausted the state settles at [`ConnectionState::Failed`] and a fresh
/// `connect` call starts a new bounded cycle.
///
/// # Type Parameters
///
/// - `M`: Decoded message type
/// - `P`: Parser type that implements [`MessageParser<M>`]
#[derive(Clone)]
pub struct ConnectionManager<M, P>
where
    M: Debug + Clone + Send + 'static,
    P: MessageParser<M>,
{
    endpoint: Url,
    config: Config,
    parser: P,
    /// Watch channel sender for state changes (enables reconnection detection)
    state_tx: watch::Sender<ConnectionState>,
    /// Watch channel receiver for state changes (for use in checking the current state)
    state_rx: watch::Receiver<ConnectionState>,
    /// Sender channel for outgoing frames
    sender_tx: mpsc::UnboundedSender<String>,
    /// Receiver half, parked here between sessions so the loop can be restarted
    sender_rx: Arc<TokioMutex<mpsc::UnboundedReceiver<String>>>,
    /// Broadcast sender for incoming messages
    broadcast_tx: broadcast::Sender<M>,
    /// Cancellation handle for the live session, replaced on each connect
    cancel: Arc<StdMutex<CancellationToken>>,
    /// Whether a connection loop is currently live
    running: Arc<AtomicBool>,
}

impl<M, P> ConnectionManager<M, P>
where
    M: Debug + Clone + Send + 'static,
    P: MessageParser<M>,
{
    /// Create a new, idle connection manager.
    ///
    /// No I/O happens until [`connect`](Self::connect) is called.
    #[must_use]
    pub fn new(endpoint: Url, config: Config, parser: P) -> Self {
        let (sender_tx, sender_rx) = mpsc::unbounded_channel();
        let (broadcast_tx, _) = broadcast::channel(BROADCAST_CAPACITY);
        let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);

        // Start out cancelled so a stray disconnect() before connect() is a no-op.
        let initial = CancellationToken::new();
        initial.cancel();

        Self {
            endpoint,
            config,
            parser,
            state_tx,
            state_rx,
            sender_tx,
            sender_rx: Arc::new(TokioMutex::new(sender_rx)),
            broadcast_tx,
            cancel: Arc::new(StdMutex::new(initial)),
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Start the connection loop.
    ///
    /// No-op while a loop is already live, so repeated calls are safe. After
    /// a `disconnect` or after the retry budget was exhausted, this starts a
    /// fresh session with the attempt counter reset to zero.
    pub fn connect(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            return;
        }

        let token = CancellationToken::new();
        // We can recover from a poisoned lock because the token is replaced wholesale.
        *self
            .cancel
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = token.clone();

        // Leave Disconnected/Failed synchronously so callers that start
        // waiting right after connect() never observe the stale state.
        _ = self.state_tx.send(ConnectionState::Connecting);

        let endpoint = self.endpoint.clone();
        let config = self.config.clone();
        let parser = self.parser.clone();
        let sender_rx = Arc::clone(&self.sender_rx);
        let broadcast_tx = self.broadcast_tx.clone();
        let state_tx = self.state_tx.clone();
        let running = Arc::clone(&self.running);

        tokio::spawn(async move {
            Self::connection_loop(
                endpoint,
                config,
                sender_rx,
                broadcast_tx,
                parser,
                state_tx,
                token,
            )
            .await;
            running.store(false, Ordering::SeqCst);
        });
    }

    /// Cancel the live session, including any pending reconnection timer.
    ///
    /// Idempotent; calling it while already disconnected is a no-op.
    pub fn disconnect(&self) {
        self.cancel
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .cancel();
        _ = self.state_tx.send(ConnectionState::Disconnected);
    }

    /// Main connection loop with automatic reconnection.
    async fn connection_loop(
        endpoint: Url,
        config: Config,
        sender_rx: Arc<TokioMutex<mpsc::UnboundedReceiver<String>>>,
        broadcast_tx: broadcast::Sender<M>,
        parser: P,
        state_tx: watch::Sender<ConnectionState>,
        cancel: CancellationToken,
    ) {
        // Held for the whole loop; released when the loop exits so a later
        // connect() can hand the receiver to a new session.
        let mut sender_rx = sender_rx.lock().await;

        let mut attempt = 0_u32;
        let mut backoff: LinearBackoff = config.reconnect.clone().into();

        loop {
            _ = state_tx.send(ConnectionState::Connecting);

            let session = tokio::select! {
                () = cancel.cancelled() => {
                    _ = state_tx.send(ConnectionState::Disconnected);
                    break;
                }
                result = Self::run_session(
                    &endpoint,
                    &config,
                    &mut sender_rx,
                    &broadcast_tx,
                    &state_tx,
                    &parser,
                    &mut attempt,
                    &mut backoff,
                ) => result,
            };

            if cancel.is_cancelled() {
                _ = state_tx.send(ConnectionState::Disconnected);
                break;
            }

            if let Err(e) = session {
                #[cfg(feature = "tracing")]
                tracing::warn!(error = %e, "feed session ended");
                #[cfg(not(feature = "tracing"))]
                let _ = &e;
            }

            attempt = attempt.saturating_add(1);
            if let Some(max) = config.reconnect.max_attempts
                && attempt > max
            {
                _ = state_tx.send(ConnectionState::Failed);
                break;
            }

            _ = state_tx.send(ConnectionState::Reconnecting { attempt });

            if let Some(delay) = backoff.next_backoff() {
                tokio::select! {
                    () = cancel.cancelled() => {
                        _ = state_tx.send(ConnectionState::Disconnected);
                        break;
                    }
                    () = sleep(delay) => {}
                }
            }
        }
    }

    /// Run one connection session: dial, STOMP handshake, then pump
    /// messages until the transport fails or goes silent.
    #[expect(
        clippy::too_many_arguments,
        reason = "Session state is deliberately threaded from the loop rather than stored"
    )]
    async fn run_session(
        endpoint: &Url,
        config: &Config,
        sender_rx: &mut mpsc::UnboundedReceiver<String>,
        broadcast_tx: &broadcast::Sender<M>,
        state_tx: &watch::Sender<ConnectionState>,
        parser: &P,
        attempt: &mut u32,
        backoff: &mut LinearBackoff,
    ) -> Result<()> {
        let (ws_stream, _) = connect_async(endpoint.as_str()).await?;
        let (mut write, mut read) = ws_stream.split();

        Self::handshake(endpoint, config, &mut write, &mut read).await?;

        *attempt = 0;
        backoff.reset();
        _ = state_tx.send(ConnectionState::Connected {
            since: Instant::now(),
        });

        Self::pump(config, &mut write, &mut read, sender_rx, broadcast_tx, parser).await
    }

    /// Perform the STOMP handshake: send CONNECT, await CONNECTED.
    async fn handshake(
        endpoint: &Url,
        config: &Config,
        write: &mut WsWrite,
        read: &mut WsRead,
    ) -> Result<()> {
        let heartbeat = u64::try_from(config.heartbeat_interval.as_millis()).unwrap_or(u64::MAX);
        let host = endpoint.host_str().unwrap_or("localhost");
        let connect = Frame::connect(host, (heartbeat, heartbeat));
        write.send(Message::Text(connect.encode().into())).await?;

        match timeout(HANDSHAKE_TIMEOUT, Self::await_connected(read)).await {
            Ok(result) => result,
            Err(_elapsed) => {
                Err(WsError::Handshake("timed out waiting for CONNECTED".to_owned()).into())
            }
        }
    }

    async fn await_connected(read: &mut WsRead) -> Result<()> {
        while let Some(msg) = read.next().await {
            match msg {
                Ok(Message::Text(text)) => {
                    let frame = Frame::parse(&text).map_err(WsError::Frame)?;
                    match frame {
                        Some(frame) if frame.command == Command::Connected => return Ok(()),
                        Some(frame) if frame.command == Command::Error => {
                            return Err(WsError::Protocol(frame.body).into());
                        }
                        // Heartbeats and any other frame before CONNECTED are ignored.
                        _ => {}
                    }
                }
                Ok(Message::Close(_)) => return Err(WsError::ConnectionClosed.into()),
                Ok(_) => {}
                Err(e) => return Err(WsError::Connection(e).into()),
            }
        }
        Err(WsError::ConnectionClosed.into())
    }

    /// Pump frames in both directions until the session dies.
    ///
    /// Heartbeats: an LF is sent every `heartbeat_interval`; inbound silence
    /// longer than `heartbeat_timeout` tears the session down so the
    /// reconnection path takes over.
    async fn pump(
        config: &Config,
        write: &mut WsWrite,
        read: &mut WsRead,
        sender_rx: &mut mpsc::UnboundedReceiver<String>,
        broadcast_tx: &broadcast::Sender<M>,
        parser: &P,
    ) -> Result<()> {
        let mut heartbeat = interval(config.heartbeat_interval);
        let mut last_activity = Instant::now();

        loop {
            tokio::select! {
                // Handle incoming frames
                msg = read.next() => {
                    last_activity = Instant::now();
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            Self::handle_text(&text, broadcast_tx, parser)?;
                        }
                        Some(Ok(Message::Close(_))) | None => {
                            return Err(WsError::ConnectionClosed.into());
                        }
                        Some(Ok(_)) => {
                            // Ignore binary frames and transport-level ping/pong.
                        }
                        Some(Err(e)) => {
                            return Err(WsError::Connection(e).into());
                        }
                    }
                }

                // Handle outgoing frames from the registry
                Some(text) = sender_rx.recv() => {
                    if write.send(Message::Text(text.into())).await.is_err() {
                        return Err(WsError::ConnectionClosed.into());
                    }
                }

                // Send our heartbeat and check the server's
                _ = heartbeat.tick() => {
                    if last_activity.elapsed() > config.heartbeat_timeout {
                        return Err(WsError::HeartbeatTimeout.into());
                    }
                    if write.send(Message::Text(HEARTBEAT.into())).await.is_err() {
                        return Err(WsError::ConnectionClosed.into());
                    }
                }
            }
        }
    }

    /// Decode one inbound text message and broadcast whatever it yields.
    ///
    /// Frame-syntax violations and server ERROR frames are session-fatal;
    /// body decode failures are logged and the frame dropped.
    fn handle_text(text: &str, broadcast_tx: &broadcast::Sender<M>, parser: &P) -> Result<()> {
        let frame = match Frame::parse(text) {
            Ok(Some(frame)) => frame,
            // Bare heartbeat; activity is already accounted for.
            Ok(None) => return Ok(()),
            Err(e) => return Err(WsError::Frame(e).into()),
        };

        match frame.command {
            Command::Message => {
                match parser.parse(&frame) {
                    Ok(messages) => {
                        for message in messages {
                            #[cfg(feature = "tracing")]
                            tracing::trace!(?message, "decoded feed message");
                            _ = broadcast_tx.send(message);
                        }
                    }
                    Err(e) => {
                        // A single malformed payload never takes the session down.
                        #[cfg(feature = "tracing")]
                        tracing::warn!(
                            destination = frame.destination().unwrap_or("<none>"),
                            error = %e,
                            "dropping undecodable feed message"
                        );
                        #[cfg(not(feature = "tracing"))]
                        let _ = &e;
                    }
                }
                Ok(())
            }
            Command::Error => Err(WsError::Protocol(frame.body).into()),
            _ => Ok(()),
        }
    }

    /// Queue a frame for delivery to the server.
    pub fn send(&self, frame: &Frame) -> Result<()> {
        self.sender_tx
            .send(frame.encode())
            .map_err(|_e| WsError::ConnectionClosed)?;
        Ok(())
    }

    /// Get the current connection state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.state_rx.borrow()
    }

    /// Subscribe to incoming messages.
    ///
    /// Each call returns a new independent receiver. Multiple subscribers can
    /// receive messages concurrently without blocking each other.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<M> {
        self.broadcast_tx.subscribe()
    }

    /// Subscribe to connection state changes.
    ///
    /// Returns a receiver that notifies when the connection state changes.
    /// This is useful for detecting reconnections and re-establishing subscriptions.
    #[must_use]
    pub fn state_receiver(&self) -> watch::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }
}
