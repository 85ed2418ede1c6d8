//! Core traits for generic WebSocket infrastructure.

use crate::stomp::Frame;

/// Message parser trait for converting inbound STOMP MESSAGE frames into
/// decoded messages.
///
/// The connection layer owns frame syntax; implementations of this trait own
/// the body semantics (which destinations they understand and how their JSON
/// payloads decode).
///
/// # Example
///
/// ```ignore
/// #[derive(Clone)]
/// pub struct SimpleParser;
///
/// impl MessageParser<MyMessage> for SimpleParser {
///     fn parse(&self, frame: &Frame) -> crate::Result<Vec<MyMessage>> {
///         let msg: MyMessage = serde_json::from_str(&frame.body)?;
///         Ok(vec![msg])
///     }
/// }
/// ```
pub trait MessageParser<M>: Clone + Send + Sync + 'static {
    /// Parse one MESSAGE frame into zero or more messages.
    ///
    /// May return an empty vec if the frame is addressed to a destination
    /// the parser does not track.
    fn parse(&self, frame: &Frame) -> crate::Result<Vec<M>>;
}
