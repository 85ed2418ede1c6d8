//! Minimal STOMP 1.2 framing layer.
//!
//! The feed server speaks STOMP over a WebSocket transport: every WebSocket
//! text message carries either one STOMP frame or a bare end-of-line
//! heartbeat. This module owns the wire syntax only; which frames to send
//! and what their bodies mean is decided by the layers above.
//!
//! # Example
//!
//! ```
//! use stockfeed_client_sdk::stomp::{Command, Frame};
//!
//! let frame = Frame::subscribe("all-stocks", "/topic/stock-prices");
//! let wire = frame.encode();
//!
//! let parsed = Frame::parse(&wire).unwrap().unwrap();
//! assert_eq!(parsed.command, Command::Subscribe);
//! assert_eq!(parsed.header("destination"), Some("/topic/stock-prices"));
//! ```

pub mod frame;

pub use frame::{Command, Frame, FrameError, HEARTBEAT};
