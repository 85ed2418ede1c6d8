#![expect(
    clippy::module_name_repetitions,
    reason = "Frame types expose their domain in the name for clarity"
)]

use std::error::Error as StdError;
use std::fmt;

/// A bare end-of-line, exchanged in both directions as a liveness signal.
pub const HEARTBEAT: &str = "\n";

/// STOMP frame commands used by this client.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Client handshake request
    Connect,
    /// Server handshake acknowledgement
    Connected,
    /// Declare interest in a destination
    Subscribe,
    /// Withdraw interest in a destination
    Unsubscribe,
    /// Publish a message to a destination
    Send,
    /// Server-pushed message for a subscription
    Message,
    /// Server-reported protocol error
    Error,
    /// Server acknowledgement of a receipt-requested frame
    Receipt,
    /// Client-initiated polite shutdown
    Disconnect,
}

impl Command {
    /// The wire spelling of this command.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Connect => "CONNECT",
            Self::Connected => "CONNECTED",
            Self::Subscribe => "SUBSCRIBE",
            Self::Unsubscribe => "UNSUBSCRIBE",
            Self::Send => "SEND",
            Self::Message => "MESSAGE",
            Self::Error => "ERROR",
            Self::Receipt => "RECEIPT",
            Self::Disconnect => "DISCONNECT",
        }
    }

    fn from_line(line: &str) -> Option<Self> {
        match line {
            "CONNECT" | "STOMP" => Some(Self::Connect),
            "CONNECTED" => Some(Self::Connected),
            "SUBSCRIBE" => Some(Self::Subscribe),
            "UNSUBSCRIBE" => Some(Self::Unsubscribe),
            "SEND" => Some(Self::Send),
            "MESSAGE" => Some(Self::Message),
            "ERROR" => Some(Self::Error),
            "RECEIPT" => Some(Self::Receipt),
            "DISCONNECT" => Some(Self::Disconnect),
            _ => None,
        }
    }

    /// CONNECT and CONNECTED frames are exempt from header-value escaping.
    const fn escapes_headers(self) -> bool {
        !matches!(self, Self::Connect | Self::Connected)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One STOMP frame: command line, header lines, NUL-terminated body.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Frame command
    pub command: Command,
    /// Headers in wire order; on repeats the first occurrence wins
    pub headers: Vec<(String, String)>,
    /// Frame body, empty for most client frames
    pub body: String,
}

impl Frame {
    /// Create a frame with no headers and no body.
    #[must_use]
    pub const fn new(command: Command) -> Self {
        Self {
            command,
            headers: Vec::new(),
            body: String::new(),
        }
    }

    /// Append a header.
    #[must_use]
    pub fn with_header<N: Into<String>, V: Into<String>>(mut self, name: N, value: V) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Set the body.
    #[must_use]
    pub fn with_body<B: Into<String>>(mut self, body: B) -> Self {
        self.body = body.into();
        self
    }

    /// Client handshake frame advertising protocol version and heartbeat
    /// cadence (`send-millis,receive-millis`).
    #[must_use]
    pub fn connect(host: &str, heartbeat_millis: (u64, u64)) -> Self {
        Self::new(Command::Connect)
            .with_header("accept-version", "1.2")
            .with_header("host", host)
            .with_header(
                "heart-beat",
                format!("{},{}", heartbeat_millis.0, heartbeat_millis.1),
            )
    }

    /// Declare interest in `destination` under the subscription id `id`.
    #[must_use]
    pub fn subscribe(id: &str, destination: &str) -> Self {
        Self::new(Command::Subscribe)
            .with_header("id", id)
            .with_header("destination", destination)
    }

    /// Withdraw the subscription registered under `id`.
    #[must_use]
    pub fn unsubscribe(id: &str) -> Self {
        Self::new(Command::Unsubscribe).with_header("id", id)
    }

    /// Publish a JSON body to `destination`.
    #[must_use]
    pub fn send(destination: &str, body: String) -> Self {
        Self::new(Command::Send)
            .with_header("destination", destination)
            .with_header("content-type", "application/json")
            .with_body(body)
    }

    /// Polite shutdown frame.
    #[must_use]
    pub fn disconnect() -> Self {
        Self::new(Command::Disconnect)
    }

    /// Look up a header value. On repeated headers the first occurrence wins.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// The `destination` header, present on MESSAGE and SEND frames.
    #[must_use]
    pub fn destination(&self) -> Option<&str> {
        self.header("destination")
    }

    /// Serialize to the wire form: command line, header lines, blank line,
    /// body, NUL terminator.
    #[must_use]
    pub fn encode(&self) -> String {
        let escape = self.command.escapes_headers();
        let mut out = String::with_capacity(self.body.len() + 64);
        out.push_str(self.command.as_str());
        out.push('\n');
        for (name, value) in &self.headers {
            if escape {
                push_escaped(&mut out, name);
                out.push(':');
                push_escaped(&mut out, value);
            } else {
                out.push_str(name);
                out.push(':');
                out.push_str(value);
            }
            out.push('\n');
        }
        out.push('\n');
        out.push_str(&self.body);
        out.push('\0');
        out
    }

    /// Parse one inbound WebSocket text message.
    ///
    /// Returns `Ok(None)` for a heartbeat (a message containing only
    /// end-of-line characters). The body runs to the NUL terminator; octets
    /// after the NUL (additional trailing end-of-lines) are ignored.
    pub fn parse(input: &str) -> Result<Option<Self>, FrameError> {
        if input.chars().all(|c| c == '\n' || c == '\r') {
            return Ok(None);
        }

        let mut lines = input.split('\n');
        let command_line = lines.next().unwrap_or("").trim_end_matches('\r');
        let command = Command::from_line(command_line)
            .ok_or_else(|| FrameError::UnknownCommand(command_line.to_owned()))?;

        let mut headers = Vec::new();
        let mut consumed = command_line.len() + 1;
        for line in lines {
            consumed += line.len() + 1;
            let line = line.trim_end_matches('\r');
            if line.is_empty() {
                // Blank line ends the header section; the rest is body.
                let rest = input.get(consumed..).unwrap_or("");
                let body = rest
                    .split_once('\0')
                    .map(|(body, _)| body)
                    .ok_or(FrameError::MissingTerminator)?;
                return Ok(Some(Self {
                    command,
                    headers,
                    body: body.to_owned(),
                }));
            }
            let (name, value) = line
                .split_once(':')
                .ok_or_else(|| FrameError::MalformedHeader(line.to_owned()))?;
            if command.escapes_headers() {
                headers.push((unescape(name)?, unescape(value)?));
            } else {
                headers.push((name.to_owned(), value.to_owned()));
            }
        }

        Err(FrameError::MissingTerminator)
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} frame ({} headers)", self.command, self.headers.len())
    }
}

/// Escape a header octet sequence per STOMP 1.2.
fn push_escaped(out: &mut String, value: &str) {
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\r' => out.push_str("\\r"),
            '\n' => out.push_str("\\n"),
            ':' => out.push_str("\\c"),
            other => out.push(other),
        }
    }
}

fn unescape(value: &str) -> Result<String, FrameError> {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('r') => out.push('\r'),
            Some('n') => out.push('\n'),
            Some('c') => out.push(':'),
            other => {
                let mut seq = String::from('\\');
                if let Some(o) = other {
                    seq.push(o);
                }
                return Err(FrameError::InvalidEscape(seq));
            }
        }
    }
    Ok(out)
}

/// STOMP frame syntax errors.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    /// Command line did not match any known STOMP command
    UnknownCommand(String),
    /// Header line without a `:` separator
    MalformedHeader(String),
    /// Invalid escape sequence in a header octet stream
    InvalidEscape(String),
    /// Frame body is not NUL-terminated
    MissingTerminator,
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownCommand(cmd) => write!(f, "unknown STOMP command: {cmd:?}"),
            Self::MalformedHeader(line) => write!(f, "malformed STOMP header line: {line:?}"),
            Self::InvalidEscape(seq) => write!(f, "invalid STOMP header escape: {seq:?}"),
            Self::MissingTerminator => write!(f, "STOMP frame body is missing the NUL terminator"),
        }
    }
}

impl StdError for FrameError {}
