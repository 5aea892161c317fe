//! Minimal STOMP 1.2 client framing.
//!
//! Only the frames a subscribing client needs are modelled. One WebSocket
//! text message carries one frame; a message made only of line endings is a
//! heartbeat.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

use gavel_shared::constants::STOMP_ACCEPT_VERSION;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum StompError {
    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error("Malformed header line: {0}")]
    MalformedHeader(String),

    #[error("Invalid escape sequence in header")]
    InvalidEscape,

    #[error("Frame is missing the header terminator")]
    Truncated,

    #[error("Invalid content-length: {0}")]
    InvalidContentLength(String),

    #[error("Invalid heart-beat header: {0}")]
    InvalidHeartbeat(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Connect,
    Connected,
    Subscribe,
    Unsubscribe,
    Disconnect,
    Message,
    Receipt,
    Error,
}

impl Command {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Connect => "CONNECT",
            Self::Connected => "CONNECTED",
            Self::Subscribe => "SUBSCRIBE",
            Self::Unsubscribe => "UNSUBSCRIBE",
            Self::Disconnect => "DISCONNECT",
            Self::Message => "MESSAGE",
            Self::Receipt => "RECEIPT",
            Self::Error => "ERROR",
        }
    }

    fn parse(s: &str) -> Result<Self, StompError> {
        match s {
            "CONNECT" | "STOMP" => Ok(Self::Connect),
            "CONNECTED" => Ok(Self::Connected),
            "SUBSCRIBE" => Ok(Self::Subscribe),
            "UNSUBSCRIBE" => Ok(Self::Unsubscribe),
            "DISCONNECT" => Ok(Self::Disconnect),
            "MESSAGE" => Ok(Self::Message),
            "RECEIPT" => Ok(Self::Receipt),
            "ERROR" => Ok(Self::Error),
            other => Err(StompError::UnknownCommand(other.to_string())),
        }
    }

    // CONNECT and CONNECTED headers are sent verbatim.
    fn escapes_headers(&self) -> bool {
        !matches!(self, Self::Connect | Self::Connected)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Heartbeat intervals as carried in the `heart-beat` header.
///
/// `outgoing` is how often this side promises to send, `incoming` how often
/// it wants to receive. Zero disables the direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Heartbeat {
    pub outgoing: Duration,
    pub incoming: Duration,
}

impl Heartbeat {
    pub fn symmetric(interval: Duration) -> Self {
        Self {
            outgoing: interval,
            incoming: interval,
        }
    }

    pub fn header_value(&self) -> String {
        format!(
            "{},{}",
            self.outgoing.as_millis(),
            self.incoming.as_millis()
        )
    }

    pub fn parse(value: &str) -> Result<Self, StompError> {
        let invalid = || StompError::InvalidHeartbeat(value.to_string());
        let (out, inc) = value.trim().split_once(',').ok_or_else(invalid)?;
        let out: u64 = out.trim().parse().map_err(|_| invalid())?;
        let inc: u64 = inc.trim().parse().map_err(|_| invalid())?;
        Ok(Self {
            outgoing: Duration::from_millis(out),
            incoming: Duration::from_millis(inc),
        })
    }

    /// Effective client-side intervals once the server's CONNECTED header is
    /// known.
    pub fn negotiate(client: Heartbeat, server: Heartbeat) -> Heartbeat {
        fn pick(ours: Duration, theirs: Duration) -> Duration {
            if ours.is_zero() || theirs.is_zero() {
                Duration::ZERO
            } else {
                ours.max(theirs)
            }
        }

        Heartbeat {
            outgoing: pick(client.outgoing, server.incoming),
            incoming: pick(client.incoming, server.outgoing),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub command: Command,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl Frame {
    pub fn new(command: Command) -> Self {
        Self {
            command,
            headers: Vec::new(),
            body: String::new(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// First value of a header; repeated headers keep the first occurrence.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// CONNECT frame. The access token travels here, once per connection.
    pub fn connect(host: &str, token: Option<&str>, heartbeat: Heartbeat) -> Self {
        let mut frame = Self::new(Command::Connect)
            .with_header("accept-version", STOMP_ACCEPT_VERSION)
            .with_header("host", host)
            .with_header("heart-beat", heartbeat.header_value());
        if let Some(token) = token {
            frame = frame.with_header("Authorization", format!("Bearer {token}"));
        }
        frame
    }

    pub fn subscribe(id: &str, destination: &str) -> Self {
        Self::new(Command::Subscribe)
            .with_header("id", id)
            .with_header("destination", destination)
            .with_header("ack", "auto")
    }

    pub fn unsubscribe(id: &str) -> Self {
        Self::new(Command::Unsubscribe).with_header("id", id)
    }

    pub fn disconnect() -> Self {
        Self::new(Command::Disconnect)
    }

    pub fn encode(&self) -> String {
        let escape = self.command.escapes_headers();
        let mut out = String::with_capacity(64 + self.body.len());
        out.push_str(self.command.as_str());
        out.push('\n');
        for (name, value) in &self.headers {
            if escape {
                out.push_str(&escape_header(name));
                out.push(':');
                out.push_str(&escape_header(value));
            } else {
                out.push_str(name);
                out.push(':');
                out.push_str(value);
            }
            out.push('\n');
        }
        if !self.body.is_empty() && self.header("content-length").is_none() {
            out.push_str(&format!("content-length:{}\n", self.body.len()));
        }
        out.push('\n');
        out.push_str(&self.body);
        out.push('\0');
        out
    }

    /// Parse one frame. `Ok(None)` means the message was a heartbeat.
    pub fn decode(raw: &str) -> Result<Option<Frame>, StompError> {
        let raw = raw.trim_start_matches(|c: char| c == '\r' || c == '\n');
        if raw.is_empty() || raw == "\0" {
            return Ok(None);
        }

        let (head, rest) = split_head(raw).ok_or(StompError::Truncated)?;
        let mut lines = head.lines();
        let command = Command::parse(lines.next().unwrap_or_default().trim_end())?;
        let unescape = command.escapes_headers();

        let mut headers = Vec::new();
        for line in lines {
            let line = line.strip_suffix('\r').unwrap_or(line);
            let (name, value) = line
                .split_once(':')
                .ok_or_else(|| StompError::MalformedHeader(line.to_string()))?;
            if unescape {
                headers.push((unescape_header(name)?, unescape_header(value)?));
            } else {
                headers.push((name.to_string(), value.to_string()));
            }
        }

        let frame = Frame {
            command,
            headers,
            body: String::new(),
        };

        let body = match frame.header("content-length") {
            Some(len) => {
                let n: usize = len
                    .trim()
                    .parse()
                    .map_err(|_| StompError::InvalidContentLength(len.to_string()))?;
                rest.get(..n)
                    .ok_or_else(|| StompError::InvalidContentLength(len.to_string()))?
            }
            None => rest.split('\0').next().unwrap_or_default(),
        };

        Ok(Some(Frame {
            body: body.to_string(),
            ..frame
        }))
    }
}

/// Split at the first blank line, accepting LF or CRLF line endings.
fn split_head(raw: &str) -> Option<(&str, &str)> {
    let lf = raw.find("\n\n").map(|i| (i, 2));
    let crlf = raw.find("\r\n\r\n").map(|i| (i, 4));
    let (at, sep) = match (lf, crlf) {
        (Some(a), Some(b)) => {
            if a.0 <= b.0 {
                a
            } else {
                b
            }
        }
        (a, b) => a.or(b)?,
    };
    Some((&raw[..at], &raw[at + sep..]))
}

fn escape_header(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\r' => out.push_str("\\r"),
            '\n' => out.push_str("\\n"),
            ':' => out.push_str("\\c"),
            other => out.push(other),
        }
    }
    out
}

fn unescape_header(s: &str) -> Result<String, StompError> {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
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
            _ => return Err(StompError::InvalidEscape),
        }
    }
    Ok(out)
}
