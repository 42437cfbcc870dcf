use std::fmt;

/// Version of the STOMP protocol spoken by this codec
pub const STOMP_VERSION: &str = "1.2";

/// Errors produced while parsing, building or validating STOMP frames
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StompFrameError {
    /// The input contained no command line
    #[error("Frame is empty")]
    Empty,

    /// The command line is not a STOMP 1.2 command
    #[error("Unknown STOMP command: {0}")]
    UnknownCommand(String),

    /// A header line is missing the colon separator
    #[error("Malformed header line: {0}")]
    MalformedHeader(String),

    /// A header contained a backslash escape outside the STOMP 1.2 set
    #[error("Invalid escape sequence in header: {0}")]
    InvalidEscape(String),

    /// A required header for the command is absent
    #[error("{command} frame is missing required header '{header}'")]
    MissingHeader {
        command: String,
        header: &'static str,
    },

    /// Only SEND, MESSAGE and ERROR frames may carry a body
    #[error("{0} frame must not carry a body")]
    UnexpectedBody(String),

    /// The frame body is not terminated by a NUL octet
    #[error("Frame body is not terminated by a NUL octet")]
    MissingNullTerminator,

    /// The content-length header does not parse as a byte count
    #[error("Invalid content-length header: {0}")]
    InvalidContentLength(String),

    /// The declared content-length exceeds the available body bytes
    #[error("content-length {declared} does not match body ({available} bytes available)")]
    ContentLengthMismatch { declared: usize, available: usize },

    /// The frame body is not valid UTF-8
    #[error("Frame body is not valid UTF-8")]
    InvalidBody,
}

/// STOMP 1.2 frame commands, client- and server-originated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StompCommand {
    // Client commands
    Stomp,
    Connect,
    Send,
    Subscribe,
    Unsubscribe,
    Ack,
    Nack,
    Begin,
    Commit,
    Abort,
    Disconnect,
    // Server commands
    Connected,
    Message,
    Receipt,
    Error,
}

impl StompCommand {
    /// Wire representation of the command
    pub fn as_str(self) -> &'static str {
        match self {
            StompCommand::Stomp => "STOMP",
            StompCommand::Connect => "CONNECT",
            StompCommand::Send => "SEND",
            StompCommand::Subscribe => "SUBSCRIBE",
            StompCommand::Unsubscribe => "UNSUBSCRIBE",
            StompCommand::Ack => "ACK",
            StompCommand::Nack => "NACK",
            StompCommand::Begin => "BEGIN",
            StompCommand::Commit => "COMMIT",
            StompCommand::Abort => "ABORT",
            StompCommand::Disconnect => "DISCONNECT",
            StompCommand::Connected => "CONNECTED",
            StompCommand::Message => "MESSAGE",
            StompCommand::Receipt => "RECEIPT",
            StompCommand::Error => "ERROR",
        }
    }

    /// Parse a command line as received on the wire
    pub fn from_wire(value: &str) -> Result<Self, StompFrameError> {
        match value {
            "STOMP" => Ok(StompCommand::Stomp),
            "CONNECT" => Ok(StompCommand::Connect),
            "SEND" => Ok(StompCommand::Send),
            "SUBSCRIBE" => Ok(StompCommand::Subscribe),
            "UNSUBSCRIBE" => Ok(StompCommand::Unsubscribe),
            "ACK" => Ok(StompCommand::Ack),
            "NACK" => Ok(StompCommand::Nack),
            "BEGIN" => Ok(StompCommand::Begin),
            "COMMIT" => Ok(StompCommand::Commit),
            "ABORT" => Ok(StompCommand::Abort),
            "DISCONNECT" => Ok(StompCommand::Disconnect),
            "CONNECTED" => Ok(StompCommand::Connected),
            "MESSAGE" => Ok(StompCommand::Message),
            "RECEIPT" => Ok(StompCommand::Receipt),
            "ERROR" => Ok(StompCommand::Error),
            other => Err(StompFrameError::UnknownCommand(other.to_string())),
        }
    }

    /// Headers STOMP 1.2 requires for this command
    fn required_headers(self) -> &'static [&'static str] {
        match self {
            StompCommand::Stomp | StompCommand::Connect => &["accept-version", "host"],
            StompCommand::Connected => &["version"],
            StompCommand::Send => &["destination"],
            StompCommand::Subscribe => &["destination", "id"],
            StompCommand::Unsubscribe | StompCommand::Ack | StompCommand::Nack => &["id"],
            StompCommand::Begin | StompCommand::Commit | StompCommand::Abort => &["transaction"],
            StompCommand::Message => &["destination", "message-id", "subscription"],
            StompCommand::Receipt => &["receipt-id"],
            StompCommand::Disconnect | StompCommand::Error => &[],
        }
    }

    /// Only SEND, MESSAGE and ERROR frames may carry a body
    fn allows_body(self) -> bool {
        matches!(
            self,
            StompCommand::Send | StompCommand::Message | StompCommand::Error
        )
    }

    /// Connection handshake frames (STOMP, CONNECT, CONNECTED) exchange
    /// headers verbatim; every other command uses the STOMP 1.2 backslash
    /// escaping
    fn escapes_headers(self) -> bool {
        !matches!(
            self,
            StompCommand::Stomp | StompCommand::Connect | StompCommand::Connected
        )
    }
}

impl fmt::Display for StompCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single STOMP 1.2 frame: command line, header lines, blank line, body,
/// NUL octet.
///
/// Header order is preserved; when a header repeats, the first occurrence
/// wins on lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StompFrame {
    /// Frame command
    pub command: StompCommand,
    /// Ordered header name/value pairs
    pub headers: Vec<(String, String)>,
    /// Frame body (empty for header-only frames)
    pub body: String,
}

impl StompFrame {
    /// Create a frame with no headers and no body
    pub fn new(command: StompCommand) -> Self {
        Self {
            command,
            headers: Vec::new(),
            body: String::new(),
        }
    }

    /// Append a header (builder style)
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    /// Set the frame body (builder style)
    pub fn with_body(mut self, body: &str) -> Self {
        self.body = body.to_string();
        self
    }

    /// The connection handshake frame: `STOMP` with protocol version, host
    /// and credentials
    pub fn connect(host: &str, login: &str, passcode: &str) -> Self {
        Self::new(StompCommand::Stomp)
            .with_header("accept-version", STOMP_VERSION)
            .with_header("host", host)
            .with_header("login", login)
            .with_header("passcode", passcode)
    }

    /// A SUBSCRIBE frame for the given destination and subscription id
    pub fn subscribe(destination: &str, id: &str) -> Self {
        Self::new(StompCommand::Subscribe)
            .with_header("destination", destination)
            .with_header("id", id)
            .with_header("ack", "auto")
    }

    /// A SEND frame carrying a body to a destination
    pub fn send(destination: &str, body: &str) -> Self {
        Self::new(StompCommand::Send)
            .with_header("destination", destination)
            .with_body(body)
    }

    /// A DISCONNECT frame asking for a receipt
    pub fn disconnect(receipt: &str) -> Self {
        Self::new(StompCommand::Disconnect).with_header("receipt", receipt)
    }

    /// First value of the named header, per the STOMP repeated-header rule
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(header, _)| header == name)
            .map(|(_, value)| value.as_str())
    }

    /// Check the frame against STOMP 1.2 requirements: required headers
    /// present, body only where allowed
    pub fn validate(&self) -> Result<(), StompFrameError> {
        for required in self.command.required_headers() {
            if self.header(required).is_none() {
                return Err(StompFrameError::MissingHeader {
                    command: self.command.to_string(),
                    header: required,
                });
            }
        }
        if !self.body.is_empty() && !self.command.allows_body() {
            return Err(StompFrameError::UnexpectedBody(self.command.to_string()));
        }
        Ok(())
    }

    /// Serialize to the wire format. A `content-length` header is added
    /// automatically for non-empty bodies unless one is already present.
    pub fn encode(&self) -> String {
        let mut wire = String::new();
        wire.push_str(self.command.as_str());
        wire.push('\n');

        let escaping = self.command.escapes_headers();
        for (name, value) in &self.headers {
            if escaping {
                wire.push_str(&escape_header(name));
                wire.push(':');
                wire.push_str(&escape_header(value));
            } else {
                wire.push_str(name);
                wire.push(':');
                wire.push_str(value);
            }
            wire.push('\n');
        }
        if !self.body.is_empty() && self.header("content-length").is_none() {
            wire.push_str("content-length:");
            wire.push_str(&self.body.len().to_string());
            wire.push('\n');
        }

        wire.push('\n');
        wire.push_str(&self.body);
        wire.push('\0');
        wire
    }

    /// Parse and validate a frame from the wire format.
    ///
    /// The body is delimited by the `content-length` header when present,
    /// otherwise by the first NUL octet. Trailing end-of-line heartbeats
    /// after the NUL are tolerated.
    pub fn parse(input: &str) -> Result<Self, StompFrameError> {
        let (command_line, mut rest) = split_line(input).ok_or(StompFrameError::Empty)?;
        if command_line.is_empty() {
            return Err(StompFrameError::Empty);
        }
        let command = StompCommand::from_wire(command_line)?;

        let mut headers = Vec::new();
        loop {
            let (line, next) = split_line(rest).ok_or(StompFrameError::MissingNullTerminator)?;
            rest = next;
            if line.is_empty() {
                break;
            }
            let (name, value) = line
                .split_once(':')
                .ok_or_else(|| StompFrameError::MalformedHeader(line.to_string()))?;
            if command.escapes_headers() {
                headers.push((unescape_header(name)?, unescape_header(value)?));
            } else {
                headers.push((name.to_string(), value.to_string()));
            }
        }

        let content_length = headers
            .iter()
            .find(|(name, _)| name == "content-length")
            .map(|(_, value)| {
                value
                    .parse::<usize>()
                    .map_err(|_| StompFrameError::InvalidContentLength(value.clone()))
            })
            .transpose()?;

        let body = match content_length {
            Some(declared) => {
                let bytes = rest.as_bytes();
                if bytes.len() <= declared {
                    return Err(StompFrameError::ContentLengthMismatch {
                        declared,
                        available: bytes.len().saturating_sub(1),
                    });
                }
                if bytes[declared] != 0 {
                    return Err(StompFrameError::MissingNullTerminator);
                }
                std::str::from_utf8(&bytes[..declared])
                    .map_err(|_| StompFrameError::InvalidBody)?
                    .to_string()
            }
            None => {
                let nul = rest
                    .find('\0')
                    .ok_or(StompFrameError::MissingNullTerminator)?;
                rest[..nul].to_string()
            }
        };

        let frame = Self {
            command,
            headers,
            body,
        };
        frame.validate()?;
        Ok(frame)
    }
}

/// Split off one EOL-terminated line, tolerating CRLF
fn split_line(input: &str) -> Option<(&str, &str)> {
    let newline = input.find('\n')?;
    let line = input[..newline].strip_suffix('\r').unwrap_or(&input[..newline]);
    Some((line, &input[newline + 1..]))
}

/// Apply the STOMP 1.2 header escaping
fn escape_header(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '\\' => escaped.push_str("\\\\"),
            '\r' => escaped.push_str("\\r"),
            '\n' => escaped.push_str("\\n"),
            ':' => escaped.push_str("\\c"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// Undo the STOMP 1.2 header escaping; any other escape is fatal
fn unescape_header(value: &str) -> Result<String, StompFrameError> {
    let mut unescaped = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            unescaped.push(ch);
            continue;
        }
        match chars.next() {
            Some('r') => unescaped.push('\r'),
            Some('n') => unescaped.push('\n'),
            Some('c') => unescaped.push(':'),
            Some('\\') => unescaped.push('\\'),
            other => {
                let mut sequence = String::from('\\');
                if let Some(bad) = other {
                    sequence.push(bad);
                }
                return Err(StompFrameError::InvalidEscape(sequence));
            }
        }
    }
    Ok(unescaped)
}
