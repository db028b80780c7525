//! MPD text protocol: command parsing and replies.
//!
//! Only the commands needed to serve album art are understood:
//! `albumart`, plus `ping` and `close` for connection housekeeping.
//! Everything else (including `readpicture`) is an unknown command.
//!
//! Errors are reported the MPD way:
//!
//! ```text
//! ACK [<code>@0] {<command>} <message>
//! ```

pub mod albumart;
pub mod response;
pub mod server;

pub use albumart::AlbumArtService;
pub use response::ArtReply;
pub use server::Server;

use std::fmt;

/// `ACK_ERROR_ARG`: bad or missing arguments
const ACK_ERROR_ARG: u8 = 2;
/// `ACK_ERROR_UNKNOWN`: unknown command
const ACK_ERROR_UNKNOWN: u8 = 5;

/// Command-level protocol errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    #[error("No command given")]
    Empty,

    #[error("unknown command \"{0}\"")]
    UnknownCommand(String),

    #[error("wrong number of arguments for \"{0}\"")]
    WrongArgCount(String),

    #[error("Integer expected: {0}")]
    IntegerExpected(String),

    #[error("Missing closing '\"'")]
    UnterminatedQuote,

    #[error("line too long")]
    LineTooLong,
}

impl ProtocolError {
    fn code(&self) -> u8 {
        match self {
            ProtocolError::Empty | ProtocolError::UnknownCommand(_) => ACK_ERROR_UNKNOWN,
            _ => ACK_ERROR_ARG,
        }
    }
}

/// A failed command, rendered as an `ACK` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ack {
    pub command: String,
    pub error: ProtocolError,
}

impl fmt::Display for Ack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ACK [{}@0] {{{}}} {}",
            self.error.code(),
            self.command,
            self.error
        )
    }
}

/// A parsed client command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `albumart <uri> <offset>`
    AlbumArt { uri: String, offset: u64 },
    Ping,
    Close,
}

impl Command {
    /// Parse one request line (without the trailing newline).
    pub fn parse(line: &str) -> Result<Self, Ack> {
        let ack = |command: &str, error| Ack {
            command: command.to_string(),
            error,
        };

        let tokens = tokenize(line).map_err(|e| ack("", e))?;
        let Some((name, args)) = tokens.split_first() else {
            return Err(ack("", ProtocolError::Empty));
        };

        match name.as_str() {
            "albumart" => match args {
                [uri, offset] => {
                    let offset = offset
                        .parse::<u64>()
                        .map_err(|_| ack(name, ProtocolError::IntegerExpected(offset.clone())))?;
                    Ok(Command::AlbumArt {
                        uri: uri.clone(),
                        offset,
                    })
                }
                _ => Err(ack(name, ProtocolError::WrongArgCount(name.clone()))),
            },
            "ping" | "close" if !args.is_empty() => {
                Err(ack(name, ProtocolError::WrongArgCount(name.clone())))
            }
            "ping" => Ok(Command::Ping),
            "close" => Ok(Command::Close),
            _ => Err(ack(name, ProtocolError::UnknownCommand(name.clone()))),
        }
    }
}

/// Split a request line into words.
///
/// Words are separated by spaces or tabs. A word may be wrapped in double
/// quotes, inside which `\"` and `\\` are escapes.
pub fn tokenize(line: &str) -> Result<Vec<String>, ProtocolError> {
    let mut tokens = Vec::new();
    let mut chars = line.chars().peekable();

    loop {
        while chars.next_if(|c| *c == ' ' || *c == '\t').is_some() {}
        let Some(&first) = chars.peek() else {
            break;
        };

        let mut token = String::new();
        if first == '"' {
            chars.next();
            loop {
                match chars.next() {
                    Some('"') => break,
                    Some('\\') => match chars.next() {
                        Some(escaped) => token.push(escaped),
                        None => return Err(ProtocolError::UnterminatedQuote),
                    },
                    Some(c) => token.push(c),
                    None => return Err(ProtocolError::UnterminatedQuote),
                }
            }
        } else {
            while let Some(c) = chars.next_if(|c| *c != ' ' && *c != '\t') {
                token.push(c);
            }
        }
        tokens.push(token);
    }

    Ok(tokens)
}
