//! Hook protocol commands
//!
//! One command per line, whitespace separated:
//!
//! ```text
//! open <conn>                -> allow
//! publish <conn> <path>      -> allow | deny
//! unpublish <conn> <path>    -> ok
//! close <conn>               -> ok
//! status                     -> session <camera> <path> <conn> <age_ms> ... end
//! stats                      -> stats active=.. admitted=.. ...
//! ```

use super::dispatch::GatewayEvent;
use crate::session::ConnectionHandle;

/// Parsed hook command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookCommand {
    /// Forward a Gateway event
    Event(GatewayEvent),
    /// List admitted sessions
    Status,
    /// Report registry statistics
    Stats,
}

/// Error parsing a hook command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// Blank line
    Empty,
    /// Unrecognized command word
    Unknown(String),
    /// Required argument absent
    MissingArgument {
        command: &'static str,
        argument: &'static str,
    },
    /// Extra input after the last argument
    TrailingInput(&'static str),
}

impl std::fmt::Display for CommandError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CommandError::Empty => write!(f, "empty command"),
            CommandError::Unknown(word) => write!(f, "unknown command: {}", word),
            CommandError::MissingArgument { command, argument } => {
                write!(f, "{} requires <{}>", command, argument)
            }
            CommandError::TrailingInput(command) => {
                write!(f, "unexpected arguments after {}", command)
            }
        }
    }
}

impl std::error::Error for CommandError {}

impl HookCommand {
    /// Parse a single command line
    pub fn parse(line: &str) -> Result<Self, CommandError> {
        let mut words = line.split_whitespace();
        let command = words.next().ok_or(CommandError::Empty)?;

        let parsed = match command {
            "open" => HookCommand::Event(GatewayEvent::ConnectionOpened {
                connection: connection_arg(&mut words, "open")?,
            }),
            "publish" => HookCommand::Event(GatewayEvent::PublishRequested {
                connection: connection_arg(&mut words, "publish")?,
                stream_path: path_arg(&mut words, "publish")?,
            }),
            "unpublish" => HookCommand::Event(GatewayEvent::PublishEnded {
                connection: connection_arg(&mut words, "unpublish")?,
                stream_path: path_arg(&mut words, "unpublish")?,
            }),
            "close" => HookCommand::Event(GatewayEvent::ConnectionClosed {
                connection: connection_arg(&mut words, "close")?,
            }),
            "status" => HookCommand::Status,
            "stats" => HookCommand::Stats,
            other => return Err(CommandError::Unknown(other.to_string())),
        };

        if words.next().is_some() {
            return Err(CommandError::TrailingInput(command_name(&parsed)));
        }

        Ok(parsed)
    }
}

fn command_name(command: &HookCommand) -> &'static str {
    match command {
        HookCommand::Event(GatewayEvent::ConnectionOpened { .. }) => "open",
        HookCommand::Event(GatewayEvent::PublishRequested { .. }) => "publish",
        HookCommand::Event(GatewayEvent::PublishEnded { .. }) => "unpublish",
        HookCommand::Event(GatewayEvent::ConnectionClosed { .. }) => "close",
        HookCommand::Status => "status",
        HookCommand::Stats => "stats",
    }
}

fn connection_arg<'a>(
    words: &mut impl Iterator<Item = &'a str>,
    command: &'static str,
) -> Result<ConnectionHandle, CommandError> {
    words
        .next()
        .map(ConnectionHandle::from)
        .ok_or(CommandError::MissingArgument {
            command,
            argument: "conn",
        })
}

fn path_arg<'a>(
    words: &mut impl Iterator<Item = &'a str>,
    command: &'static str,
) -> Result<String, CommandError> {
    words
        .next()
        .map(str::to_string)
        .ok_or(CommandError::MissingArgument {
            command,
            argument: "path",
        })
}
