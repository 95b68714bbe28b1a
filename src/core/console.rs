//! Line-oriented operator console read from stdin.
//!
//! ```text
//! set light.porch on                       change a local entity
//! call toggle_state light.office_seattle   invoke remote_entity
//! call set_state input_select.mode_tahoe Away
//! ping [nonce]
//! dump
//! loglevel debug
//! ```

use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Set { entity_id: String, value: String },
    Call {
        action: String,
        entity_id: String,
        value: Option<String>,
    },
    Ping { nonce: Option<String> },
    Dump,
    LogLevel(String),
    Help,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConsoleError {
    #[error("empty command")]
    Empty,
    #[error("unknown command {0:?}; try `help`")]
    Unknown(String),
    #[error("usage: {0}")]
    Usage(&'static str),
}

pub const HELP: &str = "commands: set <entity> <value> | call <action> <entity> [value] | ping [nonce] | dump | loglevel <filter> | help";

impl FromStr for ConsoleCommand {
    type Err = ConsoleError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (verb, rest) = match line.split_once(char::is_whitespace) {
            Some((verb, rest)) => (verb, rest.trim()),
            None => (line, ""),
        };
        match verb {
            "" => Err(ConsoleError::Empty),
            "set" => {
                // value keeps inner whitespace
                let (entity_id, value) = rest
                    .split_once(char::is_whitespace)
                    .ok_or(ConsoleError::Usage("set <entity> <value>"))?;
                Ok(Self::Set {
                    entity_id: entity_id.to_string(),
                    value: value.trim().to_string(),
                })
            }
            "call" => {
                let mut parts = rest.splitn(3, char::is_whitespace);
                let usage = ConsoleError::Usage("call <action> <entity> [value]");
                let action = parts.next().filter(|s| !s.is_empty()).ok_or(usage.clone())?;
                let entity_id = parts.next().filter(|s| !s.is_empty()).ok_or(usage)?;
                let value = parts
                    .next()
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string);
                Ok(Self::Call {
                    action: action.to_string(),
                    entity_id: entity_id.to_string(),
                    value,
                })
            }
            "ping" => Ok(Self::Ping {
                nonce: (!rest.is_empty()).then(|| rest.to_string()),
            }),
            "dump" => Ok(Self::Dump),
            "loglevel" if !rest.is_empty() => Ok(Self::LogLevel(rest.to_string())),
            "loglevel" => Err(ConsoleError::Usage("loglevel <filter>")),
            "help" | "?" => Ok(Self::Help),
            other => Err(ConsoleError::Unknown(other.to_string())),
        }
    }
}
