// stack-cache: normalized query cache for stacked branches
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Error handling module.
//!
//! ```text
//!            StateError (~24 bytes)
//!                    |
//!     +---------+----+-----+--------+
//!     v         v          v        v
//!  Gateway   Config    Shutdown  Io/Other
//!    Box       Box     NoRuntime  Box<str>
//!
//! GatewayError, grouped by ErrorKind:
//!   Transport   Unreachable, Timeout
//!   Validation  UnknownCommand, InvalidParams, Decode
//!   Domain      Rejected
//!
//! A selector miss is not an error: it is `None`.
//! ```

use thiserror::Error;

/// Convenience alias for `anyhow::Result`.
pub type Result<T> = anyhow::Result<T>;

/// Result type using [`StateError`].
pub type StateResult<T> = std::result::Result<T, StateError>;

/// Result type for a single gateway round trip.
pub type GatewayResult<T> = std::result::Result<T, GatewayError>;

/// Top-level error type of the client state.
///
/// Sub-errors are boxed to keep this enum at ~24 bytes on the stack.
#[derive(Debug, Error)]
pub enum StateError {
    /// A backend command failed.
    #[error("gateway error")]
    Gateway(#[from] Box<GatewayError>),

    /// Configuration error.
    #[error("config error")]
    Config(#[from] Box<ConfigError>),

    /// The client state was shut down while the operation was pending.
    #[error("client state has been shut down")]
    Shutdown,

    /// A request had to be issued outside of a tokio runtime.
    #[error("no tokio runtime to run the request on")]
    NoRuntime,

    /// I/O error.
    #[error("io error: {0}")]
    Io(Box<std::io::Error>),

    /// Generic error with message.
    #[error("{0}")]
    Other(Box<str>),
}

// --- From implementations for boxing ---

/// Macro to generate `From` implementations that box the source error.
macro_rules! impl_from_boxed {
    ($($error:ty => $variant:ident),+ $(,)?) => {
        $(
            impl From<$error> for StateError {
                fn from(err: $error) -> Self {
                    StateError::$variant(Box::new(err))
                }
            }
        )+
    };
}

impl_from_boxed! {
    GatewayError => Gateway,
    ConfigError => Config,
    std::io::Error => Io,
}

impl StateError {
    /// Returns the gateway error if this is one.
    #[must_use]
    pub fn as_gateway(&self) -> Option<&GatewayError> {
        match self {
            Self::Gateway(err) => Some(err),
            _ => None,
        }
    }
}

// --- Gateway Errors ---

/// Coarse classification of a [`GatewayError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Gateway unreachable or timed out.
    Transport,
    /// Unknown command, malformed params, or an undecodable response.
    Validation,
    /// The backend rejected the operation.
    Domain,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transport => write!(f, "transport"),
            Self::Validation => write!(f, "validation"),
            Self::Domain => write!(f, "domain"),
        }
    }
}

/// Failure of one command round trip.
///
/// Cloneable so a single failed fetch can be surfaced to every subscriber
/// of the cache entry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// The backend could not be reached.
    #[error("command '{command}' could not reach the backend: {message}")]
    Unreachable { command: String, message: String },

    /// The round trip took longer than the configured timeout.
    #[error("command '{command}' timed out after {timeout_ms} ms")]
    Timeout { command: String, timeout_ms: u64 },

    /// The backend does not know the command.
    #[error("unknown command '{command}'")]
    UnknownCommand { command: String },

    /// The backend refused the parameters.
    #[error("invalid params for '{command}': {message}")]
    InvalidParams { command: String, message: String },

    /// The response did not have the expected shape.
    #[error("failed to decode response of '{command}': {message}")]
    Decode { command: String, message: String },

    /// The backend rejected the operation.
    #[error("command '{command}' was rejected: {message}")]
    Rejected { command: String, message: String },
}

impl GatewayError {
    /// Returns the error class.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Unreachable { .. } | Self::Timeout { .. } => ErrorKind::Transport,
            Self::UnknownCommand { .. } | Self::InvalidParams { .. } | Self::Decode { .. } => {
                ErrorKind::Validation
            }
            Self::Rejected { .. } => ErrorKind::Domain,
        }
    }

    /// Returns the command the error belongs to.
    #[must_use]
    pub fn command(&self) -> &str {
        match self {
            Self::Unreachable { command, .. }
            | Self::Timeout { command, .. }
            | Self::UnknownCommand { command }
            | Self::InvalidParams { command, .. }
            | Self::Decode { command, .. }
            | Self::Rejected { command, .. } => command,
        }
    }

    pub(crate) fn decode(command: &str, err: &serde_json::Error) -> Self {
        Self::Decode {
            command: command.to_string(),
            message: err.to_string(),
        }
    }
}

// --- Config Errors ---

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to parse a configuration source or override.
    #[error("failed to parse config '{source_name}': {message}")]
    ParseError {
        source_name: String,
        message: String,
    },

    /// Missing required configuration key.
    #[error("missing required config key '{key}' in section '[{section}]'")]
    MissingKey { section: String, key: String },

    /// Invalid configuration value.
    #[error("invalid value for '{key}' in section '[{section}]': {message}")]
    InvalidValue {
        section: String,
        key: String,
        message: String,
    },
}
