// Theme Editor Commands
// Named operations invoked through /api/invoke/:command

mod theme;

pub use theme::*;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::services::{CssError, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("Invalid payload")]
    InvalidPayload,

    #[error("Missing argument: {0}")]
    MissingArgument(String),

    #[error("Invalid {key}: {reason}")]
    InvalidArgument { key: String, reason: String },

    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Css(#[from] CssError),
}

impl CommandError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, CommandError::Store(StoreError::NotFound(_)))
    }

    /// Message safe to return to a client. Storage failures are logged and
    /// replaced with a generic message.
    pub fn client_message(&self) -> String {
        match self {
            CommandError::Store(
                StoreError::Io(_)
                | StoreError::Serialize(_)
                | StoreError::Corrupt(_)
                | StoreError::Poisoned,
            )
            | CommandError::Css(CssError::Io(_)) => {
                log::error!("Command failed: {self}");
                "Operation failed".to_string()
            }
            _ => self.to_string(),
        }
    }
}

pub(crate) fn get_arg<T: DeserializeOwned>(payload: &Value, key: &str) -> Result<T, CommandError> {
    let obj = payload.as_object().ok_or(CommandError::InvalidPayload)?;
    let value = obj
        .get(key)
        .ok_or_else(|| CommandError::MissingArgument(key.to_string()))?;
    serde_json::from_value(value.clone()).map_err(|e| CommandError::InvalidArgument {
        key: key.to_string(),
        reason: e.to_string(),
    })
}

pub(crate) fn get_opt_arg<T: DeserializeOwned>(
    payload: &Value,
    key: &str,
) -> Result<Option<T>, CommandError> {
    let obj = payload.as_object().ok_or(CommandError::InvalidPayload)?;
    let value = match obj.get(key) {
        Some(value) => value.clone(),
        None => return Ok(None),
    };

    if value.is_null() {
        return Ok(None);
    }

    serde_json::from_value(value)
        .map(Some)
        .map_err(|e| CommandError::InvalidArgument {
            key: key.to_string(),
            reason: e.to_string(),
        })
}
