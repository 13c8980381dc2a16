//! Remote Command Gateway
//!
//! The only path to persisted data. A call is a command name plus a JSON
//! argument bundle; the answer is a JSON value or a failure. Transport is
//! owned by whoever implements [`RemoteGateway`].

pub mod memory;

pub use memory::InMemoryBackend;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use thiserror::Error;

use crate::error::{StoreError, StoreResult};

/// A command invocation sent to the backend
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GatewayCall {
    /// Name of the remote command (e.g. `get_jornaleros`)
    pub command: String,
    /// Structured arguments for the command
    pub args: Value,
}

impl GatewayCall {
    pub fn new(command: impl Into<String>, args: Value) -> Self {
        Self {
            command: command.into(),
            args,
        }
    }

    /// A call with an empty argument bundle
    pub fn bare(command: impl Into<String>) -> Self {
        Self::new(command, Value::Object(Default::default()))
    }
}

/// Failure reported by a gateway implementation
#[derive(Debug, Clone, Error, PartialEq)]
pub enum GatewayError {
    /// The call never reached the backend or its answer was lost
    #[error("{0}")]
    Transport(String),
    /// The backend refused the command
    #[error("{0}")]
    Rejected(String),
    /// No handler is registered for the command
    #[error("unknown command: {0}")]
    UnknownCommand(String),
}

/// Request/response boundary to the backend
#[async_trait]
pub trait RemoteGateway: Send + Sync {
    /// Execute a command and suspend until it settles
    async fn invoke(&self, call: GatewayCall) -> Result<Value, GatewayError>;
}

/// Invoke a command and decode its answer into `T`
pub async fn invoke_typed<T: DeserializeOwned>(
    gateway: &dyn RemoteGateway,
    call: GatewayCall,
) -> StoreResult<T> {
    let command = call.command.clone();
    tracing::debug!(command = %command, "gateway call");
    let value = gateway
        .invoke(call)
        .await
        .map_err(|e| StoreError::remote(&command, e))?;
    serde_json::from_value(value).map_err(|source| StoreError::Decode { command, source })
}

/// Result of a mutating command
///
/// Most commands answer with a confirmation message; some answer with the
/// stored record instead.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Receipt {
    Message(String),
    Record(Value),
}

impl Receipt {
    pub fn message(&self) -> Option<&str> {
        match self {
            Receipt::Message(m) => Some(m),
            Receipt::Record(_) => None,
        }
    }

    /// The `id` field of a returned record, if there is one
    pub fn record_id(&self) -> Option<i64> {
        match self {
            Receipt::Record(v) => v.get("id").and_then(Value::as_i64),
            Receipt::Message(_) => None,
        }
    }
}

impl fmt::Display for Receipt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Receipt::Message(m) => write!(f, "{}", m),
            Receipt::Record(v) => write!(f, "{}", v),
        }
    }
}
