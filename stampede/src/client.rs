//! The RPC client seam.
//!
//! Stampede does not speak any wire protocol itself. Anything that can open a connection to an
//! [`Endpoint`], invoke a named method with a JSON payload and close the connection again can be
//! driven by the scheduler.
use stampede_core::{ConnectOptions, Endpoint, InvocationResult};
use std::fmt::Display;
use std::future::Future;
use thiserror::Error;

/// Request body handed to [`RpcClient::invoke`].
pub type Payload = serde_json::Value;

/// An RPC client shared by every virtual user of a run.
///
/// Connections are owned by exactly one virtual user and are never shared. `close` must be
/// idempotent: closing an already closed connection is a no-op.
///
/// # Example
/// ```ignore
/// impl RpcClient for MyClient {
///     type Connection = MyChannel;
///
///     async fn connect(&self, endpoint: &Endpoint, options: &ConnectOptions) -> Result<MyChannel, ConnectError> {
///         ...
///     }
///     ...
/// }
/// ```
pub trait RpcClient: Send + Sync + 'static {
    type Connection: Send + 'static;

    fn connect(
        &self,
        endpoint: &Endpoint,
        options: &ConnectOptions,
    ) -> impl Future<Output = Result<Self::Connection, ConnectError>> + Send;

    fn invoke(
        &self,
        connection: &mut Self::Connection,
        method: &str,
        payload: &Payload,
    ) -> impl Future<Output = Result<InvocationResult, InvokeError>> + Send;

    fn close(
        &self,
        connection: &mut Self::Connection,
    ) -> impl Future<Output = Result<(), TeardownError>> + Send;
}

/// Opening a connection failed. Fatal to the virtual user that attempted it, never to the run.
#[derive(Clone, Debug, Error)]
#[error("Failed to connect to {endpoint}: {reason}")]
pub struct ConnectError {
    pub endpoint: String,
    pub reason: String,
}

impl ConnectError {
    pub fn new(endpoint: impl Display, reason: impl Display) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// A single call failed before producing a status. Recorded as failed checks.
#[derive(Clone, Debug, Error)]
#[error("Failed to invoke {method}: {reason}")]
pub struct InvokeError {
    pub method: String,
    pub reason: String,
}

impl InvokeError {
    pub fn new(method: impl Display, reason: impl Display) -> Self {
        Self {
            method: method.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Closing a connection failed. Logged and counted, never escalated.
#[derive(Clone, Debug, Error)]
#[error("Failed to close connection: {reason}")]
pub struct TeardownError {
    pub reason: String,
}

impl TeardownError {
    pub fn new(reason: impl Display) -> Self {
        Self {
            reason: reason.to_string(),
        }
    }
}
