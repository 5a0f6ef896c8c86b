//! [`RpcClient`] for the JSON greeter served by this crate.
use stampede::core::{ConnectOptions, Endpoint, InvocationResult, Status};
use stampede::{ConnectError, InvokeError, Payload, RpcClient, TeardownError};
use tokio::time::Instant;
#[allow(unused)]
use tracing::{debug, error, info, trace, warn};

/// Maps RPC calls onto `POST http://<host>:<port>/<method>`.
///
/// A connection is a base URL whose `/health` endpoint answered; the underlying HTTP connections
/// are pooled by `reqwest`. The endpoint's resolver scheme is ignored, hosts are resolved through
/// DNS.
#[derive(Clone, Debug, Default)]
pub struct JsonRpcClient {
    http: reqwest::Client,
}

#[derive(Debug)]
pub struct JsonChannel {
    base: String,
    open: bool,
}

impl JsonRpcClient {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RpcClient for JsonRpcClient {
    type Connection = JsonChannel;

    async fn connect(
        &self,
        endpoint: &Endpoint,
        options: &ConnectOptions,
    ) -> Result<JsonChannel, ConnectError> {
        let scheme = if options.plaintext { "http" } else { "https" };
        let base = format!("{scheme}://{}", endpoint.address());

        let mut request = self.http.get(format!("{base}/health"));
        if let Some(timeout) = options.timeout {
            request = request.timeout(timeout);
        }

        request
            .send()
            .await
            .and_then(|res| res.error_for_status())
            .map_err(|err| ConnectError::new(endpoint, err))?;

        trace!("Channel open to {base}");
        Ok(JsonChannel { base, open: true })
    }

    async fn invoke(
        &self,
        connection: &mut JsonChannel,
        method: &str,
        payload: &Payload,
    ) -> Result<InvocationResult, InvokeError> {
        if !connection.open {
            return Err(InvokeError::new(method, "channel is closed"));
        }

        let start = Instant::now();
        let res = self
            .http
            .post(format!("{}/{method}", connection.base))
            .json(payload)
            .send()
            .await
            .map_err(|err| InvokeError::new(method, err))?;

        let status = res
            .headers()
            .get("grpc-status")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<i32>().ok())
            .map(Status::from_code)
            .unwrap_or(if res.status().is_success() {
                Status::Ok
            } else {
                Status::Unknown
            });

        let body: serde_json::Value = res
            .json()
            .await
            .map_err(|err| InvokeError::new(method, err))?;
        let message = body["message"].as_str().unwrap_or_default().to_string();

        Ok(InvocationResult::new(status, message, start.elapsed()))
    }

    async fn close(&self, connection: &mut JsonChannel) -> Result<(), TeardownError> {
        if connection.open {
            trace!("Channel to {} closed", connection.base);
            connection.open = false;
        }
        Ok(())
    }
}
