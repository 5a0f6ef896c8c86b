use crate::ConfigError;
use std::fmt;
use std::str::FromStr;

/// A parsed RPC target of the form `[scheme://[authority]/]host[:port]`.
///
/// The scheme (for example `k8s` or `dns`) is kept so that resolver-aware clients can pick the
/// right name resolution; clients which only speak plain addresses can use [`Endpoint::address`].
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Endpoint {
    scheme: Option<String>,
    host: String,
    port: Option<u16>,
}

impl Endpoint {
    pub fn new(host: &str, port: Option<u16>) -> Self {
        Self {
            scheme: None,
            host: host.to_string(),
            port,
        }
    }

    pub fn with_scheme(mut self, scheme: &str) -> Self {
        self.scheme = Some(scheme.to_string());
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn parse(target: &str) -> Result<Self, ConfigError> {
        let (scheme, endpoint) = match target.split_once("://") {
            // NOTE: Anything between `://` and the next `/` is the authority, which no resolver we
            // support makes use of.
            Some((scheme, rest)) => {
                let endpoint = rest.split_once('/').map(|(_, e)| e).unwrap_or(rest);
                (Some(scheme), endpoint)
            }
            None => (None, target),
        };

        if endpoint.is_empty() {
            return Err(ConfigError::EmptyEndpoint(target.to_string()));
        }

        let chunks: Vec<&str> = endpoint.split(':').collect();
        if chunks.len() > 2 {
            return Err(ConfigError::InvalidEndpoint(endpoint.to_string()));
        }

        let host = chunks[0];
        if host.is_empty() {
            return Err(ConfigError::EmptyEndpoint(target.to_string()));
        }

        let port = match chunks.get(1) {
            Some(port) => Some(
                port.parse::<u16>()
                    .map_err(|_| ConfigError::InvalidPort(port.to_string()))?,
            ),
            None => None,
        };

        Ok(Self {
            scheme: scheme.filter(|s| !s.is_empty()).map(str::to_string),
            host: host.to_string(),
            port,
        })
    }

    pub fn scheme(&self) -> Option<&str> {
        self.scheme.as_deref()
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> Option<u16> {
        self.port
    }

    /// `host[:port]`, without the resolver scheme.
    pub fn address(&self) -> String {
        match self.port {
            Some(port) => format!("{}:{}", self.host, port),
            None => self.host.clone(),
        }
    }
}

impl FromStr for Endpoint {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(scheme) = &self.scheme {
            write!(f, "{scheme}:///")?;
        }
        write!(f, "{}", self.address())
    }
}
