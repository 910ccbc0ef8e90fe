//! Connection configuration

use std::fmt;
use std::str::FromStr;

use enclave::ClientError;
use serde::{Deserialize, Serialize};
use tonic::codegen::http::Uri;

/// How requests reach the engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// HTTP/2 gRPC straight to the server
    #[default]
    Native,
    /// gRPC-web over HTTP/1.1, for endpoints behind a gRPC-web proxy
    Web,
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Native => f.write_str("native"),
            Self::Web => f.write_str("web"),
        }
    }
}

impl FromStr for TransportKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "native" => Ok(Self::Native),
            "web" => Ok(Self::Web),
            other => Err(format!(
                "unknown transport '{other}', expected 'native' or 'web'"
            )),
        }
    }
}

/// Where and how to connect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Endpoint URL, e.g. `http://127.0.0.1:9710`
    pub address: String,
    /// Transport to use
    pub transport: TransportKind,
    /// Full id of the enclave, for enclave connections
    pub enclave_uuid: String,
    /// Name of the enclave, for enclave connections
    pub enclave_name: String,
    /// Largest response message accepted, in bytes (tonic's default if unset)
    pub max_decoding_message_size: Option<usize>,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            address: "http://127.0.0.1:9710".to_string(),
            transport: TransportKind::Native,
            enclave_uuid: String::new(),
            enclave_name: String::new(),
            max_decoding_message_size: None,
        }
    }
}

impl ConnectionConfig {
    /// Connect to `address` over `transport`.
    pub fn new(address: impl Into<String>, transport: TransportKind) -> Self {
        Self {
            address: address.into(),
            transport,
            ..Self::default()
        }
    }

    /// Name the enclave this connection talks to.
    pub fn enclave(mut self, uuid: impl Into<String>, name: impl Into<String>) -> Self {
        self.enclave_uuid = uuid.into();
        self.enclave_name = name.into();
        self
    }

    /// Parse and check the endpoint address.
    pub fn uri(&self) -> Result<Uri, ClientError> {
        let uri: Uri = self.address.parse().map_err(|e| {
            ClientError::InvalidConfig(format!("invalid address '{}': {e}", self.address))
        })?;
        if uri.scheme().is_none() || uri.authority().is_none() {
            return Err(ClientError::InvalidConfig(format!(
                "address '{}' must include a scheme and host, e.g. http://127.0.0.1:9710",
                self.address
            )));
        }
        Ok(uri)
    }
}
