//! Engine client, over either transport.

use async_trait::async_trait;
use enclave::{ClientError, EngineBackend, IdentifierTriple};

use crate::convert;
use crate::rpc::{EngineRpc, Transport};

/// Engine client. The engine only answers unary calls, so the native and
/// gRPC-web flavours differ in nothing but the underlying service.
#[derive(Debug, Clone)]
pub struct EngineClient<T> {
    rpc: EngineRpc<T>,
}

impl<T: Transport> EngineClient<T> {
    /// Client over `rpc`.
    pub fn new(rpc: EngineRpc<T>) -> Self {
        Self { rpc }
    }
}

#[async_trait]
impl<T: Transport> EngineBackend for EngineClient<T> {
    async fn enclave_identifiers(&self) -> Result<Vec<IdentifierTriple>, ClientError> {
        let response = self
            .rpc
            .get_existing_and_historical_enclave_identifiers()
            .await
            .map_err(|status| {
                convert::engine_error("GetExistingAndHistoricalEnclaveIdentifiers", status)
            })?;
        Ok(convert::enclave_identifiers(response))
    }
}
