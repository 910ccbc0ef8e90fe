//! Native gRPC transport.
//!
//! tonic hands back a pull-based `Streaming`, so response lines are pulled
//! straight through: no task, no buffer. Closing the [`ResponseStream`]
//! drops the `Streaming`, which resets the HTTP/2 stream and cancels the
//! call on the server.

use async_trait::async_trait;
use enclave::{
    ClientError, EnclaveBackend, IdentifierTriple, PackageRun, ResponseStream, ScriptRun,
};
use futures::Stream;
use tokio_stream::StreamExt;
use tonic::Status;
use tonic::transport::{Channel, Endpoint};

use crate::config::ConnectionConfig;
use crate::convert;
use crate::proto;
use crate::rpc::ApiContainerRpc;

/// Present a tonic response stream as a [`ResponseStream`].
///
/// Lines with no variant are skipped; the first error status ends the stream.
pub fn pull_through<S>(upstream: S) -> ResponseStream
where
    S: Stream<Item = Result<proto::StarlarkRunResponseLine, Status>> + Send + 'static,
{
    let lines = upstream.filter_map(|item| match item {
        Ok(line) => convert::response_line(line).map(Ok),
        Err(status) => Some(Err(convert::stream_error(status))),
    });
    ResponseStream::from_stream(lines)
}

/// Open a lazily-connected channel to `config.address`.
///
/// Must be called from within a tokio runtime.
pub fn channel(config: &ConnectionConfig) -> Result<Channel, ClientError> {
    let uri = config.uri()?;
    let endpoint = Endpoint::from(uri);
    tracing::debug!(address = %config.address, "opening native gRPC channel");
    Ok(endpoint.connect_lazy())
}

/// API container client over HTTP/2 gRPC.
#[derive(Debug, Clone)]
pub struct NativeClient {
    rpc: ApiContainerRpc<Channel>,
}

impl NativeClient {
    /// Client over an existing channel.
    pub fn new(channel: Channel) -> Self {
        Self {
            rpc: ApiContainerRpc::new(channel),
        }
    }

    /// Client for the endpoint in `config`.
    pub fn connect(config: &ConnectionConfig) -> Result<Self, ClientError> {
        let mut rpc = ApiContainerRpc::new(channel(config)?);
        if let Some(limit) = config.max_decoding_message_size {
            rpc = rpc.max_decoding_message_size(limit);
        }
        Ok(Self { rpc })
    }
}

#[async_trait]
impl EnclaveBackend for NativeClient {
    async fn run_script(&self, run: ScriptRun) -> Result<ResponseStream, ClientError> {
        let args = convert::script_args(run)?;
        let upstream = self
            .rpc
            .run_starlark_script(args)
            .await
            .map_err(|status| convert::call_error("RunStarlarkScript", status))?;
        Ok(pull_through(upstream))
    }

    async fn run_package(&self, run: PackageRun) -> Result<ResponseStream, ClientError> {
        let args = convert::package_args(run)?;
        let upstream = self
            .rpc
            .run_starlark_package(args)
            .await
            .map_err(|status| convert::call_error("RunStarlarkPackage", status))?;
        Ok(pull_through(upstream))
    }

    async fn service_identifiers(&self) -> Result<Vec<IdentifierTriple>, ClientError> {
        let response = self
            .rpc
            .get_existing_and_historical_service_identifiers()
            .await
            .map_err(|status| {
                convert::call_error("GetExistingAndHistoricalServiceIdentifiers", status)
            })?;
        Ok(convert::service_identifiers(response))
    }
}
