//! gRPC transports for the enclave client.
//!
//! Two implementations of [`enclave::EnclaveBackend`]:
//!
//! - [`NativeClient`]: HTTP/2 gRPC through a tonic `Channel`. Response
//!   streams are pulled straight through.
//! - [`WebClient`]: gRPC-web over HTTP/1.1, for endpoints behind a gRPC-web
//!   proxy. Response lines are pushed through a forwarding task.
//!
//! [`connect_enclave`] and [`connect_engine`] pick one from a
//! [`ConnectionConfig`] and hand back the transport-agnostic contexts.
//!
//! # Example
//!
//! ```no_run
//! use enclave::RunConfig;
//! use enclave_grpc::{ConnectionConfig, TransportKind, connect_enclave};
//!
//! # async fn example() -> Result<(), enclave::ClientError> {
//! let config = ConnectionConfig::new("http://127.0.0.1:7443", TransportKind::Native)
//!     .enclave("e5a9c0ffee", "devnet");
//! let enclave = connect_enclave(&config)?;
//! let result = enclave
//!     .run_script_blocking("def run(plan):\n    plan.print(\"hi\")\n", RunConfig::default())
//!     .await?;
//! println!("{}", result.run_output);
//! # Ok(())
//! # }
//! ```

mod config;
mod convert;
mod engine;
mod native;
pub mod proto;
mod rpc;
mod web;

use std::sync::Arc;

use enclave::{ClientError, EnclaveBackend, EnclaveContext, EngineContext};

pub use config::{ConnectionConfig, TransportKind};
pub use convert::{ENGINE_UNAVAILABLE_CONTEXT, STREAM_ERROR_CONTEXT};
pub use engine::EngineClient;
pub use native::{NativeClient, pull_through};
pub use rpc::{ApiContainerRpc, EngineRpc, Transport};
pub use web::{WebClient, WebService, forward};

/// Connect to an enclave's API container.
///
/// Connections are lazy: nothing is dialled until the first call. Must be
/// called from within a tokio runtime.
pub fn connect_enclave(config: &ConnectionConfig) -> Result<EnclaveContext, ClientError> {
    let backend: Arc<dyn EnclaveBackend> = match config.transport {
        TransportKind::Native => Arc::new(NativeClient::connect(config)?),
        TransportKind::Web => Arc::new(WebClient::connect(config)?),
    };
    tracing::debug!(
        transport = %config.transport,
        enclave = %config.enclave_name,
        "enclave client ready"
    );
    Ok(EnclaveContext::new(
        backend,
        config.enclave_uuid.clone(),
        config.enclave_name.clone(),
    ))
}

/// Connect to the engine.
///
/// Must be called from within a tokio runtime.
pub fn connect_engine(config: &ConnectionConfig) -> Result<EngineContext, ClientError> {
    let context = match config.transport {
        TransportKind::Native => {
            let rpc = EngineRpc::new(native::channel(config)?);
            EngineContext::new(Arc::new(EngineClient::new(limit(rpc, config))))
        }
        TransportKind::Web => {
            let rpc = EngineRpc::with_origin(web::service(), config.uri()?);
            EngineContext::new(Arc::new(EngineClient::new(limit(rpc, config))))
        }
    };
    tracing::debug!(transport = %config.transport, "engine client ready");
    Ok(context)
}

fn limit<T: Transport>(rpc: EngineRpc<T>, config: &ConnectionConfig) -> EngineRpc<T> {
    match config.max_decoding_message_size {
        Some(size) => rpc.max_decoding_message_size(size),
        None => rpc,
    }
}
