//! gRPC-web transport.
//!
//! For endpoints that sit behind a gRPC-web proxy and only speak HTTP/1.1.
//! Response lines are read by a forwarding task that pushes them into a
//! [`LineSink`], event by event, the way a browser gRPC-web client delivers
//! `data` / `error` / `end` callbacks. Closing the consumer side signals the
//! task and aborts it, which drops the HTTP request and cancels the call.

use async_trait::async_trait;
use enclave::{
    ClientError, EnclaveBackend, IdentifierTriple, LineSink, PackageRun, ResponseStream,
    ScriptRun,
};
use futures::{Stream, StreamExt};
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::TokioExecutor;
use tonic::Status;
use tonic::body::BoxBody;
use tonic_web::{GrpcWebCall, GrpcWebClientLayer, GrpcWebClientService};

use crate::config::ConnectionConfig;
use crate::convert;
use crate::proto;
use crate::rpc::ApiContainerRpc;

/// HTTP/1.1 client wrapped in the gRPC-web framing layer.
pub type WebService = GrpcWebClientService<Client<HttpConnector, GrpcWebCall<BoxBody>>>;

/// Build the gRPC-web service stack.
pub fn service() -> WebService {
    let client = Client::builder(TokioExecutor::new()).build_http();
    tower::ServiceBuilder::new()
        .layer(GrpcWebClientLayer::new())
        .service(client)
}

/// Forward `upstream` into a fresh [`ResponseStream`] from a spawned task.
///
/// Must be called from within a tokio runtime.
pub fn forward<S>(upstream: S) -> ResponseStream
where
    S: Stream<Item = Result<proto::StarlarkRunResponseLine, Status>> + Send + 'static,
{
    let (sink, lines) = enclave::stream::channel();
    let task = tokio::spawn(pump(upstream, sink));
    lines.on_cancel(move || task.abort())
}

async fn pump<S>(upstream: S, sink: LineSink)
where
    S: Stream<Item = Result<proto::StarlarkRunResponseLine, Status>> + Send,
{
    let mut upstream = std::pin::pin!(upstream);
    loop {
        let item = tokio::select! {
            item = upstream.next() => item,
            () = sink.cancelled() => {
                tracing::debug!("consumer closed the stream, cancelling call");
                return;
            }
        };
        match item {
            Some(Ok(line)) => {
                let Some(line) = convert::response_line(line) else {
                    continue;
                };
                if !sink.data(line).await {
                    return;
                }
            }
            Some(Err(status)) => {
                sink.error(convert::stream_error(status)).await;
                return;
            }
            None => {
                sink.end().await;
                return;
            }
        }
    }
}

/// API container client over gRPC-web.
#[derive(Debug, Clone)]
pub struct WebClient {
    rpc: ApiContainerRpc<WebService>,
}

impl WebClient {
    /// Client for the endpoint in `config`.
    pub fn connect(config: &ConnectionConfig) -> Result<Self, ClientError> {
        let origin = config.uri()?;
        tracing::debug!(address = %config.address, "opening gRPC-web client");
        let mut rpc = ApiContainerRpc::with_origin(service(), origin);
        if let Some(limit) = config.max_decoding_message_size {
            rpc = rpc.max_decoding_message_size(limit);
        }
        Ok(Self { rpc })
    }
}

#[async_trait]
impl EnclaveBackend for WebClient {
    async fn run_script(&self, run: ScriptRun) -> Result<ResponseStream, ClientError> {
        let args = convert::script_args(run)?;
        let upstream = self
            .rpc
            .run_starlark_script(args)
            .await
            .map_err(|status| convert::call_error("RunStarlarkScript", status))?;
        Ok(forward(upstream))
    }

    async fn run_package(&self, run: PackageRun) -> Result<ResponseStream, ClientError> {
        let args = convert::package_args(run)?;
        let upstream = self
            .rpc
            .run_starlark_package(args)
            .await
            .map_err(|status| convert::call_error("RunStarlarkPackage", status))?;
        Ok(forward(upstream))
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

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    use enclave::ResponseLine;
    use tokio::time::timeout;

    use super::*;
    use crate::proto::starlark_run_response_line::RunResponseLine;

    fn warning(msg: &str) -> Result<proto::StarlarkRunResponseLine, Status> {
        Ok(proto::StarlarkRunResponseLine {
            run_response_line: Some(RunResponseLine::Warning(proto::StarlarkWarning {
                warning_message: msg.to_string(),
            })),
        })
    }

    #[tokio::test]
    async fn test_forwards_then_ends() {
        let upstream = futures::stream::iter(vec![
            warning("a"),
            Ok(proto::StarlarkRunResponseLine::default()),
            warning("b"),
        ]);
        let got: Vec<_> = forward(upstream).map(|l| l.unwrap()).collect().await;
        assert_eq!(
            got,
            vec![
                ResponseLine::Warning("a".into()),
                ResponseLine::Warning("b".into())
            ]
        );
    }

    #[tokio::test]
    async fn test_status_is_forwarded_once() {
        let upstream = futures::stream::iter(vec![
            warning("a"),
            Err(Status::internal("stream reset")),
        ]);
        let mut lines = forward(upstream);
        assert!(lines.next().await.unwrap().is_ok());
        let err = lines.next().await.unwrap().unwrap_err();
        assert!(err.to_string().contains("stream reset"), "{err}");
        assert!(lines.next().await.is_none());
    }

    /// Sets its flag when dropped.
    struct DropFlag(Arc<AtomicBool>);

    impl Drop for DropFlag {
        fn drop(&mut self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn test_close_drops_the_upstream_call() {
        let dropped = Arc::new(AtomicBool::new(false));
        let guard = DropFlag(Arc::clone(&dropped));
        let upstream = futures::stream::once(async { warning("first") }).chain(
            futures::stream::pending().map(move |item| {
                let _keep = &guard;
                item
            }),
        );

        let mut lines = forward(upstream);
        assert!(lines.next().await.unwrap().is_ok());
        lines.close();
        assert!(matches!(
            lines.next().await,
            Some(Err(ClientError::Cancelled))
        ));

        timeout(Duration::from_secs(5), async {
            while !dropped.load(Ordering::SeqCst) {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();
    }
}
