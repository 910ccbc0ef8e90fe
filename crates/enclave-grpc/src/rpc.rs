//! Raw calls against the API container and engine services.

use tonic::body::BoxBody;
use tonic::client::{Grpc, GrpcService};
use tonic::codec::{ProstCodec, Streaming};
use tonic::codegen::http::Uri;
use tonic::codegen::http::uri::PathAndQuery;
use tonic::codegen::{Body, Bytes, StdError};
use tonic::{Code, GrpcMethod, Request, Status};

use crate::proto;

/// Any tower service that can carry our calls: a native tonic `Channel` or
/// the gRPC-web client service.
pub trait Transport:
    GrpcService<
        BoxBody,
        Error: Into<StdError> + Send,
        ResponseBody: Body<Data = Bytes, Error: Into<StdError> + Send> + Send + 'static,
        Future: Send,
    > + Clone
    + Send
    + Sync
    + 'static
{
}

impl<T> Transport for T where
    T: GrpcService<
            BoxBody,
            Error: Into<StdError> + Send,
            ResponseBody: Body<Data = Bytes, Error: Into<StdError> + Send> + Send + 'static,
            Future: Send,
        > + Clone
        + Send
        + Sync
        + 'static
{
}

struct Method {
    service: &'static str,
    name: &'static str,
    path: &'static str,
}

const RUN_STARLARK_SCRIPT: Method = Method {
    service: "api_container_api.ApiContainerService",
    name: "RunStarlarkScript",
    path: "/api_container_api.ApiContainerService/RunStarlarkScript",
};

const RUN_STARLARK_PACKAGE: Method = Method {
    service: "api_container_api.ApiContainerService",
    name: "RunStarlarkPackage",
    path: "/api_container_api.ApiContainerService/RunStarlarkPackage",
};

const GET_SERVICE_IDENTIFIERS: Method = Method {
    service: "api_container_api.ApiContainerService",
    name: "GetExistingAndHistoricalServiceIdentifiers",
    path: "/api_container_api.ApiContainerService/GetExistingAndHistoricalServiceIdentifiers",
};

const GET_ENCLAVE_IDENTIFIERS: Method = Method {
    service: "engine_api.EngineService",
    name: "GetExistingAndHistoricalEnclaveIdentifiers",
    path: "/engine_api.EngineService/GetExistingAndHistoricalEnclaveIdentifiers",
};

async fn server_streaming<T, M, R>(
    grpc: &Grpc<T>,
    message: M,
    method: &Method,
) -> Result<Streaming<R>, Status>
where
    T: Transport,
    M: prost::Message + Send + Sync + 'static,
    R: prost::Message + Default + Send + Sync + 'static,
{
    let mut grpc = grpc.clone();
    ready(&mut grpc).await?;
    let response = grpc
        .server_streaming(
            request(message, method),
            PathAndQuery::from_static(method.path),
            ProstCodec::default(),
        )
        .await?;
    Ok(response.into_inner())
}

async fn unary<T, M, R>(grpc: &Grpc<T>, message: M, method: &Method) -> Result<R, Status>
where
    T: Transport,
    M: prost::Message + Send + Sync + 'static,
    R: prost::Message + Default + Send + Sync + 'static,
{
    let mut grpc = grpc.clone();
    ready(&mut grpc).await?;
    let response = grpc
        .unary(
            request(message, method),
            PathAndQuery::from_static(method.path),
            ProstCodec::default(),
        )
        .await?;
    Ok(response.into_inner())
}

async fn ready<T: Transport>(grpc: &mut Grpc<T>) -> Result<(), Status> {
    grpc.ready().await.map_err(|e| {
        Status::new(
            Code::Unknown,
            format!("Service was not ready: {}", e.into()),
        )
    })
}

fn request<M>(message: M, method: &Method) -> Request<M> {
    let mut req = Request::new(message);
    req.extensions_mut()
        .insert(GrpcMethod::new(method.service, method.name));
    req
}

/// `ApiContainerService` calls.
#[derive(Debug, Clone)]
pub struct ApiContainerRpc<T> {
    inner: Grpc<T>,
}

impl<T: Transport> ApiContainerRpc<T> {
    /// Calls over a transport that already knows its endpoint.
    pub fn new(inner: T) -> Self {
        Self {
            inner: Grpc::new(inner),
        }
    }

    /// Calls over a transport that needs the endpoint on every request.
    pub fn with_origin(inner: T, origin: Uri) -> Self {
        Self {
            inner: Grpc::with_origin(inner, origin),
        }
    }

    /// Limit the size of a decoded response message.
    #[must_use]
    pub fn max_decoding_message_size(mut self, limit: usize) -> Self {
        self.inner = self.inner.max_decoding_message_size(limit);
        self
    }

    /// Open a script run.
    pub async fn run_starlark_script(
        &self,
        args: proto::RunStarlarkScriptArgs,
    ) -> Result<Streaming<proto::StarlarkRunResponseLine>, Status> {
        server_streaming(&self.inner, args, &RUN_STARLARK_SCRIPT).await
    }

    /// Open a package run.
    pub async fn run_starlark_package(
        &self,
        args: proto::RunStarlarkPackageArgs,
    ) -> Result<Streaming<proto::StarlarkRunResponseLine>, Status> {
        server_streaming(&self.inner, args, &RUN_STARLARK_PACKAGE).await
    }

    /// Every existing and historical service identifier.
    pub async fn get_existing_and_historical_service_identifiers(
        &self,
    ) -> Result<proto::GetExistingAndHistoricalServiceIdentifiersResponse, Status> {
        unary(&self.inner, (), &GET_SERVICE_IDENTIFIERS).await
    }
}

/// `EngineService` calls.
#[derive(Debug, Clone)]
pub struct EngineRpc<T> {
    inner: Grpc<T>,
}

impl<T: Transport> EngineRpc<T> {
    /// Calls over a transport that already knows its endpoint.
    pub fn new(inner: T) -> Self {
        Self {
            inner: Grpc::new(inner),
        }
    }

    /// Calls over a transport that needs the endpoint on every request.
    pub fn with_origin(inner: T, origin: Uri) -> Self {
        Self {
            inner: Grpc::with_origin(inner, origin),
        }
    }

    /// Limit the size of a decoded response message.
    #[must_use]
    pub fn max_decoding_message_size(mut self, limit: usize) -> Self {
        self.inner = self.inner.max_decoding_message_size(limit);
        self
    }

    /// Every existing and historical enclave identifier.
    pub async fn get_existing_and_historical_enclave_identifiers(
        &self,
    ) -> Result<proto::GetExistingAndHistoricalEnclaveIdentifiersResponse, Status> {
        unary(&self.inner, (), &GET_ENCLAVE_IDENTIFIERS).await
    }
}
