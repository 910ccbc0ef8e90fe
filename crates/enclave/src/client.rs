//! Client facade over the concrete transports.
//!
//! [`EnclaveBackend`] and [`EngineBackend`] are what a transport implements.
//! Everything above them ([`EnclaveContext`], [`EngineContext`]) is
//! transport-agnostic; the transport is picked once, when the context is
//! built.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::config::RunConfig;
use crate::error::ClientError;
use crate::identifiers::{EntityKind, IdentifierSet, IdentifierTriple};
use crate::result::{RunResult, reduce};
use crate::stream::ResponseStream;

/// A script to run in an enclave.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptRun {
    /// Script source
    pub serialized_script: String,
    /// How to run it
    pub config: RunConfig,
}

/// A package to run in an enclave.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageRun {
    /// Package locator, e.g. `github.com/org/repo`
    pub package_id: String,
    /// Whether the engine must clone the package itself
    pub clone_package: bool,
    /// How to run it
    pub config: RunConfig,
}

/// Calls against one enclave's API container.
#[async_trait]
pub trait EnclaveBackend: Send + Sync {
    /// Start a script run. Returns as soon as the call is open.
    async fn run_script(&self, run: ScriptRun) -> Result<ResponseStream, ClientError>;

    /// Start a package run. Returns as soon as the call is open.
    async fn run_package(&self, run: PackageRun) -> Result<ResponseStream, ClientError>;

    /// Identifiers of every existing and historical service in the enclave.
    async fn service_identifiers(&self) -> Result<Vec<IdentifierTriple>, ClientError>;
}

/// Calls against the engine.
#[async_trait]
pub trait EngineBackend: Send + Sync {
    /// Identifiers of every existing and historical enclave.
    async fn enclave_identifiers(&self) -> Result<Vec<IdentifierTriple>, ClientError>;
}

/// Handle on one enclave.
#[derive(Clone)]
pub struct EnclaveContext {
    backend: Arc<dyn EnclaveBackend>,
    enclave_uuid: String,
    enclave_name: String,
}

impl fmt::Debug for EnclaveContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnclaveContext")
            .field("enclave_uuid", &self.enclave_uuid)
            .field("enclave_name", &self.enclave_name)
            .finish_non_exhaustive()
    }
}

impl EnclaveContext {
    /// Wrap a transport.
    pub fn new(
        backend: Arc<dyn EnclaveBackend>,
        enclave_uuid: impl Into<String>,
        enclave_name: impl Into<String>,
    ) -> Self {
        Self {
            backend,
            enclave_uuid: enclave_uuid.into(),
            enclave_name: enclave_name.into(),
        }
    }

    /// The enclave's full id.
    pub fn enclave_uuid(&self) -> &str {
        &self.enclave_uuid
    }

    /// The enclave's name.
    pub fn enclave_name(&self) -> &str {
        &self.enclave_name
    }

    /// Start running a script and return its response lines.
    pub async fn run_script(
        &self,
        script: impl Into<String>,
        config: RunConfig,
    ) -> Result<ResponseStream, ClientError> {
        config.validate()?;
        tracing::debug!(enclave = %self.enclave_name, dry_run = config.dry_run, "running script");
        self.backend
            .run_script(ScriptRun {
                serialized_script: script.into(),
                config,
            })
            .await
            .map_err(|e| e.context("Unexpected error happened executing Starlark script"))
    }

    /// Run a script and wait for its result.
    pub async fn run_script_blocking(
        &self,
        script: impl Into<String>,
        config: RunConfig,
    ) -> Result<RunResult, ClientError> {
        let lines = self.run_script(script, config).await?;
        reduce(lines).await
    }

    /// Start running a package the engine fetches itself.
    pub async fn run_remote_package(
        &self,
        package_id: impl Into<String>,
        config: RunConfig,
    ) -> Result<ResponseStream, ClientError> {
        config.validate()?;
        let package_id = package_id.into();
        tracing::debug!(enclave = %self.enclave_name, %package_id, "running remote package");
        self.backend
            .run_package(PackageRun {
                package_id,
                clone_package: true,
                config,
            })
            .await
            .map_err(|e| e.context("Unexpected error happened executing Starlark package"))
    }

    /// Run a remote package and wait for its result.
    pub async fn run_remote_package_blocking(
        &self,
        package_id: impl Into<String>,
        config: RunConfig,
    ) -> Result<RunResult, ClientError> {
        let lines = self.run_remote_package(package_id, config).await?;
        reduce(lines).await
    }

    /// Fetch and index every existing and historical service identifier.
    pub async fn service_identifiers(&self) -> Result<IdentifierSet, ClientError> {
        let triples = self
            .backend
            .service_identifiers()
            .await
            .map_err(|e| e.context("Failed to fetch service identifiers"))?;
        Ok(IdentifierSet::new(EntityKind::Service, triples))
    }
}

/// Handle on the engine.
#[derive(Clone)]
pub struct EngineContext {
    backend: Arc<dyn EngineBackend>,
}

impl fmt::Debug for EngineContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineContext").finish_non_exhaustive()
    }
}

impl EngineContext {
    /// Wrap a transport.
    pub fn new(backend: Arc<dyn EngineBackend>) -> Self {
        Self { backend }
    }

    /// Fetch and index every existing and historical enclave identifier.
    pub async fn enclave_identifiers(&self) -> Result<IdentifierSet, ClientError> {
        let triples = self
            .backend
            .enclave_identifiers()
            .await
            .map_err(|e| e.context("Failed to fetch enclave identifiers"))?;
        Ok(IdentifierSet::new(EntityKind::Enclave, triples))
    }
}
