//! Enclave: client core for a remote enclave engine
//!
//! The engine executes scripts inside isolated enclaves and reports progress
//! as a stream of tagged response lines. This crate holds the
//! transport-agnostic half of a client for it:
//!
//! - [`ResponseStream`] turns whatever a transport delivers (a pull-based
//!   gRPC stream or push-style event callbacks) into one lazy, cancellable
//!   sequence of [`ResponseLine`]s.
//! - [`reduce`] folds such a sequence into a single [`RunResult`].
//! - [`IdentifierSet`] resolves a user-supplied full id, shortened id or
//!   name to exactly one full id.
//! - [`EnclaveBackend`] and [`EngineBackend`] are the seams concrete
//!   transports implement; [`EnclaveContext`] and [`EngineContext`] build
//!   the blocking helpers on top of them.
//!
//! A run that completes its stream is not necessarily a successful run:
//! interpretation, validation and execution errors arrive as data and end
//! up in the [`RunResult`], so callers must inspect it.

mod client;
mod config;
mod error;
mod identifiers;
mod line;
mod result;
pub mod stream;

pub use client::{
    EnclaveBackend, EnclaveContext, EngineBackend, EngineContext, PackageRun, ScriptRun,
};
pub use config::{DEFAULT_MAIN_FILE, DEFAULT_MAIN_FUNCTION, DEFAULT_PARALLELISM, RunConfig};
pub use error::{BoxError, ClientError, IdentifierError};
pub use identifiers::{EntityKind, IdentifierSet, IdentifierTriple, Lookup};
pub use line::{
    Instruction, InstructionArg, InstructionPosition, Progress, ResponseLine, RunFinished,
    StarlarkError,
};
pub use result::{RunResult, RunResultBuilder, reduce};
pub use stream::{CancelHandle, LineSink, ResponseStream};
