//! Wire messages for the calls this crate makes.
//!
//! Only the messages and fields the client consumes are declared; tags match
//! the engine's `api_container_api` and `engine_api` packages, and prost
//! skips every field not listed here.

#![allow(missing_docs)]

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RunStarlarkScriptArgs {
    #[prost(string, tag = "1")]
    pub serialized_script: ::prost::alloc::string::String,
    #[prost(string, optional, tag = "2")]
    pub serialized_params: ::core::option::Option<::prost::alloc::string::String>,
    #[prost(bool, optional, tag = "3")]
    pub dry_run: ::core::option::Option<bool>,
    #[prost(int32, optional, tag = "4")]
    pub parallelism: ::core::option::Option<i32>,
    #[prost(string, optional, tag = "5")]
    pub main_function_name: ::core::option::Option<::prost::alloc::string::String>,
    #[prost(enumeration = "KurtosisFeatureFlag", repeated, tag = "6")]
    pub experimental_features: ::prost::alloc::vec::Vec<i32>,
    #[prost(string, optional, tag = "7")]
    pub cloud_instance_id: ::core::option::Option<::prost::alloc::string::String>,
    #[prost(string, optional, tag = "8")]
    pub cloud_user_id: ::core::option::Option<::prost::alloc::string::String>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RunStarlarkPackageArgs {
    #[prost(string, tag = "1")]
    pub package_id: ::prost::alloc::string::String,
    #[prost(string, optional, tag = "5")]
    pub serialized_params: ::core::option::Option<::prost::alloc::string::String>,
    #[prost(bool, optional, tag = "6")]
    pub dry_run: ::core::option::Option<bool>,
    #[prost(int32, optional, tag = "7")]
    pub parallelism: ::core::option::Option<i32>,
    #[prost(bool, optional, tag = "8")]
    pub clone_package: ::core::option::Option<bool>,
    #[prost(string, optional, tag = "9")]
    pub relative_path_to_main_file: ::core::option::Option<::prost::alloc::string::String>,
    #[prost(string, optional, tag = "10")]
    pub main_function_name: ::core::option::Option<::prost::alloc::string::String>,
    #[prost(enumeration = "KurtosisFeatureFlag", repeated, tag = "11")]
    pub experimental_features: ::prost::alloc::vec::Vec<i32>,
    #[prost(string, optional, tag = "12")]
    pub cloud_instance_id: ::core::option::Option<::prost::alloc::string::String>,
    #[prost(string, optional, tag = "13")]
    pub cloud_user_id: ::core::option::Option<::prost::alloc::string::String>,
    #[prost(oneof = "run_starlark_package_args::StarlarkPackageContent", tags = "3, 4")]
    pub starlark_package_content:
        ::core::option::Option<run_starlark_package_args::StarlarkPackageContent>,
}

pub mod run_starlark_package_args {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum StarlarkPackageContent {
        #[prost(bytes, tag = "3")]
        Local(::prost::alloc::vec::Vec<u8>),
        #[prost(bool, tag = "4")]
        Remote(bool),
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct StarlarkRunResponseLine {
    #[prost(oneof = "starlark_run_response_line::RunResponseLine", tags = "1, 2, 3, 4, 5, 6, 7")]
    pub run_response_line: ::core::option::Option<starlark_run_response_line::RunResponseLine>,
}

pub mod starlark_run_response_line {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum RunResponseLine {
        #[prost(message, tag = "1")]
        Instruction(super::StarlarkInstruction),
        #[prost(message, tag = "2")]
        Error(super::StarlarkError),
        #[prost(message, tag = "3")]
        ProgressInfo(super::StarlarkRunProgress),
        #[prost(message, tag = "4")]
        InstructionResult(super::StarlarkInstructionResult),
        #[prost(message, tag = "5")]
        RunFinishedEvent(super::StarlarkRunFinishedEvent),
        #[prost(message, tag = "6")]
        Warning(super::StarlarkWarning),
        #[prost(message, tag = "7")]
        Info(super::StarlarkInfo),
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct StarlarkInstructionPosition {
    #[prost(string, tag = "1")]
    pub filename: ::prost::alloc::string::String,
    #[prost(int32, tag = "2")]
    pub line: i32,
    #[prost(int32, tag = "3")]
    pub column: i32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct StarlarkInstructionArg {
    #[prost(string, tag = "1")]
    pub serialized_arg_value: ::prost::alloc::string::String,
    #[prost(string, optional, tag = "2")]
    pub arg_name: ::core::option::Option<::prost::alloc::string::String>,
    #[prost(bool, tag = "3")]
    pub is_representative: bool,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct StarlarkInstruction {
    #[prost(message, optional, tag = "1")]
    pub position: ::core::option::Option<StarlarkInstructionPosition>,
    #[prost(string, tag = "2")]
    pub instruction_name: ::prost::alloc::string::String,
    #[prost(message, repeated, tag = "3")]
    pub arguments: ::prost::alloc::vec::Vec<StarlarkInstructionArg>,
    #[prost(string, tag = "4")]
    pub executable_instruction: ::prost::alloc::string::String,
    #[prost(bool, tag = "5")]
    pub is_skipped: bool,
    #[prost(string, tag = "6")]
    pub description: ::prost::alloc::string::String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct StarlarkInstructionResult {
    #[prost(string, tag = "1")]
    pub serialized_instruction_result: ::prost::alloc::string::String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct StarlarkError {
    #[prost(oneof = "starlark_error::Error", tags = "1, 2, 3")]
    pub error: ::core::option::Option<starlark_error::Error>,
}

pub mod starlark_error {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Error {
        #[prost(message, tag = "1")]
        InterpretationError(super::StarlarkInterpretationError),
        #[prost(message, tag = "2")]
        ValidationError(super::StarlarkValidationError),
        #[prost(message, tag = "3")]
        ExecutionError(super::StarlarkExecutionError),
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct StarlarkInterpretationError {
    #[prost(string, tag = "1")]
    pub error_message: ::prost::alloc::string::String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct StarlarkValidationError {
    #[prost(string, tag = "1")]
    pub error_message: ::prost::alloc::string::String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct StarlarkExecutionError {
    #[prost(string, tag = "1")]
    pub error_message: ::prost::alloc::string::String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct StarlarkRunProgress {
    #[prost(string, repeated, tag = "1")]
    pub current_step_info: ::prost::alloc::vec::Vec<::prost::alloc::string::String>,
    #[prost(uint32, tag = "2")]
    pub total_steps: u32,
    #[prost(uint32, tag = "3")]
    pub current_step_number: u32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct StarlarkRunFinishedEvent {
    #[prost(bool, tag = "1")]
    pub is_run_successful: bool,
    #[prost(string, optional, tag = "2")]
    pub serialized_output: ::core::option::Option<::prost::alloc::string::String>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct StarlarkWarning {
    #[prost(string, tag = "1")]
    pub warning_message: ::prost::alloc::string::String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct StarlarkInfo {
    #[prost(string, tag = "1")]
    pub info_message: ::prost::alloc::string::String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ServiceIdentifiers {
    #[prost(string, tag = "1")]
    pub service_uuid: ::prost::alloc::string::String,
    #[prost(string, tag = "2")]
    pub name: ::prost::alloc::string::String,
    #[prost(string, tag = "3")]
    pub shortened_uuid: ::prost::alloc::string::String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetExistingAndHistoricalServiceIdentifiersResponse {
    #[prost(message, repeated, tag = "1")]
    pub all_identifiers: ::prost::alloc::vec::Vec<ServiceIdentifiers>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct EnclaveIdentifiers {
    #[prost(string, tag = "1")]
    pub enclave_uuid: ::prost::alloc::string::String,
    #[prost(string, tag = "2")]
    pub name: ::prost::alloc::string::String,
    #[prost(string, tag = "3")]
    pub shortened_uuid: ::prost::alloc::string::String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetExistingAndHistoricalEnclaveIdentifiersResponse {
    #[prost(message, repeated, tag = "1")]
    pub all_identifiers: ::prost::alloc::vec::Vec<EnclaveIdentifiers>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum KurtosisFeatureFlag {
    NoInstructionsCaching = 0,
}

impl KurtosisFeatureFlag {
    /// Name of the flag as written in the protobuf definition.
    pub fn as_str_name(&self) -> &'static str {
        match self {
            Self::NoInstructionsCaching => "NO_INSTRUCTIONS_CACHING",
        }
    }

    /// Look a flag up by its protobuf name.
    pub fn from_str_name(value: &str) -> ::core::option::Option<Self> {
        match value {
            "NO_INSTRUCTIONS_CACHING" => Some(Self::NoInstructionsCaching),
            _ => None,
        }
    }
}
