//! Wire messages to and from core types.

use enclave::{
    ClientError, IdentifierTriple, Instruction, InstructionArg, InstructionPosition,
    PackageRun, Progress, ResponseLine, RunConfig, RunFinished, ScriptRun, StarlarkError,
};

use tonic::{Code, Status};

use crate::proto;
use crate::proto::run_starlark_package_args::StarlarkPackageContent;
use crate::proto::starlark_error;
use crate::proto::starlark_run_response_line::RunResponseLine;

/// Convert one wire line. A line with no variant set (or an error with no
/// category) carries nothing and is skipped.
pub fn response_line(line: proto::StarlarkRunResponseLine) -> Option<ResponseLine> {
    let Some(line) = line.run_response_line else {
        tracing::trace!("skipping empty response line");
        return None;
    };
    let line = match line {
        RunResponseLine::Instruction(instruction) => {
            ResponseLine::Instruction(self::instruction(instruction))
        }
        RunResponseLine::Error(err) => ResponseLine::Error(run_error(err)?),
        RunResponseLine::ProgressInfo(progress) => ResponseLine::Progress(Progress {
            current_step_descriptions: progress.current_step_info,
            total_steps: progress.total_steps,
            current_step_number: progress.current_step_number,
        }),
        RunResponseLine::InstructionResult(result) => {
            ResponseLine::InstructionResult(result.serialized_instruction_result)
        }
        RunResponseLine::RunFinishedEvent(finished) => ResponseLine::RunFinished(RunFinished {
            is_successful: finished.is_run_successful,
            serialized_output: finished.serialized_output.unwrap_or_default(),
        }),
        RunResponseLine::Warning(warning) => ResponseLine::Warning(warning.warning_message),
        RunResponseLine::Info(info) => ResponseLine::Info(info.info_message),
    };
    Some(line)
}

fn instruction(instruction: proto::StarlarkInstruction) -> Instruction {
    let position = instruction
        .position
        .map(|p| InstructionPosition {
            filename: p.filename,
            line: p.line,
            column: p.column,
        })
        .unwrap_or_default();
    Instruction {
        position,
        name: instruction.instruction_name,
        arguments: instruction
            .arguments
            .into_iter()
            .map(|arg| InstructionArg {
                serialized_value: arg.serialized_arg_value,
                name: arg.arg_name,
                is_representative: arg.is_representative,
            })
            .collect(),
        executable_text: instruction.executable_instruction,
        description: instruction.description,
        is_skipped: instruction.is_skipped,
    }
}

fn run_error(err: proto::StarlarkError) -> Option<StarlarkError> {
    let Some(err) = err.error else {
        tracing::trace!("skipping error line with no category");
        return None;
    };
    Some(match err {
        starlark_error::Error::InterpretationError(e) => {
            StarlarkError::Interpretation(e.error_message)
        }
        starlark_error::Error::ValidationError(e) => StarlarkError::Validation(e.error_message),
        starlark_error::Error::ExecutionError(e) => StarlarkError::Execution(e.error_message),
    })
}

/// The parts of [`RunConfig`] shared by script and package runs.
struct CommonArgs {
    serialized_params: String,
    dry_run: bool,
    parallelism: i32,
    main_function_name: String,
    experimental_features: Vec<i32>,
    cloud_instance_id: Option<String>,
    cloud_user_id: Option<String>,
}

fn common_args(config: RunConfig) -> Result<CommonArgs, ClientError> {
    let parallelism = i32::try_from(config.parallelism).map_err(|_| {
        ClientError::InvalidConfig(format!("parallelism {} is too large", config.parallelism))
    })?;
    let experimental_features = config
        .experimental_features
        .iter()
        .map(|name| {
            proto::KurtosisFeatureFlag::from_str_name(name)
                .map(|flag| flag as i32)
                .ok_or_else(|| {
                    ClientError::InvalidConfig(format!("unknown experimental feature '{name}'"))
                })
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(CommonArgs {
        serialized_params: config.serialized_params,
        dry_run: config.dry_run,
        parallelism,
        main_function_name: config.main_function_name,
        experimental_features,
        cloud_instance_id: config.cloud_instance_id,
        cloud_user_id: config.cloud_user_id,
    })
}

/// Build the request for a script run.
pub fn script_args(run: ScriptRun) -> Result<proto::RunStarlarkScriptArgs, ClientError> {
    let common = common_args(run.config)?;
    Ok(proto::RunStarlarkScriptArgs {
        serialized_script: run.serialized_script,
        serialized_params: Some(common.serialized_params),
        dry_run: Some(common.dry_run),
        parallelism: Some(common.parallelism),
        main_function_name: Some(common.main_function_name),
        experimental_features: common.experimental_features,
        cloud_instance_id: common.cloud_instance_id,
        cloud_user_id: common.cloud_user_id,
    })
}

/// Build the request for a package run.
pub fn package_args(run: PackageRun) -> Result<proto::RunStarlarkPackageArgs, ClientError> {
    let main_file = run.config.relative_path_to_main_file.clone();
    let common = common_args(run.config)?;
    Ok(proto::RunStarlarkPackageArgs {
        package_id: run.package_id,
        starlark_package_content: run
            .clone_package
            .then_some(StarlarkPackageContent::Remote(true)),
        serialized_params: Some(common.serialized_params),
        dry_run: Some(common.dry_run),
        parallelism: Some(common.parallelism),
        clone_package: Some(run.clone_package),
        relative_path_to_main_file: Some(main_file),
        main_function_name: Some(common.main_function_name),
        experimental_features: common.experimental_features,
        cloud_instance_id: common.cloud_instance_id,
        cloud_user_id: common.cloud_user_id,
    })
}

/// Service identifier triples.
pub fn service_identifiers(
    response: proto::GetExistingAndHistoricalServiceIdentifiersResponse,
) -> Vec<IdentifierTriple> {
    response
        .all_identifiers
        .into_iter()
        .map(|ids| IdentifierTriple::new(ids.service_uuid, ids.name, ids.shortened_uuid))
        .collect()
}

/// Enclave identifier triples.
pub fn enclave_identifiers(
    response: proto::GetExistingAndHistoricalEnclaveIdentifiersResponse,
) -> Vec<IdentifierTriple> {
    response
        .all_identifiers
        .into_iter()
        .map(|ids| IdentifierTriple::new(ids.enclave_uuid, ids.name, ids.shortened_uuid))
        .collect()
}

/// Context for a status returned mid-stream.
pub const STREAM_ERROR_CONTEXT: &str =
    "An error has been returned from the execution response lines stream";

/// Hint attached to engine calls that find nothing listening.
pub const ENGINE_UNAVAILABLE_CONTEXT: &str = "The engine server is unavailable and is probably \
     not running; start it before calling this method";

/// A status that ended a response stream.
pub fn stream_error(status: Status) -> ClientError {
    ClientError::transport(STREAM_ERROR_CONTEXT, status)
}

/// A status returned by the call `method` itself.
pub fn call_error(method: &str, status: Status) -> ClientError {
    ClientError::transport(format!("{method} call failed"), status)
}

/// A status returned by an engine call.
pub fn engine_error(method: &str, status: Status) -> ClientError {
    if status.code() == Code::Unavailable {
        ClientError::transport(ENGINE_UNAVAILABLE_CONTEXT, status)
    } else {
        call_error(method, status)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn wire(line: RunResponseLine) -> proto::StarlarkRunResponseLine {
        proto::StarlarkRunResponseLine {
            run_response_line: Some(line),
        }
    }

    #[test]
    fn test_instruction_keeps_every_field() {
        let line = wire(RunResponseLine::Instruction(proto::StarlarkInstruction {
            position: Some(proto::StarlarkInstructionPosition {
                filename: "main.star".into(),
                line: 12,
                column: 5,
            }),
            instruction_name: "add_service".into(),
            arguments: vec![proto::StarlarkInstructionArg {
                serialized_arg_value: "\"web\"".into(),
                arg_name: Some("name".into()),
                is_representative: true,
            }],
            executable_instruction: "add_service(name=\"web\")".into(),
            is_skipped: false,
            description: "Adding service web".into(),
        }));

        let Some(ResponseLine::Instruction(instruction)) = response_line(line) else {
            panic!("expected an instruction");
        };
        assert_eq!(instruction.position.line, 12);
        assert_eq!(instruction.name, "add_service");
        assert_eq!(instruction.arguments[0].name.as_deref(), Some("name"));
        assert!(instruction.arguments[0].is_representative);
        assert_eq!(instruction.description, "Adding service web");
    }

    #[test]
    fn test_error_categories() {
        let line = wire(RunResponseLine::Error(proto::StarlarkError {
            error: Some(starlark_error::Error::ValidationError(
                proto::StarlarkValidationError {
                    error_message: "unknown image".into(),
                },
            )),
        }));
        assert_eq!(
            response_line(line),
            Some(ResponseLine::Error(StarlarkError::Validation(
                "unknown image".into()
            )))
        );
    }

    #[test]
    fn test_empty_lines_are_skipped() {
        assert_eq!(response_line(proto::StarlarkRunResponseLine::default()), None);
        let uncategorised = wire(RunResponseLine::Error(proto::StarlarkError::default()));
        assert_eq!(response_line(uncategorised), None);
    }

    #[test]
    fn test_run_finished_without_output() {
        let line = wire(RunResponseLine::RunFinishedEvent(
            proto::StarlarkRunFinishedEvent {
                is_run_successful: true,
                serialized_output: None,
            },
        ));
        assert_eq!(
            response_line(line),
            Some(ResponseLine::RunFinished(RunFinished {
                is_successful: true,
                serialized_output: String::new(),
            }))
        );
    }

    #[test]
    fn test_script_args_carry_config() {
        let args = script_args(ScriptRun {
            serialized_script: "def run(plan): pass".into(),
            config: RunConfig::default()
                .dry_run(true)
                .parallelism(8)
                .experimental_feature("NO_INSTRUCTIONS_CACHING"),
        })
        .unwrap();
        assert_eq!(args.dry_run, Some(true));
        assert_eq!(args.parallelism, Some(8));
        assert_eq!(args.main_function_name.as_deref(), Some("run"));
        assert_eq!(
            args.experimental_features,
            vec![proto::KurtosisFeatureFlag::NoInstructionsCaching as i32]
        );
    }

    #[test]
    fn test_unknown_feature_is_rejected() {
        let err = script_args(ScriptRun {
            serialized_script: String::new(),
            config: RunConfig::default().experimental_feature("TIME_TRAVEL"),
        })
        .unwrap_err();
        assert!(matches!(err, ClientError::InvalidConfig(_)));
    }

    #[test]
    fn test_remote_package_args() {
        let args = package_args(PackageRun {
            package_id: "github.com/example/pkg".into(),
            clone_package: true,
            config: RunConfig::default().main_file("src/main.star"),
        })
        .unwrap();
        assert_eq!(
            args.starlark_package_content,
            Some(StarlarkPackageContent::Remote(true))
        );
        assert_eq!(args.clone_package, Some(true));
        assert_eq!(
            args.relative_path_to_main_file.as_deref(),
            Some("src/main.star")
        );
    }

    #[test]
    fn test_unavailable_engine_gets_hint() {
        let err = engine_error("GetEnclaves", Status::unavailable("connection refused"));
        assert!(err.to_string().starts_with(ENGINE_UNAVAILABLE_CONTEXT));

        let err = engine_error("GetEnclaves", Status::internal("boom"));
        let msg = err.to_string();
        assert!(msg.starts_with("GetEnclaves call failed: "), "{msg}");
        assert!(msg.contains("boom"), "{msg}");
    }

    #[test]
    fn test_identifier_triples() {
        let triples = enclave_identifiers(proto::GetExistingAndHistoricalEnclaveIdentifiersResponse {
            all_identifiers: vec![proto::EnclaveIdentifiers {
                enclave_uuid: "e0a1b2c3d4".into(),
                name: "devnet".into(),
                shortened_uuid: "e0a1b2".into(),
            }],
        });
        assert_eq!(
            triples,
            vec![IdentifierTriple::new("e0a1b2c3d4", "devnet", "e0a1b2")]
        );
    }
}
