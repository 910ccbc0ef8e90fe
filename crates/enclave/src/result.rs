//! Folding a response stream into a single run result

use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};

use crate::error::ClientError;
use crate::line::{Instruction, ResponseLine, RunFinished, StarlarkError};

/// Summary of a whole run.
///
/// A `RunResult` is only produced for a stream that ended gracefully, but
/// the run itself may still have failed: check [`RunResult::has_errors`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunResult {
    /// Instruction results and the final output, one per line
    pub run_output: String,
    /// Every instruction, in stream order
    pub instructions: Vec<Instruction>,
    /// First interpretation error, if any
    pub interpretation_error: Option<String>,
    /// All validation errors, in stream order
    pub validation_errors: Vec<String>,
    /// First execution error, if any
    pub execution_error: Option<String>,
}

impl RunResult {
    /// True if the engine reported any interpretation, validation or
    /// execution error.
    pub fn has_errors(&self) -> bool {
        self.interpretation_error.is_some()
            || !self.validation_errors.is_empty()
            || self.execution_error.is_some()
    }
}

/// Incremental form of [`reduce`].
///
/// Feed it every line with [`apply`](Self::apply) (a live display can look
/// at the same lines on the way through), then call
/// [`finish`](Self::finish) once the stream has ended.
#[derive(Debug, Default)]
pub struct RunResultBuilder {
    result: RunResult,
}

impl RunResultBuilder {
    /// An empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one line into the result.
    pub fn apply(&mut self, line: &ResponseLine) {
        let result = &mut self.result;
        match line {
            ResponseLine::Instruction(instruction) => {
                result.instructions.push(instruction.clone());
            }
            ResponseLine::InstructionResult(serialized) => {
                push_output(&mut result.run_output, serialized);
            }
            ResponseLine::Error(StarlarkError::Interpretation(msg)) => {
                if result.interpretation_error.is_none() {
                    result.interpretation_error = Some(msg.clone());
                }
            }
            ResponseLine::Error(StarlarkError::Validation(msg)) => {
                result.validation_errors.push(msg.clone());
            }
            ResponseLine::Error(StarlarkError::Execution(msg)) => {
                if result.execution_error.is_none() {
                    result.execution_error = Some(msg.clone());
                }
            }
            // Output of a failed run is dropped, even when the engine sent
            // some.
            ResponseLine::RunFinished(RunFinished {
                is_successful,
                serialized_output,
            }) => {
                if *is_successful && !serialized_output.is_empty() {
                    push_output(&mut result.run_output, serialized_output);
                }
            }
            ResponseLine::Progress(_) | ResponseLine::Warning(_) | ResponseLine::Info(_) => {}
        }
    }

    /// The folded result.
    pub fn finish(self) -> RunResult {
        self.result
    }
}

fn push_output(output: &mut String, serialized: &str) {
    output.push_str(serialized);
    output.push('\n');
}

/// Consume a response stream to its end and fold it into a [`RunResult`].
///
/// If the stream yields an error (a transport failure or a cancellation),
/// that error is returned and everything folded so far is discarded.
pub async fn reduce<S>(lines: S) -> Result<RunResult, ClientError>
where
    S: Stream<Item = Result<ResponseLine, ClientError>>,
{
    let mut lines = std::pin::pin!(lines);
    let mut builder = RunResultBuilder::new();
    let mut count = 0usize;
    while let Some(line) = lines.next().await {
        builder.apply(&line?);
        count += 1;
    }
    tracing::debug!(lines = count, "run result folded");
    Ok(builder.finish())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn fold(lines: &[ResponseLine]) -> RunResult {
        let mut builder = RunResultBuilder::new();
        for line in lines {
            builder.apply(line);
        }
        builder.finish()
    }

    fn finished(is_successful: bool, output: &str) -> ResponseLine {
        ResponseLine::RunFinished(RunFinished {
            is_successful,
            serialized_output: output.to_string(),
        })
    }

    #[test]
    fn test_empty_instruction_result_keeps_separator() {
        let result = fold(&[
            ResponseLine::InstructionResult(String::new()),
            ResponseLine::InstructionResult("x".into()),
        ]);
        assert_eq!(result.run_output, "\nx\n");
    }

    #[test]
    fn test_successful_run_with_empty_output_adds_nothing() {
        let result = fold(&[ResponseLine::InstructionResult("a".into()), finished(true, "")]);
        assert_eq!(result.run_output, "a\n");
    }

    #[test]
    fn test_failed_run_output_is_dropped() {
        let result = fold(&[finished(false, "partial")]);
        assert_eq!(result.run_output, "");
    }

    #[test]
    fn test_first_execution_error_wins() {
        let result = fold(&[
            ResponseLine::Error(StarlarkError::Execution("first".into())),
            ResponseLine::Error(StarlarkError::Execution("second".into())),
        ]);
        assert_eq!(result.execution_error.as_deref(), Some("first"));
        assert!(result.has_errors());
    }

    #[test]
    fn test_informational_lines_are_ignored() {
        let result = fold(&[
            ResponseLine::Info("hi".into()),
            ResponseLine::Warning("careful".into()),
            ResponseLine::Progress(Default::default()),
        ]);
        assert_eq!(result, RunResult::default());
        assert!(!result.has_errors());
    }
}
