//! Tagged response lines streamed back while a script runs

use serde::{Deserialize, Serialize};

/// Where an instruction sits in the script that produced it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstructionPosition {
    /// Script file name
    pub filename: String,
    /// 1-based line
    pub line: i32,
    /// 1-based column
    pub column: i32,
}

/// One argument of an instruction, already serialized by the engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstructionArg {
    /// Serialized argument value
    pub serialized_value: String,
    /// Keyword name, absent for positional arguments
    pub name: Option<String>,
    /// Whether the argument is shown when the instruction is summarised
    pub is_representative: bool,
}

/// An instruction the engine is about to run (or skipped).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instruction {
    /// Position in the source script
    pub position: InstructionPosition,
    /// Instruction name, e.g. `add_service`
    pub name: String,
    /// Arguments in call order
    pub arguments: Vec<InstructionArg>,
    /// The instruction rendered as executable script text
    pub executable_text: String,
    /// Human-readable description
    pub description: String,
    /// True if the engine skipped it (e.g. already applied)
    pub is_skipped: bool,
}

/// Errors the engine reports inside the stream.
///
/// These are run-level failures, not transport failures: the stream that
/// carries them still completes normally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StarlarkError {
    /// The script could not be interpreted
    Interpretation(String),
    /// The interpreted plan failed validation
    Validation(String),
    /// An instruction failed while executing
    Execution(String),
}

impl StarlarkError {
    /// The error message, regardless of category.
    pub fn message(&self) -> &str {
        match self {
            Self::Interpretation(msg) | Self::Validation(msg) | Self::Execution(msg) => msg,
        }
    }
}

/// Progress through the run's steps.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    /// What the current step is doing
    pub current_step_descriptions: Vec<String>,
    /// Total number of steps
    pub total_steps: u32,
    /// Current step, 1-based
    pub current_step_number: u32,
}

/// Final event of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunFinished {
    /// Whether the run as a whole succeeded
    pub is_successful: bool,
    /// Serialized return value of the main function, may be empty
    pub serialized_output: String,
}

/// One message of the execution-event stream. Exactly one variant per line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResponseLine {
    /// An instruction about to run
    Instruction(Instruction),
    /// A run-level error
    Error(StarlarkError),
    /// Progress update
    Progress(Progress),
    /// Serialized result of the last instruction
    InstructionResult(String),
    /// The run is over
    RunFinished(RunFinished),
    /// Warning message
    Warning(String),
    /// Informational message
    Info(String),
}

impl ResponseLine {
    /// Short variant name, used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Instruction(_) => "instruction",
            Self::Error(_) => "error",
            Self::Progress(_) => "progress",
            Self::InstructionResult(_) => "instruction_result",
            Self::RunFinished(_) => "run_finished",
            Self::Warning(_) => "warning",
            Self::Info(_) => "info",
        }
    }
}

impl From<Instruction> for ResponseLine {
    fn from(instruction: Instruction) -> Self {
        Self::Instruction(instruction)
    }
}

impl From<StarlarkError> for ResponseLine {
    fn from(err: StarlarkError) -> Self {
        Self::Error(err)
    }
}

impl From<Progress> for ResponseLine {
    fn from(progress: Progress) -> Self {
        Self::Progress(progress)
    }
}

impl From<RunFinished> for ResponseLine {
    fn from(finished: RunFinished) -> Self {
        Self::RunFinished(finished)
    }
}
