//! Trait definitions for script executors.

use std::path::{Path, PathBuf};
use std::time::Duration;

/// What to do when a cell raises.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecutionPolicy {
    /// Record failing cells and keep going instead of aborting
    pub allow_errors: bool,

    /// Kill the interpreter after this long
    pub timeout: Option<Duration>,
}

/// A code cell to execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodeCell<'a> {
    pub source: &'a str,

    /// Line of the cell marker in the script (1-indexed)
    pub line: usize,

    /// Script line holding the first line of `source` (1-indexed)
    pub source_line: usize,
}

/// Input to one script execution.
#[derive(Debug, Clone)]
pub struct ExecutionRequest<'a> {
    /// Script being executed, used for `__file__` and error reports
    pub script_path: &'a Path,

    /// Code cells in execution order
    pub cells: Vec<CodeCell<'a>>,

    /// Directory the interpreter runs in
    pub working_dir: &'a Path,

    /// Directory figures are written to; must exist
    pub figures_dir: &'a Path,

    pub policy: ExecutionPolicy,
}

/// Captured output of one code cell.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CellOutput {
    pub stdout: String,
    pub stderr: String,

    /// Figure file names inside the request's figures directory
    pub figures: Vec<String>,

    /// Formatted traceback when the cell raised
    pub error: Option<String>,
}

/// Result of executing a script.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionOutput {
    /// One entry per executed code cell, in order
    pub cells: Vec<CellOutput>,
}

impl ExecutionOutput {
    /// Total number of figures produced.
    pub fn figure_count(&self) -> usize {
        self.cells.iter().map(|c| c.figures.len()).sum()
    }
}

/// Errors that can occur while executing a script.
#[derive(Debug, thiserror::Error)]
pub enum ExecutionError {
    #[error("Failed to start interpreter '{interpreter}': {message}")]
    Spawn {
        interpreter: String,
        message: String,
    },

    #[error("Example {script} failed in cell at line {line}:\n{output}")]
    Failed {
        script: PathBuf,
        line: usize,
        output: String,
    },

    #[error("Example {script} timed out after {seconds}s")]
    Timeout { script: PathBuf, seconds: u64 },

    #[error("Interpreter exited with {status} while running {script}:\n{stderr}")]
    Crashed {
        script: PathBuf,
        status: String,
        stderr: String,
    },

    #[error("Invalid executor output for {script}: {message}")]
    Protocol { script: PathBuf, message: String },

    #[error("I/O error during execution: {0}")]
    Io(#[from] std::io::Error),
}

/// Runs example scripts and captures their output.
pub trait ScriptExecutor: Send + Sync {
    /// Executor identifier (e.g., "python")
    fn name(&self) -> &'static str;

    /// Execute every cell of a request in one shared namespace.
    ///
    /// Unless the policy allows errors, the first failing cell ends execution
    /// with [`ExecutionError::Failed`].
    fn execute(&self, request: &ExecutionRequest<'_>) -> Result<ExecutionOutput, ExecutionError>;
}
