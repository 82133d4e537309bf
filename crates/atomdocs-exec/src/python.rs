//! Python interpreter executor.

use std::fs::{self, File};
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};

use crate::driver::{DriverRequest, DriverResult, PYTHON_DRIVER};
use crate::traits::{
    CellOutput, ExecutionError, ExecutionOutput, ExecutionRequest, ScriptExecutor,
};

/// Executes scripts with an external Python interpreter.
#[derive(Debug, Clone)]
pub struct PythonExecutor {
    interpreter: String,
}

impl PythonExecutor {
    /// Create an executor for the given interpreter command (e.g., "python3").
    pub fn new(interpreter: impl Into<String>) -> Self {
        Self {
            interpreter: interpreter.into(),
        }
    }

    pub fn interpreter(&self) -> &str {
        &self.interpreter
    }
}

impl Default for PythonExecutor {
    fn default() -> Self {
        Self::new("python3")
    }
}

impl ScriptExecutor for PythonExecutor {
    fn name(&self) -> &'static str {
        "python"
    }

    fn execute(&self, request: &ExecutionRequest<'_>) -> Result<ExecutionOutput, ExecutionError> {
        let script = fs::canonicalize(request.script_path)?;
        let scratch = tempfile::Builder::new().prefix("atomdocs-exec").tempdir()?;

        let driver_path = scratch.path().join("driver.py");
        let request_path = scratch.path().join("request.json");
        let results_path = scratch.path().join("results.json");
        let stderr_path = scratch.path().join("stderr.log");

        fs::write(&driver_path, PYTHON_DRIVER)?;
        let driver_request = DriverRequest::new(request, &script, &results_path);
        let json = serde_json::to_string(&driver_request).map_err(|e| ExecutionError::Protocol {
            script: script.clone(),
            message: e.to_string(),
        })?;
        fs::write(&request_path, json)?;

        tracing::debug!(
            "Running {} ({} cells) with {}",
            script.display(),
            request.cells.len(),
            self.interpreter
        );

        let mut child = Command::new(&self.interpreter)
            .arg(&driver_path)
            .arg(&request_path)
            .current_dir(request.working_dir)
            .env("MPLBACKEND", "Agg")
            .env("PYTHONHASHSEED", "0")
            .stdin(Stdio::null())
            .stdout(Stdio::from(File::create(scratch.path().join("stdout.log"))?))
            .stderr(Stdio::from(File::create(&stderr_path)?))
            .spawn()
            .map_err(|e| ExecutionError::Spawn {
                interpreter: self.interpreter.clone(),
                message: e.to_string(),
            })?;

        let Some(status) = wait_with_timeout(&mut child, request.policy.timeout)? else {
            return Err(ExecutionError::Timeout {
                script,
                seconds: request.policy.timeout.map_or(0, |t| t.as_secs()),
            });
        };

        let stderr = fs::read_to_string(&stderr_path).unwrap_or_default();

        if !results_path.exists() {
            return Err(ExecutionError::Crashed {
                script,
                status: status.to_string(),
                stderr,
            });
        }

        let results: Vec<DriverResult> = serde_json::from_str(&fs::read_to_string(&results_path)?)
            .map_err(|e| ExecutionError::Protocol {
                script: script.clone(),
                message: e.to_string(),
            })?;

        if results.len() > request.cells.len() {
            return Err(ExecutionError::Protocol {
                script,
                message: format!(
                    "expected at most {} cell results, got {}",
                    request.cells.len(),
                    results.len()
                ),
            });
        }

        let cells: Vec<CellOutput> = results.into_iter().map(CellOutput::from).collect();
        check_failures(request, &cells)?;

        Ok(ExecutionOutput { cells })
    }
}

/// Turn the first failing cell into an error unless the policy allows errors.
pub(crate) fn check_failures(
    request: &ExecutionRequest<'_>,
    cells: &[CellOutput],
) -> Result<(), ExecutionError> {
    if request.policy.allow_errors {
        return Ok(());
    }

    for (index, cell) in cells.iter().enumerate() {
        if let Some(error) = &cell.error {
            let mut output = String::new();
            if !cell.stderr.is_empty() {
                output.push_str(&cell.stderr);
                if !cell.stderr.ends_with('\n') {
                    output.push('\n');
                }
            }
            output.push_str(error);

            return Err(ExecutionError::Failed {
                script: request.script_path.to_path_buf(),
                line: request.cells.get(index).map_or(0, |c| c.line),
                output,
            });
        }
    }

    Ok(())
}

/// Wait for the child, killing it once the timeout elapses.
///
/// Returns `None` when the child was killed.
fn wait_with_timeout(
    child: &mut Child,
    timeout: Option<Duration>,
) -> std::io::Result<Option<ExitStatus>> {
    let Some(timeout) = timeout else {
        return child.wait().map(Some);
    };

    let start = Instant::now();
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if start.elapsed() >= timeout {
            // Already exited between the two checks is fine
            let _ = child.kill();
            child.wait()?;
            return Ok(None);
        }
        std::thread::sleep(Duration::from_millis(25));
    }
}

/// Whether an interpreter command can be started.
pub fn interpreter_available(interpreter: &str) -> bool {
    Command::new(interpreter)
        .arg("--version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Working directory for a script: its parent directory.
pub fn script_dir(script: &Path) -> &Path {
    script
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::{CodeCell, ExecutionPolicy};
    use tempfile::tempdir;

    fn run(
        cells: &[&str],
        policy: ExecutionPolicy,
    ) -> Option<Result<ExecutionOutput, ExecutionError>> {
        if !interpreter_available("python3") {
            eprintln!("python3 not available, skipping");
            return None;
        }

        let temp = tempdir().unwrap();
        let script = temp.path().join("example.py");
        fs::write(&script, cells.join("\n")).unwrap();
        let figures = temp.path().join("figures");
        fs::create_dir_all(&figures).unwrap();

        let request = ExecutionRequest {
            script_path: &script,
            cells: cells
                .iter()
                .enumerate()
                .map(|(i, source)| CodeCell {
                    source: *source,
                    line: i * 3 + 1,
                    source_line: i * 3 + 2,
                })
                .collect(),
            working_dir: temp.path(),
            figures_dir: &figures,
            policy,
        };

        Some(PythonExecutor::default().execute(&request))
    }

    #[test]
    fn captures_output_per_cell() {
        let Some(result) = run(
            &["rabi = 2.0\nprint(rabi * 2)", "import sys\nprint('warn', file=sys.stderr)"],
            ExecutionPolicy::default(),
        ) else {
            return;
        };

        let output = result.unwrap();
        assert_eq!(output.cells.len(), 2);
        assert_eq!(output.cells[0].stdout, "4.0\n");
        assert_eq!(output.cells[1].stderr, "warn\n");
        assert_eq!(output.figure_count(), 0);
    }

    #[test]
    fn shares_namespace_and_sets_file() {
        let Some(result) = run(
            &["import os\nname = os.path.basename(__file__)", "print(name)"],
            ExecutionPolicy::default(),
        ) else {
            return;
        };

        assert_eq!(result.unwrap().cells[1].stdout, "example.py\n");
    }

    #[test]
    fn failing_cell_aborts_with_traceback() {
        let Some(result) = run(
            &["x = 1", "raise RuntimeError('detuning out of range')", "print('unreachable')"],
            ExecutionPolicy::default(),
        ) else {
            return;
        };

        match result.unwrap_err() {
            ExecutionError::Failed { line, output, .. } => {
                assert_eq!(line, 4);
                assert!(output.contains("RuntimeError: detuning out of range"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn traceback_names_the_failing_script_line() {
        if !interpreter_available("python3") {
            eprintln!("python3 not available, skipping");
            return;
        }

        let temp = tempdir().unwrap();
        let script = temp.path().join("example.py");
        fs::write(&script, "# %%\n\nx = 1\nraise RuntimeError('boom')\n").unwrap();

        let request = ExecutionRequest {
            script_path: &script,
            cells: vec![CodeCell {
                source: "x = 1\nraise RuntimeError('boom')",
                line: 1,
                source_line: 3,
            }],
            working_dir: temp.path(),
            figures_dir: temp.path(),
            policy: ExecutionPolicy::default(),
        };

        match PythonExecutor::default().execute(&request).unwrap_err() {
            ExecutionError::Failed { line, output, .. } => {
                assert_eq!(line, 1);
                assert!(output.contains("line 4"), "{output}");
                assert!(output.contains("raise RuntimeError('boom')"), "{output}");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn allow_errors_keeps_going() {
        let Some(result) = run(
            &["1 / 0", "print('after')"],
            ExecutionPolicy {
                allow_errors: true,
                timeout: None,
            },
        ) else {
            return;
        };

        let output = result.unwrap();
        assert!(output.cells[0]
            .error
            .as_deref()
            .unwrap()
            .contains("ZeroDivisionError"));
        assert_eq!(output.cells[1].stdout, "after\n");
    }

    #[test]
    fn times_out_long_running_scripts() {
        let Some(result) = run(
            &["import time\ntime.sleep(30)"],
            ExecutionPolicy {
                allow_errors: false,
                timeout: Some(Duration::from_millis(500)),
            },
        ) else {
            return;
        };

        assert!(matches!(result, Err(ExecutionError::Timeout { .. })));
    }

    #[test]
    fn missing_interpreter_is_a_spawn_error() {
        let temp = tempdir().unwrap();
        let script = temp.path().join("example.py");
        fs::write(&script, "print(1)").unwrap();

        let request = ExecutionRequest {
            script_path: &script,
            cells: vec![CodeCell {
                source: "print(1)",
                line: 1,
                source_line: 2,
            }],
            working_dir: temp.path(),
            figures_dir: temp.path(),
            policy: ExecutionPolicy::default(),
        };

        let result = PythonExecutor::new("atomdocs-no-such-python").execute(&request);

        assert!(matches!(result, Err(ExecutionError::Spawn { .. })));
    }

    #[test]
    fn script_dir_defaults_to_current() {
        assert_eq!(script_dir(Path::new("rabi.py")), Path::new("."));
        assert_eq!(
            script_dir(Path::new("docs/examples/rabi.py")),
            Path::new("docs/examples")
        );
    }
}
