//! Interpreter-side driver program.
//!
//! The driver reads a JSON request, executes each cell in a shared namespace
//! with stdout and stderr redirected, saves open matplotlib figures after
//! every cell, and writes the per-cell results as JSON.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::traits::{CellOutput, ExecutionRequest};

/// Request file consumed by the driver.
#[derive(Debug, Serialize)]
pub struct DriverRequest {
    pub script: String,
    pub cells: Vec<DriverCell>,
    pub figures_dir: String,
    pub results: String,
    pub stop_on_error: bool,
}

#[derive(Debug, Serialize)]
pub struct DriverCell {
    pub source: String,
    /// Script line of the first source line
    pub line: usize,
}

/// One entry of the driver's results file.
#[derive(Debug, Deserialize)]
pub struct DriverResult {
    #[serde(default)]
    pub stdout: String,
    #[serde(default)]
    pub stderr: String,
    #[serde(default)]
    pub figures: Vec<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl From<DriverResult> for CellOutput {
    fn from(result: DriverResult) -> Self {
        Self {
            stdout: result.stdout,
            stderr: result.stderr,
            figures: result.figures,
            error: result.error,
        }
    }
}

impl DriverRequest {
    /// Build the driver request for an execution request.
    pub fn new(request: &ExecutionRequest<'_>, script: &Path, results: &Path) -> Self {
        Self {
            script: script.to_string_lossy().to_string(),
            cells: request
                .cells
                .iter()
                .map(|c| DriverCell {
                    source: c.source.to_string(),
                    line: c.source_line,
                })
                .collect(),
            figures_dir: request.figures_dir.to_string_lossy().to_string(),
            results: results.to_string_lossy().to_string(),
            stop_on_error: !request.policy.allow_errors,
        }
    }
}

/// Python driver source.
pub const PYTHON_DRIVER: &str = r#"import contextlib
import io
import json
import os
import sys
import traceback


def _save_figures(figures_dir, index):
    plt = sys.modules.get("matplotlib.pyplot")
    if plt is None:
        return []
    names = []
    for number, fignum in enumerate(plt.get_fignums()):
        name = "cell%d_%d.png" % (index, number)
        plt.figure(fignum).savefig(
            os.path.join(figures_dir, name), metadata={"Software": None}
        )
        names.append(name)
    plt.close("all")
    return names


def _main(request_path):
    with open(request_path, "r", encoding="utf-8") as handle:
        request = json.load(handle)

    script = request["script"]
    sys.path.insert(0, os.path.dirname(script))
    sys.argv = [script]

    try:
        import matplotlib

        matplotlib.use("Agg")
    except Exception:
        pass

    namespace = {"__name__": "__main__", "__file__": script}
    results = []

    for index, cell in enumerate(request["cells"]):
        stdout = io.StringIO()
        stderr = io.StringIO()
        error = None
        # Pad so traceback line numbers match the script
        source = "\n" * (cell["line"] - 1) + cell["source"]
        with contextlib.redirect_stdout(stdout), contextlib.redirect_stderr(stderr):
            try:
                exec(compile(source, script, "exec"), namespace)
            except Exception:
                kind, value, tb = sys.exc_info()
                # Drop the driver's own frame
                error = "".join(traceback.format_exception(kind, value, tb.tb_next))
        figures = _save_figures(request["figures_dir"], index)
        results.append(
            {
                "stdout": stdout.getvalue(),
                "stderr": stderr.getvalue(),
                "figures": figures,
                "error": error,
            }
        )
        if error is not None and request["stop_on_error"]:
            break

    with open(request["results"], "w", encoding="utf-8") as handle:
        json.dump(results, handle)


_main(sys.argv[1])
"#;
