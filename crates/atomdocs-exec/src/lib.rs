//! Execution of example scripts for documentation builds.
//!
//! Scripts are run cell by cell by an external interpreter. Each cell's
//! printed output and any figures it leaves open are captured so the page
//! renderer can embed them.

pub mod driver;
pub mod python;
pub mod traits;

pub use python::PythonExecutor;
pub use traits::{
    CellOutput, CodeCell, ExecutionError, ExecutionOutput, ExecutionPolicy, ExecutionRequest,
    ScriptExecutor,
};
