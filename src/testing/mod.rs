//! Test orchestration
//!
//! Declarative test cases, the validators applied to their responses, a
//! dependency-aware runner and the lifecycle manager for the remote
//! resources tests create.

pub mod builtin;
mod model;
pub mod report;
pub mod resources;
mod runner;
mod suite;
mod validators;

#[cfg(test)]
pub(crate) mod fake;

pub use model::{into_object, Replay, TestCase, TestResult, TestStatus, ToolInvocation};
pub use resources::{Resource, ResourceKind, ResourceManager, ResourceNamer, ResourceSpec, Scope};
pub use runner::{
    classify, run_suite, run_test, run_with_session, RunOptions, RunReport, Summary,
    DEFAULT_CALL_TIMEOUT,
};
pub use suite::Suite;
pub use validators::{CustomValidator, Validator, Verdict};
