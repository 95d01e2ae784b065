//! Run domain module.
//!
//! - `model`: `Run`, `RunSession`, `AnnotationType`, `PromptReference`
//! - `repository`: `RunRepository` and its typed `RunFilter`
//! - `starter`: the `RunStarter` collaborator used by provisioning

mod model;
pub mod repository;
pub mod starter;

pub use model::{AnnotationType, PromptReference, Run, RunSession, RunSessionStatus};
pub use repository::{RunFilter, RunRepository};
pub use starter::{RunRequest, RunStarter};
