// orderflow/src/flow/mod.rs

//! A small step engine used to express the order workflows.
//!
//! A `Pipeline<TData, Err>` is an ordered list of named steps. Each step may carry
//! `before`, `on` and `after` handlers operating on a shared `ContextData<TData>`.
//! A step can also be declared as a branch, in which case exactly one arm runs,
//! chosen by a key computed from the context.

pub mod branch;
pub mod context_data;
pub mod control;
pub mod pipeline;
pub mod step;

pub use branch::{BranchBuilder, Unmatched};
pub use context_data::ContextData;
pub use control::{PipelineControl, PipelineResult};
pub use pipeline::{Handler, Pipeline};
pub use step::{SkipCondition, StepDef};
