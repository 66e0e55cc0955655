//! Incremental change reconciliation.
//!
//! - `ChangeReconciler` - validates change descriptions against the current
//!   snapshot and produces an `UpdatePlan`
//! - `IncrementalPlan` - delete, insert, reload, move steps in fixed order
//! - `IndexedView` / `LiveView` - views that apply plans with batch semantics

pub mod plan;
pub mod reconciler;
pub mod view;

pub use plan::{permute, IncrementalPlan, PlanStep, UpdatePlan};
pub use reconciler::ChangeReconciler;
pub use view::{IndexedView, LiveView, ViewCell};
