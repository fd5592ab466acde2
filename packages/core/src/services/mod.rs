//! Business Services
//!
//! - `Relocator` - moves a subtree to a new position inside one transaction
//! - `position_resolver` - placement to insertion boundary arithmetic
//! - `RelocationPlan` - gap shift and subtree translation steps
//! - `TreeValidator` - whole-tree invariant checks
//!
//! Services coordinate between the storage layer and callers, enforcing the
//! nested set rules around every write.

pub mod error;
pub mod position_resolver;
pub mod relocation_plan;
pub mod relocator;
pub mod tree_validator;

pub use error::RelocationError;
pub use position_resolver::{resolve, ResolvedPosition};
pub use relocation_plan::RelocationPlan;
pub use relocator::{RelocationOutcome, RelocationSummary, Relocator};
pub use tree_validator::{InvariantViolation, TreeValidator};
