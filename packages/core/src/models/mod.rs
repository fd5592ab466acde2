//! Data Models
//!
//! - `TreeNode` - one row of a nested set tree
//! - `Placement` - destination of a relocation relative to an anchor node

mod placement;
mod tree_node;

pub use placement::Placement;
pub use tree_node::{NodeId, TreeNode};
