//! Placement of a relocated subtree relative to an anchor node

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Where a relocated node lands relative to its anchor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Placement {
    /// Immediately before the anchor, under the anchor's parent
    PrecedingSibling,

    /// Immediately after the anchor, under the anchor's parent
    FollowingSibling,

    /// First child of the anchor
    FirstChild,
}

impl Placement {
    /// True for the two sibling placements
    pub fn is_sibling(self) -> bool {
        matches!(self, Self::PrecedingSibling | Self::FollowingSibling)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::PrecedingSibling => "preceding_sibling",
            Self::FollowingSibling => "following_sibling",
            Self::FirstChild => "first_child",
        }
    }
}

impl fmt::Display for Placement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Placement {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "preceding_sibling" => Ok(Self::PrecedingSibling),
            "following_sibling" => Ok(Self::FollowingSibling),
            "first_child" => Ok(Self::FirstChild),
            other => Err(format!("Unknown placement: {}", other)),
        }
    }
}
