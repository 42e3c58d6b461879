use std::fmt;

use serde::{Deserialize, Serialize};

/// Operation recorded on one node of a modification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogicalOperation {
    /// Nothing recorded yet
    None,
    /// Only children were modified
    Touch,
    Write,
    Merge,
    Delete,
}

impl fmt::Display for LogicalOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LogicalOperation::None => "NONE",
            LogicalOperation::Touch => "TOUCH",
            LogicalOperation::Write => "WRITE",
            LogicalOperation::Merge => "MERGE",
            LogicalOperation::Delete => "DELETE",
        };
        f.write_str(name)
    }
}

/// Net effect of a modification on one node, as reported by a candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ModificationType {
    Unmodified,
    /// Structural node created because a child was added
    Appeared,
    /// Structural node removed because its last child was removed
    Disappeared,
    Write,
    Delete,
    SubtreeModified,
}

impl fmt::Display for ModificationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ModificationType::Unmodified => "UNMODIFIED",
            ModificationType::Appeared => "APPEARED",
            ModificationType::Disappeared => "DISAPPEARED",
            ModificationType::Write => "WRITE",
            ModificationType::Delete => "DELETE",
            ModificationType::SubtreeModified => "SUBTREE_MODIFIED",
        };
        f.write_str(name)
    }
}
