//! Tree configuration
//!
//! An immutable options bag chosen when a [`DataTree`](crate::DataTree) is
//! created. Changing it later goes through `DataTree::reconfigure`.

use serde::{Deserialize, Serialize};

use crate::model::InstancePath;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TreeType {
    /// Only `config true` nodes are allowed
    Configuration,
    /// Every schema node is allowed
    Operational,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeConfig {
    pub tree_type: TreeType,
    /// Schema location the tree is mounted at; empty means the schema root
    #[serde(default)]
    pub root_path: InstancePath,
    #[serde(default = "default_true")]
    pub mandatory_validation: bool,
    #[serde(default)]
    pub unique_indexes: bool,
}

fn default_true() -> bool {
    true
}

impl TreeConfig {
    pub fn builder(tree_type: TreeType) -> TreeConfigBuilder {
        TreeConfigBuilder {
            config: TreeConfig {
                tree_type,
                root_path: InstancePath::empty(),
                mandatory_validation: true,
                unique_indexes: false,
            },
        }
    }

    pub fn default_configuration() -> Self {
        Self::builder(TreeType::Configuration).build()
    }

    pub fn default_operational() -> Self {
        Self::builder(TreeType::Operational).build()
    }

    pub fn is_configuration(&self) -> bool {
        self.tree_type == TreeType::Configuration
    }
}

#[derive(Debug, Clone)]
pub struct TreeConfigBuilder {
    config: TreeConfig,
}

impl TreeConfigBuilder {
    pub fn root_path(mut self, path: InstancePath) -> Self {
        self.config.root_path = path;
        self
    }

    pub fn mandatory_validation(mut self, enabled: bool) -> Self {
        self.config.mandatory_validation = enabled;
        self
    }

    pub fn unique_indexes(mut self, enabled: bool) -> Self {
        self.config.unique_indexes = enabled;
        self
    }

    pub fn build(self) -> TreeConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TreeConfig::default_configuration();
        assert!(config.is_configuration());
        assert!(config.mandatory_validation);
        assert!(!config.unique_indexes);
        assert!(config.root_path.is_empty());
    }

    #[test]
    fn test_deserialize_fills_defaults() {
        let config: TreeConfig =
            serde_json::from_str(r#"{"tree_type":"operational"}"#).unwrap();
        assert_eq!(config, TreeConfig::default_operational());
    }
}
