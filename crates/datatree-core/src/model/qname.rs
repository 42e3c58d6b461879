use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Qualified name of a schema or data node
///
/// Ordering is namespace first, then local name. The namespace may be empty
/// for ad-hoc trees, in which case the name displays without a prefix.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct QName {
    namespace: Arc<str>,
    local_name: Arc<str>,
}

impl QName {
    pub fn new(namespace: impl AsRef<str>, local_name: impl AsRef<str>) -> Self {
        Self {
            namespace: Arc::from(namespace.as_ref()),
            local_name: Arc::from(local_name.as_ref()),
        }
    }

    /// Name of the synthetic node at the top of every data tree
    pub fn root() -> Self {
        Self::new("urn:ietf:params:xml:ns:netconf:base:1.0", "data")
    }

    /// A sibling name in the same namespace
    pub fn sibling(&self, local_name: impl AsRef<str>) -> Self {
        Self {
            namespace: Arc::clone(&self.namespace),
            local_name: Arc::from(local_name.as_ref()),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn local_name(&self) -> &str {
        &self.local_name
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace.is_empty() {
            f.write_str(&self.local_name)
        } else {
            write!(f, "({}){}", self.namespace, self.local_name)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_with_and_without_namespace() {
        assert_eq!(QName::new("urn:foo", "bar").to_string(), "(urn:foo)bar");
        assert_eq!(QName::new("", "bar").to_string(), "bar");
    }

    #[test]
    fn test_sibling_shares_namespace() {
        let a = QName::new("urn:foo", "a");
        let b = a.sibling("b");
        assert_eq!(b.namespace(), "urn:foo");
        assert_eq!(b.local_name(), "b");
        assert!(a < b);
    }
}
