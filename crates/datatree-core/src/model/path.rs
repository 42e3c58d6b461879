//! Path arguments and instance paths
//!
//! A [`PathArg`] names one step below a node: a plain child, a keyed list
//! entry or a leaf-list entry. Key predicates live in a `BTreeMap`, so two
//! arguments built with keys in a different order compare equal.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::{QName, Value};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathArg {
    /// Plain child: container, leaf, choice, list or leaf-list as a whole
    Node(QName),
    /// Keyed list entry
    Entry {
        name: QName,
        keys: BTreeMap<QName, Value>,
    },
    /// Leaf-list entry, identified by its value
    Value { name: QName, value: Value },
}

impl PathArg {
    pub fn node(name: QName) -> Self {
        PathArg::Node(name)
    }

    pub fn entry<I, V>(name: QName, keys: I) -> Self
    where
        I: IntoIterator<Item = (QName, V)>,
        V: Into<Value>,
    {
        PathArg::Entry {
            name,
            keys: keys.into_iter().map(|(k, v)| (k, v.into())).collect(),
        }
    }

    /// Entry of a list with a single key leaf
    pub fn single_key(name: QName, key: QName, value: impl Into<Value>) -> Self {
        Self::entry(name, [(key, value)])
    }

    pub fn value(name: QName, value: impl Into<Value>) -> Self {
        PathArg::Value {
            name,
            value: value.into(),
        }
    }

    /// The schema name this argument addresses
    pub fn name(&self) -> &QName {
        match self {
            PathArg::Node(name) => name,
            PathArg::Entry { name, .. } => name,
            PathArg::Value { name, .. } => name,
        }
    }

    pub fn keys(&self) -> Option<&BTreeMap<QName, Value>> {
        match self {
            PathArg::Entry { keys, .. } => Some(keys),
            _ => None,
        }
    }
}

impl fmt::Display for PathArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathArg::Node(name) => write!(f, "{name}"),
            PathArg::Entry { name, keys } => {
                write!(f, "{name}[{{")?;
                for (i, (k, v)) in keys.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{k}={v}")?;
                }
                f.write_str("}]")
            }
            PathArg::Value { name, value } => write!(f, "{name}[{value}]"),
        }
    }
}

/// Absolute or tree-relative location of a node
///
/// Ordering is lexicographic over arguments, so an ancestor always sorts
/// before its descendants.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstancePath(Vec<PathArg>);

impl InstancePath {
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    /// Path of plain node steps
    pub fn of<I: IntoIterator<Item = QName>>(names: I) -> Self {
        Self(names.into_iter().map(PathArg::Node).collect())
    }

    pub fn from_args(args: Vec<PathArg>) -> Self {
        Self(args)
    }

    /// Append one argument, returning the extended path
    pub fn node(mut self, arg: impl Into<PathArg>) -> Self {
        self.0.push(arg.into());
        self
    }

    pub fn push(&mut self, arg: PathArg) {
        self.0.push(arg);
    }

    pub fn pop(&mut self) -> Option<PathArg> {
        self.0.pop()
    }

    pub fn args(&self) -> &[PathArg] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn last(&self) -> Option<&PathArg> {
        self.0.last()
    }

    pub fn parent(&self) -> Option<InstancePath> {
        if self.0.is_empty() {
            None
        } else {
            Some(Self(self.0[..self.0.len() - 1].to_vec()))
        }
    }

    /// First `depth` arguments of this path
    pub fn ancestor(&self, depth: usize) -> InstancePath {
        Self(self.0[..depth.min(self.0.len())].to_vec())
    }

    /// True when `self` is a (non-strict) prefix of `other`
    pub fn is_ancestor_of(&self, other: &InstancePath) -> bool {
        other.0.len() >= self.0.len() && other.0[..self.0.len()] == self.0[..]
    }

    /// Strip `ancestor` from the front, if it is one
    pub fn relative_to(&self, ancestor: &InstancePath) -> Option<InstancePath> {
        if ancestor.is_ancestor_of(self) {
            Some(Self(self.0[ancestor.0.len()..].to_vec()))
        } else {
            None
        }
    }

    pub fn concat(&self, other: &InstancePath) -> InstancePath {
        let mut args = self.0.clone();
        args.extend(other.0.iter().cloned());
        Self(args)
    }
}

impl From<QName> for PathArg {
    fn from(name: QName) -> Self {
        PathArg::Node(name)
    }
}

impl FromIterator<PathArg> for InstancePath {
    fn from_iter<T: IntoIterator<Item = PathArg>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a InstancePath {
    type Item = &'a PathArg;
    type IntoIter = std::slice::Iter<'a, PathArg>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl fmt::Display for InstancePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("/");
        }
        for arg in &self.0 {
            write!(f, "/{arg}")?;
        }
        Ok(())
    }
}
