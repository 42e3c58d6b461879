//! Indented text rendering of data trees
//!
//! One node per line, children indented by four spaces. Names in the same
//! namespace as their parent are shown by local name only.

use std::fmt;

use super::{DataNode, PathArg, QName, Value};

pub(crate) const INDENT: &str = "    ";

/// Multi-line view of a [`DataNode`], returned by [`DataNode::pretty_tree`]
pub struct PrettyTree<'a>(pub(crate) &'a DataNode);

impl fmt::Display for PrettyTree<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_node(f, self.0, None, 0)
    }
}

/// Path argument shortened against the parent's namespace
pub(crate) struct Label<'a> {
    arg: &'a PathArg,
    parent: Option<&'a str>,
}

impl<'a> Label<'a> {
    pub(crate) fn new(arg: &'a PathArg, parent: Option<&'a str>) -> Self {
        Self { arg, parent }
    }

    fn name(&self, f: &mut fmt::Formatter<'_>, name: &QName) -> fmt::Result {
        if Some(name.namespace()) == self.parent {
            f.write_str(name.local_name())
        } else {
            write!(f, "{name}")
        }
    }
}

impl fmt::Display for Label<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.name(f, self.arg.name())?;
        match self.arg {
            PathArg::Node(_) => Ok(()),
            PathArg::Entry { keys, .. } => {
                f.write_str("[{")?;
                for (i, (key, value)) in keys.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    self.name(f, key)?;
                    write!(f, "={value}")?;
                }
                f.write_str("}]")
            }
            PathArg::Value { value, .. } => write!(f, "[{value}]"),
        }
    }
}

pub(crate) fn indent(f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
    for _ in 0..depth {
        f.write_str(INDENT)?;
    }
    Ok(())
}

fn write_value(f: &mut fmt::Formatter<'_>, value: &Value) -> fmt::Result {
    match value {
        Value::String(s) => write!(f, " \"{s}\""),
        other => write!(f, " {other}"),
    }
}

pub(crate) fn write_node(
    f: &mut fmt::Formatter<'_>,
    node: &DataNode,
    parent: Option<&str>,
    depth: usize,
) -> fmt::Result {
    indent(f, depth)?;
    let ns = node.name().namespace();
    match node {
        DataNode::Leaf { name, value } | DataNode::LeafSetEntry { name, value } => {
            write!(f, "{}", Label::new(&PathArg::Node(name.clone()), parent))?;
            write_value(f, value)
        }
        DataNode::AnyData { payload, .. } => {
            write!(f, "{} {}", Label::new(&node.identifier(), parent), payload)
        }
        DataNode::UnkeyedList { entries, .. } => {
            let label = node.identifier();
            write!(f, "{}", Label::new(&label, parent))?;
            for entry in entries.iter() {
                f.write_str("\n")?;
                indent(f, depth + 1)?;
                write!(f, "{}", Label::new(&label, Some(ns)))?;
                for child in entry.values() {
                    f.write_str("\n")?;
                    write_node(f, child, Some(ns), depth + 2)?;
                }
            }
            Ok(())
        }
        _ => {
            write!(f, "{}", Label::new(&node.identifier(), parent))?;
            if let Some(children) = node.children() {
                for child in children.values() {
                    f.write_str("\n")?;
                    write_node(f, child, Some(ns), depth + 1)?;
                }
            }
            Ok(())
        }
    }
}
