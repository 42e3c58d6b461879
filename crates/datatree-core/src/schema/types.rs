//! Leaf value types and their restrictions

use std::fmt;
use std::ops::RangeInclusive;

use regex::Regex;

use crate::errors::{DataTreeError, Result};
use crate::model::{InstancePath, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaseType {
    Empty,
    Boolean,
    Int,
    Uint,
    String,
    Binary,
    /// No base type check; leafrefs and untyped leaves
    Any,
}

impl fmt::Display for BaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BaseType::Empty => "empty",
            BaseType::Boolean => "boolean",
            BaseType::Int => "int",
            BaseType::Uint => "uint",
            BaseType::String => "string",
            BaseType::Binary => "binary",
            BaseType::Any => "any",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone)]
struct Pattern {
    source: String,
    regex: Regex,
}

/// Type of a leaf or leaf-list, with YANG-style restrictions
#[derive(Debug, Clone)]
pub struct LeafType {
    base: BaseType,
    ranges: Vec<RangeInclusive<i128>>,
    lengths: Vec<RangeInclusive<usize>>,
    patterns: Vec<Pattern>,
    leafref: Option<InstancePath>,
}

impl LeafType {
    pub fn new(base: BaseType) -> Self {
        Self {
            base,
            ranges: Vec::new(),
            lengths: Vec::new(),
            patterns: Vec::new(),
            leafref: None,
        }
    }

    pub fn string() -> Self {
        Self::new(BaseType::String)
    }

    pub fn int() -> Self {
        Self::new(BaseType::Int)
    }

    pub fn uint() -> Self {
        Self::new(BaseType::Uint)
    }

    pub fn boolean() -> Self {
        Self::new(BaseType::Boolean)
    }

    pub fn empty() -> Self {
        Self::new(BaseType::Empty)
    }

    pub fn binary() -> Self {
        Self::new(BaseType::Binary)
    }

    pub fn any() -> Self {
        Self::new(BaseType::Any)
    }

    /// Reference to the leaf values found at an absolute data path
    ///
    /// The path names every data step from the tree root, choices included.
    pub fn leafref(target: InstancePath) -> Self {
        Self {
            leafref: Some(target),
            ..Self::new(BaseType::Any)
        }
    }

    /// Allow `min..=max`; several calls form a union
    pub fn with_range(mut self, min: i128, max: i128) -> Self {
        self.ranges.push(min..=max);
        self
    }

    /// Allow lengths `min..=max` (characters for strings, bytes for binary)
    pub fn with_length(mut self, min: usize, max: usize) -> Self {
        self.lengths.push(min..=max);
        self
    }

    /// Require a full match of `pattern`; several patterns must all match
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` when the pattern does not compile.
    pub fn with_pattern(mut self, pattern: &str) -> Result<Self> {
        let regex = Regex::new(&format!("^(?:{pattern})$")).map_err(|e| {
            DataTreeError::InvalidInput {
                message: format!("Invalid pattern {pattern}: {e}"),
            }
        })?;
        self.patterns.push(Pattern {
            source: pattern.to_string(),
            regex,
        });
        Ok(self)
    }

    pub fn base(&self) -> BaseType {
        self.base
    }

    pub fn leafref_path(&self) -> Option<&InstancePath> {
        self.leafref.as_ref()
    }

    /// Check `value` against the base type and every restriction
    ///
    /// The error is a human-readable reason without path context.
    pub fn check(&self, value: &Value) -> std::result::Result<(), String> {
        let type_ok = matches!(
            (self.base, value),
            (BaseType::Any, _)
                | (BaseType::Empty, Value::Empty)
                | (BaseType::Boolean, Value::Bool(_))
                | (BaseType::Int, Value::Int(_))
                | (BaseType::Uint, Value::Uint(_))
                | (BaseType::String, Value::String(_))
                | (BaseType::Binary, Value::Binary(_))
        );
        if !type_ok {
            return Err(format!(
                "Value {} of type {} is not valid for type {}",
                value,
                value.kind_name(),
                self.base
            ));
        }

        if !self.ranges.is_empty() {
            if let Some(n) = value.as_i128() {
                if !self.ranges.iter().any(|r| r.contains(&n)) {
                    return Err(format!(
                        "Value {} is not in required ranges {}",
                        value,
                        format_ranges(&self.ranges)
                    ));
                }
            }
        }

        let length = match value {
            Value::String(s) => Some(s.chars().count()),
            Value::Binary(b) => Some(b.len()),
            _ => None,
        };
        if let Some(len) = length {
            if !self.lengths.is_empty() && !self.lengths.iter().any(|r| r.contains(&len)) {
                return Err(format!(
                    "Value length {} is not in required lengths {}",
                    len,
                    format_ranges(&self.lengths)
                ));
            }
        }

        if let Value::String(s) = value {
            if let Some(p) = self.patterns.iter().find(|p| !p.regex.is_match(s)) {
                return Err(format!(
                    "Value {} does not match regular expression '{}'",
                    s, p.source
                ));
            }
        }
        Ok(())
    }
}

fn format_ranges<T: fmt::Display>(ranges: &[RangeInclusive<T>]) -> String {
    let parts: Vec<String> = ranges
        .iter()
        .map(|r| format!("{}..{}", r.start(), r.end()))
        .collect();
    format!("[{}]", parts.join(", "))
}
