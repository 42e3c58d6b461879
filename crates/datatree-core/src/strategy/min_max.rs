use crate::errors::{DataTreeError, Result};
use crate::model::{InstancePath, QName};

pub(crate) const TOO_FEW_ELEMENTS: &str = "too-few-elements";
pub(crate) const TOO_MANY_ELEMENTS: &str = "too-many-elements";

/// min-elements / max-elements of a list or leaf-list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ElementBounds {
    min: usize,
    max: Option<usize>,
}

impl ElementBounds {
    pub(crate) fn new(min: usize, max: Option<usize>) -> Self {
        Self { min, max }
    }

    pub(crate) fn is_bounded(&self) -> bool {
        self.min > 0 || self.max.is_some()
    }

    /// An empty list does not exist, so a count of zero always passes
    pub(crate) fn check(&self, name: &QName, count: usize, path: &InstancePath) -> Result<()> {
        if count == 0 {
            return Ok(());
        }
        if let Some(max) = self.max {
            if count > max {
                return Err(DataTreeError::MinMaxElements {
                    path: path.clone(),
                    message: format!(
                        "{} has too many elements ({}), can have at most {}",
                        name, count, max
                    ),
                    app_tag: TOO_MANY_ELEMENTS,
                });
            }
        }
        if count < self.min {
            return Err(DataTreeError::MinMaxElements {
                path: path.clone(),
                message: format!(
                    "{} does not have enough elements ({}), needs at least {}",
                    name, count, self.min
                ),
                app_tag: TOO_FEW_ELEMENTS,
            });
        }
        Ok(())
    }
}
