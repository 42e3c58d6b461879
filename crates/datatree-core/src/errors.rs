use datatree_core_types::{RequestId, TraceId};
use thiserror::Error;

use crate::model::InstancePath;

/// Result type alias using DataTreeError
pub type Result<T> = std::result::Result<T, DataTreeError>;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// Each kind maps to a stable error code that callers can match on without
/// parsing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExErrorKind {
    // Schema/Validation
    SchemaValidation,
    MissingMandatory,
    TooFewElements,
    TooManyElements,
    UniqueViolation,
    LeafRefValidation,
    InvalidInput,

    // Tree state
    NodeDoesNotExist,
    Conflict,
    IllegalState,
    SchemaIncompatible,

    // Internal
    Internal,
}

impl ExErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ExErrorKind::SchemaValidation => "ERR_SCHEMA_VALIDATION",
            ExErrorKind::MissingMandatory => "ERR_MISSING_MANDATORY",
            ExErrorKind::TooFewElements => "ERR_TOO_FEW_ELEMENTS",
            ExErrorKind::TooManyElements => "ERR_TOO_MANY_ELEMENTS",
            ExErrorKind::UniqueViolation => "ERR_UNIQUE_VIOLATION",
            ExErrorKind::LeafRefValidation => "ERR_LEAFREF_VALIDATION",
            ExErrorKind::InvalidInput => "ERR_INVALID_INPUT",
            ExErrorKind::NodeDoesNotExist => "ERR_NODE_DOES_NOT_EXIST",
            ExErrorKind::Conflict => "ERR_CONFLICT",
            ExErrorKind::IllegalState => "ERR_ILLEGAL_STATE",
            ExErrorKind::SchemaIncompatible => "ERR_SCHEMA_INCOMPATIBLE",
            ExErrorKind::Internal => "ERR_INTERNAL",
        }
    }
}

/// Canonical structured error type
///
/// Classification fields for programmatic handling plus context for
/// debugging. Built from a [`DataTreeError`] at logging and API boundaries.
#[derive(Debug, Clone)]
pub struct ExError {
    kind: ExErrorKind,
    op: Option<String>,
    path: Option<String>,
    request_id: Option<RequestId>,
    trace_id: Option<TraceId>,
    message: String,
    source: Option<Box<ExError>>,
    messages: Option<Vec<String>>,
}

impl ExError {
    /// Create a new error with the specified kind
    pub fn new(kind: ExErrorKind) -> Self {
        Self {
            kind,
            op: None,
            path: None,
            request_id: None,
            trace_id: None,
            message: String::new(),
            source: None,
            messages: None,
        }
    }

    /// Add operation context
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Add the offending instance path
    pub fn with_path(mut self, path: impl ToString) -> Self {
        self.path = Some(path.to_string());
        self
    }

    /// Add request ID context
    pub fn with_request_id(mut self, request_id: RequestId) -> Self {
        self.request_id = Some(request_id);
        self
    }

    /// Add trace ID context
    pub fn with_trace_id(mut self, trace_id: TraceId) -> Self {
        self.trace_id = Some(trace_id);
        self
    }

    /// Add custom message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Add source error
    pub fn with_source(mut self, source: ExError) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Add individual failure messages (aggregate leafref failures)
    pub fn with_messages(mut self, messages: Vec<String>) -> Self {
        self.messages = Some(messages);
        self
    }

    /// Get the error kind
    pub fn kind(&self) -> ExErrorKind {
        self.kind
    }

    /// Get the stable error code
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    /// Get the operation context, if any
    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    /// Get the offending path, if any
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    /// Get the request ID context, if any
    pub fn request_id(&self) -> Option<&RequestId> {
        self.request_id.as_ref()
    }

    /// Get the trace ID context, if any
    pub fn trace_id(&self) -> Option<&TraceId> {
        self.trace_id.as_ref()
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get the source error, if any
    pub fn source_error(&self) -> Option<&ExError> {
        self.source.as_deref()
    }

    /// Get the individual messages, if any
    pub fn messages(&self) -> Option<&[String]> {
        self.messages.as_deref()
    }
}

impl std::fmt::Display for ExError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.code())?;
        if let Some(op) = &self.op {
            write!(f, " in operation '{}'", op)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        if let Some(path) = &self.path {
            write!(f, " (path: {})", path)?;
        }
        Ok(())
    }
}

impl std::error::Error for ExError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        None
    }
}

// ========== End Error Facility ==========

/// Error taxonomy of the data tree engine
///
/// Messages are complete sentences; `path` is the node the failure was
/// detected at.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DataTreeError {
    /// Data disagrees with the schema: unknown child, wrong kind, bad value, case mix
    #[error("{message}")]
    SchemaValidation { path: InstancePath, message: String },

    /// A present presence container, list entry or case lacks a mandatory descendant
    #[error("{message}")]
    MissingMandatory { path: InstancePath, message: String },

    /// min-elements or max-elements violated
    #[error("{message}")]
    MinMaxElements {
        path: InstancePath,
        message: String,
        app_tag: &'static str,
    },

    /// Two list entries share the values of a unique constraint
    #[error("{message}")]
    UniqueViolation { path: InstancePath, message: String },

    /// Modification addresses a node that does not exist
    #[error("{message}")]
    NodeDoesNotExist { path: InstancePath, message: String },

    /// Another transaction committed an incompatible change first
    #[error("{message}")]
    Conflict { path: InstancePath, message: String },

    /// Aggregate of every leafref that failed to resolve
    #[error("{count} leafref validation failure(s): {}", messages.join("; "))]
    LeafRefValidation { count: usize, messages: Vec<String> },

    /// API used out of order or against stale state
    #[error("{message}")]
    IllegalState { message: String },

    #[error("{message}")]
    InvalidInput { message: String },

    /// Stored data does not fit a new schema
    #[error("{message}")]
    SchemaIncompatible { path: InstancePath, message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl DataTreeError {
    pub(crate) fn schema(path: &InstancePath, message: impl Into<String>) -> Self {
        DataTreeError::SchemaValidation {
            path: path.clone(),
            message: message.into(),
        }
    }

    pub(crate) fn missing(path: &InstancePath, message: impl Into<String>) -> Self {
        DataTreeError::NodeDoesNotExist {
            path: path.clone(),
            message: message.into(),
        }
    }

    pub(crate) fn conflict(path: &InstancePath, message: impl Into<String>) -> Self {
        DataTreeError::Conflict {
            path: path.clone(),
            message: message.into(),
        }
    }

    pub(crate) fn illegal_state(message: impl Into<String>) -> Self {
        DataTreeError::IllegalState {
            message: message.into(),
        }
    }

    /// Path the failure was detected at, when the variant carries one
    pub fn path(&self) -> Option<&InstancePath> {
        match self {
            DataTreeError::SchemaValidation { path, .. }
            | DataTreeError::MissingMandatory { path, .. }
            | DataTreeError::MinMaxElements { path, .. }
            | DataTreeError::UniqueViolation { path, .. }
            | DataTreeError::NodeDoesNotExist { path, .. }
            | DataTreeError::Conflict { path, .. }
            | DataTreeError::SchemaIncompatible { path, .. } => Some(path),
            DataTreeError::LeafRefValidation { .. }
            | DataTreeError::IllegalState { .. }
            | DataTreeError::InvalidInput { .. }
            | DataTreeError::Internal { .. } => None,
        }
    }

    /// NETCONF-style error-app-tag, where one applies
    pub fn app_tag(&self) -> Option<&'static str> {
        match self {
            DataTreeError::MinMaxElements { app_tag, .. } => Some(*app_tag),
            DataTreeError::UniqueViolation { .. } => Some("data-not-unique"),
            _ => None,
        }
    }
}

impl<T> From<std::sync::PoisonError<T>> for DataTreeError {
    fn from(_: std::sync::PoisonError<T>) -> Self {
        DataTreeError::Internal {
            message: "data tree lock poisoned".to_string(),
        }
    }
}

impl From<DataTreeError> for ExError {
    fn from(err: DataTreeError) -> Self {
        match err {
            DataTreeError::SchemaValidation { path, message } => {
                ExError::new(ExErrorKind::SchemaValidation)
                    .with_path(path)
                    .with_message(message)
            }

            DataTreeError::MissingMandatory { path, message } => {
                ExError::new(ExErrorKind::MissingMandatory)
                    .with_path(path)
                    .with_message(message)
            }

            DataTreeError::MinMaxElements {
                path,
                message,
                app_tag,
            } => {
                let kind = if app_tag == "too-many-elements" {
                    ExErrorKind::TooManyElements
                } else {
                    ExErrorKind::TooFewElements
                };
                ExError::new(kind).with_path(path).with_message(message)
            }

            DataTreeError::UniqueViolation { path, message } => {
                ExError::new(ExErrorKind::UniqueViolation)
                    .with_path(path)
                    .with_message(message)
            }

            DataTreeError::NodeDoesNotExist { path, message } => {
                ExError::new(ExErrorKind::NodeDoesNotExist)
                    .with_path(path)
                    .with_message(message)
            }

            DataTreeError::Conflict { path, message } => ExError::new(ExErrorKind::Conflict)
                .with_path(path)
                .with_message(message),

            DataTreeError::LeafRefValidation { count, messages } => {
                ExError::new(ExErrorKind::LeafRefValidation)
                    .with_op("validate_leafrefs")
                    .with_message(format!("{} leafref validation failure(s)", count))
                    .with_messages(messages)
            }

            DataTreeError::IllegalState { message } => {
                ExError::new(ExErrorKind::IllegalState).with_message(message)
            }

            DataTreeError::InvalidInput { message } => {
                ExError::new(ExErrorKind::InvalidInput).with_message(message)
            }

            DataTreeError::SchemaIncompatible { path, message } => {
                ExError::new(ExErrorKind::SchemaIncompatible)
                    .with_op("reconfigure")
                    .with_path(path)
                    .with_message(message)
            }

            DataTreeError::Internal { message } => {
                ExError::new(ExErrorKind::Internal).with_message(message)
            }
        }
    }
}

impl From<&DataTreeError> for ExError {
    fn from(err: &DataTreeError) -> Self {
        ExError::from(err.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::QName;

    #[test]
    fn test_error_kind_codes() {
        let cases = [
            (ExErrorKind::SchemaValidation, "ERR_SCHEMA_VALIDATION"),
            (ExErrorKind::Conflict, "ERR_CONFLICT"),
            (ExErrorKind::NodeDoesNotExist, "ERR_NODE_DOES_NOT_EXIST"),
            (ExErrorKind::LeafRefValidation, "ERR_LEAFREF_VALIDATION"),
        ];
        for (kind, expected_code) in cases {
            assert_eq!(kind.code(), expected_code, "Wrong code for {:?}", kind);
        }
    }

    #[test]
    fn test_min_max_maps_by_app_tag() {
        let err = DataTreeError::MinMaxElements {
            path: InstancePath::of([QName::new("", "l")]),
            message: "l has too many elements (3), can have at most 2".into(),
            app_tag: "too-many-elements",
        };
        assert_eq!(err.app_tag(), Some("too-many-elements"));
        let ex: ExError = err.into();
        assert_eq!(ex.kind(), ExErrorKind::TooManyElements);
        assert_eq!(ex.path(), Some("/l"));
    }

    #[test]
    fn test_leafref_display_joins_messages() {
        let err = DataTreeError::LeafRefValidation {
            count: 2,
            messages: vec!["a".into(), "b".into()],
        };
        assert_eq!(err.to_string(), "2 leafref validation failure(s): a; b");
        let ex: ExError = err.into();
        assert_eq!(ex.messages().map(<[String]>::len), Some(2));
    }
}
