//! Canonical structured-logging keys and event names
//!
//! Log consumers match on these strings, so they are part of the public contract.

pub const FIELD_COMPONENT: &str = "component";
pub const FIELD_OP: &str = "op";
pub const FIELD_EVENT: &str = "event";
pub const FIELD_DURATION_MS: &str = "duration_ms";
pub const FIELD_REQUEST_ID: &str = "request_id";
pub const FIELD_TRACE_ID: &str = "trace_id";
pub const FIELD_SPAN_ID: &str = "span_id";

// Tree coordinates
pub const FIELD_PATH: &str = "path";
pub const FIELD_TX_VERSION: &str = "tx_version";
pub const FIELD_ROOT_VERSION: &str = "root_version";
pub const FIELD_MODIFICATION_TYPE: &str = "modification_type";

// Error fields
pub const FIELD_ERR_KIND: &str = "err.kind";
pub const FIELD_ERR_CODE: &str = "err.code";

pub const EVENT_START: &str = "start";
pub const EVENT_END: &str = "end";
pub const EVENT_END_ERROR: &str = "end_error";
