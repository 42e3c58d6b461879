//! Structured logging facility
//!
//! - Single initialization point via `init(profile)`
//! - Structured logging macros (`log_op_start!`, `log_op_end!`, `log_op_error!`)
//! - Test capture mode for deterministic assertions
//!
//! # Usage
//!
//! ```rust
//! use datatree_core::logging_facility::{init, Profile};
//!
//! init(Profile::Development);
//! ```
//!
//! Engine entry points (`ready`, `validate`, `prepare`, `commit`,
//! `reconfigure`, `validate_leafrefs`) emit one start event and exactly one
//! end or end_error event each. When a modification carries a
//! [`RequestContext`], its transaction events are emitted inside a `request`
//! span holding `request_id`, `trace_id` and `span_id`.

pub mod init;
pub mod macros;
pub mod test_capture;

use datatree_core_types::RequestContext;
use tracing::field::display;
use tracing::Span;

pub use init::{init, Profile};
pub use test_capture::{init_test_capture, CapturedEvent, TestCapture};

/// Milliseconds since `start`, saturating
pub(crate) fn elapsed_ms(start: std::time::Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}

/// Span tagging transaction events with caller correlation ids
///
/// Without a context the span is disabled and adds nothing.
pub(crate) fn request_span(context: Option<&RequestContext>) -> Span {
    match context {
        None => Span::none(),
        Some(ctx) => tracing::info_span!(
            "request",
            request_id = %ctx.request_id,
            trace_id = ctx.trace_id.as_ref().map(display),
            span_id = ctx.span_id.as_ref().map(display),
        ),
    }
}
