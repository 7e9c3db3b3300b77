//! Queue operation span helpers.
//!
//! Provides span creation and state-transition recording for customer
//! records moving through the engine.

use tracing::Span;

use crate::model::{CustomerId, State};

/// Start a span for one engine operation.
///
/// The `customer.id` field is declared empty for operations that create
/// the record, and can be filled in via [`record_customer`].
pub fn start_operation_span(operation: &str, id: Option<CustomerId>) -> Span {
    let span = tracing::info_span!(
        "waitlist.operation",
        "waitlist.operation" = operation,
        "customer.id" = tracing::field::Empty,
    );
    if let Some(id) = id {
        record_customer(&span, id);
    }
    span
}

/// Attach the customer id to a span created without one.
pub fn record_customer(span: &Span, id: CustomerId) {
    span.record("customer.id", tracing::field::display(id));
}

/// Record a state transition event on the given span.
pub fn record_state_transition(span: &Span, from: State, to: State) {
    span.in_scope(|| {
        tracing::info!(from = %from, to = %to, "state_transition");
    });
}
