//! Integration tests for telemetry initialization and span helpers.

use waitlist::model::{CustomerId, State};
use waitlist::telemetry::queue::{record_customer, record_state_transition, start_operation_span};

#[test]
fn telemetry_initializes_without_endpoint() {
    // A global subscriber can only be set once per process; a second
    // init in the same binary returns Err, which is acceptable here.
    let config = waitlist::telemetry::TelemetryConfig {
        endpoint: None,
        service_name: "waitlist-test".to_string(),
        log_level: "debug".to_string(),
    };
    let _guard = waitlist::telemetry::init_telemetry(config);
}

#[test]
fn operation_span_records_customer_and_transition() {
    let id = CustomerId::new();
    let span = start_operation_span("seat", Some(id));
    record_state_transition(&span, State::Waiting, State::Seated);
}

#[test]
fn register_span_gets_customer_after_creation() {
    let span = start_operation_span("register", None);
    record_customer(&span, CustomerId::new());
}
