//! Metric instrument factories for waitlist.
//!
//! Uses the OTel Meter API with the globally-registered `MeterProvider`.
//! All instruments are created lazily from the `"waitlist"` meter.

use opentelemetry::metrics::{Counter, Histogram, Meter};

/// Returns the shared meter for waitlist instruments.
fn meter() -> Meter {
    opentelemetry::global::meter("waitlist")
}

/// Counter: parties added to the waitlist.
pub fn customers_registered() -> Counter<u64> {
    meter()
        .u64_counter("waitlist.customers.registered")
        .with_description("Number of parties registered")
        .build()
}

/// Counter: registrations rejected by validation.
/// Labels: `reason`.
pub fn registrations_rejected() -> Counter<u64> {
    meter()
        .u64_counter("waitlist.registrations.rejected")
        .with_description("Number of rejected registrations")
        .build()
}

/// Counter: customer state transitions.
/// Labels: `from`, `to`.
pub fn state_transitions() -> Counter<u64> {
    meter()
        .u64_counter("waitlist.state_transitions")
        .with_description("Number of customer state transitions")
        .build()
}

/// Counter: outbound messages.
/// Labels: `kind` ("table_ready" | "call"), `result` ("ok" | "error").
pub fn messages_sent() -> Counter<u64> {
    meter()
        .u64_counter("waitlist.messages.sent")
        .with_description("Number of outbound messages attempted")
        .build()
}

/// Histogram: minutes waited before being seated.
pub fn wait_minutes() -> Histogram<f64> {
    meter()
        .f64_histogram("waitlist.wait_minutes")
        .with_description("Minutes from arrival to seating")
        .with_unit("min")
        .build()
}

/// Histogram: minutes spent at the table.
pub fn seated_minutes() -> Histogram<f64> {
    meter()
        .f64_histogram("waitlist.seated_minutes")
        .with_description("Minutes from seating to finishing")
        .with_unit("min")
        .build()
}
