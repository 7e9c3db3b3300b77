//! # waitlist
//!
//! Walk-in waitlist for a single-location service queue.
//!
//! The [`engine::Engine`] owns every customer record and enforces the
//! lifecycle `Waiting -> Seated -> Finished` / `Waiting -> Canceled`.
//! [`service::Waitlist`] puts it behind an operator session and wires in
//! SMS notifications. Records persist in memory or SQLite, and the full
//! history exports as CSV.

pub mod board;
pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod event;
pub mod export;
pub mod model;
pub mod notify;
pub mod service;
pub mod session;
pub mod storage;
pub mod telemetry;
