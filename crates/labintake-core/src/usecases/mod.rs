//! Use cases (interactors) for LabIntake
//!
//! Use cases are thin coordinators that delegate business rules to domain
//! functions and I/O to ports.
//!
//! ## Use Cases
//!
//! - [`SampleRouter`] - Upload a validated sample to its bucket and alert on rejection

pub mod route_sample;

pub use route_sample::{AlertStatus, NotifySettings, RoutedSample, RoutingFailure, SampleRouter};
