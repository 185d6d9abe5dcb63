//! LabIntake Core - Domain logic and business rules
//!
//! This crate contains the hexagonal architecture core with:
//! - **Domain entities** - `SampleFile`, `ValidationResult`, `Destination`, `FileOutcome`, `AuditEntry`
//! - **Validation** - the required-field rule that decides accept/reject
//! - **Use cases** - `SampleRouter` (destination choice, upload, rejection alert)
//! - **Port definitions** - Traits for adapters: `IObjectStore`, `INotificationGateway`,
//!   `ICredentialProvider`, `ISampleFileSystem`, `IStabilityStrategy`, `IAuditSink`
//!
//! # Architecture
//!
//! This crate follows the hexagonal (ports & adapters) architecture pattern.
//! The domain module contains pure business logic with no I/O.
//! Ports define trait interfaces that adapter crates implement.
//! Use cases orchestrate domain entities through port interfaces.

pub mod config;
pub mod domain;
pub mod ports;
pub mod usecases;
