//! Port definitions (hexagonal architecture interfaces)
//!
//! This module defines the port traits that form the boundaries of the
//! intake pipeline. The orchestrator and router depend only on these
//! traits; the implementations live in adapter crates.
//!
//! ## Ports Overview
//!
//! - [`IObjectStore`] - Upload of staged files to a storage bucket
//! - [`INotificationGateway`] - Delivery of rejection alerts
//! - [`ICredentialProvider`] - Non-interactive access-token acquisition
//! - [`ISampleFileSystem`] - Watched/staging directory operations
//! - [`IStabilityStrategy`] - "Has this file finished being written?"
//! - [`IAuditSink`] - Append-only persistence of audit entries

pub mod audit_sink;
pub mod credentials;
pub mod notification;
pub mod object_store;
pub mod sample_filesystem;
pub mod stability;

pub use audit_sink::IAuditSink;
pub use credentials::{AccessToken, ICredentialProvider};
pub use notification::{Alert, INotificationGateway};
pub use object_store::{IObjectStore, StoredObject, UploadError};
pub use sample_filesystem::ISampleFileSystem;
pub use stability::IStabilityStrategy;
