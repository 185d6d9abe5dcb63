//! Sample routing use case
//!
//! Picks the destination bucket from a validation result, performs exactly one
//! upload, and (for rejected samples) sends one alert. The alert goes out
//! whether or not the upload succeeded, so a rejected sample always reaches a
//! human. Upload failures are returned to the caller together with the alert
//! status; alert failures are only logged.

use std::path::Path;
use std::sync::Arc;

use tracing::{info, warn};

use crate::domain::{Buckets, Destination, IntakeError, ValidationResult};
use crate::ports::notification::Alert;
use crate::ports::{INotificationGateway, IObjectStore, StoredObject};

/// Who gets rejection alerts and how they are titled
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotifySettings {
    /// Recipient address
    pub recipient: String,
    /// Subject line
    pub subject: String,
}

/// What happened to the rejection alert for a routed file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlertStatus {
    /// The file was accepted; no alert applies
    NotNeeded,
    /// Alerts are switched off in configuration
    Disabled,
    /// The alert was handed to the gateway
    Sent,
    /// The gateway failed; routing still succeeded
    Failed(IntakeError),
}

/// Result of a successful routing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutedSample {
    /// Where the file went
    pub destination: Destination,
    /// What the store confirmed writing
    pub object: StoredObject,
    /// Outcome of the rejection alert
    pub alert: AlertStatus,
}

/// A routing attempt whose upload failed
///
/// The staged copy must be kept. `alert` still reports the rejection alert,
/// which is attempted even though the upload failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingFailure {
    /// Where the file should have gone
    pub destination: Destination,
    /// The classified upload failure
    pub error: IntakeError,
    /// Outcome of the rejection alert
    pub alert: AlertStatus,
}

/// Use case for routing one staged sample to its sink
pub struct SampleRouter {
    object_store: Arc<dyn IObjectStore>,
    notifier: Option<Arc<dyn INotificationGateway>>,
    buckets: Buckets,
    notify: NotifySettings,
}

impl SampleRouter {
    /// Creates a router
    ///
    /// # Arguments
    ///
    /// * `object_store` - Sink receiving uploads
    /// * `notifier` - Alert gateway; `None` disables rejection alerts
    /// * `buckets` - Bucket binding for each destination
    /// * `notify` - Recipient and subject of rejection alerts
    pub fn new(
        object_store: Arc<dyn IObjectStore>,
        notifier: Option<Arc<dyn INotificationGateway>>,
        buckets: Buckets,
        notify: NotifySettings,
    ) -> Self {
        Self {
            object_store,
            notifier,
            buckets,
            notify,
        }
    }

    /// Bucket binding used by this router
    pub fn buckets(&self) -> &Buckets {
        &self.buckets
    }

    /// Address rejection alerts go to
    pub fn recipient(&self) -> &str {
        &self.notify.recipient
    }

    /// Routes a staged file according to its validation result
    ///
    /// The object key is `key` (the original file name). For a rejected
    /// sample the alert names `staged_path` and the validation reason, and
    /// is sent after the upload attempt regardless of its result.
    ///
    /// # Errors
    ///
    /// Returns a [`RoutingFailure`] carrying [`IntakeError::Upload`] if the
    /// single upload attempt fails.
    pub async fn route(
        &self,
        staged_path: &Path,
        key: &str,
        result: &ValidationResult,
    ) -> Result<RoutedSample, RoutingFailure> {
        let destination = Destination::for_result(result);
        let bucket = self.buckets.for_destination(destination);

        let upload = self
            .object_store
            .put_object(staged_path, bucket, key)
            .await;

        if let Ok(object) = &upload {
            info!(
                path = %staged_path.display(),
                bucket = %bucket,
                key = %key,
                size = object.size,
                destination = %destination,
                "Uploaded sample"
            );
        }

        let alert = match destination {
            Destination::Accepted => AlertStatus::NotNeeded,
            Destination::Rejected => self.alert(staged_path, result.reason()).await,
        };

        match upload {
            Ok(object) => Ok(RoutedSample {
                destination,
                object,
                alert,
            }),
            Err(source) => Err(RoutingFailure {
                destination,
                error: IntakeError::Upload {
                    bucket: bucket.to_string(),
                    key: key.to_string(),
                    source,
                },
                alert,
            }),
        }
    }

    async fn alert(&self, staged_path: &Path, reason: &str) -> AlertStatus {
        let Some(notifier) = &self.notifier else {
            return AlertStatus::Disabled;
        };

        let alert = Alert::invalid_sample(
            self.notify.recipient.as_str(),
            self.notify.subject.as_str(),
            &staged_path.display().to_string(),
            reason,
        );

        match notifier
            .send_alert(&alert.recipient, &alert.subject, &alert.body)
            .await
        {
            Ok(()) => {
                info!(
                    path = %staged_path.display(),
                    recipient = %alert.recipient,
                    "Rejection alert sent"
                );
                AlertStatus::Sent
            }
            Err(e) => {
                warn!(
                    path = %staged_path.display(),
                    error = %e,
                    "Failed to send rejection alert"
                );
                AlertStatus::Failed(IntakeError::Notification(format!("{e:#}")))
            }
        }
    }
}
