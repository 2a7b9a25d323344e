//! Hand-off of registered subjects to the master registry.
//!
//! Delivery failures never fail a governance operation. The application
//! stays `Registered` with `registry_synced = false` and is picked up by the
//! next reconciliation pass.

use crate::application::Application;
use curation_types::{MasterRegistry, RegistrationRecord, Timestamp};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Result of a reconciliation pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileReport {
    pub attempted: u32,
    pub delivered: u32,
    pub failed: u32,
}

pub struct RegistryBridge {
    registry: Arc<dyn MasterRegistry>,
}

impl RegistryBridge {
    pub fn new(registry: Arc<dyn MasterRegistry>) -> Self {
        Self { registry }
    }

    pub fn record(app: &Application, registered_at: Timestamp) -> RegistrationRecord {
        RegistrationRecord {
            subject: app.subject.clone(),
            kind: app.subject_kind,
            applicant: app.applicant.clone(),
            title: app.title.clone(),
            metadata_uri: app.metadata_uri.clone(),
            registered_at,
        }
    }

    /// Forward a registration. Returns whether the registry acknowledged it.
    pub fn on_registered(&self, app: &Application, registered_at: Timestamp) -> bool {
        match self.registry.register(&Self::record(app, registered_at)) {
            Ok(()) => {
                tracing::info!(
                    subject = %app.subject,
                    kind = %app.subject_kind,
                    "registration delivered to master registry"
                );
                true
            }
            Err(e) => {
                tracing::warn!(
                    subject = %app.subject,
                    kind = %app.subject_kind,
                    "master registry delivery failed, will retry on reconcile: {e}"
                );
                false
            }
        }
    }
}
