//! Run report accumulated by the provisioning driver.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::bootstrap::BootstrapOutcome;

/// Everything the operator needs to know about one run, success or not.
///
/// Written only by the single control flow; fields stay `None` for stages
/// the run never reached.
#[derive(Debug, Clone, Serialize)]
pub struct ProvisionReport {
    pub started_at: DateTime<Utc>,
    pub availability_domain: Option<String>,
    pub image_id: Option<String>,
    pub instance_id: Option<String>,
    pub public_ip: Option<String>,
    pub dns_name: Option<String>,
    pub script_sha256: Option<String>,
    pub bootstrap: BootstrapOutcome,
}

impl ProvisionReport {
    #[must_use]
    pub fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            availability_domain: None,
            image_id: None,
            instance_id: None,
            public_ip: None,
            dns_name: None,
            script_sha256: None,
            bootstrap: BootstrapOutcome::default(),
        }
    }
}
