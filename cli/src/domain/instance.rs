//! Compute instance domain types.
//!
//! Pure data and parsing only. The provider adapters fill these in.

use serde::Serialize;

/// Lifecycle phase of a compute instance, collapsed from the provider's
/// larger state set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LifecycleState {
    Provisioning,
    Running,
    Terminating,
    Terminated,
    Failed,
}

impl LifecycleState {
    /// Collapse a provider lifecycle string into a `LifecycleState`.
    ///
    /// Transitional states that still lead towards a running instance map to
    /// `Provisioning`. Anything unknown, stopped or stopping maps to `Failed`:
    /// none of those will turn into `Running` without operator action.
    #[must_use]
    pub fn from_provider(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "PROVISIONING" | "STARTING" | "CREATING_IMAGE" | "MOVING" => Self::Provisioning,
            "RUNNING" => Self::Running,
            "TERMINATING" => Self::Terminating,
            "TERMINATED" => Self::Terminated,
            _ => Self::Failed,
        }
    }
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Provisioning => "PROVISIONING",
            Self::Running => "RUNNING",
            Self::Terminating => "TERMINATING",
            Self::Terminated => "TERMINATED",
            Self::Failed => "FAILED",
        })
    }
}

/// Launch parameters for a new instance. Immutable once submitted.
#[derive(Debug, Clone, PartialEq)]
pub struct InstanceSpec {
    /// Compartment (tenancy) the instance is created in.
    pub compartment_id: String,
    /// Human-readable instance name.
    pub display_name: String,
    /// Boot image identifier.
    pub image_id: String,
    /// Shape name, e.g. `VM.Standard.E4.Flex`.
    pub shape: String,
    /// OCPUs for flexible shapes.
    pub ocpus: f32,
    /// Memory in GB for flexible shapes.
    pub memory_gb: f32,
    /// Availability domain the instance is placed in.
    pub availability_domain: String,
    /// Subnet the primary VNIC is attached to.
    pub subnet_id: String,
    /// OpenSSH public key authorised for the login user.
    pub ssh_authorized_keys: String,
}

/// Read-only snapshot of a provider instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceRecord {
    pub id: String,
    pub state: LifecycleState,
    pub public_ip: Option<String>,
}

/// Association between an instance and a VNIC.
///
/// `vnic_id` stays empty until the provider finishes attaching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VnicAttachment {
    pub id: String,
    pub vnic_id: Option<String>,
}

/// Virtual network interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vnic {
    pub id: String,
    pub public_ip: Option<String>,
}

/// Catalog image listing entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageSummary {
    pub id: String,
    pub display_name: String,
    pub operating_system: String,
    pub operating_system_version: String,
}

/// Filter applied to the image catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageFilter {
    pub compartment_id: String,
    pub operating_system: String,
    pub operating_system_version: String,
    /// Substring that must appear in the display name (e.g. a build date).
    pub build_tag: Option<String>,
}

impl ImageFilter {
    /// Returns `true` when `image` satisfies the build-tag part of the filter.
    ///
    /// Operating system and version are filtered server-side.
    #[must_use]
    pub fn matches(&self, image: &ImageSummary) -> bool {
        self.build_tag
            .as_deref()
            .is_none_or(|tag| image.display_name.contains(tag))
    }
}
