//! Domain types and validators for Zapbox configuration.
//!
//! Pure functions only; no I/O and no async. Loading the
//! file and the environment lives in `crate::infra::config`.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::dns;
use crate::domain::error::ProvisionError;
use crate::domain::instance::ImageFilter;
use crate::domain::retry::RetryPolicy;

// ── Defaults ─────────────────────────────────────────────────────────────────

pub const DEFAULT_DISPLAY_NAME: &str = "zapbox";
pub const DEFAULT_SHAPE: &str = "VM.Standard.E4.Flex";
pub const DEFAULT_OCPUS: f32 = 1.0;
pub const DEFAULT_MEMORY_GB: f32 = 8.0;
pub const DEFAULT_IMAGE_OS: &str = "Canonical Ubuntu";
pub const DEFAULT_IMAGE_OS_VERSION: &str = "24.04";
pub const DEFAULT_SSH_USER: &str = "ubuntu";
pub const DEFAULT_SCRIPT: &str = "server-setup.sh";
pub const DEFAULT_REMOTE_SCRIPT: &str = "/home/ubuntu/server-setup.sh";
pub const DEFAULT_VALIDATE_COMMAND: &str = "docker --version";
pub const DEFAULT_VALIDATE_MARKER: &str = "Docker version";
pub const DEFAULT_DNS_TTL: u32 = 1;
pub const DEFAULT_GRACE: Duration = Duration::from_secs(15);

pub const DEFAULT_LIFECYCLE_RETRY: RetryPolicy = RetryPolicy::new(30, Duration::from_secs(15));
pub const DEFAULT_ADDRESS_RETRY: RetryPolicy = RetryPolicy::new(20, Duration::from_secs(5));
pub const DEFAULT_CONNECTIVITY_RETRY: RetryPolicy = RetryPolicy::new(60, Duration::from_secs(5));
pub const DEFAULT_VALIDATION_RETRY: RetryPolicy = RetryPolicy::new(12, Duration::from_secs(10));

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_KEEPALIVE: Duration = Duration::from_secs(15);
const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(45 * 60);

// ── Raw (unvalidated) schema ─────────────────────────────────────────────────

/// Configuration as read from `~/.zapbox/config.yaml` and `ZAPBOX_*`
/// environment variables. Every field is optional; `validate_*` turns it into
/// the typed configs below.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct RawConfig {
    pub compartment_id: Option<String>,
    pub region: Option<String>,
    pub oci_profile: Option<String>,
    pub subnet_id: Option<String>,

    pub image_id: Option<String>,
    pub image_os: Option<String>,
    pub image_os_version: Option<String>,
    pub image_build_tag: Option<String>,

    pub display_name: Option<String>,
    pub shape: Option<String>,
    pub ocpus: Option<f32>,
    pub memory_gb: Option<f32>,

    pub ssh_user: Option<String>,
    pub ssh_public_key: Option<PathBuf>,
    pub ssh_identity: Option<PathBuf>,
    pub strict_host_key_checking: Option<bool>,
    pub connect_timeout_secs: Option<u64>,
    pub keepalive_secs: Option<u64>,
    pub command_timeout_secs: Option<u64>,

    pub script: Option<PathBuf>,
    pub remote_script_path: Option<String>,
    pub second_reboot: Option<bool>,
    pub validate_command: Option<String>,
    pub validate_marker: Option<String>,
    pub grace_secs: Option<u64>,

    pub dns_domain: Option<String>,
    pub dns_ttl: Option<u32>,
    pub dns_proxied: Option<bool>,
    pub cloudflare_zone_id: Option<String>,
    pub cloudflare_api_token: Option<String>,

    /// Retry policies; file only.
    pub retry: RetryConfig,
}

/// Per-loop retry policies.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RetryConfig {
    pub lifecycle: RetryPolicy,
    pub address: RetryPolicy,
    pub connectivity: RetryPolicy,
    pub validation: RetryPolicy,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            lifecycle: DEFAULT_LIFECYCLE_RETRY,
            address: DEFAULT_ADDRESS_RETRY,
            connectivity: DEFAULT_CONNECTIVITY_RETRY,
            validation: DEFAULT_VALIDATION_RETRY,
        }
    }
}

macro_rules! overlay {
    ($base:expr, $top:expr, $($field:ident),* $(,)?) => {
        $( if $top.$field.is_some() { $base.$field = $top.$field; } )*
    };
}

impl RawConfig {
    /// Overlay every field set in `top` onto `self`.
    #[must_use]
    pub fn overlay(mut self, top: RawConfig) -> Self {
        overlay!(
            self, top, compartment_id, region, oci_profile, subnet_id, image_id, image_os,
            image_os_version, image_build_tag, display_name, shape, ocpus, memory_gb, ssh_user,
            ssh_public_key, ssh_identity, strict_host_key_checking, connect_timeout_secs,
            keepalive_secs, command_timeout_secs, script, remote_script_path, second_reboot,
            validate_command, validate_marker, grace_secs, dns_domain, dns_ttl, dns_proxied,
            cloudflare_zone_id, cloudflare_api_token,
        );
        if top.retry != RetryConfig::default() {
            self.retry = top.retry;
        }
        self
    }
}

// ── Validated configs ────────────────────────────────────────────────────────

/// Which boot image to launch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSelection {
    /// A fixed image identifier.
    Id(String),
    /// The first catalog image matching the filter.
    Lookup(ImageFilter),
}

/// Provider-side settings.
#[derive(Debug, Clone, PartialEq)]
pub struct CloudConfig {
    pub compartment_id: String,
    pub region: Option<String>,
    pub profile: Option<String>,
    pub subnet_id: String,
    pub image: ImageSelection,
    pub display_name: String,
    pub shape: String,
    pub ocpus: f32,
    pub memory_gb: f32,
}

/// Remote shell connection settings (everything but the host).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SshConfig {
    pub user: String,
    pub public_key_path: PathBuf,
    pub identity: Option<PathBuf>,
    pub strict_host_key_checking: bool,
    pub connect_timeout: Duration,
    pub keepalive: Duration,
    pub command_timeout: Duration,
}

/// Bootstrap sequencer settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapConfig {
    pub script_path: PathBuf,
    pub remote_script_path: String,
    pub second_reboot: bool,
    pub validate_command: String,
    pub validate_marker: String,
    pub connectivity: RetryPolicy,
    pub validation: RetryPolicy,
}

/// Name publishing settings; absent when publishing is disabled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnsConfig {
    pub zone_id: String,
    pub api_token: String,
    pub record_name: String,
    pub ttl: u32,
    pub proxied: bool,
}

/// Fully validated configuration for `zapbox provision`.
#[derive(Debug, Clone, PartialEq)]
pub struct ProvisionConfig {
    pub cloud: CloudConfig,
    pub ssh: SshConfig,
    pub bootstrap: BootstrapConfig,
    pub dns: Option<DnsConfig>,
    pub lifecycle: RetryPolicy,
    pub address: RetryPolicy,
    pub grace: Duration,
}

const HINT_FILE: &str = "Set it in ~/.zapbox/config.yaml or via the matching ZAPBOX_* variable.";

fn required(value: Option<&String>, field: &str) -> Result<String, ProvisionError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ProvisionError::missing(field, HINT_FILE))
}

fn or_default(value: Option<&String>, default: &str) -> String {
    value
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .unwrap_or(default)
        .to_string()
}

impl RawConfig {
    /// Only the compartment is needed to browse the image catalog.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationMissing` if `compartment_id` is not set.
    pub fn image_filter(&self) -> Result<ImageFilter, ProvisionError> {
        Ok(ImageFilter {
            compartment_id: required(self.compartment_id.as_ref(), "compartment_id")?,
            operating_system: or_default(self.image_os.as_ref(), DEFAULT_IMAGE_OS),
            operating_system_version: or_default(
                self.image_os_version.as_ref(),
                DEFAULT_IMAGE_OS_VERSION,
            ),
            build_tag: self.image_build_tag.clone().filter(|t| !t.trim().is_empty()),
        })
    }

    /// # Errors
    ///
    /// Returns `ConfigurationMissing` for the first missing required field.
    pub fn validate_cloud(&self) -> Result<CloudConfig, ProvisionError> {
        let filter = self.image_filter()?;
        let subnet_id = required(self.subnet_id.as_ref(), "subnet_id")?;
        let image = match self.image_id.as_ref().filter(|id| !id.trim().is_empty()) {
            Some(id) => ImageSelection::Id(id.trim().to_string()),
            None => ImageSelection::Lookup(filter.clone()),
        };
        Ok(CloudConfig {
            compartment_id: filter.compartment_id,
            region: self.region.clone(),
            profile: self.oci_profile.clone(),
            subnet_id,
            image,
            display_name: or_default(self.display_name.as_ref(), DEFAULT_DISPLAY_NAME),
            shape: or_default(self.shape.as_ref(), DEFAULT_SHAPE),
            ocpus: self.ocpus.unwrap_or(DEFAULT_OCPUS),
            memory_gb: self.memory_gb.unwrap_or(DEFAULT_MEMORY_GB),
        })
    }

    /// `home` is used to default the public key to `~/.ssh/id_ed25519.pub`.
    #[must_use]
    pub fn validate_ssh(&self, home: Option<&std::path::Path>) -> SshConfig {
        let public_key_path = self.ssh_public_key.clone().unwrap_or_else(|| {
            home.map_or_else(
                || PathBuf::from(".ssh/id_ed25519.pub"),
                |h| h.join(".ssh").join("id_ed25519.pub"),
            )
        });
        SshConfig {
            user: or_default(self.ssh_user.as_ref(), DEFAULT_SSH_USER),
            public_key_path,
            identity: self.ssh_identity.clone(),
            strict_host_key_checking: self.strict_host_key_checking.unwrap_or(false),
            connect_timeout: self
                .connect_timeout_secs
                .map_or(DEFAULT_CONNECT_TIMEOUT, Duration::from_secs),
            keepalive: self
                .keepalive_secs
                .map_or(DEFAULT_KEEPALIVE, Duration::from_secs),
            command_timeout: self
                .command_timeout_secs
                .map_or(DEFAULT_COMMAND_TIMEOUT, Duration::from_secs),
        }
    }

    #[must_use]
    pub fn validate_bootstrap(&self) -> BootstrapConfig {
        BootstrapConfig {
            script_path: self
                .script
                .clone()
                .unwrap_or_else(|| PathBuf::from(DEFAULT_SCRIPT)),
            remote_script_path: or_default(
                self.remote_script_path.as_ref(),
                DEFAULT_REMOTE_SCRIPT,
            ),
            second_reboot: self.second_reboot.unwrap_or(true),
            validate_command: or_default(self.validate_command.as_ref(), DEFAULT_VALIDATE_COMMAND),
            validate_marker: or_default(self.validate_marker.as_ref(), DEFAULT_VALIDATE_MARKER),
            connectivity: self.retry.connectivity,
            validation: self.retry.validation,
        }
    }

    /// Publishing is enabled when `dns_domain` is set.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationMissing` if a domain is set but the Cloudflare
    /// zone or token is not, or if the record name is not a valid hostname.
    pub fn validate_dns(&self, display_name: &str) -> Result<Option<DnsConfig>, ProvisionError> {
        let Some(domain) = self.dns_domain.as_ref().filter(|d| !d.trim().is_empty()) else {
            return Ok(None);
        };
        let zone_id = required(self.cloudflare_zone_id.as_ref(), "cloudflare_zone_id")?;
        let api_token = self
            .cloudflare_api_token
            .as_ref()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                ProvisionError::missing(
                    "cloudflare_api_token",
                    "Set ZAPBOX_CLOUDFLARE_API_TOKEN or CLOUDFLARE_API_TOKEN, or pass --skip-dns.",
                )
            })?;
        let record_name = dns::record_name(display_name, domain)
            .map_err(|e| ProvisionError::missing("dns_domain", &e.to_string()))?;
        Ok(Some(DnsConfig {
            zone_id,
            api_token,
            record_name,
            ttl: self.dns_ttl.unwrap_or(DEFAULT_DNS_TTL),
            proxied: self.dns_proxied.unwrap_or(true),
        }))
    }

    /// Validate everything `zapbox provision` needs.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationMissing` for the first missing required field.
    pub fn validate_provision(
        &self,
        home: Option<&std::path::Path>,
        skip_dns: bool,
    ) -> Result<ProvisionConfig, ProvisionError> {
        let cloud = self.validate_cloud()?;
        let dns = if skip_dns {
            None
        } else {
            self.validate_dns(&cloud.display_name)?
        };
        Ok(ProvisionConfig {
            ssh: self.validate_ssh(home),
            bootstrap: self.validate_bootstrap(),
            dns,
            lifecycle: self.retry.lifecycle,
            address: self.retry.address,
            grace: self.grace_secs.map_or(DEFAULT_GRACE, Duration::from_secs),
            cloud,
        })
    }
}

/// Local files the run depends on, read once before any network call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalInputs {
    /// OpenSSH public key authorised on the instance.
    pub public_key: String,
    /// Provisioning script uploaded to the host.
    pub script: PathBuf,
    /// Hex SHA-256 of the script, for the report.
    pub script_sha256: String,
}

// ── Unit tests ───────────────────────────────────────────────────────────────
