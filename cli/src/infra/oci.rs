//! Oracle Cloud adapter: routes every provider call through the `oci` CLI.
//!
//! Generic over `R: CommandRunner` so that tests can inject a mock runner
//! without spawning real processes. The CLI prints `{"data": ...}` with
//! kebab-case keys; list commands print nothing at all when empty.

use anyhow::{Context, Result};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::application::ports::{CommandRunner, ComputeApi, IdentityApi, ImageCatalog};
use crate::domain::config::CloudConfig;
use crate::domain::{
    ImageFilter, ImageSummary, InstanceRecord, InstanceSpec, LifecycleState, Vnic, VnicAttachment,
};

const OCI: &str = "oci";

#[derive(Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Deserialize)]
#[serde(rename_all = "kebab-case")]
struct InstanceDto {
    id: String,
    lifecycle_state: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "kebab-case")]
struct VnicAttachmentDto {
    id: String,
    vnic_id: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "kebab-case")]
struct VnicDto {
    id: String,
    public_ip: Option<String>,
}

#[derive(Deserialize)]
struct AvailabilityDomainDto {
    name: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "kebab-case")]
struct ImageDto {
    id: String,
    display_name: String,
    operating_system: String,
    operating_system_version: String,
}

impl From<InstanceDto> for InstanceRecord {
    fn from(dto: InstanceDto) -> Self {
        Self {
            id: dto.id,
            state: LifecycleState::from_provider(&dto.lifecycle_state),
            public_ip: None,
        }
    }
}

/// `oci` CLI client scoped to one compartment.
pub struct OciCli<R: CommandRunner> {
    runner: R,
    compartment_id: String,
    profile: Option<String>,
    region: Option<String>,
}

impl<R: CommandRunner> OciCli<R> {
    pub fn new(runner: R, compartment_id: &str) -> Self {
        Self {
            runner,
            compartment_id: compartment_id.to_string(),
            profile: None,
            region: None,
        }
    }

    /// Client using the profile and region from `cloud`.
    pub fn for_cloud(runner: R, cloud: &CloudConfig) -> Self {
        Self::new(runner, &cloud.compartment_id)
            .with_profile(cloud.profile.clone())
            .with_region(cloud.region.clone())
    }

    #[must_use]
    pub fn with_profile(mut self, profile: Option<String>) -> Self {
        self.profile = profile;
        self
    }

    #[must_use]
    pub fn with_region(mut self, region: Option<String>) -> Self {
        self.region = region;
        self
    }

    /// Run `oci <args> --output json` and return stdout.
    async fn call(&self, args: &[&str]) -> Result<String> {
        let mut full: Vec<&str> = args.to_vec();
        if let Some(profile) = &self.profile {
            full.extend(["--profile", profile.as_str()]);
        }
        if let Some(region) = &self.region {
            full.extend(["--region", region.as_str()]);
        }
        full.extend(["--output", "json"]);

        let operation = args.iter().take(3).copied().collect::<Vec<_>>().join(" ");
        let output = self
            .runner
            .run(OCI, &full)
            .await
            .with_context(|| format!("failed to run oci {operation}"))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("oci {operation} failed: {}", stderr.trim());
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    async fn data<T: DeserializeOwned>(&self, args: &[&str]) -> Result<T> {
        let stdout = self.call(args).await?;
        let envelope: Envelope<T> = serde_json::from_str(&stdout)
            .with_context(|| format!("unexpected output from oci {}", args.join(" ")))?;
        Ok(envelope.data)
    }

    /// Like `data`, but an empty stdout means an empty list.
    async fn list<T: DeserializeOwned>(&self, args: &[&str]) -> Result<Vec<T>> {
        let stdout = self.call(args).await?;
        if stdout.trim().is_empty() {
            return Ok(Vec::new());
        }
        let envelope: Envelope<Vec<T>> = serde_json::from_str(&stdout)
            .with_context(|| format!("unexpected output from oci {}", args.join(" ")))?;
        Ok(envelope.data)
    }
}

impl<R: CommandRunner> ComputeApi for OciCli<R> {
    async fn launch_instance(&self, spec: &InstanceSpec) -> Result<InstanceRecord> {
        let shape_config = serde_json::json!({
            "ocpus": spec.ocpus,
            "memoryInGBs": spec.memory_gb,
        })
        .to_string();
        let metadata = serde_json::json!({
            "ssh_authorized_keys": spec.ssh_authorized_keys,
        })
        .to_string();
        let dto: InstanceDto = self
            .data(&[
                "compute",
                "instance",
                "launch",
                "--compartment-id",
                &spec.compartment_id,
                "--availability-domain",
                &spec.availability_domain,
                "--display-name",
                &spec.display_name,
                "--image-id",
                &spec.image_id,
                "--shape",
                &spec.shape,
                "--shape-config",
                &shape_config,
                "--subnet-id",
                &spec.subnet_id,
                "--assign-public-ip",
                "true",
                "--metadata",
                &metadata,
            ])
            .await?;
        tracing::info!(instance_id = %dto.id, state = %dto.lifecycle_state, "instance launched");
        Ok(dto.into())
    }

    async fn get_instance(&self, instance_id: &str) -> Result<InstanceRecord> {
        let dto: InstanceDto = self
            .data(&["compute", "instance", "get", "--instance-id", instance_id])
            .await?;
        Ok(dto.into())
    }

    async fn list_vnic_attachments(&self, instance_id: &str) -> Result<Vec<VnicAttachment>> {
        let dtos: Vec<VnicAttachmentDto> = self
            .list(&[
                "compute",
                "vnic-attachment",
                "list",
                "--compartment-id",
                &self.compartment_id,
                "--instance-id",
                instance_id,
            ])
            .await?;
        Ok(dtos
            .into_iter()
            .map(|d| VnicAttachment {
                id: d.id,
                vnic_id: d.vnic_id.filter(|v| !v.is_empty()),
            })
            .collect())
    }

    async fn get_vnic(&self, vnic_id: &str) -> Result<Vnic> {
        let dto: VnicDto = self
            .data(&["network", "vnic", "get", "--vnic-id", vnic_id])
            .await?;
        Ok(Vnic {
            id: dto.id,
            public_ip: dto.public_ip,
        })
    }
}

impl<R: CommandRunner> IdentityApi for OciCli<R> {
    async fn list_availability_domains(&self, compartment_id: &str) -> Result<Vec<String>> {
        let dtos: Vec<AvailabilityDomainDto> = self
            .list(&[
                "iam",
                "availability-domain",
                "list",
                "--compartment-id",
                compartment_id,
            ])
            .await?;
        Ok(dtos.into_iter().map(|d| d.name).collect())
    }
}

impl<R: CommandRunner> ImageCatalog for OciCli<R> {
    async fn list_images(&self, filter: &ImageFilter) -> Result<Vec<ImageSummary>> {
        let dtos: Vec<ImageDto> = self
            .list(&[
                "compute",
                "image",
                "list",
                "--compartment-id",
                &filter.compartment_id,
                "--operating-system",
                &filter.operating_system,
                "--operating-system-version",
                &filter.operating_system_version,
                "--sort-by",
                "TIMECREATED",
                "--sort-order",
                "DESC",
                "--all",
            ])
            .await?;
        Ok(dtos
            .into_iter()
            .map(|d| ImageSummary {
                id: d.id,
                display_name: d.display_name,
                operating_system: d.operating_system,
                operating_system_version: d.operating_system_version,
            })
            .collect())
    }
}
