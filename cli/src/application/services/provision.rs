//! Provisioning driver: launch, wait, resolve, publish, bootstrap.
//!
//! Every step runs strictly after the previous one. Any unrecovered error
//! ends the run; resources created so far are left in place and listed in
//! the report so an operator can clean them up.

use anyhow::{Context, Result};

use crate::application::ports::{
    CloudProvider, ImageCatalog, NamePublisher, ProgressReporter, SessionFactory,
};
use crate::application::services::address::{Resolution, resolve_public_ip};
use crate::application::services::bootstrap::run_bootstrap;
use crate::application::services::lifecycle::wait_for_state;
use crate::domain::config::{BootstrapConfig, ImageSelection};
use crate::domain::{
    ImageFilter, ImageSummary, InstanceSpec, LifecycleState, LocalInputs, ProvisionConfig,
    ProvisionError, ProvisionReport, PublishedName,
};

/// Catalog images that pass `filter`, in provider order (newest first).
///
/// # Errors
///
/// Returns the provider error if the listing fails.
pub async fn matching_images(
    catalog: &impl ImageCatalog,
    filter: &ImageFilter,
) -> Result<Vec<ImageSummary>> {
    let images = catalog
        .list_images(filter)
        .await
        .context("listing images")?;
    Ok(images.into_iter().filter(|i| filter.matches(i)).collect())
}

async fn select_image(catalog: &impl ImageCatalog, selection: &ImageSelection) -> Result<String> {
    match selection {
        ImageSelection::Id(id) => Ok(id.clone()),
        ImageSelection::Lookup(filter) => {
            let image = matching_images(catalog, filter)
                .await?
                .into_iter()
                .next()
                .ok_or_else(|| {
                    ProvisionError::missing(
                        "image_id",
                        &format!(
                            "No {} {} image matched{}. Set image_id, or adjust image_os, \
                             image_os_version and image_build_tag (see `zapbox images`).",
                            filter.operating_system,
                            filter.operating_system_version,
                            filter
                                .build_tag
                                .as_deref()
                                .map(|t| format!(" build tag '{t}'"))
                                .unwrap_or_default()
                        ),
                    )
                })?;
            tracing::info!(image_id = %image.id, name = %image.display_name, "selected image");
            Ok(image.id)
        }
    }
}

/// Drive one full provisioning run.
///
/// `report` is filled as the run progresses and stays meaningful when an
/// error is returned.
///
/// # Errors
///
/// Returns the first unrecovered error. Typed failures are
/// `ProvisionError` variants; provider and transport errors pass through
/// with context attached.
#[allow(clippy::too_many_arguments)]
pub async fn provision(
    cloud: &impl CloudProvider,
    sessions: &impl SessionFactory,
    publisher: Option<&impl NamePublisher>,
    cfg: &ProvisionConfig,
    inputs: &LocalInputs,
    reporter: &impl ProgressReporter,
    report: &mut ProvisionReport,
) -> Result<()> {
    report.script_sha256 = Some(inputs.script_sha256.clone());

    reporter.step("resolving availability domain...");
    let domains = cloud
        .list_availability_domains(&cfg.cloud.compartment_id)
        .await
        .context("listing availability domains")?;
    let availability_domain = domains
        .into_iter()
        .next()
        .context("compartment has no availability domains")?;
    report.availability_domain = Some(availability_domain.clone());

    reporter.step("selecting image...");
    let image_id = select_image(cloud, &cfg.cloud.image).await?;
    report.image_id = Some(image_id.clone());

    reporter.step(&format!("launching {}...", cfg.cloud.display_name));
    let spec = InstanceSpec {
        compartment_id: cfg.cloud.compartment_id.clone(),
        display_name: cfg.cloud.display_name.clone(),
        image_id,
        shape: cfg.cloud.shape.clone(),
        ocpus: cfg.cloud.ocpus,
        memory_gb: cfg.cloud.memory_gb,
        availability_domain,
        subnet_id: cfg.cloud.subnet_id.clone(),
        ssh_authorized_keys: inputs.public_key.clone(),
    };
    let launched = cloud
        .launch_instance(&spec)
        .await
        .context("launching instance")?;
    report.instance_id = Some(launched.id.clone());
    reporter.success(&format!("launched {}", launched.id));

    reporter.step("waiting for the instance to run...");
    wait_for_state(cloud, &launched.id, LifecycleState::Running, cfg.lifecycle).await?;
    reporter.success("instance is running");

    reporter.step("resolving public address...");
    let ip = match resolve_public_ip(cloud, &launched.id, cfg.address).await? {
        Resolution::Found(ip) => ip,
        Resolution::NotFound {
            attempts, waited, ..
        } => {
            return Err(ProvisionError::AddressUnavailable {
                instance_id: launched.id,
                attempts,
                waited: waited.as_secs(),
            }
            .into());
        }
    };
    report.public_ip = Some(ip.clone());
    reporter.success(&format!("public address {ip}"));

    if let (Some(dns), Some(publisher)) = (cfg.dns.as_ref(), publisher) {
        reporter.step(&format!("publishing {}...", dns.record_name));
        let record = PublishedName {
            name: dns.record_name.clone(),
            address: ip.clone(),
            ttl: dns.ttl,
            proxied: dns.proxied,
        };
        publisher
            .create_record(&record)
            .await
            .with_context(|| format!("publishing {}", record.name))?;
        report.dns_name = Some(record.name);
        reporter.success(&format!("{} -> {ip}", dns.record_name));
    }

    if !cfg.grace.is_zero() {
        reporter.step(&format!(
            "letting the instance settle for {}s...",
            cfg.grace.as_secs()
        ));
        tokio::time::sleep(cfg.grace).await;
    }

    let bootstrap = BootstrapConfig {
        script_path: inputs.script.clone(),
        ..cfg.bootstrap.clone()
    };
    let session = sessions.open(&ip);
    run_bootstrap(&session, &bootstrap, reporter, &mut report.bootstrap).await?;
    Ok(())
}
