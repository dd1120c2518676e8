//! `zapbox images`: list catalog images matching the configured filter.

use anyhow::Result;

use crate::app::AppContext;
use crate::application::services::provision::matching_images;
use crate::infra::oci::OciCli;

/// Run `zapbox images`.
///
/// Only `compartment_id` is required; the OS, version and build tag fall
/// back to their defaults.
///
/// # Errors
///
/// Returns `ConfigurationMissing` without a compartment, or the provider
/// error if the listing fails.
pub async fn run(app: &AppContext) -> Result<()> {
    let raw = app.load_config()?;
    let filter = raw.image_filter()?;
    let catalog = OciCli::new(app.runner(), &filter.compartment_id)
        .with_profile(raw.oci_profile.clone())
        .with_region(raw.region.clone());

    // Quiet in JSON mode, so this never reaches the document.
    app.output.header(&format!(
        "{} {} images{}:",
        filter.operating_system,
        filter.operating_system_version,
        filter
            .build_tag
            .as_deref()
            .map(|t| format!(" (build {t})"))
            .unwrap_or_default()
    ));
    let images = matching_images(&catalog, &filter).await?;
    app.renderer().render_images(&images)
}
