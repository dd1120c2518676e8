//! Configuration loading: `~/.zapbox/config.yaml` overlaid with `ZAPBOX_*`
//! environment variables, plus the local files a run depends on.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};

use crate::domain::config::{BootstrapConfig, SshConfig};
use crate::domain::{LocalInputs, ProvisionError, RawConfig};

/// Prefix of every environment override.
pub const ENV_PREFIX: &str = "ZAPBOX_";

/// Variable that points at an alternate config file.
pub const CONFIG_ENV: &str = "ZAPBOX_CONFIG";

/// Conventional Cloudflare variable, used when no `ZAPBOX_` token is set.
pub const CLOUDFLARE_TOKEN_ENV: &str = "CLOUDFLARE_API_TOKEN";

/// Loads `RawConfig` from a YAML file and an environment snapshot.
///
/// The environment is passed in rather than read globally so callers and
/// tests decide exactly which variables are visible.
pub struct YamlConfigLoader {
    explicit: Option<PathBuf>,
    vars: Vec<(String, String)>,
}

impl YamlConfigLoader {
    /// Loader over the process environment.
    #[must_use]
    pub fn from_env(explicit: Option<PathBuf>) -> Self {
        Self::with_vars(explicit, std::env::vars())
    }

    pub fn with_vars(
        explicit: Option<PathBuf>,
        vars: impl IntoIterator<Item = (String, String)>,
    ) -> Self {
        Self {
            explicit,
            vars: vars.into_iter().collect(),
        }
    }

    fn var(&self, key: &str) -> Option<&str> {
        self.vars
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .filter(|v| !v.is_empty())
    }

    /// Resolve the config file: `--config`, then `ZAPBOX_CONFIG`, then
    /// `~/.zapbox/config.yaml`.
    ///
    /// # Errors
    ///
    /// Returns an error if no explicit path is given and the home directory
    /// cannot be determined.
    pub fn path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.explicit {
            return Ok(path.clone());
        }
        if let Some(val) = self.var(CONFIG_ENV) {
            return Ok(PathBuf::from(val));
        }
        let home =
            dirs::home_dir().ok_or_else(|| anyhow::anyhow!("cannot determine home directory"))?;
        Ok(home.join(".zapbox").join("config.yaml"))
    }

    /// Load the file (absent means empty) and overlay the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed, or
    /// if an environment override has the wrong type.
    pub fn load(&self) -> Result<RawConfig> {
        let path = self.path()?;
        let file = if path.exists() {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("cannot read {}", path.display()))?;
            if content.trim().is_empty() {
                RawConfig::default()
            } else {
                serde_yaml::from_str(&content)
                    .with_context(|| format!("cannot parse {}", path.display()))?
            }
        } else {
            tracing::debug!(path = %path.display(), "no config file, using environment only");
            RawConfig::default()
        };

        let env: RawConfig = envy::prefixed(ENV_PREFIX)
            .from_iter(self.vars.iter().cloned())
            .context("invalid ZAPBOX_* environment override")?;

        let mut merged = file.overlay(env);
        if merged.cloudflare_api_token.is_none() {
            merged.cloudflare_api_token = self.var(CLOUDFLARE_TOKEN_ENV).map(String::from);
        }
        Ok(merged)
    }
}

/// Read the public key and fingerprint the script before any network call.
///
/// # Errors
///
/// Returns `ConfigurationMissing` if either file is absent or the key is
/// empty, or an I/O error if a present file cannot be read.
pub fn load_local_inputs(ssh: &SshConfig, bootstrap: &BootstrapConfig) -> Result<LocalInputs> {
    let public_key = read_public_key(&ssh.public_key_path)?;
    let script_sha256 = fingerprint_script(&bootstrap.script_path)?;
    Ok(LocalInputs {
        public_key,
        script: bootstrap.script_path.clone(),
        script_sha256,
    })
}

/// Hex SHA-256 of the provisioning script.
///
/// # Errors
///
/// Returns `ConfigurationMissing` if the script does not exist, or an I/O
/// error if it cannot be read.
pub fn fingerprint_script(script: &Path) -> Result<String> {
    if !script.is_file() {
        return Err(ProvisionError::missing(
            "script",
            &format!(
                "Provisioning script {} not found. Pass --script or set `script` in the config.",
                script.display()
            ),
        )
        .into());
    }
    let bytes =
        std::fs::read(script).with_context(|| format!("cannot read {}", script.display()))?;
    let digest = format!("{:x}", Sha256::digest(&bytes));
    tracing::debug!(script = %script.display(), sha256 = %digest, "script fingerprinted");
    Ok(digest)
}

fn read_public_key(path: &Path) -> Result<String> {
    let missing = || {
        ProvisionError::missing(
            "ssh_public_key",
            &format!(
                "Public key {} not found or empty. Set `ssh_public_key` in the config.",
                path.display()
            ),
        )
    };
    if !path.is_file() {
        return Err(missing().into());
    }
    let key = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read {}", path.display()))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(missing().into());
    }
    Ok(key.to_string())
}
