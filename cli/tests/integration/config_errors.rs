//! Configuration failures are reported before any provider call, with a
//! stable exit code.
//!
//! Every test runs with a cleared environment and a temporary `HOME`, so
//! neither the developer's config nor the `oci` and `ssh` binaries are
//! reachable.

#![allow(clippy::expect_used)]

use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

use crate::zapbox;

const CONFIGURATION_MISSING: i32 = 8;

fn isolated(home: &Path) -> Command {
    let mut cmd = zapbox();
    cmd.env_clear()
        .env("HOME", home)
        .env("NO_COLOR", "1")
        .current_dir(home);
    cmd
}

fn write_config(home: &Path, yaml: &str) -> std::path::PathBuf {
    let dir = home.join(".zapbox");
    std::fs::create_dir_all(&dir).expect("mkdir");
    let path = dir.join("config.yaml");
    std::fs::write(&path, yaml).expect("write config");
    path
}

fn write_public_key(home: &Path) {
    let dir = home.join(".ssh");
    std::fs::create_dir_all(&dir).expect("mkdir");
    std::fs::write(dir.join("id_ed25519.pub"), "ssh-ed25519 AAAAC3Nza test@host\n")
        .expect("write key");
}

#[test]
fn provision_without_config_exits_configuration_missing() {
    let home = TempDir::new().expect("tempdir");
    isolated(home.path())
        .args(["provision", "--yes"])
        .assert()
        .code(CONFIGURATION_MISSING)
        .stderr(predicate::str::contains("compartment_id"));
}

#[test]
fn provision_json_error_has_stable_shape() {
    let home = TempDir::new().expect("tempdir");
    let output = isolated(home.path())
        .args(["--json", "provision", "--yes"])
        .output()
        .expect("runs");
    assert_eq!(output.status.code(), Some(CONFIGURATION_MISSING));
    assert!(output.stdout.is_empty(), "nothing but the error is printed");
    let v: serde_json::Value = serde_json::from_slice(&output.stderr).expect("JSON on stderr");
    assert_eq!(v["error"], true);
    assert_eq!(v["code"], "configuration_missing");
    assert!(v["message"].as_str().expect("message").contains("compartment_id"));
}

#[test]
fn missing_subnet_is_named() {
    let home = TempDir::new().expect("tempdir");
    write_config(home.path(), "compartment_id: ocid1.tenancy.oc1..t\n");
    isolated(home.path())
        .args(["provision", "--yes"])
        .assert()
        .code(CONFIGURATION_MISSING)
        .stderr(predicate::str::contains("subnet_id"));
}

#[test]
fn environment_fills_in_missing_fields() {
    let home = TempDir::new().expect("tempdir");
    write_config(home.path(), "compartment_id: ocid1.tenancy.oc1..t\n");
    // subnet comes from the environment, so the next missing input is the key.
    isolated(home.path())
        .env("ZAPBOX_SUBNET_ID", "ocid1.subnet.oc1..s")
        .args(["provision", "--yes", "--skip-dns"])
        .assert()
        .code(CONFIGURATION_MISSING)
        .stderr(predicate::str::contains("ssh_public_key"));
}

#[test]
fn missing_script_is_reported_before_launch() {
    let home = TempDir::new().expect("tempdir");
    write_public_key(home.path());
    write_config(
        home.path(),
        "compartment_id: ocid1.tenancy.oc1..t\nsubnet_id: ocid1.subnet.oc1..s\n",
    );
    isolated(home.path())
        .args(["provision", "--yes", "--script", "missing.sh"])
        .assert()
        .code(CONFIGURATION_MISSING)
        .stderr(predicate::str::contains("missing.sh"));
}

#[test]
fn dns_domain_without_token_is_configuration_missing() {
    let home = TempDir::new().expect("tempdir");
    write_config(
        home.path(),
        "compartment_id: c\nsubnet_id: s\ndns_domain: example.com\ncloudflare_zone_id: z\n",
    );
    isolated(home.path())
        .args(["provision", "--yes"])
        .assert()
        .code(CONFIGURATION_MISSING)
        .stderr(predicate::str::contains("cloudflare_api_token"));
}

#[test]
fn explicit_config_flag_wins() {
    let home = TempDir::new().expect("tempdir");
    let other = home.path().join("other.yaml");
    std::fs::write(&other, "compartment_id: c\n").expect("write");
    isolated(home.path())
        .args(["--config"])
        .arg(&other)
        .args(["provision", "--yes"])
        .assert()
        .code(CONFIGURATION_MISSING)
        .stderr(predicate::str::contains("subnet_id"));
}

#[test]
fn unparsable_config_is_a_generic_failure() {
    let home = TempDir::new().expect("tempdir");
    write_config(home.path(), "compartment_id: [unterminated\n");
    isolated(home.path())
        .args(["provision", "--yes"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("cannot parse"));
}

#[test]
fn images_requires_compartment() {
    let home = TempDir::new().expect("tempdir");
    isolated(home.path())
        .arg("images")
        .assert()
        .code(CONFIGURATION_MISSING)
        .stderr(predicate::str::contains("compartment_id"));
}

#[test]
fn bootstrap_with_missing_script_never_connects() {
    let home = TempDir::new().expect("tempdir");
    isolated(home.path())
        .args(["bootstrap", "203.0.113.5", "--script", "nope.sh"])
        .assert()
        .code(CONFIGURATION_MISSING)
        .stderr(predicate::str::contains("nope.sh"));
}

#[test]
fn ci_environment_counts_as_launch_consent() {
    let home = TempDir::new().expect("tempdir");
    write_public_key(home.path());
    write_config(
        home.path(),
        "compartment_id: ocid1.tenancy.oc1..t\nsubnet_id: ocid1.subnet.oc1..s\n",
    );
    std::fs::write(home.path().join("server-setup.sh"), "#!/bin/sh\ntrue\n").expect("script");
    // No `--yes`; the run must reach the provider, which is absent from PATH.
    isolated(home.path())
        .env("CI", "true")
        .args(["provision", "--skip-dns"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("Cancelled.").not())
        .stderr(predicate::str::contains("oci"));
}
