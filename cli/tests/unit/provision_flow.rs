//! End-to-end provisioning runs against scripted adapters.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::time::Duration;

use tokio::time::Instant;
use zapbox_cli::application::services::provision::provision;
use zapbox_cli::domain::{LifecycleState, ProvisionError, ProvisionReport, Stage, StageStatus};

use crate::mocks::{
    HOST, HealthyHosts, INSTANCE_ID, RecordingPublisher, ScriptedCloud, attachment, config,
    inputs,
};

struct Silent;

impl zapbox_cli::application::ports::ProgressReporter for Silent {
    fn step(&self, _: &str) {}
    fn success(&self, _: &str) {}
    fn warn(&self, _: &str) {}
}

#[tokio::test(start_paused = true)]
async fn full_run_publishes_and_bootstraps() {
    use LifecycleState::{Provisioning, Running};
    let cloud = ScriptedCloud::new(
        &[Provisioning, Provisioning, Running],
        vec![vec![], vec![attachment(None)], vec![attachment(Some("ocid1.vnic.oc1..v"))]],
    );
    let hosts = HealthyHosts::default();
    let publisher = RecordingPublisher::default();
    let mut report = ProvisionReport::new(chrono::Utc::now());

    let started = Instant::now();
    provision(
        &cloud,
        &hosts,
        Some(&publisher),
        &config(true),
        &inputs(),
        &Silent,
        &mut report,
    )
    .await
    .expect("run succeeds");

    // 2 lifecycle delays (10s) + 2 address delays (5s) + 15s grace.
    assert_eq!(started.elapsed(), Duration::from_secs(45));
    assert_eq!(cloud.get_calls.get(), 3);
    assert_eq!(cloud.attachment_calls.get(), 3);

    let launched = cloud.launched.borrow();
    assert_eq!(launched.len(), 1);
    assert_eq!(launched[0].image_id, "ocid1.image.oc1..pinned");
    assert_eq!(launched[0].ssh_authorized_keys, inputs().public_key);

    let records = publisher.records.borrow();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].name, "host.example.com");
    assert_eq!(records[0].address, HOST);

    assert_eq!(hosts.opened.borrow().as_slice(), [HOST.to_string()]);
    assert_eq!(report.instance_id.as_deref(), Some(INSTANCE_ID));
    assert_eq!(report.public_ip.as_deref(), Some(HOST));
    assert_eq!(report.dns_name.as_deref(), Some("host.example.com"));
    assert_eq!(report.availability_domain.as_deref(), Some("Uocm:EU-FRANKFURT-1-AD-1"));
    assert_eq!(report.script_sha256, Some(inputs().script_sha256));

    let stages: Vec<_> = report
        .bootstrap
        .stages
        .iter()
        .map(|s| (s.stage, s.status))
        .collect();
    assert_eq!(
        stages,
        vec![
            (Stage::Upgrade, StageStatus::Disconnected),
            (Stage::WaitOnline, StageStatus::Ok),
            (Stage::Upload, StageStatus::Ok),
            (Stage::Execute, StageStatus::Ok),
            (Stage::SecondReboot, StageStatus::Disconnected),
            (Stage::WaitOnlineAgain, StageStatus::Ok),
            (Stage::Validate, StageStatus::Ok),
        ]
    );
    assert!(report.bootstrap.succeeded());

    let commands = hosts.host.commands();
    assert!(commands.iter().any(|c| c == "upload server-setup.sh /home/ubuntu/server-setup.sh"));
    assert_eq!(commands.last().map(String::as_str), Some("docker --version"));
}

#[tokio::test(start_paused = true)]
async fn instance_stuck_provisioning_times_out_before_any_network_setup() {
    let cloud = ScriptedCloud::new(&[LifecycleState::Provisioning], vec![]);
    let hosts = HealthyHosts::default();
    let publisher = RecordingPublisher::default();
    let mut report = ProvisionReport::new(chrono::Utc::now());

    let started = Instant::now();
    let err = provision(
        &cloud,
        &hosts,
        Some(&publisher),
        &config(true),
        &inputs(),
        &Silent,
        &mut report,
    )
    .await
    .expect_err("must time out");

    match err.downcast_ref::<ProvisionError>() {
        Some(ProvisionError::ProvisionTimeout {
            attempts, waited, last, ..
        }) => {
            assert_eq!(*attempts, 4);
            assert_eq!(*waited, 30);
            assert_eq!(last.to_string(), "PROVISIONING");
        }
        other => panic!("expected ProvisionTimeout, got {other:?}"),
    }
    assert_eq!(started.elapsed(), Duration::from_secs(30));
    assert_eq!(cloud.attachment_calls.get(), 0);
    assert!(publisher.records.borrow().is_empty());
    assert!(hosts.opened.borrow().is_empty());

    // The report still names the instance so it can be cleaned up.
    assert_eq!(report.instance_id.as_deref(), Some(INSTANCE_ID));
    assert!(report.public_ip.is_none());
    assert!(report.bootstrap.stages.is_empty());
}

#[tokio::test(start_paused = true)]
async fn failed_instance_reports_last_state_in_timeout() {
    let cloud = ScriptedCloud::new(&[LifecycleState::Provisioning, LifecycleState::Failed], vec![]);
    let hosts = HealthyHosts::default();
    let mut report = ProvisionReport::new(chrono::Utc::now());

    let err = provision(
        &cloud,
        &hosts,
        None::<&RecordingPublisher>,
        &config(false),
        &inputs(),
        &Silent,
        &mut report,
    )
    .await
    .expect_err("never reaches running");

    let kind = err.downcast_ref::<ProvisionError>().expect("typed error");
    assert_eq!(kind.exit_code(), 3);
    assert!(err.to_string().contains("FAILED"));
}

#[tokio::test(start_paused = true)]
async fn missing_address_is_address_unavailable() {
    let cloud = ScriptedCloud::new(&[LifecycleState::Running], vec![vec![attachment(None)]]);
    let hosts = HealthyHosts::default();
    let mut report = ProvisionReport::new(chrono::Utc::now());

    let started = Instant::now();
    let err = provision(
        &cloud,
        &hosts,
        None::<&RecordingPublisher>,
        &config(false),
        &inputs(),
        &Silent,
        &mut report,
    )
    .await
    .expect_err("no address");

    assert!(matches!(
        err.downcast_ref::<ProvisionError>(),
        Some(ProvisionError::AddressUnavailable { attempts: 5, waited: 20, .. })
    ));
    assert_eq!(started.elapsed(), Duration::from_secs(20));
    assert_eq!(cloud.attachment_calls.get(), 5);
    assert!(hosts.opened.borrow().is_empty());
}
