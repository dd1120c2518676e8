//! Shared mock infrastructure for unit tests.
//!
//! Provides a scripted cloud provider, a scripted remote host and a recording
//! name publisher so each test file doesn't have to re-define the same
//! boilerplate.

#![allow(dead_code, clippy::expect_used)]

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::Duration;

use anyhow::Result;
use zapbox_cli::application::ports::{
    ComputeApi, Elevation, IdentityApi, ImageCatalog, NamePublisher, RemoteOutput, RemoteShell,
    SessionFactory,
};
use zapbox_cli::application::services::bootstrap::{REBOOT_COMMAND, UPGRADE_COMMAND};
use zapbox_cli::application::services::session::{BOOT_ID_COMMAND, PROBE_COMMAND};
use zapbox_cli::domain::config::{
    BootstrapConfig, CloudConfig, DnsConfig, ImageSelection, SshConfig,
};
use zapbox_cli::domain::{
    ImageFilter, ImageSummary, InstanceRecord, InstanceSpec, LifecycleState, LocalInputs,
    ProvisionConfig, PublishedName, RetryPolicy, SessionError, Vnic, VnicAttachment,
};

pub const HOST: &str = "203.0.113.5";
pub const INSTANCE_ID: &str = "ocid1.instance.oc1..zap";

// ── Cloud ────────────────────────────────────────────────────────────────────

/// Cloud provider answering from queues. The last queued entry repeats once
/// the queue runs dry, like a provider that stopped changing.
pub struct ScriptedCloud {
    states: RefCell<VecDeque<LifecycleState>>,
    attachments: RefCell<VecDeque<Vec<VnicAttachment>>>,
    vnic_ip: Option<String>,
    pub launched: RefCell<Vec<InstanceSpec>>,
    pub get_calls: Cell<u32>,
    pub attachment_calls: Cell<u32>,
}

impl ScriptedCloud {
    pub fn new(states: &[LifecycleState], attachments: Vec<Vec<VnicAttachment>>) -> Self {
        Self {
            states: RefCell::new(states.iter().copied().collect()),
            attachments: RefCell::new(attachments.into()),
            vnic_ip: Some(HOST.to_string()),
            launched: RefCell::new(Vec::new()),
            get_calls: Cell::new(0),
            attachment_calls: Cell::new(0),
        }
    }
}

fn next_or_last<T: Clone>(queue: &RefCell<VecDeque<T>>) -> Option<T> {
    let mut q = queue.borrow_mut();
    if q.len() > 1 { q.pop_front() } else { q.front().cloned() }
}

pub fn attachment(vnic_id: Option<&str>) -> VnicAttachment {
    VnicAttachment {
        id: "ocid1.vnicattachment.oc1..a".into(),
        vnic_id: vnic_id.map(String::from),
    }
}

impl ComputeApi for ScriptedCloud {
    async fn launch_instance(&self, spec: &InstanceSpec) -> Result<InstanceRecord> {
        self.launched.borrow_mut().push(spec.clone());
        Ok(InstanceRecord {
            id: INSTANCE_ID.into(),
            state: LifecycleState::Provisioning,
            public_ip: None,
        })
    }

    async fn get_instance(&self, instance_id: &str) -> Result<InstanceRecord> {
        self.get_calls.set(self.get_calls.get() + 1);
        let state = next_or_last(&self.states).unwrap_or(LifecycleState::Provisioning);
        Ok(InstanceRecord {
            id: instance_id.into(),
            state,
            public_ip: None,
        })
    }

    async fn list_vnic_attachments(&self, _: &str) -> Result<Vec<VnicAttachment>> {
        self.attachment_calls.set(self.attachment_calls.get() + 1);
        Ok(next_or_last(&self.attachments).unwrap_or_default())
    }

    async fn get_vnic(&self, vnic_id: &str) -> Result<Vnic> {
        Ok(Vnic {
            id: vnic_id.into(),
            public_ip: self.vnic_ip.clone(),
        })
    }
}

impl IdentityApi for ScriptedCloud {
    async fn list_availability_domains(&self, _: &str) -> Result<Vec<String>> {
        Ok(vec!["Uocm:EU-FRANKFURT-1-AD-1".into()])
    }
}

impl ImageCatalog for ScriptedCloud {
    async fn list_images(&self, _: &ImageFilter) -> Result<Vec<ImageSummary>> {
        Ok(vec![ImageSummary {
            id: "ocid1.image.oc1..newest".into(),
            display_name: "Canonical-Ubuntu-24.04-2025.03.28-0".into(),
            operating_system: "Canonical Ubuntu".into(),
            operating_system_version: "24.04".into(),
        }])
    }
}

// ── Remote host ──────────────────────────────────────────────────────────────

/// A well-behaved host: reboots drop the transport, the boot id changes
/// after every reboot, the validation command reports Docker.
#[derive(Clone, Default)]
pub struct HealthyHost {
    pub log: Rc<RefCell<Vec<String>>>,
    boots: Rc<Cell<u32>>,
}

impl HealthyHost {
    pub fn commands(&self) -> Vec<String> {
        self.log.borrow().clone()
    }
}

impl RemoteShell for HealthyHost {
    fn host(&self) -> &str {
        HOST
    }

    async fn exec(&self, command: &str, _: Elevation) -> Result<RemoteOutput, SessionError> {
        self.log.borrow_mut().push(command.to_string());
        let reply = |s: &str| {
            Ok(RemoteOutput {
                stdout: s.to_string(),
                stderr: String::new(),
            })
        };
        match command {
            c if c == UPGRADE_COMMAND || c == REBOOT_COMMAND => {
                self.boots.set(self.boots.get() + 1);
                Err(SessionError::Connectivity {
                    reason: "connection closed by remote host".into(),
                })
            }
            c if c == PROBE_COMMAND => reply(""),
            c if c == BOOT_ID_COMMAND => reply(&format!("boot-{}\n", self.boots.get())),
            "docker --version" => reply("Docker version 27.3.1, build ce12230\n"),
            _ => reply(""),
        }
    }

    async fn upload(&self, local: &Path, remote: &str) -> Result<(), SessionError> {
        self.log
            .borrow_mut()
            .push(format!("upload {} {remote}", local.display()));
        Ok(())
    }
}

/// Hands out clones of one `HealthyHost` and remembers the requested hosts.
#[derive(Default)]
pub struct HealthyHosts {
    pub host: HealthyHost,
    pub opened: RefCell<Vec<String>>,
}

impl SessionFactory for HealthyHosts {
    type Session = HealthyHost;

    fn open(&self, host: &str) -> HealthyHost {
        self.opened.borrow_mut().push(host.to_string());
        self.host.clone()
    }
}

// ── Publisher ────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingPublisher {
    pub records: RefCell<Vec<PublishedName>>,
}

impl NamePublisher for RecordingPublisher {
    async fn create_record(&self, record: &PublishedName) -> Result<()> {
        self.records.borrow_mut().push(record.clone());
        Ok(())
    }
}

// ── Configuration ────────────────────────────────────────────────────────────

pub fn fast(attempts: u32, secs: u64) -> RetryPolicy {
    RetryPolicy::new(attempts, Duration::from_secs(secs))
}

pub fn config(dns: bool) -> ProvisionConfig {
    ProvisionConfig {
        cloud: CloudConfig {
            compartment_id: "ocid1.tenancy.oc1..t".into(),
            region: None,
            profile: None,
            subnet_id: "ocid1.subnet.oc1..s".into(),
            image: ImageSelection::Id("ocid1.image.oc1..pinned".into()),
            display_name: "host".into(),
            shape: "VM.Standard.E4.Flex".into(),
            ocpus: 1.0,
            memory_gb: 8.0,
        },
        ssh: SshConfig {
            user: "ubuntu".into(),
            public_key_path: PathBuf::from("/keys/id_ed25519.pub"),
            identity: None,
            strict_host_key_checking: false,
            connect_timeout: Duration::from_secs(10),
            keepalive: Duration::from_secs(15),
            command_timeout: Duration::from_secs(1800),
        },
        bootstrap: BootstrapConfig {
            script_path: PathBuf::from("server-setup.sh"),
            remote_script_path: "/home/ubuntu/server-setup.sh".into(),
            second_reboot: true,
            validate_command: "docker --version".into(),
            validate_marker: "Docker version".into(),
            connectivity: fast(5, 5),
            validation: fast(3, 10),
        },
        dns: dns.then(|| DnsConfig {
            zone_id: "zone".into(),
            api_token: "token".into(),
            record_name: "host.example.com".into(),
            ttl: 1,
            proxied: true,
        }),
        lifecycle: fast(4, 10),
        address: fast(5, 5),
        grace: Duration::from_secs(15),
    }
}

pub fn inputs() -> LocalInputs {
    LocalInputs {
        public_key: "ssh-ed25519 AAAAC3Nza zapbox@test".into(),
        script: PathBuf::from("server-setup.sh"),
        script_sha256: "9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08".into(),
    }
}
