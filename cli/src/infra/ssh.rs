//! OpenSSH-backed `RemoteShell`.
//!
//! Every command is one `ssh` invocation and every upload one `scp`
//! invocation, routed through a `CommandRunner`. The exit status decides
//! the failure class: OpenSSH reserves 255 for its own errors, so 255 (or a
//! spawn failure, a timeout, a signal) is a connectivity failure and any
//! other non-zero exit belongs to the remote command.

use std::path::Path;
use std::process::Output;

use crate::application::ports::{
    CommandRunner, Elevation, RemoteOutput, RemoteShell, SessionFactory,
};
use crate::domain::SessionError;
use crate::domain::config::SshConfig;

/// Exit code OpenSSH uses for its own failures.
const SSH_TRANSPORT_EXIT: i32 = 255;

/// `scp` exits 1 for everything; these stderr fragments mean the transport
/// broke rather than the remote side refusing the write.
const SCP_TRANSPORT_MARKERS: &[&str] = &[
    "connection refused",
    "connection timed out",
    "connection closed",
    "connection reset",
    "lost connection",
    "no route to host",
    "network is unreachable",
    "could not resolve hostname",
    "operation timed out",
];

/// Builds one [`OpenSshSession`] per host.
#[derive(Debug, Clone)]
pub struct OpenSshFactory<R: CommandRunner + Clone> {
    runner: R,
    config: SshConfig,
}

impl<R: CommandRunner + Clone> OpenSshFactory<R> {
    #[must_use]
    pub fn new(runner: R, config: SshConfig) -> Self {
        Self { runner, config }
    }
}

impl<R: CommandRunner + Clone> SessionFactory for OpenSshFactory<R> {
    type Session = OpenSshSession<R>;

    fn open(&self, host: &str) -> Self::Session {
        OpenSshSession::new(self.runner.clone(), self.config.clone(), host)
    }
}

/// `user@host` plus connection options.
#[derive(Debug, Clone)]
pub struct OpenSshSession<R: CommandRunner> {
    runner: R,
    config: SshConfig,
    host: String,
}

impl<R: CommandRunner> OpenSshSession<R> {
    pub fn new(runner: R, config: SshConfig, host: &str) -> Self {
        Self {
            runner,
            config,
            host: host.to_string(),
        }
    }

    fn destination(&self) -> String {
        format!("{}@{}", self.config.user, self.host)
    }

    /// Options shared by `ssh` and `scp`.
    fn common_args(&self) -> Vec<String> {
        let strict = if self.config.strict_host_key_checking {
            "yes"
        } else {
            "no"
        };
        let mut args = vec![
            "-o".to_string(),
            "BatchMode=yes".to_string(),
            "-o".to_string(),
            format!("StrictHostKeyChecking={strict}"),
            "-o".to_string(),
            format!("ConnectTimeout={}", self.config.connect_timeout.as_secs().max(1)),
            "-o".to_string(),
            format!("ServerAliveInterval={}", self.config.keepalive.as_secs().max(1)),
            "-o".to_string(),
            "ServerAliveCountMax=3".to_string(),
            "-o".to_string(),
            "LogLevel=ERROR".to_string(),
        ];
        if !self.config.strict_host_key_checking {
            // Every fresh instance presents a new host key for a reused address.
            args.extend(["-o".to_string(), "UserKnownHostsFile=/dev/null".to_string()]);
        }
        if let Some(identity) = &self.config.identity {
            args.extend(["-i".to_string(), identity.display().to_string()]);
        }
        args
    }

    fn exec_args(&self, command: &str, elevation: Elevation) -> Vec<String> {
        let mut args = self.common_args();
        args.push(self.destination());
        args.push("--".to_string());
        args.push(match elevation {
            Elevation::Ordinary => command.to_string(),
            Elevation::Privileged => format!("sudo -n {command}"),
        });
        args
    }

    fn upload_args(&self, local: &Path, remote: &str) -> Vec<String> {
        let mut args = self.common_args();
        args.push("-q".to_string());
        args.push(local.display().to_string());
        args.push(format!("{}:{remote}", self.destination()));
        args
    }
}

impl<R: CommandRunner> RemoteShell for OpenSshSession<R> {
    fn host(&self) -> &str {
        &self.host
    }

    async fn exec(&self, command: &str, elevation: Elevation) -> Result<RemoteOutput, SessionError> {
        let args = self.exec_args(command, elevation);
        let argv: Vec<&str> = args.iter().map(String::as_str).collect();
        tracing::debug!(host = %self.host, command, ?elevation, "ssh exec");
        match self
            .runner
            .run_with_timeout("ssh", &argv, self.config.command_timeout)
            .await
        {
            Ok(output) => classify_exec(&output),
            Err(err) => Err(SessionError::Connectivity {
                reason: format!("{err:#}"),
            }),
        }
    }

    async fn upload(&self, local: &Path, remote: &str) -> Result<(), SessionError> {
        let args = self.upload_args(local, remote);
        let argv: Vec<&str> = args.iter().map(String::as_str).collect();
        tracing::debug!(host = %self.host, local = %local.display(), remote, "scp upload");
        match self
            .runner
            .run_with_timeout("scp", &argv, self.config.command_timeout)
            .await
        {
            Ok(output) => classify_upload(&output),
            Err(err) => Err(SessionError::Connectivity {
                reason: format!("{err:#}"),
            }),
        }
    }
}

fn stderr_of(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).trim().to_string()
}

/// Map an `ssh` exit status onto the two failure classes.
pub fn classify_exec(output: &Output) -> Result<RemoteOutput, SessionError> {
    match output.status.code() {
        Some(0) => Ok(RemoteOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }),
        Some(SSH_TRANSPORT_EXIT) | None => Err(SessionError::Connectivity {
            reason: stderr_of(output),
        }),
        Some(code) => Err(SessionError::Remote {
            code: Some(code),
            stderr: stderr_of(output),
        }),
    }
}

/// Map an `scp` exit status onto the two failure classes.
pub fn classify_upload(output: &Output) -> Result<(), SessionError> {
    let stderr = stderr_of(output);
    match output.status.code() {
        Some(0) => Ok(()),
        Some(SSH_TRANSPORT_EXIT) | None => Err(SessionError::Connectivity { reason: stderr }),
        Some(_) if is_transport_message(&stderr) => {
            Err(SessionError::Connectivity { reason: stderr })
        }
        Some(code) => Err(SessionError::Remote {
            code: Some(code),
            stderr,
        }),
    }
}

fn is_transport_message(stderr: &str) -> bool {
    let lower = stderr.to_ascii_lowercase();
    SCP_TRANSPORT_MARKERS.iter().any(|m| lower.contains(m))
}
