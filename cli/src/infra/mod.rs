//! Infrastructure layer: concrete implementations of application port traits.
//!
//! This module contains all I/O-performing code: process execution, the
//! `oci` CLI, OpenSSH, the Cloudflare API and configuration loading.
//!
//! Imports from `crate::domain` and `crate::application::ports` are allowed.
//! Imports from `crate::commands` or `crate::output` are forbidden.

pub mod cloudflare;
pub mod command_runner;
pub mod config;
pub mod oci;
pub mod ssh;
