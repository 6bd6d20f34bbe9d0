// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Command-line surface.
//!
//! Flags form the highest-precedence configuration layer. A flag that is not
//! given leaves its field unset so lower layers (environment, config file,
//! defaults) still apply; `--secure-mode` and `--machine` accept an explicit
//! `=false` to override a config file that turns them on.

use crate::config::PartialOptions;
use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

const ABOUT: &str = "debug microservices with squash";

const LONG_ABOUT: &str = "\
squashctl requires no arguments. Just run it!
It creates a privileged debug pod, starts a debugger, and then attaches to it.
If you are debugging in a shared cluster, consider using secure mode, where
the squash agent deployed in the cluster creates the debug pod for you.";

/// squashctl command line.
#[derive(Debug, Parser)]
#[command(name = "squashctl", version, about = ABOUT, long_about = LONG_ABOUT)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Config file to read instead of ~/.squash/config.yaml
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Output json format
    #[arg(long, global = true)]
    pub json: bool,

    /// Namespace to debug
    #[arg(long, global = true)]
    pub namespace: Option<String>,

    /// Pod to debug
    #[arg(long, global = true)]
    pub pod: Option<String>,

    /// Container to debug, by name or by image name prefix
    #[arg(long, global = true)]
    pub container: Option<String>,

    /// Debugger to use
    #[arg(long, global = true)]
    pub debugger: Option<String>,

    /// Local port to use to connect to debugger (defaults to random free port)
    #[arg(long = "localport", global = true, value_name = "PORT")]
    pub local_port: Option<u16>,

    /// Timeout in seconds to wait for debug pod to be ready
    #[arg(long, global = true, value_name = "SECONDS")]
    pub timeout: Option<u64>,

    /// Create a DebugAttachment for the in-cluster squash agent instead of a debug pod
    #[arg(long = "secure-mode", global = true, num_args = 0..=1, default_missing_value = "true")]
    pub secure_mode: Option<bool>,

    /// Machine mode input and output
    #[arg(long, global = true, num_args = 0..=1, default_missing_value = "true")]
    pub machine: Option<bool>,

    /// Don't clean temporary pod when existing
    #[arg(long = "no-clean", global = true)]
    pub no_clean: bool,

    /// Don't auto detect debugger to use
    #[arg(long = "no-guess-debugger", global = true)]
    pub no_guess_debugger: bool,

    /// Don't auto detect pod to use
    #[arg(long = "no-guess-pod", global = true)]
    pub no_guess_pod: bool,

    /// Debug container version to use
    #[arg(long = "container-version", global = true)]
    pub container_version: Option<String>,

    /// Debug container repo to use
    #[arg(long = "container-repo", global = true)]
    pub container_repo: Option<String>,

    /// The path to the CRI socket
    #[arg(long, global = true, value_name = "PATH")]
    pub crisock: Option<String>,

    /// [deprecated] start a debug server instead of an interactive session
    #[arg(long = "debug-server", global = true, hide = true)]
    pub debug_server: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

impl Cli {
    /// The flag configuration layer.
    #[must_use]
    pub fn overrides(&self) -> PartialOptions {
        PartialOptions {
            namespace: self.namespace.clone(),
            pod: self.pod.clone(),
            container: self.container.clone(),
            debugger: self.debugger.clone(),
            local_port: self.local_port,
            machine: self.machine,
            secure_mode: self.secure_mode,
            timeout_seconds: self.timeout,
            no_clean: self.no_clean.then_some(true),
            choose_pod: self.no_guess_pod.then_some(true),
            choose_debugger: self.no_guess_debugger.then_some(true),
            json: self.json.then_some(true),
            container_repo: self.container_repo.clone(),
            container_version: self.container_version.clone(),
            cri_sock: self.crisock.clone(),
        }
    }
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod cli_tests;
