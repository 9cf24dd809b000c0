// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use crate::daemon::{self, SupervisorConfig};
use crate::protocol::PsEntry;
use clap::{Parser, Subcommand};
use std::fmt::Write;
use std::path::PathBuf;

/// procsup - supervise the services listed in a manifest
#[derive(Parser, Debug)]
#[command(name = "procsup")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to the control socket [env: PROCSUP_SOCKET, default: /tmp/procsup.sock]
    #[arg(long, global = true)]
    pub socket: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Run the supervisor in the foreground
    Daemon {
        /// Directory receiving one <name>.log per service
        #[arg(short = 'l', long = "logs")]
        logs_dir: PathBuf,

        /// Manifest file with one `name: command` per line
        #[arg(short = 'f', long = "file")]
        manifest: PathBuf,
    },

    /// List services with their pid and status
    Ps,

    /// Stop services (all of them when no name is given)
    Stop {
        names: Vec<String>,

        /// Send SIGKILL instead of SIGTERM
        #[arg(short = 'k', long)]
        kill: bool,
    },

    /// Start services (all of them when no name is given)
    Start { names: Vec<String> },

    /// Print the version
    Version,
}

impl Cli {
    pub fn socket_path(&self) -> PathBuf {
        self.socket.clone().unwrap_or_else(daemon::default_socket_path)
    }

    /// Supervisor settings for the `daemon` subcommand.
    pub fn supervisor_config(&self) -> Option<SupervisorConfig> {
        match &self.command {
            Commands::Daemon { logs_dir, manifest } => Some(SupervisorConfig {
                logs_dir: logs_dir.clone(),
                manifest_path: manifest.clone(),
                socket_path: self.socket_path(),
            }),
            _ => None,
        }
    }
}

/// Render `ps` output as an aligned table.
pub fn format_ps(entries: &[PsEntry]) -> String {
    let mut out = String::new();
    if entries.is_empty() {
        out.push_str("No services\n");
        return out;
    }
    let width = entries
        .iter()
        .map(|e| e.name.len())
        .max()
        .unwrap_or(0)
        .max(20);

    let _ = writeln!(out, "{:<width$}  {:<8}  {:<8}", "NAME", "PID", "STATUS");
    let _ = writeln!(out, "{:-<width$}  {:-<8}  {:-<8}", "", "", "");
    for e in entries {
        let pid = if e.pid < 0 {
            "-".to_string()
        } else {
            e.pid.to_string()
        };
        let _ = writeln!(out, "{:<width$}  {:<8}  {:<8}", e.name, pid, e.status);
    }
    out
}
