// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use crate::error::{Error, Result};
use crate::state::ServiceState;
use log::{debug, info, warn};
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use std::fs::{File, OpenOptions};
use std::io;
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;

/// Live reference to the OS process of the current run.
///
/// Signals are not sent to the pid directly: they are forwarded to the
/// supervisory task that owns the [`Child`], which delivers them only while
/// the child has not been reaped.
#[derive(Debug)]
pub struct ProcessHandle {
    pid: u32,
    signals: mpsc::UnboundedSender<Signal>,
}

impl ProcessHandle {
    pub fn pid(&self) -> u32 {
        self.pid
    }

    fn signal(&self, sig: Signal) -> bool {
        self.signals.send(sig).is_ok()
    }
}

/// Everything the supervisory task needs to own for one run.
#[derive(Debug)]
pub(crate) struct Launched {
    pub(crate) child: Child,
    pub(crate) signals: mpsc::UnboundedReceiver<Signal>,
    pub(crate) log: File,
}

#[derive(Debug)]
pub struct Service {
    pub name: String,
    command: String,
    state: ServiceState,
    handle: Option<ProcessHandle>,
    /// Set once `stop` handed a signal to the current run.
    stop_requested: bool,
}

impl Service {
    pub fn new(name: String, command: String) -> Self {
        Self {
            name,
            command,
            state: ServiceState::Idle,
            handle: None,
            stop_requested: false,
        }
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn state(&self) -> ServiceState {
        self.state
    }

    pub fn pid(&self) -> Option<u32> {
        self.handle.as_ref().map(ProcessHandle::pid)
    }

    pub fn is_running(&self) -> bool {
        self.state.is_alive()
    }

    pub fn log_path(&self, logs_dir: &Path) -> PathBuf {
        logs_dir.join(format!("{}.log", self.name))
    }

    /// Split the command line on whitespace. No shell interpretation.
    fn argv(&self) -> Result<(&str, Vec<&str>)> {
        let mut parts = self.command.split_whitespace();
        let program = parts.next().ok_or_else(|| Error::EmptyCommand {
            name: self.name.clone(),
        })?;
        Ok((program, parts.collect()))
    }

    fn open_log(&self, logs_dir: &Path) -> Result<File> {
        let path = self.log_path(logs_dir);
        OpenOptions::new()
            .create(true)
            .append(true)
            .mode(0o600)
            .open(&path)
            .map_err(|source| Error::LogFile {
                name: self.name.clone(),
                path,
                source,
            })
    }

    /// Launch a fresh OS process with stdout and stderr appended to the
    /// service's log file. The caller must hand the returned [`Launched`] to
    /// a supervisory task.
    pub(crate) fn launch(&mut self, logs_dir: &Path) -> Result<Launched> {
        let (program, args) = self.argv()?;
        let log = self.open_log(logs_dir)?;
        let log_err = |source| Error::LogFile {
            name: self.name.clone(),
            path: self.log_path(logs_dir),
            source,
        };
        let stdout = log.try_clone().map_err(log_err)?;
        let stderr = log.try_clone().map_err(log_err)?;

        let child = Command::new(program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(stdout)
            .stderr(stderr)
            .spawn()
            .map_err(|source| Error::Launch {
                name: self.name.clone(),
                source,
            })?;

        let pid = child.id().unwrap_or(0);
        info!("[{}] spawned (pid={pid}, cmd={})", self.name, self.command);

        let (tx, rx) = mpsc::unbounded_channel();
        self.transition(ServiceState::Running);
        self.handle = Some(ProcessHandle { pid, signals: tx });
        self.stop_requested = false;
        Ok(Launched {
            child,
            signals: rx,
            log,
        })
    }

    /// Request termination: SIGTERM, or SIGKILL when `force` is set.
    ///
    /// This does not wait for the process to exit and does not change the
    /// state; the state changes once the supervisory task reaps the child.
    /// A no-op unless the service is running.
    pub fn stop(&mut self, force: bool) {
        if !self.is_running() {
            return;
        }
        let Some(ref handle) = self.handle else {
            return;
        };
        let sig = if force { Signal::SIGKILL } else { Signal::SIGTERM };
        info!("[{}] sending {sig}", self.name);
        if handle.signal(sig) {
            self.stop_requested = true;
        } else {
            debug!("[{}] supervisory task already gone, {sig} dropped", self.name);
        }
    }

    /// Commit the outcome of a reaped run: classify the status and release
    /// the handle in one step.
    pub(crate) fn mark_exited(&mut self, status: io::Result<ExitStatus>) -> ServiceState {
        let next = match status {
            Ok(status) => ServiceState::from_exit_status(status, self.stop_requested),
            Err(e) => {
                warn!("[{}] failed to wait: {e}", self.name);
                ServiceState::Failed
            }
        };
        self.handle = None;
        self.stop_requested = false;
        self.transition(next);
        next
    }

    fn transition(&mut self, next: ServiceState) {
        if !self.state.can_transition_to(next) {
            warn!("[{}] unexpected transition {} -> {next}", self.name, self.state);
        }
        self.state = next;
    }
}

/// Wait for `child` to exit while forwarding termination requests to it.
///
/// Signals are delivered only while the child is still unreaped, so a pid
/// recycled by the kernel after exit is never targeted.
pub(crate) async fn supervise(
    name: &str,
    child: &mut Child,
    signals: &mut mpsc::UnboundedReceiver<Signal>,
) -> io::Result<ExitStatus> {
    loop {
        tokio::select! {
            status = child.wait() => return status,
            Some(sig) = signals.recv() => {
                if let Some(pid) = child.id()
                    && let Err(e) = signal::kill(Pid::from_raw(pid as i32), sig)
                {
                    warn!("[{name}] failed to send {sig}: {e}");
                }
            }
        }
    }
}
