// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use nix::sys::signal::Signal;
use std::fmt;
use std::os::unix::process::ExitStatusExt;
use std::process::ExitStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
    /// Declared in the manifest, never launched.
    Idle,
    /// Child process launched and not yet reaped.
    Running,
    /// Terminated by a SIGTERM/SIGKILL the supervisor sent, or by SIGINT.
    Stopped,
    /// Exited with a non-zero code, or killed by any other signal.
    Failed,
    /// Exited with code 0.
    Finished,
}

impl ServiceState {
    pub fn is_alive(self) -> bool {
        self == ServiceState::Running
    }

    pub(crate) fn can_transition_to(self, next: ServiceState) -> bool {
        use ServiceState::*;
        matches!(
            (self, next),
            (Idle, Running)
                | (Running, Finished)
                | (Running, Failed)
                | (Running, Stopped)
                | (Finished, Running)
                | (Failed, Running)
                | (Stopped, Running)
        )
    }

    /// Classify a reaped child's wait status.
    ///
    /// SIGTERM and SIGKILL only count as a stop when `stop_requested` is set
    /// for this run; otherwise something else killed the child.
    pub fn from_exit_status(status: ExitStatus, stop_requested: bool) -> ServiceState {
        if status.success() {
            return ServiceState::Finished;
        }
        match status.signal().and_then(|s| Signal::try_from(s).ok()) {
            Some(Signal::SIGINT) => ServiceState::Stopped,
            Some(Signal::SIGTERM | Signal::SIGKILL) if stop_requested => ServiceState::Stopped,
            _ => ServiceState::Failed,
        }
    }
}

impl fmt::Display for ServiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceState::Idle => write!(f, "idle"),
            ServiceState::Running => write!(f, "running"),
            ServiceState::Stopped => write!(f, "stopped"),
            ServiceState::Failed => write!(f, "failed"),
            ServiceState::Finished => write!(f, "finished"),
        }
    }
}
