// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use crate::manifest;
use crate::server;
use crate::table::ProcessTable;
use anyhow::{Context, Result};
use log::{error, info, warn};
use std::path::PathBuf;
use tokio::net::UnixListener;
use tokio::signal::unix::{Signal, SignalKind, signal};
use tokio_util::sync::CancellationToken;

const DEFAULT_SOCKET_PATH: &str = "/tmp/procsup.sock";

pub fn default_socket_path() -> PathBuf {
    std::env::var("PROCSUP_SOCKET")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_SOCKET_PATH))
}

#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    pub logs_dir: PathBuf,
    pub manifest_path: PathBuf,
    pub socket_path: PathBuf,
}

pub struct Supervisor {
    config: SupervisorConfig,
    table: ProcessTable,
    listener: UnixListener,
    shutdown: CancellationToken,
}

impl Supervisor {
    /// Prepare the logs directory, load the manifest and bind the control
    /// socket. Nothing is launched yet.
    pub fn new(config: SupervisorConfig) -> Result<Self> {
        std::fs::create_dir_all(&config.logs_dir).with_context(|| {
            format!("failed to create logs dir {}", config.logs_dir.display())
        })?;
        let entries = manifest::load_manifest(&config.manifest_path)?;
        info!(
            "loaded {} service(s) from {}",
            entries.len(),
            config.manifest_path.display()
        );
        let table = ProcessTable::new(config.logs_dir.clone(), entries);
        let listener = server::bind(&config.socket_path).with_context(|| {
            format!(
                "failed to bind control socket {}",
                config.socket_path.display()
            )
        })?;
        Ok(Self {
            config,
            table,
            listener,
            shutdown: CancellationToken::new(),
        })
    }

    pub fn table(&self) -> &ProcessTable {
        &self.table
    }

    /// Cancelling this token has the same effect as SIGTERM.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Start every service, serve control requests until SIGINT/SIGTERM (or
    /// the shutdown token), then wait for every child to be reaped.
    ///
    /// A further SIGINT/SIGTERM while waiting sends SIGKILL to whatever is
    /// still running.
    pub async fn run(self) -> Result<()> {
        let Supervisor {
            config,
            table,
            listener,
            shutdown,
        } = self;

        // Registered before the first child exists so a signal arriving during
        // bring-up is not fatal to the supervisor.
        let sigterm =
            signal(SignalKind::terminate()).context("failed to install SIGTERM handler")?;
        let sigint =
            signal(SignalKind::interrupt()).context("failed to install SIGINT handler")?;
        let reaped = CancellationToken::new();
        let watcher = tokio::spawn(watch_signals(
            table.clone(),
            shutdown.clone(),
            reaped.clone(),
            sigterm,
            sigint,
        ));

        if let Err(e) = table.start_all() {
            drop(listener);
            remove_socket(&config);
            table.wait().await;
            reaped.cancel();
            let _ = watcher.await;
            return Err(e).context("initial bring-up failed");
        }

        let served = server::serve(listener, table.clone(), shutdown.clone()).await;
        if served.is_err() {
            // Accept loop died on its own: tear down as if signalled.
            shutdown.cancel();
        }
        remove_socket(&config);

        info!("waiting for services to exit");
        table.wait().await;
        info!("all services reaped");
        reaped.cancel();
        if let Err(e) = watcher.await {
            error!("signal task failed: {e}");
        }

        served.context("control listener failed")
    }
}

/// First SIGINT/SIGTERM (or cancelling `shutdown`) stops every service
/// gracefully and closes the control listener. Every later signal, until
/// `reaped` fires, forces the remaining services down with SIGKILL.
async fn watch_signals(
    table: ProcessTable,
    shutdown: CancellationToken,
    reaped: CancellationToken,
    mut sigterm: Signal,
    mut sigint: Signal,
) {
    tokio::select! {
        _ = sigterm.recv() => info!("received SIGTERM"),
        _ = sigint.recv() => info!("received SIGINT"),
        _ = shutdown.cancelled() => info!("shutdown requested"),
        _ = reaped.cancelled() => return,
    }
    info!("stopping services");
    table.shutdown();
    shutdown.cancel();

    loop {
        tokio::select! {
            _ = sigterm.recv() => info!("received SIGTERM again"),
            _ = sigint.recv() => info!("received SIGINT again"),
            _ = reaped.cancelled() => return,
        }
        warn!("forcing remaining services down");
        table.stop_all(true);
    }
}

fn remove_socket(config: &SupervisorConfig) {
    if let Err(e) = server::remove_socket(&config.socket_path) {
        warn!(
            "failed to remove control socket {}: {e}",
            config.socket_path.display()
        );
    }
}
