// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("failed to read manifest {}: {source}", path.display())]
    ManifestIo { path: PathBuf, source: io::Error },

    #[error("failed to parse manifest: line {line} is missing ':'")]
    ManifestMissingColon { line: usize },

    #[error("failed to parse manifest: line {line} has an empty service name")]
    ManifestEmptyName { line: usize },

    #[error("[{name}] cannot open log file {}: {source}", path.display())]
    LogFile {
        name: String,
        path: PathBuf,
        source: io::Error,
    },

    #[error("[{name}] failed to launch: {source}")]
    Launch { name: String, source: io::Error },

    #[error("[{name}] command is empty")]
    EmptyCommand { name: String },

    #[error("failed to start [{name}]: {source}")]
    StartAll { name: String, source: Box<Error> },

    #[error("cannot find service with name: {0}")]
    ServiceNotFound(String),

    #[error("supervisor is shutting down")]
    ShuttingDown,

    #[error("malformed request: {0}")]
    Protocol(String),

    #[error("unknown op ({0})")]
    UnknownOp(u8),

    #[error("{0}")]
    Remote(String),

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
