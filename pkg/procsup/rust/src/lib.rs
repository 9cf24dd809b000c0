// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! A single-node service supervisor.
//!
//! Services are declared in a manifest, launched and reaped by a
//! [`table::ProcessTable`], and controlled over a unix socket by
//! [`client::Client`]. [`daemon::Supervisor`] wires these together and
//! guarantees that no child outlives it.

pub mod cli;
pub mod client;
pub mod daemon;
pub mod error;
pub mod manifest;
pub mod process;
pub mod protocol;
pub mod server;
pub mod state;
pub mod table;

pub use error::{Error, Result};
