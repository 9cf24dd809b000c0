// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use procsup::cli::{self, Cli, Commands};
use procsup::client::Client;
use procsup::daemon::Supervisor;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let client = Client::new(cli.socket_path());
    let socket = client.socket_path().display().to_string();
    match &cli.command {
        Commands::Daemon { .. } => {
            init_logger()?;
            info!("procsup starting (version {})", env!("CARGO_PKG_VERSION"));
            let config = cli.supervisor_config().context("missing daemon settings")?;
            Supervisor::new(config)?.run().await?;
            info!("procsup exiting");
        }
        Commands::Ps => {
            let entries = client
                .ps()
                .await
                .with_context(|| format!("ps via {socket}"))?;
            print!("{}", cli::format_ps(&entries));
        }
        Commands::Stop { names, kill } => {
            client
                .stop(names.clone(), *kill)
                .await
                .with_context(|| format!("stop via {socket}"))?;
        }
        Commands::Start { names } => {
            client
                .start(names.clone())
                .await
                .with_context(|| format!("start via {socket}"))?;
        }
        Commands::Version => println!("procsup {}", env!("CARGO_PKG_VERSION")),
    }
    Ok(())
}

fn init_logger() -> Result<()> {
    let level = match std::env::var("PROCSUP_LOG_LEVEL") {
        Ok(raw) => raw
            .parse::<log::Level>()
            .with_context(|| format!("invalid PROCSUP_LOG_LEVEL '{raw}'"))?,
        Err(_) => log::Level::Info,
    };
    simple_logger::init_with_level(level)?;
    Ok(())
}
