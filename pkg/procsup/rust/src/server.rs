// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use crate::error::{Error, Result};
use crate::protocol::{self, Request, Response};
use crate::table::ProcessTable;
use log::{debug, error, info, warn};
use std::fs::Permissions;
use std::io::ErrorKind;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use tokio::io::AsyncWriteExt;
use tokio::net::{UnixListener, UnixStream};
use tokio::time::{Duration, timeout};
use tokio_util::sync::CancellationToken;

/// How long a client gets to deliver its request.
pub const READ_TIMEOUT: Duration = Duration::from_secs(5);

/// Remove a stale socket file left by an unclean shutdown and bind a fresh
/// listener. The socket is only accessible to the owner.
pub fn bind(socket_path: &Path) -> Result<UnixListener> {
    remove_socket(socket_path)?;
    let listener = UnixListener::bind(socket_path)?;
    std::fs::set_permissions(socket_path, Permissions::from_mode(0o600))?;
    info!("control socket listening on {}", socket_path.display());
    Ok(listener)
}

/// Remove the socket file, ignoring a missing file.
pub fn remove_socket(socket_path: &Path) -> Result<()> {
    match std::fs::remove_file(socket_path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Accept control connections until `cancel` fires. Each connection is served
/// by its own task. An accept error ends the loop and is returned.
pub async fn serve(
    listener: UnixListener,
    table: ProcessTable,
    cancel: CancellationToken,
) -> Result<()> {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                info!("control listener closed");
                return Ok(());
            }
            accepted = listener.accept() => {
                let (stream, _) = match accepted {
                    Ok(conn) => conn,
                    Err(e) => {
                        error!("accept error: {e}");
                        return Err(e.into());
                    }
                };
                let table = table.clone();
                tokio::spawn(handle_connection(stream, table));
            }
        }
    }
}

async fn handle_connection(mut stream: UnixStream, table: ProcessTable) {
    let response = match timeout(READ_TIMEOUT, protocol::read_message::<Request, _>(&mut stream))
        .await
    {
        Ok(Ok(request)) => {
            info!("new request: {request}");
            dispatch(&table, request)
        }
        Ok(Err(Error::Io(e))) => {
            warn!("failed to read request: {e}");
            return;
        }
        Ok(Err(e)) => {
            warn!("bad request: {e}");
            Response::error(&e)
        }
        Err(_) => {
            warn!("no request within {}s, closing", READ_TIMEOUT.as_secs());
            return;
        }
    };

    if let Err(e) = protocol::write_message(&mut stream, &response).await {
        debug!("failed to write response: {e}");
        return;
    }
    if let Err(e) = stream.shutdown().await {
        debug!("failed to close connection: {e}");
    }
}

/// Apply one request to the table. Per-name failures do not stop the
/// remaining names; the last error is reported.
pub fn dispatch(table: &ProcessTable, request: Request) -> Response {
    let mut response = Response::default();
    let results: Vec<Result<()>> = match request {
        Request::Ps => {
            response.ps = table.ps();
            Vec::new()
        }
        Request::Stop { names, force } if names.is_empty() => {
            table.stop_all(force);
            Vec::new()
        }
        Request::Stop { names, force } => names.iter().map(|n| table.stop(n, force)).collect(),
        Request::Start { names } if names.is_empty() => vec![table.start_all()],
        Request::Start { names } => names.iter().map(|n| table.start(n)).collect(),
    };
    for e in results.into_iter().filter_map(Result::err) {
        warn!("{e}");
        response.err = e.to_string();
    }
    response
}
