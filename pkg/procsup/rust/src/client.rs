// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use crate::error::Result;
use crate::protocol::{self, PsEntry, Request, Response};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::net::UnixStream;

/// Talks to a running supervisor. Every call opens its own connection.
#[derive(Debug, Clone)]
pub struct Client {
    socket_path: PathBuf,
}

impl Client {
    pub fn new(socket_path: impl Into<PathBuf>) -> Self {
        Self {
            socket_path: socket_path.into(),
        }
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Send one request and return the raw response.
    pub async fn call(&self, request: &Request) -> Result<Response> {
        let mut stream = UnixStream::connect(&self.socket_path).await?;
        protocol::write_message(&mut stream, request).await?;
        stream.shutdown().await?;
        protocol::read_message(&mut stream).await
    }

    pub async fn ps(&self) -> Result<Vec<PsEntry>> {
        self.call(&Request::Ps).await?.into_result()
    }

    /// Ask the supervisor to stop `names` (all services when empty). Returns
    /// once the signals were sent, not once the services exited.
    pub async fn stop(&self, names: Vec<String>, force: bool) -> Result<()> {
        self.call(&Request::Stop { names, force })
            .await?
            .into_result()
            .map(|_| ())
    }

    /// Ask the supervisor to start `names` (all services when empty).
    pub async fn start(&self, names: Vec<String>) -> Result<()> {
        self.call(&Request::Start { names })
            .await?
            .into_result()
            .map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use tokio::net::UnixListener;

    /// Accept one connection, check the request and answer with `response`.
    fn fake_daemon(
        listener: UnixListener,
        expected: Request,
        response: Response,
    ) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let req: Request = protocol::read_message(&mut stream).await.unwrap();
            assert_eq!(req, expected);
            protocol::write_message(&mut stream, &response).await.unwrap();
        })
    }

    #[tokio::test]
    async fn test_dial_fails_without_daemon() {
        let dir = tempfile::tempdir().unwrap();
        let client = Client::new(dir.path().join("absent.sock"));
        assert!(matches!(client.ps().await, Err(Error::Io(_))));
    }

    #[tokio::test]
    async fn test_ps_ok() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("d.sock");
        let listener = UnixListener::bind(&path).unwrap();
        let expected = vec![
            PsEntry {
                name: "a".into(),
                status: "running".into(),
                pid: 10,
            },
            PsEntry {
                name: "b".into(),
                status: "idle".into(),
                pid: -1,
            },
        ];
        let daemon = fake_daemon(
            listener,
            Request::Ps,
            Response {
                err: String::new(),
                ps: expected.clone(),
            },
        );

        let got = Client::new(&path).ps().await.unwrap();
        assert_eq!(got, expected);
        daemon.await.unwrap();
    }

    #[tokio::test]
    async fn test_error_field_becomes_remote_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("d.sock");
        let listener = UnixListener::bind(&path).unwrap();
        let daemon = fake_daemon(
            listener,
            Request::Start {
                names: vec!["x".into()],
            },
            Response {
                err: "bad thing happened".into(),
                ps: Vec::new(),
            },
        );

        let err = Client::new(&path).start(vec!["x".into()]).await.unwrap_err();
        assert!(matches!(err, Error::Remote(ref m) if m == "bad thing happened"));
        daemon.await.unwrap();
    }

    #[tokio::test]
    async fn test_stop_sends_names_and_force() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("d.sock");
        let listener = UnixListener::bind(&path).unwrap();
        let daemon = fake_daemon(
            listener,
            Request::Stop {
                names: vec!["a".into(), "b".into()],
                force: true,
            },
            Response::default(),
        );

        Client::new(&path)
            .stop(vec!["a".into(), "b".into()], true)
            .await
            .unwrap();
        daemon.await.unwrap();
    }
}
