// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! Control-channel messages.
//!
//! One JSON request is sent per connection and answered by exactly one JSON
//! response, after which the connection is closed. Field names follow the
//! established wire format (`Op`, `Names`, `Force`; `Err`, `Ps`).

use crate::error::{Error, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Upper bound on a single encoded message.
pub const MAX_MESSAGE_SIZE: usize = 64 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Op {
    Ps = 0,
    Stop = 1,
    Start = 2,
}

impl TryFrom<u8> for Op {
    type Error = Error;

    fn try_from(code: u8) -> Result<Self> {
        match code {
            0 => Ok(Op::Ps),
            1 => Ok(Op::Stop),
            2 => Ok(Op::Start),
            other => Err(Error::UnknownOp(other)),
        }
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Op::Ps => write!(f, "ps"),
            Op::Stop => write!(f, "stop"),
            Op::Start => write!(f, "start"),
        }
    }
}

/// A decoded control request. An empty `names` list means "all services".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "WireRequest", into = "WireRequest")]
pub enum Request {
    Ps,
    Stop { names: Vec<String>, force: bool },
    Start { names: Vec<String> },
}

impl Request {
    pub fn op(&self) -> Op {
        match self {
            Request::Ps => Op::Ps,
            Request::Stop { .. } => Op::Stop,
            Request::Start { .. } => Op::Start,
        }
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Request::Ps => write!(f, "ps"),
            Request::Stop { names, force } => write!(f, "stop {names:?} force={force}"),
            Request::Start { names } => write!(f, "start {names:?}"),
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct WireRequest {
    op: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    names: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    force: bool,
}

impl TryFrom<WireRequest> for Request {
    type Error = Error;

    fn try_from(wire: WireRequest) -> Result<Self> {
        let names = wire.names.unwrap_or_default();
        Ok(match Op::try_from(wire.op)? {
            Op::Ps => Request::Ps,
            Op::Stop => Request::Stop {
                names,
                force: wire.force,
            },
            Op::Start => Request::Start { names },
        })
    }
}

impl From<Request> for WireRequest {
    fn from(req: Request) -> Self {
        let op = req.op() as u8;
        let (names, force) = match req {
            Request::Ps => (Vec::new(), false),
            Request::Stop { names, force } => (names, force),
            Request::Start { names } => (names, false),
        };
        WireRequest {
            op,
            names: (!names.is_empty()).then_some(names),
            force,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PsEntry {
    pub name: String,
    pub status: String,
    /// `-1` when no OS process is attached.
    pub pid: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Response {
    /// Empty on success.
    #[serde(default)]
    pub err: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ps: Vec<PsEntry>,
}

impl Response {
    pub fn error(err: &Error) -> Self {
        Self {
            err: err.to_string(),
            ps: Vec::new(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.err.is_empty()
    }

    /// Turn a non-empty error field into [`Error::Remote`].
    pub fn into_result(self) -> Result<Vec<PsEntry>> {
        if self.is_ok() {
            Ok(self.ps)
        } else {
            Err(Error::Remote(self.err))
        }
    }
}

/// Read one JSON message.
///
/// Stops as soon as a complete value has arrived, at end of stream, or once
/// [`MAX_MESSAGE_SIZE`] bytes have been buffered, so it works both with peers
/// that half-close after writing and with peers that keep the write side open.
pub async fn read_message<T, R>(reader: &mut R) -> Result<T>
where
    T: DeserializeOwned,
    R: AsyncRead + Unpin,
{
    let mut buf = Vec::with_capacity(1024);
    let mut chunk = [0u8; 4096];
    loop {
        let n = reader.read(&mut chunk).await?;
        buf.extend_from_slice(&chunk[..n]);
        match serde_json::from_slice::<T>(&buf) {
            Ok(msg) => return Ok(msg),
            Err(e) if e.is_eof() && n > 0 && buf.len() < MAX_MESSAGE_SIZE => continue,
            Err(_) if buf.is_empty() => {
                return Err(Error::Protocol("connection closed without a message".into()));
            }
            Err(e) if e.is_eof() && n == 0 => {
                return Err(Error::Protocol(format!("truncated message: {e}")));
            }
            Err(e) => return Err(Error::Protocol(e.to_string())),
        }
    }
}

/// Write one JSON message followed by a newline and flush.
pub async fn write_message<T, W>(writer: &mut W, msg: &T) -> Result<()>
where
    T: Serialize,
    W: AsyncWrite + Unpin,
{
    let mut bytes = serde_json::to_vec(msg)?;
    bytes.push(b'\n');
    writer.write_all(&bytes).await?;
    writer.flush().await?;
    Ok(())
}
