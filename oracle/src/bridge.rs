//! Cross-language oracle bridge.
//!
//! Speaks line-delimited JSON to a helper subprocess (the py-ssz oracle):
//! one request per line in, one response per line out. The pipe pair is
//! guarded by a mutex, so at most one request is in flight per bridge.

use parking_lot::Mutex;
use serde_derive::{Deserialize, Serialize};
use slog::{info, o, Logger};
use ssz::Hash256;
use std::fmt;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

/// What the external oracle made of a byte string.
#[derive(Debug, Clone, PartialEq)]
pub struct ExternalDecodeResult {
    /// The canonical re-encoding of the decoded value.
    pub canonical: Vec<u8>,
    /// The external hash tree root.
    pub root: Hash256,
}

/// Returned when the external oracle cannot answer.
#[derive(Debug, Clone, PartialEq)]
pub enum BridgeError {
    /// The subprocess could not be reached.
    Io(String),
    /// The subprocess answered something that is not the protocol.
    Protocol(String),
    /// The remote oracle reported a decode failure.
    Remote(String),
}

impl fmt::Display for BridgeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BridgeError::Io(err) => write!(f, "bridge io error: {}", err),
            BridgeError::Protocol(err) => write!(f, "bridge protocol error: {}", err),
            BridgeError::Remote(err) => write!(f, "external oracle error: {}", err),
        }
    }
}

/// A cross-language decode/hash oracle.
pub trait ExternalOracle: Send {
    /// Decodes `data` against the named schema, returning the canonical
    /// re-encoding and root computed on the other side.
    fn decode(&self, schema: &str, data: &[u8]) -> Result<ExternalDecodeResult, BridgeError>;
}

#[derive(Serialize)]
struct Request<'a> {
    op: &'a str,
    schema: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<String>,
}

#[derive(Deserialize)]
struct Response {
    ok: bool,
    #[serde(default)]
    canon: Option<String>,
    #[serde(default)]
    root: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// A persistent helper subprocess speaking the bridge protocol.
pub struct SubprocessBridge {
    child: Child,
    pipe: Mutex<(ChildStdin, BufReader<ChildStdout>)>,
    log: Logger,
}

impl SubprocessBridge {
    /// Starts `interpreter script` and pings it with `schema` before use.
    pub fn spawn(
        interpreter: &str,
        script: &Path,
        schema: &str,
        log: Logger,
    ) -> Result<Self, BridgeError> {
        let mut child = Command::new(interpreter)
            .arg(script)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .spawn()
            .map_err(|e| BridgeError::Io(e.to_string()))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| BridgeError::Io("no stdin pipe".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| BridgeError::Io("no stdout pipe".into()))?;

        let bridge = Self {
            child,
            pipe: Mutex::new((stdin, BufReader::new(stdout))),
            log: log.new(o!("service" => "bridge")),
        };

        bridge.request(&Request {
            op: "ping",
            schema,
            data: None,
        })?;
        info!(bridge.log, "External oracle ready"; "schema" => schema);
        Ok(bridge)
    }

    fn request(&self, request: &Request) -> Result<Response, BridgeError> {
        let line =
            serde_json::to_string(request).map_err(|e| BridgeError::Protocol(e.to_string()))?;

        let mut pipe = self.pipe.lock();
        let (stdin, stdout) = &mut *pipe;
        stdin
            .write_all(line.as_bytes())
            .and_then(|_| stdin.write_all(b"\n"))
            .and_then(|_| stdin.flush())
            .map_err(|e| BridgeError::Io(e.to_string()))?;

        let mut reply = String::new();
        stdout
            .read_line(&mut reply)
            .map_err(|e| BridgeError::Io(e.to_string()))?;
        if reply.is_empty() {
            return Err(BridgeError::Io("external oracle closed its pipe".into()));
        }

        let response: Response =
            serde_json::from_str(reply.trim_end()).map_err(|e| BridgeError::Protocol(e.to_string()))?;
        if !response.ok {
            return Err(BridgeError::Remote(
                response.error.unwrap_or_else(|| "unspecified".into()),
            ));
        }
        Ok(response)
    }
}

impl ExternalOracle for SubprocessBridge {
    fn decode(&self, schema: &str, data: &[u8]) -> Result<ExternalDecodeResult, BridgeError> {
        let response = self.request(&Request {
            op: "decode",
            schema,
            data: Some(hex::encode(data)),
        })?;

        let canonical = response
            .canon
            .ok_or_else(|| BridgeError::Protocol("response missing canon".into()))
            .and_then(|canon| {
                hex::decode(canon).map_err(|e| BridgeError::Protocol(e.to_string()))
            })?;
        let root = response
            .root
            .ok_or_else(|| BridgeError::Protocol("response missing root".into()))
            .and_then(|root| hex::decode(root).map_err(|e| BridgeError::Protocol(e.to_string())))?;
        if root.len() != 32 {
            return Err(BridgeError::Protocol(format!(
                "root is {} bytes, expected 32",
                root.len()
            )));
        }

        Ok(ExternalDecodeResult {
            canonical,
            root: Hash256::from_slice(&root),
        })
    }
}

impl Drop for SubprocessBridge {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}
