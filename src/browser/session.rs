use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::agent::error::DriverError;
use crate::browser::driver::AutomationDriver;
use crate::screen::screen_model::{DomNode, Snapshot};

pub const DEFAULT_BROWSER_SCRIPT: &str = "node/browser_server.js";

/// Request sent to browser_server.js over stdin (one JSON line).
#[derive(Debug, Serialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum BrowserRequest {
    Navigate { url: String, timeout_ms: u64 },
    Snapshot,
    Click { selector: String, timeout_ms: u64 },
    Fill { selector: String, value: String, timeout_ms: u64 },
    WaitVisible { target: String, timeout_ms: u64 },
    Wait { duration_ms: u64 },
    CurrentUrl,
    Quit,
}

impl BrowserRequest {
    pub fn name(&self) -> &'static str {
        match self {
            BrowserRequest::Navigate { .. } => "navigate",
            BrowserRequest::Snapshot => "snapshot",
            BrowserRequest::Click { .. } => "click",
            BrowserRequest::Fill { .. } => "fill",
            BrowserRequest::WaitVisible { .. } => "wait_visible",
            BrowserRequest::Wait { .. } => "wait",
            BrowserRequest::CurrentUrl => "current_url",
            BrowserRequest::Quit => "quit",
        }
    }
}

/// Response received from browser_server.js over stdout (one JSON line).
#[derive(Debug, Deserialize)]
pub struct BrowserResponse {
    pub ok: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub ready: Option<bool>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub root: Option<DomNode>,
}

fn millis(timeout: Duration) -> u64 {
    u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX)
}

/// A persistent browser session backed by browser_server.js.
///
/// Launches a long-lived Node.js process that keeps a Chromium page open.
/// Commands are sent as NDJSON over stdin, responses read from stdout.
pub struct BrowserSession {
    child: Child,
    stdin: ChildStdin,
    reader: BufReader<ChildStdout>,
    last_url: Option<String>,
}

impl BrowserSession {
    /// Spawn `node <script>` and wait for its ready signal.
    pub fn launch(script: &str) -> Result<Self, DriverError> {
        let mut child = Command::new("node")
            .arg(script)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| DriverError::SubprocessSpawn {
                script: script.to_string(),
                source: e,
            })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| DriverError::SessionIo("failed to capture driver stdin".into()))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| DriverError::SessionIo("failed to capture driver stdout".into()))?;

        let mut session = BrowserSession {
            child,
            stdin,
            reader: BufReader::new(stdout),
            last_url: None,
        };

        let ready = session.read_response("ready signal")?;
        if !ready.ok || ready.ready != Some(true) {
            return Err(DriverError::command(
                "launch",
                "did not receive ready signal from browser_server.js",
            ));
        }

        debug!(script, "Browser session ready");
        Ok(session)
    }

    fn read_response(&mut self, context: &str) -> Result<BrowserResponse, DriverError> {
        let mut line = String::new();
        self.reader
            .read_line(&mut line)
            .map_err(|e| DriverError::SessionIo(format!("failed to read {}: {}", context, e)))?;

        if line.trim().is_empty() {
            return Err(DriverError::SessionIo(format!(
                "empty {} from browser_server.js (process may have died)",
                context
            )));
        }

        serde_json::from_str(line.trim()).map_err(|e| DriverError::JsonParse {
            context: context.to_string(),
            source: e,
        })
    }

    fn send(&mut self, request: &BrowserRequest) -> Result<BrowserResponse, DriverError> {
        let json = serde_json::to_string(request).map_err(|e| DriverError::JsonSerialize {
            context: request.name().to_string(),
            source: e,
        })?;

        writeln!(self.stdin, "{}", json)
            .and_then(|_| self.stdin.flush())
            .map_err(|e| DriverError::SessionIo(format!("failed to write to driver: {}", e)))?;

        self.read_response(request.name())
    }

    /// Send a request and verify it succeeded.
    fn send_ok(&mut self, request: &BrowserRequest) -> Result<BrowserResponse, DriverError> {
        let response = self.send(request)?;
        if !response.ok {
            return Err(DriverError::command(
                request.name(),
                response.error.unwrap_or_else(|| "unknown error".into()),
            ));
        }
        Ok(response)
    }

    /// Last URL the driver reported, without a round trip.
    pub fn last_url(&self) -> Option<&str> {
        self.last_url.as_deref()
    }

    pub fn quit(&mut self) {
        if let Err(e) = self.send(&BrowserRequest::Quit) {
            debug!(error = %e, "Driver quit request failed");
        }
        if let Err(e) = self.child.wait() {
            warn!(error = %e, "Failed to reap browser_server.js");
        }
    }
}

impl AutomationDriver for BrowserSession {
    fn load_surface(&mut self, url: &str, timeout: Duration) -> Result<(), DriverError> {
        let response = self.send_ok(&BrowserRequest::Navigate {
            url: url.to_string(),
            timeout_ms: millis(timeout),
        })?;
        self.last_url = Some(response.url.unwrap_or_else(|| url.to_string()));
        Ok(())
    }

    fn content_snapshot(&mut self) -> Result<Snapshot, DriverError> {
        let response = self.send_ok(&BrowserRequest::Snapshot)?;
        let root = response.root.ok_or_else(|| DriverError::MissingData {
            command: "snapshot".into(),
            field: "root".into(),
        })?;

        let url = response
            .url
            .or_else(|| self.last_url.clone())
            .unwrap_or_default();
        self.last_url = Some(url.clone());

        Ok(Snapshot {
            url,
            title: response.title.unwrap_or_default(),
            root,
        })
    }

    fn click(&mut self, selector: &str, timeout: Duration) -> Result<(), DriverError> {
        self.send_ok(&BrowserRequest::Click {
            selector: selector.to_string(),
            timeout_ms: millis(timeout),
        })?;
        Ok(())
    }

    fn fill(&mut self, selector: &str, value: &str, timeout: Duration) -> Result<(), DriverError> {
        self.send_ok(&BrowserRequest::Fill {
            selector: selector.to_string(),
            value: value.to_string(),
            timeout_ms: millis(timeout),
        })?;
        Ok(())
    }

    fn wait_for_visible(&mut self, target: &str, timeout: Duration) -> Result<(), DriverError> {
        self.send_ok(&BrowserRequest::WaitVisible {
            target: target.to_string(),
            timeout_ms: millis(timeout),
        })?;
        Ok(())
    }

    fn current_url(&mut self) -> Result<String, DriverError> {
        let response = self.send_ok(&BrowserRequest::CurrentUrl)?;
        let url = response.url.ok_or_else(|| DriverError::MissingData {
            command: "current_url".into(),
            field: "url".into(),
        })?;
        self.last_url = Some(url.clone());
        Ok(url)
    }

    fn settle(&mut self, pause: Duration) -> Result<(), DriverError> {
        if pause.is_zero() {
            return Ok(());
        }
        self.send_ok(&BrowserRequest::Wait {
            duration_ms: millis(pause),
        })?;
        Ok(())
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        self.quit();
    }
}
