//! Shared helpers for urlimport integration tests.
//!
//! [`TestServer`] is a small single-threaded HTTP responder serving fixed
//! bodies, standing in for the static file server a module root usually is.
//! [`CliTestContext`] runs the built `urlimport` binary in a scratch
//! directory.

use anyhow::{Context, Result, bail};
use std::collections::HashMap;
use std::fmt;
use std::io::{BufRead, BufReader, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use tempfile::TempDir;

type Routes = Arc<Mutex<HashMap<String, (u16, Vec<u8>)>>>;

/// HTTP server answering `GET` requests from a route table.
pub struct TestServer {
    addr: SocketAddr,
    routes: Routes,
    requests: Arc<Mutex<Vec<String>>>,
    stop: Arc<AtomicBool>,
}

impl TestServer {
    /// Bind to an ephemeral port on 127.0.0.1 and start serving.
    pub fn start() -> Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").context("Failed to bind test server")?;
        let addr = listener.local_addr()?;

        let server = Self {
            addr,
            routes: Arc::default(),
            requests: Arc::default(),
            stop: Arc::default(),
        };

        let routes = server.routes.clone();
        let requests = server.requests.clone();
        let stop = server.stop.clone();
        thread::spawn(move || {
            for stream in listener.incoming() {
                if stop.load(Ordering::SeqCst) {
                    break;
                }
                if let Ok(stream) = stream {
                    let _ = handle_connection(stream, &routes, &requests);
                }
            }
        });

        Ok(server)
    }

    /// Base URL, without a trailing slash.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Serve `body` with status 200 at `path`.
    pub fn serve(&self, path: &str, body: impl Into<Vec<u8>>) {
        self.serve_status(path, 200, body);
    }

    pub fn serve_status(&self, path: &str, status: u16, body: impl Into<Vec<u8>>) {
        lock(&self.routes).insert(path.to_string(), (status, body.into()));
    }

    /// Serve an HTML index at `/` linking each `<name>.py`.
    pub fn serve_listing(&self, modules: &[&str]) {
        let links: String = modules
            .iter()
            .map(|name| format!("<li><a href=\"{name}.py\">{name}.py</a></li>\n"))
            .collect();
        self.serve(
            "/",
            format!("<html><body><h1>Directory listing</h1><ul>\n{links}</ul></body></html>\n"),
        );
    }

    /// Serve module source at `/<name>.py`.
    pub fn serve_module(&self, name: &str, source: &str) {
        self.serve(&format!("/{name}.py"), source);
    }

    /// Request paths received so far, in order.
    pub fn requests(&self) -> Vec<String> {
        lock(&self.requests).clone()
    }
}

impl fmt::Debug for TestServer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestServer").field("addr", &self.addr).finish()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        // Wake the accept loop so it sees the flag.
        let _ = TcpStream::connect(self.addr);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        403 => "Forbidden",
        404 => "Not Found",
        500 => "Internal Server Error",
        _ => "Unknown",
    }
}

fn handle_connection(
    mut stream: TcpStream,
    routes: &Routes,
    requests: &Mutex<Vec<String>>,
) -> std::io::Result<()> {
    let mut reader = BufReader::new(stream.try_clone()?);

    let mut request_line = String::new();
    reader.read_line(&mut request_line)?;
    loop {
        let mut header = String::new();
        let read = reader.read_line(&mut header)?;
        if read == 0 || header == "\r\n" || header == "\n" {
            break;
        }
    }

    let mut parts = request_line.split_whitespace();
    let (Some(_method), Some(path)) = (parts.next(), parts.next()) else {
        return Ok(());
    };
    lock(requests).push(path.to_string());

    let (status, body) = lock(routes)
        .get(path)
        .cloned()
        .unwrap_or_else(|| (404, b"Not Found".to_vec()));

    let head = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        status,
        reason(status),
        body.len()
    );
    stream.write_all(head.as_bytes())?;
    stream.write_all(&body)?;
    stream.flush()
}

/// Output of one CLI invocation.
#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandResult {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    pub fn assert_success(&self) {
        assert!(
            self.success(),
            "command failed with {:?}\nstdout:\n{}\nstderr:\n{}",
            self.exit_code,
            self.stdout,
            self.stderr
        );
    }

    pub fn assert_failure(&self) {
        assert!(
            !self.success(),
            "command unexpectedly succeeded\nstdout:\n{}",
            self.stdout
        );
    }

    pub fn assert_output_contains(&self, text: &str) {
        assert!(
            self.stdout.contains(text),
            "stdout does not contain {:?}\nstdout:\n{}\nstderr:\n{}",
            text,
            self.stdout,
            self.stderr
        );
    }

    pub fn assert_error_contains(&self, text: &str) {
        assert!(
            self.stderr.contains(text),
            "stderr does not contain {:?}\nstderr:\n{}",
            text,
            self.stderr
        );
    }

    /// Parse stdout as a JSON document.
    pub fn json(&self) -> Result<serde_json::Value> {
        serde_json::from_str(&self.stdout).context("stdout is not valid JSON")
    }
}

/// Path of the built CLI binary, honouring `URLIMPORT_BIN`.
pub fn cli_binary() -> Option<PathBuf> {
    if let Some(path) = std::env::var_os("URLIMPORT_BIN") {
        return Some(PathBuf::from(path));
    }

    let workspace = Path::new(env!("CARGO_MANIFEST_DIR")).join("../..");
    let exe = format!("urlimport{}", std::env::consts::EXE_SUFFIX);
    ["debug", "release"]
        .iter()
        .map(|profile| workspace.join("target").join(profile).join(&exe))
        .find(|path| path.is_file())
}

/// Whether the CLI binary has been built.
pub fn cli_tests_available() -> bool {
    cli_binary().is_some()
}

/// Scratch directory plus the CLI binary to run in it.
#[derive(Debug)]
pub struct CliTestContext {
    temp_dir: TempDir,
    binary: PathBuf,
}

impl CliTestContext {
    pub fn new() -> Result<Self> {
        let Some(binary) = cli_binary() else {
            bail!("urlimport binary not found; build it or set URLIMPORT_BIN");
        };
        Ok(Self {
            temp_dir: TempDir::new()?,
            binary,
        })
    }

    pub fn dir(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Write `urlimport.toml` into the scratch directory.
    pub fn write_config(&self, contents: &str) -> Result<()> {
        std::fs::write(self.dir().join("urlimport.toml"), contents)?;
        Ok(())
    }

    /// Run the CLI with `args` from the scratch directory.
    pub fn execute_cli_command(&self, args: &[&str]) -> Result<CommandResult> {
        let output = Command::new(&self.binary)
            .args(args)
            .current_dir(self.dir())
            .env("RUST_LOG", "warn")
            .env("NO_COLOR", "1")
            .output()
            .with_context(|| format!("Failed to run {}", self.binary.display()))?;

        Ok(CommandResult {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    fn get(url_path: &str, server: &TestServer) -> String {
        let mut stream = TcpStream::connect(server.addr).unwrap();
        write!(stream, "GET {url_path} HTTP/1.1\r\nHost: test\r\n\r\n").unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).unwrap();
        response
    }

    #[test]
    fn test_server_routes_and_logs() {
        let server = TestServer::start().unwrap();
        server.serve_listing(&["a"]);

        let response = get("/", &server);
        assert!(response.starts_with("HTTP/1.1 200 OK"));
        assert!(response.contains("a.py"));

        let response = get("/missing.py", &server);
        assert!(response.starts_with("HTTP/1.1 404 Not Found"));

        assert_eq!(server.requests(), vec!["/", "/missing.py"]);
    }
}
