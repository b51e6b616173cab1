use std::ffi::OsStr;
use std::io::{Read, Write};
use std::net::{Shutdown, TcpListener, TcpStream};
use std::path::Path;
use std::process::{Command, Output};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, mpsc};
use std::thread;
use std::time::Duration;

/// Request line, headers and body as the server received them.
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub head: String,
    pub body: Vec<u8>,
}

impl CapturedRequest {
    pub fn request_line(&self) -> &str {
        self.head.lines().next().unwrap_or_default()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.head.lines().skip(1).find_map(|line| {
            let (key, value) = line.split_once(':')?;
            key.trim()
                .eq_ignore_ascii_case(name)
                .then_some(value.trim())
        })
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

pub struct ServerHandle {
    shutdown: mpsc::Sender<()>,
    thread: Option<thread::JoinHandle<()>>,
    requests: Arc<Mutex<Vec<CapturedRequest>>>,
}

impl ServerHandle {
    /// Requests captured so far, in arrival order.
    ///
    /// # Errors
    ///
    /// Returns an error if a handler thread panicked while holding the log.
    pub fn requests(&self) -> Result<Vec<CapturedRequest>, String> {
        self.requests
            .lock()
            .map(|requests| requests.clone())
            .map_err(|err| format!("request log poisoned: {}", err))
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        let _send_result = self.shutdown.send(());
        if let Some(handle) = self.thread.take() {
            drop(handle.join());
        }
    }
}

/// Spawn a lightweight HTTP server for tests.
///
/// The n-th request is answered with `statuses[n % len]` (200 when empty).
///
/// # Errors
///
/// Returns an error if the listener cannot be created or configured.
pub fn spawn_http_server(statuses: &[u16]) -> Result<(String, ServerHandle), String> {
    let listener = TcpListener::bind("127.0.0.1:0")
        .map_err(|err| format!("bind test server failed: {}", err))?;
    let addr = listener
        .local_addr()
        .map_err(|err| format!("server addr failed: {}", err))?;
    listener
        .set_nonblocking(true)
        .map_err(|err| format!("set_nonblocking failed: {}", err))?;

    let (shutdown_tx, shutdown_rx) = mpsc::channel();
    let statuses: Arc<[u16]> = if statuses.is_empty() {
        Arc::from([200u16].as_slice())
    } else {
        Arc::from(statuses)
    };
    let counter = Arc::new(AtomicUsize::new(0));
    let requests = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&requests);

    let handle = thread::spawn(move || {
        loop {
            if shutdown_rx.try_recv().is_ok() {
                break;
            }

            match listener.accept() {
                Ok((stream, _)) => {
                    let index = counter.fetch_add(1, Ordering::SeqCst);
                    let status = statuses
                        .get(index.checked_rem(statuses.len()).unwrap_or(0))
                        .copied()
                        .unwrap_or(200);
                    let log = Arc::clone(&log);
                    thread::spawn(move || handle_client(stream, status, &log));
                }
                Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => {
                    thread::sleep(Duration::from_millis(5));
                }
                Err(_) => break,
            }
        }
    });

    Ok((
        format!("http://{}", addr),
        ServerHandle {
            shutdown: shutdown_tx,
            thread: Some(handle),
            requests,
        },
    ))
}

/// Like [`spawn_http_server`], but skips the test in sandboxes that forbid
/// binding sockets.
///
/// # Errors
///
/// Returns any other error from [`spawn_http_server`].
pub fn spawn_http_server_or_skip(
    statuses: &[u16],
) -> Result<Option<(String, ServerHandle)>, String> {
    match spawn_http_server(statuses) {
        Ok(result) => Ok(Some(result)),
        Err(err) if err.contains("Operation not permitted") => {
            eprintln!("Skipping e2e test: {}", err);
            Ok(None)
        }
        Err(err) => Err(err),
    }
}

fn handle_client(mut stream: TcpStream, status: u16, log: &Mutex<Vec<CapturedRequest>>) {
    if stream.set_nonblocking(false).is_err() {
        return;
    }
    let Some(request) = read_request(&mut stream) else {
        return;
    };
    if let Ok(mut requests) = log.lock() {
        requests.push(request);
    }

    let response = format!(
        "HTTP/1.1 {} {}\r\nContent-Length: 2\r\nConnection: close\r\n\r\nOK",
        status,
        reason(status)
    );
    if stream.write_all(response.as_bytes()).is_err() {
        return;
    }
    if stream.flush().is_err() {
        return;
    }
    drop(stream.shutdown(Shutdown::Both));
}

fn read_request(stream: &mut TcpStream) -> Option<CapturedRequest> {
    let mut data = Vec::new();
    let mut chunk = [0u8; 4096];
    let head_end = loop {
        let read = stream.read(&mut chunk).ok()?;
        if read == 0 {
            return None;
        }
        data.extend_from_slice(chunk.get(..read)?);
        if let Some(pos) = data.windows(4).position(|window| window == b"\r\n\r\n") {
            break pos;
        }
    };

    let head = String::from_utf8_lossy(data.get(..head_end)?).into_owned();
    let content_length = head
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(key, _)| key.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);

    let mut body = data.get(head_end.saturating_add(4)..)?.to_vec();
    while body.len() < content_length {
        let read = stream.read(&mut chunk).ok()?;
        if read == 0 {
            break;
        }
        body.extend_from_slice(chunk.get(..read)?);
    }

    Some(CapturedRequest { head, body })
}

const fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        504 => "Gateway Timeout",
        _ => "Status",
    }
}

/// Run the `apimon` binary in `workdir` and capture output.
///
/// # Errors
///
/// Returns an error if the binary cannot be executed.
pub fn run_apimon<I, S>(workdir: &Path, token: Option<&str>, args: I) -> Result<Output, String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let bin = apimon_bin()?;
    let mut command = Command::new(bin);
    command
        .args(args)
        .current_dir(workdir)
        .env("RUST_LOG", "error")
        .env_remove("APIMON_LOG")
        .env_remove("SYNAPSE_ACCESS_TOKEN")
        .env_remove("TOKEN");
    if let Some(token) = token {
        command.env("SYNAPSE_ACCESS_TOKEN", token);
    }
    command
        .output()
        .map_err(|err| format!("run apimon failed: {}", err))
}

fn apimon_bin() -> Result<String, String> {
    option_env!("CARGO_BIN_EXE_apimon").map_or_else(
        || Err("CARGO_BIN_EXE_apimon missing at compile time.".to_owned()),
        |path| Ok(path.to_owned()),
    )
}
