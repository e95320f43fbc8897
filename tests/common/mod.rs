//! Shared utilities for integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use market_cache::resilience::{ResilienceError, RetryObserver};
use market_cache::scheduler::TaskObserver;
use market_cache::SnapshotSource;

/// Start a programmable HTTP backend on an ephemeral port.
///
/// `f` receives the request target (path and query) and returns the status
/// code and body to send back.
pub async fn start_programmable_backend<F, Fut>(f: F) -> SocketAddr
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    tokio::spawn(async move {
                        let target = read_request_target(&mut socket).await;
                        let (status, body) = f(target).await;
                        let status_text = match status {
                            200 => "200 OK",
                            404 => "404 Not Found",
                            429 => "429 Too Many Requests",
                            500 => "500 Internal Server Error",
                            502 => "502 Bad Gateway",
                            503 => "503 Service Unavailable",
                            504 => "504 Gateway Timeout",
                            other => panic!("unsupported status {other}"),
                        };

                        let response = format!(
                            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status_text,
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

async fn read_request_target(socket: &mut tokio::net::TcpStream) -> String {
    let mut head = Vec::new();
    let mut buf = [0u8; 1024];
    while !head.windows(4).any(|w| w == b"\r\n\r\n") {
        match socket.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(n) => head.extend_from_slice(&buf[..n]),
        }
    }
    String::from_utf8_lossy(&head)
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .unwrap_or_default()
        .to_string()
}

/// A reqwest client that ignores proxy environment variables.
pub fn direct_client() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .pool_max_idle_per_host(0)
        .build()
        .unwrap()
}

/// How a scripted fetch should fail.
#[derive(Debug, Clone, Copy)]
pub enum Failure {
    /// Retryable (connection reset).
    Transient,
    /// Not retryable (malformed payload).
    Permanent,
}

impl Failure {
    fn error(self, resource: &str) -> io::Error {
        match self {
            Failure::Transient => io::Error::new(io::ErrorKind::ConnectionReset, format!("{resource}: connection reset")),
            Failure::Permanent => io::Error::new(io::ErrorKind::InvalidData, format!("{resource}: malformed payload")),
        }
    }
}

/// Scripted [`SnapshotSource`].
///
/// Records are `100.0 * n` for the n-th records call; the aggregate is the
/// number of the aggregate call that produced it.
#[derive(Default)]
pub struct ScriptedSource {
    records_calls: AtomicU32,
    aggregate_calls: AtomicU32,
    records_failure: Mutex<Option<Failure>>,
    aggregate_failure: Mutex<Option<Failure>>,
    records_delay: Mutex<Duration>,
    omitted_ids: Mutex<Vec<String>>,
    panic_records: AtomicBool,
    in_flight: AtomicU32,
    max_in_flight: AtomicU32,
}

impl ScriptedSource {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_records(&self, failure: Option<Failure>) {
        *self.records_failure.lock().unwrap() = failure;
    }

    pub fn fail_aggregate(&self, failure: Option<Failure>) {
        *self.aggregate_failure.lock().unwrap() = failure;
    }

    pub fn set_records_delay(&self, delay: Duration) {
        *self.records_delay.lock().unwrap() = delay;
    }

    /// Leave `id` out of every following records response.
    pub fn omit_id(&self, id: &str) {
        self.omitted_ids.lock().unwrap().push(id.to_string());
    }

    pub fn panic_on_records(&self, enabled: bool) {
        self.panic_records.store(enabled, Ordering::SeqCst);
    }

    pub fn records_calls(&self) -> u32 {
        self.records_calls.load(Ordering::SeqCst)
    }

    pub fn aggregate_calls(&self) -> u32 {
        self.aggregate_calls.load(Ordering::SeqCst)
    }

    /// Highest number of records fetches observed running at once.
    pub fn max_in_flight(&self) -> u32 {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SnapshotSource for ScriptedSource {
    type Record = f64;
    type Aggregate = u32;
    type Error = io::Error;

    async fn fetch_records(&self, ids: &[String]) -> Result<HashMap<String, f64>, io::Error> {
        let n = self.records_calls.fetch_add(1, Ordering::SeqCst) + 1;
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(running, Ordering::SeqCst);

        let delay = *self.records_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.panic_records.load(Ordering::SeqCst) {
            panic!("records fetch blew up");
        }
        if let Some(failure) = *self.records_failure.lock().unwrap() {
            return Err(failure.error("records"));
        }
        let omitted = self.omitted_ids.lock().unwrap().clone();
        Ok(ids
            .iter()
            .filter(|id| !omitted.contains(id))
            .map(|id| (id.clone(), 100.0 * n as f64))
            .collect())
    }

    async fn fetch_aggregate(&self) -> Result<u32, io::Error> {
        let n = self.aggregate_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(failure) = *self.aggregate_failure.lock().unwrap() {
            return Err(failure.error("aggregate"));
        }
        Ok(n)
    }
}

/// Records every retry notification as `(attempt, delay)`.
#[derive(Default)]
pub struct RecordingRetryObserver {
    events: Mutex<Vec<(u32, Duration)>>,
}

impl RecordingRetryObserver {
    pub fn events(&self) -> Vec<(u32, Duration)> {
        self.events.lock().unwrap().clone()
    }

    pub fn delays(&self) -> Vec<Duration> {
        self.events().into_iter().map(|(_, delay)| delay).collect()
    }
}

impl<E> RetryObserver<E> for RecordingRetryObserver {
    fn on_retry(&self, attempt: u32, _error: &ResilienceError<E>, delay: Duration) {
        self.events.lock().unwrap().push((attempt, delay));
    }
}

/// Counts scheduler events.
#[derive(Default)]
pub struct RecordingTaskObserver {
    pub starts: AtomicU32,
    pub completes: AtomicU32,
    pub skips: AtomicU32,
    pub stops: AtomicU32,
    pub failures: AtomicU32,
}

impl RecordingTaskObserver {
    pub fn starts(&self) -> u32 {
        self.starts.load(Ordering::SeqCst)
    }

    pub fn skips(&self) -> u32 {
        self.skips.load(Ordering::SeqCst)
    }

    pub fn stops(&self) -> u32 {
        self.stops.load(Ordering::SeqCst)
    }

    pub fn completes(&self) -> u32 {
        self.completes.load(Ordering::SeqCst)
    }

    pub fn failures(&self) -> u32 {
        self.failures.load(Ordering::SeqCst)
    }
}

impl TaskObserver for RecordingTaskObserver {
    fn on_run_start(&self, _task: &str) {
        self.starts.fetch_add(1, Ordering::SeqCst);
    }

    fn on_run_complete(&self, _task: &str, _elapsed: Duration) {
        self.completes.fetch_add(1, Ordering::SeqCst);
    }

    fn on_run_failed(&self, _task: &str) {
        self.failures.fetch_add(1, Ordering::SeqCst);
    }

    fn on_skip(&self, _task: &str) {
        self.skips.fetch_add(1, Ordering::SeqCst);
    }

    fn on_stopped(&self, _task: &str) {
        self.stops.fetch_add(1, Ordering::SeqCst);
    }
}
