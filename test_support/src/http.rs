//! Lightweight HTTP fixtures for tests.
//!
//! Provides helpers for spawning simple HTTP servers that answer a scripted
//! sequence of responses. The listener is configured in non-blocking mode and
//! guarded by a deadline so hung clients cannot stall the test suite.

use std::{
    io::{self, Read, Write},
    net::{SocketAddr, TcpListener, TcpStream},
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    thread,
    time::{Duration, Instant},
};

/// A canned HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// Status code.
    pub status: u16,
    /// Response body.
    pub body: Vec<u8>,
}

impl Reply {
    /// `200 OK` with `body`.
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Self {
            status: 200,
            body: body.into(),
        }
    }

    /// An arbitrary status with a short text body.
    pub fn status(status: u16) -> Self {
        Self {
            status,
            body: format!("status {status}").into_bytes(),
        }
    }
}

/// Join handle for a spawned HTTP fixture.
///
/// The handle joins the underlying thread when dropped to avoid leaking
/// background work if a test aborts early.
#[derive(Debug)]
#[must_use]
pub struct HttpServer {
    handle: Option<thread::JoinHandle<()>>,
    addr: SocketAddr,
    stop: Arc<AtomicBool>,
    hits: Arc<AtomicUsize>,
}

impl HttpServer {
    /// Base URL of the server, without a trailing slash.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Number of requests answered so far.
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    /// Stop the server and propagate any panic from its thread.
    pub fn join(mut self) -> thread::Result<()> {
        self.stop.store(true, Ordering::SeqCst);
        self.handle.take().map_or(Ok(()), thread::JoinHandle::join)
    }
}

impl Drop for HttpServer {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            drop(handle.join());
        }
    }
}

/// Spawn a server that returns `200 OK` with `body` for every request.
pub fn spawn_http_server(body: impl Into<Vec<u8>>) -> HttpServer {
    spawn_scripted_server(vec![Reply::ok(body)])
}

/// Spawn a server answering requests with `replies` in order.
///
/// Once the script is exhausted the last reply is repeated.
///
/// # Panics
///
/// Panics if the loopback listener cannot be bound.
pub fn spawn_scripted_server(replies: Vec<Reply>) -> HttpServer {
    let listener = TcpListener::bind(("127.0.0.1", 0)).expect("bind HTTP listener");
    listener
        .set_nonblocking(true)
        .expect("set listener non-blocking");
    let addr = listener.local_addr().expect("local addr");
    let stop = Arc::new(AtomicBool::new(false));
    let hits = Arc::new(AtomicUsize::new(0));
    let handle = {
        let stop = Arc::clone(&stop);
        let hits = Arc::clone(&hits);
        thread::spawn(move || run_http_server(&listener, &replies, &stop, &hits))
    };
    HttpServer {
        handle: Some(handle),
        addr,
        stop,
        hits,
    }
}

fn run_http_server(
    listener: &TcpListener,
    replies: &[Reply],
    stop: &AtomicBool,
    hits: &AtomicUsize,
) {
    let deadline = Instant::now() + Duration::from_secs(30);
    while !stop.load(Ordering::SeqCst) && Instant::now() < deadline {
        match listener.accept() {
            Ok((mut stream, _)) => {
                if stream.set_nonblocking(true).is_err() {
                    continue;
                }
                let read_deadline = Instant::now() + Duration::from_millis(500);
                if read_request(&mut stream, read_deadline) == 0 {
                    continue;
                }
                let index = hits.fetch_add(1, Ordering::SeqCst);
                let reply = replies.get(index).or_else(|| replies.last());
                if let Some(reply) = reply {
                    write_response(&mut stream, reply);
                }
            }
            Err(err) if err.kind() == io::ErrorKind::WouldBlock => {
                thread::sleep(Duration::from_millis(10));
            }
            Err(err) => panic!("failed to accept connection: {err}"),
        }
    }
}

fn read_request(stream: &mut TcpStream, deadline: Instant) -> usize {
    let mut buf = [0u8; 1024];
    loop {
        if Instant::now() >= deadline {
            return 0;
        }
        match stream.read(&mut buf) {
            Ok(n) => return n,
            Err(err) if err.kind() == io::ErrorKind::WouldBlock => {
                thread::sleep(Duration::from_millis(5));
            }
            Err(_) => return 0,
        }
    }
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        404 => "Not Found",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Status",
    }
}

fn write_response(stream: &mut TcpStream, reply: &Reply) {
    let head = format!(
        "HTTP/1.1 {} {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        reply.status,
        reason(reply.status),
        reply.body.len(),
    );
    // The client may already have gone away; the outcome is irrelevant.
    drop(stream.set_nonblocking(false));
    drop(stream.write_all(head.as_bytes()));
    drop(stream.write_all(&reply.body));
    drop(stream.flush());
}
