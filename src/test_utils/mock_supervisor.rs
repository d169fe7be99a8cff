//! Minimal HTTP/1.1 supervisor stand-in.
//!
//! Accepts any number of connections, serves keep-alive requests on each,
//! answers with a status chosen per path and forwards every request to the
//! test through a channel. Redirect statuses carry a `Location` header so
//! clients see a well-formed 3xx.

use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, mpsc};
use std::thread;
use std::time::Duration;

/// One request as received by the mock.
#[derive(Debug)]
pub struct CapturedRequest {
    pub method: String,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl CapturedRequest {
    /// Header value by lower-case name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

type Responder = Arc<dyn Fn(&str) -> u16 + Send + Sync>;

pub struct MockSupervisor {
    port: u16,
    requests: mpsc::Receiver<CapturedRequest>,
}

impl MockSupervisor {
    /// Start serving on an ephemeral local port, answering each request
    /// with `respond(path)`.
    ///
    /// # Panics
    ///
    /// Panics if no local port can be bound.
    pub fn start<F>(respond: F) -> Self
    where
        F: Fn(&str) -> u16 + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind mock supervisor");
        let port = listener.local_addr().expect("listener has address").port();
        let (tx, requests) = mpsc::channel();
        let respond: Responder = Arc::new(respond);

        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(stream) = stream else {
                    return;
                };
                let tx = tx.clone();
                let respond = Arc::clone(&respond);
                thread::spawn(move || serve_connection(stream, &respond, &tx));
            }
        });

        Self { port, requests }
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Next request received, waiting at most `timeout`.
    pub fn next_request(&self, timeout: Duration) -> Option<CapturedRequest> {
        self.requests.recv_timeout(timeout).ok()
    }
}

fn serve_connection(stream: TcpStream, respond: &Responder, tx: &mpsc::Sender<CapturedRequest>) {
    let Ok(mut writer) = stream.try_clone() else {
        return;
    };
    let mut reader = BufReader::new(stream);
    while let Some(request) = read_request(&mut reader) {
        let status = respond(&request.path);
        let mut response = format!("HTTP/1.1 {status} Mock\r\n");
        if (300..400).contains(&status) {
            response.push_str("Location: /elsewhere\r\n");
        }
        response.push_str("Content-Length: 0\r\n\r\n");
        if writer.write_all(response.as_bytes()).is_err() {
            return;
        }
        if tx.send(request).is_err() {
            return;
        }
    }
}

fn read_request(reader: &mut BufReader<TcpStream>) -> Option<CapturedRequest> {
    let mut request_line = String::new();
    if reader.read_line(&mut request_line).ok()? == 0 {
        return None;
    }
    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or_default().to_owned();
    let path = parts.next().unwrap_or_default().to_owned();

    let mut headers = Vec::new();
    let mut content_length = 0usize;
    loop {
        let mut line = String::new();
        reader.read_line(&mut line).ok()?;
        let line = line.trim();
        if line.is_empty() {
            break;
        }
        if let Some((key, value)) = line.split_once(':') {
            let key = key.trim().to_lowercase();
            let value = value.trim().to_owned();
            if key == "content-length" {
                content_length = value.parse().unwrap_or(0);
            }
            headers.push((key, value));
        }
    }

    let mut body = vec![0u8; content_length];
    reader.read_exact(&mut body).ok()?;
    Some(CapturedRequest {
        method,
        path,
        headers,
        body: String::from_utf8_lossy(&body).into_owned(),
    })
}
