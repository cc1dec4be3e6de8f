//! Request-serving thread and outbound client calls.
//!
//! [`NetworkService::start`] binds a TCP listener on an ephemeral port and
//! spawns a background thread that speaks just enough HTTP/1.1 for the
//! engine's needs:
//!
//! - `GET /` becomes a [`Protocol::Read`] request with an empty body
//! - `POST /` becomes a [`Protocol::Write`] request carrying the body
//! - anything else is answered `405` without involving the frame loop
//!
//! Connections are handled one at a time, so at most one request is ever in
//! flight. For each request the thread hands an [`InboundRequest`] to the
//! frame loop over a single-slot channel and waits for the reply for at most
//! the configured response timeout. No reply in time means `504`.
//!
//! The frame loop side calls [`NetworkService::collect`] once per iteration,
//! raises a Network event for each collected request and answers it with
//! [`NetworkService::serve`].

use std::io::{self, BufRead, BufReader, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError, bounded, unbounded};
use log::{debug, info, warn};

use crate::error::{EngineError, EngineResult};
use crate::events::Protocol;

const ACCEPT_POLL: Duration = Duration::from_millis(5);
const IO_TIMEOUT: Duration = Duration::from_secs(1);
const CLIENT_TIMEOUT: Duration = Duration::from_secs(5);
const MAX_BODY_BYTES: usize = 1 << 20;

/// One accepted request waiting for the frame loop.
#[derive(Debug)]
pub struct InboundRequest {
    pub protocol: Protocol,
    pub body: String,
    pub client: SocketAddr,
    reply: Sender<String>,
}

enum NetworkCmd {
    Shutdown,
}

pub struct NetworkService {
    port: u16,
    tx_cmd: Sender<NetworkCmd>,
    rx_request: Receiver<InboundRequest>,
    handle: Option<JoinHandle<()>>,
    pending: Option<InboundRequest>,
    last_request: String,
    last_response: String,
    last_client: Option<SocketAddr>,
}

impl NetworkService {
    /// Binds `bind_address` on an ephemeral port and starts serving.
    pub fn start(bind_address: &str, response_timeout: Duration) -> EngineResult<Self> {
        let listener = TcpListener::bind((bind_address, 0))
            .map_err(|e| EngineError::resource(format!("failed to start network: {e}")))?;
        listener.set_nonblocking(true)?;
        let port = listener.local_addr()?.port();

        let (tx_cmd, rx_cmd) = unbounded::<NetworkCmd>();
        let (tx_request, rx_request) = bounded::<InboundRequest>(1);

        let handle = std::thread::Builder::new()
            .name("flat-network".into())
            .spawn(move || serve_loop(listener, rx_cmd, tx_request, response_timeout))?;

        info!("Network listening on {}:{}", bind_address, port);
        Ok(Self {
            port,
            tx_cmd,
            rx_request,
            handle: Some(handle),
            pending: None,
            last_request: String::new(),
            last_response: String::new(),
            last_client: None,
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Takes the next request handed over by the serving thread, if any.
    ///
    /// The request becomes the pending one that [`serve`](Self::serve)
    /// answers. Returns its direction so the caller can raise the event.
    pub fn collect(&mut self) -> Option<Protocol> {
        match self.rx_request.try_recv() {
            Ok(request) => {
                debug!(
                    "Network request {:?} from {} ({} bytes)",
                    request.protocol,
                    request.client,
                    request.body.len()
                );
                let protocol = request.protocol;
                self.last_request = request.body.clone();
                self.last_client = Some(request.client);
                if self.pending.replace(request).is_some() {
                    warn!("Unanswered network request dropped");
                }
                Some(protocol)
            }
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    /// Answers the pending request.
    pub fn serve(&mut self, body: &str) -> EngineResult<()> {
        let request = self
            .pending
            .take()
            .ok_or_else(|| EngineError::validation("no network request to serve"))?;
        self.last_response = body.to_string();
        if request.reply.send(body.to_string()).is_err() {
            warn!("Network request from {} timed out before it was served", request.client);
        }
        Ok(())
    }

    /// Body of the most recent request.
    pub fn request(&self) -> &str {
        &self.last_request
    }

    /// Body of the most recent response.
    pub fn response(&self) -> &str {
        &self.last_response
    }

    /// Address of the most recent client.
    pub fn client(&self) -> Option<SocketAddr> {
        self.last_client
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Stops the serving thread and waits for it.
    pub fn destroy(&mut self) {
        self.pending = None;
        if let Some(handle) = self.handle.take() {
            let _ = self.tx_cmd.send(NetworkCmd::Shutdown);
            if handle.join().is_err() {
                warn!("Network thread panicked");
            }
            info!("Network on port {} stopped", self.port);
        }
    }
}

impl Drop for NetworkService {
    fn drop(&mut self) {
        self.destroy();
    }
}

fn serve_loop(
    listener: TcpListener,
    rx_cmd: Receiver<NetworkCmd>,
    tx_request: Sender<InboundRequest>,
    response_timeout: Duration,
) {
    loop {
        match rx_cmd.try_recv() {
            Ok(NetworkCmd::Shutdown) | Err(TryRecvError::Disconnected) => break,
            Err(TryRecvError::Empty) => {}
        }
        match listener.accept() {
            Ok((stream, client)) => {
                if let Err(e) = handle_connection(stream, client, &tx_request, response_timeout) {
                    warn!("Network connection from {} failed: {}", client, e);
                }
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => std::thread::sleep(ACCEPT_POLL),
            Err(e) => {
                warn!("Network accept failed: {}", e);
                std::thread::sleep(ACCEPT_POLL);
            }
        }
    }
}

fn handle_connection(
    stream: TcpStream,
    client: SocketAddr,
    tx_request: &Sender<InboundRequest>,
    response_timeout: Duration,
) -> io::Result<()> {
    stream.set_nonblocking(false)?;
    stream.set_read_timeout(Some(IO_TIMEOUT))?;
    stream.set_write_timeout(Some(IO_TIMEOUT))?;
    let mut reader = BufReader::new(stream.try_clone()?);
    let mut stream = stream;

    let (method, path, body) = match read_request(&mut reader)? {
        Some(parts) => parts,
        None => return write_response(&mut stream, 400, "Bad Request", ""),
    };

    let protocol = match (method.as_str(), path.as_str()) {
        ("GET", "/") => Protocol::Read,
        ("POST", "/") => Protocol::Write,
        (_, "/") => return write_response(&mut stream, 405, "Method Not Allowed", ""),
        _ => return write_response(&mut stream, 404, "Not Found", ""),
    };

    let (reply_tx, reply_rx) = bounded::<String>(1);
    let request = InboundRequest {
        protocol,
        body,
        client,
        reply: reply_tx,
    };
    if tx_request.send_timeout(request, response_timeout).is_err() {
        return write_response(&mut stream, 504, "Gateway Timeout", "");
    }

    match reply_rx.recv_timeout(response_timeout) {
        Ok(body) => write_response(&mut stream, 200, "OK", &body),
        Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {
            warn!("Network request from {} was not served in time", client);
            write_response(&mut stream, 504, "Gateway Timeout", "")
        }
    }
}

/// Reads the request line, headers and body. `None` for malformed input.
fn read_request(reader: &mut impl BufRead) -> io::Result<Option<(String, String, String)>> {
    let mut line = String::new();
    if reader.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    let mut parts = line.split_whitespace();
    let (Some(method), Some(path)) = (parts.next(), parts.next()) else {
        return Ok(None);
    };
    let (method, path) = (method.to_ascii_uppercase(), path.to_string());

    let mut content_length = 0usize;
    loop {
        line.clear();
        if reader.read_line(&mut line)? == 0 {
            break;
        }
        let header = line.trim_end();
        if header.is_empty() {
            break;
        }
        if let Some((name, value)) = header.split_once(':')
            && name.trim().eq_ignore_ascii_case("content-length")
        {
            match value.trim().parse::<usize>() {
                Ok(len) if len <= MAX_BODY_BYTES => content_length = len,
                _ => return Ok(None),
            }
        }
    }

    let mut body = vec![0u8; content_length];
    reader.read_exact(&mut body)?;
    Ok(Some((method, path, String::from_utf8_lossy(&body).into_owned())))
}

fn write_response(stream: &mut TcpStream, status: u16, reason: &str, body: &str) -> io::Result<()> {
    write!(
        stream,
        "HTTP/1.1 {status} {reason}\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    )?;
    stream.flush()
}

/// `GET http://address:port/`. Returns the body on `200`, an empty string
/// on any other outcome.
pub fn read(address: &str, port: u16) -> String {
    outbound(address, port, None)
}

/// `POST http://address:port/` with a `text/plain` body. Returns the
/// response body on `200`, an empty string on any other outcome.
pub fn write(address: &str, port: u16, body: &str) -> String {
    outbound(address, port, Some(body))
}

fn outbound(address: &str, port: u16, body: Option<&str>) -> String {
    let url = format!("http://{address}:{port}/");
    let client = match reqwest::blocking::Client::builder()
        .timeout(CLIENT_TIMEOUT)
        .build()
    {
        Ok(client) => client,
        Err(e) => {
            warn!("Failed to build HTTP client: {}", e);
            return String::new();
        }
    };
    let request = match body {
        Some(body) => client
            .post(&url)
            .header("Content-Type", "text/plain")
            .body(body.to_string()),
        None => client.get(&url),
    };
    match request.send() {
        Ok(response) if response.status() == reqwest::StatusCode::OK => {
            response.text().unwrap_or_default()
        }
        Ok(response) => {
            warn!("{} answered {}", url, response.status());
            String::new()
        }
        Err(e) => {
            warn!("Request to {} failed: {}", url, e);
            String::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn parses_post_with_body() {
        let raw = "POST / HTTP/1.1\r\nHost: x\r\nContent-Length: 5\r\n\r\nhello";
        let (method, path, body) = read_request(&mut Cursor::new(raw)).unwrap().unwrap();
        assert_eq!(method, "POST");
        assert_eq!(path, "/");
        assert_eq!(body, "hello");
    }

    #[test]
    fn parses_get_without_body() {
        let raw = "GET / HTTP/1.1\r\nHost: x\r\n\r\n";
        let (method, _, body) = read_request(&mut Cursor::new(raw)).unwrap().unwrap();
        assert_eq!(method, "GET");
        assert!(body.is_empty());
    }

    #[test]
    fn rejects_garbage_request_line() {
        assert!(read_request(&mut Cursor::new("\r\n")).unwrap().is_none());
        assert!(read_request(&mut Cursor::new("")).unwrap().is_none());
    }

    #[test]
    fn serve_without_request_is_rejected() {
        let mut service = NetworkService::start("127.0.0.1", Duration::from_millis(100)).unwrap();
        assert!(service.running());
        assert!(matches!(service.serve("x"), Err(EngineError::Validation(_))));
        service.destroy();
        assert!(!service.running());
    }
}
