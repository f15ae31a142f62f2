use std::collections::{HashMap, VecDeque};
use std::io::{self, Read, Write};
use std::net::{Shutdown, TcpStream};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{mpsc, Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use serde_json::Value;
use tracing::{debug, info, warn};

use super::command::AuthorityCommand;
use super::error::AuthorityError;
use super::wire::{drain_complete_lines, encode_request_line, parse_wire_line, ResponseOutcome, WireLine};
use super::{Authority, EventSubscription};
use crate::config::{ClientConfig, MAX_RETRY_BACKOFF_MS};

const HANDSHAKE_READ_TIMEOUT: Duration = Duration::from_millis(100);
const READ_CHUNK_BYTES: usize = 4096;

type PendingReply = mpsc::Sender<Result<Value, AuthorityError>>;

enum EventRoute {
    Waiting,
    Open(mpsc::Sender<String>),
    Finished,
}

struct ConnectionShared {
    pending: Mutex<HashMap<u64, PendingReply>>,
    events: Mutex<EventRoute>,
    closed: AtomicBool,
}

impl ConnectionShared {
    fn lock_pending(&self) -> MutexGuard<'_, HashMap<u64, PendingReply>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_events(&self) -> MutexGuard<'_, EventRoute> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn route_line(&self, raw: &str) {
        match parse_wire_line(raw) {
            WireLine::Response { id, outcome } => {
                let result = match outcome {
                    ResponseOutcome::Ok(value) => Ok(value),
                    ResponseOutcome::Err(message) => Err(AuthorityError::Rejected(message)),
                };
                self.resolve(id, result);
            }
            WireLine::BrokenResponse { id, reason } => self.resolve(
                id,
                Err(AuthorityError::Protocol(format!(
                    "unreadable response body: {reason}"
                ))),
            ),
            WireLine::Event(payload) => self.forward_event(payload),
            WireLine::Control(payload) => debug!(payload = %payload, "authority_control_line"),
            WireLine::Unknown(line) => warn!(line = %line, "authority_unknown_line_dropped"),
        }
    }

    fn resolve(&self, id: u64, result: Result<Value, AuthorityError>) {
        match self.lock_pending().remove(&id) {
            Some(reply) => {
                let _ = reply.send(result);
            }
            None => warn!(id, "authority_response_without_request"),
        }
    }

    fn forward_event(&self, payload: String) {
        let mut route = self.lock_events();
        match &*route {
            EventRoute::Open(sender) => {
                if sender.send(payload).is_err() {
                    debug!("authority_event_subscriber_gone");
                    *route = EventRoute::Finished;
                }
            }
            EventRoute::Waiting => debug!("authority_event_before_subscription_dropped"),
            EventRoute::Finished => {}
        }
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        let pending = self.lock_pending().drain().collect::<Vec<_>>();
        for (_, reply) in pending {
            let _ = reply.send(Err(AuthorityError::Disconnected));
        }
        *self.lock_events() = EventRoute::Finished;
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

enum ReadOutcome {
    Line(String),
    NoData,
    Disconnected,
    IoError(io::Error),
}

struct LineReader {
    stream: TcpStream,
    read_buf: Vec<u8>,
    lines: VecDeque<String>,
}

impl LineReader {
    fn new(stream: TcpStream) -> Self {
        Self {
            stream,
            read_buf: Vec::new(),
            lines: VecDeque::new(),
        }
    }

    fn read_line(&mut self) -> ReadOutcome {
        loop {
            if let Some(line) = self.lines.pop_front() {
                return ReadOutcome::Line(line);
            }

            let mut chunk = [0u8; READ_CHUNK_BYTES];
            match self.stream.read(&mut chunk) {
                Ok(0) => return ReadOutcome::Disconnected,
                Ok(bytes_read) => {
                    self.read_buf.extend_from_slice(&chunk[..bytes_read]);
                    let mut drained = Vec::new();
                    drain_complete_lines(&mut self.read_buf, &mut drained);
                    self.lines.extend(drained);
                }
                Err(error)
                    if error.kind() == io::ErrorKind::WouldBlock
                        || error.kind() == io::ErrorKind::TimedOut =>
                {
                    return ReadOutcome::NoData
                }
                Err(error) if error.kind() == io::ErrorKind::Interrupted => {}
                Err(error) => return ReadOutcome::IoError(error),
            }
        }
    }
}

enum HandshakeFailure {
    Retry(String),
    Fatal(AuthorityError),
}

/// Authority reached over the loopback line protocol.
///
/// A reader thread owns the receive half: it hands each response to the
/// caller blocked on that request id and forwards pushed events to the open
/// subscription. Calls from several threads may be in flight at once.
pub struct TcpAuthority {
    addr: String,
    writer: Mutex<TcpStream>,
    shared: Arc<ConnectionShared>,
    next_id: AtomicU64,
}

impl TcpAuthority {
    /// Connects and waits for the ready line, retrying with capped
    /// exponential backoff until the configured connect timeout.
    pub fn connect(config: &ClientConfig) -> Result<Self, AuthorityError> {
        let addr = config.authority_addr();
        let deadline = Instant::now() + config.connect_timeout();
        let retry_base = config.retry_base();
        let mut attempt = 0u32;
        let mut last_failure = "no connection attempt completed".to_string();

        while Instant::now() < deadline {
            match TcpStream::connect(addr.as_str()) {
                Ok(stream) => match wait_for_ready(stream, deadline) {
                    Ok(reader) => return Self::from_ready_reader(addr, reader),
                    Err(HandshakeFailure::Retry(reason)) => last_failure = reason,
                    Err(HandshakeFailure::Fatal(error)) => return Err(error),
                },
                Err(error) => last_failure = error.to_string(),
            }

            let shift = attempt.min(8);
            let backoff_ms = (retry_base.as_millis() as u64)
                .saturating_mul(1u64 << shift)
                .min(MAX_RETRY_BACKOFF_MS);
            let sleep_for = Duration::from_millis(backoff_ms.max(1));
            if Instant::now() + sleep_for >= deadline {
                break;
            }
            debug!(attempt, backoff_ms, reason = %last_failure, "authority_connect_retry");
            thread::sleep(sleep_for);
            attempt = attempt.saturating_add(1);
        }

        Err(AuthorityError::Unreachable {
            addr,
            reason: last_failure,
        })
    }

    fn from_ready_reader(addr: String, reader: LineReader) -> Result<Self, AuthorityError> {
        let writer = reader.stream.try_clone()?;
        let shared = Arc::new(ConnectionShared {
            pending: Mutex::new(HashMap::new()),
            events: Mutex::new(EventRoute::Waiting),
            closed: AtomicBool::new(false),
        });

        let reader_shared = Arc::clone(&shared);
        thread::Builder::new()
            .name("authority-reader".to_string())
            .spawn(move || read_loop(reader, reader_shared))?;

        info!(addr = %addr, "authority_connected");
        Ok(Self {
            addr,
            writer: Mutex::new(writer),
            shared,
            next_id: AtomicU64::new(1),
        })
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    pub fn is_connected(&self) -> bool {
        !self.shared.is_closed()
    }

    fn send_line(&self, line: &str) -> io::Result<()> {
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
        writer.flush()
    }
}

impl Authority for TcpAuthority {
    fn call(&self, command: &AuthorityCommand) -> Result<Value, AuthorityError> {
        if self.shared.is_closed() {
            return Err(AuthorityError::Disconnected);
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let line = encode_request_line(id, command)?;
        let (reply, response) = mpsc::channel();
        self.shared.lock_pending().insert(id, reply);
        // close() may have drained the table between the check above and the insert.
        if self.shared.is_closed() {
            self.shared.lock_pending().remove(&id);
            return Err(AuthorityError::Disconnected);
        }

        if let Err(error) = self.send_line(&line) {
            self.shared.lock_pending().remove(&id);
            return Err(AuthorityError::Io(error));
        }
        debug!(id, command = command.name(), "authority_request_sent");

        response.recv().unwrap_or(Err(AuthorityError::Disconnected))
    }

    fn subscribe(&self) -> Result<EventSubscription, AuthorityError> {
        if self.shared.is_closed() {
            return Err(AuthorityError::Disconnected);
        }

        let (sender, subscription) = EventSubscription::channel();
        {
            let mut route = self.shared.lock_events();
            match &*route {
                EventRoute::Waiting => *route = EventRoute::Open(sender),
                EventRoute::Open(_) | EventRoute::Finished => {
                    return Err(AuthorityError::AlreadySubscribed)
                }
            }
        }

        // The route is open before the authority is asked to start, so no
        // event pushed right after the acknowledgement is lost.
        match self.call(&AuthorityCommand::StartChannelReads) {
            Ok(_) => Ok(subscription),
            Err(error) => {
                let mut route = self.shared.lock_events();
                if matches!(&*route, EventRoute::Open(_)) {
                    *route = EventRoute::Waiting;
                }
                Err(error)
            }
        }
    }
}

impl Drop for TcpAuthority {
    fn drop(&mut self) {
        let writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let _ = writer.shutdown(Shutdown::Both);
    }
}

fn wait_for_ready(stream: TcpStream, deadline: Instant) -> Result<LineReader, HandshakeFailure> {
    let configure = |stream: &TcpStream| -> io::Result<()> {
        stream.set_read_timeout(Some(HANDSHAKE_READ_TIMEOUT))?;
        if let Err(err) = stream.set_nodelay(true) {
            warn!(error = %err, "authority_nodelay_failed");
        }
        Ok(())
    };
    configure(&stream).map_err(|error| HandshakeFailure::Fatal(AuthorityError::Io(error)))?;

    let mut reader = LineReader::new(stream);
    loop {
        if Instant::now() >= deadline {
            return Err(HandshakeFailure::Retry(
                "timed out waiting for authority ready line".to_string(),
            ));
        }
        match reader.read_line() {
            ReadOutcome::Line(raw) => {
                if parse_wire_line(&raw).is_ready() {
                    reader
                        .stream
                        .set_read_timeout(None)
                        .map_err(|error| HandshakeFailure::Fatal(AuthorityError::Io(error)))?;
                    return Ok(reader);
                }
                debug!(line = %raw, "authority_pre_ready_line_ignored");
            }
            ReadOutcome::NoData => {}
            ReadOutcome::Disconnected => {
                return Err(HandshakeFailure::Retry(
                    "authority closed the connection before ready".to_string(),
                ))
            }
            ReadOutcome::IoError(error) => {
                return Err(HandshakeFailure::Fatal(AuthorityError::Io(error)))
            }
        }
    }
}

fn read_loop(mut reader: LineReader, shared: Arc<ConnectionShared>) {
    loop {
        match reader.read_line() {
            ReadOutcome::Line(raw) => shared.route_line(&raw),
            ReadOutcome::NoData => {}
            ReadOutcome::Disconnected => {
                info!("authority_connection_closed");
                break;
            }
            ReadOutcome::IoError(error) => {
                warn!(error = %error, "authority_read_failed");
                break;
            }
        }
    }
    shared.close();
}
