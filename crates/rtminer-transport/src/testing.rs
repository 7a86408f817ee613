//! Scripted in-process server for tests.
//!
//! [`MockServer`] accepts connections on a loopback port and plays one
//! script per connection, checking what the client sends and replying with
//! canned values.

use std::io::{BufReader, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::thread;
use std::time::{Duration, Instant};

use bytes::BytesMut;
use rtminer_wire::{ObjectReader, ObjectWriter, Value};

const IO_TIMEOUT: Duration = Duration::from_secs(5);

/// One step of a connection script.
#[derive(Debug, Clone)]
pub enum Step {
    /// Read a value and fail the script unless it equals this one.
    Expect(Value),
    /// Write one value.
    Send(Value),
    /// Write several values in a single socket write.
    SendAll(Vec<Value>),
    /// Sleep before the next step.
    Pause(Duration),
    /// Block until the client goes away, recording anything it sends as trailing.
    AwaitClose,
    /// Close the socket immediately.
    Close,
}

/// What one connection saw.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionLog {
    /// Values matched by `Expect` steps, in order.
    pub received: Vec<Value>,
    /// Values the client sent after the script finished.
    pub trailing: Vec<Value>,
}

/// Loopback server driven by scripts.
#[derive(Debug)]
pub struct MockServer {
    addr: SocketAddr,
    handle: Option<thread::JoinHandle<Result<Vec<SessionLog>, String>>>,
}

impl MockServer {
    /// Starts a server that plays `script` on a single connection.
    pub fn start(script: Vec<Step>) -> std::io::Result<Self> {
        Self::start_sessions(vec![script])
    }

    /// Starts a server that plays each script on successive connections.
    pub fn start_sessions(scripts: Vec<Vec<Step>>) -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0")?;
        let addr = listener.local_addr()?;
        listener.set_nonblocking(true)?;
        let handle = thread::Builder::new()
            .name("rtminer-mock".into())
            .spawn(move || {
                let mut logs = Vec::with_capacity(scripts.len());
                for script in scripts {
                    let stream = accept(&listener)?;
                    logs.push(play(stream, script)?);
                }
                Ok(logs)
            })?;
        Ok(Self {
            addr,
            handle: Some(handle),
        })
    }

    /// Address the server listens on.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Port the server listens on.
    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Waits for every script to finish and returns one log per connection.
    pub fn join(mut self) -> Result<Vec<SessionLog>, String> {
        match self.handle.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| "mock server thread panicked".to_string())?,
            None => Err("mock server already joined".into()),
        }
    }
}

fn accept(listener: &TcpListener) -> Result<TcpStream, String> {
    let deadline = Instant::now() + IO_TIMEOUT;
    loop {
        match listener.accept() {
            Ok((stream, _)) => {
                stream.set_nonblocking(false).map_err(|e| e.to_string())?;
                return Ok(stream);
            }
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                if Instant::now() >= deadline {
                    return Err("no client connected".into());
                }
                thread::sleep(Duration::from_millis(5));
            }
            Err(e) => return Err(format!("accept failed: {e}")),
        }
    }
}

fn play(mut stream: TcpStream, script: Vec<Step>) -> Result<SessionLog, String> {
    stream
        .set_read_timeout(Some(IO_TIMEOUT))
        .map_err(|e| e.to_string())?;
    let read_half = stream.try_clone().map_err(|e| e.to_string())?;
    let mut reader = ObjectReader::new(BufReader::new(read_half));
    let mut writer = ObjectWriter::new();
    let mut buf = BytesMut::new();

    writer.write_header(&mut buf);
    stream.write_all(&buf).map_err(|e| e.to_string())?;
    reader
        .read_header()
        .map_err(|e| format!("client header: {e}"))?;

    let mut log = SessionLog::default();
    for step in script {
        match step {
            Step::Expect(expected) => {
                let got = reader
                    .read_value()
                    .map_err(|e| format!("expected {expected:?}, read failed: {e}"))?;
                if got != expected {
                    return Err(format!("expected {expected:?}, got {got:?}"));
                }
                log.received.push(got);
            }
            Step::Send(value) => {
                buf.clear();
                writer.encode(&value, &mut buf).map_err(|e| e.to_string())?;
                stream.write_all(&buf).map_err(|e| e.to_string())?;
            }
            Step::SendAll(values) => {
                buf.clear();
                for value in &values {
                    writer.encode(value, &mut buf).map_err(|e| e.to_string())?;
                }
                stream.write_all(&buf).map_err(|e| e.to_string())?;
            }
            Step::Pause(duration) => thread::sleep(duration),
            Step::AwaitClose => break,
            Step::Close => {
                let _ = stream.shutdown(std::net::Shutdown::Both);
                return Ok(log);
            }
        }
    }

    while let Ok(value) = reader.read_value() {
        log.trailing.push(value);
    }
    Ok(log)
}
