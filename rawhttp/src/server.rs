use std::{
    io::{self, Read, Write},
    net::{SocketAddr, TcpListener, TcpStream},
    thread,
};
use thiserror::Error;
use url::Url;

use super::router::respond;

pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:4221";
pub const DEFAULT_READ_BUFFER_SIZE: usize = 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind_address: String,
    /// Keep reading requests from a connection after responding, rather
    /// than closing it after the first response.
    pub keep_alive: bool,
    /// Upper bound on a single request; anything past it is not reassembled.
    pub read_buffer_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            bind_address: String::from(DEFAULT_BIND_ADDRESS),
            keep_alive: true,
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
        }
    }
}

#[derive(Debug, Error)]
pub enum BindError {
    #[error("Unable to listen on http port")]
    HttpListenError(#[from] io::Error),
    #[error("Bind address cannot be base for http url")]
    InvalidBindAddress(#[from] url::ParseError),
}

#[derive(Debug, Error)]
pub enum ServeError {
    #[error("Error accepting connection: {0}")]
    Accept(#[from] io::Error),
}

/// Ends a single connection. Never affects other connections.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("Client has disconnected")]
    Disconnected,
    #[error("Error reading from socket: {0}")]
    Read(#[source] io::Error),
    #[error("Error writing to socket: {0}")]
    Write(#[source] io::Error),
}

/// What to do when the accept loop cannot continue.
///
/// A process would normally exit here; the accept loop returns if the
/// implementation does.
pub trait Terminate {
    fn terminate(&self, error: ServeError);
}

impl<F> Terminate for F where F: Fn(ServeError) {
    fn terminate(&self, error: ServeError) {
        self(error)
    }
}

#[derive(Debug, PartialEq, Eq)]
enum ConnectionState {
    Reading,
    Processing(usize),
    Writing(Vec<u8>),
    Closed,
}

/// Drives one connection: read, respond, write, and repeat.
pub struct Connection<S>
where
    S: Read + Write,
{
    stream: S,
    buf: Vec<u8>,
    keep_alive: bool,
}

impl<S> Connection<S>
where
    S: Read + Write,
{
    pub fn new(stream: S, config: &ServerConfig) -> Self {
        Connection {
            stream,
            buf: vec![0u8; config.read_buffer_size],
            keep_alive: config.keep_alive,
        }
    }

    /// Runs until the connection ends.
    ///
    /// Returns `Ok` only when the server chose to close (single-request
    /// mode); otherwise the error says why the connection ended.
    pub fn run(mut self) -> Result<(), ConnectionError> {
        let mut state = ConnectionState::Reading;
        loop {
            state = match state {
                ConnectionState::Reading => ConnectionState::Processing(self.read()?),
                ConnectionState::Processing(len) => {
                    let raw = &self.buf[..len];
                    log::debug!("Request received: {:?}", String::from_utf8_lossy(raw));
                    ConnectionState::Writing(respond(raw).to_bytes())
                }
                ConnectionState::Writing(bytes) => {
                    self.write(&bytes)?;
                    if self.keep_alive {
                        ConnectionState::Reading
                    } else {
                        ConnectionState::Closed
                    }
                }
                ConnectionState::Closed => return Ok(()),
            };
        }
    }

    // One read per request; a request is never assembled from several reads
    fn read(&mut self) -> Result<usize, ConnectionError> {
        match self.stream.read(&mut self.buf) {
            Ok(0) => Err(ConnectionError::Disconnected),
            Ok(len) => Ok(len),
            Err(e) => Err(ConnectionError::Read(e)),
        }
    }

    fn write(&mut self, bytes: &[u8]) -> Result<(), ConnectionError> {
        log::trace!("Writing {} response bytes", bytes.len());
        self.stream
            .write_all(bytes)
            .and_then(|_| self.stream.flush())
            .map_err(ConnectionError::Write)
    }
}

fn handle_connection(stream: TcpStream, config: &ServerConfig) {
    let peer = stream
        .peer_addr()
        .map(|addr| addr.to_string())
        .unwrap_or_else(|_| String::from("unknown peer"));

    match Connection::new(stream, config).run() {
        Ok(()) => log::debug!("Closed connection to {}", peer),
        Err(ConnectionError::Disconnected) => log::info!("{} has disconnected", peer),
        Err(e) => log::error!("Connection to {} terminated: {}", peer, e),
    }
}

/// Hands every accepted connection to `spawn`. The first accept error goes to
/// `fatal` and ends the loop; nothing after it is accepted.
fn accept_loop<S, I, F, T>(incoming: I, mut spawn: F, fatal: &T)
where
    I: IntoIterator<Item = io::Result<S>>,
    F: FnMut(S),
    T: Terminate,
{
    for stream in incoming {
        match stream {
            Ok(stream) => spawn(stream),
            Err(e) => {
                log::error!("Error accepting connection: {}", e);
                fatal.terminate(ServeError::Accept(e));
                return;
            }
        }
    }
}

/// Accepts connections and hands each one to its own thread.
///
/// There is no limit on the number of live connections and no timeout on
/// reads or writes.
pub struct Server {
    listener: TcpListener,
    config: ServerConfig,
}

impl Server {
    pub fn bind(config: ServerConfig) -> Result<Self, BindError> {
        Url::parse(&format!("http://{}", config.bind_address))?;
        let listener = TcpListener::bind(&config.bind_address)?;
        log::info!("Listening on {}", config.bind_address);

        Ok(Server { listener, config })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Accepts until an accept fails, at which point `fatal` is invoked.
    pub fn serve_forever<T: Terminate>(self, fatal: T) {
        accept_loop(self.listener.incoming(), |stream| self.spawn_handler(stream), &fatal);
    }

    fn spawn_handler(&self, stream: TcpStream) {
        let config = self.config.clone();
        let spawned = thread::Builder::new()
            .name(String::from("rawhttp-conn"))
            .spawn(move || handle_connection(stream, &config));

        if let Err(e) = spawned {
            log::error!("Unable to spawn connection handler: {}", e);
        }
    }
}
