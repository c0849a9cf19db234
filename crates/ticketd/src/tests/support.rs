//! Test harness utilities shared by the bootstrap and server suites.

use std::ffi::OsString;
use std::fs;
use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, UdpSocket};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use camino::Utf8PathBuf;
use ortho_config::{OrthoConfig, OrthoError};
use tempfile::TempDir;
use time::OffsetDateTime;
use time::macros::datetime;

use ticket_config::{Config, LogFormat};
use ticket_wire::{DatagramRequest, MAX_DATAGRAM_BYTES, Reply, StreamRequest};

use crate::bootstrap::{BootstrapError, ConfigLoader, Server, StaticConfigLoader, bootstrap_with};
use crate::catalog::CatalogCounts;
use crate::health::HealthReporter;
use crate::lifecycle::FixedClock;
use crate::process::{LaunchError, run_server_with};
use crate::transport::{ShutdownPipe, ShutdownTrigger};

/// Instant every test server believes it is.
pub const NOW: OffsetDateTime = datetime!(2050-01-01 12:00 UTC);

const WAIT_TIMEOUT: Duration = Duration::from_secs(2);
const POLL_INTERVAL: Duration = Duration::from_millis(10);
const REPLY_TIMEOUT: Duration = Duration::from_millis(500);

/// Builds a configuration rooted in `dir` that binds ephemeral local ports.
pub fn test_config(dir: &TempDir) -> Config {
    let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf())
        .expect("temporary directory was not valid UTF-8");
    Config {
        host: "127.0.0.1".to_owned(),
        port: 0,
        data_dir: root.join("data"),
        attachment_dir: root.join("attachments"),
        log_format: LogFormat::Compact,
        ..Config::default()
    }
}

/// Scenario world for the bootstrap suite.
pub struct BootstrapWorld {
    dir: TempDir,
    loader: Box<dyn ConfigLoader>,
    pub health: Arc<HealthLog>,
    outcome: Option<Result<Server, BootstrapError>>,
}

impl BootstrapWorld {
    /// World whose loader resolves a configuration inside a fresh tempdir.
    pub fn new() -> Self {
        let dir = TempDir::new().expect("failed to create temporary directory");
        let loader = Box::new(StaticConfigLoader::new(test_config(&dir)));
        Self {
            dir,
            loader,
            health: Arc::new(HealthLog::default()),
            outcome: None,
        }
    }

    /// Loads the tempdir configuration.
    pub fn load_from_tempdir(&mut self) {
        self.replace_loader(StaticConfigLoader::new(test_config(&self.dir)));
    }

    /// Loads from a command line whose port does not parse.
    pub fn load_invalid_port(&mut self) {
        self.replace_loader(InvalidPortLoader);
    }

    /// Loads a configuration whose data directory sits beneath a regular file.
    pub fn block_data_dir(&mut self) {
        let blocker = self.dir.path().join("blocker");
        fs::write(&blocker, b"not a directory").expect("write blocking file");
        let data_dir = Utf8PathBuf::from_path_buf(blocker.join("data"))
            .expect("temporary directory was not valid UTF-8");
        self.replace_loader(StaticConfigLoader::new(Config {
            data_dir,
            ..test_config(&self.dir)
        }));
    }

    /// Writes the account and event snapshots bootstrap will read.
    pub fn seed_snapshots(&self, accounts: &str, events: &str) -> Result<(), String> {
        let storage = test_config(&self.dir).storage();
        storage
            .prepare_filesystem()
            .map_err(|error| error.to_string())?;
        fs::write(storage.accounts_path(), accounts).map_err(|error| error.to_string())?;
        fs::write(storage.events_path(), events).map_err(|error| error.to_string())
    }

    /// Runs bootstrap unless it already ran with the current loader.
    pub fn bootstrap(&mut self) {
        if self.outcome.is_none() {
            self.outcome = Some(bootstrap_with(&*self.loader, self.health.clone()));
        }
    }

    /// The bootstrapped server, or why there is none.
    pub fn server(&self) -> Result<&Server, String> {
        match &self.outcome {
            Some(Ok(server)) => Ok(server),
            Some(Err(error)) => Err(format!("bootstrap failed: {error}")),
            None => Err("bootstrap has not run".to_owned()),
        }
    }

    /// The bootstrap failure, or a description of what happened instead.
    pub fn failure(&self) -> Result<&BootstrapError, String> {
        match &self.outcome {
            Some(Err(error)) => Ok(error),
            Some(Ok(_)) => Err("bootstrap succeeded unexpectedly".to_owned()),
            None => Err("bootstrap has not run".to_owned()),
        }
    }

    fn replace_loader(&mut self, loader: impl ConfigLoader + 'static) {
        self.loader = Box::new(loader);
        self.outcome = None;
    }
}

impl Default for BootstrapWorld {
    fn default() -> Self {
        Self::new()
    }
}

struct InvalidPortLoader;

impl ConfigLoader for InvalidPortLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Config::load_from_iter(["ticketd", "--port", "not-a-port"].map(OsString::from))
    }
}

/// Every milestone reported so far, in order.
#[derive(Default)]
pub struct HealthLog {
    entries: Mutex<Vec<HealthEvent>>,
}

impl HealthLog {
    /// Copy of the milestones reported so far.
    pub fn events(&self) -> Vec<HealthEvent> {
        self.entries.lock().map(|entries| entries.clone()).unwrap_or_default()
    }

    /// Waits for the `listening` milestone and returns both addresses.
    pub fn wait_for_listening(&self) -> Result<(SocketAddr, SocketAddr), String> {
        let deadline = Instant::now() + WAIT_TIMEOUT;
        loop {
            let listening = self.events().into_iter().find_map(|event| match event {
                HealthEvent::Listening { datagram, stream } => Some((datagram, stream)),
                _ => None,
            });
            match listening {
                Some(addresses) => return Ok(addresses),
                None if Instant::now() >= deadline => {
                    return Err(format!("server never started listening: {:?}", self.events()));
                }
                None => thread::sleep(POLL_INTERVAL),
            }
        }
    }

    fn push(&self, event: HealthEvent) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.push(event);
        }
    }
}

impl HealthReporter for HealthLog {
    fn bootstrap_starting(&self) {
        self.push(HealthEvent::BootstrapStarting);
    }

    fn bootstrap_succeeded(&self, _config: &Config) {
        self.push(HealthEvent::BootstrapSucceeded);
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        self.push(HealthEvent::BootstrapFailed(error.to_string()));
    }

    fn catalog_loaded(&self, counts: CatalogCounts) {
        self.push(HealthEvent::CatalogLoaded(counts));
    }

    fn listening(&self, datagram: SocketAddr, stream: SocketAddr) {
        self.push(HealthEvent::Listening { datagram, stream });
    }

    fn server_stopped(&self) {
        self.push(HealthEvent::ServerStopped);
    }
}

/// One reported milestone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthEvent {
    BootstrapStarting,
    BootstrapSucceeded,
    BootstrapFailed(String),
    CatalogLoaded(CatalogCounts),
    Listening {
        datagram: SocketAddr,
        stream: SocketAddr,
    },
    ServerStopped,
}

/// A server running on a background thread, plus its client helpers.
pub struct RunningServer {
    datagram: SocketAddr,
    stream: SocketAddr,
    reporter: Arc<HealthLog>,
    trigger: ShutdownTrigger,
    handle: thread::JoinHandle<Result<(), LaunchError>>,
}

impl RunningServer {
    /// Starts the full process path with `config` and waits until it listens.
    pub fn start(config: Config) -> Result<Self, String> {
        let (pipe, trigger) = ShutdownPipe::pair().map_err(|error| error.to_string())?;
        let reporter = Arc::new(HealthLog::default());
        let thread_reporter = reporter.clone() as Arc<dyn HealthReporter>;
        let loader = StaticConfigLoader::new(config);
        let handle = thread::spawn(move || {
            run_server_with(&loader, thread_reporter, Arc::new(FixedClock(NOW)), pipe)
        });
        let (datagram, stream) = reporter.wait_for_listening()?;
        Ok(Self {
            datagram,
            stream,
            reporter,
            trigger,
            handle,
        })
    }

    /// Health events reported by this server so far.
    pub fn events(&self) -> Vec<HealthEvent> {
        self.reporter.events()
    }

    /// Sends one datagram and waits briefly for the reply.
    pub fn datagram(&self, line: &str) -> Result<Option<Vec<u8>>, String> {
        let socket = UdpSocket::bind(("127.0.0.1", 0)).map_err(|error| error.to_string())?;
        socket
            .set_read_timeout(Some(REPLY_TIMEOUT))
            .map_err(|error| error.to_string())?;
        socket
            .send_to(format!("{line}\n").as_bytes(), self.datagram)
            .map_err(|error| error.to_string())?;
        let mut buffer = [0_u8; MAX_DATAGRAM_BYTES];
        match socket.recv_from(&mut buffer) {
            Ok((len, _)) => Ok(buffer.get(..len).map(<[u8]>::to_vec)),
            Err(error)
                if matches!(
                    error.kind(),
                    io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
                ) =>
            {
                Ok(None)
            }
            Err(error) => Err(error.to_string()),
        }
    }

    /// Opens one connection, sends `request`, closes the write half and reads
    /// until the server closes.
    pub fn stream(&self, request: &[u8]) -> Result<Vec<u8>, String> {
        let mut connection = TcpStream::connect(self.stream).map_err(|error| error.to_string())?;
        connection
            .write_all(request)
            .map_err(|error| error.to_string())?;
        connection
            .shutdown(Shutdown::Write)
            .map_err(|error| error.to_string())?;
        let mut reply = Vec::new();
        connection
            .read_to_end(&mut reply)
            .map_err(|error| error.to_string())?;
        Ok(reply)
    }

    /// Fires the shutdown trigger and waits for the loop to return.
    pub fn stop(self) -> Result<Vec<HealthEvent>, String> {
        self.trigger.fire().map_err(|error| error.to_string())?;
        match self.handle.join() {
            Ok(Ok(())) => Ok(self.reporter.events()),
            Ok(Err(error)) => Err(error.to_string()),
            Err(_) => Err("server thread panicked".to_owned()),
        }
    }
}

/// Scenario world for the end-to-end ticketing suite.
pub struct ServerWorld {
    dir: TempDir,
    server: Option<RunningServer>,
    reply: Option<Vec<u8>>,
}

impl ServerWorld {
    /// Builds a world over an empty data directory.
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("failed to create temporary directory"),
            server: None,
            reply: None,
        }
    }

    /// Starts a server over this world's data directory.
    pub fn start(&mut self) -> Result<(), String> {
        if self.server.is_some() {
            return Err("server already running".to_owned());
        }
        self.server = Some(RunningServer::start(test_config(&self.dir))?);
        Ok(())
    }

    /// Stops the running server and starts a new one over the same files.
    pub fn restart(&mut self) -> Result<(), String> {
        let server = self.server.take().ok_or("server not running")?;
        server.stop()?;
        self.start()
    }

    /// Sends a datagram, remembering the reply.
    pub fn send_datagram(&mut self, line: &str) -> Result<(), String> {
        self.reply = self.running()?.datagram(line)?;
        Ok(())
    }

    /// Sends an encoded datagram request, remembering the reply.
    pub fn send_request(&mut self, request: &DatagramRequest) -> Result<(), String> {
        self.send_datagram(request.encode().trim_end())
    }

    /// Sends an encoded stream request and its attachment, remembering the reply.
    pub fn send_stream_request(
        &mut self,
        request: &StreamRequest,
        payload: Option<&[u8]>,
    ) -> Result<(), String> {
        let mut bytes = request.encode().into_bytes();
        if let Some(payload) = payload {
            bytes.extend_from_slice(payload);
            bytes.push(b'\n');
        }
        self.reply = Some(self.running()?.stream(&bytes)?);
        Ok(())
    }

    /// Sends a literal stream request with an optional attachment, remembering
    /// the reply.
    pub fn send_stream(&mut self, header: &str, payload: Option<&[u8]>) -> Result<(), String> {
        let mut request = header.as_bytes().to_vec();
        if let Some(bytes) = payload {
            request.push(b' ');
            request.extend_from_slice(bytes);
        }
        request.push(b'\n');
        self.reply = Some(self.running()?.stream(&request)?);
        Ok(())
    }

    /// Last reply without its terminating newline, or `None` if nothing arrived.
    pub fn reply_text(&self) -> Option<String> {
        self.reply.as_ref().map(|bytes| {
            String::from_utf8_lossy(bytes)
                .trim_end_matches('\n')
                .to_owned()
        })
    }

    /// Last reply as a client decodes it.
    pub fn reply(&self) -> Result<Reply, String> {
        let text = self.reply_text().ok_or("no reply arrived")?;
        Reply::parse(&text).map_err(|error| format!("undecodable reply '{text}': {error}"))
    }

    /// Where the attachment of `event` is stored.
    pub fn attachment_path(&self, event: &str, file_name: &str) -> Utf8PathBuf {
        test_config(&self.dir)
            .attachment_dir
            .join(event)
            .join(file_name)
    }

    fn running(&self) -> Result<&RunningServer, String> {
        self.server
            .as_ref()
            .ok_or_else(|| "server not running".to_owned())
    }
}

impl Default for ServerWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ServerWorld {
    fn drop(&mut self) {
        if let Some(server) = self.server.take() {
            drop(server.stop());
        }
    }
}

/// Fixture constructor for the bootstrap world.
pub fn world() -> std::cell::RefCell<BootstrapWorld> {
    std::cell::RefCell::new(BootstrapWorld::new())
}

/// Fixture constructor for the ticketing world.
pub fn server_world() -> std::cell::RefCell<ServerWorld> {
    std::cell::RefCell::new(ServerWorld::new())
}
