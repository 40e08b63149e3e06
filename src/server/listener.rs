//! The routing server and its event loop.
//!
//! [`Server::serve`] binds the socket and moves everything into a single
//! worker thread. That thread multiplexes the listening socket, every open
//! connection and the control channel through one `poll(2)` call per
//! iteration, and runs handlers inline.

use std::fs;
use std::io;
use std::mem;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::config::ServerConfig;
use crate::error::{ServerError, TransportError};
use crate::http::connection::{Connection, ReadEvent};
use crate::http::message::HttpMessage;
use crate::http::request::Request;
use crate::http::response::Response;
use crate::net::control::{self, ControlReceiver, ControlSender};
use crate::net::poll::{Interest, PollSet, Readiness};
use crate::net::socket::Socket;
use crate::server::router::{Route, RouteTable};

const WORKER_NAME: &str = "coolipc-server";

/// How long the listener sits out after a failed `accept`.
const ACCEPT_RETRY_DELAY: Duration = Duration::from_millis(100);

/// A server that has not started yet: socket path, decorations and routes.
pub struct Server {
    socket_path: PathBuf,
    server_header: Option<String>,
    routes: RouteTable,
}

impl Server {
    pub fn new(socket_path: impl Into<PathBuf>) -> Self {
        Self {
            socket_path: socket_path.into(),
            server_header: None,
            routes: RouteTable::new(),
        }
    }

    pub fn from_config(config: &ServerConfig) -> Self {
        let server = Self::new(&config.socket_path);
        match &config.server_header {
            Some(header) => server.with_server_header(header.clone()),
            None => server,
        }
    }

    /// Value of the `Server` header added to every response.
    pub fn with_server_header(mut self, value: impl Into<String>) -> Self {
        self.server_header = Some(value.into());
        self
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    /// Registers `handler` for `route` under each of `methods`.
    pub fn endpoint<F>(&mut self, methods: &[&str], route: &str, handler: F) -> &mut Self
    where
        F: Fn(&Request) -> anyhow::Result<Response> + Send + Sync + 'static,
    {
        self.routes.add_route(route, methods, Arc::new(handler));
        self
    }

    /// Binds the socket path (replacing a stale one) and starts the worker.
    pub fn serve(self) -> Result<ServerHandle, ServerError> {
        prepare_socket_path(&self.socket_path)?;

        let listener = Socket::new()?;
        listener.listen(&self.socket_path)?;
        let (sender, receiver) = control::channel()?;

        let event_loop = EventLoop {
            listener,
            control: receiver,
            connections: Vec::new(),
            accept_backoff: AcceptBackoff::default(),
            dispatcher: Dispatcher {
                routes: self.routes,
                server_header: self.server_header,
                framework: crate::framework_id(),
            },
            socket_path: self.socket_path.clone(),
        };

        let worker = thread::Builder::new()
            .name(WORKER_NAME.to_string())
            .spawn(move || event_loop.run())
            .map_err(ServerError::Spawn)?;

        Ok(ServerHandle {
            socket_path: self.socket_path,
            shutdown: ShutdownHandle(Arc::new(sender)),
            worker: Some(worker),
        })
    }
}

fn prepare_socket_path(path: &Path) -> Result<(), ServerError> {
    let path_error = |source: io::Error| ServerError::SocketPath {
        path: path.display().to_string(),
        source,
    };

    match fs::remove_file(path) {
        Ok(()) => debug!(path = %path.display(), "removed stale socket"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(path_error(e)),
    }

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(path_error)?;
        }
    }
    Ok(())
}

/// A running server. Dropping it stops the worker and waits for it.
pub struct ServerHandle {
    socket_path: PathBuf,
    shutdown: ShutdownHandle,
    worker: Option<JoinHandle<Result<(), ServerError>>>,
}

impl ServerHandle {
    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Asks the worker to stop after its current iteration.
    pub fn terminate(&self) -> Result<(), TransportError> {
        self.shutdown.terminate()
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    /// Whether the worker thread is still running.
    pub fn is_serving(&self) -> bool {
        self.worker.as_ref().is_some_and(|worker| !worker.is_finished())
    }

    /// Blocks until the worker exits and returns how it ended.
    pub fn wait_until_done(mut self) -> Result<(), ServerError> {
        self.join()
    }

    fn join(&mut self) -> Result<(), ServerError> {
        match self.worker.take() {
            Some(worker) => worker.join().map_err(|_| ServerError::WorkerPanicked)?,
            None => Ok(()),
        }
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        if self.worker.is_none() {
            return;
        }
        if let Err(e) = self.terminate() {
            debug!(error = %e, "stop command not delivered, worker already gone");
        }
        if let Err(e) = self.join() {
            warn!(error = %e, "server worker ended with an error");
        }
    }
}

/// Clonable handle that stops the server from any thread.
#[derive(Clone, Debug)]
pub struct ShutdownHandle(Arc<ControlSender>);

impl ShutdownHandle {
    pub fn terminate(&self) -> Result<(), TransportError> {
        self.0.send(control::STOP)
    }
}

/// Turns parsed requests into decorated responses.
struct Dispatcher {
    routes: RouteTable,
    server_header: Option<String>,
    framework: String,
}

impl Dispatcher {
    fn dispatch(&self, request: &Request) -> Response {
        let response = match self.routes.lookup(request.resource(), request.method()) {
            Route::NotFound => Response::not_found(),
            Route::MethodNotAllowed(allowed) => Response::method_not_allowed(allowed.as_slice()),
            Route::Found(handler) => {
                match panic::catch_unwind(AssertUnwindSafe(|| handler(request))) {
                    Ok(Ok(response)) => response,
                    Ok(Err(e)) => {
                        warn!(resource = request.resource(), error = %e, "handler failed");
                        Response::internal_error(e.to_string())
                    }
                    Err(payload) => {
                        let message = panic_message(payload.as_ref());
                        error!(resource = request.resource(), panic = %message, "handler panicked");
                        Response::internal_error(message)
                    }
                }
            }
        };

        debug!(
            method = request.method(),
            resource = request.resource(),
            status = response.status.as_u16(),
            "request handled"
        );
        self.decorate(response)
    }

    fn decorate(&self, mut response: Response) -> Response {
        response.calculate_content_length();
        if let Some(server) = &self.server_header {
            response.add_header("Server", server);
        }
        response.add_header("Connection", "close");
        response.add_header("X-Framework", &self.framework);
        response
    }

    fn handle_connection(&self, connection: &mut Connection, readiness: Readiness) {
        if readiness.is_error() {
            connection.close();
            return;
        }

        if connection.is_reading() && (readiness.is_readable() || readiness.is_hung_up()) {
            match connection.read_request() {
                ReadEvent::Pending => {}
                ReadEvent::Request(request) => {
                    let response = self.dispatch(&request);
                    connection.respond(&response);
                }
                ReadEvent::Fault(response) => {
                    connection.respond(&self.decorate(response));
                }
            }
        } else if readiness.is_writable() {
            connection.flush();
        }

        if readiness.is_hung_up() && !connection.is_closed() {
            debug!("peer hung up");
            connection.close();
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "handler panicked".to_string()
    }
}

/// Tracks failing `accept` calls. After a failure the listener is left out
/// of the next poll round, which then waits at most [`ACCEPT_RETRY_DELAY`],
/// so a persistent error such as EMFILE cannot spin the loop.
#[derive(Debug, Default)]
struct AcceptBackoff {
    failing: bool,
    paused: bool,
}

impl AcceptBackoff {
    /// Returns `true` for the first failure of a streak.
    fn failed(&mut self) -> bool {
        self.paused = true;
        !mem::replace(&mut self.failing, true)
    }

    /// Returns `true` when this ends a failure streak.
    fn recovered(&mut self) -> bool {
        mem::replace(&mut self.failing, false)
    }

    /// Whether the listener sits out the coming round. Clears the pause.
    fn take_pause(&mut self) -> bool {
        mem::take(&mut self.paused)
    }
}

struct EventLoop {
    listener: Socket,
    control: ControlReceiver,
    connections: Vec<Connection>,
    accept_backoff: AcceptBackoff,
    dispatcher: Dispatcher,
    socket_path: PathBuf,
}

impl EventLoop {
    fn run(mut self) -> Result<(), ServerError> {
        info!(path = %self.socket_path.display(), "server listening");
        let result = self.serve_until_stopped();

        for connection in &mut self.connections {
            connection.close();
        }
        self.connections.clear();
        self.listener.close();
        if let Err(e) = fs::remove_file(&self.socket_path) {
            if e.kind() != io::ErrorKind::NotFound {
                warn!(path = %self.socket_path.display(), error = %e, "failed to remove socket");
            }
        }

        match &result {
            Ok(()) => info!("server stopped"),
            Err(e) => error!(error = %e, "server loop failed"),
        }
        result
    }

    fn serve_until_stopped(&mut self) -> Result<(), ServerError> {
        loop {
            let mut polls = PollSet::with_capacity(self.connections.len() + 2);
            for connection in &self.connections {
                polls.register(connection.socket(), connection.interest());
            }
            let paused = self.accept_backoff.take_pause();
            let listener_slot =
                (!paused).then(|| polls.register(&self.listener, Interest::Readable));
            let control_slot = polls.register(self.control.socket(), Interest::Readable);

            polls.wait(paused.then_some(ACCEPT_RETRY_DELAY))?;

            let control = polls.readiness(control_slot);
            if (control.is_readable() || control.is_hung_up()) && self.handle_control(control)? {
                return Ok(());
            }

            // Only the connections that were part of this poll round.
            let polled = self.connections.len();

            if listener_slot.is_some_and(|slot| polls.readiness(slot).is_readable()) {
                self.accept_pending();
            }

            for (slot, connection) in self.connections.iter_mut().take(polled).enumerate() {
                self.dispatcher
                    .handle_connection(connection, polls.readiness(slot));
            }

            self.connections.retain(|connection| !connection.is_closed());
        }
    }

    /// Returns `true` when the loop should stop.
    fn handle_control(&mut self, readiness: Readiness) -> Result<bool, ServerError> {
        for command in self.control.drain()? {
            debug!(command = %command, "control command received");
            if command == control::STOP {
                return Ok(true);
            }
            warn!(command = %command, "ignoring unknown control command");
        }

        // Every sender is gone; nobody can stop us any more.
        if readiness.is_hung_up() && !readiness.is_readable() {
            info!("control channel closed");
            return Ok(true);
        }
        Ok(false)
    }

    fn accept_pending(&mut self) {
        loop {
            match self.listener.accept() {
                Ok(Some(socket)) => {
                    if self.accept_backoff.recovered() {
                        info!("accepting connections again");
                    }
                    debug!(fd = socket.raw_fd(), "accepted connection");
                    self.connections.push(Connection::new(socket));
                }
                Ok(None) => {
                    self.accept_backoff.recovered();
                    break;
                }
                Err(e) => {
                    if self.accept_backoff.failed() {
                        warn!(error = %e, "failed to accept connection, pausing listener");
                    } else {
                        debug!(error = %e, "accept still failing");
                    }
                    break;
                }
            }
        }
    }
}
