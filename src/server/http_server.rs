//! HTTP server implementation.

use std::future::Future;
use std::net::{IpAddr, SocketAddr};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use log::{debug, error, info, warn};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite};
use tokio::net::{TcpListener, TcpStream};
use tokio::signal;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::parser::{parse_request, HttpRequest};
use crate::server::config::ServerConfig;
use crate::server::download::PreparedDownload;
use crate::server::error::Error;
use crate::server::response::{HttpResponse, StatusCode};
use crate::server::router::Route;
use crate::share::{Event, ShareState, API_LOG_TAIL};

const INDEX_HTML: &str = include_str!("index.html");

/// Pause after a failed `accept` before retrying.
pub(crate) const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// The share server.
pub struct HttpServer {
    /// The server configuration.
    pub config: ServerConfig,
    /// Catalog, client registry and event log shared with every connection.
    pub state: ShareState,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration and state.
    pub fn new(config: ServerConfig, state: ShareState) -> Self {
        Self { config, state }
    }

    /// Display the server banner and endpoints.
    fn display_server_info(&self) {
        let banner = include_str!("banner.txt");
        info!("\n{banner}");

        info!("Endpoints:");
        for endpoint in Route::endpoints() {
            info!("  GET {endpoint}");
        }
        info!("Sharing {} file(s)", self.state.catalog.len());
    }

    /// Bind the TCP listener.
    pub async fn bind(&self) -> Result<TcpListener, Error> {
        let listener = TcpListener::bind(&self.config.addr).await?;
        info!("Server listening on http://{}", listener.local_addr()?);
        Ok(listener)
    }

    /// Handle a new connection.
    fn handle_new_connection(
        mut socket: TcpStream,
        addr: SocketAddr,
        semaphore: &Arc<Semaphore>,
        state: &ShareState,
        config: &ServerConfig,
        tasks: &mut JoinSet<()>,
    ) {
        let state = state.clone();
        let config = config.clone();

        // Try to acquire a permit from the semaphore
        let permit = match Arc::clone(semaphore).try_acquire_owned() {
            Ok(permit) => permit,
            Err(_) => {
                warn!("Connection limit reached, rejecting connection from {addr}");
                tasks.spawn(async move {
                    let response = HttpResponse::text(
                        StatusCode::ServiceUnavailable,
                        "Server is at capacity, please try again later",
                    );
                    let _ = response.write_to(&mut socket).await;
                });
                return;
            }
        };

        tasks.spawn(async move {
            // The permit is dropped when the task completes, releasing the semaphore slot
            let _permit = permit;

            let peer = addr.ip().to_canonical();
            if let Err(e) = Self::handle_connection(&mut socket, peer, &state, &config).await {
                if e.is_client_error() {
                    debug!("{addr}: {e}");
                } else {
                    error!("Error handling connection from {addr}: {e}");
                }
            }
        });
    }

    /// Perform graceful shutdown.
    async fn perform_shutdown(tasks: &mut JoinSet<()>) {
        info!("Waiting for {len} active connections to complete...", len = tasks.len());
        let shutdown_timeout = tokio::time::Duration::from_secs(30);
        let drained = tokio::time::timeout(shutdown_timeout, async {
            while let Some(res) = tasks.join_next().await {
                if let Err(e) = res {
                    error!("Task failed during shutdown: {e}");
                }
            }
        })
        .await;

        if drained.is_err() {
            warn!("Aborting {len} connections still open after {shutdown_timeout:?}", len = tasks.len());
            tasks.abort_all();
        }

        info!("Server shutdown complete");
    }

    /// Bind and serve until Ctrl+C.
    pub async fn start(&self) -> Result<(), Error> {
        self.display_server_info();
        let listener = self.bind().await?;
        self.serve(listener, ctrl_c()).await
    }

    /// Accept connections on `listener` until `shutdown` completes.
    ///
    /// Each connection runs on its own task; a failure in one never reaches
    /// the accept loop or other connections.
    pub async fn serve<F>(&self, listener: TcpListener, shutdown: F) -> Result<(), Error>
    where
        F: Future<Output = ()>,
    {
        let semaphore = Arc::new(Semaphore::new(self.config.max_connections));
        let mut tasks = JoinSet::new();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutting down server...");
                    break;
                }

                Some(res) = tasks.join_next(), if !tasks.is_empty() => {
                    if let Err(e) = res {
                        error!("Connection task failed: {e}");
                    }
                }

                accept_result = listener.accept() => {
                    match accept_result {
                        Ok((socket, addr)) => {
                            Self::handle_new_connection(
                                socket,
                                addr,
                                &semaphore,
                                &self.state,
                                &self.config,
                                &mut tasks,
                            );
                        }
                        Err(e) => accept_backoff(&e).await,
                    }
                }
            }
        }

        Self::perform_shutdown(&mut tasks).await;

        Ok(())
    }

    /// Handle a single connection carrying one request from `peer`.
    ///
    /// 4xx outcomes are written to the client and also returned as errors so
    /// the caller can log them.
    pub async fn handle_connection(
        socket: &mut (impl AsyncRead + AsyncWrite + Unpin),
        peer: IpAddr,
        state: &ShareState,
        config: &ServerConfig,
    ) -> Result<(), Error> {
        let head = match tokio::time::timeout(
            config.request_timeout,
            read_request_head(socket, config.read_buffer_size),
        )
        .await
        {
            Ok(head) => head?,
            Err(_) => {
                let response = HttpResponse::text(StatusCode::RequestTimeout, "Request timed out");
                let _ = response.write_to(socket).await;
                return Err(Error::Timeout);
            }
        };
        if head.is_empty() {
            return Ok(()); // Connection closed
        }

        let request = match parse_request(&head) {
            Ok(req) => req,
            Err(e) => {
                let response = HttpResponse::text(
                    StatusCode::BadRequest,
                    format!("Error parsing request: {e}"),
                );
                response.write_to(socket).await?;
                return Err(Error::ParseError(e));
            }
        };

        Self::note_visit(state, peer, &request);

        let route = Route::resolve(request.method, request.route_path());
        match route {
            Route::Download => Self::serve_download(socket, peer, state, &request).await,
            Route::NotFound => {
                let path = request.route_path().to_string();
                HttpResponse::text(StatusCode::NotFound, format!("Not found: {path}"))
                    .write_to(socket)
                    .await?;
                Err(Error::NotFound(path))
            }
            Route::MethodNotAllowed => {
                let path = request.route_path().to_string();
                HttpResponse::text(
                    StatusCode::MethodNotAllowed,
                    format!("Method {} not allowed for path: {path}", request.method),
                )
                .with_header("Allow", "GET")
                .write_to(socket)
                .await?;
                Err(Error::MethodNotAllowed(request.method, path))
            }
            _ => respond(socket, format!("{route:?} handler"), async { Self::render(route, state) }).await,
        }
    }

    /// Register the requester, logging its first visit.
    fn note_visit(state: &ShareState, peer: IpAddr, request: &HttpRequest) {
        if state.clients.record_visit(peer, request.user_agent()) {
            state.events.record(peer, Event::Connected);
        }
    }

    /// Build the response for a route answered from memory.
    fn render(route: Route, state: &ShareState) -> Result<HttpResponse, Error> {
        match route {
            Route::Index => Ok(HttpResponse::new(StatusCode::Ok)
                .with_content_type("text/html; charset=utf-8")
                .with_body_string(INDEX_HTML)),
            Route::ListFiles => HttpResponse::new(StatusCode::Ok).with_json(&state.catalog.list_all()),
            Route::ListClients => HttpResponse::new(StatusCode::Ok).with_json(&state.clients.list_all()),
            Route::ListLogs => HttpResponse::new(StatusCode::Ok).with_json(&state.events.recent(API_LOG_TAIL)),
            Route::Download | Route::MethodNotAllowed | Route::NotFound => Err(Error::InternalError(
                format!("{route:?} is not rendered from memory"),
            )),
        }
    }

    /// Stream the file named by the `name` query parameter.
    ///
    /// The download is logged only after every byte has been written.
    async fn serve_download(
        socket: &mut (impl AsyncRead + AsyncWrite + Unpin),
        peer: IpAddr,
        state: &ShareState,
        request: &HttpRequest,
    ) -> Result<(), Error> {
        let name = request.query_param("name").map(String::as_str).unwrap_or("");

        let opened = guarded(format!("opening '{name}'"), PreparedDownload::open(&state.catalog, name)).await;
        let download = match opened {
            Ok(download) => download,
            Err(e @ (Error::NotFound(_) | Error::FileMissing(_))) => {
                HttpResponse::text(StatusCode::NotFound, e.to_string())
                    .write_to(socket)
                    .await?;
                return Err(e);
            }
            Err(e) => {
                HttpResponse::text(StatusCode::InternalServerError, "Internal server error")
                    .write_to(socket)
                    .await?;
                return Err(e);
            }
        };

        let name = download.name().to_string();
        let sent = download.send(socket).await?;
        debug!("Sent {sent} bytes of '{name}' to {peer}");
        state.events.record(peer, Event::Downloaded(name));
        Ok(())
    }
}

/// Run `fut`, turning a panic while it is polled into `Error::InternalError`.
///
/// Only wrap work that runs before any response bytes are written, so the
/// caller can still answer with a 500.
pub(crate) async fn guarded<T, F>(what: impl Into<String>, fut: F) -> Result<T, Error>
where
    F: Future<Output = Result<T, Error>>,
{
    match AssertUnwindSafe(fut).catch_unwind().await {
        Ok(result) => result,
        Err(_) => Err(Error::InternalError(format!("{} panicked", what.into()))),
    }
}

/// Write the response `build` produces, or a 500 if it fails or panics.
pub(crate) async fn respond<S, F>(socket: &mut S, what: impl Into<String>, build: F) -> Result<(), Error>
where
    S: AsyncWrite + Unpin + ?Sized,
    F: Future<Output = Result<HttpResponse, Error>>,
{
    match guarded(what, build).await {
        Ok(response) => response.write_to(socket).await,
        Err(e) => {
            HttpResponse::text(StatusCode::InternalServerError, "Internal server error")
                .write_to(socket)
                .await?;
            Err(e)
        }
    }
}

/// Log a failed `accept` and pause before the loop tries again. Accept
/// errors never stop the server.
pub(crate) async fn accept_backoff(e: &std::io::Error) {
    error!("Error accepting connection: {e}");
    tokio::time::sleep(ACCEPT_BACKOFF).await;
}

/// Read until the blank line ending the request head, EOF, or `limit` bytes.
async fn read_request_head<S>(socket: &mut S, limit: usize) -> Result<Vec<u8>, Error>
where
    S: AsyncRead + Unpin + ?Sized,
{
    let mut buf = vec![0; limit];
    let mut filled = 0;

    while filled < limit {
        let n = socket.read(&mut buf[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
        if head_complete(&buf[..filled]) {
            break;
        }
    }

    buf.truncate(filled);
    Ok(buf)
}

fn head_complete(bytes: &[u8]) -> bool {
    bytes.windows(4).any(|w| w == b"\r\n\r\n") || bytes.windows(2).any(|w| w == b"\n\n")
}

async fn ctrl_c() {
    match signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl+C, initiating graceful shutdown"),
        Err(e) => {
            error!("Error setting up Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    }
}
