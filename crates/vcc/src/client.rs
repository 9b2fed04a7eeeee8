//! `VccClient` builder and run loop.
//!
//! This is the entry point for running a client. It ties together all the
//! layers: transport → session → plugins → commands.

use std::future::Future;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use vcc_plugin::{
    CommandContext, Console, InputSource, PluginCatalog, PluginHost, ProviderLoadError,
};
use vcc_protocol::MessageType;
use vcc_session::{login, SendRequest, Session};
use vcc_transport::Connection;

use crate::dispatcher::Dispatcher;
use crate::loops::{input_loop, recv_loop, route_frame};
use crate::{ClientConfig, VccError};

/// Why a client run ended without an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    /// A command asked to exit (`-quit`).
    Quit,
    /// The input source ran out of lines.
    EndOfInput,
    /// The server closed the connection between frames.
    Disconnected,
    /// The shutdown signal fired (Ctrl-C in the binary).
    Interrupted,
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Builder for configuring and connecting a client.
///
/// # Example
///
/// ```rust,no_run
/// use vcc::prelude::*;
///
/// # async fn demo() -> Result<(), VccError> {
/// let client = VccClient::builder()
///     .server("127.0.0.1".parse().unwrap())
///     .port(4600)
///     .username("alice")
///     .connect()
///     .await?;
/// # let _ = client;
/// # Ok(())
/// # }
/// ```
pub struct VccClientBuilder {
    config: ClientConfig,
    catalog: PluginCatalog,
}

impl VccClientBuilder {
    /// Creates a new builder with default settings and the built-in
    /// plugin catalog.
    pub fn new() -> Self {
        Self {
            config: ClientConfig::default(),
            catalog: PluginCatalog::builtin(),
        }
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    pub fn server(mut self, server: IpAddr) -> Self {
        self.config.server = server;
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.config.username = username.into();
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.config.poll_interval = interval;
        self
    }

    /// Sets the plugins to load, in hook order.
    pub fn plugins<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.plugins = names.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the catalog plugins are loaded from (and `-pins` draws on).
    pub fn catalog(mut self, catalog: PluginCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    /// Connects to the server and loads the configured plugins.
    ///
    /// Plugins that fail to load are skipped; see
    /// [`VccClient::load_errors`].
    pub async fn connect(self) -> Result<VccClient, VccError> {
        let conn = Connection::connect(self.config.server, self.config.port)
            .await?
            .with_poll_interval(self.config.poll_interval);
        tracing::info!(
            server = %self.config.server,
            port = self.config.port,
            "connected"
        );

        let plugins = Arc::new(PluginHost::new(self.catalog));
        let load_errors = plugins.load(&self.config.plugins);

        Ok(VccClient {
            session: Session::new(Arc::new(conn), self.config.username),
            dispatcher: Dispatcher::new(Arc::clone(&plugins)),
            plugins,
            load_errors,
        })
    }
}

impl Default for VccClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Close guard
// ---------------------------------------------------------------------------

/// Drop guard that releases the connection and shuts plugins down when a
/// run ends, however it ends.
///
/// The normal paths call [`release`](Self::release). If the run future is
/// dropped instead (cancelled from outside, or a panic), `Drop` does the
/// same work; since `Drop` is synchronous, the socket close is spawned as a
/// fire-and-forget task.
struct CloseGuard {
    conn: Arc<Connection>,
    plugins: Arc<PluginHost>,
}

impl CloseGuard {
    async fn release(self) {
        if let Err(e) = self.conn.close().await {
            tracing::debug!(error = %e, "error while closing the connection");
        }
        self.plugins.shutdown();
        // `self` drops here; both steps above are already done, so Drop
        // finds nothing left to do.
    }
}

impl Drop for CloseGuard {
    fn drop(&mut self) {
        self.plugins.shutdown();
        if self.conn.is_closed() {
            return;
        }
        self.conn.cancel();
        let conn = Arc::clone(&self.conn);
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(async move {
                let _ = conn.close().await;
            });
        }
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// A connected client.
///
/// Call [`run()`](Self::run) to log in and start the loops.
pub struct VccClient {
    session: Session,
    plugins: Arc<PluginHost>,
    dispatcher: Dispatcher,
    load_errors: Vec<ProviderLoadError>,
}

impl VccClient {
    /// Creates a new builder.
    pub fn builder() -> VccClientBuilder {
        VccClientBuilder::new()
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn plugins(&self) -> &PluginHost {
        &self.plugins
    }

    /// Plugins from the configuration that were skipped.
    pub fn load_errors(&self) -> &[ProviderLoadError] {
        &self.load_errors
    }

    /// Logs in and runs until the user quits, input ends, the server hangs
    /// up, or Ctrl-C.
    pub async fn run(
        &self,
        password: &str,
        console: &dyn Console,
        input: &dyn InputSource,
    ) -> Result<ExitReason, VccError> {
        let ctrl_c = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!(error = %e, "cannot listen for Ctrl-C");
                std::future::pending::<()>().await;
            }
        };
        self.run_until(password, console, input, ctrl_c).await
    }

    /// Like [`run`](Self::run), with a custom shutdown signal.
    ///
    /// The connection is closed exactly once when this returns, on every
    /// path, including a failed login.
    pub async fn run_until<F>(
        &self,
        password: &str,
        console: &dyn Console,
        input: &dyn InputSource,
        shutdown: F,
    ) -> Result<ExitReason, VccError>
    where
        F: Future<Output = ()>,
    {
        let guard = CloseGuard {
            conn: Arc::clone(self.session.connection()),
            plugins: Arc::clone(&self.plugins),
        };

        let result = self.run_inner(password, console, input, shutdown).await;
        if let Err(e) = &result {
            tracing::error!(error = %e, "client stopped");
        }

        guard.release().await;
        result
    }

    async fn run_inner<F>(
        &self,
        password: &str,
        console: &dyn Console,
        input: &dyn InputSource,
        shutdown: F,
    ) -> Result<ExitReason, VccError>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        // The shutdown signal also covers start-up: a server that never
        // answers the login or the info request must not make Ctrl-C hang.
        tokio::select! {
            started = self.start(password, console) => started?,
            () = &mut shutdown => {
                console.line("bye.");
                return Ok(ExitReason::Interrupted);
            }
        }

        let ctx = CommandContext {
            session: &self.session,
            console,
            input,
            plugins: &self.plugins,
            commands: &self.dispatcher,
        };

        // Whichever side finishes first ends the run; the other future is
        // dropped right here, mid-await if need be.
        let reason = tokio::select! {
            received = recv_loop(&self.session, &self.plugins, console) => {
                received.map(|()| ExitReason::Disconnected)
            }
            typed = input_loop(&ctx, &self.dispatcher) => typed,
            () = &mut shutdown => {
                console.line("bye.");
                Ok(ExitReason::Interrupted)
            }
        };

        self.session.connection().cancel();
        reason
    }

    /// Logs in and learns our own level before the first prompt.
    async fn start(&self, password: &str, console: &dyn Console) -> Result<(), VccError> {
        login(&self.session, password).await?;
        console.line("ready.");

        self.session
            .send(SendRequest::new(MessageType::UserInfo).message(self.session.username()))
            .await?;
        let (raw, frame) = self.session.connection().receive().await?;
        route_frame(&self.session, &self.plugins, console, &raw, frame);
        Ok(())
    }
}
