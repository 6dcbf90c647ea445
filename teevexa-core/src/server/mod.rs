//! Portal HTTP server
//!
//! Serves the client portal and the staff area behind the access gate, plus
//! the account flows:
//!
//! | Method | Path | Behaviour |
//! |--------|------|-----------|
//! | GET | `/health` | `{"status":"ok"}` |
//! | GET | `/auth` | sign-in and sign-up page |
//! | POST | `/auth/login` | JSON or form credentials, sets the session cookie |
//! | POST | `/auth/logout` | signs out, clears the cookie |
//! | POST | `/auth/signup` | registers; signed in at once or 202 pending confirmation |
//! | GET/POST | `/auth/forgot-password` | asks the platform for a reset e-mail |
//! | GET/POST | `/auth/reset-password` | sets a new password for the session or reset link |
//! | GET | `/client-portal/**` | client gate, then the portal shell |
//! | GET | `/admin/**` | staff gate, then the admin shell |
//! | GET | `/api/access?area=` | gate answer as JSON |
//!
//! Every request gets its own session context and its own gate mount.
//!
//! # Example
//!
//! ```no_run
//! use teevexa_core::config::TeevexaConfig;
//! use teevexa_core::server::PortalServer;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = TeevexaConfig::load()?;
//! PortalServer::with_supabase(config)?.serve().await?;
//! # Ok(())
//! # }
//! ```

mod response;
mod routes;

use crate::backend::SupabaseClient;
use crate::config::TeevexaConfig;
use crate::roles::RoleDirectory;
use crate::session::{AuthBackend, SessionCookie};
use crate::shell::Shell;
use anyhow::{Context, Result};
use routes::PortalState;
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;

/// HTTP server for both protected areas
pub struct PortalServer {
    config: TeevexaConfig,
    auth: Arc<dyn AuthBackend>,
    directory: Arc<dyn RoleDirectory>,
}

impl PortalServer {
    pub fn new(config: TeevexaConfig, auth: Arc<dyn AuthBackend>, directory: Arc<dyn RoleDirectory>) -> Self {
        Self { config, auth, directory }
    }

    /// Server backed by the hosted platform for both sessions and roles
    pub fn with_supabase(config: TeevexaConfig) -> Result<Self> {
        let client = Arc::new(
            SupabaseClient::from_config(&config.backend).context("Failed to build backend client")?,
        );
        Ok(Self::new(config, client.clone(), client))
    }

    pub fn config(&self) -> &TeevexaConfig {
        &self.config
    }

    /// Bind the configured address
    pub async fn bind(&self) -> Result<TcpListener> {
        let addr = self.config.server.bind_address();
        TcpListener::bind(&addr).await.with_context(|| format!("Failed to bind to {}", addr))
    }

    /// Serve on the configured address until Ctrl-C
    pub async fn serve(self) -> Result<()> {
        let listener = self.bind().await?;
        self.serve_with_shutdown(listener, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                log::error!("Failed to listen for Ctrl-C: {}", e);
                std::future::pending::<()>().await;
            }
            log::info!("Shutdown requested");
        })
        .await
    }

    /// Serve connections from `listener` until `shutdown` completes
    ///
    /// Connections already accepted are allowed to finish.
    pub async fn serve_with_shutdown<F>(self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let state = Arc::new(self.state()?);
        let local = listener.local_addr().context("Listener has no local address")?;
        log::info!("Portal gate listening on http://{}", local);
        log::info!("   auth backend: {}", state.auth.name());
        log::info!("   client area: {}  staff area: {}", state.paths.portal, state.paths.admin);

        tokio::pin!(shutdown);
        loop {
            let (stream, remote_addr) = tokio::select! {
                _ = &mut shutdown => break,
                accepted = listener.accept() => match accepted {
                    Ok(accepted) => accepted,
                    Err(e) => {
                        log::warn!("Failed to accept connection: {}", e);
                        continue;
                    }
                },
            };
            let state = state.clone();

            tokio::spawn(async move {
                let io = hyper_util::rt::TokioIo::new(stream);

                let service = hyper::service::service_fn(move |req| {
                    let state = state.clone();
                    async move { routes::handle_request(state, req).await }
                });

                if let Err(err) = hyper::server::conn::http1::Builder::new().serve_connection(io, service).await {
                    log::debug!("Connection error from {}: {}", remote_addr, err);
                }
            });
        }

        log::info!("Portal gate stopped");
        Ok(())
    }

    fn state(&self) -> Result<PortalState> {
        self.config.validate().context("Invalid configuration")?;
        let paths = self.config.gate.paths();

        Ok(PortalState {
            auth: self.auth.clone(),
            directory: self.directory.clone(),
            cookie: SessionCookie::new(self.config.sessions.cookie_config()?),
            portal: Shell::portal().with_paths(paths.clone()),
            admin: Shell::admin().with_paths(paths.clone()),
            paths,
            max_body_size: self.config.server.max_body_size,
        })
    }
}

impl std::fmt::Debug for PortalServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PortalServer")
            .field("address", &self.config.server.bind_address())
            .field("auth", &self.auth.name())
            .finish_non_exhaustive()
    }
}
