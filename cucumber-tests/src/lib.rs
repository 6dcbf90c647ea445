//! Fixtures shared by the Teevexa cucumber suite
//!
//! [`Directory`] seeds the in-memory auth backend and role directory,
//! [`RunningPortal`] serves them over real HTTP on an ephemeral port.

use std::collections::HashMap;
use std::sync::Arc;
use teevexa_core::config::TeevexaConfig;
use teevexa_core::roles::{MemoryRoleDirectory, Role};
use teevexa_core::server::PortalServer;
use teevexa_core::session::MemoryAuthBackend;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// Password given to every seeded user
pub const PASSWORD: &str = "correct horse";

/// Seeded identities and their roles
#[derive(Clone, Default)]
pub struct Directory {
    pub auth: Arc<MemoryAuthBackend>,
    pub roles: Arc<MemoryRoleDirectory>,
    user_ids: HashMap<String, String>,
}

impl Directory {
    /// Register a user, optionally with a role row
    pub fn add_user(&mut self, email: &str, role: Option<Role>) -> String {
        let user_id = self.auth.add_user(email, PASSWORD);
        if let Some(role) = role {
            self.roles.assign(&user_id, role);
        }
        self.user_ids.insert(email.to_string(), user_id.clone());
        user_id
    }

    pub fn user_id(&self, email: &str) -> Option<&str> {
        self.user_ids.get(email).map(String::as_str)
    }
}

impl std::fmt::Debug for Directory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Directory")
            .field("users", &self.user_ids.keys().collect::<Vec<_>>())
            .field("lookups", &self.roles.lookup_count())
            .finish()
    }
}

/// Last HTTP answer seen by a scenario
#[derive(Debug, Clone, Default)]
pub struct LastResponse {
    pub status: u16,
    pub location: Option<String>,
    pub set_cookie: Option<String>,
    pub body: String,
}

impl LastResponse {
    async fn read(response: reqwest::Response) -> Self {
        let header = |name: &str| {
            response.headers().get(name).and_then(|v| v.to_str().ok()).map(str::to_string)
        };
        let status = response.status().as_u16();
        let location = header("location");
        let set_cookie = header("set-cookie");
        let body = response.text().await.unwrap_or_default();
        Self { status, location, set_cookie, body }
    }
}

/// Portal server running in the background of a scenario
pub struct RunningPortal {
    pub base_url: String,
    client: reqwest::Client,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<Result<(), String>>>,
}

impl RunningPortal {
    pub async fn start(directory: &Directory) -> Result<Self, String> {
        let mut config = TeevexaConfig::default();
        config.sessions.cookie_secure = false;

        let listener = TcpListener::bind("127.0.0.1:0").await.map_err(|e| e.to_string())?;
        let base_url = format!("http://{}", listener.local_addr().map_err(|e| e.to_string())?);
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let server = PortalServer::new(config, directory.auth.clone(), directory.roles.clone());
        let task = tokio::spawn(async move {
            server
                .serve_with_shutdown(listener, async {
                    let _ = shutdown_rx.await;
                })
                .await
                .map_err(|e| format!("{:#}", e))
        });

        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| e.to_string())?;

        Ok(Self { base_url, client, shutdown: Some(shutdown_tx), task: Some(task) })
    }

    /// Submit the sign-in form
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<LastResponse, String> {
        self.submit("/auth/login", &[("email", email), ("password", password)], None).await
    }

    /// Post an urlencoded form the way a browser on this origin would
    pub async fn submit(
        &self,
        path: &str,
        fields: &[(&str, &str)],
        cookie: Option<&str>,
    ) -> Result<LastResponse, String> {
        let mut request = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .header("origin", &self.base_url)
            .form(fields);
        if let Some(cookie) = cookie {
            request = request.header("cookie", cookie);
        }
        let response = request.send().await.map_err(|e| e.to_string())?;
        Ok(LastResponse::read(response).await)
    }

    pub async fn request(&self, method: &str, path: &str, cookie: Option<&str>) -> Result<LastResponse, String> {
        let url = format!("{}{}", self.base_url, path);
        let mut request = match method {
            "GET" => self.client.get(url),
            "POST" => self.client.post(url),
            other => return Err(format!("unsupported method {}", other)),
        };
        if let Some(cookie) = cookie {
            request = request.header("cookie", cookie);
        }
        let response = request.send().await.map_err(|e| e.to_string())?;
        Ok(LastResponse::read(response).await)
    }

    /// Stop accepting connections and wait for the server task
    pub async fn stop(&mut self) -> Result<(), String> {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        match self.task.take() {
            Some(task) => task.await.map_err(|e| e.to_string())?,
            None => Ok(()),
        }
    }
}

impl std::fmt::Debug for RunningPortal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunningPortal").field("base_url", &self.base_url).finish()
    }
}

/// `name=value` part of a `Set-Cookie` header
pub fn cookie_pair(set_cookie: &str) -> &str {
    set_cookie.split(';').next().unwrap_or_default().trim()
}
