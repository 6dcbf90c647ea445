use cucumber::World as CucumberWorld;
use cucumber_tests::{Directory, LastResponse, RunningPortal};
use std::sync::Arc;
use teevexa_core::gate::{AccessGate, AreaKind, GateHandle, GatePaths, GateState};
use teevexa_core::nav::NavSection;
use teevexa_core::session::SessionContext;
use teevexa_core::shell::{Shell, ShellOutcome};

#[derive(CucumberWorld)]
#[world(init = Self::new)]
pub struct GateWorld {
    pub directory: Directory,
    /// Session context shared by every gate mounted in the scenario
    pub context: Arc<SessionContext>,
    pub gate: Option<GateHandle>,
    pub state: Option<GateState>,
    pub outcome: Option<ShellOutcome>,
    pub sections: Vec<NavSection>,
    // HTTP scenarios
    pub portal: Option<RunningPortal>,
    pub cookie: Option<String>,
    pub last_response: Option<LastResponse>,
}

impl std::fmt::Debug for GateWorld {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GateWorld")
            .field("directory", &self.directory)
            .field("state", &self.state)
            .field("outcome", &self.outcome)
            .field("portal", &self.portal)
            .field("last_response", &self.last_response)
            .finish_non_exhaustive()
    }
}

impl GateWorld {
    fn new() -> Self {
        let directory = Directory::default();
        let context = Arc::new(SessionContext::new(directory.auth.clone()));
        Self {
            directory,
            context,
            gate: None,
            state: None,
            outcome: None,
            sections: Vec::new(),
            portal: None,
            cookie: None,
            last_response: None,
        }
    }

    pub fn paths(&self) -> GatePaths {
        GatePaths::default()
    }

    /// Mount a bare gate for `area` and wait for its first answer
    pub async fn mount_gate(&mut self, area: AreaKind) -> GateState {
        self.unmount().await;
        let mut gate = AccessGate::new(self.context.clone(), self.directory.roles.clone(), area).mount();
        let state = gate.settled().await;
        self.gate = Some(gate);
        self.state = Some(state.clone());
        state
    }

    /// Mount a shell's gate and record what the shell would show at `path`
    pub async fn open_shell(&mut self, shell: Shell, path: &str) -> ShellOutcome {
        self.unmount().await;
        let mut gate = shell.mount(self.context.clone(), self.directory.roles.clone());
        let state = gate.settled().await;
        let outcome = shell.outcome(&state, path);
        self.gate = Some(gate);
        self.state = Some(state);
        self.outcome = Some(outcome.clone());
        outcome
    }

    pub fn state(&self) -> &GateState {
        self.state.as_ref().expect("no gate has been mounted")
    }

    pub fn outcome(&self) -> &ShellOutcome {
        self.outcome.as_ref().expect("no shell has been opened")
    }

    pub fn portal(&self) -> &RunningPortal {
        self.portal.as_ref().expect("portal server is not running")
    }

    pub fn response(&self) -> &LastResponse {
        self.last_response.as_ref().expect("no request has been made")
    }

    pub async fn unmount(&mut self) {
        if let Some(gate) = self.gate.take() {
            gate.unmount().await;
        }
    }

    pub async fn teardown(&mut self) {
        self.unmount().await;
        if let Some(mut portal) = self.portal.take() {
            if let Err(e) = portal.stop().await {
                eprintln!("portal server stopped with an error: {}", e);
            }
        }
    }
}
