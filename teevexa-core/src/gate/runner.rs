//! Per-mount gate task

use super::{AreaKind, GateState};
use crate::roles::{resolve_role, RoleDirectory, RoleResolution};
use crate::session::{Session, SessionContext, SessionSubscription, SessionUpdate};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

/// Gate for one protected area, ready to be mounted
pub struct AccessGate {
    context: Arc<SessionContext>,
    directory: Arc<dyn RoleDirectory>,
    area: AreaKind,
}

impl AccessGate {
    pub fn new(context: Arc<SessionContext>, directory: Arc<dyn RoleDirectory>, area: AreaKind) -> Self {
        Self { context, directory, area }
    }

    /// Start evaluating
    ///
    /// The subscription is registered before the initial poll is issued, so a
    /// change that lands while the poll is in flight is never lost. Must be
    /// called from within a tokio runtime.
    pub fn mount(self) -> GateHandle {
        let (state_tx, state_rx) = watch::channel(GateState::Initializing);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let subscription = self.context.subscribe();
        let area = self.area;

        log::debug!("Mounting {} gate", area);
        let task = tokio::spawn(run(self, subscription, state_tx, shutdown_rx));

        GateHandle { area, state: state_rx, shutdown: Some(shutdown_tx), task: Some(task) }
    }
}

/// Results of background work started by the gate task
enum Signal {
    /// A read of the current session, tagged with the generation it was issued at
    Polled { generation: u64, session: Option<Session> },
    /// A finished role lookup, tagged with the observation that started it
    Role { generation: u64, session: Session, resolution: RoleResolution },
}

async fn run(
    gate: AccessGate,
    mut subscription: SessionSubscription,
    state: watch::Sender<GateState>,
    mut shutdown: oneshot::Receiver<()>,
) {
    let (signals_tx, mut signals) = mpsc::unbounded_channel::<Signal>();
    // Bumped by every session observation; only work tagged with the current
    // generation may publish.
    let mut generation: u64 = 0;

    spawn_poll(gate.context.clone(), generation, signals_tx.clone());

    loop {
        let observed = tokio::select! {
            _ = &mut shutdown => break,
            update = subscription.next() => match update {
                Some(SessionUpdate::Changed(event)) => {
                    log::debug!("{} gate observed {:?}", gate.area, event.kind);
                    event.session
                }
                Some(SessionUpdate::Missed(count)) => {
                    log::warn!("{} gate missed {} session events, re-reading", gate.area, count);
                    spawn_poll(gate.context.clone(), generation, signals_tx.clone());
                    continue;
                }
                None => break,
            },
            Some(signal) = signals.recv() => match signal {
                Signal::Polled { generation: tag, session } => {
                    if tag != generation {
                        log::debug!("{} gate discarding superseded session read", gate.area);
                        continue;
                    }
                    session
                }
                Signal::Role { generation: tag, session, resolution } => {
                    if tag != generation {
                        log::debug!("Discarding stale role lookup for {}", session.user_id());
                        continue;
                    }
                    publish(&state, GateState::evaluate(Some(&session), &resolution, gate.area));
                    if state.borrow().is_terminal() {
                        break;
                    }
                    continue;
                }
            },
        };

        generation += 1;
        match observed {
            Some(session) if gate.area == AreaKind::Staff => {
                spawn_lookup(gate.directory.clone(), session, generation, signals_tx.clone());
            }
            session => {
                publish(&state, GateState::evaluate(session.as_ref(), &RoleResolution::Missing, gate.area));
            }
        }

        if state.borrow().is_terminal() {
            break;
        }
    }

    log::debug!("{} gate stopped in state {:?}", gate.area, *state.borrow());
    subscription.unsubscribe();
}

fn publish(state: &watch::Sender<GateState>, next: GateState) {
    state.send_if_modified(|current| {
        if *current == next {
            return false;
        }
        *current = next;
        true
    });
}

fn spawn_poll(context: Arc<SessionContext>, generation: u64, signals: mpsc::UnboundedSender<Signal>) {
    tokio::spawn(async move {
        let session = context.current_session().await;
        // The gate may be gone by now.
        let _ = signals.send(Signal::Polled { generation, session });
    });
}

fn spawn_lookup(
    directory: Arc<dyn RoleDirectory>,
    session: Session,
    generation: u64,
    signals: mpsc::UnboundedSender<Signal>,
) {
    tokio::spawn(async move {
        let resolution = resolve_role(directory.as_ref(), &session).await;
        let _ = signals.send(Signal::Role { generation, session, resolution });
    });
}

/// Handle to a mounted gate
///
/// Dropping the handle unmounts the gate.
pub struct GateHandle {
    area: AreaKind,
    state: watch::Receiver<GateState>,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl GateHandle {
    pub fn area(&self) -> AreaKind {
        self.area
    }

    /// Current state
    pub fn state(&self) -> GateState {
        self.state.borrow().clone()
    }

    /// Independent observer of the state
    ///
    /// Keeps reporting the last published state after the gate stops.
    pub fn watch(&self) -> watch::Receiver<GateState> {
        self.state.clone()
    }

    /// Wait for the next state change; `None` once the gate has stopped
    pub async fn changed(&mut self) -> Option<GateState> {
        self.state.changed().await.ok()?;
        Some(self.state.borrow_and_update().clone())
    }

    /// Wait until the gate has left `Initializing`
    ///
    /// Returns `Initializing` only if the gate stopped before resolving.
    pub async fn settled(&mut self) -> GateState {
        let settled = self.state.wait_for(|state| !state.is_initializing()).await.map(|state| state.clone());
        match settled {
            Ok(state) => state,
            Err(_) => self.state.borrow().clone(),
        }
    }

    /// Whether the gate task is still running
    pub fn is_mounted(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Stop the gate and wait for its subscription to be released
    ///
    /// Lookups still in flight complete into the void.
    pub async fn unmount(mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                log::error!("{} gate task failed: {}", self.area, e);
            }
        }
        log::debug!("Unmounted {} gate", self.area);
    }
}

impl Drop for GateHandle {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
    }
}

impl std::fmt::Debug for GateHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GateHandle")
            .field("area", &self.area)
            .field("state", &*self.state.borrow())
            .finish()
    }
}
