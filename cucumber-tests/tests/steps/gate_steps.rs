use crate::world::GateWorld;
use cucumber::{given, then, when};
use cucumber_tests::PASSWORD;
use teevexa_core::gate::{AreaKind, GateState};
use teevexa_core::roles::{DirectoryError, Role};
use teevexa_core::shell::{Shell, ShellOutcome};

fn role(name: &str) -> Role {
    name.parse().unwrap_or_else(|e| panic!("bad role in feature file: {}", e))
}

fn area(name: &str) -> AreaKind {
    name.parse().unwrap_or_else(|e| panic!("bad area in feature file: {}", e))
}

// ==================== SETUP ====================

#[given(expr = "a user {string} with role {string}")]
async fn given_user_with_role(world: &mut GateWorld, email: String, role_name: String) {
    world.directory.add_user(&email, Some(role(&role_name)));
}

#[given(expr = "a user {string} without a role")]
async fn given_user_without_role(world: &mut GateWorld, email: String) {
    world.directory.add_user(&email, None);
}

#[given(expr = "the role directory is unavailable")]
async fn given_directory_unavailable(world: &mut GateWorld) {
    world.directory.roles.fail_with(DirectoryError::Unreachable("connection refused".into()));
}

#[given(expr = "{string} is signed in")]
async fn given_signed_in(world: &mut GateWorld, email: String) {
    world
        .context
        .sign_in_with_password(&email, PASSWORD)
        .await
        .unwrap_or_else(|e| panic!("sign-in of {} failed: {}", email, e));
}

#[given(expr = "nobody is signed in")]
async fn given_nobody_signed_in(world: &mut GateWorld) {
    assert!(world.context.current_session().await.is_none());
}

// ==================== ACTIONS ====================

#[when(expr = "the {word} gate settles")]
async fn when_gate_settles(world: &mut GateWorld, area_name: String) {
    world.mount_gate(area(&area_name)).await;
}

#[when(expr = "the {word} shell is opened at {string}")]
async fn when_shell_opened(world: &mut GateWorld, kind: String, path: String) {
    let shell = match kind.as_str() {
        "portal" => Shell::portal(),
        "admin" => Shell::admin(),
        other => panic!("unknown shell '{}'", other),
    };
    world.open_shell(shell, &path).await;
}

#[when(expr = "the user signs out")]
async fn when_user_signs_out(world: &mut GateWorld) {
    world.context.sign_out().await.expect("sign-out failed");
    let gate = world.gate.as_mut().expect("no gate mounted");
    let state = gate.changed().await.expect("gate stopped before sign-out was observed");
    world.state = Some(state);
}

// ==================== OUTCOMES ====================

#[then(expr = "the gate redirects to {string}")]
async fn then_gate_redirects(world: &mut GateWorld, path: String) {
    let paths = world.paths();
    assert_eq!(world.state().redirect_path(&paths), Some(path.as_str()), "state: {:?}", world.state());
}

#[then(expr = "access is granted")]
async fn then_access_granted(world: &mut GateWorld) {
    let paths = world.paths();
    assert!(world.state().redirect_path(&paths).is_none(), "state: {:?}", world.state());
    assert!(!world.state().is_initializing());
}

#[then(expr = "access is granted with role {string}")]
async fn then_access_granted_with_role(world: &mut GateWorld, role_name: String) {
    match world.state() {
        GateState::AuthenticatedStaffOk { role: granted, .. } => assert_eq!(*granted, role(&role_name)),
        other => panic!("expected staff access, got {:?}", other),
    }
}

#[then(expr = "the denial reason is {string}")]
async fn then_denial_reason(world: &mut GateWorld, kind: String) {
    match world.state() {
        GateState::AuthenticatedStaffDenied { reason, .. } => {
            let reason = serde_json::to_value(reason).expect("reason serializes");
            assert_eq!(reason["kind"], kind.as_str());
        }
        other => panic!("expected a denial, got {:?}", other),
    }
}

#[then(expr = "the gate is no longer mounted")]
async fn then_gate_stopped(world: &mut GateWorld) {
    let gate = world.gate.as_mut().expect("no gate mounted");
    assert!(gate.changed().await.is_none());
    assert_eq!(world.context.listener_count(), 0);
}

#[then(expr = "the shell redirects to {string}")]
async fn then_shell_redirects(world: &mut GateWorld, path: String) {
    assert_eq!(world.outcome().redirect_path(), Some(path.as_str()), "outcome: {:?}", world.outcome());
}

#[then(expr = "the shell is branded {string}")]
async fn then_shell_branded(world: &mut GateWorld, brand: String) {
    match world.outcome() {
        ShellOutcome::Render(view) => assert_eq!(view.brand, brand),
        other => panic!("expected a rendered shell, got {:?}", other),
    }
}

#[then(expr = "the admin navigation shows sections {string}")]
async fn then_admin_sections(world: &mut GateWorld, expected: String) {
    match world.outcome() {
        ShellOutcome::Render(view) => assert_eq!(view.navigation.section_labels().join(", "), expected),
        other => panic!("expected a rendered shell, got {:?}", other),
    }
}

#[then(expr = "the admin navigation has no {string} section")]
async fn then_admin_lacks_section(world: &mut GateWorld, section: String) {
    match world.outcome() {
        ShellOutcome::Render(view) => {
            assert!(!view.navigation.section_labels().iter().any(|label| *label == section));
        }
        other => panic!("expected a rendered shell, got {:?}", other),
    }
}

#[then(expr = "the active link is {string}")]
async fn then_active_link(world: &mut GateWorld, label: String) {
    match world.outcome() {
        ShellOutcome::Render(view) => {
            assert_eq!(view.navigation.active().map(|item| item.label), Some(label.as_str()));
        }
        other => panic!("expected a rendered shell, got {:?}", other),
    }
}

#[then(expr = "no role lookup was made")]
async fn then_no_lookup(world: &mut GateWorld) {
    assert_eq!(world.directory.roles.lookup_count(), 0);
}
