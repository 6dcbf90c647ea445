use crate::world::GateWorld;
use cucumber::{given, then, when};
use cucumber_tests::{cookie_pair, RunningPortal, PASSWORD};

#[given(expr = "the portal server is running")]
async fn given_portal_running(world: &mut GateWorld) {
    let portal = RunningPortal::start(&world.directory).await.expect("failed to start portal server");
    let health = portal.request("GET", "/health", None).await.expect("health check failed");
    assert_eq!(health.status, 200);
    world.portal = Some(portal);
}

#[when(expr = "{string} signs in through the login form")]
async fn when_form_sign_in(world: &mut GateWorld, email: String) {
    let response = world.portal().sign_in(&email, PASSWORD).await.expect("sign-in request failed");
    world.cookie = response.set_cookie.as_deref().map(|c| cookie_pair(c).to_string());
    world.last_response = Some(response);
}

#[when(expr = "{string} signs in with password {string}")]
async fn when_form_sign_in_with(world: &mut GateWorld, email: String, password: String) {
    let response = world.portal().sign_in(&email, &password).await.expect("sign-in request failed");
    world.cookie = response.set_cookie.as_deref().map(|c| cookie_pair(c).to_string());
    world.last_response = Some(response);
}

#[when(expr = "{string} signs up as {string}")]
async fn when_sign_up(world: &mut GateWorld, email: String, full_name: String) {
    let fields = [("full_name", full_name.as_str()), ("email", email.as_str()), ("password", PASSWORD)];
    let response = world.portal().submit("/auth/signup", &fields, None).await.expect("sign-up request failed");
    world.cookie = response.set_cookie.as_deref().map(|c| cookie_pair(c).to_string());
    world.last_response = Some(response);
}

#[when(expr = "{string} asks for a password reset")]
async fn when_reset_requested(world: &mut GateWorld, email: String) {
    let response = world
        .portal()
        .submit("/auth/forgot-password", &[("email", email.as_str())], None)
        .await
        .expect("reset request failed");
    world.last_response = Some(response);
}

#[when(expr = "they change their password to {string}")]
async fn when_password_changed(world: &mut GateWorld, password: String) {
    let fields = [("password", password.as_str()), ("confirm", password.as_str())];
    let response = world
        .portal()
        .submit("/auth/reset-password", &fields, world.cookie.as_deref())
        .await
        .expect("password change failed");
    world.last_response = Some(response);
}

#[when(expr = "they {word} {string}")]
async fn when_request(world: &mut GateWorld, method: String, path: String) {
    let method = method.to_uppercase();
    let response = world
        .portal()
        .request(&method, &path, world.cookie.as_deref())
        .await
        .expect("request failed");
    world.last_response = Some(response);
}

#[then(expr = "the response status is {int}")]
async fn then_status(world: &mut GateWorld, status: u16) {
    assert_eq!(world.response().status, status, "body: {}", world.response().body);
}

#[then(expr = "they are redirected to {string}")]
async fn then_redirected(world: &mut GateWorld, location: String) {
    let response = world.response();
    assert_eq!(response.status, 302, "body: {}", response.body);
    assert_eq!(response.location.as_deref(), Some(location.as_str()));
}

#[then(expr = "a session cookie is set")]
async fn then_cookie_set(world: &mut GateWorld) {
    let cookie = world.cookie.as_deref().expect("no Set-Cookie header");
    assert!(cookie.starts_with("teevexa_session="));
}

#[then(expr = "no session cookie is set")]
async fn then_no_cookie(world: &mut GateWorld) {
    assert!(world.cookie.is_none());
}

#[then(expr = "the page contains {string}")]
async fn then_page_contains(world: &mut GateWorld, text: String) {
    assert!(world.response().body.contains(&text), "body: {}", world.response().body);
}

#[then(expr = "the page does not contain {string}")]
async fn then_page_lacks(world: &mut GateWorld, text: String) {
    assert!(!world.response().body.contains(&text), "body: {}", world.response().body);
}

#[then(expr = "a reset link was sent to {string}")]
async fn then_reset_sent(world: &mut GateWorld, email: String) {
    let base_url = world.portal().base_url.clone();
    let expected = (email, Some(format!("{}/auth/reset-password", base_url)));
    assert!(world.directory.auth.reset_requests().contains(&expected), "{:?}", world.directory.auth.reset_requests());
}

#[then(expr = "no reset link was sent")]
async fn then_no_reset_sent(world: &mut GateWorld) {
    assert!(world.directory.auth.reset_requests().is_empty());
}
