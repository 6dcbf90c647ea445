//! Request routing and handlers

use super::response::{self, Body};
use crate::gate::{AreaKind, GatePaths, GateState};
use crate::roles::RoleDirectory;
use crate::session::{
    AuthBackend, PasswordChange, Session, SessionContext, SessionCookie, SignUpForm, MIN_PASSWORD_LEN,
};
use crate::shell::{escape_html, loading_html, Navigation, Shell, ShellOutcome};
use http::header::{ACCEPT, CONTENT_TYPE, ORIGIN, SET_COOKIE};
use http::{Method, Request, Response, StatusCode};
use http_body_util::{BodyExt, Limited};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::Arc;

/// Everything a request handler needs
pub(super) struct PortalState {
    pub auth: Arc<dyn AuthBackend>,
    pub directory: Arc<dyn RoleDirectory>,
    pub cookie: SessionCookie,
    pub paths: GatePaths,
    pub portal: Shell,
    pub admin: Shell,
    pub max_body_size: usize,
}

impl PortalState {
    fn shell(&self, area: AreaKind) -> &Shell {
        match area {
            AreaKind::Client => &self.portal,
            AreaKind::Staff => &self.admin,
        }
    }

    fn area_for(&self, path: &str) -> Option<AreaKind> {
        if within(path, &self.paths.admin) {
            Some(AreaKind::Staff)
        } else if within(path, &self.paths.portal) {
            Some(AreaKind::Client)
        } else {
            None
        }
    }
}

/// `path` is `root` or below it
fn within(path: &str, root: &str) -> bool {
    let root = root.trim_end_matches('/');
    path == root || path.strip_prefix(root).is_some_and(|rest| rest.starts_with('/'))
}

pub(super) async fn handle_request<B>(
    state: Arc<PortalState>,
    req: Request<B>,
) -> Result<Response<Body>, Infallible>
where
    B: hyper::body::Body,
    B::Error: std::error::Error + Send + Sync + 'static,
{
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let response = route(&state, req).await;

    log::info!("{} {} -> {}", method, path, response.status().as_u16());
    Ok(response)
}

async fn route<B>(state: &PortalState, req: Request<B>) -> Response<Body>
where
    B: hyper::body::Body,
    B::Error: std::error::Error + Send + Sync + 'static,
{
    let path = req.uri().path().to_string();
    let paths = &state.paths;

    match (req.method(), path.as_str()) {
        (&Method::GET, "/health") => response::json(StatusCode::OK, r#"{"status":"ok"}"#),
        (&Method::GET, "/api/access") => access_report(state, &req).await,
        (&Method::GET, p) if p == paths.login => response::html(StatusCode::OK, sign_in_page(paths)),
        (&Method::POST, p) if p == paths.sign_in_action() => sign_in(state, req).await,
        (&Method::POST, p) if p == paths.sign_out_action() => sign_out(state, &req).await,
        (&Method::POST, p) if p == paths.sign_up_action() => sign_up(state, req).await,
        (&Method::GET, p) if p == paths.forgot_password() => {
            response::html(StatusCode::OK, forgot_password_page(paths))
        }
        (&Method::POST, p) if p == paths.forgot_password() => request_reset(state, req).await,
        (&Method::GET, p) if p == paths.reset_password() => reset_password_form(state, &req).await,
        (&Method::POST, p) if p == paths.reset_password() => reset_password(state, req).await,
        (&Method::GET, p) => match state.area_for(p) {
            Some(area) => render_area(state, &req, area).await,
            None => not_found(p),
        },
        (_, p) => not_found(p),
    }
}

fn not_found(path: &str) -> Response<Body> {
    response::error(StatusCode::NOT_FOUND, "not_found", &format!("No route for {}", path))
}

fn wants_json<B>(req: &Request<B>) -> bool {
    req.headers()
        .get(ACCEPT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|accept| accept.contains("application/json"))
}

/// Build a session context for one request from the token it carries
async fn request_context<B>(state: &PortalState, req: &Request<B>) -> (Arc<SessionContext>, bool) {
    let context = Arc::new(SessionContext::new(state.auth.clone()));
    let mut stale_token = false;
    if let Some(token) = state.cookie.token_from_request(req) {
        stale_token = context.restore(&token).await.is_none();
    }
    (context, stale_token)
}

/// Result of one gate mount for a request
struct GateRun {
    state: GateState,
    outcome: ShellOutcome,
    /// The request carried a token the backend no longer accepts
    stale_token: bool,
}

/// Mount the area's gate for this request and wait for its answer
async fn run_gate<B>(state: &PortalState, req: &Request<B>, area: AreaKind, current_path: &str) -> GateRun {
    let (context, stale_token) = request_context(state, req).await;
    let shell = state.shell(area);

    let mut gate = shell.mount(context, state.directory.clone());
    let gate_state = gate.settled().await;
    gate.unmount().await;

    let outcome = shell.outcome(&gate_state, current_path);
    GateRun { state: gate_state, outcome, stale_token }
}

async fn render_area<B>(state: &PortalState, req: &Request<B>, area: AreaKind) -> Response<Body> {
    let run = run_gate(state, req, area, req.uri().path()).await;

    match run.outcome {
        ShellOutcome::Redirect(location) => {
            let redirect = response::redirect(&location);
            if run.stale_token {
                response::with_header(redirect, SET_COOKIE, &state.cookie.clear())
            } else {
                redirect
            }
        }
        ShellOutcome::Render(view) if wants_json(req) => response::json_value(StatusCode::OK, &view),
        ShellOutcome::Render(view) => response::html(StatusCode::OK, view.to_html()),
        ShellOutcome::Loading => {
            log::warn!("{} gate stopped before resolving", area);
            response::html(StatusCode::SERVICE_UNAVAILABLE, loading_html(state.shell(area).kind().brand()))
        }
    }
}

#[derive(Serialize)]
struct AccessReport {
    area: AreaKind,
    state: GateState,
    redirect: Option<String>,
    navigation: Option<Navigation>,
}

/// Decoded value of a query-string parameter
fn query_param(query: Option<&str>, name: &str) -> Option<String> {
    query?
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| *key == name)
        .and_then(|(_, value)| urlencoding::decode(&value.replace('+', " ")).ok().map(|v| v.into_owned()))
}

async fn access_report<B>(state: &PortalState, req: &Request<B>) -> Response<Body> {
    let area = query_param(req.uri().query(), "area").and_then(|value| value.parse::<AreaKind>().ok());

    let area = match area {
        Some(area) => area,
        None => {
            return response::error(
                StatusCode::BAD_REQUEST,
                "invalid_area",
                "Query parameter 'area' must be 'client' or 'staff'",
            )
        }
    };

    let root = match area {
        AreaKind::Client => state.paths.portal.clone(),
        AreaKind::Staff => state.paths.admin.clone(),
    };
    let run = run_gate(state, req, area, &root).await;

    let redirect = run.outcome.redirect_path().map(str::to_string);
    let navigation = match run.outcome {
        ShellOutcome::Render(view) => Some(view.navigation),
        _ => None,
    };

    response::json_value(StatusCode::OK, &AccessReport { area, state: run.state, redirect, navigation })
}

#[derive(Debug, Deserialize, PartialEq)]
pub(super) struct Credentials {
    pub email: String,
    pub password: String,
}

enum BodyError {
    TooLarge,
    Malformed(String),
}

async fn read_body<B>(req: Request<B>, limit: usize) -> Result<(Option<String>, bytes::Bytes), BodyError>
where
    B: hyper::body::Body,
    B::Error: std::error::Error + Send + Sync + 'static,
{
    let content_type =
        req.headers().get(CONTENT_TYPE).and_then(|v| v.to_str().ok()).map(str::to_ascii_lowercase);

    match Limited::new(req.into_body(), limit).collect().await {
        Ok(collected) => Ok((content_type, collected.to_bytes())),
        Err(e) if e.is::<http_body_util::LengthLimitError>() => Err(BodyError::TooLarge),
        Err(e) => Err(BodyError::Malformed(e.to_string())),
    }
}

/// Decode a JSON or urlencoded form body into `T`
pub(super) fn parse_form<T: DeserializeOwned>(content_type: Option<&str>, body: &[u8]) -> Result<T, String> {
    let is_form = content_type.is_some_and(|ct| ct.starts_with("application/x-www-form-urlencoded"));
    if !is_form {
        return serde_json::from_slice(body).map_err(|e| e.to_string());
    }

    let body = std::str::from_utf8(body).map_err(|e| e.to_string())?;
    let mut fields = serde_json::Map::new();
    for pair in body.split('&').filter(|p| !p.is_empty()) {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        let value = urlencoding::decode(&value.replace('+', " "))
            .map_err(|e| e.to_string())?
            .into_owned();
        fields.entry(key.to_string()).or_insert_with(|| value.into());
    }
    serde_json::from_value(fields.into()).map_err(|e| e.to_string())
}

/// Read and decode a form, or the error response to send instead
async fn read_form<T, B>(state: &PortalState, req: Request<B>, expected: &str) -> Result<T, Response<Body>>
where
    T: DeserializeOwned,
    B: hyper::body::Body,
    B::Error: std::error::Error + Send + Sync + 'static,
{
    let (content_type, body) = match read_body(req, state.max_body_size).await {
        Ok(read) => read,
        Err(BodyError::TooLarge) => {
            return Err(response::error(StatusCode::PAYLOAD_TOO_LARGE, "payload_too_large", "Request body too large"))
        }
        Err(BodyError::Malformed(e)) => return Err(response::error(StatusCode::BAD_REQUEST, "invalid_body", &e)),
    };

    parse_form(content_type.as_deref(), &body).map_err(|e| {
        log::debug!("Rejected form body: {}", e);
        response::error(StatusCode::BAD_REQUEST, "invalid_body", &format!("Expected {}", expected))
    })
}

/// Response for a failed account operation
fn account_error(action: &str, error: crate::Error) -> Response<Body> {
    match error {
        crate::Error::Validation(message) => {
            log::info!("{} refused: {}", action, message);
            response::error(StatusCode::BAD_REQUEST, "invalid_input", &message)
        }
        crate::Error::Authentication(message) => {
            log::info!("{} refused: {}", action, message);
            response::error(StatusCode::UNAUTHORIZED, "invalid_credentials", &message)
        }
        e => {
            log::error!("{} failed: {}", action, e);
            response::error(StatusCode::BAD_GATEWAY, "backend_unavailable", "Authentication service unavailable")
        }
    }
}

/// Redirect into the portal with the session cookie set
fn signed_in_redirect(state: &PortalState, session: &Session) -> Response<Body> {
    let redirect = response::redirect(&state.paths.portal);
    match state.cookie.issue(session) {
        Some(cookie) => response::with_header(redirect, SET_COOKIE, &cookie),
        None => redirect,
    }
}

async fn sign_in<B>(state: &PortalState, req: Request<B>) -> Response<Body>
where
    B: hyper::body::Body,
    B::Error: std::error::Error + Send + Sync + 'static,
{
    let credentials: Credentials = match read_form(state, req, "email and password").await {
        Ok(credentials) => credentials,
        Err(response) => return response,
    };

    let context = SessionContext::new(state.auth.clone());
    match context.sign_in_with_password(&credentials.email, &credentials.password).await {
        Ok(session) => signed_in_redirect(state, &session),
        Err(e) => account_error("Sign-in", e),
    }
}

async fn sign_up<B>(state: &PortalState, req: Request<B>) -> Response<Body>
where
    B: hyper::body::Body,
    B::Error: std::error::Error + Send + Sync + 'static,
{
    let json = wants_json(&req);
    let form: SignUpForm = match read_form(state, req, "email, password and full_name").await {
        Ok(form) => form,
        Err(response) => return response,
    };

    let context = SessionContext::new(state.auth.clone());
    match context.sign_up(&form).await {
        Ok(Some(session)) => signed_in_redirect(state, &session),
        Ok(None) if json => response::json(StatusCode::ACCEPTED, r#"{"status":"confirmation_sent"}"#),
        Ok(None) => response::html(
            StatusCode::ACCEPTED,
            notice_page("Check your email", "We sent you a confirmation link.", &state.paths.login),
        ),
        Err(e) => account_error("Sign-up", e),
    }
}

#[derive(Deserialize)]
struct ResetRequest {
    email: String,
}

async fn request_reset<B>(state: &PortalState, req: Request<B>) -> Response<Body>
where
    B: hyper::body::Body,
    B::Error: std::error::Error + Send + Sync + 'static,
{
    // Reset links come back to this deployment's reset page.
    let redirect_to = req
        .headers()
        .get(ORIGIN)
        .and_then(|v| v.to_str().ok())
        .filter(|origin| origin.starts_with("http://") || origin.starts_with("https://"))
        .map(|origin| format!("{}{}", origin.trim_end_matches('/'), state.paths.reset_password()));
    let json = wants_json(&req);

    let form: ResetRequest = match read_form(state, req, "email").await {
        Ok(form) => form,
        Err(response) => return response,
    };

    let context = SessionContext::new(state.auth.clone());
    match context.request_password_reset(&form.email, redirect_to.as_deref()).await {
        Ok(()) if json => response::json(StatusCode::ACCEPTED, r#"{"status":"reset_requested"}"#),
        Ok(()) => response::html(
            StatusCode::ACCEPTED,
            notice_page(
                "Reset Password",
                "If an account exists with that email, you'll receive a reset link shortly.",
                &state.paths.login,
            ),
        ),
        Err(e) => account_error("Password reset request", e),
    }
}

async fn reset_password_form<B>(state: &PortalState, req: &Request<B>) -> Response<Body> {
    let (context, _) = request_context(state, req).await;
    let signed_in = context.current_session().await.is_some();
    response::html(StatusCode::OK, reset_password_page(&state.paths, signed_in))
}

/// New-password form; `access_token` comes from a reset link
#[derive(Deserialize)]
struct NewPasswordForm {
    password: String,
    confirm: String,
    #[serde(default)]
    access_token: String,
}

async fn reset_password<B>(state: &PortalState, req: Request<B>) -> Response<Body>
where
    B: hyper::body::Body,
    B::Error: std::error::Error + Send + Sync + 'static,
{
    let cookie_token = state.cookie.token_from_request(&req);
    let form: NewPasswordForm = match read_form(state, req, "password and confirm").await {
        Ok(form) => form,
        Err(response) => return response,
    };

    let token = Some(form.access_token.trim().to_string()).filter(|t| !t.is_empty()).or(cookie_token);
    let context = SessionContext::new(state.auth.clone());
    let restored = match token {
        Some(token) => context.restore(&token).await,
        None => None,
    };
    if restored.is_none() {
        return response::error(StatusCode::UNAUTHORIZED, "session_required", "Reset link expired or not signed in");
    }

    let change = PasswordChange { password: form.password, confirm: form.confirm };
    match context.update_password(&change).await {
        Ok(()) => response::redirect(&state.paths.login),
        Err(e) => account_error("Password change", e),
    }
}

async fn sign_out<B>(state: &PortalState, req: &Request<B>) -> Response<Body> {
    let (context, _) = request_context(state, req).await;
    let outcome = state.portal.sign_out(&context).await;
    let home = outcome.redirect_path().unwrap_or(&state.paths.home);

    response::with_header(response::redirect(home), SET_COOKIE, &state.cookie.clear())
}

fn page(title: &str, main: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head><meta charset=\"utf-8\"><title>TEEVEXA</title></head>\n<body>\
<main><h1>{}</h1>{}</main></body>\n</html>\n",
        escape_html(title),
        main
    )
}

fn sign_in_page(paths: &GatePaths) -> String {
    let main = format!(
        "<form method=\"post\" action=\"{}\">\
<label>Email <input type=\"email\" name=\"email\" autocomplete=\"username\" required></label>\
<label>Password <input type=\"password\" name=\"password\" autocomplete=\"current-password\" required></label>\
<button type=\"submit\">Sign in</button>\
</form>\
<p><a href=\"{}\">Forgot password?</a></p>\
<h2>Create Account</h2>\
<form method=\"post\" action=\"{}\">\
<label>Full Name <input name=\"full_name\" autocomplete=\"name\" required></label>\
<label>Email <input type=\"email\" name=\"email\" autocomplete=\"email\" required></label>\
<label>Password <input type=\"password\" name=\"password\" autocomplete=\"new-password\" minlength=\"{}\" required></label>\
<button type=\"submit\">Create Account</button>\
</form>",
        escape_html(&paths.sign_in_action()),
        escape_html(&paths.forgot_password()),
        escape_html(&paths.sign_up_action()),
        MIN_PASSWORD_LEN
    );
    page("Sign in", &main)
}

fn forgot_password_page(paths: &GatePaths) -> String {
    let main = format!(
        "<p>Enter your email and we'll send a reset link.</p>\
<form method=\"post\" action=\"{}\">\
<label>Email <input type=\"email\" name=\"email\" required></label>\
<button type=\"submit\">Send Reset Link</button>\
</form>\
<p><a href=\"{}\">Back to Login</a></p>",
        escape_html(&paths.forgot_password()),
        escape_html(&paths.login)
    );
    page("Reset Password", &main)
}

/// Reset links carry the recovery token in the URL fragment, which only the
/// browser sees; the inline script moves it into the form. Without a session
/// or a recovery fragment the page sends the visitor to sign in.
fn reset_password_page(paths: &GatePaths, signed_in: bool) -> String {
    // A JSON string literal is a valid script literal once "</" cannot end the tag.
    let login = serde_json::to_string(&paths.login)
        .map(|literal| literal.replace("</", "<\\/"))
        .unwrap_or_else(|_| "\"/\"".to_string());
    let main = format!(
        "<form method=\"post\" action=\"{}\">\
<input type=\"hidden\" name=\"access_token\" value=\"\">\
<label>New Password <input type=\"password\" name=\"password\" autocomplete=\"new-password\" minlength=\"{}\" required></label>\
<label>Confirm Password <input type=\"password\" name=\"confirm\" autocomplete=\"new-password\" required></label>\
<button type=\"submit\">Update Password</button>\
</form>\
<script>(function(){{var p=new URLSearchParams(location.hash.slice(1));\
if(p.get(\"type\")===\"recovery\"&&p.get(\"access_token\")){{document.querySelector(\"input[name=access_token]\").value=p.get(\"access_token\");}}\
else if(!{}){{location.replace({});}}}})();</script>",
        escape_html(&paths.reset_password()),
        MIN_PASSWORD_LEN,
        signed_in,
        login
    );
    page("Set New Password", &main)
}

fn notice_page(title: &str, message: &str, back: &str) -> String {
    let main = format!("<p>{}</p><p><a href=\"{}\">Back to Login</a></p>", escape_html(message), escape_html(back));
    page(title, &main)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_within() {
        assert!(within("/admin", "/admin"));
        assert!(within("/admin/leads", "/admin"));
        assert!(within("/admin/", "/admin/"));
        assert!(!within("/administrator", "/admin"));
        assert!(!within("/client-portal", "/admin"));
    }

    #[test]
    fn test_parse_json_forms() {
        let parsed: Credentials =
            parse_form(Some("application/json"), br#"{"email":"ada@example.com","password":"p"}"#).unwrap();
        assert_eq!(parsed, Credentials { email: "ada@example.com".into(), password: "p".into() });

        assert!(parse_form::<Credentials>(Some("application/json"), b"{\"email\":1}").is_err());
        assert!(parse_form::<Credentials>(None, b"not json").is_err());
    }

    #[test]
    fn test_parse_urlencoded_forms() {
        let parsed: Credentials = parse_form(
            Some("application/x-www-form-urlencoded; charset=utf-8"),
            b"email=ada%40example.com&password=p%26q+r&remember=on",
        )
        .unwrap();
        assert_eq!(parsed.email, "ada@example.com");
        assert_eq!(parsed.password, "p&q r");

        assert!(parse_form::<Credentials>(Some("application/x-www-form-urlencoded"), b"email=a").is_err());

        let sign_up: SignUpForm = parse_form(
            Some("application/x-www-form-urlencoded"),
            b"full_name=Ada+Lovelace&email=ada%40example.com&password=s3cret&email=second%40example.com",
        )
        .unwrap();
        assert_eq!(sign_up.full_name, "Ada Lovelace");
        // First occurrence wins.
        assert_eq!(sign_up.email, "ada@example.com");

        let reset: NewPasswordForm =
            parse_form(Some("application/x-www-form-urlencoded"), b"password=n3w-pass&confirm=n3w-pass").unwrap();
        assert_eq!(reset.access_token, "");
    }

    #[test]
    fn test_query_param_is_decoded() {
        assert_eq!(query_param(Some("area=staff"), "area").as_deref(), Some("staff"));
        assert_eq!(query_param(Some("x=1&area=%73taff"), "area").as_deref(), Some("staff"));
        assert_eq!(query_param(Some("subarea=client&area=st%61ff"), "area").as_deref(), Some("staff"));
        assert_eq!(query_param(Some("area=a+b"), "area").as_deref(), Some("a b"));
        assert_eq!(query_param(Some("area"), "area"), None);
        assert_eq!(query_param(None, "area"), None);
    }

    #[test]
    fn test_account_pages() {
        let paths = GatePaths::default();

        let sign_in = sign_in_page(&paths);
        assert!(sign_in.contains("action=\"/auth/login\""));
        assert!(sign_in.contains("action=\"/auth/signup\""));
        assert!(sign_in.contains("href=\"/auth/forgot-password\""));
        assert!(sign_in.contains("name=\"full_name\""));

        assert!(forgot_password_page(&paths).contains("action=\"/auth/forgot-password\""));

        let reset = reset_password_page(&paths, false);
        assert!(reset.contains("action=\"/auth/reset-password\""));
        assert!(reset.contains("else if(!false){location.replace(\"/auth\");}"));
        assert!(reset_password_page(&paths, true).contains("else if(!true)"));

        let hostile = GatePaths { login: "/</script><b>".into(), ..GatePaths::default() };
        assert!(!reset_password_page(&hostile, false).contains("</script><b>"));
    }
}
