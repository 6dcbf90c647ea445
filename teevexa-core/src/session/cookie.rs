//! Session cookie: carries the platform access token between requests
//!
//! The cookie never outlives the token inside it, and clearing it repeats
//! the scope attributes it was issued with so browsers actually drop it.

use super::{SameSitePolicy, Session};
use http::header::{AUTHORIZATION, COOKIE};
use http::Request;
use std::fmt::Write;

/// Cookie configuration
#[derive(Debug, Clone)]
pub struct CookieConfig {
    pub name: String,
    pub domain: Option<String>,
    pub path: String,
    /// Only sent over HTTPS
    pub secure: bool,
    /// Hidden from page scripts
    pub http_only: bool,
    pub same_site: SameSitePolicy,
    /// Upper bound on the cookie lifetime in seconds; the token expiry
    /// applies when it comes first
    pub max_age: Option<i64>,
}

impl Default for CookieConfig {
    fn default() -> Self {
        Self {
            name: "teevexa_session".to_string(),
            domain: None,
            path: "/".to_string(),
            secure: true,
            http_only: true,
            same_site: SameSitePolicy::Lax,
            max_age: Some(3600),
        }
    }
}

/// Issues, clears and reads the session cookie
#[derive(Debug, Clone)]
pub struct SessionCookie {
    config: CookieConfig,
}

/// Characters allowed in an unquoted cookie value
fn is_cookie_octet(c: char) -> bool {
    c.is_ascii_graphic() && !matches!(c, '"' | ',' | ';' | '\\')
}

impl SessionCookie {
    pub fn new(config: CookieConfig) -> Self {
        Self { config }
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Set-Cookie value storing the session's access token
    ///
    /// `None` when the token cannot travel in a cookie unquoted.
    pub fn issue(&self, session: &Session) -> Option<String> {
        let token = &session.access_token;
        if token.is_empty() || !token.chars().all(is_cookie_octet) {
            log::error!("Access token for {} is not cookie-safe, not issuing a cookie", session.user_id());
            return None;
        }

        let remaining = session.expires_in();
        let max_age = self.config.max_age.map_or(remaining, |cap| cap.min(remaining));
        Some(self.with_attributes(token, max_age))
    }

    /// Set-Cookie value that removes the session cookie
    pub fn clear(&self) -> String {
        self.with_attributes("", 0)
    }

    fn with_attributes(&self, value: &str, max_age: i64) -> String {
        let config = &self.config;
        let mut cookie = format!("{}={}; Path={}", config.name, value, config.path);
        if let Some(domain) = &config.domain {
            let _ = write!(cookie, "; Domain={}", domain);
        }
        let _ = write!(cookie, "; Max-Age={}", max_age.max(0));
        if config.secure {
            cookie.push_str("; Secure");
        }
        if config.http_only {
            cookie.push_str("; HttpOnly");
        }
        let _ = write!(cookie, "; SameSite={}", config.same_site.as_str());
        cookie
    }

    /// Access token carried by a request
    ///
    /// The session cookie is preferred; API clients may send
    /// `Authorization: Bearer <token>` instead.
    pub fn token_from_request<B>(&self, req: &Request<B>) -> Option<String> {
        let headers = req.headers();

        let from_cookie = headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .find_map(|header| self.token_in_cookie_header(header));
        if let Some(token) = from_cookie {
            return Some(token.to_string());
        }

        headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split_once(' '))
            .filter(|(scheme, _)| scheme.eq_ignore_ascii_case("bearer"))
            .map(|(_, token)| token.trim())
            .filter(|token| !token.is_empty())
            .map(str::to_string)
    }

    /// First non-empty value of the session cookie in one `Cookie` header
    fn token_in_cookie_header<'h>(&self, header: &'h str) -> Option<&'h str> {
        header
            .split(';')
            .filter_map(|pair| pair.trim().split_once('='))
            .filter(|(name, _)| *name == self.config.name)
            .map(|(_, value)| value.trim_matches('"'))
            .find(|value| !value.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Identity;
    use chrono::{Duration, Utc};

    fn session(token: &str, lifetime: Duration) -> Session {
        Session::new(Identity::new("user-1", None), token, Utc::now() + lifetime)
    }

    fn request(headers: &[(&str, &str)]) -> Request<()> {
        let mut builder = Request::builder();
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(()).unwrap()
    }

    fn max_age(set_cookie: &str) -> i64 {
        set_cookie
            .split("; ")
            .find_map(|attr| attr.strip_prefix("Max-Age="))
            .and_then(|v| v.parse().ok())
            .unwrap()
    }

    #[test]
    fn test_cookie_never_outlives_token() {
        let cookie = SessionCookie::new(CookieConfig::default());

        // Token shorter than the configured cap.
        let short = cookie.issue(&session("eyJ.abc-_", Duration::minutes(10))).unwrap();
        assert!(short.starts_with("teevexa_session=eyJ.abc-_; Path=/"));
        assert!((590..=600).contains(&max_age(&short)));

        let long = cookie.issue(&session("tok", Duration::days(7))).unwrap();
        assert_eq!(max_age(&long), 3600);

        let uncapped = SessionCookie::new(CookieConfig { max_age: None, ..CookieConfig::default() });
        assert!(max_age(&uncapped.issue(&session("tok", Duration::days(1))).unwrap()) > 86_000);

        let expired = cookie.issue(&session("tok", Duration::seconds(-30))).unwrap();
        assert_eq!(max_age(&expired), 0);
    }

    #[test]
    fn test_unsafe_tokens_are_not_issued() {
        let cookie = SessionCookie::new(CookieConfig::default());
        for token in ["", "a;b", "a b", "quo\"te"] {
            assert!(cookie.issue(&session(token, Duration::hours(1))).is_none(), "{:?}", token);
        }
    }

    #[test]
    fn test_clear_repeats_scope() {
        let cookie = SessionCookie::new(CookieConfig {
            domain: Some("teevexa.com".to_string()),
            same_site: SameSitePolicy::Strict,
            ..CookieConfig::default()
        });

        let issued = cookie.issue(&session("tok", Duration::hours(1))).unwrap();
        assert!(issued.contains("; Domain=teevexa.com; "));
        assert!(issued.ends_with("; Secure; HttpOnly; SameSite=Strict"));

        assert_eq!(
            cookie.clear(),
            "teevexa_session=; Path=/; Domain=teevexa.com; Max-Age=0; Secure; HttpOnly; SameSite=Strict"
        );
    }

    #[test]
    fn test_token_lookup_order() {
        let cookie = SessionCookie::new(CookieConfig::default());

        let req = request(&[("cookie", "theme=dark; teevexa_session=from-cookie"), ("authorization", "Bearer from-bearer")]);
        assert_eq!(cookie.token_from_request(&req).as_deref(), Some("from-cookie"));

        // An emptied cookie falls through to the header.
        let req = request(&[("cookie", "teevexa_session="), ("authorization", "bearer from-bearer")]);
        assert_eq!(cookie.token_from_request(&req).as_deref(), Some("from-bearer"));

        let req = request(&[("authorization", "Basic dXNlcjpwYXNz")]);
        assert_eq!(cookie.token_from_request(&req), None);
        assert_eq!(cookie.token_from_request(&request(&[])), None);
    }

    #[test]
    fn test_cookie_header_parsing() {
        let cookie = SessionCookie::new(CookieConfig::default());

        // Names must match exactly, and split cookie headers are all searched.
        let req = request(&[("cookie", "old_teevexa_session=x; teevexa_session_v2=y"), ("cookie", "teevexa_session=\"tok\"")]);
        assert_eq!(cookie.token_from_request(&req).as_deref(), Some("tok"));

        let req = request(&[("cookie", "teevexa_session=; teevexa_session=second")]);
        assert_eq!(cookie.token_from_request(&req).as_deref(), Some("second"));
    }
}
