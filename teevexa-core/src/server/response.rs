//! Response helpers for the route handlers

use bytes::Bytes;
use http::header::{HeaderName, HeaderValue, CONTENT_TYPE, LOCATION};
use http::StatusCode;
use http_body_util::Full;
use hyper::Response;
use serde::Serialize;

pub type Body = Full<Bytes>;

fn with_body(status: StatusCode, content_type: &'static str, body: impl Into<Bytes>) -> Response<Body> {
    let mut response = Response::new(Full::new(body.into()));
    *response.status_mut() = status;
    response.headers_mut().insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    response
}

/// JSON response with the given status code
pub fn json(status: StatusCode, body: impl Into<String>) -> Response<Body> {
    with_body(status, "application/json", body.into())
}

/// Serialize `value` as the JSON body
pub fn json_value<T: Serialize>(status: StatusCode, value: &T) -> Response<Body> {
    match serde_json::to_string(value) {
        Ok(body) => json(status, body),
        Err(e) => {
            log::error!("Failed to serialize response body: {}", e);
            error(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", "Internal server error")
        }
    }
}

/// JSON error body `{"error": code, "message": message}`
pub fn error(status: StatusCode, code: &str, message: &str) -> Response<Body> {
    json(status, serde_json::json!({ "error": code, "message": message }).to_string())
}

/// HTML response with the given status code
pub fn html(status: StatusCode, body: impl Into<String>) -> Response<Body> {
    with_body(status, "text/html; charset=utf-8", body.into())
}

/// 302 redirect to the given location
pub fn redirect(location: &str) -> Response<Body> {
    let mut response = Response::new(Full::new(Bytes::new()));
    *response.status_mut() = StatusCode::FOUND;
    let location = HeaderValue::from_str(location).unwrap_or_else(|_| {
        log::error!("Unusable redirect target {:?}, sending to /", location);
        HeaderValue::from_static("/")
    });
    response.headers_mut().insert(LOCATION, location);
    response
}

/// Append a header, dropping (and logging) values that are not valid header text
pub fn with_header(mut response: Response<Body>, name: HeaderName, value: &str) -> Response<Body> {
    match HeaderValue::from_str(value) {
        Ok(value) => {
            response.headers_mut().append(name, value);
        }
        Err(e) => log::error!("Dropping invalid {} header: {}", name, e),
    }
    response
}
