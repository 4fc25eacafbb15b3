//! Conversion between hyper messages and the gateway's request/response model

use crate::error::{ProxyError, Result};
use gateway_api::RequestContext;
use gateway_core::{DispatchError, ResponseBody, ServeResponse};
use http_body_util::{BodyExt, Full};
use hyper::body::{Bytes, Incoming};
use hyper::header::{HeaderValue, CONTENT_TYPE, HOST};
use hyper::{Request, Response, StatusCode};
use serde_json::json;
use std::collections::BTreeMap;
use std::net::SocketAddr;
use tracing::warn;

pub const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";

/// Read an inbound request into a [`RequestContext`]. Path variables are
/// filled in later by the router.
pub async fn read_request(request: Request<Incoming>, remote_addr: SocketAddr) -> Result<RequestContext> {
    let (parts, body) = request.into_parts();
    let body = body
        .collect()
        .await
        .map_err(|e| ProxyError::Body(e.to_string()))?
        .to_bytes();
    Ok(build_context(&parts, body.to_vec(), remote_addr))
}

/// Build a context from request head and collected body
pub fn build_context(parts: &hyper::http::request::Parts, body: Vec<u8>, remote_addr: SocketAddr) -> RequestContext {
    let uri = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| parts.uri.path().to_string());
    let mut ctx = RequestContext::new(parts.method.as_str(), uri);
    ctx.request_id = uuid::Uuid::new_v4().to_string();
    ctx.remote_addr = remote_addr.to_string();

    for (name, value) in parts.headers.iter() {
        if let Ok(value) = value.to_str() {
            ctx.headers
                .entry(name.as_str().to_string())
                .or_default()
                .push(value.to_string());
        }
    }
    ctx.host = ctx
        .header_var(HOST.as_str())
        .map(str::to_string)
        .or_else(|| parts.uri.host().map(str::to_string))
        .unwrap_or_default();

    if let Some(query) = parts.uri.query() {
        for (k, v) in url::form_urlencoded::parse(query.as_bytes()) {
            ctx.query.entry(k.into_owned()).or_default().push(v.into_owned());
        }
    }

    ctx.content_type = ctx.header_var(CONTENT_TYPE.as_str()).unwrap_or_default().to_string();
    if ctx.content_type.starts_with(FORM_URLENCODED) {
        for (k, v) in url::form_urlencoded::parse(&body) {
            ctx.form.entry(k.into_owned()).or_default().push(v.into_owned());
        }
    }
    ctx.body = body;
    ctx
}

/// Render a transporter response
pub fn render_response(response: ServeResponse) -> Response<Full<Bytes>> {
    let status = StatusCode::from_u16(response.status_code).unwrap_or(StatusCode::BAD_GATEWAY);
    let (content_type, bytes) = match response.body {
        ResponseBody::Empty => (None, Bytes::new()),
        ResponseBody::Json(value) => (Some("application/json".to_string()), Bytes::from(value.to_string())),
        ResponseBody::Raw { content_type, bytes } => {
            ((!content_type.is_empty()).then_some(content_type), Bytes::from(bytes))
        }
    };

    let mut out = Response::new(Full::new(bytes));
    *out.status_mut() = status;
    let headers = out.headers_mut();
    for (name, values) in &response.headers {
        let Ok(name) = hyper::header::HeaderName::from_bytes(name.as_bytes()) else {
            warn!(header = %name, "Dropping invalid response header");
            continue;
        };
        if name == CONTENT_TYPE {
            continue;
        }
        for value in values {
            if let Ok(value) = HeaderValue::from_str(value) {
                headers.append(name.clone(), value);
            }
        }
    }
    if let Some(ct) = content_type.and_then(|ct| HeaderValue::from_str(&ct).ok()) {
        headers.insert(CONTENT_TYPE, ct);
    }
    out
}

/// Render a dispatch failure as a JSON error document
pub fn render_error(error: &DispatchError, request_id: &str) -> Response<Full<Bytes>> {
    let mut body = json!({
        "status": error.status_code(),
        "code": error.error_code(),
        "message": error.to_string(),
        "requestId": request_id,
    });
    if let DispatchError::Invocation(e) = error {
        body["message"] = json!(e.message);
        if let Some(cause) = &e.cause {
            body["cause"] = json!(cause);
        }
    }
    render_response(ServeResponse {
        status_code: error.status_code(),
        headers: BTreeMap::new(),
        body: ResponseBody::Json(body),
    })
}

/// Plain text response, used by the admin surface
pub fn text_response(status: StatusCode, message: &str) -> Response<Full<Bytes>> {
    let mut out = Response::new(Full::new(Bytes::from(format!("{}\n", message))));
    *out.status_mut() = status;
    out.headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"));
    out
}

/// 404 Not Found response
pub fn not_found_response(reason: &str) -> Response<Full<Bytes>> {
    text_response(StatusCode::NOT_FOUND, &format!("Not Found: {}", reason))
}

#[cfg(test)]
mod tests {
    use super::*;
    use gateway_core::InvokeError;

    fn parts(request: Request<()>) -> hyper::http::request::Parts {
        request.into_parts().0
    }

    #[test]
    fn test_build_context() {
        let head = parts(
            Request::builder()
                .method("POST")
                .uri("/users/7?tag=a&tag=b%20c")
                .header("Host", "api.example.com")
                .header("Content-Type", FORM_URLENCODED)
                .header("X-Version", "v2")
                .body(())
                .unwrap(),
        );
        let ctx = build_context(&head, b"name=bob&role=a&role=b".to_vec(), "10.0.0.1:5000".parse().unwrap());
        assert_eq!(ctx.method, "POST");
        assert_eq!(ctx.path, "/users/7");
        assert_eq!(ctx.uri, "/users/7?tag=a&tag=b%20c");
        assert_eq!(ctx.host, "api.example.com");
        assert_eq!(ctx.remote_addr, "10.0.0.1:5000");
        assert_eq!(ctx.query_vars("tag").unwrap(), ["a", "b c"]);
        assert_eq!(ctx.form_var("name"), Some("bob"));
        assert_eq!(ctx.form_vars("role").map(<[String]>::len), Some(2));
        assert_eq!(ctx.header_var("X-Version"), Some("v2"));
        assert!(!ctx.request_id.is_empty());
    }

    #[test]
    fn test_json_body_is_not_parsed_as_form() {
        let head = parts(
            Request::builder()
                .method("POST")
                .uri("/users")
                .header("Content-Type", "application/json")
                .body(())
                .unwrap(),
        );
        let ctx = build_context(&head, br#"{"a":1}"#.to_vec(), "127.0.0.1:1".parse().unwrap());
        assert!(ctx.form.is_empty());
        assert_eq!(ctx.content_type, "application/json");
        assert_eq!(ctx.body, br#"{"a":1}"#);
    }

    #[test]
    fn test_render_response() {
        let response = render_response(
            ServeResponse::json(201, json!({"ok": true})).with_header("x-trace", "t1"),
        );
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.headers()[CONTENT_TYPE], "application/json");
        assert_eq!(response.headers()["x-trace"], "t1");
    }

    #[test]
    fn test_render_error() {
        let err = DispatchError::TransporterNotFound {
            proto: "DUBBO".to_string(),
            service_id: "svc:get".to_string(),
        };
        assert_eq!(render_error(&err, "r1").status(), StatusCode::INTERNAL_SERVER_ERROR);

        let err = DispatchError::Invocation(InvokeError::new(504, "GATEWAY:BACKEND/TIMEOUT", "slow"));
        assert_eq!(render_error(&err, "r2").status(), StatusCode::GATEWAY_TIMEOUT);
    }

    #[test]
    fn test_not_found_response() {
        let response = not_found_response("GET#/nothing");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
