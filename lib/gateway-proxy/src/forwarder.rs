//! HTTP transporter: forwards resolved backend calls to HTTP services

use crate::policy::{RetryPolicy, TimeoutPolicy};
use async_trait::async_trait;
use gateway_api::{RequestContext, TransporterService};
use gateway_core::{resolve_arguments, InvokeError, ResolvedArgument, ResponseBody, ServeResponse, Transporter};
use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use hyper::header::{HeaderName, HeaderValue, CONTENT_TYPE};
use hyper::{Method, Request, Uri};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use serde_json::{Map, Value};
use std::time::Duration;
use tokio::time::timeout as tokio_timeout;
use tracing::{debug, warn};

pub const ERR_BACKEND_UNREACHABLE: &str = "GATEWAY:BACKEND/UNREACHABLE";
pub const ERR_BACKEND_TIMEOUT: &str = "GATEWAY:BACKEND/TIMEOUT";
pub const ERR_INVALID_TARGET: &str = "GATEWAY:SERVICE/INVALID_TARGET";
pub const ERR_INVALID_ARGUMENT: &str = "GATEWAY:ARGUMENT/INVALID";

/// HttpTransporter calls `scheme://remoteHost/interface` using the service
/// method as HTTP method. Connections are pooled across calls.
pub struct HttpTransporter {
    client: Client<HttpConnector, Full<Bytes>>,
}

impl HttpTransporter {
    pub fn new() -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(TimeoutPolicy::default().connect_timeout));
        connector.set_keepalive(Some(Duration::from_secs(30)));

        let client = Client::builder(TokioExecutor::new()).build::<_, Full<Bytes>>(connector);
        Self { client }
    }

    async fn send_once(
        &self,
        request: Request<Full<Bytes>>,
        timeout: Duration,
    ) -> Result<ServeResponse, InvokeError> {
        match tokio_timeout(timeout, self.client.request(request)).await {
            Ok(Ok(response)) => {
                let (parts, body) = response.into_parts();
                let bytes = body
                    .collect()
                    .await
                    .map_err(|e| {
                        InvokeError::new(502, ERR_BACKEND_UNREACHABLE, "Failed reading backend response")
                            .with_cause(e)
                    })?
                    .to_bytes();

                let mut out = ServeResponse {
                    status_code: parts.status.as_u16(),
                    headers: Default::default(),
                    body: ResponseBody::Empty,
                };
                for (name, value) in parts.headers.iter() {
                    let name = name.as_str();
                    if is_hop_by_hop_header(name) || name == "content-length" {
                        continue;
                    }
                    if let Ok(value) = value.to_str() {
                        out = out.with_header(name, value);
                    }
                }
                let content_type = parts
                    .headers
                    .get(CONTENT_TYPE)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default()
                    .to_string();
                out.body = decode_body(content_type, bytes);
                Ok(out)
            }
            Ok(Err(e)) => Err(InvokeError::new(
                502,
                ERR_BACKEND_UNREACHABLE,
                "Error communicating with backend service",
            )
            .with_cause(e)),
            Err(_) => Err(InvokeError::new(
                504,
                ERR_BACKEND_TIMEOUT,
                format!("Backend request timeout after {:?}", timeout),
            )),
        }
    }
}

impl Default for HttpTransporter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transporter for HttpTransporter {
    async fn invoke(
        &self,
        ctx: &RequestContext,
        service: &TransporterService,
    ) -> Result<ServeResponse, InvokeError> {
        let args = resolve_arguments(&service.arguments, ctx)
            .map_err(|e| InvokeError::new(400, ERR_INVALID_ARGUMENT, e.to_string()))?;
        let timeout = TimeoutPolicy::from_service(service);
        let retry = RetryPolicy::from_service(service);

        let mut attempt = 0;
        loop {
            let request = build_request(ctx, service, &args)?;
            debug!(
                request_id = %ctx.request_id,
                service_id = %service.service_id(),
                uri = %request.uri(),
                attempt,
                "Forwarding to backend"
            );
            let outcome = self.send_once(request, timeout.request_timeout).await;
            let status = match &outcome {
                Ok(response) => response.status_code,
                Err(e) => e.status_code,
            };
            if attempt >= retry.max_retries || !retry.should_retry(status) {
                return outcome;
            }
            let backoff = retry.backoff_duration(attempt);
            warn!(
                request_id = %ctx.request_id,
                service_id = %service.service_id(),
                status,
                attempt,
                backoff_ms = backoff.as_millis() as u64,
                "Retrying backend call"
            );
            tokio::time::sleep(backoff).await;
            attempt += 1;
        }
    }
}

/// Target URL without query: `scheme://remoteHost/interface`
pub fn target_url(service: &TransporterService) -> Result<String, InvokeError> {
    if service.remote_host.is_empty() {
        return Err(InvokeError::new(
            500,
            ERR_INVALID_TARGET,
            format!("Service {} has no remote host", service.service_id()),
        ));
    }
    let scheme = if service.scheme.is_empty() {
        "http"
    } else {
        service.scheme.as_str()
    };
    Ok(format!(
        "{}://{}/{}",
        scheme.to_ascii_lowercase(),
        service.remote_host.trim_end_matches('/'),
        service.interface.trim_start_matches('/')
    ))
}

/// Methods whose arguments travel in the query string
fn args_in_query(method: &Method) -> bool {
    matches!(*method, Method::GET | Method::DELETE | Method::HEAD)
}

fn build_request(
    ctx: &RequestContext,
    service: &TransporterService,
    args: &[ResolvedArgument],
) -> Result<Request<Full<Bytes>>, InvokeError> {
    let invalid = |reason: String| InvokeError::new(500, ERR_INVALID_TARGET, reason);
    let method = Method::from_bytes(service.method.to_ascii_uppercase().as_bytes())
        .map_err(|e| invalid(format!("Invalid HTTP method {:?}: {}", service.method, e)))?;

    let mut url = target_url(service)?;
    let body = if args_in_query(&method) {
        let query = encode_query(args);
        if !query.is_empty() {
            url.push('?');
            url.push_str(&query);
        }
        None
    } else {
        let mut object = Map::new();
        for arg in args {
            object.insert(arg.name.clone(), arg.value.clone());
        }
        Some(Value::Object(object).to_string())
    };
    let uri: Uri = url
        .parse()
        .map_err(|e| invalid(format!("Invalid backend URL {:?}: {}", url, e)))?;

    let mut builder = Request::builder().method(method).uri(uri);
    for (name, values) in &ctx.headers {
        if is_hop_by_hop_header(name) || matches!(name.as_str(), "host" | "content-length" | "content-type") {
            continue;
        }
        let Ok(name) = HeaderName::from_bytes(name.as_bytes()) else {
            continue;
        };
        for value in values {
            if let Ok(value) = HeaderValue::from_str(value) {
                builder = builder.header(name.clone(), value);
            }
        }
    }
    if !ctx.request_id.is_empty() {
        builder = builder.header("x-request-id", ctx.request_id.as_str());
    }

    let body = match body {
        Some(json) => {
            builder = builder.header(CONTENT_TYPE, "application/json");
            Full::new(Bytes::from(json))
        }
        None => Full::new(Bytes::new()),
    };
    builder
        .body(body)
        .map_err(|e| invalid(format!("Failed to build backend request: {}", e)))
}

/// Encode arguments as query pairs; lists repeat the key, nulls are skipped
fn encode_query(args: &[ResolvedArgument]) -> String {
    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    for arg in args {
        match &arg.value {
            Value::Null => {}
            Value::Array(items) => {
                for item in items {
                    serializer.append_pair(&arg.name, &query_text(item));
                }
            }
            other => {
                serializer.append_pair(&arg.name, &query_text(other));
            }
        }
    }
    serializer.finish()
}

fn query_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn decode_body(content_type: String, bytes: Bytes) -> ResponseBody {
    if bytes.is_empty() {
        return ResponseBody::Empty;
    }
    if content_type.contains("json") {
        if let Ok(value) = serde_json::from_slice(&bytes) {
            return ResponseBody::Json(value);
        }
    }
    ResponseBody::Raw {
        content_type,
        bytes: bytes.to_vec(),
    }
}

/// Check if header is hop-by-hop (should not be forwarded)
pub fn is_hop_by_hop_header(name: &str) -> bool {
    matches!(
        name,
        "connection"
            | "keep-alive"
            | "proxy-authenticate"
            | "proxy-authorization"
            | "te"
            | "trailers"
            | "transfer-encoding"
            | "upgrade"
    )
}
