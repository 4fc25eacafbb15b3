//! Admin surface: health and registry inspection

use gateway_core::{list_routes, EndpointRegistry, ServiceQuery, ServiceRegistry};
use gateway_proxy::http::not_found_response;
use gateway_proxy::text_response;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::{Method, Request, Response, StatusCode};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

#[derive(Clone)]
pub struct Admin {
    endpoints: Arc<EndpointRegistry>,
    services: Arc<ServiceRegistry>,
}

impl Admin {
    pub fn new(endpoints: Arc<EndpointRegistry>, services: Arc<ServiceRegistry>) -> Self {
        Self { endpoints, services }
    }

    pub fn handle<B>(&self, req: &Request<B>) -> Response<Full<Bytes>> {
        let path = req.uri().path();
        debug!(method = %req.method(), path, "Admin request");
        if req.method() != Method::GET {
            return text_response(StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed");
        }
        match path {
            "/healthz" => text_response(StatusCode::OK, "OK"),
            "/inspect/services" => {
                let params: HashMap<String, String> = req
                    .uri()
                    .query()
                    .map(|q| url::form_urlencoded::parse(q.as_bytes()).into_owned().collect())
                    .unwrap_or_default();
                let query = ServiceQuery::from_params(|key| params.get(key).cloned());
                json_response(&query.run(&self.services))
            }
            "/inspect/endpoints" => json_response(&list_routes(&self.endpoints)),
            other => not_found_response(other),
        }
    }
}

fn json_response<T: Serialize>(value: &T) -> Response<Full<Bytes>> {
    match serde_json::to_vec(value) {
        Ok(bytes) => {
            let mut out = Response::new(Full::new(Bytes::from(bytes)));
            out.headers_mut()
                .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
            out
        }
        Err(e) => text_response(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string()),
    }
}
