use anyhow::{Context, Result};
use gateway_api::route_key;
use gateway_api::service::{PROTO_ECHO, PROTO_HTTP};
use gateway_core::{DispatchError, Dispatcher, EndpointRegistry, Registrar, ServiceRegistry, TransporterRegistry};
use gateway_discovery::{DiscoveryManager, DiscoveryStreams, KubernetesDiscovery, ResourceDiscovery};
use gateway_proxy::{read_request, render_error, render_response, text_response, EchoTransporter, HttpTransporter};
use http_body_util::Full;
use hyper::body::{Bytes, Incoming};
use hyper::header::HeaderName;
use hyper::{server::conn::http1, service::service_fn, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

mod admin;
mod config;
mod router;

use admin::Admin;
use config::{init_logging, GatewayConfig};
use router::Router;

/// Request path state shared by every gateway connection
struct Gateway {
    router: Router,
    dispatcher: Dispatcher,
    version_header: HeaderName,
}

impl Gateway {
    async fn handle(&self, req: Request<Incoming>, remote_addr: SocketAddr) -> Response<Full<Bytes>> {
        let method = req.method().as_str().to_string();
        let path = req.uri().path().to_string();
        let version = req
            .headers()
            .get(&self.version_header)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();

        let Some(found) = self.router.route(&method, &path) else {
            debug!(method = %method, path = %path, "No route");
            let err = DispatchError::EndpointNotFound {
                key: route_key(&method, &path),
                version,
            };
            return render_error(&err, "");
        };

        let mut ctx = match read_request(req, remote_addr).await {
            Ok(ctx) => ctx,
            Err(e) => return text_response(StatusCode::BAD_REQUEST, &e.to_string()),
        };
        ctx.path_vars = found.path_vars;

        match self.dispatcher.dispatch(&found.key, &version, &ctx).await {
            Ok(response) => {
                debug!(request_id = %ctx.request_id, key = %found.key, status = response.status_code, "Dispatched");
                render_response(response)
            }
            Err(e) => {
                warn!(request_id = %ctx.request_id, key = %found.key, version = %version, error = %e, "Dispatch failed");
                render_error(&e, &ctx.request_id)
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = GatewayConfig::load()?;
    init_logging(&config.log);

    info!("Starting gateway...");

    let endpoints = Arc::new(EndpointRegistry::new());
    let services = Arc::new(ServiceRegistry::new());
    info!("Registries initialized");

    let transporters = Arc::new(TransporterRegistry::new());
    transporters.register(PROTO_HTTP, Arc::new(HttpTransporter::new()));
    transporters.register(PROTO_ECHO, Arc::new(EchoTransporter));

    let cancel = CancellationToken::new();

    let mut manager = DiscoveryManager::new(config.channel_capacity);
    manager
        .register(ResourceDiscovery::default(), &config.discovery.resource)
        .await
        .context("Failed to initialize static discovery")?;
    if let Some(k8s) = &config.discovery.kubernetes {
        manager
            .register(KubernetesDiscovery::default(), k8s)
            .await
            .context("Failed to initialize Kubernetes discovery")?;
    }
    info!(sources = ?manager.source_ids(), "Discovery initialized");
    let DiscoveryStreams {
        endpoints: endpoint_events,
        services: service_events,
        tasks: mut discovery_tasks,
    } = manager.start(cancel.clone());

    let registrar_cancel = cancel.clone();
    let registrar = Registrar::new(endpoints.clone(), services.clone());
    let registrar_task = tokio::spawn(async move {
        let outcome = registrar
            .run(endpoint_events, service_events, registrar_cancel.clone())
            .await;
        if outcome.is_err() {
            registrar_cancel.cancel();
        }
        outcome
    });

    let gateway = Arc::new(Gateway {
        router: Router::new(endpoints.clone()),
        dispatcher: Dispatcher::new(endpoints.clone(), transporters),
        version_header: HeaderName::from_bytes(config.version_header.as_bytes())
            .with_context(|| format!("Invalid version header {:?}", config.version_header))?,
    });
    let admin = Admin::new(endpoints, services);

    let gateway_listener = TcpListener::bind(config.listen).await?;
    info!("Gateway listening on {}", config.listen);
    let admin_listener = TcpListener::bind(config.admin_listen).await?;
    info!("Admin listening on {}", config.admin_listen);

    let gateway_server = tokio::spawn(serve("gateway", gateway_listener, cancel.clone(), move |req, addr| {
        let gateway = gateway.clone();
        async move { gateway.handle(req, addr).await }
    }));
    let admin_server = tokio::spawn(serve("admin", admin_listener, cancel.clone(), move |req, _addr| {
        let admin = admin.clone();
        async move { admin.handle(&req) }
    }));

    tokio::select! {
        _ = tokio::signal::ctrl_c() => info!("Shutdown signal received, exiting..."),
        _ = cancel.cancelled() => warn!("Gateway stopping after fatal error"),
    }
    cancel.cancel();

    let _ = tokio::join!(gateway_server, admin_server);
    while let Some(joined) = discovery_tasks.join_next().await {
        if let Err(e) = joined {
            error!("Discovery task failed: {}", e);
        }
    }
    registrar_task.await??;
    Ok(())
}

/// Accept connections until cancelled, serving each with `handler`
async fn serve<H, Fut>(name: &'static str, listener: TcpListener, cancel: CancellationToken, handler: H)
where
    H: Fn(Request<Incoming>, SocketAddr) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = Response<Full<Bytes>>> + Send + 'static,
{
    loop {
        let (stream, peer_addr) = tokio::select! {
            _ = cancel.cancelled() => break,
            accepted = listener.accept() => match accepted {
                Ok(accepted) => accepted,
                Err(e) => {
                    warn!(server = name, "Error accepting connection: {}", e);
                    continue;
                }
            },
        };
        let handler = handler.clone();

        tokio::task::spawn(async move {
            let service = service_fn(move |req| {
                let response = handler(req, peer_addr);
                async move { Ok::<_, Infallible>(response.await) }
            });

            if let Err(e) = http1::Builder::new()
                .serve_connection(TokioIo::new(stream), service)
                .await
            {
                debug!(server = name, "Error serving connection from {}: {}", peer_addr, e);
            }
        });
    }
    info!(server = name, "Listener stopped");
}
