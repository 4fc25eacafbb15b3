//! Echo transporter: answers with the call it would have made

use crate::forwarder::ERR_INVALID_ARGUMENT;
use async_trait::async_trait;
use gateway_api::{RequestContext, TransporterService};
use gateway_core::{resolve_arguments, InvokeError, ServeResponse, Transporter};
use serde_json::{json, Map, Value};

/// EchoTransporter never leaves the process. It is useful for smoke tests
/// and for checking how arguments resolve against real requests.
#[derive(Debug, Default)]
pub struct EchoTransporter;

#[async_trait]
impl Transporter for EchoTransporter {
    async fn invoke(
        &self,
        ctx: &RequestContext,
        service: &TransporterService,
    ) -> Result<ServeResponse, InvokeError> {
        let args = resolve_arguments(&service.arguments, ctx)
            .map_err(|e| InvokeError::new(400, ERR_INVALID_ARGUMENT, e.to_string()))?;
        let mut arguments = Map::new();
        for arg in args {
            arguments.insert(arg.name, arg.value);
        }
        let service = serde_json::to_value(service).unwrap_or(Value::Null);
        Ok(ServeResponse::json(
            200,
            json!({
                "requestId": ctx.request_id,
                "service": service,
                "arguments": arguments,
            }),
        )
        .with_header("x-request-id", ctx.request_id.clone()))
    }
}
