//! Core routing and dispatch functionality
//!
//! This library provides:
//! - Endpoint registry: per-route-key, per-version endpoint tables
//! - Service registry and the registrar that applies discovery events
//! - Transporter registry and request dispatch
//! - Argument scope resolution against the inbound request

pub mod dispatch;
pub mod error;
pub mod inspect;
pub mod registrar;
pub mod registry;
pub mod resolver;
pub mod services;
pub mod transporter;
pub mod value_types;

pub use dispatch::{DispatchError, Dispatcher};
pub use error::{CoreError, Result};
pub use inspect::{list_routes, RouteSummary, ServiceQuery};
pub use registrar::{Registrar, RouteState};
pub use registry::{EndpointRegistry, MultiEndpoint};
pub use resolver::{lookup, resolve_argument, resolve_arguments, ResolvedArgument};
pub use services::{ensure_service_id, ServiceRegistry};
pub use transporter::{InvokeError, ResponseBody, ServeResponse, Transporter, TransporterRegistry};
