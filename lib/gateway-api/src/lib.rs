//! Gateway API types shared by every gateway crate
//!
//! This library defines:
//! - Attribute, Argument, TransporterService and Endpoint: the routing data model
//! - Scope and ScopedValue: request scopes and the tagged values they yield
//! - RequestContext: the read-only request view handed to resolution and transporters
//! - EndpointEvent and ServiceEvent: discovery change events
//! - v1alpha1: Kubernetes custom resources carrying endpoints and services

pub mod attribute;
pub mod argument;
pub mod context;
pub mod endpoint;
pub mod error;
pub mod event;
pub mod scope;
pub mod service;
pub mod v1alpha1;

pub use attribute::{Attribute, Attributes};
pub use argument::{Argument, ArgumentHooks, ArgumentType, LookupFn, ValueLoader, ValueResolver};
pub use context::{MultiMap, RequestContext};
pub use endpoint::{route_key, Endpoint};
pub use error::ResolveError;
pub use event::{EndpointEvent, EventType, ServiceEvent};
pub use scope::{Encoding, Scope, ScopedValue};
pub use service::TransporterService;
