//! Change events produced by discovery sources

use crate::endpoint::Endpoint;
use crate::service::TransporterService;
use serde::{Deserialize, Serialize};

/// Kind of change carried by an event
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventType {
    Added,
    Updated,
    Removed,
}

#[derive(Clone, Debug, PartialEq)]
pub struct EndpointEvent {
    pub event_type: EventType,
    pub endpoint: Endpoint,
}

impl EndpointEvent {
    pub fn new(event_type: EventType, endpoint: Endpoint) -> Self {
        Self {
            event_type,
            endpoint,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ServiceEvent {
    pub event_type: EventType,
    pub service: TransporterService,
}

impl ServiceEvent {
    pub fn new(event_type: EventType, service: TransporterService) -> Self {
        Self {
            event_type,
            service,
        }
    }
}
