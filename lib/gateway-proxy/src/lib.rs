//! HTTP edge of the gateway: transporters and hyper message conversion
pub mod echo;
pub mod error;
pub mod forwarder;
pub mod http;
pub mod policy;

pub use echo::EchoTransporter;
pub use error::{ProxyError, Result};
pub use forwarder::HttpTransporter;
pub use http::{build_context, read_request, render_error, render_response, text_response};
pub use policy::{RetryPolicy, TimeoutPolicy};
