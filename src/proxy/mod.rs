//! Proxy module
//!
//! Handles request forwarding to the upstream Gemini API.

pub mod forwarder;
pub mod headers;
pub mod logging;
pub mod models;
pub mod pipeline;
pub mod request;
pub mod response;
pub mod transport;
pub mod types;

pub use forwarder::Forwarder;
pub use logging::RequestContext;
pub use models::ModelAliases;
pub use pipeline::GeminiProxy;
pub use request::RequestNormalizer;
pub use response::{GenerationResponse, ResponseNormalizer};
pub use transport::{ReqwestTransport, Transport};
pub use types::{InboundRequest, OutboundBody, OutboundResult, UpstreamRequest, UpstreamResponse};
