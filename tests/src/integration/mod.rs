//! Cross-crate flows: client session, event bus and transport together.

pub mod event_flows;
pub mod metrics_flows;
pub mod session_flows;
pub mod socket_transport;
