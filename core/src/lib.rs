//! Normalization and webhook forwarding for the generate relay.
//!
//! [`normalize`] turns a frontend submission into the flat record list the
//! webhook consumes; [`forward`] delivers it and retries while the webhook's
//! queue is full.

pub mod coerce;
pub mod config;
pub mod forward;
pub mod normalize;

pub use config::RelayConfig;
pub use forward::{ForwardError, ForwardOutcome, Forwarder, ForwarderConfig};
pub use normalize::{
    normalize, normalize_with, CanonicalRecord, NormalizePolicy, Payload, ToolKind,
};
