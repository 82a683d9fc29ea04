//! bloodhound - a sniffing reverse proxy
//!
//! Every inbound request is assigned a correlation ID, frozen for
//! inspection, forwarded to the single configured upstream, and the
//! upstream's answer relayed back unchanged. Sniffers observe the exchange
//! at two hook points: right before the rewritten request leaves the
//! process, and right after the upstream response arrives. The stock
//! sniffers emit structured logs and, when a bone directory is configured,
//! write one dump file per message per request.

pub mod bones;
pub mod capture;
pub mod cli;
pub mod config;
pub mod correlate;
pub mod proxy;
pub mod sniff;

pub use config::Config;
pub use correlate::{RequestCorrelator, RequestId};
pub use proxy::server::start_proxy;
