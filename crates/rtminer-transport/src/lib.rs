//! # rtminer Transport
//!
//! Blocking TCP channel carrying Java object-serialization streams for the
//! rtminer client.
//!
//! ## Features
//!
//! - **Header Handshake**: Both stream headers are exchanged under the connect timeout
//! - **Value Framing**: Values are encoded and decoded with `rtminer-wire`, one flush per value
//! - **Out-of-band Shutdown**: A [`ShutdownHandle`] unblocks a pending read from another thread
//! - **Frame Accounting**: [`ObjectChannel::has_pending_input`] detects surplus bytes
//! - **Metrics**: Lock-free counters with serializable snapshots
//! - **Test Server**: `testing::MockServer` behind the `test-util` feature
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use rtminer_transport::ChannelBuilder;
//! use std::net::SocketAddr;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let addr: SocketAddr = "127.0.0.1:4444".parse()?;
//!     let mut channel = ChannelBuilder::new().connect_timeout_ms(2000).open(addr)?;
//!
//!     channel.send_int(1)?;
//!     let tables = channel.receive()?.into_string_list()?;
//!     println!("{tables:?}");
//!
//!     channel.close();
//!     Ok(())
//! }
//! ```

#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub,
    clippy::all
)]
#![deny(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::must_use_candidate
)]

mod channel;
mod config;
mod error;
mod metrics;
mod types;

#[cfg(any(test, feature = "test-util"))]
#[cfg_attr(docsrs, doc(cfg(feature = "test-util")))]
pub mod testing;

pub use channel::{ObjectChannel, ShutdownHandle};
pub use config::{ChannelBuilder, ChannelConfig};
pub use error::{TransportError, TransportResult};
pub use metrics::{AtomicMetrics, TransportMetrics};
pub use types::TransportState;

// Re-export the value model for convenience
pub use rtminer_wire::{CodecError, Value};
