//! # rtminer Client
//!
//! Session driver for the rtminer decision-tree server: connect to the
//! server, learn or load a tree, print it, or walk it interactively to a
//! prediction.
//!
//! ## Features
//!
//! - Process-wide [`Session`] owning the single server connection
//! - Strict request/reply ordering under one session mutex
//! - Multi-turn [`PredictionDialog`] holding an exclusive channel lease
//! - Cancellation of any in-flight exchange by [`Session::disconnect`]
//! - [`RequestDispatcher`] that keeps blocking I/O off the caller's thread
//! - Endpoint validation and a pluggable [`NetworkProbe`]
//!
//! ## Architecture
//!
//! ```text
//! Caller (UI, CLI)
//!        ↓
//! RequestDispatcher (rtminer-io thread)
//!        ↓
//! Session / PredictionDialog (this crate)
//!        ↓
//! ObjectChannel (rtminer-transport)
//!        ↓
//! Object stream codec (rtminer-wire)
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use rtminer_client::{RequestDispatcher, Turn};
//!
//! # async fn example() -> rtminer_client::ClientResult<()> {
//! let dispatcher = RequestDispatcher::global()?;
//! dispatcher.set_endpoint("127.0.0.1", 50000).await?;
//! dispatcher.connect().await?;
//!
//! let tables = dispatcher.list_tables().await?;
//! println!("Tables: {tables:?}");
//!
//! dispatcher.learn_tree_from_table("iris").await?.ensure_ok()?;
//! println!("{}", dispatcher.print_tree().await?);
//!
//! let dialog = dispatcher.begin_prediction().await?;
//! let mut turn = dialog.turn();
//! while let Turn::Query { prompt, .. } = &turn {
//!     println!("{prompt}");
//!     turn = dispatcher.choose(&dialog, 0).await?;
//! }
//! println!("Prediction: {:?}", dialog.prediction());
//!
//! dispatcher.disconnect().await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! Every operation returns [`ClientResult`]. Use [`ClientError::kind`] to
//! branch on the failure class; I/O, decode and protocol errors
//! ([`ClientError::is_fatal`]) have already closed the connection when they
//! are returned.

#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub,
    clippy::all
)]
#![deny(unsafe_code)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::must_use_candidate
)]

pub mod dispatcher;
pub mod endpoint;
pub mod error;
pub mod network;
pub mod prediction;
pub mod prelude;
pub mod protocol;
pub mod session;

pub use dispatcher::{Pending, RequestDispatcher};
pub use endpoint::{Endpoint, EndpointCheck, validate_host, validate_port};
pub use error::{ClientError, ClientResult, ErrorKind};
pub use network::{NetworkProbe, RouteProbe, StaticProbe};
pub use prediction::PredictionDialog;
pub use protocol::{Catalogue, LoadStatus, RequestCode, Turn};
pub use session::{Session, SessionConfig, SessionState};

// Re-export metrics for convenience
pub use rtminer_transport::TransportMetrics;
