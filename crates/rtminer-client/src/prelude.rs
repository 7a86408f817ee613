//! Common imports for code driving a session.
//!
//! ```rust
//! use rtminer_client::prelude::*;
//! ```

pub use crate::dispatcher::{Pending, RequestDispatcher};
pub use crate::endpoint::{Endpoint, EndpointCheck};
pub use crate::error::{ClientError, ClientResult, ErrorKind};
pub use crate::network::{NetworkProbe, StaticProbe};
pub use crate::prediction::PredictionDialog;
pub use crate::protocol::{Catalogue, LoadStatus, Turn};
pub use crate::session::{Session, SessionState};
