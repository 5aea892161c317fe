//! # gavel-shared
//!
//! Types shared by the Gavel live client crates: resource identifiers, the
//! marketplace domain records, the push-event wire protocol and the REST
//! envelopes.

pub mod constants;
pub mod error;
pub mod model;
pub mod protocol;
pub mod types;

pub use error::ProtocolError;
pub use model::*;
pub use protocol::{ApiResponse, LiveEvent, Page};
pub use types::*;
