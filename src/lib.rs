//! ComTerm Library
//!
//! Interactive serial port terminal: per-port profiles, text/hex send and
//! display modes, a background receive loop, and settings persistence.

pub mod cli;
pub mod core;
pub mod domain;
pub mod infrastructure;

pub use crate::core::connection::Connection;
pub use crate::core::session::SessionController;
pub use crate::domain::error::{ComTermError, ComTermResult};
pub use crate::domain::profile::{PortProfile, ProfileStore};
