//! Domain models for the coach service.

pub mod phase;
pub mod session;

pub use phase::Phase;
pub use session::{Session, Turn};
