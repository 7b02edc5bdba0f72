//! Inbound schemas
//!
//! Lenient payloads received from other processes and logged key event
//! streams that can be replayed through a recorder.

mod key_event;
mod payload;

pub use key_event::*;
pub use payload::*;
