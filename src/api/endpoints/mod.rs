//! API endpoint handlers.
//!
//! Model-bound work runs on the blocking pool; handlers only decode
//! payloads and shape replies.

pub mod analysis;
pub mod health;
pub mod locale;
pub mod suggestions;
