//! Free-form conversation with the same endpoint used for analysis.

pub mod session;

pub use session::{ChatMessage, ChatSession, Speaker};
