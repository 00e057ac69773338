//! Translation between a canonical chat-message model and the Gemini
//! `generateContent` and Interactions wire protocols.

pub mod config;
pub mod error;
pub mod observability;
pub mod protocol;
pub mod stream;

mod util;

pub use config::TranscodeConfig;
pub use error::TranscodeError;
