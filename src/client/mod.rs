//! Request orchestration for the Gemini `generateContent` endpoint.

pub mod orchestrator;
pub mod request;
pub mod response;
pub mod retry;
pub mod transport;

pub use orchestrator::{ClientConfig, GeminiClient, DEFAULT_ENDPOINT, DEFAULT_MODEL};
pub use request::{Content, GenerateContentRequest, GenerationConfig, InlineData, Part};
pub use retry::RetryPolicy;
pub use transport::{HttpTransport, Transport, TransportError, TransportResponse};
