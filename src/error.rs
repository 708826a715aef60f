//! Error classification shared by every service module.
//!
//! DESIGN
//! ======
//! Each module owns its own `thiserror` enum. They all implement
//! [`ErrorCode`], which gives a stable machine code and an [`ErrorKind`]
//! class. The route layer maps `ErrorKind` to an HTTP status in one place,
//! so services never know about status codes.

/// Coarse error class, independent of transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad client input: transcript, registration shape, tool arguments.
    Validation,
    /// Unknown service or endpoint.
    NotFound,
    /// Duplicate service name.
    Conflict,
    /// A remote service or the language model failed or timed out.
    Upstream,
    /// Routing cannot proceed right now (no healthy services, no LLM).
    Unavailable,
    /// Anything else. Details are logged, never returned to callers.
    Internal,
}

pub trait ErrorCode: std::fmt::Display {
    fn error_code(&self) -> &'static str;

    fn kind(&self) -> ErrorKind;

    fn retryable(&self) -> bool {
        false
    }
}
