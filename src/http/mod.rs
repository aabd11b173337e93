//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware)
//!     → request.rs (buffer body, keep request ID)
//!     → resilience::Dispatcher (pick backend, retry, fail over)
//!     → forward.rs (hyper client to the chosen backend)
//!     → response.rs (503 when no backend can serve)
//!     → Send to client
//! ```

pub mod forward;
pub mod request;
pub mod response;
pub mod server;

pub use forward::HttpForwarder;
pub use request::{BufferedRequest, X_REQUEST_ID};
pub use server::HttpServer;
