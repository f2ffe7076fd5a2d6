//! HTTP protocol implementation.
//!
//! Just enough HTTP/1.1 to answer one request per connection:
//!
//! - **`reader`**: reads the first line a client sends
//! - **`request`**: the received line, split best-effort for logging
//! - **`response`**: HTTP response representation with builder pattern
//! - **`writer`**: serializes and writes a response in full
//! - **`connection`**: the per-connection state machine
//!
//! # Connection State Machine
//!
//! ```text
//!        ┌─────────────┐
//!        │   Reading   │ ← Wait for the first line
//!        └──────┬──────┘
//!               │ Line received (EOF first → Closed, nothing written)
//!               ▼
//!        ┌──────────────────┐
//!        │   Generating     │ ← Fortune → art → <pre> body
//!        └──────┬───────────┘
//!               │ Body ready (failure → Closed, nothing written)
//!               ▼
//!        ┌──────────────────┐
//!        │    Writing       │ ← Send status, headers and body
//!        └──────┬───────────┘
//!               │ Response sent
//!               ▼
//!        ┌──────────────────┐
//!        │     Closed       │ ← Shut down write side, drain input
//!        └──────────────────┘
//! ```

pub mod connection;
pub mod reader;
pub mod request;
pub mod response;
pub mod writer;
