//! HTTP protocol implementation.
//!
//! One request per connection, no keep-alive, no chunked encoding.
//!
//! # Architecture
//!
//! - **`connection`**: Per-connection worker: one read, parse, dispatch, close
//! - **`parser`**: Splits the raw header into request line and header lines
//! - **`request`**: Parsed request and header lookups
//! - **`router`**: Chooses the GET, PUT or DNS-query engine
//! - **`response`**: Status codes and response builder
//! - **`writer`**: Serializes and writes responses
//! - **`client`**: Outgoing PUT used by registration
//!
//! # Request Flow
//!
//! ```text
//!        ┌─────────────┐
//!        │   Reading   │ ← Single read of up to 8 KiB
//!        └──────┬──────┘
//!               │ Header captured
//!               ▼
//!        ┌──────────────────┐
//!        │   Parsing        │ ← No blank line → 400
//!        └──────┬───────────┘
//!               │
//!               ▼
//!        ┌──────────────────┐
//!        │   Routing        │ ← Unknown method → 405
//!        └──────┬───────────┘
//!               │ GET / PUT / POST /dns-query
//!               ▼
//!        ┌──────────────────┐
//!        │   Engine         │ ← Streams the body, writes the reply
//!        └──────┬───────────┘
//!               │
//!               └─ Close
//! ```

pub mod client;
pub mod connection;
pub mod parser;
pub mod request;
pub mod response;
pub mod router;
pub mod writer;
