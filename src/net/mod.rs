//! Network plumbing shared by the server, the DNS relay and the outgoing
//! HTTP client.

pub mod io;
pub mod socket;

pub use io::{CHUNK_SIZE, CopyError, copy_exact, read_exact, read_some, write_exact};
