//! DNS relay: forwards A/AAAA lookups received over HTTP to a resolver.
//!
//! - **`codec`**: query encoding and answer-section decoding
//! - **`relay`**: the UDP exchange, bounded by a fixed wait

pub mod codec;
pub mod relay;

use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use thiserror::Error;

pub use relay::DnsRelay;

#[derive(Debug, Error)]
pub enum DnsError {
    #[error("invalid query name: {0:?}")]
    InvalidName(String),
    #[error("malformed reply: {0}")]
    Malformed(&'static str),
    #[error("no reply within {0:?}")]
    Timeout(std::time::Duration),
    #[error("resolver unreachable: {0}")]
    Unreachable(#[source] anyhow::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Record types the relay can ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecordType {
    #[default]
    A,
    AAAA,
}

impl RecordType {
    pub fn code(self) -> u16 {
        match self {
            RecordType::A => 1,
            RecordType::AAAA => 28,
        }
    }
}

impl FromStr for RecordType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "A" => Ok(RecordType::A),
            "AAAA" => Ok(RecordType::AAAA),
            other => Err(format!("unsupported record type: {other}")),
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordType::A => f.write_str("A"),
            RecordType::AAAA => f.write_str("AAAA"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnsQuery {
    pub record_type: RecordType,
    pub name: String,
}

/// Resolved addresses, in the order the resolver listed them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DnsAnswer {
    pub addresses: Vec<IpAddr>,
}

impl DnsAnswer {
    /// Plain-text rendering: one address per line.
    pub fn to_text(&self) -> String {
        self.addresses.iter().map(|a| format!("{a}\n")).collect()
    }
}
