//! httpdnsd - file-serving HTTP daemon with a DNS-over-HTTP relay
//!
//! Serves GET and PUT against a document root, relays `POST /dns-query`
//! form submissions to a DNS resolver, and registers itself with a
//! directory server at startup and shutdown.

pub mod config;
pub mod dns;
pub mod engine;
pub mod http;
pub mod net;
pub mod registration;
pub mod server;
pub mod uri;
