//! Shared utilities: IPv4 address parsing.

pub mod ip_utils;

pub use ip_utils::parse_ipv4;
