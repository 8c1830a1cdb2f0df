//! IPv4 parsing for addresses read from configuration files.

use std::net::Ipv4Addr;

/// Parse a dotted IPv4 address, trimming surrounding whitespace and quotes
pub fn parse_ipv4(ip: &str) -> Result<Ipv4Addr, String> {
    let cleaned = ip.trim().trim_matches('"');
    cleaned
        .parse::<Ipv4Addr>()
        .map_err(|_| format!("Invalid IPv4 address '{}'", cleaned))
}
