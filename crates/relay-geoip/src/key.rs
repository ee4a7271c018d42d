use std::net::{IpAddr, Ipv4Addr};

/// Parses `addr` as IPv4. IPv6 and malformed input yield `None`.
pub fn parse_ipv4(addr: &str) -> Option<Ipv4Addr> {
    match addr.trim().parse::<IpAddr>().ok()? {
        IpAddr::V4(v4) => Some(v4),
        IpAddr::V6(_) => None,
    }
}

/// The `/24` network key, e.g. `203.0.113.0` for `203.0.113.77`.
pub fn network_key(addr: Ipv4Addr) -> String {
    let [a, b, c, _] = addr.octets();
    format!("{a}.{b}.{c}.0")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_prefix_same_key() {
        let a = network_key(parse_ipv4("203.0.113.7").unwrap());
        let b = network_key(parse_ipv4(" 203.0.113.250 ").unwrap());
        assert_eq!(a, "203.0.113.0");
        assert_eq!(a, b);
    }

    #[test]
    fn test_ipv6_and_garbage_rejected() {
        assert!(parse_ipv4("2001:db8::1").is_none());
        assert!(parse_ipv4("::ffff:10.0.0.1").is_none());
        assert!(parse_ipv4("not-an-ip").is_none());
        assert!(parse_ipv4("").is_none());
    }
}
