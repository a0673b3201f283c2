//! Address and port validation
//!
//! The shell hands over whatever the user typed; both parts are checked and
//! each failure is reported on its own.

use std::net::{IpAddr, SocketAddr};

use crate::error::AppError;

/// Parse an IP address and port typed by the user
///
/// On failure returns every problem found, address first.
pub fn parse_endpoint(address: &str, port: &str) -> Result<SocketAddr, Vec<AppError>> {
    let ip = parse_address(address);
    let port = parse_port(port);

    match (ip, port) {
        (Ok(ip), Ok(port)) => Ok(SocketAddr::new(ip, port)),
        (ip, port) => Err([ip.err(), port.err()].into_iter().flatten().collect()),
    }
}

/// Parse an IP address (v4 or v6)
pub fn parse_address(address: &str) -> Result<IpAddr, AppError> {
    address.trim().parse().map_err(|_| AppError::InvalidAddress)
}

/// Parse a port number in 0..=65535
pub fn parse_port(port: &str) -> Result<u16, AppError> {
    let value: i64 = port.trim().parse().map_err(|_| AppError::InvalidPort)?;
    u16::try_from(value).map_err(|_| AppError::PortOutOfRange)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_endpoint() {
        let addr = parse_endpoint("127.0.0.1", "4050").unwrap();
        assert_eq!(addr, "127.0.0.1:4050".parse().unwrap());
    }

    #[test]
    fn test_ipv6_endpoint() {
        let addr = parse_endpoint("::1", " 80 ").unwrap();
        assert_eq!(addr.port(), 80);
        assert!(addr.is_ipv6());
    }

    #[test]
    fn test_invalid_address() {
        assert!(matches!(parse_address("localhost"), Err(AppError::InvalidAddress)));
        assert!(matches!(parse_address("256.0.0.1"), Err(AppError::InvalidAddress)));
    }

    #[test]
    fn test_invalid_port() {
        assert!(matches!(parse_port("abc"), Err(AppError::InvalidPort)));
        assert!(matches!(parse_port(""), Err(AppError::InvalidPort)));
    }

    #[test]
    fn test_port_out_of_range() {
        assert!(matches!(parse_port("65536"), Err(AppError::PortOutOfRange)));
        assert!(matches!(parse_port("-1"), Err(AppError::PortOutOfRange)));
        assert_eq!(parse_port("0").unwrap(), 0);
        assert_eq!(parse_port("65535").unwrap(), 65535);
    }

    #[test]
    fn test_both_errors_reported() {
        let errors = parse_endpoint("nope", "99999").unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(matches!(errors[0], AppError::InvalidAddress));
        assert!(matches!(errors[1], AppError::PortOutOfRange));
    }
}
