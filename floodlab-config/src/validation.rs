//! Custom validation functions for configuration.

use ipnetwork::IpNetwork;
use validator::ValidationError;

/// Validate that the provided CIDR list does not contain any invalid ranges.
pub fn validate_cidr_list(cidrs: &[IpNetwork]) -> Result<(), ValidationError> {
    if cidrs.iter().any(|n| match n {
        IpNetwork::V4(net) => net.ip().octets() == [0, 0, 0, 0],
        IpNetwork::V6(_) => false,
    }) {
        return Err(ValidationError::new("invalid_cidr"));
    }
    Ok(())
}

/// Validate an iperf-style bandwidth figure such as `500K` or `80M`.
pub fn validate_bandwidth(value: &str) -> Result<(), ValidationError> {
    let re = regex::Regex::new("^[0-9]+[KMG]$").map_err(|_| ValidationError::new("invalid_regex"))?;
    if re.is_match(value) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_bandwidth"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bandwidth_accepts_common_figures() {
        assert!(validate_bandwidth("80M").is_ok());
        assert!(validate_bandwidth("500K").is_ok());
        assert!(validate_bandwidth("1G").is_ok());
    }

    #[test]
    fn bandwidth_rejects_garbage() {
        assert!(validate_bandwidth("80").is_err());
        assert!(validate_bandwidth("M80").is_err());
        assert!(validate_bandwidth("80 M").is_err());
    }
}
