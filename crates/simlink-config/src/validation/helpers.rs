//! Shared validation helpers.

use std::net::IpAddr;

/// Push an error if `value` is outside `[min, max]`.
pub(crate) fn validate_range(errors: &mut Vec<String>, name: &str, value: u32, min: u32, max: u32) {
    if value < min || value > max {
        errors.push(format!("{name} = {value} is out of range [{min}, {max}]"));
    }
}

/// Push an error if `value` is not an IPv4 or IPv6 literal.
pub(crate) fn validate_ip(errors: &mut Vec<String>, name: &str, value: &str) {
    if value.parse::<IpAddr>().is_err() {
        errors.push(format!("{name} = {value:?} is not an IP address"));
    }
}
