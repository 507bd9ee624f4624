//! Entity domains that can be exposed to the CoE server
//!
//! Numeric domains feed analog slots, on/off domains feed digital slots.
//! Everything else is not exposable.

use crate::slot::Channel;

/// Domains whose entities carry a numeric state
pub static ANALOG_DOMAINS: &[&str] = &["sensor", "number", "input_number"];

/// Domains whose entities carry an on/off state
pub static DIGITAL_DOMAINS: &[&str] = &["binary_sensor", "input_boolean"];

/// Map a domain to the channel its entities belong to
pub fn channel_for_domain(domain: &str) -> Option<Channel> {
    if ANALOG_DOMAINS.contains(&domain) {
        Some(Channel::Analog)
    } else if DIGITAL_DOMAINS.contains(&domain) {
        Some(Channel::Digital)
    } else {
        None
    }
}
