//! Configuration validation

use super::{Config, EchoStrategy};
use crate::telemetry::parse_level;

/// Smallest MTU an IPv4 host must accept (RFC 791)
const MIN_IPV4_MTU: usize = 68;

/// Smallest MTU an IPv6 link may have (RFC 8200)
const MIN_IPV6_MTU: usize = 1280;

/// Largest IP datagram
const MAX_MTU: usize = 65535;

/// Echo reply delays past this are almost certainly a unit mistake
const MAX_REPLY_DELAY_MS: u64 = 10_000;

#[derive(Debug, Clone)]
pub struct ValidationResult {
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self {
            warnings: Vec::new(),
            errors: Vec::new(),
        }
    }

    pub fn warn(&mut self, msg: impl Into<String>) {
        self.warnings.push(msg.into());
    }

    pub fn error(&mut self, msg: impl Into<String>) {
        self.errors.push(msg.into());
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Emit every diagnostic through the installed subscriber
    pub fn log_diagnostics(&self) {
        for warning in &self.warnings {
            tracing::warn!("{}", warning);
        }
        for error in &self.errors {
            tracing::error!("{}", error);
        }
    }
}

impl Default for ValidationResult {
    fn default() -> Self {
        Self::new()
    }
}

/// Validate configuration and return warnings/errors
pub fn validate(config: &Config) -> ValidationResult {
    let mut result = ValidationResult::new();

    validate_log(config, &mut result);
    validate_relay(config, &mut result);
    validate_icmp(config, &mut result);
    validate_tcp(config, &mut result);

    result
}

fn validate_log(config: &Config, result: &mut ValidationResult) {
    if parse_level(&config.log.level).is_none() {
        result.warn(format!(
            "log.level: unknown level '{}', using info",
            config.log.level
        ));
    }
}

fn validate_relay(config: &Config, result: &mut ValidationResult) {
    let mtu = config.relay.mtu;
    if !(MIN_IPV4_MTU..=MAX_MTU).contains(&mtu) {
        result.error(format!(
            "relay.mtu: {} outside {}..={}",
            mtu, MIN_IPV4_MTU, MAX_MTU
        ));
    } else if mtu < MIN_IPV6_MTU {
        result.warn(format!(
            "relay.mtu: {} is below {}, IPv6 replies may not fit",
            mtu, MIN_IPV6_MTU
        ));
    }
}

fn validate_icmp(config: &Config, result: &mut ValidationResult) {
    let delay = config.icmp.reply_delay_ms;
    if delay > MAX_REPLY_DELAY_MS {
        result.warn(format!(
            "icmp.reply_delay_ms: {} ms is longer than {} ms",
            delay, MAX_REPLY_DELAY_MS
        ));
    }
    if delay > 0 && config.icmp.echo != EchoStrategy::Reply {
        result.warn("icmp.reply_delay_ms: ignored unless icmp.echo = \"reply\"");
    }
}

fn validate_tcp(config: &Config, result: &mut ValidationResult) {
    let tcp = &config.tcp;
    if tcp.session_timeout_secs == 0 {
        result.error("tcp.session_timeout_secs: must be greater than 0");
    }
    if tcp.tun_v4.is_unspecified() || tcp.tun_v4.is_broadcast() {
        result.error(format!("tcp.tun_v4: {} is not a host address", tcp.tun_v4));
    }
    if tcp.tun_v6.is_unspecified() || tcp.tun_v6.is_multicast() {
        result.error(format!("tcp.tun_v6: {} is not a host address", tcp.tun_v6));
    }
}
