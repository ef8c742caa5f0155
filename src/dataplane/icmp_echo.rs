//! Local handling of intercepted ICMP and ICMPv6 echo requests

use crate::config::IcmpConfig;
use crate::protocol::ip::IpHeader;
use crate::protocol::Transport;
use crate::telemetry::RelayStats;
use crate::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

pub use crate::config::EchoStrategy;

/// What the caller should do with the packet after [`handle_echo`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EchoAction {
    /// Send the packet on unchanged
    Forward,
    /// Discard the packet
    Drop,
    /// The packet was rewritten into a reply; write it back to the sender
    Reply,
    /// Not an echo request; left for other handlers
    NotEcho,
}

fn is_echo_request<T: AsRef<[u8]>>(ip: &IpHeader<T>) -> Result<bool> {
    Ok(match ip.transport()? {
        Transport::Icmp(icmp) => icmp.is_echo_request(),
        Transport::Icmpv6(icmp) => icmp.is_echo_request(),
        _ => false,
    })
}

/// Apply `strategy` to `ip` if it carries an echo request.
///
/// With [`EchoStrategy::Reply`] the addresses are swapped and the message is
/// turned into an echo reply in place; both checksums remain valid.
pub fn handle_echo<T>(ip: &mut IpHeader<T>, strategy: EchoStrategy) -> Result<EchoAction>
where
    T: AsRef<[u8]> + AsMut<[u8]>,
{
    if !is_echo_request(ip)? {
        return Ok(EchoAction::NotEcho);
    }

    match strategy {
        EchoStrategy::Direct => Ok(EchoAction::Forward),
        EchoStrategy::Drop => Ok(EchoAction::Drop),
        EchoStrategy::Reply => {
            ip.revert_address();
            let reverted = match ip.transport_mut()? {
                Transport::Icmp(mut icmp) => icmp.revert_echo(),
                Transport::Icmpv6(mut icmp) => icmp.revert_echo(),
                _ => false,
            };
            debug_assert!(reverted);
            Ok(EchoAction::Reply)
        }
    }
}

/// One roll in this many adds a long spike instead of the usual jitter
const SPIKE_ODDS: u64 = 30;

/// Echo handling bound to a configured strategy
#[derive(Debug, Clone)]
pub struct EchoResponder {
    strategy: EchoStrategy,
    reply_delay_ms: u64,
    stats: Arc<RelayStats>,
}

impl EchoResponder {
    pub fn new(strategy: EchoStrategy, stats: Arc<RelayStats>) -> Self {
        Self {
            strategy,
            reply_delay_ms: 0,
            stats,
        }
    }

    pub fn from_config(config: &IcmpConfig, stats: Arc<RelayStats>) -> Self {
        Self {
            strategy: config.echo,
            reply_delay_ms: config.reply_delay_ms,
            stats,
        }
    }

    pub fn strategy(&self) -> EchoStrategy {
        self.strategy
    }

    /// How long the caller should hold a reply before writing it back.
    ///
    /// `roll` is any uniformly random value supplied by the caller; nothing
    /// here sleeps. With a zero base delay replies go out at once. Otherwise
    /// one roll in 30 adds a 30 to 99 ms spike and the rest jitter the base
    /// by -10 to +9 ms, never below zero.
    pub fn reply_delay(&self, roll: u32) -> Duration {
        let base = self.reply_delay_ms;
        if base == 0 {
            return Duration::ZERO;
        }
        let roll = u64::from(roll);
        let rest = roll / SPIKE_ODDS;
        let ms = if roll % SPIKE_ODDS == 0 {
            base.saturating_add(30 + rest % 70)
        } else {
            base.saturating_add(rest % 20).saturating_sub(10)
        };
        Duration::from_millis(ms)
    }

    pub fn handle<T>(&self, ip: &mut IpHeader<T>) -> Result<EchoAction>
    where
        T: AsRef<[u8]> + AsMut<[u8]>,
    {
        let action = handle_echo(ip, self.strategy)?;
        match action {
            EchoAction::Reply => {
                self.stats.echo_replies.inc();
                debug!("Answering echo request from {}", ip.dst_addr());
            }
            EchoAction::Drop => debug!("Dropping echo request to {}", ip.dst_addr()),
            EchoAction::Forward | EchoAction::NotEcho => {}
        }
        Ok(action)
    }
}
