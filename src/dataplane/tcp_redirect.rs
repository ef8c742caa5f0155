//! TCP redirect to the local forward server
//!
//! Captured TCP segments are not relayed byte by byte. Each one is rewritten
//! so the kernel delivers it to a forward server listening on the TUN
//! address, and the server's replies are rewritten back so the client sees
//! the remote endpoint it dialed. Sessions are keyed by the client's source
//! port, the only field that survives both rewrites unchanged.
//!
//! ```text
//! client   L:lp -> R:rp          becomes  R:lp -> TUN:fwd
//! server   TUN:fwd -> R:lp       becomes  R:rp -> L:lp
//! ```

use crate::config::TcpConfig;
use crate::protocol::ip::IpHeader;
use crate::telemetry::RelayStats;
use crate::Result;
use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// One intercepted client connection
#[derive(Debug, Clone)]
pub struct TcpSession {
    pub local_addr: IpAddr,
    pub local_port: u16,
    pub remote_addr: IpAddr,
    pub remote_port: u16,
    pub created_at: Instant,
    /// Last packet time (for timeout)
    pub last_used: Instant,
}

impl TcpSession {
    fn targets(&self, remote_addr: IpAddr, remote_port: u16) -> bool {
        self.remote_addr == remote_addr && self.remote_port == remote_port
    }
}

/// Result of [`TcpRedirect::process`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectResult {
    /// Client segment rewritten toward the forward server
    ToServer { local_port: u16, new_session: bool },
    /// Server segment rewritten back toward the client
    ToClient { local_port: u16 },
    /// Server segment for a port with no session; drop it
    NoSession { local_port: u16 },
}

/// Session table plus the in-place rewrite of both directions
pub struct TcpRedirect {
    sessions: HashMap<u16, TcpSession>,
    config: TcpConfig,
    forward_port: u16,
    timeout: Duration,
    stats: Arc<RelayStats>,
}

impl TcpRedirect {
    /// `forward_port` is the port the forward server is bound to on the
    /// configured TUN addresses.
    pub fn new(config: TcpConfig, forward_port: u16, stats: Arc<RelayStats>) -> Self {
        let timeout = Duration::from_secs(config.session_timeout_secs);
        Self {
            sessions: HashMap::new(),
            config,
            forward_port,
            timeout,
            stats,
        }
    }

    pub fn forward_port(&self) -> u16 {
        self.forward_port
    }

    pub fn session(&self, local_port: u16) -> Option<&TcpSession> {
        self.sessions.get(&local_port)
    }

    /// Rewrite a captured TCP segment in place; both checksums stay valid.
    pub fn process<T>(&mut self, ip: &mut IpHeader<T>) -> Result<RedirectResult>
    where
        T: AsRef<[u8]> + AsMut<[u8]>,
    {
        self.process_at(ip, Instant::now())
    }

    pub fn process_at<T>(&mut self, ip: &mut IpHeader<T>, now: Instant) -> Result<RedirectResult>
    where
        T: AsRef<[u8]> + AsMut<[u8]>,
    {
        let (src_port, dst_port) = {
            let tcp = ip.tcp()?;
            (tcp.src_port(), tcp.dst_port())
        };
        let tun = self.tun_addr(ip.src_addr());

        if src_port == self.forward_port {
            return self.rewrite_to_client(ip, dst_port, tun, now);
        }

        let remote_addr = ip.dst_addr();
        let known = self
            .sessions
            .get(&src_port)
            .is_some_and(|session| session.targets(remote_addr, dst_port));
        let new_session = !known;
        if known {
            if let Some(session) = self.sessions.get_mut(&src_port) {
                session.last_used = now;
            }
        } else {
            let local_addr = ip.src_addr();
            let session = TcpSession {
                local_addr,
                local_port: src_port,
                remote_addr,
                remote_port: dst_port,
                created_at: now,
                last_used: now,
            };
            if let Some(old) = self.sessions.insert(src_port, session) {
                debug!(
                    "Replacing tcp session {} -> {}:{}",
                    src_port, old.remote_addr, old.remote_port
                );
            }
            self.stats.tcp_sessions_opened.inc();
            debug!(
                "Accepted tcp connection {}:{} -> {}:{}",
                local_addr, src_port, remote_addr, dst_port
            );
        }

        ip.set_src_addr(remote_addr)?;
        ip.set_dst_addr(tun)?;
        ip.update_checksum();
        let mut tcp = ip.tcp_mut()?;
        tcp.set_dst_port(self.forward_port);
        tcp.update_checksum()?;

        Ok(RedirectResult::ToServer {
            local_port: src_port,
            new_session,
        })
    }

    fn rewrite_to_client<T>(
        &mut self,
        ip: &mut IpHeader<T>,
        local_port: u16,
        tun: IpAddr,
        now: Instant,
    ) -> Result<RedirectResult>
    where
        T: AsRef<[u8]> + AsMut<[u8]>,
    {
        let Some(session) = self.sessions.get_mut(&local_port) else {
            self.stats.tcp_no_session.inc();
            warn!("No tcp session saved for port {}", local_port);
            return Ok(RedirectResult::NoSession { local_port });
        };
        session.last_used = now;

        // A v4 session answered over v6 (or the reverse) cannot be mapped back
        let local_addr = if session.local_addr.is_ipv4() == tun.is_ipv4() {
            session.local_addr
        } else {
            tun
        };
        let remote_port = session.remote_port;

        let remote_addr = ip.dst_addr();
        ip.set_src_addr(remote_addr)?;
        ip.set_dst_addr(local_addr)?;
        ip.update_checksum();
        let mut tcp = ip.tcp_mut()?;
        tcp.set_src_port(remote_port);
        tcp.update_checksum()?;

        Ok(RedirectResult::ToClient { local_port })
    }

    fn tun_addr(&self, like: IpAddr) -> IpAddr {
        match like {
            IpAddr::V4(_) => IpAddr::V4(self.config.tun_v4),
            IpAddr::V6(_) => IpAddr::V6(self.config.tun_v6),
        }
    }

    /// Remove sessions idle for longer than the configured timeout
    pub fn expire_old_entries(&mut self) {
        self.expire_at(Instant::now());
    }

    pub fn expire_at(&mut self, now: Instant) {
        let timeout = self.timeout;
        let before = self.sessions.len();
        self.sessions
            .retain(|_, session| now.saturating_duration_since(session.last_used) <= timeout);
        let expired = before - self.sessions.len();
        if expired > 0 {
            debug!("Expired {} tcp sessions", expired);
        }
    }

    /// Get number of active sessions
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
