//! Fixed-window admission over a rolling 60-second window, per-IP and
//! global. Fails closed on backing-store failure.

use crate::errors::StoreResult;
use crate::gateway::RedisGateway;
use crate::keys;

const WINDOW_SECS: i64 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateDecision {
    pub admitted: bool,
    pub ip_count: i64,
    pub global_count: i64,
}

#[derive(Clone)]
pub struct RateLimiter {
    gateway: RedisGateway,
    ip_limit: i64,
    global_limit: i64,
}

impl RateLimiter {
    pub fn new(gateway: RedisGateway, ip_limit: u64, global_limit: u64) -> Self {
        Self {
            gateway,
            ip_limit: ip_limit as i64,
            global_limit: global_limit as i64,
        }
    }

    /// Admits or refuses a request from `client_ip`. Both the per-IP and
    /// global counters are incremented in the same pipelined round trip
    /// regardless of the verdict: a refused request still counts against
    /// both windows. This is an approximate, fail-closed admission check,
    /// not an exact one.
    pub async fn admit(&self, client_ip: &str) -> StoreResult<RateDecision> {
        let window = keys::minute_window(chrono::Utc::now());
        let ip_key = keys::rate_limit_ip(client_ip, &window);
        let global_key = keys::rate_limit_global(&window);

        let (ip_count, global_count) = self
            .gateway
            .incr_pair_with_expire(&ip_key, &global_key, WINDOW_SECS)
            .await?;

        Ok(RateDecision {
            admitted: ip_count <= self.ip_limit && global_count <= self.global_limit,
            ip_count,
            global_count,
        })
    }
}

/// Client IP derivation order for the public HTTP surface: first parseable
/// address in `X-Forwarded-For`, else `X-Real-IP`, else the peer address.
/// Lives here (not in widget-api) because it is part of the rate limiter's
/// contract, not an HTTP framework concern.
pub fn derive_client_ip(
    forwarded_for: Option<&str>,
    real_ip: Option<&str>,
    peer_addr: Option<&str>,
) -> Option<String> {
    if let Some(header) = forwarded_for {
        for candidate in header.split(',') {
            let candidate = candidate.trim();
            if candidate.parse::<std::net::IpAddr>().is_ok() {
                return Some(candidate.to_string());
            }
        }
    }
    if let Some(ip) = real_ip {
        if ip.parse::<std::net::IpAddr>().is_ok() {
            return Some(ip.to_string());
        }
    }
    if let Some(ip) = peer_addr {
        if ip.parse::<std::net::IpAddr>().is_ok() {
            return Some(ip.to_string());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefers_first_parseable_forwarded_for_entry() {
        let ip = derive_client_ip(Some("not-an-ip, 1.2.3.4, 5.6.7.8"), None, None);
        assert_eq!(ip.as_deref(), Some("1.2.3.4"));
    }

    #[test]
    fn falls_back_to_real_ip_then_peer() {
        assert_eq!(derive_client_ip(None, Some("9.9.9.9"), None).as_deref(), Some("9.9.9.9"));
        assert_eq!(derive_client_ip(None, None, Some("8.8.8.8")).as_deref(), Some("8.8.8.8"));
        assert_eq!(derive_client_ip(None, None, None), None);
    }

    #[test]
    fn rejects_garbage_headers_entirely() {
        assert_eq!(derive_client_ip(Some("garbage"), Some("also garbage"), None), None);
    }
}
