//! The Accept-Policy Chain (C3, §4.3, §9). Modeled as a capability rather
//! than an inheritance hierarchy: anything exposing `check` qualifies.

use std::num::NonZeroU32;

use governor::{Quota, RateLimiter};
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use nonzero_ext::nonzero;
use nostr_core::Event;

/// Connection-visible identity an accept policy may read (but never
/// mutate) while deciding whether to reject an event (§4.3).
pub struct ConnectionContext {
    pub conn_id: u64,
    pub peer_addr: Option<String>,
}

pub trait AcceptPolicy: Send + Sync {
    /// `Ok(())` accepts; `Err(reason)` rejects with the given reason,
    /// which is surfaced verbatim in the `NOTICE` (§7 `Rejected`).
    fn check(&self, ctx: &ConnectionContext, event: &Event) -> Result<(), String>;
}

/// An ordered sequence of policies; the chain short-circuits on first
/// rejection. An empty chain accepts every valid event (§4.3).
#[derive(Default)]
pub struct AcceptChain {
    policies: Vec<Box<dyn AcceptPolicy>>,
}

impl AcceptChain {
    pub fn new() -> Self {
        Self { policies: Vec::new() }
    }

    pub fn push(mut self, policy: impl AcceptPolicy + 'static) -> Self {
        self.policies.push(Box::new(policy));
        self
    }

    pub fn check(&self, ctx: &ConnectionContext, event: &Event) -> Result<(), String> {
        for policy in &self.policies {
            policy.check(ctx, event)?;
        }
        Ok(())
    }
}

/// Example accept-policy: a simple per-relay token-bucket rate limiter.
/// Demonstrates the `AcceptPolicy` capability; the core does not enforce
/// rate limiting itself (§1 Non-goals).
pub struct RateLimitPolicy {
    limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,
}

impl RateLimitPolicy {
    pub fn per_second(events_per_second: u32) -> Self {
        let quota = NonZeroU32::new(events_per_second)
            .map(Quota::per_second)
            .unwrap_or_else(|| Quota::per_second(nonzero!(1u32)));
        Self {
            limiter: RateLimiter::direct(quota),
        }
    }
}

impl AcceptPolicy for RateLimitPolicy {
    fn check(&self, _ctx: &ConnectionContext, _event: &Event) -> Result<(), String> {
        self.limiter
            .check()
            .map_err(|_| "rate limit exceeded".to_string())
    }
}
