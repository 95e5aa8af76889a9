//! Per-origin sliding-window rate limiting.
//!
//! The limiter is one shared table keyed by origin IP. Each origin has two
//! independent tracks:
//!
//! - **command track**: timestamps of accepted commands in the trailing
//!   command window. At the ceiling, further commands are throttled until
//!   the oldest entry ages out.
//! - **login track**: timestamps of failed logins in the trailing login
//!   window. Reaching the ceiling locks the origin out for a fixed time;
//!   a locked-out origin is refused at connect time.
//!
//! Every operation takes the table lock once and does prune, check and
//! record under it, so two connections from the same origin can never both
//! slip past a limit. Entries are created on first activity and removed as
//! soon as all their windows are empty, so memory follows the number of
//! recently active origins rather than the number of connections.
//!
//! All methods take `now` explicitly. Production callers pass
//! `Instant::now()`; tests pass synthetic instants.

use std::collections::{HashMap, VecDeque};
use std::net::IpAddr;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::RateLimitError;

// ---------------------------------------------------------------------------
// LimiterConfig
// ---------------------------------------------------------------------------

/// Thresholds for both tracks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LimiterConfig {
    /// Commands accepted per origin within `command_window`.
    pub command_ceiling: usize,
    pub command_window: Duration,
    /// Failed logins per origin within `login_window` that trigger a lockout.
    pub login_ceiling: usize,
    pub login_window: Duration,
    /// How long a lockout lasts.
    pub lockout: Duration,
}

impl Default for LimiterConfig {
    fn default() -> Self {
        Self {
            command_ceiling: 30,
            command_window: Duration::from_secs(60),
            login_ceiling: 5,
            login_window: Duration::from_secs(300),
            lockout: Duration::from_secs(300),
        }
    }
}

/// Result of recording a failed login.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginVerdict {
    /// Below the ceiling; `failures` is the origin's count in the window.
    Retry { failures: usize },
    /// The origin is (now) locked out.
    LockedOut { remaining: Duration },
}

// ---------------------------------------------------------------------------
// Per-origin counters
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct OriginCounters {
    commands: VecDeque<Instant>,
    failures: VecDeque<Instant>,
    locked_until: Option<Instant>,
}

impl OriginCounters {
    fn prune(&mut self, now: Instant, config: &LimiterConfig) {
        prune_window(&mut self.commands, now, config.command_window);
        prune_window(&mut self.failures, now, config.login_window);
        if self.locked_until.is_some_and(|until| until <= now) {
            self.locked_until = None;
        }
    }

    fn is_idle(&self) -> bool {
        self.commands.is_empty()
            && self.failures.is_empty()
            && self.locked_until.is_none()
    }

    fn lockout_remaining(&self, now: Instant) -> Option<Duration> {
        self.locked_until.map(|until| until.saturating_duration_since(now))
    }
}

/// Far enough out that no deadline built from it is ever reached.
const FAR_FUTURE: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// `base + span`, clamped instead of overflowing when `span` is huge.
pub fn instant_after(base: Instant, span: Duration) -> Instant {
    base.checked_add(span)
        .or_else(|| base.checked_add(FAR_FUTURE))
        .unwrap_or(base)
}

fn prune_window(stamps: &mut VecDeque<Instant>, now: Instant, window: Duration) {
    while let Some(&oldest) = stamps.front() {
        if now.saturating_duration_since(oldest) >= window {
            stamps.pop_front();
        } else {
            break;
        }
    }
}

// ---------------------------------------------------------------------------
// RateLimiter
// ---------------------------------------------------------------------------

/// The shared per-origin limiter. Wrap it in an `Arc` and hand it to every
/// session.
#[derive(Debug)]
pub struct RateLimiter {
    config: LimiterConfig,
    origins: Mutex<HashMap<IpAddr, OriginCounters>>,
}

impl RateLimiter {
    pub fn new(config: LimiterConfig) -> Self {
        Self {
            config,
            origins: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &LimiterConfig {
        &self.config
    }

    /// Connect-time gate: fails only if `origin` is locked out.
    ///
    /// Never creates an entry, so a flood of connections from fresh
    /// origins costs nothing here.
    pub fn check_connection(
        &self,
        origin: IpAddr,
        now: Instant,
    ) -> Result<(), RateLimitError> {
        let mut origins = self.origins.lock();
        let Some(counters) = origins.get_mut(&origin) else {
            return Ok(());
        };
        counters.prune(now, &self.config);
        let remaining = counters.lockout_remaining(now);
        if counters.is_idle() {
            origins.remove(&origin);
        }
        match remaining {
            Some(remaining) => Err(RateLimitError::LockedOut { remaining }),
            None => Ok(()),
        }
    }

    /// Admits one command from `origin`, recording it if accepted.
    ///
    /// A throttled command is not recorded, so a peer hammering the limit
    /// does not push its own window further out.
    pub fn admit_command(
        &self,
        origin: IpAddr,
        now: Instant,
    ) -> Result<(), RateLimitError> {
        let mut origins = self.origins.lock();
        let counters = origins.entry(origin).or_default();
        counters.prune(now, &self.config);

        if counters.commands.len() >= self.config.command_ceiling {
            let retry_after = counters
                .commands
                .front()
                .map(|oldest| {
                    self.config
                        .command_window
                        .saturating_sub(now.saturating_duration_since(*oldest))
                })
                .unwrap_or(self.config.command_window);
            tracing::warn!(%origin, ?retry_after, "command rate limit reached");
            return Err(RateLimitError::Throttled { retry_after });
        }

        counters.commands.push_back(now);
        Ok(())
    }

    /// Records a failed login from `origin`.
    ///
    /// When the failure count reaches the ceiling the origin is locked out
    /// and its failure track is reset, so the next lockout needs a full
    /// new set of failures after this one expires.
    pub fn record_login_failure(&self, origin: IpAddr, now: Instant) -> LoginVerdict {
        let mut origins = self.origins.lock();
        let counters = origins.entry(origin).or_default();
        counters.prune(now, &self.config);

        if let Some(remaining) = counters.lockout_remaining(now) {
            return LoginVerdict::LockedOut { remaining };
        }

        counters.failures.push_back(now);
        let failures = counters.failures.len();
        if failures >= self.config.login_ceiling {
            counters.failures.clear();
            counters.locked_until = Some(instant_after(now, self.config.lockout));
            tracing::warn!(
                %origin,
                failures,
                lockout = ?self.config.lockout,
                "origin locked out after repeated login failures"
            );
            return LoginVerdict::LockedOut {
                remaining: self.config.lockout,
            };
        }

        LoginVerdict::Retry { failures }
    }

    /// Prunes every origin and drops the idle ones. Returns how many were
    /// dropped.
    pub fn sweep(&self, now: Instant) -> usize {
        let mut origins = self.origins.lock();
        let before = origins.len();
        origins.retain(|_, counters| {
            counters.prune(now, &self.config);
            !counters.is_idle()
        });
        let dropped = before - origins.len();
        if dropped > 0 {
            tracing::debug!(dropped, remaining = origins.len(), "swept idle origins");
        }
        dropped
    }

    /// Number of origins currently holding state.
    pub fn tracked_origins(&self) -> usize {
        self.origins.lock().len()
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(LimiterConfig::default())
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn ip(last: u8) -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(10, 0, 0, last))
    }

    fn small() -> RateLimiter {
        RateLimiter::new(LimiterConfig {
            command_ceiling: 3,
            command_window: Duration::from_secs(10),
            login_ceiling: 2,
            login_window: Duration::from_secs(30),
            lockout: Duration::from_secs(60),
        })
    }

    // =======================================================================
    // Command track
    // =======================================================================

    #[test]
    fn test_admit_command_throttles_at_ceiling() {
        let limiter = small();
        let t0 = Instant::now();
        for i in 0..3 {
            assert!(limiter.admit_command(ip(1), t0 + Duration::from_millis(i)).is_ok());
        }
        let err = limiter
            .admit_command(ip(1), t0 + Duration::from_secs(1))
            .unwrap_err();
        assert_eq!(
            err,
            RateLimitError::Throttled {
                retry_after: Duration::from_secs(9)
            }
        );
    }

    #[test]
    fn test_admit_command_other_origin_unaffected() {
        let limiter = small();
        let t0 = Instant::now();
        for _ in 0..3 {
            limiter.admit_command(ip(1), t0).unwrap();
        }
        assert!(limiter.admit_command(ip(1), t0).is_err());
        assert!(limiter.admit_command(ip(2), t0).is_ok());
    }

    #[test]
    fn test_admit_command_window_ages_out() {
        let limiter = small();
        let t0 = Instant::now();
        for _ in 0..3 {
            limiter.admit_command(ip(1), t0).unwrap();
        }
        assert!(limiter.admit_command(ip(1), t0 + Duration::from_secs(9)).is_err());
        assert!(limiter.admit_command(ip(1), t0 + Duration::from_secs(10)).is_ok());
    }

    #[test]
    fn test_admit_command_throttled_not_recorded() {
        let limiter = small();
        let t0 = Instant::now();
        for _ in 0..3 {
            limiter.admit_command(ip(1), t0).unwrap();
        }
        for s in 1..9 {
            let _ = limiter.admit_command(ip(1), t0 + Duration::from_secs(s));
        }
        // Had the rejected calls counted, the window would still be full.
        assert!(limiter.admit_command(ip(1), t0 + Duration::from_secs(10)).is_ok());
        assert!(limiter.admit_command(ip(1), t0 + Duration::from_secs(10)).is_ok());
    }

    // =======================================================================
    // Login track
    // =======================================================================

    #[test]
    fn test_record_login_failure_locks_at_ceiling() {
        let limiter = small();
        let t0 = Instant::now();
        assert_eq!(
            limiter.record_login_failure(ip(1), t0),
            LoginVerdict::Retry { failures: 1 }
        );
        assert_eq!(
            limiter.record_login_failure(ip(1), t0),
            LoginVerdict::LockedOut {
                remaining: Duration::from_secs(60)
            }
        );
        assert!(matches!(
            limiter.check_connection(ip(1), t0 + Duration::from_secs(59)),
            Err(RateLimitError::LockedOut { .. })
        ));
        assert!(limiter.check_connection(ip(1), t0 + Duration::from_secs(60)).is_ok());
    }

    #[test]
    fn test_record_login_failure_is_per_origin() {
        let limiter = small();
        let t0 = Instant::now();
        limiter.record_login_failure(ip(1), t0);
        limiter.record_login_failure(ip(1), t0);
        assert!(limiter.check_connection(ip(1), t0).is_err());
        assert!(limiter.check_connection(ip(2), t0).is_ok());
    }

    #[test]
    fn test_record_login_failure_old_failures_expire() {
        let limiter = small();
        let t0 = Instant::now();
        limiter.record_login_failure(ip(1), t0);
        let verdict = limiter.record_login_failure(ip(1), t0 + Duration::from_secs(30));
        assert_eq!(verdict, LoginVerdict::Retry { failures: 1 });
    }

    #[test]
    fn test_record_login_failure_while_locked_reports_remaining() {
        let limiter = small();
        let t0 = Instant::now();
        limiter.record_login_failure(ip(1), t0);
        limiter.record_login_failure(ip(1), t0);
        assert_eq!(
            limiter.record_login_failure(ip(1), t0 + Duration::from_secs(20)),
            LoginVerdict::LockedOut {
                remaining: Duration::from_secs(40)
            }
        );
    }

    #[test]
    fn test_lockout_expiry_needs_fresh_failures() {
        let limiter = small();
        let t0 = Instant::now();
        limiter.record_login_failure(ip(1), t0);
        limiter.record_login_failure(ip(1), t0);
        let after = t0 + Duration::from_secs(61);
        assert_eq!(
            limiter.record_login_failure(ip(1), after),
            LoginVerdict::Retry { failures: 1 }
        );
    }

    #[test]
    fn test_check_connection_reports_remaining_then_clears() {
        let limiter = small();
        let t0 = Instant::now();
        limiter.record_login_failure(ip(1), t0);
        limiter.record_login_failure(ip(1), t0);
        assert_eq!(
            limiter.check_connection(ip(1), t0 + Duration::from_secs(15)),
            Err(RateLimitError::LockedOut {
                remaining: Duration::from_secs(45)
            })
        );
        assert_eq!(limiter.check_connection(ip(1), t0 + Duration::from_secs(60)), Ok(()));
    }

    #[test]
    fn test_record_login_failure_huge_lockout_does_not_overflow() {
        let limiter = RateLimiter::new(LimiterConfig {
            lockout: Duration::MAX,
            ..LimiterConfig::default()
        });
        let t0 = Instant::now();
        let mut verdict = LoginVerdict::Retry { failures: 0 };
        for _ in 0..limiter.config().login_ceiling {
            verdict = limiter.record_login_failure(ip(1), t0);
        }
        assert!(matches!(verdict, LoginVerdict::LockedOut { .. }));
        assert!(limiter.check_connection(ip(1), t0 + Duration::from_secs(3600)).is_err());
    }

    #[test]
    fn test_instant_after_saturates() {
        let now = Instant::now();
        assert_eq!(instant_after(now, Duration::from_secs(5)), now + Duration::from_secs(5));
        assert!(instant_after(now, Duration::MAX) > now + Duration::from_secs(365 * 24 * 3600));
    }

    // =======================================================================
    // Memory
    // =======================================================================

    #[test]
    fn test_check_connection_does_not_create_entries() {
        let limiter = small();
        let t0 = Instant::now();
        for i in 0..50 {
            limiter.check_connection(ip(i), t0).unwrap();
        }
        assert_eq!(limiter.tracked_origins(), 0);
    }

    #[test]
    fn test_sweep_drops_idle_origins() {
        let limiter = small();
        let t0 = Instant::now();
        limiter.admit_command(ip(1), t0).unwrap();
        limiter.record_login_failure(ip(2), t0);
        assert_eq!(limiter.tracked_origins(), 2);

        // Command window (10s) expired, login window (30s) not yet.
        assert_eq!(limiter.sweep(t0 + Duration::from_secs(11)), 1);
        assert_eq!(limiter.tracked_origins(), 1);

        assert_eq!(limiter.sweep(t0 + Duration::from_secs(31)), 1);
        assert_eq!(limiter.tracked_origins(), 0);
    }

    #[test]
    fn test_concurrent_admit_never_exceeds_ceiling() {
        use std::sync::Arc;
        use std::sync::atomic::{AtomicUsize, Ordering};

        let limiter = Arc::new(RateLimiter::new(LimiterConfig {
            command_ceiling: 25,
            ..LimiterConfig::default()
        }));
        let accepted = Arc::new(AtomicUsize::new(0));
        let now = Instant::now();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                let accepted = Arc::clone(&accepted);
                std::thread::spawn(move || {
                    for _ in 0..20 {
                        if limiter.admit_command(ip(9), now).is_ok() {
                            accepted.fetch_add(1, Ordering::SeqCst);
                        }
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(accepted.load(Ordering::SeqCst), 25);
    }
}
