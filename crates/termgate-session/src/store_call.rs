//! Bounded store calls.
//!
//! A store operation runs on the blocking pool while the session waits with
//! a timeout. When the timeout fires the blocking thread keeps going, so the
//! session and the operation agree through a shared [`CallState`] on who
//! decides the outcome:
//!
//! ```text
//! Pending ──claim()──▶ Claimed     session waits one more bound for the result
//!    │
//!    └──abandon()──▶ Abandoned     operation stops before its next write
//! ```
//!
//! Once a call is abandoned the peer has been told it failed, and no further
//! write may land. Work done before the abandon that cannot be skipped is
//! undone by the operation itself (see [`StoreScope::rollback`]).

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;

use termgate_store::{CredentialStore, StoreError};

use crate::SessionError;

const PENDING: u8 = 0;
const CLAIMED: u8 = 1;
const ABANDONED: u8 = 2;

/// Who owns the outcome of one store call.
#[derive(Debug, Default)]
pub(crate) struct CallState(AtomicU8);

impl CallState {
    /// The operation is about to write. Fails if the session already gave up.
    fn claim(&self) -> bool {
        match self
            .0
            .compare_exchange(PENDING, CLAIMED, Ordering::AcqRel, Ordering::Acquire)
        {
            Ok(_) => true,
            Err(current) => current == CLAIMED,
        }
    }

    /// The session stops waiting. Fails if a write was already claimed.
    fn abandon(&self) -> bool {
        self.0
            .compare_exchange(PENDING, ABANDONED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    fn is_abandoned(&self) -> bool {
        self.0.load(Ordering::Acquire) == ABANDONED
    }
}

/// What a store operation sees while it runs.
pub(crate) struct StoreScope<'a> {
    store: &'a dyn CredentialStore,
    state: &'a CallState,
}

impl<'a> StoreScope<'a> {
    pub(crate) fn new(store: &'a dyn CredentialStore, state: &'a CallState) -> Self {
        Self { store, state }
    }

    /// The store, as long as the session is still waiting.
    ///
    /// # Errors
    /// `Timeout` once the call has been abandoned.
    pub(crate) fn check(&self) -> Result<&'a dyn CredentialStore, StoreError> {
        if self.state.is_abandoned() {
            Err(StoreError::Timeout)
        } else {
            Ok(self.store)
        }
    }

    /// The store for a write whose result the peer will see. After this
    /// returns `Ok` the session waits for the result instead of abandoning.
    ///
    /// # Errors
    /// `Timeout` if the call was abandoned first.
    pub(crate) fn commit(&self) -> Result<&'a dyn CredentialStore, StoreError> {
        if self.state.claim() {
            Ok(self.store)
        } else {
            Err(StoreError::Timeout)
        }
    }

    /// The store regardless of state, for undoing a write after
    /// [`commit`](Self::commit) failed.
    pub(crate) fn rollback(&self) -> &'a dyn CredentialStore {
        self.store
    }
}

/// Runs `op` on the blocking pool and waits at most `bound` for it.
///
/// If the bound expires after the operation claimed a write, the wait is
/// extended by one more `bound`; past that the outcome is unknown and the
/// call reports a timeout.
pub(crate) async fn run<T, F>(
    store: Arc<dyn CredentialStore>,
    bound: Duration,
    op: F,
) -> Result<T, SessionError>
where
    T: Send + 'static,
    F: FnOnce(&StoreScope<'_>) -> Result<T, StoreError> + Send + 'static,
{
    let state = Arc::new(CallState::default());
    let shared = Arc::clone(&state);
    let mut task =
        tokio::task::spawn_blocking(move || op(&StoreScope::new(&*store, &shared)));

    let joined = match tokio::time::timeout(bound, &mut task).await {
        Ok(joined) => joined,
        Err(_) if state.abandon() => return Err(SessionError::StoreTimeout(bound)),
        Err(_) => match tokio::time::timeout(bound, task).await {
            Ok(joined) => joined,
            Err(_) => {
                tracing::error!(?bound, "claimed store write still running, outcome unknown");
                return Err(SessionError::StoreTimeout(bound));
            }
        },
    };

    match joined {
        Ok(result) => result.map_err(SessionError::from),
        Err(join_err) => Err(StoreError::Unavailable(join_err.to_string()).into()),
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicBool;
    use std::thread;

    use termgate_store::{Profile, SqliteStore};

    use super::*;

    fn store() -> Arc<dyn CredentialStore> {
        Arc::new(SqliteStore::open_in_memory(1_000).unwrap())
    }

    // =======================================================================
    // CallState
    // =======================================================================

    #[test]
    fn test_claim_then_abandon_keeps_claim() {
        let state = CallState::default();
        assert!(state.claim());
        assert!(!state.abandon());
        assert!(state.claim());
        assert!(!state.is_abandoned());
    }

    #[test]
    fn test_abandon_then_claim_refused() {
        let state = CallState::default();
        assert!(state.abandon());
        assert!(!state.claim());
        assert!(state.is_abandoned());
    }

    #[test]
    fn test_scope_check_after_abandon_times_out() {
        let store = store();
        let state = CallState::default();
        let scope = StoreScope::new(&*store, &state);
        assert!(scope.check().is_ok());

        state.abandon();
        assert!(matches!(scope.check(), Err(StoreError::Timeout)));
        assert!(matches!(scope.commit(), Err(StoreError::Timeout)));
    }

    // =======================================================================
    // run
    // =======================================================================

    #[tokio::test]
    async fn test_run_returns_result_within_bound() {
        let store = store();
        let user = run(Arc::clone(&store), Duration::from_secs(5), |scope| {
            scope
                .commit()?
                .create_user("amy", "Secr3t!pass", &Profile::default())
        })
        .await
        .unwrap();
        assert_eq!(user.username, "amy");
    }

    #[tokio::test]
    async fn test_run_abandoned_call_skips_later_write() {
        let store = store();
        let wrote = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&wrote);

        let result = run(Arc::clone(&store), Duration::from_millis(50), move |scope| {
            thread::sleep(Duration::from_millis(200));
            let store = scope.commit()?;
            flag.store(true, Ordering::SeqCst);
            store.create_user("amy", "Secr3t!pass", &Profile::default())
        })
        .await;
        assert!(matches!(result, Err(SessionError::StoreTimeout(_))));

        tokio::time::sleep(Duration::from_millis(400)).await;
        assert!(!wrote.load(Ordering::SeqCst));
        assert!(matches!(store.find_user("amy"), Err(StoreError::NotFound)));
    }

    #[tokio::test]
    async fn test_run_claimed_write_waits_for_outcome() {
        let store = store();
        let result = run(Arc::clone(&store), Duration::from_millis(200), |scope| {
            let store = scope.commit()?;
            thread::sleep(Duration::from_millis(300));
            store.create_user("amy", "Secr3t!pass", &Profile::default())
        })
        .await;

        assert_eq!(result.unwrap().username, "amy");
        assert!(store.find_user("amy").is_ok());
    }

    #[tokio::test]
    async fn test_run_panicking_op_is_unavailable() {
        let result: Result<(), _> = run(store(), Duration::from_secs(5), |_| {
            panic!("worker died");
        })
        .await;
        assert!(matches!(
            result,
            Err(SessionError::Store(StoreError::Unavailable(_)))
        ));
    }
}
