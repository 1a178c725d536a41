//! # RxLedger Testing
//!
//! Testing utilities and helpers for contracts built on RxLedger.
//!
//! This crate provides:
//! - Deterministic clocks ([`FixedClock`], [`ManualClock`])
//! - A store that always fails ([`FailingStore`]) for error pass-through tests
//! - [`ReducerTest`], a Given-When-Then harness for reducers
//! - [`init_test_tracing`] to see contract logs while debugging a test
//!
//! ## Example
//!
//! ```ignore
//! use rxledger_testing::{test_clock, ReducerTest};
//!
//! ReducerTest::new(PrescriptionReducer::new())
//!     .with_env(PrescriptionEnvironment::new(Arc::new(test_clock())))
//!     .given_state(None)
//!     .when_action(create_command())
//!     .then_state(|state| assert!(state.is_some()))
//!     .run();
//! ```

use chrono::{DateTime, Utc};
use rxledger_core::environment::Clock;


pub use reducer_test::{ReducerTest, assertions};

/// Mock implementations of Environment traits and ledger collaborators.
pub mod mocks {
    use super::{Clock, DateTime, Utc};
    use rxledger_core::store::{KeyValueStore, StateReader, StoreError};
    use std::sync::{Arc, RwLock};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use rxledger_testing::mocks::FixedClock;
    /// use rxledger_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// let time1 = clock.now();
    /// let time2 = clock.now();
    /// assert_eq!(time1, time2); // Always the same!
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Clock whose time is set explicitly by the test.
    ///
    /// Clones share the same time, so a test can keep a handle while the
    /// contract owns another one and move time forward between invocations.
    ///
    /// # Example
    ///
    /// ```
    /// use rxledger_testing::mocks::ManualClock;
    /// use rxledger_core::environment::Clock;
    /// use chrono::{Duration, Utc};
    ///
    /// let start = Utc::now();
    /// let clock = ManualClock::new(start);
    /// let handle = clock.clone();
    ///
    /// handle.advance(Duration::days(200));
    /// assert_eq!(clock.now(), start + Duration::days(200));
    /// ```
    #[derive(Debug, Clone)]
    pub struct ManualClock {
        time: Arc<RwLock<DateTime<Utc>>>,
    }

    impl ManualClock {
        /// Create a clock starting at `time`
        #[must_use]
        pub fn new(time: DateTime<Utc>) -> Self {
            Self {
                time: Arc::new(RwLock::new(time)),
            }
        }

        /// Jump to `time`
        pub fn set(&self, time: DateTime<Utc>) {
            let mut guard = self
                .time
                .write()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            *guard = time;
        }

        /// Move the clock forward by `by`
        pub fn advance(&self, by: chrono::Duration) {
            let mut guard = self
                .time
                .write()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            *guard += by;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self
                .time
                .read()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
        }
    }

    /// Store whose every operation fails with a backend error.
    ///
    /// Used to check that collaborator failures surface unchanged.
    #[derive(Debug, Clone)]
    pub struct FailingStore {
        message: String,
    }

    impl FailingStore {
        /// Create a store failing with `message`
        #[must_use]
        pub fn new(message: impl Into<String>) -> Self {
            Self {
                message: message.into(),
            }
        }

        fn error(&self) -> StoreError {
            StoreError::Backend(self.message.clone())
        }
    }

    impl StateReader for FailingStore {
        fn get(&self, _key: &str) -> Result<Option<Vec<u8>>, StoreError> {
            Err(self.error())
        }

        fn range_scan(&self, _prefix: &str) -> Result<Vec<(String, Vec<u8>)>, StoreError> {
            Err(self.error())
        }
    }

    impl KeyValueStore for FailingStore {
        fn put(&mut self, _key: &str, _value: Vec<u8>) -> Result<(), StoreError> {
            Err(self.error())
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    #[must_use]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(test_time())
    }

    /// The instant used by [`test_clock`] (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// Panics if the hardcoded timestamp fails to parse.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_time() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
            .expect("hardcoded timestamp should always parse")
            .with_timezone(&Utc)
    }
}

/// Install a `tracing` subscriber for tests.
///
/// Honours `RUST_LOG`; output goes through the test writer so it is only
/// shown for failing tests. Safe to call from every test.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

// Re-export commonly used items
pub use mocks::{FailingStore, FixedClock, ManualClock, test_clock, test_time};
