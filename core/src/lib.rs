//! # RxLedger Core
//!
//! Core traits and types for contracts that run over a transactional
//! key-value ledger.
//!
//! A contract is split into a functional core and a thin imperative shell:
//!
//! - **State**: whatever the contract loaded from the ledger for this invocation
//! - **Action**: the command being executed
//! - **Reducer**: pure function `(State, Action, Environment) → Result<Effects, Error>`
//! - **Effect**: a description of a write, executed by the shell
//! - **Environment**: injected dependencies (the clock)
//!
//! The ledger itself is modelled by [`store::KeyValueStore`]: point reads,
//! point writes, prefix range scans and composite keys. Every invocation runs
//! inside one [`transaction::Transaction`]; the platform commits its
//! [`transaction::WriteSet`] only when the invocation succeeds.
//!
//! ## Example
//!
//! ```ignore
//! use rxledger_core::reducer::Reducer;
//!
//! impl Reducer for CounterReducer {
//!     type State = Option<Counter>;
//!     type Action = CounterAction;
//!     type Environment = CounterEnvironment;
//!     type Effect = CounterEffect;
//!     type Error = CounterError;
//!
//!     fn reduce(
//!         &self,
//!         state: &mut Option<Counter>,
//!         action: CounterAction,
//!         env: &CounterEnvironment,
//!     ) -> Result<SmallVec<[CounterEffect; 4]>, CounterError> {
//!         // Business logic goes here
//!         Ok(SmallVec::new())
//!     }
//! }
//! ```

// Re-export commonly used types
pub use chrono::{DateTime, Utc};
pub use serde::{Deserialize, Serialize};
pub use smallvec::{SmallVec, smallvec};

pub mod memory;
pub mod store;
pub mod transaction;

/// Reducer module - The core trait for business logic
///
/// Reducers are pure functions: `(State, Action, Environment) → Result<Effects, Error>`
///
/// They contain all business logic and are deterministic and testable. A
/// reducer never touches the ledger; it returns effect descriptions that the
/// shell executes inside the invocation's transaction.
pub mod reducer {
    use smallvec::SmallVec;

    /// The Reducer trait - core abstraction for business logic
    ///
    /// # Type Parameters
    ///
    /// - `State`: The domain state this reducer operates on
    /// - `Action`: The action type this reducer processes
    /// - `Environment`: The injected dependencies this reducer needs
    /// - `Effect`: The write descriptions this reducer produces
    /// - `Error`: The rejection type returned when preconditions fail
    pub trait Reducer {
        /// The state type this reducer operates on
        type State;

        /// The action type this reducer processes
        type Action;

        /// The environment type with injected dependencies
        type Environment;

        /// The effect type describing writes to perform
        type Effect;

        /// The error type returned when an action is rejected
        type Error;

        /// Reduce an action into state changes and effects
        ///
        /// This is a pure function that:
        /// 1. Validates the action against the current state
        /// 2. Updates state in place
        /// 3. Returns effect descriptions to be executed
        ///
        /// # Errors
        ///
        /// Returns `Self::Error` when a precondition fails. Callers must
        /// discard `state` in that case; nothing is persisted.
        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            env: &Self::Environment,
        ) -> Result<SmallVec<[Self::Effect; 4]>, Self::Error>;
    }
}

/// Environment module - Dependency injection traits
///
/// All external dependencies a reducer needs are abstracted behind traits and
/// injected via the Environment parameter.
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Clock trait - abstracts time operations for testability
    ///
    /// # Examples
    ///
    /// ```
    /// use rxledger_core::environment::{Clock, SystemClock};
    ///
    /// let clock = SystemClock;
    /// let earlier = clock.now();
    /// assert!(clock.now() >= earlier);
    /// ```
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Production clock backed by the system time.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::environment::{Clock, SystemClock};

    #[test]
    fn system_clock_is_monotonic_enough() {
        let clock = SystemClock;
        let first = clock.now();
        let second = clock.now();
        assert!(second >= first);
    }
}
