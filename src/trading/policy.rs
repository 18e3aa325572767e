use std::time::Duration;

use crate::Result;
use crate::error::Error;
use crate::tx::{DEFAULT_GAS_LIMIT, DEFAULT_UNORDERED_WINDOW};

/// Where the ledger account number comes from.
///
/// The account number never changes for an existing account, so it is
/// resolved once when the client is built and cached for its lifetime.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum AccountNumberPolicy {
    /// Known up front; no lookup at bootstrap.
    Fixed(u64),
    /// Looked up from the gateway at bootstrap.
    #[default]
    FetchAndCache,
}

/// How ordered submissions from one client relate to each other.
///
/// Two ordered submissions that read the sequence before either lands sign
/// the same value, and the ledger rejects one of them.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum OrderingPolicy {
    /// Ordered submissions hold a per-client lock across sequence fetch,
    /// signing and submission. Unordered submissions never wait on it.
    #[default]
    Serialized,
    /// No coordination; callers serialize ordered submissions themselves.
    Concurrent,
}

/// Knobs of the submission pipeline.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct SubmitPolicies {
    pub account_number: AccountNumberPolicy,
    pub ordering: OrderingPolicy,
    /// Lifetime of an unordered envelope.
    pub unordered_window: Duration,
    pub gas_limit: u64,
}

impl Default for SubmitPolicies {
    fn default() -> Self {
        Self {
            account_number: AccountNumberPolicy::default(),
            ordering: OrderingPolicy::default(),
            unordered_window: DEFAULT_UNORDERED_WINDOW,
            gas_limit: DEFAULT_GAS_LIMIT,
        }
    }
}

impl SubmitPolicies {
    #[must_use]
    pub const fn with_account_number(mut self, account_number: AccountNumberPolicy) -> Self {
        self.account_number = account_number;
        self
    }

    #[must_use]
    pub const fn with_ordering(mut self, ordering: OrderingPolicy) -> Self {
        self.ordering = ordering;
        self
    }

    #[must_use]
    pub const fn with_unordered_window(mut self, window: Duration) -> Self {
        self.unordered_window = window;
        self
    }

    #[must_use]
    pub const fn with_gas_limit(mut self, gas_limit: u64) -> Self {
        self.gas_limit = gas_limit;
        self
    }

    pub(crate) fn validate(self) -> Result<()> {
        if self.unordered_window.is_zero() {
            return Err(Error::validation("unordered window must be positive"));
        }
        if self.gas_limit == 0 {
            return Err(Error::validation("gas limit must be positive"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_venue_constants() {
        let policies = SubmitPolicies::default();

        assert_eq!(policies.gas_limit, 200_000);
        assert_eq!(policies.unordered_window, Duration::from_secs(10));
        assert_eq!(policies.ordering, OrderingPolicy::Serialized);
        assert_eq!(policies.account_number, AccountNumberPolicy::FetchAndCache);
        policies.validate().expect("defaults are valid");
    }

    #[test]
    fn zero_window_is_rejected() {
        let policies = SubmitPolicies::default().with_unordered_window(Duration::ZERO);

        assert!(policies.validate().is_err(), "zero window must fail");
    }
}
