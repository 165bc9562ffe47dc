//! Budget Guard: validates batch sizing against the per-invocation
//! outbound-call budget before a handler issues any external calls.
//!
//! Pure and stateless -- no I/O, no database access.

/// Configuration for the per-tick outbound-call budget.
#[derive(Debug, Clone, Copy)]
pub struct BudgetConfig {
    /// Hard outbound-call ceiling enforced per tick.
    pub subrequest_limit: u32,
    /// Reserved margin subtracted from `subrequest_limit`.
    pub subrequest_buffer: u32,
}

impl BudgetConfig {
    /// `safeLimit = SUBREQUEST_LIMIT - SUBREQUEST_BUFFER`, the cost ceiling
    /// a handler plans against.
    pub fn safe_limit(&self) -> u32 {
        self.subrequest_limit.saturating_sub(self.subrequest_buffer)
    }
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            subrequest_limit: 50,
            subrequest_buffer: 20,
        }
    }
}

/// Error raised when a planned batch would exceed the safe outbound-call
/// budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum BudgetError {
    #[error("BatchSizeExceedsBudget: planned={planned}, safeLimit={safe_limit}")]
    BatchSizeExceedsBudget { planned: u32, safe_limit: u32 },
}

/// The per-batch outbound-call cost model: one bulk title-translate call
/// plus, per article, {article-fetch, comment-fetch, content-summarize,
/// comment-summarize}.
pub fn estimate_calls(n: u32) -> u32 {
    2 + 3 * n + 1
}

/// A stateless guard over the configured budget.
pub struct BudgetGuard {
    config: BudgetConfig,
}

impl BudgetGuard {
    pub fn new(config: BudgetConfig) -> Self {
        Self { config }
    }

    /// Reject a batch size whose estimated cost exceeds the safe limit.
    pub fn validate_batch_size(&self, n: u32) -> Result<(), BudgetError> {
        let planned = estimate_calls(n);
        let safe_limit = self.config.safe_limit();
        if planned > safe_limit {
            return Err(BudgetError::BatchSizeExceedsBudget { planned, safe_limit });
        }
        Ok(())
    }

    /// Belt-and-braces check called once at the top of each phase handler,
    /// in case config drift lets a too-large batch slip through.
    pub fn assert_within_budget(&self, planned: u32) -> Result<(), BudgetError> {
        let safe_limit = self.config.safe_limit();
        if planned > safe_limit {
            return Err(BudgetError::BatchSizeExceedsBudget { planned, safe_limit });
        }
        Ok(())
    }

    pub fn safe_limit(&self) -> u32 {
        self.config.safe_limit()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_guard() -> BudgetGuard {
        BudgetGuard::new(BudgetConfig::default())
    }

    #[test]
    fn safe_limit_is_limit_minus_buffer() {
        let cfg = BudgetConfig::default();
        assert_eq!(cfg.safe_limit(), 30);
    }

    #[test]
    fn estimate_calls_matches_cost_model() {
        assert_eq!(estimate_calls(6), 2 + 18 + 1);
        assert_eq!(estimate_calls(0), 3);
    }

    #[test]
    fn default_batch_size_six_is_within_budget() {
        let guard = default_guard();
        assert!(guard.validate_batch_size(6).is_ok());
    }

    #[test]
    fn batch_size_twelve_exceeds_budget() {
        // Scenario 4 from the test suite: TASK_BATCH_SIZE=12 with the
        // default limit/buffer. 2 + 3*12 + 1 = 39 > 30.
        let guard = default_guard();
        let err = guard.validate_batch_size(12).unwrap_err();
        assert_eq!(
            err,
            BudgetError::BatchSizeExceedsBudget {
                planned: 39,
                safe_limit: 30
            }
        );
    }

    #[test]
    fn assert_within_budget_rejects_over_limit_plan() {
        let guard = default_guard();
        assert!(guard.assert_within_budget(30).is_ok());
        assert!(guard.assert_within_budget(31).is_err());
    }

    #[test]
    fn custom_config_changes_safe_limit() {
        let guard = BudgetGuard::new(BudgetConfig {
            subrequest_limit: 100,
            subrequest_buffer: 10,
        });
        assert_eq!(guard.safe_limit(), 90);
    }
}
