//! Task phase transitions.
//!
//! Validates and executes phase transitions for a day's `DailyTask`,
//! enforcing the allowed transition graph on top of the store's
//! optimistic-lock `AdvancePhase` primitive.

use anyhow::Result;
use chrono::NaiveDate;
use sqlx::PgPool;

use digest_db::models::TaskPhase;
use digest_db::queries::tasks;

/// The task phase state machine.
///
/// Enforces the valid transition graph:
///
/// ```text
/// init         -> list_fetched
/// list_fetched -> processing
/// list_fetched -> aggregating   (zero-article FetchList result)
/// processing   -> aggregating
/// aggregating  -> aggregating   (publisher retry, no-op transition)
/// aggregating  -> published
/// published    -> archived
/// ```
pub struct TaskPhaseMachine;

impl TaskPhaseMachine {
    /// Check whether a transition from `from` to `to` is a valid edge in
    /// the phase graph.
    pub fn is_valid_transition(from: TaskPhase, to: TaskPhase) -> bool {
        matches!(
            (from, to),
            (TaskPhase::Init, TaskPhase::ListFetched)
                | (TaskPhase::ListFetched, TaskPhase::Processing)
                | (TaskPhase::ListFetched, TaskPhase::Aggregating)
                | (TaskPhase::Processing, TaskPhase::Aggregating)
                | (TaskPhase::Aggregating, TaskPhase::Published)
                | (TaskPhase::Published, TaskPhase::Archived)
        )
    }

    /// Execute a phase transition with optimistic locking.
    ///
    /// Delegates to the store's `AdvancePhase`, which fails with
    /// `PhaseMismatch` if a concurrent tick already moved the phase. The
    /// loser is expected to log and exit cleanly, per the concurrency
    /// contract: no in-process locks, no long-held transactions.
    pub async fn transition(
        pool: &PgPool,
        date: NaiveDate,
        from: TaskPhase,
        to: TaskPhase,
    ) -> Result<()> {
        if !Self::is_valid_transition(from, to) {
            anyhow::bail!("invalid phase transition: {from} -> {to} for task {date}");
        }

        tasks::advance_phase(pool, date, from, to).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_transitions() {
        assert!(TaskPhaseMachine::is_valid_transition(
            TaskPhase::Init,
            TaskPhase::ListFetched
        ));
        assert!(TaskPhaseMachine::is_valid_transition(
            TaskPhase::ListFetched,
            TaskPhase::Processing
        ));
        assert!(TaskPhaseMachine::is_valid_transition(
            TaskPhase::ListFetched,
            TaskPhase::Aggregating
        ));
        assert!(TaskPhaseMachine::is_valid_transition(
            TaskPhase::Processing,
            TaskPhase::Aggregating
        ));
        assert!(TaskPhaseMachine::is_valid_transition(
            TaskPhase::Aggregating,
            TaskPhase::Published
        ));
        assert!(TaskPhaseMachine::is_valid_transition(
            TaskPhase::Published,
            TaskPhase::Archived
        ));
    }

    #[test]
    fn invalid_transitions_rejected() {
        assert!(!TaskPhaseMachine::is_valid_transition(
            TaskPhase::Init,
            TaskPhase::Processing
        ));
        assert!(!TaskPhaseMachine::is_valid_transition(
            TaskPhase::Published,
            TaskPhase::Init
        ));
        assert!(!TaskPhaseMachine::is_valid_transition(
            TaskPhase::Archived,
            TaskPhase::Init
        ));
    }
}
