use crate::domain::{PendingRecord, RecordState};
use crate::foundation::{CosignError, Result};

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum LifecycleState {
    Pending,
    Executed,
    Deleted,
}

const VALID_TRANSITIONS: &[(LifecycleState, LifecycleState)] =
    &[(LifecycleState::Pending, LifecycleState::Executed), (LifecycleState::Pending, LifecycleState::Deleted)];

fn lifecycle_state(state: RecordState) -> LifecycleState {
    match state {
        RecordState::Pending => LifecycleState::Pending,
        RecordState::Executed => LifecycleState::Executed,
    }
}

fn validate(record: &PendingRecord, to: LifecycleState) -> Result<()> {
    let from = lifecycle_state(record.state);
    if VALID_TRANSITIONS.contains(&(from, to)) {
        return Ok(());
    }
    if from == LifecycleState::Executed {
        return Err(CosignError::AlreadyExecuted { identifier: record.identifier.to_string() });
    }
    Err(CosignError::InvalidStateTransition { from: format!("{from:?}"), to: format!("{to:?}") })
}

pub fn ensure_can_execute(record: &PendingRecord) -> Result<()> {
    validate(record, LifecycleState::Executed)
}

pub fn ensure_can_delete(record: &PendingRecord) -> Result<()> {
    validate(record, LifecycleState::Deleted)
}

/// Endorsements are only accepted while the record is pending.
pub fn ensure_accepts_endorsements(record: &PendingRecord) -> Result<()> {
    if is_terminal(record.state) {
        return Err(CosignError::AlreadyExecuted { identifier: record.identifier.to_string() });
    }
    Ok(())
}

pub fn is_terminal(state: RecordState) -> bool {
    matches!(state, RecordState::Executed)
}
