use crate::models::{BookingStatus, CancellationStatus};

/// Which seat in the approval chain is acting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    GroupDirector,
    FacilityManager,
    Admin,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::GroupDirector => "group director",
            Stage::FacilityManager => "facility manager",
            Stage::Admin => "admin",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Approve,
    Reject,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("booking is already finalized as {0}")]
    Terminal(&'static str),

    #[error("booking is not awaiting {stage} review (current status: {current})")]
    NotAwaitingStage {
        stage: &'static str,
        current: &'static str,
    },

    #[error("no cancellation is awaiting {stage} review (current: {current})")]
    NotAwaitingCancellation {
        stage: &'static str,
        current: &'static str,
    },

    #[error("cancellation decisions are not part of the admin chain")]
    CancellationHasNoAdminStage,
}

/// Maps (current status, acting stage, decision) to the next status of the
/// approval chain. Pure; the caller persists the result under the
/// optimistic guard.
pub fn next_status(
    current: BookingStatus,
    stage: Stage,
    decision: Decision,
) -> Result<BookingStatus, TransitionError> {
    if current.is_terminal() {
        return Err(TransitionError::Terminal(current.as_str()));
    }

    let allowed = match stage {
        Stage::GroupDirector => current == BookingStatus::Pending,
        Stage::FacilityManager => matches!(
            current,
            BookingStatus::Pending | BookingStatus::ApprovedByGd
        ),
        Stage::Admin => matches!(
            current,
            BookingStatus::Pending | BookingStatus::ApprovedByGd | BookingStatus::ApprovedByFm
        ),
    };

    if !allowed {
        return Err(TransitionError::NotAwaitingStage {
            stage: stage.as_str(),
            current: current.as_str(),
        });
    }

    Ok(match (stage, decision) {
        (Stage::GroupDirector, Decision::Approve) => BookingStatus::ApprovedByGd,
        (Stage::GroupDirector, Decision::Reject) => BookingStatus::RejectedByGd,
        (Stage::FacilityManager, Decision::Approve) => BookingStatus::ApprovedByFm,
        (Stage::FacilityManager, Decision::Reject) => BookingStatus::RejectedByFm,
        (Stage::Admin, Decision::Approve) => BookingStatus::ApprovedByAdmin,
        (Stage::Admin, Decision::Reject) => BookingStatus::RejectedByAdmin,
    })
}

/// Cancellation chain counterpart. Admin has no seat here; rejection is a
/// dead end for the chain (the booking stays live, but no second
/// cancellation request is possible).
pub fn next_cancellation(
    current: CancellationStatus,
    stage: Stage,
    decision: Decision,
) -> Result<CancellationStatus, TransitionError> {
    let expected = match stage {
        Stage::GroupDirector => CancellationStatus::Pending,
        Stage::FacilityManager => CancellationStatus::ApprovedByGd,
        Stage::Admin => return Err(TransitionError::CancellationHasNoAdminStage),
    };

    if current != expected {
        return Err(TransitionError::NotAwaitingCancellation {
            stage: stage.as_str(),
            current: current.as_str(),
        });
    }

    Ok(match (stage, decision) {
        (Stage::GroupDirector, Decision::Approve) => CancellationStatus::ApprovedByGd,
        (Stage::GroupDirector, Decision::Reject) => CancellationStatus::RejectedByGd,
        (Stage::FacilityManager, Decision::Approve) => CancellationStatus::ApprovedByFm,
        (Stage::FacilityManager, Decision::Reject) => CancellationStatus::RejectedByFm,
        (Stage::Admin, _) => unreachable!("rejected above"),
    })
}

/// Initial status of a fresh booking. A requester who already holds the
/// reviewing seat skips their own stage; the facility-manager shortcut
/// wins when both apply since it sits further along the chain.
pub fn initial_status(is_group_director: bool, is_facility_manager: bool) -> BookingStatus {
    if is_facility_manager {
        BookingStatus::ApprovedByFm
    } else if is_group_director {
        BookingStatus::ApprovedByGd
    } else {
        BookingStatus::Pending
    }
}
