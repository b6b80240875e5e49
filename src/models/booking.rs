use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: String,
    pub slug: String,
    pub title: String,
    pub purpose: String,
    pub status: BookingStatus,
    pub cancellation_status: CancellationStatus,
    pub remark: Option<String>,
    pub status_update_at_gd: Option<NaiveDateTime>,
    pub status_update_at_fm: Option<NaiveDateTime>,
    pub status_update_at_admin: Option<NaiveDateTime>,
    pub status_update_by_gd_id: Option<String>,
    pub status_update_by_fm_id: Option<String>,
    pub cancellation_remark: Option<String>,
    pub cancellation_requested_at: Option<NaiveDateTime>,
    pub cancellation_update_at_gd: Option<NaiveDateTime>,
    pub cancellation_update_at_fm: Option<NaiveDateTime>,
    pub cancelled_at: Option<NaiveDateTime>,
    pub facility_id: String,
    pub group_id: String,
    pub requested_by_id: String,
    pub created_at: NaiveDateTime,
}

/// Slot owned by exactly one booking, created in the same transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingTime {
    pub id: String,
    pub booking_id: String,
    pub date: NaiveDate,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    Pending,
    ApprovedByGd,
    ApprovedByFm,
    ApprovedByAdmin,
    RejectedByGd,
    RejectedByFm,
    RejectedByAdmin,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "PENDING",
            BookingStatus::ApprovedByGd => "APPROVED_BY_GD",
            BookingStatus::ApprovedByFm => "APPROVED_BY_FM",
            BookingStatus::ApprovedByAdmin => "APPROVED_BY_ADMIN",
            BookingStatus::RejectedByGd => "REJECTED_BY_GD",
            BookingStatus::RejectedByFm => "REJECTED_BY_FM",
            BookingStatus::RejectedByAdmin => "REJECTED_BY_ADMIN",
            BookingStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "APPROVED_BY_GD" => BookingStatus::ApprovedByGd,
            "APPROVED_BY_FM" => BookingStatus::ApprovedByFm,
            "APPROVED_BY_ADMIN" => BookingStatus::ApprovedByAdmin,
            "REJECTED_BY_GD" => BookingStatus::RejectedByGd,
            "REJECTED_BY_FM" => BookingStatus::RejectedByFm,
            "REJECTED_BY_ADMIN" => BookingStatus::RejectedByAdmin,
            "CANCELLED" => BookingStatus::Cancelled,
            _ => BookingStatus::Pending,
        }
    }

    /// Rejected and cancelled bookings accept no further decisions.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            BookingStatus::RejectedByGd
                | BookingStatus::RejectedByFm
                | BookingStatus::RejectedByAdmin
                | BookingStatus::Cancelled
        )
    }

    /// True once at least one approval stage has signed off.
    pub fn is_approved(&self) -> bool {
        matches!(
            self,
            BookingStatus::ApprovedByGd
                | BookingStatus::ApprovedByFm
                | BookingStatus::ApprovedByAdmin
        )
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CancellationStatus {
    NotRequested,
    Pending,
    ApprovedByGd,
    ApprovedByFm,
    RejectedByGd,
    RejectedByFm,
    CancelledByFm,
}

impl CancellationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CancellationStatus::NotRequested => "NOT_REQUESTED",
            CancellationStatus::Pending => "PENDING",
            CancellationStatus::ApprovedByGd => "APPROVED_BY_GD",
            CancellationStatus::ApprovedByFm => "APPROVED_BY_FM",
            CancellationStatus::RejectedByGd => "REJECTED_BY_GD",
            CancellationStatus::RejectedByFm => "REJECTED_BY_FM",
            CancellationStatus::CancelledByFm => "CANCELLED_BY_FM",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "PENDING" => CancellationStatus::Pending,
            "APPROVED_BY_GD" => CancellationStatus::ApprovedByGd,
            "APPROVED_BY_FM" => CancellationStatus::ApprovedByFm,
            "REJECTED_BY_GD" => CancellationStatus::RejectedByGd,
            "REJECTED_BY_FM" => CancellationStatus::RejectedByFm,
            "CANCELLED_BY_FM" => CancellationStatus::CancelledByFm,
            _ => CancellationStatus::NotRequested,
        }
    }
}
