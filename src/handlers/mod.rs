pub mod admin;
pub mod approvals;
pub mod auth;
pub mod cancellations;
pub mod dashboard;
pub mod facility;
pub mod views;
