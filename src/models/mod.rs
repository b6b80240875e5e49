pub mod actor;
pub mod booking;
pub mod facility;
pub mod group;
pub mod user;

pub use actor::Actor;
pub use booking::{Booking, BookingStatus, BookingTime, CancellationStatus};
pub use facility::{Building, Facility, FacilityManager};
pub use group::{Group, GroupDirector};
pub use user::{Role, User};
