use crate::models::{FacilityManager, GroupDirector, User};

/// The authenticated caller, resolved once per request from the session
/// cookie and carried into handlers. Capability records ride along so
/// handlers never re-query the role mid-request.
#[derive(Debug, Clone)]
pub enum Actor {
    Admin { user: User },
    GroupDirector { user: User, director: GroupDirector },
    FacilityManager { user: User, manager: FacilityManager },
    Employee { user: User },
}

impl Actor {
    pub fn user(&self) -> &User {
        match self {
            Actor::Admin { user }
            | Actor::GroupDirector { user, .. }
            | Actor::FacilityManager { user, .. }
            | Actor::Employee { user } => user,
        }
    }
}
