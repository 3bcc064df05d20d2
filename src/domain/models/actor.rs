use serde::{Deserialize, Serialize};

pub mod role {
    pub const RESIDENT: &str = "RESIDENT";
    pub const CONCIERGE: &str = "CONCIERGE";
    pub const PROPERTY_MANAGER: &str = "PROPERTY_MANAGER";
    pub const COUNCIL: &str = "COUNCIL";

    pub const ALL: [&str; 4] = [RESIDENT, CONCIERGE, PROPERTY_MANAGER, COUNCIL];

    pub fn is_valid(r: &str) -> bool {
        ALL.contains(&r)
    }
}

/// An authenticated caller. Authentication itself happens at the gateway;
/// the engine trusts the identity headers it injects.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Actor {
    pub id: String,
    pub role: String,
}

impl Actor {
    /// May quick-enter, decide, and delete bookings.
    pub fn is_privileged(&self) -> bool {
        matches!(
            self.role.as_str(),
            role::CONCIERGE | role::PROPERTY_MANAGER | role::COUNCIL
        )
    }

    /// May bypass slot policy and conflict checks. Narrower than
    /// is_privileged: concierge quick-entry still gets conflict-checked.
    pub fn can_override(&self) -> bool {
        matches!(self.role.as_str(), role::PROPERTY_MANAGER | role::COUNCIL)
    }
}
