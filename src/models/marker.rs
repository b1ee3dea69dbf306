use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Maintenance-mode flag plus the operator-facing message shown while it is
/// enabled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct MaintenanceMarker {
    pub enabled: bool,
    pub message: Option<String>,
}

impl Default for MaintenanceMarker {
    fn default() -> Self {
        Self {
            enabled: false,
            message: None,
        }
    }
}

/// Snapshot of the three global invalidation markers.
///
/// Every request reads this through a bounded-staleness cache; the default
/// state (everything off, force-logout at epoch) is also the fail-open value
/// used when the backing store cannot be reached.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerState {
    pub force_logout_since: DateTime<Utc>,
    pub lockdown_enabled: bool,
    pub maintenance: MaintenanceMarker,
}

impl Default for MarkerState {
    fn default() -> Self {
        Self {
            force_logout_since: DateTime::<Utc>::UNIX_EPOCH,
            lockdown_enabled: false,
            maintenance: MaintenanceMarker::default(),
        }
    }
}

impl MarkerState {
    /// Whether a session issued at `issued_at` has been globally invalidated.
    /// Compared at whole-second resolution because credential issue times are
    /// carried as Unix timestamps; a session minted in the same second as the
    /// watermark stays valid.
    pub fn invalidates(&self, issued_at: DateTime<Utc>) -> bool {
        issued_at.timestamp() < self.force_logout_since.timestamp()
    }
}
