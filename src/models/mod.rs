//! Domain models for the portal's identity and approval subsystem.

mod audit;
mod claims;
mod marker;
mod profile;

pub use audit::{AuditAction, AuditEntry};
pub use claims::CustomClaims;
pub use marker::{MaintenanceMarker, MarkerState};
pub use profile::{ApprovedProfile, PendingProfile, Profile, Role, VerifiedIdentity};
