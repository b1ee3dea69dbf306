pub mod approval;
pub mod claims;
pub mod error;
pub mod gate;
pub mod invalidation;
pub mod session;
pub mod verifier;

pub use approval::{ApprovalService, Mutation, Registration};
pub use claims::{ClaimsSync, SyncOutcome};
pub use error::ServiceError;
pub use gate::{evaluate, AccessPolicy, GateDecision};
pub use invalidation::MarkerService;
pub use session::{
    SessionAccess, SessionClaims, SessionCodec, SessionRejection, SessionService, SignedIn,
    SESSION_COOKIE,
};
pub use verifier::CredentialVerifier;
