pub mod guard;
pub mod principal;
pub mod service;
pub mod session;
pub mod store;

pub use guard::{Requirement, RouteDecision, RouteGuard};
pub use principal::Principal;
pub use service::{AuthService, HttpAuthService, LoginOutcome};
pub use session::{Access, Session, SessionGate, SessionStatus};
pub use store::{CredentialStore, FileCredentialStore, MemoryCredentialStore};
