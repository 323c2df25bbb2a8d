//! `vitrine-auth` — role, permission, session and audit engine for the
//! collection-management dashboard.
//!
//! This crate is decoupled from any UI and from any concrete storage: it
//! decides, records and signals; the caller renders and navigates.

pub mod access;
pub mod audit;
pub mod authorize;
pub mod config;
pub mod export;
pub mod navigation;
pub mod permissions;
pub mod roles;
pub mod session;

pub use access::{AccessControl, SessionCheck, SessionRestore, SESSION_EXPIRED_REASON};
pub use audit::{AuditEntry, AuditLog, AuditQuery};
pub use authorize::{AuthorizationExplanation, AuthzError, Decision, DenialKind, Route};
pub use config::AccessControlConfig;
pub use export::{ExportError, ExportFormat};
pub use navigation::LoginRedirect;
pub use permissions::{GrantBasis, Permission};
pub use roles::{Role, RoleId, RoleRegistry};
pub use session::Session;
