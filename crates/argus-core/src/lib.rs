//! Argus Core — the authorization and certificate-lifecycle data model.
//!
//! This crate provides:
//! - Entity definitions for orgs, principals, sources, criteria and
//!   certificates (the [`models`] module)
//! - Per-column validation with a qualified-before-bare registry
//!   ([`validators`])
//! - The generic record interface and its persistence seam
//!   ([`Record`], [`DbSession`])
//! - The password credential mixin ([`PasswordAuth`])
//!
//! Persistence itself lives in `argus-db`, which implements
//! [`DbSession`] on top of SurrealDB.

pub mod b64;
pub mod dispatch;
pub mod error;
pub mod models;
pub mod password;
pub mod record;
pub mod validators;
pub mod value;

pub use error::{ModelError, ModelResult};
pub use models::{
    AccessZone, CaCert, CaProfile, Cert, Component, CriteriaAsn, CriteriaCategory, CriteriaCc,
    CriteriaContainer, CriteriaIpNetwork, CriteriaName, EmailNotificationAddress,
    EmailNotificationTime, InsideFilterAsn, InsideFilterCc, InsideFilterFqdn,
    InsideFilterIpNetwork, InsideFilterUrl, Org, OrgGroup, SUBSOURCE_LINK_TABLES, Source,
    Subsource, SubsourceGroup, SystemGroup, User,
};
pub use password::PasswordAuth;
pub use record::{
    DbSession, Record, Relation, attach_to_context, create_new, fetch_all, fetch_by, fetch_one_by,
    is_related_to,
};
pub use value::{FieldMap, Value};
