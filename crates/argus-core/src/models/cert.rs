//! Certificate authorities and issued client certificates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::dispatch::{self, tag};
use crate::error::{ModelError, ModelResult};
use crate::record::{DbSession, Record, fetch_by, fetch_one_by};
use crate::value::Value;

/// What a CA issues certificates for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaProfile {
    /// End-user client certificates.
    Client,
    /// Internal service certificates.
    Service,
}

impl CaProfile {
    pub fn as_str(self) -> &'static str {
        match self {
            CaProfile::Client => "client",
            CaProfile::Service => "service",
        }
    }
}

/// A certificate authority. CAs form a forest via `parent_ca_label`;
/// roots have no parent. Only CAs with a profile issue certificates
/// through this system, profile-less CAs exist as chain intermediates.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CaCert {
    ca_label: String,
    parent_ca_label: Option<String>,
    profile: Option<CaProfile>,
    #[serde(default, with = "crate::b64::optional")]
    certificate: Option<Vec<u8>>,
    #[serde(default, with = "crate::b64::optional")]
    ssl_config: Option<Vec<u8>>,
}

impl CaCert {
    pub fn ca_label(&self) -> &str {
        &self.ca_label
    }

    pub fn parent_ca_label(&self) -> Option<&str> {
        self.parent_ca_label.as_deref()
    }

    pub fn profile(&self) -> Option<CaProfile> {
        self.profile
    }

    pub fn certificate(&self) -> Option<&[u8]> {
        self.certificate.as_deref()
    }

    pub fn ssl_config(&self) -> Option<&[u8]> {
        self.ssl_config.as_deref()
    }

    /// Direct child CAs, found by an indexed lookup on
    /// `parent_ca_label`.
    pub async fn children_ca<S: DbSession>(&self, ctx: &S) -> ModelResult<Vec<CaCert>> {
        fetch_by(ctx, "parent_ca_label", self.ca_label.as_str()).await
    }

    /// Certificates issued by this CA.
    pub async fn certs<S: DbSession>(&self, ctx: &S) -> ModelResult<Vec<Cert>> {
        fetch_by(ctx, "ca_cert_label", self.ca_label.as_str()).await
    }

    /// Change the parent CA, keeping the CA forest acyclic.
    ///
    /// Walks the persisted ancestor chain starting at the proposed
    /// parent; if the walk reaches this CA (or loops within already
    /// inconsistent data), the assignment is rejected and the current
    /// parent stays in place.
    pub async fn reparent<S: DbSession>(
        &mut self,
        ctx: &S,
        new_parent: Option<&str>,
    ) -> ModelResult<()> {
        if let Some(start) = new_parent {
            let mut visited = vec![self.ca_label.clone()];
            let mut cursor = start.to_string();
            loop {
                if visited.contains(&cursor) {
                    return Err(ModelError::Validation {
                        field: "parent_ca_label".to_string(),
                        message: format!(
                            "setting parent {start:?} would make the CA chain of {:?} cyclic",
                            self.ca_label
                        ),
                    });
                }
                visited.push(cursor.clone());
                let ancestor: CaCert = fetch_one_by(ctx, "ca_label", cursor.as_str()).await?;
                match ancestor.parent_ca_label {
                    Some(next) => cursor = next,
                    None => break,
                }
            }
        }
        self.parent_ca_label = new_parent.map(str::to_string);
        Ok(())
    }
}

impl Record for CaCert {
    const TABLE: &'static str = "ca_cert";
    const VALIDATED_COLUMNS: &'static [&'static str] = &["ca_label"];

    fn primary_key(&self) -> String {
        self.ca_label.clone()
    }

    fn apply(&mut self, column: &str, value: Value) -> ModelResult<()> {
        let value = dispatch::validated(Self::TABLE, Self::VALIDATED_COLUMNS, column, value)?;
        match column {
            "ca_label" => self.ca_label = tag(column, value.into_str())?,
            "parent_ca_label" => self.parent_ca_label = tag(column, value.into_opt_str())?,
            "profile" => self.profile = tag(column, parse_profile(value))?,
            "certificate" => self.certificate = tag(column, value.into_opt_bytes())?,
            "ssl_config" => self.ssl_config = tag(column, value.into_opt_bytes())?,
            _ => {
                return Err(ModelError::UnknownField {
                    entity: Self::TABLE,
                    field: column.to_string(),
                });
            }
        }
        Ok(())
    }

    fn relation_keys(&self, _name: &str) -> Option<&[String]> {
        None
    }

    fn set_relation_keys(&mut self, name: &str, _keys: Vec<String>) -> ModelResult<()> {
        Err(ModelError::UnknownField {
            entity: Self::TABLE,
            field: name.to_string(),
        })
    }
}

fn parse_profile(value: Value) -> Result<Option<CaProfile>, String> {
    match value {
        Value::Null => Ok(None),
        other => match other.into_str()?.as_str() {
            "client" => Ok(Some(CaProfile::Client)),
            "service" => Ok(Some(CaProfile::Service)),
            s => Err(format!("unknown CA profile {s:?}")),
        },
    }
}

/// An issued certificate, keyed by issuing CA plus serial number. Serial
/// numbers are unique per CA, not globally.
///
/// The creator, owner and revoker are each recorded as a pair of
/// nullable columns, one for a user login and one for a component login,
/// because either kind of principal can hold each role.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Cert {
    ca_cert_label: String,
    serial_hex: String,
    // The issued certificate body; unlike on `CaCert` it is mandatory,
    // the schema rejects a cert row without one.
    #[serde(with = "crate::b64::required")]
    certificate: Vec<u8>,
    #[serde(default, with = "crate::b64::optional")]
    csr: Option<Vec<u8>>,

    owner_login: Option<String>,
    owner_component_login: Option<String>,
    created_by_login: Option<String>,
    created_by_component_login: Option<String>,
    #[serde(default, with = "crate::b64::optional")]
    creator_details: Option<Vec<u8>>,

    is_client_cert: bool,
    is_server_cert: bool,
    created_on: Option<DateTime<Utc>>,
    valid_from: Option<DateTime<Utc>>,
    expires_on: Option<DateTime<Utc>>,

    revoked_on: Option<DateTime<Utc>>,
    revoked_by_login: Option<String>,
    revoked_by_component_login: Option<String>,
    revocation_comment: Option<String>,
}

impl Cert {
    pub fn ca_cert_label(&self) -> &str {
        &self.ca_cert_label
    }

    pub fn serial_hex(&self) -> &str {
        &self.serial_hex
    }

    pub fn certificate(&self) -> &[u8] {
        &self.certificate
    }

    pub fn csr(&self) -> Option<&[u8]> {
        self.csr.as_deref()
    }

    pub fn owner_login(&self) -> Option<&str> {
        self.owner_login.as_deref()
    }

    pub fn owner_component_login(&self) -> Option<&str> {
        self.owner_component_login.as_deref()
    }

    pub fn created_by_login(&self) -> Option<&str> {
        self.created_by_login.as_deref()
    }

    pub fn created_by_component_login(&self) -> Option<&str> {
        self.created_by_component_login.as_deref()
    }

    pub fn creator_details(&self) -> Option<&[u8]> {
        self.creator_details.as_deref()
    }

    pub fn is_client_cert(&self) -> bool {
        self.is_client_cert
    }

    pub fn is_server_cert(&self) -> bool {
        self.is_server_cert
    }

    pub fn created_on(&self) -> Option<DateTime<Utc>> {
        self.created_on
    }

    pub fn valid_from(&self) -> Option<DateTime<Utc>> {
        self.valid_from
    }

    pub fn expires_on(&self) -> Option<DateTime<Utc>> {
        self.expires_on
    }

    pub fn revoked_on(&self) -> Option<DateTime<Utc>> {
        self.revoked_on
    }

    pub fn revoked_by_login(&self) -> Option<&str> {
        self.revoked_by_login.as_deref()
    }

    pub fn revoked_by_component_login(&self) -> Option<&str> {
        self.revoked_by_component_login.as_deref()
    }

    pub fn revocation_comment(&self) -> Option<&str> {
        self.revocation_comment.as_deref()
    }

    /// Whether the certificate is revoked.
    ///
    /// Recomputed on every call from the revocation fields; any one of
    /// them being set marks the certificate revoked, so a half-recorded
    /// revocation still revokes.
    pub fn is_revoked(&self) -> bool {
        self.revoked_on.is_some()
            || self.revoked_by_login.is_some()
            || self.revoked_by_component_login.is_some()
            || self.revocation_comment.is_some()
    }

    /// The issuing CA's profile.
    pub async fn ca_profile<S: DbSession>(&self, ctx: &S) -> ModelResult<Option<CaProfile>> {
        let ca: CaCert = fetch_one_by(ctx, "ca_label", self.ca_cert_label.as_str()).await?;
        Ok(ca.profile())
    }
}

impl Record for Cert {
    const TABLE: &'static str = "cert";
    const VALIDATED_COLUMNS: &'static [&'static str] =
        &["serial_hex", "creator_details", "revocation_comment"];

    fn primary_key(&self) -> String {
        format!("{}/{}", self.ca_cert_label, self.serial_hex)
    }

    fn apply(&mut self, column: &str, value: Value) -> ModelResult<()> {
        let value = dispatch::validated(Self::TABLE, Self::VALIDATED_COLUMNS, column, value)?;
        match column {
            "ca_cert_label" => self.ca_cert_label = tag(column, value.into_str())?,
            "serial_hex" => self.serial_hex = tag(column, value.into_str())?,
            "certificate" => self.certificate = tag(column, value.into_bytes())?,
            "csr" => self.csr = tag(column, value.into_opt_bytes())?,
            "owner_login" => self.owner_login = tag(column, value.into_opt_str())?,
            "owner_component_login" => {
                self.owner_component_login = tag(column, value.into_opt_str())?;
            }
            "created_by_login" => self.created_by_login = tag(column, value.into_opt_str())?,
            "created_by_component_login" => {
                self.created_by_component_login = tag(column, value.into_opt_str())?;
            }
            "creator_details" => self.creator_details = tag(column, value.into_opt_bytes())?,
            "is_client_cert" => self.is_client_cert = tag(column, value.into_bool())?,
            "is_server_cert" => self.is_server_cert = tag(column, value.into_bool())?,
            "created_on" => self.created_on = tag(column, value.into_opt_time())?,
            "valid_from" => self.valid_from = tag(column, value.into_opt_time())?,
            "expires_on" => self.expires_on = tag(column, value.into_opt_time())?,
            "revoked_on" => self.revoked_on = tag(column, value.into_opt_time())?,
            "revoked_by_login" => self.revoked_by_login = tag(column, value.into_opt_str())?,
            "revoked_by_component_login" => {
                self.revoked_by_component_login = tag(column, value.into_opt_str())?;
            }
            "revocation_comment" => {
                self.revocation_comment = tag(column, value.into_opt_str())?;
            }
            _ => {
                return Err(ModelError::UnknownField {
                    entity: Self::TABLE,
                    field: column.to_string(),
                });
            }
        }
        Ok(())
    }

    fn relation_keys(&self, _name: &str) -> Option<&[String]> {
        None
    }

    fn set_relation_keys(&mut self, name: &str, _keys: Vec<String>) -> ModelResult<()> {
        Err(ModelError::UnknownField {
            entity: Self::TABLE,
            field: name.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn cert(ca: &str, serial: &str) -> Cert {
        let mut cert = Cert::default();
        cert.apply("ca_cert_label", Value::from(ca)).unwrap();
        cert.apply("serial_hex", Value::from(serial)).unwrap();
        cert
    }

    #[test]
    fn composite_key_joins_ca_and_serial() {
        assert_eq!(cert("client-ca", "00ABCDEF").primary_key(), "client-ca/00abcdef");
    }

    #[test]
    fn any_revocation_field_marks_the_cert_revoked() {
        let base = cert("client-ca", "0a");
        assert!(!base.is_revoked());

        let mut by_date = base.clone();
        by_date
            .apply(
                "revoked_on",
                Value::Time(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()),
            )
            .unwrap();
        assert!(by_date.is_revoked());

        let mut by_user = base.clone();
        by_user
            .apply("revoked_by_login", Value::from("admin@example.org"))
            .unwrap();
        assert!(by_user.is_revoked());

        let mut by_component = base.clone();
        by_component
            .apply("revoked_by_component_login", Value::from("cert-manager"))
            .unwrap();
        assert!(by_component.is_revoked());

        let mut by_comment = base.clone();
        by_comment
            .apply("revocation_comment", Value::from("key compromised"))
            .unwrap();
        assert!(by_comment.is_revoked());
    }

    #[test]
    fn certificate_body_cannot_be_nulled() {
        let mut cert = cert("client-ca", "0c");
        cert.apply("certificate", Value::from(b"pem bytes".to_vec()))
            .unwrap();

        let err = cert.apply("certificate", Value::Null).unwrap_err();
        assert_eq!(err.invalid_field(), Some("certificate"));
        assert_eq!(cert.certificate(), b"pem bytes");
    }

    #[test]
    fn blank_revocation_comment_clears_instead_of_revoking() {
        let mut cert = cert("client-ca", "0b");
        cert.apply("revocation_comment", Value::from("   ")).unwrap();
        assert!(!cert.is_revoked());
    }

    #[test]
    fn profile_parses_known_values_only() {
        let mut ca = CaCert::default();
        ca.apply("ca_label", Value::from("service-ca")).unwrap();
        ca.apply("profile", Value::from("service")).unwrap();
        assert_eq!(ca.profile(), Some(CaProfile::Service));

        let err = ca.apply("profile", Value::from("root")).unwrap_err();
        assert_eq!(err.invalid_field(), Some("profile"));
        assert_eq!(ca.profile(), Some(CaProfile::Service));
    }
}
