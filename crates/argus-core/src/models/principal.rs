//! Authenticating principals: human users, internal components and the
//! system groups users belong to.

use serde::{Deserialize, Serialize};

use crate::dispatch::{self, tag};
use crate::error::{ModelError, ModelResult};
use crate::password::PasswordAuth;
use crate::record::{DbSession, Record, Relation, fetch_by};
use crate::value::Value;

use super::cert::Cert;

/// A human account. The login is an e-mail address and doubles as the
/// natural key; the password hash is optional because accounts created
/// for certificate-only authentication never get one.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct User {
    login: String,
    password: Option<String>,
    org_id: Option<String>,
    name: Option<String>,
    surname: Option<String>,
    title: Option<String>,
    phone: Option<String>,
    contact_point: bool,

    #[serde(skip)]
    system_groups: Vec<String>,
}

impl User {
    pub fn login(&self) -> &str {
        &self.login
    }

    pub fn org_id(&self) -> Option<&str> {
        self.org_id.as_deref()
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn surname(&self) -> Option<&str> {
        self.surname.as_deref()
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn phone(&self) -> Option<&str> {
        self.phone.as_deref()
    }

    /// Whether this user is a contact point for their org.
    pub fn contact_point(&self) -> bool {
        self.contact_point
    }

    pub fn system_groups(&self) -> &[String] {
        &self.system_groups
    }

    /// Hash and store a new password; an empty password clears the hash.
    pub fn set_password(&mut self, password: &str) -> ModelResult<()> {
        self.password = Self::hash_or_none(password)?;
        Ok(())
    }

    /// Certificates owned by this user.
    pub async fn certs<S: DbSession>(&self, ctx: &S) -> ModelResult<Vec<Cert>> {
        fetch_by(ctx, "owner_login", self.login.as_str()).await
    }

    /// Certificates this user created (as the request case handler).
    pub async fn created_certs<S: DbSession>(&self, ctx: &S) -> ModelResult<Vec<Cert>> {
        fetch_by(ctx, "created_by_login", self.login.as_str()).await
    }

    /// Certificates this user revoked.
    pub async fn revoked_certs<S: DbSession>(&self, ctx: &S) -> ModelResult<Vec<Cert>> {
        fetch_by(ctx, "revoked_by_login", self.login.as_str()).await
    }
}

impl PasswordAuth for User {
    fn password_hash(&self) -> Option<&str> {
        self.password.as_deref()
    }
}

impl Record for User {
    const TABLE: &'static str = "user";
    const VALIDATED_COLUMNS: &'static [&'static str] = &["login"];
    const RELATIONS: &'static [Relation] = &[Relation {
        name: "system_groups",
        link_table: "user_system_group_link",
        local_column: "user_login",
        remote_column: "system_group_name",
    }];

    fn primary_key(&self) -> String {
        self.login.clone()
    }

    fn apply(&mut self, column: &str, value: Value) -> ModelResult<()> {
        if Self::relation(column).is_some() {
            let keys = tag(column, value.into_keys())?;
            return self.set_relation_keys(column, keys);
        }
        let value = dispatch::validated(Self::TABLE, Self::VALIDATED_COLUMNS, column, value)?;
        match column {
            "login" => self.login = tag(column, value.into_str())?,
            "password" => self.password = tag(column, value.into_opt_str())?,
            "org_id" => self.org_id = tag(column, value.into_opt_str())?,
            "name" => self.name = tag(column, value.into_opt_str())?,
            "surname" => self.surname = tag(column, value.into_opt_str())?,
            "title" => self.title = tag(column, value.into_opt_str())?,
            "phone" => self.phone = tag(column, value.into_opt_str())?,
            "contact_point" => self.contact_point = tag(column, value.into_bool())?,
            _ => {
                return Err(ModelError::UnknownField {
                    entity: Self::TABLE,
                    field: column.to_string(),
                });
            }
        }
        Ok(())
    }

    fn relation_keys(&self, name: &str) -> Option<&[String]> {
        (name == "system_groups").then(|| self.system_groups.as_slice())
    }

    fn set_relation_keys(&mut self, name: &str, keys: Vec<String>) -> ModelResult<()> {
        if name == "system_groups" {
            self.system_groups = keys;
            Ok(())
        } else {
            Err(ModelError::UnknownField {
                entity: Self::TABLE,
                field: name.to_string(),
            })
        }
    }
}

/// An internal system component (collector, parser, API backend). Logins
/// are arbitrary identifiers rather than e-mail addresses.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Component {
    login: String,
    password: Option<String>,
}

impl Component {
    pub fn login(&self) -> &str {
        &self.login
    }

    pub fn set_password(&mut self, password: &str) -> ModelResult<()> {
        self.password = Self::hash_or_none(password)?;
        Ok(())
    }

    /// Certificates owned by this component.
    pub async fn certs<S: DbSession>(&self, ctx: &S) -> ModelResult<Vec<Cert>> {
        fetch_by(ctx, "owner_component_login", self.login.as_str()).await
    }

    pub async fn created_certs<S: DbSession>(&self, ctx: &S) -> ModelResult<Vec<Cert>> {
        fetch_by(ctx, "created_by_component_login", self.login.as_str()).await
    }

    pub async fn revoked_certs<S: DbSession>(&self, ctx: &S) -> ModelResult<Vec<Cert>> {
        fetch_by(ctx, "revoked_by_component_login", self.login.as_str()).await
    }
}

impl PasswordAuth for Component {
    fn password_hash(&self) -> Option<&str> {
        self.password.as_deref()
    }
}

impl Record for Component {
    const TABLE: &'static str = "component";
    const VALIDATED_COLUMNS: &'static [&'static str] = &["login"];

    fn primary_key(&self) -> String {
        self.login.clone()
    }

    fn apply(&mut self, column: &str, value: Value) -> ModelResult<()> {
        let value = dispatch::validated(Self::TABLE, Self::VALIDATED_COLUMNS, column, value)?;
        match column {
            "login" => self.login = tag(column, value.into_str())?,
            "password" => self.password = tag(column, value.into_opt_str())?,
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

super::value_leaf! {
    /// An internal privilege group (e.g. `admins`) users are assigned to.
    SystemGroup("system_group") {
        name: String = into_str,
        validated: &["name"],
        users via "user_system_group_link" ("system_group_name" => "user_login")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_login_must_be_an_email_address() {
        let mut user = User::default();
        user.apply("login", Value::from("Analyst@Example.ORG")).unwrap();
        assert_eq!(user.login(), "analyst@example.org");

        let err = user.apply("login", Value::from("not-an-address")).unwrap_err();
        assert_eq!(err.invalid_field(), Some("login"));
    }

    #[test]
    fn component_login_is_not_forced_into_email_shape() {
        let mut component = Component::default();
        component.apply("login", Value::from("rest-api")).unwrap();
        assert_eq!(component.login(), "rest-api");
    }

    #[test]
    fn password_round_trip_through_mixin() {
        let mut user = User::default();
        user.set_password("correct horse").unwrap();
        assert_eq!(user.verify_password("correct horse").unwrap(), Some(true));
        assert_eq!(user.verify_password("wrong").unwrap(), Some(false));

        user.set_password("").unwrap();
        assert_eq!(user.verify_password("anything").unwrap(), None);
    }
}
