//! Client organization: per-zone grants, exclusions and inside filters.

use serde::{Deserialize, Serialize};

use crate::dispatch::{self, tag};
use crate::error::{ModelError, ModelResult};
use crate::record::{DbSession, Record, Relation, fetch_by};
use crate::value::Value;

/// The three independent visibility scopes for threat data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessZone {
    Inside,
    Search,
    Threats,
}

impl AccessZone {
    pub const ALL: [AccessZone; 3] = [AccessZone::Inside, AccessZone::Search, AccessZone::Threats];

    pub fn as_str(self) -> &'static str {
        match self {
            AccessZone::Inside => "inside",
            AccessZone::Search => "search",
            AccessZone::Threats => "threats",
        }
    }
}

/// An organization consuming threat data.
///
/// For every access zone the org holds four independent collections:
/// subsources granted directly, subsources explicitly excluded,
/// subsource groups granted, and subsource groups excluded. Exclusions
/// matter when a subsource would otherwise be reachable through a group
/// grant — an org-level exclusion overrides any group-derived inclusion
/// of the same subsource in the same zone. Combining the collections into
/// a visibility decision is the consumer's policy; this schema only keeps
/// every input to that decision independently representable and queryable.
///
/// The inside-filter collections (ASN, country, FQDN, IP network, URL)
/// describe the org's own network, used to decide whether an incoming
/// event is "inside" it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Org {
    org_id: String,
    actual_name: Option<String>,
    full_access: bool,
    verified: bool,

    access_to_inside: bool,
    /// JSON `{parameter: required?}` mapping; null or empty means every
    /// legal parameter is allowed. Same for the other two zones.
    #[serde(default, with = "crate::b64::optional")]
    inside_request_parameters: Option<Vec<u8>>,
    access_to_search: bool,
    #[serde(default, with = "crate::b64::optional")]
    search_request_parameters: Option<Vec<u8>>,
    access_to_threats: bool,
    #[serde(default, with = "crate::b64::optional")]
    threats_request_parameters: Option<Vec<u8>>,

    stream_api_enabled: bool,
    email_notifications_enabled: bool,
    email_notifications_language: Option<String>,
    email_notifications_business_days_only: bool,
    email_notifications_local_tz: bool,

    #[serde(skip)]
    inside_subsources: Vec<String>,
    #[serde(skip)]
    inside_ex_subsources: Vec<String>,
    #[serde(skip)]
    inside_subsource_groups: Vec<String>,
    #[serde(skip)]
    inside_ex_subsource_groups: Vec<String>,
    #[serde(skip)]
    search_subsources: Vec<String>,
    #[serde(skip)]
    search_ex_subsources: Vec<String>,
    #[serde(skip)]
    search_subsource_groups: Vec<String>,
    #[serde(skip)]
    search_ex_subsource_groups: Vec<String>,
    #[serde(skip)]
    threats_subsources: Vec<String>,
    #[serde(skip)]
    threats_ex_subsources: Vec<String>,
    #[serde(skip)]
    threats_subsource_groups: Vec<String>,
    #[serde(skip)]
    threats_ex_subsource_groups: Vec<String>,
    #[serde(skip)]
    org_groups: Vec<String>,
    #[serde(skip)]
    inside_filter_asns: Vec<String>,
    #[serde(skip)]
    inside_filter_ccs: Vec<String>,
    #[serde(skip)]
    inside_filter_fqdns: Vec<String>,
    #[serde(skip)]
    inside_filter_ip_networks: Vec<String>,
    #[serde(skip)]
    inside_filter_urls: Vec<String>,
    #[serde(skip)]
    email_notifications_addresses: Vec<String>,
    #[serde(skip)]
    email_notifications_times: Vec<String>,
}

macro_rules! org_relations {
    ($($field:ident => $link:literal / $remote:literal),* $(,)?) => {
        const RELATION_TABLE: &'static [Relation] = &[$(Relation {
            name: stringify!($field),
            link_table: $link,
            local_column: "org_id",
            remote_column: $remote,
        }),*];

        fn relation_field(&self, name: &str) -> Option<&Vec<String>> {
            match name {
                $(stringify!($field) => Some(&self.$field),)*
                _ => None,
            }
        }

        fn relation_field_mut(&mut self, name: &str) -> Option<&mut Vec<String>> {
            match name {
                $(stringify!($field) => Some(&mut self.$field),)*
                _ => None,
            }
        }
    };
}

impl Org {
    org_relations! {
        inside_subsources => "org_inside_subsource_link" / "subsource_label",
        inside_ex_subsources => "org_inside_ex_subsource_link" / "subsource_label",
        inside_subsource_groups => "org_inside_subsource_group_link" / "subsource_group_label",
        inside_ex_subsource_groups => "org_inside_ex_subsource_group_link" / "subsource_group_label",
        search_subsources => "org_search_subsource_link" / "subsource_label",
        search_ex_subsources => "org_search_ex_subsource_link" / "subsource_label",
        search_subsource_groups => "org_search_subsource_group_link" / "subsource_group_label",
        search_ex_subsource_groups => "org_search_ex_subsource_group_link" / "subsource_group_label",
        threats_subsources => "org_threats_subsource_link" / "subsource_label",
        threats_ex_subsources => "org_threats_ex_subsource_link" / "subsource_label",
        threats_subsource_groups => "org_threats_subsource_group_link" / "subsource_group_label",
        threats_ex_subsource_groups => "org_threats_ex_subsource_group_link" / "subsource_group_label",
        org_groups => "org_org_group_link" / "org_group_id",
        inside_filter_asns => "org_asn_link" / "asn",
        inside_filter_ccs => "org_cc_link" / "cc",
        inside_filter_fqdns => "org_fqdn_link" / "fqdn",
        inside_filter_ip_networks => "org_ip_network_link" / "ip_network",
        inside_filter_urls => "org_url_link" / "url",
        email_notifications_addresses => "org_notification_email_link" / "email",
        email_notifications_times => "org_notification_time_link" / "notification_time",
    }

    pub fn org_id(&self) -> &str {
        &self.org_id
    }

    pub fn actual_name(&self) -> Option<&str> {
        self.actual_name.as_deref()
    }

    pub fn full_access(&self) -> bool {
        self.full_access
    }

    pub fn verified(&self) -> bool {
        self.verified
    }

    pub fn stream_api_enabled(&self) -> bool {
        self.stream_api_enabled
    }

    pub fn access_to(&self, zone: AccessZone) -> bool {
        match zone {
            AccessZone::Inside => self.access_to_inside,
            AccessZone::Search => self.access_to_search,
            AccessZone::Threats => self.access_to_threats,
        }
    }

    /// The serialized request-parameter mapping for one zone.
    pub fn request_parameters(&self, zone: AccessZone) -> Option<&[u8]> {
        match zone {
            AccessZone::Inside => self.inside_request_parameters.as_deref(),
            AccessZone::Search => self.search_request_parameters.as_deref(),
            AccessZone::Threats => self.threats_request_parameters.as_deref(),
        }
    }

    pub fn subsources(&self, zone: AccessZone) -> &[String] {
        match zone {
            AccessZone::Inside => &self.inside_subsources,
            AccessZone::Search => &self.search_subsources,
            AccessZone::Threats => &self.threats_subsources,
        }
    }

    /// Subsources explicitly excluded for the org in one zone. An entry
    /// here overrides a group-derived grant of the same subsource.
    pub fn ex_subsources(&self, zone: AccessZone) -> &[String] {
        match zone {
            AccessZone::Inside => &self.inside_ex_subsources,
            AccessZone::Search => &self.search_ex_subsources,
            AccessZone::Threats => &self.threats_ex_subsources,
        }
    }

    pub fn subsource_groups(&self, zone: AccessZone) -> &[String] {
        match zone {
            AccessZone::Inside => &self.inside_subsource_groups,
            AccessZone::Search => &self.search_subsource_groups,
            AccessZone::Threats => &self.threats_subsource_groups,
        }
    }

    pub fn ex_subsource_groups(&self, zone: AccessZone) -> &[String] {
        match zone {
            AccessZone::Inside => &self.inside_ex_subsource_groups,
            AccessZone::Search => &self.search_ex_subsource_groups,
            AccessZone::Threats => &self.threats_ex_subsource_groups,
        }
    }

    pub fn org_groups(&self) -> &[String] {
        &self.org_groups
    }

    pub fn inside_filter_asns(&self) -> &[String] {
        &self.inside_filter_asns
    }

    pub fn inside_filter_ccs(&self) -> &[String] {
        &self.inside_filter_ccs
    }

    pub fn inside_filter_fqdns(&self) -> &[String] {
        &self.inside_filter_fqdns
    }

    pub fn inside_filter_ip_networks(&self) -> &[String] {
        &self.inside_filter_ip_networks
    }

    pub fn inside_filter_urls(&self) -> &[String] {
        &self.inside_filter_urls
    }

    pub fn email_notifications_addresses(&self) -> &[String] {
        &self.email_notifications_addresses
    }

    pub fn email_notifications_times(&self) -> &[String] {
        &self.email_notifications_times
    }

    /// The org's users (one-to-many inverse of `user.org_id`).
    pub async fn users<S: DbSession>(
        &self,
        ctx: &S,
    ) -> ModelResult<Vec<super::principal::User>> {
        fetch_by(ctx, "org_id", self.org_id.as_str()).await
    }
}

impl Record for Org {
    const TABLE: &'static str = "org";
    const VALIDATED_COLUMNS: &'static [&'static str] = &[
        "org_id",
        "email_notifications_language",
        "inside_request_parameters",
        "search_request_parameters",
        "threats_request_parameters",
    ];
    const RELATIONS: &'static [Relation] = Self::RELATION_TABLE;

    fn primary_key(&self) -> String {
        self.org_id.clone()
    }

    fn apply(&mut self, column: &str, value: Value) -> ModelResult<()> {
        if Self::relation(column).is_some() {
            let keys = tag(column, value.into_keys())?;
            return self.set_relation_keys(column, keys);
        }
        let value = dispatch::validated(Self::TABLE, Self::VALIDATED_COLUMNS, column, value)?;
        match column {
            "org_id" => self.org_id = tag(column, value.into_str())?,
            "actual_name" => self.actual_name = tag(column, value.into_opt_str())?,
            "full_access" => self.full_access = tag(column, value.into_bool())?,
            "verified" => self.verified = tag(column, value.into_bool())?,
            "access_to_inside" => self.access_to_inside = tag(column, value.into_bool())?,
            "access_to_search" => self.access_to_search = tag(column, value.into_bool())?,
            "access_to_threats" => self.access_to_threats = tag(column, value.into_bool())?,
            "inside_request_parameters" => {
                self.inside_request_parameters = tag(column, value.into_opt_bytes())?;
            }
            "search_request_parameters" => {
                self.search_request_parameters = tag(column, value.into_opt_bytes())?;
            }
            "threats_request_parameters" => {
                self.threats_request_parameters = tag(column, value.into_opt_bytes())?;
            }
            "stream_api_enabled" => self.stream_api_enabled = tag(column, value.into_bool())?,
            "email_notifications_enabled" => {
                self.email_notifications_enabled = tag(column, value.into_bool())?;
            }
            "email_notifications_language" => {
                self.email_notifications_language = tag(column, value.into_opt_str())?;
            }
            "email_notifications_business_days_only" => {
                self.email_notifications_business_days_only = tag(column, value.into_bool())?;
            }
            "email_notifications_local_tz" => {
                self.email_notifications_local_tz = tag(column, value.into_bool())?;
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

    fn relation_keys(&self, name: &str) -> Option<&[String]> {
        self.relation_field(name).map(Vec::as_slice)
    }

    fn set_relation_keys(&mut self, name: &str, keys: Vec<String>) -> ModelResult<()> {
        match self.relation_field_mut(name) {
            Some(field) => {
                *field = keys;
                Ok(())
            }
            None => Err(ModelError::UnknownField {
                entity: Self::TABLE,
                field: name.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_assignment_tags_field_and_keeps_old_value() {
        let mut org = Org::default();
        org.apply("org_id", Value::from("cert.example.org")).unwrap();

        let err = org.apply("org_id", Value::from("NOT/AN/ID")).unwrap_err();
        assert_eq!(err.invalid_field(), Some("org_id"));
        assert_eq!(org.org_id(), "cert.example.org");
    }

    #[test]
    fn request_parameters_validate_and_coerce_to_bytes() {
        let mut org = Org::default();
        let mapping = serde_json::json!({"time.min": true, "ip": false});
        org.apply("search_request_parameters", Value::Json(mapping.clone()))
            .unwrap();

        let stored = org.request_parameters(AccessZone::Search).unwrap();
        let decoded: serde_json::Value = serde_json::from_slice(stored).unwrap();
        assert_eq!(decoded, mapping);

        let err = org
            .apply(
                "threats_request_parameters",
                Value::Json(serde_json::json!({"ip": "yes"})),
            )
            .unwrap_err();
        assert_eq!(err.invalid_field(), Some("threats_request_parameters"));
        assert!(org.request_parameters(AccessZone::Threats).is_none());
    }

    #[test]
    fn unknown_column_is_rejected() {
        let mut org = Org::default();
        let err = org.apply("no_such_column", Value::Null).unwrap_err();
        assert!(matches!(err, ModelError::UnknownField { .. }));
    }
}
