//! Data sources and their subsources.

use serde::{Deserialize, Serialize};

use crate::dispatch::{self, tag};
use crate::error::{ModelError, ModelResult};
use crate::record::{DbSession, Record, Relation, fetch_by};
use crate::value::Value;

/// Every association table that references a subsource, with the column
/// holding the subsource key. Deleting a subsource must sweep all of
/// them, or orphaned grant rows would keep granting access to a label
/// that no longer resolves.
pub const SUBSOURCE_LINK_TABLES: &[(&str, &str)] = &[
    ("org_inside_subsource_link", "subsource_label"),
    ("org_inside_ex_subsource_link", "subsource_label"),
    ("org_search_subsource_link", "subsource_label"),
    ("org_search_ex_subsource_link", "subsource_label"),
    ("org_threats_subsource_link", "subsource_label"),
    ("org_threats_ex_subsource_link", "subsource_label"),
    ("org_group_inside_subsource_link", "subsource_label"),
    ("org_group_search_subsource_link", "subsource_label"),
    ("org_group_threats_subsource_link", "subsource_label"),
    ("subsource_group_link", "subsource_label"),
    ("subsource_inclusion_criteria_link", "subsource_label"),
    ("subsource_exclusion_criteria_link", "subsource_label"),
];

/// An external feed, identified as `provider.channel`. The anonymized id
/// is what event consumers outside the organization running the system
/// are shown instead of the real one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Source {
    source_id: String,
    anonymized_source_id: String,
    dip_anonymization_enabled: bool,
    comment: Option<String>,
}

impl Default for Source {
    fn default() -> Self {
        Source {
            source_id: String::new(),
            anonymized_source_id: String::new(),
            // Anonymization of dedicated-IP data is opt-out.
            dip_anonymization_enabled: true,
            comment: None,
        }
    }
}

impl Source {
    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    pub fn anonymized_source_id(&self) -> &str {
        &self.anonymized_source_id
    }

    pub fn dip_anonymization_enabled(&self) -> bool {
        self.dip_anonymization_enabled
    }

    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    /// The source's subsources (one-to-many inverse of
    /// `subsource.source_id`).
    pub async fn subsources<S: DbSession>(&self, ctx: &S) -> ModelResult<Vec<Subsource>> {
        fetch_by(ctx, "source_id", self.source_id.as_str()).await
    }
}

impl Record for Source {
    const TABLE: &'static str = "source";
    const VALIDATED_COLUMNS: &'static [&'static str] = &["source_id", "anonymized_source_id"];

    fn primary_key(&self) -> String {
        self.source_id.clone()
    }

    fn apply(&mut self, column: &str, value: Value) -> ModelResult<()> {
        let value = dispatch::validated(Self::TABLE, Self::VALIDATED_COLUMNS, column, value)?;
        match column {
            "source_id" => self.source_id = tag(column, value.into_str())?,
            "anonymized_source_id" => {
                self.anonymized_source_id = tag(column, value.into_str())?;
            }
            "dip_anonymization_enabled" => {
                self.dip_anonymization_enabled = tag(column, value.into_bool())?;
            }
            "comment" => self.comment = tag(column, value.into_opt_str())?,
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

/// A named slice of one source: the unit at which access is granted.
///
/// Inclusion criteria must all match for an event to belong to the
/// subsource; exclusion criteria must all fail to match.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Subsource {
    label: String,
    source_id: Option<String>,
    comment: Option<String>,

    #[serde(skip)]
    inclusion_criteria: Vec<String>,
    #[serde(skip)]
    exclusion_criteria: Vec<String>,
    #[serde(skip)]
    subsource_groups: Vec<String>,
}

impl Subsource {
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn source_id(&self) -> Option<&str> {
        self.source_id.as_deref()
    }

    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    pub fn inclusion_criteria(&self) -> &[String] {
        &self.inclusion_criteria
    }

    pub fn exclusion_criteria(&self) -> &[String] {
        &self.exclusion_criteria
    }

    pub fn subsource_groups(&self) -> &[String] {
        &self.subsource_groups
    }

    fn relation_field_mut(&mut self, name: &str) -> Option<&mut Vec<String>> {
        match name {
            "inclusion_criteria" => Some(&mut self.inclusion_criteria),
            "exclusion_criteria" => Some(&mut self.exclusion_criteria),
            "subsource_groups" => Some(&mut self.subsource_groups),
            _ => None,
        }
    }
}

impl Record for Subsource {
    const TABLE: &'static str = "subsource";
    const VALIDATED_COLUMNS: &'static [&'static str] = &["label"];
    const RELATIONS: &'static [Relation] = &[
        Relation {
            name: "inclusion_criteria",
            link_table: "subsource_inclusion_criteria_link",
            local_column: "subsource_label",
            remote_column: "criteria_container_label",
        },
        Relation {
            name: "exclusion_criteria",
            link_table: "subsource_exclusion_criteria_link",
            local_column: "subsource_label",
            remote_column: "criteria_container_label",
        },
        Relation {
            name: "subsource_groups",
            link_table: "subsource_group_link",
            local_column: "subsource_label",
            remote_column: "subsource_group_label",
        },
    ];

    fn primary_key(&self) -> String {
        self.label.clone()
    }

    fn apply(&mut self, column: &str, value: Value) -> ModelResult<()> {
        if Self::relation(column).is_some() {
            let keys = tag(column, value.into_keys())?;
            return self.set_relation_keys(column, keys);
        }
        let value = dispatch::validated(Self::TABLE, Self::VALIDATED_COLUMNS, column, value)?;
        match column {
            "label" => self.label = tag(column, value.into_str())?,
            "source_id" => self.source_id = tag(column, value.into_opt_str())?,
            "comment" => self.comment = tag(column, value.into_opt_str())?,
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
        match name {
            "inclusion_criteria" => Some(&self.inclusion_criteria),
            "exclusion_criteria" => Some(&self.exclusion_criteria),
            "subsource_groups" => Some(&self.subsource_groups),
            _ => None,
        }
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

/// A reusable set of subsources that can be granted as one unit.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubsourceGroup {
    label: String,
    comment: Option<String>,

    #[serde(skip)]
    subsources: Vec<String>,
}

impl SubsourceGroup {
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    pub fn subsources(&self) -> &[String] {
        &self.subsources
    }
}

impl Record for SubsourceGroup {
    const TABLE: &'static str = "subsource_group";
    const VALIDATED_COLUMNS: &'static [&'static str] = &["label"];
    const RELATIONS: &'static [Relation] = &[Relation {
        name: "subsources",
        link_table: "subsource_group_link",
        local_column: "subsource_group_label",
        remote_column: "subsource_label",
    }];

    fn primary_key(&self) -> String {
        self.label.clone()
    }

    fn apply(&mut self, column: &str, value: Value) -> ModelResult<()> {
        if Self::relation(column).is_some() {
            let keys = tag(column, value.into_keys())?;
            return self.set_relation_keys(column, keys);
        }
        let value = dispatch::validated(Self::TABLE, Self::VALIDATED_COLUMNS, column, value)?;
        match column {
            "label" => self.label = tag(column, value.into_str())?,
            "comment" => self.comment = tag(column, value.into_opt_str())?,
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
        (name == "subsources").then(|| self.subsources.as_slice())
    }

    fn set_relation_keys(&mut self, name: &str, keys: Vec<String>) -> ModelResult<()> {
        if name == "subsources" {
            self.subsources = keys;
            Ok(())
        } else {
            Err(ModelError::UnknownField {
                entity: Self::TABLE,
                field: name.to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::FieldMap;

    #[test]
    fn source_defaults_to_dip_anonymization_on() {
        let source = Source::default();
        assert!(source.dip_anonymization_enabled());
    }

    #[test]
    fn source_ids_require_provider_channel_form() {
        let mut fields = FieldMap::new();
        fields.insert("source_id".into(), Value::from("cert-pl.phishing"));
        fields.insert("anonymized_source_id".into(), Value::from("hidden.42"));
        let source = Source::from_fields(fields).unwrap();
        assert_eq!(source.source_id(), "cert-pl.phishing");

        let mut bad = Source::default();
        let err = bad.apply("anonymized_source_id", Value::from("nodot")).unwrap_err();
        assert_eq!(err.invalid_field(), Some("anonymized_source_id"));
    }

    #[test]
    fn subsource_criteria_roles_are_independent() {
        let mut fields = FieldMap::new();
        fields.insert("label".into(), Value::from("phishing events"));
        fields.insert("source_id".into(), Value::from("cert-pl.phishing"));
        fields.insert("inclusion_criteria".into(), Value::from(["pl-networks"]));
        fields.insert(
            "exclusion_criteria".into(),
            Value::from(["internal-testing", "known-fp"]),
        );
        let subsource = Subsource::from_fields(fields).unwrap();
        assert_eq!(subsource.inclusion_criteria(), ["pl-networks"]);
        assert_eq!(subsource.exclusion_criteria().len(), 2);
        assert!(subsource.subsource_groups().is_empty());
    }
}
