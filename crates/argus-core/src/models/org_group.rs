//! Organization groups: shared per-zone grants for a set of orgs.

use serde::{Deserialize, Serialize};

use crate::dispatch::{self, tag};
use crate::error::{ModelError, ModelResult};
use crate::record::{Record, Relation};
use crate::value::Value;

use super::org::AccessZone;

/// A named bundle of per-zone subsource and subsource-group grants
/// applied to every member org. Group grants are additive only; an
/// org-level exclusion still overrides anything granted through the
/// group.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrgGroup {
    org_group_id: String,
    comment: Option<String>,

    #[serde(skip)]
    inside_subsources: Vec<String>,
    #[serde(skip)]
    inside_subsource_groups: Vec<String>,
    #[serde(skip)]
    search_subsources: Vec<String>,
    #[serde(skip)]
    search_subsource_groups: Vec<String>,
    #[serde(skip)]
    threats_subsources: Vec<String>,
    #[serde(skip)]
    threats_subsource_groups: Vec<String>,
    #[serde(skip)]
    orgs: Vec<String>,
}

impl OrgGroup {
    pub fn org_group_id(&self) -> &str {
        &self.org_group_id
    }

    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    pub fn subsources(&self, zone: AccessZone) -> &[String] {
        match zone {
            AccessZone::Inside => &self.inside_subsources,
            AccessZone::Search => &self.search_subsources,
            AccessZone::Threats => &self.threats_subsources,
        }
    }

    pub fn subsource_groups(&self, zone: AccessZone) -> &[String] {
        match zone {
            AccessZone::Inside => &self.inside_subsource_groups,
            AccessZone::Search => &self.search_subsource_groups,
            AccessZone::Threats => &self.threats_subsource_groups,
        }
    }

    pub fn orgs(&self) -> &[String] {
        &self.orgs
    }

    fn relation_field_mut(&mut self, name: &str) -> Option<&mut Vec<String>> {
        match name {
            "inside_subsources" => Some(&mut self.inside_subsources),
            "inside_subsource_groups" => Some(&mut self.inside_subsource_groups),
            "search_subsources" => Some(&mut self.search_subsources),
            "search_subsource_groups" => Some(&mut self.search_subsource_groups),
            "threats_subsources" => Some(&mut self.threats_subsources),
            "threats_subsource_groups" => Some(&mut self.threats_subsource_groups),
            "orgs" => Some(&mut self.orgs),
            _ => None,
        }
    }
}

impl Record for OrgGroup {
    const TABLE: &'static str = "org_group";
    const VALIDATED_COLUMNS: &'static [&'static str] = &["org_group_id"];
    const RELATIONS: &'static [Relation] = &[
        Relation {
            name: "inside_subsources",
            link_table: "org_group_inside_subsource_link",
            local_column: "org_group_id",
            remote_column: "subsource_label",
        },
        Relation {
            name: "inside_subsource_groups",
            link_table: "org_group_inside_subsource_group_link",
            local_column: "org_group_id",
            remote_column: "subsource_group_label",
        },
        Relation {
            name: "search_subsources",
            link_table: "org_group_search_subsource_link",
            local_column: "org_group_id",
            remote_column: "subsource_label",
        },
        Relation {
            name: "search_subsource_groups",
            link_table: "org_group_search_subsource_group_link",
            local_column: "org_group_id",
            remote_column: "subsource_group_label",
        },
        Relation {
            name: "threats_subsources",
            link_table: "org_group_threats_subsource_link",
            local_column: "org_group_id",
            remote_column: "subsource_label",
        },
        Relation {
            name: "threats_subsource_groups",
            link_table: "org_group_threats_subsource_group_link",
            local_column: "org_group_id",
            remote_column: "subsource_group_label",
        },
        Relation {
            name: "orgs",
            link_table: "org_org_group_link",
            local_column: "org_group_id",
            remote_column: "org_id",
        },
    ];

    fn primary_key(&self) -> String {
        self.org_group_id.clone()
    }

    fn apply(&mut self, column: &str, value: Value) -> ModelResult<()> {
        if Self::relation(column).is_some() {
            let keys = tag(column, value.into_keys())?;
            return self.set_relation_keys(column, keys);
        }
        let value = dispatch::validated(Self::TABLE, Self::VALIDATED_COLUMNS, column, value)?;
        match column {
            "org_group_id" => self.org_group_id = tag(column, value.into_str())?,
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
            "inside_subsources" => Some(&self.inside_subsources),
            "inside_subsource_groups" => Some(&self.inside_subsource_groups),
            "search_subsources" => Some(&self.search_subsources),
            "search_subsource_groups" => Some(&self.search_subsource_groups),
            "threats_subsources" => Some(&self.threats_subsources),
            "threats_subsource_groups" => Some(&self.threats_subsource_groups),
            "orgs" => Some(&self.orgs),
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::FieldMap;

    #[test]
    fn group_id_is_trimmed_and_required() {
        let mut group = OrgGroup::default();
        group
            .apply("org_group_id", Value::from("  research-orgs "))
            .unwrap();
        assert_eq!(group.org_group_id(), "research-orgs");

        let err = group.apply("org_group_id", Value::from("   ")).unwrap_err();
        assert_eq!(err.invalid_field(), Some("org_group_id"));
    }

    #[test]
    fn scalar_relation_value_becomes_singleton_list() {
        let mut fields = FieldMap::new();
        fields.insert("org_group_id".into(), Value::from("isp-group"));
        fields.insert("search_subsources".into(), Value::from("general access"));
        let group = OrgGroup::from_fields(fields).unwrap();
        assert_eq!(group.subsources(AccessZone::Search), ["general access"]);
        assert!(group.subsources(AccessZone::Inside).is_empty());
    }
}
