//! Criteria containers and their value leaves.
//!
//! A container bundles ASNs, country codes, IP networks, event categories
//! and name patterns; subsources reference containers in an inclusion or
//! an exclusion role to carve a slice out of a source's event stream.

use serde::{Deserialize, Serialize};

use crate::dispatch::{self, tag};
use crate::error::{ModelError, ModelResult};
use crate::record::{Record, Relation};
use crate::value::Value;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CriteriaContainer {
    label: String,

    #[serde(skip)]
    criteria_asns: Vec<String>,
    #[serde(skip)]
    criteria_ccs: Vec<String>,
    #[serde(skip)]
    criteria_ip_networks: Vec<String>,
    #[serde(skip)]
    criteria_categories: Vec<String>,
    #[serde(skip)]
    criteria_names: Vec<String>,
    #[serde(skip)]
    inclusion_subsources: Vec<String>,
    #[serde(skip)]
    exclusion_subsources: Vec<String>,
}

impl CriteriaContainer {
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn criteria_asns(&self) -> &[String] {
        &self.criteria_asns
    }

    pub fn criteria_ccs(&self) -> &[String] {
        &self.criteria_ccs
    }

    pub fn criteria_ip_networks(&self) -> &[String] {
        &self.criteria_ip_networks
    }

    pub fn criteria_categories(&self) -> &[String] {
        &self.criteria_categories
    }

    pub fn criteria_names(&self) -> &[String] {
        &self.criteria_names
    }

    /// Subsources using this container in the inclusion role.
    pub fn inclusion_subsources(&self) -> &[String] {
        &self.inclusion_subsources
    }

    /// Subsources using this container in the exclusion role.
    pub fn exclusion_subsources(&self) -> &[String] {
        &self.exclusion_subsources
    }

    fn relation_field_mut(&mut self, name: &str) -> Option<&mut Vec<String>> {
        match name {
            "criteria_asns" => Some(&mut self.criteria_asns),
            "criteria_ccs" => Some(&mut self.criteria_ccs),
            "criteria_ip_networks" => Some(&mut self.criteria_ip_networks),
            "criteria_categories" => Some(&mut self.criteria_categories),
            "criteria_names" => Some(&mut self.criteria_names),
            "inclusion_subsources" => Some(&mut self.inclusion_subsources),
            "exclusion_subsources" => Some(&mut self.exclusion_subsources),
            _ => None,
        }
    }
}

impl Record for CriteriaContainer {
    const TABLE: &'static str = "criteria_container";
    const VALIDATED_COLUMNS: &'static [&'static str] = &["label"];
    const RELATIONS: &'static [Relation] = &[
        Relation {
            name: "criteria_asns",
            link_table: "criteria_asn_link",
            local_column: "criteria_container_label",
            remote_column: "asn",
        },
        Relation {
            name: "criteria_ccs",
            link_table: "criteria_cc_link",
            local_column: "criteria_container_label",
            remote_column: "cc",
        },
        Relation {
            name: "criteria_ip_networks",
            link_table: "criteria_ip_network_link",
            local_column: "criteria_container_label",
            remote_column: "ip_network",
        },
        Relation {
            name: "criteria_categories",
            link_table: "criteria_category_link",
            local_column: "criteria_container_label",
            remote_column: "category",
        },
        Relation {
            name: "criteria_names",
            link_table: "criteria_name_link",
            local_column: "criteria_container_label",
            remote_column: "name",
        },
        Relation {
            name: "inclusion_subsources",
            link_table: "subsource_inclusion_criteria_link",
            local_column: "criteria_container_label",
            remote_column: "subsource_label",
        },
        Relation {
            name: "exclusion_subsources",
            link_table: "subsource_exclusion_criteria_link",
            local_column: "criteria_container_label",
            remote_column: "subsource_label",
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
            "criteria_asns" => Some(&self.criteria_asns),
            "criteria_ccs" => Some(&self.criteria_ccs),
            "criteria_ip_networks" => Some(&self.criteria_ip_networks),
            "criteria_categories" => Some(&self.criteria_categories),
            "criteria_names" => Some(&self.criteria_names),
            "inclusion_subsources" => Some(&self.inclusion_subsources),
            "exclusion_subsources" => Some(&self.exclusion_subsources),
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

super::value_leaf! {
    /// One autonomous system number usable as a criterion.
    CriteriaAsn("criteria_asn") {
        asn: i64 = into_int,
        validated: &["asn"],
        criteria_containers via "criteria_asn_link" ("asn" => "criteria_container_label")
    }
}

super::value_leaf! {
    /// One country code usable as a criterion.
    CriteriaCc("criteria_cc") {
        cc: String = into_str,
        validated: &["cc"],
        criteria_containers via "criteria_cc_link" ("cc" => "criteria_container_label")
    }
}

super::value_leaf! {
    /// One IP network (CIDR) usable as a criterion.
    CriteriaIpNetwork("criteria_ip_network") {
        ip_network: String = into_str,
        validated: &["ip_network"],
        criteria_containers via "criteria_ip_network_link" ("ip_network" => "criteria_container_label")
    }
}

super::value_leaf! {
    /// One event category usable as a criterion.
    CriteriaCategory("criteria_category") {
        category: String = into_str,
        validated: &["category"],
        criteria_containers via "criteria_category_link" ("category" => "criteria_container_label")
    }
}

super::value_leaf! {
    /// One event name pattern usable as a criterion.
    CriteriaName("criteria_name") {
        name: String = into_str,
        validated: &["name"],
        criteria_containers via "criteria_name_link" ("name" => "criteria_container_label")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::FieldMap;

    #[test]
    fn dotted_asn_normalizes_to_plain_number() {
        let mut leaf = CriteriaAsn::default();
        leaf.apply("asn", Value::from("1.10")).unwrap();
        assert_eq!(*leaf.asn(), 65546);
        assert_eq!(leaf.primary_key(), "65546");
    }

    #[test]
    fn criteria_name_lowercases_while_plain_name_does_not() {
        // `criteria_name.name` has its own qualified validator; the bare
        // `name` validator used elsewhere keeps case.
        let mut leaf = CriteriaName::default();
        leaf.apply("name", Value::from("Mirai Variant")).unwrap();
        assert_eq!(leaf.name(), "mirai variant");
    }

    #[test]
    fn container_takes_leaf_keys_in_both_roles() {
        let mut fields = FieldMap::new();
        fields.insert("label".into(), Value::from("pl-networks"));
        fields.insert("criteria_asns".into(), Value::from(["65546", "64512"]));
        fields.insert("criteria_ccs".into(), Value::from("PL"));
        let container = CriteriaContainer::from_fields(fields).unwrap();
        assert_eq!(container.criteria_asns().len(), 2);
        assert_eq!(container.criteria_ccs(), ["PL"]);
    }
}
