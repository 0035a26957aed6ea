//! Entity definitions: the relational schema for access control and the
//! certificate lifecycle.

/// Defines a leaf entity: one validated value column (which is also the
/// natural key) plus a single to-many association back to its consumer.
/// The criteria and inside-filter leaves all share this shape.
macro_rules! value_leaf {
    (
        $(#[$meta:meta])*
        $name:ident ($table:literal) {
            $field:ident: $ty:ty = $conv:ident,
            validated: $validated:expr,
            $rel:ident via $link:literal ($local:literal => $remote:literal)
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
        pub struct $name {
            $field: $ty,
            #[serde(skip)]
            $rel: Vec<String>,
        }

        impl $name {
            pub fn $field(&self) -> &$ty {
                &self.$field
            }

            pub fn $rel(&self) -> &[String] {
                &self.$rel
            }
        }

        impl $crate::record::Record for $name {
            const TABLE: &'static str = $table;
            const VALIDATED_COLUMNS: &'static [&'static str] = $validated;
            const RELATIONS: &'static [$crate::record::Relation] =
                &[$crate::record::Relation {
                    name: stringify!($rel),
                    link_table: $link,
                    local_column: $local,
                    remote_column: $remote,
                }];

            fn primary_key(&self) -> String {
                self.$field.to_string()
            }

            fn apply(
                &mut self,
                column: &str,
                value: $crate::value::Value,
            ) -> $crate::error::ModelResult<()> {
                if column == stringify!($rel) {
                    let keys = $crate::dispatch::tag(column, value.into_keys())?;
                    return self.set_relation_keys(column, keys);
                }
                let value =
                    $crate::dispatch::validated(Self::TABLE, Self::VALIDATED_COLUMNS, column, value)?;
                if column == stringify!($field) {
                    self.$field = $crate::dispatch::tag(column, value.$conv())?;
                    Ok(())
                } else {
                    Err($crate::error::ModelError::UnknownField {
                        entity: Self::TABLE,
                        field: column.to_string(),
                    })
                }
            }

            fn relation_keys(&self, name: &str) -> Option<&[String]> {
                (name == stringify!($rel)).then(|| self.$rel.as_slice())
            }

            fn set_relation_keys(
                &mut self,
                name: &str,
                keys: Vec<String>,
            ) -> $crate::error::ModelResult<()> {
                if name == stringify!($rel) {
                    self.$rel = keys;
                    Ok(())
                } else {
                    Err($crate::error::ModelError::UnknownField {
                        entity: Self::TABLE,
                        field: name.to_string(),
                    })
                }
            }
        }
    };
}

pub(crate) use value_leaf;

pub mod cert;
pub mod criteria;
pub mod filters;
pub mod org;
pub mod org_group;
pub mod principal;
pub mod source;

pub use cert::{CaCert, CaProfile, Cert};
pub use criteria::{
    CriteriaAsn, CriteriaCategory, CriteriaCc, CriteriaContainer, CriteriaIpNetwork, CriteriaName,
};
pub use filters::{
    EmailNotificationAddress, EmailNotificationTime, InsideFilterAsn, InsideFilterCc,
    InsideFilterFqdn, InsideFilterIpNetwork, InsideFilterUrl,
};
pub use org::{AccessZone, Org};
pub use org_group::OrgGroup;
pub use principal::{Component, SystemGroup, User};
pub use source::{SUBSOURCE_LINK_TABLES, Source, Subsource, SubsourceGroup};
