//! Schema definitions and migration runner for SurrealDB.
//!
//! All table definitions use SCHEMAFULL mode for data integrity.
//! Record ids are the entities' natural keys. Timestamps are stored as
//! RFC 3339 strings and binary columns as base64 strings, matching the
//! serde representation of the `argus-core` entities; enums are stored
//! as strings with ASSERT constraints.

use surrealdb::{Connection, Surreal};
use tracing::info;

use crate::error::DbError;

// -----------------------------------------------------------------------
// Migration tracking
// -----------------------------------------------------------------------

const MIGRATION_TABLE_DDL: &str = "\
DEFINE TABLE IF NOT EXISTS _migration SCHEMAFULL;
DEFINE FIELD IF NOT EXISTS version ON TABLE _migration TYPE int;
DEFINE FIELD IF NOT EXISTS name ON TABLE _migration TYPE string;
DEFINE FIELD IF NOT EXISTS applied_at ON TABLE _migration TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX IF NOT EXISTS idx_migration_version ON TABLE _migration \
    COLUMNS version UNIQUE;
";

struct Migration {
    version: u32,
    name: &'static str,
    ddl: fn() -> String,
}

static MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "initial_schema",
    ddl: schema_v1,
}];

// -----------------------------------------------------------------------
// Schema v1 — entity tables
// -----------------------------------------------------------------------

const ENTITY_TABLES_V1: &str = "\
-- =======================================================================
-- Organizations
-- =======================================================================
DEFINE TABLE org SCHEMAFULL;
DEFINE FIELD org_id ON TABLE org TYPE string;
DEFINE FIELD actual_name ON TABLE org TYPE option<string>;
DEFINE FIELD full_access ON TABLE org TYPE bool DEFAULT false;
DEFINE FIELD verified ON TABLE org TYPE bool DEFAULT false;
DEFINE FIELD access_to_inside ON TABLE org TYPE bool DEFAULT false;
DEFINE FIELD inside_request_parameters ON TABLE org TYPE option<string>;
DEFINE FIELD access_to_search ON TABLE org TYPE bool DEFAULT false;
DEFINE FIELD search_request_parameters ON TABLE org TYPE option<string>;
DEFINE FIELD access_to_threats ON TABLE org TYPE bool DEFAULT false;
DEFINE FIELD threats_request_parameters ON TABLE org TYPE option<string>;
DEFINE FIELD stream_api_enabled ON TABLE org TYPE bool DEFAULT false;
DEFINE FIELD email_notifications_enabled ON TABLE org TYPE bool \
    DEFAULT false;
DEFINE FIELD email_notifications_language ON TABLE org \
    TYPE option<string>;
DEFINE FIELD email_notifications_business_days_only ON TABLE org \
    TYPE bool DEFAULT false;
DEFINE FIELD email_notifications_local_tz ON TABLE org TYPE bool \
    DEFAULT false;
DEFINE INDEX idx_org_id ON TABLE org COLUMNS org_id UNIQUE;

-- =======================================================================
-- Organization groups
-- =======================================================================
DEFINE TABLE org_group SCHEMAFULL;
DEFINE FIELD org_group_id ON TABLE org_group TYPE string;
DEFINE FIELD comment ON TABLE org_group TYPE option<string>;
DEFINE INDEX idx_org_group_id ON TABLE org_group \
    COLUMNS org_group_id UNIQUE;

-- =======================================================================
-- Principals
-- =======================================================================
DEFINE TABLE user SCHEMAFULL;
DEFINE FIELD login ON TABLE user TYPE string;
DEFINE FIELD password ON TABLE user TYPE option<string>;
DEFINE FIELD org_id ON TABLE user TYPE option<string>;
DEFINE FIELD name ON TABLE user TYPE option<string>;
DEFINE FIELD surname ON TABLE user TYPE option<string>;
DEFINE FIELD title ON TABLE user TYPE option<string>;
DEFINE FIELD phone ON TABLE user TYPE option<string>;
DEFINE FIELD contact_point ON TABLE user TYPE bool DEFAULT false;
DEFINE INDEX idx_user_login ON TABLE user COLUMNS login UNIQUE;
DEFINE INDEX idx_user_org ON TABLE user COLUMNS org_id;

DEFINE TABLE component SCHEMAFULL;
DEFINE FIELD login ON TABLE component TYPE string;
DEFINE FIELD password ON TABLE component TYPE option<string>;
DEFINE INDEX idx_component_login ON TABLE component \
    COLUMNS login UNIQUE;

DEFINE TABLE system_group SCHEMAFULL;
DEFINE FIELD name ON TABLE system_group TYPE string;
DEFINE INDEX idx_system_group_name ON TABLE system_group \
    COLUMNS name UNIQUE;

-- =======================================================================
-- Sources and subsources
-- =======================================================================
DEFINE TABLE source SCHEMAFULL;
DEFINE FIELD source_id ON TABLE source TYPE string;
DEFINE FIELD anonymized_source_id ON TABLE source TYPE string;
DEFINE FIELD dip_anonymization_enabled ON TABLE source TYPE bool \
    DEFAULT true;
DEFINE FIELD comment ON TABLE source TYPE option<string>;
DEFINE INDEX idx_source_id ON TABLE source COLUMNS source_id UNIQUE;

DEFINE TABLE subsource SCHEMAFULL;
DEFINE FIELD label ON TABLE subsource TYPE string;
DEFINE FIELD source_id ON TABLE subsource TYPE option<string>;
DEFINE FIELD comment ON TABLE subsource TYPE option<string>;
DEFINE INDEX idx_subsource_label ON TABLE subsource \
    COLUMNS label UNIQUE;
DEFINE INDEX idx_subsource_source ON TABLE subsource COLUMNS source_id;

DEFINE TABLE subsource_group SCHEMAFULL;
DEFINE FIELD label ON TABLE subsource_group TYPE string;
DEFINE FIELD comment ON TABLE subsource_group TYPE option<string>;
DEFINE INDEX idx_subsource_group_label ON TABLE subsource_group \
    COLUMNS label UNIQUE;

-- =======================================================================
-- Criteria containers and leaves
-- =======================================================================
DEFINE TABLE criteria_container SCHEMAFULL;
DEFINE FIELD label ON TABLE criteria_container TYPE string;
DEFINE INDEX idx_criteria_container_label ON TABLE criteria_container \
    COLUMNS label UNIQUE;

DEFINE TABLE criteria_asn SCHEMAFULL;
DEFINE FIELD asn ON TABLE criteria_asn TYPE int;
DEFINE INDEX idx_criteria_asn ON TABLE criteria_asn COLUMNS asn UNIQUE;

DEFINE TABLE criteria_cc SCHEMAFULL;
DEFINE FIELD cc ON TABLE criteria_cc TYPE string;
DEFINE INDEX idx_criteria_cc ON TABLE criteria_cc COLUMNS cc UNIQUE;

DEFINE TABLE criteria_ip_network SCHEMAFULL;
DEFINE FIELD ip_network ON TABLE criteria_ip_network TYPE string;
DEFINE INDEX idx_criteria_ip_network ON TABLE criteria_ip_network \
    COLUMNS ip_network UNIQUE;

DEFINE TABLE criteria_category SCHEMAFULL;
DEFINE FIELD category ON TABLE criteria_category TYPE string;
DEFINE INDEX idx_criteria_category ON TABLE criteria_category \
    COLUMNS category UNIQUE;

DEFINE TABLE criteria_name SCHEMAFULL;
DEFINE FIELD name ON TABLE criteria_name TYPE string;
DEFINE INDEX idx_criteria_name ON TABLE criteria_name \
    COLUMNS name UNIQUE;

-- =======================================================================
-- Inside-filter and notification leaves
-- =======================================================================
DEFINE TABLE inside_filter_asn SCHEMAFULL;
DEFINE FIELD asn ON TABLE inside_filter_asn TYPE int;
DEFINE INDEX idx_inside_filter_asn ON TABLE inside_filter_asn \
    COLUMNS asn UNIQUE;

DEFINE TABLE inside_filter_cc SCHEMAFULL;
DEFINE FIELD cc ON TABLE inside_filter_cc TYPE string;
DEFINE INDEX idx_inside_filter_cc ON TABLE inside_filter_cc \
    COLUMNS cc UNIQUE;

DEFINE TABLE inside_filter_fqdn SCHEMAFULL;
DEFINE FIELD fqdn ON TABLE inside_filter_fqdn TYPE string;
DEFINE INDEX idx_inside_filter_fqdn ON TABLE inside_filter_fqdn \
    COLUMNS fqdn UNIQUE;

DEFINE TABLE inside_filter_ip_network SCHEMAFULL;
DEFINE FIELD ip_network ON TABLE inside_filter_ip_network TYPE string;
DEFINE INDEX idx_inside_filter_ip_network \
    ON TABLE inside_filter_ip_network COLUMNS ip_network UNIQUE;

DEFINE TABLE inside_filter_url SCHEMAFULL;
DEFINE FIELD url ON TABLE inside_filter_url TYPE string;
DEFINE INDEX idx_inside_filter_url ON TABLE inside_filter_url \
    COLUMNS url UNIQUE;

DEFINE TABLE email_notification_address SCHEMAFULL;
DEFINE FIELD email ON TABLE email_notification_address TYPE string;
DEFINE INDEX idx_email_notification_address \
    ON TABLE email_notification_address COLUMNS email UNIQUE;

DEFINE TABLE email_notification_time SCHEMAFULL;
DEFINE FIELD notification_time ON TABLE email_notification_time \
    TYPE string;
DEFINE INDEX idx_email_notification_time \
    ON TABLE email_notification_time COLUMNS notification_time UNIQUE;

-- =======================================================================
-- Certificate authorities and certificates
-- =======================================================================
DEFINE TABLE ca_cert SCHEMAFULL;
DEFINE FIELD ca_label ON TABLE ca_cert TYPE string;
DEFINE FIELD parent_ca_label ON TABLE ca_cert TYPE option<string>;
DEFINE FIELD profile ON TABLE ca_cert TYPE option<string> \
    ASSERT $value == NONE OR $value IN ['client', 'service'];
DEFINE FIELD certificate ON TABLE ca_cert TYPE option<string>;
DEFINE FIELD ssl_config ON TABLE ca_cert TYPE option<string>;
DEFINE INDEX idx_ca_cert_label ON TABLE ca_cert COLUMNS ca_label UNIQUE;
DEFINE INDEX idx_ca_cert_parent ON TABLE ca_cert COLUMNS parent_ca_label;

DEFINE TABLE cert SCHEMAFULL;
DEFINE FIELD ca_cert_label ON TABLE cert TYPE string;
DEFINE FIELD serial_hex ON TABLE cert TYPE string;
DEFINE FIELD certificate ON TABLE cert TYPE string \
    ASSERT $value != '';
DEFINE FIELD csr ON TABLE cert TYPE option<string>;
DEFINE FIELD owner_login ON TABLE cert TYPE option<string>;
DEFINE FIELD owner_component_login ON TABLE cert TYPE option<string>;
DEFINE FIELD created_by_login ON TABLE cert TYPE option<string>;
DEFINE FIELD created_by_component_login ON TABLE cert \
    TYPE option<string>;
DEFINE FIELD creator_details ON TABLE cert TYPE option<string>;
DEFINE FIELD is_client_cert ON TABLE cert TYPE bool DEFAULT false;
DEFINE FIELD is_server_cert ON TABLE cert TYPE bool DEFAULT false;
DEFINE FIELD created_on ON TABLE cert TYPE option<string>;
DEFINE FIELD valid_from ON TABLE cert TYPE option<string>;
DEFINE FIELD expires_on ON TABLE cert TYPE option<string>;
DEFINE FIELD revoked_on ON TABLE cert TYPE option<string>;
DEFINE FIELD revoked_by_login ON TABLE cert TYPE option<string>;
DEFINE FIELD revoked_by_component_login ON TABLE cert \
    TYPE option<string>;
DEFINE FIELD revocation_comment ON TABLE cert TYPE option<string>;
DEFINE INDEX idx_cert_ca_serial ON TABLE cert \
    COLUMNS ca_cert_label, serial_hex UNIQUE;
DEFINE INDEX idx_cert_owner ON TABLE cert COLUMNS owner_login;
DEFINE INDEX idx_cert_owner_component ON TABLE cert \
    COLUMNS owner_component_login;
";

// -----------------------------------------------------------------------
// Schema v1 — association tables
// -----------------------------------------------------------------------

/// Every many-to-many association table with its two key columns. All
/// values are stored as strings (the referenced records' natural keys),
/// and the pair is unique per table.
pub const LINK_TABLES: &[(&str, &str, &str)] = &[
    // Org grants and exclusions, per access zone.
    ("org_inside_subsource_link", "org_id", "subsource_label"),
    ("org_inside_ex_subsource_link", "org_id", "subsource_label"),
    ("org_inside_subsource_group_link", "org_id", "subsource_group_label"),
    ("org_inside_ex_subsource_group_link", "org_id", "subsource_group_label"),
    ("org_search_subsource_link", "org_id", "subsource_label"),
    ("org_search_ex_subsource_link", "org_id", "subsource_label"),
    ("org_search_subsource_group_link", "org_id", "subsource_group_label"),
    ("org_search_ex_subsource_group_link", "org_id", "subsource_group_label"),
    ("org_threats_subsource_link", "org_id", "subsource_label"),
    ("org_threats_ex_subsource_link", "org_id", "subsource_label"),
    ("org_threats_subsource_group_link", "org_id", "subsource_group_label"),
    ("org_threats_ex_subsource_group_link", "org_id", "subsource_group_label"),
    // Org membership and inside filters.
    ("org_org_group_link", "org_id", "org_group_id"),
    ("org_asn_link", "org_id", "asn"),
    ("org_cc_link", "org_id", "cc"),
    ("org_fqdn_link", "org_id", "fqdn"),
    ("org_ip_network_link", "org_id", "ip_network"),
    ("org_url_link", "org_id", "url"),
    ("org_notification_email_link", "org_id", "email"),
    ("org_notification_time_link", "org_id", "notification_time"),
    // Org-group grants, per access zone.
    ("org_group_inside_subsource_link", "org_group_id", "subsource_label"),
    ("org_group_inside_subsource_group_link", "org_group_id", "subsource_group_label"),
    ("org_group_search_subsource_link", "org_group_id", "subsource_label"),
    ("org_group_search_subsource_group_link", "org_group_id", "subsource_group_label"),
    ("org_group_threats_subsource_link", "org_group_id", "subsource_label"),
    ("org_group_threats_subsource_group_link", "org_group_id", "subsource_group_label"),
    // Principals.
    ("user_system_group_link", "user_login", "system_group_name"),
    // Subsource composition.
    ("subsource_group_link", "subsource_label", "subsource_group_label"),
    ("subsource_inclusion_criteria_link", "subsource_label", "criteria_container_label"),
    ("subsource_exclusion_criteria_link", "subsource_label", "criteria_container_label"),
    // Criteria container contents.
    ("criteria_asn_link", "criteria_container_label", "asn"),
    ("criteria_cc_link", "criteria_container_label", "cc"),
    ("criteria_ip_network_link", "criteria_container_label", "ip_network"),
    ("criteria_category_link", "criteria_container_label", "category"),
    ("criteria_name_link", "criteria_container_label", "name"),
];

fn link_tables_ddl() -> String {
    let mut ddl = String::from(
        "-- =======================================================================\n\
         -- Association tables\n\
         -- =======================================================================\n",
    );
    for (table, left, right) in LINK_TABLES {
        ddl.push_str(&format!(
            "DEFINE TABLE {table} SCHEMAFULL;\n\
             DEFINE FIELD {left} ON TABLE {table} TYPE string;\n\
             DEFINE FIELD {right} ON TABLE {table} TYPE string;\n\
             DEFINE INDEX idx_{table} ON TABLE {table} \
             COLUMNS {left}, {right} UNIQUE;\n",
        ));
    }
    ddl
}

// -----------------------------------------------------------------------
// Public API
// -----------------------------------------------------------------------

/// Run all pending migrations against the given SurrealDB client.
///
/// Creates a `_migration` tracking table on first run, then applies
/// each migration whose version exceeds the current maximum.
/// All DEFINE statements are idempotent so re-running is safe.
pub async fn run_migrations<C: Connection>(db: &Surreal<C>) -> Result<(), DbError> {
    db.query(MIGRATION_TABLE_DDL)
        .await?
        .check()
        .map_err(|e| DbError::Migration(e.to_string()))?;

    let mut result = db.query("SELECT VALUE version FROM _migration").await?;
    let versions: Vec<u32> = result.take(0)?;
    let current_version = versions.into_iter().max().unwrap_or(0);

    for migration in MIGRATIONS {
        if migration.version > current_version {
            info!(
                version = migration.version,
                name = migration.name,
                "Applying migration"
            );
            db.query((migration.ddl)()).await?.check().map_err(|e| {
                DbError::Migration(format!(
                    "Migration v{} '{}' failed: {}",
                    migration.version, migration.name, e,
                ))
            })?;

            db.query("CREATE _migration SET version = $version, name = $name")
                .bind(("version", migration.version))
                .bind(("name", migration.name))
                .await?
                .check()
                .map_err(|e| {
                    DbError::Migration(format!(
                        "Failed to record migration v{}: {}",
                        migration.version, e,
                    ))
                })?;

            info!(
                version = migration.version,
                "Migration applied successfully"
            );
        }
    }

    Ok(())
}

/// Returns the full schema DDL for version 1 (entity tables plus the
/// generated association tables).
pub fn schema_v1() -> String {
    format!("{ENTITY_TABLES_V1}\n{}", link_tables_ddl())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_v1_defines_every_link_table() {
        let ddl = schema_v1();
        assert_eq!(LINK_TABLES.len(), 35);
        for (table, ..) in LINK_TABLES {
            assert!(
                ddl.contains(&format!("DEFINE TABLE {table} ")),
                "missing DDL for {table}"
            );
        }
    }

    #[test]
    fn subsource_cascade_tables_are_all_defined() {
        for (table, column) in argus_core::SUBSOURCE_LINK_TABLES {
            let known = LINK_TABLES
                .iter()
                .any(|(t, l, r)| t == table && (l == column || r == column));
            assert!(known, "{table}.{column} is not part of the schema");
        }
    }

    #[test]
    fn migrations_are_ordered() {
        for window in MIGRATIONS.windows(2) {
            assert!(
                window[0].version < window[1].version,
                "Migrations must be in ascending version order"
            );
        }
    }
}
