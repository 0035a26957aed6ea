//! The SurrealDB-backed persistence context.
//!
//! [`SurrealSession`] implements `argus_core::DbSession`: writes are
//! buffered in memory and flushed in a single database transaction on
//! `commit`; reads always go straight to the database and never observe
//! staged-but-uncommitted changes.

use argus_core::{DbSession, ModelError, ModelResult, Relation, SUBSOURCE_LINK_TABLES};
use surrealdb::{Connection, Surreal};
use tracing::debug;

use crate::error::DbError;

fn surreal(e: surrealdb::Error) -> ModelError {
    DbError::Surreal(e).into()
}

struct StagedRow {
    table: &'static str,
    key: String,
    row: serde_json::Value,
}

struct StagedLink {
    table: &'static str,
    id: String,
    row: serde_json::Value,
}

struct ClearedLinks {
    table: &'static str,
    column: &'static str,
    key: String,
}

/// Association rows get a deterministic record id built from both key
/// columns, ordered by column name, so staging the same logical link
/// from either side of the relation upserts the same record.
fn link_id(relation: &Relation, local_key: &str, remote_key: &str) -> String {
    let mut pairs = [
        (relation.local_column, local_key),
        (relation.remote_column, remote_key),
    ];
    pairs.sort_by_key(|(column, _)| *column);
    format!(
        "{}={},{}={}",
        pairs[0].0, pairs[0].1, pairs[1].0, pairs[1].1
    )
}

/// A unit-of-work handle over one SurrealDB client.
///
/// Cheap to create; make one per logical transaction and drop it (or
/// call `rollback`) to discard staged changes.
pub struct SurrealSession<C: Connection> {
    db: Surreal<C>,
    rows: Vec<StagedRow>,
    links: Vec<StagedLink>,
    cleared: Vec<ClearedLinks>,
}

impl<C: Connection> SurrealSession<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self {
            db,
            rows: Vec::new(),
            links: Vec::new(),
            cleared: Vec::new(),
        }
    }

    fn is_clean(&self) -> bool {
        self.rows.is_empty() && self.links.is_empty() && self.cleared.is_empty()
    }

    /// Delete a subsource together with every association row that
    /// references it, in one transaction. Runs immediately, independent
    /// of the staged write buffer.
    pub async fn delete_subsource(&self, label: &str) -> ModelResult<()> {
        let mut sql = String::from("BEGIN TRANSACTION;\n");
        for (table, column) in SUBSOURCE_LINK_TABLES {
            sql.push_str(&format!("DELETE {table} WHERE {column} = $label;\n"));
        }
        sql.push_str("DELETE type::thing('subsource', $label);\n");
        sql.push_str("COMMIT TRANSACTION;");

        debug!(label, "deleting subsource with link-table cascade");
        self.db
            .query(sql)
            .bind(("label", label.to_string()))
            .await
            .map_err(surreal)?
            .check()
            .map_err(surreal)?;
        Ok(())
    }
}

impl<C: Connection> DbSession for SurrealSession<C> {
    fn stage_row(&mut self, table: &'static str, key: String, mut row: serde_json::Value) {
        // SCHEMAFULL option<> fields take NONE (an absent field), not
        // JSON null, so null entries are dropped before staging.
        if let Some(map) = row.as_object_mut() {
            map.retain(|_, value| !value.is_null());
        }
        debug!(table, key = %key, "staging row");
        self.rows.push(StagedRow { table, key, row });
    }

    fn stage_link(&mut self, relation: &'static Relation, local_key: String, remote_key: String) {
        let id = link_id(relation, &local_key, &remote_key);
        let row = serde_json::json!({
            relation.local_column: local_key,
            relation.remote_column: remote_key,
        });
        self.links.push(StagedLink {
            table: relation.link_table,
            id,
            row,
        });
    }

    fn clear_links(&mut self, relation: &'static Relation, local_key: String) {
        self.cleared.push(ClearedLinks {
            table: relation.link_table,
            column: relation.local_column,
            key: local_key,
        });
    }

    async fn rows_by(
        &self,
        table: &'static str,
        column: &'static str,
        value: serde_json::Value,
    ) -> ModelResult<Vec<serde_json::Value>> {
        let mut response = self
            .db
            .query(format!("SELECT * OMIT id FROM {table} WHERE {column} = $value"))
            .bind(("value", value))
            .await
            .map_err(surreal)?;
        response.take(0).map_err(surreal)
    }

    async fn rows_all(&self, table: &'static str) -> ModelResult<Vec<serde_json::Value>> {
        let mut response = self
            .db
            .query(format!("SELECT * OMIT id FROM {table}"))
            .await
            .map_err(surreal)?;
        response.take(0).map_err(surreal)
    }

    async fn link_targets(
        &self,
        relation: &'static Relation,
        local_key: &str,
    ) -> ModelResult<Vec<String>> {
        let mut response = self
            .db
            .query(format!(
                "SELECT VALUE {} FROM {} WHERE {} = $key",
                relation.remote_column, relation.link_table, relation.local_column,
            ))
            .bind(("key", local_key.to_string()))
            .await
            .map_err(surreal)?;
        let mut targets: Vec<String> = response.take(0).map_err(surreal)?;
        // Deterministic collection order for callers and tests.
        targets.sort();
        Ok(targets)
    }

    async fn commit(&mut self) -> ModelResult<()> {
        if self.is_clean() {
            return Ok(());
        }
        debug!(
            rows = self.rows.len(),
            links = self.links.len(),
            cleared = self.cleared.len(),
            "committing staged changes"
        );

        // Clears run first so that links re-staged in the same unit of
        // work replace, rather than accumulate next to, the old ones.
        let mut sql = String::from("BEGIN TRANSACTION;\n");
        for (i, clear) in self.cleared.iter().enumerate() {
            sql.push_str(&format!(
                "DELETE {} WHERE {} = $c{i};\n",
                clear.table, clear.column
            ));
        }
        for (i, row) in self.rows.iter().enumerate() {
            sql.push_str(&format!(
                "UPSERT type::thing('{}', $rk{i}) CONTENT $rv{i};\n",
                row.table
            ));
        }
        for (i, link) in self.links.iter().enumerate() {
            sql.push_str(&format!(
                "UPSERT type::thing('{}', $lk{i}) CONTENT $lv{i};\n",
                link.table
            ));
        }
        sql.push_str("COMMIT TRANSACTION;");

        let mut query = self.db.query(sql);
        for (i, clear) in self.cleared.iter().enumerate() {
            query = query.bind((format!("c{i}"), clear.key.clone()));
        }
        for (i, row) in self.rows.iter().enumerate() {
            query = query.bind((format!("rk{i}"), row.key.clone()));
            query = query.bind((format!("rv{i}"), row.row.clone()));
        }
        for (i, link) in self.links.iter().enumerate() {
            query = query.bind((format!("lk{i}"), link.id.clone()));
            query = query.bind((format!("lv{i}"), link.row.clone()));
        }

        query.await.map_err(surreal)?.check().map_err(surreal)?;

        self.rows.clear();
        self.links.clear();
        self.cleared.clear();
        Ok(())
    }

    fn rollback(&mut self) {
        debug!(
            rows = self.rows.len(),
            links = self.links.len(),
            cleared = self.cleared.len(),
            "discarding staged changes"
        );
        self.rows.clear();
        self.links.clear();
        self.cleared.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn relation() -> Relation {
        Relation {
            name: "subsources",
            link_table: "org_inside_subsource_link",
            local_column: "org_id",
            remote_column: "subsource_label",
        }
    }

    #[test]
    fn link_id_is_orientation_independent() {
        let forward = relation();
        let reverse = Relation {
            name: "orgs",
            link_table: "org_inside_subsource_link",
            local_column: "subsource_label",
            remote_column: "org_id",
        };
        assert_eq!(
            link_id(&forward, "cert.pl", "phishing events"),
            link_id(&reverse, "phishing events", "cert.pl"),
        );
    }
}
