//! Generic record interface and the persistence-context seam.
//!
//! Entities implement [`Record`]; all of them are created, fetched and
//! staged through the free functions below, which are polymorphic over the
//! entity type. Persistence itself is an external collaborator: every
//! operation takes a [`DbSession`] supplied by the caller, and nothing here
//! commits durably — commit/rollback boundaries belong to whoever owns the
//! session.

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{ModelError, ModelResult};
use crate::value::{FieldMap, Value};

/// Metadata for one many-to-many relationship role.
///
/// Several independent roles may exist between the same two entity types
/// (an org and a subsource are linked by six distinct zone/grant/exclude
/// roles), so each role names its own association table. The association
/// table's composite key is (`local_column`, `remote_column`).
#[derive(Debug)]
pub struct Relation {
    pub name: &'static str,
    pub link_table: &'static str,
    pub local_column: &'static str,
    pub remote_column: &'static str,
}

/// One persistable entity type.
///
/// `apply` is the single mutation path: it routes the assignment through
/// validation dispatch and stores the normalized value. Entity fields are
/// private, so validation cannot be bypassed from outside the crate.
pub trait Record: Sized + Default + Serialize + DeserializeOwned + Send + Sync {
    const TABLE: &'static str;
    const VALIDATED_COLUMNS: &'static [&'static str];
    const RELATIONS: &'static [Relation] = &[];

    /// The record's natural key; composite keys are joined with `/`.
    fn primary_key(&self) -> String;

    /// Assign one field, re-validating on every call.
    fn apply(&mut self, column: &str, value: Value) -> ModelResult<()>;

    /// The keys held by a named to-many relationship, if it exists.
    fn relation_keys(&self, name: &str) -> Option<&[String]>;

    fn set_relation_keys(&mut self, name: &str, keys: Vec<String>) -> ModelResult<()>;

    fn relation(name: &str) -> Option<&'static Relation> {
        Self::RELATIONS.iter().find(|r| r.name == name)
    }

    /// Construct from a loose field map.
    ///
    /// Construction-time normalization: a single key supplied for a
    /// to-many relationship field is wrapped into a one-element list,
    /// driven by the declared relation metadata.
    fn from_fields(fields: FieldMap) -> ModelResult<Self> {
        let mut record = Self::default();
        for (column, value) in fields {
            let value = match (Self::relation(&column), value) {
                (Some(_), Value::Str(key)) => Value::List(vec![key]),
                (_, value) => value,
            };
            record.apply(&column, value)?;
        }
        Ok(record)
    }

    fn to_row(&self) -> ModelResult<serde_json::Value> {
        serde_json::to_value(self).map_err(|e| ModelError::Database(e.to_string()))
    }

    fn from_row(row: serde_json::Value) -> ModelResult<Self> {
        serde_json::from_value(row).map_err(|e| ModelError::Database(e.to_string()))
    }
}

/// The persistence context.
///
/// An opaque, caller-supplied handle: writes are staged into it and only
/// become durable on `commit`; reads go to the underlying store and do not
/// observe staged-but-uncommitted changes. Transaction discipline
/// (isolation, referential integrity, cascades) is the implementor's
/// concern, not this crate's.
pub trait DbSession: Send {
    /// Stage an entity row for the next commit.
    fn stage_row(&mut self, table: &'static str, key: String, row: serde_json::Value);

    /// Stage one association row for the next commit.
    fn stage_link(&mut self, relation: &'static Relation, local_key: String, remote_key: String);

    /// Stage removal of every `relation` association row held by
    /// `local_key`, so that re-staging a record replaces its links.
    fn clear_links(&mut self, relation: &'static Relation, local_key: String);

    fn rows_by(
        &self,
        table: &'static str,
        column: &'static str,
        value: serde_json::Value,
    ) -> impl Future<Output = ModelResult<Vec<serde_json::Value>>> + Send;

    fn rows_all(
        &self,
        table: &'static str,
    ) -> impl Future<Output = ModelResult<Vec<serde_json::Value>>> + Send;

    /// Remote keys of the association rows held by `local_key`.
    fn link_targets(
        &self,
        relation: &'static Relation,
        local_key: &str,
    ) -> impl Future<Output = ModelResult<Vec<String>>> + Send;

    fn commit(&mut self) -> impl Future<Output = ModelResult<()>> + Send;

    fn rollback(&mut self);
}

/// Construct a validated record from `fields` and stage it with the
/// session. Fails before any staging if a validator rejects a field.
pub fn create_new<R: Record, S: DbSession>(ctx: &mut S, fields: FieldMap) -> ModelResult<R> {
    let record = R::from_fields(fields)?;
    attach_to_context(ctx, &record)?;
    Ok(record)
}

/// Stage an already-constructed record without re-running validation.
pub fn attach_to_context<R: Record, S: DbSession>(ctx: &mut S, record: &R) -> ModelResult<()> {
    let key = record.primary_key();
    ctx.stage_row(R::TABLE, key.clone(), record.to_row()?);
    for relation in R::RELATIONS {
        ctx.clear_links(relation, key.clone());
        if let Some(keys) = record.relation_keys(relation.name) {
            for remote in keys {
                ctx.stage_link(relation, key.clone(), remote.clone());
            }
        }
    }
    Ok(())
}

/// Fetch exactly one record whose `column` equals `value`.
///
/// Zero matches fail with `NotFound`, more than one with
/// `AmbiguousResult`; neither is ever silently coalesced.
pub async fn fetch_one_by<R: Record, S: DbSession>(
    ctx: &S,
    column: &'static str,
    value: impl Into<serde_json::Value>,
) -> ModelResult<R> {
    let value = value.into();
    let mut rows = ctx.rows_by(R::TABLE, column, value.clone()).await?;
    if rows.len() > 1 {
        return Err(ModelError::AmbiguousResult {
            entity: R::TABLE,
            column: column.to_string(),
            value: value.to_string(),
        });
    }
    match rows.pop() {
        Some(row) => load(ctx, row).await,
        None => Err(ModelError::NotFound {
            entity: R::TABLE,
            column: column.to_string(),
            value: value.to_string(),
        }),
    }
}

/// Fetch every record whose `column` equals `value` (non-unique lookup).
pub async fn fetch_by<R: Record, S: DbSession>(
    ctx: &S,
    column: &'static str,
    value: impl Into<serde_json::Value>,
) -> ModelResult<Vec<R>> {
    let rows = ctx.rows_by(R::TABLE, column, value.into()).await?;
    let mut records = Vec::with_capacity(rows.len());
    for row in rows {
        records.push(load(ctx, row).await?);
    }
    Ok(records)
}

/// Every persisted instance of `R`. No pagination, no filtering; meant for
/// small reference tables.
pub async fn fetch_all<R: Record, S: DbSession>(ctx: &S) -> ModelResult<Vec<R>> {
    let rows = ctx.rows_all(R::TABLE).await?;
    let mut records = Vec::with_capacity(rows.len());
    for row in rows {
        records.push(load(ctx, row).await?);
    }
    Ok(records)
}

/// Membership test against a named to-many relationship.
pub fn is_related_to<A: Record, B: Record>(
    record: &A,
    other: &B,
    relation_name: &str,
) -> ModelResult<bool> {
    let keys = record
        .relation_keys(relation_name)
        .ok_or_else(|| ModelError::UnknownField {
            entity: A::TABLE,
            field: relation_name.to_string(),
        })?;
    let key = other.primary_key();
    Ok(keys.contains(&key))
}

async fn load<R: Record, S: DbSession>(ctx: &S, row: serde_json::Value) -> ModelResult<R> {
    let mut record = R::from_row(row)?;
    let key = record.primary_key();
    for relation in R::RELATIONS {
        let keys = ctx.link_targets(relation, &key).await?;
        record.set_relation_keys(relation.name, keys)?;
    }
    Ok(record)
}
