//! Integration tests for the CA hierarchy and certificate lifecycle
//! using in-memory SurrealDB.

use argus_core::{
    CaCert, CaProfile, Cert, Component, DbSession, FieldMap, ModelError, Record, User, Value,
    attach_to_context, create_new, fetch_by, fetch_one_by,
};
use argus_db::{SurrealSession, run_migrations};
use chrono::{TimeZone, Utc};
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};

async fn session() -> SurrealSession<Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    run_migrations(&db).await.unwrap();
    SurrealSession::new(db)
}

fn fields<const N: usize>(entries: [(&str, Value); N]) -> FieldMap {
    entries
        .into_iter()
        .map(|(column, value)| (column.to_string(), value))
        .collect()
}

async fn seed_ca(ctx: &mut SurrealSession<Db>, label: &str, parent: Option<&str>) -> CaCert {
    let mut ca_fields = fields([("ca_label", Value::from(label))]);
    if let Some(parent) = parent {
        ca_fields.insert("parent_ca_label".into(), Value::from(parent));
    }
    let ca: CaCert = create_new(ctx, ca_fields).unwrap();
    ctx.commit().await.unwrap();
    ca
}

#[tokio::test]
async fn reparenting_moves_a_ca_between_roots() {
    let mut ctx = session().await;

    seed_ca(&mut ctx, "root-a", None).await;
    seed_ca(&mut ctx, "root-b", None).await;
    let mut child = seed_ca(&mut ctx, "client-ca", Some("root-a")).await;

    child.reparent(&ctx, Some("root-b")).await.unwrap();
    attach_to_context(&mut ctx, &child).unwrap();
    ctx.commit().await.unwrap();

    let root_a: CaCert = fetch_one_by(&ctx, "ca_label", "root-a").await.unwrap();
    assert!(root_a.children_ca(&ctx).await.unwrap().is_empty());

    let root_b: CaCert = fetch_one_by(&ctx, "ca_label", "root-b").await.unwrap();
    let children = root_b.children_ca(&ctx).await.unwrap();
    assert_eq!(children.len(), 1);
    assert_eq!(children[0].ca_label(), "client-ca");
}

#[tokio::test]
async fn reparenting_onto_a_descendant_is_rejected() {
    let mut ctx = session().await;

    let mut root = seed_ca(&mut ctx, "root", None).await;
    seed_ca(&mut ctx, "mid", Some("root")).await;
    seed_ca(&mut ctx, "leaf", Some("mid")).await;

    let err = root.reparent(&ctx, Some("leaf")).await.unwrap_err();
    assert_eq!(err.invalid_field(), Some("parent_ca_label"));
    assert_eq!(root.parent_ca_label(), None);

    // Reparenting onto itself is the degenerate cycle.
    let err = root.reparent(&ctx, Some("root")).await.unwrap_err();
    assert_eq!(err.invalid_field(), Some("parent_ca_label"));
}

#[tokio::test]
async fn serial_numbers_are_scoped_per_ca() {
    let mut ctx = session().await;

    seed_ca(&mut ctx, "client-ca", None).await;
    seed_ca(&mut ctx, "service-ca", None).await;
    for ca in ["client-ca", "service-ca"] {
        let _: Cert = create_new(
            &mut ctx,
            fields([
                ("ca_cert_label", Value::from(ca)),
                ("serial_hex", Value::from("00ABCDEF")),
                ("certificate", Value::from(b"pem bytes".to_vec())),
            ]),
        )
        .unwrap();
    }
    ctx.commit().await.unwrap();

    // The same serial under two CAs is two distinct certificates.
    let same_serial: Vec<Cert> = fetch_by(&ctx, "serial_hex", "00abcdef").await.unwrap();
    assert_eq!(same_serial.len(), 2);

    let ambiguous = fetch_one_by::<Cert, _>(&ctx, "serial_hex", "00abcdef").await;
    assert!(matches!(ambiguous, Err(ModelError::AmbiguousResult { .. })));

    let under_one: Vec<Cert> = fetch_by(&ctx, "ca_cert_label", "client-ca").await.unwrap();
    assert_eq!(under_one.len(), 1);
    assert_eq!(under_one[0].serial_hex(), "00abcdef");
}

#[tokio::test]
async fn a_cert_without_a_body_is_rejected_at_commit() {
    let mut ctx = session().await;

    seed_ca(&mut ctx, "client-ca", None).await;
    let _: Cert = create_new(
        &mut ctx,
        fields([
            ("ca_cert_label", Value::from("client-ca")),
            ("serial_hex", Value::from("3c")),
        ]),
    )
    .unwrap();
    assert!(ctx.commit().await.is_err());

    ctx.rollback();
    let gone = fetch_one_by::<Cert, _>(&ctx, "serial_hex", "3c").await;
    assert!(matches!(gone, Err(ModelError::NotFound { .. })));
}

#[tokio::test]
async fn revocation_fields_persist_and_derive_is_revoked() {
    let mut ctx = session().await;

    seed_ca(&mut ctx, "client-ca", None).await;
    let _: Cert = create_new(
        &mut ctx,
        fields([
            ("ca_cert_label", Value::from("client-ca")),
            ("serial_hex", Value::from("0a")),
            ("certificate", Value::from(b"pem bytes".to_vec())),
            (
                "valid_from",
                Value::Time(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()),
            ),
            (
                "expires_on",
                Value::Time(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()),
            ),
        ]),
    )
    .unwrap();
    ctx.commit().await.unwrap();

    let mut cert: Cert = fetch_one_by(&ctx, "serial_hex", "0a").await.unwrap();
    assert!(!cert.is_revoked());
    assert_eq!(
        cert.valid_from(),
        Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
    );

    cert.apply("revoked_by_login", Value::from("admin@example.org"))
        .unwrap();
    cert.apply("revocation_comment", Value::from("key compromised"))
        .unwrap();
    attach_to_context(&mut ctx, &cert).unwrap();
    ctx.commit().await.unwrap();

    let reloaded: Cert = fetch_one_by(&ctx, "serial_hex", "0a").await.unwrap();
    assert!(reloaded.is_revoked());
    assert_eq!(reloaded.revoked_by_login(), Some("admin@example.org"));
    assert_eq!(reloaded.revoked_on(), None);
}

#[tokio::test]
async fn ca_profile_accessor_delegates_to_the_issuer() {
    let mut ctx = session().await;

    let _: CaCert = create_new(
        &mut ctx,
        fields([
            ("ca_label", Value::from("service-ca")),
            ("profile", Value::from("service")),
            ("certificate", Value::from(b"pem bytes".to_vec())),
        ]),
    )
    .unwrap();
    let _: Cert = create_new(
        &mut ctx,
        fields([
            ("ca_cert_label", Value::from("service-ca")),
            ("serial_hex", Value::from("1f")),
            ("certificate", Value::from(b"issued pem".to_vec())),
        ]),
    )
    .unwrap();
    ctx.commit().await.unwrap();

    let ca: CaCert = fetch_one_by(&ctx, "ca_label", "service-ca").await.unwrap();
    assert_eq!(ca.profile(), Some(CaProfile::Service));
    assert_eq!(ca.certificate(), Some(b"pem bytes".as_slice()));

    let cert: Cert = fetch_one_by(&ctx, "serial_hex", "1f").await.unwrap();
    assert_eq!(cert.ca_profile(&ctx).await.unwrap(), Some(CaProfile::Service));
}

#[tokio::test]
async fn creator_roles_take_either_kind_of_principal() {
    let mut ctx = session().await;

    let user: User = create_new(
        &mut ctx,
        fields([("login", Value::from("operator@example.org"))]),
    )
    .unwrap();
    let component: Component = create_new(
        &mut ctx,
        fields([("login", Value::from("cert-manager"))]),
    )
    .unwrap();
    seed_ca(&mut ctx, "client-ca", None).await;

    // Created by a human, owned by a machine account.
    let _: Cert = create_new(
        &mut ctx,
        fields([
            ("ca_cert_label", Value::from("client-ca")),
            ("serial_hex", Value::from("2b")),
            ("certificate", Value::from(b"pem bytes".to_vec())),
            ("created_by_login", Value::from("operator@example.org")),
            ("owner_component_login", Value::from("cert-manager")),
            (
                "creator_details",
                Value::Json(serde_json::json!({"request": "ticket-1841"})),
            ),
        ]),
    )
    .unwrap();
    ctx.commit().await.unwrap();

    let created = user.created_certs(&ctx).await.unwrap();
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].owner_component_login(), Some("cert-manager"));
    assert!(user.certs(&ctx).await.unwrap().is_empty());

    let owned = component.certs(&ctx).await.unwrap();
    assert_eq!(owned.len(), 1);
    let details: serde_json::Value =
        serde_json::from_slice(owned[0].creator_details().unwrap()).unwrap();
    assert_eq!(details["request"], "ticket-1841");
}
