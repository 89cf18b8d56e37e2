mod common;

use common::{sign_in, BASE_URL};
use guidebook_core::db::open_db_in_memory;
use guidebook_core::{
    AuthUser, Filter, Gateway, GatewayError, PendingAttachment, Row, SelectQuery, SqliteGateway,
};
use serde_json::{json, Value};
use std::cell::RefCell;
use std::rc::Rc;

fn row(value: Value) -> Row {
    match value {
        Value::Object(map) => map,
        other => panic!("expected object, got {other}"),
    }
}

#[test]
fn insert_assigns_identity_and_select_filters_orders_limits() {
    let conn = open_db_in_memory().unwrap();
    let gateway = SqliteGateway::try_new(&conn, BASE_URL).unwrap();

    let first = gateway
        .insert("guides", row(json!({"name": "a", "category": "x", "created_at": 10})))
        .unwrap();
    gateway
        .insert("guides", row(json!({"name": "b", "category": "y", "created_at": 30})))
        .unwrap();
    gateway
        .insert("guides", row(json!({"name": "c", "category": "x", "created_at": 20})))
        .unwrap();
    gateway
        .insert("other", row(json!({"name": "elsewhere"})))
        .unwrap();

    assert!(first["id"].as_str().is_some_and(|id| !id.is_empty()));
    assert_eq!(first["created_at"], 10);

    let newest_x = gateway
        .select(
            "guides",
            &SelectQuery::all()
                .filter(Filter::eq("category", "x"))
                .order_by("created_at", false)
                .columns(&["name"]),
        )
        .unwrap();
    assert_eq!(newest_x, vec![row(json!({"name": "c"})), row(json!({"name": "a"}))]);

    let limited = gateway
        .select("guides", &SelectQuery::all().order_by("created_at", true).limit(2))
        .unwrap();
    let names: Vec<_> = limited.iter().map(|row| row["name"].clone()).collect();
    assert_eq!(names, vec![json!("a"), json!("c")]);
}

#[test]
fn update_merges_patch_and_keeps_identity() {
    let conn = open_db_in_memory().unwrap();
    let gateway = SqliteGateway::try_new(&conn, BASE_URL).unwrap();
    let inserted = gateway
        .insert("guides", row(json!({"name": "a", "view": 0})))
        .unwrap();
    let id = inserted["id"].as_str().unwrap().to_string();

    let changed = gateway
        .update(
            "guides",
            row(json!({"view": 3, "id": "hijack", "created_at": 1})),
            &[Filter::eq("id", id.as_str())],
        )
        .unwrap();
    assert_eq!(changed, 1);

    let stored = gateway
        .select("guides", &SelectQuery::all().filter(Filter::eq("id", id.as_str())))
        .unwrap();
    assert_eq!(stored[0]["view"], 3);
    assert_eq!(stored[0]["name"], "a");
    assert_eq!(stored[0]["id"], json!(id));
    assert_eq!(stored[0]["created_at"], inserted["created_at"]);

    assert_eq!(
        gateway
            .update("guides", row(json!({"view": 9})), &[Filter::eq("id", "missing")])
            .unwrap(),
        0
    );
}

#[test]
fn delete_removes_only_matching_rows() {
    let conn = open_db_in_memory().unwrap();
    let gateway = SqliteGateway::try_new(&conn, BASE_URL).unwrap();
    gateway.insert("guides", row(json!({"category": "x"}))).unwrap();
    gateway.insert("guides", row(json!({"category": "x"}))).unwrap();
    gateway.insert("guides", row(json!({"category": "y"}))).unwrap();

    assert_eq!(
        gateway.delete("guides", &[Filter::eq("category", "x")]).unwrap(),
        2
    );
    assert_eq!(gateway.select("guides", &SelectQuery::all()).unwrap().len(), 1);
}

#[test]
fn auth_listeners_see_every_session_change() {
    let conn = open_db_in_memory().unwrap();
    let gateway = SqliteGateway::try_new(&conn, BASE_URL).unwrap();
    let seen: Rc<RefCell<Vec<Option<String>>>> = Rc::default();
    let sink = Rc::clone(&seen);
    gateway.on_auth_change(move |user| {
        sink.borrow_mut().push(user.map(|user| user.id.clone()));
    });

    assert_eq!(gateway.current_user().unwrap(), None);
    sign_in(&gateway, "u1");
    assert_eq!(
        gateway.current_user().unwrap(),
        Some(AuthUser::new("u1", "u1@example.com"))
    );
    gateway.set_session(None);

    assert_eq!(*seen.borrow(), vec![Some("u1".to_string()), None]);
}

#[test]
fn listeners_registered_during_a_change_fire_on_the_next_one() {
    let conn: &'static _ = Box::leak(Box::new(open_db_in_memory().unwrap()));
    let gateway = Rc::new(SqliteGateway::try_new(conn, BASE_URL).unwrap());
    let seen: Rc<RefCell<Vec<Option<String>>>> = Rc::default();

    let outer = Rc::clone(&gateway);
    let sink = Rc::clone(&seen);
    gateway.on_auth_change(move |_| {
        let sink = Rc::clone(&sink);
        outer.on_auth_change(move |user| {
            sink.borrow_mut().push(user.map(|user| user.id.clone()));
        });
    });

    sign_in(&gateway, "u1");
    assert!(seen.borrow().is_empty());

    gateway.set_session(None);
    assert_eq!(*seen.borrow(), vec![None]);
}

#[test]
fn uploads_require_session_and_unique_paths() {
    let conn = open_db_in_memory().unwrap();
    let gateway = SqliteGateway::try_new(&conn, BASE_URL).unwrap();
    let attachment = PendingAttachment::new("a.png", "image/png", vec![7, 8]);

    assert!(matches!(
        gateway.upload("guide-images", "f/a.png", &attachment),
        Err(GatewayError::PermissionDenied(_))
    ));

    sign_in(&gateway, "u1");
    gateway.upload("guide-images", "f/a.png", &attachment).unwrap();
    assert!(matches!(
        gateway.upload("guide-images", "f/a.png", &attachment),
        Err(GatewayError::Storage(_))
    ));
    assert_eq!(
        gateway.object_bytes("guide-images", "f/a.png").unwrap(),
        Some(vec![7, 8])
    );
    assert_eq!(
        gateway.public_url("guide-images", "f/a.png"),
        format!("{BASE_URL}/storage/v1/object/public/guide-images/f/a.png")
    );
}
