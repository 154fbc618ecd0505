mod support;

use std::sync::Arc;
use strata::{
    Column, Dialect, Error, Index, Mapper, Row, Scanner, TableDescriptor, Value, scan_rows,
};
use support::MemoryConn;

#[derive(Debug, Default, Clone, PartialEq)]
struct User {
    id: i64,
    name: String,
    age: i32,
    active: bool,
    // listed, but the table has no such column
    nickname: Option<String>,
    // not listed at all
    session: Vec<u8>,
}

strata::record!(User {
    id,
    name,
    age,
    active,
    nickname
});

/// A view of `user` without the key field.
#[derive(Debug, Default, Clone, PartialEq)]
struct Profile {
    name: String,
    age: i32,
}

strata::record!(Profile { name, age });

fn user_table() -> TableDescriptor {
    TableDescriptor::new("user")
        .with_key("id")
        .column("name", Column::string(45))
        .column("age", Column::int32())
        .column("active", Column::boolean())
        .index("name", Index::new("name"))
}

fn alice() -> User {
    User {
        id: 0,
        name: "alice".into(),
        age: 30,
        active: true,
        nickname: Some("al".into()),
        session: vec![1, 2, 3],
    }
}

async fn setup(dialect: Dialect) -> MemoryConn {
    let conn = MemoryConn::with_dialect(dialect);
    strata::registry::init(&conn).await.unwrap();
    strata::migrate(&conn, &user_table(), "app_", 1000)
        .await
        .unwrap();
    conn.clear_log();
    conn
}

#[tokio::test]
async fn test_insert_writes_back_generated_key() {
    let conn = setup(Dialect::MySql).await;
    let mapper = Mapper::new(&conn, "app_");

    let mut first = alice();
    let mut second = alice();
    assert_eq!(mapper.insert(&user_table(), &mut first).await.unwrap(), Some(1000));
    assert_eq!(mapper.insert(&user_table(), &mut second).await.unwrap(), Some(1001));

    assert_eq!(first.id, 1000);
    assert_eq!(second.id, 1001);
    assert_eq!(conn.row_count("app_user"), 2);
}

#[tokio::test]
async fn test_insert_ignores_unmatched_fields() {
    let conn = setup(Dialect::MySql).await;
    let mapper = Mapper::new(&conn, "app_");

    mapper.insert(&user_table(), &mut alice()).await.unwrap();

    assert_eq!(
        conn.executed(),
        vec!["INSERT INTO app_user(name,age,active) VALUES (?,?,?)"]
    );
}

#[tokio::test]
async fn test_insert_then_find_round_trip() {
    let conn = setup(Dialect::MySql).await;
    let mapper = Mapper::new(&conn, "app_");

    let mut user = alice();
    let id = mapper.insert(&user_table(), &mut user).await.unwrap().unwrap();

    let found: User = mapper.find_by_key(&user_table(), id).await.unwrap().unwrap();

    // Columns round trip; fields without a column come back as defaults.
    assert_eq!(
        found,
        User {
            nickname: None,
            session: Vec::new(),
            ..user
        }
    );

    let missing: Option<User> = mapper.find_by_key(&user_table(), 42).await.unwrap();
    assert!(missing.is_none());
}

#[tokio::test]
async fn test_update_by_key() {
    let conn = setup(Dialect::MySql).await;
    let mapper = Mapper::new(&conn, "app_");

    let mut user = alice();
    mapper.insert(&user_table(), &mut user).await.unwrap();

    user.name = "alicia".into();
    user.active = false;
    assert_eq!(mapper.update(&user_table(), &user).await.unwrap(), 1);

    let found: User = mapper
        .find_by_key(&user_table(), user.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.name, "alicia");
    assert!(!found.active);
}

#[tokio::test]
async fn test_update_without_key_field_matches_nothing() {
    let conn = setup(Dialect::MySql).await;
    let mapper = Mapper::new(&conn, "app_");
    mapper.insert(&user_table(), &mut alice()).await.unwrap();

    let profile = Profile {
        name: "mallory".into(),
        age: 99,
    };
    assert_eq!(mapper.update(&user_table(), &profile).await.unwrap(), 0);

    let users: Vec<User> = mapper.select_as(&user_table(), "", &[]).await.unwrap();
    assert_eq!(users[0].name, "alice");
}

#[tokio::test]
async fn test_update_requires_key_column() {
    let conn = setup(Dialect::MySql).await;
    let log = TableDescriptor::new("log").column("name", Column::text());
    strata::migrate(&conn, &log, "app_", 1).await.unwrap();

    let mapper = Mapper::new(&conn, "app_");
    let err = mapper.update(&log, &alice()).await.unwrap_err();
    assert!(matches!(err, Error::MissingKeyColumn(table) if table == "app_log"));

    // Inserting into a keyless table is fine and reports no key.
    let mut user = alice();
    assert_eq!(mapper.insert(&log, &mut user).await.unwrap(), None);
    assert_eq!(user.id, 0);
}

#[tokio::test]
async fn test_generated_key_must_fit_key_field() {
    #[derive(Debug, Default)]
    struct Small {
        id: i32,
        name: String,
    }
    strata::record!(Small { id, name });

    let conn = MemoryConn::new();
    strata::registry::init(&conn).await.unwrap();
    strata::migrate(&conn, &user_table(), "app_", 3_000_000_000)
        .await
        .unwrap();

    let mapper = Mapper::new(&conn, "app_");
    let mut small = Small {
        id: 0,
        name: "big".into(),
    };
    let err = mapper.insert(&user_table(), &mut small).await.unwrap_err();
    assert!(matches!(err, Error::Convert { field, .. } if field == "id"));
}

#[tokio::test]
async fn test_scanner_reuses_plan_across_rows() {
    let conn = setup(Dialect::MySql).await;
    let mapper = Mapper::new(&conn, "app_");

    for (name, age) in [("a", 1), ("b", 2), ("c", 3)] {
        let mut user = User {
            name: name.into(),
            age,
            ..Default::default()
        };
        mapper.insert(&user_table(), &mut user).await.unwrap();
    }

    let rows = mapper.select(&user_table(), "", &[]).await.unwrap();
    assert_eq!(rows.len(), 3);
    // SELECT * comes back in an order unrelated to the record's fields.
    assert_eq!(rows[0].columns()[0], "name");

    let mut user = User::default();
    let mut scanner = Scanner::new(&mut user);
    let mut seen = Vec::new();
    for row in &rows {
        scanner.scan(row).unwrap();
        let user = scanner.record();
        seen.push((user.id, user.name.clone(), user.age));
    }

    assert_eq!(
        seen,
        [
            (1000, "a".to_string(), 1),
            (1001, "b".to_string(), 2),
            (1002, "c".to_string(), 3),
        ]
    );

    let bound: Vec<_> = scanner.plan().unwrap().bound().map(|(_, name)| name).collect();
    assert_eq!(bound, ["name", "age", "active", "id"]);
}

#[tokio::test]
async fn test_select_with_clause() {
    let conn = setup(Dialect::MySql).await;
    let mapper = Mapper::new(&conn, "app_");
    mapper.insert(&user_table(), &mut alice()).await.unwrap();
    mapper
        .insert(
            &user_table(),
            &mut User {
                name: "bob".into(),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let found: Vec<User> = mapper
        .select_as(&user_table(), "WHERE name=?", &[Value::from("bob")])
        .await
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, 1001);
    assert_eq!(
        conn.queried().last().map(String::as_str),
        Some("SELECT * FROM app_user WHERE name=?")
    );
}

#[test]
fn test_scanner_rejects_changed_columns() {
    let first: Arc<[String]> = vec!["id".to_string(), "name".to_string()].into();
    let second: Arc<[String]> = vec!["name".to_string(), "id".to_string()].into();

    let mut user = User::default();
    let mut scanner = Scanner::new(&mut user);
    scanner
        .scan(&Row::new(first, vec![Value::I64(1), Value::from("a")]))
        .unwrap();

    let err = scanner
        .scan(&Row::new(second, vec![Value::from("b"), Value::I64(2)]))
        .unwrap_err();
    assert!(matches!(err, Error::ColumnsChanged { .. }));
    assert_eq!(scanner.record().id, 1);
}

#[test]
fn test_null_into_plain_field_is_an_error() {
    let columns: Arc<[String]> = vec!["name".to_string(), "nickname".to_string()].into();
    let rows = [Row::new(columns, vec![Value::Null, Value::Null])];

    let err = scan_rows::<User>(&rows).unwrap_err();
    assert!(matches!(err, Error::Convert { field, .. } if field == "name"));
}

#[test]
fn test_text_cells_convert() {
    let columns: Arc<[String]> = vec![
        "ID".to_string(),
        "Age".to_string(),
        "active".to_string(),
        "name".to_string(),
    ]
    .into();
    let rows = [Row::new(
        columns,
        vec![
            Value::from("7"),
            Value::from("41"),
            Value::from("1"),
            Value::from("x"),
        ],
    )];

    let users = scan_rows::<User>(&rows).unwrap();
    assert_eq!(users[0].id, 7);
    assert_eq!(users[0].age, 41);
    assert!(users[0].active);
}

#[tokio::test]
async fn test_postgres_insert_reads_returning() {
    let conn = setup(Dialect::Postgres).await;
    let mapper = Mapper::new(&conn, "app_");

    let mut user = alice();
    assert_eq!(mapper.insert(&user_table(), &mut user).await.unwrap(), Some(1000));
    assert_eq!(user.id, 1000);
    assert_eq!(
        conn.queried().last().map(String::as_str),
        Some("INSERT INTO app_user(name,age,active) VALUES ($1,$2,$3) RETURNING id")
    );

    user.age = 31;
    assert_eq!(mapper.update(&user_table(), &user).await.unwrap(), 1);
    assert_eq!(
        conn.executed().last().map(String::as_str),
        Some("UPDATE app_user SET name=$1, age=$2, active=$3 WHERE id=$4")
    );
}
