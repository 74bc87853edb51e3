//! Struct and pair inserts, plus struct-shaped result binding.

mod common;

use common::MockDriver;
use sqlbind::{Arg, Session, TableRow, Value};

#[derive(Debug, Default, PartialEq, TableRow)]
struct User {
    id: i64,
    name: String,
}

#[derive(Debug, Default, PartialEq, TableRow)]
struct Audit {
    created_by: String,
}

#[derive(Debug, Default, PartialEq, TableRow)]
struct Account {
    id: i64,
    #[col(rename = "account_name")]
    name: String,
    #[col(skip)]
    cached_balance: f64,
    #[col(flatten)]
    audit: Audit,
}

#[tokio::test]
async fn insert_struct_uses_mapped_columns() {
    let driver = MockDriver::new();
    let mut session = Session::new(&driver);
    session.use_table("users");

    session
        .insert(&User {
            id: 1,
            name: "a".into(),
        })
        .await
        .unwrap();

    let calls = driver.calls();
    assert_eq!(calls[0].0, "INSERT INTO users (id,name) VALUES (?,?)");
    assert_eq!(calls[0].1, vec![Value::Int(1), Value::Text("a".into())]);
}

#[tokio::test]
async fn insert_many_appends_one_row_group_per_struct() {
    let driver = MockDriver::new();
    let mut session = Session::new(&driver);
    session.use_table("users");

    let rows = vec![
        User {
            id: 1,
            name: "a".into(),
        },
        User {
            id: 2,
            name: "b".into(),
        },
    ];
    session.insert_many(&rows).await.unwrap();

    let calls = driver.calls();
    assert_eq!(calls[0].0, "INSERT INTO users (id,name) VALUES (?,?),(?,?)");
    assert_eq!(
        calls[0].1,
        vec![
            Value::Int(1),
            Value::Text("a".into()),
            Value::Int(2),
            Value::Text("b".into()),
        ]
    );
}

#[tokio::test]
async fn insert_many_with_empty_slice_is_a_no_op() {
    let driver = MockDriver::new();
    let mut session = Session::new(&driver);
    session.use_table("users");

    let n = session.insert_many::<User>(&[]).await.unwrap();
    assert_eq!(n, 0);
    assert_eq!(driver.call_count(), 0);
}

#[tokio::test]
async fn rename_skip_and_flatten_shape_the_column_list() {
    let driver = MockDriver::new();
    let mut session = Session::new(&driver);
    session.use_table("accounts");

    session
        .insert(&Account {
            id: 7,
            name: "ops".into(),
            cached_balance: 10.0,
            audit: Audit {
                created_by: "admin".into(),
            },
        })
        .await
        .unwrap();

    let calls = driver.calls();
    assert_eq!(
        calls[0].0,
        "INSERT INTO accounts (id,account_name,created_by) VALUES (?,?,?)"
    );
    assert_eq!(
        calls[0].1,
        vec![
            Value::Int(7),
            Value::Text("ops".into()),
            Value::Text("admin".into()),
        ]
    );
}

#[tokio::test]
async fn insert_pairs_all_batch_builds_multiple_rows() {
    let driver = MockDriver::new();
    let mut session = Session::new(&driver);
    session.use_table("users");

    session
        .insert_pairs(&[
            ("id", Arg::batch(vec![1i64, 2])),
            ("name", Arg::batch(vec!["a", "b"])),
        ])
        .await
        .unwrap();

    let calls = driver.calls();
    assert_eq!(calls[0].0, "INSERT INTO users (id,name) VALUES (?,?),(?,?)");
    // Row-major: row 0's columns first, then row 1's.
    assert_eq!(
        calls[0].1,
        vec![
            Value::Int(1),
            Value::Text("a".into()),
            Value::Int(2),
            Value::Text("b".into()),
        ]
    );
}

#[tokio::test]
async fn insert_pairs_mismatched_lengths_fail_before_execution() {
    let driver = MockDriver::new();
    let mut session = Session::new(&driver);
    session.use_table("users");

    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        poll_ready(session.insert_pairs(&[
            ("id", Arg::batch(vec![1i64, 2, 3])),
            ("name", Arg::batch(vec!["a", "b"])),
        ]))
    }));

    assert!(result.is_err());
    assert_eq!(driver.call_count(), 0);
}

#[tokio::test]
async fn insert_pairs_mixing_scalar_and_batch_fails_before_execution() {
    let driver = MockDriver::new();
    let mut session = Session::new(&driver);
    session.use_table("users");

    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        poll_ready(session.insert_pairs(&[
            ("id", Arg::batch(vec![1i64, 2])),
            ("name", Arg::scalar("a")),
        ]))
    }));

    assert!(result.is_err());
    assert_eq!(driver.call_count(), 0);
}

#[tokio::test]
async fn ret_row_rebuilds_the_struct() {
    let driver = MockDriver::new();
    driver.push_rows(vec![vec![Value::Int(1), Value::Text("a".into())]]);

    let mut session = Session::new(&driver);
    session.use_table("users");
    session.query("id = ?", vec![Arg::scalar(1i64)]);

    let mut user = User::default();
    session.ret_row(&mut user).await.unwrap();

    assert_eq!(
        user,
        User {
            id: 1,
            name: "a".into()
        }
    );
    assert_eq!(driver.calls()[0].0, "SELECT id,name FROM users WHERE id = ?");
}

#[tokio::test]
async fn ret_rows_appends_every_matched_row() {
    let driver = MockDriver::new();
    driver.push_rows(vec![
        vec![Value::Int(1), Value::Text("a".into())],
        vec![Value::Int(2), Value::Text("b".into())],
    ]);

    let mut session = Session::new(&driver);
    session.use_table("users");
    session.query("name <> ?", vec![Arg::scalar("z")]);

    let mut users: Vec<User> = Vec::new();
    session.ret_rows(&mut users).await.unwrap();

    assert_eq!(users.len(), 2);
    assert_eq!(users[1].name, "b");
}

#[tokio::test]
async fn ret_rows_batch_executes_once_per_element_in_order() {
    let driver = MockDriver::new();
    driver.push_rows(vec![
        vec![Value::Int(1), Value::Text("a".into())],
        vec![Value::Int(4), Value::Text("a2".into())],
    ]);
    driver.push_rows(vec![]);
    driver.push_rows(vec![vec![Value::Int(3), Value::Text("c".into())]]);

    let mut session = Session::new(&driver);
    session.use_table("users");
    session.query("id = ?", vec![Arg::batch(vec![1i64, 2, 3])]);

    let mut users: Vec<User> = Vec::new();
    session.ret_rows(&mut users).await.unwrap();

    // Every matched row of each execution is appended, in element order.
    assert_eq!(
        users.iter().map(|u| u.id).collect::<Vec<_>>(),
        vec![1, 4, 3]
    );
    let calls = driver.calls();
    assert_eq!(calls.len(), 3);
    assert_eq!(calls[0].1, vec![Value::Int(1)]);
    assert_eq!(calls[1].1, vec![Value::Int(2)]);
    assert_eq!(calls[2].1, vec![Value::Int(3)]);
}

#[tokio::test]
#[should_panic(expected = "`ret` target is not")]
async fn ret_row_with_batch_argument_is_a_usage_error() {
    let driver = MockDriver::new();
    let mut session = Session::new(&driver);
    session.use_table("users");
    session.query("id = ?", vec![Arg::batch(vec![1i64, 2])]);

    let mut user = User::default();
    let _ = session.ret_row(&mut user).await;
}

#[tokio::test]
async fn skipped_fields_come_back_as_default() {
    let driver = MockDriver::new();
    driver.push_rows(vec![vec![
        Value::Int(7),
        Value::Text("ops".into()),
        Value::Text("admin".into()),
    ]]);

    let mut session = Session::new(&driver);
    session.use_table("accounts");
    session.query("id = ?", vec![Arg::scalar(7i64)]);

    let mut account = Account::default();
    session.ret_row(&mut account).await.unwrap();

    assert_eq!(account.name, "ops");
    assert_eq!(account.cached_balance, 0.0);
    assert_eq!(account.audit.created_by, "admin");
}

// Poll a future once; the mock driver never yields, and validation panics
// fire before the first await point either way.
fn poll_ready<F: std::future::Future>(fut: F) -> F::Output {
    let mut fut = std::pin::pin!(fut);
    let mut cx = std::task::Context::from_waker(std::task::Waker::noop());
    match fut.as_mut().poll(&mut cx) {
        std::task::Poll::Ready(v) => v,
        std::task::Poll::Pending => unreachable!("mock driver resolves immediately"),
    }
}
