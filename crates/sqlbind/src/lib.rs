//! Struct-driven SQL mapping and execution.
//!
//! `sqlbind` maps Rust structs to column lists, synthesizes `INSERT` and
//! `SELECT` statements from conditions written as bare SQL expressions,
//! and binds results back into structs or individual variables. It also
//! verifies named API invocations against expected results, for use in
//! table-driven integration tests.
//!
//! # Quick start
//!
//! ```ignore
//! use sqlbind::{Arg, Outputs, Session, TableRow};
//!
//! #[derive(Debug, Default, TableRow)]
//! struct User {
//!     id: i64,
//!     name: String,
//! }
//!
//! let mut session = Session::new(client);
//! session.use_table("users");
//! session.insert(&User { id: 1, name: "a".into() }).await?;
//!
//! session.query("id = ?", vec![Arg::scalar(1i64)]);
//! let mut name = String::new();
//! session.ret_cols(Outputs::new().col("name", &mut name)).await?;
//! assert_eq!(name, "a");
//! ```
//!
//! Statements use `?` placeholders; the bundled Postgres driver rewrites
//! them to `$N` on execution. Caller mistakes (no table selected, two
//! sequence arguments, mixed `ret` targets) panic at the call site, while
//! runtime conditions (no rows, duplicates, driver failures) flow through
//! [`Session::on_err`].

pub mod api;
pub mod bind;
pub mod check;
pub mod driver;
pub mod error;
pub mod infer;
pub mod row;
pub mod schema;
pub mod session;
pub mod stmt;
pub mod value;

pub use api::{ApiFn, ApiSpec};
pub use bind::{ListSlot, Outputs, ScalarSlot};
pub use check::{CheckT, LogCheck};
pub use driver::{SqlDriver, bind_placeholders};
pub use error::{DbError, DbResult};
pub use infer::{expr_table, table_names};
pub use row::{Row, RowReader, TableRow};
pub use schema::SchemaCache;
pub use session::{Arg, Session};
pub use value::{FromValue, ToValue, Value};

#[cfg(feature = "derive")]
pub use sqlbind_derive::TableRow;
