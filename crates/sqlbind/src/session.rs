//! The query/insert session and its state machine.
//!
//! A [`Session`] owns the table/query/api state for one logical unit of
//! work and serializes its own call sequence:
//!
//! ```text
//! use_table ──▶ insert / insert_many / insert_pairs   (execute immediately)
//!          └──▶ query ──▶ [limit] ──▶ ret_row / ret_rows / ret_cols
//! api ──▶ call ──▶ ret_call
//! ```
//!
//! Caller mistakes (no table selected, malformed argument shapes, two
//! sequence arguments, mixed scalar/list targets) panic at the call site.
//! Runtime conditions (no rows, constraint violations, driver failures)
//! pass through the error wrapper and then the registered handler; with no
//! handler they are fatal by design so unattended misuse fails loudly.

use crate::api::ApiSpec;
use crate::bind::{OutputKind, Outputs, Slot};
use crate::check::{CheckT, LogCheck};
use crate::driver::SqlDriver;
use crate::error::{DbError, DbResult};
use crate::row::TableRow;
use crate::schema::SchemaCache;
use crate::value::Value;
use crate::{infer, stmt};
use std::collections::HashMap;
use std::sync::Arc;

/// A query or insert argument: a single value, or the one sequence that
/// forms the call's batch dimension.
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    Scalar(Value),
    Batch(Vec<Value>),
}

impl Arg {
    pub fn scalar(v: impl Into<Value>) -> Self {
        Arg::Scalar(v.into())
    }

    pub fn batch<T: Into<Value>>(vs: impl IntoIterator<Item = T>) -> Self {
        Arg::Batch(vs.into_iter().map(Into::into).collect())
    }
}

/// Position of the single batch argument, if any. Two or more sequence
/// arguments make the batch cardinality ambiguous and panic before any
/// statement executes.
pub(crate) fn batch_index(args: &[Arg]) -> Option<usize> {
    let mut found = None;
    for (i, arg) in args.iter().enumerate() {
        if matches!(arg, Arg::Batch(_)) {
            if let Some(prev) = found {
                panic!(
                    "query: multiple arguments (#{}, #{}) are sequences (only one can be)",
                    prev + 1,
                    i + 1
                );
            }
            found = Some(i);
        }
    }
    found
}

const SEQ_RET_USAGE: &str = "one of `query` arguments is a sequence, but the `ret` target is not";

/// Flatten arguments that must all be scalars; `usage` is the panic
/// message naming the operation that forbids a batch dimension here.
fn scalar_args(args: &[Arg], usage: &'static str) -> Vec<Value> {
    args.iter()
        .map(|arg| match arg {
            Arg::Scalar(v) => v.clone(),
            Arg::Batch(_) => panic!("{usage}"),
        })
        .collect()
}

/// Argument list for one batch execution: position `i` replaced by `elem`,
/// everything else held fixed.
fn args_with(args: &[Arg], i: usize, elem: &Value) -> Vec<Value> {
    args.iter()
        .enumerate()
        .map(|(j, arg)| match arg {
            _ if j == i => elem.clone(),
            Arg::Scalar(v) => v.clone(),
            Arg::Batch(_) => unreachable!("only one batch argument can be present"),
        })
        .collect()
}

/// The condition/argument/limit state accumulated between `query` and its
/// consuming `ret`.
#[derive(Debug)]
struct PendingQuery {
    cond: String,
    args: Vec<Arg>,
    limit: i64,
}

type ErrHandler = Box<dyn FnMut(&DbError) + Send>;
type ErrWrapper = Box<dyn Fn(&'static str, DbError) -> DbError + Send + Sync>;

/// Stateful mapping/execution session bound to a driver.
pub struct Session<D> {
    driver: D,
    table: Option<String>,
    schemas: Arc<SchemaCache>,
    pending: Option<PendingQuery>,
    apis: HashMap<String, ApiSpec>,
    current_api: Option<String>,
    call_result: Option<Vec<Value>>,
    on_err: Option<ErrHandler>,
    wrap: Option<ErrWrapper>,
    check: Option<Box<dyn CheckT>>,
}

impl<D: SqlDriver> Session<D> {
    pub fn new(driver: D) -> Self {
        Self::with_schema_cache(driver, Arc::new(SchemaCache::new()))
    }

    /// Create a session sharing a schema cache with other sessions.
    pub fn with_schema_cache(driver: D, schemas: Arc<SchemaCache>) -> Self {
        Self {
            driver,
            table: None,
            schemas,
            pending: None,
            apis: HashMap::new(),
            current_api: None,
            call_result: None,
            on_err: None,
            wrap: None,
            check: None,
        }
    }

    // ==================== configuration ====================

    /// Set the default table used by following operations.
    pub fn use_table(&mut self, table: &str) {
        self.table = Some(table.to_string());
    }

    /// Install the data-error handler. Without one, data errors are fatal.
    pub fn on_err(&mut self, handler: impl FnMut(&DbError) + Send + 'static) {
        self.on_err = Some(Box::new(handler));
    }

    /// Install an error wrapper annotating every data error with its stage
    /// label before it reaches the handler. The default wrapper is
    /// [`DbError::stage`].
    pub fn wrap_errors(
        &mut self,
        wrap: impl Fn(&'static str, DbError) -> DbError + Send + Sync + 'static,
    ) {
        self.wrap = Some(Box::new(wrap));
    }

    /// Install the assertion context used by [`Session::ret_call`].
    pub fn with_check(&mut self, check: impl CheckT + 'static) {
        self.check = Some(Box::new(check));
    }

    fn table(&self) -> &str {
        self.table
            .as_deref()
            .unwrap_or_else(|| panic!("please call `use_table` to select the current table"))
    }

    fn wrap_err(&self, stage: &'static str, err: DbError) -> DbError {
        match &self.wrap {
            Some(w) => w(stage, err),
            None => err.stage(stage),
        }
    }

    /// Route a data error: wrapper first, then the handler; fatal when no
    /// handler is registered. Returns the wrapped error for the caller.
    fn handle_err(&mut self, stage: &'static str, err: DbError) -> DbError {
        let err = self.wrap_err(stage, err);
        match self.on_err.as_mut() {
            Some(handler) => {
                tracing::warn!(target: "sqlbind", error = %err, "data error");
                handler(&err);
            }
            None => panic!("{err}"),
        }
        err
    }

    // ==================== insert ====================

    /// Insert one row from a mapped struct.
    pub async fn insert<T: TableRow + 'static>(&mut self, row: &T) -> DbResult<u64> {
        let table = self.table().to_string();
        let cols = self.schemas.columns::<T>();
        let mut vals = Vec::with_capacity(cols.len());
        row.push_values(&mut vals);
        self.exec_insert(&table, cols.as_ref(), vals, 1).await
    }

    /// Insert one row per struct in the slice. An empty slice is a no-op.
    pub async fn insert_many<T: TableRow + 'static>(&mut self, rows: &[T]) -> DbResult<u64> {
        if rows.is_empty() {
            return Ok(0);
        }
        let table = self.table().to_string();
        let cols = self.schemas.columns::<T>();
        let mut vals = Vec::with_capacity(cols.len() * rows.len());
        for row in rows {
            row.push_values(&mut vals);
        }
        self.exec_insert(&table, cols.as_ref(), vals, rows.len())
            .await
    }

    /// Insert from explicit column/value pairs.
    ///
    /// All-scalar values insert one row; all-batch values insert one row
    /// per element, and every batch must share the same length. Mixing
    /// scalar and batch columns in one call is a usage error.
    pub async fn insert_pairs(&mut self, pairs: &[(&str, Arg)]) -> DbResult<u64> {
        if pairs.is_empty() {
            panic!("insert: nothing to insert");
        }
        let table = self.table().to_string();
        let columns: Vec<&str> = pairs.iter().map(|(c, _)| *c).collect();

        let mut batch_rows: Option<usize> = None;
        let mut saw_scalar = false;
        for (col, arg) in pairs {
            match arg {
                Arg::Scalar(_) => saw_scalar = true,
                Arg::Batch(vs) => match batch_rows {
                    None => batch_rows = Some(vs.len()),
                    Some(n) if n == vs.len() => {}
                    Some(n) => panic!(
                        "insert: unexpected sequence length for column {col}. got {}, expected {n}",
                        vs.len()
                    ),
                },
            }
        }

        let rows = match (saw_scalar, batch_rows) {
            (true, Some(_)) => panic!("insert: can't mix sequence and scalar values"),
            (false, Some(n)) => n,
            (_, None) => 1,
        };

        // Row-major flattening: all columns of row 0, then row 1, ...
        let mut vals = Vec::with_capacity(columns.len() * rows);
        for row in 0..rows {
            for (_, arg) in pairs {
                match arg {
                    Arg::Scalar(v) => vals.push(v.clone()),
                    Arg::Batch(vs) => vals.push(vs[row].clone()),
                }
            }
        }
        self.exec_insert(&table, &columns, vals, rows).await
    }

    async fn exec_insert(
        &mut self,
        table: &str,
        columns: &[&str],
        vals: Vec<Value>,
        rows: usize,
    ) -> DbResult<u64> {
        let sql = stmt::insert_sql(table, columns, rows);
        tracing::debug!(target: "sqlbind", sql = %sql, params = vals.len(), "insert");
        match self.driver.execute(&sql, &vals).await {
            Ok(n) => Ok(n),
            Err(err) => Err(self.handle_err("insert", err)),
        }
    }

    // ==================== query ====================

    /// Record a pending query; the database is not touched until `ret`.
    /// At most one argument may be a sequence (the batch dimension).
    pub fn query(&mut self, cond: &str, args: Vec<Arg>) {
        batch_index(&args);
        self.pending = Some(PendingQuery {
            cond: cond.to_string(),
            args,
            limit: 0,
        });
    }

    /// Cap the pending query's result rows.
    pub fn limit(&mut self, n: i64) {
        match self.pending.as_mut() {
            Some(q) => q.limit = n,
            None => panic!("please call `limit` after a `query` statement"),
        }
    }

    /// Row-count guard: fails with [`DbError::OutOfLimit`] when the rows
    /// matching `cond` number `n` or more. Used as a pre-insert
    /// uniqueness/capacity check.
    pub async fn limit_check(&mut self, n: i64, cond: &str, args: Vec<Arg>) -> DbResult<()> {
        let count = self.count(cond, args).await?;
        if count >= n {
            return Err(self.handle_err("limit", DbError::OutOfLimit));
        }
        Ok(())
    }

    /// `SELECT COUNT(*)` under the given condition.
    pub async fn count(&mut self, cond: &str, args: Vec<Arg>) -> DbResult<i64> {
        let table = self.table().to_string();
        let sql = stmt::count_sql(&table, cond);
        let vals = scalar_args(&args, "`count` arguments cannot be sequences");
        tracing::debug!(target: "sqlbind", sql = %sql, params = vals.len(), "count");
        let rows = match self.driver.query(&sql, &vals).await {
            Ok(rows) => rows,
            Err(err) => return Err(self.handle_err("query", err)),
        };
        let Some(row) = rows.into_iter().next() else {
            return Err(self.handle_err("query", DbError::NoRows));
        };
        match row.values().first().and_then(Value::as_i64) {
            Some(n) => Ok(n),
            None => Err(self.handle_err(
                "query",
                DbError::decode("count", "expected an integer COUNT(*) value"),
            )),
        }
    }

    fn take_pending(&mut self) -> PendingQuery {
        self.pending
            .take()
            .unwrap_or_else(|| panic!("please call `ret` after a `query` statement"))
    }

    /// The per-execution argument lists: one list per batch element, or a
    /// single list when no batch dimension is present.
    fn arg_sets(args: &[Arg]) -> Vec<Vec<Value>> {
        match batch_index(args) {
            Some(i) => {
                let Arg::Batch(elems) = &args[i] else {
                    unreachable!("batch_index points at a batch argument")
                };
                elems.iter().map(|e| args_with(args, i, e)).collect()
            }
            None => vec![scalar_args(args, SEQ_RET_USAGE)],
        }
    }

    // ==================== ret (bind results) ====================

    /// Bind exactly one matched row into a mapped struct. Zero rows
    /// surfaces [`DbError::NoRows`]; a batch argument is a usage error
    /// here since the target holds a single row.
    pub async fn ret_row<T: TableRow + 'static>(&mut self, out: &mut T) -> DbResult<()> {
        let q = self.take_pending();
        let table = self.table().to_string();
        let cols = self.schemas.columns::<T>();
        let sql = stmt::select_sql(&table, cols.as_ref(), &q.cond, q.limit);
        let vals = scalar_args(&q.args, SEQ_RET_USAGE);

        tracing::debug!(target: "sqlbind", sql = %sql, params = vals.len(), "query");
        let rows = match self.driver.query(&sql, &vals).await {
            Ok(rows) => rows,
            Err(err) => return Err(self.handle_err("query", err)),
        };
        let Some(row) = rows.into_iter().next() else {
            return Err(self.handle_err("ret", DbError::NoRows));
        };
        match T::from_row(&mut row.reader()) {
            Ok(v) => {
                *out = v;
                Ok(())
            }
            Err(err) => Err(self.handle_err("ret", err)),
        }
    }

    /// Append one mapped struct per matched row. With a batch argument the
    /// query executes once per element, in element order, appending each
    /// execution's rows.
    pub async fn ret_rows<T: TableRow + 'static>(&mut self, out: &mut Vec<T>) -> DbResult<()> {
        let q = self.take_pending();
        let table = self.table().to_string();
        let cols = self.schemas.columns::<T>();
        let sql = stmt::select_sql(&table, cols.as_ref(), &q.cond, q.limit);

        for vals in Self::arg_sets(&q.args) {
            tracing::debug!(target: "sqlbind", sql = %sql, params = vals.len(), "query");
            let rows = match self.driver.query(&sql, &vals).await {
                Ok(rows) => rows,
                Err(err) => return Err(self.handle_err("query", err)),
            };
            for row in rows {
                match T::from_row(&mut row.reader()) {
                    Ok(v) => out.push(v),
                    Err(err) => return Err(self.handle_err("ret", err)),
                }
            }
        }
        Ok(())
    }

    /// Bind expression/target pairs.
    ///
    /// Scalar targets expect exactly one matched row (zero rows surfaces
    /// [`DbError::NoRows`]); list targets accumulate one value per matched
    /// row and support the batch dimension. Every expression's inferred
    /// table must agree with the condition's table.
    pub async fn ret_cols(&mut self, outs: Outputs<'_>) -> DbResult<()> {
        let q = self.take_pending();
        let table = infer::expr_table(&q.cond, self.table.as_deref());

        let kind = outs.kind();
        let (exprs, mut slots) = outs.split();
        if exprs.is_empty() {
            panic!("usage: ret <expr1>, <target1>, <expr2>, <target2>, ...");
        }
        for expr in &exprs {
            let expr_table = infer::expr_table(expr, self.table.as_deref());
            if expr_table != table {
                panic!(
                    "query currently doesn't support multiple tables: `query` uses `{table}` but `ret` uses `{expr_table}`"
                );
            }
        }

        let expr_refs: Vec<&str> = exprs.iter().map(String::as_str).collect();
        let sql = stmt::select_sql(&table, &expr_refs, &q.cond, q.limit);

        match kind {
            OutputKind::Scalar => {
                let vals = scalar_args(&q.args, SEQ_RET_USAGE);
                tracing::debug!(target: "sqlbind", sql = %sql, params = vals.len(), "query");
                let rows = match self.driver.query(&sql, &vals).await {
                    Ok(rows) => rows,
                    Err(err) => return Err(self.handle_err("query", err)),
                };
                let Some(row) = rows.into_iter().next() else {
                    return Err(self.handle_err("ret", DbError::NoRows));
                };
                self.bind_row(&exprs, &mut slots, row.into_values())?;
                Ok(())
            }
            OutputKind::List => {
                for vals in Self::arg_sets(&q.args) {
                    tracing::debug!(target: "sqlbind", sql = %sql, params = vals.len(), "query");
                    let rows = match self.driver.query(&sql, &vals).await {
                        Ok(rows) => rows,
                        Err(err) => return Err(self.handle_err("query", err)),
                    };
                    for row in rows {
                        self.bind_row(&exprs, &mut slots, row.into_values())?;
                    }
                }
                Ok(())
            }
            OutputKind::Mixed | OutputKind::Empty => panic!(
                "all `ret` targets should be scalars or all should be sequences:\n\
                 \tret <expr1>, &<var1>, <expr2>, &<var2>, ...\n\
                 \tret <expr1>, &<varSlice1>, <expr2>, &<varSlice2>, ..."
            ),
        }
    }

    fn bind_row(
        &mut self,
        exprs: &[String],
        slots: &mut [Slot<'_>],
        values: Vec<Value>,
    ) -> DbResult<()> {
        if values.len() != slots.len() {
            let err = DbError::decode(
                exprs.join(","),
                format!("row has {} values, expected {}", values.len(), slots.len()),
            );
            return Err(self.handle_err("ret", err));
        }
        for ((expr, slot), value) in exprs.iter().zip(slots.iter_mut()).zip(values) {
            let bound = match slot {
                Slot::Scalar(s) => s.set(value),
                Slot::List(s) => s.push_value(value),
            };
            if let Err(err) = bound {
                let err = DbError::decode(expr.clone(), err.to_string());
                return Err(self.handle_err("ret", err));
            }
        }
        Ok(())
    }

    // ==================== api (invoke and verify) ====================

    /// Register an API and make it the current one.
    pub fn api(&mut self, spec: ApiSpec) {
        self.current_api = Some(spec.name().to_string());
        self.apis.insert(spec.name().to_string(), spec);
    }

    /// Re-select a previously registered API by name.
    pub fn select_api(&mut self, name: &str) {
        if !self.apis.contains_key(name) {
            panic!("api not found: {name}");
        }
        self.current_api = Some(name.to_string());
    }

    /// Invoke the current API, capturing its result tuple for the
    /// following [`Session::ret_call`].
    ///
    /// A failure (returned error or panic) is delivered to the error
    /// handler first; when the API declares a trailing error slot the
    /// failure is then suppressed into that slot, otherwise it is treated
    /// like any other data error (fatal without a handler).
    pub fn call(&mut self, args: &[Value]) {
        let name = self
            .current_api
            .clone()
            .unwrap_or_else(|| panic!("please call `call` after an `api` definition"));
        let spec = self.apis.get(&name).expect("selected api is registered").clone();

        let mut outcome = spec.invoke(args);
        if let Some(err) = outcome.error.take() {
            if spec.has_err_slot() {
                let err = self.wrap_err("call", err);
                tracing::debug!(target: "sqlbind", api = %name, error = %err, "call failed");
                if let Some(handler) = self.on_err.as_mut() {
                    handler(&err);
                }
                if let Some(slot) = outcome.result.last_mut() {
                    *slot = Value::Text(err.to_string());
                }
            } else {
                let _ = self.handle_err("call", err);
            }
        }
        self.call_result = Some(outcome.result);
    }

    /// Compare the captured call result against the expected values,
    /// failing the assertion context on arity or value mismatch. Consumes
    /// the captured result.
    pub fn ret_call(&mut self, expected: &[Value]) {
        let result = self
            .call_result
            .take()
            .unwrap_or_else(|| panic!("please call `ret` after a `call` statement"));
        let check = self.check.get_or_insert_with(|| Box::new(LogCheck));

        if result.len() != expected.len() {
            check.fatal(&format!(
                "call ret: unmatched result parameters count - got {}, expected {}",
                expected.len(),
                result.len()
            ));
            return;
        }
        for (i, (want, got)) in expected.iter().zip(&result).enumerate() {
            if !check.matches(want, got) {
                check.fatal(&format!(
                    "call ret: result #{i} mismatch - expected {want:?}, got {got:?}"
                ));
                return;
            }
        }
    }
}
