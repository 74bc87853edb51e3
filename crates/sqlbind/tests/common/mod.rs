//! In-memory driver recording every statement, with canned responses.

#![allow(dead_code)]

use sqlbind::{DbError, DbResult, Row, SqlDriver, Value};
use std::collections::VecDeque;
use std::sync::Mutex;

#[derive(Default)]
pub struct MockDriver {
    calls: Mutex<Vec<(String, Vec<Value>)>>,
    responses: Mutex<VecDeque<Vec<Row>>>,
    errors: Mutex<VecDeque<DbError>>,
}

impl MockDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue one query response: a list of rows, each a list of values.
    pub fn push_rows(&self, rows: Vec<Vec<Value>>) {
        self.responses
            .lock()
            .unwrap()
            .push_back(rows.into_iter().map(Row::new).collect());
    }

    /// Queue a failure for the next execute/query call.
    pub fn push_error(&self, err: DbError) {
        self.errors.lock().unwrap().push_back(err);
    }

    pub fn calls(&self) -> Vec<(String, Vec<Value>)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    fn record(&self, sql: &str, params: &[Value]) -> DbResult<()> {
        self.calls
            .lock()
            .unwrap()
            .push((sql.to_string(), params.to_vec()));
        match self.errors.lock().unwrap().pop_front() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl SqlDriver for MockDriver {
    async fn execute(&self, sql: &str, params: &[Value]) -> DbResult<u64> {
        self.record(sql, params)?;
        Ok(1)
    }

    async fn query(&self, sql: &str, params: &[Value]) -> DbResult<Vec<Row>> {
        self.record(sql, params)?;
        Ok(self
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_default())
    }
}
