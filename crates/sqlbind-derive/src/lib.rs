//! Derive macro for sqlbind
//!
//! Provides the `#[derive(TableRow)]` macro.

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

mod table_row;

/// Derive the `TableRow` trait for a struct with named fields.
///
/// # Example
///
/// ```ignore
/// use sqlbind::TableRow;
///
/// #[derive(TableRow, Default)]
/// struct User {
///     id: i64,
///     #[col(rename = "user_name")]
///     name: String,
///     #[col(skip)]
///     cached_score: f64,
///     #[col(flatten)]
///     audit: Audit,
/// }
/// ```
///
/// # Attributes
///
/// - `#[col(rename = "name")]` - Map the field to a different column name
/// - `#[col(skip)]` - Leave the field out of the mapping (it must
///   implement `Default` for the bind direction)
/// - `#[col(flatten)]` - Splice a nested `TableRow` struct's columns in
///   at this position
#[proc_macro_derive(TableRow, attributes(col))]
pub fn derive_table_row(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    table_row::expand(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}
