//! Table-name inference from condition/expression text.
//!
//! A `ret` expression or query condition may reference columns as
//! `table.column`. When no explicit table is in effect, the target table is
//! inferred by a left-to-right lexical scan: qualifiers become candidate
//! table names, function-call heads (`SUM(...)`) are discarded, `AND`/`OR`
//! are never table names, and quoted string literals are skipped so
//! punctuation inside them is never misparsed. This is a scanner, not a SQL
//! parser; multi-table references are rejected outright.

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_part(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn ident_end(s: &str) -> usize {
    s.char_indices()
        .find(|(_, c)| !is_ident_part(*c))
        .map_or(s.len(), |(i, _)| i)
}

fn is_keyword(name: &str) -> bool {
    name.eq_ignore_ascii_case("AND") || name.eq_ignore_ascii_case("OR")
}

/// Skip a quoted string literal: the opening quote is already consumed,
/// backslash escapes the next character. An unterminated literal consumes
/// the rest of the input.
fn skip_string(s: &str, quote: char) -> &str {
    let mut escaped = false;
    for (i, c) in s.char_indices() {
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == quote {
            return &s[i + c.len_utf8()..];
        }
    }
    ""
}

fn add_table(tables: &mut Vec<String>, name: &str) {
    if !tables.iter().any(|t| t == name) {
        tables.push(name.to_string());
    }
}

/// Collect the distinct `table.` qualifiers referenced by `expr`, in
/// first-seen order.
pub fn table_names(expr: &str) -> Vec<String> {
    let mut tables = Vec::new();
    let mut rest = expr;
    while let Some(c) = rest.chars().next() {
        if is_ident_start(c) {
            let end = ident_end(rest);
            let name = &rest[..end];
            rest = &rest[end..];
            match rest.chars().next() {
                Some('.') => {
                    rest = &rest[1..];
                    rest = &rest[ident_end(rest)..];
                    if !is_keyword(name) {
                        add_table(&mut tables, name);
                    }
                }
                // Function call, eg. SUM(...): discard the head, keep
                // scanning the argument list.
                Some('(') => rest = &rest[1..],
                _ => {}
            }
        } else if c.is_ascii_digit()
            || (c == '.' && rest[1..].starts_with(|d: char| d.is_ascii_digit()))
        {
            // Numeric literal: consume the whole token so forms like
            // `1.5e3` or `.5` never contribute an identifier.
            let end = rest
                .char_indices()
                .find(|(_, c)| !is_ident_part(*c) && *c != '.')
                .map_or(rest.len(), |(i, _)| i);
            rest = &rest[end..];
        } else if c == '\'' || c == '"' {
            rest = skip_string(&rest[c.len_utf8()..], c);
        } else {
            rest = &rest[c.len_utf8()..];
        }
    }
    tables
}

/// Resolve the target table for an expression.
///
/// Zero referenced tables fall back to the session's current table; more
/// than one is a usage error (multi-table queries are unsupported) and
/// panics.
pub fn expr_table(expr: &str, default: Option<&str>) -> String {
    let tables = table_names(expr);
    match tables.len() {
        0 => default
            .unwrap_or_else(|| {
                panic!("no table referenced by {expr:?}; call `use_table` first")
            })
            .to_string(),
        1 => tables.into_iter().next().expect("len == 1"),
        _ => panic!("query does not support multiple tables: {tables:?} in {expr:?}"),
    }
}
