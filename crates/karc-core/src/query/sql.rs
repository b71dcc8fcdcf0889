//! SQL assembly for list queries.
//!
//! Only whitelisted field expressions from a [`Listable`] impl are ever
//! interpolated. Caller text is always bound as a parameter.

use super::{Listable, ListParams};
use crate::services::ValidationError;

/// WHERE clause plus bound values, shared by the count and page queries.
pub(crate) struct Predicate {
    pub sql: String,
    pub values: Vec<Box<dyn rusqlite::ToSql>>,
}

impl Predicate {
    pub fn params(&self) -> Vec<&dyn rusqlite::ToSql> {
        self.values.iter().map(AsRef::as_ref).collect()
    }
}

/// Escape LIKE wildcards so user input matches literally.
pub(crate) fn escape_like(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    for ch in text.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

fn expected(fields: &[(&str, &str)]) -> String {
    fields
        .iter()
        .map(|(name, _)| *name)
        .collect::<Vec<_>>()
        .join(", ")
}

fn lookup<'a>(fields: &'a [(&'a str, &'a str)], name: &str) -> Option<&'a str> {
    fields
        .iter()
        .find(|(field, _)| *field == name)
        .map(|(_, expr)| *expr)
}

pub(crate) fn build_predicate<R: Listable>(params: &ListParams) -> Result<Predicate, ValidationError> {
    let mut sql = String::from(" WHERE 1=1");
    let mut values: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

    if let Some(base) = R::BASE_PREDICATE {
        sql.push_str(" AND (");
        sql.push_str(base);
        sql.push(')');
    }

    let search = params.search();
    if !search.is_empty() && !R::SEARCH_FIELDS.is_empty() {
        let pattern = format!("%{}%", escape_like(search));
        let clauses: Vec<String> = R::SEARCH_FIELDS
            .iter()
            .map(|expr| format!("lower({expr}) LIKE lower(?) ESCAPE '\\'"))
            .collect();
        sql.push_str(" AND (");
        sql.push_str(&clauses.join(" OR "));
        sql.push(')');
        for _ in R::SEARCH_FIELDS {
            values.push(Box::new(pattern.clone()));
        }
    }

    for (field, value) in params.filters() {
        let expr = lookup(R::FILTER_FIELDS, field).ok_or_else(|| ValidationError::UnknownField {
            kind: R::KIND,
            purpose: "filter",
            field: field.clone(),
            expected: expected(R::FILTER_FIELDS),
        })?;
        sql.push_str(" AND ");
        sql.push_str(expr);
        sql.push_str(" = ?");
        values.push(Box::new(value.clone()));
    }

    Ok(Predicate { sql, values })
}

pub(crate) fn build_order<R: Listable>(params: &ListParams) -> Result<String, ValidationError> {
    let sort = params.sort();
    let expr = lookup(R::SORT_FIELDS, &sort.field).ok_or_else(|| ValidationError::UnknownField {
        kind: R::KIND,
        purpose: "sort",
        field: sort.field.clone(),
        expected: expected(R::SORT_FIELDS),
    })?;
    Ok(format!(
        " ORDER BY {expr} {}, {}",
        sort.direction.as_sql(),
        R::TIEBREAK
    ))
}
