//! Builds the scoped, parameterized document listing query.
//!
//! Callers only ever see their own documents unless they name another owner
//! with `login`. The optional `key`/`value` pair narrows the result with an
//! equality predicate. `key` is resolved through a fixed allow-list, so the
//! only text spliced into the SQL is a known column identifier; every value
//! travels as a bound parameter.

use serde::Deserialize;
use sqlx::{QueryBuilder, Sqlite};

use crate::error::QueryError;

pub(crate) const SUMMARY_COLUMNS: &str =
    "id, name, mime, has_file, public, created, grant_login, owner";

/// Raw listing parameters as they arrive on the query string.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct ListParams {
    pub login: Option<String>,
    pub key: Option<String>,
    pub value: Option<String>,
    pub limit: Option<String>,
}

/// Columns a listing may be filtered on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterField {
    Id,
    Name,
    Mime,
    HasFile,
    Public,
}

impl FilterField {
    pub fn from_key(key: &str) -> Result<Self, QueryError> {
        match key {
            "id" => Ok(Self::Id),
            "name" => Ok(Self::Name),
            "mime" => Ok(Self::Mime),
            "file" | "has_file" => Ok(Self::HasFile),
            "public" => Ok(Self::Public),
            other => Err(QueryError::UnknownKey(other.to_string())),
        }
    }

    pub fn column(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Name => "name",
            Self::Mime => "mime",
            Self::HasFile => "has_file",
            Self::Public => "public",
        }
    }

    fn is_boolean(self) -> bool {
        matches!(self, Self::HasFile | Self::Public)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterValue {
    Text(String),
    Bool(bool),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentQuery {
    owner: String,
    filter: Option<(FilterField, FilterValue)>,
    limit: Option<i64>,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

impl DocumentQuery {
    /// Validates `params` on behalf of `caller`.
    pub fn for_caller(caller: &str, params: &ListParams) -> Result<Self, QueryError> {
        let owner = non_empty(&params.login).unwrap_or(caller).to_string();

        let filter = match (non_empty(&params.key), non_empty(&params.value)) {
            (Some(key), Some(value)) => {
                let field = FilterField::from_key(key)?;
                let value = if field.is_boolean() {
                    match value {
                        "true" => FilterValue::Bool(true),
                        "false" => FilterValue::Bool(false),
                        _ => {
                            return Err(QueryError::NotBoolean {
                                key: key.to_string(),
                                value: value.to_string(),
                            })
                        }
                    }
                } else {
                    FilterValue::Text(value.to_string())
                };
                Some((field, value))
            }
            _ => None,
        };

        let limit = match non_empty(&params.limit) {
            Some(raw) => match raw.parse::<i64>() {
                Ok(limit) if limit > 0 => Some(limit),
                _ => return Err(QueryError::InvalidLimit(raw.to_string())),
            },
            None => None,
        };

        Ok(Self {
            owner,
            filter,
            limit,
        })
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn filter(&self) -> Option<&(FilterField, FilterValue)> {
        self.filter.as_ref()
    }

    pub fn limit(&self) -> Option<i64> {
        self.limit
    }

    pub fn to_builder(&self) -> QueryBuilder<'static, Sqlite> {
        let mut qb = QueryBuilder::new("SELECT ");
        qb.push(SUMMARY_COLUMNS);
        qb.push(" FROM documents WHERE owner = ");
        qb.push_bind(self.owner.clone());

        if let Some((field, value)) = &self.filter {
            qb.push(" AND ");
            qb.push(field.column());
            qb.push(" = ");
            match value {
                FilterValue::Text(text) => qb.push_bind(text.clone()),
                FilterValue::Bool(flag) => qb.push_bind(*flag),
            };
        }

        // rowid breaks ties between inserts within the same microsecond.
        qb.push(" ORDER BY name, created, rowid");

        if let Some(limit) = self.limit {
            qb.push(" LIMIT ");
            qb.push_bind(limit);
        }
        qb
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> ListParams {
        let mut params = ListParams::default();
        for (k, v) in pairs {
            let v = Some(v.to_string());
            match *k {
                "login" => params.login = v,
                "key" => params.key = v,
                "value" => params.value = v,
                "limit" => params.limit = v,
                _ => unreachable!(),
            }
        }
        params
    }

    #[test]
    fn defaults_to_caller_scope() {
        let q = DocumentQuery::for_caller("alice12345", &ListParams::default()).unwrap();
        assert_eq!(q.owner(), "alice12345");
        assert_eq!(
            q.to_builder().sql(),
            "SELECT id, name, mime, has_file, public, created, grant_login, owner \
             FROM documents WHERE owner = ? ORDER BY name, created, rowid"
        );
    }

    #[test]
    fn login_overrides_scope() {
        let q = DocumentQuery::for_caller("alice12345", &params(&[("login", "bobby12345")]))
            .unwrap();
        assert_eq!(q.owner(), "bobby12345");
    }

    #[test]
    fn empty_params_are_ignored() {
        let q = DocumentQuery::for_caller(
            "alice12345",
            &params(&[("login", ""), ("key", "name"), ("value", ""), ("limit", "")]),
        )
        .unwrap();
        assert_eq!(q.owner(), "alice12345");
        assert!(q.filter().is_none());
        assert!(q.limit().is_none());
    }

    #[test]
    fn filter_and_limit_are_bound() {
        let q = DocumentQuery::for_caller(
            "alice12345",
            &params(&[("key", "mime"), ("value", "text/plain"), ("limit", "5")]),
        )
        .unwrap();
        assert_eq!(
            q.filter(),
            Some(&(FilterField::Mime, FilterValue::Text("text/plain".into())))
        );
        assert_eq!(q.limit(), Some(5));
        let sql = q.to_builder().sql().to_string();
        assert!(sql.ends_with("WHERE owner = ? AND mime = ? ORDER BY name, created, rowid LIMIT ?"));
        assert!(!sql.contains("text/plain"));
    }

    #[test]
    fn boolean_filters_parse() {
        let q = DocumentQuery::for_caller(
            "alice12345",
            &params(&[("key", "file"), ("value", "true")]),
        )
        .unwrap();
        assert_eq!(q.filter(), Some(&(FilterField::HasFile, FilterValue::Bool(true))));
        assert!(q.to_builder().sql().contains("AND has_file = ?"));

        let err = DocumentQuery::for_caller(
            "alice12345",
            &params(&[("key", "public"), ("value", "yes")]),
        )
        .unwrap_err();
        assert!(matches!(err, QueryError::NotBoolean { .. }));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        for key in ["owner", "file; DROP TABLE documents", "grant_login", "1=1 OR name"] {
            let err = DocumentQuery::for_caller(
                "alice12345",
                &params(&[("key", key), ("value", "x")]),
            )
            .unwrap_err();
            assert_eq!(err, QueryError::UnknownKey(key.to_string()));
        }
    }

    #[test]
    fn limit_must_be_positive_integer() {
        for bad in ["0", "-1", "abc", "1.5", " 3"] {
            let err = DocumentQuery::for_caller("alice12345", &params(&[("limit", bad)]))
                .unwrap_err();
            assert_eq!(err, QueryError::InvalidLimit(bad.to_string()));
        }
    }
}
