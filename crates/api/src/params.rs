//! Typed access to query and path parameters.
//!
//! A name is looked up in the query string first, then in the matched path
//! parameters. Every failure is a [`HttpError::bad_request`], so it surfaces
//! to the client as a 400 envelope.

use std::collections::HashMap;
use std::fmt::Display;

use axum::async_trait;
use axum::extract::rejection::PathRejection;
use axum::extract::{FromRequestParts, Path, Query};
use axum::http::request::Parts;
use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use uuid::Uuid;

use svckit_core::{HttpError, HttpResult, list};

use crate::errors::ApiError;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Query and path parameters of one request.
#[derive(Debug, Clone, Default)]
pub struct Params {
    query: HashMap<String, String>,
    path: HashMap<String, String>,
}

#[async_trait]
impl<S> FromRequestParts<S> for Params
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(pairs) = Query::<Vec<(String, String)>>::try_from_uri(&parts.uri)
            .map_err(|e| HttpError::bad_request(format!("invalid query string: {}", e.body_text())))?;

        let path = match Path::<HashMap<String, String>>::from_request_parts(parts, state).await {
            Ok(Path(p)) => p,
            // Routes without path parameters have nothing to contribute.
            Err(PathRejection::MissingPathParams(_)) => HashMap::new(),
            Err(e) => {
                return Err(HttpError::bad_request(format!(
                    "invalid path parameters: {}",
                    e.body_text()
                ))
                .into());
            }
        };

        Ok(Self::from_parts(pairs, path))
    }
}

impl Params {
    /// Build from raw query pairs and path parameters. For repeated query
    /// keys the first value wins.
    pub fn from_parts(
        query: impl IntoIterator<Item = (String, String)>,
        path: HashMap<String, String>,
    ) -> Self {
        let mut first = HashMap::new();
        for (key, value) in query {
            first.entry(key).or_insert(value);
        }
        Self { query: first, path }
    }

    fn lookup(&self, param: &str) -> HttpResult<&str> {
        match self.query.get(param).filter(|v| !v.is_empty()) {
            Some(v) => Ok(v.as_str()),
            None => self
                .path
                .get(param)
                .map(String::as_str)
                .ok_or_else(|| missing(param)),
        }
    }

    pub fn contains(&self, param: &str) -> bool {
        self.lookup(param).is_ok()
    }

    pub fn get_string(&self, param: &str) -> HttpResult<String> {
        self.lookup(param).map(str::to_string)
    }

    pub fn get_int(&self, param: &str) -> HttpResult<i32> {
        let raw = self.lookup(param)?;
        raw.parse()
            .map_err(|e| invalid(param, e, "an integer"))
    }

    /// Like [`Params::get_int`], but an absent parameter yields `default`.
    /// A present but malformed value is still an error.
    pub fn get_int_or_default(&self, param: &str, default: i32) -> HttpResult<i32> {
        if !self.contains(param) {
            return Ok(default);
        }
        self.get_int(param)
    }

    pub fn get_int64(&self, param: &str) -> HttpResult<i64> {
        let raw = self.lookup(param)?;
        raw.parse()
            .map_err(|e| invalid(param, e, "an int64"))
    }

    pub fn get_bool(&self, param: &str) -> HttpResult<bool> {
        let raw = self.lookup(param)?;
        parse_bool(raw).ok_or_else(|| invalid(param, format!("invalid syntax {raw:?}"), "a bool"))
    }

    pub fn get_uuid(&self, param: &str) -> HttpResult<Uuid> {
        let raw = self.lookup(param)?;
        Uuid::parse_str(raw).map_err(|e| invalid(param, e, "a UUID"))
    }

    /// Comma-separated list, kept as given.
    pub fn get_string_list(&self, param: &str) -> HttpResult<Vec<String>> {
        let raw = self.lookup(param)?;
        Ok(raw.split(',').map(str::to_string).collect())
    }

    /// Comma-separated UUIDs, duplicates dropped (first occurrence wins).
    pub fn get_uuid_list(&self, param: &str) -> HttpResult<Vec<Uuid>> {
        let raw = self.lookup(param)?;
        let ids = raw
            .split(',')
            .map(Uuid::parse_str)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| invalid(param, e, "a UUID list"))?;
        Ok(list::dedup(ids))
    }

    /// RFC 3339 timestamp.
    pub fn get_time(&self, param: &str) -> HttpResult<DateTime<FixedOffset>> {
        let raw = self.lookup(param)?;
        DateTime::parse_from_rfc3339(raw)
            .map_err(|e| invalid(param, e, "a valid RFC 3339 time"))
    }

    /// Calendar date, `YYYY-MM-DD`.
    pub fn get_date(&self, param: &str) -> HttpResult<NaiveDate> {
        let raw = self.lookup(param)?;
        NaiveDate::parse_from_str(raw, DATE_FORMAT)
            .map_err(|e| invalid(param, e, "a valid date (YYYY-MM-DD)"))
    }

    /// Seconds since the Unix epoch, as UTC.
    pub fn get_unix_time(&self, param: &str) -> HttpResult<DateTime<Utc>> {
        let seconds = self.get_int64(param)?;
        DateTime::from_timestamp(seconds, 0)
            .ok_or_else(|| invalid(param, "timestamp out of range", "a unix timestamp"))
    }
}

/// Accepts the same spellings as the usual "1/t/true" and "0/f/false" parsers.
fn parse_bool(raw: &str) -> Option<bool> {
    match raw {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Some(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Some(false),
        _ => None,
    }
}

fn missing(param: &str) -> HttpError {
    HttpError::bad_request(format!("missing {param} parameter"))
}

fn invalid(param: &str, err: impl Display, expected: &str) -> HttpError {
    HttpError::bad_request(format!("{param} must be {expected}: {err}"))
}
