//! Supabase (PostgREST) storage backend.
//!
//! Talks to the hosted database over its REST interface using the
//! administrative key. Calls are blocking; async callers must run them on a
//! blocking thread.

use std::time::Duration;

use chrono::NaiveDate;
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::config::DatabaseConfig;
use crate::grid::{DailyGrid, GridDistribution};
use crate::relic::Relic;
use crate::report::EconomicReport;
use crate::storage::traits::{GridStore, InsertOutcome, RelicStore, ReportStore, StorageError};

const REPORTS_TABLE: &str = "daily_economic_reports";
const RELICS_TABLE: &str = "relics";
const GRIDS_TABLE: &str = "daily_grids";

/// Postgres SQLSTATE for unique_violation.
const UNIQUE_VIOLATION: &str = "23505";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Error payload returned by PostgREST.
#[derive(Debug, Default, Deserialize)]
struct PostgrestErrorBody {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// PostgREST client bound to one project.
#[derive(Debug, Clone)]
pub struct PostgrestStore {
    http: Client,
    rest_url: String,
    key: String,
}

fn transport_err(e: &reqwest::Error) -> StorageError {
    if e.is_connect() || e.is_timeout() {
        StorageError::ConnectionError(e.to_string())
    } else if e.is_decode() {
        StorageError::SerializationError(e.to_string())
    } else {
        StorageError::BackendError(e.to_string())
    }
}

/// A 409 also covers foreign-key and exclusion violations; trust the
/// SQLSTATE when PostgREST sends one.
fn is_unique_violation(status: StatusCode, body: &PostgrestErrorBody) -> bool {
    match body.code.as_deref() {
        Some(code) => code == UNIQUE_VIOLATION,
        None => status == StatusCode::CONFLICT,
    }
}

/// Insert payload for `daily_grids`; the database assigns `id`.
#[derive(Debug, Serialize)]
struct GridRow<'a> {
    grid_date: NaiveDate,
    mystery_image_theme: &'a str,
    mystery_image_url: &'a str,
    grid_distribution: &'a GridDistribution,
}

impl<'a> From<&'a DailyGrid> for GridRow<'a> {
    fn from(grid: &'a DailyGrid) -> Self {
        Self {
            grid_date: grid.grid_date,
            mystery_image_theme: &grid.mystery_image_theme,
            mystery_image_url: &grid.mystery_image_url,
            grid_distribution: &grid.grid_distribution,
        }
    }
}

/// Outcome of a write as PostgREST reports it.
enum WriteStatus {
    Written,
    UniqueViolation,
}

impl PostgrestStore {
    /// Create a client for the project described by `config`.
    ///
    /// # Errors
    ///
    /// Returns `ConnectionError` if the HTTP client cannot be built.
    pub fn new(config: &DatabaseConfig) -> Result<Self, StorageError> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| StorageError::ConnectionError(e.to_string()))?;
        Ok(Self {
            http,
            rest_url: format!("{}/rest/v1", config.url.trim_end_matches('/')),
            key: config.service_role_key.clone(),
        })
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header("apikey", &self.key)
            .bearer_auth(&self.key)
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/{table}", self.rest_url)
    }

    fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &[(&str, &str)],
    ) -> Result<Vec<T>, StorageError> {
        let response = self
            .authorized(self.http.get(self.table_url(table)))
            .query(query)
            .send()
            .map_err(|e| transport_err(&e))?;
        let response = Self::check(table, response)?;
        response.json().map_err(|e| transport_err(&e))
    }

    fn insert<T: Serialize>(&self, table: &str, row: &T) -> Result<WriteStatus, StorageError> {
        let response = self
            .authorized(self.http.post(self.table_url(table)))
            .header("Prefer", "return=minimal")
            .json(row)
            .send()
            .map_err(|e| transport_err(&e))?;

        if response.status().is_success() {
            return Ok(WriteStatus::Written);
        }
        let status = response.status();
        let body: PostgrestErrorBody = response.json().unwrap_or_default();
        if is_unique_violation(status, &body) {
            return Ok(WriteStatus::UniqueViolation);
        }
        Err(StorageError::BackendError(format!(
            "insert into {table} failed ({status}): {}",
            body.message.unwrap_or_else(|| "no details".to_string())
        )))
    }

    fn check(table: &str, response: Response) -> Result<Response, StorageError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body: PostgrestErrorBody = response.json().unwrap_or_default();
        let message = body.message.unwrap_or_else(|| "no details".to_string());
        tracing::warn!(table, %status, %message, "PostgREST request failed");
        if status.is_server_error() {
            Err(StorageError::ConnectionError(format!("{table}: {status}: {message}")))
        } else {
            Err(StorageError::BackendError(format!("{table}: {status}: {message}")))
        }
    }
}

impl ReportStore for PostgrestStore {
    fn latest(&self) -> Result<Option<EconomicReport>, StorageError> {
        let rows: Vec<EconomicReport> = self.select(
            REPORTS_TABLE,
            &[("select", "*"), ("order", "report_date.desc"), ("limit", "1")],
        )?;
        Ok(rows.into_iter().next())
    }

    fn insert(&self, report: EconomicReport) -> Result<(), StorageError> {
        match PostgrestStore::insert(self, REPORTS_TABLE, &report)? {
            WriteStatus::Written => Ok(()),
            WriteStatus::UniqueViolation => {
                Err(StorageError::DuplicateKey(report.report_date.to_string()))
            }
        }
    }
}

impl RelicStore for PostgrestStore {
    fn all(&self) -> Result<Vec<Relic>, StorageError> {
        self.select(RELICS_TABLE, &[("select", "id,name,value_usd,desirability_score")])
    }

    fn insert(&self, relic: Relic) -> Result<(), StorageError> {
        match PostgrestStore::insert(self, RELICS_TABLE, &relic)? {
            WriteStatus::Written => Ok(()),
            WriteStatus::UniqueViolation => Err(StorageError::DuplicateKey(relic.id.to_string())),
        }
    }
}

impl GridStore for PostgrestStore {
    fn insert_if_absent(&self, grid: DailyGrid) -> Result<InsertOutcome, StorageError> {
        // The unique index on grid_date makes this atomic server-side.
        match PostgrestStore::insert(self, GRIDS_TABLE, &GridRow::from(&grid))? {
            WriteStatus::Written => Ok(InsertOutcome::Inserted),
            WriteStatus::UniqueViolation => Ok(InsertOutcome::AlreadyExists),
        }
    }

    fn get_by_date(&self, date: NaiveDate) -> Result<Option<DailyGrid>, StorageError> {
        let filter = format!("eq.{date}");
        let rows: Vec<DailyGrid> = self.select(
            GRIDS_TABLE,
            &[("select", "*"), ("grid_date", filter.as_str()), ("limit", "1")],
        )?;
        Ok(rows.into_iter().next())
    }

    fn latest(&self) -> Result<Option<DailyGrid>, StorageError> {
        let rows: Vec<DailyGrid> = self.select(
            GRIDS_TABLE,
            &[("select", "*"), ("order", "grid_date.desc"), ("limit", "1")],
        )?;
        Ok(rows.into_iter().next())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(url: &str) -> DatabaseConfig {
        DatabaseConfig {
            url: url.to_string(),
            service_role_key: "key".to_string(),
        }
    }

    #[test]
    fn rest_url_is_normalized() {
        let store = PostgrestStore::new(&config("https://abc.supabase.co/")).unwrap();
        assert_eq!(store.table_url(GRIDS_TABLE), "https://abc.supabase.co/rest/v1/daily_grids");
    }

    #[test]
    fn error_body_tolerates_missing_fields() {
        let body: PostgrestErrorBody = serde_json::from_str(r#"{"code":"23505"}"#).unwrap();
        assert_eq!(body.code.as_deref(), Some(UNIQUE_VIOLATION));
        assert!(body.message.is_none());
    }

    fn body(code: Option<&str>) -> PostgrestErrorBody {
        PostgrestErrorBody {
            code: code.map(str::to_string),
            message: None,
        }
    }

    #[test]
    fn only_unique_violations_map_to_duplicates() {
        assert!(is_unique_violation(StatusCode::CONFLICT, &body(Some("23505"))));
        assert!(!is_unique_violation(StatusCode::CONFLICT, &body(Some("23503"))));
        assert!(is_unique_violation(StatusCode::CONFLICT, &body(None)));
        assert!(!is_unique_violation(StatusCode::BAD_REQUEST, &body(None)));
    }

    #[test]
    fn grid_insert_row_omits_id() {
        let grid = DailyGrid::new(
            NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            "theme",
            "url",
            GridDistribution::new(),
        );
        let row = serde_json::to_value(GridRow::from(&grid)).unwrap();
        assert!(row.get("id").is_none());
        assert_eq!(row["grid_date"], "2024-06-01");
        assert_eq!(row["mystery_image_theme"], "theme");
        assert!(row["grid_distribution"].is_object());
    }

    #[test]
    fn unreachable_host_is_a_connection_error() {
        let store = PostgrestStore::new(&config("http://127.0.0.1:1")).unwrap();
        let err = ReportStore::latest(&store).unwrap_err();
        assert!(err.is_transient(), "{err}");
    }
}
