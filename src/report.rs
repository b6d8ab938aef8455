//! Daily economic reports.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Aggregate revenue recorded for one calendar day.
///
/// Reports are immutable once recorded and there is at most one per day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EconomicReport {
    pub report_date: NaiveDate,
    pub total_revenue_usd: f64,
}

impl EconomicReport {
    /// Creates a report.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::InvalidAmount` if revenue is negative or not finite.
    pub fn new(report_date: NaiveDate, total_revenue_usd: f64) -> Result<Self, ValidationError> {
        let report = Self {
            report_date,
            total_revenue_usd,
        };
        report.validate()?;
        Ok(report)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.total_revenue_usd.is_finite() || self.total_revenue_usd < 0.0 {
            return Err(ValidationError::InvalidAmount {
                field: "total_revenue_usd".to_string(),
                value: self.total_revenue_usd,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_rejects_negative_revenue() {
        let date = NaiveDate::from_ymd_opt(2024, 5, 31).unwrap();
        assert!(EconomicReport::new(date, -0.01).is_err());
        assert!(EconomicReport::new(date, f64::INFINITY).is_err());
        assert!(EconomicReport::new(date, 0.0).is_ok());
    }

    #[test]
    fn report_deserializes_from_row() {
        let row = r#"{"report_date":"2024-05-31","total_revenue_usd":1000.0}"#;
        let report: EconomicReport = serde_json::from_str(row).unwrap();
        assert_eq!(report.report_date, NaiveDate::from_ymd_opt(2024, 5, 31).unwrap());
        assert!((report.total_revenue_usd - 1000.0).abs() < f64::EPSILON);
    }
}
