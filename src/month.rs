// Copyright 2025 Cowboy AI, LLC.

//! Calendar-month buckets (`YYYY-MM`)
//!
//! Usage windows are keyed by month. On the wire a month is the zero-padded string
//! `YYYY-MM`; in memory it is a `(year, month)` pair so comparisons do not depend on
//! string ordering. For four-digit years both orders agree.

use chrono::{DateTime, Datelike, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error parsing a `YYYY-MM` string
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid month bucket '{0}', expected YYYY-MM")]
pub struct MonthParseError(pub String);

/// A calendar month, ordered chronologically
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocMonth {
    year: i32,
    month: u32,
}

impl DocMonth {
    /// Create a month bucket; `month` is 1-based
    pub fn new(year: i32, month: u32) -> Result<Self, MonthParseError> {
        if !(1..=12).contains(&month) || !(0..=9999).contains(&year) {
            return Err(MonthParseError(format!("{year:04}-{month:02}")));
        }
        Ok(Self { year, month })
    }

    /// Month containing the given instant (UTC)
    ///
    /// Fails for instants outside the years `0..=9999`, which have no `YYYY-MM` form.
    pub fn of(at: DateTime<Utc>) -> Result<Self, MonthParseError> {
        Self::new(at.year(), at.month())
    }

    /// Calendar year
    pub fn year(&self) -> i32 {
        self.year
    }

    /// Month of the year, 1-based
    pub fn month(&self) -> u32 {
        self.month
    }

    /// The month `n` months before this one
    pub fn months_back(&self, n: u32) -> Self {
        let index = self.index() - i64::from(n);
        Self::from_index(index)
    }

    fn index(&self) -> i64 {
        i64::from(self.year) * 12 + i64::from(self.month) - 1
    }

    fn from_index(index: i64) -> Self {
        Self {
            year: index.div_euclid(12) as i32,
            month: index.rem_euclid(12) as u32 + 1,
        }
    }
}

impl fmt::Display for DocMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for DocMonth {
    type Err = MonthParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || MonthParseError(s.to_string());
        let (year, month) = s.split_once('-').ok_or_else(err)?;
        if year.len() != 4 || month.len() != 2 {
            return Err(err());
        }
        let year: i32 = year.parse().map_err(|_| err())?;
        let month: u32 = month.parse().map_err(|_| err())?;
        Self::new(year, month).map_err(|_| err())
    }
}

impl Serialize for DocMonth {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DocMonth {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

impl JsonSchema for DocMonth {
    fn schema_name() -> String {
        "DocMonth".to_string()
    }

    fn json_schema(gen: &mut schemars::gen::SchemaGenerator) -> schemars::schema::Schema {
        let mut schema = match String::json_schema(gen) {
            schemars::schema::Schema::Object(obj) => obj,
            other => return other,
        };
        schema.string().pattern = Some(r"^\d{4}-(0[1-9]|1[0-2])$".to_string());
        schemars::schema::Schema::Object(schema)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use test_case::test_case;

    #[test_case("2025-01", 2025, 1; "january")]
    #[test_case("1999-12", 1999, 12; "december")]
    #[test_case("0042-07", 42, 7; "padded year")]
    fn test_parse(raw: &str, year: i32, month: u32) {
        let parsed: DocMonth = raw.parse().unwrap();
        assert_eq!(parsed.year(), year);
        assert_eq!(parsed.month(), month);
        assert_eq!(parsed.to_string(), raw);
    }

    #[test_case("2025-1"; "unpadded month")]
    #[test_case("2025-13"; "month out of range")]
    #[test_case("2025-00"; "month zero")]
    #[test_case("25-01"; "short year")]
    #[test_case("2025/01"; "wrong separator")]
    #[test_case(""; "empty")]
    fn test_parse_rejects(raw: &str) {
        assert!(raw.parse::<DocMonth>().is_err());
    }

    #[test_case(2025, 8, 6, 2025, 2; "same year")]
    #[test_case(2025, 3, 6, 2024, 9; "across year boundary")]
    #[test_case(2025, 1, 1, 2024, 12; "january minus one")]
    #[test_case(2025, 6, 6, 2024, 12; "lands on december")]
    #[test_case(2025, 7, 24, 2023, 7; "two years")]
    fn test_months_back(y: i32, m: u32, n: u32, ey: i32, em: u32) {
        let month = DocMonth::new(y, m).unwrap();
        assert_eq!(month.months_back(n), DocMonth::new(ey, em).unwrap());
    }

    #[test]
    fn test_of_timestamp() {
        let at = Utc.with_ymd_and_hms(2024, 12, 31, 23, 59, 59).unwrap();
        assert_eq!(DocMonth::of(at).unwrap().to_string(), "2024-12");
    }

    #[test]
    fn test_of_rejects_years_without_four_digits() {
        let far = Utc.with_ymd_and_hms(10000, 1, 3, 9, 0, 0).unwrap();
        let err = DocMonth::of(far).unwrap_err();
        assert_eq!(err.to_string(), "Invalid month bucket '10000-01', expected YYYY-MM");

        let last = Utc.with_ymd_and_hms(9999, 12, 31, 23, 59, 59).unwrap();
        assert_eq!(DocMonth::of(last).unwrap().to_string(), "9999-12");
    }

    #[test]
    fn test_ordering_matches_string_ordering_across_years() {
        let dec: DocMonth = "2024-12".parse().unwrap();
        let jan: DocMonth = "2025-01".parse().unwrap();
        assert!(dec < jan);
        assert!(dec.to_string() < jan.to_string());
    }

    #[test]
    fn test_serde_as_string() {
        let month = DocMonth::new(2025, 3).unwrap();
        assert_eq!(serde_json::to_string(&month).unwrap(), "\"2025-03\"");
        let back: DocMonth = serde_json::from_str("\"2025-03\"").unwrap();
        assert_eq!(back, month);
        assert!(serde_json::from_str::<DocMonth>("\"2025-3\"").is_err());
    }
}
