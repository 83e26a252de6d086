use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Deserializer};
use uuid::Uuid;

use crate::error::{ApiError, FieldError};
use crate::models::enums::Choice;

pub const MIN_YEAR: i64 = 2020;
pub const MAX_YEAR: i64 = 2099;
pub const MAX_RANGE_DAYS: i64 = 31;

/// Distinguishes an absent JSON field (`None`) from an explicit `null` (`Some(None)`).
pub fn double_option<'de, T, D>(de: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(de).map(Some)
}

/// Collects field errors so a request reports every problem at once.
#[derive(Debug, Default)]
pub struct Validator {
    errors: Vec<FieldError>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: &str, message: impl Into<String>) {
        self.errors.push(FieldError {
            field: field.to_string(),
            message: message.into(),
        });
    }

    pub fn check(&mut self, ok: bool, field: &str, message: &str) {
        if !ok {
            self.push(field, message);
        }
    }

    pub fn has_error(&self, field: &str) -> bool {
        self.errors.iter().any(|e| e.field == field)
    }

    pub fn finish(self) -> Result<(), ApiError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ApiError::Validation(self.errors))
        }
    }

    pub fn required_text(&mut self, field: &str, value: Option<&str>, max: usize) -> Option<String> {
        match value.map(str::trim) {
            None | Some("") => {
                self.push(field, format!("{} is required", field));
                None
            }
            Some(text) => self.bounded(field, text, max),
        }
    }

    /// For updates: may be absent, but when present must not be blank.
    pub fn non_blank_text(&mut self, field: &str, value: Option<&str>, max: usize) -> Option<String> {
        match value.map(str::trim) {
            None => None,
            Some("") => {
                self.push(field, format!("{} cannot be empty", field));
                None
            }
            Some(text) => self.bounded(field, text, max),
        }
    }

    pub fn optional_text(&mut self, field: &str, value: Option<&str>, max: usize) -> Option<String> {
        value.map(str::trim).and_then(|text| self.bounded(field, text, max))
    }

    fn bounded(&mut self, field: &str, text: &str, max: usize) -> Option<String> {
        if text.chars().count() > max {
            self.push(field, format!("{} must be less than {} characters", field, max));
            None
        } else {
            Some(text.to_string())
        }
    }

    pub fn required_choice<T: Choice>(&mut self, field: &str, value: Option<&str>) -> Option<T> {
        match value {
            None | Some("") => {
                self.push(field, format!("{} is required", field));
                None
            }
            Some(raw) => self.optional_choice(field, Some(raw)),
        }
    }

    pub fn optional_choice<T: Choice>(&mut self, field: &str, value: Option<&str>) -> Option<T> {
        let raw = value?;
        match raw.parse::<T>() {
            Ok(choice) => Some(choice),
            Err(_) => {
                self.push(field, format!("{} must be one of: {}", field, T::choices()));
                None
            }
        }
    }

    pub fn required_uuid(&mut self, field: &str, value: Option<&str>) -> Option<String> {
        match value {
            None | Some("") => {
                self.push(field, format!("{} is required", field));
                None
            }
            Some(raw) => self.optional_uuid(field, Some(raw)),
        }
    }

    pub fn optional_uuid(&mut self, field: &str, value: Option<&str>) -> Option<String> {
        let raw = value?;
        match Uuid::parse_str(raw) {
            Ok(id) => Some(id.hyphenated().to_string()),
            Err(_) => {
                self.push(field, format!("{} must be a valid UUID", field));
                None
            }
        }
    }

    pub fn required_date(&mut self, field: &str, value: Option<&str>) -> Option<NaiveDate> {
        match value {
            None | Some("") => {
                self.push(field, format!("{} is required", field));
                None
            }
            Some(raw) => self.optional_date(field, Some(raw)),
        }
    }

    pub fn optional_date(&mut self, field: &str, value: Option<&str>) -> Option<NaiveDate> {
        let raw = value?;
        match parse_iso_date(raw) {
            Some(date) => Some(date),
            None => {
                self.push(field, format!("{} must be a valid ISO 8601 date (YYYY-MM-DD)", field));
                None
            }
        }
    }

    pub fn optional_time(&mut self, field: &str, value: Option<&str>) -> Option<NaiveTime> {
        let raw = value?;
        let parsed = NaiveTime::parse_from_str(raw, "%H:%M:%S")
            .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M"));
        match parsed {
            Ok(time) if raw.len() == 5 || raw.len() == 8 => Some(time),
            _ => {
                self.push(field, format!("{} must be a valid time (HH:MM or HH:MM:SS)", field));
                None
            }
        }
    }

    /// ISO 8601 timestamp; one without an offset is taken as UTC.
    pub fn required_datetime(&mut self, field: &str, value: Option<&str>) -> Option<DateTime<Utc>> {
        match value {
            None | Some("") => {
                self.push(field, format!("{} is required", field));
                None
            }
            Some(raw) => match parse_iso_datetime(raw) {
                Some(at) => Some(at),
                None => {
                    self.push(field, format!("{} must be ISO 8601", field));
                    None
                }
            },
        }
    }

    pub fn int_in_range(&mut self, field: &str, value: Option<i64>, min: i64, max: i64) -> Option<i64> {
        let n = value?;
        if n < min || n > max {
            self.push(field, format!("{} must be between {} and {}", field, min, max));
            None
        } else {
            Some(n)
        }
    }

    /// Integer query parameter; `None` when absent.
    pub fn query_int(&mut self, field: &str, value: Option<&str>, min: i64, max: i64) -> Option<i64> {
        let raw = value?;
        match raw.trim().parse::<i64>() {
            Ok(n) => self.int_in_range(field, Some(n), min, max),
            Err(_) => {
                self.push(field, format!("{} must be between {} and {}", field, min, max));
                None
            }
        }
    }

    pub fn required_query_int(&mut self, field: &str, value: Option<&str>, min: i64, max: i64) -> Option<i64> {
        match value {
            None | Some("") => {
                self.push(field, format!("{} is required", field));
                None
            }
            Some(raw) => self.query_int(field, Some(raw), min, max),
        }
    }

    pub fn optional_bool(&mut self, field: &str, value: Option<&str>) -> Option<bool> {
        match value? {
            "true" | "1" => Some(true),
            "false" | "0" => Some(false),
            _ => {
                self.push(field, format!("{} must be boolean", field));
                None
            }
        }
    }

    /// `from`/`to` query pair: both required, `to >= from`, span at most 31 days.
    pub fn date_range(&mut self, from: Option<&str>, to: Option<&str>) -> Option<(NaiveDate, NaiveDate)> {
        let from = self.required_date("from", from);
        let to = self.required_date("to", to);
        let (from, to) = (from?, to?);
        if to < from {
            self.push("to", "to must be on or after from");
            return None;
        }
        if (to - from).num_days() > MAX_RANGE_DAYS {
            self.push("to", "Date range must not exceed 31 days");
            return None;
        }
        Some((from, to))
    }

    pub fn required_week(&mut self, kw: Option<&str>, year: Option<&str>) -> Option<(u32, i32)> {
        let kw = self.required_query_int("kw", kw, 1, 53);
        let year = self.required_query_int("year", year, MIN_YEAR, MAX_YEAR);
        Some((kw? as u32, year? as i32))
    }
}

/// Path segment that must be a UUID; normalised like body ids.
pub fn path_uuid(field: &str, raw: &str) -> Result<String, ApiError> {
    let mut v = Validator::new();
    let id = v.required_uuid(field, Some(raw));
    v.finish()?;
    id.ok_or_else(|| ApiError::BadRequest(format!("{} must be a valid UUID", field)))
}

pub fn parse_iso_date(raw: &str) -> Option<NaiveDate> {
    let date_part = raw.get(..10)?;
    let date = NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()?;
    match raw.get(10..) {
        Some("") | None => Some(date),
        Some(rest) if rest.starts_with('T') => Some(date),
        _ => None,
    }
}

pub fn parse_iso_datetime(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Some(at.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M"))
        .ok()
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::enums::HalfDay;

    fn messages(v: Validator) -> Vec<String> {
        match v.finish() {
            Err(ApiError::Validation(errors)) => errors.into_iter().map(|e| e.message).collect(),
            _ => Vec::new(),
        }
    }

    #[test]
    fn date_range_rejects_more_than_31_days() {
        let mut v = Validator::new();
        assert!(v.date_range(Some("2026-01-01"), Some("2026-02-02")).is_none());
        assert_eq!(messages(v), vec!["Date range must not exceed 31 days"]);
    }

    #[test]
    fn date_range_accepts_exactly_31_days() {
        let mut v = Validator::new();
        let range = v.date_range(Some("2026-01-01"), Some("2026-02-01"));
        assert!(range.is_some());
        assert!(v.finish().is_ok());
    }

    #[test]
    fn date_range_requires_order() {
        let mut v = Validator::new();
        assert!(v.date_range(Some("2026-02-10"), Some("2026-02-09")).is_none());
        assert_eq!(messages(v), vec!["to must be on or after from"]);
    }

    #[test]
    fn reports_all_missing_fields_together() {
        let mut v = Validator::new();
        v.date_range(None, Some("nope"));
        let msgs = messages(v);
        assert_eq!(msgs.len(), 2);
        assert!(msgs[0].contains("from is required"));
        assert!(msgs[1].contains("ISO 8601"));
    }

    #[test]
    fn enum_membership_lists_allowed_values() {
        let mut v = Validator::new();
        let parsed: Option<HalfDay> = v.required_choice("halfDay", Some("evening"));
        assert!(parsed.is_none());
        assert_eq!(messages(v), vec!["halfDay must be one of: morning, afternoon, full_day"]);
    }

    #[test]
    fn uuids_are_normalised() {
        let mut v = Validator::new();
        let id = v.required_uuid("resourceId", Some("6F9619FF-8B86-4D11-B42D-00C04FC964FF"));
        assert_eq!(id.as_deref(), Some("6f9619ff-8b86-4d11-b42d-00c04fc964ff"));
        assert!(v.required_uuid("taskId", Some("task-1")).is_none());
        assert!(v.has_error("taskId"));
    }

    #[test]
    fn week_bounds() {
        let mut v = Validator::new();
        assert_eq!(v.required_week(Some("6"), Some("2026")), Some((6, 2026)));
        assert!(v.required_week(Some("54"), Some("2019")).is_none());
        assert_eq!(
            messages(v),
            vec!["kw must be between 1 and 53", "year must be between 2020 and 2099"]
        );
    }

    #[test]
    fn text_is_trimmed_and_bounded() {
        let mut v = Validator::new();
        assert_eq!(v.required_text("name", Some("  Hans  "), 255).as_deref(), Some("Hans"));
        assert!(v.required_text("name", Some("   "), 255).is_none());
        assert!(v.optional_text("notes", Some(&"x".repeat(2001)), 2000).is_none());
        assert_eq!(
            messages(v),
            vec!["name is required", "notes must be less than 2000 characters"]
        );
    }

    #[test]
    fn start_times() {
        let mut v = Validator::new();
        assert!(v.optional_time("startTime", Some("07:30")).is_some());
        assert!(v.optional_time("startTime", Some("07:30:15")).is_some());
        assert!(v.optional_time("startTime", Some("24:00")).is_none());
        assert!(v.optional_time("startTime", Some("7:3")).is_none());
    }

    #[test]
    fn path_ids_must_be_uuids() {
        assert!(path_uuid("id", "6f9619ff-8b86-4d11-b42d-00c04fc964ff").is_ok());
        assert!(matches!(path_uuid("id", "42"), Err(ApiError::Validation(_))));
    }

    #[test]
    fn iso_dates_may_carry_a_time_part() {
        assert_eq!(parse_iso_date("2026-02-02T00:00:00Z"), NaiveDate::from_ymd_opt(2026, 2, 2));
        assert!(parse_iso_date("2026-02-30").is_none());
        assert!(parse_iso_date("2026-02-02x").is_none());
    }

    #[test]
    fn work_slot_times_accept_offsets_and_local_time() {
        let mut v = Validator::new();
        let with_offset = v.required_datetime("startTime", Some("2026-02-02T08:00:00+01:00"));
        let naive = v.required_datetime("startTime", Some("2026-02-02T07:00"));
        assert_eq!(with_offset, naive);
        assert!(v.required_datetime("endTime", Some("2026-02-02")).is_none());
        assert!(v.required_datetime("endTime", None).is_none());
        assert_eq!(messages(v), vec!["endTime must be ISO 8601", "endTime is required"]);
    }
}
