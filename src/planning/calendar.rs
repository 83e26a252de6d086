use chrono::{Datelike, Duration, NaiveDate, Weekday};

pub const DEFAULT_WEEKLY_HOURS: f64 = 42.5;
pub const WORKDAYS_PER_WEEK: f64 = 5.0;

const DAY_NAMES: [&str; 7] = [
    "Montag",
    "Dienstag",
    "Mittwoch",
    "Donnerstag",
    "Freitag",
    "Samstag",
    "Sonntag",
];

pub fn day_name(date: NaiveDate) -> &'static str {
    DAY_NAMES[date.weekday().num_days_from_monday() as usize]
}

pub fn is_weekday(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Monday to Friday dates in `[from, to]`.
pub fn weekdays_between(from: NaiveDate, to: NaiveDate) -> Vec<NaiveDate> {
    from.iter_days()
        .take_while(|day| *day <= to)
        .filter(|day| is_weekday(*day))
        .collect()
}

/// Monday to Friday of an ISO week, or `None` when the week does not exist in that year.
pub fn week_dates(kw: u32, year: i32) -> Option<[NaiveDate; 5]> {
    let monday = NaiveDate::from_isoywd_opt(year, kw, Weekday::Mon)?;
    Some([
        monday,
        monday + Duration::days(1),
        monday + Duration::days(2),
        monday + Duration::days(3),
        monday + Duration::days(4),
    ])
}

/// 52 or 53. December 28th always lies in the last ISO week of its year.
pub fn weeks_in_year(year: i32) -> u32 {
    NaiveDate::from_ymd_opt(year, 12, 28)
        .map(|date| date.iso_week().week())
        .unwrap_or(52)
}

/// ISO week containing `today`, used when a board request names no week.
pub fn current_week(today: NaiveDate) -> (u32, i32) {
    iso_week_of(today)
}

/// (kw, iso year) of a date.
pub fn iso_week_of(date: NaiveDate) -> (u32, i32) {
    let week = date.iso_week();
    (week.week(), week.year())
}

/// Consecutive (year, kw) pairs from the start week to the end week, crossing year ends.
pub fn kw_span(from_kw: u32, from_year: i32, to_kw: u32, to_year: i32) -> Vec<(i32, u32)> {
    let mut weeks = Vec::new();
    let (mut year, mut kw) = (from_year, from_kw);
    while (year, kw) <= (to_year, to_kw) {
        weeks.push((year, kw));
        if kw >= weeks_in_year(year) {
            year += 1;
            kw = 1;
        } else {
            kw += 1;
        }
    }
    weeks
}

pub fn daily_hours(weekly_hours: Option<f64>) -> f64 {
    effective_weekly_hours(weekly_hours) / WORKDAYS_PER_WEEK
}

/// Missing or non-positive weekly hours fall back to the standard 42.5 h week.
pub fn effective_weekly_hours(weekly_hours: Option<f64>) -> f64 {
    match weekly_hours {
        Some(hours) if hours > 0.0 => hours,
        _ => DEFAULT_WEEKLY_HOURS,
    }
}

pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// `part / whole` as a percentage with one decimal; 0 when there is nothing to divide by.
pub fn percent(part: f64, whole: f64) -> f64 {
    if whole > 0.0 {
        ((part / whole) * 1000.0).round() / 10.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn weekdays_skip_the_weekend() {
        let days = weekdays_between(d("2026-02-06"), d("2026-02-10"));
        assert_eq!(days, vec![d("2026-02-06"), d("2026-02-09"), d("2026-02-10")]);
    }

    #[test]
    fn weekend_only_range_is_empty() {
        assert!(weekdays_between(d("2026-02-07"), d("2026-02-08")).is_empty());
        assert!(weekdays_between(d("2026-02-09"), d("2026-02-06")).is_empty());
    }

    #[test]
    fn kw_6_2026_runs_from_feb_2_to_feb_6() {
        let dates = week_dates(6, 2026).unwrap();
        assert_eq!(dates[0], d("2026-02-02"));
        assert_eq!(dates[4], d("2026-02-06"));
        assert_eq!(day_name(dates[2]), "Mittwoch");
    }

    #[test]
    fn week_53_only_exists_in_long_years() {
        assert!(week_dates(53, 2020).is_some());
        assert!(week_dates(53, 2025).is_none());
        assert_eq!(weeks_in_year(2020), 53);
        assert_eq!(weeks_in_year(2025), 52);
    }

    #[test]
    fn iso_week_crosses_the_year_boundary() {
        assert_eq!(iso_week_of(d("2025-12-29")), (1, 2026));
        assert_eq!(current_week(d("2021-01-01")), (53, 2020));
    }

    #[test]
    fn kw_span_wraps_over_new_year() {
        assert_eq!(
            kw_span(51, 2025, 2, 2026),
            vec![(2025, 51), (2025, 52), (2026, 1), (2026, 2)]
        );
        assert_eq!(kw_span(52, 2020, 1, 2021), vec![(2020, 52), (2020, 53), (2021, 1)]);
        assert_eq!(kw_span(4, 2026, 6, 2026).len(), 3);
    }

    #[test]
    fn percentages_round_to_one_decimal() {
        assert_eq!(percent(1.0, 3.0), 33.3);
        assert_eq!(percent(2.0, 3.0), 66.7);
        assert_eq!(percent(5.0, 0.0), 0.0);
        assert_eq!(round2(8.499999), 8.5);
    }

    #[test]
    fn weekly_hours_default() {
        assert_eq!(daily_hours(None), 8.5);
        assert_eq!(daily_hours(Some(20.0)), 4.0);
        assert_eq!(daily_hours(Some(0.0)), 8.5);
    }
}
