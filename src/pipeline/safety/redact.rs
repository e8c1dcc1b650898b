//! PII redaction for free-text notes before they leave the device.
//!
//! Detectors run in a fixed order; calendar dates are rewritten into
//! relative-time buckets before the address and ZIP detectors see the text.

use chrono::{Local, NaiveDate};
use regex::{Captures, Regex};

use super::patterns::*;

pub const EMAIL_TOKEN: &str = "[EMAIL]";
pub const PHONE_TOKEN: &str = "[PHONE]";
pub const SSN_TOKEN: &str = "[SSN]";
pub const MRN_TOKEN: &str = "[MRN]";
pub const ADDRESS_TOKEN: &str = "[ADDRESS]";
pub const ZIP_TOKEN: &str = "[ZIP]";
pub const DATE_TOKEN: &str = "[DATE]";
pub const NAME_TOKEN: &str = "[NAME]";
pub const FACILITY_TOKEN: &str = "[FACILITY]";
pub const DOCTOR_PHRASE: &str = "my doctor";

/// Redact PII relative to today's date.
pub fn redact_pii(text: &str) -> String {
    redact_pii_at(text, Local::now().date_naive())
}

/// Redact PII, rendering calendar dates relative to `today`.
pub fn redact_pii_at(text: &str, today: NaiveDate) -> String {
    if text.is_empty() {
        return String::new();
    }

    let mut out = EMAIL_RE.replace_all(text, EMAIL_TOKEN).into_owned();
    out = PHONE_RE.replace_all(&out, PHONE_TOKEN).into_owned();
    out = SSN_RE.replace_all(&out, SSN_TOKEN).into_owned();
    out = MRN_RE.replace_all(&out, MRN_TOKEN).into_owned();
    out = replace_dates(&out, today);
    out = ADDRESS_RE.replace_all(&out, ADDRESS_TOKEN).into_owned();
    out = ZIP_PLUS_FOUR_RE.replace_all(&out, ZIP_TOKEN).into_owned();
    out = DOCTOR_NAME_RE.replace_all(&out, DOCTOR_PHRASE).into_owned();
    out = TITLED_NAME_RE.replace_all(&out, NAME_TOKEN).into_owned();
    out = RELATION_NAME_RE
        .replace_all(&out, format!("${{1}} {NAME_TOKEN}").as_str())
        .into_owned();
    out = FACILITY_RE.replace_all(&out, FACILITY_TOKEN).into_owned();
    out
}

/// Relative-time bucket for a date, e.g. "yesterday" or "~3 weeks ago".
///
/// Buckets use floor division at the 7/14/30/60/365-day thresholds.
/// Future dates collapse to "today".
pub fn relative_time_bucket(date: NaiveDate, today: NaiveDate) -> String {
    let diff_days = (today - date).num_days();
    match diff_days {
        d if d <= 0 => "today".to_string(),
        1 => "yesterday".to_string(),
        d if d < 7 => format!("~{d} days ago"),
        d if d < 14 => "~1 week ago".to_string(),
        d if d < 30 => format!("~{} weeks ago", d / 7),
        d if d < 60 => "~1 month ago".to_string(),
        d if d < 365 => format!("~{} months ago", d / 30),
        d => {
            let years = d / 365;
            if years == 1 {
                "~1 year ago".to_string()
            } else {
                format!("~{years} years ago")
            }
        }
    }
}

fn replace_dates(text: &str, today: NaiveDate) -> String {
    let out = replace_with(&ISO_DATE_RE, text, today, |caps| {
        parse_ymd(&caps[1], &caps[2], &caps[3])
    });
    let out = replace_with(&US_DATE_RE, &out, today, |caps| {
        let year = expand_year(&caps[3])?;
        parse_ymd(&year.to_string(), &caps[1], &caps[2])
    });
    replace_with(&LONG_DATE_RE, &out, today, |caps| {
        let month = month_number(&caps[1])?;
        parse_ymd(&caps[3], &month.to_string(), &caps[2])
    })
}

fn replace_with<F>(re: &Regex, text: &str, today: NaiveDate, parse: F) -> String
where
    F: Fn(&Captures<'_>) -> Option<NaiveDate>,
{
    re.replace_all(text, |caps: &Captures<'_>| match parse(caps) {
        Some(date) => relative_time_bucket(date, today),
        None => DATE_TOKEN.to_string(),
    })
    .into_owned()
}

fn parse_ymd(year: &str, month: &str, day: &str) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year.parse().ok()?, month.parse().ok()?, day.parse().ok()?)
}

fn expand_year(raw: &str) -> Option<i32> {
    let year: i32 = raw.parse().ok()?;
    Some(if raw.len() == 2 { 2000 + year } else { year })
}

fn month_number(name: &str) -> Option<u32> {
    let prefix: String = name.chars().take(3).collect::<String>().to_lowercase();
    let month = match prefix.as_str() {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return None,
    };
    Some(month)
}
