//! Checks that run while a field is being edited, before any step gate.
//!
//! The password check here is stricter than the step gate (8 to 16 characters with
//! complexity rules instead of at least 6). Both are kept and neither overrides the other.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::validation::{return_date_is_valid, RETURN_DATE_INVALID, TRAVEL_DATE_IN_PAST};

static EMAIL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("pattern is a valid regex"));
static TEN_DIGITS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]{10}$").expect("pattern is a valid regex"));

const PASSWORD_SPECIAL_CHARACTERS: &str = "!@#$%^&*";

/// Upper-cases the first letter of every word and lower-cases the rest.
pub fn format_name(value: &str) -> String {
    value
        .split(' ')
        .map(|word| {
            let mut chars = word.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect()
            })
        })
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn full_name(value: &str) -> Option<&'static str> {
    if value.is_empty() {
        Some("Please enter your full name.")
    } else if value.trim().is_empty() {
        Some("Name should not be empty or consist only of spaces.")
    } else {
        None
    }
}

pub fn strip_whitespace(value: &str) -> String {
    value.chars().filter(|c| !c.is_whitespace()).collect()
}

pub fn email(value: &str) -> Option<&'static str> {
    if value.trim().is_empty() {
        Some("Please enter your email.")
    } else if !EMAIL.is_match(&value.trim().to_lowercase()) {
        Some("Please enter a valid email address")
    } else {
        None
    }
}

pub fn phone_number(value: &str) -> Option<&'static str> {
    if value.trim().is_empty() {
        Some("Phone number is required")
    } else if !TEN_DIGITS.is_match(value) {
        Some("Phone number must be exactly 10 digits")
    } else if value.starts_with('0') {
        Some("Phone number should not start with 0.")
    } else {
        None
    }
}

/// Returns the parsed age next to the message, the value is stored even when invalid.
pub fn age(value: &str) -> (Option<u32>, Option<&'static str>) {
    let value = value.trim();
    if value.is_empty() {
        return (None, Some("Age is required"));
    }
    match value.parse::<u32>() {
        Ok(age) if (1..=100).contains(&age) => (Some(age), None),
        Ok(age) => (Some(age), Some("Please enter a valid age.")),
        Err(_) => (None, Some("Please enter a valid age.")),
    }
}

/// One line per failed rule, `None` once every rule holds.
pub fn password(value: &str) -> Option<String> {
    let value = value.trim();
    let length = value.chars().count();
    let mut problems = Vec::new();
    if !(8..=16).contains(&length) {
        problems.push("Password must be 8-16 characters long.");
    }
    if !value.chars().any(|c| c.is_ascii_lowercase()) {
        problems.push("Password must contain at least one lowercase letter.");
    }
    if !value.chars().any(|c| c.is_ascii_uppercase()) {
        problems.push("Password must contain at least one uppercase letter.");
    }
    if !value.chars().any(|c| c.is_ascii_digit()) {
        problems.push("Password must contain at least one digit.");
    }
    if !value.chars().any(|c| PASSWORD_SPECIAL_CHARACTERS.contains(c)) {
        problems.push("Password must contain at least one special character.");
    }
    (!problems.is_empty()).then(|| problems.join("\n"))
}

/// `Err` keeps the previous travel date in place.
pub fn travel_date(date: NaiveDate, today: NaiveDate) -> Result<NaiveDate, &'static str> {
    if date < today {
        Err(TRAVEL_DATE_IN_PAST)
    } else {
        Ok(date)
    }
}

pub fn return_date(
    date: NaiveDate,
    travel_date: Option<NaiveDate>,
    today: NaiveDate,
) -> Result<NaiveDate, &'static str> {
    if return_date_is_valid(date, travel_date, today) {
        Ok(date)
    } else {
        Err(RETURN_DATE_INVALID)
    }
}

pub fn passenger_age(index: usize, age: Option<u32>) -> Option<String> {
    age.filter(|age| !(1..100).contains(age))
        .map(|_| format!("Passenger {} age must be between 1 and 99.", index + 1))
}
