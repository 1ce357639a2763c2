//! Field-level checks run before anything touches storage.
//!
//! Every rule that fails contributes one message; the handler returns them
//! together as a 400.

use chrono::{NaiveDate, NaiveTime};
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::{Decimal, RoundingStrategy};
use std::str::FromStr;

use crate::uploads::FormFields;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)+$")
        .expect("email regex compiles")
});

const MIN_NAME_LEN: usize = 2;
const MIN_PASSWORD_LEN: usize = 6;

/// `events.cost` is `NUMERIC(10, 2)`: cents, at most eight integer digits.
const COST_SCALE: u32 = 2;
const COST_LIMIT: i64 = 100_000_000;

pub type ValidationResult = Result<(), Vec<String>>;

pub fn is_valid_email(email: &str) -> bool {
    email.len() <= 254 && EMAIL_RE.is_match(email)
}

/// `YYYY-MM-DD`, optionally followed by a time part as ISO 8601 allows.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    let split = raw.char_indices().nth(10).map_or(raw.len(), |(i, _)| i);
    let (date_part, rest) = raw.split_at(split);
    if !(rest.is_empty() || rest.starts_with('T') || rest.starts_with(' ')) {
        return None;
    }
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}

/// `HH:MM` or `HH:MM:SS`.
pub fn parse_time(raw: &str) -> Option<NaiveTime> {
    let raw = raw.trim();
    NaiveTime::parse_from_str(raw, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M"))
        .ok()
}

pub fn parse_decimal(raw: &str) -> Option<Decimal> {
    Decimal::from_str(raw.trim()).ok()
}

/// Rounds to cents the way the column does and rejects values it cannot hold.
pub fn parse_cost(raw: &str) -> Option<Decimal> {
    parse_decimal(raw)
        .map(|cost| cost.round_dp_with_strategy(COST_SCALE, RoundingStrategy::MidpointAwayFromZero))
        .filter(|cost| cost.abs() < Decimal::from(COST_LIMIT))
}

pub fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn finish(errors: Vec<String>) -> ValidationResult {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn long_enough(value: Option<&String>, min: usize) -> bool {
    value.is_some_and(|v| v.trim().chars().count() >= min)
}

fn present(value: Option<&String>) -> bool {
    value.is_some_and(|v| !v.trim().is_empty())
}

pub fn validate_user_registration(fields: &FormFields) -> ValidationResult {
    let mut errors = Vec::new();

    if !long_enough(fields.text("name").as_ref(), MIN_NAME_LEN) {
        errors.push("Name must be at least 2 characters long".to_string());
    }
    if !fields.text("email").is_some_and(|e| is_valid_email(e.trim())) {
        errors.push("Valid email is required".to_string());
    }
    if !fields
        .text("password")
        .is_some_and(|p| p.chars().count() >= MIN_PASSWORD_LEN)
    {
        errors.push("Password must be at least 6 characters long".to_string());
    }

    finish(errors)
}

pub fn validate_user_update(fields: &FormFields) -> ValidationResult {
    let mut errors = Vec::new();

    if let Some(name) = fields.text("name") {
        if !long_enough(Some(&name), MIN_NAME_LEN) {
            errors.push("Name must be at least 2 characters long".to_string());
        }
    }
    if let Some(email) = fields.text("email") {
        if !is_valid_email(email.trim()) {
            errors.push("Valid email format required".to_string());
        }
    }
    if let Some(password) = fields.text("password") {
        if password.chars().count() < MIN_PASSWORD_LEN {
            errors.push("Password must be at least 6 characters long".to_string());
        }
    }

    finish(errors)
}

pub fn validate_community(fields: &FormFields) -> ValidationResult {
    let mut errors = Vec::new();

    if !long_enough(fields.text("name").as_ref(), MIN_NAME_LEN) {
        errors.push("Community name is required".to_string());
    }
    if !present(fields.text("category").as_ref()) {
        errors.push("Category is required".to_string());
    }
    if let Some(email) = fields.text("email").filter(|e| !e.is_empty()) {
        if !is_valid_email(email.trim()) {
            errors.push("Valid email format required".to_string());
        }
    }
    if !present(fields.text("contact").as_ref()) {
        errors.push("Contact information is required".to_string());
    }

    finish(errors)
}

/// Same formats as creation, applied only to the fields that were sent.
pub fn validate_community_update(fields: &FormFields) -> ValidationResult {
    let mut errors = Vec::new();

    if let Some(name) = fields.text("name") {
        if !long_enough(Some(&name), MIN_NAME_LEN) {
            errors.push("Community name is required".to_string());
        }
    }
    if let Some(category) = fields.text("category") {
        if category.trim().is_empty() {
            errors.push("Category is required".to_string());
        }
    }
    if let Some(email) = fields.text("email").filter(|e| !e.is_empty()) {
        if !is_valid_email(email.trim()) {
            errors.push("Valid email format required".to_string());
        }
    }
    if let Some(contact) = fields.text("contact") {
        if contact.trim().is_empty() {
            errors.push("Contact information is required".to_string());
        }
    }

    finish(errors)
}

fn check_event_types(fields: &FormFields, errors: &mut Vec<String>) {
    if let Some(cost) = fields.text("cost").filter(|c| !c.trim().is_empty()) {
        if parse_decimal(&cost).is_none() {
            errors.push("Cost must be a number".to_string());
        } else if parse_cost(&cost).is_none() {
            errors.push(format!("Cost must be less than {COST_LIMIT}"));
        }
    }
    if let Some(priority) = fields.text("priority").filter(|p| !p.trim().is_empty()) {
        if parse_bool(&priority).is_none() {
            errors.push("Priority must be true or false".to_string());
        }
    }
}

pub fn validate_event(fields: &FormFields) -> ValidationResult {
    let mut errors = Vec::new();

    if !long_enough(fields.text("event_name").as_ref(), MIN_NAME_LEN) {
        errors.push("Event name is required".to_string());
    }
    match fields.text("event_date").filter(|d| !d.trim().is_empty()) {
        None => errors.push("Event date is required".to_string()),
        Some(date) if parse_date(&date).is_none() => {
            errors.push("Valid event date (YYYY-MM-DD) is required".to_string())
        }
        Some(_) => {}
    }
    match fields.text("event_time").filter(|t| !t.trim().is_empty()) {
        None => errors.push("Event time is required".to_string()),
        Some(time) if parse_time(&time).is_none() => {
            errors.push("Valid event time (HH:MM) is required".to_string())
        }
        Some(_) => {}
    }
    if !present(fields.text("category").as_ref()) {
        errors.push("Category is required".to_string());
    }
    check_event_types(fields, &mut errors);

    finish(errors)
}

pub fn validate_event_update(fields: &FormFields) -> ValidationResult {
    let mut errors = Vec::new();

    if let Some(name) = fields.text("event_name") {
        if !long_enough(Some(&name), MIN_NAME_LEN) {
            errors.push("Event name is required".to_string());
        }
    }
    if let Some(date) = fields.text("event_date") {
        if parse_date(&date).is_none() {
            errors.push("Valid event date (YYYY-MM-DD) is required".to_string());
        }
    }
    if let Some(time) = fields.text("event_time") {
        if parse_time(&time).is_none() {
            errors.push("Valid event time (HH:MM) is required".to_string());
        }
    }
    if let Some(category) = fields.text("category") {
        if category.trim().is_empty() {
            errors.push("Category is required".to_string());
        }
    }
    check_event_types(fields, &mut errors);

    finish(errors)
}
