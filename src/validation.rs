//! Field-level rules shared by the order store and the business-rule validator.
//!
//! Every check returns the first problem it finds as
//! [`ServiceError::InvalidField`] naming the offending field.

use std::collections::HashSet;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate};
use lazy_static::lazy_static;
use regex::Regex;
use rust_decimal::Decimal;
use strum::{Display, EnumIter, EnumString};
use uuid::Uuid;

use crate::errors::ServiceError;

/// Column precision of every stored amount and quantity, `DECIMAL(16, 4)`.
pub const AMOUNT_PRECISION: u32 = 16;
pub const AMOUNT_SCALE: u32 = 4;
const AMOUNT_INTEGER_DIGITS: u32 = AMOUNT_PRECISION - AMOUNT_SCALE;

/// Alternate issue-date formats accepted next to ISO-8601.
const ALTERNATE_DATE_FORMATS: [&str; 2] = ["%d/%m/%Y", "%Y/%m/%d"];

lazy_static! {
    static ref PARTY_NAME_RE: Regex =
        Regex::new(r"^[\p{L}\p{N} .,'\-&()]+$").expect("party name pattern compiles");
    static ref NUMERIC_ID_RE: Regex = Regex::new(r"^[0-9]+$").expect("numeric id pattern compiles");
    static ref CURRENCY_RE: Regex = Regex::new(r"^[A-Z]{3}$").expect("currency pattern compiles");

    // Active ISO 4217 alphabetic codes
    static ref ISO_4217_CODES: HashSet<&'static str> = [
        "AED", "AFN", "ALL", "AMD", "ANG", "AOA", "ARS", "AUD", "AWG", "AZN", "BAM", "BBD",
        "BDT", "BGN", "BHD", "BIF", "BMD", "BND", "BOB", "BRL", "BSD", "BTN", "BWP", "BYN",
        "BZD", "CAD", "CDF", "CHF", "CLP", "CNY", "COP", "CRC", "CUP", "CVE", "CZK", "DJF",
        "DKK", "DOP", "DZD", "EGP", "ERN", "ETB", "EUR", "FJD", "FKP", "GBP", "GEL", "GHS",
        "GIP", "GMD", "GNF", "GTQ", "GYD", "HKD", "HNL", "HTG", "HUF", "IDR", "ILS", "INR",
        "IQD", "IRR", "ISK", "JMD", "JOD", "JPY", "KES", "KGS", "KHR", "KMF", "KPW", "KRW",
        "KWD", "KYD", "KZT", "LAK", "LBP", "LKR", "LRD", "LSL", "LYD", "MAD", "MDL", "MGA",
        "MKD", "MMK", "MNT", "MOP", "MRU", "MUR", "MVR", "MWK", "MXN", "MYR", "MZN", "NAD",
        "NGN", "NIO", "NOK", "NPR", "NZD", "OMR", "PAB", "PEN", "PGK", "PHP", "PKR", "PLN",
        "PYG", "QAR", "RON", "RSD", "RUB", "RWF", "SAR", "SBD", "SCR", "SDG", "SEK", "SGD",
        "SHP", "SLE", "SOS", "SRD", "SSP", "STN", "SVC", "SYP", "SZL", "THB", "TJS", "TMT",
        "TND", "TOP", "TRY", "TTD", "TWD", "TZS", "UAH", "UGX", "USD", "UYU", "UZS", "VES",
        "VND", "VUV", "WST", "XAF", "XCD", "XOF", "XPF", "YER", "ZAR", "ZMW", "ZWL",
    ]
    .into_iter()
    .collect();
}

/// UN/ECE Recommendation 20 unit codes accepted on order and invoice lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
#[strum(serialize_all = "UPPERCASE")]
pub enum UnitCode {
    Ea,
    Pcs,
    C62,
    H87,
    Kgm,
    Grm,
    Tne,
    Ltr,
    Mlt,
    Mtq,
    Mtr,
    Cmt,
    Kmt,
    Mtk,
    Hur,
    Day,
    Mon,
    Set,
    Pr,
    Bx,
    Pk,
    Dzn,
}

pub fn validate_uuid(field: &str, value: &str) -> Result<Uuid, ServiceError> {
    let trimmed = value.trim();
    let parsed = Uuid::try_parse(trimmed)
        .map_err(|_| ServiceError::invalid_field(field, format!("'{}' is not a UUID", value)))?;

    // Only the hyphenated form is accepted, and it must carry the RFC-4122 variant bits.
    if trimmed.len() != 36 || parsed.get_variant() != uuid::Variant::RFC4122 {
        return Err(ServiceError::invalid_field(
            field,
            format!("'{}' is not an RFC-4122 UUID", value),
        ));
    }
    Ok(parsed)
}

pub fn parse_issue_date(field: &str, value: &str) -> Result<NaiveDate, ServiceError> {
    let trimmed = value.trim();
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Ok(date);
    }
    if let Ok(stamp) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(stamp.date_naive());
    }
    ALTERNATE_DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
        .ok_or_else(|| {
            ServiceError::invalid_field(
                field,
                format!("'{}' is not an ISO-8601 or DD/MM/YYYY date", value),
            )
        })
}

pub fn validate_party_name(field: &str, value: &str) -> Result<String, ServiceError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ServiceError::invalid_field(field, "must not be empty"));
    }
    if !PARTY_NAME_RE.is_match(trimmed) {
        return Err(ServiceError::invalid_field(
            field,
            "may only contain letters, digits, spaces and . , ' - & ( )",
        ));
    }
    Ok(trimmed.to_string())
}

/// Parses a non-negative decimal amount or quantity that fits an amount column.
pub fn parse_non_negative_decimal(field: &str, value: &str) -> Result<Decimal, ServiceError> {
    let amount = Decimal::from_str(value.trim()).map_err(|_| {
        ServiceError::invalid_field(field, format!("'{}' is not a decimal number", value))
    })?;
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(ServiceError::invalid_field(field, "must not be negative"));
    }

    let normalized = amount.normalize();
    if normalized.scale() > AMOUNT_SCALE {
        return Err(ServiceError::invalid_field(
            field,
            format!("'{}' has more than {} fraction digits", value.trim(), AMOUNT_SCALE),
        ));
    }
    if normalized.trunc() >= Decimal::from(10_i64.pow(AMOUNT_INTEGER_DIGITS)) {
        return Err(ServiceError::invalid_field(
            field,
            format!("'{}' has more than {} integer digits", value.trim(), AMOUNT_INTEGER_DIGITS),
        ));
    }
    Ok(amount)
}

pub fn is_iso_4217(code: &str) -> bool {
    CURRENCY_RE.is_match(code) && ISO_4217_CODES.contains(code)
}

pub fn validate_currency_code(field: &str, value: &str) -> Result<String, ServiceError> {
    let code = value.trim();
    if !is_iso_4217(code) {
        return Err(ServiceError::invalid_field(
            field,
            format!("'{}' is not an ISO 4217 currency code", value),
        ));
    }
    Ok(code.to_string())
}

pub fn validate_description(field: &str, value: &str) -> Result<String, ServiceError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ServiceError::invalid_field(field, "must not be empty"));
    }
    Ok(trimmed.to_string())
}

pub fn validate_numeric_id(field: &str, value: &str) -> Result<String, ServiceError> {
    let trimmed = value.trim();
    if !NUMERIC_ID_RE.is_match(trimmed) {
        return Err(ServiceError::invalid_field(
            field,
            format!("'{}' must be a numeric identifier", value),
        ));
    }
    Ok(trimmed.to_string())
}

pub fn parse_unit_code(field: &str, value: &str) -> Result<UnitCode, ServiceError> {
    UnitCode::from_str(value.trim()).map_err(|_| {
        ServiceError::invalid_field(field, format!("'{}' is not a recognized unit code", value))
    })
}
