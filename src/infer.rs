//! Column type inference from sampled CSV values.
//!
//! A column is classified as one of four storage types. Numeric columns need
//! a clear majority (more than 80% of non-blank samples); scientific-notation
//! literals push a column to text so their literal precision survives, and a
//! single out-of-range exponent literal forces text regardless of the
//! majority. Date/time detection only runs when the numeric test fails and
//! accepts any value that begins with a date.

use std::{fmt, sync::LazyLock};

use chrono::{NaiveDate, NaiveDateTime};
use regex::Regex;
use serde::{Deserialize, Serialize};

const NUMERIC_MAJORITY_PERCENT: usize = 80;

static NUMERIC_LITERAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[+-]?(?:\d+(?:\.\d*)?|\.\d+)(?:[eE][+-]?\d+)?$").expect("valid numeric regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ColumnType {
    Integer,
    Decimal,
    DateTime,
    Text,
}

impl ColumnType {
    /// Column type as written in a CREATE TABLE statement.
    pub fn sql_type(self) -> &'static str {
        match self {
            ColumnType::Integer => "INTEGER",
            ColumnType::Decimal => "DECIMAL(10, 4)",
            ColumnType::DateTime => "DATETIME",
            ColumnType::Text => "TEXT",
        }
    }

    pub fn is_numeric(self) -> bool {
        matches!(self, ColumnType::Integer | ColumnType::Decimal)
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ColumnType::Integer => "INTEGER",
            ColumnType::Decimal => "DECIMAL",
            ColumnType::DateTime => "DATETIME",
            ColumnType::Text => "TEXT",
        };
        f.write_str(label)
    }
}

/// Shape of a token that parses as a number.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NumericLiteral {
    pub value: f64,
    pub has_decimal_point: bool,
    pub has_exponent: bool,
    /// The literal overflows to infinity or underflows below the smallest
    /// normal `f64` even though its mantissa is non-zero.
    pub unsafe_magnitude: bool,
}

pub fn analyze_numeric(token: &str) -> Option<NumericLiteral> {
    let trimmed = token.trim();
    if !NUMERIC_LITERAL.is_match(trimmed) {
        return None;
    }
    let value: f64 = trimmed.parse().ok()?;
    let mantissa = trimmed.split(['e', 'E']).next().unwrap_or(trimmed);
    let mantissa_nonzero = mantissa.chars().any(|c| matches!(c, '1'..='9'));
    let unsafe_magnitude = value.is_infinite()
        || (value == 0.0 && mantissa_nonzero)
        || (value != 0.0 && value.abs() < f64::MIN_POSITIVE);
    Some(NumericLiteral {
        value,
        has_decimal_point: mantissa.contains('.'),
        has_exponent: mantissa.len() != trimmed.len(),
        unsafe_magnitude,
    })
}

#[derive(Debug, Clone, Copy)]
enum DatePattern {
    IsoDate,
    UsDate,
    IsoDateTime,
}

impl DatePattern {
    const ALL: [DatePattern; 3] = [
        DatePattern::IsoDate,
        DatePattern::UsDate,
        DatePattern::IsoDateTime,
    ];

    /// True when `value` starts with a valid date in this pattern; trailing
    /// text such as a time zone or fractional seconds is ignored.
    fn matches(self, value: &str) -> bool {
        match self {
            DatePattern::IsoDate => NaiveDate::parse_and_remainder(value, "%Y-%m-%d").is_ok(),
            DatePattern::UsDate => NaiveDate::parse_and_remainder(value, "%m/%d/%Y").is_ok(),
            DatePattern::IsoDateTime => {
                NaiveDateTime::parse_and_remainder(value, "%Y-%m-%d %H:%M:%S").is_ok()
            }
        }
    }
}

/// Running counts for one column's samples.
#[derive(Debug, Clone, Default)]
pub struct TypeTally {
    non_blank: usize,
    numeric: usize,
    decimal_points: usize,
    exponents: usize,
    unsafe_exponents: usize,
    date_matches: [usize; 3],
}

impl TypeTally {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, value: &str) {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return;
        }
        self.non_blank += 1;

        if let Some(literal) = analyze_numeric(trimmed) {
            self.numeric += 1;
            if literal.has_decimal_point {
                self.decimal_points += 1;
            }
            if literal.has_exponent {
                self.exponents += 1;
                if literal.unsafe_magnitude {
                    self.unsafe_exponents += 1;
                }
            }
        }

        for (idx, pattern) in DatePattern::ALL.iter().enumerate() {
            if pattern.matches(trimmed) {
                self.date_matches[idx] += 1;
            }
        }
    }

    pub fn non_blank(&self) -> usize {
        self.non_blank
    }

    fn numeric_majority(&self) -> bool {
        self.numeric * 100 > self.non_blank * NUMERIC_MAJORITY_PERCENT
    }

    pub fn decide(&self) -> ColumnType {
        if self.non_blank == 0 || self.unsafe_exponents > 0 {
            return ColumnType::Text;
        }
        if self.numeric_majority() {
            return if self.exponents > 0 {
                ColumnType::Text
            } else if self.decimal_points > 0 {
                ColumnType::Decimal
            } else {
                ColumnType::Integer
            };
        }
        if self
            .date_matches
            .iter()
            .any(|count| *count == self.non_blank)
        {
            return ColumnType::DateTime;
        }
        ColumnType::Text
    }
}

pub fn infer_column_type<S: AsRef<str>>(samples: &[S]) -> ColumnType {
    let mut tally = TypeTally::new();
    for sample in samples {
        tally.update(sample.as_ref());
    }
    tally.decide()
}
