// schedule.rs — Cron-like schedule expressions.
//
// Five whitespace-separated fields: minute, hour, day-of-month, month,
// day-of-week. Each field is a comma-separated list of terms:
//
//   *        any value
//   */n      every n-th value from the field's minimum
//   n        exactly n
//   a-b      inclusive range
//   a-b/n    every n-th value within a range
//
// Day-of-week accepts 0-7, with both 0 and 7 meaning Sunday. No month or
// weekday names. "Due" means the clock's minute matches the expression —
// the scheduler's window resolution is one minute.

use std::collections::BTreeSet;

use chrono::{DateTime, Datelike, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::error::SchedulerError;

/// One parsed field: the set of matching values, or None for `*`.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Field {
    values: Option<BTreeSet<u32>>,
}

impl Field {
    fn any() -> Self {
        Self { values: None }
    }

    fn matches(&self, value: u32) -> bool {
        match &self.values {
            None => true,
            Some(values) => values.contains(&value),
        }
    }
}

/// A parsed five-field schedule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schedule {
    minute: Field,
    hour: Field,
    day_of_month: Field,
    month: Field,
    day_of_week: Field,
    /// Original expression, kept for display and serialization.
    expr: String,
}

impl Schedule {
    /// Parse a schedule expression.
    pub fn parse(expr: &str) -> Result<Self, SchedulerError> {
        let fields: Vec<&str> = expr.split_whitespace().collect();
        if fields.len() != 5 {
            return Err(SchedulerError::WrongFieldCount {
                expr: expr.to_string(),
                found: fields.len(),
            });
        }

        Ok(Self {
            minute: parse_field(fields[0], "minute", 0, 59)?,
            hour: parse_field(fields[1], "hour", 0, 23)?,
            day_of_month: parse_field(fields[2], "day-of-month", 1, 31)?,
            month: parse_field(fields[3], "month", 1, 12)?,
            day_of_week: parse_dow_field(fields[4])?,
            expr: expr.to_string(),
        })
    }

    /// Whether the schedule matches the given clock's minute window.
    pub fn is_due(&self, at: DateTime<Utc>) -> bool {
        self.minute.matches(at.minute())
            && self.hour.matches(at.hour())
            && self.day_of_month.matches(at.day())
            && self.month.matches(at.month())
            && self.day_of_week.matches(at.weekday().num_days_from_sunday())
    }

    /// The original expression text.
    pub fn expr(&self) -> &str {
        &self.expr
    }
}

impl Serialize for Schedule {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.expr)
    }
}

impl<'de> Deserialize<'de> for Schedule {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let expr = String::deserialize(deserializer)?;
        Schedule::parse(&expr).map_err(serde::de::Error::custom)
    }
}

/// Parse one field into its value set.
fn parse_field(
    input: &str,
    name: &'static str,
    min: u32,
    max: u32,
) -> Result<Field, SchedulerError> {
    if input == "*" {
        return Ok(Field::any());
    }

    let invalid = |reason: String| SchedulerError::InvalidField {
        field: name,
        value: input.to_string(),
        reason,
    };

    let mut values = BTreeSet::new();
    for term in input.split(',') {
        let (range_part, step) = match term.split_once('/') {
            Some((range, step_str)) => {
                let step: u32 = step_str
                    .parse()
                    .map_err(|_| invalid(format!("bad step '{}'", step_str)))?;
                if step == 0 {
                    return Err(invalid("step must be at least 1".to_string()));
                }
                (range, step)
            }
            None => (term, 1),
        };

        let (lo, hi) = if range_part == "*" {
            (min, max)
        } else if let Some((a, b)) = range_part.split_once('-') {
            let lo: u32 = a
                .parse()
                .map_err(|_| invalid(format!("bad range start '{}'", a)))?;
            let hi: u32 = b
                .parse()
                .map_err(|_| invalid(format!("bad range end '{}'", b)))?;
            if lo > hi {
                return Err(invalid(format!("range {}-{} is reversed", lo, hi)));
            }
            (lo, hi)
        } else {
            let v: u32 = range_part
                .parse()
                .map_err(|_| invalid(format!("bad value '{}'", range_part)))?;
            (v, v)
        };

        if lo < min || hi > max {
            return Err(invalid(format!(
                "values must be within {}-{}",
                min, max
            )));
        }

        let mut v = lo;
        while v <= hi {
            values.insert(v);
            v += step;
        }
    }

    Ok(Field {
        values: Some(values),
    })
}

/// Day-of-week accepts 0-7; 7 is folded into 0 (Sunday).
fn parse_dow_field(input: &str) -> Result<Field, SchedulerError> {
    let field = parse_field(input, "day-of-week", 0, 7)?;
    Ok(match field.values {
        None => Field::any(),
        Some(values) => Field {
            values: Some(
                values
                    .into_iter()
                    .map(|v| if v == 7 { 0 } else { v })
                    .collect(),
            ),
        },
    })
}
