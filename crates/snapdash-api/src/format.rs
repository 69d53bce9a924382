//! Display strings for aggregate values
//!
//! The engine returns raw numbers; these helpers render them the way the
//! dashboard shows them (`1,234`, `91.3%`, `4.4/5`, `15.75`).

use snapdash_store::{FooterTotals, Stat, StatUnit, StatValue};
use std::collections::BTreeMap;

/// `1234567` → `"1,234,567"`
pub fn thousands(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if value < 0 {
        out.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Shortest decimal form, always with at least one fractional digit
pub fn decimal(value: f64) -> String {
    if value.fract() == 0.0 && value.is_finite() {
        format!("{:.1}", value)
    } else {
        value.to_string()
    }
}

pub fn stat_value(value: StatValue, unit: StatUnit) -> String {
    let number = match value {
        StatValue::Count(v) => thousands(v),
        StatValue::Amount(v) => decimal(v),
    };
    match unit {
        StatUnit::Plain => number,
        StatUnit::Percent => format!("{}%", number),
        StatUnit::OutOfFive => format!("{}/5", number),
    }
}

pub fn stat(stat: &Stat) -> String {
    stat_value(stat.value, stat.unit)
}

/// Footer totals keyed `a`..`g`, `total`
pub fn footer(totals: &FooterTotals) -> BTreeMap<String, String> {
    totals
        .entries()
        .iter()
        .map(|(key, value)| (key.to_string(), thousands(*value)))
        .collect()
}
