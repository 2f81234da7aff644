//! Response normalizer
//!
//! Upstream schemas vary by account tier and API version, so every value is
//! located through an ordered list of JSON-pointer field paths. The first
//! path whose value coerces to a finite number wins. Absent or malformed
//! structure yields `None`, never an error.

use serde_json::Value;

/// Ordered extraction rules for one provider field
#[derive(Debug, Clone, Copy)]
pub struct ExtractionRules {
    /// Rule set name (for logging)
    pub name: &'static str,
    /// JSON pointers, tried in order
    pub paths: &'static [&'static str],
}

/// ATTOM AVM amount (`avm/detail` responses)
pub const ATTOM_AVM: ExtractionRules = ExtractionRules {
    name: "attom-avm",
    paths: &["/property/0/avm/amount/value", "/property/0/avm/amount"],
};

/// ATTOM assessment value, relative to a single `property[]` record
///
/// Market assessment is preferred over the tax assessed total.
pub const ATTOM_ASSESSMENT: ExtractionRules = ExtractionRules {
    name: "attom-assessment",
    paths: &[
        "/assessment/market/mktTtlValue",
        "/assessment/tax/assdTtlValue",
    ],
};

/// RentCast value estimate (`avm/value` responses)
pub const RENTCAST_AVM: ExtractionRules = ExtractionRules {
    name: "rentcast-avm",
    paths: &["/price", "/value", "/avm/value", "/avm"],
};

impl ExtractionRules {
    /// Apply the rules in priority order and return the first number found
    pub fn extract(&self, raw: &Value) -> Option<f64> {
        self.paths
            .iter()
            .filter_map(|path| raw.pointer(path))
            .find_map(coerce_number)
    }
}

/// Coerce a JSON value to a finite number
///
/// Numbers pass through; strings are trimmed and parsed. Everything else,
/// including empty strings, is treated as absent.
pub fn coerce_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return None;
            }
            trimmed.parse::<f64>().ok()?
        }
        _ => return None,
    };

    number.is_finite().then_some(number)
}

/// First record of an ATTOM `property` array, if any
pub fn attom_property(raw: &Value) -> Option<&Value> {
    raw.pointer("/property/0")
}

/// ATTOM internal property identifier from a `property[]` record
///
/// ATTOM ids are usually numeric; strings are accepted as-is. Empty strings
/// and zero are not usable identifiers.
pub fn attom_identifier(property: &Value) -> Option<String> {
    match property.pointer("/identifier/attomId")? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => {
            if let Some(id) = n.as_u64() {
                (id != 0).then(|| id.to_string())
            } else if let Some(id) = n.as_i64() {
                (id != 0).then(|| id.to_string())
            } else {
                n.as_f64()
                    .filter(|f| f.is_finite() && *f != 0.0)
                    .map(|f| f.to_string())
            }
        }
        _ => None,
    }
}
