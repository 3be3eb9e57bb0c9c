//! Upstream response shapes and their lenient parsing.
//!
//! Both calls answer with `{ correcto, respuesta }`. The payload inside
//! `respuesta` is loosely typed upstream (strings vs numbers, object vs
//! single-element array), so it is walked as [`serde_json::Value`] rather
//! than deserialized into rigid structs.

use farmaturno_core::{PharmacyStub, RawField};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::ScraperError;
use crate::normalize::normalize_schedule;

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    correcto: Value,
    #[serde(default)]
    respuesta: Value,
}

/// A detail response reduced to the record and its cleaned schedule.
#[derive(Debug, Clone, PartialEq)]
pub struct DetailRecord {
    pub local: Map<String, Value>,
    pub schedule: String,
}

/// JavaScript truthiness, which is how the upstream's own client reads
/// `correcto`.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn open_envelope(body: Value, context: &str) -> Result<Value, ScraperError> {
    let envelope: Envelope =
        serde_json::from_value(body).map_err(|source| ScraperError::Deserialize {
            context: context.to_owned(),
            source,
        })?;
    if !is_truthy(&envelope.correcto) {
        return Err(ScraperError::Unsuccessful {
            context: context.to_owned(),
        });
    }
    Ok(envelope.respuesta)
}

/// Extracts the pharmacy stubs from a region discovery response.
///
/// Entries lacking a scalar `im`, `lt` or `lg` are skipped; the rest keep
/// their upstream order. Duplicate ids are preserved.
///
/// # Errors
///
/// - [`ScraperError::Deserialize`] if the body is not an envelope object.
/// - [`ScraperError::Unsuccessful`] if `correcto` is falsy.
/// - [`ScraperError::Malformed`] if `respuesta.locales` is not an array.
pub fn parse_region_stubs(body: Value, context: &str) -> Result<Vec<PharmacyStub>, ScraperError> {
    let mut respuesta = open_envelope(body, context)?;

    let Some(Value::Array(locales)) = respuesta.get_mut("locales").map(Value::take) else {
        return Err(ScraperError::Malformed {
            context: context.to_owned(),
            reason: "respuesta.locales is not an array".to_owned(),
        });
    };

    let total = locales.len();
    let stubs: Vec<PharmacyStub> = locales.into_iter().filter_map(stub_from_local).collect();

    if stubs.len() < total {
        tracing::debug!(
            context,
            skipped = total - stubs.len(),
            "skipping locales entries without im/lt/lg"
        );
    }
    Ok(stubs)
}

fn stub_from_local(local: Value) -> Option<PharmacyStub> {
    let Value::Object(mut fields) = local else {
        return None;
    };
    let mut take = |key: &str| fields.remove(key).and_then(RawField::from_scalar);
    Some(PharmacyStub {
        id: take("im")?,
        latitude: take("lt")?,
        longitude: take("lg")?,
    })
}

/// Extracts the detail record and normalized on-duty schedule.
///
/// When `respuesta.local` is an array only its first element is used.
///
/// # Errors
///
/// - [`ScraperError::Deserialize`] if the body is not an envelope object.
/// - [`ScraperError::Unsuccessful`] if `correcto` is falsy.
/// - [`ScraperError::Malformed`] if `respuesta.local` is missing, empty, or
///   not an object.
pub fn parse_detail(body: Value, context: &str) -> Result<DetailRecord, ScraperError> {
    let mut respuesta = open_envelope(body, context)?;

    let local = match respuesta.get_mut("local").map(Value::take) {
        Some(Value::Object(local)) => local,
        Some(Value::Array(items)) => match items.into_iter().next() {
            Some(Value::Object(local)) => local,
            _ => {
                return Err(ScraperError::Malformed {
                    context: context.to_owned(),
                    reason: "respuesta.local array is empty or holds a non-object".to_owned(),
                })
            }
        },
        _ => {
            return Err(ScraperError::Malformed {
                context: context.to_owned(),
                reason: "respuesta.local is missing".to_owned(),
            })
        }
    };

    let turno = respuesta
        .get("horario")
        .and_then(|h| h.get("turno"))
        .and_then(Value::as_str);

    Ok(DetailRecord {
        local,
        schedule: normalize_schedule(turno),
    })
}
