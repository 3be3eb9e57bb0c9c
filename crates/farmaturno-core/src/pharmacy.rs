//! Pharmacy records and the persisted dataset document.

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Stored when the upstream detail carries no usable on-duty schedule.
pub const SCHEDULE_NOT_SPECIFIED: &str = "No especificado";

/// Key under which the normalized on-duty schedule is persisted.
pub const SCHEDULE_KEY: &str = "horario_turno";

/// Keys the stub contributes to the merged record.
pub const STUB_ID_KEY: &str = "im";
pub const STUB_LATITUDE_KEY: &str = "lat";
pub const STUB_LONGITUDE_KEY: &str = "lng";

/// A scalar passed through from the upstream API exactly as received.
///
/// Upstream sends ids and coordinates sometimes as strings and sometimes as
/// numbers; the persisted record keeps whichever it was.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawField(Value);

impl RawField {
    /// Returns `None` for `null`, objects and arrays.
    #[must_use]
    pub fn from_scalar(value: Value) -> Option<Self> {
        match value {
            Value::String(_) | Value::Number(_) | Value::Bool(_) => Some(Self(value)),
            Value::Null | Value::Array(_) | Value::Object(_) => None,
        }
    }

    /// Renders the value the way it must appear in a form-encoded body.
    #[must_use]
    pub fn as_form_value(&self) -> String {
        match &self.0 {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }

    #[must_use]
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    #[must_use]
    pub fn into_value(self) -> Value {
        self.0
    }
}

/// Minimal identity and coordinates of an on-duty pharmacy, as listed by
/// the per-region discovery call.
#[derive(Debug, Clone, PartialEq)]
pub struct PharmacyStub {
    pub id: RawField,
    pub latitude: RawField,
    pub longitude: RawField,
}

impl PharmacyStub {
    fn into_fields(self) -> Map<String, Value> {
        let mut fields = Map::new();
        fields.insert(STUB_ID_KEY.to_string(), self.id.into_value());
        fields.insert(STUB_LATITUDE_KEY.to_string(), self.latitude.into_value());
        fields.insert(STUB_LONGITUDE_KEY.to_string(), self.longitude.into_value());
        fields
    }
}

/// A fully merged pharmacy record. The field set is open-ended: whatever the
/// upstream detail response carries is kept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Pharmacy(Map<String, Value>);

impl Pharmacy {
    /// Merge a stub with its detail record and normalized schedule.
    ///
    /// Later sources win on key collisions: stub, then detail, then the
    /// schedule.
    #[must_use]
    pub fn merge(stub: PharmacyStub, detail: Map<String, Value>, schedule: String) -> Self {
        let mut fields = stub.into_fields();
        fields.extend(detail);
        fields.insert(SCHEDULE_KEY.to_string(), Value::String(schedule));
        Self(fields)
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    #[must_use]
    pub fn schedule(&self) -> Option<&str> {
        self.0.get(SCHEDULE_KEY).and_then(Value::as_str)
    }

    #[must_use]
    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }
}

/// The root persisted document, replaced wholesale on every successful run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    #[serde(rename = "fechaActualizacion")]
    pub generated_at: DateTime<Utc>,
    #[serde(rename = "farmacias")]
    pub pharmacies: Vec<Pharmacy>,
}

impl Dataset {
    /// Stamp a dataset with the current time at millisecond precision.
    #[must_use]
    pub fn now(pharmacies: Vec<Pharmacy>) -> Self {
        Self {
            generated_at: Utc::now().trunc_subsecs(3),
            pharmacies,
        }
    }
}
