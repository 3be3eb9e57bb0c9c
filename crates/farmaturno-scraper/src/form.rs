//! Form bodies for the two upstream calls.

use chrono::{DateTime, TimeZone};
use farmaturno_core::{PharmacyStub, RegionCode};

/// Date and time-of-day sent upstream, fixed once per collection run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunStamp {
    /// `YYYY-MM-DD`
    pub date: String,
    /// `HH:MM:SS`
    pub time: String,
}

impl RunStamp {
    #[must_use]
    pub fn at<Tz: TimeZone>(instant: &DateTime<Tz>) -> Self
    where
        Tz::Offset: std::fmt::Display,
    {
        Self {
            date: instant.format("%Y-%m-%d").to_string(),
            time: instant.format("%H:%M:%S").to_string(),
        }
    }

    /// Current wall-clock time in `tz`.
    #[must_use]
    pub fn now(tz: chrono_tz::Tz) -> Self {
        Self::at(&chrono::Utc::now().with_timezone(&tz))
    }
}

/// An ordered set of form fields for one upstream POST.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamForm {
    fields: Vec<(&'static str, String)>,
}

impl UpstreamForm {
    /// Discovery call: on-duty pharmacies in one region.
    #[must_use]
    pub fn discovery(region: RegionCode, stamp: &RunStamp) -> Self {
        Self {
            fields: vec![
                ("func", "region".to_owned()),
                ("filtro", "turnos".to_owned()),
                ("fecha", stamp.date.clone()),
                ("region", region.to_string()),
                ("hora", stamp.time.clone()),
            ],
        }
    }

    /// Detail call for one discovered pharmacy.
    #[must_use]
    pub fn detail(stub: &PharmacyStub, stamp: &RunStamp) -> Self {
        Self {
            fields: vec![
                ("im", stub.id.as_form_value()),
                ("lt", stub.latitude.as_form_value()),
                ("lg", stub.longitude.as_form_value()),
                ("tp", "1".to_owned()),
                ("func", "local".to_owned()),
                ("fecha", stamp.date.clone()),
            ],
        }
    }

    #[must_use]
    pub fn fields(&self) -> &[(&'static str, String)] {
        &self.fields
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v.as_str())
    }

    /// `application/x-www-form-urlencoded` body.
    #[must_use]
    pub fn encode(&self) -> String {
        url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.fields.iter().map(|(k, v)| (*k, v.as_str())))
            .finish()
    }

    /// Short label used in logs and error contexts.
    #[must_use]
    pub fn describe(&self) -> String {
        match self.get("func") {
            Some("region") => format!("region {}", self.get("region").unwrap_or("?")),
            Some("local") => format!("pharmacy {}", self.get("im").unwrap_or("?")),
            other => format!("func={}", other.unwrap_or("?")),
        }
    }
}
