//! The closed set of administrative regions queried during discovery.

use serde::{Deserialize, Serialize};

use crate::CoreError;

/// Static metadata for one region: display name and the map centre the
/// client flies to when the region is picked.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Region {
    pub code: u8,
    pub name: &'static str,
    pub latitude: f64,
    pub longitude: f64,
    pub zoom: u8,
}

/// All regions, indexed by `code - 1`.
pub const REGIONS: [Region; 16] = [
    Region { code: 1, name: "Tarapacá", latitude: -20.246, longitude: -70.0, zoom: 11 },
    Region { code: 2, name: "Antofagasta", latitude: -23.634, longitude: -70.34, zoom: 10 },
    Region { code: 3, name: "Atacama", latitude: -27.366, longitude: -70.33, zoom: 9 },
    Region { code: 4, name: "Coquimbo", latitude: -30.0, longitude: -71.21, zoom: 10 },
    Region { code: 5, name: "Valparaíso", latitude: -33.047, longitude: -71.5, zoom: 12 },
    Region { code: 6, name: "O'Higgins", latitude: -34.364, longitude: -71.07, zoom: 11 },
    Region { code: 7, name: "Maule", latitude: -35.427, longitude: -71.65, zoom: 11 },
    Region { code: 8, name: "Biobío", latitude: -37.472, longitude: -72.35, zoom: 9 },
    Region { code: 9, name: "La Araucanía", latitude: -38.739, longitude: -72.59, zoom: 11 },
    Region { code: 10, name: "Los Lagos", latitude: -41.4, longitude: -72.94, zoom: 11 },
    Region { code: 11, name: "Aysén", latitude: -45.571, longitude: -72.06, zoom: 10 },
    Region { code: 12, name: "Magallanes", latitude: -53.163, longitude: -70.91, zoom: 10 },
    Region { code: 13, name: "Metropolitana de Santiago", latitude: -33.456, longitude: -70.648, zoom: 12 },
    Region { code: 14, name: "Los Ríos", latitude: -40.0, longitude: -73.24, zoom: 10 },
    Region { code: 15, name: "Arica y Parinacota", latitude: -18.529, longitude: -70.1, zoom: 11 },
    Region { code: 16, name: "Ñuble", latitude: -36.608, longitude: -72.10, zoom: 10 },
];

/// Upstream region identifier, guaranteed to lie in `1..=16`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct RegionCode(u8);

impl RegionCode {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 16;

    /// # Errors
    ///
    /// Returns [`CoreError::InvalidRegionCode`] when `code` is outside `1..=16`.
    pub fn new(code: u8) -> Result<Self, CoreError> {
        if (Self::MIN..=Self::MAX).contains(&code) {
            Ok(Self(code))
        } else {
            Err(CoreError::InvalidRegionCode(code))
        }
    }

    /// Every region code in ascending order.
    pub fn all() -> impl Iterator<Item = RegionCode> {
        (Self::MIN..=Self::MAX).map(RegionCode)
    }

    #[must_use]
    pub fn get(self) -> u8 {
        self.0
    }

    #[must_use]
    pub fn region(self) -> &'static Region {
        &REGIONS[usize::from(self.0 - 1)]
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        self.region().name
    }
}

impl TryFrom<u8> for RegionCode {
    type Error = CoreError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<RegionCode> for u8 {
    fn from(code: RegionCode) -> Self {
        code.0
    }
}

impl std::fmt::Display for RegionCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
