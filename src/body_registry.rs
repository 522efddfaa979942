// Body Registry - Celestial bodies keyed by case-insensitive id
// Filled once at start-up, then shared read-only between threads

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::Result;
use crate::orbital_mechanics::{BodyDefinition, BodyId, OrbitalElements};

#[derive(Debug, Default)]
pub struct BodyRegistry {
    bodies: RwLock<HashMap<BodyId, Arc<OrbitalElements>>>,
}

impl BodyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the eight planets with J2000 mean elements
    pub fn solar_system() -> Result<Self> {
        let registry = Self::new();
        for def in solar_system_definitions() {
            registry.insert(OrbitalElements::try_from(def)?);
        }
        Ok(registry)
    }

    /// Parse a JSON array of body definitions
    pub fn from_json(json: &str) -> Result<Self> {
        let definitions: Vec<BodyDefinition> = serde_json::from_str(json)?;
        let registry = Self::new();
        for def in definitions {
            registry.insert(OrbitalElements::try_from(def)?);
        }
        Ok(registry)
    }

    /// Add a body, returning whatever was registered under the same id
    pub fn insert(&self, elements: OrbitalElements) -> Option<Arc<OrbitalElements>> {
        let id = elements.id().clone();
        let previous = self.bodies.write().insert(id, Arc::new(elements));
        if let Some(replaced) = &previous {
            tracing::warn!(body = %replaced.id(), "replaced registered body");
        }
        previous
    }

    pub fn get(&self, id: &str) -> Option<Arc<OrbitalElements>> {
        self.bodies.read().get(&BodyId::new(id)).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.bodies.read().contains_key(&BodyId::new(id))
    }

    /// Sorted ids of every registered body
    pub fn ids(&self) -> Vec<BodyId> {
        let mut ids: Vec<BodyId> = self.bodies.read().keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.bodies.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.bodies.read().is_empty()
    }
}

// =============================================================================
// BUILTIN CATALOGUE
// =============================================================================

/// Planetary mean elements at J2000.
/// References: JPL "Keplerian Elements for Approximate Positions of the Major
/// Planets", NASA planetary fact sheets. Venus spins retrograde, carried by
/// its obliquity rather than a negative period.
fn solar_system_definitions() -> Vec<BodyDefinition> {
    #[rustfmt::skip]
    let rows: [(&str, [f64; 9]); 8] = [
        //            a (AU)    e        i (deg)   Ω (deg)     ω (deg)     P (d)      rot (d)   obl (deg) R (km)
        ("Mercury", [0.38710, 0.20563, 7.00497,  48.33076,  29.12703,     87.969,  58.6462,   0.034,   2439.7]),
        ("Venus",   [0.72333, 0.00677, 3.39468,  76.67984,  54.92262,    224.701, 243.018,  177.36,    6051.8]),
        ("Earth",   [1.00000, 0.01671, 0.00005, -11.26064, 114.20783,    365.256,   0.99727, 23.44,    6371.0]),
        ("Mars",    [1.52371, 0.09339, 1.84969,  49.55954, 286.53730,    686.980,   1.02596, 25.19,    3389.5]),
        ("Jupiter", [5.20289, 0.04839, 1.30439, 100.47391, 274.25457,   4332.589,   0.41354,  3.13,   69911.0]),
        ("Saturn",  [9.53668, 0.05386, 2.48599, 113.66242, 338.93646,  10759.22,    0.44401, 26.73,   58232.0]),
        ("Uranus",  [19.18916, 0.04726, 0.77264, 74.01693,  96.93735,  30685.4,     0.71833, 97.77,   25362.0]),
        ("Neptune", [30.06992, 0.00859, 1.77004, 131.78423, 273.18054, 60189.0,     0.67125, 28.32,   24622.0]),
    ];

    rows.into_iter()
        .map(|(id, [a, e, i, node, peri, period, rotation, obliquity, radius])| BodyDefinition {
            id: id.to_string(),
            semi_major_axis_au: a,
            eccentricity: e,
            inclination_deg: i,
            ascending_node_deg: node,
            argument_perihelion_deg: peri,
            orbital_period_days: period,
            rotation_period_days: rotation,
            obliquity_deg: obliquity,
            radius_km: radius,
        })
        .collect()
}

// =============================================================================
// TESTS
// =============================================================================
