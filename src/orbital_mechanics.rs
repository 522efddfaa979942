// Orbital Mechanics - Two-body Keplerian propagation
// Places celestial bodies in heliocentric space and spins them about their axes

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::error::{Error, Result};

// =============================================================================
// CONSTANTS
// =============================================================================

/// J2000 epoch (2000-01-01 12:00 UTC) as a Unix timestamp
pub const J2000_UNIX_SECONDS: i64 = 946_728_000;

/// Seconds in one day
pub const SECONDS_PER_DAY: f64 = 86_400.0;

/// Astronomical Unit in kilometres
pub const KM_PER_AU: f64 = 1.495978707e8;

/// Newton-Raphson iteration cap for Kepler's equation
pub const KEPLER_MAX_ITERATIONS: usize = 100;

/// Residual below which Kepler's equation counts as solved
pub const KEPLER_TOLERANCE: f64 = 1e-10;

// =============================================================================
// 3D VECTOR MATHEMATICS
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector3 {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn magnitude(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    pub fn scale(&self, s: f64) -> Self {
        Self {
            x: self.x * s,
            y: self.y * s,
            z: self.z * s,
        }
    }

    pub fn sub(&self, other: &Vector3) -> Vector3 {
        Vector3 {
            x: self.x - other.x,
            y: self.y - other.y,
            z: self.z - other.z,
        }
    }

    pub fn distance_to(&self, other: &Vector3) -> f64 {
        self.sub(other).magnitude()
    }

    /// Narrow to single precision for consumers that render in f32
    pub fn to_f32_array(&self) -> [f32; 3] {
        [self.x as f32, self.y as f32, self.z as f32]
    }
}

// =============================================================================
// BODY IDENTITY
// =============================================================================

/// Case-normalized celestial body identifier.
///
/// Every comparison, hash and registry lookup goes through this type, so
/// "Mars", "MARS" and " mars " all name the same body.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct BodyId(String);

impl BodyId {
    pub fn new(id: &str) -> Self {
        Self(id.trim().to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for BodyId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for BodyId {
    fn from(id: String) -> Self {
        Self::new(&id)
    }
}

impl From<BodyId> for String {
    fn from(id: BodyId) -> Self {
        id.0
    }
}

impl fmt::Display for BodyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// KEPLERIAN ORBITAL ELEMENTS
// =============================================================================

/// Raw body definition as produced by the resource store.
///
/// Nothing here is checked; convert into [`OrbitalElements`] to validate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BodyDefinition {
    /// Unique identifier or common name
    pub id: String,
    /// Mean orbital distance (AU)
    pub semi_major_axis_au: f64,
    /// Eccentricity, 0 is circular
    pub eccentricity: f64,
    /// Tilt of the orbit against the ecliptic (degrees)
    pub inclination_deg: f64,
    /// Longitude of the ascending node (degrees)
    pub ascending_node_deg: f64,
    /// Argument of perihelion (degrees)
    pub argument_perihelion_deg: f64,
    /// Days to complete one orbit
    pub orbital_period_days: f64,
    /// Earth days to complete one rotation
    pub rotation_period_days: f64,
    /// Axial tilt from the orbital plane (degrees)
    pub obliquity_deg: f64,
    /// Body radius (km)
    pub radius_km: f64,
}

/// Validated, immutable Keplerian elements of one celestial body.
///
/// Equality and hashing use the normalized id only.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "BodyDefinition", into = "BodyDefinition")]
pub struct OrbitalElements {
    id: BodyId,
    name: String,
    semi_major_axis_au: f64,
    eccentricity: f64,
    inclination_deg: f64,
    ascending_node_deg: f64,
    argument_perihelion_deg: f64,
    orbital_period_days: f64,
    rotation_period_days: f64,
    obliquity_deg: f64,
    radius_km: f64,
}

impl TryFrom<BodyDefinition> for OrbitalElements {
    type Error = Error;

    fn try_from(def: BodyDefinition) -> Result<Self> {
        let name = def.id.trim().to_string();
        if name.is_empty() {
            return Err(Error::invalid_elements(def.id, "empty body id"));
        }

        let fields = [
            ("semi-major axis", def.semi_major_axis_au),
            ("eccentricity", def.eccentricity),
            ("inclination", def.inclination_deg),
            ("ascending node", def.ascending_node_deg),
            ("argument of perihelion", def.argument_perihelion_deg),
            ("orbital period", def.orbital_period_days),
            ("rotation period", def.rotation_period_days),
            ("obliquity", def.obliquity_deg),
            ("radius", def.radius_km),
        ];
        if let Some((field, value)) = fields.iter().find(|(_, v)| !v.is_finite()) {
            return Err(Error::invalid_elements(
                name,
                format!("{} is not finite ({})", field, value),
            ));
        }

        if !(0.0..1.0).contains(&def.eccentricity) {
            return Err(Error::invalid_elements(
                name,
                format!("eccentricity {} outside [0, 1)", def.eccentricity),
            ));
        }
        if def.semi_major_axis_au <= 0.0 {
            return Err(Error::invalid_elements(
                name,
                format!("semi-major axis must be positive, got {}", def.semi_major_axis_au),
            ));
        }
        if def.orbital_period_days <= 0.0 {
            return Err(Error::invalid_elements(
                name,
                format!("orbital period must be positive, got {}", def.orbital_period_days),
            ));
        }
        if def.rotation_period_days <= 0.0 {
            return Err(Error::invalid_elements(
                name,
                format!("rotation period must be positive, got {}", def.rotation_period_days),
            ));
        }

        Ok(Self {
            id: BodyId::new(&name),
            name,
            semi_major_axis_au: def.semi_major_axis_au,
            eccentricity: def.eccentricity,
            inclination_deg: def.inclination_deg,
            ascending_node_deg: def.ascending_node_deg,
            argument_perihelion_deg: def.argument_perihelion_deg,
            orbital_period_days: def.orbital_period_days,
            rotation_period_days: def.rotation_period_days,
            obliquity_deg: def.obliquity_deg,
            radius_km: def.radius_km,
        })
    }
}

impl From<OrbitalElements> for BodyDefinition {
    fn from(elements: OrbitalElements) -> Self {
        Self {
            id: elements.name,
            semi_major_axis_au: elements.semi_major_axis_au,
            eccentricity: elements.eccentricity,
            inclination_deg: elements.inclination_deg,
            ascending_node_deg: elements.ascending_node_deg,
            argument_perihelion_deg: elements.argument_perihelion_deg,
            orbital_period_days: elements.orbital_period_days,
            rotation_period_days: elements.rotation_period_days,
            obliquity_deg: elements.obliquity_deg,
            radius_km: elements.radius_km,
        }
    }
}

impl PartialEq for OrbitalElements {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for OrbitalElements {}

impl Hash for OrbitalElements {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// Axial orientation of a body at an instant
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxialRotation {
    /// Static obliquity (degrees)
    pub tilt_deg: f64,
    /// Spin about the axis, in [0, 360) degrees
    pub spin_deg: f64,
}

impl OrbitalElements {
    pub fn id(&self) -> &BodyId {
        &self.id
    }

    /// Display name as originally supplied
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn semi_major_axis_au(&self) -> f64 {
        self.semi_major_axis_au
    }

    pub fn eccentricity(&self) -> f64 {
        self.eccentricity
    }

    pub fn inclination_deg(&self) -> f64 {
        self.inclination_deg
    }

    pub fn ascending_node_deg(&self) -> f64 {
        self.ascending_node_deg
    }

    pub fn argument_perihelion_deg(&self) -> f64 {
        self.argument_perihelion_deg
    }

    pub fn orbital_period_days(&self) -> f64 {
        self.orbital_period_days
    }

    pub fn rotation_period_days(&self) -> f64 {
        self.rotation_period_days
    }

    pub fn obliquity_deg(&self) -> f64 {
        self.obliquity_deg
    }

    pub fn radius_km(&self) -> f64 {
        self.radius_km
    }

    /// Heliocentric position (AU) at the given instant
    pub fn position(&self, time: DateTime<Utc>) -> Vector3 {
        self.position_at_days(days_since_j2000(time))
    }

    /// Axial tilt and spin at the given instant
    pub fn rotation(&self, time: DateTime<Utc>) -> AxialRotation {
        self.rotation_at_days(days_since_j2000(time))
    }

    /// Mean anomaly in [0, 2π] a number of days after J2000.
    ///
    /// Elapsed time is reduced to a single orbit first so long spans keep
    /// full precision in the solver.
    pub fn mean_anomaly_at_days(&self, days: f64) -> f64 {
        let phase = days.rem_euclid(self.orbital_period_days);
        (2.0 * PI / self.orbital_period_days) * phase
    }

    /// Heliocentric position (AU) a number of days after J2000
    pub fn position_at_days(&self, days: f64) -> Vector3 {
        let e = self.eccentricity;
        let mean_anomaly = self.mean_anomaly_at_days(days);

        let solution = solve_kepler_equation(mean_anomaly, e);
        if !solution.converged {
            tracing::debug!(
                body = %self.id,
                mean_anomaly,
                eccentricity = e,
                "Kepler solver hit iteration cap, using last estimate"
            );
        }

        let nu = true_anomaly(solution.eccentric_anomaly, e);
        let r = orbital_radius(self.semi_major_axis_au, e, nu);

        let i = self.inclination_deg.to_radians();
        let omega_big = self.ascending_node_deg.to_radians(); // Ω
        let omega_small = self.argument_perihelion_deg.to_radians(); // ω
        let arg = omega_small + nu;

        let (sin_arg, cos_arg) = arg.sin_cos();
        let (sin_omega, cos_omega) = omega_big.sin_cos();
        let (sin_i, cos_i) = i.sin_cos();

        Vector3::new(
            r * (cos_omega * cos_arg - sin_omega * sin_arg * cos_i),
            r * (sin_omega * cos_arg + cos_omega * sin_arg * cos_i),
            r * sin_arg * sin_i,
        )
    }

    /// Axial tilt and spin a number of days after J2000
    pub fn rotation_at_days(&self, days: f64) -> AxialRotation {
        let fraction = days / self.rotation_period_days;
        AxialRotation {
            tilt_deg: self.obliquity_deg,
            spin_deg: wrap_degrees(360.0 * fraction),
        }
    }
}

// =============================================================================
// KEPLER SOLVER
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeplerSolution {
    pub eccentric_anomaly: f64,
    pub iterations: usize,
    pub converged: bool,
}

/// Solve Kepler's equation M = E - e*sin(E) using Newton-Raphson.
///
/// Seeded with E = M. Stops once the residual drops under
/// [`KEPLER_TOLERANCE`] or after [`KEPLER_MAX_ITERATIONS`] steps; in the latter
/// case the last estimate is returned with `converged` unset.
pub fn solve_kepler_equation(mean_anomaly: f64, eccentricity: f64) -> KeplerSolution {
    let mut e_anom = mean_anomaly; // Initial guess

    for iteration in 0..KEPLER_MAX_ITERATIONS {
        let f = e_anom - eccentricity * e_anom.sin() - mean_anomaly;
        if f.abs() < KEPLER_TOLERANCE {
            return KeplerSolution {
                eccentric_anomaly: e_anom,
                iterations: iteration,
                converged: true,
            };
        }
        let f_prime = 1.0 - eccentricity * e_anom.cos();
        e_anom -= f / f_prime;
    }

    let residual = e_anom - eccentricity * e_anom.sin() - mean_anomaly;
    KeplerSolution {
        eccentric_anomaly: e_anom,
        iterations: KEPLER_MAX_ITERATIONS,
        converged: residual.abs() < KEPLER_TOLERANCE,
    }
}

/// True anomaly from eccentric anomaly
pub fn true_anomaly(eccentric_anomaly: f64, eccentricity: f64) -> f64 {
    let sqrt_term = ((1.0 + eccentricity) / (1.0 - eccentricity)).sqrt();
    let half = eccentric_anomaly / 2.0;
    2.0 * (sqrt_term * half.sin()).atan2(half.cos())
}

/// Distance from the focus at the given true anomaly
pub fn orbital_radius(semi_major_axis: f64, eccentricity: f64, true_anomaly: f64) -> f64 {
    semi_major_axis * (1.0 - eccentricity * eccentricity) / (1.0 + eccentricity * true_anomaly.cos())
}

// =============================================================================
// TIME & UNITS
// =============================================================================

/// Fractional days elapsed since J2000 (negative before the epoch)
pub fn days_since_j2000(time: DateTime<Utc>) -> f64 {
    let whole = (time.timestamp() - J2000_UNIX_SECONDS) as f64;
    let fraction = f64::from(time.timestamp_subsec_nanos()) * 1e-9;
    (whole + fraction) / SECONDS_PER_DAY
}

/// Wrap an angle into [0, 360)
pub fn wrap_degrees(angle: f64) -> f64 {
    let wrapped = angle.rem_euclid(360.0);
    // rem_euclid rounds tiny negatives up to exactly 360
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

pub fn km_to_au(km: f64) -> f64 {
    km / KM_PER_AU
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use proptest::prelude::*;
    use std::collections::HashSet;

    fn definition(id: &str, a: f64, e: f64, period: f64) -> BodyDefinition {
        BodyDefinition {
            id: id.to_string(),
            semi_major_axis_au: a,
            eccentricity: e,
            inclination_deg: 1.85061,
            ascending_node_deg: 49.57854,
            argument_perihelion_deg: 286.4623,
            orbital_period_days: period,
            rotation_period_days: 1.02596,
            obliquity_deg: 25.19,
            radius_km: 3389.5,
        }
    }

    fn mars() -> OrbitalElements {
        OrbitalElements::try_from(definition("Mars", 1.52371, 0.09339, 686.98)).unwrap()
    }

    fn kepler_residual(solution: &KeplerSolution, m: f64, e: f64) -> f64 {
        let big_e = solution.eccentric_anomaly;
        (big_e - e * big_e.sin() - m).abs()
    }

    #[test]
    fn test_kepler_residual_within_tolerance() {
        for &(m, e) in &[(1.0, 0.0), (0.5, 0.5), (3.0, 0.2), (0.1, 0.95), (6.2, 0.99)] {
            let solution = solve_kepler_equation(m, e);
            assert!(solution.converged, "M = {}, e = {}", m, e);
            assert!(solution.iterations < KEPLER_MAX_ITERATIONS);
            assert!(kepler_residual(&solution, m, e) < KEPLER_TOLERANCE);
        }
    }

    #[test]
    fn test_kepler_zero_eccentricity_returns_seed() {
        let solution = solve_kepler_equation(2.5, 0.0);
        assert_eq!(solution.eccentric_anomaly, 2.5);
        assert_eq!(solution.iterations, 0);
    }

    #[test]
    fn test_kepler_cap_returns_last_estimate() {
        let solution = solve_kepler_equation(f64::NAN, 0.5);
        assert_eq!(solution.iterations, KEPLER_MAX_ITERATIONS);
        assert!(!solution.converged);
        assert!(solution.eccentric_anomaly.is_nan());
    }

    #[test]
    fn test_position_with_non_finite_time_does_not_panic() {
        let body = mars();
        let position = body.position_at_days(f64::INFINITY);
        assert!(!position.magnitude().is_finite());
        let position = body.position_at_days(f64::NAN);
        assert!(!position.magnitude().is_finite());
    }

    #[test]
    fn test_mean_anomaly_reduced_over_long_spans() {
        let body = OrbitalElements::try_from(definition("comet", 3.0, 0.6, 1900.0)).unwrap();
        for &days in &[3e15, -3e15, 1e12, 475.0] {
            let m = body.mean_anomaly_at_days(days);
            assert!((0.0..=2.0 * PI).contains(&m), "days = {}, M = {}", days, m);
            let solution = solve_kepler_equation(m, body.eccentricity());
            assert!(solution.converged);
            assert!(kepler_residual(&solution, m, body.eccentricity()) < KEPLER_TOLERANCE);
        }
        assert!((body.mean_anomaly_at_days(475.0) - PI / 2.0).abs() < 1e-12);
        assert!(
            (body.mean_anomaly_at_days(1900.0 * 1e6 + 475.0) - PI / 2.0).abs() < 1e-6
        );
    }

    #[test]
    fn test_kepler_stops_early_when_seed_is_exact() {
        let solution = solve_kepler_equation(0.0, 0.7);
        assert_eq!(solution.iterations, 0);
        assert_eq!(solution.eccentric_anomaly, 0.0);
    }

    #[test]
    fn test_perihelion_and_aphelion_radius() {
        let a = 2.0;
        let e = 0.3;
        assert!((orbital_radius(a, e, 0.0) - a * (1.0 - e)).abs() < 1e-12);
        assert!((orbital_radius(a, e, PI) - a * (1.0 + e)).abs() < 1e-12);
    }

    #[test]
    fn test_position_at_epoch_is_perihelion() {
        let body = mars();
        let r = body.position_at_days(0.0).magnitude();
        let expected = body.semi_major_axis_au() * (1.0 - body.eccentricity());
        assert!((r - expected).abs() < 1e-9, "r = {}", r);
    }

    #[test]
    fn test_position_half_period_is_aphelion() {
        let body = mars();
        let r = body
            .position_at_days(body.orbital_period_days() / 2.0)
            .magnitude();
        let expected = body.semi_major_axis_au() * (1.0 + body.eccentricity());
        assert!((r - expected).abs() < 1e-9, "r = {}", r);
    }

    #[test]
    fn test_uninclined_orbit_stays_in_ecliptic() {
        let mut def = definition("flat", 1.0, 0.2, 365.0);
        def.inclination_deg = 0.0;
        let body = OrbitalElements::try_from(def).unwrap();
        for day in [0.0, 17.0, 100.5, 250.0] {
            assert!(body.position_at_days(day).z.abs() < 1e-12);
        }
    }

    #[test]
    fn test_position_and_rotation_are_bitwise_repeatable() {
        let body = mars();
        let time = Utc.with_ymd_and_hms(2012, 2, 5, 0, 0, 0).unwrap();
        assert_eq!(body.position(time), body.position(time));
        assert_eq!(body.rotation(time), body.rotation(time));
    }

    #[test]
    fn test_rotation_spin_wraps() {
        let body = mars();
        let rotation = body.rotation_at_days(body.rotation_period_days() * 2.5);
        assert!((rotation.spin_deg - 180.0).abs() < 1e-9);
        assert_eq!(rotation.tilt_deg, 25.19);

        let before_epoch = body.rotation_at_days(-body.rotation_period_days() * 0.25);
        assert!((before_epoch.spin_deg - 270.0).abs() < 1e-9);
    }

    #[test]
    fn test_wrap_degrees_range() {
        assert_eq!(wrap_degrees(0.0), 0.0);
        assert_eq!(wrap_degrees(360.0), 0.0);
        assert!((wrap_degrees(-90.0) - 270.0).abs() < 1e-12);
        assert!((wrap_degrees(725.0) - 5.0).abs() < 1e-12);
        assert!(wrap_degrees(-1e-20) < 360.0);
    }

    #[test]
    fn test_days_since_j2000() {
        let epoch = Utc.with_ymd_and_hms(2000, 1, 1, 12, 0, 0).unwrap();
        assert_eq!(days_since_j2000(epoch), 0.0);
        assert!((days_since_j2000(epoch + Duration::hours(36)) - 1.5).abs() < 1e-12);
        assert!((days_since_j2000(epoch - Duration::days(2)) + 2.0).abs() < 1e-12);
        assert!(
            (days_since_j2000(epoch + Duration::milliseconds(43_200_500)) - 0.500_005_787).abs()
                < 1e-9
        );
    }

    #[test]
    fn test_invalid_elements_rejected() {
        let cases = [
            definition("x", 1.0, 1.0, 365.0),
            definition("x", 1.0, -0.1, 365.0),
            definition("x", 0.0, 0.1, 365.0),
            definition("x", 1.0, 0.1, 0.0),
            definition("x", 1.0, f64::NAN, 365.0),
            definition("", 1.0, 0.1, 365.0),
        ];
        for def in cases {
            let result = OrbitalElements::try_from(def.clone());
            assert!(
                matches!(result, Err(Error::InvalidElements { .. })),
                "accepted {:?}",
                def
            );
        }

        let mut spinless = definition("x", 1.0, 0.1, 365.0);
        spinless.rotation_period_days = -1.0;
        assert!(OrbitalElements::try_from(spinless).is_err());
    }

    #[test]
    fn test_identity_is_case_insensitive() {
        let upper = OrbitalElements::try_from(definition("MARS", 1.0, 0.1, 300.0)).unwrap();
        let lower = mars();
        assert_eq!(upper, lower);
        assert_eq!(upper.id().as_str(), "mars");
        assert_eq!(upper.name(), "MARS");

        let set: HashSet<OrbitalElements> = [upper, lower].into_iter().collect();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_deserialize_validates() {
        let json = r#"{
            "id": "Comet",
            "semi_major_axis_au": 17.8,
            "eccentricity": 1.2,
            "inclination_deg": 162.3,
            "ascending_node_deg": 58.4,
            "argument_perihelion_deg": 111.3,
            "orbital_period_days": 27500.0,
            "rotation_period_days": 2.2,
            "obliquity_deg": 0.0,
            "radius_km": 5.5
        }"#;
        assert!(serde_json::from_str::<OrbitalElements>(json).is_err());

        let valid = json.replace("1.2", "0.967");
        let comet: OrbitalElements = serde_json::from_str(&valid).unwrap();
        assert_eq!(comet.id().as_str(), "comet");
    }

    #[test]
    fn test_f32_boundary() {
        let v = Vector3::new(1.5, -2.25, 1e-3);
        assert_eq!(v.to_f32_array(), [1.5f32, -2.25f32, 1e-3f32]);
        assert!((km_to_au(KM_PER_AU) - 1.0).abs() < 1e-15);
    }

    proptest! {
        #[test]
        fn prop_position_is_periodic(
            a in 0.1f64..40.0,
            e in 0.0f64..0.8,
            period in 10.0f64..70_000.0,
            start in -2_000.0f64..2_000.0,
            k in -5i32..5,
        ) {
            let body = OrbitalElements::try_from(definition("p", a, e, period)).unwrap();
            let p0 = body.position_at_days(start);
            let pk = body.position_at_days(start + f64::from(k) * period);
            prop_assert!(p0.distance_to(&pk) < 1e-6 * a, "{:?} vs {:?}", p0, pk);
        }

        #[test]
        fn prop_radius_within_apsides(
            a in 0.1f64..40.0,
            e in 0.0f64..0.8,
            days in -50_000.0f64..50_000.0,
        ) {
            let body = OrbitalElements::try_from(definition("p", a, e, 400.0)).unwrap();
            let r = body.position_at_days(days).magnitude();
            prop_assert!(r >= a * (1.0 - e) - 1e-9);
            prop_assert!(r <= a * (1.0 + e) + 1e-9);
        }
    }
}
