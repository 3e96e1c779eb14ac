//! Module containing the longitudinal force model and road-load / traction
//! composition.
//!
//! All functions are pure. Forces that resist motion carry the sign of the
//! (relative) speed through [utils::signed_magnitude], so a vehicle at rest
//! sees exactly `0.0` rolling and aerodynamic force.

use crate::environment::EnvironmentState;
use crate::imports::*;
use crate::vehicle::VehicleParameters;

/// Rolling resistance force, $N$
///
/// $F_{rr} = \operatorname{sgn}(v) \, m g \cos\theta \, (C_0 + C_1 v^2)$
///
/// # Arguments
/// - mass_kg: vehicle mass
/// - road_angle_rad: road inclination, positive uphill
/// - speed_mps: vehicle speed, sign encodes direction of travel
/// - rr_coef_static: C0
/// - rr_coef_speed: C1
pub fn rolling_force(
    mass_kg: f64,
    road_angle_rad: f64,
    speed_mps: f64,
    rr_coef_static: f64,
    rr_coef_speed: f64,
) -> f64 {
    utils::signed_magnitude(
        mass_kg
            * params::A_GRAV_MPS2
            * road_angle_rad.cos()
            * (rr_coef_static + rr_coef_speed * speed_mps.powi(2)),
        speed_mps,
    )
}

/// Gravitational force along the road, $N$, positive uphill
pub fn gravitational_force(mass_kg: f64, road_angle_rad: f64) -> f64 {
    mass_kg * params::A_GRAV_MPS2 * road_angle_rad.sin()
}

/// Aerodynamic drag force, $N$
///
/// # Arguments
/// - rel_speed_mps: vehicle speed plus headwind speed
/// - frontal_area_m2: vehicle frontal area
/// - air_density_kg_per_m3: air density
/// - drag_coef: drag coefficient
pub fn aero_drag_force(
    rel_speed_mps: f64,
    frontal_area_m2: f64,
    air_density_kg_per_m3: f64,
    drag_coef: f64,
) -> f64 {
    utils::signed_magnitude(
        0.5 * air_density_kg_per_m3 * drag_coef * frontal_area_m2 * rel_speed_mps.powi(2),
        rel_speed_mps,
    )
}

/// Road load, $N$: plain sum of rolling, gravitational and drag forces
pub fn road_load_force(rolling_n: f64, gravitational_n: f64, drag_n: f64) -> f64 {
    rolling_n + gravitational_n + drag_n
}

/// Traction force, $N$: road load plus inertial force scaled by the
/// rotational inertia factor
pub fn traction_force(
    road_load_n: f64,
    mass_kg: f64,
    accel_mps2: f64,
    rot_inertia_factor: f64,
) -> f64 {
    road_load_n + rot_inertia_factor * mass_kg * accel_mps2
}

/// Traction force needed to hold or climb a grade of `gradeability_pct`
/// percent at near-zero speed, where drag is negligible, $N$
pub fn required_tractive_force_near_zero(mass_kg: f64, gradeability_pct: f64) -> f64 {
    let tan_angle = params::grade_pct_to_rad(gradeability_pct).tan();
    mass_kg * params::A_GRAV_MPS2 * tan_angle / (1.0 + tan_angle.powi(2)).sqrt()
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Default)]
/// Instantaneous kinematic state
pub struct KinematicSample {
    /// Speed, sign encodes direction of travel, $\frac{m}{s}$
    pub speed_mps: f64,
    /// Acceleration, $\frac{m}{s^2}$
    pub accel_mps2: f64,
    /// Timestamp, $s$
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_s: Option<f64>,
}

impl KinematicSample {
    pub fn new(speed_mps: f64, accel_mps2: f64) -> Self {
        Self {
            speed_mps,
            accel_mps2,
            time_s: None,
        }
    }

    pub fn at_time(self, time_s: f64) -> Self {
        Self {
            time_s: Some(time_s),
            ..self
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Default)]
/// Force breakdown for one kinematic sample, all in $N$
pub struct ForceComponents {
    pub rolling_n: f64,
    pub gravitational_n: f64,
    pub drag_n: f64,
    pub road_load_n: f64,
    pub traction_n: f64,
}

impl ForceComponents {
    /// Evaluates the full force balance for `sample`
    pub fn new(
        veh: &VehicleParameters,
        env: &EnvironmentState,
        sample: &KinematicSample,
    ) -> Self {
        let rolling_n = rolling_force(
            veh.mass_kg,
            env.road_angle_rad,
            sample.speed_mps,
            veh.rr_coef_static,
            veh.rr_coef_speed,
        );
        let gravitational_n = gravitational_force(veh.mass_kg, env.road_angle_rad);
        let drag_n = aero_drag_force(
            env.relative_speed_mps(sample.speed_mps),
            veh.frontal_area_m2,
            env.air_density_kg_per_m3,
            env.drag_coef,
        );
        let road_load_n = road_load_force(rolling_n, gravitational_n, drag_n);
        let traction_n = traction_force(
            road_load_n,
            veh.mass_kg,
            sample.accel_mps2,
            veh.rot_inertia_factor,
        );
        Self {
            rolling_n,
            gravitational_n,
            drag_n,
            road_load_n,
            traction_n,
        }
    }

    /// Inertial part of the traction force, $N$
    pub fn inertial_n(&self) -> f64 {
        self.traction_n - self.road_load_n
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vehicle::mock_vehicle;

    #[test]
    fn test_zero_speed_gives_positive_zero() {
        for (c0, c1) in [(0.008, 1.6e-6), (0.0, 0.0), (0.02, 1e-3)] {
            let f = rolling_force(2570.0, 0.1, 0.0, c0, c1);
            assert_eq!(f.to_bits(), 0.0f64.to_bits());
            let f = rolling_force(2570.0, 0.1, -0.0, c0, c1);
            assert_eq!(f.to_bits(), 0.0f64.to_bits());
        }
        assert_eq!(aero_drag_force(0.0, 7.5, 1.22007, 0.4).to_bits(), 0.0f64.to_bits());
        assert_eq!(aero_drag_force(-0.0, 7.5, 1.22007, 0.4).to_bits(), 0.0f64.to_bits());
    }

    #[test]
    fn test_rolling_force_at_100_kph() {
        let speed_mps = 27.78;
        let f = rolling_force(2570.0, 0.0, speed_mps, 0.008, 0.0000016);
        let expected = 2570.0 * 9.81 * (0.008 + 0.0000016 * speed_mps * speed_mps);
        assert!(utils::almost_eq(f, expected, None));
        assert!(utils::almost_eq(f, 232.824, Some(1e-5)));
        assert!(f > 0.0);
    }

    #[test]
    fn test_forces_oppose_motion() {
        assert!(rolling_force(2570.0, 0.0, -10.0, 0.008, 1.6e-6) < 0.0);
        assert!(aero_drag_force(-10.0, 7.5, 1.22007, 0.4) < 0.0);
        assert_eq!(
            aero_drag_force(-10.0, 7.5, 1.22007, 0.4),
            -aero_drag_force(10.0, 7.5, 1.22007, 0.4)
        );
        // 0.5 * 1.22007 * 0.4 * 7.5 * 100
        assert!(utils::almost_eq(
            aero_drag_force(10.0, 7.5, 1.22007, 0.4),
            183.0105,
            None
        ));
    }

    #[test]
    fn test_gravitational_force_sign() {
        assert!(gravitational_force(2570.0, 0.1) > 0.0);
        assert!(gravitational_force(2570.0, -0.1) < 0.0);
        assert_eq!(gravitational_force(2570.0, 0.0), 0.0);
    }

    #[test]
    fn test_road_load_is_exact_sum() {
        for (r, g, d) in [(1.0, 2.0, 3.0), (232.8, -1500.25, 183.0105), (0.1, 0.2, 0.3)] {
            assert_eq!(road_load_force(r, g, d), r + g + d);
        }
    }

    #[test]
    fn test_traction_force() {
        assert_eq!(traction_force(100.0, 2570.0, 1.0, 1.0), 2670.0);
        assert!(utils::almost_eq(
            traction_force(100.0, 2570.0, 1.5, 1.1),
            100.0 + 1.1 * 2570.0 * 1.5,
            None
        ));
    }

    #[test]
    fn test_tractive_force_near_zero_matches_sine() {
        let f = required_tractive_force_near_zero(2570.0, 25.0);
        let by_sine = 2570.0 * 9.81 * 0.25f64.atan().sin();
        assert!(utils::almost_eq(f, by_sine, Some(1e-12)));
        assert!(utils::almost_eq(f, 6114.7, Some(1e-4)));
        assert_eq!(required_tractive_force_near_zero(2570.0, 0.0), 0.0);
    }

    #[test]
    fn test_force_components_deterministic() {
        let veh = mock_vehicle();
        let env = EnvironmentState::default()
            .with_grade_pct(5.0)
            .with_headwind_kph(10.0);
        let sample = KinematicSample::new(20.0, 0.5);
        let a = ForceComponents::new(&veh, &env, &sample);
        let b = ForceComponents::new(&veh, &env, &sample);
        assert_eq!(a, b);
        assert_eq!(a.road_load_n, a.rolling_n + a.gravitational_n + a.drag_n);
        assert!(utils::almost_eq(a.inertial_n(), 1.1 * 2570.0 * 0.5, Some(1e-9)));
    }

    #[test]
    fn test_headwind_at_rest_produces_drag() {
        let veh = mock_vehicle();
        let env = EnvironmentState::default().with_headwind_kph(36.0);
        let fc = ForceComponents::new(&veh, &env, &KinematicSample::default());
        assert_eq!(fc.rolling_n, 0.0);
        assert!(fc.drag_n > 0.0);
    }
}
