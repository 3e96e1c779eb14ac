//! Module containing the environment snapshot (road and air) a vehicle operates in.

use crate::error::{ensure_finite, ensure_non_negative, ensure_positive};
use crate::imports::*;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
/// Road and air state for one evaluation:
/// * road_angle_rad, road inclination, positive uphill, $rad$
/// * headwind_mps, wind speed opposing travel (negative for tailwind), $\frac{m}{s}$
/// * air_density_kg_per_m3, $\frac{kg}{m^3}$
/// * drag_coef, aerodynamic drag coefficient of the vehicle body
pub struct EnvironmentState {
    #[serde(default)]
    pub road_angle_rad: f64,
    #[serde(default)]
    pub headwind_mps: f64,
    #[serde(default = "default_air_density")]
    pub air_density_kg_per_m3: f64,
    #[serde(default = "default_drag_coef")]
    pub drag_coef: f64,
}

fn default_air_density() -> f64 {
    params::AIR_DENSITY_KG_PER_M3
}

fn default_drag_coef() -> f64 {
    params::DRAG_COEF_DEFAULT
}

impl Default for EnvironmentState {
    fn default() -> Self {
        Self {
            road_angle_rad: 0.0,
            headwind_mps: 0.0,
            air_density_kg_per_m3: default_air_density(),
            drag_coef: default_drag_coef(),
        }
    }
}

impl SerdeAPI for EnvironmentState {
    fn init(&mut self) -> anyhow::Result<()> {
        self.validate()?;
        Ok(())
    }
}

impl EnvironmentState {
    /// Copy of `self` on a road of `grade_pct` percent slope
    pub fn with_grade_pct(self, grade_pct: f64) -> Self {
        Self {
            road_angle_rad: params::grade_pct_to_rad(grade_pct),
            ..self
        }
    }

    /// Copy of `self` with the given road angle in degrees
    pub fn with_road_angle_deg(self, road_angle_deg: f64) -> Self {
        Self {
            road_angle_rad: road_angle_deg.to_radians(),
            ..self
        }
    }

    /// Copy of `self` with the given headwind in km/h
    pub fn with_headwind_kph(self, headwind_kph: f64) -> Self {
        Self {
            headwind_mps: params::kph_to_mps(headwind_kph),
            ..self
        }
    }

    /// Relative air speed seen by a vehicle travelling at `speed_mps`
    pub fn relative_speed_mps(&self, speed_mps: f64) -> f64 {
        speed_mps + self.headwind_mps
    }

    /// Angles outside of [-pi/2, pi/2] are accepted; plausibility of the
    /// geometry is left to the caller.
    pub fn validate(&self) -> ModelResult<()> {
        ensure_finite("road_angle_rad", self.road_angle_rad)?;
        ensure_finite("headwind_mps", self.headwind_mps)?;
        ensure_positive("air_density_kg_per_m3", self.air_density_kg_per_m3)?;
        ensure_non_negative("drag_coef", self.drag_coef)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let env = EnvironmentState::default();
        assert_eq!(env.air_density_kg_per_m3, 1.22007);
        assert_eq!(env.drag_coef, 0.4);
        assert_eq!(env.road_angle_rad, 0.0);
        assert!(env.validate().is_ok());
    }

    #[test]
    fn test_builders() {
        let env = EnvironmentState::default()
            .with_grade_pct(25.0)
            .with_headwind_kph(36.0);
        assert!(utils::almost_eq(env.road_angle_rad, 0.25f64.atan(), None));
        assert!(utils::almost_eq(env.headwind_mps, 10.0, None));
        assert!(utils::almost_eq(env.relative_speed_mps(20.0), 30.0, None));
        let env = env.with_road_angle_deg(180.0);
        assert!(utils::almost_eq(env.road_angle_rad, std::f64::consts::PI, None));
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let env = EnvironmentState::from_yaml("headwind_mps: -2.5\n").unwrap();
        assert_eq!(env.headwind_mps, -2.5);
        assert_eq!(env.drag_coef, params::DRAG_COEF_DEFAULT);
        assert!(EnvironmentState::from_yaml("air_density_kg_per_m3: 0.0\n").is_err());
    }
}
