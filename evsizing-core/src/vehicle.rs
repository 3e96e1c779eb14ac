//! Module containing vehicle parameters for longitudinal dynamics.

use crate::error::{ensure_non_negative, ensure_positive};
use crate::imports::*;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
/// Struct containing the vehicle parameters that enter the force balance.
///
/// Frontal area can be supplied directly via `frontal_area_m2` or derived from
/// `height_m` and `width_m` upon [init](SerdeAPI::init).
pub struct VehicleParameters {
    /// Vehicle name
    #[serde(default)]
    pub name: String,
    /// Vehicle mass including payload, $kg$
    pub mass_kg: f64,
    /// Frontal area, $m^2$
    #[serde(default)]
    pub frontal_area_m2: f64,
    /// Vehicle height, $m$, used to derive frontal area
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height_m: Option<f64>,
    /// Vehicle width, $m$, used to derive frontal area
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width_m: Option<f64>,
    /// Dynamic wheel radius, $m$
    pub wheel_radius_m: f64,
    /// Rotational inertia factor (km), multiplier on translational inertia to
    /// account for rotating wheels and drivetrain
    #[serde(default = "default_rot_inertia_factor")]
    pub rot_inertia_factor: f64,
    /// Static rolling resistance coefficient (C0)
    pub rr_coef_static: f64,
    /// Speed-dependent rolling resistance coefficient (C1), $\frac{s^2}{m^2}$
    #[serde(default)]
    pub rr_coef_speed: f64,
}

fn default_rot_inertia_factor() -> f64 {
    1.0
}

impl SerdeAPI for VehicleParameters {
    fn init(&mut self) -> anyhow::Result<()> {
        match (self.height_m, self.width_m) {
            (Some(height_m), Some(width_m)) => {
                ensure_positive("height_m", height_m)?;
                ensure_positive("width_m", width_m)?;
                let derived_area_m2 = height_m * width_m;
                if self.frontal_area_m2 == 0.0 {
                    self.frontal_area_m2 = derived_area_m2;
                } else {
                    ensure!(
                        utils::almost_eq(self.frontal_area_m2, derived_area_m2, Some(1e-6)),
                        format_dbg!(ModelError::invalid(
                            "frontal_area_m2",
                            format!(
                                "{} does not match height_m * width_m = {}",
                                self.frontal_area_m2, derived_area_m2
                            ),
                        ))
                    );
                }
            }
            (None, None) => {}
            _ => bail!(ModelError::invalid(
                "height_m",
                "`height_m` and `width_m` must be provided together"
            )),
        }
        self.validate()
            .with_context(|| format!("Invalid vehicle {:?}", self.name))?;
        Ok(())
    }
}

impl VehicleParameters {
    /// Returns new validated [VehicleParameters] with frontal area taken as
    /// `height_m * width_m`
    ///
    /// # Arguments
    /// - mass_kg: vehicle mass
    /// - height_m: vehicle height
    /// - width_m: vehicle width
    /// - wheel_radius_m: wheel radius
    /// - rot_inertia_factor: km
    /// - rr_coef_static: C0
    /// - rr_coef_speed: C1
    pub fn from_dimensions(
        mass_kg: f64,
        height_m: f64,
        width_m: f64,
        wheel_radius_m: f64,
        rot_inertia_factor: f64,
        rr_coef_static: f64,
        rr_coef_speed: f64,
    ) -> anyhow::Result<Self> {
        let mut veh = Self {
            name: String::new(),
            mass_kg,
            frontal_area_m2: 0.0,
            height_m: Some(height_m),
            width_m: Some(width_m),
            wheel_radius_m,
            rot_inertia_factor,
            rr_coef_static,
            rr_coef_speed,
        };
        veh.init()?;
        Ok(veh)
    }

    /// Rejects non-physical parameters
    pub fn validate(&self) -> ModelResult<()> {
        ensure_positive("mass_kg", self.mass_kg)?;
        ensure_positive("frontal_area_m2", self.frontal_area_m2)?;
        ensure_positive("wheel_radius_m", self.wheel_radius_m)?;
        if !(self.rot_inertia_factor.is_finite() && self.rot_inertia_factor >= 1.0) {
            return Err(ModelError::invalid(
                "rot_inertia_factor",
                format!("must be finite and >= 1, got {}", self.rot_inertia_factor),
            ));
        }
        ensure_non_negative("rr_coef_static", self.rr_coef_static)?;
        ensure_non_negative("rr_coef_speed", self.rr_coef_speed)?;
        Ok(())
    }

    /// Effective inertial mass, $kg$
    pub fn inertial_mass_kg(&self) -> f64 {
        self.rot_inertia_factor * self.mass_kg
    }
}

/// Light electric delivery van used throughout the tests
pub fn mock_vehicle() -> VehicleParameters {
    VehicleParameters {
        name: String::from("light van"),
        mass_kg: 2570.0,
        frontal_area_m2: 7.5,
        height_m: Some(3.0),
        width_m: Some(2.5),
        wheel_radius_m: 0.3,
        rot_inertia_factor: 1.1,
        rr_coef_static: 0.008,
        rr_coef_speed: 1.6e-6,
    }
}
