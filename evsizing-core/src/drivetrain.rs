//! Module containing gear ratio, motor torque and motor power rating sizing.

use crate::dynamics::SizingRequirements;
use crate::error::{ensure_fraction, ensure_positive};
use crate::imports::*;
use crate::scenario::MotorSizingEnvelope;
use crate::vehicle::VehicleParameters;

/// Single-stage ratio that puts the motor at `motor_max_rpm` at `top_speed_mps`
///
/// $R = \frac{n_{max} \, r \, 2\pi}{v_{max} \cdot 60}$
pub fn gear_ratio(motor_max_rpm: f64, wheel_radius_m: f64, top_speed_mps: f64) -> ModelResult<f64> {
    ensure_positive("motor_max_rpm", motor_max_rpm)?;
    ensure_positive("wheel_radius_m", wheel_radius_m)?;
    ensure_positive("top_speed_mps", top_speed_mps)?;
    Ok(motor_max_rpm * wheel_radius_m * 2.0 * std::f64::consts::PI
        / (top_speed_mps * params::SECS_PER_MIN))
}

/// Motor shaft torque for a wheel torque through `gear_ratio` at
/// `drivetrain_eff`
pub fn motor_torque(wheel_torque_nm: f64, gear_ratio: f64, drivetrain_eff: f64) -> ModelResult<f64> {
    ensure_positive("gear_ratio", gear_ratio)?;
    ensure_fraction("drivetrain_eff", drivetrain_eff)?;
    ensure_positive("drivetrain_eff", drivetrain_eff)?;
    Ok(wheel_torque_nm / gear_ratio / drivetrain_eff)
}

/// Mean acceleration to reach `top_speed_mps` in `time_s`
pub fn initial_accel(top_speed_mps: f64, time_s: f64) -> ModelResult<f64> {
    ensure_positive("time_s", time_s)?;
    Ok(top_speed_mps / time_s)
}

/// Motor power rating for accelerating to `top_speed_mps` in `time_s` with a
/// constant torque region up to `base_speed_mps`, $W$
///
/// $P_m = \frac{m}{2 t_f} (v_b^2 + v_f^2)$
pub fn motor_power_rating(
    mass_kg: f64,
    time_s: f64,
    base_speed_mps: f64,
    top_speed_mps: f64,
) -> ModelResult<f64> {
    ensure_positive("mass_kg", mass_kg)?;
    ensure_positive("time_s", time_s)?;
    Ok(mass_kg / (2.0 * time_s) * (base_speed_mps.powi(2) + top_speed_mps.powi(2)))
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct DrivetrainParams {
    /// Maximum motor speed, $rpm$
    #[serde(default = "default_motor_max_rpm")]
    pub motor_max_rpm: f64,
    /// Gearbox and final drive efficiency
    #[serde(default = "default_drivetrain_eff")]
    pub drivetrain_eff: f64,
    /// Vehicle speed at the end of the motor's constant torque region,
    /// $\frac{km}{h}$; top speed if absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_speed_kph: Option<f64>,
}

fn default_motor_max_rpm() -> f64 {
    7000.0
}

fn default_drivetrain_eff() -> f64 {
    0.9
}

impl Default for DrivetrainParams {
    fn default() -> Self {
        Self {
            motor_max_rpm: default_motor_max_rpm(),
            drivetrain_eff: default_drivetrain_eff(),
            base_speed_kph: None,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
/// Drivetrain requirements derived from the scenario envelope
pub struct DrivetrainSizing {
    pub params: DrivetrainParams,
    pub gear_ratio: f64,
    /// highest wheel torque over the scenarios, $N \cdot m$
    pub wheel_torque_nm: f64,
    /// motor torque to deliver `wheel_torque_nm`, $N \cdot m$
    pub motor_torque_nm: f64,
    pub initial_accel_mps2: f64,
    pub motor_power_rating_w: f64,
}

impl SerdeAPI for DrivetrainSizing {}

impl DrivetrainSizing {
    /// # Arguments
    /// - veh: vehicle
    /// - requirements: top speed and acceleration targets
    /// - envelope: result of a scenario pass
    /// - dt_params: motor and gearbox parameters
    pub fn new(
        veh: &VehicleParameters,
        requirements: &SizingRequirements,
        envelope: &MotorSizingEnvelope,
        dt_params: &DrivetrainParams,
    ) -> ModelResult<Self> {
        requirements.validate()?;
        let top_speed_mps = requirements.top_speed_mps();
        let base_speed_mps = dt_params
            .base_speed_kph
            .map_or(top_speed_mps, params::kph_to_mps);
        let gear_ratio = gear_ratio(dt_params.motor_max_rpm, veh.wheel_radius_m, top_speed_mps)?;
        Ok(Self {
            params: *dt_params,
            gear_ratio,
            wheel_torque_nm: envelope.max_torque_nm,
            motor_torque_nm: motor_torque(envelope.max_torque_nm, gear_ratio, dt_params.drivetrain_eff)?,
            initial_accel_mps2: initial_accel(top_speed_mps, requirements.time_to_100_kph_s)?,
            motor_power_rating_w: motor_power_rating(
                veh.mass_kg,
                requirements.time_to_100_kph_s,
                base_speed_mps,
                top_speed_mps,
            )?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vehicle::mock_vehicle;

    #[test]
    fn test_gear_ratio() {
        // 7000 rpm at 100 km/h on 0.3 m wheels
        let ratio = gear_ratio(7000.0, 0.3, 100.0 / 3.6).unwrap();
        assert!(utils::almost_eq(ratio, 7.917, Some(1e-4)));
        assert!(gear_ratio(7000.0, 0.3, 0.0).is_err());
    }

    #[test]
    fn test_motor_torque() {
        assert!(utils::almost_eq(motor_torque(900.0, 10.0, 0.9).unwrap(), 100.0, None));
        assert!(motor_torque(900.0, 10.0, 0.0).is_err());
        assert!(motor_torque(900.0, 0.0, 0.9).is_err());
    }

    #[test]
    fn test_power_rating() {
        let p = motor_power_rating(2570.0, 12.0, 10.0, 20.0).unwrap();
        assert!(utils::almost_eq(p, 2570.0 / 24.0 * 500.0, None));
        assert!(motor_power_rating(2570.0, 0.0, 10.0, 20.0).is_err());
    }

    #[test]
    fn test_sizing_from_envelope() {
        let envelope = MotorSizingEnvelope {
            max_power_w: 200e3,
            max_torque_nm: 2400.0,
            ..Default::default()
        };
        let sizing = DrivetrainSizing::new(
            &mock_vehicle(),
            &SizingRequirements::default(),
            &envelope,
            &DrivetrainParams::default(),
        )
        .unwrap();
        assert_eq!(sizing.wheel_torque_nm, 2400.0);
        assert!(utils::almost_eq(
            sizing.motor_torque_nm,
            2400.0 / sizing.gear_ratio / 0.9,
            None
        ));
        let v = 100.0 / 3.6;
        assert!(utils::almost_eq(sizing.motor_power_rating_w, 2570.0 * v * v / 12.0, None));
        assert!(utils::almost_eq(sizing.initial_accel_mps2, v / 12.0, None));
    }
}
