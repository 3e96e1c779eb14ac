//! Module containing propulsion power and torque derivations.

use crate::error::ensure_non_negative;
use crate::imports::*;

/// Propulsion power, $W$; negative when braking
pub fn power_required(traction_force_n: f64, speed_mps: f64) -> f64 {
    traction_force_n * speed_mps
}

/// Wheel angular velocity, $\frac{rad}{s}$
pub fn angular_velocity(speed_mps: f64, wheel_radius_m: f64) -> f64 {
    speed_mps / wheel_radius_m
}

/// Wheel torque, $N \cdot m$. Defined as `0.0` at standstill
/// (`angular_velocity_rad_per_s == 0`) rather than infinite.
pub fn torque_required(power_w: f64, angular_velocity_rad_per_s: f64) -> f64 {
    if angular_velocity_rad_per_s == 0.0 {
        0.0
    } else {
        power_w / angular_velocity_rad_per_s
    }
}

/// Power at terminal velocity for the reference traction force, $W$
pub fn terminal_power(traction_force_ref_n: f64, terminal_velocity_mps: f64) -> f64 {
    traction_force_ref_n * terminal_velocity_mps
}

/// Instantaneous power reached after accelerating for `final_time_s`, $W$
///
/// # Arguments
/// - terminal_power_w: see [terminal_power]
/// - rate_per_s: $\sqrt{K_1 K_2}$
/// - final_time_s: end of the acceleration interval, must be >= 0
pub fn peak_power(terminal_power_w: f64, rate_per_s: f64, final_time_s: f64) -> ModelResult<f64> {
    ensure_non_negative("final_time_s", final_time_s)?;
    Ok(terminal_power_w * (rate_per_s * final_time_s).tanh())
}

/// Mean power over `[0, final_time_s]`, $W$, obtained by integrating the
/// instantaneous power closed form. Zero for a zero-length interval.
///
/// # Arguments
/// - terminal_power_w: see [terminal_power]
/// - rate_per_s: $\sqrt{K_1 K_2}$
/// - final_time_s: end of the averaging interval, must be >= 0
pub fn mean_power(terminal_power_w: f64, rate_per_s: f64, final_time_s: f64) -> ModelResult<f64> {
    ensure_non_negative("final_time_s", final_time_s)?;
    let x = rate_per_s * final_time_s;
    if x == 0.0 {
        return Ok(0.0);
    }
    Ok(terminal_power_w / x * utils::ln_cosh(x))
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Default)]
/// Power and wheel torque at one operating point
pub struct PowerTorque {
    pub power_w: f64,
    pub angular_velocity_rad_per_s: f64,
    pub torque_nm: f64,
}

impl PowerTorque {
    /// # Arguments
    /// - traction_force_n: traction force at the operating point
    /// - speed_mps: vehicle speed
    /// - wheel_radius_m: wheel radius
    pub fn new(traction_force_n: f64, speed_mps: f64, wheel_radius_m: f64) -> Self {
        let power_w = power_required(traction_force_n, speed_mps);
        let angular_velocity_rad_per_s = angular_velocity(speed_mps, wheel_radius_m);
        Self {
            power_w,
            angular_velocity_rad_per_s,
            torque_nm: torque_required(power_w, angular_velocity_rad_per_s),
        }
    }

    pub fn power_kw(&self) -> f64 {
        self.power_w / params::W_PER_KW
    }

    /// Motor shaft speed in rpm for a given gear ratio
    pub fn motor_rpm(&self, gear_ratio: f64) -> f64 {
        self.angular_velocity_rad_per_s * gear_ratio * params::SECS_PER_MIN
            / (2.0 * std::f64::consts::PI)
    }
}
