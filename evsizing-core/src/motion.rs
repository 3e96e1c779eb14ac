//! Module containing the closed-form solution of the drag-limited equation of
//! motion under constant traction.
//!
//! With $m \frac{dv}{dt} = F - m g C_0 - (\frac{1}{2}\rho C_d A + m g C_1) v^2$,
//! dividing by $m$ gives $\frac{dv}{dt} = K_1 - K_2 v^2$, which integrates to
//! $v(t) = V_t \tanh(\sqrt{K_1 K_2}\, t)$ from rest.

use crate::environment::EnvironmentState;
use crate::error::{ensure_finite, ensure_positive};
use crate::imports::*;
use crate::power;
use crate::vehicle::VehicleParameters;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
/// Lumped coefficients of the equation of motion, always derived together
/// from one traction force / vehicle / environment snapshot
pub struct MotionCoefficients {
    traction_force_n: f64,
    mass_kg: f64,
    /// $K_1 = F/m - g C_0$, $\frac{m}{s^2}$
    k1: f64,
    /// $K_2 = \frac{\rho C_d A}{2m} + g C_1$, $\frac{1}{m}$
    k2: f64,
}

impl MotionCoefficients {
    /// Derives `K1` and `K2` for a constant `traction_force_n`
    ///
    /// # Arguments
    /// - traction_force_n: reference traction force, typically the force
    ///   needed to reach top speed within the target time
    /// - veh: vehicle snapshot
    /// - env: environment snapshot
    pub fn new(
        traction_force_n: f64,
        veh: &VehicleParameters,
        env: &EnvironmentState,
    ) -> ModelResult<Self> {
        ensure_finite("traction_force_n", traction_force_n)?;
        veh.validate()?;
        env.validate()?;
        let k1 = traction_force_n / veh.mass_kg - params::A_GRAV_MPS2 * veh.rr_coef_static;
        let k2 = env.air_density_kg_per_m3 * env.drag_coef * veh.frontal_area_m2
            / (2.0 * veh.mass_kg)
            + params::A_GRAV_MPS2 * veh.rr_coef_speed;
        #[cfg(feature = "logging")]
        log::debug!("K1 = {k1:.6e}, K2 = {k2:.6e} for traction force {traction_force_n:.1} N");
        Ok(Self {
            traction_force_n,
            mass_kg: veh.mass_kg,
            k1,
            k2,
        })
    }

    pub fn k1(&self) -> f64 {
        self.k1
    }

    pub fn k2(&self) -> f64 {
        self.k2
    }

    pub fn traction_force_n(&self) -> f64 {
        self.traction_force_n
    }

    pub fn mass_kg(&self) -> f64 {
        self.mass_kg
    }

    /// Whether a finite terminal velocity exists
    pub fn is_feasible(&self) -> bool {
        self.k1 > 0.0 && self.k2 > 0.0
    }

    /// Solves for the motion profile, or returns [ModelError::ModelInfeasible]
    /// when `K1` or `K2` is not strictly positive
    pub fn solve(&self) -> ModelResult<MotionProfile> {
        if !self.is_feasible() {
            #[cfg(feature = "logging")]
            log::warn!(
                "no finite terminal velocity for K1 = {:.6e}, K2 = {:.6e}",
                self.k1,
                self.k2
            );
            return Err(ModelError::ModelInfeasible {
                k1: self.k1,
                k2: self.k2,
            });
        }
        let rate_per_s = (self.k1 * self.k2).sqrt();
        Ok(MotionProfile {
            coefs: *self,
            terminal_velocity_mps: (self.k1 / self.k2).sqrt(),
            time_to_terminal_s: params::TERMINAL_RISE_FACTOR / rate_per_s,
            rate_per_s,
        })
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(try_from = "MotionProfileRecord")]
/// Velocity, distance and power trajectories from rest under constant
/// traction. Only obtainable from [MotionCoefficients::solve], including
/// when deserialized.
pub struct MotionProfile {
    coefs: MotionCoefficients,
    /// $V_t = \sqrt{K_1 / K_2}$
    terminal_velocity_mps: f64,
    /// time to reach 98% of terminal velocity
    time_to_terminal_s: f64,
    /// $\sqrt{K_1 K_2}$, $\frac{1}{s}$
    rate_per_s: f64,
}

/// Stored form of [MotionProfile]. Derived fields in the input are ignored
/// and recomputed from `coefs`.
#[derive(Deserialize)]
struct MotionProfileRecord {
    coefs: MotionCoefficients,
}

impl TryFrom<MotionProfileRecord> for MotionProfile {
    type Error = ModelError;

    fn try_from(record: MotionProfileRecord) -> ModelResult<Self> {
        record.coefs.solve()
    }
}

impl MotionProfile {
    pub fn coefs(&self) -> &MotionCoefficients {
        &self.coefs
    }

    pub fn terminal_velocity_mps(&self) -> f64 {
        self.terminal_velocity_mps
    }

    pub fn time_to_terminal_s(&self) -> f64 {
        self.time_to_terminal_s
    }

    /// $\sqrt{K_1 K_2}$
    pub fn rate_per_s(&self) -> f64 {
        self.rate_per_s
    }

    /// Velocity at `time_s` after starting from rest
    pub fn velocity_at(&self, time_s: f64) -> f64 {
        self.terminal_velocity_mps * (self.rate_per_s * time_s).tanh()
    }

    /// Distance covered at `time_s` after starting from rest
    pub fn distance_at(&self, time_s: f64) -> f64 {
        utils::ln_cosh(self.coefs.k2 * self.terminal_velocity_mps * time_s) / self.coefs.k2
    }

    /// Instantaneous tractive power at `time_s`, $W$
    pub fn power_at(&self, time_s: f64) -> f64 {
        power::power_required(self.coefs.traction_force_n, self.velocity_at(time_s))
    }

    pub fn velocity_profile(&self, time_s: &Array1<f64>) -> Array1<f64> {
        time_s.mapv(|t| self.velocity_at(t))
    }

    pub fn distance_profile(&self, time_s: &Array1<f64>) -> Array1<f64> {
        time_s.mapv(|t| self.distance_at(t))
    }

    pub fn power_profile(&self, time_s: &Array1<f64>) -> Array1<f64> {
        time_s.mapv(|t| self.power_at(t))
    }

    /// Power at terminal velocity, $W$
    pub fn terminal_power_w(&self) -> f64 {
        power::terminal_power(self.coefs.traction_force_n, self.terminal_velocity_mps)
    }

    /// Power at the end of an acceleration interval of `final_time_s`, $W$
    pub fn peak_power_w(&self, final_time_s: f64) -> ModelResult<f64> {
        power::peak_power(self.terminal_power_w(), self.rate_per_s, final_time_s)
    }

    /// Time-averaged power over `[0, final_time_s]`, $W$
    pub fn mean_power_w(&self, final_time_s: f64) -> ModelResult<f64> {
        power::mean_power(self.terminal_power_w(), self.rate_per_s, final_time_s)
    }

    /// Time at which velocity reaches `speed_mps`, `None` if it never does
    pub fn time_to_speed_s(&self, speed_mps: f64) -> Option<f64> {
        ensure_positive("speed_mps", speed_mps).ok()?;
        (speed_mps < self.terminal_velocity_mps)
            .then(|| (speed_mps / self.terminal_velocity_mps).atanh() / self.rate_per_s)
    }
}
