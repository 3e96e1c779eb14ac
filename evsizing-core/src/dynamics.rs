//! Module containing the explicit dynamics pipeline: a validated
//! vehicle/environment snapshot and the report derived from it against a set
//! of sizing requirements.

use crate::environment::EnvironmentState;
use crate::error::{ensure_non_negative, ensure_positive};
use crate::forces::{self, ForceComponents, KinematicSample};
use crate::imports::*;
use crate::motion::{MotionCoefficients, MotionProfile};
use crate::power::PowerTorque;
use crate::vehicle::VehicleParameters;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
/// Performance targets the powertrain is sized against
pub struct SizingRequirements {
    /// Top speed, $\frac{km}{h}$
    #[serde(default = "default_top_speed_kph")]
    pub top_speed_kph: f64,
    /// Time to accelerate from rest to 100 km/h, $s$
    #[serde(default = "default_time_to_100_kph_s")]
    pub time_to_100_kph_s: f64,
    /// Maximum grade to start on, %
    #[serde(default = "default_gradeability_pct")]
    pub gradeability_pct: f64,
}

fn default_top_speed_kph() -> f64 {
    100.0
}
fn default_time_to_100_kph_s() -> f64 {
    12.0
}
fn default_gradeability_pct() -> f64 {
    25.0
}

impl Default for SizingRequirements {
    fn default() -> Self {
        Self {
            top_speed_kph: default_top_speed_kph(),
            time_to_100_kph_s: default_time_to_100_kph_s(),
            gradeability_pct: default_gradeability_pct(),
        }
    }
}

impl SerdeAPI for SizingRequirements {
    fn init(&mut self) -> anyhow::Result<()> {
        self.validate()?;
        Ok(())
    }
}

impl SizingRequirements {
    pub fn validate(&self) -> ModelResult<()> {
        ensure_positive("top_speed_kph", self.top_speed_kph)?;
        ensure_positive("time_to_100_kph_s", self.time_to_100_kph_s)?;
        ensure_non_negative("gradeability_pct", self.gradeability_pct)?;
        Ok(())
    }

    pub fn top_speed_mps(&self) -> f64 {
        params::kph_to_mps(self.top_speed_kph)
    }

    /// Mean acceleration needed to reach 100 km/h in the target time
    pub fn ref_accel_mps2(&self) -> f64 {
        params::kph_to_mps(params::REF_SPEED_KPH) / self.time_to_100_kph_s
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
/// Persistable bundle of everything needed to size one vehicle
pub struct VehicleProfile {
    pub veh: VehicleParameters,
    #[serde(default)]
    pub requirements: SizingRequirements,
    #[serde(default)]
    pub env: EnvironmentState,
}

impl SerdeAPI for VehicleProfile {
    fn init(&mut self) -> anyhow::Result<()> {
        self.veh.init()?;
        self.requirements.init()?;
        self.env.init()?;
        Ok(())
    }
}

impl VehicleProfile {
    pub fn dynamics(&self) -> ModelResult<VehicleDynamics> {
        VehicleDynamics::new(self.veh.clone(), self.env)
    }

    pub fn report(&self) -> ModelResult<DynamicsReport> {
        DynamicsReport::new(&self.dynamics()?, &self.requirements)
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
/// Validated vehicle and environment snapshot. Fields are private so that
/// every derived quantity comes from one consistent, checked input set.
pub struct VehicleDynamics {
    veh: VehicleParameters,
    env: EnvironmentState,
}

impl VehicleDynamics {
    pub fn new(veh: VehicleParameters, env: EnvironmentState) -> ModelResult<Self> {
        veh.validate()?;
        env.validate()?;
        Ok(Self { veh, env })
    }

    pub fn veh(&self) -> &VehicleParameters {
        &self.veh
    }

    pub fn env(&self) -> &EnvironmentState {
        &self.env
    }

    /// New snapshot sharing the vehicle but with a different environment
    pub fn with_env(&self, env: EnvironmentState) -> ModelResult<Self> {
        Self::new(self.veh.clone(), env)
    }

    pub fn forces(&self, sample: &KinematicSample) -> ForceComponents {
        ForceComponents::new(&self.veh, &self.env, sample)
    }

    pub fn power_torque(&self, sample: &KinematicSample) -> PowerTorque {
        PowerTorque::new(
            self.forces(sample).traction_n,
            sample.speed_mps,
            self.veh.wheel_radius_m,
        )
    }

    pub fn motion_coefficients(&self, traction_force_n: f64) -> ModelResult<MotionCoefficients> {
        MotionCoefficients::new(traction_force_n, &self.veh, &self.env)
    }

    /// See [forces::required_tractive_force_near_zero]
    pub fn gradeability_force_n(&self, gradeability_pct: f64) -> f64 {
        forces::required_tractive_force_near_zero(self.veh.mass_kg, gradeability_pct)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
/// Velocity, distance and tractive power from rest on a common time grid
pub struct MotionTrace {
    pub time_s: Array1<f64>,
    pub velocity_mps: Array1<f64>,
    pub distance_m: Array1<f64>,
    pub power_w: Array1<f64>,
}

impl MotionTrace {
    pub fn new(profile: &MotionProfile, time_s: Array1<f64>) -> Self {
        Self {
            velocity_mps: profile.velocity_profile(&time_s),
            distance_m: profile.distance_profile(&time_s),
            power_w: profile.power_profile(&time_s),
            time_s,
        }
    }

    pub fn len(&self) -> usize {
        self.time_s.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time_s.is_empty()
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
/// Road load, traction, power and motion results at the top speed
/// requirement, with the reference acceleration applied
pub struct DynamicsReport {
    pub requirements: SizingRequirements,
    /// Operating point the forces are evaluated at
    pub sample: KinematicSample,
    pub forces: ForceComponents,
    pub power_torque: PowerTorque,
    /// Traction force to start on the gradeability requirement, $N$
    pub gradeability_force_n: f64,
    pub coefs: MotionCoefficients,
    /// `None` when `coefs` admit no finite terminal velocity
    pub motion: Option<MotionProfile>,
}

impl DynamicsReport {
    pub fn new(
        dynamics: &VehicleDynamics,
        requirements: &SizingRequirements,
    ) -> ModelResult<Self> {
        requirements.validate()?;
        let sample =
            KinematicSample::new(requirements.top_speed_mps(), requirements.ref_accel_mps2());
        let forces = dynamics.forces(&sample);
        let power_torque = dynamics.power_torque(&sample);
        let coefs = dynamics.motion_coefficients(forces.traction_n)?;
        Ok(Self {
            requirements: *requirements,
            sample,
            forces,
            power_torque,
            gradeability_force_n: dynamics.gradeability_force_n(requirements.gradeability_pct),
            coefs,
            motion: coefs.solve().ok(),
        })
    }

    /// Motion profile, or [ModelError::ModelInfeasible]
    pub fn motion_profile(&self) -> ModelResult<&MotionProfile> {
        self.motion.as_ref().ok_or(ModelError::ModelInfeasible {
            k1: self.coefs.k1(),
            k2: self.coefs.k2(),
        })
    }

    /// Peak and mean power over the time-to-100 interval, $W$
    pub fn accel_power_w(&self) -> ModelResult<(f64, f64)> {
        let motion = self.motion_profile()?;
        let t_f = self.requirements.time_to_100_kph_s;
        Ok((motion.peak_power_w(t_f)?, motion.mean_power_w(t_f)?))
    }

    /// Trajectories over `n_points` evenly spaced times in `[0, t_end_s]`
    pub fn motion_trace(&self, t_end_s: f64, n_points: usize) -> ModelResult<MotionTrace> {
        ensure_non_negative("t_end_s", t_end_s)?;
        let time_s = Array1::from(Vec::linspace(0.0, t_end_s, n_points));
        Ok(MotionTrace::new(self.motion_profile()?, time_s))
    }

    /// Trajectories over the default grid of 0 to 80 s
    pub fn default_motion_trace(&self) -> ModelResult<MotionTrace> {
        self.motion_trace(params::PROFILE_T_END_S, params::PROFILE_POINTS)
    }
}

impl SerdeAPI for DynamicsReport {
    /// Re-solves the motion profile from the stored coefficients so that a
    /// loaded report cannot carry motion for infeasible coefficients
    fn init(&mut self) -> anyhow::Result<()> {
        self.requirements.validate()?;
        ensure!(
            utils::almost_eq(self.coefs.traction_force_n(), self.forces.traction_n, Some(1e-9)),
            format_dbg!(ModelError::invalid(
                "coefs",
                "traction force differs from the force breakdown"
            ))
        );
        self.motion = self.coefs.solve().ok();
        Ok(())
    }
}
