//! Module containing named operating points and the motor sizing envelope
//! they fold into.

use crate::dynamics::{SizingRequirements, VehicleDynamics};
use crate::error::ensure_finite;
use crate::forces::{ForceComponents, KinematicSample};
use crate::imports::*;
use crate::power::PowerTorque;
use rayon::prelude::*;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
/// Named steady operating point
pub struct Scenario {
    pub name: String,
    /// vehicle speed [km/h]
    pub speed_kph: f64,
    /// road grade [%]
    #[serde(default)]
    pub grade_pct: f64,
    /// acceleration [m/s^2]
    #[serde(default)]
    pub accel_mps2: f64,
    /// headwind [km/h]
    #[serde(default)]
    pub headwind_kph: f64,
}

impl Scenario {
    pub fn new<S: Into<String>>(
        name: S,
        speed_kph: f64,
        grade_pct: f64,
        accel_mps2: f64,
        headwind_kph: f64,
    ) -> Self {
        Self {
            name: name.into(),
            speed_kph,
            grade_pct,
            accel_mps2,
            headwind_kph,
        }
    }

    pub fn validate(&self) -> ModelResult<()> {
        ensure_finite("speed_kph", self.speed_kph)?;
        ensure_finite("grade_pct", self.grade_pct)?;
        ensure_finite("accel_mps2", self.accel_mps2)?;
        ensure_finite("headwind_kph", self.headwind_kph)?;
        Ok(())
    }

    pub fn sample(&self) -> KinematicSample {
        KinematicSample::new(params::kph_to_mps(self.speed_kph), self.accel_mps2)
    }

    /// Runs the force and power/torque pipeline at this operating point. Air
    /// properties come from `dynamics`, grade and headwind from `self`.
    pub fn evaluate(&self, dynamics: &VehicleDynamics) -> ModelResult<ScenarioResult> {
        self.validate()?;
        let env = dynamics
            .env()
            .with_grade_pct(self.grade_pct)
            .with_headwind_kph(self.headwind_kph);
        let sample = self.sample();
        let forces = ForceComponents::new(dynamics.veh(), &env, &sample);
        Ok(ScenarioResult {
            name: self.name.clone(),
            sample,
            power_torque: PowerTorque::new(
                forces.traction_n,
                sample.speed_mps,
                dynamics.veh().wheel_radius_m,
            ),
            forces,
        })
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ScenarioResult {
    pub name: String,
    pub sample: KinematicSample,
    pub forces: ForceComponents,
    pub power_torque: PowerTorque,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
/// Running maxima of power and torque over one evaluation pass. Starts at
/// zero, so braking-only passes leave it at zero.
pub struct MotorSizingEnvelope {
    pub max_power_w: f64,
    pub max_torque_nm: f64,
    /// scenario that set `max_power_w`
    pub max_power_scenario: Option<String>,
    /// scenario that set `max_torque_nm`
    pub max_torque_scenario: Option<String>,
}

impl MotorSizingEnvelope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears the envelope before a new pass
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Folds `result` into the running maxima
    pub fn update(&mut self, result: &ScenarioResult) {
        if result.power_torque.power_w > self.max_power_w {
            self.max_power_w = result.power_torque.power_w;
            self.max_power_scenario = Some(result.name.clone());
        }
        if result.power_torque.torque_nm > self.max_torque_nm {
            self.max_torque_nm = result.power_torque.torque_nm;
            self.max_torque_scenario = Some(result.name.clone());
        }
    }

    pub fn max_power_kw(&self) -> f64 {
        self.max_power_w / params::W_PER_KW
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
/// Results of one full pass over a set of scenarios
pub struct ScenarioEvaluation {
    pub results: Vec<ScenarioResult>,
    pub envelope: MotorSizingEnvelope,
}

impl SerdeAPI for ScenarioEvaluation {}

/// Evaluates every scenario, then folds the results into `envelope` in
/// scenario order. `envelope` is reset first.
///
/// # Arguments
/// - dynamics: validated vehicle/environment snapshot
/// - scenarios: operating points
/// - parallelize: whether to evaluate scenarios in parallel, defaults to `true`
/// - envelope: accumulator owned by this pass
pub fn evaluate_scenarios_into(
    dynamics: &VehicleDynamics,
    scenarios: &[Scenario],
    parallelize: Option<bool>,
    envelope: &mut MotorSizingEnvelope,
) -> anyhow::Result<Vec<ScenarioResult>> {
    envelope.reset();
    let parallelize = parallelize.unwrap_or(true);
    let results = if parallelize {
        scenarios
            .par_iter()
            .enumerate()
            .map(|(i, scenario)| {
                scenario
                    .evaluate(dynamics)
                    .with_context(|| format!("scenario idx: {i}, name: {:?}", scenario.name))
            })
            .collect::<anyhow::Result<Vec<_>>>()?
    } else {
        scenarios
            .iter()
            .enumerate()
            .map(|(i, scenario)| {
                scenario
                    .evaluate(dynamics)
                    .with_context(|| format!("scenario idx: {i}, name: {:?}", scenario.name))
            })
            .collect::<anyhow::Result<Vec<_>>>()?
    };
    for result in &results {
        envelope.update(result);
    }
    Ok(results)
}

/// Evaluates every scenario with a fresh envelope
pub fn evaluate_scenarios(
    dynamics: &VehicleDynamics,
    scenarios: &[Scenario],
    parallelize: Option<bool>,
) -> anyhow::Result<ScenarioEvaluation> {
    let mut envelope = MotorSizingEnvelope::new();
    let results = evaluate_scenarios_into(dynamics, scenarios, parallelize, &mut envelope)?;
    #[cfg(feature = "logging")]
    log::debug!(
        "envelope over {} scenarios: {:.1} kW, {:.1} N*m",
        results.len(),
        envelope.max_power_kw(),
        envelope.max_torque_nm
    );
    Ok(ScenarioEvaluation { results, envelope })
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct ScenarioSet(pub Vec<Scenario>);

impl SerdeAPI for ScenarioSet {
    fn init(&mut self) -> anyhow::Result<()> {
        for (i, scenario) in self.0.iter().enumerate() {
            scenario
                .validate()
                .with_context(|| format!("scenario idx: {i}, name: {:?}", scenario.name))?;
        }
        Ok(())
    }
}

impl ScenarioSet {
    /// Standard sizing scenarios. `current` is the user's own operating
    /// point; its headwind also applies to the steady-speed scenarios.
    pub fn standard(current: Scenario, requirements: &SizingRequirements) -> Self {
        let headwind_kph = current.headwind_kph;
        let ref_speed_kph = requirements.top_speed_kph.min(params::REF_SPEED_KPH);
        Self(vec![
            current,
            Scenario::new(
                "Static Top Speed Requirement",
                requirements.top_speed_kph,
                0.0,
                0.0,
                headwind_kph,
            ),
            Scenario::new(
                format!(
                    "Time to {ref_speed_kph} km/h in {} seconds",
                    requirements.time_to_100_kph_s
                ),
                ref_speed_kph,
                0.0,
                requirements.ref_accel_mps2(),
                0.0,
            ),
            Scenario::new("Flat Roads", ref_speed_kph, 0.0, 0.0, headwind_kph),
            Scenario::new("Inclines", 5.0, 20.0, 0.0, headwind_kph),
            Scenario::new("Acceleration", 50.0, 0.0, 1.5, headwind_kph),
        ])
    }

    /// Default user operating point: 60 km/h, 5 % grade, 1 m/s^2, no wind
    pub fn default_current() -> Scenario {
        Scenario::new("Current Situation", 60.0, 5.0, 1.0, 0.0)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn push(&mut self, scenario: Scenario) {
        self.0.push(scenario);
    }

    pub fn evaluate(
        &self,
        dynamics: &VehicleDynamics,
        parallelize: Option<bool>,
    ) -> anyhow::Result<ScenarioEvaluation> {
        evaluate_scenarios(dynamics, &self.0, parallelize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::EnvironmentState;
    use crate::vehicle::mock_vehicle;

    fn mock_dynamics() -> VehicleDynamics {
        VehicleDynamics::new(mock_vehicle(), EnvironmentState::default()).unwrap()
    }

    fn mock_set() -> ScenarioSet {
        ScenarioSet::standard(
            ScenarioSet::default_current(),
            &SizingRequirements::default(),
        )
    }

    #[test]
    fn test_standard_set() {
        let set = mock_set();
        assert_eq!(set.len(), 6);
        assert_eq!(set.0[0].name, "Current Situation");
        assert_eq!(set.0[2].name, "Time to 100 km/h in 12 seconds");
        assert_eq!(set.0[4].grade_pct, 20.0);
        let mut req = SizingRequirements::default();
        req.top_speed_kph = 80.0;
        let set = ScenarioSet::standard(ScenarioSet::default_current(), &req);
        assert_eq!(set.0[3].speed_kph, 80.0);
        assert_eq!(set.0[1].speed_kph, 80.0);
    }

    #[test]
    fn test_envelope_is_max_over_results() {
        let eval = mock_set().evaluate(&mock_dynamics(), Some(false)).unwrap();
        assert_eq!(eval.results.len(), 6);
        let max_power = eval
            .results
            .iter()
            .map(|r| r.power_torque.power_w)
            .fold(0.0, f64::max);
        let max_torque = eval
            .results
            .iter()
            .map(|r| r.power_torque.torque_nm)
            .fold(0.0, f64::max);
        assert_eq!(eval.envelope.max_power_w, max_power);
        assert_eq!(eval.envelope.max_torque_nm, max_torque);
        // reference acceleration at 100 km/h dominates both
        assert_eq!(
            eval.envelope.max_torque_scenario.as_deref(),
            Some("Time to 100 km/h in 12 seconds")
        );
        assert_eq!(eval.envelope.max_power_scenario, eval.envelope.max_torque_scenario);
    }

    #[test]
    fn test_parallel_matches_serial() {
        let dynamics = mock_dynamics();
        let serial = mock_set().evaluate(&dynamics, Some(false)).unwrap();
        let parallel = mock_set().evaluate(&dynamics, Some(true)).unwrap();
        assert_eq!(serial, parallel);
    }

    #[test]
    fn test_envelope_monotone_and_reset() {
        let dynamics = mock_dynamics();
        let set = mock_set();
        let mut envelope = MotorSizingEnvelope::new();
        let mut prev = envelope.clone();
        for scenario in &set.0 {
            envelope.update(&scenario.evaluate(&dynamics).unwrap());
            assert!(envelope.max_power_w >= prev.max_power_w);
            assert!(envelope.max_torque_nm >= prev.max_torque_nm);
            prev = envelope.clone();
        }

        // a new pass with only a standstill scenario starts from zero
        let standstill = [Scenario::new("standstill", 0.0, 0.0, 0.0, 0.0)];
        let results =
            evaluate_scenarios_into(&dynamics, &standstill, Some(false), &mut envelope).unwrap();
        assert_eq!(results[0].power_torque.torque_nm, 0.0);
        assert_eq!(envelope, MotorSizingEnvelope::new());
    }

    #[test]
    fn test_scenario_environment() {
        let dynamics = mock_dynamics();
        let result = Scenario::new("hill", 5.0, 20.0, 0.0, 0.0)
            .evaluate(&dynamics)
            .unwrap();
        assert!(utils::almost_eq(
            result.forces.gravitational_n,
            2570.0 * 9.81 * 0.2f64.atan().sin(),
            None
        ));
        let windy = Scenario::new("wind", 0.0, 0.0, 0.0, 36.0)
            .evaluate(&dynamics)
            .unwrap();
        assert!(windy.forces.drag_n > 0.0);
        assert_eq!(windy.power_torque.power_w, 0.0);
    }

    #[test]
    fn test_invalid_scenario() {
        let set = ScenarioSet(vec![Scenario::new("bad", f64::NAN, 0.0, 0.0, 0.0)]);
        assert!(set.evaluate(&mock_dynamics(), None).is_err());
        let yaml = "- name: ok\n  speed_kph: 50.0\n";
        let set = ScenarioSet::from_yaml(yaml).unwrap();
        assert_eq!(set.0[0].grade_pct, 0.0);
    }
}
