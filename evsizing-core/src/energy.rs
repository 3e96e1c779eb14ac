//! Module containing the drive cycle energy integrator.
//!
//! Each sample is re-run through the force model, power is scaled by the
//! regenerative braking efficiency where negative, and integrated over the
//! backward time step (first step 0).

use crate::drive_cycle::DriveCycle;
use crate::environment::EnvironmentState;
use crate::error::ensure_fraction;
use crate::forces;
use crate::imports::*;
use crate::vehicle::VehicleParameters;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
/// How road grade enters the drive cycle force balance
pub enum GradeHandling {
    /// Ignore any cycle grade: no gravitational force and `cos(0)` rolling
    /// resistance
    #[default]
    FlatTerrain,
    /// Use the cycle's grade trace for gravitational and rolling forces;
    /// samples without grade are flat
    FromCycle,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
/// Options for [EnergyTrace::new]
pub struct CycleEnergyParams {
    /// Fraction of negative tractive power recovered, in [0, 1]
    #[serde(default = "default_regen_eff")]
    pub regen_eff: f64,
    #[serde(default)]
    pub grade_handling: GradeHandling,
    /// Whether the inertial term uses the rotational inertia factor; when
    /// false it is plain `m * a`
    #[serde(default)]
    pub apply_rot_inertia: bool,
}

fn default_regen_eff() -> f64 {
    params::REGEN_EFF_DEFAULT
}

impl Default for CycleEnergyParams {
    fn default() -> Self {
        Self {
            regen_eff: default_regen_eff(),
            grade_handling: GradeHandling::default(),
            apply_rot_inertia: false,
        }
    }
}

impl SerdeAPI for CycleEnergyParams {
    fn init(&mut self) -> anyhow::Result<()> {
        self.validate()?;
        Ok(())
    }
}

impl CycleEnergyParams {
    pub fn with_regen_eff(self, regen_eff: f64) -> Self {
        Self { regen_eff, ..self }
    }

    pub fn validate(&self) -> ModelResult<()> {
        ensure_fraction("regen_eff", self.regen_eff)
    }

    /// Power that is counted towards cycle energy
    pub fn counted_power_w(&self, tractive_power_w: f64) -> f64 {
        if tractive_power_w < 0.0 {
            tractive_power_w * self.regen_eff
        } else {
            tractive_power_w
        }
    }
}

/// Tractive force at one cycle sample, $N$
///
/// # Arguments
/// - veh: vehicle snapshot
/// - env: environment snapshot; its road angle is not used, grade comes from
///   `grade` according to `energy_params.grade_handling`
/// - energy_params: integration options
/// - speed_mps: sample speed
/// - accel_mps2: sample acceleration
/// - grade: sample grade, rise/run
pub fn cycle_traction_force(
    veh: &VehicleParameters,
    env: &EnvironmentState,
    energy_params: &CycleEnergyParams,
    speed_mps: f64,
    accel_mps2: f64,
    grade: f64,
) -> f64 {
    let road_angle_rad = match energy_params.grade_handling {
        GradeHandling::FlatTerrain => 0.0,
        GradeHandling::FromCycle => grade.atan(),
    };
    let drag_n = forces::aero_drag_force(
        env.relative_speed_mps(speed_mps),
        veh.frontal_area_m2,
        env.air_density_kg_per_m3,
        env.drag_coef,
    );
    let rolling_n = forces::rolling_force(
        veh.mass_kg,
        road_angle_rad,
        speed_mps,
        veh.rr_coef_static,
        veh.rr_coef_speed,
    );
    let gravitational_n = match energy_params.grade_handling {
        GradeHandling::FlatTerrain => 0.0,
        GradeHandling::FromCycle => forces::gravitational_force(veh.mass_kg, road_angle_rad),
    };
    let rot_inertia_factor = if energy_params.apply_rot_inertia {
        veh.rot_inertia_factor
    } else {
        1.0
    };
    forces::traction_force(
        forces::road_load_force(rolling_n, gravitational_n, drag_n),
        veh.mass_kg,
        accel_mps2,
        rot_inertia_factor,
    )
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
/// Per-sample power, energy and distance over a drive cycle
pub struct EnergyTrace {
    #[serde(default)]
    pub name: String,
    pub energy_params: CycleEnergyParams,
    /// time [s]
    pub time_s: Array1<f64>,
    /// tractive force [N]
    pub traction_force_n: Array1<f64>,
    /// tractive power before the regen policy [W]
    pub tractive_power_w: Array1<f64>,
    /// power counted towards energy after the regen policy [W]
    pub counted_power_w: Array1<f64>,
    /// energy per time step [J]
    pub energy_incr_j: Array1<f64>,
    /// cumulative energy [J]
    pub energy_cumu_j: Array1<f64>,
    /// cumulative distance [m]
    pub dist_cumu_m: Array1<f64>,
}

impl SerdeAPI for EnergyTrace {}

impl EnergyTrace {
    /// Integrates tractive energy over `cyc`
    ///
    /// # Arguments
    /// - veh: vehicle snapshot
    /// - env: environment snapshot, headwind and air properties apply to every sample
    /// - cyc: drive cycle
    /// - energy_params: regen efficiency and grade options
    pub fn new(
        veh: &VehicleParameters,
        env: &EnvironmentState,
        cyc: &DriveCycle,
        energy_params: &CycleEnergyParams,
    ) -> anyhow::Result<Self> {
        veh.validate()?;
        env.validate()?;
        energy_params.validate()?;
        cyc.init_checks().with_context(|| format!("Invalid drive cycle {:?}", cyc.name))?;

        #[cfg(feature = "logging")]
        if energy_params.grade_handling == GradeHandling::FlatTerrain && cyc.has_grade() {
            log::warn!(
                "drive cycle {:?} has grade data that is ignored under {:?}",
                cyc.name,
                energy_params.grade_handling
            );
        }

        let traction_force_n: Array1<f64> = (0..cyc.len())
            .map(|i| {
                cycle_traction_force(
                    veh,
                    env,
                    energy_params,
                    cyc.mps[i],
                    cyc.accel_mps2[i],
                    cyc.grade_at_i(i),
                )
            })
            .collect();
        let tractive_power_w = &traction_force_n * &cyc.mps;
        let counted_power_w = tractive_power_w.mapv(|p| energy_params.counted_power_w(p));
        let dt_s = cyc.dt_s();
        let energy_incr_j = &counted_power_w * &dt_s;
        let energy_cumu_j = utils::ndarrcumsum(&energy_incr_j);
        let dist_cumu_m = utils::ndarrcumsum(&(&cyc.mps * &dt_s));

        Ok(Self {
            name: cyc.name.clone(),
            energy_params: *energy_params,
            time_s: cyc.time_s.clone(),
            traction_force_n,
            tractive_power_w,
            counted_power_w,
            energy_incr_j,
            energy_cumu_j,
            dist_cumu_m,
        })
    }

    pub fn len(&self) -> usize {
        self.time_s.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn total_energy_j(&self) -> f64 {
        self.energy_cumu_j.last().copied().unwrap_or_default()
    }

    pub fn total_energy_kwh(&self) -> f64 {
        self.total_energy_j() / params::J_PER_KWH
    }

    pub fn total_dist_m(&self) -> f64 {
        self.dist_cumu_m.last().copied().unwrap_or_default()
    }

    pub fn total_dist_km(&self) -> f64 {
        self.total_dist_m() / params::M_PER_KM
    }

    /// Energy recovered by regenerative braking, $J$, non-positive
    pub fn regen_energy_j(&self) -> f64 {
        self.energy_incr_j.iter().filter(|e| **e < 0.0).sum()
    }

    /// Specific consumption, $\frac{kWh}{km}$, `None` when no distance is
    /// covered
    pub fn kwh_per_km(&self) -> Option<f64> {
        let dist_km = self.total_dist_km();
        if dist_km == 0.0 {
            #[cfg(feature = "logging")]
            log::warn!(
                "specific consumption of {:?} is undefined: zero distance covered",
                self.name
            );
            None
        } else {
            Some(self.total_energy_kwh() / dist_km)
        }
    }

    /// Like [Self::kwh_per_km] but reports zero distance as
    /// [ModelError::UndefinedRatio]
    pub fn try_kwh_per_km(&self) -> ModelResult<f64> {
        self.kwh_per_km().ok_or(ModelError::UndefinedRatio(
            "specific consumption with zero distance",
        ))
    }

    pub fn wh_per_km(&self) -> Option<f64> {
        self.kwh_per_km().map(|x| x * params::WH_PER_KWH)
    }

    /// Range per unit energy, `None` when distance or energy is zero
    pub fn km_per_kwh(&self) -> Option<f64> {
        self.kwh_per_km()
            .and_then(|x| (x != 0.0).then_some(1.0 / x))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vehicle::mock_vehicle;

    fn flat_env() -> EnvironmentState {
        EnvironmentState::default()
    }

    #[test]
    fn test_constant_speed_energy_is_power_times_time() {
        let veh = mock_vehicle();
        let env = flat_env();
        let speed_mps = params::kph_to_mps(50.0);
        let cyc = DriveCycle::constant_speed(speed_mps, 600.0, 1.0).unwrap();
        let trace = EnergyTrace::new(&veh, &env, &cyc, &CycleEnergyParams::default()).unwrap();
        let force_n = forces::aero_drag_force(speed_mps, 7.5, 1.22007, 0.4)
            + forces::rolling_force(2570.0, 0.0, speed_mps, 0.008, 1.6e-6);
        let power_w = force_n * speed_mps;
        assert!(trace.tractive_power_w.iter().all(|p| *p == power_w));
        assert!(utils::almost_eq(trace.total_energy_j(), power_w * 600.0, Some(1e-12)));
        assert!(utils::almost_eq(trace.total_dist_m(), speed_mps * 600.0, Some(1e-12)));
        let kwh_per_km = trace.kwh_per_km().unwrap();
        assert!(utils::almost_eq(
            kwh_per_km,
            force_n / params::J_PER_KWH * params::M_PER_KM,
            Some(1e-9)
        ));
        assert!(utils::almost_eq(trace.wh_per_km().unwrap(), kwh_per_km * 1e3, None));
        assert!(utils::almost_eq(trace.km_per_kwh().unwrap(), 1.0 / kwh_per_km, None));
    }

    #[test]
    fn test_first_interval_is_zero() {
        let veh = mock_vehicle();
        let cyc = DriveCycle::test_cyc();
        let trace = EnergyTrace::new(&veh, &flat_env(), &cyc, &CycleEnergyParams::default()).unwrap();
        assert_eq!(trace.energy_incr_j[0], 0.0);
        assert_eq!(trace.dist_cumu_m[0], 0.0);
        assert_eq!(trace.total_dist_m(), 45.0);
    }

    #[test]
    fn test_invalid_cycle_is_rejected() {
        let veh = mock_vehicle();
        let mut cyc = DriveCycle::test_cyc();
        cyc.time_s[4] = 2.5;
        let err = EnergyTrace::new(&veh, &flat_env(), &cyc, &CycleEnergyParams::default())
            .unwrap_err();
        assert!(format!("{err:#}").contains("not sorted"));
        let mut cyc = DriveCycle::test_cyc();
        cyc.mps[2] = f64::INFINITY;
        assert!(EnergyTrace::new(&veh, &flat_env(), &cyc, &CycleEnergyParams::default()).is_err());
    }

    fn braking_cyc() -> DriveCycle {
        DriveCycle::from_speed_trace(
            String::from("braking"),
            array![0.0, 1.0, 2.0, 3.0],
            array![20.0, 15.0, 10.0, 5.0],
        )
        .unwrap()
    }

    #[test]
    fn test_regen_policy() {
        let veh = mock_vehicle();
        let cyc = braking_cyc();
        let no_regen = EnergyTrace::new(
            &veh,
            &flat_env(),
            &cyc,
            &CycleEnergyParams::default().with_regen_eff(0.0),
        )
        .unwrap();
        let full_regen = EnergyTrace::new(
            &veh,
            &flat_env(),
            &cyc,
            &CycleEnergyParams::default().with_regen_eff(1.0),
        )
        .unwrap();
        for i in 1..cyc.len() {
            assert!(full_regen.tractive_power_w[i] < 0.0);
            assert_eq!(no_regen.energy_incr_j[i], 0.0);
            assert_eq!(
                full_regen.energy_incr_j[i],
                full_regen.tractive_power_w[i] * 1.0
            );
        }
        assert_eq!(no_regen.total_energy_j(), 0.0);
        assert!(full_regen.total_energy_j() < 0.0);
        assert_eq!(full_regen.regen_energy_j(), full_regen.total_energy_j());

        let partial = EnergyTrace::new(&veh, &flat_env(), &cyc, &CycleEnergyParams::default())
            .unwrap();
        assert!(utils::almost_eq(
            partial.total_energy_j(),
            0.65 * full_regen.total_energy_j(),
            Some(1e-12)
        ));
    }

    #[test]
    fn test_regen_eff_out_of_range() {
        let err = EnergyTrace::new(
            &mock_vehicle(),
            &flat_env(),
            &braking_cyc(),
            &CycleEnergyParams::default().with_regen_eff(1.5),
        )
        .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ModelError>(),
            Some(ModelError::InvalidParameter { name: "regen_eff", .. })
        ));
    }

    #[test]
    fn test_zero_distance_consumption_is_undefined() {
        let cyc = DriveCycle::constant_speed(0.0, 60.0, 1.0).unwrap();
        let trace =
            EnergyTrace::new(&mock_vehicle(), &flat_env(), &cyc, &CycleEnergyParams::default())
                .unwrap();
        assert_eq!(trace.total_dist_m(), 0.0);
        assert_eq!(trace.total_energy_j(), 0.0);
        assert!(trace.kwh_per_km().is_none());
        assert!(trace.km_per_kwh().is_none());
        assert_eq!(
            trace.try_kwh_per_km(),
            Err(ModelError::UndefinedRatio(
                "specific consumption with zero distance"
            ))
        );
    }

    #[test]
    fn test_grade_handling() {
        let veh = mock_vehicle();
        let cyc = DriveCycle::constant_speed(10.0, 600.0, 1.0)
            .unwrap()
            .with_sinusoidal_grade(5.0, 600.0)
            .unwrap();
        let flat = EnergyTrace::new(&veh, &flat_env(), &cyc, &CycleEnergyParams::default())
            .unwrap();
        let flat_cyc = DriveCycle::constant_speed(10.0, 600.0, 1.0).unwrap();
        let flat_ref =
            EnergyTrace::new(&veh, &flat_env(), &flat_cyc, &CycleEnergyParams::default())
                .unwrap();
        assert_eq!(flat.total_energy_j(), flat_ref.total_energy_j());

        let graded_params = CycleEnergyParams {
            grade_handling: GradeHandling::FromCycle,
            ..Default::default()
        };
        let graded = EnergyTrace::new(&veh, &flat_env(), &cyc, &graded_params).unwrap();
        // uphill at a quarter period, downhill at three quarters
        assert!(graded.traction_force_n[150] > flat.traction_force_n[150]);
        assert!(graded.traction_force_n[450] < flat.traction_force_n[450]);
        // downhill power partially lost to regen efficiency
        assert!(graded.total_energy_j() > flat.total_energy_j());
    }

    #[test]
    fn test_rot_inertia_option() {
        let veh = mock_vehicle();
        let cyc = DriveCycle::test_cyc();
        let plain = EnergyTrace::new(&veh, &flat_env(), &cyc, &CycleEnergyParams::default())
            .unwrap();
        let params_km = CycleEnergyParams {
            apply_rot_inertia: true,
            ..Default::default()
        };
        let with_km = EnergyTrace::new(&veh, &flat_env(), &cyc, &params_km).unwrap();
        assert!(utils::almost_eq(
            with_km.traction_force_n[5] - plain.traction_force_n[5],
            0.1 * 2570.0 * 1.0,
            Some(1e-9)
        ));
    }

    #[test]
    fn test_headwind_increases_energy() {
        let veh = mock_vehicle();
        let cyc = DriveCycle::constant_speed(15.0, 100.0, 1.0).unwrap();
        let calm = EnergyTrace::new(&veh, &flat_env(), &cyc, &CycleEnergyParams::default())
            .unwrap();
        let windy = EnergyTrace::new(
            &veh,
            &flat_env().with_headwind_kph(20.0),
            &cyc,
            &CycleEnergyParams::default(),
        )
        .unwrap();
        assert!(windy.total_energy_j() > calm.total_energy_j());
    }

    #[test]
    fn test_deterministic() {
        let veh = mock_vehicle();
        let cyc = braking_cyc();
        let a = EnergyTrace::new(&veh, &flat_env(), &cyc, &CycleEnergyParams::default()).unwrap();
        let b = EnergyTrace::new(&veh, &flat_env(), &cyc, &CycleEnergyParams::default()).unwrap();
        assert_eq!(a, b);
    }
}
