use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use simplelog::{ColorChoice, Config, LevelFilter, TermLogger, TerminalMode};

extern crate evsizing_core;
use evsizing_core::prelude::*;
use evsizing_core::params::{J_PER_KWH, KPH_PER_MPS, N_PER_KN, W_PER_KW};
use evsizing_core::vehicle::mock_vehicle;

/// Electric vehicle sizing from road load, scenarios and drive cycles.
/// After running `cargo build --release`, run with
/// ```bash
/// ./target/release/evsizing-cli --veh-file evsizing-core/resources/vehicles/light_van.yaml dynamics
/// ./target/release/evsizing-cli cycle --cyc-file evsizing-core/resources/cycles/city_profile.csv --legacy-csv
/// ```
/// Without `--veh-file`, a 2570 kg light van is used.
#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
struct EvSizingApi {
    #[clap(long, value_parser, global = true)]
    /// Path to vehicle profile file (yaml or json)
    veh_file: Option<String>,
    #[clap(long, value_parser = ["text", "json", "yaml"], default_value = "text", global = true)]
    /// How to return results
    res_fmt: String,
    #[clap(short, long, action = clap::ArgAction::Count, global = true)]
    /// Log verbosity, repeat for more
    verbose: u8,
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Road load, traction, power and terminal velocity at the top speed requirement
    Dynamics {
        #[clap(long, value_parser, default_value_t = 80.0)]
        /// End of the motion profile time grid [s]
        t_end: f64,
        #[clap(long, action)]
        /// Include velocity/distance/power profiles in json/yaml output
        profiles: bool,
    },
    /// Power and torque over the standard scenarios, plus drivetrain sizing
    Scenarios {
        #[clap(long, value_parser, default_value_t = 60.0)]
        /// Speed of the user scenario [km/h]
        speed_kph: f64,
        #[clap(long, value_parser, default_value_t = 5.0)]
        /// Grade of the user scenario [%]
        grade_pct: f64,
        #[clap(long, value_parser, default_value_t = 1.0)]
        /// Acceleration of the user scenario [m/s^2]
        accel_mps2: f64,
        #[clap(long, value_parser, default_value_t = 0.0)]
        /// Headwind for the user and steady-speed scenarios [km/h]
        headwind_kph: f64,
        #[clap(long, value_parser)]
        /// Path to a scenario list (yaml or json) replacing the standard scenarios
        scenario_file: Option<String>,
        #[clap(long, value_parser, default_value_t = 7000.0)]
        /// Maximum motor speed [rpm]
        motor_max_rpm: f64,
        #[clap(long, value_parser, default_value_t = 0.9)]
        /// Drivetrain efficiency
        drivetrain_eff: f64,
        #[clap(long, action)]
        /// Evaluate scenarios serially
        serial: bool,
    },
    /// Energy consumption over a drive cycle
    Cycle {
        #[clap(flatten)]
        cycle: CycleArgs,
    },
    /// Battery capacity and pack configuration for a drive cycle and range
    Battery {
        #[clap(flatten)]
        cycle: CycleArgs,
        #[clap(long, value_parser, default_value_t = 150.0)]
        /// Required range [km]
        range_km: f64,
        #[clap(long, value_parser, default_value_t = 0.95)]
        /// Battery discharge efficiency
        battery_eff: f64,
        #[clap(long, value_parser, default_value_t = 0.0)]
        min_soc: f64,
        #[clap(long, value_parser, default_value_t = 1.0)]
        max_soc: f64,
        #[clap(long, value_parser, default_value_t = 0.1)]
        /// Auxiliary load factor
        aux_load_factor: f64,
        #[clap(long, value_parser, default_value_t = 350.0)]
        /// Nominal pack voltage [V]
        pack_voltage: f64,
        #[clap(long, value_parser)]
        /// Path to cell specification file (yaml or json)
        cell_file: Option<String>,
    },
}

#[derive(Args)]
struct CycleArgs {
    #[clap(long, value_parser)]
    /// Path to cycle file (csv, yaml or json)
    cyc_file: String,
    #[clap(long, action)]
    /// Read `--cyc-file` as a `;` separated drive profile with decimal commas
    legacy_csv: bool,
    #[clap(long, value_parser, default_value_t = 0.65)]
    /// Regenerative braking efficiency
    regen_eff: f64,
    #[clap(long, action)]
    /// Include the cycle's grade in the force balance
    use_grade: bool,
    #[clap(long, action)]
    /// Scale the inertial force by the rotational inertia factor
    rot_inertia: bool,
}

impl CycleArgs {
    fn load_cycle(&self) -> anyhow::Result<DriveCycle> {
        if self.legacy_csv {
            DriveCycle::from_legacy_profile_file(&self.cyc_file)
        } else if self.cyc_file.to_lowercase().ends_with(".csv") {
            DriveCycle::from_csv_file(&self.cyc_file)
        } else {
            DriveCycle::from_file(&self.cyc_file)
        }
    }

    fn energy_params(&self) -> CycleEnergyParams {
        CycleEnergyParams {
            regen_eff: self.regen_eff,
            grade_handling: if self.use_grade {
                GradeHandling::FromCycle
            } else {
                GradeHandling::FlatTerrain
            },
            apply_rot_inertia: self.rot_inertia,
        }
    }

    fn energy_trace(&self, profile: &VehicleProfile) -> anyhow::Result<EnergyTrace> {
        let cyc = self
            .load_cycle()
            .with_context(|| format!("Could not load cycle {:?}", self.cyc_file))?;
        EnergyTrace::new(&profile.veh, &profile.env, &cyc, &self.energy_params())
    }
}

#[derive(Debug, Serialize)]
struct CycleSummary {
    name: String,
    total_time_s: f64,
    total_energy_kwh: f64,
    regen_energy_kwh: f64,
    total_dist_km: f64,
    kwh_per_km: Option<f64>,
    wh_per_km: Option<f64>,
}

impl From<&EnergyTrace> for CycleSummary {
    fn from(trace: &EnergyTrace) -> Self {
        Self {
            name: trace.name.clone(),
            total_time_s: match (trace.time_s.first(), trace.time_s.last()) {
                (Some(first), Some(last)) => last - first,
                _ => 0.0,
            },
            total_energy_kwh: trace.total_energy_kwh(),
            regen_energy_kwh: trace.regen_energy_j() / J_PER_KWH,
            total_dist_km: trace.total_dist_km(),
            kwh_per_km: trace.kwh_per_km(),
            wh_per_km: trace.wh_per_km(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ScenarioResults {
    #[serde(flatten)]
    evaluation: ScenarioEvaluation,
    drivetrain: DrivetrainSizing,
}

#[derive(Debug, Serialize)]
struct BatteryResults {
    cycle: CycleSummary,
    sizing: BatterySizing,
    pack: PackConfiguration,
}

#[derive(Debug, Serialize)]
struct DynamicsResults {
    #[serde(flatten)]
    report: DynamicsReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    profiles: Option<MotionTrace>,
}

fn write_structured<T: Serialize>(results: &T, res_fmt: &str) -> anyhow::Result<()> {
    match res_fmt {
        "json" => println!("{}", serde_json::to_string_pretty(results)?),
        "yaml" => print!("{}", serde_yaml::to_string(results)?),
        _ => anyhow::bail!("Unsupported result format {res_fmt:?}"),
    }
    Ok(())
}

fn fmt_opt(val: Option<f64>, precision: usize) -> String {
    val.map_or_else(
        || String::from("undefined"),
        |val| format!("{val:.precision$}"),
    )
}

fn load_profile(veh_file: &Option<String>) -> anyhow::Result<VehicleProfile> {
    match veh_file {
        Some(veh_file) => VehicleProfile::from_file(veh_file)
            .with_context(|| format!("Could not load vehicle profile {veh_file:?}")),
        None => Ok(VehicleProfile {
            veh: mock_vehicle(),
            requirements: SizingRequirements::default(),
            env: EnvironmentState::default(),
        }),
    }
}

fn run_dynamics(
    profile: &VehicleProfile,
    res_fmt: &str,
    t_end: f64,
    profiles: bool,
) -> anyhow::Result<()> {
    let report = profile.report()?;
    if res_fmt != "text" {
        let profiles = if profiles {
            Some(report.motion_trace(t_end, 100)?)
        } else {
            None
        };
        return write_structured(&DynamicsResults { report, profiles }, res_fmt);
    }
    let forces = &report.forces;
    println!("Vehicle: {}", profile.veh.name);
    println!(
        "Operating point: {:.2} km/h, {:.2} m/s^2",
        report.sample.speed_mps * KPH_PER_MPS,
        report.sample.accel_mps2
    );
    println!("Rolling resistance force: {:.2} kN", forces.rolling_n / N_PER_KN);
    println!("Gravitational force: {:.2} kN", forces.gravitational_n / N_PER_KN);
    println!("Aerodynamic drag force: {:.2} kN", forces.drag_n / N_PER_KN);
    println!("Road load force: {:.2} kN", forces.road_load_n / N_PER_KN);
    println!("Traction force: {:.2} kN", forces.traction_n / N_PER_KN);
    println!("Required power: {:.2} kW", report.power_torque.power_kw());
    println!("Required wheel torque: {:.0} N*m", report.power_torque.torque_nm);
    println!(
        "Gradeability traction force: {:.2} kN",
        report.gradeability_force_n / N_PER_KN
    );
    println!("K1: {:.5}", report.coefs.k1());
    println!("K2: {:.5}", report.coefs.k2());
    match report.motion_profile() {
        Ok(motion) => {
            println!(
                "Terminal velocity: {:.2} km/h",
                motion.terminal_velocity_mps() * KPH_PER_MPS
            );
            println!("Time to terminal velocity: {:.2} s", motion.time_to_terminal_s());
            println!("Terminal power: {:.2} kW", motion.terminal_power_w() / W_PER_KW);
            let (peak_w, mean_w) = report.accel_power_w()?;
            println!("Peak acceleration power: {:.2} kW", peak_w / W_PER_KW);
            println!("Mean acceleration power: {:.2} kW", mean_w / W_PER_KW);
        }
        Err(err) => println!("Terminal velocity: {err}"),
    }
    Ok(())
}

fn run_scenarios(
    profile: &VehicleProfile,
    res_fmt: &str,
    current: Scenario,
    scenario_file: &Option<String>,
    dt_params: DrivetrainParams,
    parallelize: bool,
) -> anyhow::Result<()> {
    let scenarios = match scenario_file {
        Some(scenario_file) => ScenarioSet::from_file(scenario_file)
            .with_context(|| format!("Could not load scenarios {scenario_file:?}"))?,
        None => ScenarioSet::standard(current, &profile.requirements),
    };
    let dynamics = profile.dynamics()?;
    let evaluation = scenarios.evaluate(&dynamics, Some(parallelize))?;
    let drivetrain = DrivetrainSizing::new(
        &profile.veh,
        &profile.requirements,
        &evaluation.envelope,
        &dt_params,
    )?;
    if res_fmt != "text" {
        return write_structured(
            &ScenarioResults {
                evaluation,
                drivetrain,
            },
            res_fmt,
        );
    }
    for result in &evaluation.results {
        println!(
            "{}: {:.2} kW, {:.0} N*m",
            result.name,
            result.power_torque.power_kw(),
            result.power_torque.torque_nm
        );
    }
    let envelope = &evaluation.envelope;
    println!(
        "Highest power: {:.2} kW ({})",
        envelope.max_power_kw(),
        envelope.max_power_scenario.as_deref().unwrap_or("-")
    );
    println!(
        "Highest torque: {:.0} N*m ({})",
        envelope.max_torque_nm,
        envelope.max_torque_scenario.as_deref().unwrap_or("-")
    );
    println!("Required gear ratio: {:.1}", drivetrain.gear_ratio);
    println!("Required motor torque: {:.0} N*m", drivetrain.motor_torque_nm);
    println!(
        "Motor power rating: {:.2} kW",
        drivetrain.motor_power_rating_w / W_PER_KW
    );
    Ok(())
}

fn print_cycle_summary(summary: &CycleSummary) {
    println!("Cycle: {}", summary.name);
    println!("Duration: {:.0} s", summary.total_time_s);
    println!("Energy: {:.3} kWh", summary.total_energy_kwh);
    println!("Recovered energy: {:.3} kWh", -summary.regen_energy_kwh);
    println!("Distance: {:.3} km", summary.total_dist_km);
    println!("Consumption: {} Wh/km", fmt_opt(summary.wh_per_km, 1));
}

pub fn main() -> anyhow::Result<()> {
    let api = EvSizingApi::parse();
    let level = match api.verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    TermLogger::init(level, Config::default(), TerminalMode::Stderr, ColorChoice::Auto)?;
    log::info!("evsizing-cli {}", env!("CARGO_PKG_VERSION"));

    let profile = load_profile(&api.veh_file)?;
    let res_fmt = api.res_fmt.as_str();

    match api.command {
        Command::Dynamics { t_end, profiles } => run_dynamics(&profile, res_fmt, t_end, profiles),
        Command::Scenarios {
            speed_kph,
            grade_pct,
            accel_mps2,
            headwind_kph,
            scenario_file,
            motor_max_rpm,
            drivetrain_eff,
            serial,
        } => run_scenarios(
            &profile,
            res_fmt,
            Scenario::new(
                "Current Situation",
                speed_kph,
                grade_pct,
                accel_mps2,
                headwind_kph,
            ),
            &scenario_file,
            DrivetrainParams {
                motor_max_rpm,
                drivetrain_eff,
                base_speed_kph: None,
            },
            !serial,
        ),
        Command::Cycle { cycle } => {
            let trace = cycle.energy_trace(&profile)?;
            let summary = CycleSummary::from(&trace);
            if res_fmt == "text" {
                print_cycle_summary(&summary);
                Ok(())
            } else {
                write_structured(&summary, res_fmt)
            }
        }
        Command::Battery {
            cycle,
            range_km,
            battery_eff,
            min_soc,
            max_soc,
            aux_load_factor,
            pack_voltage,
            cell_file,
        } => {
            let trace = cycle.energy_trace(&profile)?;
            let requirements = BatteryRequirements {
                range_km,
                battery_eff,
                min_soc,
                max_soc,
                aux_load_factor,
                ..BatteryRequirements::from_trace(&trace)?
            };
            let sizing = BatterySizing::new(&requirements)?;
            let cell = match cell_file {
                Some(cell_file) => CellSpec::from_file(&cell_file)
                    .with_context(|| format!("Could not load cell spec {cell_file:?}"))?,
                None => CellSpec::default(),
            };
            let pack = PackConfiguration::new(sizing.total_capacity_kwh, pack_voltage, &cell)?;
            let results = BatteryResults {
                cycle: CycleSummary::from(&trace),
                sizing,
                pack,
            };
            if res_fmt != "text" {
                return write_structured(&results, res_fmt);
            }
            print_cycle_summary(&results.cycle);
            println!("Energy required: {:.2} kWh", sizing.energy_required_kwh);
            println!("Usable capacity: {:.2} kWh", sizing.usable_capacity_kwh);
            println!("Capacity including SoC: {:.2} kWh", sizing.soc_capacity_kwh);
            println!("Total capacity: {:.2} kWh", sizing.total_capacity_kwh);
            println!(
                "Pack: {}s{}p, {} cells",
                pack.cells_in_series, pack.parallel_strings, pack.total_cells
            );
            println!(
                "Pack voltage: {:.1} V nominal, {:.1} V charged, {:.1} V discharged",
                pack.nominal_voltage_v, pack.charged_voltage_v, pack.discharged_voltage_v
            );
            println!("Final capacity: {:.2} kWh", pack.final_capacity_kwh);
            println!("Weight: {:.2} kg", pack.weight_kg);
            println!("Volume: {:.2} L", pack.volume_l);
            Ok(())
        }
    }
}
