//! Module containing battery capacity sizing and pack configuration.

use crate::energy::EnergyTrace;
use crate::error::{ensure_fraction, ensure_non_negative, ensure_positive};
use crate::imports::*;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
/// Range and usage targets the battery is sized against
pub struct BatteryRequirements {
    /// required range [km]
    #[serde(default = "default_range_km")]
    pub range_km: f64,
    /// specific consumption [kWh/km], typically from a drive cycle
    pub consumption_kwh_per_km: f64,
    /// discharge efficiency
    #[serde(default = "default_battery_eff")]
    pub battery_eff: f64,
    /// lowest allowed state of charge
    #[serde(default)]
    pub min_soc: f64,
    /// highest allowed state of charge
    #[serde(default = "default_max_soc")]
    pub max_soc: f64,
    /// auxiliary loads as a fraction of usable capacity
    #[serde(default = "default_aux_load_factor")]
    pub aux_load_factor: f64,
}

fn default_range_km() -> f64 {
    150.0
}
fn default_battery_eff() -> f64 {
    0.95
}
fn default_max_soc() -> f64 {
    1.0
}
fn default_aux_load_factor() -> f64 {
    0.1
}

impl SerdeAPI for BatteryRequirements {
    fn init(&mut self) -> anyhow::Result<()> {
        self.validate()?;
        Ok(())
    }
}

impl BatteryRequirements {
    pub fn new(consumption_kwh_per_km: f64) -> Self {
        Self {
            range_km: default_range_km(),
            consumption_kwh_per_km,
            battery_eff: default_battery_eff(),
            min_soc: 0.0,
            max_soc: default_max_soc(),
            aux_load_factor: default_aux_load_factor(),
        }
    }

    /// Requirements with the specific consumption of `trace`; fails with
    /// [ModelError::UndefinedRatio] if the trace covers no distance
    pub fn from_trace(trace: &EnergyTrace) -> ModelResult<Self> {
        Ok(Self::new(trace.try_kwh_per_km()?))
    }

    pub fn with_range_km(self, range_km: f64) -> Self {
        Self { range_km, ..self }
    }

    pub fn validate(&self) -> ModelResult<()> {
        ensure_positive("range_km", self.range_km)?;
        ensure_positive("consumption_kwh_per_km", self.consumption_kwh_per_km)?;
        ensure_fraction("battery_eff", self.battery_eff)?;
        ensure_positive("battery_eff", self.battery_eff)?;
        ensure_fraction("min_soc", self.min_soc)?;
        ensure_fraction("max_soc", self.max_soc)?;
        if self.max_soc <= self.min_soc {
            return Err(ModelError::invalid(
                "max_soc",
                format!(
                    "must be greater than min_soc ({}), got {}",
                    self.min_soc, self.max_soc
                ),
            ));
        }
        ensure_non_negative("aux_load_factor", self.aux_load_factor)?;
        Ok(())
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
/// Capacity build-up from range to installed energy, all in kWh
pub struct BatterySizing {
    pub requirements: BatteryRequirements,
    /// range times consumption
    pub energy_required_kwh: f64,
    /// after discharge efficiency
    pub usable_capacity_kwh: f64,
    /// after restricting to the state of charge window
    pub soc_capacity_kwh: f64,
    /// after auxiliary loads
    pub total_capacity_kwh: f64,
}

impl BatterySizing {
    pub fn new(requirements: &BatteryRequirements) -> ModelResult<Self> {
        requirements.validate()?;
        let energy_required_kwh = requirements.range_km * requirements.consumption_kwh_per_km;
        let usable_capacity_kwh = energy_required_kwh / requirements.battery_eff;
        let soc_capacity_kwh = usable_capacity_kwh / (requirements.max_soc - requirements.min_soc);
        Ok(Self {
            requirements: *requirements,
            energy_required_kwh,
            usable_capacity_kwh,
            soc_capacity_kwh,
            total_capacity_kwh: soc_capacity_kwh * (1.0 + requirements.aux_load_factor),
        })
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
/// Cell datasheet values
pub struct CellSpec {
    pub nominal_voltage_v: f64,
    pub charged_voltage_v: f64,
    pub discharged_voltage_v: f64,
    pub capacity_ah: f64,
    /// gravimetric energy density at pack level [Wh/kg]
    pub specific_energy_wh_per_kg: f64,
    /// volumetric energy density at pack level [Wh/L]
    pub energy_density_wh_per_l: f64,
}

impl Default for CellSpec {
    /// LFP prismatic cell
    fn default() -> Self {
        Self {
            nominal_voltage_v: 3.2,
            charged_voltage_v: 3.6,
            discharged_voltage_v: 2.5,
            capacity_ah: 100.0,
            specific_energy_wh_per_kg: 120.0,
            energy_density_wh_per_l: 235.0,
        }
    }
}

impl SerdeAPI for CellSpec {
    fn init(&mut self) -> anyhow::Result<()> {
        self.validate()?;
        Ok(())
    }
}

impl CellSpec {
    pub fn validate(&self) -> ModelResult<()> {
        ensure_positive("nominal_voltage_v", self.nominal_voltage_v)?;
        ensure_positive("charged_voltage_v", self.charged_voltage_v)?;
        ensure_positive("discharged_voltage_v", self.discharged_voltage_v)?;
        if !(self.discharged_voltage_v <= self.nominal_voltage_v
            && self.nominal_voltage_v <= self.charged_voltage_v)
        {
            return Err(ModelError::invalid(
                "nominal_voltage_v",
                format!(
                    "voltages must satisfy discharged ({}) <= nominal ({}) <= charged ({})",
                    self.discharged_voltage_v, self.nominal_voltage_v, self.charged_voltage_v
                ),
            ));
        }
        ensure_positive("capacity_ah", self.capacity_ah)?;
        ensure_positive("specific_energy_wh_per_kg", self.specific_energy_wh_per_kg)?;
        ensure_positive("energy_density_wh_per_l", self.energy_density_wh_per_l)?;
        Ok(())
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
/// Series/parallel layout of cells meeting a target voltage and capacity
pub struct PackConfiguration {
    pub cell: CellSpec,
    pub target_voltage_v: f64,
    pub cells_in_series: u32,
    pub nominal_voltage_v: f64,
    pub charged_voltage_v: f64,
    pub discharged_voltage_v: f64,
    pub energy_per_string_kwh: f64,
    pub parallel_strings: u32,
    pub total_cells: u32,
    /// installed capacity, at least the required capacity
    pub final_capacity_kwh: f64,
    pub weight_kg: f64,
    pub volume_l: f64,
}

impl SerdeAPI for PackConfiguration {}

/// `ceil(x)` as a count, for finite positive `x`. Ratios within rounding
/// error of a whole number are not bumped to the next one.
fn ceil_count(name: &'static str, x: f64) -> ModelResult<u32> {
    ensure_positive(name, x)?;
    if x > u32::MAX as f64 {
        return Err(ModelError::invalid(name, format!("{x} exceeds a countable number")));
    }
    let nearest = x.round();
    if nearest > 0.0 && utils::almost_eq(x, nearest, Some(1e-9)) {
        Ok(nearest as u32)
    } else {
        Ok(x.ceil() as u32)
    }
}

impl PackConfiguration {
    /// # Arguments
    /// - required_capacity_kwh: e.g. [BatterySizing::total_capacity_kwh]
    /// - target_voltage_v: nominal pack (motor) voltage
    /// - cell: cell datasheet
    pub fn new(
        required_capacity_kwh: f64,
        target_voltage_v: f64,
        cell: &CellSpec,
    ) -> ModelResult<Self> {
        cell.validate()?;
        ensure_positive("target_voltage_v", target_voltage_v)?;
        let cells_in_series = ceil_count(
            "target_voltage_v",
            target_voltage_v / cell.nominal_voltage_v,
        )?;
        let n_s = cells_in_series as f64;
        let nominal_voltage_v = n_s * cell.nominal_voltage_v;
        let energy_per_string_kwh = nominal_voltage_v * cell.capacity_ah / params::WH_PER_KWH;
        let parallel_strings = ceil_count(
            "required_capacity_kwh",
            required_capacity_kwh / energy_per_string_kwh,
        )?;
        let final_capacity_kwh = energy_per_string_kwh * parallel_strings as f64;
        let final_capacity_wh = final_capacity_kwh * params::WH_PER_KWH;
        #[cfg(feature = "logging")]
        log::debug!(
            "{cells_in_series}s{parallel_strings}p pack, {final_capacity_kwh:.2} kWh for {required_capacity_kwh:.2} kWh required"
        );
        Ok(Self {
            cell: *cell,
            target_voltage_v,
            cells_in_series,
            nominal_voltage_v,
            charged_voltage_v: n_s * cell.charged_voltage_v,
            discharged_voltage_v: n_s * cell.discharged_voltage_v,
            energy_per_string_kwh,
            parallel_strings,
            total_cells: cells_in_series * parallel_strings,
            final_capacity_kwh,
            weight_kg: final_capacity_wh / cell.specific_energy_wh_per_kg,
            volume_l: final_capacity_wh / cell.energy_density_wh_per_l,
        })
    }
}
