//! Module containing physical constants, environment defaults and unit conversions.

/// Unit conversions that should NEVER change
pub const KPH_PER_MPS: f64 = 3.6;
pub const MPS_PER_KPH: f64 = 1.0 / KPH_PER_MPS;
pub const J_PER_KWH: f64 = 3.6e6;
pub const W_PER_KW: f64 = 1e3;
pub const N_PER_KN: f64 = 1e3;
pub const M_PER_KM: f64 = 1e3;
pub const WH_PER_KWH: f64 = 1e3;
pub const SECS_PER_MIN: f64 = 60.0;

/// Gravitational acceleration, $\frac{m}{s^2}$
pub const A_GRAV_MPS2: f64 = 9.81;
/// Sea level air density, $\frac{kg}{m^3}$
pub const AIR_DENSITY_KG_PER_M3: f64 = 1.22007;
/// Drag coefficient for a light van
pub const DRAG_COEF_DEFAULT: f64 = 0.4;

/// Multiplier on $1 / \sqrt{K_1 K_2}$ giving the time to reach 98% of terminal
/// velocity, since $\operatorname{atanh}(0.98) \approx 2.3$
pub const TERMINAL_RISE_FACTOR: f64 = 2.3;

/// Reference speed for the "time to 100 km/h" requirement
pub const REF_SPEED_KPH: f64 = 100.0;

/// Default time grid for motion profiles
pub const PROFILE_T_END_S: f64 = 80.0;
pub const PROFILE_POINTS: usize = 100;

/// Default regenerative braking efficiency for drive-cycle energy
pub const REGEN_EFF_DEFAULT: f64 = 0.65;

/// Convert speed in km/h to m/s
pub fn kph_to_mps(kph: f64) -> f64 {
    kph * MPS_PER_KPH
}

/// Convert road grade in percent (rise/run * 100) to road angle in radians
pub fn grade_pct_to_rad(grade_pct: f64) -> f64 {
    (grade_pct / 100.0).atan()
}
