pub use crate::battery::{BatteryRequirements, BatterySizing, CellSpec, PackConfiguration};
pub use crate::drive_cycle::{DriveCycle, DriveCycleElement};
pub use crate::drivetrain::{DrivetrainParams, DrivetrainSizing};
pub use crate::dynamics::{
    DynamicsReport, MotionTrace, SizingRequirements, VehicleDynamics, VehicleProfile,
};
pub use crate::energy::{CycleEnergyParams, EnergyTrace, GradeHandling};
pub use crate::environment::EnvironmentState;
pub use crate::error::{ModelError, ModelResult};
pub use crate::forces::{ForceComponents, KinematicSample};
pub use crate::motion::{MotionCoefficients, MotionProfile};
pub use crate::power::PowerTorque;
pub use crate::scenario::{
    evaluate_scenarios, evaluate_scenarios_into, MotorSizingEnvelope, Scenario,
    ScenarioEvaluation, ScenarioResult, ScenarioSet,
};
pub use crate::traits::{Linspace, SerdeAPI};
pub use crate::vehicle::VehicleParameters;
