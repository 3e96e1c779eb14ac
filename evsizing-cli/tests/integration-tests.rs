use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::path::PathBuf;
use std::process::Command;

fn resources_dir() -> Result<PathBuf, Box<dyn std::error::Error>> {
    Ok(project_root::get_project_root()?.join("evsizing-core/resources"))
}

#[test]
fn test_that_cli_dynamics_works_with_default_vehicle() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("evsizing-cli")?;
    cmd.args(["dynamics"]);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Rolling resistance force: 0.23 kN"))
        .stdout(predicate::str::contains("Terminal velocity:"));
    Ok(())
}

#[test]
fn test_that_cli_dynamics_works_with_vehicle_file() -> Result<(), Box<dyn std::error::Error>> {
    let veh_file = resources_dir()?.join("vehicles/light_van.yaml");
    let mut cmd = Command::cargo_bin("evsizing-cli")?;
    cmd.args([
        "--veh-file",
        veh_file.to_str().unwrap(),
        "--res-fmt",
        "json",
        "dynamics",
        "--profiles",
    ]);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("\"gradeability_force_n\""))
        .stdout(predicate::str::contains("\"velocity_mps\""));
    Ok(())
}

#[test]
fn test_that_cli_scenarios_reports_envelope() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("evsizing-cli")?;
    cmd.args(["scenarios", "--serial"]);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Current Situation:"))
        .stdout(predicate::str::contains(
            "Highest power:",
        ))
        .stdout(predicate::str::contains("(Time to 100 km/h in 12 seconds)"))
        .stdout(predicate::str::contains("Required gear ratio: 7.9"));
    Ok(())
}

#[test]
fn test_that_cli_cycle_works_with_legacy_profile() -> Result<(), Box<dyn std::error::Error>> {
    let cyc_file = resources_dir()?.join("cycles/city_profile.csv");
    let mut cmd = Command::cargo_bin("evsizing-cli")?;
    cmd.args(["cycle", "--cyc-file", cyc_file.to_str().unwrap(), "--legacy-csv"]);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Cycle: city_profile"))
        .stdout(predicate::str::contains("Wh/km"));
    Ok(())
}

#[test]
fn test_that_cli_battery_works_with_yaml_output() -> Result<(), Box<dyn std::error::Error>> {
    let cyc_file = resources_dir()?.join("cycles/constant_50kph.csv");
    let mut cmd = Command::cargo_bin("evsizing-cli")?;
    cmd.args([
        "--res-fmt",
        "yaml",
        "battery",
        "--cyc-file",
        cyc_file.to_str().unwrap(),
        "--range-km",
        "200",
    ]);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("total_capacity_kwh:"))
        .stdout(predicate::str::contains("cells_in_series:"));
    Ok(())
}

#[test]
fn test_that_cli_fails_on_missing_cycle() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("evsizing-cli")?;
    cmd.args(["cycle", "--cyc-file", "does/not/exist.csv"]);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Could not load cycle"));
    Ok(())
}

#[test]
fn test_that_cli_rejects_unknown_result_format() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("evsizing-cli")?;
    cmd.args(["--res-fmt", "xml", "dynamics"]);
    cmd.assert().failure();
    Ok(())
}

#[test]
fn test_that_cli_accepts_repeated_verbosity() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("evsizing-cli")?;
    cmd.args(["-vv", "dynamics"]);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Operating point: 100.00 km/h"));
    Ok(())
}
