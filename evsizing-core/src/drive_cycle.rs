//! Module containing the drive cycle struct, its file formats and
//! deterministic synthetic cycles.

use crate::forces::KinematicSample;
use crate::imports::*;
use itertools::Itertools;

#[derive(Default, PartialEq, Clone, Debug, Deserialize, Serialize)]
/// One row of a drive cycle CSV
pub struct DriveCycleElement {
    /// time [s]
    pub time_s: f64,
    /// speed [m/s]
    pub mps: f64,
    /// acceleration [m/s^2], derived from speed if absent in every row
    pub accel_mps2: Option<f64>,
    /// grade [rise/run]
    pub grade: Option<f64>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
/// Time series of speed and acceleration samples, strictly increasing in
/// time but not necessarily uniformly spaced
pub struct DriveCycle {
    #[serde(default)]
    pub name: String,
    /// time [s]
    pub time_s: Array1<f64>,
    /// speed [m/s]
    pub mps: Array1<f64>,
    /// acceleration [m/s^2]
    pub accel_mps2: Array1<f64>,
    /// grade [rise/run]; flat terrain is assumed where absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grade: Option<Array1<f64>>,
}

impl SerdeAPI for DriveCycle {
    const ACCEPTED_FORMATS: &'static [&'static str] = &["yaml", "json", "bin", "csv"];

    fn init(&mut self) -> anyhow::Result<()> {
        self.init_checks()
    }

    fn to_writer<W: std::io::Write>(&self, wtr: W, format: &str) -> anyhow::Result<()> {
        match format.trim_start_matches('.').to_lowercase().as_str() {
            "yaml" | "yml" => serde_yaml::to_writer(wtr, self)?,
            "json" => serde_json::to_writer(wtr, self)?,
            #[cfg(feature = "bincode")]
            "bin" => bincode::serialize_into(wtr, self)?,
            "csv" => {
                let mut wtr = csv::Writer::from_writer(wtr);
                for elem in self.elements() {
                    wtr.serialize(elem)?;
                }
                wtr.flush()?
            }
            _ => bail!(
                "Unsupported format {format:?}, must be one of {:?}",
                Self::ACCEPTED_FORMATS
            ),
        }
        Ok(())
    }

    fn from_reader<R: std::io::Read>(rdr: R, format: &str) -> anyhow::Result<Self> {
        let mut deserialized = match format.trim_start_matches('.').to_lowercase().as_str() {
            "yaml" | "yml" => serde_yaml::from_reader(rdr)?,
            "json" => serde_json::from_reader(rdr)?,
            #[cfg(feature = "bincode")]
            "bin" => bincode::deserialize_from(rdr)?,
            "csv" => {
                let mut rdr = csv::Reader::from_reader(rdr);
                let elements = rdr
                    .deserialize()
                    .collect::<Result<Vec<DriveCycleElement>, _>>()?;
                Self::from_elements(elements)?
            }
            _ => bail!(
                "Unsupported format {format:?}, must be one of {:?}",
                Self::ACCEPTED_FORMATS
            ),
        };
        deserialized.init()?;
        Ok(deserialized)
    }
}

impl DriveCycle {
    pub(crate) fn init_checks(&self) -> anyhow::Result<()> {
        ensure!(!self.is_empty(), "Deserialized cycle is empty");
        ensure!(self.is_sorted(), "Deserialized cycle is not sorted in time");
        ensure!(
            self.are_fields_equal_length(),
            "Deserialized cycle has unequal field lengths\ntime_s: {}\nmps: {}\naccel_mps2: {}\ngrade: {:?}",
            self.time_s.len(),
            self.mps.len(),
            self.accel_mps2.len(),
            self.grade.as_ref().map(|grade| grade.len()),
        );
        ensure!(
            self.time_s
                .iter()
                .chain(self.mps.iter())
                .chain(self.accel_mps2.iter())
                .chain(self.grade.iter().flatten())
                .all(|x| x.is_finite()),
            "Deserialized cycle contains non-finite values"
        );
        Ok(())
    }

    /// Builds a cycle from CSV rows. Acceleration must be given in every row
    /// or in none, in which case it is derived from the speed trace.
    pub fn from_elements(elements: Vec<DriveCycleElement>) -> anyhow::Result<Self> {
        let n_accel = elements.iter().filter(|e| e.accel_mps2.is_some()).count();
        let n_grade = elements.iter().filter(|e| e.grade.is_some()).count();
        ensure!(
            n_accel == 0 || n_accel == elements.len(),
            "`accel_mps2` given in {n_accel} of {} rows; provide it in all rows or none",
            elements.len()
        );
        ensure!(
            n_grade == 0 || n_grade == elements.len(),
            "`grade` given in {n_grade} of {} rows; provide it in all rows or none",
            elements.len()
        );
        let time_s: Array1<f64> = elements.iter().map(|e| e.time_s).collect();
        let mps: Array1<f64> = elements.iter().map(|e| e.mps).collect();
        let accel_mps2 = if n_accel == 0 {
            accel_from_speed(&time_s, &mps)
        } else {
            elements.iter().filter_map(|e| e.accel_mps2).collect()
        };
        let grade = (n_grade > 0).then(|| elements.iter().filter_map(|e| e.grade).collect());
        Ok(Self {
            name: String::new(),
            time_s,
            mps,
            accel_mps2,
            grade,
        })
    }

    /// Load cycle from CSV file, parsing name from filepath
    pub fn from_csv_file<P: AsRef<Path>>(filepath: P) -> anyhow::Result<Self> {
        let filepath = filepath.as_ref();
        let name = filepath
            .file_stem()
            .and_then(OsStr::to_str)
            .with_context(|| format!("Could not parse cycle name from filepath: {filepath:?}"))?
            .to_string();
        let mut cyc = Self::from_file(filepath)?;
        cyc.name = name;
        Ok(cyc)
    }

    /// Load cycle from CSV string
    pub fn from_csv_str<S: AsRef<str>>(csv_str: S, name: String) -> anyhow::Result<Self> {
        let mut cyc = Self::from_reader(csv_str.as_ref().as_bytes(), "csv")?;
        cyc.name = name;
        Ok(cyc)
    }

    /// Write (serialize) cycle to a CSV string
    pub fn to_csv(&self) -> anyhow::Result<String> {
        let mut buf = Vec::with_capacity(self.len());
        self.to_writer(&mut buf, "csv")?;
        Ok(String::from_utf8(buf)?)
    }

    /// Reads a drive profile exported by spreadsheet tools: `;` separated,
    /// decimal comma, one header row, with time in column 1, speed in km/h in
    /// column 3 and acceleration in column 4 (zero-based). Other columns are
    /// ignored.
    pub fn from_legacy_profile_reader<R: std::io::Read>(
        rdr: R,
        name: String,
    ) -> anyhow::Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .delimiter(b';')
            .has_headers(true)
            .flexible(true)
            .from_reader(rdr);
        let mut elements = vec![];
        for (i, record) in rdr.records().enumerate() {
            let record = record?;
            // header is row 1
            let row = i + 2;
            let field = |col: usize| -> anyhow::Result<f64> {
                let raw = record
                    .get(col)
                    .with_context(|| format!("Row {row} has no column {col}"))?;
                raw.trim()
                    .replace(',', ".")
                    .parse::<f64>()
                    .with_context(|| format!("Row {row}, column {col}: could not parse {raw:?}"))
            };
            elements.push(DriveCycleElement {
                time_s: field(1)?,
                mps: params::kph_to_mps(field(3)?),
                accel_mps2: Some(field(4)?),
                grade: None,
            });
        }
        let mut cyc = Self::from_elements(elements)?;
        cyc.name = name;
        cyc.init()?;
        Ok(cyc)
    }

    /// See [Self::from_legacy_profile_reader]
    pub fn from_legacy_profile_file<P: AsRef<Path>>(filepath: P) -> anyhow::Result<Self> {
        let filepath = filepath.as_ref();
        let name = filepath
            .file_stem()
            .and_then(OsStr::to_str)
            .unwrap_or_default()
            .to_string();
        let file = File::open(filepath)
            .with_context(|| format!("Could not open drive profile: {filepath:?}"))?;
        Self::from_legacy_profile_reader(file, name)
            .with_context(|| format!("Could not parse drive profile: {filepath:?}"))
    }

    /// Builds a cycle from a speed trace, deriving acceleration by backward
    /// difference with the first sample at 0
    pub fn from_speed_trace(
        name: String,
        time_s: Array1<f64>,
        mps: Array1<f64>,
    ) -> anyhow::Result<Self> {
        ensure!(
            time_s.len() == mps.len(),
            "`time_s` and `mps` lengths differ: {} vs {}",
            time_s.len(),
            mps.len()
        );
        let mut cyc = Self {
            name,
            accel_mps2: accel_from_speed(&time_s, &mps),
            time_s,
            mps,
            grade: None,
        };
        cyc.init()?;
        Ok(cyc)
    }

    /// Constant speed cycle from `0` to `duration_s` in steps of `dt_s`
    pub fn constant_speed(speed_mps: f64, duration_s: f64, dt_s: f64) -> anyhow::Result<Self> {
        ensure!(dt_s > 0.0, "`dt_s` must be > 0, got {dt_s}");
        ensure!(duration_s >= 0.0, "`duration_s` must be >= 0, got {duration_s}");
        let n_steps = (duration_s / dt_s).round() as usize;
        let time_s = Array1::from_iter((0..=n_steps).map(|i| i as f64 * dt_s));
        let n = time_s.len();
        let mut cyc = Self {
            name: format!("constant {speed_mps} m/s"),
            time_s,
            mps: Array1::from_elem(n, speed_mps),
            accel_mps2: Array1::zeros(n),
            grade: None,
        };
        cyc.init()?;
        Ok(cyc)
    }

    /// Overlays a deterministic rolling-hills grade of
    /// `amplitude_pct * sin(2 pi t / period_s)` percent
    pub fn with_sinusoidal_grade(mut self, amplitude_pct: f64, period_s: f64) -> anyhow::Result<Self> {
        ensure!(period_s > 0.0, "`period_s` must be > 0, got {period_s}");
        self.grade = Some(self.time_s.mapv(|t| {
            amplitude_pct / 100.0 * (2.0 * std::f64::consts::PI * t / period_s).sin()
        }));
        self.init()?;
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.time_s.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_sorted(&self) -> bool {
        self.time_s.iter().tuple_windows().all(|(t0, t1)| t0 < t1)
    }

    pub fn are_fields_equal_length(&self) -> bool {
        let cyc_len = self.len();
        [self.mps.len(), self.accel_mps2.len()]
            .into_iter()
            .chain(self.grade.as_ref().map(|grade| grade.len()))
            .all(|len| len == cyc_len)
    }

    pub fn has_grade(&self) -> bool {
        self.grade
            .as_ref()
            .map_or(false, |grade| grade.iter().any(|g| *g != 0.0))
    }

    /// Grade at sample `i`, 0 where absent
    pub fn grade_at_i(&self, i: usize) -> f64 {
        self.grade.as_ref().map_or(0.0, |grade| grade[i])
    }

    /// Kinematic state at sample `i`
    pub fn sample_at_i(&self, i: usize) -> KinematicSample {
        KinematicSample::new(self.mps[i], self.accel_mps2[i]).at_time(self.time_s[i])
    }

    pub fn elements(&self) -> impl Iterator<Item = DriveCycleElement> + '_ {
        (0..self.len()).map(|i| DriveCycleElement {
            time_s: self.time_s[i],
            mps: self.mps[i],
            accel_mps2: Some(self.accel_mps2[i]),
            grade: self.grade.as_ref().map(|grade| grade[i]),
        })
    }

    /// time steps ending at each sample, first one 0
    pub fn dt_s(&self) -> Array1<f64> {
        utils::diff(&self.time_s)
    }

    /// distance covered in each time step
    pub fn dist_m(&self) -> Array1<f64> {
        &self.mps * &self.dt_s()
    }

    /// cumulative distance
    pub fn cumulative_dist_m(&self) -> Array1<f64> {
        utils::ndarrcumsum(&self.dist_m())
    }

    /// elevation change w.r.t. to initial
    pub fn delta_elev_m(&self) -> Array1<f64> {
        match &self.grade {
            Some(grade) => utils::ndarrcumsum(&(self.dist_m() * grade)),
            None => Array1::zeros(self.len()),
        }
    }

    /// Duration from the first to the last sample
    pub fn total_time_s(&self) -> f64 {
        match (self.time_s.first(), self.time_s.last()) {
            (Some(first), Some(last)) => last - first,
            _ => 0.0,
        }
    }

    pub fn max_mps(&self) -> Option<f64> {
        utils::ndarrmax(&self.mps)
    }

    /// Sample mean of the speed trace, not weighted by time step
    pub fn mean_mps(&self) -> Option<f64> {
        utils::ndarrmean(&self.mps)
    }

    pub fn total_dist_m(&self) -> f64 {
        self.dist_m().sum()
    }

    pub fn test_cyc() -> Self {
        Self {
            name: String::from("test"),
            time_s: Array::range(0.0, 10.0, 1.0),
            mps: Array::range(0.0, 10.0, 1.0),
            accel_mps2: Array1::from_elem(10, 1.0),
            grade: None,
        }
    }
}

/// Backward difference `dv / dt` with the first element 0. Repeated timestamps
/// yield 0 rather than a division by zero.
pub fn accel_from_speed(time_s: &Array1<f64>, mps: &Array1<f64>) -> Array1<f64> {
    let dt_s = utils::diff(time_s);
    let dv_mps = utils::diff(mps);
    dv_mps
        .iter()
        .zip(dt_s.iter())
        .map(|(dv, dt)| if *dt == 0.0 { 0.0 } else { dv / dt })
        .collect()
}
