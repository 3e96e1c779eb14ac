use crate::imports::*;

/// File and string (de)serialization shared by every persistable model.
/// Every load path runs [SerdeAPI::init] on the result.
pub trait SerdeAPI: Serialize + for<'a> Deserialize<'a> {
    /// Extensions understood by [SerdeAPI::to_file] and [SerdeAPI::from_file]
    const ACCEPTED_FORMATS: &'static [&'static str] = &["yaml", "json", "bin"];

    /// Validation and derivation of dependent fields after loading
    fn init(&mut self) -> anyhow::Result<()> {
        Ok(())
    }

    /// Writes `self` to `filepath`, format chosen by extension. Truncates an
    /// existing file.
    fn to_file<P: AsRef<Path>>(&self, filepath: P) -> anyhow::Result<()> {
        let filepath = filepath.as_ref();
        let extension = filepath
            .extension()
            .and_then(OsStr::to_str)
            .with_context(|| format!("File extension could not be parsed: {filepath:?}"))?;
        self.to_writer(File::create(filepath)?, extension)
    }

    fn to_writer<W: std::io::Write>(&self, wtr: W, format: &str) -> anyhow::Result<()> {
        match format.trim_start_matches('.').to_lowercase().as_str() {
            "yaml" | "yml" => serde_yaml::to_writer(wtr, self)?,
            "json" => serde_json::to_writer(wtr, self)?,
            #[cfg(feature = "bincode")]
            "bin" => bincode::serialize_into(wtr, self)?,
            _ => bail!(
                "Unsupported format {format:?}, must be one of {:?}",
                Self::ACCEPTED_FORMATS
            ),
        }
        Ok(())
    }

    /// Reads an object from `filepath`, format chosen by extension
    fn from_file<P: AsRef<Path>>(filepath: P) -> anyhow::Result<Self> {
        let filepath = filepath.as_ref();
        let extension = filepath
            .extension()
            .and_then(OsStr::to_str)
            .with_context(|| format!("File extension could not be parsed: {filepath:?}"))?;
        let file = File::open(filepath).with_context(|| {
            if !filepath.exists() {
                format!("File not found: {filepath:?}")
            } else {
                format!("Could not open file: {filepath:?}")
            }
        })?;
        Self::from_reader(file, extension)
    }

    fn from_reader<R: std::io::Read>(rdr: R, format: &str) -> anyhow::Result<Self> {
        let mut deserialized: Self = match format.trim_start_matches('.').to_lowercase().as_str() {
            "yaml" | "yml" => serde_yaml::from_reader(rdr)?,
            "json" => serde_json::from_reader(rdr)?,
            #[cfg(feature = "bincode")]
            "bin" => bincode::deserialize_from(rdr)?,
            _ => bail!(
                "Unsupported format {format:?}, must be one of {:?}",
                Self::ACCEPTED_FORMATS
            ),
        };
        deserialized.init()?;
        Ok(deserialized)
    }

    fn to_json(&self) -> anyhow::Result<String> {
        Ok(serde_json::to_string(&self)?)
    }

    fn from_json<S: AsRef<str>>(json_str: S) -> anyhow::Result<Self> {
        let mut json_de: Self = serde_json::from_str(json_str.as_ref())?;
        json_de.init()?;
        Ok(json_de)
    }

    fn to_yaml(&self) -> anyhow::Result<String> {
        Ok(serde_yaml::to_string(&self)?)
    }

    fn from_yaml<S: AsRef<str>>(yaml_str: S) -> anyhow::Result<Self> {
        let mut yaml_de: Self = serde_yaml::from_str(yaml_str.as_ref())?;
        yaml_de.init()?;
        Ok(yaml_de)
    }
}

pub trait Linspace {
    /// Evenly spaced values from `start` to `stop`, both included.
    /// Returns `[start]` if `n_elements` is 1 and an empty vec if it is 0.
    fn linspace(start: f64, stop: f64, n_elements: usize) -> Vec<f64> {
        match n_elements {
            0 => vec![],
            1 => vec![start],
            _ => {
                let n_steps = n_elements - 1;
                let step_size = (stop - start) / n_steps as f64;
                (0..=n_steps)
                    .map(|x| {
                        if x == n_steps {
                            stop
                        } else {
                            (x as f64 * step_size) + start
                        }
                    })
                    .collect()
            }
        }
    }
}

impl Linspace for Vec<f64> {}
