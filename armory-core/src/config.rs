//! YAML persistence of configurations.
use anyhow::Result;
use log::info;
use serde::{de::DeserializeOwned, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// A configuration that can be saved to and loaded from a YAML file.
pub trait ConfigFile: Serialize + DeserializeOwned {
    /// Constructs the configuration from a YAML file.
    fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        let rdr = BufReader::new(file);
        let config = serde_yaml::from_reader(rdr)?;
        info!("Load config from {:?}", path.as_ref());
        Ok(config)
    }

    /// Saves the configuration as a YAML file.
    fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path.as_ref())?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        info!("Save config to {:?}", path.as_ref());
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::ConfigFile;
    use anyhow::Result;
    use serde::{Deserialize, Serialize};
    use tempdir::TempDir;

    #[derive(Debug, Deserialize, Serialize, PartialEq)]
    struct WarmupConfig {
        warmup_steps: usize,
        epsilon: f64,
    }

    impl ConfigFile for WarmupConfig {}

    #[test]
    fn test_save_load() -> Result<()> {
        let dir = TempDir::new("config")?;
        let path = dir.path().join("warmup.yaml");
        let config = WarmupConfig {
            warmup_steps: 1000,
            epsilon: 0.1,
        };
        config.save(&path)?;
        assert_eq!(WarmupConfig::load(&path)?, config);
        Ok(())
    }
}
