extern crate log;
pub mod error;
pub mod extract;
pub mod geofile;
pub mod simplify;
pub mod transform;
use crate::extract::config::Config;
use crate::extract::pipeline::run_all;
use anyhow::{anyhow, Context};
use clap::Parser;
use std::{fs::read_to_string, path::Path};

/// Convert Natural Earth shapefiles into GeoJSON and TopoJSON files for map rendering.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the input config file.
    #[arg(short, long)]
    config_filepath: String,
}

fn load_config(config_filepath: &Path) -> anyhow::Result<Config> {
    if !config_filepath.exists() {
        return Err(anyhow!("Config file {:?} not found", config_filepath));
    }
    let config_contents = read_to_string(config_filepath)?;
    let mut config: Config = serde_yaml::from_str(&config_contents)
        .with_context(|| format!("Parsing config file {:?}", config_filepath))?;

    // A relative data directory is relative to the config file, not the working directory.
    if config.data_dir.is_relative() {
        if let Some(config_dir) = config_filepath.parent() {
            config.data_dir = config_dir.join(&config.data_dir);
        }
    }
    Ok(config)
}

fn try_main() -> anyhow::Result<()> {
    let args = Args::try_parse()?;
    let config = load_config(Path::new(&args.config_filepath))?;
    log::info!(
        "Running {} extractions in {:?}",
        config.extractions.len(),
        config.data_dir
    );

    let output_paths = run_all(&config)?;
    for output_path in output_paths {
        log::info!("Wrote {:?}", output_path);
    }
    Ok(())
}

fn main() {
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info")
    }
    env_logger::init();
    if let Err(e) = try_main() {
        eprintln!("Error: {:?}", e);
        std::process::exit(1)
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use testdir::testdir;

    use super::load_config;

    #[test]
    fn test_load_config_resolves_relative_data_dir() {
        let config_dir = testdir!();
        let config_filepath = config_dir.join("geo_data.yaml");
        std::fs::write(
            &config_filepath,
            "data_dir: geo-data\nextractions:\n  - kind: cities\n",
        )
        .unwrap();

        let config = load_config(&config_filepath).unwrap();
        assert_eq!(config.data_dir, config_dir.join("geo-data"));
        assert_eq!(config.extractions.len(), 1);
    }

    #[test]
    fn test_load_config_keeps_absolute_data_dir() {
        let config_filepath = testdir!().join("geo_data.yaml");
        std::fs::write(&config_filepath, "data_dir: /srv/geo\nextractions: []\n").unwrap();

        let config = load_config(&config_filepath).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/srv/geo"));
    }

    #[test]
    fn test_load_config_missing_file() {
        let missing = testdir!().join("missing.yaml");
        assert!(load_config(&missing).is_err());
    }
}
