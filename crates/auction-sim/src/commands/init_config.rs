use std::path::Path;

use anyhow::{Context, bail};
use auction_core::SimulationConfig;

pub fn init_config(output: Option<&Path>, force: bool) -> anyhow::Result<()> {
    let rendered = SimulationConfig::default().to_toml_string()?;

    let Some(path) = output else {
        print!("{rendered}");
        return Ok(());
    };
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    std::fs::write(path, rendered).with_context(|| format!("writing {}", path.display()))?;
    println!("✓ Wrote {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn written_config_loads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sim.toml");

        init_config(Some(&path), false).unwrap();
        let loaded = SimulationConfig::from_file(&path).unwrap();
        assert_eq!(loaded.rules, SimulationConfig::default().rules);
    }

    #[test]
    fn refuses_to_overwrite_without_force() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sim.toml");
        std::fs::write(&path, "# mine").unwrap();

        assert!(init_config(Some(&path), false).is_err());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "# mine");

        init_config(Some(&path), true).unwrap();
        assert!(SimulationConfig::from_file(&path).is_ok());
    }
}
