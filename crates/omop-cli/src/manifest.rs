//! Run manifest (`omop.toml`).
//!
//! ```toml
//! input_dir = "extracts"
//! vocabulary_dir = "vocab"
//! output_dir = "cdm"
//!
//! [inputs]
//! measurement = "labs_2023.csv"
//!
//! [options]
//! grace_window_days = 30
//!
//! [options.tables.condition_occurrence]
//! group_window_days = 30
//! ```
//!
//! Relative paths resolve against the manifest's directory; `inputs` paths
//! resolve against `input_dir`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use omop_model::{EtlOptions, OmopTable};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunManifest {
    pub input_dir: PathBuf,
    pub vocabulary_dir: PathBuf,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Explicit extract files; tables not listed are discovered by file name.
    #[serde(default)]
    pub inputs: BTreeMap<OmopTable, PathBuf>,
    #[serde(default)]
    pub options: EtlOptions,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

impl RunManifest {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read manifest {}", path.display()))?;
        let manifest: RunManifest =
            toml::from_str(&text).with_context(|| format!("parse manifest {}", path.display()))?;
        let base = path.parent().unwrap_or_else(|| Path::new(""));
        Ok(manifest.resolved(base))
    }

    /// Anchor relative paths at `base`.
    pub fn resolved(mut self, base: &Path) -> Self {
        self.input_dir = base.join(&self.input_dir);
        self.vocabulary_dir = base.join(&self.vocabulary_dir);
        self.output_dir = base.join(&self.output_dir);
        let input_dir = self.input_dir.clone();
        for path in self.inputs.values_mut() {
            *path = input_dir.join(&*path);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_resolves_paths() {
        let manifest: RunManifest = toml::from_str(
            r#"
            input_dir = "in"
            vocabulary_dir = "/vocab"

            [inputs]
            measurement = "labs.csv"

            [options]
            strict_validation = true

            [options.tables.condition_occurrence]
            group_window_days = 30
            "#,
        )
        .expect("manifest");
        let manifest = manifest.resolved(Path::new("/study"));

        assert_eq!(manifest.input_dir, PathBuf::from("/study/in"));
        assert_eq!(manifest.vocabulary_dir, PathBuf::from("/vocab"));
        assert_eq!(manifest.output_dir, PathBuf::from("/study/output"));
        assert_eq!(
            manifest.inputs.get(&OmopTable::Measurement),
            Some(&PathBuf::from("/study/in/labs.csv"))
        );
        assert!(manifest.options.strict_validation);
        assert_eq!(
            manifest
                .options
                .for_table(OmopTable::ConditionOccurrence)
                .group_window_days,
            30
        );
    }

    #[test]
    fn rejects_unknown_tables() {
        let parsed = toml::from_str::<RunManifest>(
            r#"
            input_dir = "in"
            vocabulary_dir = "vocab"

            [inputs]
            note = "notes.csv"
            "#,
        );
        assert!(parsed.is_err());
    }
}
