use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{ReposcopeError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Repository loading configuration
    pub repository: RepositoryConfig,

    /// Heuristic thresholds and result caps
    pub analysis: AnalysisConfig,

    /// Output settings
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryConfig {
    /// Glob patterns to skip in addition to .gitignore
    pub ignore_patterns: Vec<String>,

    /// Maximum file size to load (in bytes)
    pub max_file_size: u64,

    /// Maximum number of files to load from a repository
    pub max_files: usize,

    /// Whether to include hidden files and directories
    pub include_hidden: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Minimum score for a subsystem to be reported (0.0 to 1.0)
    pub confidence_threshold: f64,

    /// Match count at which a single pattern rule saturates
    pub match_normalizer: usize,

    /// Size of the merged dependency list
    pub max_dependencies: usize,

    /// Size of the import-derived list before merging
    pub max_import_dependencies: usize,

    /// Number of source files scanned for import statements
    pub max_import_files: usize,

    /// Number of untested files listed in coverage output
    pub max_untested_files: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Default output format (markdown, json)
    pub format: String,

    /// Include the project tree in reports
    pub include_tree: bool,

    /// Maximum tree depth rendered in markdown
    pub tree_depth: usize,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            ignore_patterns: vec![
                "node_modules/".to_string(),
                "target/".to_string(),
                ".git/".to_string(),
                "*.lock".to_string(),
                "*.min.js".to_string(),
            ],
            max_file_size: 512 * 1024,
            max_files: 2000,
            include_hidden: false,
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.4,
            match_normalizer: 5,
            max_dependencies: 20,
            max_import_dependencies: 15,
            max_import_files: 500,
            max_untested_files: 20,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: "markdown".to_string(),
            include_tree: true,
            tree_depth: 4,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            repository: RepositoryConfig::default(),
            analysis: AnalysisConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| ReposcopeError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ReposcopeError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load configuration with fallback to default
    pub fn load_or_default<P: AsRef<Path>>(path: Option<P>) -> Result<Self> {
        match path {
            Some(p) => {
                if p.as_ref().exists() {
                    Self::load(p)
                } else {
                    Ok(Self::default())
                }
            }
            None => {
                let candidates = [
                    "Reposcope.toml",
                    "reposcope.toml",
                    ".reposcope.toml",
                ];

                for candidate in &candidates {
                    if Path::new(candidate).exists() {
                        return Self::load(candidate);
                    }
                }

                Ok(Self::default())
            }
        }
    }

    fn validate(&self) -> Result<()> {
        let threshold = self.analysis.confidence_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(ReposcopeError::Config(format!(
                "analysis.confidence_threshold must be within [0, 1], got {}",
                threshold
            )));
        }
        if self.analysis.match_normalizer == 0 {
            return Err(ReposcopeError::Config(
                "analysis.match_normalizer must be at least 1".to_string(),
            ));
        }
        if !matches!(self.output.format.as_str(), "markdown" | "json") {
            return Err(ReposcopeError::Config(format!(
                "output.format must be \"markdown\" or \"json\", got \"{}\"",
                self.output.format
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_matches_reference_constants() {
        let config = Config::default();
        assert_eq!(config.analysis.confidence_threshold, 0.4);
        assert_eq!(config.analysis.match_normalizer, 5);
        assert_eq!(config.analysis.max_dependencies, 20);
        assert!(config.analysis.max_import_dependencies < config.analysis.max_dependencies);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Reposcope.toml");

        let mut config = Config::default();
        config.analysis.max_dependencies = 12;
        config.output.format = "json".to_string();
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.analysis.max_dependencies, 12);
        assert_eq!(loaded.output.format, "json");
    }

    #[test]
    fn test_load_rejects_out_of_range_threshold() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Reposcope.toml");

        let mut config = Config::default();
        config.analysis.confidence_threshold = 1.5;
        config.save(&path).unwrap();

        assert!(matches!(Config::load(&path), Err(ReposcopeError::Config(_))));
    }

    #[test]
    fn test_missing_explicit_path_falls_back_to_default() {
        let config = Config::load_or_default(Some("/definitely/not/here.toml")).unwrap();
        assert_eq!(config.output.format, "markdown");
    }
}
