// src/core/engine.rs
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use tracing::{debug, info};

use crate::config::Config;
use super::{
    build_project_tree, render_tree, AnalysisReport, DependencyExtractor, GitHubRepository,
    InsightsAnalyzer, OutputFormat, ReportRenderer, RepositoryFile, RepositoryLoader,
    SubsystemAnalysis, SubsystemClassifier, TestCoverageEstimator,
};

const CONFIG_FILE_NAME: &str = "Reposcope.toml";

/// Main orchestration engine for Reposcope
pub struct Engine {
    config: Config,
    loader: RepositoryLoader,
    renderer: ReportRenderer,
}

impl Engine {
    /// Create a new engine instance
    pub async fn new(config_path: Option<&Path>) -> Result<Self> {
        let config = Config::load_or_default(config_path)?;

        debug!("Loaded configuration: {:?}", config);

        let loader = RepositoryLoader::new(&config.repository);
        let renderer = ReportRenderer::new(&config.output)
            .map_err(|e| anyhow!("Failed to prepare report templates: {}", e))?;

        Ok(Self {
            config,
            loader,
            renderer,
        })
    }

    /// Write a default configuration file
    pub async fn init(&self, path: Option<PathBuf>, force: bool) -> Result<()> {
        let target_dir = match path {
            Some(path) => path,
            None => std::env::current_dir().context("Cannot determine current directory")?,
        };
        info!("Initializing Reposcope in: {}", target_dir.display());

        let config_path = target_dir.join(CONFIG_FILE_NAME);
        if config_path.exists() && !force {
            return Err(anyhow!(
                "{} already exists (use --force to overwrite)",
                config_path.display()
            ));
        }

        std::fs::create_dir_all(&target_dir)
            .with_context(|| format!("Failed to create {}", target_dir.display()))?;
        Config::default().save(&config_path)?;

        info!("✅ Wrote {}", config_path.display());
        Ok(())
    }

    fn load(&self, path: &Path, language: Option<String>) -> Result<(GitHubRepository, Vec<RepositoryFile>)> {
        info!("📂 Loading repository from {}", path.display());

        let files = self
            .loader
            .load(path)
            .with_context(|| format!("Failed to load repository at {}", path.display()))?;
        let repository = self.loader.describe(path, &files, language);

        info!(
            "Loaded {} files (primary language: {})",
            files.len(),
            repository.language.as_deref().unwrap_or("unknown")
        );
        Ok((repository, files))
    }

    /// Run every analysis over a local checkout
    pub async fn analyze_repository(&self, path: &Path, language: Option<String>) -> Result<AnalysisReport> {
        let (repository, files) = self.load(path, language)?;
        let files = Arc::new(files);

        info!("🔍 Classifying subsystems and scanning dependencies...");

        // The tree needs the classifier's output; the insights pass is independent
        let structure = {
            let files = Arc::clone(&files);
            let repository = repository.clone();
            let config = self.config.analysis.clone();
            tokio::task::spawn_blocking(move || {
                let subsystems = SubsystemClassifier::new(&config).analyze(&repository, &files);
                let tree = build_project_tree(&files, &subsystems.subsystems);
                (subsystems, tree)
            })
        };

        let insights = {
            let files = Arc::clone(&files);
            let config = self.config.analysis.clone();
            tokio::task::spawn_blocking(move || InsightsAnalyzer::new(&config).analyze(&files))
        };

        let ((subsystems, tree), insights) = tokio::try_join!(structure, insights)
            .map_err(|e| anyhow!("Analysis task failed: {}", e))?;

        info!("📊 Analysis complete:");
        info!("  - project type: {}", subsystems.project_type);
        info!("  - {} subsystems", subsystems.subsystems.len());
        info!("  - {} files in {} directories", tree.total_files, tree.total_directories);

        Ok(AnalysisReport::new(repository, &files, tree, subsystems, insights))
    }

    fn output_format(&self, requested: Option<&str>) -> Result<OutputFormat> {
        let format = requested.unwrap_or(&self.config.output.format);
        Ok(format.parse::<OutputFormat>()?)
    }

    /// Full report to stdout or a file
    pub async fn analyze(
        &self,
        path: PathBuf,
        format: Option<String>,
        output: Option<PathBuf>,
        language: Option<String>,
    ) -> Result<()> {
        let format = self.output_format(format.as_deref())?;
        let report = self.analyze_repository(&path, language).await?;
        let rendered = self.renderer.render(&report, format)?;

        match output {
            Some(output) => {
                if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
                    std::fs::create_dir_all(parent)?;
                }
                std::fs::write(&output, rendered)
                    .with_context(|| format!("Failed to write {}", output.display()))?;
                info!("📝 Wrote {} report to {}", format, output.display());
            }
            None => println!("{}", rendered),
        }

        info!("🎉 Done");
        Ok(())
    }

    /// Project tree only
    pub async fn tree(&self, path: PathBuf, depth: Option<usize>) -> Result<()> {
        let (repository, files) = self.load(&path, None)?;
        let subsystems = SubsystemClassifier::new(&self.config.analysis).analyze(&repository, &files);
        let tree = build_project_tree(&files, &subsystems.subsystems);

        match self.output_format(None)? {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&tree)?),
            OutputFormat::Markdown => {
                let depth = depth.unwrap_or(self.config.output.tree_depth);
                print!("{}", render_tree(&repository.name, &tree, depth));
                println!("\n{} files, {} directories", tree.total_files, tree.total_directories);
            }
        }
        Ok(())
    }

    /// Ranked dependency list
    pub async fn deps(&self, path: PathBuf) -> Result<()> {
        let (_, files) = self.load(&path, None)?;
        let dependencies = DependencyExtractor::new(&self.config.analysis).extract(&files);

        match self.output_format(None)? {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&dependencies)?),
            OutputFormat::Markdown => println!("{}", self.renderer.render_dependencies(&dependencies)?),
        }
        Ok(())
    }

    /// Test coverage estimate
    pub async fn coverage(&self, path: PathBuf) -> Result<()> {
        let (_, files) = self.load(&path, None)?;
        let coverage = TestCoverageEstimator::new(&self.config.analysis).analyze(&files);

        match self.output_format(None)? {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&coverage)?),
            OutputFormat::Markdown => println!("{}", self.renderer.render_coverage(&coverage)?),
        }
        Ok(())
    }

    /// Subsystem classification and project type
    pub async fn subsystems(&self, path: PathBuf) -> Result<()> {
        let (repository, files) = self.load(&path, None)?;
        let analysis: SubsystemAnalysis = SubsystemClassifier::new(&self.config.analysis).analyze(&repository, &files);

        match self.output_format(None)? {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&analysis)?),
            OutputFormat::Markdown => {
                println!("Project type: {}\n", analysis.project_type);
                println!("{}", self.renderer.render_subsystems(&analysis)?);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;

    fn fixture() -> assert_fs::TempDir {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("package.json")
            .write_str(r#"{"dependencies":{"react":"18"},"devDependencies":{"jest":"29"}}"#)
            .unwrap();
        temp.child("src/components/Button.tsx")
            .write_str("import React from 'react';\n")
            .unwrap();
        temp.child("src/components/Button.test.tsx")
            .write_str("import { Button } from './Button';\n")
            .unwrap();
        temp
    }

    #[tokio::test]
    async fn test_analyze_repository() {
        let temp = fixture();
        let engine = Engine::new(None).await.unwrap();

        let report = engine.analyze_repository(temp.path(), None).await.unwrap();

        assert_eq!(report.tree.total_files, 3);
        assert_eq!(report.subsystems.project_type, "Node.js Project");
        assert_eq!(report.insights.dependencies[0].name, "react");
        assert_eq!(report.insights.test_coverage.test_files.len(), 1);
        assert_eq!(report.repository.language.as_deref(), Some("typescript"));
    }

    #[tokio::test]
    async fn test_analyze_writes_json_report() {
        let temp = fixture();
        let engine = Engine::new(None).await.unwrap();
        let output = temp.child("out/report.json");

        engine
            .analyze(temp.path().to_path_buf(), Some("json".to_string()), Some(output.path().to_path_buf()), None)
            .await
            .unwrap();

        output.assert(predicates::str::contains("\"projectType\": \"Node.js Project\""));
    }

    #[tokio::test]
    async fn test_init_refuses_to_overwrite() {
        let temp = assert_fs::TempDir::new().unwrap();
        let engine = Engine::new(None).await.unwrap();

        engine.init(Some(temp.path().to_path_buf()), false).await.unwrap();
        temp.child(CONFIG_FILE_NAME).assert(predicates::path::exists());

        assert!(engine.init(Some(temp.path().to_path_buf()), false).await.is_err());
        engine.init(Some(temp.path().to_path_buf()), true).await.unwrap();

        let loaded = Config::load(temp.child(CONFIG_FILE_NAME).path()).unwrap();
        assert_eq!(loaded.output.format, "markdown");
    }

    #[tokio::test]
    async fn test_unknown_format_is_rejected() {
        let temp = fixture();
        let engine = Engine::new(None).await.unwrap();
        let result = engine
            .analyze(temp.path().to_path_buf(), Some("html".to_string()), None, None)
            .await;
        assert!(result.is_err());
    }
}
