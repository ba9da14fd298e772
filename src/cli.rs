use clap::{Parser, Subcommand};
use std::path::PathBuf;
use anyhow::Result;

use reposcope::Engine;

#[derive(Parser)]
#[command(name = "reposcope")]
#[command(about = "Structural analysis for repository documentation")]
#[command(version)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a default Reposcope.toml
    Init {
        /// Target directory (defaults to current directory)
        #[arg(short, long)]
        path: Option<PathBuf>,

        /// Overwrite an existing configuration file
        #[arg(long)]
        force: bool,
    },

    /// Full analysis report
    Analyze {
        /// Repository root
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Output format (markdown, json); defaults to the configured format
        #[arg(short, long)]
        format: Option<String>,

        /// Write the report to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Override the detected primary language
        #[arg(short, long)]
        language: Option<String>,
    },

    /// Print the project tree
    Tree {
        /// Repository root
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Maximum depth to render (0 for unlimited)
        #[arg(short, long)]
        depth: Option<usize>,
    },

    /// List ranked dependencies
    Deps {
        /// Repository root
        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// Estimate test coverage
    Coverage {
        /// Repository root
        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// Classify subsystems and infer the project type
    Subsystems {
        /// Repository root
        #[arg(default_value = ".")]
        path: PathBuf,
    },
}

impl Cli {
    pub async fn execute(self, engine: Engine) -> Result<()> {
        match self.command {
            Commands::Init { path, force } => {
                engine.init(path, force).await
            }
            Commands::Analyze { path, format, output, language } => {
                engine.analyze(path, format, output, language).await
            }
            Commands::Tree { path, depth } => {
                engine.tree(path, depth).await
            }
            Commands::Deps { path } => {
                engine.deps(path).await
            }
            Commands::Coverage { path } => {
                engine.coverage(path).await
            }
            Commands::Subsystems { path } => {
                engine.subsystems(path).await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_analyze_with_global_flags() {
        let cli = Cli::try_parse_from([
            "reposcope", "analyze", "repo", "--format", "json", "-o", "out.json", "--verbose",
        ])
        .unwrap();

        assert!(cli.verbose);
        match cli.command {
            Commands::Analyze { path, format, output, language } => {
                assert_eq!(path, PathBuf::from("repo"));
                assert_eq!(format.as_deref(), Some("json"));
                assert_eq!(output, Some(PathBuf::from("out.json")));
                assert!(language.is_none());
            }
            _ => panic!("expected analyze"),
        }
    }

    #[test]
    fn test_path_defaults_to_current_directory() {
        let cli = Cli::try_parse_from(["reposcope", "deps"]).unwrap();
        assert!(matches!(cli.command, Commands::Deps { path } if path == PathBuf::from(".")));
    }
}
