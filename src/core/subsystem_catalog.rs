//! Compiled-in subsystem catalog.
//!
//! Match strings are lowercase path fragments; a path contributes to a rule
//! when its lowercased form contains any of them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Coarse architectural category
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubsystemType {
    Frontend,
    Backend,
    Api,
    Database,
    Authentication,
    Testing,
    Infrastructure,
    Configuration,
    Documentation,
    Utilities,
    Mobile,
}

impl SubsystemType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Frontend => "frontend",
            Self::Backend => "backend",
            Self::Api => "api",
            Self::Database => "database",
            Self::Authentication => "authentication",
            Self::Testing => "testing",
            Self::Infrastructure => "infrastructure",
            Self::Configuration => "configuration",
            Self::Documentation => "documentation",
            Self::Utilities => "utilities",
            Self::Mobile => "mobile",
        }
    }
}

impl fmt::Display for SubsystemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A weighted group of path fragments
#[derive(Debug, Clone, Copy)]
pub struct PatternRule {
    pub matches: &'static [&'static str],
    /// Contribution in (0, 1] once the rule saturates
    pub weight: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct SubsystemConfig {
    pub name: &'static str,
    pub subsystem_type: SubsystemType,
    pub description: &'static str,
    pub patterns: &'static [PatternRule],
}

pub static SUBSYSTEM_CATALOG: &[SubsystemConfig] = &[
    SubsystemConfig {
        name: "Frontend",
        subsystem_type: SubsystemType::Frontend,
        description: "User interface components, pages, and styling",
        patterns: &[
            PatternRule {
                matches: &["components/", "pages/", "views/", "layouts/", "screens/", "widgets/", "styles/"],
                weight: 0.8,
            },
            PatternRule {
                matches: &[".tsx", ".jsx", ".vue", ".svelte", ".css", ".scss", ".sass", ".less", ".html"],
                weight: 0.6,
            },
            PatternRule {
                matches: &["next.config", "nuxt.config", "vite.config", "svelte.config", "angular.json", "tailwind.config", "postcss.config"],
                weight: 0.4,
            },
        ],
    },
    SubsystemConfig {
        name: "Backend",
        subsystem_type: SubsystemType::Backend,
        description: "Server-side services, business logic, and background processing",
        patterns: &[
            PatternRule {
                matches: &["server/", "services/", "service/", "backend/", "middleware/", "workers/", "jobs/", "domain/"],
                weight: 0.7,
            },
            PatternRule {
                matches: &["server.", "app.py", "main.go", "manage.py", "wsgi.py", "asgi.py", "application.java", "program.cs"],
                weight: 0.5,
            },
            PatternRule {
                matches: &[".py", ".go", ".java", ".rb", ".php", ".cs", ".kt", ".ex"],
                weight: 0.3,
            },
        ],
    },
    SubsystemConfig {
        name: "API Layer",
        subsystem_type: SubsystemType::Api,
        description: "HTTP routes, controllers, and API schema definitions",
        patterns: &[
            PatternRule {
                matches: &["api/", "routes/", "router/", "controllers/", "endpoints/", "handlers/", "resolvers/"],
                weight: 0.8,
            },
            PatternRule {
                matches: &["openapi", "swagger", ".graphql", ".gql", ".proto", "routes."],
                weight: 0.6,
            },
        ],
    },
    SubsystemConfig {
        name: "Database",
        subsystem_type: SubsystemType::Database,
        description: "Data models, schemas, migrations, and persistence access",
        patterns: &[
            PatternRule {
                matches: &["models/", "migrations/", "prisma/", "db/", "database/", "entities/", "repositories/", "schema/"],
                weight: 0.8,
            },
            PatternRule {
                matches: &[".sql", ".prisma", "knexfile", "ormconfig", "alembic", "schema.rb", "drizzle.config"],
                weight: 0.6,
            },
        ],
    },
    SubsystemConfig {
        name: "Authentication",
        subsystem_type: SubsystemType::Authentication,
        description: "Login, sessions, tokens, and access control",
        patterns: &[
            PatternRule {
                matches: &["auth/", "authentication/", "login", "session", "oauth", "jwt", "passport", "permissions"],
                weight: 0.8,
            },
            PatternRule {
                matches: &["guards/", "middleware/auth", "policies/", "rbac"],
                weight: 0.4,
            },
        ],
    },
    SubsystemConfig {
        name: "Testing",
        subsystem_type: SubsystemType::Testing,
        description: "Automated tests, fixtures, and test tooling",
        patterns: &[
            PatternRule {
                matches: &["test/", "tests/", "__tests__/", "spec/", "e2e/", "fixtures/"],
                weight: 0.8,
            },
            PatternRule {
                matches: &[".test.", ".spec.", "_test.", "test_", "_spec."],
                weight: 0.7,
            },
            PatternRule {
                matches: &["jest.config", "vitest.config", "pytest.ini", "conftest.py", "cypress", "playwright.config", "karma.conf"],
                weight: 0.5,
            },
        ],
    },
    SubsystemConfig {
        name: "Infrastructure",
        subsystem_type: SubsystemType::Infrastructure,
        description: "Containers, CI/CD pipelines, and deployment definitions",
        patterns: &[
            PatternRule {
                matches: &["dockerfile", "docker-compose", ".dockerignore", "containerfile"],
                weight: 0.6,
            },
            PatternRule {
                matches: &[".github/workflows/", ".gitlab-ci", "jenkinsfile", ".circleci/", "azure-pipelines", ".travis.yml"],
                weight: 0.6,
            },
            PatternRule {
                matches: &["k8s/", "kubernetes/", "helm/", "terraform/", ".tf", "ansible/", "deploy/", "infra/"],
                weight: 0.8,
            },
        ],
    },
    SubsystemConfig {
        name: "Configuration",
        subsystem_type: SubsystemType::Configuration,
        description: "Application settings, environment, and tooling configuration",
        patterns: &[
            PatternRule {
                matches: &["config/", "configs/", "settings", ".env", "configuration"],
                weight: 0.6,
            },
            PatternRule {
                matches: &["tsconfig", ".eslintrc", ".prettierrc", "babel.config", ".editorconfig", ".yaml", ".yml", ".toml", ".ini"],
                weight: 0.4,
            },
        ],
    },
    SubsystemConfig {
        name: "Documentation",
        subsystem_type: SubsystemType::Documentation,
        description: "Guides, references, and project documentation",
        patterns: &[
            PatternRule {
                matches: &["docs/", "doc/", "documentation/", "wiki/"],
                weight: 0.8,
            },
            PatternRule {
                matches: &[".md", ".mdx", ".rst", ".adoc"],
                weight: 0.5,
            },
            PatternRule {
                matches: &["readme", "changelog", "contributing", "license"],
                weight: 0.3,
            },
        ],
    },
    SubsystemConfig {
        name: "Utilities",
        subsystem_type: SubsystemType::Utilities,
        description: "Shared helpers, common libraries, and internal tooling",
        patterns: &[
            PatternRule {
                matches: &["utils/", "util/", "helpers/", "lib/", "common/", "shared/", "tools/"],
                weight: 0.7,
            },
            PatternRule {
                matches: &["utils.", "helpers.", "constants."],
                weight: 0.4,
            },
        ],
    },
    SubsystemConfig {
        name: "Mobile",
        subsystem_type: SubsystemType::Mobile,
        description: "Native and cross-platform mobile application code",
        patterns: &[
            PatternRule {
                matches: &["android/", "ios/", "mobile/"],
                weight: 0.8,
            },
            PatternRule {
                matches: &[".swift", ".dart", ".xcodeproj", "androidmanifest.xml", "pubspec.yaml"],
                weight: 0.6,
            },
        ],
    },
];

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_catalog_is_well_formed() {
        let mut seen = HashSet::new();
        for config in SUBSYSTEM_CATALOG {
            assert!(seen.insert(config.subsystem_type), "duplicate type {}", config.subsystem_type);
            assert!(!config.patterns.is_empty());
            for rule in config.patterns {
                assert!(rule.weight > 0.0 && rule.weight <= 1.0);
                assert!(rule.matches.iter().all(|m| *m == m.to_lowercase()));
            }
        }
    }

    #[test]
    fn test_type_serializes_lowercase() {
        let json = serde_json::to_string(&SubsystemType::Frontend).unwrap();
        assert_eq!(json, "\"frontend\"");
    }
}
