// src/core/dependencies/imports.rs
use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::core::patterns::captures_of;
use crate::core::repository::extension_of;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportLanguage {
    JavaScript,
    Python,
    Go,
    Rust,
    Jvm,
    CSharp,
    Php,
    Ruby,
    Swift,
}

enum ImportPattern {
    /// Group 1 of every match is a reference
    Direct(Regex),
    /// Group 1 of `block` is scanned with `item`
    Block { block: Regex, item: Regex },
}

struct ImportRules {
    language: ImportLanguage,
    extensions: &'static [&'static str],
    patterns: Vec<ImportPattern>,
    stdlib: Regex,
}

fn regex(pattern: &str) -> Regex {
    Regex::new(pattern).expect("Invalid import pattern")
}

static IMPORT_RULES: LazyLock<Vec<ImportRules>> = LazyLock::new(|| {
    vec![
        ImportRules {
            language: ImportLanguage::JavaScript,
            extensions: &["js", "jsx", "mjs", "cjs", "ts", "tsx", "mts", "cts", "vue", "svelte"],
            patterns: vec![
                ImportPattern::Direct(regex(
                    r#"\bimport\s+(?:type\s+)?(?:[\w*${}\s,]+?\s+from\s+)?['"]([^'"\n]+)['"]"#,
                )),
                ImportPattern::Direct(regex(
                    r#"\bexport\s+(?:type\s+)?(?:\*|\{[^}]*\})(?:\s+as\s+\w+)?\s+from\s+['"]([^'"\n]+)['"]"#,
                )),
                ImportPattern::Direct(regex(r#"\brequire\s*\(\s*['"]([^'"\n]+)['"]\s*\)"#)),
                ImportPattern::Direct(regex(r#"\bimport\s*\(\s*['"]([^'"\n]+)['"]\s*\)"#)),
            ],
            stdlib: regex(concat!(
                r"^(?:node:|(?:assert|async_hooks|buffer|child_process|cluster|console|constants|crypto|",
                r"dgram|dns|domain|events|fs|http|http2|https|inspector|module|net|os|path|perf_hooks|",
                r"process|punycode|querystring|readline|repl|stream|string_decoder|timers|tls|",
                r"trace_events|tty|url|util|v8|vm|wasi|worker_threads|zlib)(?:/|$))",
            )),
        },
        ImportRules {
            language: ImportLanguage::Python,
            extensions: &["py", "pyi"],
            patterns: vec![
                // `import a, b as c`: each comma-separated module, aliases dropped
                ImportPattern::Block {
                    block: regex(r"(?m)^[ \t]*import[ \t]+([\w.][^\n#;]*)"),
                    item: regex(r"(?:^|,)\s*([\w.]+)"),
                },
                ImportPattern::Direct(regex(r"(?m)^[ \t]*from[ \t]+([\w.]+)[ \t]+import\b")),
            ],
            stdlib: regex(concat!(
                r"^(?:__future__|abc|argparse|array|ast|asyncio|base64|binascii|bisect|builtins|",
                r"calendar|cmath|codecs|collections|concurrent|configparser|contextlib|contextvars|",
                r"copy|csv|ctypes|dataclasses|datetime|decimal|difflib|dis|email|enum|errno|",
                r"fnmatch|fractions|functools|gc|getpass|gettext|glob|gzip|hashlib|heapq|hmac|",
                r"html|http|importlib|inspect|io|ipaddress|itertools|json|keyword|locale|logging|",
                r"lzma|math|mimetypes|multiprocessing|numbers|operator|os|pathlib|pickle|platform|",
                r"pprint|queue|random|re|secrets|select|selectors|shlex|shutil|signal|socket|",
                r"sqlite3|ssl|stat|statistics|string|struct|subprocess|sys|sysconfig|tarfile|",
                r"tempfile|textwrap|threading|time|timeit|tkinter|token|tokenize|traceback|types|",
                r"typing|unicodedata|unittest|urllib|uuid|venv|warnings|weakref|xml|zipfile|zlib|",
                r"zoneinfo)(?:\.|$)",
            )),
        },
        ImportRules {
            language: ImportLanguage::Go,
            extensions: &["go"],
            patterns: vec![
                ImportPattern::Direct(regex(r#"(?m)^\s*import\s+(?:[\w.]+\s+)?"([^"]+)""#)),
                ImportPattern::Block {
                    block: regex(r"(?s)\bimport\s*\((.*?)\)"),
                    item: regex(r#""([^"]+)""#),
                },
            ],
            // no dot in the first segment: fmt, net/http, encoding/json
            stdlib: regex(r"^[^./]+(?:/|$)"),
        },
        ImportRules {
            language: ImportLanguage::Rust,
            extensions: &["rs"],
            patterns: vec![
                ImportPattern::Direct(regex(
                    r"(?m)^\s*(?:pub(?:\([^)]*\))?\s+)?use\s+(?:::)?([A-Za-z_][A-Za-z0-9_]*)",
                )),
                ImportPattern::Direct(regex(r"(?m)^\s*extern\s+crate\s+([A-Za-z_][A-Za-z0-9_]*)")),
            ],
            stdlib: regex(r"^(?:std|core|alloc|proc_macro|test|crate|self|super)$"),
        },
        ImportRules {
            language: ImportLanguage::Jvm,
            extensions: &["java", "kt", "kts", "scala"],
            patterns: vec![ImportPattern::Direct(regex(
                r"(?m)^\s*import\s+(?:static\s+)?([A-Za-z_][\w]*(?:\.[A-Za-z_*][\w*]*)*)",
            ))],
            stdlib: regex(r"^(?:java|javax|jdk|sun|kotlin|kotlinx|scala|android|androidx)(?:\.|$)"),
        },
        ImportRules {
            language: ImportLanguage::CSharp,
            extensions: &["cs"],
            patterns: vec![ImportPattern::Direct(regex(
                r"(?m)^\s*(?:global\s+)?using\s+(?:static\s+)?([A-Za-z_][\w.]*)\s*;",
            ))],
            stdlib: regex(r"^(?:System|Microsoft|Windows)(?:\.|$)"),
        },
        ImportRules {
            language: ImportLanguage::Php,
            extensions: &["php"],
            patterns: vec![ImportPattern::Direct(regex(
                r"(?m)^\s*use\s+(?:function\s+|const\s+)?\\?([A-Za-z_][\w\\]*)",
            ))],
            // the application's own namespaces
            stdlib: regex(r"^(?:App|Tests|Database)(?:\\|$)|^[A-Za-z_]\w*$"),
        },
        ImportRules {
            language: ImportLanguage::Ruby,
            extensions: &["rb"],
            patterns: vec![ImportPattern::Direct(regex(r#"(?m)^\s*require\s+['"]([^'"]+)['"]"#))],
            stdlib: regex(concat!(
                r"^(?:base64|benchmark|bigdecimal|cgi|csv|date|digest|erb|fileutils|forwardable|",
                r"io/console|ipaddr|json|logger|net/http|net|open3|open-uri|optparse|ostruct|",
                r"pathname|pp|securerandom|set|singleton|socket|stringio|strscan|tempfile|time|",
                r"timeout|tmpdir|uri|yaml|zlib)(?:/|$)",
            )),
        },
        ImportRules {
            language: ImportLanguage::Swift,
            extensions: &["swift"],
            patterns: vec![ImportPattern::Direct(regex(
                r"(?m)^\s*(?:@testable\s+)?import\s+(?:(?:class|struct|enum|protocol|func|var|let|typealias)\s+)?([A-Za-z_]\w*)",
            ))],
            stdlib: regex(concat!(
                r"^(?:Swift|Foundation|UIKit|AppKit|SwiftUI|Combine|CoreData|CoreGraphics|",
                r"CoreLocation|MapKit|AVFoundation|Darwin|Dispatch|XCTest|os|ObjectiveC|",
                r"WebKit|StoreKit|CloudKit|Security|Network|Observation)$",
            )),
        },
    ]
});

/// Python module names whose distribution is published under another name
const PYTHON_ALIASES: &[(&str, &str)] = &[
    ("sklearn", "scikit-learn"),
    ("cv2", "opencv-python"),
    ("PIL", "pillow"),
    ("yaml", "pyyaml"),
    ("bs4", "beautifulsoup4"),
    ("dateutil", "python-dateutil"),
    ("dotenv", "python-dotenv"),
    ("jwt", "pyjwt"),
    ("attr", "attrs"),
];

/// Go hosts whose module paths are host/owner/repo
const GO_FORGES: &[&str] = &["github.com", "gitlab.com", "bitbucket.org", "golang.org"];

/// Import language for a path, by extension
pub fn import_language(path: &str) -> Option<ImportLanguage> {
    rules_for(path).map(|rules| rules.language)
}

fn rules_for(path: &str) -> Option<&'static ImportRules> {
    let ext = extension_of(path)?;
    IMPORT_RULES
        .iter()
        .find(|rules| rules.extensions.contains(&ext.as_str()))
}

/// Relative paths and bundler aliases never name a package
fn is_local_reference(reference: &str) -> bool {
    reference.starts_with('.')
        || reference.starts_with('/')
        || reference.starts_with("@/")
        || reference.starts_with('~')
        || reference.starts_with('#')
        || reference.contains("://")
}

fn first_segments(reference: &str, separator: char, count: usize) -> String {
    reference
        .split(separator)
        .filter(|s| !s.is_empty())
        .take(count)
        .collect::<Vec<_>>()
        .join(&separator.to_string())
}

fn normalize(language: ImportLanguage, reference: &str) -> Option<String> {
    let name = match language {
        ImportLanguage::JavaScript => {
            if reference.starts_with('@') {
                let mut parts = reference.splitn(3, '/');
                let scope = parts.next()?;
                let package = parts.next().filter(|p| !p.is_empty())?;
                format!("{}/{}", scope, package)
            } else {
                first_segments(reference, '/', 1)
            }
        }
        ImportLanguage::Python => {
            let module = reference.split('.').next()?;
            PYTHON_ALIASES
                .iter()
                .find(|(alias, _)| *alias == module)
                .map(|(_, package)| package.to_string())
                .unwrap_or_else(|| module.to_string())
        }
        ImportLanguage::Go => {
            let host = reference.split('/').next()?;
            let depth = if GO_FORGES.contains(&host) { 3 } else { 2 };
            first_segments(reference, '/', depth)
        }
        ImportLanguage::Rust => reference.split("::").next()?.to_string(),
        ImportLanguage::Jvm | ImportLanguage::CSharp => first_segments(reference, '.', 2),
        ImportLanguage::Php => first_segments(reference, '\\', 1),
        ImportLanguage::Ruby => first_segments(reference, '/', 1),
        ImportLanguage::Swift => reference.to_string(),
    };

    (!name.is_empty()).then_some(name)
}

/// Third-party packages a file references, deduplicated and sorted
pub fn referenced_packages(path: &str, content: &str) -> Vec<String> {
    let Some(rules) = rules_for(path) else {
        return Vec::new();
    };

    let mut references: Vec<&str> = Vec::new();
    for pattern in &rules.patterns {
        match pattern {
            ImportPattern::Direct(re) => references.extend(captures_of(re, content, 1)),
            ImportPattern::Block { block, item } => {
                for body in captures_of(block, content, 1) {
                    references.extend(captures_of(item, body, 1));
                }
            }
        }
    }

    references
        .into_iter()
        .filter(|reference| !is_local_reference(reference))
        .filter(|reference| !rules.stdlib.is_match(reference))
        .filter_map(|reference| normalize(rules.language, reference))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_javascript_imports() {
        let content = r#"
import React, { useState } from 'react';
import type { Config } from "@acme/config/types";
import './styles.css';
import Button from '@/components/Button';
import {
  a,
  b,
} from 'lodash/fp';
const fs = require('fs');
const pg = require("pg");
const lazy = await import('chart.js');
export * from '../shared';
export { x } from 'zod';
import path from 'node:path';
"#;
        assert_eq!(
            referenced_packages("src/app.tsx", content),
            vec!["@acme/config", "chart.js", "lodash", "pg", "react", "zod"]
        );
    }

    #[test]
    fn test_python_imports_with_aliases() {
        let content = "import os\nimport numpy as np\nfrom sklearn.linear_model import Ridge\nfrom . import views\nfrom .models import User\nimport yaml\nfrom django.db import models\n";
        assert_eq!(
            referenced_packages("app/views.py", content),
            vec!["django", "numpy", "pyyaml", "scikit-learn"]
        );

        let content = "import os, requests\nimport numpy, pandas as pd\nimport dateutil.parser as dp, json  # noqa\n";
        assert_eq!(
            referenced_packages("etl/load.py", content),
            vec!["numpy", "pandas", "python-dateutil", "requests"]
        );
    }

    #[test]
    fn test_go_imports() {
        let content = "package main\n\nimport \"fmt\"\n\nimport (\n\t\"net/http\"\n\tgin \"github.com/gin-gonic/gin/binding\"\n\t\"go.uber.org/zap\"\n)\n";
        assert_eq!(
            referenced_packages("cmd/main.go", content),
            vec!["github.com/gin-gonic/gin", "go.uber.org/zap"]
        );
    }

    #[test]
    fn test_rust_imports() {
        let content = "use std::fmt;\nuse serde::Serialize;\npub(crate) use crate::config::Config;\nuse super::x;\nuse ::regex::Regex;\nextern crate libc;\n";
        assert_eq!(referenced_packages("src/lib.rs", content), vec!["libc", "regex", "serde"]);
    }

    #[test]
    fn test_jvm_and_csharp_imports() {
        let java = "import java.util.List;\nimport org.springframework.boot.SpringApplication;\nimport static org.junit.Assert.*;\n";
        assert_eq!(
            referenced_packages("src/App.java", java),
            vec!["org.junit", "org.springframework"]
        );

        let csharp = "using System;\nusing Newtonsoft.Json.Linq;\nusing Alias = Foo.Bar;\n";
        assert_eq!(referenced_packages("Program.cs", csharp), vec!["Newtonsoft.Json"]);
    }

    #[test]
    fn test_php_ruby_swift_imports() {
        let php = "<?php\nuse Illuminate\\Support\\Facades\\Route;\nuse App\\Models\\User;\nuse Exception;\n";
        assert_eq!(referenced_packages("routes/web.php", php), vec!["Illuminate"]);

        let ruby = "require 'json'\nrequire 'sinatra/base'\nrequire_relative 'helper'\n";
        assert_eq!(referenced_packages("app.rb", ruby), vec!["sinatra"]);

        let swift = "import Foundation\nimport Alamofire\n@testable import MyApp\n";
        assert_eq!(referenced_packages("Sources/App.swift", swift), vec!["Alamofire", "MyApp"]);
    }

    #[test]
    fn test_unsupported_extension() {
        assert!(referenced_packages("README.md", "import react from 'react'").is_empty());
        assert_eq!(import_language("a.kt"), Some(ImportLanguage::Jvm));
        assert_eq!(import_language("Makefile"), None);
    }
}
