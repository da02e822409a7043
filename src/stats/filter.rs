use anyhow::{Context, Result};
use glob::{MatchOptions, Pattern};
use regex::Regex;

// ── Types ──

/// A path pattern that removes a file from the diff totals
#[derive(Debug, Clone)]
pub enum ExclusionRule {
    Regex { label: &'static str, pattern: Regex },
    Glob { pattern: Pattern },
}

/// Built-in rules, checked in this order
const BUILTIN_RULES: &[(&str, &str)] = &[
    ("translations", r"\.po$"),
    ("mocks", r"mocks"),
    ("tests", r"\.(spec|test)\.\w+$"),
    ("lockfiles", r"package-lock\.json"),
];

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: false,
    require_literal_leading_dot: false,
};

impl ExclusionRule {
    pub fn matches(&self, path: &str) -> bool {
        match self {
            ExclusionRule::Regex { pattern, .. } => pattern.is_match(path),
            ExclusionRule::Glob { pattern } => pattern.matches_with(path, MATCH_OPTIONS),
        }
    }
}

// ── Policy ──

/// Ordered set of exclusion rules
#[derive(Debug, Clone, Default)]
pub struct ExclusionPolicy {
    rules: Vec<ExclusionRule>,
}

impl ExclusionPolicy {
    /// The translation/mock/test/lockfile rules
    pub fn builtin() -> Result<Self> {
        let rules = BUILTIN_RULES
            .iter()
            .map(|&(label, src)| {
                Regex::new(src)
                    .with_context(|| format!("Invalid built-in exclusion '{label}'"))
                    .map(|pattern| ExclusionRule::Regex { label, pattern })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { rules })
    }

    /// Built-in rules (if enabled) followed by user globs.
    /// Invalid globs are skipped.
    pub fn from_config(config: &crate::config::DiffConfig) -> Result<Self> {
        let mut policy = if config.builtin_excludes {
            Self::builtin()?
        } else {
            Self::default()
        };
        for glob in &config.exclude {
            match Pattern::new(glob) {
                Ok(pattern) => policy.rules.push(ExclusionRule::Glob { pattern }),
                Err(e) => tracing::warn!(glob = %glob, error = %e, "Skipping invalid exclusion glob"),
            }
        }
        Ok(policy)
    }

    pub fn rules(&self) -> &[ExclusionRule] {
        &self.rules
    }

    /// True if any rule matches; stops at the first match
    pub fn is_excluded(&self, path: &str) -> bool {
        self.rules.iter().any(|r| r.matches(path))
    }
}
