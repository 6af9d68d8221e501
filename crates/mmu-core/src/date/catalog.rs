use std::fs;
use std::path::{Path, PathBuf};

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{MmuError, Result};

/// Well-known name of the external rule file, looked up in the working directory.
pub const PATTERN_FILENAME: &str = "pattern.json";

const ISO_FORMATS: &[&str] = &["%Y-%m-%dT%H%M%S.%fZ", "%Y-%m-%dT%H%M%SZ"];

fn default_group() -> usize {
    1
}

/// One entry of `pattern.json`, as written by users.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternSpec {
    pub regex: String,
    #[serde(default = "default_group")]
    pub group: usize,
    pub formats: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct PatternFile {
    #[serde(default)]
    patterns: Vec<PatternSpec>,
}

/// Result of testing one rule against a filename.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleMatch<'a> {
    /// The rule's shape does not match
    NoMatch,
    /// Shape matched; text of the designated group
    Group(&'a str),
    /// Shape matched, but the designated group took no part in the match
    EmptyGroup,
}

impl RuleMatch<'_> {
    pub fn is_match(&self) -> bool {
        !matches!(self, RuleMatch::NoMatch)
    }
}

/// A compiled extraction rule: matcher, capture group to read, and the
/// date formats to try on the captured text, in order.
#[derive(Debug, Clone)]
pub struct PatternRule {
    matcher: Regex,
    source: String,
    group: usize,
    formats: Vec<String>,
}

impl PatternRule {
    /// Compile a rule. The matcher is anchored at the start of the filename;
    /// `group` must name an existing capture group (0 is the whole match).
    pub fn new(regex: &str, group: usize, formats: Vec<String>) -> Result<Self> {
        let matcher = Regex::new(&format!("^(?:{})", regex))?;
        if group >= matcher.captures_len() {
            return Err(MmuError::InvalidPattern {
                pattern: regex.to_string(),
                reason: format!(
                    "group {} does not exist (pattern has {} groups)",
                    group,
                    matcher.captures_len() - 1
                ),
            });
        }
        if formats.is_empty() {
            return Err(MmuError::InvalidPattern {
                pattern: regex.to_string(),
                reason: "no date formats given".to_string(),
            });
        }
        Ok(Self {
            matcher,
            source: regex.to_string(),
            group,
            formats,
        })
    }

    fn from_spec(spec: &PatternSpec) -> Result<Self> {
        Self::new(&spec.regex, spec.group, spec.formats.clone())
    }

    /// Test the rule's shape and read the designated capture group.
    pub fn capture<'a>(&self, filename: &'a str) -> RuleMatch<'a> {
        match self.matcher.captures(filename) {
            None => RuleMatch::NoMatch,
            Some(caps) => match caps.get(self.group) {
                Some(m) => RuleMatch::Group(m.as_str()),
                None => RuleMatch::EmptyGroup,
            },
        }
    }

    /// The pattern as configured (without the implicit start anchor).
    pub fn pattern(&self) -> &str {
        &self.source
    }

    pub fn group(&self) -> usize {
        self.group
    }

    pub fn formats(&self) -> &[String] {
        &self.formats
    }
}

/// Where the active catalog came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogSource {
    Builtin,
    External(PathBuf),
}

/// Ordered rule list. Order is significant: the first rule whose shape
/// matches decides. Immutable once loaded.
#[derive(Debug, Clone)]
pub struct PatternCatalog {
    rules: Vec<PatternRule>,
    source: CatalogSource,
}

impl PatternCatalog {
    /// The built-in rules: `name=_=<ISO>`, `name__<ISO>` and `YYYY-MM-DD HH.MM.SS`.
    pub fn builtin() -> Self {
        let iso = || ISO_FORMATS.iter().map(|f| f.to_string()).collect::<Vec<_>>();
        let specs = [
            (r"(.*)=_=(\d{4}-\d{2}-\d{2}T\d{6}(?:\.\d{3})?Z).*", 2, iso()),
            (r"(.*)__(\d{4}-\d{2}-\d{2}T\d{6}(?:\.\d{3})?Z).*", 2, iso()),
            (
                r"(\d{4}-\d{2}-\d{2} \d{2}\.\d{2}\.\d{2}).*",
                1,
                vec!["%Y-%m-%d %H.%M.%S".to_string()],
            ),
        ];
        let rules = specs
            .into_iter()
            .filter_map(|(re, group, formats)| PatternRule::new(re, group, formats).ok())
            .collect();
        Self {
            rules,
            source: CatalogSource::Builtin,
        }
    }

    /// Parse a `pattern.json` document. Any bad rule rejects the whole file.
    pub fn from_json(json: &str) -> Result<Self> {
        let file: PatternFile = serde_json::from_str(json)?;
        let rules = file
            .patterns
            .iter()
            .map(PatternRule::from_spec)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            rules,
            source: CatalogSource::Builtin,
        })
    }

    /// Load the external rule file at `path`, falling back to the built-in
    /// catalog when it is absent, empty or malformed. Never fails.
    pub fn load(path: &Path) -> Self {
        if !path.is_file() {
            tracing::debug!("No pattern file at {}, using built-in patterns", path.display());
            return Self::builtin();
        }

        let loaded = fs::read_to_string(path)
            .map_err(MmuError::from)
            .and_then(|text| Self::from_json(&text));

        match loaded {
            Ok(catalog) if catalog.is_empty() => {
                tracing::warn!("{} defines no patterns, using built-in patterns", path.display());
                Self::builtin()
            }
            Ok(mut catalog) => {
                tracing::info!("Loaded {} pattern(s) from {}", catalog.len(), path.display());
                catalog.source = CatalogSource::External(path.to_path_buf());
                catalog
            }
            Err(e) => {
                tracing::warn!("Error loading {}: {}; using built-in patterns", path.display(), e);
                Self::builtin()
            }
        }
    }

    pub fn rules(&self) -> &[PatternRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn source(&self) -> &CatalogSource {
        &self.source
    }
}
