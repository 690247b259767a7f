//! Lenient semantic versions and version-range constraints
//!
//! Chart.yaml files in the wild carry versions like `1.2` or `v0.3.1` and
//! constraints like `>5.0 <5.5`, neither of which the `semver` crate
//! accepts verbatim. Both are normalized here before parsing.

use semver::{Version, VersionReq};

use crate::error::{CoreError, Result};

/// Parse a version, padding missing minor/patch components and dropping a `v` prefix
pub fn parse_version(input: &str) -> Result<Version> {
    let trimmed = input.trim().trim_start_matches(['v', 'V']);

    if let Ok(version) = Version::parse(trimmed) {
        return Ok(version);
    }

    let (core, suffix) = match trimmed.find(['-', '+']) {
        Some(idx) => trimmed.split_at(idx),
        None => (trimmed, ""),
    };

    let mut parts: Vec<&str> = core.split('.').collect();
    if parts.is_empty() || parts.len() > 3 {
        return Version::parse(trimmed).map_err(CoreError::from);
    }
    while parts.len() < 3 {
        parts.push("0");
    }

    Version::parse(&format!("{}{}", parts.join("."), suffix)).map_err(CoreError::from)
}

/// A parsed version constraint (one or more `||` alternatives)
#[derive(Debug, Clone)]
pub struct Constraint {
    raw: String,
    alternatives: Vec<VersionReq>,
}

impl Constraint {
    /// Parse a constraint string
    ///
    /// An empty constraint (or `*`) matches every version.
    pub fn parse(input: &str) -> Result<Self> {
        let raw = input.trim();

        if raw.is_empty() || raw == "*" {
            return Ok(Self {
                raw: raw.to_string(),
                alternatives: vec![VersionReq::STAR],
            });
        }

        let alternatives = raw
            .split("||")
            .map(|alt| {
                let normalized = normalize_comparators(alt);
                if normalized.is_empty() {
                    return Err(CoreError::InvalidConstraint {
                        constraint: raw.to_string(),
                        message: "empty comparator".to_string(),
                    });
                }
                VersionReq::parse(&normalized).map_err(|e| CoreError::InvalidConstraint {
                    constraint: raw.to_string(),
                    message: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            raw: raw.to_string(),
            alternatives,
        })
    }

    /// Check whether a version lies within this constraint
    pub fn matches(&self, version: &Version) -> bool {
        self.alternatives.iter().any(|req| req.matches(version))
    }

    /// Check a raw version string, parsing it leniently
    pub fn matches_str(&self, version: &str) -> Result<bool> {
        Ok(self.matches(&parse_version(version)?))
    }

    /// The constraint as written
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl std::fmt::Display for Constraint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Rewrite one alternative into the comma-separated form `semver` expects
///
/// Handles hyphen ranges (`1.0 - 2.0`), whitespace-separated comparators
/// (`>5.0 <5.5`) and operators detached from their version (`>= 1.0`).
fn normalize_comparators(alt: &str) -> String {
    if let Some((low, high)) = alt.split_once(" - ") {
        return format!(">={}, <={}", low.trim(), high.trim());
    }

    let mut comparators = Vec::new();
    let mut pending_op = String::new();

    for token in alt
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|t| !t.is_empty())
    {
        if token.chars().all(|c| matches!(c, '<' | '>' | '=' | '~' | '^')) {
            pending_op.push_str(token);
            continue;
        }
        comparators.push(format!("{pending_op}{token}"));
        pending_op.clear();
    }

    comparators.join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_version_full() {
        assert_eq!(parse_version("5.4.6").unwrap(), Version::new(5, 4, 6));
    }

    #[test]
    fn test_parse_version_pads_missing_components() {
        assert_eq!(parse_version("1").unwrap(), Version::new(1, 0, 0));
        assert_eq!(parse_version("5.4").unwrap(), Version::new(5, 4, 0));
        assert_eq!(parse_version("v0.3.1").unwrap(), Version::new(0, 3, 1));
    }

    #[test]
    fn test_parse_version_keeps_prerelease() {
        let version = parse_version("1.2-beta.1").unwrap();
        assert_eq!(version.major, 1);
        assert_eq!(version.minor, 2);
        assert_eq!(version.pre.as_str(), "beta.1");
    }

    #[test]
    fn test_parse_version_rejects_garbage() {
        assert!(parse_version("not-a-version").is_err());
        assert!(parse_version("1.2.3.4").is_err());
    }

    #[test]
    fn test_constraint_range() {
        let version = Version::new(5, 4, 6);
        assert!(Constraint::parse(">5.0, <5.5").unwrap().matches(&version));
        assert!(!Constraint::parse("~4").unwrap().matches(&version));
    }

    #[test]
    fn test_constraint_whitespace_separated() {
        let c = Constraint::parse(">5.0 <5.5").unwrap();
        assert!(c.matches(&Version::new(5, 1, 0)));
        assert!(!c.matches(&Version::new(5, 5, 0)));
    }

    #[test]
    fn test_constraint_detached_operator() {
        let c = Constraint::parse(">= 1.0").unwrap();
        assert!(c.matches(&Version::new(1, 0, 0)));
        assert!(!c.matches(&Version::new(0, 9, 0)));
    }

    #[test]
    fn test_constraint_alternatives() {
        let c = Constraint::parse("~1.2 || >=3.0").unwrap();
        assert!(c.matches(&Version::new(1, 2, 9)));
        assert!(!c.matches(&Version::new(2, 0, 0)));
        assert!(c.matches(&Version::new(3, 1, 0)));
    }

    #[test]
    fn test_constraint_hyphen_range() {
        let c = Constraint::parse("1.0 - 2.0").unwrap();
        assert!(c.matches(&Version::new(1, 5, 0)));
        assert!(c.matches(&Version::new(2, 0, 0)));
        assert!(!c.matches(&Version::new(2, 1, 0)));
    }

    #[test]
    fn test_empty_constraint_matches_everything() {
        let c = Constraint::parse("").unwrap();
        assert!(c.matches(&Version::new(0, 0, 1)));
        assert!(Constraint::parse("*").unwrap().matches(&Version::new(9, 9, 9)));
    }

    #[test]
    fn test_invalid_constraint() {
        let err = Constraint::parse(">>>nope").unwrap_err();
        assert!(matches!(err, CoreError::InvalidConstraint { .. }));
    }

    #[test]
    fn test_matches_str_lenient() {
        let c = Constraint::parse(">=1.0").unwrap();
        assert!(c.matches_str("1.1").unwrap());
        assert!(c.matches_str("garbage").is_err());
    }
}
