// src/deps.rs

//! Dependency-string grammar
//!
//! A dependency is a package name optionally followed by a single comparison
//! operator and a single version: `libfoo >= 1.2.3`, `libbar==1.0`,
//! `openssl`. The name terminates at whitespace or any operator character,
//! so the spaceless forms parse identically.

use crate::error::{Error, Result};
use crate::version::{parse_tolerant, Constraint, ConstraintOp};
use regex::Regex;
use std::sync::LazyLock;

/// Characters that may never appear in a package name
pub const INVALID_NAME_CHARS: &str = ">< =&|;,";

// Captures: (1) name = chars that are neither whitespace nor <,>,=
//           (2) optional contiguous operator
//           (3) the remainder, treated as the version
static DEP_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([^\s<>=]+)\s*(>=|<=|>|<|==)?\s*(.*)$").unwrap());

/// Parse a dependency string into its name and constraint.
///
/// Operator and version must both be present or both absent; one without the
/// other is a syntax error. The version may be wrapped in single or double
/// quotes and must parse as a (tolerant) semantic version.
pub fn parse_dep(dep: &str) -> Result<(String, Constraint)> {
    let dep = dep.trim();
    if dep.is_empty() {
        return Err(Error::InvalidInput("empty dependency string".to_string()));
    }

    let caps = DEP_PATTERN
        .captures(dep)
        .ok_or_else(|| Error::InvalidInput(format!("invalid dependency format: {dep}")))?;

    let name = caps.get(1).map(|m| m.as_str().trim()).unwrap_or("");
    let op = caps.get(2).map(|m| m.as_str()).unwrap_or("");
    let ver = caps.get(3).map(|m| m.as_str().trim()).unwrap_or("");

    if op.is_empty() && ver.is_empty() {
        return Ok((name.to_string(), Constraint::any()));
    }
    if !op.is_empty() && ver.is_empty() {
        return Err(Error::InvalidInput(format!(
            "operator '{op}' specified but no version provided in '{dep}'"
        )));
    }
    if op.is_empty() && !ver.is_empty() {
        return Err(Error::InvalidInput(format!(
            "version '{ver}' specified but no operator provided in '{dep}'"
        )));
    }

    let ver = ver.trim_matches(|c| c == '\'' || c == '"');

    // Catches splits like "< =" where the remainder starts with '='
    let op = ConstraintOp::parse(op)
        .ok_or_else(|| Error::InvalidInput(format!("invalid operator in '{dep}'")))?;

    parse_tolerant(ver)?;

    Ok((name.to_string(), Constraint::new(op, ver)))
}

/// Reduce a dependency string to its bare package name.
///
/// Used to build graph edges where only identity matters; the constraint
/// suffix, if any, is dropped.
pub fn normalize_dep(dep: &str) -> String {
    let dep = dep.trim();
    let end = dep
        .find(|c: char| c.is_whitespace() || matches!(c, '<' | '>' | '='))
        .unwrap_or(dep.len());
    dep[..end].to_string()
}

/// Validate a package name against the forbidden character set.
pub fn validate_pkg_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::InvalidInput("empty package name".to_string()));
    }
    if name
        .chars()
        .any(|c| c.is_whitespace() || INVALID_NAME_CHARS.contains(c))
    {
        return Err(Error::InvalidInput(format!(
            "invalid token set '{INVALID_NAME_CHARS}' in package name '{name}'"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_name() {
        let (name, c) = parse_dep("openssl").unwrap();
        assert_eq!(name, "openssl");
        assert!(c.is_any());
    }

    #[test]
    fn test_spaced_and_spaceless_forms() {
        for dep in ["libfoo >= 1.2.3", "libfoo>=1.2.3", "libfoo >=1.2.3"] {
            let (name, c) = parse_dep(dep).unwrap();
            assert_eq!(name, "libfoo");
            assert_eq!(c, Constraint::new(ConstraintOp::Ge, "1.2.3"));
        }
    }

    #[test]
    fn test_all_operators() {
        for (input, op) in [
            ("a == 1.0", ConstraintOp::Eq),
            ("a >= 1.0", ConstraintOp::Ge),
            ("a <= 1.0", ConstraintOp::Le),
            ("a > 1.0", ConstraintOp::Gt),
            ("a < 1.0", ConstraintOp::Lt),
        ] {
            let (_, c) = parse_dep(input).unwrap();
            assert_eq!(c.op, Some(op));
            assert_eq!(c.version, "1.0");
        }
    }

    #[test]
    fn test_quoted_version() {
        let (_, c) = parse_dep("libz >= '1.2.11'").unwrap();
        assert_eq!(c.version, "1.2.11");
        let (_, c) = parse_dep("libz == \"2.0\"").unwrap();
        assert_eq!(c.version, "2.0");
    }

    #[test]
    fn test_operator_without_version_fails() {
        assert!(parse_dep("name >= ").is_err());
        assert!(parse_dep("name <").is_err());
    }

    #[test]
    fn test_version_without_operator_fails() {
        assert!(parse_dep("name 1.0").is_err());
    }

    #[test]
    fn test_split_operator_fails() {
        // "< =" parses as op "<" with remainder "= 0.0.1"; the version check
        // must reject it
        assert!(parse_dep("name < = 0.0.1").is_err());
    }

    #[test]
    fn test_empty_input_fails() {
        assert!(parse_dep("").is_err());
        assert!(parse_dep("   ").is_err());
    }

    #[test]
    fn test_invalid_version_fails() {
        assert!(parse_dep("name >= not.a.version").is_err());
    }

    #[test]
    fn test_normalize_dep() {
        assert_eq!(normalize_dep("libfoo >= 1.2.3"), "libfoo");
        assert_eq!(normalize_dep("libfoo>=1.2.3"), "libfoo");
        assert_eq!(normalize_dep("  openssl  "), "openssl");
        assert_eq!(normalize_dep("qt5-base<6"), "qt5-base");
    }

    #[test]
    fn test_validate_pkg_name() {
        assert!(validate_pkg_name("libfoo-bar").is_ok());
        assert!(validate_pkg_name("lib foo").is_err());
        assert!(validate_pkg_name("lib;foo").is_err());
        assert!(validate_pkg_name("lib>foo").is_err());
        assert!(validate_pkg_name("").is_err());
    }
}
