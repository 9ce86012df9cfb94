// src/version.rs

//! Version handling and constraint satisfaction for package dependencies
//!
//! Versions are parsed tolerantly (leading `v`, missing minor/patch
//! components) but compared with full semver precedence.

use crate::error::{Error, Result};
use semver::Version;
use std::fmt;

/// Parse a version string tolerantly.
///
/// Accepts surrounding whitespace, a leading `v`/`V`, and one- or
/// two-component cores (`1` → `1.0.0`, `1.2` → `1.2.0`), preserving any
/// pre-release or build suffix.
///
/// # Examples
/// ```
/// use ohpkg::version::parse_tolerant;
///
/// assert_eq!(parse_tolerant("1.2.3").unwrap().to_string(), "1.2.3");
/// assert_eq!(parse_tolerant("v1.2").unwrap().to_string(), "1.2.0");
/// assert_eq!(parse_tolerant(" 2 ").unwrap().to_string(), "2.0.0");
/// ```
pub fn parse_tolerant(input: &str) -> Result<Version> {
    let s = input.trim();
    let s = s.strip_prefix(['v', 'V']).unwrap_or(s);
    if s.is_empty() {
        return Err(Error::InvalidInput(format!(
            "invalid semantic version '{input}': empty"
        )));
    }

    if let Ok(v) = Version::parse(s) {
        return Ok(v);
    }

    // Pad a short core ("1", "1.2") to three components, keeping any
    // pre-release or build suffix attached.
    let core_end = s.find(['-', '+']).unwrap_or(s.len());
    let (core, suffix) = s.split_at(core_end);
    let missing = 2usize.saturating_sub(core.matches('.').count());
    let mut padded = core.to_string();
    for _ in 0..missing {
        padded.push_str(".0");
    }
    padded.push_str(suffix);

    Version::parse(&padded)
        .map_err(|e| Error::InvalidInput(format!("invalid semantic version '{input}': {e}")))
}

/// A comparison operator in a dependency constraint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintOp {
    Eq,
    Ge,
    Le,
    Gt,
    Lt,
}

impl ConstraintOp {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "==" => Some(Self::Eq),
            ">=" => Some(Self::Ge),
            "<=" => Some(Self::Le),
            ">" => Some(Self::Gt),
            "<" => Some(Self::Lt),
            _ => None,
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Eq => "==",
            Self::Ge => ">=",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Lt => "<",
        }
    }
}

impl fmt::Display for ConstraintOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single version constraint; `op == None` matches any version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Constraint {
    pub op: Option<ConstraintOp>,
    pub version: String,
}

impl Constraint {
    /// The unconstrained "any version" constraint
    pub fn any() -> Self {
        Self {
            op: None,
            version: String::new(),
        }
    }

    pub fn new(op: ConstraintOp, version: impl Into<String>) -> Self {
        Self {
            op: Some(op),
            version: version.into(),
        }
    }

    pub fn is_any(&self) -> bool {
        self.op.is_none()
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.op {
            Some(op) => write!(f, "{} {}", op, self.version),
            None => write!(f, "any"),
        }
    }
}

/// Check whether `version` satisfies every constraint in the set.
///
/// An empty set is trivially satisfied. Once the set is non-empty, a version
/// that fails tolerant parsing fails the set, as does any constraint whose
/// own version is unparseable.
pub fn satisfies(version: &str, constraints: &[Constraint]) -> bool {
    if constraints.is_empty() {
        return true;
    }
    let v = match parse_tolerant(version) {
        Ok(v) => v,
        Err(_) => return false,
    };
    for c in constraints {
        let op = match c.op {
            Some(op) => op,
            None => continue,
        };
        let cv = match parse_tolerant(&c.version) {
            Ok(cv) => cv,
            Err(_) => return false,
        };
        let ok = match op {
            ConstraintOp::Eq => v == cv,
            ConstraintOp::Ge => v >= cv,
            ConstraintOp::Le => v <= cv,
            ConstraintOp::Gt => v > cv,
            ConstraintOp::Lt => v < cv,
        };
        if !ok {
            return false;
        }
    }
    true
}

/// Render a constraint set for diagnostics, e.g. `>= 1.2, < 2.0`.
pub fn render_constraints(constraints: &[Constraint]) -> String {
    constraints
        .iter()
        .map(|c| c.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
