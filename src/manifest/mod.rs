//! Parser for pip-style dependency manifests (`requirements.txt`).
//!
//! One specifier per line: `<package-name>[<comparator><version>]` with
//! additional comma-separated constraints. Blank lines are ignored;
//! `#`-prefixed lines are comments, and comment headers double as
//! documentation-only section markers.

use crate::utils::error::{FlowError, Result};
use std::cmp::Ordering;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparator {
    Eq,
    Ne,
    Ge,
    Gt,
    Le,
    Lt,
}

impl Comparator {
    fn as_str(&self) -> &'static str {
        match self {
            Comparator::Eq => "==",
            Comparator::Ne => "!=",
            Comparator::Ge => ">=",
            Comparator::Gt => ">",
            Comparator::Le => "<=",
            Comparator::Lt => "<",
        }
    }
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A version string compared component-wise: numeric components compare
/// numerically, anything else lexically. `1.10` > `1.9`, `0.0.11` > `0.0.5`,
/// and trailing zero components are insignificant (`1.0` equals `1.0.0`).
#[derive(Debug, Clone)]
pub struct Version {
    raw: String,
}

impl Version {
    fn new(raw: &str) -> Self {
        Self {
            raw: raw.to_string(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        let a: Vec<&str> = self.raw.split('.').collect();
        let b: Vec<&str> = other.raw.split('.').collect();
        for i in 0..a.len().max(b.len()) {
            let left = a.get(i).copied().unwrap_or("0");
            let right = b.get(i).copied().unwrap_or("0");
            let ord = match (left.parse::<u64>(), right.parse::<u64>()) {
                (Ok(l), Ok(r)) => l.cmp(&r),
                _ => left.cmp(right),
            };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Constraint {
    pub op: Comparator,
    pub version: Version,
}

impl Constraint {
    /// Does `candidate` satisfy this constraint?
    fn admits(&self, candidate: &Version) -> bool {
        match self.op {
            Comparator::Eq => candidate == &self.version,
            Comparator::Ne => candidate != &self.version,
            Comparator::Ge => candidate >= &self.version,
            Comparator::Gt => candidate > &self.version,
            Comparator::Le => candidate <= &self.version,
            Comparator::Lt => candidate < &self.version,
        }
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.op, self.version)
    }
}

#[derive(Debug, Clone)]
pub struct Requirement {
    pub name: String,
    pub constraints: Vec<Constraint>,
    pub section: Option<String>,
    pub line: usize,
}

impl Requirement {
    /// Canonical name for duplicate detection: pip treats `-`, `_` and `.`
    /// as equivalent and names as case-insensitive.
    pub fn canonical_name(&self) -> String {
        canonical_name(&self.name)
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        for (i, c) in self.constraints.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}", c)?;
        }
        Ok(())
    }
}

pub fn canonical_name(name: &str) -> String {
    name.to_ascii_lowercase()
        .chars()
        .map(|c| if c == '_' || c == '.' { '-' } else { c })
        .collect()
}

#[derive(Debug, Clone)]
pub struct Conflict {
    pub name: String,
    pub first: String,
    pub second: String,
    pub reason: String,
}

impl fmt::Display for Conflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: '{}' vs '{}' ({})",
            self.name, self.first, self.second, self.reason
        )
    }
}

#[derive(Debug, Clone, Default)]
pub struct Manifest {
    pub entries: Vec<Requirement>,
}

impl Manifest {
    /// Strict parse: fails on the first malformed specifier line.
    pub fn parse(text: &str) -> Result<Self> {
        let (manifest, issues) = Self::scan(text);
        if let Some((line, message)) = issues.into_iter().next() {
            return Err(FlowError::ManifestError { line, message });
        }
        Ok(manifest)
    }

    /// Lenient scan: collects every entry that parses plus a line-numbered
    /// list of malformed specifiers.
    pub fn scan(text: &str) -> (Self, Vec<(usize, String)>) {
        let mut entries = Vec::new();
        let mut issues = Vec::new();
        let mut section: Option<String> = None;

        for (idx, raw_line) in text.lines().enumerate() {
            let line_no = idx + 1;
            let line = raw_line.trim();
            if line.is_empty() {
                continue;
            }
            if let Some(comment) = line.strip_prefix('#') {
                let header = comment.trim();
                if !header.is_empty() {
                    section = Some(header.to_string());
                }
                continue;
            }
            // Trailing comments after the specifier are allowed.
            let spec = line.split('#').next().unwrap_or("").trim();
            match parse_specifier(spec) {
                Ok((name, constraints)) => entries.push(Requirement {
                    name,
                    constraints,
                    section: section.clone(),
                    line: line_no,
                }),
                Err(message) => issues.push((line_no, message)),
            }
        }
        (Self { entries }, issues)
    }

    pub fn get(&self, name: &str) -> Option<&Requirement> {
        let wanted = canonical_name(name);
        self.entries.iter().find(|r| r.canonical_name() == wanted)
    }

    /// Names of the comment sections seen, in order of first appearance.
    pub fn sections(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for entry in &self.entries {
            if let Some(section) = &entry.section {
                if !out.contains(section) {
                    out.push(section.clone());
                }
            }
        }
        out
    }

    /// Pairs of entries for the same package whose combined constraints
    /// cannot be satisfied by any single version.
    pub fn conflicts(&self) -> Vec<Conflict> {
        let mut out = Vec::new();
        for (i, a) in self.entries.iter().enumerate() {
            for b in &self.entries[i + 1..] {
                if a.canonical_name() != b.canonical_name() {
                    continue;
                }
                if let Some(reason) = incompatible(a, b) {
                    out.push(Conflict {
                        name: a.canonical_name(),
                        first: a.to_string(),
                        second: b.to_string(),
                        reason,
                    });
                }
            }
        }
        out
    }
}

fn parse_specifier(spec: &str) -> std::result::Result<(String, Vec<Constraint>), String> {
    let name_end = spec
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.'))
        .unwrap_or(spec.len());
    let name = &spec[..name_end];
    if name.is_empty() {
        return Err(format!("expected a package name, found {:?}", spec));
    }
    if !name.starts_with(|c: char| c.is_ascii_alphanumeric()) {
        return Err(format!("package name {:?} must start with a letter or digit", name));
    }

    let rest = spec[name_end..].trim();
    if rest.is_empty() {
        return Ok((name.to_string(), Vec::new()));
    }

    let mut constraints = Vec::new();
    for part in rest.split(',') {
        constraints.push(parse_constraint(part.trim())?);
    }
    Ok((name.to_string(), constraints))
}

fn parse_constraint(part: &str) -> std::result::Result<Constraint, String> {
    const OPS: [(&str, Comparator); 6] = [
        ("==", Comparator::Eq),
        ("!=", Comparator::Ne),
        (">=", Comparator::Ge),
        ("<=", Comparator::Le),
        (">", Comparator::Gt),
        ("<", Comparator::Lt),
    ];
    for (token, op) in OPS {
        if let Some(version) = part.strip_prefix(token) {
            let version = version.trim();
            if version.is_empty() {
                return Err(format!("comparator {:?} is missing a version", token));
            }
            if version.contains(char::is_whitespace) {
                return Err(format!("version {:?} contains whitespace", version));
            }
            return Ok(Constraint {
                op,
                version: Version::new(version),
            });
        }
    }
    Err(format!("unrecognized version constraint {:?}", part))
}

/// Rough satisfiability check over the union of both requirements'
/// constraints: exact pins must agree with everything else, and lower
/// bounds must stay below upper bounds.
fn incompatible(a: &Requirement, b: &Requirement) -> Option<String> {
    let combined: Vec<&Constraint> = a.constraints.iter().chain(b.constraints.iter()).collect();

    let pins: Vec<&Constraint> = combined
        .iter()
        .copied()
        .filter(|c| c.op == Comparator::Eq)
        .collect();
    if let Some(first_pin) = pins.first() {
        for pin in &pins[1..] {
            if pin.version != first_pin.version {
                return Some(format!(
                    "pinned to both {} and {}",
                    first_pin.version, pin.version
                ));
            }
        }
        for constraint in &combined {
            if !constraint.admits(&first_pin.version) {
                return Some(format!(
                    "pin =={} violates {}",
                    first_pin.version, constraint
                ));
            }
        }
        return None;
    }

    let lower = combined
        .iter()
        .filter(|c| matches!(c.op, Comparator::Ge | Comparator::Gt))
        .max_by(|x, y| x.version.cmp(&y.version));
    let upper = combined
        .iter()
        .filter(|c| matches!(c.op, Comparator::Le | Comparator::Lt))
        .min_by(|x, y| x.version.cmp(&y.version));

    if let (Some(lower), Some(upper)) = (lower, upper) {
        let exclusive = lower.op == Comparator::Gt || upper.op == Comparator::Lt;
        if lower.version > upper.version || (lower.version == upper.version && exclusive) {
            return Some(format!("empty range: {} with {}", lower, upper));
        }
    }
    None
}
