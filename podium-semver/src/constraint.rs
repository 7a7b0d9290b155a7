use std::sync::LazyLock;

use regex::Regex;

use crate::{
    error::SemverError,
    version::{cmp_normalized, normalize},
    SemverResult,
};

static OR_SPLIT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*\|\|?\s*").expect("unable to compile or-split regex"));

static AND_SPLIT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\s,]+").expect("unable to compile and-split regex"));

static HYPHEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(\S+)\s+-\s+(\S+)\s*$").expect("unable to compile hyphen range regex")
});

static WILDCARD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^v?(\d+)(?:\.(\d+))?(?:\.(\d+))?\.[xX*]$")
        .expect("unable to compile wildcard constraint regex")
});

static OP_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(>=|<=|!=|==|>|<|=)\s*(.+)$").expect("unable to compile operator regex")
});

static PARTS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^v?(\d+(?:\.\d+){0,3})(.*)$").expect("unable to compile version parts regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cmp {
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Bound {
    /// Matches everything (`*`).
    Any,
    /// Normalized equality.
    Exact(String),
    /// Normalized inequality.
    Not(String),
    /// Comparison against a normalized boundary version.
    Op(Cmp, String),
}

impl Bound {
    fn holds(&self, normalized: &str) -> bool {
        use std::cmp::Ordering::*;
        match self {
            Self::Any => true,
            Self::Exact(other) => cmp_normalized(normalized, other) == Equal,
            Self::Not(other) => cmp_normalized(normalized, other) != Equal,
            Self::Op(cmp, other) => {
                let ord = cmp_normalized(normalized, other);
                match cmp {
                    Cmp::Lt => ord == Less,
                    Cmp::Le => ord != Greater,
                    Cmp::Gt => ord == Greater,
                    Cmp::Ge => ord != Less,
                }
            }
        }
    }
}

/// A parsed Composer constraint expression: a disjunction (`||`) of
/// conjunctions of bounds.
#[derive(Debug, Clone)]
pub struct Constraint {
    groups: Vec<Vec<Bound>>,
}

impl Constraint {
    /// Parses a constraint expression such as `^1.2 || ~2.0.1`.
    ///
    /// An alternative that fails to parse is dropped as long as at least
    /// one other alternative parses; an expression with no parseable
    /// alternative is an error.
    pub fn parse(expr: &str) -> SemverResult<Self> {
        let trimmed = expr.trim();
        if trimmed.is_empty() {
            return Err(SemverError::InvalidConstraint(expr.to_string()));
        }

        let mut groups = Vec::new();
        let mut first_err = None;
        for group in OR_SPLIT_RE.split(trimmed) {
            let group = group.trim();
            if group.is_empty() {
                continue;
            }
            match parse_group(group) {
                Ok(bounds) if !bounds.is_empty() => groups.push(bounds),
                Ok(_) => {}
                Err(err) => {
                    first_err.get_or_insert(err);
                }
            }
        }

        if groups.is_empty() {
            return Err(
                first_err.unwrap_or_else(|| SemverError::InvalidConstraint(expr.to_string()))
            );
        }
        Ok(Self { groups })
    }

    /// Tests an already-normalized version against this constraint.
    pub fn matches_normalized(&self, normalized: &str) -> bool {
        self.groups
            .iter()
            .any(|bounds| bounds.iter().all(|b| b.holds(normalized)))
    }

    /// Tests a raw version against this constraint.
    pub fn matches(&self, version: &str) -> SemverResult<bool> {
        Ok(self.matches_normalized(&normalize(version)?))
    }
}

/// Whether `version` satisfies the constraint expression `expr`.
pub fn satisfies(version: &str, expr: &str) -> SemverResult<bool> {
    Constraint::parse(expr)?.matches(version)
}

fn parse_group(group: &str) -> SemverResult<Vec<Bound>> {
    if let Some(caps) = HYPHEN_RE.captures(group) {
        return parse_hyphen_range(&caps[1], &caps[2]);
    }

    // Re-join terms that are a bare operator, so `>= 1.0` parses.
    let raw_terms: Vec<&str> = AND_SPLIT_RE.split(group).filter(|t| !t.is_empty()).collect();
    let mut terms: Vec<String> = Vec::new();
    let mut pending_op: Option<&str> = None;
    for term in raw_terms {
        if matches!(term, ">=" | "<=" | "!=" | "==" | ">" | "<" | "=") {
            pending_op = Some(term);
            continue;
        }
        match pending_op.take() {
            Some(op) => terms.push(format!("{op}{term}")),
            None => terms.push(term.to_string()),
        }
    }
    if pending_op.is_some() {
        return Err(SemverError::InvalidConstraint(group.to_string()));
    }

    let mut bounds = Vec::new();
    for term in &terms {
        bounds.extend(parse_term(term)?);
    }
    Ok(bounds)
}

fn parse_term(term: &str) -> SemverResult<Vec<Bound>> {
    // Stability flags (`^1.0@beta`) select stability elsewhere; the
    // version bound itself ignores them.
    let term = term.split('@').next().unwrap_or(term).trim();
    if term.is_empty() {
        return Ok(vec![Bound::Any]);
    }

    if term == "*" || term.eq_ignore_ascii_case("x") {
        return Ok(vec![Bound::Any]);
    }

    if let Some(caps) = WILDCARD_RE.captures(term) {
        let parts = captured_parts(&caps);
        return Ok(wildcard_bounds(&parts));
    }

    if let Some(rest) = term.strip_prefix('~') {
        return tilde_bounds(rest.trim());
    }

    if let Some(rest) = term.strip_prefix('^') {
        return caret_bounds(rest.trim());
    }

    if let Some(caps) = OP_RE.captures(term) {
        let version = caps[2].trim().to_string();
        let normalized = normalize(&version)?;
        return Ok(match &caps[1] {
            ">=" => vec![Bound::Op(Cmp::Ge, with_dev_boundary(normalized))],
            ">" => vec![Bound::Op(Cmp::Gt, normalized)],
            "<" => vec![Bound::Op(Cmp::Lt, with_dev_boundary(normalized))],
            "<=" => vec![Bound::Op(Cmp::Le, normalized)],
            "!=" => vec![Bound::Not(normalized)],
            _ => vec![Bound::Exact(normalized)],
        });
    }

    Ok(vec![Bound::Exact(normalize(term)?)])
}

fn parse_hyphen_range(lo: &str, hi: &str) -> SemverResult<Vec<Bound>> {
    let lower = Bound::Op(Cmp::Ge, with_dev_boundary(normalize(lo)?));

    let (hi_parts, hi_suffixed) = split_parts(hi)?;
    let upper = if hi_suffixed || hi_parts.len() >= 3 {
        Bound::Op(Cmp::Le, normalize(hi)?)
    } else {
        Bound::Op(Cmp::Lt, bumped(&hi_parts, hi_parts.len() - 1))
    };
    Ok(vec![lower, upper])
}

fn tilde_bounds(rest: &str) -> SemverResult<Vec<Bound>> {
    let (parts, _) = split_parts(rest)?;
    let lower = with_dev_boundary(normalize(rest)?);
    let bump_idx = if parts.len() >= 2 { parts.len() - 2 } else { 0 };
    Ok(vec![
        Bound::Op(Cmp::Ge, lower),
        Bound::Op(Cmp::Lt, bumped(&parts, bump_idx)),
    ])
}

fn caret_bounds(rest: &str) -> SemverResult<Vec<Bound>> {
    let (parts, _) = split_parts(rest)?;
    let lower = with_dev_boundary(normalize(rest)?);
    let bump_idx = parts
        .iter()
        .position(|&n| n != 0)
        .unwrap_or(parts.len() - 1);
    Ok(vec![
        Bound::Op(Cmp::Ge, lower),
        Bound::Op(Cmp::Lt, bumped(&parts, bump_idx)),
    ])
}

fn wildcard_bounds(parts: &[u64]) -> Vec<Bound> {
    if parts.is_empty() {
        return vec![Bound::Any];
    }
    let mut lower: Vec<u64> = parts.to_vec();
    lower.resize(4, 0);
    let lower = format!(
        "{}.{}.{}.{}-dev",
        lower[0], lower[1], lower[2], lower[3]
    );
    vec![
        Bound::Op(Cmp::Ge, lower),
        Bound::Op(Cmp::Lt, bumped(parts, parts.len() - 1)),
    ]
}

/// Numeric components of a raw version plus whether a stability suffix
/// follows them.
fn split_parts(version: &str) -> SemverResult<(Vec<u64>, bool)> {
    let caps = PARTS_RE
        .captures(version)
        .ok_or_else(|| SemverError::InvalidConstraint(version.to_string()))?;
    let parts = caps[1]
        .split('.')
        .map(|p| {
            p.parse::<u64>()
                .map_err(|_| SemverError::InvalidConstraint(version.to_string()))
        })
        .collect::<SemverResult<Vec<u64>>>()?;
    let suffixed = !caps[2].trim().is_empty();
    Ok((parts, suffixed))
}

fn captured_parts(caps: &regex::Captures) -> Vec<u64> {
    (1..=3)
        .filter_map(|i| caps.get(i))
        .filter_map(|m| m.as_str().parse().ok())
        .collect()
}

/// Exclusive upper boundary: `parts` with `parts[idx]` incremented and
/// everything after it zeroed, at dev stability so pre-releases of the
/// boundary version are excluded.
fn bumped(parts: &[u64], idx: usize) -> String {
    let mut p: Vec<u64> = parts[..=idx].to_vec();
    p[idx] += 1;
    p.resize(4, 0);
    format!("{}.{}.{}.{}-dev", p[0], p[1], p[2], p[3])
}

/// Unsuffixed boundaries extend down to dev stability, so `>=1.2`
/// admits `1.2.0-beta1` and `<2.0` excludes `2.0.0-beta1`.
fn with_dev_boundary(normalized: String) -> String {
    if normalized.contains('-') {
        normalized
    } else {
        format!("{normalized}-dev")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sat(version: &str, expr: &str) -> bool {
        satisfies(version, expr).unwrap()
    }

    #[test]
    fn test_exact() {
        assert!(sat("1.2.3", "1.2.3"));
        assert!(sat("v1.2.3", "1.2.3"));
        assert!(sat("1.2.0", "1.2"));
        assert!(!sat("1.2.5", "1.2"));
        assert!(sat("1.0.0", "=1.0.0"));
        assert!(sat("1.0.0", "==1.0.0"));
        assert!(!sat("1.0.1", "=1.0.0"));
    }

    #[test]
    fn test_caret() {
        assert!(sat("1.2.3", "^1.2"));
        assert!(sat("1.9.9", "^1.2.3"));
        assert!(!sat("2.0.0", "^1.2.3"));
        assert!(!sat("1.2.2", "^1.2.3"));
        assert!(sat("0.3.5", "^0.3"));
        assert!(!sat("0.4.0", "^0.3"));
        assert!(sat("0.0.3", "^0.0.3"));
        assert!(!sat("0.0.4", "^0.0.3"));
        // Pre-releases of the excluded boundary stay excluded.
        assert!(!sat("2.0.0-beta1", "^1.2"));
    }

    #[test]
    fn test_tilde() {
        assert!(sat("1.2.0", "~1.2"));
        assert!(sat("1.9.0", "~1.2"));
        assert!(!sat("2.0.0", "~1.2"));
        assert!(sat("1.2.9", "~1.2.3"));
        assert!(!sat("1.3.0", "~1.2.3"));
        assert!(sat("1.5.0", "~1"));
        assert!(!sat("2.0.0", "~1"));
    }

    #[test]
    fn test_wildcard() {
        assert!(sat("1.2.9", "1.2.*"));
        assert!(!sat("1.3.0", "1.2.*"));
        assert!(!sat("1.3.0-beta1", "1.2.*"));
        assert!(sat("1.9.0", "1.*"));
        assert!(!sat("2.0.0", "1.*"));
        assert!(sat("0.1.0", "*"));
        assert!(sat("99.99.99", "*"));
    }

    #[test]
    fn test_operators() {
        assert!(sat("1.5.0", ">=1.0"));
        assert!(sat("1.0.0", ">=1.0"));
        assert!(sat("1.0.0-beta1", ">=1.0"));
        assert!(!sat("0.9.0", ">=1.0"));
        assert!(sat("1.1.0", ">1.0"));
        assert!(!sat("1.0.0", ">1.0"));
        assert!(sat("1.9.9", "<2.0"));
        assert!(!sat("2.0.0-beta1", "<2.0"));
        assert!(sat("2.0.0", "<=2.0"));
        assert!(!sat("2.0.1", "<=2.0"));
        assert!(sat("1.0.1", "!=1.0.0"));
        assert!(!sat("1.0.0", "!=1.0.0"));
    }

    #[test]
    fn test_ranges_and_booleans() {
        assert!(sat("1.5.0", ">=1.0 <2.0"));
        assert!(sat("1.5.0", ">=1.0, <2.0"));
        assert!(!sat("2.0.0", ">=1.0 <2.0"));
        assert!(sat("1.5.0", "^1.2 || ^2.0"));
        assert!(sat("2.3.0", "^1.2 || ^2.0"));
        assert!(!sat("3.0.0", "^1.2 || ^2.0"));
        assert!(sat("2.3.0", "^1.2 | ^2.0"));
        assert!(sat("1.5.0", ">= 1.0"));
    }

    #[test]
    fn test_hyphen_range() {
        assert!(sat("1.5.0", "1.0 - 2.0"));
        assert!(sat("2.0.9", "1.0 - 2.0"));
        assert!(!sat("2.1.0", "1.0 - 2.0"));
        assert!(sat("2.1.0", "1.0.0 - 2.1.0"));
        assert!(!sat("2.1.1", "1.0.0 - 2.1.0"));
        assert!(!sat("0.9.9", "1.0 - 2.0"));
    }

    #[test]
    fn test_stability_flags_stripped() {
        assert!(sat("1.5.0", "^1.2@beta"));
        assert!(sat("1.5.0-beta1", "^1.2@dev"));
    }

    #[test]
    fn test_dev_constraints() {
        assert!(sat("dev-master", "dev-master"));
        assert!(!sat("dev-master", "dev-develop"));
    }

    #[test]
    fn test_invalid() {
        assert!(satisfies("1.0.0", "").is_err());
        assert!(satisfies("1.0.0", "not a constraint").is_err());
        assert!(satisfies("garbage", "^1.0").is_err());
        // One parseable alternative carries the expression.
        assert!(sat("1.5.0", "whatever || ^1.2"));
    }
}
