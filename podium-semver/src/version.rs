use std::{cmp::Ordering, sync::LazyLock};

use regex::Regex;

use crate::{error::SemverError, SemverResult};

/// Classical `major.minor.patch.extra` tag with an optional stability
/// modifier, e.g. `v1.2.0-beta.3`.
static CLASSICAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?ix)^v?(\d{1,5})(\.\d+)?(\.\d+)?(\.\d+)?
          [._-]?(?:(stable|beta|b|rc|alpha|a|patch|pl|p)((?:[.-]?\d+)*)?)?([.-]?dev)?(?:\+.*)?$",
    )
    .expect("unable to compile classical version regex")
});

/// Datetime-style tag, e.g. `20201201` or `2020-12-01.2`.
static DATETIME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?ix)^v?(\d{4}(?:[.:-]?\d{2}){1,6}(?:[.:-]?\d{1,3})?)
          [._-]?(?:(stable|beta|b|rc|alpha|a|patch|pl|p)((?:[.-]?\d+)*)?)?([.-]?dev)?(?:\+.*)?$",
    )
    .expect("unable to compile datetime version regex")
});

/// Numeric branch name with optional `x`/`*` wildcards, e.g. `1.x` or `2.0`.
static BRANCH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^v?(\d+|[x*])(\.(?:\d+|[x*]))*$").expect("unable to compile branch regex"));

fn expand_stability(word: &str) -> &'static str {
    match word.to_ascii_lowercase().as_str() {
        "a" | "alpha" => "alpha",
        "b" | "beta" => "beta",
        "rc" => "RC",
        "p" | "pl" | "patch" => "patch",
        _ => "stable",
    }
}

/// Normalizes a version string to its canonical form.
///
/// Tags normalize to four numeric components plus an optional stability
/// suffix (`1.2.0-beta.3` -> `1.2.0.0-beta3`); numeric branches normalize
/// to wildcard-dev versions (`1.x` -> `1.9999999.9999999.9999999-dev`);
/// anything else that ends in `-dev` or starts with `dev-` stays a named
/// dev version. Invalid strings are rejected.
pub fn normalize(version: &str) -> SemverResult<String> {
    let version = version.trim();
    if version.is_empty() {
        return Err(SemverError::InvalidVersion(version.to_string()));
    }

    if let Some(prefix) = version.get(..4) {
        if prefix.eq_ignore_ascii_case("dev-") && version.len() > 4 {
            return Ok(format!("dev-{}", &version[4..]));
        }
    }

    if let Some(caps) = CLASSICAL_RE.captures(version) {
        let mut out = String::new();
        out.push_str(caps.get(1).map(|m| m.as_str()).unwrap_or("0"));
        for idx in 2..=4 {
            match caps.get(idx) {
                Some(m) => out.push_str(m.as_str()),
                None => out.push_str(".0"),
            }
        }
        apply_modifier(&mut out, caps.get(5), caps.get(6), caps.get(7));
        return Ok(out);
    }

    if let Some(caps) = DATETIME_RE.captures(version) {
        let mut out: String = caps
            .get(1)
            .map(|m| m.as_str())
            .unwrap_or_default()
            .chars()
            .map(|c| if c.is_ascii_digit() { c } else { '.' })
            .collect();
        apply_modifier(&mut out, caps.get(2), caps.get(3), caps.get(4));
        return Ok(out);
    }

    // Branch names: `1.x-dev`, `master` and friends come in via branch
    // aliases rather than tags, but the normal form must still exist.
    let lower = version.to_ascii_lowercase();
    if let Some(prefix) = lower.strip_suffix("dev") {
        let prefix = prefix.trim_end_matches(['-', '.']);
        if !prefix.is_empty() {
            return normalize_branch(prefix);
        }
    }

    Err(SemverError::InvalidVersion(version.to_string()))
}

/// Normalizes a branch name to its version form.
pub fn normalize_branch(name: &str) -> SemverResult<String> {
    let name = name.trim();
    if matches!(name, "master" | "trunk" | "default") {
        return Ok(format!("dev-{name}"));
    }

    if BRANCH_RE.is_match(name) {
        let name = name.trim_start_matches(['v', 'V']);
        let mut parts: Vec<String> = name
            .split('.')
            .map(|p| {
                if p == "x" || p == "X" || p == "*" {
                    "9999999".to_string()
                } else {
                    p.to_string()
                }
            })
            .collect();
        while parts.len() < 4 {
            parts.push("9999999".to_string());
        }
        return Ok(format!("{}-dev", parts.join(".")));
    }

    Ok(format!("dev-{name}"))
}

fn apply_modifier(
    out: &mut String,
    word: Option<regex::Match>,
    number: Option<regex::Match>,
    dev: Option<regex::Match>,
) {
    if let Some(word) = word {
        let expanded = expand_stability(word.as_str());
        if expanded != "stable" {
            out.push('-');
            out.push_str(expanded);
            if let Some(number) = number {
                for c in number.as_str().chars().filter(|c| c.is_ascii_digit()) {
                    out.push(c);
                }
            }
        }
    }
    if dev.is_some() {
        out.push_str("-dev");
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token<'a> {
    Num(u64),
    Word(&'a str),
}

/// PHP-style rank of a stability word. Numbers and end-of-string sit
/// between `RC` and `patch`.
fn word_rank(word: &str) -> u8 {
    if word.eq_ignore_ascii_case("dev") {
        0
    } else if word.eq_ignore_ascii_case("alpha") || word.eq_ignore_ascii_case("a") {
        1
    } else if word.eq_ignore_ascii_case("beta") || word.eq_ignore_ascii_case("b") {
        2
    } else if word.eq_ignore_ascii_case("rc") {
        3
    } else if word.eq_ignore_ascii_case("patch")
        || word.eq_ignore_ascii_case("pl")
        || word.eq_ignore_ascii_case("p")
    {
        5
    } else {
        0
    }
}

/// Splits a normalized version into tokens. Normalization glues a
/// stability word to its number (`beta2`, `RC1`), so segments are further
/// split at the letter/digit boundary to keep the word rankable.
fn tokenize(version: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    for segment in version.split(['.', '-', '_', '+']) {
        let mut rest = segment;
        while !rest.is_empty() {
            let digits = rest.chars().take_while(|c| c.is_ascii_digit()).count();
            if digits > 0 {
                match rest[..digits].parse() {
                    Ok(n) => tokens.push(Token::Num(n)),
                    Err(_) => tokens.push(Token::Word(&rest[..digits])),
                }
                rest = &rest[digits..];
            } else {
                let letters = rest.chars().take_while(|c| !c.is_ascii_digit()).count();
                let split = rest
                    .char_indices()
                    .nth(letters)
                    .map(|(idx, _)| idx)
                    .unwrap_or(rest.len());
                tokens.push(Token::Word(&rest[..split]));
                rest = &rest[split..];
            }
        }
    }
    tokens
}

/// Compares two already-normalized versions.
pub fn cmp_normalized(a: &str, b: &str) -> Ordering {
    let (ta, tb) = (tokenize(a), tokenize(b));
    let mut i = 0;
    loop {
        match (ta.get(i), tb.get(i)) {
            (None, None) => return Ordering::Equal,
            (Some(Token::Num(x)), Some(Token::Num(y))) => match x.cmp(y) {
                Ordering::Equal => {}
                other => return other,
            },
            (Some(Token::Word(x)), Some(Token::Word(y))) => {
                match word_rank(x).cmp(&word_rank(y)) {
                    Ordering::Equal => {
                        match x.to_ascii_lowercase().cmp(&y.to_ascii_lowercase()) {
                            Ordering::Equal => {}
                            other => return other,
                        }
                    }
                    other => return other,
                }
            }
            (Some(Token::Num(_)), Some(Token::Word(w))) => return 4.cmp(&word_rank(w)),
            (Some(Token::Word(w)), Some(Token::Num(_))) => return word_rank(w).cmp(&4),
            // `1.0.0.0` outranks its own pre-releases but not its patches,
            // while `beta` outranks `beta1` on neither side.
            (None, Some(Token::Word(w))) => return 4.cmp(&word_rank(w)),
            (Some(Token::Word(w)), None) => return word_rank(w).cmp(&4),
            (None, Some(Token::Num(_))) => return Ordering::Less,
            (Some(Token::Num(_)), None) => return Ordering::Greater,
        }
        i += 1;
    }
}

/// Compares two raw version strings, normalizing both first.
pub fn compare(a: &str, b: &str) -> SemverResult<Ordering> {
    Ok(cmp_normalized(&normalize(a)?, &normalize(b)?))
}

/// Sorts raw version strings oldest-first. Unparseable entries sort first.
pub fn sort_ascending(versions: &mut [String]) {
    versions.sort_by(|a, b| cmp_raw(a, b));
}

/// Sorts raw version strings newest-first.
pub fn sort_descending(versions: &mut [String]) {
    versions.sort_by(|a, b| cmp_raw(b, a));
}

fn cmp_raw(a: &str, b: &str) -> Ordering {
    match (normalize(a), normalize(b)) {
        (Ok(na), Ok(nb)) => cmp_normalized(&na, &nb),
        (Ok(_), Err(_)) => Ordering::Greater,
        (Err(_), Ok(_)) => Ordering::Less,
        (Err(_), Err(_)) => a.cmp(b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_classical() {
        assert_eq!(normalize("1.0.0").unwrap(), "1.0.0.0");
        assert_eq!(normalize("1.2").unwrap(), "1.2.0.0");
        assert_eq!(normalize("v1.2.3").unwrap(), "1.2.3.0");
        assert_eq!(normalize("1.0.0.4").unwrap(), "1.0.0.4");
        assert_eq!(normalize("  1.0.0  ").unwrap(), "1.0.0.0");
    }

    #[test]
    fn test_normalize_stability_suffixes() {
        assert_eq!(normalize("1.2.0-beta.3").unwrap(), "1.2.0.0-beta3");
        assert_eq!(normalize("1.0.0-alpha1").unwrap(), "1.0.0.0-alpha1");
        assert_eq!(normalize("1.0.0a1").unwrap(), "1.0.0.0-alpha1");
        assert_eq!(normalize("1.0.0b2").unwrap(), "1.0.0.0-beta2");
        assert_eq!(normalize("1.0.0-rc1").unwrap(), "1.0.0.0-RC1");
        assert_eq!(normalize("1.0.0-RC1").unwrap(), "1.0.0.0-RC1");
        assert_eq!(normalize("1.0.0-pl3").unwrap(), "1.0.0.0-patch3");
        assert_eq!(normalize("1.0.0-stable").unwrap(), "1.0.0.0");
        assert_eq!(normalize("1.0.0-beta").unwrap(), "1.0.0.0-beta");
        assert_eq!(normalize("1.0.0-beta2-dev").unwrap(), "1.0.0.0-beta2-dev");
        assert_eq!(normalize("1.0.0+build.2").unwrap(), "1.0.0.0");
    }

    #[test]
    fn test_normalize_datetime() {
        assert_eq!(normalize("20201201").unwrap(), "20201201");
        assert_eq!(normalize("2020-12-01").unwrap(), "2020.12.01");
        assert_eq!(normalize("20201201.2").unwrap(), "20201201.2");
    }

    #[test]
    fn test_normalize_branches() {
        assert_eq!(normalize("dev-master").unwrap(), "dev-master");
        assert_eq!(normalize("dev-feature/foo").unwrap(), "dev-feature/foo");
        assert_eq!(
            normalize("1.x-dev").unwrap(),
            "1.9999999.9999999.9999999-dev"
        );
        // Fully numeric branches take the classical path.
        assert_eq!(normalize("2.0-dev").unwrap(), "2.0.0.0-dev");
        assert_eq!(normalize_branch("master").unwrap(), "dev-master");
        assert_eq!(
            normalize_branch("1.*").unwrap(),
            "1.9999999.9999999.9999999-dev"
        );
        assert_eq!(normalize_branch("feature-x").unwrap(), "dev-feature-x");
    }

    #[test]
    fn test_normalize_rejects_garbage() {
        assert!(normalize("").is_err());
        assert!(normalize("not-a-version").is_err());
        assert!(normalize("1.0.0.0.0").is_err());
        assert!(normalize("hello world").is_err());
    }

    #[test]
    fn test_compare_numeric() {
        assert_eq!(compare("1.0.0", "1.0.0").unwrap(), Ordering::Equal);
        assert_eq!(compare("1.0", "1.0.0").unwrap(), Ordering::Equal);
        assert_eq!(compare("1.0.0", "1.0.1").unwrap(), Ordering::Less);
        assert_eq!(compare("1.10.0", "1.9.0").unwrap(), Ordering::Greater);
        assert_eq!(compare("2.0.0", "10.0.0").unwrap(), Ordering::Less);
    }

    #[test]
    fn test_compare_stability_suffixes() {
        assert_eq!(compare("1.0.0-beta1", "1.0.0").unwrap(), Ordering::Less);
        assert_eq!(compare("1.0.0", "1.0.0-patch1").unwrap(), Ordering::Less);
        assert_eq!(
            compare("1.0.0-alpha2", "1.0.0-beta1").unwrap(),
            Ordering::Less
        );
        assert_eq!(
            compare("1.0.0-beta2", "1.0.0-RC1").unwrap(),
            Ordering::Less
        );
        assert_eq!(
            compare("1.0.0-RC1", "1.0.0-RC2").unwrap(),
            Ordering::Less
        );
        assert_eq!(
            compare("1.0.0-beta", "1.0.0-beta1").unwrap(),
            Ordering::Less
        );
        assert_eq!(
            cmp_normalized("1.3.0.0-beta1", "1.3.0.0-dev"),
            Ordering::Greater
        );
    }

    #[test]
    fn test_sorting() {
        let mut versions = vec![
            "1.1.0".to_string(),
            "1.0.0".to_string(),
            "1.1.0-beta1".to_string(),
            "2.0.0-RC1".to_string(),
            "1.0.1".to_string(),
        ];
        sort_ascending(&mut versions);
        assert_eq!(
            versions,
            vec!["1.0.0", "1.0.1", "1.1.0-beta1", "1.1.0", "2.0.0-RC1"]
        );
        sort_descending(&mut versions);
        assert_eq!(versions[0], "2.0.0-RC1");
        assert_eq!(versions[4], "1.0.0");
    }
}
