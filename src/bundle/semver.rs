//! Dotted-numeric version ordering
//!
//! Bundle versions are not always valid semver (`1.1.5.1`), so they are
//! compared component by component as integers, padding the shorter side
//! with zeros. A pre-release suffix sorts below the plain release and
//! pre-release identifiers follow semver precedence.

use std::cmp::Ordering;

use semver::Prerelease;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareResult {
    Latest,
    Outdated,
    Newer,
    Invalid,
}

/// A parsed version with any number of numeric components.
///
/// Equality follows ordering, so `1.0` equals `1.0.0`.
#[derive(Debug, Clone)]
pub struct DottedVersion {
    pub numbers: Vec<u64>,
    pub pre: Prerelease,
}

impl Ord for DottedVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.numbers.len().max(other.numbers.len());
        for i in 0..len {
            let a = self.numbers.get(i).copied().unwrap_or(0);
            let b = other.numbers.get(i).copied().unwrap_or(0);
            match a.cmp(&b) {
                Ordering::Equal => continue,
                ord => return ord,
            }
        }

        match (self.pre.is_empty(), other.pre.is_empty()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => self.pre.cmp(&other.pre),
        }
    }
}

impl PartialEq for DottedVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for DottedVersion {}

impl PartialOrd for DottedVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Parse a version string such as `1.2.1`, `v1.1.5.1` or `1.0.0-beta.2`.
///
/// Build metadata after `+` is ignored. Returns None when any numeric
/// component is not an integer or the pre-release is malformed.
pub fn parse_version(version: &str) -> Option<DottedVersion> {
    let version = version.trim();
    let version = version.strip_prefix('v').unwrap_or(version);
    let version = version.split('+').next().unwrap_or(version);

    let (core, pre) = match version.split_once('-') {
        Some((core, pre)) => (core, Prerelease::new(pre).ok()?),
        None => (version, Prerelease::EMPTY),
    };

    if core.is_empty() {
        return None;
    }

    let numbers = core
        .split('.')
        .map(|part| part.parse::<u64>().ok())
        .collect::<Option<Vec<_>>>()?;

    Some(DottedVersion { numbers, pre })
}

/// Compare the running version against the newest known one
pub fn compare_versions(current: &str, latest: &str) -> CompareResult {
    let (Some(current), Some(latest)) = (parse_version(current), parse_version(latest)) else {
        return CompareResult::Invalid;
    };

    match current.cmp(&latest) {
        Ordering::Equal => CompareResult::Latest,
        Ordering::Less => CompareResult::Outdated,
        Ordering::Greater => CompareResult::Newer,
    }
}

/// Find the newest version in a list; unparseable entries are skipped
pub fn find_newest(versions: &[String]) -> Option<String> {
    versions
        .iter()
        .filter_map(|v| parse_version(v).map(|parsed| (v, parsed)))
        .max_by(|(_, a), (_, b)| a.cmp(b))
        .map(|(original, _)| original.clone())
}

/// Sort versions newest first; unparseable entries keep their relative
/// order at the end.
pub fn sort_newest_first(versions: &mut [String]) {
    versions.sort_by(|a, b| match (parse_version(a), parse_version(b)) {
        (Some(a), Some(b)) => b.cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
}
