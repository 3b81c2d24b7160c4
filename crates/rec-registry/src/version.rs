//! Semver-like version increment for `computeNextVersion` (spec §4.3).

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bump {
    Patch,
    Minor,
    Major,
}

impl Bump {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "patch" => Some(Bump::Patch),
            "minor" => Some(Bump::Minor),
            "major" => Some(Bump::Major),
            _ => None,
        }
    }
}

impl Default for Bump {
    fn default() -> Self {
        Bump::Minor
    }
}

fn parse_triple(version: &str) -> (u64, u64, u64) {
    let mut parts = version.split('.').map(|p| p.parse::<u64>().unwrap_or(0));
    let major = parts.next().unwrap_or(0);
    let minor = parts.next().unwrap_or(0);
    let patch = parts.next().unwrap_or(0);
    (major, minor, patch)
}

/// `latest` is the version being bumped from; `None` starts from `0.0.0`.
pub fn next_version(latest: Option<&str>, bump: Bump) -> String {
    let (major, minor, patch) = parse_triple(latest.unwrap_or("0.0.0"));
    let (major, minor, patch) = match bump {
        Bump::Patch => (major, minor, patch + 1),
        Bump::Minor => (major, minor + 1, 0),
        Bump::Major => (major + 1, 0, 0),
    };
    format!("{major}.{minor}.{patch}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starting_point_is_0_0_1_on_patch_bump() {
        assert_eq!(next_version(None, Bump::Patch), "0.0.1");
    }

    #[test]
    fn default_bump_is_minor() {
        assert_eq!(next_version(Some("1.2.3"), Bump::default()), "1.3.0");
    }

    #[test]
    fn major_bump_resets_minor_and_patch() {
        assert_eq!(next_version(Some("1.2.3"), Bump::Major), "2.0.0");
    }
}
