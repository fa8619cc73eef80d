//! Submission policy flags

use std::fmt;
use std::ops::BitOr;
use std::str::FromStr;

/// Bitset of independent conditions under which a local file is submitted.
///
/// Flags combine with `|`. `ALL_FILES` sets every bit and short-circuits the
/// decision logic entirely; it is distinct from merely combining the named
/// flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Submit(u8);

impl Submit {
    /// Files missing from the remote side, stored with a different size, or
    /// whose fingerprint no longer matches.
    pub const MISSING_OR_CHANGED: Submit = Submit(1);

    /// Files modified locally since the session's midnight cutoff.
    pub const CHANGED_TODAY: Submit = Submit(1 << 1);

    /// Union of the two named flags.
    pub const MISSING_OR_CHANGED_TODAY: Submit = Submit(1 | 1 << 1);

    /// Every file, unconditionally.
    pub const ALL_FILES: Submit = Submit(0xff);

    /// Check whether all bits of `flags` are set.
    pub const fn contains(self, flags: Submit) -> bool {
        self.0 & flags.0 == flags.0
    }

    /// Raw flag bits.
    pub const fn bits(self) -> u8 {
        self.0
    }
}

impl BitOr for Submit {
    type Output = Submit;

    fn bitor(self, rhs: Submit) -> Submit {
        Submit(self.0 | rhs.0)
    }
}

impl fmt::Display for Submit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.contains(Self::ALL_FILES) {
            return f.write_str("all");
        }
        let mut names = Vec::new();
        if self.contains(Self::MISSING_OR_CHANGED) {
            names.push("missing-or-changed");
        }
        if self.contains(Self::CHANGED_TODAY) {
            names.push("changed-today");
        }
        if names.is_empty() {
            names.push("none");
        }
        f.write_str(&names.join("+"))
    }
}

impl FromStr for Submit {
    type Err = UnknownPolicy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "missing-or-changed" => Ok(Self::MISSING_OR_CHANGED),
            "changed-today" => Ok(Self::CHANGED_TODAY),
            "missing-or-changed-today" => Ok(Self::MISSING_OR_CHANGED_TODAY),
            "all" => Ok(Self::ALL_FILES),
            other => Err(UnknownPolicy(other.to_string())),
        }
    }
}

/// Error parsing a policy name.
#[derive(Debug, thiserror::Error)]
#[error("unknown submission policy {0:?}")]
pub struct UnknownPolicy(pub String);
