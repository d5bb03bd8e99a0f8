//! Configuration scope identifiers

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::PanelError;

/// The configuration namespace being edited.
///
/// The daemon addresses scopes by number in its URLs: `0` is the global
/// defaults, every other number is a camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum Scope {
    /// Global defaults shared by every camera
    #[default]
    Default,
    /// Per-camera overrides
    Camera(u32),
}

impl Scope {
    /// Numeric identifier used in the daemon's URL paths.
    pub fn id(self) -> u32 {
        match self {
            Scope::Default => 0,
            Scope::Camera(id) => id,
        }
    }

    /// Build a scope from the daemon's numeric identifier.
    pub fn from_id(id: u32) -> Self {
        if id == 0 { Scope::Default } else { Scope::Camera(id) }
    }

    /// Check if this is the global scope.
    pub fn is_default(self) -> bool {
        matches!(self, Scope::Default)
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Default => f.write_str("default"),
            Scope::Camera(id) => write!(f, "camera:{}", id),
        }
    }
}

impl FromStr for Scope {
    type Err = PanelError;

    /// Accepts `default`, `camera:<id>`, `cam<id>` and bare numbers.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || PanelError::InvalidScope { input: s.to_string() };
        let trimmed = s.trim();

        if trimmed.eq_ignore_ascii_case("default") {
            return Ok(Scope::Default);
        }

        let digits = trimmed
            .strip_prefix("camera:")
            .or_else(|| trimmed.strip_prefix("cam"))
            .unwrap_or(trimmed);
        let id: u32 = digits.parse().map_err(|_| invalid())?;

        // "camera:0" is not a camera
        if id == 0 && digits.len() != trimmed.len() {
            return Err(invalid());
        }
        Ok(Scope::from_id(id))
    }
}

impl From<Scope> for String {
    fn from(scope: Scope) -> Self {
        scope.to_string()
    }
}

impl TryFrom<String> for Scope {
    type Error = PanelError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}
