//! Screen-side preference for subject selection.

use serde::{Deserialize, Serialize};

/// Which side of the screen the analyzed player occupies.
///
/// Carried by the job request as `position` and used both for subject
/// selection and for mirroring side-relative pose geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// Player 1 side (faces right)
    #[default]
    Left,
    /// Player 2 side (faces left)
    Right,
}

impl Side {
    /// Get string representation of the side.
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Left => "left",
            Side::Right => "right",
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_side_wire_format() {
        assert_eq!(serde_json::to_string(&Side::Left).unwrap(), "\"left\"");
        assert_eq!(
            serde_json::from_str::<Side>("\"right\"").unwrap(),
            Side::Right
        );
    }
}
