//! Recognized motion commands and their input primitives.

use serde::{Deserialize, Serialize};

/// A single input primitive of a motion command.
///
/// Directions are side-relative: `Forward` always points toward the
/// opponent, so a left-side and a right-side player performing the same
/// command produce the same primitives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Input {
    Up,
    Down,
    Back,
    Forward,
    DownBack,
    DownForward,
    UpBack,
    UpForward,
    Punch,
    Kick,
}

impl Input {
    /// Short glyph used for logging and icon labels.
    pub fn glyph(&self) -> &'static str {
        match self {
            Input::Up => "8",
            Input::Down => "2",
            Input::Back => "4",
            Input::Forward => "6",
            Input::DownBack => "1",
            Input::DownForward => "3",
            Input::UpBack => "7",
            Input::UpForward => "9",
            Input::Punch => "P",
            Input::Kick => "K",
        }
    }

    /// Whether this primitive is a directional input (vs. a button).
    pub fn is_direction(&self) -> bool {
        !matches!(self, Input::Punch | Input::Kick)
    }
}

/// A discrete command recognized from the pose stream.
///
/// Carries the input primitives used to render its icon so consumers do not
/// need to reach back into the recognizer's command table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    /// Command identifier, e.g. `"qcf_punch"`
    pub name: String,
    /// Ordered input primitives shown on the icon
    pub inputs: Vec<Input>,
}

impl Command {
    /// Create a new command.
    pub fn new(name: impl Into<String>, inputs: Vec<Input>) -> Self {
        Self {
            name: name.into(),
            inputs,
        }
    }

    /// Notation string for logging, e.g. `236P`.
    pub fn notation(&self) -> String {
        self.inputs.iter().map(|i| i.glyph()).collect()
    }
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name, self.notation())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notation() {
        let cmd = Command::new(
            "qcf_punch",
            vec![Input::Down, Input::DownForward, Input::Forward, Input::Punch],
        );
        assert_eq!(cmd.notation(), "236P");
    }

    #[test]
    fn test_direction_split() {
        assert!(Input::DownForward.is_direction());
        assert!(!Input::Punch.is_direction());
    }
}
