//! Motion command recognition over the ordered pose stream.
//!
//! Each pose is first classified into a coarse pose token using
//! side-relative geometry, then the run-length-compressed token history is
//! matched against the selected character's command table. A refractory
//! window after each match keeps a held pose from firing the same command
//! on every following frame.

use std::collections::VecDeque;

use tracing::debug;

use cmdclip_models::{pose::keypoint, Command, Input, Pose, Side};

/// Frames of suppression after a recognized command.
const REFRACTORY_FRAMES: u64 = 45;

/// Maximum compressed token history considered for matching.
const HISTORY_LEN: usize = 8;

/// Minimum keypoint score for a joint to participate in classification.
const MIN_KEYPOINT_SCORE: f32 = 0.3;

/// Coarse per-frame pose classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PoseToken {
    Neutral,
    Crouch,
    ArmExtended,
    ArmRaised,
    LegExtended,
}

/// One entry of a character's command table.
struct CommandSpec {
    name: &'static str,
    /// Token subsequence ending the compressed history on a match
    pattern: &'static [PoseToken],
    inputs: &'static [Input],
}

/// Table for characters with the standard motion set.
const DEFAULT_TABLE: &[CommandSpec] = &[
    CommandSpec {
        name: "dragon_punch",
        pattern: &[PoseToken::Crouch, PoseToken::ArmRaised],
        inputs: &[Input::Forward, Input::Down, Input::DownForward, Input::Punch],
    },
    CommandSpec {
        name: "qcf_punch",
        pattern: &[PoseToken::Crouch, PoseToken::ArmExtended],
        inputs: &[Input::Down, Input::DownForward, Input::Forward, Input::Punch],
    },
    CommandSpec {
        name: "qcb_kick",
        pattern: &[PoseToken::Crouch, PoseToken::LegExtended],
        inputs: &[Input::Down, Input::DownBack, Input::Back, Input::Kick],
    },
];

/// Table for charge characters: attacks come out of a held crouch.
const CHARGE_TABLE: &[CommandSpec] = &[
    CommandSpec {
        name: "flash_kick",
        pattern: &[PoseToken::Crouch, PoseToken::ArmRaised],
        inputs: &[Input::Down, Input::Up, Input::Kick],
    },
    CommandSpec {
        name: "sonic_boom",
        pattern: &[PoseToken::Crouch, PoseToken::ArmExtended],
        inputs: &[Input::Back, Input::Forward, Input::Punch],
    },
    CommandSpec {
        name: "charge_kick",
        pattern: &[PoseToken::Crouch, PoseToken::LegExtended],
        inputs: &[Input::Back, Input::Forward, Input::Kick],
    },
];

fn table_for(character: &str) -> &'static [CommandSpec] {
    match character.to_ascii_lowercase().as_str() {
        "guile" | "charlie" => CHARGE_TABLE,
        _ => DEFAULT_TABLE,
    }
}

/// Stateful recognizer for one job's pose stream.
///
/// One instance per job; state never crosses job boundaries.
pub struct MotionRecognizer {
    table: &'static [CommandSpec],
    side: Side,
    /// Run-length compressed token history, newest last
    history: VecDeque<PoseToken>,
    frame: u64,
    suppressed_until: u64,
}

impl MotionRecognizer {
    pub fn new(character: &str, side: Side) -> Self {
        let table = table_for(character);
        debug!(character, ?side, commands = table.len(), "Recognizer ready");
        Self {
            table,
            side,
            history: VecDeque::with_capacity(HISTORY_LEN),
            frame: 0,
            suppressed_until: 0,
        }
    }

    /// Feed the next pose in stream order; returns a command on the frame
    /// that completes its token pattern.
    pub fn extract(&mut self, pose: &Pose) -> Option<Command> {
        self.frame += 1;

        let token = classify(pose, self.side);
        self.push_token(token);

        if self.frame <= self.suppressed_until {
            return None;
        }

        let spec = self.match_history()?;
        debug!(command = spec.name, frame = self.frame, "Recognized command");

        self.suppressed_until = self.frame + REFRACTORY_FRAMES;
        self.history.clear();

        Some(Command::new(spec.name, spec.inputs.to_vec()))
    }

    /// Input primitives for a recognized command.
    ///
    /// Resolves through the character table first so callers holding only a
    /// command name still get the canonical strip; commands from other
    /// tables fall back to the inputs they carry.
    pub fn inputs<'a>(&'a self, command: &'a Command) -> &'a [Input] {
        self.table
            .iter()
            .find(|spec| spec.name == command.name)
            .map(|spec| spec.inputs)
            .unwrap_or(&command.inputs)
    }

    fn push_token(&mut self, token: PoseToken) {
        if self.history.back() == Some(&token) {
            return;
        }
        if self.history.len() == HISTORY_LEN {
            self.history.pop_front();
        }
        self.history.push_back(token);
    }

    fn match_history(&self) -> Option<&'static CommandSpec> {
        self.table.iter().find(|spec| {
            let n = spec.pattern.len();
            self.history.len() >= n
                && self
                    .history
                    .iter()
                    .rev()
                    .take(n)
                    .eq(spec.pattern.iter().rev())
        })
    }
}

/// Classify a pose into one token using side-relative geometry.
///
/// `Forward` is toward the opponent: +x for a left-side player, -x for a
/// right-side one. Joints below the score floor drop their token out of
/// consideration rather than guessing.
fn classify(pose: &Pose, side: Side) -> PoseToken {
    let forward = match side {
        Side::Left => 1.0f32,
        Side::Right => -1.0f32,
    };

    let Some((_, shoulder_y)) = scored_center(
        pose,
        keypoint::LEFT_SHOULDER,
        keypoint::RIGHT_SHOULDER,
    ) else {
        return PoseToken::Neutral;
    };
    let Some((hip_x, hip_y)) = scored_center(pose, keypoint::LEFT_HIP, keypoint::RIGHT_HIP)
    else {
        return PoseToken::Neutral;
    };

    // Torso height is the scale reference for every threshold
    let torso = (hip_y - shoulder_y).abs();
    if torso < 1.0 {
        return PoseToken::Neutral;
    }

    if let Some((wx, wy)) = best_joint(pose, keypoint::LEFT_WRIST, keypoint::RIGHT_WRIST, forward)
    {
        if wy < shoulder_y - 0.6 * torso {
            return PoseToken::ArmRaised;
        }
        if (wx - hip_x) * forward > 0.8 * torso && (wy - shoulder_y).abs() < 0.5 * torso {
            return PoseToken::ArmExtended;
        }
    }

    if let Some((ax, _)) = best_joint(pose, keypoint::LEFT_ANKLE, keypoint::RIGHT_ANKLE, forward)
    {
        if (ax - hip_x) * forward > 0.9 * torso {
            return PoseToken::LegExtended;
        }
    }

    if let Some((_, knee_y)) = scored_center(pose, keypoint::LEFT_KNEE, keypoint::RIGHT_KNEE) {
        if knee_y - hip_y < 0.6 * torso {
            return PoseToken::Crouch;
        }
    }

    PoseToken::Neutral
}

/// Midpoint of a joint pair, requiring both scores above the floor.
fn scored_center(pose: &Pose, left: usize, right: usize) -> Option<(f32, f32)> {
    let l = pose.keypoint(left)?;
    let r = pose.keypoint(right)?;
    if l.score < MIN_KEYPOINT_SCORE || r.score < MIN_KEYPOINT_SCORE {
        return None;
    }
    Some(((l.x + r.x) / 2.0, (l.y + r.y) / 2.0))
}

/// The joint of a pair farthest along the forward direction.
fn best_joint(pose: &Pose, left: usize, right: usize, forward: f32) -> Option<(f32, f32)> {
    let candidates = [pose.keypoint(left), pose.keypoint(right)];
    candidates
        .into_iter()
        .flatten()
        .filter(|k| k.score >= MIN_KEYPOINT_SCORE)
        .max_by(|a, b| {
            (a.x * forward)
                .partial_cmp(&(b.x * forward))
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .map(|k| (k.x, k.y))
}
