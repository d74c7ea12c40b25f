//! Recovery actions: the escalation ladder and its static definitions.
//!
//! Each rung is a typed variant rather than a free-form string, so a typo
//! in a playbook cannot silently no-op. The ladder is validated once at
//! startup; an invalid table is fatal before the agent begins operating.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::StuckKind;

/// A recovery action the input driver knows how to perform.
///
/// Ordered from least to most disruptive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ActionId {
    /// Nudge a few units off the current spot.
    PathJitter,

    /// Toggle the mount to reset movement state.
    MountToggle,

    /// Spin the camera and rescan the scene.
    CameraRescan,

    /// Navigate back to the nearest known waypoint.
    WaypointReturn,

    /// Take the shuttle to a safe hub.
    ShuttleFallback,

    /// Log out. The terminal remedy.
    SafeLogout,
}

impl fmt::Display for ActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ActionId::PathJitter => "path_jitter",
            ActionId::MountToggle => "mount_toggle",
            ActionId::CameraRescan => "camera_rescan",
            ActionId::WaypointReturn => "waypoint_return",
            ActionId::ShuttleFallback => "shuttle_fallback",
            ActionId::SafeLogout => "safe_logout",
        };
        f.write_str(name)
    }
}

/// One rung of the ladder: static configuration for a recovery action.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionSpec {
    pub id: ActionId,

    /// Escalation order. Lower ranks are tried first.
    pub rank: u8,

    /// Base exclusivity window after an execution, before backoff.
    pub cooldown_secs: i64,

    /// How long the input driver may take before the attempt is an error.
    pub timeout_secs: i64,

    /// Which stuck conditions this action can remedy.
    pub applies_to: Vec<StuckKind>,
}

/// Errors found while validating a playbook. Fatal at startup.
#[derive(Debug, thiserror::Error)]
pub enum PlaybookError {
    #[error("playbook has no actions")]
    Empty,

    #[error("action {0} appears more than once")]
    DuplicateAction(ActionId),

    #[error("rank {rank} is shared by {action} and an earlier rung")]
    DuplicateRank { action: ActionId, rank: u8 },

    #[error("{0} has a non-positive cooldown or timeout")]
    NonPositiveWindow(ActionId),

    #[error("base cooldown of {action} (rank {rank}) does not exceed the previous rung's")]
    NonIncreasingCooldown { action: ActionId, rank: u8 },

    #[error("{0} applies to no stuck kinds")]
    NoApplicableKinds(ActionId),
}

/// The validated escalation ladder, sorted by rank.
///
/// Invariants: ranks and action ids are unique, cooldowns and timeouts are
/// positive, and base cooldowns strictly increase with rank — escalation
/// moves toward more disruptive remedies, never back and forth between
/// cheap and expensive ones.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "Vec<ActionSpec>", into = "Vec<ActionSpec>")]
pub struct Playbook {
    actions: Vec<ActionSpec>,
}

impl Playbook {
    /// Validates and sorts the given rungs into a playbook.
    pub fn new(mut actions: Vec<ActionSpec>) -> Result<Self, PlaybookError> {
        if actions.is_empty() {
            return Err(PlaybookError::Empty);
        }
        actions.sort_by_key(|a| a.rank);

        for (i, spec) in actions.iter().enumerate() {
            if spec.cooldown_secs <= 0 || spec.timeout_secs <= 0 {
                return Err(PlaybookError::NonPositiveWindow(spec.id));
            }
            if spec.applies_to.is_empty() {
                return Err(PlaybookError::NoApplicableKinds(spec.id));
            }
            if actions[..i].iter().any(|a| a.id == spec.id) {
                return Err(PlaybookError::DuplicateAction(spec.id));
            }
            if let Some(prev) = i.checked_sub(1).map(|p| &actions[p]) {
                if prev.rank == spec.rank {
                    return Err(PlaybookError::DuplicateRank {
                        action: spec.id,
                        rank: spec.rank,
                    });
                }
                if spec.cooldown_secs <= prev.cooldown_secs {
                    return Err(PlaybookError::NonIncreasingCooldown {
                        action: spec.id,
                        rank: spec.rank,
                    });
                }
            }
        }

        Ok(Self { actions })
    }

    /// The built-in six-rung ladder, least to most disruptive.
    #[must_use]
    pub fn standard() -> Self {
        use StuckKind::{NoDelta, NoQuestProgress, PathOscillation, RepeatClick};

        let movement = vec![NoDelta, RepeatClick, PathOscillation];
        let all = vec![NoDelta, RepeatClick, NoQuestProgress, PathOscillation];

        let rungs = vec![
            ActionSpec {
                id: ActionId::PathJitter,
                rank: 0,
                cooldown_secs: 15,
                timeout_secs: 5,
                applies_to: movement,
            },
            ActionSpec {
                id: ActionId::MountToggle,
                rank: 1,
                cooldown_secs: 30,
                timeout_secs: 10,
                applies_to: vec![NoDelta, PathOscillation],
            },
            ActionSpec {
                id: ActionId::CameraRescan,
                rank: 2,
                cooldown_secs: 60,
                timeout_secs: 15,
                applies_to: all.clone(),
            },
            ActionSpec {
                id: ActionId::WaypointReturn,
                rank: 3,
                cooldown_secs: 120,
                timeout_secs: 45,
                applies_to: all.clone(),
            },
            ActionSpec {
                id: ActionId::ShuttleFallback,
                rank: 4,
                cooldown_secs: 300,
                timeout_secs: 90,
                applies_to: all.clone(),
            },
            ActionSpec {
                id: ActionId::SafeLogout,
                rank: 5,
                cooldown_secs: 600,
                timeout_secs: 30,
                applies_to: all,
            },
        ];

        Self::new(rungs).expect("standard ladder is valid")
    }

    /// All rungs, sorted by rank.
    #[must_use]
    pub fn actions(&self) -> &[ActionSpec] {
        &self.actions
    }

    /// Looks up a rung by action id.
    #[must_use]
    pub fn get(&self, id: ActionId) -> Option<&ActionSpec> {
        self.actions.iter().find(|a| a.id == id)
    }

    /// Rungs applicable to the given stuck kind, in rank order.
    pub fn candidates(&self, kind: StuckKind) -> impl Iterator<Item = &ActionSpec> {
        self.actions
            .iter()
            .filter(move |a| a.applies_to.contains(&kind))
    }
}

impl TryFrom<Vec<ActionSpec>> for Playbook {
    type Error = PlaybookError;

    fn try_from(actions: Vec<ActionSpec>) -> Result<Self, Self::Error> {
        Self::new(actions)
    }
}

impl From<Playbook> for Vec<ActionSpec> {
    fn from(playbook: Playbook) -> Self {
        playbook.actions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rung(id: ActionId, rank: u8, cooldown: i64) -> ActionSpec {
        ActionSpec {
            id,
            rank,
            cooldown_secs: cooldown,
            timeout_secs: 10,
            applies_to: vec![StuckKind::NoDelta],
        }
    }

    #[test]
    fn standard_ladder_is_valid_and_sorted() {
        let playbook = Playbook::standard();
        let ranks: Vec<u8> = playbook.actions().iter().map(|a| a.rank).collect();
        assert_eq!(ranks, vec![0, 1, 2, 3, 4, 5]);
        assert_eq!(playbook.actions()[5].id, ActionId::SafeLogout);
    }

    #[test]
    fn standard_cooldowns_strictly_increase() {
        let playbook = Playbook::standard();
        for pair in playbook.actions().windows(2) {
            assert!(pair[1].cooldown_secs > pair[0].cooldown_secs);
        }
    }

    #[test]
    fn rejects_empty_playbook() {
        let err = Playbook::new(vec![]).unwrap_err();
        assert!(matches!(err, PlaybookError::Empty));
    }

    #[test]
    fn rejects_duplicate_action() {
        let err = Playbook::new(vec![
            rung(ActionId::PathJitter, 0, 10),
            rung(ActionId::PathJitter, 1, 20),
        ])
        .unwrap_err();
        assert!(matches!(err, PlaybookError::DuplicateAction(_)));
    }

    #[test]
    fn rejects_non_increasing_cooldown() {
        let err = Playbook::new(vec![
            rung(ActionId::PathJitter, 0, 30),
            rung(ActionId::MountToggle, 1, 30),
        ])
        .unwrap_err();
        assert!(matches!(err, PlaybookError::NonIncreasingCooldown { .. }));
    }

    #[test]
    fn rejects_rung_with_no_kinds() {
        let mut bad = rung(ActionId::PathJitter, 0, 10);
        bad.applies_to.clear();
        let err = Playbook::new(vec![bad]).unwrap_err();
        assert!(matches!(err, PlaybookError::NoApplicableKinds(_)));
    }

    #[test]
    fn candidates_filter_by_kind_in_rank_order() {
        let playbook = Playbook::standard();
        let ids: Vec<ActionId> = playbook
            .candidates(StuckKind::NoQuestProgress)
            .map(|a| a.id)
            .collect();
        assert_eq!(
            ids,
            vec![
                ActionId::CameraRescan,
                ActionId::WaypointReturn,
                ActionId::ShuttleFallback,
                ActionId::SafeLogout,
            ]
        );
    }
}
