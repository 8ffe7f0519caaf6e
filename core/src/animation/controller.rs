//! Animator controllers: layered state machines whose states play clips.

use serde::{Deserialize, Serialize};

use crate::registry::ClipId;

/// A state playing an optional clip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct State {
    /// State name.
    pub name: String,
    /// Clip played while in this state.
    #[serde(default)]
    pub motion: Option<ClipId>,
}

/// A state machine with nested child machines.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StateMachine {
    /// States of this machine.
    #[serde(default)]
    pub states: Vec<State>,
    /// Nested state machines.
    #[serde(default)]
    pub children: Vec<StateMachine>,
}

impl StateMachine {
    /// Visit every state, nested machines included.
    pub fn visit_states(&self, f: &mut impl FnMut(&State)) {
        self.states.iter().for_each(&mut *f);
        for child in &self.children {
            child.visit_states(f);
        }
    }

    /// Replace every motion for which `map` returns a substitute.
    /// Returns the number of states changed.
    pub fn replace_motions(&mut self, map: &impl Fn(ClipId) -> Option<ClipId>) -> usize {
        let mut changed = 0;
        for state in &mut self.states {
            if let Some(replacement) = state.motion.and_then(map) {
                state.motion = Some(replacement);
                changed += 1;
            }
        }
        for child in &mut self.children {
            changed += child.replace_motions(map);
        }
        changed
    }
}

/// An animator controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimatorController {
    /// Asset name.
    pub name: String,
    /// Layer state machines.
    pub layers: Vec<StateMachine>,
    /// Set on controllers produced by optimisation passes.
    #[serde(default)]
    pub generated: bool,
}

impl AnimatorController {
    /// Create a controller without layers.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            layers: Vec::new(),
            generated: false,
        }
    }

    /// Append a layer.
    #[must_use]
    pub fn with_layer(mut self, layer: StateMachine) -> Self {
        self.layers.push(layer);
        self
    }

    /// Distinct clips played by any state, in first-seen order.
    pub fn clips(&self) -> Vec<ClipId> {
        let mut clips = Vec::new();
        for layer in &self.layers {
            layer.visit_states(&mut |state| {
                if let Some(clip) = state.motion {
                    if !clips.contains(&clip) {
                        clips.push(clip);
                    }
                }
            });
        }
        clips
    }

    /// Replace motions in every layer. Returns the number of states changed.
    pub fn replace_motions(&mut self, map: &impl Fn(ClipId) -> Option<ClipId>) -> usize {
        self.layers.iter_mut().map(|l| l.replace_motions(map)).sum()
    }
}
