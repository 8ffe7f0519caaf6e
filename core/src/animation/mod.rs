//! Animation data: clips, curve bindings and animator controllers.
//!
//! - [`AnimationClip`] - named list of [`CurveBinding`]s
//! - [`Curve`] - float or object-reference keys
//! - [`AnimatorController`] - layered [`StateMachine`]s referencing clips
//! - [`property`] - helpers for well-known property names

mod clip;
mod controller;
pub mod property;

pub use clip::{
    AnimationClip, Curve, CurveBinding, Keyframe, ObjectKeyframe, TargetType, WeightedMode,
};
pub use controller::{AnimatorController, State, StateMachine};
