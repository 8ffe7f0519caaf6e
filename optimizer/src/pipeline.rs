//! The pipeline driver.
//!
//! A [`Pipeline`] threads the avatar through its stages in order. The
//! standard order strips marked blend shapes first, then removes unused
//! ones, then merges meshes, so merged meshes carry as few shapes as
//! possible.

use skinweld_core::avatar::Avatar;

use crate::config::OptimizerConfig;
use crate::diagnostics::Diagnostics;
use crate::error::OptimizeResult;
use crate::stages::{
    MergeMeshes, RemoveMarkedBlendShapes, RemoveUnusedBlendShapes, RunMode, Stage, StageContext,
};

/// Ordered list of stages.
#[derive(Default)]
pub struct Pipeline {
    stages: Vec<Box<dyn Stage>>,
}

impl Pipeline {
    /// An empty pipeline.
    pub fn new() -> Self {
        Self::default()
    }

    /// The standard stages enabled by `config`.
    pub fn from_config(config: &OptimizerConfig) -> Self {
        let mut pipeline = Self::new();
        if !config.optimizer.enabled {
            log::info!("Optimizer disabled");
            return pipeline;
        }
        if config.blendshapes.remove_marked {
            pipeline = pipeline.with_stage(RemoveMarkedBlendShapes::new(
                config.blendshapes.marker_prefix.clone(),
            ));
        }
        if config.blendshapes.remove_unused {
            pipeline = pipeline.with_stage(RemoveUnusedBlendShapes);
        }
        if config.merge.enabled {
            pipeline = pipeline.with_stage(
                MergeMeshes::new()
                    .with_copy_blend_shapes(config.merge.copy_blendshapes)
                    .with_frame_policy(config.merge.frame_policy),
            );
        }
        pipeline
    }

    /// Append a stage.
    #[must_use]
    pub fn with_stage(mut self, stage: impl Stage + 'static) -> Self {
        self.stages.push(Box::new(stage));
        self
    }

    /// Stage names in run order.
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Run every stage in order.
    pub fn run(&self, mut avatar: Avatar, mode: RunMode) -> OptimizeResult<(Avatar, Diagnostics)> {
        let mut diagnostics = Diagnostics::new();
        for stage in &self.stages {
            log::info!("Running {} ({mode:?})", stage.name());
            let mut ctx = StageContext {
                mode,
                diagnostics: &mut diagnostics,
            };
            avatar = stage.run(avatar, &mut ctx)?;
        }
        Ok((avatar, diagnostics))
    }
}
