//! Command line arguments.
//!
//! Flags given on the command line override the matching settings of the
//! configuration file.

use std::path::PathBuf;

use clap::Parser;
use skinweld_optimizer::{OptimizerConfig, RunMode};

/// skinweld command line arguments.
#[derive(Parser, Debug)]
#[command(
    name = "skinweld",
    about = "Merge an avatar's skinned meshes and retarget its animation",
    long_about = "Consolidates the skinned meshes of an avatar stored as RON.\n\n\
        Renderers that draw and animate the same way are merged into one, \
        blend shapes that hide geometry or that nothing drives are removed, \
        and every clip touching a merged renderer is rewritten.\n\
        \n\
        By default nothing is changed: the run only reports what it would do.\n\
        \n\
        EXAMPLES:\n\
          # Report mergeable groups and removable blend shapes\n\
          skinweld --avatar avatar.ron\n\
        \n\
          # Apply and write the optimised avatar\n\
          skinweld --avatar avatar.ron --apply --output optimised.ron",
    version
)]
pub struct Args {
    /// Avatar to optimise (RON).
    #[arg(long)]
    pub avatar: PathBuf,

    /// Optimizer configuration (TOML).
    #[arg(long, default_value = "skinweld.toml")]
    pub config: PathBuf,

    /// Where to write the optimised avatar. Defaults to overwriting the input.
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Apply changes instead of only reporting them.
    #[arg(long)]
    pub apply: bool,

    /// Directory for generated meshes, clips and controllers.
    #[arg(long)]
    pub generated_dir: Option<PathBuf>,

    /// Keep generated assets and write a debug copy of the avatar.
    #[arg(long)]
    pub no_cleanup: bool,
}

impl Args {
    /// Run mode selected by `--apply`.
    pub fn mode(&self) -> RunMode {
        if self.apply {
            RunMode::Apply
        } else {
            RunMode::DryRun
        }
    }

    /// Output path, falling back to the input avatar.
    pub fn output(&self) -> &PathBuf {
        self.output.as_ref().unwrap_or(&self.avatar)
    }

    /// Fold command line overrides into `config`.
    pub fn apply_overrides(&self, config: &mut OptimizerConfig) {
        if let Some(dir) = &self.generated_dir {
            config.assets.generated_dir = dir.clone();
        }
        if self.no_cleanup {
            config.optimizer.cleanup = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_dry_run_in_place() {
        let args = Args::parse_from(["skinweld", "--avatar", "a.ron"]);
        assert_eq!(args.mode(), RunMode::DryRun);
        assert_eq!(args.output(), &PathBuf::from("a.ron"));
        assert_eq!(args.config, PathBuf::from("skinweld.toml"));
    }

    #[test]
    fn flags_override_config() {
        let args = Args::parse_from([
            "skinweld",
            "--avatar",
            "a.ron",
            "--apply",
            "--output",
            "b.ron",
            "--generated-dir",
            "gen",
            "--no-cleanup",
        ]);
        assert_eq!(args.mode(), RunMode::Apply);
        assert_eq!(args.output(), &PathBuf::from("b.ron"));

        let mut config = OptimizerConfig::default();
        args.apply_overrides(&mut config);
        assert_eq!(config.assets.generated_dir, PathBuf::from("gen"));
        assert!(!config.optimizer.cleanup);
    }

    #[test]
    fn avatar_is_required() {
        assert!(Args::try_parse_from(["skinweld"]).is_err());
    }
}
