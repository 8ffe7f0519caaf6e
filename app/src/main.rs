//! # skinweld
//!
//! Command line front end for the skinweld optimizer.

mod args;

use std::process::ExitCode;

use clap::Parser;
use skinweld_optimizer::assets::{self, AssetStore, DirectoryAssetStore};
use skinweld_optimizer::{OptimizeResult, OptimizerConfig, Pipeline, RunMode};

use crate::args::Args;

fn run(args: &Args) -> OptimizeResult<()> {
    let mut config = OptimizerConfig::load_or_default(&args.config);
    args.apply_overrides(&mut config);

    let avatar = assets::load_avatar(&args.avatar)?;
    log::info!(
        "Loaded {}: {} renderers, {} clips",
        avatar.name,
        avatar.renderers.len(),
        avatar.clips.len()
    );

    let mode = args.mode();
    let pipeline = Pipeline::from_config(&config);
    let (avatar, diagnostics) = pipeline.run(avatar, mode)?;
    print!("{diagnostics}");

    if mode == RunMode::DryRun {
        log::info!("Dry run, nothing written. Pass --apply to make these changes");
        return Ok(());
    }

    let mut store = DirectoryAssetStore::new(&config.assets.generated_dir);
    let cleanup = config.optimizer.cleanup;
    assets::flush_generated(&avatar, &mut store, !cleanup)?;
    assets::save_avatar(&avatar, args.output())?;
    log::info!("Wrote {}", args.output().display());

    if cleanup {
        store.clear()?;
    }
    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    skinweld_core::init();
    skinweld_optimizer::init();

    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}
