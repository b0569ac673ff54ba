// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The main entry point: size the run, search for categories, expand
//! the plan, render it.

use std::path::PathBuf;

use crate::colorize::{ColorizerFactory, PaletteModel};
use crate::config::GeneratorConfig;
use crate::dataset::{prepare_output_dir, DirectorySink, ImageSink};
use crate::planner::{weight_catalogue, Planner};
use crate::scheduler::{worker_count, Scheduler};

/// What a finished run did.
#[derive(Clone, Debug, PartialEq)]
pub struct GenerationReport {
    /// Where the images went.
    pub output_dir: PathBuf,
    /// Images written.
    pub images: usize,
    /// Categories searched for.
    pub categories: usize,
    /// Repeats of each catalogue row per category.
    pub instances: usize,
    /// Worker threads used.
    pub workers: usize,
}

/// Generates the dataset `config` describes into its output
/// directory, with the palette colorizer.
pub fn generate(config: &GeneratorConfig) -> Result<GenerationReport, failure::Error> {
    config.validate()?;
    let model = match config.model_path {
        Some(ref path) => PaletteModel::at(path)?,
        None => PaletteModel::builtin(),
    };
    // Fail on a broken table before the output directory is emptied.
    model.load()?;
    prepare_output_dir(&config.output_dir, config.overwrite)?;
    let sink = DirectorySink::new(&config.output_dir, config.format);
    generate_with(config, &model, &sink)
}

/// Generates the dataset `config` describes through caller-supplied
/// colorization and output.  The output directory is not touched.
pub fn generate_with(
    config: &GeneratorConfig,
    factory: &dyn ColorizerFactory,
    sink: &dyn ImageSink,
) -> Result<GenerationReport, failure::Error> {
    config.validate()?;
    let planner = Planner::new(config.count, weight_catalogue())?;
    let sizing = planner.sizing();
    let scheduler = Scheduler::new(worker_count(config.workers, config.count), config.seed);
    info!(
        "generating {} images of {}x{}: {} categories, {} instances per row, {} workers",
        config.count,
        config.height,
        config.width,
        sizing.categories,
        sizing.instances,
        scheduler.workers()
    );

    let categories = scheduler.search_round(&config.search(), sizing.categories)?;
    let plan = planner.expand(categories)?;
    let images = scheduler.render_round(&plan, &config.renderer(), factory, sink)?;

    Ok(GenerationReport {
        output_dir: config.output_dir.clone(),
        images,
        categories: sizing.categories,
        instances: sizing.instances,
        workers: scheduler.workers(),
    })
}
