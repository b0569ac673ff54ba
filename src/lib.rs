#![deny(missing_docs)]
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Synthetic fractal image datasets
//!
//! An Iterated Function System (IFS) is a small set of affine maps of
//! the plane.  Pick one of the maps at random, apply it to a point,
//! and repeat: the trail of points converges onto the attractor of
//! the system, which is very often a fractal.  Random IFSs make for
//! cheap, endlessly varied, label-free images, which is what a
//! pretraining dataset wants.
//!
//! Generation happens in four steps.  The planner decides how many
//! fractal "categories" are needed for the requested number of images.
//! The category search draws random systems until it finds ones whose
//! attractor covers enough of the image.  The planner then assigns
//! every output index a category and a row of coefficient weights, so
//! that each category is drawn many times with small variations.
//! Finally the scheduler renders every index across a pool of worker
//! threads, colorizes and augments each mask, and writes it to a file
//! named after its index.

#[macro_use]
extern crate log;
extern crate crossbeam;
extern crate failure;
extern crate image;
extern crate itertools;
extern crate num;
extern crate num_cpus;
extern crate rand;

pub mod augment;
pub mod colorize;
pub mod config;
pub mod dataset;
pub mod error;
pub mod generator;
pub mod ifs;
pub mod planner;
pub mod render;
pub mod scheduler;
pub mod search;

pub use config::{DataType, GeneratorConfig};
pub use error::IfsError;
pub use generator::{generate, generate_with, GenerationReport};
pub use ifs::{AffineMap, IfsParams, Mask, PointCloud};
pub use planner::{GenerationPlan, Planner};
pub use scheduler::Scheduler;
pub use search::CategorySearch;
