// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The error kinds the generator can raise.  Configuration errors are
//! raised before any fractal is searched for; numerical errors come
//! out of a single render; scheduling errors wrap whatever killed a
//! worker.

use failure::Fail;

/// Every failure the generator knows how to name.
#[derive(Debug, Fail)]
pub enum IfsError {
    /// The output directory has files in it and we were not told to
    /// clobber them.
    #[fail(
        display = "Directory '{}' already exists (pass --overwrite to overwrite)",
        _0
    )]
    OutputNotEmpty(String),

    /// Only images can be generated.
    #[fail(display = "Data type '{}' is not supported", _0)]
    UnsupportedDataType(String),

    /// The requested image is too small to hold the padding.
    #[fail(
        display = "Shape {}x{} is too small; both sides must be at least {}",
        _0, _1, _2
    )]
    InvalidShape(usize, usize, usize),

    /// Zero images were requested.
    #[fail(display = "Image count must be at least 1")]
    InvalidCount,

    /// Density thresholds are fractions.
    #[fail(display = "Density threshold {} is not within (0, 1]", _0)]
    InvalidThreshold(f64),

    /// An IFS needs at least one map.
    #[fail(display = "An IFS parameter set needs at least one affine map")]
    EmptyParameterSet,

    /// Every sample of the point cloud diverged.
    #[fail(display = "Point cloud has no finite points left to render")]
    NonFinitePoints,

    /// Every finite sample sits on the same coordinate of one axis, so
    /// the cloud cannot be stretched over the image.
    #[fail(display = "Point cloud has zero extent along the {} axis", _0)]
    ZeroRange(&'static str),

    /// The rejection sampler gave up.
    #[fail(
        display = "No category reached the density threshold after {} attempts",
        _0
    )]
    SearchExhausted(usize),

    /// The search round came back with fewer categories than the
    /// planner sized for.
    #[fail(display = "Expected {} categories, search produced {}", _0, _1)]
    ShortSearch(usize, usize),

    /// The colorization artifact could not be created or read.
    #[fail(display = "Colorization model artifact '{}': {}", _0, _1)]
    ModelArtifact(String, String),

    /// A worker returned an error for its batch.
    #[fail(display = "Worker for batch {} failed: {}", _0, _1)]
    WorkerFailed(usize, String),

    /// A worker thread panicked.
    #[fail(display = "Worker for batch {} panicked", _0)]
    WorkerPanicked(usize),
}
