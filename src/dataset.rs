// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The output side of a run: the directory images land in, the names
//! they land under, and the sink workers write through.

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use image::RgbImage;

use crate::error::IfsError;

/// Image container formats we can write.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Format {
    /// Portable Network Graphics.
    Png,
    /// JPEG.
    Jpeg,
    /// Windows bitmap.
    Bmp,
}

impl Format {
    /// The file extension, which also selects the encoder.
    pub fn extension(self) -> &'static str {
        match self {
            Format::Png => "png",
            Format::Jpeg => "jpg",
            Format::Bmp => "bmp",
        }
    }
}

impl FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> Result<Format, String> {
        match s.to_ascii_lowercase().as_str() {
            "png" => Ok(Format::Png),
            "jpg" | "jpeg" => Ok(Format::Jpeg),
            "bmp" => Ok(Format::Bmp),
            other => Err(format!("Unknown image format '{}'", other)),
        }
    }
}

/// The name of the image with global index `index`: the index as six
/// zero-padded digits, then the extension.
pub fn file_name(index: usize, format: Format) -> String {
    format!("{:06}.{}", index, format.extension())
}

/// Makes sure `path` is an empty directory.  A directory with files in
/// it is emptied if `overwrite` is set and refused otherwise.
pub fn prepare_output_dir(path: &Path, overwrite: bool) -> Result<(), failure::Error> {
    if path.is_dir() {
        if fs::read_dir(path)?.next().is_none() {
            return Ok(());
        }
        if !overwrite {
            return Err(IfsError::OutputNotEmpty(path.display().to_string()).into());
        }
        warn!("removing existing contents of {}", path.display());
        fs::remove_dir_all(path)?;
    }
    fs::create_dir_all(path)?;
    Ok(())
}

/// Where finished images go.  Each index is written exactly once, and
/// workers write disjoint sets of indices.
pub trait ImageSink: Sync {
    /// Stores the image with global index `index`.
    fn write(&self, index: usize, image: &RgbImage) -> Result<(), failure::Error>;
}

/// Writes each image as its own file in a directory.
#[derive(Clone, Debug)]
pub struct DirectorySink {
    directory: PathBuf,
    format: Format,
}

impl DirectorySink {
    /// A sink writing `format` files into `directory`.
    pub fn new(directory: &Path, format: Format) -> DirectorySink {
        DirectorySink {
            directory: directory.to_path_buf(),
            format,
        }
    }

    /// The full path an index is written to.
    pub fn path_for(&self, index: usize) -> PathBuf {
        self.directory.join(file_name(index, self.format))
    }
}

impl ImageSink for DirectorySink {
    fn write(&self, index: usize, image: &RgbImage) -> Result<(), failure::Error> {
        let path = self.path_for(index);
        image.save(&path)?;
        trace!("wrote {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_six_digit_zero_padded() {
        assert_eq!(file_name(0, Format::Png), "000000.png");
        assert_eq!(file_name(299, Format::Png), "000299.png");
        assert_eq!(file_name(123_456, Format::Jpeg), "123456.jpg");
    }

    #[test]
    fn formats_parse() {
        assert_eq!("PNG".parse::<Format>(), Ok(Format::Png));
        assert_eq!("jpeg".parse::<Format>(), Ok(Format::Jpeg));
        assert!("tiff".parse::<Format>().is_err());
    }

    #[test]
    fn missing_directory_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("a").join("b");
        prepare_output_dir(&out, false).unwrap();
        assert!(out.is_dir());
    }

    #[test]
    fn non_empty_directory_needs_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("keep.txt"), "x").unwrap();
        let err = prepare_output_dir(dir.path(), false).unwrap_err();
        assert!(err.to_string().contains("already exists"));
        assert!(dir.path().join("keep.txt").exists());

        prepare_output_dir(dir.path(), true).unwrap();
        assert!(dir.path().is_dir());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn sink_writes_named_files() {
        let dir = tempfile::tempdir().unwrap();
        let sink = DirectorySink::new(dir.path(), Format::Png);
        let image = RgbImage::new(8, 4);
        sink.write(7, &image).unwrap();
        let written = image::open(dir.path().join("000007.png")).unwrap();
        assert_eq!(written.to_rgb().dimensions(), (8, 4));
    }
}
