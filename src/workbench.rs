//! Before/after state behind a browsing and display surface.
//!
//! A surface lists a folder, picks an image, shows the original next to the
//! colorized version, and saves the result. Every selection colorizes
//! synchronously and replaces both images together.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::image::{self, BgrImage};
use crate::pipeline::Pipeline;

/// The image currently on display.
#[derive(Debug, Clone)]
pub struct Selection {
    /// File the image came from, if it was not supplied as bytes.
    pub source: Option<PathBuf>,
    pub original: BgrImage,
    pub colorized: BgrImage,
}

/// PNG-encoded before/after pair for rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preview {
    pub original_png: Vec<u8>,
    pub colorized_png: Vec<u8>,
}

/// Folder listing plus the current selection.
pub struct Workbench {
    pipeline: Pipeline,
    entries: Vec<PathBuf>,
    current: Option<Selection>,
}

impl Workbench {
    #[must_use]
    pub fn new(pipeline: Pipeline) -> Self {
        Self {
            pipeline,
            entries: Vec::new(),
            current: None,
        }
    }

    /// List the images in `folder`.
    ///
    /// On failure the previous listing is kept.
    ///
    /// # Errors
    ///
    /// Returns an error if the folder cannot be read.
    pub fn open_folder<P: AsRef<Path>>(&mut self, folder: P) -> Result<&[PathBuf]> {
        let folder = folder.as_ref();
        let entries = image::list_images(folder)?;
        tracing::info!("{} images in {}", entries.len(), folder.display());

        self.entries = entries;
        Ok(&self.entries)
    }

    /// Images in the open folder.
    #[must_use]
    pub fn entries(&self) -> &[PathBuf] {
        &self.entries
    }

    /// Select the `index`-th image of the open folder.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameter`] if `index` is out of range, or any
    /// error from [`Workbench::select_file`].
    pub fn select_entry(&mut self, index: usize) -> Result<&Selection> {
        let path = self
            .entries
            .get(index)
            .cloned()
            .ok_or_else(|| Error::InvalidParameter {
                name: "index".to_string(),
                reason: format!("{index} is past the {} listed images", self.entries.len()),
            })?;
        self.select_file(path)
    }

    /// Decode and colorize a file, replacing both displayed images.
    ///
    /// The previous selection is cleared first, so a failure leaves nothing
    /// on display rather than a mismatched pair.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidImage`] if the file cannot be decoded.
    pub fn select_file<P: AsRef<Path>>(&mut self, path: P) -> Result<&Selection> {
        let path = path.as_ref();
        self.current = None;

        let (original, colorized) = self.pipeline.colorize_file(path)?;
        Ok(&*self.current.insert(Selection {
            source: Some(path.to_path_buf()),
            original,
            colorized,
        }))
    }

    /// Decode and colorize raw encoded bytes, replacing both displayed images.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidImage`] if the bytes cannot be decoded.
    pub fn select_bytes(&mut self, bytes: &[u8]) -> Result<&Selection> {
        self.current = None;

        let (original, colorized) = self.pipeline.colorize_bytes(bytes)?;
        Ok(&*self.current.insert(Selection {
            source: None,
            original,
            colorized,
        }))
    }

    /// The image currently on display.
    #[must_use]
    pub fn current(&self) -> Option<&Selection> {
        self.current.as_ref()
    }

    /// Encode the current pair for display.
    ///
    /// # Errors
    ///
    /// Returns an error if PNG encoding fails.
    pub fn preview(&self) -> Result<Option<Preview>> {
        self.current
            .as_ref()
            .map(|selection| {
                Ok(Preview {
                    original_png: image::encode_png(&selection.original)?,
                    colorized_png: image::encode_png(&selection.colorized)?,
                })
            })
            .transpose()
    }

    /// Save the colorized image to `path`.
    ///
    /// Returns `Ok(false)` without touching the filesystem when nothing has
    /// been colorized yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the image cannot be written.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<bool> {
        let Some(selection) = &self.current else {
            tracing::warn!("Nothing colorized yet; not saving");
            return Ok(false);
        };

        let path = path.as_ref();
        image::save_image(
            &selection.colorized,
            path,
            self.pipeline.config().output_quality,
        )?;
        tracing::info!("Saved colorized image to {}", path.display());
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{ChromaPredictor, Config};
    use ndarray::{Array3, Array4};
    use std::fs;
    use std::sync::Arc;

    struct Neutral;

    impl ChromaPredictor for Neutral {
        fn predict_ab(&self, _luminance: &Array4<f32>) -> Result<Array4<f32>> {
            Ok(Array4::zeros((1, 2, 56, 56)))
        }
    }

    fn workbench() -> Workbench {
        Workbench::new(Pipeline::with_predictor(Config::default(), Arc::new(Neutral)).unwrap())
    }

    fn write_gray(dir: &Path, name: &str, height: usize, width: usize) -> PathBuf {
        let path = dir.join(name);
        let img = BgrImage::new(Array3::from_elem((height, width, 3), 140)).unwrap();
        image::save_image(&img, &path, 95).unwrap();
        path
    }

    #[test]
    fn test_select_updates_both_images() {
        let dir = tempfile::tempdir().unwrap();
        write_gray(dir.path(), "a.png", 10, 20);
        write_gray(dir.path(), "b.bmp", 30, 5);
        fs::write(dir.path().join("readme.txt"), b"").unwrap();

        let mut bench = workbench();
        assert_eq!(bench.open_folder(dir.path()).unwrap().len(), 2);
        assert!(bench.entries()[0].ends_with("a.png"));

        let first = bench.select_entry(0).unwrap();
        assert_eq!((first.original.height(), first.original.width()), (10, 20));
        assert_eq!((first.colorized.height(), first.colorized.width()), (10, 20));

        let second = bench.select_entry(1).unwrap();
        assert_eq!((second.original.height(), second.original.width()), (30, 5));
        assert_eq!((second.colorized.height(), second.colorized.width()), (30, 5));
        assert!(second.source.as_ref().unwrap().ends_with("b.bmp"));
    }

    #[test]
    fn test_failed_selection_clears_display() {
        let dir = tempfile::tempdir().unwrap();
        let good = write_gray(dir.path(), "good.png", 8, 8);
        let bad = dir.path().join("broken.png");
        fs::write(&bad, b"garbage").unwrap();

        let mut bench = workbench();
        bench.select_file(&good).unwrap();
        assert!(matches!(
            bench.select_file(&bad),
            Err(Error::InvalidImage { .. })
        ));
        assert!(bench.current().is_none());
        assert!(bench.preview().unwrap().is_none());
    }

    #[test]
    fn test_select_entry_out_of_range() {
        let mut bench = workbench();
        assert!(matches!(
            bench.select_entry(0),
            Err(Error::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_preview_and_save_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let mut bench = workbench();

        let bytes = image::encode_png(&BgrImage::new(Array3::from_elem((6, 7, 3), 90)).unwrap()).unwrap();
        bench.select_bytes(&bytes).unwrap();

        let preview = bench.preview().unwrap().unwrap();
        let shown = image::decode_image(&preview.colorized_png).unwrap();
        assert_eq!(&shown, &bench.current().unwrap().colorized);

        let out = dir.path().join("saved.png");
        assert!(bench.save(&out).unwrap());
        assert_eq!(image::load_image(&out).unwrap(), shown);
    }

    #[test]
    fn test_save_without_selection_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("nothing.png");

        assert!(!workbench().save(&out).unwrap());
        assert!(!out.exists());
    }
}
