use image::{GrayImage, ImageBuffer, Luma};
use rayon::prelude::*;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Fingerprints with fewer active pixels are background noise: never stored,
/// never matched.
pub const MIN_FINGERPRINT_PIXELS: usize = 10;

/// One captured and cropped region at one point in time.
///
/// Cloning is cheap; the pixel buffer is shared and never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    image: Arc<GrayImage>,
}

impl Frame {
    pub fn new(image: GrayImage) -> Self {
        Self {
            image: Arc::new(image),
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn area(&self) -> u64 {
        self.width() as u64 * self.height() as u64
    }

    pub fn image(&self) -> &GrayImage {
        &self.image
    }

    /// Binarize for OCR: pixels brighter than `threshold` become black text on
    /// a white background.
    pub fn binarize_inverted(&self, threshold: u8) -> GrayImage {
        let (width, height) = self.image.dimensions();
        ImageBuffer::from_fn(width, height, |x, y| {
            if self.image.get_pixel(x, y)[0] > threshold {
                Luma([0u8])
            } else {
                Luma([255u8])
            }
        })
    }
}

/// Set of ink pixel coordinates of a binarized frame.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fingerprint {
    points: BTreeSet<(u32, u32)>,
}

impl Fingerprint {
    /// Extract ink pixels (intensity strictly above `threshold`), rows in
    /// parallel.
    pub fn from_frame(frame: &Frame, threshold: u8) -> Self {
        let image = frame.image();
        let (width, height) = image.dimensions();

        let points: BTreeSet<(u32, u32)> = (0..height)
            .into_par_iter()
            .flat_map_iter(|y| {
                (0..width)
                    .filter(move |&x| image.get_pixel(x, y)[0] > threshold)
                    .map(move |x| (x, y))
            })
            .collect();

        Self { points }
    }

    pub fn from_points<I: IntoIterator<Item = (u32, u32)>>(points: I) -> Self {
        Self {
            points: points.into_iter().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Large enough to be persisted or compared
    pub fn is_trustworthy(&self) -> bool {
        self.points.len() >= MIN_FINGERPRINT_PIXELS
    }

    pub fn contains(&self, point: &(u32, u32)) -> bool {
        self.points.contains(point)
    }

    pub fn points(&self) -> impl Iterator<Item = &(u32, u32)> {
        self.points.iter()
    }

    /// Number of points in `self` that are absent from `other`
    pub fn count_missing_from(&self, other: &Fingerprint) -> usize {
        self.points.difference(&other.points).count()
    }

    /// Fraction of the frame covered by ink
    pub fn density(&self, frame: &Frame) -> f64 {
        if frame.area() == 0 {
            return 0.0;
        }
        self.points.len() as f64 / frame.area() as f64
    }
}
