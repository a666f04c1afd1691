use crate::models::frame::Frame;
use image::imageops::{self, FilterType};

const HASH_SIDE: u32 = 8;

/// Minimum Hamming distance between hashes that counts as a change
const CHANGE_CUTOFF: u32 = 1;

/// 64-bit luminance average hash: downscale to 8x8, one bit per pixel
/// brighter than the mean.
pub fn average_hash(frame: &Frame) -> u64 {
    if frame.area() == 0 {
        return 0;
    }

    let small = imageops::resize(frame.image(), HASH_SIDE, HASH_SIDE, FilterType::Lanczos3);
    let total: u32 = small.pixels().map(|p| p[0] as u32).sum();
    let mean = total as f32 / (HASH_SIDE * HASH_SIDE) as f32;

    small
        .pixels()
        .enumerate()
        .filter(|(_, p)| p[0] as f32 > mean)
        .fold(0u64, |hash, (i, _)| hash | (1 << i))
}

/// Whether `current` differs enough from `previous` to be worth processing.
/// The first observation is always a change.
pub fn changed(previous: Option<&Frame>, current: &Frame) -> bool {
    match previous {
        None => true,
        Some(previous) => {
            let distance = (average_hash(previous) ^ average_hash(current)).count_ones();
            distance >= CHANGE_CUTOFF
        }
    }
}
