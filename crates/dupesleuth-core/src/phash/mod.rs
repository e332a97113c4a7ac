/// DCT-based 64-bit perceptual image hash.
///
/// 1. Nearest-neighbour resample the 8-bit grayscale image to 32×32.
/// 2. 2-D DCT-II over the grid.
/// 3. Take the top-left 8×8 coefficients without DC (63 values) plus the
///    coefficient at row 0, column 8 — 64 low-frequency values.
/// 4. Bit `i` is set when coefficient `i` exceeds the median of the 64.
///
/// Low frequencies survive re-encoding, mild resizing, and compression
/// artefacts, so visually identical images land a few bits apart while
/// unrelated images sit around 32 bits apart.
///
/// Hamming distance guide: 0–4 near identical, 5–10 similar, >10 different.
pub mod dct;

use crate::error::PhashError;
use dct::{Grid, N};
use std::path::Path;

/// Default hamming-distance threshold for "same picture".
pub const DEFAULT_SIMILARITY_THRESHOLD: u32 = 8;

/// Side of the low-frequency block.
const BLOCK: usize = 8;

/// Hash an 8-bit grayscale image stored row-major, `width * height` bytes.
pub fn phash_image(pixels: &[u8], width: u32, height: u32) -> Result<u64, PhashError> {
    if pixels.is_empty() {
        return Err(PhashError::EmptyBuffer);
    }
    if width == 0 || height == 0 {
        return Err(PhashError::InvalidDimensions { width, height });
    }
    let (w, h) = (width as usize, height as usize);
    let expected = w
        .checked_mul(h)
        .ok_or(PhashError::InvalidDimensions { width, height })?;
    if pixels.len() < expected {
        return Err(PhashError::BufferTooSmall {
            expected,
            actual: pixels.len(),
        });
    }

    let grid = resample(pixels, w, h);
    let freq = dct::dct_2d(&grid);
    Ok(hash_coefficients(&low_frequencies(&freq)))
}

/// Decode an encoded image (PNG, JPEG, ...) from memory and hash it.
pub fn phash_encoded(bytes: &[u8]) -> Result<u64, PhashError> {
    let luma = image::load_from_memory(bytes)?.into_luma8();
    phash_image(luma.as_raw(), luma.width(), luma.height())
}

/// Open, decode, and hash an image file.
pub fn phash_file(path: &Path) -> Result<u64, PhashError> {
    let luma = image::open(path)?.into_luma8();
    phash_image(luma.as_raw(), luma.width(), luma.height())
}

/// Number of differing bits.
#[inline]
pub fn hamming_distance(a: u64, b: u64) -> u32 {
    (a ^ b).count_ones()
}

/// `true` when the hashes are at most `threshold` bits apart.
#[inline]
pub fn is_similar(a: u64, b: u64, threshold: u32) -> bool {
    hamming_distance(a, b) <= threshold
}

fn resample(pixels: &[u8], width: usize, height: usize) -> Grid {
    let mut grid = [[0.0; N]; N];
    for (y, row) in grid.iter_mut().enumerate() {
        let src_row = (y * height / N) * width;
        for (x, cell) in row.iter_mut().enumerate() {
            *cell = f64::from(pixels[src_row + x * width / N]);
        }
    }
    grid
}

fn low_frequencies(freq: &Grid) -> [f64; 64] {
    let mut coeffs = [0.0; 64];
    let mut i = 0;
    for (u, row) in freq.iter().take(BLOCK).enumerate() {
        for (v, &c) in row.iter().take(BLOCK).enumerate() {
            if u == 0 && v == 0 {
                continue;
            }
            coeffs[i] = c;
            i += 1;
        }
    }
    coeffs[i] = freq[0][BLOCK];
    coeffs
}

fn hash_coefficients(coeffs: &[f64; 64]) -> u64 {
    let mut sorted = *coeffs;
    sorted.sort_by(f64::total_cmp);
    let median = (sorted[31] + sorted[32]) / 2.0;

    coeffs
        .iter()
        .enumerate()
        .filter(|&(_, &c)| c > median)
        .fold(0u64, |hash, (i, _)| hash | (1u64 << i))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Smooth synthetic scene: a gradient plus gaussian blobs, rendered at
    /// any resolution from the same continuous description.
    fn scene(width: u32, height: u32) -> Vec<u8> {
        const BLOBS: [(f64, f64, f64, f64); 5] = [
            (0.3, 0.35, 0.12, 90.0),
            (0.7, 0.6, 0.18, -70.0),
            (0.5, 0.8, 0.1, 60.0),
            (0.2, 0.75, 0.08, -50.0),
            (0.8, 0.2, 0.15, 40.0),
        ];
        let mut out = Vec::with_capacity((width * height) as usize);
        for y in 0..height {
            for x in 0..width {
                let u = (x as f64 + 0.5) / width as f64;
                let v = (y as f64 + 0.5) / height as f64;
                let mut value = 100.0 + 60.0 * u - 30.0 * v;
                for (bx, by, s, a) in BLOBS {
                    value += a * (-((u - bx).powi(2) + (v - by).powi(2)) / (2.0 * s * s)).exp();
                }
                out.push(value.round().clamp(0.0, 255.0) as u8);
            }
        }
        out
    }

    fn noise(len: usize, state: &mut u64) -> Vec<u8> {
        (0..len)
            .map(|_| {
                *state ^= *state << 13;
                *state ^= *state >> 7;
                *state ^= *state << 17;
                *state as u8
            })
            .collect()
    }

    #[test]
    fn rejects_invalid_input() {
        assert!(matches!(phash_image(&[], 4, 4), Err(PhashError::EmptyBuffer)));
        assert!(matches!(
            phash_image(&[0; 16], 0, 4),
            Err(PhashError::InvalidDimensions { .. })
        ));
        assert!(matches!(
            phash_image(&[0; 15], 4, 4),
            Err(PhashError::BufferTooSmall { expected: 16, actual: 15 })
        ));
    }

    #[test]
    fn identical_images_hash_identically() {
        let img = scene(128, 96);
        let a = phash_image(&img, 128, 96).unwrap();
        let b = phash_image(&img, 128, 96).unwrap();
        assert_eq!(a, b);
        assert!(is_similar(a, b, 0));
    }

    #[test]
    fn tiny_images_are_upsampled() {
        let img = scene(5, 3);
        assert!(phash_image(&img, 5, 3).is_ok());
    }

    #[test]
    fn rescaled_image_stays_close() {
        let base = phash_image(&scene(256, 256), 256, 256).unwrap();
        for size in [232u32, 240, 248, 264, 272, 280] {
            let scaled = phash_image(&scene(size, size), size, size).unwrap();
            let d = hamming_distance(base, scaled);
            assert!(d <= 10, "{size}px rescale drifted {d} bits");
        }
    }

    #[test]
    fn unrelated_noise_is_about_half_the_bits_away() {
        let base = phash_image(&scene(256, 256), 256, 256).unwrap();
        let mut state = 0x1234_5678u64;
        let trials = 8;
        let total: u32 = (0..trials)
            .map(|_| {
                let img = noise(256 * 256, &mut state);
                hamming_distance(base, phash_image(&img, 256, 256).unwrap())
            })
            .sum();
        let mean = total as f64 / trials as f64;
        assert!((24.0..=40.0).contains(&mean), "mean distance {mean}");
    }

    #[test]
    fn hamming_counts_bits() {
        assert_eq!(hamming_distance(0, 0), 0);
        assert_eq!(hamming_distance(0b1011, 0b0001), 2);
        assert_eq!(hamming_distance(u64::MAX, 0), 64);
        assert!(!is_similar(u64::MAX, 0, 63));
    }

    #[test]
    fn encoded_png_matches_raw_pixels() {
        let (w, h) = (64u32, 48u32);
        let pixels = scene(w, h);
        let img = image::GrayImage::from_raw(w, h, pixels.clone()).unwrap();
        let mut png = Vec::new();
        img.write_to(&mut std::io::Cursor::new(&mut png), image::ImageFormat::Png)
            .unwrap();
        assert_eq!(
            phash_encoded(&png).unwrap(),
            phash_image(&pixels, w, h).unwrap()
        );
    }
}
