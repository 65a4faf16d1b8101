// Copyright (C) 2026 The vtrs Authors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Video quality metric engine (`spec.md` §4.10, C10).
//!
//! Grounded on `examples/original_source/VideoTester/measures/vq.py`'s
//! `PSNR`/`SSIM`/`G1070`/`PSNRtoMOS`/`MIV`. `SSIM`'s OpenCV `cv.Smooth`
//! Gaussian blur is reimplemented as a plain separable convolution
//! (`once_cell::sync::Lazy` for the fixed 11x11 kernel) rather than pulling
//! in an image-processing dependency the rest of the crate has no other
//! use for.

use once_cell::sync::Lazy;

use crate::error::{Error, Result};
use crate::model::{MeasurePayload, MeasureResult, YuvFrame};

const SSIM_WINDOW: usize = 11;
const SSIM_SIGMA: f64 = 1.5;
const SSIM_C1: f64 = 6.5025;
const SSIM_C2: f64 = 58.5225;

static GAUSSIAN_KERNEL: Lazy<[f64; SSIM_WINDOW]> = Lazy::new(|| {
    let mut kernel = [0.0; SSIM_WINDOW];
    let center = (SSIM_WINDOW / 2) as f64;
    let mut sum = 0.0;
    for (i, k) in kernel.iter_mut().enumerate() {
        let x = i as f64 - center;
        *k = (-x * x / (2.0 * SSIM_SIGMA * SSIM_SIGMA)).exp();
        sum += *k;
    }
    for k in kernel.iter_mut() {
        *k /= sum;
    }
    kernel
});

/// PSNR (Y plane only) per frame, over `N = min(received, reference)` frames.
pub fn psnr(received: &[YuvFrame], reference: &[YuvFrame]) -> MeasureResult {
    let n = received.len().min(reference.len());
    let x: Vec<f64> = (0..n).map(|i| i as f64).collect();
    let y: Vec<f64> = (0..n)
        .map(|i| {
            let count = (received[i].width * received[i].height) as f64;
            let mse: f64 = received[i]
                .y
                .iter()
                .zip(reference[i].y.iter())
                .map(|(&a, &b)| {
                    let d = a as f64 - b as f64;
                    d * d
                })
                .sum::<f64>()
                / count;
            if mse == 0.0 {
                100.0
            } else {
                20.0 * (255.0 / mse.sqrt()).log10()
            }
        })
        .collect();
    MeasureResult::plot("PSNR", ("frame", "dB"), x, y)
}

fn clamped_convolve(plane: &[f64], width: usize, height: usize, horizontal: bool) -> Vec<f64> {
    let half = SSIM_WINDOW as isize / 2;
    let mut out = vec![0.0; width * height];
    for row in 0..height {
        for col in 0..width {
            let mut acc = 0.0;
            for (k, weight) in GAUSSIAN_KERNEL.iter().enumerate() {
                let offset = k as isize - half;
                let (r, c) = if horizontal {
                    (row, (col as isize + offset).clamp(0, width as isize - 1) as usize)
                } else {
                    ((row as isize + offset).clamp(0, height as isize - 1) as usize, col)
                };
                acc += plane[r * width + c] * weight;
            }
            out[row * width + col] = acc;
        }
    }
    out
}

fn gaussian_blur(plane: &[f64], width: usize, height: usize) -> Vec<f64> {
    let horizontal = clamped_convolve(plane, width, height, true);
    clamped_convolve(&horizontal, width, height, false)
}

/// One frame's global-mean SSIM index over the Y plane (Wang et al.).
fn ssim_frame(a: &YuvFrame, b: &YuvFrame) -> f64 {
    let (w, h) = (a.width as usize, a.height as usize);
    let img1: Vec<f64> = a.y.iter().map(|&v| v as f64).collect();
    let img2: Vec<f64> = b.y.iter().map(|&v| v as f64).collect();
    let img1_sq: Vec<f64> = img1.iter().map(|v| v * v).collect();
    let img2_sq: Vec<f64> = img2.iter().map(|v| v * v).collect();
    let img1_img2: Vec<f64> = img1.iter().zip(&img2).map(|(a, b)| a * b).collect();

    let mu1 = gaussian_blur(&img1, w, h);
    let mu2 = gaussian_blur(&img2, w, h);
    let sigma1_sq_raw = gaussian_blur(&img1_sq, w, h);
    let sigma2_sq_raw = gaussian_blur(&img2_sq, w, h);
    let sigma12_raw = gaussian_blur(&img1_img2, w, h);

    let n = w * h;
    let total: f64 = (0..n)
        .map(|i| {
            let mu1_sq = mu1[i] * mu1[i];
            let mu2_sq = mu2[i] * mu2[i];
            let mu1_mu2 = mu1[i] * mu2[i];
            let sigma1_sq = sigma1_sq_raw[i] - mu1_sq;
            let sigma2_sq = sigma2_sq_raw[i] - mu2_sq;
            let sigma12 = sigma12_raw[i] - mu1_mu2;
            let numerator = (2.0 * mu1_mu2 + SSIM_C1) * (2.0 * sigma12 + SSIM_C2);
            let denominator = (mu1_sq + mu2_sq + SSIM_C1) * (sigma1_sq + sigma2_sq + SSIM_C2);
            numerator / denominator
        })
        .sum();
    total / n as f64
}

pub fn ssim(received: &[YuvFrame], reference: &[YuvFrame]) -> MeasureResult {
    let n = received.len().min(reference.len());
    let x: Vec<f64> = (0..n).map(|i| i as f64).collect();
    let y: Vec<f64> = (0..n).map(|i| ssim_frame(&received[i], &reference[i])).collect();
    MeasureResult::plot("SSIM", ("frame", "SSIM index"), x, y)
}

/// Frozen ITU-T G.1070 parameter vector, 1-indexed (`v[0]` is an unused
/// placeholder), verbatim from `spec.md` §4.10.
const G1070_V: [f64; 13] = [
    0.0, 1.431, 0.02228, 3.759, 184.1, 1.161, 1.446, 3.881e-4, 2.116, 467.4, 2.736, 15.28, 4.170,
];

/// ITU-T G.1070 video-quality opinion score from bitrate (kbps), framerate
/// (fps), and packet loss rate (fraction, not percent).
pub fn g1070(bitrate_kbps: f64, framerate_fps: f64, packet_loss_rate: f64) -> MeasureResult {
    let v = G1070_V;
    let dfrv = v[1] + v[7] * bitrate_kbps;
    let iofr = v[3] - v[3] / (1.0 + (bitrate_kbps / v[4]).powf(v[5]));
    let ofr = v[1] + v[2] * bitrate_kbps;
    let ic = iofr
        * (-(framerate_fps.ln() - ofr.ln()).powi(2) / (2.0 * dfrv * dfrv)).exp();
    let dpplv =
        v[10] + v[11] * (-framerate_fps / v[8]).exp() + v[12] * (-bitrate_kbps / v[9]).exp();
    let mos = 1.0 + ic * (-packet_loss_rate * 100.0 / dpplv).exp();
    MeasureResult::scalar("G.1070", "MOS", mos)
}

fn psnr_to_mos_value(psnr_db: f64) -> f64 {
    if psnr_db < 20.0 {
        1.0
    } else if psnr_db < 25.0 {
        2.0
    } else if psnr_db < 31.0 {
        3.0
    } else if psnr_db < 37.0 {
        4.0
    } else {
        5.0
    }
}

fn extract_plot(result: &MeasureResult) -> Result<(&[f64], &[f64])> {
    match &result.payload {
        MeasurePayload::Plot { x, y, .. } => Ok((x, y)),
        _ => Err(Error::Pipeline(
            "PSNRtoMOS/MIV require a plot-shaped input".into(),
        )),
    }
}

/// Maps a PSNR plot to an integer-MOS plot, piecewise per `spec.md` §4.10.
pub fn psnr_to_mos(psnr: &MeasureResult) -> Result<MeasureResult> {
    let (x, y) = extract_plot(psnr)?;
    let mos: Vec<f64> = y.iter().map(|&v| psnr_to_mos_value(v)).collect();
    Ok(MeasureResult::plot("PSNRtoMOS", ("frame", "MOS"), x.to_vec(), mos))
}

const MIV_WINDOW: usize = 25;

/// Percentage of frames, per 25-frame sliding window, where the received
/// stream's MOS is both worse than the coded reference's and below 4.
pub fn miv(received_mos: &MeasureResult, coded_mos: &MeasureResult) -> Result<MeasureResult> {
    let (_, recv) = extract_plot(received_mos)?;
    let (_, coded) = extract_plot(coded_mos)?;
    let n = recv.len().min(coded.len());

    let mut y = Vec::new();
    if n > MIV_WINDOW {
        for start in 0..(n - MIV_WINDOW) {
            let count = (start..start + MIV_WINDOW)
                .filter(|&j| recv[j] < coded[j] && recv[j] < 4.0)
                .count();
            y.push(100.0 * count as f64 / MIV_WINDOW as f64);
        }
    }
    let x: Vec<f64> = (0..y.len()).map(|i| i as f64).collect();
    Ok(MeasureResult::plot(
        "MIV",
        ("frame", "% of frames with a MOS worse than the reference"),
        x,
        y,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat_frame(width: u32, height: u32, value: u8) -> YuvFrame {
        let len = (width * height) as usize;
        YuvFrame {
            width,
            height,
            y: vec![value; len],
            u: vec![128; len / 4],
            v: vec![128; len / 4],
        }
    }

    #[test]
    fn identical_frames_give_perfect_psnr() {
        let a = vec![flat_frame(4, 4, 100)];
        let b = vec![flat_frame(4, 4, 100)];
        let result = psnr(&a, &b);
        match result.payload {
            MeasurePayload::Plot { y, .. } => assert_eq!(y[0], 100.0),
            _ => panic!("expected plot"),
        }
    }

    #[test]
    fn identical_frames_give_ssim_of_one() {
        let a = vec![flat_frame(16, 16, 120)];
        let b = vec![flat_frame(16, 16, 120)];
        let result = ssim(&a, &b);
        match result.payload {
            MeasurePayload::Plot { y, .. } => assert!((y[0] - 1.0).abs() < 1e-6),
            _ => panic!("expected plot"),
        }
    }

    #[test]
    fn psnr_to_mos_uses_piecewise_boundaries() {
        assert_eq!(psnr_to_mos_value(19.9), 1.0);
        assert_eq!(psnr_to_mos_value(20.0), 2.0);
        assert_eq!(psnr_to_mos_value(30.9), 3.0);
        assert_eq!(psnr_to_mos_value(37.0), 5.0);
    }

    #[test]
    fn g1070_mos_is_bounded_for_reasonable_inputs() {
        let result = g1070(512.0, 25.0, 0.01);
        match result.payload {
            MeasurePayload::Scalar { value } => assert!((1.0..=5.0).contains(&value)),
            _ => panic!("expected scalar"),
        }
    }
}
