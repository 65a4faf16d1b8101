// Copyright (C) 2026 The vtrs Authors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bit-stream metric engine (`spec.md` §4.9, C9).
//!
//! Grounded on `examples/original_source/VideoTester/measures/bs.py`'s
//! `StreamEye`/`RefStreamEye`/`GOP`/`IFrameLossRate`.

use crate::model::{FrameList, FrameRecord, FrameType, MeasureResult};

/// Per-frame `I`/`P`/`B` byte-length arrays, one non-zero entry per frame
/// (`spec.md`'s StreamEye/RefStreamEye). `SI`/`SP`/`S` frames contribute no
/// entry to any array, matching the original's I/P/B-only classification.
fn stream_eye(name: &str, frames: &FrameList) -> MeasureResult {
    let closed: Vec<&FrameRecord> = frames.frames.iter().filter(|f| f.length.is_some()).collect();
    let n = closed.len();
    let x: Vec<f64> = (0..n).map(|i| i as f64).collect();
    let mut i_arr = vec![0.0; n];
    let mut p_arr = vec![0.0; n];
    let mut b_arr = vec![0.0; n];
    for (idx, f) in closed.iter().enumerate() {
        let len = f.length.unwrap() as f64;
        match f.kind {
            FrameType::I => i_arr[idx] = len,
            FrameType::P => p_arr[idx] = len,
            FrameType::B => b_arr[idx] = len,
            FrameType::SI | FrameType::SP | FrameType::S => {}
        }
    }
    MeasureResult::video_frames(name, ("frame", "bytes"), x, i_arr, p_arr, b_arr)
}

pub fn stream_eye_received(frames: &FrameList) -> MeasureResult {
    stream_eye("StreamEye", frames)
}

pub fn stream_eye_reference(frames: &FrameList) -> MeasureResult {
    stream_eye("RefStreamEye", frames)
}

/// Splits a frame-type sequence into per-GOP frame counts; an `I` frame
/// starts a new GOP.
fn gop_lengths(types: &[FrameType]) -> Vec<f64> {
    let mut lengths = Vec::new();
    let mut current = 0usize;
    let mut started = false;
    for &kind in types {
        if kind == FrameType::I {
            if started {
                lengths.push(current as f64);
            }
            current = 1;
            started = true;
        } else if started {
            current += 1;
        }
    }
    if started {
        lengths.push(current as f64);
    }
    lengths
}

fn mean_std(values: &[f64]) -> (f64, f64) {
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    (mean, variance.sqrt())
}

/// Rounded mean GOP length, trimming outliers outside `[mean - σ/2, mean + σ/2]`.
pub fn gop(types: impl Iterator<Item = FrameType>) -> MeasureResult {
    let types: Vec<FrameType> = types.collect();
    let lengths = gop_lengths(&types);
    if lengths.is_empty() {
        return MeasureResult::scalar("GOP", "frames", 0.0);
    }
    let (mean, std) = mean_std(&lengths);
    let (lo, hi) = (mean - std / 2.0, mean + std / 2.0);
    let survivors: Vec<f64> = lengths.iter().copied().filter(|&l| l >= lo && l <= hi).collect();
    let result = if survivors.is_empty() {
        mean
    } else {
        survivors.iter().sum::<f64>() / survivors.len() as f64
    };
    MeasureResult::scalar("GOP", "frames", result.round())
}

/// Rate of GOPs whose length exceeds `mean + σ`, treated as a missed I frame.
pub fn i_frame_loss_rate(types: impl Iterator<Item = FrameType>) -> MeasureResult {
    let types: Vec<FrameType> = types.collect();
    let i_count = types.iter().filter(|&&t| t == FrameType::I).count();
    let lengths = gop_lengths(&types);
    if lengths.is_empty() || i_count == 0 {
        return MeasureResult::scalar("IFrameLossRate", "ratio", 0.0);
    }
    let (mean, std) = mean_std(&lengths);
    let threshold = mean + std;
    let missed = lengths.iter().filter(|&&l| l > threshold).count();
    let rate = missed as f64 / (i_count + missed) as f64;
    MeasureResult::scalar("IFrameLossRate", "ratio", rate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::MeasurePayload;

    fn rec(kind: FrameType, length: Option<u32>) -> FrameRecord {
        FrameRecord { kind, length }
    }

    #[test]
    fn stream_eye_puts_length_in_the_matching_array_only() {
        let frames = FrameList {
            frames: vec![
                rec(FrameType::I, Some(1000)),
                rec(FrameType::P, Some(200)),
                rec(FrameType::B, Some(50)),
                rec(FrameType::P, None), // open tail frame, excluded
            ],
        };
        let result = stream_eye_received(&frames);
        match result.payload {
            MeasurePayload::VideoFrames { i, p, b, .. } => {
                assert_eq!(i, vec![1000.0, 0.0, 0.0]);
                assert_eq!(p, vec![0.0, 200.0, 0.0]);
                assert_eq!(b, vec![0.0, 0.0, 50.0]);
            }
            _ => panic!("expected VideoFrames payload"),
        }
    }

    #[test]
    fn gop_trims_outlier_group_lengths() {
        let types = vec![
            FrameType::I, FrameType::P, FrameType::P, FrameType::P, // GOP len 4
            FrameType::I, FrameType::P, FrameType::P, FrameType::P, // GOP len 4
            FrameType::I, FrameType::P, FrameType::P, FrameType::P,
            FrameType::P, FrameType::P, FrameType::P, FrameType::P,
            FrameType::P, FrameType::P, FrameType::P, FrameType::P, // GOP len 16, outlier
            FrameType::I,
        ];
        let result = gop(types.into_iter());
        match result.payload {
            MeasurePayload::Scalar { value } => assert_eq!(value, 4.0),
            _ => panic!("expected scalar payload"),
        }
    }

    #[test]
    fn no_i_frames_yields_zero_rate() {
        let types = vec![FrameType::P, FrameType::P];
        let result = i_frame_loss_rate(types.into_iter());
        match result.payload {
            MeasurePayload::Scalar { value } => assert_eq!(value, 0.0),
            _ => panic!("expected scalar payload"),
        }
    }
}
