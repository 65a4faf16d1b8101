// Copyright (C) 2026 The vtrs Authors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Data model shared by every dissector and metric engine.
//!
//! These types are produced once (by C3–C7) and read many times (by
//! C8–C10); none are mutated in place after construction.

use serde::{Deserialize, Serialize};

/// Parameters recovered from the RTSP/SDP exchange, used to steer
/// dissection. Created by [`crate::rtsp::discover`]; read-only thereafter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionCaps {
    /// Server-side RTSP TCP port.
    pub rtsp_sport: u16,
    /// Client-side RTSP TCP port, discovered from the SDP answer's
    /// destination port.
    pub rtsp_dport: u16,
    /// Opaque SDP session id used to locate the SDP answer in the capture.
    pub sdp_session_id: Vec<u8>,
    /// RTP destination UDP port, present only for RTP-over-UDP sessions.
    pub udp_dport: Option<u16>,
    /// 7-bit RTP payload type.
    pub payload_type: u8,
    /// RTP clock rate in Hz.
    pub clock_rate: u32,
    /// Initial RTP sequence number.
    pub seq_base: u32,
    pub video_width: u32,
    pub video_height: u32,
    pub pixel_format: PixelFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    I420,
}

impl std::fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PixelFormat::I420 => write!(f, "I420"),
        }
    }
}

/// One observed RTP packet after dissection.
///
/// Invariant: in any list produced by the dissectors, `seq` is monotonically
/// non-decreasing and no two records share a `seq`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PacketRecord {
    /// Payload-layer byte count (captured length minus the data-link
    /// header only — see `spec.md` §4.4).
    pub length: u32,
    /// Arrival time in seconds, monotonic floating point.
    pub arrival_time: f64,
    /// Extended (unwrapped) RTP sequence number.
    pub seq: u64,
    /// Raw 32-bit RTP timestamp.
    pub rtp_ts: u32,
}

/// A `(request_ts, response_ts)` pair of PCAP timestamps for one RTSP
/// request/response transaction, used to estimate latency.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RttSample {
    pub request_ts: f64,
    pub response_ts: f64,
}

/// Frame type recovered by a compressed-bitstream scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FrameType {
    I,
    P,
    B,
    SI,
    SP,
    S,
}

impl std::fmt::Display for FrameType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            FrameType::I => "I",
            FrameType::P => "P",
            FrameType::B => "B",
            FrameType::SI => "SI",
            FrameType::SP => "SP",
            FrameType::S => "S",
        };
        write!(f, "{s}")
    }
}

/// One compressed frame recovered from a bitstream.
///
/// `length` is the byte span from this frame's start code to the next one's,
/// inclusive of the start code; see `spec.md` §9 for why the final frame in
/// a [`FrameRecord`] list never gets a `length`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameRecord {
    pub kind: FrameType,
    pub length: Option<u32>,
}

/// Parsed frame-type/length lists for one compressed file, as produced by
/// [`crate::codec::parse`].
#[derive(Debug, Clone, Default)]
pub struct FrameList {
    pub frames: Vec<FrameRecord>,
}

impl FrameList {
    pub fn types(&self) -> impl Iterator<Item = FrameType> + '_ {
        self.frames.iter().map(|f| f.kind)
    }

    pub fn lengths(&self) -> impl Iterator<Item = u32> + '_ {
        self.frames.iter().filter_map(|f| f.length)
    }
}

/// Three planar byte buffers for one I420 frame: Y (W×H), U and V (W/2×H/2).
#[derive(Debug, Clone)]
pub struct YuvFrame {
    pub width: u32,
    pub height: u32,
    pub y: Vec<u8>,
    pub u: Vec<u8>,
    pub v: Vec<u8>,
}

impl YuvFrame {
    /// Returns the Y-plane sample at `(row, col)`.
    #[inline]
    pub fn y_at(&self, row: u32, col: u32) -> u8 {
        self.y[(row * self.width + col) as usize]
    }
}

/// The kind-dependent payload of a [`MeasureResult`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MeasurePayload {
    Scalar { value: f64 },
    Plot {
        x: Vec<f64>,
        y: Vec<f64>,
        min: (f64, f64),
        max: (f64, f64),
        mean: f64,
    },
    Bar {
        x: Vec<f64>,
        y: Vec<f64>,
        min: (f64, f64),
        max: (f64, f64),
        mean: f64,
        width: f64,
    },
    VideoFrames {
        x: Vec<f64>,
        i: Vec<f64>,
        p: Vec<f64>,
        b: Vec<f64>,
    },
}

/// Units for a measure: a single string for scalars, an (x, y) pair for the
/// rest.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Units {
    Single(String),
    Pair(String, String),
}

/// Uniform output of every metric (`spec.md` §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeasureResult {
    pub name: String,
    pub units: Units,
    pub payload: MeasurePayload,
}

fn argmax(x: &[f64], y: &[f64]) -> (f64, f64) {
    let i = y
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())
        .map(|(i, _)| i)
        .unwrap_or(0);
    (x[i], y[i])
}

fn argmin(x: &[f64], y: &[f64]) -> (f64, f64) {
    let i = y
        .iter()
        .enumerate()
        .min_by(|a, b| a.1.partial_cmp(b.1).unwrap())
        .map(|(i, _)| i)
        .unwrap_or(0);
    (x[i], y[i])
}

fn mean(y: &[f64]) -> f64 {
    y.iter().sum::<f64>() / y.len() as f64
}

impl MeasureResult {
    pub fn scalar(name: impl Into<String>, units: impl Into<String>, value: f64) -> Self {
        MeasureResult {
            name: name.into(),
            units: Units::Single(units.into()),
            payload: MeasurePayload::Scalar { value },
        }
    }

    /// Builds a `plot` result, computing `min`/`max`/`mean` the way the
    /// original `Measure.graph()` did.
    pub fn plot(
        name: impl Into<String>,
        units: (impl Into<String>, impl Into<String>),
        x: Vec<f64>,
        y: Vec<f64>,
    ) -> Self {
        let min = argmin(&x, &y);
        let max = argmax(&x, &y);
        let mean = mean(&y);
        MeasureResult {
            name: name.into(),
            units: Units::Pair(units.0.into(), units.1.into()),
            payload: MeasurePayload::Plot { x, y, min, max, mean },
        }
    }

    pub fn bar(
        name: impl Into<String>,
        units: (impl Into<String>, impl Into<String>),
        x: Vec<f64>,
        y: Vec<f64>,
        width: f64,
    ) -> Self {
        let min = argmin(&x, &y);
        let max = argmax(&x, &y);
        let mean = mean(&y);
        MeasureResult {
            name: name.into(),
            units: Units::Pair(units.0.into(), units.1.into()),
            payload: MeasurePayload::Bar { x, y, min, max, mean, width },
        }
    }

    pub fn video_frames(
        name: impl Into<String>,
        units: (impl Into<String>, impl Into<String>),
        x: Vec<f64>,
        i: Vec<f64>,
        p: Vec<f64>,
        b: Vec<f64>,
    ) -> Self {
        MeasureResult {
            name: name.into(),
            units: Units::Pair(units.0.into(), units.1.into()),
            payload: MeasurePayload::VideoFrames { x, i, p, b },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn measure_result_round_trips() {
        let r = MeasureResult::plot(
            "Delta",
            ("RTP packet", "ms"),
            vec![0.0, 1.0, 2.0],
            vec![0.0, 40.0, 40.0],
        );
        let json = serde_json::to_string(&r).unwrap();
        let back: MeasureResult = serde_json::from_str(&json).unwrap();
        assert_eq!(back.name, r.name);
        match (back.payload, r.payload) {
            (MeasurePayload::Plot { y: y1, .. }, MeasurePayload::Plot { y: y2, .. }) => {
                assert_eq!(y1, y2)
            }
            _ => panic!("kind mismatch"),
        }
    }

    #[test]
    fn frame_list_drops_final_length() {
        let list = FrameList {
            frames: vec![
                FrameRecord { kind: FrameType::I, length: Some(100) },
                FrameRecord { kind: FrameType::P, length: Some(50) },
                FrameRecord { kind: FrameType::P, length: None },
            ],
        };
        assert_eq!(list.types().count(), 3);
        assert_eq!(list.lengths().count(), 2);
    }
}
