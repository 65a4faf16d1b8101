// Copyright (C) 2026 The vtrs Authors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Theora-in-Matroska frame boundary scanner (`spec.md` §4.7).
//!
//! Grounded on `examples/original_source/VideoTester/video.py`'s
//! `CodedVideo.__parseTheora`. Matroska SimpleBlock-like patterns mark
//! keyframe-bearing blocks; an EBML cluster marker also closes a frame
//! unless it's really the tracks-header `"Video"` naming field.

use crate::model::{FrameList, FrameRecord, FrameType};

const SC7: [u8; 7] = [0xA3, 0x00, 0x00, 0x81, 0x00, 0x00, 0x00];
const SC7_ALT: [u8; 7] = [0xA3, 0x00, 0x00, 0x81, 0x00, 0x00, 0x80];
const SC7_MASK: [u8; 7] = [0xFF, 0x00, 0x00, 0xFF, 0x00, 0x00, 0xFF];
const SC6: [u8; 6] = [0xA3, 0x00, 0x81, 0x00, 0x00, 0x00];
const SC6_MASK: [u8; 6] = [0xFF, 0x00, 0xFF, 0x00, 0x00, 0xFF];
const CLUSTER_MARKER: [u8; 4] = [0x1F, 0x43, 0xB6, 0x75];

fn matches_masked(window: &[u8], pattern: &[u8], mask: &[u8]) -> bool {
    window
        .iter()
        .zip(pattern)
        .zip(mask)
        .all(|((b, p), m)| b & m == *p)
}

/// Scans `data` for Theora-in-Matroska block boundaries.
pub fn parse(data: &[u8]) -> FrameList {
    let mut frames = Vec::new();
    let mut last_start: Option<usize> = None;
    let mut i = 0usize;

    while i + 6 <= data.len() {
        let is7 = i + 7 <= data.len()
            && (matches_masked(&data[i..i + 7], &SC7, &SC7_MASK)
                || matches_masked(&data[i..i + 7], &SC7_ALT, &SC7_MASK));
        let is6 = !is7 && matches_masked(&data[i..i + 6], &SC6, &SC6_MASK);

        if is7 || is6 {
            if let (Some(start), Some(last)) = (last_start, frames.last_mut()) {
                let last: &mut FrameRecord = last;
                last.length = Some((i - start) as u32);
            }
            let advance = if is7 { 7 } else { 6 };
            let type_pos = i + advance;
            last_start = Some(i);
            let kind = match data.get(type_pos) {
                Some(b) if b & 0x40 == 0 => FrameType::I,
                _ => FrameType::P,
            };
            frames.push(FrameRecord { kind, length: None });
            i = type_pos + 1;
            continue;
        }

        if i + 4 <= data.len() && data[i..i + 4] == CLUSTER_MARKER {
            let preceding_is_video = i >= 6 && &data[i - 6..i - 1] == b"Video";
            if !preceding_is_video {
                if let (Some(start), Some(last)) = (last_start, frames.last_mut()) {
                    let last: &mut FrameRecord = last;
                    last.length = Some((i - start) as u32);
                }
                last_start = Some(i);
            }
        }
        i += 1;
    }

    FrameList { frames }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_keyframe_and_interframe_blocks() {
        let mut data = Vec::new();
        data.extend_from_slice(&[0xA3, 0x00, 0x00, 0x81, 0x00, 0x00, 0x00]); // SC7, type byte next
        data.push(0x00); // I
        data.push(0xAA);
        data.extend_from_slice(&[0xA3, 0x00, 0x00, 0x81, 0x00, 0x00, 0x00]);
        data.push(0x40); // P
        let frames = parse(&data);
        assert_eq!(frames.frames.len(), 2);
        assert_eq!(frames.frames[0].kind, FrameType::I);
        assert_eq!(frames.frames[1].kind, FrameType::P);
    }

    #[test]
    fn cluster_marker_after_video_label_is_ignored() {
        let mut data = b"Video".to_vec();
        data.push(0x00);
        data.extend_from_slice(&CLUSTER_MARKER);
        let frames = parse(&data);
        assert!(frames.frames.is_empty());
    }
}
