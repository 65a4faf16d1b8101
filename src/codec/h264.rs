// Copyright (C) 2026 The vtrs Authors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! H.264 Annex-B start-code scanner (`spec.md` §4.7).
//!
//! Grounded on `examples/original_source/VideoTester/video.py`'s
//! `CodedVideo.__parseH264`. The slice-type classification is a greedy
//! first-byte-threshold approximation of Exp-Golomb decoding, not a real
//! decode — an accepted inaccuracy carried over unchanged from the
//! original (`spec.md` §9).

use once_cell::sync::Lazy;

use crate::model::{FrameList, FrameRecord, FrameType};

const NAL_TYPE_IDR: u8 = 0x05;
const NAL_TYPE_NON_IDR: u8 = 0x01;
const NAL_TYPE_MASK: u8 = 0x1F;

/// `(first_byte & 0x7F) >= threshold` thresholds to `codeNum`, checked in
/// order (first match wins), then `codeNum` to [`FrameType`].
static CODE_NUM_TABLE: Lazy<Vec<(u8, FrameType)>> = Lazy::new(|| {
    vec![
        (0x40, FrameType::P),
        (0x30, FrameType::I),
        (0x20, FrameType::B),
        (0x1C, FrameType::B),
        (0x18, FrameType::P),
        (0x14, FrameType::SI),
        (0x10, FrameType::SP),
        (0x0A, FrameType::SI),
        (0x09, FrameType::SP),
        (0x08, FrameType::I),
    ]
});

fn classify(byte: u8) -> FrameType {
    let comp = byte & 0x7F;
    CODE_NUM_TABLE
        .iter()
        .find(|(threshold, _)| comp >= *threshold)
        .map(|(_, kind)| *kind)
        .unwrap_or(FrameType::I)
}

/// Scans `data` for Annex-B start codes (`00 00 00 01`), acting only on
/// IDR/non-IDR slice NAL units.
pub fn parse(data: &[u8]) -> FrameList {
    let mut frames = Vec::new();
    let mut last_start: Option<usize> = None;
    let mut i = 0usize;

    while i + 4 < data.len() {
        if data[i] == 0 && data[i + 1] == 0 && data[i + 2] == 0 && data[i + 3] == 1 {
            let nal_pos = i + 4;
            let Some(&nal_byte) = data.get(nal_pos) else {
                break;
            };
            let nal_type = nal_byte & NAL_TYPE_MASK;
            if nal_type == NAL_TYPE_IDR || nal_type == NAL_TYPE_NON_IDR {
                let slice_pos = nal_pos + 1;
                let Some(&slice_byte) = data.get(slice_pos) else {
                    break;
                };
                if let (Some(start), Some(last)) = (last_start, frames.last_mut()) {
                    let last: &mut FrameRecord = last;
                    last.length = Some((i - start) as u32);
                }
                last_start = Some(i);
                frames.push(FrameRecord {
                    kind: classify(slice_byte),
                    length: None,
                });
                i = slice_pos + 1;
                continue;
            }
        }
        i += 1;
    }

    FrameList { frames }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nal(nal_type: u8, slice_header_byte: u8, padding: &[u8]) -> Vec<u8> {
        let mut v = vec![0x00, 0x00, 0x00, 0x01, nal_type, slice_header_byte];
        v.extend_from_slice(padding);
        v
    }

    #[test]
    fn idr_slice_classifies_as_i() {
        let data = nal(0x05, 0x30, &[0xAA, 0xBB]);
        let frames = parse(&data);
        assert_eq!(frames.frames.len(), 1);
        assert_eq!(frames.frames[0].kind, FrameType::I);
    }

    #[test]
    fn non_idr_high_threshold_classifies_as_p() {
        let data = nal(0x01, 0x50, &[0xAA]);
        let frames = parse(&data);
        assert_eq!(frames.frames[0].kind, FrameType::P);
    }

    #[test]
    fn non_slice_nal_types_are_ignored() {
        let data = nal(0x07, 0x00, &[]); // SPS, not a slice
        let frames = parse(&data);
        assert!(frames.frames.is_empty());
    }
}
