// Copyright (C) 2026 The vtrs Authors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! MPEG-4 Visual VOP start-code scanner (`spec.md` §4.7).
//!
//! Grounded on `examples/original_source/VideoTester/video.py`'s
//! `CodedVideo.__parseMPEG4`.

use crate::model::{FrameList, FrameRecord, FrameType};

const START_CODE: [u8; 4] = [0x00, 0x00, 0x01, 0xB6];

/// Scans `data` for VOP start codes (`00 00 01 B6`), classifying I/P/B/S
/// from the top two bits of the byte at `start+4`.
pub fn parse(data: &[u8]) -> FrameList {
    let mut frames = Vec::new();
    let mut last_start: Option<usize> = None;
    let mut i = 0usize;

    while i + 4 < data.len() {
        if data[i..i + 4] == START_CODE {
            if let (Some(start), Some(last)) = (last_start, frames.last_mut()) {
                let last: &mut FrameRecord = last;
                last.length = Some((i - start) as u32);
            }
            last_start = Some(i);
            let kind = match data[i + 4] & 0xC0 {
                0x00 => FrameType::I,
                0x40 => FrameType::P,
                0x80 => FrameType::B,
                _ => FrameType::S,
            };
            frames.push(FrameRecord { kind, length: None });
            i += 4;
            continue;
        }
        i += 1;
    }

    FrameList { frames }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_all_four_types() {
        let mut data = Vec::new();
        for (top_bits, _) in [(0x00u8, FrameType::I), (0x40, FrameType::P), (0x80, FrameType::B), (0xC0, FrameType::S)] {
            data.extend_from_slice(&START_CODE);
            data.push(top_bits);
            data.push(0x00);
        }
        let frames = parse(&data);
        let kinds: Vec<FrameType> = frames.types().collect();
        assert_eq!(kinds, vec![FrameType::I, FrameType::P, FrameType::B, FrameType::S]);
    }
}
