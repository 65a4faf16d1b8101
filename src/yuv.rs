// Copyright (C) 2026 The vtrs Authors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Raw I420 YUV iteration (`spec.md` §4.6, C6).
//!
//! Grounded on `examples/original_source/VideoTester/video.py`'s
//! `YUVVideo`: fixed-size frame chunking with no framing of its own, so the
//! frame count is derived from the file length.

use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use crate::error::{Error, Result};
use crate::model::YuvFrame;

/// Iterates fixed-size I420 frames out of a raw YUV file.
pub struct YuvIterator {
    reader: BufReader<File>,
    width: u32,
    height: u32,
    yblock: usize,
    uvblock: usize,
    chunk: usize,
    /// Number of whole frames the file contains, computed once at open time.
    pub frame_count: u64,
}

impl YuvIterator {
    /// Opens `path` as a sequence of I420 frames of `width` x `height`.
    pub fn open(path: impl AsRef<Path>, width: u32, height: u32) -> Result<Self> {
        let mut file = File::open(path)?;
        let len = file.seek(SeekFrom::End(0))?;
        file.seek(SeekFrom::Start(0))?;

        let frame = (width as usize) * (height as usize);
        let yblock = frame;
        let uvblock = frame / 4;
        let chunk = yblock + 2 * uvblock;
        let frame_count = if chunk == 0 { 0 } else { len / chunk as u64 };

        Ok(Self {
            reader: BufReader::new(file),
            width,
            height,
            yblock,
            uvblock,
            chunk,
            frame_count,
        })
    }

    /// Rewinds to the first frame, mirroring `YUVVideo.__iter__`'s
    /// seek-to-start so the same iterator can be walked more than once.
    pub fn restart(&mut self) -> Result<()> {
        self.reader.seek(SeekFrom::Start(0))?;
        Ok(())
    }
}

impl Iterator for YuvIterator {
    type Item = Result<YuvFrame>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut data = vec![0u8; self.chunk];
        match self.reader.read_exact(&mut data) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return None,
            Err(e) => return Some(Err(Error::Io(e))),
        }
        let y = data[0..self.yblock].to_vec();
        let u = data[self.yblock..self.yblock + self.uvblock].to_vec();
        let v = data[self.yblock + self.uvblock..].to_vec();
        Some(Ok(YuvFrame {
            width: self.width,
            height: self.height,
            y,
            u,
            v,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    struct ScratchFile(std::path::PathBuf);

    impl Drop for ScratchFile {
        fn drop(&mut self) {
            let _ = std::fs::remove_file(&self.0);
        }
    }

    fn write_fixture(width: u32, height: u32, frames: usize, tag: &str) -> ScratchFile {
        let frame = (width * height) as usize;
        let chunk = frame + 2 * (frame / 4);
        let mut path = std::env::temp_dir();
        path.push(format!("yuv_test_{tag}_{}.yuv", std::process::id()));
        let mut f = File::create(&path).unwrap();
        for n in 0..frames {
            f.write_all(&vec![n as u8; chunk]).unwrap();
        }
        ScratchFile(path)
    }

    #[test]
    fn counts_frames_from_file_length() {
        let scratch = write_fixture(4, 2, 3, "count");
        let iter = YuvIterator::open(&scratch.0, 4, 2).unwrap();
        assert_eq!(iter.frame_count, 3);
    }

    #[test]
    fn yields_planes_of_expected_size() {
        let scratch = write_fixture(4, 2, 2, "planes");
        let mut iter = YuvIterator::open(&scratch.0, 4, 2).unwrap();
        let frame = iter.next().unwrap().unwrap();
        assert_eq!(frame.y.len(), 8);
        assert_eq!(frame.u.len(), 2);
        assert_eq!(frame.v.len(), 2);
        assert!(iter.next().is_some());
        assert!(iter.next().is_none());
    }

    #[test]
    fn restart_rewinds_to_first_frame() {
        let scratch = write_fixture(4, 2, 2, "restart");
        let mut iter = YuvIterator::open(&scratch.0, 4, 2).unwrap();
        let first = iter.next().unwrap().unwrap();
        iter.next();
        iter.restart().unwrap();
        let after_restart = iter.next().unwrap().unwrap();
        assert_eq!(first.y, after_restart.y);
    }
}
