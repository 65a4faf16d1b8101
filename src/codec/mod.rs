// Copyright (C) 2026 The vtrs Authors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Compressed-bitstream frame parsing (`spec.md` §4.7, C7): recovering
//! frame boundaries and I/P/B type without decoding.
//!
//! All four parsers share the start-code-scanner shape described in
//! `spec.md` §4.7; each codec gets its own module rather than a shared
//! trait object, the same dispatch-by-enum shape the teacher's
//! `Depacketizer`/`DepacketizerInner` pair uses for RTP payload formats.

mod h263;
mod h264;
mod mpeg4;
mod theora;

use crate::error::{Error, Result};
use crate::model::FrameList;

/// Compressed video codecs this crate can parse frame boundaries for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Codec {
    H263,
    H264,
    Mpeg4,
    Theora,
}

impl std::fmt::Display for Codec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Codec::H263 => "h263",
            Codec::H264 => "h264",
            Codec::Mpeg4 => "mpeg4",
            Codec::Theora => "theora",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for Codec {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "h263" => Ok(Codec::H263),
            "h264" => Ok(Codec::H264),
            "mpeg4" => Ok(Codec::Mpeg4),
            "theora" => Ok(Codec::Theora),
            other => Err(Error::UnsupportedCodec(other.to_owned())),
        }
    }
}

/// Parses the frame-type/length lists out of a raw compressed-bitstream
/// buffer, dispatching to the codec-specific scanner.
pub fn parse(codec: Codec, data: &[u8]) -> FrameList {
    match codec {
        Codec::H263 => h263::parse(data),
        Codec::H264 => h264::parse(data),
        Codec::Mpeg4 => mpeg4::parse(data),
        Codec::Theora => theora::parse(data),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_codec_name_is_rejected() {
        let err = "av1".parse::<Codec>().unwrap_err();
        assert!(matches!(err, Error::UnsupportedCodec(_)));
    }

    #[test]
    fn known_codec_names_round_trip_through_display() {
        for codec in [Codec::H263, Codec::H264, Codec::Mpeg4, Codec::Theora] {
            let parsed: Codec = codec.to_string().parse().unwrap();
            assert_eq!(parsed, codec);
        }
    }
}
