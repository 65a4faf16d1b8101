// Copyright (C) 2026 The vtrs Authors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Crate-wide error type.
//!
//! Mirrors the failure modes described in the original `VideoTester` core:
//! most are fatal (abort the session before any measures run); a few are
//! recorded and recovered from, never surfaced to a caller as an `Err`.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// The capture interface could not be opened (missing, no permission).
    #[error("failed to initialize capture on interface {iface}: {source}")]
    CaptureInit {
        iface: String,
        #[source]
        source: pcap::Error,
    },

    /// Data-link layer the offset computer doesn't know how to skip.
    #[error("unsupported data-link type: {0:?}")]
    UnsupportedLink(pcap::Linktype),

    /// IP version other than 4 or 6.
    #[error("unsupported network-layer version nibble: {0:#x}")]
    UnsupportedNetwork(u8),

    /// Transport protocol other than TCP or UDP.
    #[error("unsupported transport protocol number: {0}")]
    UnsupportedTransport(u8),

    /// The external media pipeline collaborator reported a failure.
    #[error("media pipeline error: {0}")]
    Pipeline(String),

    /// A codec name outside {h263, h264, mpeg4, theora}.
    #[error("unsupported codec: {0}")]
    UnsupportedCodec(String),

    /// A YUV pixel format other than I420.
    #[error("unsupported pixel format: {0}")]
    UnsupportedPixelFormat(String),

    /// A bitstream parser's cursor would read past the end of the buffer.
    #[error("bitstream parser underrun at offset {offset} (buffer length {len})")]
    ParseUnderrun { offset: usize, len: usize },

    /// The session's temp subdirectory has all 100 two-digit slots taken.
    #[error("temp directory {0} is full (all 00..99 slots taken)")]
    TempDirFull(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// Any other failure surfaced by the `pcap` crate while opening or
    /// iterating a capture (not covered by [`Error::CaptureInit`], which is
    /// specifically the live-capture open path).
    #[error(transparent)]
    Capture(#[from] pcap::Error),
}

/// Non-fatal conditions that are logged and recovered from rather than
/// returned as an [`Error`]. Kept as a type so call sites can match on them
/// when deciding how to log, but they are never part of a `Result`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recoverable {
    /// TCP reassembly hit a marked loss; resynchronized on the next
    /// interleaved-frame magic.
    DissectionGap,
    /// Fewer than 3 RTSP request/response pairs were observed while
    /// measuring RTT.
    RttUnderSampled { observed: usize },
}

impl std::fmt::Display for Recoverable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Recoverable::DissectionGap => write!(f, "dissection gap recovered"),
            Recoverable::RttUnderSampled { observed } => {
                write!(f, "RTT under-sampled: only {observed}/3 pairs observed")
            }
        }
    }
}
