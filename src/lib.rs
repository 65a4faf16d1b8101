// Copyright (C) 2026 The vtrs Authors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end RTSP/RTP video quality measurement.
//!
//! A session captures a live video stream from an RTSP/RTP server while an
//! external media pipeline decodes it to disk, then reconstructs the packet
//! and bitstream structure offline to compute three families of quality
//! metrics:
//!
//! - [`metrics::qos`] — network-level QoS (latency, jitter, loss, bandwidth).
//! - [`metrics::bs`] — compressed-bitstream structure (GOP size, I-frame loss).
//! - [`metrics::vq`] — reference-based video quality (PSNR, SSIM, G.1070).
//!
//! [`capture`] and [`rtsp`] recover the session's parameters and packet
//! stream from a PCAP file; [`rtp`] reassembles the RTP sub-stream over
//! either UDP or TCP-interleaved transport; [`yuv`] and [`codec`] parse the
//! media-pipeline's output files. [`session`] ties the capture task, the
//! external collaborators, and the metric engines together into one run.

pub mod capture;
pub mod codec;
pub mod error;
pub mod metrics;
pub mod model;
pub mod rtp;
pub mod rtsp;
pub mod session;
pub mod yuv;

pub use error::{Error, Recoverable, Result};
