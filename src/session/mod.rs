// Copyright (C) 2026 The vtrs Authors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session orchestration (`spec.md` §5/§6): typed configuration, the
//! external-collaborator contracts, temp-directory slot allocation, and the
//! capture/media-pipeline join.
//!
//! Grounded on `examples/original_source/VideoTester/core.py`'s
//! `VTClient.__get_tempdir`/`run` for the scheduling shape and persisted
//! paths; `async-trait` is used for the pluggable external collaborators the
//! way `other_examples` capture-backend crates do.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use log::{error, info};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::codec::Codec;
use crate::error::{Error, Result};
use crate::metrics::{BsMetric, QosMetric, VqMetric};
use crate::model::SessionCaps;

/// RTP transport, selected per §6's `protocol` config key. The dissector has
/// no special case for `UdpMcast`; it is treated identically to `Udp`
/// (`spec.md` §9 open question).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Protocol {
    Udp,
    Tcp,
    UdpMcast,
}

impl std::fmt::Display for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Protocol::Udp => "udp",
            Protocol::Tcp => "tcp",
            Protocol::UdpMcast => "udp-mcast",
        };
        write!(f, "{s}")
    }
}

/// Strongly-typed mirror of the `spec.md` §6 configuration table. All other
/// keys that table's source accepted (GUI/plotting, XML-RPC transport
/// itself) are out of scope per `spec.md` §1 and have no field here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    pub iface: String,
    pub ip: String,
    pub port: u16,
    pub video: String,
    pub codec: Codec,
    pub bitrate_kbps: u32,
    pub framerate_fps: u32,
    pub protocol: Protocol,
    pub qos: Vec<QosMetric>,
    pub bs: Vec<BsMetric>,
    pub vq: Vec<VqMetric>,
    pub temp: PathBuf,
}

/// Encoder-specific bitrate conversion (`spec.md` §6 point 2): h263/mpeg4
/// encoders take bits per second, h264/theora take kbps directly.
pub fn encoder_bitrate(codec: Codec, kbps: u32) -> u32 {
    match codec {
        Codec::H263 | Codec::Mpeg4 => kbps * 1000,
        Codec::H264 | Codec::Theora => kbps,
    }
}

/// The on-disk layout for one session, rooted at
/// `<temp>/<video>_<codec>_<bitrate>_<framerate>_<protocol>/<NN>`
/// (`spec.md` §6, "Persisted state").
#[derive(Debug, Clone)]
pub struct SessionPaths {
    dir: PathBuf,
    prefix: String,
}

impl SessionPaths {
    /// Allocates the session directory (creating it if absent) and the
    /// first free two-digit slot `00..=99`, literally as
    /// `core.py::__get_tempdir` scans for the first prefix whose `.yuv`
    /// file does not yet exist.
    pub fn allocate(config: &SessionConfig) -> Result<Self> {
        let dir = config.temp.join(format!(
            "{}_{}_{}_{}_{}",
            config.video, config.codec, config.bitrate_kbps, config.framerate_fps, config.protocol
        ));
        std::fs::create_dir_all(&dir)?;

        for i in 0..100u32 {
            let prefix = format!("{i:02}");
            if !dir.join(format!("{prefix}.yuv")).exists() {
                return Ok(SessionPaths { dir, prefix });
            }
        }
        Err(Error::TempDirFull(dir.display().to_string()))
    }

    pub fn capture(&self) -> PathBuf {
        self.path_with_extension("cap")
    }

    pub fn compressed(&self, codec: Codec) -> PathBuf {
        self.path_with_extension(&codec.to_string())
    }

    pub fn yuv(&self) -> PathBuf {
        self.path_with_extension("yuv")
    }

    pub fn reference_compressed(&self, codec: Codec) -> PathBuf {
        self.path_with_suffix_extension("_ref", &codec.to_string())
    }

    pub fn reference_yuv(&self) -> PathBuf {
        self.path_with_suffix_extension("_ref", "yuv")
    }

    pub fn reference_original_yuv(&self) -> PathBuf {
        self.path_with_suffix_extension("_ref_original", "yuv")
    }

    /// Where a computed [`crate::model::MeasureResult`] named `metric_name`
    /// is persisted: `NN_<metric-name>.json`.
    pub fn measure_result(&self, metric_name: &str) -> PathBuf {
        self.dir.join(format!("{}_{}.json", self.prefix, metric_name))
    }

    fn path_with_extension(&self, ext: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", self.prefix, ext))
    }

    fn path_with_suffix_extension(&self, suffix: &str, ext: &str) -> PathBuf {
        self.dir.join(format!("{}{}.{}", self.prefix, suffix, ext))
    }
}

/// The external media-pipeline collaborator (`spec.md` §6): an RTSP server
/// that serves a clip library and decodes a requested stream to disk.
/// Grounded on `examples/original_source/VideoTester/gstreamer.py`'s
/// `RTSPServer`/`RTSPClient`, which this trait's four operations mirror
/// one-to-one.
#[async_trait]
pub trait MediaPipeline: Send + Sync {
    async fn start_server(&self, port: u16) -> Result<()>;

    async fn add_media(
        &self,
        videos: &[String],
        bitrate_kbps: u32,
        framerate_fps: u32,
        source_dir: &Path,
    ) -> Result<()>;

    /// Blocks until end-of-stream or error, writing `<prefix>.<codec>` and
    /// `<prefix>.yuv`, and populating every `SessionCaps` field this
    /// collaborator is the source of truth for (`spec.md` §6 point 3).
    async fn receive(&self, url: &str, protocol: Protocol, paths: &SessionPaths) -> Result<SessionCaps>;

    async fn make_reference(&self, video: &Path, paths: &SessionPaths) -> Result<()>;
}

/// The XML-RPC-like control-plane collaborator (`spec.md` §6): a
/// reference-counted start/stop for the RTSP server, grounded on
/// `core.py::VTServer`'s `run`/`stop` pair. No transport is implemented —
/// out of scope per `spec.md` §1 — only the contract the session requires.
#[async_trait]
pub trait ControlPlane: Send + Sync {
    async fn run(&self, bitrate_kbps: u32, framerate_fps: u32) -> Result<u16>;
    async fn stop(&self, bitrate_kbps: u32, framerate_fps: u32) -> Result<()>;
}

/// Runs the capture task in parallel with `pipeline.receive`, joining both
/// after the RTSP session ends (`spec.md` §5). Returns the discovered
/// `SessionCaps` on success; `None` if the session was cancelled or the
/// media pipeline reported a fatal error, mirroring `core.py::VTClient.run`'s
/// `except KeyboardInterrupt` / `except Exception` → `ret = True` early
/// return (no partial metric results are ever produced from a cancelled
/// run).
pub async fn run_capture_and_receive(
    iface: String,
    server_ip: String,
    pipeline: Arc<dyn MediaPipeline>,
    url: String,
    protocol: Protocol,
    paths: SessionPaths,
    cancel: CancellationToken,
) -> Option<SessionCaps> {
    let cap_path = paths.capture();
    let capture = crate::capture::capture(iface, server_ip, cap_path, cancel.clone());
    let receive = pipeline.receive(&url, protocol, &paths);

    tokio::select! {
        _ = cancel.cancelled() => {
            info!("session cancelled; no results will be produced");
            None
        }
        joined = tokio::try_join!(capture, receive) => {
            match joined {
                Ok((_, caps)) => Some(caps),
                Err(e) => {
                    error!("session aborted: {e}");
                    None
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn h263_and_mpeg4_bitrate_is_converted_to_bps() {
        assert_eq!(encoder_bitrate(Codec::H263, 512), 512_000);
        assert_eq!(encoder_bitrate(Codec::Mpeg4, 512), 512_000);
    }

    #[test]
    fn h264_and_theora_bitrate_passes_through_as_kbps() {
        assert_eq!(encoder_bitrate(Codec::H264, 512), 512);
        assert_eq!(encoder_bitrate(Codec::Theora, 512), 512);
    }

    #[test]
    fn session_paths_allocate_first_free_slot() {
        let dir = std::env::temp_dir().join(format!("retina-session-test-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        let config = SessionConfig {
            iface: "eth0".into(),
            ip: "127.0.0.1".into(),
            port: 9000,
            video: "clip".into(),
            codec: Codec::H264,
            bitrate_kbps: 512,
            framerate_fps: 25,
            protocol: Protocol::Tcp,
            qos: vec![],
            bs: vec![],
            vq: vec![],
            temp: dir.clone(),
        };
        let paths = SessionPaths::allocate(&config).unwrap();
        assert_eq!(paths.prefix, "00");
        std::fs::write(paths.yuv(), b"").unwrap();

        let paths2 = SessionPaths::allocate(&config).unwrap();
        assert_eq!(paths2.prefix, "01");

        std::fs::remove_dir_all(&dir).ok();
    }
}
