// Copyright (C) 2026 The vtrs Authors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Offline analysis CLI: runs the QoS/BS/VQ metric engines over an
//! already-captured session (a `.cap` file plus the media-pipeline's
//! received/reference files) and prints the resulting `MeasureResult`s as
//! JSON.
//!
//! This replaces the upstream `mp4`/`metadata` demo binaries, which served
//! a different client library's use case; the RTSP-session capture/receive
//! itself is driven by an external `MediaPipeline` (`spec.md` §6), not by
//! this binary.

use std::path::PathBuf;
use std::str::FromStr;

use clap::Parser;
use log::{error, info, warn};

use vtrs::codec::{self, Codec};
use vtrs::metrics::{self, BsMetric, QosMetric, VqInputs, VqMetric};
use vtrs::model::{MeasurePayload, PixelFormat, SessionCaps};
use vtrs::rtp;
use vtrs::rtsp;
use vtrs::yuv::YuvIterator;

#[derive(Parser)]
#[clap(name = "vtrs", about = "offline RTSP/RTP video-quality analysis")]
struct Opts {
    /// Path to the PCAP capture of the session.
    #[clap(long)]
    cap: PathBuf,

    /// Server IP address used when the capture was taken.
    #[clap(long)]
    server_ip: String,

    /// Server-side RTSP TCP port.
    #[clap(long)]
    rtsp_sport: u16,

    /// Opaque SDP session id byte string used to locate the SDP answer.
    #[clap(long)]
    sdp_session_id: String,

    /// RTP destination UDP port; required for `--protocol udp`.
    #[clap(long)]
    udp_dport: Option<u16>,

    #[clap(long, default_value = "tcp")]
    protocol: String,

    #[clap(long)]
    payload_type: u8,

    #[clap(long, default_value = "90000")]
    clock_rate: u32,

    #[clap(long, default_value = "0")]
    seq_base: u32,

    #[clap(long)]
    codec: String,

    #[clap(long)]
    video_width: u32,

    #[clap(long)]
    video_height: u32,

    /// Decoded YUV received by the client.
    #[clap(long)]
    received_yuv: PathBuf,

    /// Decoded YUV of the locally re-encoded reference.
    #[clap(long)]
    reference_yuv: PathBuf,

    /// Decoded YUV of the locally re-encoded coded-reference capture;
    /// required when `--vq` includes `miv`.
    #[clap(long)]
    coded_yuv: Option<PathBuf>,

    #[clap(long, default_value = "512")]
    bitrate_kbps: f64,

    #[clap(long, default_value = "25")]
    framerate_fps: f64,

    /// Comma-separated QoS metric ids; defaults to all of them.
    #[clap(long, default_value = "latency,delta,jitter,skew,bandwidth,plr,pld")]
    qos: String,

    /// Comma-separated BS metric ids; requires `--received-bitstream` and
    /// `--reference-bitstream` when non-empty.
    #[clap(long, default_value = "")]
    bs: String,

    /// Comma-separated VQ metric ids.
    #[clap(long, default_value = "psnr")]
    vq: String,

    /// Compressed bitstream received by the client (for BS metrics).
    #[clap(long)]
    received_bitstream: Option<PathBuf>,

    /// Compressed bitstream of the locally re-encoded reference.
    #[clap(long)]
    reference_bitstream: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    env_logger::init();
    if let Err(e) = run().await {
        error!("fatal: {e}");
        std::process::exit(1);
    }
    info!("done");
}

async fn run() -> anyhow::Result<()> {
    let opts = Opts::parse();
    let codec = Codec::from_str(&opts.codec)?;

    let discovery = rtsp::discover(
        &opts.cap,
        &opts.server_ip,
        opts.sdp_session_id.as_bytes(),
        opts.rtsp_sport,
    )?;

    let caps = SessionCaps {
        rtsp_sport: opts.rtsp_sport,
        rtsp_dport: discovery.rtsp_dport,
        sdp_session_id: opts.sdp_session_id.into_bytes(),
        udp_dport: opts.udp_dport,
        payload_type: opts.payload_type,
        clock_rate: opts.clock_rate,
        seq_base: opts.seq_base,
        video_width: opts.video_width,
        video_height: opts.video_height,
        pixel_format: PixelFormat::I420,
    };

    let (records, rtp_ts_secs) = match opts.protocol.as_str() {
        "tcp" => rtp::tcp::parse(
            &opts.cap,
            &opts.server_ip,
            caps.rtsp_sport,
            caps.rtsp_dport,
            caps.payload_type,
            caps.seq_base,
            caps.clock_rate,
        )?,
        "udp" | "udp-mcast" => {
            let udp_dport = caps
                .udp_dport
                .ok_or_else(|| anyhow::anyhow!("--udp-dport is required for udp/udp-mcast"))?;
            rtp::udp::parse(
                &opts.cap,
                &opts.server_ip,
                udp_dport,
                caps.payload_type,
                caps.seq_base,
                caps.clock_rate,
            )?
        }
        other => return Err(anyhow::anyhow!("unsupported protocol: {other}")),
    };

    let mut results = Vec::new();
    for id in opts.qos.split(',').filter(|s| !s.is_empty()) {
        let metric = QosMetric::from_str(id)?;
        match metrics::compute_qos(metric, &records, &rtp_ts_secs, &discovery.rtt) {
            Some(result) => results.push(result),
            None => warn!("metric {id} omitted: no input to compute it from"),
        }
    }

    let bs_ids: Vec<&str> = opts.bs.split(',').filter(|s| !s.is_empty()).collect();
    if !bs_ids.is_empty() {
        let received_path = opts
            .received_bitstream
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("--bs requires --received-bitstream"))?;
        let reference_path = opts
            .reference_bitstream
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("--bs requires --reference-bitstream"))?;
        let received_frames = codec::parse(codec, &std::fs::read(received_path)?);
        let reference_frames = codec::parse(codec, &std::fs::read(reference_path)?);
        for id in bs_ids {
            let metric = BsMetric::from_str(id)?;
            results.push(metrics::compute_bs(metric, &received_frames, &reference_frames));
        }
    }

    let vq_ids: Vec<&str> = opts.vq.split(',').filter(|s| !s.is_empty()).collect();
    if !vq_ids.is_empty() {
        let mut received = YuvIterator::open(&opts.received_yuv, opts.video_width, opts.video_height)?;
        let mut reference = YuvIterator::open(&opts.reference_yuv, opts.video_width, opts.video_height)?;
        let received_frames: Vec<_> = (&mut received).collect::<Result<_, _>>()?;
        let reference_frames: Vec<_> = (&mut reference).collect::<Result<_, _>>()?;
        let coded_frames = match &opts.coded_yuv {
            Some(path) => {
                let mut coded = YuvIterator::open(path, opts.video_width, opts.video_height)?;
                Some((&mut coded).collect::<Result<Vec<_>, _>>()?)
            }
            None => None,
        };
        let packet_loss_rate = match metrics::compute_qos(QosMetric::Plr, &records, &rtp_ts_secs, &discovery.rtt) {
            Some(result) => match result.payload {
                MeasurePayload::Scalar { value } => value,
                _ => 0.0,
            },
            None => 0.0,
        };
        let inputs = VqInputs {
            received: &received_frames,
            original: &reference_frames,
            coded: coded_frames.as_deref(),
            bitrate_kbps: opts.bitrate_kbps,
            framerate_fps: opts.framerate_fps,
            packet_loss_rate,
        };
        for id in vq_ids {
            let metric = VqMetric::from_str(id)?;
            match metrics::compute_vq(metric, &inputs) {
                Ok(result) => results.push(result),
                Err(e) => warn!("vq metric {id} omitted: {e}"),
            }
        }
    }

    println!("{}", serde_json::to_string_pretty(&results)?);
    Ok(())
}
