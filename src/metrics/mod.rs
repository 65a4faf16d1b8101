// Copyright (C) 2026 The vtrs Authors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Metric engines (`spec.md` §4.8–§4.10, C8–C10) and the metric-id dispatch
//! tables that replace the original's class hierarchy (`spec.md` §9,
//! "Replacing dynamic dispatch").

pub mod bs;
pub mod qos;
pub mod vq;

use crate::error::{Error, Result};
use crate::model::{FrameList, MeasureResult, PacketRecord, RttSample, YuvFrame};

/// QoS metric ids, matching the `qos` config key's value set (`spec.md` §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QosMetric {
    Latency,
    Delta,
    Jitter,
    Skew,
    Bandwidth,
    Plr,
    Pld,
}

impl std::fmt::Display for QosMetric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            QosMetric::Latency => "latency",
            QosMetric::Delta => "delta",
            QosMetric::Jitter => "jitter",
            QosMetric::Skew => "skew",
            QosMetric::Bandwidth => "bandwidth",
            QosMetric::Plr => "plr",
            QosMetric::Pld => "pld",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for QosMetric {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "latency" => Ok(QosMetric::Latency),
            "delta" => Ok(QosMetric::Delta),
            "jitter" => Ok(QosMetric::Jitter),
            "skew" => Ok(QosMetric::Skew),
            "bandwidth" => Ok(QosMetric::Bandwidth),
            "plr" => Ok(QosMetric::Plr),
            "pld" => Ok(QosMetric::Pld),
            other => Err(Error::Pipeline(format!("unknown qos metric id: {other}"))),
        }
    }
}

/// Bit-stream metric ids, matching the `bs` config key's value set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BsMetric {
    StreamEye,
    RefStreamEye,
    Gop,
    Iflr,
}

impl std::fmt::Display for BsMetric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            BsMetric::StreamEye => "streameye",
            BsMetric::RefStreamEye => "refstreameye",
            BsMetric::Gop => "gop",
            BsMetric::Iflr => "iflr",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for BsMetric {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "streameye" => Ok(BsMetric::StreamEye),
            "refstreameye" => Ok(BsMetric::RefStreamEye),
            "gop" => Ok(BsMetric::Gop),
            "iflr" => Ok(BsMetric::Iflr),
            other => Err(Error::Pipeline(format!("unknown bs metric id: {other}"))),
        }
    }
}

/// Video-quality metric ids, matching the `vq` config key's value set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VqMetric {
    Psnr,
    Ssim,
    G1070,
    PsnrToMos,
    Miv,
}

impl std::fmt::Display for VqMetric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            VqMetric::Psnr => "psnr",
            VqMetric::Ssim => "ssim",
            VqMetric::G1070 => "g1070",
            VqMetric::PsnrToMos => "psnrtomos",
            VqMetric::Miv => "miv",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for VqMetric {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "psnr" => Ok(VqMetric::Psnr),
            "ssim" => Ok(VqMetric::Ssim),
            "g1070" => Ok(VqMetric::G1070),
            "psnrtomos" => Ok(VqMetric::PsnrToMos),
            "miv" => Ok(VqMetric::Miv),
            other => Err(Error::Pipeline(format!("unknown vq metric id: {other}"))),
        }
    }
}

/// Runs one QoS metric over a dissected RTP stream. `None` means the metric
/// could not be computed (currently only `Latency` with no RTT samples) and
/// should be omitted rather than treated as an error (`spec.md` §7).
pub fn compute_qos(
    metric: QosMetric,
    records: &[PacketRecord],
    rtp_ts_secs: &[f64],
    rtt: &[RttSample],
) -> Option<MeasureResult> {
    match metric {
        QosMetric::Latency => qos::latency(rtt),
        QosMetric::Delta => Some(qos::delta(records)),
        QosMetric::Jitter => Some(qos::jitter(records, rtp_ts_secs)),
        QosMetric::Skew => Some(qos::skew(records, rtp_ts_secs)),
        QosMetric::Bandwidth => Some(qos::bandwidth(records)),
        QosMetric::Plr => Some(qos::packet_loss_rate(records)),
        QosMetric::Pld => Some(qos::packet_loss_distribution(records)),
    }
}

/// Runs one BS metric over a pair of dissected frame-type lists.
pub fn compute_bs(metric: BsMetric, received: &FrameList, reference: &FrameList) -> MeasureResult {
    match metric {
        BsMetric::StreamEye => bs::stream_eye_received(received),
        BsMetric::RefStreamEye => bs::stream_eye_reference(reference),
        BsMetric::Gop => bs::gop(received.types()),
        BsMetric::Iflr => bs::i_frame_loss_rate(received.types()),
    }
}

/// The YUV captures and QoS sub-result a VQ metric may need. `coded` is only
/// required for `Miv`, which compares quality loss from transmission against
/// quality loss already present in the re-encoded reference.
pub struct VqInputs<'a> {
    pub received: &'a [YuvFrame],
    pub original: &'a [YuvFrame],
    pub coded: Option<&'a [YuvFrame]>,
    pub bitrate_kbps: f64,
    pub framerate_fps: f64,
    pub packet_loss_rate: f64,
}

/// Runs one VQ metric. `Miv` without `inputs.coded` is an [`Error::Pipeline`]
/// rather than a silently-omitted metric, since the caller controls whether
/// a coded-reference capture was made available at all.
pub fn compute_vq(metric: VqMetric, inputs: &VqInputs) -> Result<MeasureResult> {
    match metric {
        VqMetric::Psnr => Ok(vq::psnr(inputs.received, inputs.original)),
        VqMetric::Ssim => Ok(vq::ssim(inputs.received, inputs.original)),
        VqMetric::G1070 => Ok(vq::g1070(
            inputs.bitrate_kbps,
            inputs.framerate_fps,
            inputs.packet_loss_rate,
        )),
        VqMetric::PsnrToMos => {
            let psnr = vq::psnr(inputs.received, inputs.original);
            vq::psnr_to_mos(&psnr)
        }
        VqMetric::Miv => {
            let coded = inputs.coded.ok_or_else(|| {
                Error::Pipeline("MIV requires a coded-reference YUV capture".into())
            })?;
            let recv_mos = vq::psnr_to_mos(&vq::psnr(inputs.received, inputs.original))?;
            let coded_mos = vq::psnr_to_mos(&vq::psnr(coded, inputs.original))?;
            vq::miv(&recv_mos, &coded_mos)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metric_ids_round_trip_through_display() {
        for m in [
            QosMetric::Latency,
            QosMetric::Delta,
            QosMetric::Jitter,
            QosMetric::Skew,
            QosMetric::Bandwidth,
            QosMetric::Plr,
            QosMetric::Pld,
        ] {
            assert_eq!(m.to_string().parse::<QosMetric>().unwrap(), m);
        }
        for m in [BsMetric::StreamEye, BsMetric::RefStreamEye, BsMetric::Gop, BsMetric::Iflr] {
            assert_eq!(m.to_string().parse::<BsMetric>().unwrap(), m);
        }
        for m in [VqMetric::Psnr, VqMetric::Ssim, VqMetric::G1070, VqMetric::PsnrToMos, VqMetric::Miv] {
            assert_eq!(m.to_string().parse::<VqMetric>().unwrap(), m);
        }
    }

    #[test]
    fn miv_without_coded_reference_is_an_error() {
        let inputs = VqInputs {
            received: &[],
            original: &[],
            coded: None,
            bitrate_kbps: 500.0,
            framerate_fps: 25.0,
            packet_loss_rate: 0.0,
        };
        assert!(compute_vq(VqMetric::Miv, &inputs).is_err());
    }
}
