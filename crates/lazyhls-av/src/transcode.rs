//! Single-segment transcoding.
//!
//! Each segment is encoded independently with a two-stage seek: a fast input
//! seek to shortly before the segment start, then an exact output seek for the
//! remainder. `-output_ts_offset` places the segment's timestamps at its
//! position on the source timeline, so independently encoded segments play
//! back as one continuous stream.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Instant;

use async_trait::async_trait;
use lazyhls_common::{Error, Result, SegmentWindow, TranscodeConfig, VideoInfo};

use crate::command::ToolCommand;

/// Seconds decoded before the segment start so the exact seek lands on
/// fully decoded frames.
pub const SEEK_PRE_ROLL: f64 = 2.0;

/// Seek positions for one segment, all in seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeekPlan {
    pub index: u32,
    /// Segment start on the source timeline.
    pub target: f64,
    /// Input (keyframe) seek position, `max(0, target - SEEK_PRE_ROLL)`.
    pub coarse: f64,
    /// Output (frame-exact) seek, `target - coarse`.
    pub fine: f64,
    /// Length of the segment.
    pub duration: f64,
}

impl SeekPlan {
    pub fn for_window(window: SegmentWindow) -> Self {
        let coarse = (window.start - SEEK_PRE_ROLL).max(0.0);
        Self {
            index: window.index,
            target: window.start,
            coarse,
            fine: window.start - coarse,
            duration: window.duration,
        }
    }

    /// Plan for segment `index` of `info`, or `None` when out of range.
    pub fn for_segment(info: &VideoInfo, index: u32) -> Option<Self> {
        info.window(index).map(Self::for_window)
    }
}

/// Everything an encoder needs to produce one segment file.
#[derive(Debug, Clone)]
pub struct EncodeJob {
    pub source: PathBuf,
    pub output: PathBuf,
    pub plan: SeekPlan,
}

/// Produces one MPEG-TS segment file.
#[async_trait]
pub trait Encoder: Send + Sync {
    /// Encode `job.plan`'s window of `job.source` into `job.output`.
    ///
    /// On success the output file exists and is complete. Failures are
    /// reported as [`Error::Transcode`] or [`Error::SegmentFileMissing`].
    async fn encode(&self, job: &EncodeJob) -> Result<()>;
}

/// Encodes segments with `ffmpeg`.
#[derive(Debug, Clone)]
pub struct FfmpegEncoder {
    ffmpeg: PathBuf,
    settings: TranscodeConfig,
}

impl FfmpegEncoder {
    pub fn new(ffmpeg: PathBuf, settings: TranscodeConfig) -> Self {
        Self { ffmpeg, settings }
    }

    /// Build the ffmpeg argument list writing to `dest`.
    ///
    /// Paths are passed through as-is, so sources with non-UTF-8 names work.
    pub fn args(&self, job: &EncodeJob, dest: &Path) -> Vec<OsString> {
        let plan = &job.plan;
        let s = &self.settings;
        let mut args: Vec<OsString> = Vec::with_capacity(64);

        push(&mut args, &["-hide_banner", "-loglevel", "error", "-y"]);

        // Two-stage seek
        push(&mut args, &["-ss", &secs(plan.coarse), "-i"]);
        args.push(job.source.as_os_str().to_owned());
        push(&mut args, &["-ss", &secs(plan.fine), "-t", &secs(plan.duration)]);

        push(&mut args, &["-map", "0:v:0", "-map", "0:a:0?", "-sn", "-dn"]);

        // Video: every segment must open on a keyframe
        push(
            &mut args,
            &[
                "-c:v",
                &s.video_codec,
                "-preset",
                &s.preset,
                "-crf",
                &s.crf.to_string(),
                "-pix_fmt",
                "yuv420p",
            ],
        );
        let gop = s.gop_size.to_string();
        push(
            &mut args,
            &[
                "-g",
                &gop,
                "-keyint_min",
                &gop,
                "-sc_threshold",
                "0",
                "-force_key_frames",
                "expr:gte(t,0)",
            ],
        );
        if let Some(rate) = s.frame_rate {
            push(&mut args, &["-r", &format!("{rate}")]);
        }
        push(&mut args, &["-fps_mode", "cfr"]);

        if s.copies_audio() {
            push(&mut args, &["-c:a", "copy"]);
        } else {
            push(
                &mut args,
                &["-c:a", &s.audio_codec, "-b:a", &s.audio_bitrate, "-ac", "2"],
            );
        }

        push(
            &mut args,
            &[
                "-output_ts_offset",
                &secs(plan.target),
                "-muxdelay",
                "0",
                "-muxpreload",
                "0",
                "-f",
                "mpegts",
            ],
        );
        args.push(dest.as_os_str().to_owned());

        args
    }
}

#[async_trait]
impl Encoder for FfmpegEncoder {
    async fn encode(&self, job: &EncodeJob) -> Result<()> {
        let index = job.plan.index;
        let partial = partial_path(&job.output);
        let started = Instant::now();

        let result = ToolCommand::new(self.ffmpeg.clone())
            .args(self.args(job, &partial))
            .timeout(self.settings.timeout())
            .execute()
            .await;

        if let Err(e) = result {
            if let Err(rm) = tokio::fs::remove_file(&partial).await {
                if rm.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!(path = %partial.display(), error = %rm, "failed to remove partial segment");
                }
            }
            return Err(Error::transcode(index, e.to_string()));
        }

        match tokio::fs::rename(&partial, &job.output).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::SegmentFileMissing {
                    path: job.output.clone(),
                });
            }
            Err(e) => {
                return Err(Error::transcode(
                    index,
                    format!("failed to move output into place: {e}"),
                ));
            }
        }

        tracing::debug!(
            segment = index,
            target = job.plan.target,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "ffmpeg finished segment"
        );
        Ok(())
    }
}

/// Temporary path the encoder writes before the output is renamed into place.
pub fn partial_path(output: &Path) -> PathBuf {
    let mut name = output.as_os_str().to_owned();
    name.push(".partial");
    PathBuf::from(name)
}

fn push(args: &mut Vec<OsString>, items: &[&str]) {
    args.extend(items.iter().map(OsString::from));
}

fn secs(value: f64) -> String {
    format!("{value:.3}")
}
