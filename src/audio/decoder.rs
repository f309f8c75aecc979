use crate::audio::error::AudioError;
use std::io;
use std::time::Duration;
use symphonia::core::codecs::{Decoder, DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader, SeekMode, SeekTo};
use symphonia::core::io::{MediaSource, MediaSourceStream};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::core::units::{Time, TimeBase};
use tracing::{debug, info, trace, warn};

const LOG_TARGET: &str = "r_focusplay::audio::decoder";

/// Result of decoding one packet of the selected track.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DecodeOutcome {
    /// A packet was decoded; `position` is the stream time at the end of it.
    Decoded { position: Duration },
    EndOfStream,
}

/// Manages Symphonia format reading and decoding for a single track.
pub struct SymphoniaDecoder {
    format_reader: Box<dyn FormatReader>,
    decoder: Box<dyn Decoder>,
    track_id: u32,
    time_base: Option<TimeBase>,
    sample_rate: Option<u32>,
    total: Option<Duration>,
}

impl SymphoniaDecoder {
    /// Probes `source` and creates a decoder for its first playable track.
    pub fn new(source: Box<dyn MediaSource>, extension: Option<&str>) -> Result<Self, AudioError> {
        debug!(target: LOG_TARGET, "Setting up Symphonia format reader and decoder...");
        let mut hint = Hint::new();
        if let Some(ext) = extension {
            hint.with_extension(ext);
        }
        let mss = MediaSourceStream::new(source, Default::default());
        let meta_opts: MetadataOptions = Default::default();
        let fmt_opts: FormatOptions = Default::default();

        let probed = symphonia::default::get_probe().format(&hint, mss, &fmt_opts, &meta_opts)?;
        let format_reader = probed.format;

        let track = format_reader
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| AudioError::UnsupportedFormat("No suitable audio track found".to_string()))?
            .clone();

        debug!(target: LOG_TARGET, "Found suitable audio track: ID={}, Codec={:?}", track.id, track.codec_params.codec);

        let decoder = symphonia::default::get_codecs().make(&track.codec_params, &DecoderOptions::default())?;

        let time_base = track.codec_params.time_base;
        let sample_rate = track.codec_params.sample_rate;
        let total = match (track.codec_params.n_frames, time_base, sample_rate) {
            (Some(frames), Some(tb), _) => Some(time_to_duration(tb.calc_time(frames))),
            (Some(frames), None, Some(rate)) if rate > 0 => Some(Duration::from_secs_f64(frames as f64 / rate as f64)),
            _ => None,
        };

        info!(target: LOG_TARGET, "Symphonia decoder ready. Sample rate: {:?}, duration: {:?}", sample_rate, total);

        Ok(Self {
            format_reader,
            decoder,
            track_id: track.id,
            time_base,
            sample_rate,
            total,
        })
    }

    /// Total track duration, when the container reports it.
    pub fn total_duration(&self) -> Option<Duration> {
        self.total
    }

    /// Decodes the next packet belonging to the selected track.
    pub fn decode_next(&mut self) -> Result<DecodeOutcome, AudioError> {
        loop {
            let packet = match self.format_reader.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(ref io_err)) if io_err.kind() == io::ErrorKind::UnexpectedEof => {
                    debug!(target: LOG_TARGET, "End of stream reached.");
                    return Ok(DecodeOutcome::EndOfStream);
                }
                Err(SymphoniaError::ResetRequired) => {
                    warn!(target: LOG_TARGET, "Stream discontinuity, resetting decoder.");
                    self.decoder.reset();
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            if packet.track_id() != self.track_id {
                trace!(target: LOG_TARGET, "Skipping packet for track {}", packet.track_id());
                continue;
            }

            let end_ts = packet.ts().saturating_add(packet.dur());
            match self.decoder.decode(&packet) {
                Ok(_) => {
                    return Ok(DecodeOutcome::Decoded { position: self.ts_to_duration(end_ts) });
                }
                Err(SymphoniaError::DecodeError(err)) => {
                    warn!(target: LOG_TARGET, "Symphonia decode error (skipping packet): {}", err);
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Seeks the selected track. Returns the position actually reached.
    pub fn seek(&mut self, position: Duration) -> Result<Duration, AudioError> {
        let time = Time::new(position.as_secs(), position.subsec_nanos() as f64 / 1_000_000_000.0);
        let seeked = self.format_reader.seek(
            SeekMode::Accurate,
            SeekTo::Time { time, track_id: Some(self.track_id) },
        )?;
        self.decoder.reset();
        let reached = self.ts_to_duration(seeked.actual_ts);
        debug!(target: LOG_TARGET, "Seek to {:?} landed at {:?}", position, reached);
        Ok(reached)
    }

    fn ts_to_duration(&self, ts: u64) -> Duration {
        match (self.time_base, self.sample_rate) {
            (Some(tb), _) => time_to_duration(tb.calc_time(ts)),
            (None, Some(rate)) if rate > 0 => Duration::from_secs_f64(ts as f64 / rate as f64),
            _ => Duration::ZERO,
        }
    }
}

fn time_to_duration(time: Time) -> Duration {
    Duration::from_secs(time.seconds) + Duration::from_secs_f64(time.frac.clamp(0.0, 1.0))
}
