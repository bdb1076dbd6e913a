//! Audio sample conversion
//!
//! Receivers deliver planar 32-bit float audio where `1.0` sits at the +4 dBu
//! reference level. Audio sinks take interleaved signed 16-bit PCM, so the
//! conversion scales by the chosen headroom: with a reference level of
//! `L` dB, full scale of the 16-bit range equals `10^(L/20)` in float units.
//!
//! ```text
//!  planar:      [L0 L1 L2 ...][R0 R1 R2 ...]     (channel_stride apart)
//!  interleaved: [L0 R0 L1 R1 L2 R2 ...]          (i16 little endian)
//! ```

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{MediaError, Result};
use crate::transport::AudioFrame;

/// Headroom used when converting received audio, in dB
pub const REFERENCE_LEVEL_DB: i32 = 20;

/// Bytes per converted sample
pub const PCM_SAMPLE_SIZE: usize = std::mem::size_of::<i16>();

/// Multiplier from float samples to 16-bit samples at a reference level
pub fn pcm_scale(reference_level_db: i32) -> f32 {
    i16::MAX as f32 * 10f32.powf(-(reference_level_db as f32) / 20.0)
}

fn validate(frame: &AudioFrame) -> Result<()> {
    if frame.channels == 0 {
        return Err(MediaError::InvalidAudioFormat("zero channels".into()).into());
    }
    let plane_bytes = frame.samples as usize * 4;
    if (frame.channel_stride as usize) < plane_bytes {
        return Err(MediaError::InvalidAudioFormat(format!(
            "channel stride {} shorter than {} samples",
            frame.channel_stride, frame.samples
        ))
        .into());
    }

    let needed = (frame.channels as usize - 1) * frame.channel_stride as usize + plane_bytes;
    if frame.data.len() < needed {
        return Err(MediaError::TruncatedAudio {
            needed,
            available: frame.data.len(),
        }
        .into());
    }
    Ok(())
}

/// Interleave and scale a planar float frame into 16-bit samples
///
/// The result holds `samples * channels` values.
pub fn interleave_i16(frame: &AudioFrame, reference_level_db: i32) -> Result<Vec<i16>> {
    validate(frame)?;

    let scale = pcm_scale(reference_level_db);
    let channels = frame.channels as usize;
    let samples = frame.samples as usize;
    let stride = frame.channel_stride as usize;

    let mut out = vec![0i16; samples * channels];
    for channel in 0..channels {
        let mut plane = &frame.data[channel * stride..channel * stride + samples * 4];
        for sample in 0..samples {
            let value = plane.get_f32_le() * scale;
            out[sample * channels + channel] = value
                .round()
                .clamp(i16::MIN as f32, i16::MAX as f32) as i16;
        }
    }
    Ok(out)
}

/// Convert a frame to the little-endian PCM byte buffer audio sinks consume
pub fn to_pcm_bytes(frame: &AudioFrame, reference_level_db: i32) -> Result<Bytes> {
    let samples = interleave_i16(frame, reference_level_db)?;
    let mut buf = BytesMut::with_capacity(samples.len() * PCM_SAMPLE_SIZE);
    for sample in samples {
        buf.put_i16_le(sample);
    }
    Ok(buf.freeze())
}
