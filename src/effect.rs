//! Ghost audio effect pipeline
//!
//! Pure transforms over a decoded clip: pitch shift, layered echoes, a
//! reversed-tail shimmer, low-pass filtering and a fade-out. Deterministic
//! and side-effect free; the same buffer and config always produce a
//! byte-identical result.

use crate::audio::{AudioBuffer, OUTPUT_SAMPLE_RATE};
use crate::{Error, Result};

/// Level trim applied ahead of the echo overlay (dB)
const HEADROOM_TRIM_DB: f32 = -2.0;

/// Attenuation of the reversed shimmer overlay (dB)
const SHIMMER_GAIN_DB: f32 = -16.0;

/// Fade-in applied to the reversed shimmer copy (ms)
const SHIMMER_FADE_IN_MS: u32 = 60;

/// Fade-out applied to the reversed shimmer copy (ms)
const SHIMMER_FADE_OUT_MS: u32 = 120;

/// One echo tap: a delayed, attenuated copy of the dry signal
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EchoTap {
    /// Delay from the start of the clip (ms)
    pub delay_ms: u32,
    /// Attenuation of this tap (dB, at most 0)
    pub gain_db: f32,
}

impl EchoTap {
    /// Create a tap
    #[must_use]
    pub const fn new(delay_ms: u32, gain_db: f32) -> Self {
        Self { delay_ms, gain_db }
    }
}

/// Ghost effect configuration, immutable per call
#[derive(Debug, Clone, PartialEq)]
pub struct EffectConfig {
    /// Pitch shift in semitones; negative lowers the voice
    pub pitch_semitones: f32,
    /// Echo taps, applied in order onto the running mix
    pub echo_taps: Vec<EchoTap>,
    /// Low-pass cutoff frequency (Hz)
    pub low_pass_cutoff_hz: u32,
    /// Final fade-out length (ms)
    pub fade_out_ms: u32,
}

impl Default for EffectConfig {
    fn default() -> Self {
        Self {
            pitch_semitones: -3.0,
            echo_taps: vec![EchoTap::new(180, -8.0), EchoTap::new(420, -12.0)],
            low_pass_cutoff_hz: 4000,
            fade_out_ms: 700,
        }
    }
}

/// Apply the full ghost effect chain to a clip
///
/// Stage order: pitch shift, headroom trim, echo overlay, reversed-tail
/// shimmer, low-pass filter, fade-out. The output keeps the input channel
/// count; the sample rate is 44100 Hz whenever the pitch stage resamples.
///
/// # Errors
///
/// Returns `InvalidAudioFormat` for an empty buffer
pub fn apply_ghost_effect(buffer: &AudioBuffer, cfg: &EffectConfig) -> Result<AudioBuffer> {
    if buffer.is_empty() {
        return Err(Error::InvalidAudioFormat(
            "empty audio buffer".to_string(),
        ));
    }

    let channels = buffer.channels();
    let (pitched, rate) = pitch_shift(
        buffer.samples(),
        buffer.sample_rate(),
        channels,
        cfg.pitch_semitones,
    );

    let base = gain(&pitched, HEADROOM_TRIM_DB);
    let mut mixed = echo_overlay(&base, &cfg.echo_taps, rate, channels);

    // Reversed-tail shimmer: a faint pre-echo mixed in at position 0
    let mut shimmer = reverse_frames(&mixed, channels);
    fade_in(&mut shimmer, channels, rate, SHIMMER_FADE_IN_MS);
    fade_out(&mut shimmer, channels, rate, SHIMMER_FADE_OUT_MS);
    let shimmer = gain(&reverse_frames(&shimmer, channels), SHIMMER_GAIN_DB);
    overlay(&mut mixed, &shimmer, 0, channels);

    let mut filtered = low_pass(&mixed, channels, rate, cfg.low_pass_cutoff_hz);
    fade_out(&mut filtered, channels, rate, cfg.fade_out_ms);

    AudioBuffer::new(filtered, rate, channels)
}

/// Shift pitch by reinterpreting the clip at a scaled nominal rate, then
/// resampling to the fixed output rate
///
/// A zero-semitone shift is the identity: samples and rate pass through
/// untouched.
fn pitch_shift(samples: &[i16], rate: u32, channels: u16, semitones: f32) -> (Vec<i16>, u32) {
    if semitones == 0.0 {
        return (samples.to_vec(), rate);
    }

    let nominal = f64::from(rate) * 2f64.powf(f64::from(semitones) / 12.0);
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let nominal = (nominal.round() as u32).max(1);

    (
        resample(samples, channels, nominal, OUTPUT_SAMPLE_RATE),
        OUTPUT_SAMPLE_RATE,
    )
}

/// Linear-interpolation resampler, deterministic per input
fn resample(samples: &[i16], channels: u16, from_rate: u32, to_rate: u32) -> Vec<i16> {
    if from_rate == to_rate || samples.is_empty() {
        return samples.to_vec();
    }

    let ch = channels as usize;
    let frames_in = samples.len() / ch;
    #[allow(clippy::cast_possible_truncation)]
    let frames_out = (frames_in as u64 * u64::from(to_rate) / u64::from(from_rate)) as usize;
    let step = f64::from(from_rate) / f64::from(to_rate);

    let mut out = Vec::with_capacity(frames_out * ch);
    for f in 0..frames_out {
        #[allow(clippy::cast_precision_loss)]
        let src = f as f64 * step;
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let i0 = (src as usize).min(frames_in - 1);
        let i1 = (i0 + 1).min(frames_in - 1);
        #[allow(clippy::cast_precision_loss)]
        let frac = src - i0 as f64;

        for c in 0..ch {
            let s0 = f64::from(samples[i0 * ch + c]);
            let s1 = f64::from(samples[i1 * ch + c]);
            #[allow(clippy::cast_possible_truncation)]
            let v = (s0 + (s1 - s0) * frac).round().clamp(-32768.0, 32767.0) as i16;
            out.push(v);
        }
    }
    out
}

/// Mix attenuated copies of the dry signal into a running buffer, one tap at
/// a time
///
/// Later taps land on a buffer that already carries the earlier ones. Taps
/// never extend the clip; anything past the end is dropped.
fn echo_overlay(base: &[i16], taps: &[EchoTap], rate: u32, channels: u16) -> Vec<i16> {
    let mut mixed = base.to_vec();
    for tap in taps {
        let echo = gain(base, tap.gain_db);
        overlay(&mut mixed, &echo, frames_for_ms(tap.delay_ms, rate), channels);
    }
    mixed
}

/// Additively mix `copy` into `running` starting at `start_frame`, saturating
/// on overflow and truncating at the running buffer's end
fn overlay(running: &mut [i16], copy: &[i16], start_frame: usize, channels: u16) {
    let start = start_frame * channels as usize;
    if start >= running.len() {
        return;
    }
    for (dst, src) in running[start..].iter_mut().zip(copy) {
        *dst = dst.saturating_add(*src);
    }
}

/// Reverse the clip frame by frame, keeping channel order inside each frame
fn reverse_frames(samples: &[i16], channels: u16) -> Vec<i16> {
    let ch = channels as usize;
    let mut out = Vec::with_capacity(samples.len());
    for frame in samples.chunks(ch).rev() {
        out.extend_from_slice(frame);
    }
    out
}

/// Scale all samples by a dB gain, clamping to the valid range
fn gain(samples: &[i16], db: f32) -> Vec<i16> {
    let linear = db_to_linear(db);
    samples
        .iter()
        .map(|&s| {
            #[allow(clippy::cast_possible_truncation)]
            let v = (f32::from(s) * linear).round().clamp(-32768.0, 32767.0) as i16;
            v
        })
        .collect()
}

/// First-order RC low-pass filter, seeded with the first frame
fn low_pass(samples: &[i16], channels: u16, rate: u32, cutoff_hz: u32) -> Vec<i16> {
    let ch = channels as usize;
    if samples.len() < ch {
        return samples.to_vec();
    }

    let rc = 1.0 / (f64::from(cutoff_hz) * 2.0 * std::f64::consts::PI);
    let dt = 1.0 / f64::from(rate);
    let alpha = dt / (rc + dt);

    let mut out = samples.to_vec();
    let mut last: Vec<f64> = samples[..ch].iter().map(|&s| f64::from(s)).collect();
    let frames = samples.len() / ch;

    for f in 1..frames {
        for c in 0..ch {
            let idx = f * ch + c;
            last[c] += alpha * (f64::from(samples[idx]) - last[c]);
            #[allow(clippy::cast_possible_truncation)]
            let v = last[c].clamp(-32768.0, 32767.0) as i16;
            out[idx] = v;
        }
    }
    out
}

/// Linear fade-in over the first `ms` milliseconds
fn fade_in(samples: &mut [i16], channels: u16, rate: u32, ms: u32) {
    let ch = channels as usize;
    let frames = samples.len() / ch;
    let fade_frames = frames_for_ms(ms, rate).min(frames);
    if fade_frames == 0 {
        return;
    }

    for f in 0..fade_frames {
        #[allow(clippy::cast_precision_loss)]
        let factor = f as f32 / fade_frames as f32;
        scale_frame(samples, f, ch, factor);
    }
}

/// Linear fade-out over the final `ms` milliseconds; never changes the clip
/// length
fn fade_out(samples: &mut [i16], channels: u16, rate: u32, ms: u32) {
    let ch = channels as usize;
    let frames = samples.len() / ch;
    let fade_frames = frames_for_ms(ms, rate).min(frames);
    if fade_frames == 0 {
        return;
    }

    let start = frames - fade_frames;
    for i in 0..fade_frames {
        #[allow(clippy::cast_precision_loss)]
        let factor = (fade_frames - i) as f32 / fade_frames as f32;
        scale_frame(samples, start + i, ch, factor);
    }
}

fn scale_frame(samples: &mut [i16], frame: usize, ch: usize, factor: f32) {
    for c in 0..ch {
        let idx = frame * ch + c;
        #[allow(clippy::cast_possible_truncation)]
        let v = (f32::from(samples[idx]) * factor).round().clamp(-32768.0, 32767.0) as i16;
        samples[idx] = v;
    }
}

fn frames_for_ms(ms: u32, rate: u32) -> usize {
    #[allow(clippy::cast_possible_truncation)]
    let frames = (u64::from(ms) * u64::from(rate) / 1000) as usize;
    frames
}

fn db_to_linear(db: f32) -> f32 {
    10f32.powf(db / 20.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(frames: usize, rate: u32, amplitude: f32) -> Vec<i16> {
        (0..frames)
            .map(|i| {
                let t = i as f32 / rate as f32;
                (amplitude * (2.0 * std::f32::consts::PI * 220.0 * t).sin()) as i16
            })
            .collect()
    }

    #[test]
    fn zero_semitones_is_identity() {
        let samples = sine(4410, 22_050, 12_000.0);
        let (out, rate) = pitch_shift(&samples, 22_050, 1, 0.0);
        assert_eq!(out, samples);
        assert_eq!(rate, 22_050);
    }

    #[test]
    fn pitch_shift_resamples_to_output_rate() {
        let samples = sine(22_050, 22_050, 12_000.0);
        let (out, rate) = pitch_shift(&samples, 22_050, 1, -3.0);
        assert_eq!(rate, OUTPUT_SAMPLE_RATE);
        // Lower pitch reinterprets at a slower rate, so the clip gets longer
        assert!(out.len() > samples.len());
    }

    #[test]
    fn empty_tap_list_leaves_signal_unchanged() {
        let base = sine(8820, 44_100, 10_000.0);
        let mixed = echo_overlay(&base, &[], 44_100, 1);
        assert_eq!(mixed, base);
    }

    #[test]
    fn echo_taps_never_extend_the_clip() {
        let base = sine(4410, 44_100, 10_000.0);
        let taps = [EchoTap::new(50, -6.0), EchoTap::new(5000, -6.0)];
        let mixed = echo_overlay(&base, &taps, 44_100, 1);
        assert_eq!(mixed.len(), base.len());
    }

    #[test]
    fn reverse_frames_keeps_channel_interleave() {
        let stereo = vec![1, 2, 3, 4, 5, 6];
        assert_eq!(reverse_frames(&stereo, 2), vec![5, 6, 3, 4, 1, 2]);
        let mono = vec![1, 2, 3];
        assert_eq!(reverse_frames(&mono, 1), vec![3, 2, 1]);
    }

    #[test]
    fn overlay_saturates_instead_of_wrapping() {
        let mut running = vec![30_000i16; 8];
        let copy = vec![30_000i16; 8];
        overlay(&mut running, &copy, 0, 1);
        assert!(running.iter().all(|&s| s == i16::MAX));
    }

    #[test]
    fn fade_out_decays_monotonically_to_near_zero() {
        let mut samples = vec![20_000i16; 44_100];
        fade_out(&mut samples, 1, 44_100, 100);

        let fade_frames = frames_for_ms(100, 44_100);
        let tail = &samples[samples.len() - fade_frames..];
        for pair in tail.windows(2) {
            assert!(pair[1] <= pair[0]);
        }
        assert!(tail[tail.len() - 1].abs() <= 10);
        assert_eq!(samples.len(), 44_100);
    }

    #[test]
    fn fade_out_longer_than_clip_is_clamped() {
        let mut samples = vec![10_000i16; 100];
        fade_out(&mut samples, 1, 44_100, 10_000);
        assert_eq!(samples.len(), 100);
        assert!(samples[99].abs() < 200);
    }

    #[test]
    fn low_pass_preserves_dc() {
        let samples = vec![8000i16; 1000];
        let out = low_pass(&samples, 1, 44_100, 4000);
        assert_eq!(out, samples);
    }

    #[test]
    fn low_pass_attenuates_alternating_signal() {
        let samples: Vec<i16> = (0..1000)
            .map(|i| if i % 2 == 0 { 12_000 } else { -12_000 })
            .collect();
        let out = low_pass(&samples, 1, 44_100, 1000);
        let peak_in = samples.iter().map(|s| s.abs()).max().unwrap();
        let peak_out = out.iter().map(|s| s.abs()).max().unwrap();
        assert!(peak_out < peak_in / 2);
    }

    #[test]
    fn pipeline_is_deterministic() {
        let buffer =
            crate::audio::AudioBuffer::new(sine(22_050, 22_050, 14_000.0), 22_050, 1).unwrap();
        let cfg = EffectConfig::default();

        let a = apply_ghost_effect(&buffer, &cfg).unwrap();
        let b = apply_ghost_effect(&buffer, &cfg).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn empty_buffer_is_rejected() {
        let buffer = crate::audio::AudioBuffer::new(Vec::new(), 44_100, 1).unwrap();
        let result = apply_ghost_effect(&buffer, &EffectConfig::default());
        assert!(matches!(result, Err(crate::Error::InvalidAudioFormat(_))));
    }
}
