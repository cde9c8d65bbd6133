//! Shared test utilities

use doorghost::AudioBuffer;

/// Generate a mono sine clip as a decoded audio buffer
#[must_use]
pub fn sine_buffer(frequency: f32, duration_secs: f32, sample_rate: u32) -> AudioBuffer {
    let num_samples = (sample_rate as f32 * duration_secs) as usize;
    let samples: Vec<i16> = (0..num_samples)
        .map(|i| {
            let t = i as f32 / sample_rate as f32;
            let v = 0.5 * (2.0 * std::f32::consts::PI * frequency * t).sin();
            (v * f32::from(i16::MAX)) as i16
        })
        .collect();
    AudioBuffer::new(samples, sample_rate, 1).expect("valid test buffer")
}

/// Generate an interleaved stereo sine clip
#[must_use]
pub fn stereo_sine_buffer(frequency: f32, duration_secs: f32, sample_rate: u32) -> AudioBuffer {
    let mono = sine_buffer(frequency, duration_secs, sample_rate);
    let samples: Vec<i16> = mono
        .samples()
        .iter()
        .flat_map(|&s| [s, s / 2])
        .collect();
    AudioBuffer::new(samples, sample_rate, 2).expect("valid test buffer")
}
