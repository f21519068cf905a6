//! Log-mel spectrogram frontend for the ONNX speaker encoder.
//!
//! Converts raw 16 kHz mono waveforms into 80-band log mel frames, the
//! input layout WeSpeaker-style embedding models expect: Hann-windowed
//! frames, a real FFT power spectrum, and a triangular mel filterbank.

use std::f32::consts::PI;
use std::sync::Arc;

use ndarray::{Array2, ArrayView1};
use realfft::{RealFftPlanner, RealToComplex};

use crate::{DiarizationError, Result};

/// Parameters of the mel frontend
#[derive(Debug, Clone)]
pub struct MelConfig {
    /// Sample rate of input audio (the embedding models expect 16 kHz)
    pub sample_rate: u32,
    /// FFT size
    pub n_fft: usize,
    /// Hop between frames, in samples
    pub hop_length: usize,
    /// Analysis window length, in samples
    pub win_length: usize,
    /// Number of mel bands
    pub n_mels: usize,
    /// Lower edge of the mel filterbank (Hz)
    pub fmin: f32,
    /// Upper edge of the mel filterbank (Hz)
    pub fmax: f32,
    /// Offset added before the log for numerical stability
    pub log_offset: f32,
}

impl Default for MelConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16_000,
            n_fft: 512,
            hop_length: 160, // 10 ms at 16 kHz
            win_length: 400, // 25 ms at 16 kHz
            n_mels: 80,
            fmin: 20.0,
            fmax: 7600.0,
            log_offset: 1e-6,
        }
    }
}

/// Mel spectrogram generator with a pre-planned FFT and pre-computed
/// filterbank
pub struct MelFrontend {
    config: MelConfig,
    fft: Arc<dyn RealToComplex<f32>>,
    filterbank: Array2<f32>,
    window: Vec<f32>,
    // Scratch buffers reused across frames
    fft_input: Vec<f32>,
    fft_output: Vec<realfft::num_complex::Complex<f32>>,
}

impl MelFrontend {
    pub fn new(config: MelConfig) -> Self {
        let window: Vec<f32> = (0..config.win_length)
            .map(|i| 0.5 * (1.0 - (2.0 * PI * i as f32 / (config.win_length - 1) as f32).cos()))
            .collect();

        let filterbank = mel_filterbank(
            config.n_mels,
            config.n_fft / 2 + 1,
            config.sample_rate as f32,
            config.fmin,
            config.fmax,
        );

        let mut planner = RealFftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(config.n_fft);

        let fft_input = vec![0.0f32; config.n_fft];
        let fft_output = vec![realfft::num_complex::Complex::new(0.0, 0.0); config.n_fft / 2 + 1];

        Self {
            config,
            fft,
            filterbank,
            window,
            fft_input,
            fft_output,
        }
    }

    /// Compute log mel frames for a span of audio.
    ///
    /// Returns one `n_mels`-length row per frame.
    pub fn compute(&mut self, audio: &[f32]) -> Result<Vec<Vec<f32>>> {
        if audio.is_empty() {
            return Err(DiarizationError::InvalidAudio("empty audio".to_string()));
        }

        let n_frames = if audio.len() >= self.config.win_length {
            1 + (audio.len() - self.config.win_length) / self.config.hop_length
        } else {
            1
        };

        let mut frames = Vec::with_capacity(n_frames);
        let mut power = vec![0.0f32; self.config.n_fft / 2 + 1];

        for frame_idx in 0..n_frames {
            let start = frame_idx * self.config.hop_length;
            let end = (start + self.config.win_length).min(audio.len());

            self.fft_input.fill(0.0);
            for (i, &sample) in audio[start..end].iter().enumerate() {
                self.fft_input[i] = sample * self.window[i];
            }

            self.fft
                .process(&mut self.fft_input, &mut self.fft_output)
                .map_err(|e| DiarizationError::Mel(format!("FFT failed: {e}")))?;

            for (p, c) in power.iter_mut().zip(self.fft_output.iter()) {
                *p = c.re * c.re + c.im * c.im;
            }

            let power_view = ArrayView1::from(&power[..]);
            let frame: Vec<f32> = (0..self.config.n_mels)
                .map(|m| {
                    let energy = self.filterbank.row(m).dot(&power_view);
                    (energy + self.config.log_offset).ln()
                })
                .collect();
            frames.push(frame);
        }

        Ok(frames)
    }

    /// Mean linear-scale energy of the mel frames, for silence gating
    pub fn mean_energy(frames: &[Vec<f32>]) -> f32 {
        frames
            .iter()
            .flat_map(|frame| frame.iter())
            .map(|v| v.exp())
            .sum::<f32>()
            / (frames.len().max(1) as f32)
    }
}

fn hz_to_mel(hz: f32) -> f32 {
    2595.0 * (1.0 + hz / 700.0).log10()
}

fn mel_to_hz(mel: f32) -> f32 {
    700.0 * (10.0_f32.powf(mel / 2595.0) - 1.0)
}

/// Triangular mel filterbank as an `n_mels x n_fft_bins` matrix
fn mel_filterbank(
    n_mels: usize,
    n_fft_bins: usize,
    sample_rate: f32,
    fmin: f32,
    fmax: f32,
) -> Array2<f32> {
    let mel_min = hz_to_mel(fmin);
    let mel_max = hz_to_mel(fmax);

    // n_mels + 2 evenly spaced mel points, mapped back to FFT bin space
    let bin_points: Vec<f32> = (0..=n_mels + 1)
        .map(|i| {
            let mel = mel_min + (mel_max - mel_min) * (i as f32) / ((n_mels + 1) as f32);
            (n_fft_bins as f32 - 1.0) * mel_to_hz(mel) / (sample_rate / 2.0)
        })
        .collect();

    let mut filterbank = Array2::zeros((n_mels, n_fft_bins));
    for m in 0..n_mels {
        let left = bin_points[m];
        let center = bin_points[m + 1];
        let right = bin_points[m + 2];

        for bin in 0..n_fft_bins {
            let bin_f = bin as f32;
            if bin_f >= left && bin_f < center {
                filterbank[[m, bin]] = (bin_f - left) / (center - left);
            } else if bin_f >= center && bin_f <= right {
                filterbank[[m, bin]] = (right - bin_f) / (right - center);
            }
        }
    }

    filterbank
}
