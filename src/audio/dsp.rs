//! Sample-level arithmetic for the capture pipeline
//!
//! Everything here is allocation-free when the caller reuses its output
//! buffers, so it can run inside a real-time audio callback.

/// dBFS reported for digital silence
pub const DBFS_FLOOR: f32 = -100.0;

/// Root-mean-square amplitude of a window
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum: f64 = samples.iter().map(|&s| f64::from(s) * f64::from(s)).sum();
    (sum / samples.len() as f64).sqrt() as f32
}

/// Loudness relative to full scale
pub fn dbfs(rms: f32) -> f32 {
    if rms > 0.0 {
        20.0 * rms.log10()
    } else {
        DBFS_FLOOR
    }
}

/// Number of output samples when resampling `input_len` samples
///
/// Equals floor(input_len / (native / target)), computed in integers.
pub fn resampled_len(input_len: usize, native_rate: u32, target_rate: u32) -> usize {
    if native_rate == target_rate {
        return input_len;
    }
    (input_len as u64 * u64::from(target_rate) / u64::from(native_rate)) as usize
}

/// Linear-interpolation resampler
///
/// Output sample `j` reads source position `j * native / target` and blends
/// the two samples around it; at the last source sample it takes that sample
/// alone. Identity when the rates match. `out` is cleared first and never
/// grows beyond its capacity if sized with [`resampled_len`].
pub fn resample_linear(input: &[f32], native_rate: u32, target_rate: u32, out: &mut Vec<f32>) {
    out.clear();
    if native_rate == target_rate {
        out.extend_from_slice(input);
        return;
    }

    let len = resampled_len(input.len(), native_rate, target_rate);
    let last = input.len().saturating_sub(1);

    for j in 0..len {
        let position = (j as u64 * u64::from(native_rate)) as f64 / f64::from(target_rate);
        let index = (position.floor() as usize).min(last);
        let fraction = (position - index as f64) as f32;

        let sample = if index + 1 < input.len() {
            input[index] * (1.0 - fraction) + input[index + 1] * fraction
        } else {
            input[index]
        };
        out.push(sample);
    }
}

/// Convert a float sample to 16-bit PCM
///
/// Clamps to [-1, 1]; negative values scale by 32768, the rest by 32767.
pub fn quantize(sample: f32) -> i16 {
    let s = sample.clamp(-1.0, 1.0);
    if s < 0.0 {
        (s * 32768.0) as i16
    } else {
        (s * 32767.0) as i16
    }
}

/// Quantize `samples` into little-endian PCM16 bytes
///
/// `out` is cleared first.
pub fn encode_pcm16(samples: &[f32], out: &mut Vec<u8>) {
    out.clear();
    for &s in samples {
        out.extend_from_slice(&quantize(s).to_le_bytes());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dbfs_reference_points() {
        assert_eq!(dbfs(0.0), DBFS_FLOOR);
        assert_eq!(dbfs(1.0), 0.0);
        assert!((dbfs(0.5) - (-6.0206)).abs() < 1e-3);
    }

    #[test]
    fn test_rms_constant_signal() {
        assert!((rms(&[0.5; 480]) - 0.5).abs() < 1e-6);
        assert_eq!(rms(&[0.0; 10]), 0.0);
        assert_eq!(rms(&[]), 0.0);
    }

    #[test]
    fn test_resampled_len_matches_floor() {
        let rates = [8_000u32, 16_000, 22_050, 24_000, 32_000, 44_100, 48_000, 96_000];
        for &native in &rates {
            let window = (native / 10) as usize;
            for &target in &rates {
                let mut out = Vec::new();
                resample_linear(&vec![0.1; window], native, target, &mut out);

                let expected = (window as f64 * target as f64 / native as f64).floor() as usize;
                assert_eq!(out.len(), expected, "{} -> {}", native, target);
            }
        }
    }

    #[test]
    fn test_resample_identity() {
        let input: Vec<f32> = (0..1600).map(|i| (i as f32 / 1600.0) - 0.5).collect();
        let mut out = Vec::new();

        resample_linear(&input, 16_000, 16_000, &mut out);
        assert_eq!(out, input);
    }

    #[test]
    fn test_resample_interpolates() {
        // 3:2 ratio, position 1.5 blends samples 1 and 2
        let input = [0.0, 0.2, 0.4, 0.6];
        let mut out = Vec::new();

        resample_linear(&input, 48_000, 32_000, &mut out);

        assert_eq!(out.len(), 2);
        assert!((out[0] - 0.0).abs() < 1e-6);
        assert!((out[1] - 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_upsample_boundary_uses_last_sample() {
        let input = [0.25, 0.75];
        let mut out = Vec::new();

        resample_linear(&input, 8_000, 16_000, &mut out);

        assert_eq!(out.len(), 4);
        assert!((out[1] - 0.5).abs() < 1e-6);
        assert_eq!(out[2], 0.75);
        assert_eq!(out[3], 0.75);
    }

    #[test]
    fn test_quantize_within_one_of_ideal() {
        for i in -1000..=1000 {
            let s = i as f32 / 1000.0;
            let ideal = if s < 0.0 { s * 32768.0 } else { s * 32767.0 };
            let q = quantize(s) as f32;
            assert!((q - ideal).abs() <= 1.0, "sample {} -> {}", s, q);
        }
    }

    #[test]
    fn test_quantize_clamps() {
        assert_eq!(quantize(1.0), 32767);
        assert_eq!(quantize(-1.0), -32768);
        assert_eq!(quantize(3.5), 32767);
        assert_eq!(quantize(-7.0), -32768);
        assert_eq!(quantize(0.0), 0);
    }

    #[test]
    fn test_encode_little_endian() {
        let mut out = Vec::new();
        encode_pcm16(&[1.0, -1.0], &mut out);

        assert_eq!(out, vec![0xFF, 0x7F, 0x00, 0x80]);
    }
}
