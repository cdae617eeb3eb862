//! Voice-activity segmentation that bounds how regions are handed to the
//! ASR+diarization provider.

use crate::media::Pcm;

/// Tunables for slicing continuous audio into speech regions before each
/// is sent to the transcription provider.
#[derive(Debug, Clone, Copy)]
pub struct VadConfig {
    pub min_segment_duration: f64,
    pub combine_duration: f64,
    pub combine_gap: f64,
    /// Energy threshold (RMS, 0..1) above which a frame counts as speech.
    pub energy_threshold: f64,
    pub frame_ms: u64,
}

impl Default for VadConfig {
    fn default() -> Self {
        Self {
            min_segment_duration: 1.0,
            combine_duration: 8.0,
            combine_gap: 1.0,
            energy_threshold: 0.01,
            frame_ms: 30,
        }
    }
}

/// A candidate speech region, in seconds, before ASR is run on it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpeechRegion {
    pub start: f64,
    pub end: f64,
}

impl SpeechRegion {
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// Slice `pcm` into speech regions using frame energy, then combine
/// adjacent regions separated by less than `combine_gap` up to
/// `combine_duration`, and drop anything shorter than
/// `min_segment_duration`.
pub fn detect_speech_regions(pcm: &Pcm, config: &VadConfig) -> Vec<SpeechRegion> {
    let frame_len = ((config.frame_ms as f64 / 1000.0) * pcm.sample_rate as f64).round() as usize;
    if frame_len == 0 || pcm.samples.is_empty() {
        return Vec::new();
    }

    let mut raw = Vec::new();
    let mut in_speech = false;
    let mut region_start = 0.0;

    for (i, chunk) in pcm.samples.chunks(frame_len).enumerate() {
        let rms = rms(chunk);
        let t = i as f64 * frame_len as f64 / pcm.sample_rate as f64;
        let is_speech = rms > config.energy_threshold;

        if is_speech && !in_speech {
            region_start = t;
            in_speech = true;
        } else if !is_speech && in_speech {
            raw.push(SpeechRegion { start: region_start, end: t });
            in_speech = false;
        }
    }
    if in_speech {
        let end = pcm.duration_secs();
        raw.push(SpeechRegion { start: region_start, end });
    }

    combine_and_filter(raw, config)
}

fn rms(samples: &[i16]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_sq: f64 = samples.iter().map(|&s| (s as f64 / i16::MAX as f64).powi(2)).sum();
    (sum_sq / samples.len() as f64).sqrt()
}

fn combine_and_filter(regions: Vec<SpeechRegion>, config: &VadConfig) -> Vec<SpeechRegion> {
    let mut combined: Vec<SpeechRegion> = Vec::new();
    for region in regions {
        if let Some(last) = combined.last_mut() {
            let gap = region.start - last.end;
            let merged_duration = region.end - last.start;
            if gap <= config.combine_gap && merged_duration <= config.combine_duration {
                last.end = region.end;
                continue;
            }
        }
        combined.push(region);
    }
    combined
        .into_iter()
        .filter(|r| r.duration() >= config.min_segment_duration)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tone_pcm(sample_rate: u32, pattern: &[(f64, bool)]) -> Pcm {
        let mut samples = Vec::new();
        for &(duration, speech) in pattern {
            let n = (sample_rate as f64 * duration) as usize;
            let amplitude = if speech { 5000 } else { 0 };
            samples.extend(std::iter::repeat(amplitude).take(n));
        }
        Pcm { sample_rate, samples }
    }

    #[test]
    fn detects_single_speech_region() {
        let pcm = tone_pcm(16000, &[(0.5, false), (2.0, true), (0.5, false)]);
        let config = VadConfig::default();
        let regions = detect_speech_regions(&pcm, &config);
        assert_eq!(regions.len(), 1);
        assert!((regions[0].start - 0.5).abs() < 0.1);
    }

    #[test]
    fn drops_regions_shorter_than_minimum() {
        let pcm = tone_pcm(16000, &[(0.2, true), (2.0, false)]);
        let config = VadConfig::default();
        let regions = detect_speech_regions(&pcm, &config);
        assert!(regions.is_empty());
    }

    #[test]
    fn combines_regions_within_gap() {
        let pcm = tone_pcm(16000, &[(1.5, true), (0.3, false), (1.5, true)]);
        let config = VadConfig::default();
        let regions = detect_speech_regions(&pcm, &config);
        assert_eq!(regions.len(), 1);
    }

    #[test]
    fn keeps_regions_separated_by_large_gap() {
        let pcm = tone_pcm(16000, &[(1.5, true), (2.0, false), (1.5, true)]);
        let config = VadConfig::default();
        let regions = detect_speech_regions(&pcm, &config);
        assert_eq!(regions.len(), 2);
    }
}
