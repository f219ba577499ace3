/// Decoded audio (16-bit PCM, interleaved)
#[derive(Debug, Clone, PartialEq)]
pub struct PcmAudio {
    /// Raw audio samples (i16 PCM, interleaved)
    pub samples: Vec<i16>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of channels
    pub channels: u16,
}

impl PcmAudio {
    pub fn new(samples: Vec<i16>, sample_rate: u32, channels: u16) -> Self {
        Self {
            samples,
            sample_rate,
            channels,
        }
    }

    /// Build from little-endian 16-bit bytes. A trailing odd byte is dropped.
    pub fn from_le_bytes(bytes: &[u8], sample_rate: u32, channels: u16) -> Self {
        let samples = bytes
            .chunks_exact(2)
            .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
            .collect();
        Self::new(samples, sample_rate, channels)
    }

    pub fn frame_count(&self) -> usize {
        if self.channels == 0 {
            return 0;
        }
        self.samples.len() / self.channels as usize
    }

    pub fn duration_seconds(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frame_count() as f64 / self.sample_rate as f64
    }

    /// Mix all channels down to one by averaging
    pub fn to_mono(&self) -> PcmAudio {
        if self.channels <= 1 {
            return self.clone();
        }

        let channels = self.channels as usize;
        let samples = self
            .samples
            .chunks_exact(channels)
            .map(|frame| {
                let sum: i32 = frame.iter().map(|&s| s as i32).sum();
                (sum / channels as i32) as i16
            })
            .collect();

        PcmAudio::new(samples, self.sample_rate, 1)
    }

    /// Convert to `target_rate` by linear interpolation
    pub fn resample(&self, target_rate: u32) -> PcmAudio {
        if self.sample_rate == target_rate || self.sample_rate == 0 || target_rate == 0 {
            return self.clone();
        }

        let channels = self.channels.max(1) as usize;
        let frames = self.frame_count();
        if frames == 0 {
            return PcmAudio::new(Vec::new(), target_rate, self.channels);
        }

        let out_frames = (frames as u64 * target_rate as u64 / self.sample_rate as u64) as usize;
        let step = self.sample_rate as f64 / target_rate as f64;
        let mut samples = Vec::with_capacity(out_frames * channels);

        for i in 0..out_frames {
            let position = i as f64 * step;
            let index = (position.floor() as usize).min(frames - 1);
            let next = (index + 1).min(frames - 1);
            let frac = position - index as f64;

            for c in 0..channels {
                let a = self.samples[index * channels + c] as f64;
                let b = self.samples[next * channels + c] as f64;
                let value = a + (b - a) * frac;
                samples.push(value.round().clamp(i16::MIN as f64, i16::MAX as f64) as i16);
            }
        }

        PcmAudio::new(samples, target_rate, self.channels)
    }

    /// Little-endian byte stream, the wire format expected by the backend
    pub fn to_le_bytes(&self) -> Vec<u8> {
        self.samples.iter().flat_map(|s| s.to_le_bytes()).collect()
    }
}
