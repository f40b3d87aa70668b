//! VOX (voice-operated switch) energy tracking (§4.1.3), grounded on
//! `original_source/apps/app_rpt/rpt_vox.c`'s `dovox()` and the constants in
//! `app_rpt.h`.

/// 3-frame on-debounce, 20-frame off-debounce; energy floor/ceiling for the
/// non-engaged threshold branch.
const VOX_ON_DEBOUNCE_COUNT: u32 = 3;
const VOX_OFF_DEBOUNCE_COUNT: u32 = 20;
const VOX_MAX_THRESHOLD: f32 = 10_000.0;
const VOX_MIN_THRESHOLD: f32 = 3_000.0;

/// Per-channel VOX state. One of these lives on the node (for its own RX
/// channel) and one per link when that link runs VOX instead of a hardware
/// COR (§3.1/§3.2 "vox" fields).
#[derive(Debug, Clone)]
pub struct VoxTracker {
    speech_energy: f32,
    noise_energy: f32,
    enacount: u32,
    voxena: bool,
    /// `-1` in the original ("disabled") modeled as `None` here.
    enabled: Option<bool>,
    lastvox: bool,
}

impl VoxTracker {
    pub fn new(enable: bool) -> VoxTracker {
        VoxTracker {
            speech_energy: 0.0,
            noise_energy: 0.0,
            enacount: 0,
            voxena: false,
            enabled: if enable { None } else { Some(false) },
            lastvox: false,
        }
    }

    /// Feed one frame of samples, returning the debounced vox state
    /// (`dovox()`'s return value).
    pub fn process(&mut self, samples: &[i16]) -> bool {
        if self.enabled == Some(false) {
            return self.lastvox;
        }

        let esquare: f32 = samples.iter().map(|&s| (s as f32) * (s as f32)).sum();
        let energy = esquare.sqrt();

        if energy >= self.speech_energy {
            self.speech_energy += (energy - self.speech_energy) / 4.0;
        } else {
            self.speech_energy += (energy - self.speech_energy) / 64.0;
        }

        if energy >= self.noise_energy {
            self.noise_energy += (energy - self.noise_energy) / 64.0;
        } else {
            self.noise_energy += (energy - self.noise_energy) / 4.0;
        }

        let threshold = if self.voxena {
            self.speech_energy / 8.0
        } else {
            (self.speech_energy / 16.0).max(self.noise_energy * 2.0).min(VOX_MAX_THRESHOLD)
        };
        let threshold = threshold.max(VOX_MIN_THRESHOLD);

        if energy > threshold {
            if self.voxena {
                self.noise_energy *= 0.75;
            }
            self.voxena = true;
        } else {
            self.voxena = false;
        }

        if self.lastvox != self.voxena {
            let debounce = if self.lastvox { VOX_OFF_DEBOUNCE_COUNT } else { VOX_ON_DEBOUNCE_COUNT };
            self.enacount += 1;
            if self.enacount >= debounce {
                self.lastvox = self.voxena;
                self.enacount = 0;
            }
        } else {
            self.enacount = 0;
        }

        self.lastvox
    }

    pub fn is_keyed(&self) -> bool {
        self.lastvox
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loud_frame() -> Vec<i16> {
        vec![20_000; 160]
    }

    fn silent_frame() -> Vec<i16> {
        vec![0; 160]
    }

    #[test]
    fn disabled_tracker_never_keys() {
        let mut v = VoxTracker::new(false);
        for _ in 0..10 {
            assert!(!v.process(&loud_frame()));
        }
    }

    #[test]
    fn sustained_loud_audio_keys_after_on_debounce() {
        let mut v = VoxTracker::new(true);
        let mut keyed = false;
        for _ in 0..10 {
            keyed = v.process(&loud_frame());
            if keyed {
                break;
            }
        }
        assert!(keyed);
    }

    #[test]
    fn silence_never_keys() {
        let mut v = VoxTracker::new(true);
        for _ in 0..50 {
            assert!(!v.process(&silent_frame()));
        }
    }

    #[test]
    fn dropping_to_silence_eventually_unkeys() {
        let mut v = VoxTracker::new(true);
        for _ in 0..10 {
            v.process(&loud_frame());
        }
        assert!(v.is_keyed());
        let mut unkeyed = false;
        for _ in 0..30 {
            if !v.process(&silent_frame()) {
                unkeyed = true;
                break;
            }
        }
        assert!(unkeyed);
    }
}
