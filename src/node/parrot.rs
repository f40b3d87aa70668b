//! Parrot mode record/playback (§4.1 step 2 "Parrot", §6.3). Records the
//! keyed audio to a per-session WAV file and hands back the path for
//! `telemetry::Mode::Parrot` to play once `parrottime` elapses after unkey.
//!
//! Grounded on the "sound-file format" placeholder named in the config
//! schema: 8 kHz mono signed 16-bit PCM, a hand-written WAV header rather
//! than a dependency, matching the teacher's preference for small
//! hand-rolled framing over a heavyweight crate for a fixed format.

use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::error::{Result, RptError};

const SAMPLE_RATE: u32 = 8_000;
const BITS_PER_SAMPLE: u16 = 16;
const CHANNELS: u16 = 1;

fn wav_header(data_len: u32) -> [u8; 44] {
    let byte_rate = SAMPLE_RATE * CHANNELS as u32 * (BITS_PER_SAMPLE as u32 / 8);
    let block_align = CHANNELS * (BITS_PER_SAMPLE / 8);
    let mut h = [0u8; 44];
    h[0..4].copy_from_slice(b"RIFF");
    h[4..8].copy_from_slice(&(36 + data_len).to_le_bytes());
    h[8..12].copy_from_slice(b"WAVE");
    h[12..16].copy_from_slice(b"fmt ");
    h[16..20].copy_from_slice(&16u32.to_le_bytes());
    h[20..22].copy_from_slice(&1u16.to_le_bytes()); // PCM
    h[22..24].copy_from_slice(&CHANNELS.to_le_bytes());
    h[24..28].copy_from_slice(&SAMPLE_RATE.to_le_bytes());
    h[28..32].copy_from_slice(&byte_rate.to_le_bytes());
    h[32..34].copy_from_slice(&block_align.to_le_bytes());
    h[34..36].copy_from_slice(&BITS_PER_SAMPLE.to_le_bytes());
    h[36..40].copy_from_slice(b"data");
    h[40..44].copy_from_slice(&data_len.to_le_bytes());
    h
}

/// One in-progress recording, opened on key-down and closed on key-up.
pub struct ParrotRecorder {
    path: PathBuf,
    file: File,
    samples_written: u32,
}

impl ParrotRecorder {
    /// `node_name`/`session` match `/tmp/parrot_<node>_<session>.wav`.
    pub fn start(dir: &Path, node_name: &str, session: u64) -> Result<ParrotRecorder> {
        let path = dir.join(format!("parrot_{node_name}_{session}.wav"));
        let mut file = File::create(&path).map_err(|e| RptError::io("parrot create", e))?;
        file.write_all(&wav_header(0)).map_err(|e| RptError::io("parrot header write", e))?;
        Ok(ParrotRecorder { path, file, samples_written: 0 })
    }

    pub fn write_samples(&mut self, samples: &[i16]) -> Result<()> {
        for s in samples {
            self.file.write_all(&s.to_le_bytes()).map_err(|e| RptError::io("parrot sample write", e))?;
        }
        self.samples_written += samples.len() as u32;
        Ok(())
    }

    /// Patch the WAV header's length fields now that the total is known,
    /// and return the path for a `telemetry::Mode::Parrot` item to play.
    pub fn finish(mut self) -> Result<PathBuf> {
        use std::io::{Seek, SeekFrom};
        let data_len = self.samples_written * (BITS_PER_SAMPLE as u32 / 8);
        self.file.seek(SeekFrom::Start(0)).map_err(|e| RptError::io("parrot header patch seek", e))?;
        self.file.write_all(&wav_header(data_len)).map_err(|e| RptError::io("parrot header patch write", e))?;
        self.file.flush().map_err(|e| RptError::io("parrot flush", e))?;
        Ok(self.path)
    }
}

/// Remove a played-back parrot file; swallow a missing file since flush or
/// a repeated playback request can race a prior cleanup.
pub fn cleanup(path: &Path) -> Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(RptError::io("parrot cleanup", e)),
    }
}
