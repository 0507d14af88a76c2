//! Clip duration probing.
//!
//! The probed duration drives the supervisor's timeout and progress bar, so
//! probing degrades rather than fails: WAV durations come from parsing the
//! RIFF container directly, MP3 durations from an `ffprobe` invocation, and
//! every failure path falls back to a constant. A wrong fallback only makes
//! the bar wrong or cuts playback short; it never crashes the board.

use std::error::Error;
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;
use std::process::Command;

/// Determine the playback duration of `path` in seconds.
///
/// Never fails; any probe error yields `fallback`.
pub fn probe_duration(path: &Path, fallback: f32) -> f32 {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    let probed = match ext.as_str() {
        "wav" => wav_duration(path),
        "mp3" => mp3_duration(path),
        _ => return fallback,
    };

    match probed {
        Ok(secs) => secs,
        Err(e) => {
            log::warn!("duration probe failed for {}: {e}", path.display());
            fallback
        }
    }
}

/// Read a 4-byte chunk ID
fn read_fourcc(reader: &mut impl Read) -> Result<[u8; 4], Box<dyn Error>> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(buf)
}

/// Read a 4-byte little-endian size
fn read_u32_le(reader: &mut impl Read) -> Result<u32, Box<dyn Error>> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

fn read_u16_le(reader: &mut impl Read) -> Result<u16, Box<dyn Error>> {
    let mut buf = [0u8; 2];
    reader.read_exact(&mut buf)?;
    Ok(u16::from_le_bytes(buf))
}

/// Parse the RIFF container: frame count from the data chunk, sample rate
/// and frame size from the fmt chunk.
fn wav_duration(path: &Path) -> Result<f32, Box<dyn Error>> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);

    if &read_fourcc(&mut reader)? != b"RIFF" {
        return Err("not a RIFF file".into());
    }
    let _file_size = read_u32_le(&mut reader)?;
    if &read_fourcc(&mut reader)? != b"WAVE" {
        return Err("not a WAVE file".into());
    }

    let mut sample_rate: Option<u32> = None;
    let mut block_align: Option<u16> = None;
    let mut data_len: Option<u32> = None;

    loop {
        let chunk_id = match read_fourcc(&mut reader) {
            Ok(id) => id,
            Err(_) => break, // EOF reached
        };
        let chunk_size = read_u32_le(&mut reader)?;

        if &chunk_id == b"fmt " {
            if chunk_size < 16 {
                return Err("fmt chunk too short".into());
            }
            let _audio_format = read_u16_le(&mut reader)?;
            let _channels = read_u16_le(&mut reader)?;
            sample_rate = Some(read_u32_le(&mut reader)?);
            let _byte_rate = read_u32_le(&mut reader)?;
            block_align = Some(read_u16_le(&mut reader)?);
            let _bits_per_sample = read_u16_le(&mut reader)?;
            // Skip any fmt extension bytes
            reader.seek(SeekFrom::Current((chunk_size - 16) as i64))?;
        } else if &chunk_id == b"data" {
            data_len = Some(chunk_size);
            break;
        } else {
            reader.seek(SeekFrom::Current(chunk_size as i64))?;
        }

        // Pad byte if chunk size is odd
        if chunk_size % 2 == 1 {
            reader.seek(SeekFrom::Current(1))?;
        }
    }

    let rate = sample_rate.ok_or("fmt chunk not found")?;
    let align = block_align.ok_or("fmt chunk not found")?;
    let data = data_len.ok_or("data chunk not found")?;

    if rate == 0 || align == 0 {
        return Err("invalid fmt chunk".into());
    }

    let frames = data / align as u32;
    Ok(frames as f32 / rate as f32)
}

/// Ask ffprobe for the container duration field.
fn mp3_duration(path: &Path) -> Result<f32, Box<dyn Error>> {
    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-show_entries",
            "format=duration",
            "-of",
            "default=noprint_wrappers=1:nokey=1",
        ])
        .arg(path)
        .output()?;

    if !output.status.success() {
        return Err(format!("ffprobe exited with {}", output.status).into());
    }

    let text = String::from_utf8_lossy(&output.stdout);
    let secs: f32 = text.trim().parse()?;
    Ok(secs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::DEFAULT_FALLBACK_DURATION_SECS;
    use std::fs;
    use tempfile::tempdir;

    const FALLBACK: f32 = DEFAULT_FALLBACK_DURATION_SECS;

    fn create_test_wav(path: &Path, sample_rate: u32, sample_count: usize) {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for _ in 0..sample_count {
            writer.write_sample(0i16).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn test_wav_duration_from_header() {
        let dir = tempdir().unwrap();
        let wav = dir.path().join("tone.wav");
        create_test_wav(&wav, 44100, 22050);

        let secs = probe_duration(&wav, FALLBACK);
        assert!((secs - 0.5).abs() < 1e-4, "got {secs}");
    }

    #[test]
    fn test_wav_duration_one_second() {
        let dir = tempdir().unwrap();
        let wav = dir.path().join("tone.wav");
        create_test_wav(&wav, 8000, 8000);

        let secs = probe_duration(&wav, FALLBACK);
        assert!((secs - 1.0).abs() < 1e-4, "got {secs}");
    }

    #[test]
    fn test_malformed_wav_falls_back() {
        let dir = tempdir().unwrap();
        let bogus = dir.path().join("bogus.wav");
        fs::write(&bogus, b"this is not a wav file at all").unwrap();

        assert_eq!(probe_duration(&bogus, FALLBACK), FALLBACK);
    }

    #[test]
    fn test_missing_file_falls_back() {
        let missing = Path::new("/nonexistent/clip.wav");
        assert_eq!(probe_duration(missing, FALLBACK), FALLBACK);
    }

    #[test]
    fn test_unknown_extension_falls_back() {
        let dir = tempdir().unwrap();
        let other = dir.path().join("clip.ogg");
        fs::write(&other, b"whatever").unwrap();

        assert_eq!(probe_duration(&other, FALLBACK), FALLBACK);
    }

    #[test]
    fn test_missing_mp3_falls_back() {
        // ffprobe is either absent or fails on a nonexistent path; both
        // routes must yield the fallback rather than an error.
        let missing = Path::new("/nonexistent/clip.mp3");
        assert_eq!(probe_duration(missing, FALLBACK), FALLBACK);
    }

    #[test]
    fn test_custom_fallback_value() {
        let missing = Path::new("/nonexistent/clip.flac");
        assert_eq!(probe_duration(missing, 7.5), 7.5);
    }
}
