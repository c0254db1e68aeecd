use std::fs::File;
use std::path::Path;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::{MediaSource, MediaSourceStream};
use symphonia::core::meta::{MetadataOptions, StandardTagKey};
use symphonia::core::probe::Hint;

use crate::error::{SabiError, SabiResult};

/// Closed sum type over the wire sample encodings the streaming protocol
/// declares. Replaces runtime string dispatch on `"float32"`/`"int16"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleEncoding {
    Float32,
    Int16,
}

impl SampleEncoding {
    pub fn parse(literal: &str) -> SabiResult<Self> {
        match literal {
            "float32" => Ok(SampleEncoding::Float32),
            "int16" => Ok(SampleEncoding::Int16),
            other => Err(SabiError::UnsupportedFormat(other.to_string())),
        }
    }

    /// Size in bytes of a single sample of this encoding.
    pub fn sample_size(self) -> usize {
        match self {
            SampleEncoding::Float32 => 4,
            SampleEncoding::Int16 => 2,
        }
    }

    /// Decode a little-endian interleaved byte buffer into `[-1, 1]` floats.
    /// `bytes` must be a whole number of samples; any trailing partial
    /// sample is ignored.
    pub fn decode_interleaved(self, bytes: &[u8]) -> Vec<f32> {
        let sample_size = self.sample_size();
        let whole = bytes.len() / sample_size;
        let mut out = Vec::with_capacity(whole);
        match self {
            SampleEncoding::Float32 => {
                for chunk in bytes[..whole * sample_size].chunks_exact(4) {
                    out.push(f32::from_le_bytes(chunk.try_into().unwrap()));
                }
            }
            SampleEncoding::Int16 => {
                for chunk in bytes[..whole * sample_size].chunks_exact(2) {
                    let raw = i16::from_le_bytes(chunk.try_into().unwrap());
                    out.push(raw as f32 / i16::MAX as f32);
                }
            }
        }
        out
    }
}

/// A decoded, not-yet-downmixed audio buffer: interleaved samples, their
/// channel count and native sample rate.
pub struct DecodedAudio {
    pub interleaved: Vec<f32>,
    pub channels: usize,
    pub sample_rate: u32,
}

/// Decode any container the linked symphonia codec set supports into
/// interleaved f32 samples. Downmixing and resampling are the caller's job
/// (see `audio::preprocess`), so this stays a pure decode step.
pub fn decode_file<P: AsRef<Path>>(path: P) -> SabiResult<DecodedAudio> {
    let path = path.as_ref();
    let file = File::open(path)
        .map_err(|e| SabiError::DecodeError(format!("{}: {}", path.display(), e)))?;

    let source: Box<dyn MediaSource> = Box::new(file);
    let stream = MediaSourceStream::new(source, Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            stream,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| SabiError::DecodeError(e.to_string()))?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .first()
        .ok_or_else(|| SabiError::DecodeError("no audio track".to_string()))?;
    let track_id = track.id;
    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or_else(|| SabiError::DecodeError("unknown sample rate".to_string()))?;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| SabiError::DecodeError(e.to_string()))?;

    let mut interleaved = Vec::new();
    let mut channels = 0usize;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(_)) => break,
            Err(e) => return Err(SabiError::DecodeError(e.to_string())),
        };
        if packet.track_id() != track_id {
            continue;
        }

        let decoded = decoder
            .decode(&packet)
            .map_err(|e| SabiError::DecodeError(e.to_string()))?;
        channels = decoded.spec().channels.count();

        let mut buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, *decoded.spec());
        buf.copy_interleaved_ref(decoded);
        interleaved.extend_from_slice(buf.samples());
    }

    if channels == 0 {
        return Err(SabiError::DecodeError("no decodable packets".to_string()));
    }

    Ok(DecodedAudio {
        interleaved,
        channels,
        sample_rate,
    })
}

/// Cheap duration probe: reads container/track metadata only, without
/// constructing a decoder or touching a single packet. Lets the indexer
/// reject an over-long file before paying for a full decode + resample.
pub fn probe_duration<P: AsRef<Path>>(path: P) -> SabiResult<f64> {
    let path = path.as_ref();
    let file = File::open(path)
        .map_err(|e| SabiError::DecodeError(format!("{}: {}", path.display(), e)))?;

    let source: Box<dyn MediaSource> = Box::new(file);
    let stream = MediaSourceStream::new(source, Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            stream,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| SabiError::DecodeError(e.to_string()))?;

    let track = probed
        .format
        .tracks()
        .first()
        .ok_or_else(|| SabiError::DecodeError("no audio track".to_string()))?;

    let n_frames = track
        .codec_params
        .n_frames
        .ok_or_else(|| SabiError::DecodeError("unknown frame count".to_string()))?;
    let time_base = track
        .codec_params
        .time_base
        .ok_or_else(|| SabiError::DecodeError("unknown time base".to_string()))?;

    let time = time_base.calc_time(n_frames);
    Ok(time.seconds as f64 + time.frac)
}

/// Metadata tags read off a file, with the filename-stem fallback the
/// indexer applies when a tag is absent.
#[derive(Debug, Clone)]
pub struct SongTags {
    pub title: String,
    pub artist: Option<String>,
    pub album: Option<String>,
}

pub fn read_tags<P: AsRef<Path>>(path: P) -> SongTags {
    let path = path.as_ref();
    let fallback_title = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string_lossy().to_string());

    let tags = read_tags_inner(path);
    match tags {
        Some((title, artist, album)) => SongTags {
            title: title.unwrap_or(fallback_title),
            artist,
            album,
        },
        None => SongTags {
            title: fallback_title,
            artist: None,
            album: None,
        },
    }
}

fn read_tags_inner(path: &Path) -> Option<(Option<String>, Option<String>, Option<String>)> {
    let file = File::open(path).ok()?;
    let source: Box<dyn MediaSource> = Box::new(file);
    let stream = MediaSourceStream::new(source, Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let mut probed = symphonia::default::get_probe()
        .format(
            &hint,
            stream,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .ok()?;

    let mut title = None;
    let mut artist = None;
    let mut album = None;

    let metadata = probed.format.metadata();
    if let Some(revision) = metadata.current() {
        for tag in revision.tags() {
            match tag.std_key {
                Some(StandardTagKey::TrackTitle) => title = Some(tag.value.to_string()),
                Some(StandardTagKey::Artist) => artist = Some(tag.value.to_string()),
                Some(StandardTagKey::Album) => album = Some(tag.value.to_string()),
                _ => {}
            }
        }
    }

    Some((title, artist, album))
}

/// Embedded cover art, if any, read the same way tags are.
pub fn read_cover_art<P: AsRef<Path>>(path: P) -> Option<(String, Vec<u8>)> {
    let path = path.as_ref();
    let file = File::open(path).ok()?;
    let source: Box<dyn MediaSource> = Box::new(file);
    let stream = MediaSourceStream::new(source, Default::default());

    let mut probed = symphonia::default::get_probe()
        .format(
            &Hint::new(),
            stream,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .ok()?;

    let metadata = probed.format.metadata();
    let revision = metadata.current()?;
    let visual = revision.visuals().iter().find(|v| !v.data.is_empty())?;
    Some((visual.media_type.clone(), visual.data.to_vec()))
}
