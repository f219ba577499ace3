use super::pcm::PcmAudio;
use anyhow::{Context, Result};
use std::io::Cursor;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::{Hint, ProbeResult};
use tracing::{debug, info, warn};

/// Whether `data` looks like audio we can decode
pub fn is_supported(data: &[u8], extension: Option<&str>) -> bool {
    hound::WavReader::new(Cursor::new(data)).is_ok() || probe(data, extension).is_ok()
}

/// Decode any supported container/codec into interleaved 16-bit PCM.
///
/// Integer PCM WAV is read directly with hound; everything else goes through
/// symphonia, with `extension` as a probe hint.
pub fn decode(data: &[u8], extension: Option<&str>) -> Result<PcmAudio> {
    if let Some(pcm) = decode_wav_pcm(data)? {
        return Ok(pcm);
    }
    decode_with_symphonia(data, extension)
}

/// Decode and convert to mono at `sample_rate`, the format the backend expects.
pub fn normalize(data: &[u8], extension: Option<&str>, sample_rate: u32) -> Result<PcmAudio> {
    let decoded = decode(data, extension)?;

    info!(
        "Source audio: {}Hz, {} channels, {:.1}s",
        decoded.sample_rate,
        decoded.channels,
        decoded.duration_seconds()
    );

    Ok(decoded.to_mono().resample(sample_rate))
}

/// Bytes to stream to the backend: 16-bit mono PCM at `sample_rate`, or the
/// payload unchanged when it is not recognised as audio.
pub fn prepare(data: Vec<u8>, extension: Option<&str>, sample_rate: u32) -> Result<Vec<u8>> {
    if !is_supported(&data, extension) {
        warn!("Unsupported audio format, sending {} bytes as-is", data.len());
        return Ok(data);
    }

    let pcm = normalize(&data, extension, sample_rate)?;
    info!("Audio converted to PCM ({:.1}s at {}Hz)", pcm.duration_seconds(), pcm.sample_rate);
    Ok(pcm.to_le_bytes())
}

fn decode_wav_pcm(data: &[u8]) -> Result<Option<PcmAudio>> {
    let reader = match hound::WavReader::new(Cursor::new(data)) {
        Ok(reader) => reader,
        Err(_) => return Ok(None),
    };

    let spec = reader.spec();
    if spec.sample_format != hound::SampleFormat::Int || spec.bits_per_sample > 32 {
        debug!("WAV is {:?}/{} bit, decoding with symphonia", spec.sample_format, spec.bits_per_sample);
        return Ok(None);
    }

    let bits = spec.bits_per_sample;
    let samples: Vec<i16> = if bits == 16 {
        reader
            .into_samples::<i16>()
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to read WAV samples")?
    } else {
        reader
            .into_samples::<i32>()
            .map(|sample| sample.map(|s| scale_to_i16(s, bits)))
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to read WAV samples")?
    };

    Ok(Some(PcmAudio::new(samples, spec.sample_rate, spec.channels)))
}

fn scale_to_i16(sample: i32, bits: u16) -> i16 {
    if bits > 16 {
        (sample >> (bits - 16)) as i16
    } else {
        (sample << (16 - bits)) as i16
    }
}

fn probe(data: &[u8], extension: Option<&str>) -> Result<ProbeResult> {
    let source = MediaSourceStream::new(Box::new(Cursor::new(data.to_vec())), Default::default());

    let mut hint = Hint::new();
    if let Some(extension) = extension {
        hint.with_extension(extension);
    }

    symphonia::default::get_probe()
        .format(&hint, source, &FormatOptions::default(), &MetadataOptions::default())
        .context("Unsupported audio format")
}

fn decode_with_symphonia(data: &[u8], extension: Option<&str>) -> Result<PcmAudio> {
    let mut format = probe(data, extension)?.format;

    let track = format
        .tracks()
        .iter()
        .find(|track| track.codec_params.codec != CODEC_TYPE_NULL)
        .context("No audio track found")?;
    let track_id = track.id;
    let mut sample_rate = track.codec_params.sample_rate;
    let mut channels = track.codec_params.channels.map(|c| c.count() as u16);

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .context("Unsupported audio codec")?;

    let mut samples = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(e).context("Failed to read audio packet"),
        };

        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                let spec = *decoded.spec();
                sample_rate.get_or_insert(spec.rate);
                channels.get_or_insert(spec.channels.count() as u16);

                let mut buffer = SampleBuffer::<i16>::new(decoded.capacity() as u64, spec);
                buffer.copy_interleaved_ref(decoded);
                samples.extend_from_slice(buffer.samples());
            }
            Err(SymphoniaError::DecodeError(e)) => {
                warn!("Skipping undecodable audio packet: {}", e);
            }
            Err(e) => return Err(e).context("Failed to decode audio"),
        }
    }

    let sample_rate = sample_rate.context("Audio stream has no sample rate")?;
    let channels = channels.context("Audio stream has no channel layout")?;

    Ok(PcmAudio::new(samples, sample_rate, channels))
}
