use std::collections::HashMap;
use std::path::Path;

use log::debug;
use serde::Deserialize;
use tokio::process::Command;

use super::{FieldValue, MetadataError, MetadataRecord};

#[derive(Debug, Default, Deserialize)]
pub struct ProbeOutput {
    #[serde(default)]
    pub streams: Vec<ProbeStream>,
    #[serde(default)]
    pub format: Option<ProbeFormat>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ProbeStream {
    pub codec_type: Option<String>,
    pub codec_name: Option<String>,
    pub profile: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub pix_fmt: Option<String>,
    pub r_frame_rate: Option<String>,
    pub avg_frame_rate: Option<String>,
    pub sample_rate: Option<String>,
    pub channels: Option<u64>,
    pub channel_layout: Option<String>,
    #[serde(default)]
    pub tags: HashMap<String, String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ProbeFormat {
    pub format_name: Option<String>,
    pub format_long_name: Option<String>,
    pub duration: Option<String>,
    pub size: Option<String>,
    pub bit_rate: Option<String>,
    pub nb_streams: Option<u64>,
    #[serde(default)]
    pub tags: HashMap<String, String>,
}

/// Runs ffprobe on a local file and turns its report into a record.
pub async fn probe_file(
    ffprobe: &str,
    path: &Path,
    file_name: &str,
) -> Result<MetadataRecord, MetadataError> {
    let output = Command::new(ffprobe)
        .arg("-v")
        .arg("error")
        .arg("-print_format")
        .arg("json")
        .arg("-show_format")
        .arg("-show_streams")
        .arg(path)
        .output()
        .await?;

    if !output.status.success() {
        return Err(MetadataError::ProbeFailed {
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    let probe: ProbeOutput = serde_json::from_slice(&output.stdout)?;
    debug!(
        "ffprobe found {} stream(s) in {:?}",
        probe.streams.len(),
        file_name
    );

    let record = record_from_probe(file_name, &probe);
    // Only the file name means ffprobe understood nothing
    if record.len() <= 1 {
        return Err(MetadataError::Empty);
    }
    Ok(record)
}

// Tag keys differ between containers (EXIF, QuickTime, Matroska), so each
// field is looked up under several names.
const TAG_FIELDS: [(&str, &[&str]); 5] = [
    ("Дата створення", &["creation_time", "date"]),
    ("Кодувальник", &["encoder", "encoded_by"]),
    ("Виробник пристрою", &["com.apple.quicktime.make", "make", "Make"]),
    ("Модель пристрою", &["com.apple.quicktime.model", "model", "Model"]),
    ("Програмне забезпечення", &["com.apple.quicktime.software", "software", "Software"]),
];

pub fn record_from_probe(file_name: &str, probe: &ProbeOutput) -> MetadataRecord {
    let mut record = MetadataRecord::new();
    record.insert("Назва файлу", FieldValue::Text(file_name.to_string()));

    if let Some(format) = &probe.format {
        if let Some(name) = format
            .format_long_name
            .as_deref()
            .or(format.format_name.as_deref())
        {
            record.insert("Контейнер", FieldValue::Text(name.to_string()));
        }
        if let Some(size) = parse_integer(format.size.as_deref()) {
            record.insert("Розмір файлу (байт)", FieldValue::Integer(size));
        }
        if let Some(duration) = parse_decimal(format.duration.as_deref()) {
            record.insert("Тривалість (с)", FieldValue::Decimal(duration));
        }
        if let Some(bit_rate) = parse_integer(format.bit_rate.as_deref()) {
            record.insert("Загальний бітрейт (біт/с)", FieldValue::Integer(bit_rate));
        }
    }

    let streams = probe
        .format
        .as_ref()
        .and_then(|f| f.nb_streams)
        .unwrap_or(probe.streams.len() as u64);
    if streams > 0 {
        record.insert("Кількість потоків", FieldValue::Integer(streams));
    }

    if let Some(video) = first_stream(probe, "video") {
        insert_text(&mut record, "Відеокодек", video.codec_name.as_deref());
        insert_text(&mut record, "Профіль відео", video.profile.as_deref());
        if let (Some(width), Some(height)) = (video.width, video.height) {
            record.insert("Роздільна здатність", FieldValue::Dimensions { width, height });
        }
        let fps = parse_frame_rate(video.avg_frame_rate.as_deref())
            .or_else(|| parse_frame_rate(video.r_frame_rate.as_deref()));
        if let Some(fps) = fps {
            record.insert("Частота кадрів (кадр/с)", FieldValue::Decimal(fps));
        }
        insert_text(&mut record, "Формат пікселів", video.pix_fmt.as_deref());
    }

    if let Some(audio) = first_stream(probe, "audio") {
        insert_text(&mut record, "Аудіокодек", audio.codec_name.as_deref());
        if let Some(rate) = parse_integer(audio.sample_rate.as_deref()) {
            record.insert("Частота дискретизації (Гц)", FieldValue::Integer(rate));
        }
        if let Some(channels) = audio.channels.filter(|c| *c > 0) {
            record.insert("Аудіоканали", FieldValue::Integer(channels));
        }
        insert_text(&mut record, "Розкладка каналів", audio.channel_layout.as_deref());
    }

    for (field, keys) in TAG_FIELDS {
        if let Some(value) = find_tag(probe, keys) {
            record.insert(field, FieldValue::infer(value));
        }
    }

    record
}

fn first_stream<'a>(probe: &'a ProbeOutput, kind: &str) -> Option<&'a ProbeStream> {
    probe
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some(kind))
}

fn find_tag<'a>(probe: &'a ProbeOutput, keys: &[&str]) -> Option<&'a str> {
    let format_tags = probe.format.iter().map(|f| &f.tags);
    let stream_tags = probe.streams.iter().map(|s| &s.tags);
    format_tags
        .chain(stream_tags)
        .find_map(|tags| keys.iter().find_map(|k| tags.get(*k)))
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
}

fn insert_text(record: &mut MetadataRecord, name: &str, value: Option<&str>) {
    if let Some(value) = value.map(str::trim).filter(|v| !v.is_empty() && *v != "unknown") {
        record.insert(name, FieldValue::Text(value.to_string()));
    }
}

fn parse_integer(raw: Option<&str>) -> Option<u64> {
    raw?.trim().parse::<u64>().ok().filter(|n| *n > 0)
}

fn parse_decimal(raw: Option<&str>) -> Option<f64> {
    raw?.trim()
        .parse::<f64>()
        .ok()
        .filter(|d| d.is_finite() && *d > 0.0)
}

/// ffprobe reports frame rates as fractions, e.g. "30000/1001".
fn parse_frame_rate(raw: Option<&str>) -> Option<f64> {
    let raw = raw?.trim();
    let fps = match raw.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.parse().ok()?;
            let den: f64 = den.parse().ok()?;
            if den == 0.0 {
                return None;
            }
            num / den
        }
        None => raw.parse().ok()?,
    };
    Some(fps).filter(|f| f.is_finite() && *f > 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PHONE_VIDEO: &str = r#"{
        "streams": [
            {
                "codec_type": "video",
                "codec_name": "h264",
                "profile": "High",
                "width": 1920,
                "height": 1080,
                "pix_fmt": "yuv420p",
                "r_frame_rate": "30/1",
                "avg_frame_rate": "30000/1001",
                "tags": { "creation_time": "2024-05-01T10:00:00.000000Z" }
            },
            {
                "codec_type": "audio",
                "codec_name": "aac",
                "sample_rate": "48000",
                "channels": 2,
                "channel_layout": "stereo"
            }
        ],
        "format": {
            "format_name": "mov,mp4,m4a,3gp,3g2,mj2",
            "format_long_name": "QuickTime / MOV",
            "duration": "12.345000",
            "size": "5242880",
            "bit_rate": "3397000",
            "nb_streams": 2,
            "tags": {
                "com.apple.quicktime.make": "Apple",
                "com.apple.quicktime.model": "iPhone 13"
            }
        }
    }"#;

    #[test]
    fn maps_phone_video() {
        let probe: ProbeOutput = serde_json::from_str(PHONE_VIDEO).unwrap();
        let record = record_from_probe("clip.mov", &probe);

        assert_eq!(
            record.get("Назва файлу"),
            Some(&FieldValue::Text("clip.mov".into()))
        );
        assert_eq!(
            record.get("Контейнер"),
            Some(&FieldValue::Text("QuickTime / MOV".into()))
        );
        assert_eq!(
            record.get("Розмір файлу (байт)"),
            Some(&FieldValue::Integer(5_242_880))
        );
        assert_eq!(
            record.get("Роздільна здатність"),
            Some(&FieldValue::Dimensions {
                width: 1920,
                height: 1080
            })
        );
        assert_eq!(
            record.get("Частота кадрів (кадр/с)").map(|v| v.to_string()),
            Some("29.97".to_string())
        );
        assert_eq!(
            record.get("Частота дискретизації (Гц)"),
            Some(&FieldValue::Integer(48_000))
        );
        assert_eq!(record.get("Кількість потоків"), Some(&FieldValue::Integer(2)));
        assert_eq!(
            record.get("Модель пристрою"),
            Some(&FieldValue::Text("iPhone 13".into()))
        );
        // Stream-level tags are picked up as well
        assert!(record.get("Дата створення").is_some());
        assert!(record.get("Кодувальник").is_none());
    }

    #[test]
    fn skips_missing_and_unknown_values() {
        let json = r#"{
            "streams": [{ "codec_type": "video", "codec_name": "unknown", "r_frame_rate": "0/0" }],
            "format": { "format_name": "gif", "size": "N/A" }
        }"#;
        let probe: ProbeOutput = serde_json::from_str(json).unwrap();
        let record = record_from_probe("a.gif", &probe);

        assert!(record.get("Відеокодек").is_none());
        assert!(record.get("Частота кадрів (кадр/с)").is_none());
        assert!(record.get("Розмір файлу (байт)").is_none());
        assert_eq!(record.get("Контейнер"), Some(&FieldValue::Text("gif".into())));
        assert_eq!(record.get("Кількість потоків"), Some(&FieldValue::Integer(1)));
    }

    #[test]
    fn empty_probe_leaves_only_file_name() {
        let record = record_from_probe("x.bin", &ProbeOutput::default());
        assert_eq!(record.len(), 1);
    }

    #[test]
    fn frame_rate_fractions() {
        assert_eq!(parse_frame_rate(Some("25/1")), Some(25.0));
        assert_eq!(parse_frame_rate(Some("24")), Some(24.0));
        assert_eq!(parse_frame_rate(Some("1/0")), None);
        assert_eq!(parse_frame_rate(None), None);
    }
}
