use serde_json::Value;
use tracing::{info, warn};

use crate::error::PlaybackError;

/// Metadatos extraídos por yt-dlp para una pista, junto con la URL de audio
/// directa lista para streaming.
#[derive(Debug, Clone)]
pub struct ExtractedInfo {
    pub title: String,
    pub webpage_url: Option<String>,
    pub duration_secs: Option<f64>,
    pub thumbnail: Option<String>,
    pub uploader: Option<String>,
    pub uploader_url: Option<String>,
    pub view_count: Option<u64>,
    pub upload_date: Option<String>, // Formato: YYYYMMDD
    pub extractor: String,
    pub stream_url: String,
    pub http_headers: Vec<(String, String)>,
}

/// Determina si la petición es una URL directa o un término de búsqueda.
pub fn is_url(query: &str) -> bool {
    query.starts_with("http://") || query.starts_with("https://")
}

/// Extrae metadatos y URL de stream con `yt-dlp -j`. Las búsquedas usan un
/// único mejor resultado (`ytsearch1:`).
pub async fn extract(query: &str) -> Result<ExtractedInfo, PlaybackError> {
    let target = if is_url(query) {
        query.to_string()
    } else {
        format!("ytsearch1:{}", query)
    };

    let cookies = find_cookies_file().await;

    let mut cmd = tokio::process::Command::new("yt-dlp");
    cmd.args([
        "-j",
        "--no-playlist",
        "-f",
        "bestaudio[ext=m4a]/bestaudio[ext=webm]/bestaudio/best",
        "--default-search",
        "ytsearch",
        "--socket-timeout",
        "30",
        "--retries",
        "3",
        "--quiet",
        "--no-warnings",
    ]);

    // Agregar cookies si están disponibles
    if let Some(cookies) = cookies {
        cmd.args(["--cookies", &cookies]);
    }

    cmd.arg(&target);

    let output = cmd
        .output()
        .await
        .map_err(|e| PlaybackError::Extraction(format!("no se pudo ejecutar yt-dlp: {}", e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        warn!("yt-dlp falló para '{}': {}", query, stderr.trim());
        if is_not_found_error(&stderr) {
            return Err(PlaybackError::TrackNotFound(query.to_string()));
        }
        return Err(PlaybackError::Extraction(stderr.trim().to_string()));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let json_line = stdout
        .lines()
        .find(|l| !l.trim().is_empty())
        .ok_or_else(|| PlaybackError::TrackNotFound(query.to_string()))?;

    let info = parse_info_json(json_line)?;
    info!("🔍 Resuelto '{}' → {}", query, info.title);
    Ok(info)
}

/// Parsea una línea JSON de `yt-dlp -j` en [`ExtractedInfo`].
pub fn parse_info_json(json: &str) -> Result<ExtractedInfo, PlaybackError> {
    let value: Value = serde_json::from_str(json)
        .map_err(|e| PlaybackError::Extraction(format!("JSON inválido de yt-dlp: {}", e)))?;

    let stream_url = value
        .get("url")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| PlaybackError::Extraction("sin URL de stream en la respuesta".into()))?;

    let title = value
        .get("title")
        .and_then(|v| v.as_str())
        .unwrap_or("Unknown Title")
        .to_string();

    // thumbnail directo, o el más grande de la lista si falta
    let thumbnail = value
        .get("thumbnail")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .or_else(|| largest_thumbnail(&value));

    let mut http_headers = Vec::new();
    if let Some(map) = value.get("http_headers").and_then(|v| v.as_object()) {
        for (k, v) in map {
            if let Some(s) = v.as_str() {
                http_headers.push((k.clone(), s.to_string()));
            }
        }
    }

    Ok(ExtractedInfo {
        title,
        webpage_url: str_field(&value, "webpage_url"),
        duration_secs: value.get("duration").and_then(|v| v.as_f64()),
        thumbnail,
        uploader: str_field(&value, "uploader").or_else(|| str_field(&value, "channel")),
        uploader_url: str_field(&value, "uploader_url")
            .or_else(|| str_field(&value, "channel_url")),
        view_count: value.get("view_count").and_then(|v| v.as_u64()),
        upload_date: str_field(&value, "upload_date"),
        extractor: str_field(&value, "extractor_key").unwrap_or_else(|| "Unknown".into()),
        stream_url,
        http_headers,
    })
}

/// Formatea una fecha YYYYMMDD de yt-dlp como YYYY-MM-DD.
pub fn format_upload_date(raw: &str) -> Option<String> {
    if raw.len() != 8 || !raw.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    Some(format!("{}-{}-{}", &raw[..4], &raw[4..6], &raw[6..]))
}

fn str_field(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
}

/// Elige la miniatura de mayor resolución de la lista `thumbnails`.
fn largest_thumbnail(value: &Value) -> Option<String> {
    let list = value.get("thumbnails")?.as_array()?;
    list.iter()
        .max_by_key(|t| {
            let w = t.get("width").and_then(|v| v.as_u64()).unwrap_or(0);
            let h = t.get("height").and_then(|v| v.as_u64()).unwrap_or(0);
            w * h
        })
        .and_then(|t| t.get("url"))
        .and_then(|u| u.as_str())
        .map(|s| s.to_string())
}

fn is_not_found_error(stderr: &str) -> bool {
    let lower = stderr.to_lowercase();
    lower.contains("no video results")
        || lower.contains("video unavailable")
        || lower.contains("this video is not available")
        || lower.contains("unable to extract")
        || lower.contains("404")
}

/// Busca archivo de cookies disponible, en los paths habituales.
async fn find_cookies_file() -> Option<String> {
    let cookies_paths = [
        format!(
            "{}/.config/yt-dlp/cookies.txt",
            std::env::var("HOME").unwrap_or_default()
        ),
        "./cookies.txt".to_string(),
    ];

    for path in cookies_paths {
        if tokio::fs::metadata(&path).await.is_ok() {
            info!("🍪 Cookies encontradas en: {}", path);
            return Some(path);
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_url_detection() {
        assert!(is_url("https://www.youtube.com/watch?v=dQw4w9WgXcQ"));
        assert!(is_url("http://youtu.be/dQw4w9WgXcQ"));
        assert!(!is_url("never gonna give you up"));
        assert!(!is_url("ftp://example.com/a.mp3"));
    }

    #[test]
    fn test_parse_full_info_json() {
        let json = r#"{
            "title": "Test Song",
            "url": "https://cdn.example/audio.m4a",
            "webpage_url": "https://www.youtube.com/watch?v=abc",
            "duration": 215.0,
            "thumbnail": "https://img.example/t.jpg",
            "uploader": "Test Channel",
            "uploader_url": "https://www.youtube.com/@test",
            "view_count": 1234567,
            "upload_date": "20230115",
            "extractor_key": "Youtube",
            "http_headers": {"User-Agent": "Mozilla/5.0"}
        }"#;

        let info = parse_info_json(json).unwrap();
        assert_eq!(info.title, "Test Song");
        assert_eq!(info.stream_url, "https://cdn.example/audio.m4a");
        assert_eq!(info.duration_secs, Some(215.0));
        assert_eq!(info.uploader.as_deref(), Some("Test Channel"));
        assert_eq!(info.view_count, Some(1234567));
        assert_eq!(info.extractor, "Youtube");
        assert_eq!(
            info.http_headers,
            vec![("User-Agent".to_string(), "Mozilla/5.0".to_string())]
        );
    }

    #[test]
    fn test_parse_falls_back_to_largest_thumbnail_and_channel() {
        let json = r#"{
            "title": "T",
            "url": "https://cdn.example/a",
            "channel": "Canal",
            "channel_url": "https://example/c",
            "thumbnails": [
                {"url": "small", "width": 120, "height": 90},
                {"url": "big", "width": 1280, "height": 720}
            ]
        }"#;

        let info = parse_info_json(json).unwrap();
        assert_eq!(info.thumbnail.as_deref(), Some("big"));
        assert_eq!(info.uploader.as_deref(), Some("Canal"));
        assert_eq!(info.uploader_url.as_deref(), Some("https://example/c"));
    }

    #[test]
    fn test_parse_without_stream_url_fails() {
        let err = parse_info_json(r#"{"title": "T"}"#).unwrap_err();
        assert!(matches!(err, PlaybackError::Extraction(_)));
    }

    #[test]
    fn test_format_upload_date() {
        assert_eq!(format_upload_date("20230115").as_deref(), Some("2023-01-15"));
        assert_eq!(format_upload_date("2023"), None);
        assert_eq!(format_upload_date("2023011x"), None);
    }
}
