pub mod ytdlp;

use serenity::model::id::UserId;
use songbird::input::{ChildContainer, HttpRequest, Input};
use std::process::Stdio;
use std::time::Duration;
use tracing::{error, info};

use crate::{audio::effects::EffectProfile, error::PlaybackError};

pub use ytdlp::ExtractedInfo;

/// Metadatos de una pista resuelta, desacoplados del stream de audio.
#[derive(Debug, Clone)]
pub struct TrackMetadata {
    pub title: String,
    pub source_url: Option<String>,
    pub duration: Option<Duration>,
    pub thumbnail: Option<String>,
    pub uploader: Option<String>,
    pub uploader_url: Option<String>,
    pub view_count: Option<u64>,
    pub upload_date: Option<String>, // Formato: YYYYMMDD
    pub extractor: String,
    pub requester: UserId,
}

impl TrackMetadata {
    fn from_extraction(info: &ExtractedInfo, requester: UserId) -> Self {
        Self {
            title: info.title.clone(),
            source_url: info.webpage_url.clone(),
            duration: info.duration_secs.map(Duration::from_secs_f64),
            thumbnail: info.thumbnail.clone(),
            uploader: info.uploader.clone(),
            uploader_url: info.uploader_url.clone(),
            view_count: info.view_count,
            upload_date: info.upload_date.clone(),
            extractor: info.extractor.clone(),
            requester,
        }
    }

    /// Fecha de subida legible (YYYY-MM-DD), si el proveedor la entregó.
    pub fn formatted_upload_date(&self) -> Option<String> {
        self.upload_date
            .as_deref()
            .and_then(ytdlp::format_upload_date)
    }
}

/// Pista lista para reproducir: metadatos más el input de songbird con la
/// cadena de filtros ya ligada.
pub struct ResolvedTrack {
    pub metadata: TrackMetadata,
    pub input: Input,
}

/// Resuelve peticiones (URL o búsqueda) en pistas reproducibles vía yt-dlp.
pub struct TrackResolver {
    client: reqwest::Client,
}

impl TrackResolver {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .build()
            .expect("cliente reqwest por defecto");

        Self { client }
    }

    /// Resuelve una petición en una pista reproducible. El perfil de efecto
    /// queda ligado al stream aquí, en el momento de su construcción: cambiar
    /// el efecto después no altera un stream ya creado.
    pub async fn resolve(
        &self,
        query: &str,
        effect: EffectProfile,
        requester: UserId,
    ) -> Result<ResolvedTrack, PlaybackError> {
        let extraction = ytdlp::extract(query).await?;
        let metadata = TrackMetadata::from_extraction(&extraction, requester);
        let input = self.build_input(&extraction, effect)?;

        Ok(ResolvedTrack { metadata, input })
    }

    /// Verifica que yt-dlp y ffmpeg estén disponibles.
    pub async fn verify_dependencies() -> anyhow::Result<()> {
        let ytdlp_check = async_process::Command::new("yt-dlp")
            .arg("--version")
            .output()
            .await;

        match ytdlp_check {
            Ok(output) if output.status.success() => {
                let version = String::from_utf8_lossy(&output.stdout);
                info!("✅ yt-dlp versión: {}", version.trim());
            }
            _ => {
                error!("❌ yt-dlp no encontrado. Instala con: pip install yt-dlp");
                anyhow::bail!("yt-dlp no disponible");
            }
        }

        let ffmpeg_check = async_process::Command::new("ffmpeg")
            .arg("-version")
            .output()
            .await;

        match ffmpeg_check {
            Ok(output) if output.status.success() => {
                info!("✅ ffmpeg disponible");
            }
            _ => {
                error!("❌ ffmpeg no encontrado. Instala con: sudo apt install ffmpeg");
                anyhow::bail!("ffmpeg no disponible");
            }
        }

        Ok(())
    }

    /// Construye el input de audio. Sin filtros, el stream directo va por
    /// HTTP; con filtros, un hijo ffmpeg aplica la cadena `-af` y entrega
    /// WAV por stdout.
    fn build_input(
        &self,
        extraction: &ExtractedInfo,
        effect: EffectProfile,
    ) -> Result<Input, PlaybackError> {
        match effect.filter_chain() {
            None => {
                let mut headers = reqwest::header::HeaderMap::new();
                for (k, v) in &extraction.http_headers {
                    if let (Ok(name), Ok(value)) = (
                        reqwest::header::HeaderName::from_bytes(k.as_bytes()),
                        reqwest::header::HeaderValue::from_str(v),
                    ) {
                        headers.insert(name, value);
                    }
                }

                let request = HttpRequest::new_with_headers(
                    self.client.clone(),
                    extraction.stream_url.clone(),
                    headers,
                );
                Ok(Input::from(request))
            }
            Some(chain) => {
                info!("🎛️ Aplicando filtro ffmpeg: {}", chain);

                let mut header_str = String::new();
                for (k, v) in &extraction.http_headers {
                    header_str.push_str(&format!("{}: {}\r\n", k, v));
                }

                let mut cmd = std::process::Command::new("ffmpeg");
                if !header_str.is_empty() {
                    cmd.arg("-headers").arg(header_str);
                }
                let child = cmd
                    .arg("-reconnect")
                    .arg("1")
                    .arg("-reconnect_streamed")
                    .arg("1")
                    .arg("-reconnect_delay_max")
                    .arg("5")
                    .arg("-i")
                    .arg(&extraction.stream_url)
                    .arg("-vn")
                    .arg("-af")
                    .arg(chain)
                    // WAV (pcm_s16le) para que symphonia pueda sondear el stream
                    .arg("-c:a")
                    .arg("pcm_s16le")
                    .arg("-ar")
                    .arg("48000")
                    .arg("-ac")
                    .arg("2")
                    .arg("-f")
                    .arg("wav")
                    .arg("pipe:1")
                    .stdout(Stdio::piped())
                    .stderr(Stdio::null())
                    .spawn()
                    .map_err(|e| {
                        PlaybackError::Extraction(format!("no se pudo lanzar ffmpeg: {}", e))
                    })?;

                Ok(Input::from(ChildContainer::from(child)))
            }
        }
    }
}

impl Default for TrackResolver {
    fn default() -> Self {
        Self::new()
    }
}
