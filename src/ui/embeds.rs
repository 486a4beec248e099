use num_format::{Locale, ToFormattedString};
use serenity::{
    all::Timestamp,
    builder::{CreateEmbed, CreateEmbedFooter},
};
use std::time::Duration;

use crate::{audio::queue::QueueSnapshot, sources::TrackMetadata};

/// Paleta de colores estandarizada para el bot
pub mod colors {
    use serenity::all::Colour;

    pub const SUCCESS_GREEN: Colour = Colour::from_rgb(67, 181, 129);
    pub const ERROR_RED: Colour = Colour::from_rgb(220, 53, 69);
    pub const INFO_BLUE: Colour = Colour::from_rgb(52, 144, 220);
    pub const NEUTRAL_GRAY: Colour = Colour::from_rgb(108, 117, 125);
}

/// Footer estandarizado para todos los embeds
const STANDARD_FOOTER: &str = "🎶 Cadencia";

/// Embed de "reproduciendo ahora" con los metadatos de la pista y el tamaño
/// de la cola en el momento del render.
pub fn create_now_playing_embed(track: &TrackMetadata, queue_len: usize) -> CreateEmbed {
    let description = match &track.source_url {
        Some(url) => format!("**[{}]({})**", track.title, url),
        None => format!("**{}**", track.title),
    };

    let mut embed = CreateEmbed::default()
        .title("🎶 Reproduciendo Ahora")
        .description(description)
        .color(colors::SUCCESS_GREEN)
        .field(
            "⏱️ Duración",
            track
                .duration
                .map(format_duration)
                .unwrap_or_else(|| "N/A".to_string()),
            true,
        )
        .field("👤 Solicitado por", format!("<@{}>", track.requester), true)
        .field("📋 Cola", format!("{} restantes", queue_len), true);

    if let Some(thumbnail) = &track.thumbnail {
        embed = embed.thumbnail(thumbnail);
    }

    if let Some(uploader) = &track.uploader {
        let uploader_text = match &track.uploader_url {
            Some(url) => format!("[{}]({})", uploader, url),
            None => uploader.clone(),
        };
        embed = embed.field("📺 Canal", uploader_text, true);
    }

    if let Some(views) = track.view_count {
        embed = embed.field("👁️ Vistas", views.to_formatted_string(&Locale::en), true);
    }

    if let Some(date) = track.formatted_upload_date() {
        embed = embed.field("📅 Subido", date, true);
    }

    embed
        .footer(CreateEmbedFooter::new(format!(
            "Fuente: {}",
            track.extractor
        )))
        .timestamp(Timestamp::now())
}

/// Embed de la cola: pista actual más las primeras entradas pendientes.
pub fn create_queue_embed(
    current: Option<&TrackMetadata>,
    snapshot: &QueueSnapshot,
) -> CreateEmbed {
    let mut description = String::new();

    if let Some(track) = current {
        description.push_str(&format!("▶️ **{}**", track.title));
        if let Some(duration) = track.duration {
            description.push_str(&format!(" ({})", format_duration(duration)));
        }
        description.push_str("\n\n");
    }

    description.push_str(&snapshot.render());

    CreateEmbed::default()
        .title("📋 Cola de Reproducción")
        .description(description)
        .color(colors::INFO_BLUE)
        .footer(CreateEmbedFooter::new(STANDARD_FOOTER))
}

/// Embed de error genérico.
#[allow(dead_code)]
pub fn create_error_embed(error_msg: &str) -> CreateEmbed {
    CreateEmbed::default()
        .title("❌ Error")
        .description(error_msg)
        .color(colors::ERROR_RED)
        .timestamp(Timestamp::now())
}

/// Embed de ayuda con el catálogo de comandos.
pub fn create_help_embed() -> CreateEmbed {
    CreateEmbed::default()
        .title("🎶 Cadencia — Comandos")
        .color(colors::NEUTRAL_GRAY)
        .field(
            "Música",
            "`/join` entra a tu canal de voz\n\
             `/play <query>` busca o reproduce una URL\n\
             `/pause` `/resume` `/skip` `/stop` controlan la reproducción\n\
             `/queue` muestra la cola\n\
             `/effect <perfil>` fija el efecto para la próxima pista\n\
             `/leave` desconecta el bot",
            false,
        )
        .field(
            "Roles",
            "`/setup_role` configura un botón de rol\n\
             `/remove_role` lo elimina\n\
             `/role_menu` publica el menú de roles",
            false,
        )
        .field(
            "Otros",
            "`/ask <prompt>` consulta a la IA\n\
             `/kick` `/ban` `/clear` moderación",
            false,
        )
        .footer(CreateEmbedFooter::new(STANDARD_FOOTER))
}

/// Formatea una duración como m:ss (o h:mm:ss para pistas largas).
pub fn format_duration(duration: Duration) -> String {
    let total_seconds = duration.as_secs();
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{}:{:02}", minutes, seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_secs(0)), "0:00");
        assert_eq!(format_duration(Duration::from_secs(65)), "1:05");
        assert_eq!(format_duration(Duration::from_secs(215)), "3:35");
        assert_eq!(format_duration(Duration::from_secs(3725)), "1:02:05");
    }
}
