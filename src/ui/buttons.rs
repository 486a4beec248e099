use anyhow::Result;
use serenity::{
    all::{ButtonStyle, ComponentInteraction, Context},
    builder::{
        CreateActionRow, CreateButton, CreateInteractionResponse,
        CreateInteractionResponseFollowup, CreateInteractionResponseMessage,
    },
};
use std::sync::Arc;
use tracing::debug;

use crate::{
    audio::{
        coordinator::{PauseToggle, PlaybackCoordinator, SkipOutcome, StopOutcome},
        effects::EffectProfile,
        state::ControlsSnapshot,
    },
    ui::{embeds, reply::ReplyTarget},
};

/// IDs personalizados para los botones del reproductor
pub mod button_ids {
    pub const PAUSE_RESUME: &str = "music_pause_resume";
    pub const SKIP: &str = "music_skip";
    pub const STOP: &str = "music_stop";
    pub const SHOW_QUEUE: &str = "music_queue";
}

/// Apariencia del botón pausa/reanudar según el estado vivo. Se recalcula en
/// cada render.
pub fn pause_toggle_appearance(paused: bool) -> (&'static str, ButtonStyle) {
    if paused {
        ("▶️ Reanudar", ButtonStyle::Success)
    } else {
        ("⏸️ Pausa", ButtonStyle::Secondary)
    }
}

/// Construye la botonera del reproductor a partir de una vista del estado
/// vivo. pause/skip/stop se deshabilitan (no se ocultan) sin pista activa;
/// cola y efectos quedan siempre habilitados.
pub fn render_controls(snapshot: ControlsSnapshot) -> Vec<CreateActionRow> {
    let can_interact = snapshot.can_interact_playback();
    let (pause_label, pause_style) = pause_toggle_appearance(snapshot.paused);

    let row1 = CreateActionRow::Buttons(vec![
        CreateButton::new(button_ids::PAUSE_RESUME)
            .label(pause_label)
            .style(pause_style)
            .disabled(!can_interact),
        CreateButton::new(button_ids::SKIP)
            .label("⏭️ Saltar")
            .style(ButtonStyle::Primary)
            .disabled(!can_interact),
        CreateButton::new(button_ids::STOP)
            .label("⏹️ Detener")
            .style(ButtonStyle::Danger)
            .disabled(!can_interact),
        CreateButton::new(button_ids::SHOW_QUEUE)
            .label("#️⃣ Cola")
            .style(ButtonStyle::Secondary),
    ]);

    let row2 = CreateActionRow::Buttons(vec![
        CreateButton::new(EffectProfile::BassBoost.custom_id())
            .label("🔊 BB")
            .style(ButtonStyle::Primary),
        CreateButton::new(EffectProfile::EightD.custom_id())
            .label("🎧 8D")
            .style(ButtonStyle::Primary),
        CreateButton::new(EffectProfile::Normal.custom_id())
            .label("⚪ Normal")
            .style(ButtonStyle::Secondary),
    ]);

    vec![row1, row2]
}

/// Botonera completamente deshabilitada, para mensajes supersedidos.
pub fn render_controls_disabled() -> Vec<CreateActionRow> {
    let row1 = CreateActionRow::Buttons(vec![
        CreateButton::new(button_ids::PAUSE_RESUME)
            .label("⏸️ Pausa")
            .style(ButtonStyle::Secondary)
            .disabled(true),
        CreateButton::new(button_ids::SKIP)
            .label("⏭️ Saltar")
            .style(ButtonStyle::Primary)
            .disabled(true),
        CreateButton::new(button_ids::STOP)
            .label("⏹️ Detener")
            .style(ButtonStyle::Danger)
            .disabled(true),
        CreateButton::new(button_ids::SHOW_QUEUE)
            .label("#️⃣ Cola")
            .style(ButtonStyle::Secondary)
            .disabled(true),
    ]);

    let row2 = CreateActionRow::Buttons(vec![
        CreateButton::new(EffectProfile::BassBoost.custom_id())
            .label("🔊 BB")
            .style(ButtonStyle::Primary)
            .disabled(true),
        CreateButton::new(EffectProfile::EightD.custom_id())
            .label("🎧 8D")
            .style(ButtonStyle::Primary)
            .disabled(true),
        CreateButton::new(EffectProfile::Normal.custom_id())
            .label("⚪ Normal")
            .style(ButtonStyle::Secondary)
            .disabled(true),
    ]);

    vec![row1, row2]
}

/// Maneja los botones del reproductor. Cada interacción relee el estado
/// vivo antes de actuar y cualquier edición re-deriva la botonera completa
/// de esa lectura, nunca del render anterior.
pub async fn handle_music_component(
    ctx: &Context,
    interaction: &ComponentInteraction,
    coordinator: &Arc<PlaybackCoordinator>,
) -> Result<()> {
    let guild_id = interaction
        .guild_id
        .ok_or_else(|| anyhow::anyhow!("Componente usado fuera de un servidor"))?;

    match interaction.data.custom_id.as_str() {
        button_ids::PAUSE_RESUME => {
            match coordinator.toggle_pause(guild_id) {
                Some(toggle) => {
                    debug!(
                        "Botón pausa/reanudar → {:?} en guild {}",
                        toggle, guild_id
                    );
                    // Re-render completo desde el estado vivo
                    if let Some((embed, components)) = coordinator.now_playing_render(guild_id) {
                        interaction
                            .create_response(
                                &ctx.http,
                                CreateInteractionResponse::UpdateMessage(
                                    CreateInteractionResponseMessage::new()
                                        .embed(embed)
                                        .components(components),
                                ),
                            )
                            .await?;
                    } else {
                        let msg = match toggle {
                            PauseToggle::Paused => "⏸️ Pausado",
                            PauseToggle::Resumed => "▶️ Reanudado",
                        };
                        respond_ephemeral(ctx, interaction, msg).await?;
                    }
                }
                None => {
                    respond_ephemeral(ctx, interaction, "Nada sonando o pausado.").await?;
                }
            }
        }
        button_ids::SKIP => match coordinator.skip(guild_id, interaction.channel_id) {
            SkipOutcome::Skipped => {
                interaction.defer_ephemeral(&ctx.http).await?;
                followup_ephemeral(ctx, interaction, "⏭️ Saltando...").await?;
            }
            SkipOutcome::ForcedAdvance => {
                interaction.defer_ephemeral(&ctx.http).await?;
                followup_ephemeral(ctx, interaction, "🔄 Probando la siguiente...").await?;
            }
            SkipOutcome::NothingToSkip => {
                respond_ephemeral(ctx, interaction, "Nada que saltar.").await?;
            }
        },
        button_ids::STOP => {
            match coordinator.stop(guild_id) {
                // El mensaje huérfano es este mismo: la respuesta de abajo ya
                // lo deshabilita
                StopOutcome::Stopped { .. } => {
                    interaction
                        .create_response(
                            &ctx.http,
                            CreateInteractionResponse::UpdateMessage(
                                CreateInteractionResponseMessage::new()
                                    .components(render_controls_disabled()),
                            ),
                        )
                        .await?;

                    ReplyTarget::new(ctx.http.clone(), interaction.channel_id)
                        .send_text_silent("⏹️ Música detenida y cola limpiada.")
                        .await;
                }
                StopOutcome::NotPlaying => {
                    respond_ephemeral(ctx, interaction, "No hay nada sonando.").await?;
                }
            }
        }
        button_ids::SHOW_QUEUE => {
            let view = coordinator.queue_view(guild_id);
            match view {
                Some((current, snapshot)) if current.is_some() || snapshot.total > 0 => {
                    let embed = embeds::create_queue_embed(current.as_ref(), &snapshot);
                    interaction
                        .create_response(
                            &ctx.http,
                            CreateInteractionResponse::Message(
                                CreateInteractionResponseMessage::new()
                                    .embed(embed)
                                    .ephemeral(true),
                            ),
                        )
                        .await?;
                }
                _ => {
                    respond_ephemeral(
                        ctx,
                        interaction,
                        "¡La cola está vacía y no hay nada sonando!",
                    )
                    .await?;
                }
            }
        }
        other => {
            if let Some(effect) = EffectProfile::from_custom_id(other) {
                coordinator.set_effect(guild_id, effect);
                respond_ephemeral(
                    ctx,
                    interaction,
                    &format!(
                        "🎧 Efecto: **{}** (aplica a la próxima pista).",
                        effect.display_name()
                    ),
                )
                .await?;
            } else {
                debug!("Componente de música no manejado: {}", other);
                respond_ephemeral(ctx, interaction, "⚠️ Acción no reconocida.").await?;
            }
        }
    }

    Ok(())
}

async fn respond_ephemeral(
    ctx: &Context,
    interaction: &ComponentInteraction,
    content: &str,
) -> Result<()> {
    interaction
        .create_response(
            &ctx.http,
            CreateInteractionResponse::Message(
                CreateInteractionResponseMessage::new()
                    .content(content)
                    .ephemeral(true),
            ),
        )
        .await?;
    Ok(())
}

async fn followup_ephemeral(
    ctx: &Context,
    interaction: &ComponentInteraction,
    content: &str,
) -> Result<()> {
    interaction
        .create_followup(
            &ctx.http,
            CreateInteractionResponseFollowup::new()
                .content(content)
                .ephemeral(true),
        )
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pause_toggle_appearance_flips_with_state() {
        let (label, style) = pause_toggle_appearance(false);
        assert_eq!(label, "⏸️ Pausa");
        assert_eq!(style, ButtonStyle::Secondary);

        let (label, style) = pause_toggle_appearance(true);
        assert_eq!(label, "▶️ Reanudar");
        assert_eq!(style, ButtonStyle::Success);
    }

    #[test]
    fn test_render_controls_row_shape() {
        let snapshot = ControlsSnapshot {
            connected: true,
            playing: true,
            paused: false,
        };
        let rows = render_controls(snapshot);
        assert_eq!(rows.len(), 2);

        let rows = render_controls_disabled();
        assert_eq!(rows.len(), 2);
    }
}
