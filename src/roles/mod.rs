use anyhow::Result;
use serenity::{
    all::{ButtonStyle, ComponentInteraction, Context, ReactionType},
    builder::{
        CreateActionRow, CreateButton, CreateInteractionResponse,
        CreateInteractionResponseMessage,
    },
    model::id::{GuildId, RoleId},
};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info};

use crate::storage::{JsonStorage, RoleButtonConfig};

/// Prefijo de `custom_id` de los botones de rol; el sufijo es el id del rol.
const ROLE_BUTTON_PREFIX: &str = "role_assign_";

pub const MAX_LABEL_LEN: usize = 80;
pub const MAX_EMOJI_LEN: usize = 50;

/// Gestión de roles auto-asignables: configuración persistente más el
/// manejo de los clics en el menú.
pub struct RoleManager {
    storage: Arc<Mutex<JsonStorage>>,
}

impl RoleManager {
    pub fn new(storage: Arc<Mutex<JsonStorage>>) -> Self {
        Self { storage }
    }

    /// Agrega o actualiza un botón de rol. Las validaciones de jerarquía se
    /// hacen en el handler del comando, que tiene el contexto de la guild.
    pub async fn setup_role(
        &self,
        guild_id: GuildId,
        role_id: RoleId,
        label: String,
        style: String,
        emoji: Option<String>,
    ) -> Result<()> {
        let config = RoleButtonConfig {
            label,
            style,
            emoji,
        };
        self.storage
            .lock()
            .await
            .set_role_button(guild_id.get(), role_id.get(), config)
            .await
    }

    pub async fn remove_role(&self, guild_id: GuildId, role_id: RoleId) -> Result<bool> {
        self.storage
            .lock()
            .await
            .remove_role_button(guild_id.get(), role_id.get())
            .await
    }

    /// Botonera del menú de roles de la guild, en filas de hasta 5 botones.
    /// `None` si no hay roles configurados.
    pub async fn menu_components(&self, guild_id: GuildId) -> Option<Vec<CreateActionRow>> {
        let storage = self.storage.lock().await;
        let roles = storage.guild_roles(guild_id.get())?;
        if roles.is_empty() {
            return None;
        }

        // Orden estable para que el menú no baile entre publicaciones
        let mut entries: Vec<(&u64, &RoleButtonConfig)> = roles.iter().collect();
        entries.sort_by_key(|(role_id, _)| **role_id);

        let mut rows = Vec::new();
        for chunk in entries.chunks(5) {
            let buttons = chunk
                .iter()
                .map(|(role_id, config)| {
                    let mut button =
                        CreateButton::new(format!("{}{}", ROLE_BUTTON_PREFIX, role_id))
                            .label(&config.label)
                            .style(parse_button_style(&config.style));
                    if let Some(emoji) = &config.emoji {
                        button = button.emoji(ReactionType::Unicode(emoji.clone()));
                    }
                    button
                })
                .collect();
            rows.push(CreateActionRow::Buttons(buttons));

            // Discord admite 5 filas por mensaje
            if rows.len() == 5 {
                break;
            }
        }

        Some(rows)
    }

    /// Alterna el rol del usuario que pulsó un botón del menú.
    pub async fn handle_role_component(
        &self,
        ctx: &Context,
        interaction: &ComponentInteraction,
    ) -> Result<()> {
        let Some(role_id) = parse_role_button_id(&interaction.data.custom_id) else {
            return Ok(());
        };
        let guild_id = interaction
            .guild_id
            .ok_or_else(|| anyhow::anyhow!("Botón de rol fuera de un servidor"))?;

        let Some(member) = interaction.member.as_ref() else {
            return Ok(());
        };

        let role_id = RoleId::new(role_id);
        let has_role = member.roles.contains(&role_id);
        let user_id = member.user.id;

        let result = if has_role {
            ctx.http
                .remove_member_role(
                    guild_id,
                    user_id,
                    role_id,
                    Some("Auto-asignación por botón"),
                )
                .await
        } else {
            ctx.http
                .add_member_role(
                    guild_id,
                    user_id,
                    role_id,
                    Some("Auto-asignación por botón"),
                )
                .await
        };

        let content = match result {
            Ok(()) => {
                info!(
                    "🏷️ Rol {} {} para usuario {} en guild {}",
                    role_id,
                    if has_role { "retirado" } else { "asignado" },
                    user_id,
                    guild_id
                );
                if has_role {
                    format!("🗑️ Rol <@&{}> retirado.", role_id)
                } else {
                    format!("✅ Rol <@&{}> asignado.", role_id)
                }
            }
            Err(e) => {
                error!(
                    "Error alternando rol {} para {} en guild {}: {}",
                    role_id, user_id, guild_id, e
                );
                "❌ No pude cambiar ese rol. ¿Mi rol está suficientemente alto?".to_string()
            }
        };

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
}

/// Reconoce un `custom_id` de botón de rol y extrae el id del rol.
pub fn parse_role_button_id(custom_id: &str) -> Option<u64> {
    custom_id
        .strip_prefix(ROLE_BUTTON_PREFIX)
        .and_then(|id| id.parse().ok())
}

/// Traduce el estilo persistido al de serenity; `secondary` es el default.
pub fn parse_button_style(style: &str) -> ButtonStyle {
    match style {
        "primary" => ButtonStyle::Primary,
        "success" => ButtonStyle::Success,
        "danger" => ButtonStyle::Danger,
        _ => ButtonStyle::Secondary,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_role_button_id() {
        assert_eq!(parse_role_button_id("role_assign_123456"), Some(123456));
        assert_eq!(parse_role_button_id("role_assign_abc"), None);
        assert_eq!(parse_role_button_id("music_skip"), None);
    }

    #[test]
    fn test_parse_button_style_defaults_to_secondary() {
        assert_eq!(parse_button_style("primary"), ButtonStyle::Primary);
        assert_eq!(parse_button_style("success"), ButtonStyle::Success);
        assert_eq!(parse_button_style("danger"), ButtonStyle::Danger);
        assert_eq!(parse_button_style("secondary"), ButtonStyle::Secondary);
        assert_eq!(parse_button_style("???"), ButtonStyle::Secondary);
    }
}
