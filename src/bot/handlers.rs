use anyhow::Result;
use serenity::{
    all::{CommandInteraction, ComponentInteraction, Context},
    builder::{
        CreateInteractionResponse, CreateInteractionResponseMessage, CreateMessage,
        EditInteractionResponse,
    },
    model::id::{ChannelId, GuildId, RoleId, UserId},
};
use std::time::Instant;
use tracing::{info, warn};

use crate::{
    audio::{
        coordinator::{SkipOutcome, StopOutcome},
        effects::EffectProfile,
        queue::QueueEntry,
    },
    bot::{admin, CadenciaBot},
    error::PlaybackError,
    roles,
    ui::{buttons, embeds, reply::ReplyTarget},
};

/// Maneja comandos slash
pub async fn handle_command(
    ctx: &Context,
    command: CommandInteraction,
    bot: &CadenciaBot,
) -> Result<()> {
    info!(
        "📝 Comando /{} usado por {} en guild {:?}",
        command.data.name, command.user.name, command.guild_id
    );

    match command.data.name.as_str() {
        "play" => handle_play(ctx, &command, bot).await?,
        "join" => handle_join(ctx, &command, bot).await?,
        "leave" => handle_leave(ctx, &command, bot).await?,
        "pause" => handle_pause(ctx, &command, bot).await?,
        "resume" => handle_resume(ctx, &command, bot).await?,
        "skip" => handle_skip(ctx, &command, bot).await?,
        "stop" => handle_stop(ctx, &command, bot).await?,
        "queue" => handle_queue(ctx, &command, bot).await?,
        "effect" => handle_effect(ctx, &command, bot).await?,
        "setup_role" => handle_setup_role(ctx, &command, bot).await?,
        "remove_role" => handle_remove_role(ctx, &command, bot).await?,
        "role_menu" => handle_role_menu(ctx, &command, bot).await?,
        "ask" => handle_ask(ctx, &command, bot).await?,
        "kick" => admin::handle_kick(ctx, &command).await?,
        "ban" => admin::handle_ban(ctx, &command).await?,
        "clear" => admin::handle_clear(ctx, &command).await?,
        "help" => handle_help(ctx, &command).await?,
        _ => {
            respond_ephemeral(ctx, &command, "❌ Comando no reconocido").await?;
        }
    }

    Ok(())
}

/// Maneja interacciones con componentes (botones del reproductor y de roles)
pub async fn handle_component(
    ctx: &Context,
    component: ComponentInteraction,
    bot: &CadenciaBot,
) -> Result<()> {
    info!(
        "🔘 Botón {} presionado por {} en guild {:?}",
        component.data.custom_id, component.user.name, component.guild_id
    );

    if roles::parse_role_button_id(&component.data.custom_id).is_some() {
        return bot.roles.handle_role_component(ctx, &component).await;
    }

    let coordinator = bot.coordinator()?;
    buttons::handle_music_component(ctx, &component, &coordinator).await
}

// Handlers específicos para cada comando

async fn handle_play(ctx: &Context, command: &CommandInteraction, bot: &CadenciaBot) -> Result<()> {
    let guild_id = require_guild(command)?;
    let query = option_str(command, "query")
        .ok_or_else(|| anyhow::anyhow!("Query no proporcionado"))?
        .to_string();

    // Defer: la conexión y la resolución pueden tomar tiempo
    command
        .create_response(
            &ctx.http,
            CreateInteractionResponse::Defer(CreateInteractionResponseMessage::new()),
        )
        .await?;

    if let Err(msg) = ensure_voice(ctx, guild_id, command.user.id, bot).await {
        command
            .edit_response(&ctx.http, EditInteractionResponse::new().content(msg))
            .await?;
        return Ok(());
    }

    let coordinator = bot.coordinator()?;
    let entry = QueueEntry::new(query.clone(), command.user.id);
    coordinator.enqueue(guild_id, command.channel_id, entry);

    command
        .edit_response(
            &ctx.http,
            EditInteractionResponse::new().content(format!("✅ Agregado: **{}**", query)),
        )
        .await?;

    Ok(())
}

async fn handle_join(ctx: &Context, command: &CommandInteraction, bot: &CadenciaBot) -> Result<()> {
    let guild_id = require_guild(command)?;

    let Some(user_channel) = user_voice_channel(ctx, guild_id, command.user.id) else {
        return respond_ephemeral(ctx, command, "No estás en un canal de voz.").await;
    };

    let connected_channel = match bot.registry().get(guild_id) {
        Some(player) => {
            let call = player.state.lock().call.clone();
            match call {
                Some(call) => call
                    .lock()
                    .await
                    .current_channel()
                    .map(|c| ChannelId::new(c.0.get())),
                None => None,
            }
        }
        None => None,
    };

    match connected_channel {
        Some(current) if current == user_channel => {
            // Ya conectado donde está el usuario: refrescar el timer ocioso
            if let Some(player) = bot.registry().get(guild_id) {
                let mut state = player.state.lock();
                if !state.is_audible() && state.queue.is_empty() {
                    state.idle_since = Some(Instant::now());
                }
            }
            respond_ephemeral(ctx, command, "Ya estoy en tu canal de voz.").await
        }
        Some(_) => {
            // Moverse al canal del usuario
            match join_channel(ctx, guild_id, user_channel, bot).await {
                Ok(()) => {
                    respond_ephemeral(ctx, command, &format!("Me moví a <#{}>.", user_channel))
                        .await
                }
                Err(msg) => respond_ephemeral(ctx, command, &msg).await,
            }
        }
        None => match join_channel(ctx, guild_id, user_channel, bot).await {
            Ok(()) => {
                respond_ephemeral(ctx, command, &format!("Me uní a <#{}>.", user_channel)).await
            }
            Err(msg) => respond_ephemeral(ctx, command, &msg).await,
        },
    }
}

async fn handle_leave(
    ctx: &Context,
    command: &CommandInteraction,
    bot: &CadenciaBot,
) -> Result<()> {
    let guild_id = require_guild(command)?;

    let connected = bot
        .registry()
        .get(guild_id)
        .map(|p| p.state.lock().has_connection())
        .unwrap_or(false);

    if !connected {
        return respond_ephemeral(ctx, command, "No estoy en un canal de voz.").await;
    }

    // Superseder el mensaje de controles antes de soltar el estado
    if let Some(player) = bot.registry().get(guild_id) {
        let msg_ref = player.state.lock().take_now_playing_msg();
        if let Some((channel_id, message_id)) = msg_ref {
            ReplyTarget::new(ctx.http.clone(), channel_id)
                .edit_silent(
                    message_id,
                    "*Desconectado.*",
                    buttons::render_controls_disabled(),
                )
                .await;
        }
    }

    bot.registry().clear_guild(guild_id);

    if let Some(manager) = songbird::get(ctx).await {
        if let Err(e) = manager.remove(guild_id).await {
            warn!("Error desconectando guild {}: {}", guild_id, e);
        }
    }

    info!("👋 Desconectado de guild {} por comando", guild_id);
    respond_ephemeral(ctx, command, "👋 Desconectado.").await
}

async fn handle_pause(
    ctx: &Context,
    command: &CommandInteraction,
    bot: &CadenciaBot,
) -> Result<()> {
    let guild_id = require_guild(command)?;

    if bot.coordinator()?.pause(guild_id) {
        respond_public(ctx, command, "⏸️ Reproducción pausada").await
    } else {
        respond_ephemeral(ctx, command, "No hay nada sonando.").await
    }
}

async fn handle_resume(
    ctx: &Context,
    command: &CommandInteraction,
    bot: &CadenciaBot,
) -> Result<()> {
    let guild_id = require_guild(command)?;

    if bot.coordinator()?.resume(guild_id) {
        respond_public(ctx, command, "▶️ Reproducción reanudada").await
    } else {
        respond_ephemeral(ctx, command, "No hay nada pausado.").await
    }
}

async fn handle_skip(ctx: &Context, command: &CommandInteraction, bot: &CadenciaBot) -> Result<()> {
    let guild_id = require_guild(command)?;

    match bot.coordinator()?.skip(guild_id, command.channel_id) {
        SkipOutcome::Skipped => respond_public(ctx, command, "⏭️ Saltando...").await,
        SkipOutcome::ForcedAdvance => {
            respond_public(ctx, command, "🔄 Probando la siguiente...").await
        }
        SkipOutcome::NothingToSkip => respond_ephemeral(ctx, command, "Nada que saltar.").await,
    }
}

async fn handle_stop(ctx: &Context, command: &CommandInteraction, bot: &CadenciaBot) -> Result<()> {
    let guild_id = require_guild(command)?;

    match bot.coordinator()?.stop(guild_id) {
        StopOutcome::Stopped { superseded } => {
            // Deshabilitar la botonera del mensaje que quedó huérfano
            if let Some((channel_id, message_id)) = superseded {
                ReplyTarget::new(ctx.http.clone(), channel_id)
                    .edit_silent(
                        message_id,
                        "*Reproducción detenida.*",
                        buttons::render_controls_disabled(),
                    )
                    .await;
            }
            respond_public(ctx, command, "⏹️ Música detenida y cola limpiada.").await
        }
        StopOutcome::NotPlaying => respond_ephemeral(ctx, command, "No hay nada sonando.").await,
    }
}

async fn handle_queue(
    ctx: &Context,
    command: &CommandInteraction,
    bot: &CadenciaBot,
) -> Result<()> {
    let guild_id = require_guild(command)?;

    match bot.coordinator()?.queue_view(guild_id) {
        Some((current, snapshot)) if current.is_some() || snapshot.total > 0 => {
            let embed = embeds::create_queue_embed(current.as_ref(), &snapshot);
            command
                .create_response(
                    &ctx.http,
                    CreateInteractionResponse::Message(
                        CreateInteractionResponseMessage::new().embed(embed),
                    ),
                )
                .await?;
            Ok(())
        }
        _ => respond_ephemeral(ctx, command, "La cola está vacía y no hay nada sonando.").await,
    }
}

async fn handle_effect(
    ctx: &Context,
    command: &CommandInteraction,
    bot: &CadenciaBot,
) -> Result<()> {
    let guild_id = require_guild(command)?;

    let Some(effect) = option_str(command, "perfil").and_then(EffectProfile::from_option_value)
    else {
        return respond_ephemeral(ctx, command, "❌ Perfil de efecto desconocido.").await;
    };

    bot.coordinator()?.set_effect(guild_id, effect);
    respond_ephemeral(
        ctx,
        command,
        &format!(
            "🎧 Efecto: **{}** (aplica a la próxima pista).",
            effect.display_name()
        ),
    )
    .await
}

async fn handle_setup_role(
    ctx: &Context,
    command: &CommandInteraction,
    bot: &CadenciaBot,
) -> Result<()> {
    let guild_id = require_guild(command)?;

    let Some(role_id) = option_role(command, "role") else {
        return respond_ephemeral(ctx, command, "❌ Falta el rol.").await;
    };
    let Some(label) = option_str(command, "label") else {
        return respond_ephemeral(ctx, command, "❌ Falta el texto del botón.").await;
    };
    let style = option_str(command, "style").unwrap_or("secondary").to_string();
    let emoji = option_str(command, "emoji").map(|s| s.to_string());

    if label.len() > roles::MAX_LABEL_LEN {
        return respond_ephemeral(ctx, command, "El texto es muy largo (máx 80).").await;
    }
    if emoji.as_ref().map(|e| e.len() > roles::MAX_EMOJI_LEN).unwrap_or(false) {
        return respond_ephemeral(ctx, command, "El emoji es muy largo.").await;
    }

    // Jerarquía: el rol del bot debe estar por encima del rol a gestionar
    let hierarchy_ok = {
        match ctx.cache.guild(guild_id) {
            Some(guild) => {
                let bot_id = ctx.cache.current_user().id;
                let target_pos = guild.roles.get(&role_id).map(|r| r.position).unwrap_or(0);
                let bot_top = guild
                    .members
                    .get(&bot_id)
                    .map(|m| {
                        m.roles
                            .iter()
                            .filter_map(|rid| guild.roles.get(rid))
                            .map(|r| r.position)
                            .max()
                            .unwrap_or(0)
                    })
                    // Miembro fuera de caché: no bloquear por falta de datos
                    .unwrap_or(u16::MAX);
                bot_top > target_pos
            }
            None => true,
        }
    };

    if !hierarchy_ok {
        return respond_ephemeral(
            ctx,
            command,
            "Mi rol no está suficientemente alto para gestionar ese rol.",
        )
        .await;
    }

    bot.roles
        .setup_role(guild_id, role_id, label.to_string(), style, emoji)
        .await?;

    respond_ephemeral(
        ctx,
        command,
        &format!(
            "✅ Botón de rol para <@&{}> configurado. Usa `/role_menu`.",
            role_id
        ),
    )
    .await
}

async fn handle_remove_role(
    ctx: &Context,
    command: &CommandInteraction,
    bot: &CadenciaBot,
) -> Result<()> {
    let guild_id = require_guild(command)?;

    let Some(role_id) = option_role(command, "role") else {
        return respond_ephemeral(ctx, command, "❌ Falta el rol.").await;
    };

    if bot.roles.remove_role(guild_id, role_id).await? {
        respond_ephemeral(
            ctx,
            command,
            &format!("🗑️ Configuración de <@&{}> eliminada.", role_id),
        )
        .await
    } else {
        respond_ephemeral(
            ctx,
            command,
            &format!("El rol <@&{}> no está configurado.", role_id),
        )
        .await
    }
}

async fn handle_role_menu(
    ctx: &Context,
    command: &CommandInteraction,
    bot: &CadenciaBot,
) -> Result<()> {
    let guild_id = require_guild(command)?;

    let Some(components) = bot.roles.menu_components(guild_id).await else {
        return respond_ephemeral(ctx, command, "No hay roles configurados. Usa `/setup_role`.")
            .await;
    };

    command
        .channel_id
        .send_message(
            &ctx.http,
            CreateMessage::new()
                .content("**Roles auto-asignables**\nPulsa los botones para añadir/quitar:")
                .components(components),
        )
        .await?;

    info!(
        "🏷️ Menú de roles publicado por {} en guild {}",
        command.user.id, guild_id
    );
    respond_ephemeral(
        ctx,
        command,
        &format!("Menú de roles publicado en <#{}>.", command.channel_id),
    )
    .await
}

async fn handle_ask(ctx: &Context, command: &CommandInteraction, bot: &CadenciaBot) -> Result<()> {
    let Some(prompt) = option_str(command, "prompt").map(|s| s.to_string()) else {
        return respond_ephemeral(ctx, command, "❌ Falta el prompt.").await;
    };

    if !bot.ai.is_available() {
        return respond_ephemeral(ctx, command, "Módulo de IA no disponible.").await;
    }

    command
        .create_response(
            &ctx.http,
            CreateInteractionResponse::Defer(CreateInteractionResponseMessage::new()),
        )
        .await?;

    let content = match bot.ai.ask(&prompt).await {
        Ok(answer) => format!(
            ">>> <@{}> preguntó:\n> {}\n\n**IA:**\n{}",
            command.user.id, prompt, answer
        ),
        Err(e) => format!("❌ Error de IA: {}", e),
    };

    command
        .edit_response(&ctx.http, EditInteractionResponse::new().content(content))
        .await?;

    Ok(())
}

async fn handle_help(ctx: &Context, command: &CommandInteraction) -> Result<()> {
    command
        .create_response(
            &ctx.http,
            CreateInteractionResponse::Message(
                CreateInteractionResponseMessage::new()
                    .embed(embeds::create_help_embed())
                    .ephemeral(true),
            ),
        )
        .await?;
    Ok(())
}

// Utilidades de voz

/// Garantiza una conexión de voz para la guild, uniéndose al canal del
/// usuario si hace falta. Devuelve un mensaje de error apto para el usuario
/// cuando no se puede.
async fn ensure_voice(
    ctx: &Context,
    guild_id: GuildId,
    user_id: UserId,
    bot: &CadenciaBot,
) -> Result<(), String> {
    let already_connected = bot
        .registry()
        .get(guild_id)
        .map(|p| p.state.lock().has_connection())
        .unwrap_or(false);

    if already_connected {
        return Ok(());
    }

    let Some(channel_id) = user_voice_channel(ctx, guild_id, user_id) else {
        return Err("Necesitas estar en un canal de voz.".to_string());
    };

    join_channel(ctx, guild_id, channel_id, bot).await
}

/// Conecta (o mueve) el bot al canal dado y registra la conexión en el
/// estado de la guild, arrancando el timer de inactividad.
async fn join_channel(
    ctx: &Context,
    guild_id: GuildId,
    channel_id: ChannelId,
    bot: &CadenciaBot,
) -> Result<(), String> {
    let Some(manager) = songbird::get(ctx).await else {
        return Err("Songbird no inicializado".to_string());
    };

    match manager.join(guild_id, channel_id).await {
        Ok(call) => {
            let player = bot.registry().get_or_create(guild_id);
            let mut state = player.state.lock();
            state.call = Some(call);
            if !state.is_audible() && state.queue.is_empty() {
                state.idle_since = Some(Instant::now());
            }
            info!("🔊 Conectado al canal {} en guild {}", channel_id, guild_id);
            Ok(())
        }
        Err(e) => {
            warn!(
                "Error uniéndose al canal {} en guild {}: {}",
                channel_id, guild_id, e
            );
            // Un timeout de handshake es el síntoma típico de falta de
            // permisos de conexión en el canal
            let msg = match e {
                songbird::error::JoinError::TimedOut => format!(
                    "No pude unirme a <#{}>: {}.",
                    channel_id,
                    PlaybackError::PermissionDenied
                ),
                other => format!("No pude unirme a <#{}>. Error: {}", channel_id, other),
            };
            Err(msg)
        }
    }
}

fn user_voice_channel(ctx: &Context, guild_id: GuildId, user_id: UserId) -> Option<ChannelId> {
    ctx.cache
        .guild(guild_id)
        .and_then(|guild| guild.voice_states.get(&user_id).and_then(|vs| vs.channel_id))
}

// Utilidades de opciones y respuestas

fn require_guild(command: &CommandInteraction) -> Result<GuildId> {
    command
        .guild_id
        .ok_or_else(|| anyhow::anyhow!("Comando usado fuera de un servidor"))
}

fn option_str<'a>(command: &'a CommandInteraction, name: &str) -> Option<&'a str> {
    command
        .data
        .options
        .iter()
        .find(|opt| opt.name == name)
        .and_then(|opt| opt.value.as_str())
}

fn option_role(command: &CommandInteraction, name: &str) -> Option<RoleId> {
    command
        .data
        .options
        .iter()
        .find(|opt| opt.name == name)
        .and_then(|opt| opt.value.as_role_id())
}

async fn respond_public(ctx: &Context, command: &CommandInteraction, content: &str) -> Result<()> {
    command
        .create_response(
            &ctx.http,
            CreateInteractionResponse::Message(
                CreateInteractionResponseMessage::new().content(content),
            ),
        )
        .await?;
    Ok(())
}

async fn respond_ephemeral(
    ctx: &Context,
    command: &CommandInteraction,
    content: &str,
) -> Result<()> {
    command
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
