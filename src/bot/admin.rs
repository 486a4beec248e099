use anyhow::Result;
use serenity::{
    all::{CommandInteraction, Context},
    builder::{
        CreateInteractionResponse, CreateInteractionResponseFollowup,
        CreateInteractionResponseMessage, GetMessages,
    },
    model::id::UserId,
};
use tracing::{error, info};

/// Expulsa a un miembro del servidor.
pub async fn handle_kick(ctx: &Context, command: &CommandInteraction) -> Result<()> {
    let guild_id = command
        .guild_id
        .ok_or_else(|| anyhow::anyhow!("Comando usado fuera de un servidor"))?;

    let Some(target) = option_user(command, "member") else {
        return respond(ctx, command, "❌ Falta el miembro a expulsar.", true).await;
    };
    let reason = option_str(command, "reason").unwrap_or("Sin razón especificada");

    if target == command.user.id {
        return respond(ctx, command, "¡No puedes expulsarte a ti mismo!", true).await;
    }
    if target == ctx.cache.current_user().id {
        return respond(ctx, command, "¡No puedo expulsarme a mí mismo!", true).await;
    }

    let audit_reason = format!("Expulsado por {}: {}", command.user.name, reason);
    match guild_id
        .kick_with_reason(&ctx.http, target, &audit_reason)
        .await
    {
        Ok(()) => {
            info!(
                "👢 {} expulsó a {} en guild {} (razón: {})",
                command.user.id, target, guild_id, reason
            );
            respond(
                ctx,
                command,
                &format!("👢 Expulsado <@{}> por: {}", target, reason),
                false,
            )
            .await
        }
        Err(e) => {
            error!("Expulsión de {} falló: {}", target, e);
            respond(
                ctx,
                command,
                "❌ No pude expulsar. ¿Tengo permisos y jerarquía suficiente?",
                true,
            )
            .await
        }
    }
}

/// Banea a un miembro del servidor.
pub async fn handle_ban(ctx: &Context, command: &CommandInteraction) -> Result<()> {
    let guild_id = command
        .guild_id
        .ok_or_else(|| anyhow::anyhow!("Comando usado fuera de un servidor"))?;

    let Some(target) = option_user(command, "member") else {
        return respond(ctx, command, "❌ Falta el miembro a banear.", true).await;
    };
    let reason = option_str(command, "reason").unwrap_or("Sin razón especificada");

    if target == command.user.id {
        return respond(ctx, command, "¡No puedes banearte a ti mismo!", true).await;
    }
    if target == ctx.cache.current_user().id {
        return respond(ctx, command, "¡No puedo banearme a mí mismo!", true).await;
    }

    let audit_reason = format!("Baneado por {}: {}", command.user.name, reason);
    match guild_id
        .ban_with_reason(&ctx.http, target, 0, &audit_reason)
        .await
    {
        Ok(()) => {
            info!(
                "🔨 {} baneó a {} en guild {} (razón: {})",
                command.user.id, target, guild_id, reason
            );
            respond(
                ctx,
                command,
                &format!("🔨 Baneado <@{}> por: {}", target, reason),
                false,
            )
            .await
        }
        Err(e) => {
            error!("Baneo de {} falló: {}", target, e);
            respond(
                ctx,
                command,
                "❌ No pude banear. ¿Tengo permisos y jerarquía suficiente?",
                true,
            )
            .await
        }
    }
}

/// Borra en masa los últimos N mensajes del canal (1..=100).
pub async fn handle_clear(ctx: &Context, command: &CommandInteraction) -> Result<()> {
    let amount = command
        .data
        .options
        .iter()
        .find(|opt| opt.name == "amount")
        .and_then(|opt| opt.value.as_i64())
        .unwrap_or(0)
        .clamp(1, 100) as u8;

    command
        .create_response(
            &ctx.http,
            CreateInteractionResponse::Defer(
                CreateInteractionResponseMessage::new().ephemeral(true),
            ),
        )
        .await?;

    let channel_id = command.channel_id;
    let messages = channel_id
        .messages(&ctx.http, GetMessages::new().limit(amount))
        .await?;
    let ids: Vec<_> = messages.iter().map(|m| m.id).collect();
    let deleted = ids.len();

    match channel_id.delete_messages(&ctx.http, ids).await {
        Ok(()) => {
            info!(
                "🗑️ {} borró {} mensajes en canal {} guild {:?}",
                command.user.id, deleted, channel_id, command.guild_id
            );
            command
                .create_followup(
                    &ctx.http,
                    CreateInteractionResponseFollowup::new()
                        .content(format!("🗑️ {} mensaje(s) borrados.", deleted))
                        .ephemeral(true),
                )
                .await?;
        }
        Err(e) => {
            error!("Borrado masivo falló en canal {}: {}", channel_id, e);
            command
                .create_followup(
                    &ctx.http,
                    CreateInteractionResponseFollowup::new()
                        .content("❌ No pude borrar. ¿Tengo el permiso 'Gestionar mensajes'?")
                        .ephemeral(true),
                )
                .await?;
        }
    }

    Ok(())
}

fn option_user(command: &CommandInteraction, name: &str) -> Option<UserId> {
    command
        .data
        .options
        .iter()
        .find(|opt| opt.name == name)
        .and_then(|opt| opt.value.as_user_id())
}

fn option_str<'a>(command: &'a CommandInteraction, name: &str) -> Option<&'a str> {
    command
        .data
        .options
        .iter()
        .find(|opt| opt.name == name)
        .and_then(|opt| opt.value.as_str())
}

async fn respond(
    ctx: &Context,
    command: &CommandInteraction,
    content: &str,
    ephemeral: bool,
) -> Result<()> {
    command
        .create_response(
            &ctx.http,
            CreateInteractionResponse::Message(
                CreateInteractionResponseMessage::new()
                    .content(content)
                    .ephemeral(ephemeral),
            ),
        )
        .await?;
    Ok(())
}
