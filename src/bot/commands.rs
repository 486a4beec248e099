use anyhow::Result;
use serenity::{
    builder::{CreateCommand, CreateCommandOption},
    model::{application::CommandOptionType, id::GuildId, permissions::Permissions},
    prelude::Context,
};

/// Registra comandos globales
pub async fn register_global_commands(ctx: &Context) -> Result<()> {
    for command in all_commands() {
        ctx.http.create_global_command(&command).await?;
    }

    Ok(())
}

/// Registra comandos para una guild específica (desarrollo)
pub async fn register_guild_commands(ctx: &Context, guild_id: GuildId) -> Result<()> {
    guild_id.set_commands(&ctx.http, all_commands()).await?;

    Ok(())
}

fn all_commands() -> Vec<CreateCommand> {
    vec![
        // Música
        play_command(),
        join_command(),
        leave_command(),
        pause_command(),
        resume_command(),
        skip_command(),
        stop_command(),
        queue_command(),
        effect_command(),
        // Roles
        setup_role_command(),
        remove_role_command(),
        role_menu_command(),
        // IA
        ask_command(),
        // Moderación
        kick_command(),
        ban_command(),
        clear_command(),
        // Ayuda
        help_command(),
    ]
}

// Comandos de música

fn play_command() -> CreateCommand {
    CreateCommand::new("play")
        .description("Busca en YouTube o reproduce una URL y la agrega a la cola")
        .add_option(
            CreateCommandOption::new(
                CommandOptionType::String,
                "query",
                "Término de búsqueda o URL",
            )
            .required(true),
        )
}

fn join_command() -> CreateCommand {
    CreateCommand::new("join").description("Hace que el bot entre a tu canal de voz")
}

fn leave_command() -> CreateCommand {
    CreateCommand::new("leave").description("Desconecta el bot del canal de voz")
}

fn pause_command() -> CreateCommand {
    CreateCommand::new("pause").description("Pausa la reproducción actual")
}

fn resume_command() -> CreateCommand {
    CreateCommand::new("resume").description("Reanuda la reproducción pausada")
}

fn skip_command() -> CreateCommand {
    CreateCommand::new("skip").description("Salta a la siguiente canción")
}

fn stop_command() -> CreateCommand {
    CreateCommand::new("stop").description("Detiene la música y limpia la cola")
}

fn queue_command() -> CreateCommand {
    CreateCommand::new("queue").description("Muestra la cola de reproducción")
}

fn effect_command() -> CreateCommand {
    CreateCommand::new("effect")
        .description("Fija el efecto de audio para la próxima pista")
        .add_option(
            CreateCommandOption::new(CommandOptionType::String, "perfil", "Perfil de efecto")
                .add_string_choice("Normal", "normal")
                .add_string_choice("Bass Boost", "bassboost")
                .add_string_choice("8D Audio", "8d")
                .required(true),
        )
}

// Comandos de roles

fn setup_role_command() -> CreateCommand {
    CreateCommand::new("setup_role")
        .description("Agrega o actualiza un botón de rol auto-asignable")
        .default_member_permissions(Permissions::MANAGE_ROLES)
        .add_option(
            CreateCommandOption::new(CommandOptionType::Role, "role", "Rol a asignar")
                .required(true),
        )
        .add_option(
            CreateCommandOption::new(CommandOptionType::String, "label", "Texto del botón")
                .required(true),
        )
        .add_option(
            CreateCommandOption::new(CommandOptionType::String, "style", "Color del botón")
                .add_string_choice("Secondary (gris)", "secondary")
                .add_string_choice("Primary (azul)", "primary")
                .add_string_choice("Success (verde)", "success")
                .add_string_choice("Danger (rojo)", "danger"),
        )
        .add_option(CreateCommandOption::new(
            CommandOptionType::String,
            "emoji",
            "Emoji opcional",
        ))
}

fn remove_role_command() -> CreateCommand {
    CreateCommand::new("remove_role")
        .description("Elimina un rol del menú de botones auto-asignables")
        .default_member_permissions(Permissions::MANAGE_ROLES)
        .add_option(
            CreateCommandOption::new(CommandOptionType::Role, "role", "Rol a eliminar del menú")
                .required(true),
        )
}

fn role_menu_command() -> CreateCommand {
    CreateCommand::new("role_menu")
        .description("Publica el mensaje con los botones de roles auto-asignables")
        .default_member_permissions(Permissions::MANAGE_ROLES)
}

// Comando de IA

fn ask_command() -> CreateCommand {
    CreateCommand::new("ask")
        .description("Hazle una pregunta a la IA (Gemini)")
        .add_option(
            CreateCommandOption::new(CommandOptionType::String, "prompt", "La pregunta o prompt")
                .required(true),
        )
}

// Comandos de moderación

fn kick_command() -> CreateCommand {
    CreateCommand::new("kick")
        .description("Expulsa a un miembro del servidor")
        .default_member_permissions(Permissions::KICK_MEMBERS)
        .add_option(
            CreateCommandOption::new(CommandOptionType::User, "member", "Miembro a expulsar")
                .required(true),
        )
        .add_option(CreateCommandOption::new(
            CommandOptionType::String,
            "reason",
            "Razón de la expulsión",
        ))
}

fn ban_command() -> CreateCommand {
    CreateCommand::new("ban")
        .description("Banea a un miembro del servidor")
        .default_member_permissions(Permissions::BAN_MEMBERS)
        .add_option(
            CreateCommandOption::new(CommandOptionType::User, "member", "Miembro a banear")
                .required(true),
        )
        .add_option(CreateCommandOption::new(
            CommandOptionType::String,
            "reason",
            "Razón del baneo",
        ))
}

fn clear_command() -> CreateCommand {
    CreateCommand::new("clear")
        .description("Borra una cantidad de mensajes del canal")
        .default_member_permissions(Permissions::MANAGE_MESSAGES)
        .add_option(
            CreateCommandOption::new(
                CommandOptionType::Integer,
                "amount",
                "Cantidad de mensajes a borrar (máx 100)",
            )
            .min_int_value(1)
            .max_int_value(100)
            .required(true),
        )
}

fn help_command() -> CreateCommand {
    CreateCommand::new("help").description("Muestra los comandos disponibles")
}
