//! # Bot Module
//!
//! Main Discord bot implementation for Cadencia.
//!
//! This module contains the core bot logic, including:
//! - Command registration and handling
//! - Voice connection management
//! - Event handling (ready, interactions, voice state updates)
//! - Background coordinator and inactivity monitor startup
//!
//! ## Architecture
//!
//! The bot is built around the [`CadenciaBot`] struct which implements
//! Serenity's [`EventHandler`] trait. It manages:
//!
//! - Per-guild playback state through [`PlayerRegistry`]
//! - Queue progression through [`PlaybackCoordinator`]
//! - Self-assignable roles via [`RoleManager`] backed by [`JsonStorage`]
//! - AI passthrough via [`GeminiClient`]

use anyhow::Result;
use serenity::{
    all::{Context, EventHandler, GuildId, Interaction, Ready, VoiceState},
    async_trait,
};
use std::sync::{Arc, OnceLock};
use tracing::{error, info, warn};

pub mod admin;
pub mod commands;
pub mod handlers;

use crate::{
    ai::GeminiClient,
    audio::{
        coordinator::PlaybackCoordinator, inactivity::InactivityMonitor, state::PlayerRegistry,
    },
    config::Config,
    roles::RoleManager,
    storage::JsonStorage,
};

/// Main Discord bot handler for Cadencia.
///
/// ## Thread Safety
///
/// All fields are wrapped in appropriate synchronization primitives:
/// - [`Arc`] for shared ownership
/// - [`tokio::sync::Mutex`] for async-safe exclusive access (storage)
/// - `parking_lot`/`dashmap` inside the registry for per-guild state
pub struct CadenciaBot {
    /// Bot configuration loaded from environment variables
    config: Arc<Config>,
    /// Estados de reproducción por guild
    registry: Arc<PlayerRegistry>,
    /// JSON-based persistent storage (configuración de roles)
    #[allow(dead_code)]
    pub storage: Arc<tokio::sync::Mutex<JsonStorage>>,
    /// Roles auto-asignables
    pub roles: RoleManager,
    /// Cliente de IA (Gemini)
    pub ai: GeminiClient,
    /// Coordinador de reproducción; se inicializa en `ready` porque necesita
    /// el Http del cliente ya construido
    coordinator: OnceLock<Arc<PlaybackCoordinator>>,
}

impl CadenciaBot {
    pub fn new(config: Config, storage: Arc<tokio::sync::Mutex<JsonStorage>>) -> Self {
        let config = Arc::new(config);
        let ai = GeminiClient::new(config.google_api_key.clone());

        Self {
            config,
            registry: Arc::new(PlayerRegistry::new()),
            roles: RoleManager::new(storage.clone()),
            storage,
            ai,
            coordinator: OnceLock::new(),
        }
    }

    pub fn registry(&self) -> &Arc<PlayerRegistry> {
        &self.registry
    }

    /// Coordinador de reproducción, disponible tras el evento `ready`.
    pub fn coordinator(&self) -> Result<Arc<PlaybackCoordinator>> {
        self.coordinator
            .get()
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("Coordinador no inicializado todavía"))
    }

    /// Registers slash commands with Discord, globally or per-guild
    /// depending on configuration (guild registration propagates faster,
    /// useful for development).
    async fn register_commands(&self, ctx: &Context) -> Result<()> {
        info!("📝 Registrando comandos slash...");

        match self.config.guild_id {
            Some(guild_id) => {
                let guild_id = GuildId::new(guild_id);
                info!("🏠 Registrando comandos para guild específica: {}", guild_id);

                if !ctx.cache.guilds().contains(&guild_id) {
                    warn!("⚠️ El bot no está en la guild especificada: {}", guild_id);
                    return Ok(());
                }

                commands::register_guild_commands(ctx, guild_id).await?;
                info!("✅ Comandos de guild registrados para: {}", guild_id);
            }
            None => {
                info!("🌐 Registrando comandos globalmente");
                commands::register_global_commands(ctx).await?;
                info!("✅ Comandos globales registrados");
            }
        }

        Ok(())
    }
}

#[async_trait]
impl EventHandler for CadenciaBot {
    async fn ready(&self, ctx: Context, ready: Ready) {
        info!("🤖 {} está en línea!", ready.user.name);
        info!("📊 Conectado a {} servidores", ready.guilds.len());

        if let Err(e) = self.register_commands(&ctx).await {
            error!("Error al registrar comandos: {:?}", e);
        }

        // Inicializar coordinador y monitor una sola vez: ready puede volver
        // a dispararse en reconexiones
        if self.coordinator.get().is_none() {
            let coordinator =
                PlaybackCoordinator::spawn(self.registry.clone(), ctx.http.clone(), &self.config);

            if self.coordinator.set(coordinator).is_ok() {
                match songbird::get(&ctx).await {
                    Some(manager) => {
                        let _monitor = InactivityMonitor::spawn(
                            self.registry.clone(),
                            manager,
                            ctx.http.clone(),
                            &self.config,
                        );
                    }
                    None => {
                        error!("Songbird no inicializado; monitor de inactividad apagado");
                    }
                }
            }
        }
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        match interaction {
            Interaction::Command(command_interaction) => {
                if let Err(e) = handlers::handle_command(&ctx, command_interaction, self).await {
                    error!("Error manejando comando: {:?}", e);
                }
            }
            Interaction::Component(component_interaction) => {
                if let Err(e) = handlers::handle_component(&ctx, component_interaction, self).await
                {
                    error!("Error manejando componente: {:?}", e);
                }
            }
            _ => {}
        }
    }

    /// Si el bot es desconectado del canal externamente (kick del canal,
    /// desconexión manual), el estado de la guild se limpia igual que con
    /// /leave.
    async fn voice_state_update(&self, ctx: Context, old: Option<VoiceState>, new: VoiceState) {
        let current_user_id = ctx.cache.current_user().id;

        if new.user_id == current_user_id && old.is_some() && new.channel_id.is_none() {
            if let Some(guild_id) = new.guild_id {
                info!("🔌 Bot desconectado externamente en guild {}", guild_id);
                self.registry.clear_guild(guild_id);
            }
        }
    }
}
