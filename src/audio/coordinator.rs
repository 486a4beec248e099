use serenity::{
    builder::{CreateActionRow, CreateEmbed},
    http::Http,
    model::id::{ChannelId, GuildId},
};
use songbird::{
    tracks::PlayMode, Event, EventContext, EventHandler as VoiceEventHandler, TrackEvent,
};
use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Instant,
};
use tokio::sync::mpsc::{self, UnboundedSender};
use tracing::{debug, error, info, warn};

use crate::{
    audio::{
        effects::{self, EffectProfile},
        queue::{QueueEntry, QueueSnapshot},
        state::{ControlsSnapshot, PlaybackStatus, PlayerRegistry},
    },
    config::Config,
    error::PlaybackError,
    sources::{TrackMetadata, TrackResolver},
    ui::{buttons, embeds, reply::ReplyTarget},
};

/// Origen de una señal de avance. El avance de cola tiene exactamente tres
/// disparadores: un enqueue con la guild ociosa, la recuperación por skip
/// desde la botonera, y el evento de finalización de pista.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvanceReason {
    QueueStarted,
    Skip,
    TrackEnded,
}

/// Señal encolada hacia el despachador del coordinador. El callback de
/// finalización de songbird solo envía esto; nunca toca estado de guild.
pub struct AdvanceSignal {
    pub guild_id: GuildId,
    pub channel_id: ChannelId,
    pub reason: AdvanceReason,
    pub player_error: Option<String>,
}

/// Resultado de una petición de skip desde la botonera o el comando.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipOutcome {
    /// Había pista sonando/pausada; se detuvo y la señal End avanza la cola.
    Skipped,
    /// Nada sonando pero cola con entradas: se forzó un avance
    /// (recuperación de un estado desincronizado).
    ForcedAdvance,
    /// Ni pista ni cola; no se mutó nada.
    NothingToSkip,
}

/// Resultado del botón pausa/reanudar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PauseToggle {
    Paused,
    Resumed,
}

/// Resultado de una petición de stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// Se detuvo la pista; `superseded` es el mensaje de controles que quedó
    /// huérfano, para que la superficie lo deshabilite.
    Stopped {
        superseded: Option<(ChannelId, serenity::model::id::MessageId)>,
    },
    NotPlaying,
}

/// Máquina de estados de reproducción por guild. `advance_queue` es la única
/// función de transición; el resto de operaciones (pause, resume, skip,
/// stop, set_effect) son mutaciones finas sobre el estado vivo.
pub struct PlaybackCoordinator {
    registry: Arc<PlayerRegistry>,
    resolver: TrackResolver,
    http: Arc<Http>,
    tx: UnboundedSender<AdvanceSignal>,
    default_volume: f32,
    max_resolve_failures: u32,
}

impl PlaybackCoordinator {
    /// Crea el coordinador y lanza su despachador: un loop que recibe
    /// señales de avance y las aplica. Este canal es el traspaso explícito
    /// entre el hilo del driver de audio y el estado compartido.
    pub fn spawn(registry: Arc<PlayerRegistry>, http: Arc<Http>, config: &Config) -> Arc<Self> {
        let (tx, mut rx) = mpsc::unbounded_channel::<AdvanceSignal>();

        let coordinator = Arc::new(Self {
            registry,
            resolver: TrackResolver::new(),
            http,
            tx,
            default_volume: config.default_volume,
            max_resolve_failures: config.max_resolve_failures,
        });

        let dispatcher = coordinator.clone();
        tokio::spawn(async move {
            while let Some(signal) = rx.recv().await {
                let coord = dispatcher.clone();
                tokio::spawn(async move {
                    coord.handle_signal(signal).await;
                });
            }
            debug!("Despachador del coordinador terminado");
        });

        coordinator
    }

    /// Encola una señal de avance. Usable desde cualquier hilo/tarea.
    pub fn trigger(&self, guild_id: GuildId, channel_id: ChannelId, reason: AdvanceReason) {
        let signal = AdvanceSignal {
            guild_id,
            channel_id,
            reason,
            player_error: None,
        };
        if self.tx.send(signal).is_err() {
            error!("Despachador del coordinador caído; señal descartada");
        }
    }

    async fn handle_signal(&self, signal: AdvanceSignal) {
        let reply = self.reply_to(signal.channel_id);

        // Error a mitad de stream: se reporta y se trata como fin natural
        if let Some(err) = signal.player_error.clone() {
            let player_error = PlaybackError::Player(err);
            warn!(
                "Error del reproductor en guild {}: {}",
                signal.guild_id, player_error
            );
            reply
                .send_text_silent(&format!("⚠️ {}. Saltando.", player_error))
                .await;
        }

        match self
            .advance_queue(signal.guild_id, reply, signal.reason)
            .await
        {
            Ok(()) => {}
            Err(PlaybackError::ConnectionLost) => {
                // Sin conexión ya no hay nada que avanzar; exige /join manual
                info!(
                    "Avance abortado en guild {}: conexión perdida",
                    signal.guild_id
                );
            }
            Err(e) => error!("Error avanzando cola en guild {}: {}", signal.guild_id, e),
        }
    }

    /// Avanza la cola de una guild: supersede el mensaje de estado previo,
    /// saca la cabeza de la cola, la resuelve y arranca el stream; con la
    /// cola vacía asienta la guild en Idle.
    ///
    /// Los fallos de resolución se saltan con reintento acotado
    /// (`max_resolve_failures` consecutivos); al agotarse el margen se
    /// descarta la cola restante. La pérdida de conexión aborta el intento
    /// sin reintento.
    pub async fn advance_queue(
        &self,
        guild_id: GuildId,
        reply: ReplyTarget,
        reason: AdvanceReason,
    ) -> Result<(), PlaybackError> {
        let player = self
            .registry
            .get(guild_id)
            .ok_or(PlaybackError::ConnectionLost)?;

        // Un avance a la vez por guild: sin doble-dequeue ni "now playing"
        // duplicados.
        let _advance = player.advance_lock.lock().await;

        {
            let mut state = player.state.lock();
            match reason {
                AdvanceReason::TrackEnded => {
                    // La pista que sonaba concluyó; limpiar antes de decidir
                    // el siguiente paso.
                    state.current_track = None;
                    state.track_handle = None;
                    state.status = PlaybackStatus::Idle;
                }
                AdvanceReason::QueueStarted | AdvanceReason::Skip => {
                    // Disparo rancio: otro avance ya dejó una pista en curso.
                    if state.is_audible() || state.status == PlaybackStatus::Resolving {
                        debug!("Señal {:?} rancia ignorada en guild {}", reason, guild_id);
                        return Ok(());
                    }
                }
            }
        }

        // 1. Supersede el mensaje de estado anterior (best-effort)
        let previous = player.state.lock().take_now_playing_msg();
        if let Some((channel_id, message_id)) = previous {
            ReplyTarget::new(self.http.clone(), channel_id)
                .edit_silent(
                    message_id,
                    "*Reproducción terminada.*",
                    buttons::render_controls_disabled(),
                )
                .await;
        }

        let mut consecutive_failures: u32 = 0;
        loop {
            // 2/3. Tomar la cabeza de la cola con la conexión verificada
            let dequeued = {
                let mut state = player.state.lock();
                let Some(call) = state.call.clone() else {
                    return Err(PlaybackError::ConnectionLost);
                };
                match state.dequeue_head() {
                    Some(entry) => {
                        state.mark_resolving();
                        Some((entry, state.current_effect, call))
                    }
                    None => {
                        state.mark_idle(Instant::now());
                        None
                    }
                }
            };

            let Some((entry, effect, call)) = dequeued else {
                // Estado terminal del ciclo: un enqueue posterior lo reabre
                info!("📭 Cola agotada en guild {}", guild_id);
                reply.send_text_silent("⏹️ Cola terminada.").await;
                return Ok(());
            };

            // La conexión puede haberse caído sin limpiar el estado todavía
            if call.lock().await.current_connection().is_none() {
                player.state.lock().mark_idle(Instant::now());
                return Err(PlaybackError::ConnectionLost);
            }

            // Punto de suspensión: la resolución corre sin ningún lock de
            // estado tomado, así los controles siguen respondiendo.
            match self
                .resolver
                .resolve(&entry.query, effect, entry.requester)
                .await
            {
                Ok(resolved) => {
                    self.start_playback(&player, resolved, &reply, guild_id)
                        .await;
                    return Ok(());
                }
                Err(e) if e.is_recoverable() => {
                    warn!(
                        "Resolución fallida para '{}' en guild {}: {}",
                        entry.query, guild_id, e
                    );
                    reply
                        .send_text_silent(&format!(
                            "❌ No se pudo reproducir `{}`. Saltando.",
                            entry.query
                        ))
                        .await;

                    consecutive_failures += 1;
                    if consecutive_failures >= self.max_resolve_failures {
                        // Cota de reintentos: descartar lo que queda y
                        // asentar Idle en lugar de encadenar fallos sin fin
                        let discarded = {
                            let mut state = player.state.lock();
                            let len = state.queue.len();
                            state.queue.clear();
                            state.mark_idle(Instant::now());
                            len
                        };
                        warn!(
                            "⚠️ {} fallos de resolución seguidos en guild {}; {} entradas descartadas",
                            consecutive_failures, guild_id, discarded
                        );
                        reply
                            .send_text_silent(
                                "⚠️ Demasiados fallos seguidos; la cola restante fue descartada.",
                            )
                            .await;
                        return Ok(());
                    }
                }
                Err(e) => {
                    // Sin transición posible: no dejar la fase en Resolving
                    player.state.lock().mark_idle(Instant::now());
                    return Err(e);
                }
            }
        }
    }

    /// Publica el mensaje de estado y arranca el stream de la pista resuelta.
    async fn start_playback(
        &self,
        player: &crate::audio::state::GuildPlayer,
        resolved: crate::sources::ResolvedTrack,
        reply: &ReplyTarget,
        guild_id: GuildId,
    ) {
        let queue_len = player.state.lock().queue.len();

        // Botonera recién derivada: la pista arranca sonando
        let controls = ControlsSnapshot {
            connected: true,
            playing: true,
            paused: false,
        };
        let embed = embeds::create_now_playing_embed(&resolved.metadata, queue_len);
        let message_id = match reply
            .send_embed(embed, buttons::render_controls(controls))
            .await
        {
            Ok(id) => Some(id),
            Err(e) => {
                // Sin mensaje de estado igual se reproduce
                warn!("No se pudo publicar now-playing en guild {}: {}", guild_id, e);
                None
            }
        };

        let call = player.state.lock().call.clone();
        let Some(call) = call else {
            warn!("Conexión liberada durante la resolución en guild {}", guild_id);
            player.state.lock().mark_idle(Instant::now());
            return;
        };

        let track_handle = {
            let mut call_lock = call.lock().await;
            call_lock.play_input(resolved.input)
        };
        let _ = track_handle.set_volume(self.default_volume);

        // Callback de finalización: exactamente una señal por intento de
        // reproducción, venga por fin natural, stop explícito o error.
        let fired = Arc::new(AtomicBool::new(false));
        for event in [TrackEvent::End, TrackEvent::Error] {
            let handler = TrackDoneHandler {
                tx: self.tx.clone(),
                guild_id,
                channel_id: reply.channel_id(),
                fired: fired.clone(),
            };
            if let Err(e) = track_handle.add_event(Event::Track(event), handler) {
                error!("No se pudo registrar evento de pista: {}", e);
            }
        }

        let title = resolved.metadata.title.clone();
        {
            let mut state = player.state.lock();
            state.mark_playing(resolved.metadata, track_handle);
            if let Some(id) = message_id {
                state.now_playing_msg = Some((reply.channel_id(), id));
            }
        }

        info!("🎵 Reproduciendo '{}' en guild {}", title, guild_id);
    }

    // --- Operaciones de la superficie de control ---

    /// Alterna pausa/reproducción leyendo el estado vivo. `None` si no hay
    /// nada sonando ni pausado.
    pub fn toggle_pause(&self, guild_id: GuildId) -> Option<PauseToggle> {
        let player = self.registry.get(guild_id)?;
        let mut state = player.state.lock();

        match state.status {
            PlaybackStatus::Playing => {
                if let Some(handle) = &state.track_handle {
                    let _ = handle.pause();
                }
                state.mark_paused();
                info!("⏸️ Pausado en guild {}", guild_id);
                Some(PauseToggle::Paused)
            }
            PlaybackStatus::Paused => {
                if let Some(handle) = &state.track_handle {
                    let _ = handle.play();
                }
                state.mark_resumed();
                info!("▶️ Reanudado en guild {}", guild_id);
                Some(PauseToggle::Resumed)
            }
            _ => None,
        }
    }

    pub fn pause(&self, guild_id: GuildId) -> bool {
        let Some(player) = self.registry.get(guild_id) else {
            return false;
        };
        let mut state = player.state.lock();
        if state.status != PlaybackStatus::Playing {
            return false;
        }
        if let Some(handle) = &state.track_handle {
            let _ = handle.pause();
        }
        state.mark_paused();
        true
    }

    pub fn resume(&self, guild_id: GuildId) -> bool {
        let Some(player) = self.registry.get(guild_id) else {
            return false;
        };
        let mut state = player.state.lock();
        if state.status != PlaybackStatus::Paused {
            return false;
        }
        if let Some(handle) = &state.track_handle {
            let _ = handle.play();
        }
        state.mark_resumed();
        true
    }

    /// Salta la pista actual. Si nada suena pero la cola tiene entradas,
    /// fuerza un avance en lugar de reportar error.
    pub fn skip(&self, guild_id: GuildId, channel_id: ChannelId) -> SkipOutcome {
        let Some(player) = self.registry.get(guild_id) else {
            return SkipOutcome::NothingToSkip;
        };

        let mut state = player.state.lock();
        if state.is_audible() {
            if let Some(handle) = &state.track_handle {
                // El stop dispara la señal End, que encadena el avance
                let _ = handle.stop();
            }
            debug!("⏭️ Skip en guild {}", guild_id);
            SkipOutcome::Skipped
        } else if !state.queue.is_empty() {
            drop(state);
            debug!("⏭️ Forzando avance por skip en guild {}", guild_id);
            self.trigger(guild_id, channel_id, AdvanceReason::Skip);
            SkipOutcome::ForcedAdvance
        } else {
            SkipOutcome::NothingToSkip
        }
    }

    /// Detiene la reproducción y limpia la cola. La señal de finalización
    /// resultante observa la cola vacía y asienta la guild en Idle sin
    /// reiniciar nada.
    pub fn stop(&self, guild_id: GuildId) -> StopOutcome {
        let Some(player) = self.registry.get(guild_id) else {
            return StopOutcome::NotPlaying;
        };

        let mut state = player.state.lock();
        if !state.is_audible() {
            return StopOutcome::NotPlaying;
        }

        state.queue.clear();
        // El mensaje se deshabilita en la superficie que pidió el stop; el
        // avance posterior no debe volver a editarlo.
        let superseded = state.take_now_playing_msg();
        if let Some(handle) = &state.track_handle {
            let _ = handle.stop();
        }
        info!("⏹️ Reproducción detenida y cola limpiada en guild {}", guild_id);
        StopOutcome::Stopped { superseded }
    }

    /// Fija el perfil de efecto de la guild. Asignación pura: el filtro se
    /// liga recién en la próxima resolución.
    pub fn set_effect(&self, guild_id: GuildId, effect: EffectProfile) {
        let player = self.registry.get_or_create(guild_id);
        player.state.lock().set_effect(effect);
        effects::log_effect_change(guild_id.get(), effect);
    }

    /// Encola una petición y dispara el avance solo si la guild está ociosa.
    /// Devuelve `true` si se disparó el arranque.
    pub fn enqueue(&self, guild_id: GuildId, channel_id: ChannelId, entry: QueueEntry) -> bool {
        let player = self.registry.get_or_create(guild_id);

        let should_start = {
            let mut state = player.state.lock();
            state.enqueue(entry);
            !state.is_audible() && state.status != PlaybackStatus::Resolving
        };

        if should_start {
            self.trigger(guild_id, channel_id, AdvanceReason::QueueStarted);
        }
        should_start
    }

    /// Vista de la cola para mostrar (pista actual + primeras entradas).
    pub fn queue_view(&self, guild_id: GuildId) -> Option<(Option<TrackMetadata>, QueueSnapshot)> {
        let player = self.registry.get(guild_id)?;
        let view = player.state.lock().queue_view();
        Some(view)
    }

    /// Botonera derivada del estado vivo en este instante.
    #[allow(dead_code)]
    pub fn controls_snapshot(&self, guild_id: GuildId) -> ControlsSnapshot {
        match self.registry.get(guild_id) {
            Some(player) => player.state.lock().controls_snapshot(),
            None => ControlsSnapshot {
                connected: false,
                playing: false,
                paused: false,
            },
        }
    }

    /// Embed + botonera de "reproduciendo ahora" re-derivados del estado
    /// vivo, para re-renders tras una interacción.
    pub fn now_playing_render(
        &self,
        guild_id: GuildId,
    ) -> Option<(CreateEmbed, Vec<CreateActionRow>)> {
        let player = self.registry.get(guild_id)?;
        let state = player.state.lock();
        let track = state.current_track.as_ref()?;
        let embed = embeds::create_now_playing_embed(track, state.queue.len());
        let components = buttons::render_controls(state.controls_snapshot());
        Some((embed, components))
    }

    fn reply_to(&self, channel_id: ChannelId) -> ReplyTarget {
        ReplyTarget::new(self.http.clone(), channel_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::state::PlaybackStatus;
    use serenity::model::id::UserId;

    fn test_coordinator() -> (Arc<PlaybackCoordinator>, Arc<PlayerRegistry>) {
        let registry = Arc::new(PlayerRegistry::new());
        let http = Arc::new(Http::new(""));
        let coordinator = PlaybackCoordinator::spawn(registry.clone(), http, &Config::default());
        (coordinator, registry)
    }

    #[tokio::test]
    async fn test_skip_without_state_or_queue_mutates_nothing() {
        let (coordinator, registry) = test_coordinator();
        let guild = GuildId::new(1);
        let channel = ChannelId::new(2);

        // Guild sin registro
        assert_eq!(coordinator.skip(guild, channel), SkipOutcome::NothingToSkip);

        // Guild registrada pero ociosa y sin cola
        registry.get_or_create(guild);
        assert_eq!(coordinator.skip(guild, channel), SkipOutcome::NothingToSkip);

        let player = registry.get(guild).unwrap();
        let state = player.state.lock();
        assert_eq!(state.status, PlaybackStatus::Idle);
        assert!(state.queue.is_empty());
    }

    #[tokio::test]
    async fn test_skip_with_queue_but_nothing_playing_forces_advance() {
        let (coordinator, registry) = test_coordinator();
        let guild = GuildId::new(3);
        let channel = ChannelId::new(4);

        let player = registry.get_or_create(guild);
        player
            .state
            .lock()
            .enqueue(QueueEntry::new("songB", UserId::new(9)));

        assert_eq!(coordinator.skip(guild, channel), SkipOutcome::ForcedAdvance);
    }

    #[tokio::test]
    async fn test_enqueue_triggers_start_only_when_idle() {
        let (coordinator, registry) = test_coordinator();
        let guild = GuildId::new(5);
        let channel = ChannelId::new(6);

        // Primera petición con la guild ociosa: dispara el arranque
        assert!(coordinator.enqueue(guild, channel, QueueEntry::new("a", UserId::new(1))));

        // Con una pista sonando solo se encola
        let player = registry.get(guild).unwrap();
        player.state.lock().status = PlaybackStatus::Playing;
        assert!(!coordinator.enqueue(guild, channel, QueueEntry::new("b", UserId::new(1))));
        assert_eq!(player.state.lock().queue.len(), 2);
    }

    #[tokio::test]
    async fn test_set_effect_creates_record_lazily() {
        let (coordinator, registry) = test_coordinator();
        let guild = GuildId::new(7);

        coordinator.set_effect(guild, EffectProfile::EightD);

        let player = registry.get(guild).expect("registro creado por set_effect");
        assert_eq!(player.state.lock().current_effect, EffectProfile::EightD);
    }

    #[tokio::test]
    async fn test_stop_without_playback_reports_not_playing() {
        let (coordinator, registry) = test_coordinator();
        let guild = GuildId::new(8);

        assert_eq!(coordinator.stop(guild), StopOutcome::NotPlaying);

        registry.get_or_create(guild);
        assert_eq!(coordinator.stop(guild), StopOutcome::NotPlaying);
    }
}

/// Handler de fin de pista. Registrado para End y Error con un guardián
/// compartido: una sola señal por intento de reproducción.
struct TrackDoneHandler {
    tx: UnboundedSender<AdvanceSignal>,
    guild_id: GuildId,
    channel_id: ChannelId,
    fired: Arc<AtomicBool>,
}

#[async_trait::async_trait]
impl VoiceEventHandler for TrackDoneHandler {
    async fn act(&self, ctx: &EventContext<'_>) -> Option<Event> {
        if self.fired.swap(true, Ordering::SeqCst) {
            return None;
        }

        let player_error = if let EventContext::Track(tracks) = ctx {
            tracks.iter().find_map(|(state, _)| match &state.playing {
                PlayMode::Errored(e) => Some(e.to_string()),
                _ => None,
            })
        } else {
            None
        };

        debug!(
            "Pista terminada en guild {} (error: {})",
            self.guild_id,
            player_error.is_some()
        );

        let signal = AdvanceSignal {
            guild_id: self.guild_id,
            channel_id: self.channel_id,
            reason: AdvanceReason::TrackEnded,
            player_error,
        };
        let _ = self.tx.send(signal);

        None
    }
}
