use dashmap::DashMap;
use parking_lot::Mutex;
use serenity::model::id::{ChannelId, GuildId, MessageId};
use songbird::{tracks::TrackHandle, Call};
use std::{sync::Arc, time::Instant};
use tracing::{debug, info};

use crate::{
    audio::{
        effects::EffectProfile,
        queue::{QueueEntry, QueueSnapshot, TrackQueue},
    },
    sources::TrackMetadata,
};

/// Fase del ciclo de reproducción de una guild.
///
/// Idle → Resolving → Playing ⇄ Paused → (Idle | Resolving). Idle es el
/// estado inicial y el terminal de cada ciclo; un enqueue posterior lo
/// reabre.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackStatus {
    #[default]
    Idle,
    Resolving,
    Playing,
    Paused,
}

/// Vista mínima del estado para renderizar la botonera. Se recalcula en
/// cada render a partir del estado vivo, nunca se cachea.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlsSnapshot {
    pub connected: bool,
    pub playing: bool,
    pub paused: bool,
}

impl ControlsSnapshot {
    /// pause/skip/stop operan solo con una pista sonando o pausada.
    pub fn can_interact_playback(&self) -> bool {
        self.connected && (self.playing || self.paused)
    }
}

/// Estado de reproducción de una guild. Todas las mutaciones pasan por el
/// mutex que lo envuelve en [`GuildPlayer`]; ningún otro componente lo toca
/// directamente.
pub struct GuildPlaybackState {
    pub queue: TrackQueue,
    pub status: PlaybackStatus,
    pub current_effect: EffectProfile,
    pub current_track: Option<TrackMetadata>,
    pub track_handle: Option<TrackHandle>,
    /// Sesión de voz viva. Propiedad exclusiva de este estado: a lo sumo una
    /// por guild.
    pub call: Option<Arc<tokio::sync::Mutex<Call>>>,
    /// Último mensaje de estado/controles publicado. Solo para limpieza.
    pub now_playing_msg: Option<(ChannelId, MessageId)>,
    /// Instante en que la guild quedó ociosa. `None` es el centinela
    /// "activo": solo tiene significado con conexión viva y sin pista.
    pub idle_since: Option<Instant>,
}

impl GuildPlaybackState {
    pub fn new() -> Self {
        Self {
            queue: TrackQueue::new(),
            status: PlaybackStatus::Idle,
            current_effect: EffectProfile::default(),
            current_track: None,
            track_handle: None,
            call: None,
            now_playing_msg: None,
            idle_since: None,
        }
    }

    pub fn has_connection(&self) -> bool {
        self.call.is_some()
    }

    /// Hay una pista sonando o pausada.
    pub fn is_audible(&self) -> bool {
        matches!(self.status, PlaybackStatus::Playing | PlaybackStatus::Paused)
    }

    pub fn controls_snapshot(&self) -> ControlsSnapshot {
        ControlsSnapshot {
            connected: self.has_connection(),
            playing: self.status == PlaybackStatus::Playing,
            paused: self.status == PlaybackStatus::Paused,
        }
    }

    pub fn enqueue(&mut self, entry: QueueEntry) {
        self.queue.push(entry);
    }

    pub fn dequeue_head(&mut self) -> Option<QueueEntry> {
        self.queue.pop()
    }

    pub fn set_effect(&mut self, effect: EffectProfile) {
        self.current_effect = effect;
    }

    /// Transición a Playing: la pista quedó sonando y el temporizador de
    /// inactividad vuelve al centinela activo.
    pub fn mark_playing(&mut self, metadata: TrackMetadata, handle: TrackHandle) {
        self.status = PlaybackStatus::Playing;
        self.current_track = Some(metadata);
        self.track_handle = Some(handle);
        self.idle_since = None;
    }

    /// Transición a Idle al agotarse la cola: arranca el temporizador de
    /// inactividad desde `now`.
    pub fn mark_idle(&mut self, now: Instant) {
        self.status = PlaybackStatus::Idle;
        self.current_track = None;
        self.track_handle = None;
        self.idle_since = Some(now);
    }

    pub fn mark_resolving(&mut self) {
        self.status = PlaybackStatus::Resolving;
    }

    pub fn mark_paused(&mut self) {
        if self.status == PlaybackStatus::Playing {
            self.status = PlaybackStatus::Paused;
        }
    }

    pub fn mark_resumed(&mut self) {
        if self.status == PlaybackStatus::Paused {
            self.status = PlaybackStatus::Playing;
        }
    }

    /// Retira la referencia al mensaje de controles para supersederlo.
    pub fn take_now_playing_msg(&mut self) -> Option<(ChannelId, MessageId)> {
        self.now_playing_msg.take()
    }

    /// Libera la conexión junto con todos los campos que dependen de ella,
    /// en una sola sección crítica: cola, pista actual, handle y centinela.
    /// Devuelve la Call para desconectarla fuera del lock.
    pub fn clear_for_disconnect(&mut self) -> Option<Arc<tokio::sync::Mutex<Call>>> {
        self.queue.clear();
        self.status = PlaybackStatus::Idle;
        self.current_track = None;
        self.track_handle = None;
        self.idle_since = None;
        self.now_playing_msg = None;
        self.call.take()
    }

    /// Vista para el embed de cola: pista actual más snapshot FIFO.
    pub fn queue_view(&self) -> (Option<TrackMetadata>, QueueSnapshot) {
        (self.current_track.clone(), self.queue.snapshot())
    }
}

impl Default for GuildPlaybackState {
    fn default() -> Self {
        Self::new()
    }
}

/// Estado por guild junto con el candado que serializa los avances de cola.
pub struct GuildPlayer {
    pub state: Mutex<GuildPlaybackState>,
    /// Serializa advance_queue por guild: un avance nuevo no puede empezar
    /// mientras otro sigue resolviendo o transicionando.
    pub advance_lock: tokio::sync::Mutex<()>,
}

impl GuildPlayer {
    fn new() -> Self {
        Self {
            state: Mutex::new(GuildPlaybackState::new()),
            advance_lock: tokio::sync::Mutex::new(()),
        }
    }
}

/// Registro de estados de reproducción, uno por guild. Dueño único del
/// estado: comandos, botones, coordinador y monitor acceden a través de él.
pub struct PlayerRegistry {
    players: DashMap<GuildId, Arc<GuildPlayer>>,
}

impl PlayerRegistry {
    pub fn new() -> Self {
        Self {
            players: DashMap::new(),
        }
    }

    /// Creación perezosa: el registro aparece con la primera conexión de voz
    /// exitosa, con cola y efecto en sus valores por defecto.
    pub fn get_or_create(&self, guild_id: GuildId) -> Arc<GuildPlayer> {
        self.players
            .entry(guild_id)
            .or_insert_with(|| {
                debug!("Estado de reproducción creado para guild {}", guild_id);
                Arc::new(GuildPlayer::new())
            })
            .clone()
    }

    pub fn get(&self, guild_id: GuildId) -> Option<Arc<GuildPlayer>> {
        self.players.get(&guild_id).map(|p| p.clone())
    }

    /// Guilds registradas, para el barrido del monitor de inactividad.
    pub fn guild_ids(&self) -> Vec<GuildId> {
        self.players.iter().map(|e| *e.key()).collect()
    }

    /// Limpia el estado de una guild (cola, conexión, pista, centinela) y
    /// devuelve la Call liberada, si había.
    pub fn clear_guild(&self, guild_id: GuildId) -> Option<Arc<tokio::sync::Mutex<Call>>> {
        let player = self.get(guild_id)?;
        let call = player.state.lock().clear_for_disconnect();
        if call.is_some() {
            info!("🔌 Estado limpiado para guild {}", guild_id);
        }
        call
    }
}

impl Default for PlayerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serenity::model::id::UserId;
    use std::time::Duration;

    fn metadata(title: &str) -> TrackMetadata {
        TrackMetadata {
            title: title.to_string(),
            source_url: None,
            duration: Some(Duration::from_secs(180)),
            thumbnail: None,
            uploader: None,
            uploader_url: None,
            view_count: None,
            upload_date: None,
            extractor: "Youtube".to_string(),
            requester: UserId::new(7),
        }
    }

    #[test]
    fn test_new_state_is_idle_with_defaults() {
        let state = GuildPlaybackState::new();
        assert_eq!(state.status, PlaybackStatus::Idle);
        assert_eq!(state.current_effect, EffectProfile::Normal);
        assert!(state.queue.is_empty());
        assert!(state.current_track.is_none());
        assert!(state.idle_since.is_none());
        assert!(!state.has_connection());
    }

    #[test]
    fn test_mark_idle_sets_timestamp_and_clears_track() {
        let mut state = GuildPlaybackState::new();
        state.status = PlaybackStatus::Playing;
        state.current_track = Some(metadata("a"));

        let now = Instant::now();
        state.mark_idle(now);

        assert_eq!(state.status, PlaybackStatus::Idle);
        assert!(state.current_track.is_none());
        assert_eq!(state.idle_since, Some(now));
    }

    #[test]
    fn test_pause_resume_transitions() {
        let mut state = GuildPlaybackState::new();
        state.status = PlaybackStatus::Playing;

        state.mark_paused();
        assert_eq!(state.status, PlaybackStatus::Paused);

        state.mark_resumed();
        assert_eq!(state.status, PlaybackStatus::Playing);

        // Pausar sin nada sonando no cambia la fase
        state.status = PlaybackStatus::Idle;
        state.mark_paused();
        assert_eq!(state.status, PlaybackStatus::Idle);
    }

    #[test]
    fn test_set_effect_does_not_touch_current_track() {
        let mut state = GuildPlaybackState::new();
        state.status = PlaybackStatus::Playing;
        state.current_track = Some(metadata("sonando"));

        state.set_effect(EffectProfile::BassBoost);

        // El efecto queda para la próxima resolución; la pista actual sigue
        // intacta.
        assert_eq!(state.current_effect, EffectProfile::BassBoost);
        assert_eq!(state.current_track.as_ref().unwrap().title, "sonando");
        assert_eq!(state.status, PlaybackStatus::Playing);
    }

    #[test]
    fn test_clear_for_disconnect_resets_everything() {
        let mut state = GuildPlaybackState::new();
        state.enqueue(QueueEntry::new("a", UserId::new(1)));
        state.enqueue(QueueEntry::new("b", UserId::new(1)));
        state.status = PlaybackStatus::Playing;
        state.current_track = Some(metadata("a"));
        state.idle_since = None;

        state.clear_for_disconnect();

        assert!(state.queue.is_empty());
        assert_eq!(state.status, PlaybackStatus::Idle);
        assert!(state.current_track.is_none());
        assert!(state.idle_since.is_none());
        assert!(state.now_playing_msg.is_none());
    }

    #[test]
    fn test_stop_scenario_queue_cleared_before_completion() {
        // Stop limpia la cola; la señal de finalización posterior observa la
        // cola vacía y no dispara otra resolución.
        let mut state = GuildPlaybackState::new();
        state.enqueue(QueueEntry::new("songA", UserId::new(1)));
        state.enqueue(QueueEntry::new("songB", UserId::new(1)));

        // songA pasa a reproducirse
        let playing = state.dequeue_head().unwrap();
        assert_eq!(playing.query, "songA");
        state.status = PlaybackStatus::Playing;

        // Stop: limpia la cola restante
        state.queue.clear();

        // La señal de finalización encuentra la cola vacía
        assert!(state.dequeue_head().is_none());
    }

    #[test]
    fn test_controls_snapshot_reflects_live_state() {
        let mut state = GuildPlaybackState::new();
        let snap = state.controls_snapshot();
        assert!(!snap.can_interact_playback());

        state.status = PlaybackStatus::Paused;
        // Sin conexión sigue sin ser interactuable
        assert!(!state.controls_snapshot().can_interact_playback());
    }

    #[test]
    fn test_registry_lazy_creation() {
        let registry = PlayerRegistry::new();
        let guild = GuildId::new(99);
        assert!(registry.get(guild).is_none());

        let player = registry.get_or_create(guild);
        assert_eq!(player.state.lock().status, PlaybackStatus::Idle);
        assert!(registry.get(guild).is_some());
        assert_eq!(registry.guild_ids(), vec![guild]);
    }
}
