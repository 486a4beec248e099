use serenity::http::Http;
use songbird::Songbird;
use std::{
    sync::Arc,
    time::{Duration, Instant},
};
use tracing::{debug, error, info};

use crate::{
    audio::state::PlayerRegistry,
    config::Config,
    ui::{buttons, reply::ReplyTarget},
};

/// Qué hacer con una guild en un barrido del monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdleAction {
    /// Sonando, pausada, con cola o sin conexión: no se toca.
    Ignore,
    /// Primera observación ociosa: armar el temporizador desde ahora.
    StartTimer,
    /// Ociosa más allá del timeout: desconectar y limpiar.
    Disconnect,
}

/// Decisión pura del monitor. El temporizador solo tiene sentido en el
/// estado totalmente ocioso: conexión viva, nada sonando ni pausado y cola
/// vacía.
pub fn evaluate_idle(
    connected: bool,
    audible: bool,
    queue_empty: bool,
    idle_since: Option<Instant>,
    now: Instant,
    timeout: Duration,
) -> IdleAction {
    if !connected || audible || !queue_empty {
        return IdleAction::Ignore;
    }

    match idle_since {
        // Centinela sin inicializar: arranca a contar desde esta observación
        // en vez de desconectar una guild recién configurada.
        None => IdleAction::StartTimer,
        Some(since) if now.duration_since(since) > timeout => IdleAction::Disconnect,
        Some(_) => IdleAction::Ignore,
    }
}

/// Tarea de fondo que barre todas las guilds registradas y desconecta las
/// conexiones ociosas.
pub struct InactivityMonitor {
    registry: Arc<PlayerRegistry>,
    manager: Arc<Songbird>,
    http: Arc<Http>,
    timeout: Duration,
    check_interval: Duration,
}

impl InactivityMonitor {
    pub fn spawn(
        registry: Arc<PlayerRegistry>,
        manager: Arc<Songbird>,
        http: Arc<Http>,
        config: &Config,
    ) -> tokio::task::JoinHandle<()> {
        let monitor = Self {
            registry,
            manager,
            http,
            timeout: Duration::from_secs(config.inactivity_timeout),
            check_interval: Duration::from_secs(config.inactivity_check_interval),
        };

        info!(
            "⏲️ Monitor de inactividad iniciado ({}s timeout, {}s intervalo)",
            monitor.timeout.as_secs(),
            monitor.check_interval.as_secs()
        );

        tokio::spawn(async move {
            monitor.run().await;
        })
    }

    async fn run(self) {
        let mut interval = tokio::time::interval(self.check_interval);
        loop {
            interval.tick().await;
            self.sweep().await;
        }
    }

    async fn sweep(&self) {
        let now = Instant::now();

        for guild_id in self.registry.guild_ids() {
            let Some(player) = self.registry.get(guild_id) else {
                continue;
            };

            let (action, message_ref) = {
                let mut state = player.state.lock();
                let action = evaluate_idle(
                    state.has_connection(),
                    state.is_audible(),
                    state.queue.is_empty(),
                    state.idle_since,
                    now,
                    self.timeout,
                );

                match action {
                    IdleAction::StartTimer => {
                        state.idle_since = Some(now);
                        debug!("Temporizador de inactividad armado en guild {}", guild_id);
                        (action, None)
                    }
                    IdleAction::Disconnect => (action, state.take_now_playing_msg()),
                    IdleAction::Ignore => (action, None),
                }
            };

            if action != IdleAction::Disconnect {
                continue;
            }

            info!(
                "💤 Timeout de inactividad en guild {}; desconectando",
                guild_id
            );

            if let Some((channel_id, message_id)) = message_ref {
                ReplyTarget::new(self.http.clone(), channel_id)
                    .edit_silent(
                        message_id,
                        "*Me fui por inactividad.*",
                        buttons::render_controls_disabled(),
                    )
                    .await;
            }

            // Liberar conexión, cola y centinela en una sola operación; el
            // próximo barrido verá la guild sin conexión y la ignorará.
            self.registry.clear_guild(guild_id);
            if let Err(e) = self.manager.remove(guild_id).await {
                error!("Error desconectando guild {}: {}", guild_id, e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TIMEOUT: Duration = Duration::from_secs(120);

    #[test]
    fn test_never_disconnects_while_audible_or_queued() {
        let base = Instant::now();
        let much_later = base + Duration::from_secs(100_000);

        // Sonando o pausada: se ignora aunque el timestamp sea viejísimo
        assert_eq!(
            evaluate_idle(true, true, true, Some(base), much_later, TIMEOUT),
            IdleAction::Ignore
        );
        // Cola con entradas
        assert_eq!(
            evaluate_idle(true, false, false, Some(base), much_later, TIMEOUT),
            IdleAction::Ignore
        );
        // Sin conexión no hay nada que desconectar
        assert_eq!(
            evaluate_idle(false, false, true, Some(base), much_later, TIMEOUT),
            IdleAction::Ignore
        );
    }

    #[test]
    fn test_first_idle_observation_starts_timer() {
        let now = Instant::now();
        assert_eq!(
            evaluate_idle(true, false, true, None, now, TIMEOUT),
            IdleAction::StartTimer
        );
    }

    #[test]
    fn test_disconnects_only_past_timeout() {
        let base = Instant::now();

        assert_eq!(
            evaluate_idle(
                true,
                false,
                true,
                Some(base),
                base + Duration::from_secs(60),
                TIMEOUT
            ),
            IdleAction::Ignore
        );

        // Exactamente en el límite todavía no
        assert_eq!(
            evaluate_idle(true, false, true, Some(base), base + TIMEOUT, TIMEOUT),
            IdleAction::Ignore
        );

        assert_eq!(
            evaluate_idle(
                true,
                false,
                true,
                Some(base),
                base + TIMEOUT + Duration::from_secs(1),
                TIMEOUT
            ),
            IdleAction::Disconnect
        );
    }

    #[test]
    fn test_no_double_disconnect_after_cleanup() {
        // Tras la desconexión el estado queda sin conexión y con el
        // centinela reseteado: el siguiente barrido lo ignora.
        let now = Instant::now();
        assert_eq!(
            evaluate_idle(false, false, true, None, now, TIMEOUT),
            IdleAction::Ignore
        );
    }
}
