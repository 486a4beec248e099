use thiserror::Error;

/// Errores del subsistema de reproducción
#[derive(Debug, Error)]
pub enum PlaybackError {
    /// No hay conexión de voz viva para la guild. Fatal para el intento
    /// actual de avance; requiere un /join manual.
    #[error("no hay conexión de voz activa")]
    ConnectionLost,

    /// El bot no tiene permisos para conectarse o hablar en el canal.
    #[error("permisos insuficientes para el canal de voz")]
    PermissionDenied,

    /// La búsqueda/URL no produjo ningún resultado reproducible.
    #[error("no se encontró la pista: {0}")]
    TrackNotFound(String),

    /// yt-dlp falló al extraer el audio.
    #[error("fallo de extracción: {0}")]
    Extraction(String),

    /// Error del reproductor a mitad de stream. Se reporta al canal y se
    /// trata como fin natural de la pista.
    #[error("error del reproductor: {0}")]
    Player(String),
}

impl PlaybackError {
    /// Las fallas de resolución se recuperan saltando a la siguiente
    /// entrada de la cola; el resto aborta el intento de avance.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            PlaybackError::TrackNotFound(_) | PlaybackError::Extraction(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolution_errors_are_recoverable() {
        assert!(PlaybackError::TrackNotFound("x".into()).is_recoverable());
        assert!(PlaybackError::Extraction("boom".into()).is_recoverable());
        assert!(!PlaybackError::ConnectionLost.is_recoverable());
        assert!(!PlaybackError::PermissionDenied.is_recoverable());
        assert!(!PlaybackError::Player("eof".into()).is_recoverable());
    }
}
