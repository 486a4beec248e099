use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    // Discord
    pub discord_token: String,
    pub application_id: u64,
    pub guild_id: Option<u64>, // Para comandos de desarrollo

    // Audio
    pub default_volume: f32,

    // Inactividad
    pub inactivity_timeout: u64,        // En segundos
    pub inactivity_check_interval: u64, // En segundos

    // Límites
    pub max_resolve_failures: u32, // Fallos de resolución consecutivos antes de rendirse

    // Paths
    pub data_dir: PathBuf,

    // APIs (Opcionales)
    pub google_api_key: Option<String>, // /ask deshabilitado si falta
}

impl Config {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            // Discord
            discord_token: std::env::var("DISCORD_TOKEN")?,
            application_id: std::env::var("APPLICATION_ID")?.parse()?,
            guild_id: std::env::var("GUILD_ID").ok().and_then(|s| s.parse().ok()),

            // Audio
            default_volume: std::env::var("DEFAULT_VOLUME")
                .unwrap_or_else(|_| "0.5".to_string())
                .parse()?,

            // Inactividad
            inactivity_timeout: std::env::var("INACTIVITY_TIMEOUT")
                .unwrap_or_else(|_| "120".to_string())
                .parse()?,
            inactivity_check_interval: std::env::var("INACTIVITY_CHECK_INTERVAL")
                .unwrap_or_else(|_| "30".to_string())
                .parse()?,

            // Límites
            max_resolve_failures: std::env::var("MAX_RESOLVE_FAILURES")
                .unwrap_or_else(|_| "5".to_string())
                .parse()?,

            // Paths
            data_dir: std::env::var("DATA_DIR")
                .unwrap_or_else(|_| "./data".to_string())
                .into(),

            // APIs
            google_api_key: std::env::var("GOOGLE_API_KEY")
                .ok()
                .filter(|k| !k.trim().is_empty()),
        };

        // Crear directorio de datos si no existe
        std::fs::create_dir_all(&config.data_dir)?;

        config.validate()?;

        Ok(config)
    }

    /// Valida los valores de configuración antes de arrancar el bot.
    pub fn validate(&self) -> Result<()> {
        if self.default_volume < 0.0 || self.default_volume > 2.0 {
            anyhow::bail!(
                "Default volume must be between 0.0 and 2.0, got: {}",
                self.default_volume
            );
        }

        if self.inactivity_timeout == 0 {
            anyhow::bail!("Inactivity timeout must be greater than 0");
        }

        if self.inactivity_check_interval == 0 {
            anyhow::bail!("Inactivity check interval must be greater than 0");
        }

        if self.max_resolve_failures == 0 {
            anyhow::bail!("Max resolve failures must be greater than 0");
        }

        Ok(())
    }

    /// Resumen apto para logs (sin tokens ni claves).
    pub fn summary(&self) -> String {
        format!(
            "Config Summary:\n  \
            Discord: App ID {} (Guild: {})\n  \
            Audio: {}% vol\n  \
            Inactividad: {}s timeout, {}s check\n  \
            Límites: {} fallos de resolución\n  \
            AI: {}",
            self.application_id,
            self.guild_id.map_or("global".to_string(), |id| id.to_string()),
            (self.default_volume * 100.0) as u32,
            self.inactivity_timeout,
            self.inactivity_check_interval,
            self.max_resolve_failures,
            if self.google_api_key.is_some() {
                "habilitada"
            } else {
                "deshabilitada"
            }
        )
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            // Discord (sin defaults - deben proveerse)
            discord_token: String::new(),
            application_id: 0,
            guild_id: None,

            // Audio defaults
            default_volume: 0.5,

            // Inactividad
            inactivity_timeout: 120,
            inactivity_check_interval: 30,

            // Límites
            max_resolve_failures: 5,

            // Paths
            data_dir: "./data".into(),

            // APIs
            google_api_key: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.default_volume = 3.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.inactivity_timeout = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.max_resolve_failures = 0;
        assert!(config.validate().is_err());
    }
}
