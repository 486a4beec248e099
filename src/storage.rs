use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::fs;
use tracing::{info, warn};

const ROLE_CONFIG_FILE: &str = "role_config.json";

/// Atributos del botón de un rol auto-asignable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleButtonConfig {
    pub label: String,
    pub style: String, // secondary | primary | success | danger
    pub emoji: Option<String>,
}

/// Mapeo guild → rol → botón. Es el único estado en disco del sistema; el
/// estado de reproducción vive solo en memoria.
pub type RoleMappings = HashMap<u64, HashMap<u64, RoleButtonConfig>>;

/// Almacenamiento basado en archivos JSON bajo el directorio de datos.
pub struct JsonStorage {
    data_dir: PathBuf,
    role_mappings: RoleMappings,
}

impl JsonStorage {
    pub async fn new(data_dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&data_dir).await?;

        let mut storage = Self {
            data_dir,
            role_mappings: HashMap::new(),
        };
        storage.load_role_config().await;

        info!("📁 Storage inicializado en: {}", storage.data_dir.display());
        Ok(storage)
    }

    /// Configuración de botones de rol de una guild.
    pub fn guild_roles(&self, guild_id: u64) -> Option<&HashMap<u64, RoleButtonConfig>> {
        self.role_mappings.get(&guild_id)
    }

    /// Atributos del botón de un rol concreto.
    #[allow(dead_code)]
    pub fn role_button(&self, guild_id: u64, role_id: u64) -> Option<&RoleButtonConfig> {
        self.role_mappings.get(&guild_id)?.get(&role_id)
    }

    /// Agrega o actualiza el botón de un rol y persiste.
    pub async fn set_role_button(
        &mut self,
        guild_id: u64,
        role_id: u64,
        config: RoleButtonConfig,
    ) -> Result<()> {
        self.role_mappings
            .entry(guild_id)
            .or_default()
            .insert(role_id, config);
        self.save_role_config().await?;
        info!("💾 Botón de rol {} configurado en guild {}", role_id, guild_id);
        Ok(())
    }

    /// Elimina el botón de un rol. Devuelve `false` si no estaba configurado.
    pub async fn remove_role_button(&mut self, guild_id: u64, role_id: u64) -> Result<bool> {
        let removed = match self.role_mappings.get_mut(&guild_id) {
            Some(roles) => {
                let removed = roles.remove(&role_id).is_some();
                if roles.is_empty() {
                    self.role_mappings.remove(&guild_id);
                }
                removed
            }
            None => false,
        };

        if removed {
            self.save_role_config().await?;
            info!("🗑️ Botón de rol {} eliminado en guild {}", role_id, guild_id);
        }
        Ok(removed)
    }

    async fn load_role_config(&mut self) {
        let path = self.role_config_path();
        match fs::read_to_string(&path).await {
            Ok(content) => match serde_json::from_str::<RoleMappings>(&content) {
                Ok(mappings) => {
                    self.role_mappings = mappings;
                    info!(
                        "📂 Configuración de roles cargada ({} guilds)",
                        self.role_mappings.len()
                    );
                }
                Err(e) => {
                    warn!("Configuración de roles corrupta en {}: {}", path.display(), e);
                }
            },
            Err(_) => {
                // Primera ejecución: sin archivo todavía
                info!("📂 Sin configuración de roles previa; empezando vacía");
            }
        }
    }

    async fn save_role_config(&self) -> Result<()> {
        let content = serde_json::to_string_pretty(&self.role_mappings)?;
        fs::write(self.role_config_path(), content).await?;
        Ok(())
    }

    fn role_config_path(&self) -> PathBuf {
        self.data_dir.join(ROLE_CONFIG_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_role_mappings_serde_round_trip() {
        let mut mappings: RoleMappings = HashMap::new();
        mappings.entry(111).or_default().insert(
            222,
            RoleButtonConfig {
                label: "Gamer".to_string(),
                style: "success".to_string(),
                emoji: Some("🎮".to_string()),
            },
        );

        let json = serde_json::to_string(&mappings).unwrap();
        let parsed: RoleMappings = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, mappings);

        // Las claves numéricas viajan como strings en JSON, como en el
        // formato original del archivo
        assert!(json.contains("\"111\""));
        assert!(json.contains("\"222\""));
    }
}
