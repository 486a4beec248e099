use tracing::info;

/// Perfiles de efectos disponibles. Conjunto cerrado: no hay perfiles
/// definidos por el usuario.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EffectProfile {
    #[default]
    Normal,
    BassBoost,
    EightD,
}

impl EffectProfile {
    /// Cadena de filtros ffmpeg (`-af`) asociada al perfil. `None` para
    /// Normal: el stream pasa sin post-procesamiento.
    pub fn filter_chain(&self) -> Option<&'static str> {
        match self {
            EffectProfile::Normal => None,
            EffectProfile::BassBoost => Some("bass=g=15,dynaudnorm=f=150:g=15"),
            EffectProfile::EightD => Some("apulsator=hz=0.08"),
        }
    }

    /// Nombre visible en mensajes y embeds.
    pub fn display_name(&self) -> &'static str {
        match self {
            EffectProfile::Normal => "Normal",
            EffectProfile::BassBoost => "Bass Boost",
            EffectProfile::EightD => "8D Audio",
        }
    }

    /// `custom_id` del botón que selecciona este perfil.
    pub fn custom_id(&self) -> &'static str {
        match self {
            EffectProfile::Normal => "effect_normal",
            EffectProfile::BassBoost => "effect_bassboost",
            EffectProfile::EightD => "effect_8d",
        }
    }

    /// Resuelve un `custom_id` de botón de efecto.
    pub fn from_custom_id(id: &str) -> Option<Self> {
        match id {
            "effect_normal" => Some(EffectProfile::Normal),
            "effect_bassboost" => Some(EffectProfile::BassBoost),
            "effect_8d" => Some(EffectProfile::EightD),
            _ => None,
        }
    }

    /// Resuelve el valor de la opción del comando /effect.
    pub fn from_option_value(value: &str) -> Option<Self> {
        match value {
            "normal" => Some(EffectProfile::Normal),
            "bassboost" => Some(EffectProfile::BassBoost),
            "8d" => Some(EffectProfile::EightD),
            _ => None,
        }
    }

    #[allow(dead_code)]
    pub fn all() -> [EffectProfile; 3] {
        [
            EffectProfile::Normal,
            EffectProfile::BassBoost,
            EffectProfile::EightD,
        ]
    }
}

/// Registra el cambio de efecto. La asignación en sí es pura: el filtro se
/// liga al stream en el momento de la resolución, nunca al que ya suena.
pub fn log_effect_change(guild_id: u64, effect: EffectProfile) {
    info!(
        "🎧 Efecto {} seleccionado en guild {} (aplica a la próxima pista)",
        effect.display_name(),
        guild_id
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_chains() {
        assert_eq!(EffectProfile::Normal.filter_chain(), None);
        assert_eq!(
            EffectProfile::BassBoost.filter_chain(),
            Some("bass=g=15,dynaudnorm=f=150:g=15")
        );
        assert_eq!(EffectProfile::EightD.filter_chain(), Some("apulsator=hz=0.08"));
    }

    #[test]
    fn test_custom_id_round_trip() {
        for effect in EffectProfile::all() {
            assert_eq!(EffectProfile::from_custom_id(effect.custom_id()), Some(effect));
        }
        assert_eq!(EffectProfile::from_custom_id("effect_nightcore"), None);
    }

    #[test]
    fn test_default_is_normal() {
        assert_eq!(EffectProfile::default(), EffectProfile::Normal);
    }
}
