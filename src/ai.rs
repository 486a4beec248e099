use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, warn};

const GEMINI_ENDPOINT: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-1.5-flash:generateContent";

/// Margen para que la respuesta más el encabezado quepan en un mensaje de
/// Discord (límite 2000).
const MAX_RESPONSE_CHARS: usize = 1950;
const MAX_OUTPUT_TOKENS: u32 = 2000;

/// Cliente del endpoint generateContent de Gemini. Sin clave de API el
/// comando /ask responde que el módulo no está disponible.
pub struct GeminiClient {
    api_key: Option<String>,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Serialize)]
struct Part {
    text: String,
}

#[derive(Serialize)]
struct GenerationConfig {
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    candidates: Option<Vec<Candidate>>,
    #[serde(rename = "promptFeedback")]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    parts: Option<Vec<CandidatePart>>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Deserialize)]
struct PromptFeedback {
    #[serde(rename = "blockReason")]
    block_reason: Option<String>,
}

impl GeminiClient {
    pub fn new(api_key: Option<String>) -> Self {
        if api_key.is_some() {
            info!("🤖 Cliente de IA configurado (Gemini)");
        } else {
            warn!("GOOGLE_API_KEY ausente; /ask quedará deshabilitado");
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .expect("cliente reqwest por defecto");

        Self { api_key, client }
    }

    pub fn is_available(&self) -> bool {
        self.api_key.is_some()
    }

    /// Reenvía el prompt a Gemini y devuelve la respuesta lista para
    /// publicar: bloqueos y respuestas vacías se reportan como texto, y las
    /// largas se truncan al límite de Discord.
    pub async fn ask(&self, prompt: &str) -> Result<String> {
        let api_key = self
            .api_key
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("módulo de IA no disponible"))?;

        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: GenerationConfig {
                max_output_tokens: MAX_OUTPUT_TOKENS,
            },
        };

        let response = self
            .client
            .post(GEMINI_ENDPOINT)
            .query(&[("key", api_key.as_str())])
            .json(&body)
            .send()
            .await?
            .error_for_status()?;

        let data: GenerateResponse = response.json().await?;

        if let Some(reason) = data.prompt_feedback.and_then(|f| f.block_reason) {
            warn!("Respuesta de IA bloqueada: {}. Prompt: '{}'", reason, prompt);
            return Ok(format!("⚠️ Respuesta bloqueada: {}", reason));
        }

        let text = data
            .candidates
            .and_then(|mut c| if c.is_empty() { None } else { Some(c.remove(0)) })
            .and_then(|c| c.content)
            .and_then(|c| c.parts)
            .map(|parts| {
                parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        if text.is_empty() {
            warn!("Respuesta vacía de la IA. Prompt: '{}'", prompt);
            return Ok("😕 Respuesta vacía de la IA.".to_string());
        }

        Ok(truncate_response(&text))
    }
}

/// Trunca una respuesta al límite de Discord, respetando límites de chars.
pub fn truncate_response(text: &str) -> String {
    if text.chars().count() <= MAX_RESPONSE_CHARS {
        return text.to_string();
    }

    let truncated: String = text.chars().take(MAX_RESPONSE_CHARS).collect();
    format!("{}... (truncado)", truncated)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_response_passes_through() {
        assert_eq!(truncate_response("hola"), "hola");
    }

    #[test]
    fn test_long_response_is_truncated() {
        let long = "a".repeat(3000);
        let out = truncate_response(&long);
        assert!(out.ends_with("... (truncado)"));
        assert!(out.chars().count() <= MAX_RESPONSE_CHARS + "... (truncado)".chars().count());
    }

    #[test]
    fn test_truncation_respects_multibyte_chars() {
        let long = "ñ".repeat(2500);
        let out = truncate_response(&long);
        assert!(out.ends_with("... (truncado)"));
    }
}
