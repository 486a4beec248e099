use anyhow::Result;
use serenity::{
    builder::{CreateActionRow, CreateEmbed, CreateMessage, EditMessage},
    http::Http,
    model::id::{ChannelId, MessageId},
};
use std::sync::Arc;
use tracing::debug;

/// Destino de salida del coordinador. Todo lo que el coordinador publica en
/// un canal de texto (avisos, mensajes de estado, ediciones de controles)
/// pasa por aquí; el coordinador nunca distingue entre interacciones y
/// canales concretos.
#[derive(Clone)]
pub struct ReplyTarget {
    http: Arc<Http>,
    channel_id: ChannelId,
}

impl ReplyTarget {
    pub fn new(http: Arc<Http>, channel_id: ChannelId) -> Self {
        Self { http, channel_id }
    }

    pub fn channel_id(&self) -> ChannelId {
        self.channel_id
    }

    pub async fn send_text(&self, content: &str) -> Result<MessageId> {
        let msg = self
            .channel_id
            .send_message(&self.http, CreateMessage::new().content(content))
            .await?;
        Ok(msg.id)
    }

    pub async fn send_embed(
        &self,
        embed: CreateEmbed,
        components: Vec<CreateActionRow>,
    ) -> Result<MessageId> {
        let msg = self
            .channel_id
            .send_message(
                &self.http,
                CreateMessage::new().embed(embed).components(components),
            )
            .await?;
        Ok(msg.id)
    }

    /// Envío best-effort: un canal borrado o sin permisos no debe tumbar el
    /// avance de cola.
    pub async fn send_text_silent(&self, content: &str) {
        if let Err(e) = self.send_text(content).await {
            debug!(
                "No se pudo enviar aviso al canal {}: {}",
                self.channel_id, e
            );
        }
    }

    /// Edición best-effort de un mensaje de estado previo: reemplaza el
    /// contenido, descarta el embed y deja la botonera que se indique. Si el
    /// mensaje ya no existe, solo se registra.
    pub async fn edit_silent(
        &self,
        message_id: MessageId,
        content: &str,
        components: Vec<CreateActionRow>,
    ) {
        let edit = EditMessage::new()
            .content(content)
            .embeds(Vec::new())
            .components(components);

        if let Err(e) = self
            .channel_id
            .edit_message(&self.http, message_id, edit)
            .await
        {
            debug!(
                "No se pudo editar mensaje {} en canal {}: {}",
                message_id, self.channel_id, e
            );
        }
    }
}
