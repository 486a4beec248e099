use chrono::{DateTime, Utc};
use serenity::model::id::UserId;
use std::collections::VecDeque;
use tracing::{debug, info};

/// Cuántas entradas pendientes se muestran textualmente en la cola; el
/// resto se colapsa en un contador.
pub const QUEUE_DISPLAY_LIMIT: usize = 10;

/// Una petición de reproducción pendiente. Inmutable una vez encolada.
#[derive(Debug, Clone, PartialEq)]
pub struct QueueEntry {
    pub query: String,
    pub requester: UserId,
    pub requested_at: DateTime<Utc>,
}

impl QueueEntry {
    pub fn new(query: impl Into<String>, requester: UserId) -> Self {
        Self {
            query: query.into(),
            requester,
            requested_at: Utc::now(),
        }
    }
}

/// Cola FIFO de peticiones por guild. Sin tope: el orden de inserción es el
/// orden de reproducción.
#[derive(Debug, Default)]
pub struct TrackQueue {
    items: VecDeque<QueueEntry>,
}

impl TrackQueue {
    pub fn new() -> Self {
        Self {
            items: VecDeque::new(),
        }
    }

    /// Agrega una petición al final de la cola.
    pub fn push(&mut self, entry: QueueEntry) {
        info!("➕ Agregado a la cola: {}", entry.query);
        self.items.push_back(entry);
    }

    /// Saca la cabeza de la cola. La entrada deja de pertenecer a la cola en
    /// el momento en que se intenta reproducirla, antes de saber si la
    /// resolución tendrá éxito.
    pub fn pop(&mut self) -> Option<QueueEntry> {
        let entry = self.items.pop_front();
        if let Some(ref e) = entry {
            debug!("➡️ Siguiente en cola (FIFO): {}", e.query);
        }
        entry
    }

    pub fn clear(&mut self) {
        if !self.items.is_empty() {
            info!("🗑️ Cola limpiada ({} entradas)", self.items.len());
        }
        self.items.clear();
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Vista de solo lectura para mostrar la cola: las primeras
    /// [`QUEUE_DISPLAY_LIMIT`] entradas textuales más el resto como contador.
    pub fn snapshot(&self) -> QueueSnapshot {
        QueueSnapshot {
            head: self
                .items
                .iter()
                .take(QUEUE_DISPLAY_LIMIT)
                .map(|e| e.query.clone())
                .collect(),
            remainder: self.items.len().saturating_sub(QUEUE_DISPLAY_LIMIT),
            total: self.items.len(),
        }
    }
}

/// Vista de la cola apta para render. No retiene referencias al estado vivo.
#[derive(Debug, Clone, PartialEq)]
pub struct QueueSnapshot {
    pub head: Vec<String>,
    pub remainder: usize,
    pub total: usize,
}

impl QueueSnapshot {
    /// Lista numerada para el embed de cola, con el colapso `...y N más`.
    pub fn render(&self) -> String {
        if self.head.is_empty() {
            return "La cola está vacía.".to_string();
        }

        let mut out = String::new();
        for (i, query) in self.head.iter().enumerate() {
            out.push_str(&format!("{}. {}\n", i + 1, query));
        }
        if self.remainder > 0 {
            out.push_str(&format!("\n...y {} más.", self.remainder));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn entry(query: &str) -> QueueEntry {
        QueueEntry::new(query, UserId::new(42))
    }

    #[test]
    fn test_fifo_order() {
        let mut queue = TrackQueue::new();
        for name in ["a", "b", "c", "d"] {
            queue.push(entry(name));
        }

        let order: Vec<String> = std::iter::from_fn(|| queue.pop().map(|e| e.query)).collect();
        assert_eq!(order, vec!["a", "b", "c", "d"]);
        assert!(queue.pop().is_none());
    }

    #[test]
    fn test_clear_empties_queue() {
        let mut queue = TrackQueue::new();
        queue.push(entry("a"));
        queue.push(entry("b"));
        queue.clear();
        assert!(queue.is_empty());
        assert!(queue.pop().is_none());
    }

    #[test]
    fn test_snapshot_shows_first_ten_plus_count() {
        let mut queue = TrackQueue::new();
        for i in 0..13 {
            queue.push(entry(&format!("song{}", i)));
        }

        let snapshot = queue.snapshot();
        assert_eq!(snapshot.head.len(), 10);
        assert_eq!(snapshot.head[0], "song0");
        assert_eq!(snapshot.head[9], "song9");
        assert_eq!(snapshot.remainder, 3);
        assert_eq!(snapshot.total, 13);

        let rendered = snapshot.render();
        assert!(rendered.contains("1. song0"));
        assert!(rendered.contains("10. song9"));
        assert!(rendered.contains("...y 3 más."));
        assert!(!rendered.contains("song10"));
    }

    #[test]
    fn test_snapshot_without_overflow_has_no_counter() {
        let mut queue = TrackQueue::new();
        queue.push(entry("only"));

        let rendered = queue.snapshot().render();
        assert!(rendered.contains("1. only"));
        assert!(!rendered.contains("más"));
    }

    #[test]
    fn test_snapshot_of_empty_queue() {
        let queue = TrackQueue::new();
        assert_eq!(queue.snapshot().render(), "La cola está vacía.");
    }
}
