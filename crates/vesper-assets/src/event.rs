//! Completion events raised by the frame integrator.

use crate::handle::AssetId;

/// Events emitted by the asset cache, drained once per frame.
#[derive(Debug, Clone)]
pub enum AssetEvent {
    /// A load (first load or hot reload) finished for one asset.
    Loaded {
        /// The record the load belongs to.
        id: AssetId,
        /// Whether the load succeeded.
        success: bool,
        /// Error text when `success` is false.
        error: Option<String>,
    },

    /// The number of in-flight loads returned to zero.
    AllSettled,
}

impl AssetEvent {
    /// The asset id this event relates to, if any.
    pub fn id(&self) -> Option<AssetId> {
        match self {
            AssetEvent::Loaded { id, .. } => Some(*id),
            AssetEvent::AllSettled => None,
        }
    }

    /// Check if this is a successful load completion.
    pub fn is_success(&self) -> bool {
        matches!(self, AssetEvent::Loaded { success: true, .. })
    }

    /// Check if this is a failed load completion.
    pub fn is_failure(&self) -> bool {
        matches!(self, AssetEvent::Loaded { success: false, .. })
    }

    /// Check if this is the all-settled marker.
    pub fn is_all_settled(&self) -> bool {
        matches!(self, AssetEvent::AllSettled)
    }
}

/// A buffer of asset events drained each frame.
#[derive(Debug, Default)]
pub struct AssetEventBuffer {
    events: Vec<AssetEvent>,
}

impl AssetEventBuffer {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    /// Push an event to the buffer.
    pub fn push(&mut self, event: AssetEvent) {
        self.events.push(event);
    }

    /// Drain all events from the buffer.
    pub fn drain(&mut self) -> impl Iterator<Item = AssetEvent> + '_ {
        self.events.drain(..)
    }

    /// Iterate over events without draining.
    pub fn iter(&self) -> impl Iterator<Item = &AssetEvent> {
        self.events.iter()
    }

    /// The number of buffered events.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Discard all buffered events.
    pub fn clear(&mut self) {
        self.events.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_predicates() {
        let id = AssetId::next();
        let ok = AssetEvent::Loaded {
            id,
            success: true,
            error: None,
        };
        let failed = AssetEvent::Loaded {
            id,
            success: false,
            error: Some("boom".to_string()),
        };

        assert!(ok.is_success());
        assert!(failed.is_failure());
        assert_eq!(ok.id(), Some(id));
        assert_eq!(AssetEvent::AllSettled.id(), None);
        assert!(AssetEvent::AllSettled.is_all_settled());
    }

    #[test]
    fn test_buffer_drain() {
        let mut buffer = AssetEventBuffer::new();
        buffer.push(AssetEvent::AllSettled);
        buffer.push(AssetEvent::AllSettled);
        assert_eq!(buffer.len(), 2);

        let drained: Vec<_> = buffer.drain().collect();
        assert_eq!(drained.len(), 2);
        assert!(buffer.is_empty());
    }
}
