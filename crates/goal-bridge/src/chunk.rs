/// Finish reason attached to the terminal `finish` chunk of a completed goal.
pub const FINISH_STOP: &str = "stop";

/// One unit of output handed to the UI sink.
///
/// Serializes as an internally tagged object, for example
/// `{"type":"text-delta","id":"…","delta":"Hello"}`.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum OutputChunk {
    TextStart { id: String },
    TextDelta { id: String, delta: String },
    TextEnd { id: String },
    ReasoningStart { id: String },
    ReasoningDelta { id: String, delta: String },
    ReasoningEnd { id: String },
    /// Short human-readable note about task lifecycle progress.
    DataAnnotation { label: String, content: String },
    Finish { reason: String },
    /// Engine-reported failure, rendered to the user.
    Error { message: String },
}

impl OutputChunk {
    /// Returns the span id for span chunks.
    pub fn span_id(&self) -> Option<&str> {
        match self {
            Self::TextStart { id }
            | Self::TextDelta { id, .. }
            | Self::TextEnd { id }
            | Self::ReasoningStart { id }
            | Self::ReasoningDelta { id, .. }
            | Self::ReasoningEnd { id } => Some(id.as_str()),
            Self::DataAnnotation { .. } | Self::Finish { .. } | Self::Error { .. } => None,
        }
    }

    /// Returns true for the terminal `finish` chunk.
    pub fn is_finish(&self) -> bool {
        matches!(self, Self::Finish { .. })
    }
}

pub(crate) fn new_span_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunks_serialize_with_kebab_case_type_tag() {
        let delta = OutputChunk::TextDelta {
            id: "t1".into(),
            delta: "Hi".into(),
        };
        assert_eq!(
            serde_json::to_value(&delta).expect("serialize"),
            serde_json::json!({"type": "text-delta", "id": "t1", "delta": "Hi"})
        );
        let annotation = OutputChunk::DataAnnotation {
            label: "task:created".into(),
            content: "Task created: plan".into(),
        };
        assert_eq!(
            serde_json::to_value(&annotation).expect("serialize")["type"],
            "data-annotation"
        );
    }

    #[test]
    fn span_ids_are_unique() {
        assert_ne!(new_span_id(), new_span_id());
    }
}
