//! Stateful mapping from engine events to UI chunks.
//!
//! The only state carried between events is the open text span. Every
//! handler either leaves it alone, opens it, or closes it; `finish` closes it
//! when the stream ends for any reason.

use tracing::trace;

use crate::chunk::{FINISH_STOP, OutputChunk, new_span_id};
use crate::event::{
    EngineEvent, Payload, first_count, first_message, first_string, first_text, nested,
};

const THINKING_FIELDS: &[&str] = &["thinking", "content", "text", "message"];
const AGENT_FIELDS: &[&str] = &["agentId", "agent_id", "agent", "agentName"];
const RESPONSE_FIELDS: &[&str] = &["output", "content", "response", "text", "message"];
const TASK_TITLE_FIELDS: &[&str] = &["title", "name", "description"];
const TASK_ID_FIELDS: &[&str] = &["taskId", "task_id", "id"];
const TASK_AGENT_FIELDS: &[&str] = &["agentId", "agent_id", "assignee", "agent"];
const TASK_ERROR_FIELDS: &[&str] = &["error", "message", "reason"];
const ENGINE_ERROR_FIELDS: &[&str] = &["error", "message"];
const TOTAL_FIELDS: &[&str] = &["tasks", "total", "totalTasks"];
const COMPLETED_FIELDS: &[&str] = &["completed", "completedTasks"];
const FAILED_FIELDS: &[&str] = &["failed", "failedTasks"];

const DEFAULT_AGENT: &str = "agent";
const DEFAULT_TASK_TITLE: &str = "task";
const DEFAULT_TASK_ERROR: &str = "unknown error";
const DEFAULT_ENGINE_ERROR: &str = "Unknown engine error";

/// The single open text span of a goal stream.
///
/// At most one span is open; `open` reuses it and `close` ends it exactly
/// once.
#[derive(Debug, Default)]
pub struct TextSpan {
    active: Option<String>,
}

impl TextSpan {
    /// Returns the open span id, emitting `text-start` first if none is open.
    pub fn open(&mut self, out: &mut Vec<OutputChunk>) -> String {
        if let Some(id) = &self.active {
            return id.clone();
        }
        let id = new_span_id();
        out.push(OutputChunk::TextStart { id: id.clone() });
        self.active = Some(id.clone());
        id
    }

    /// Emits `text-end` for the open span, if any.
    pub fn close(&mut self, out: &mut Vec<OutputChunk>) {
        if let Some(id) = self.active.take() {
            out.push(OutputChunk::TextEnd { id });
        }
    }

    /// Returns the open span id without changing state.
    pub fn active_id(&self) -> Option<&str> {
        self.active.as_deref()
    }

    pub fn is_open(&self) -> bool {
        self.active.is_some()
    }
}

/// Translates one goal's engine events into output chunks.
///
/// One translator per goal stream. Translation never fails; missing or
/// mistyped payload fields fall back to generic text.
#[derive(Debug, Default)]
pub struct EventTranslator {
    text: TextSpan,
}

impl EventTranslator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the open text span state.
    pub fn text_span(&self) -> &TextSpan {
        &self.text
    }

    /// Maps one event to the chunks it produces, in emission order.
    pub fn translate(&mut self, event: &EngineEvent) -> Vec<OutputChunk> {
        let mut out = Vec::new();
        let payload = &event.payload;
        match event.name.as_str() {
            "agent:thinking" => self.on_thinking(payload, &mut out),
            "agent:response" => self.on_response(payload, &mut out),
            "task:created" | "task:started" | "task:completed" | "task:failed" => {
                out.push(OutputChunk::DataAnnotation {
                    label: event.name.clone(),
                    content: task_summary(&event.name, payload),
                });
            }
            "goal:completed" => self.on_goal_completed(payload, &mut out),
            "agent:error" | "loop:error" => {
                self.text.close(&mut out);
                let message = first_message(payload, ENGINE_ERROR_FIELDS)
                    .unwrap_or(DEFAULT_ENGINE_ERROR)
                    .to_string();
                out.push(OutputChunk::Error { message });
            }
            // Engine lifecycle noise; the UI has nothing to show for these.
            "loop:started" | "loop:tick" | "loop:stopped" | "task:assigned" | "goal:created" => {}
            // Unknown names are tolerated so newer engines do not break older bridges.
            other => trace!(event = other, "ignoring unknown engine event"),
        }
        out
    }

    /// Closes the open text span, if any. Call once when the stream ends.
    pub fn finish(&mut self) -> Option<OutputChunk> {
        let mut out = Vec::with_capacity(1);
        self.text.close(&mut out);
        out.pop()
    }

    fn on_thinking(&mut self, payload: &Payload, out: &mut Vec<OutputChunk>) {
        self.text.close(out);
        let delta = match first_string(payload, THINKING_FIELDS) {
            Some(text) => text.to_string(),
            None => {
                let agent = first_text(payload, AGENT_FIELDS);
                format!("{} is thinking...", agent.as_deref().unwrap_or(DEFAULT_AGENT))
            }
        };
        let id = new_span_id();
        out.push(OutputChunk::ReasoningStart { id: id.clone() });
        out.push(OutputChunk::ReasoningDelta {
            id: id.clone(),
            delta,
        });
        out.push(OutputChunk::ReasoningEnd { id });
    }

    fn on_response(&mut self, payload: &Payload, out: &mut Vec<OutputChunk>) {
        let id = self.text.open(out);
        if let Some(content) = first_string(payload, RESPONSE_FIELDS) {
            out.push(OutputChunk::TextDelta {
                id,
                delta: format!("{content}\n\n"),
            });
        }
    }

    fn on_goal_completed(&mut self, payload: &Payload, out: &mut Vec<OutputChunk>) {
        let id = self.text.open(out);
        let summary = nested(payload, "summary");
        let count = |keys: &[&str]| {
            first_count(payload, keys)
                .or_else(|| summary.and_then(|s| first_count(s, keys)))
                .unwrap_or(0)
        };
        let (total, completed, failed) = (
            count(TOTAL_FIELDS),
            count(COMPLETED_FIELDS),
            count(FAILED_FIELDS),
        );
        out.push(OutputChunk::TextDelta {
            id,
            delta: format!(
                "\n\n---\nGoal completed ({completed}/{total} tasks, {failed} failed)\n"
            ),
        });
        self.text.close(out);
        out.push(OutputChunk::Finish {
            reason: FINISH_STOP.to_string(),
        });
    }
}

/// Looks a task field up on the payload, then on a nested `task` object.
fn task_text(payload: &Payload, keys: &[&str]) -> Option<String> {
    first_text(payload, keys)
        .or_else(|| nested(payload, "task").and_then(|task| first_text(task, keys)))
        .map(|s| s.into_owned())
}

fn task_summary(name: &str, payload: &Payload) -> String {
    let title = task_text(payload, TASK_TITLE_FIELDS)
        .or_else(|| task_text(payload, TASK_ID_FIELDS))
        .unwrap_or_else(|| DEFAULT_TASK_TITLE.to_string());
    match name {
        "task:created" => format!("Task created: {title}"),
        "task:started" => match task_text(payload, TASK_AGENT_FIELDS) {
            Some(agent) => format!("Task started: {title} ({agent})"),
            None => format!("Task started: {title}"),
        },
        "task:completed" => format!("Task completed: {title}"),
        _ => {
            let error = first_message(payload, TASK_ERROR_FIELDS)
                .or_else(|| {
                    nested(payload, "task").and_then(|task| first_message(task, TASK_ERROR_FIELDS))
                })
                .unwrap_or(DEFAULT_TASK_ERROR);
            format!("Task failed: {title} - {error}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event(name: &str, payload: serde_json::Value) -> EngineEvent {
        EngineEvent::from_value(name, payload).expect("object payload")
    }

    fn only_annotation(chunks: Vec<OutputChunk>) -> String {
        match chunks.as_slice() {
            [OutputChunk::DataAnnotation { content, .. }] => content.clone(),
            other => panic!("expected one annotation, got {other:?}"),
        }
    }

    #[test]
    fn consecutive_responses_share_one_text_span() {
        let mut translator = EventTranslator::new();
        let mut chunks = translator.translate(&event("agent:response", json!({"output": "a"})));
        chunks.extend(translator.translate(&event("agent:response", json!({"content": "b"}))));
        chunks.extend(translator.finish());

        let id = match &chunks[0] {
            OutputChunk::TextStart { id } => id.clone(),
            other => panic!("expected text-start, got {other:?}"),
        };
        assert_eq!(
            chunks,
            vec![
                OutputChunk::TextStart { id: id.clone() },
                OutputChunk::TextDelta {
                    id: id.clone(),
                    delta: "a\n\n".into()
                },
                OutputChunk::TextDelta {
                    id: id.clone(),
                    delta: "b\n\n".into()
                },
                OutputChunk::TextEnd { id },
            ]
        );
        assert!(translator.finish().is_none());
    }

    #[test]
    fn empty_response_opens_span_without_delta() {
        let mut translator = EventTranslator::new();
        let chunks = translator.translate(&event("agent:response", json!({"output": ""})));
        assert!(matches!(chunks.as_slice(), [OutputChunk::TextStart { .. }]));
        assert!(translator.text_span().is_open());
    }

    #[test]
    fn response_content_is_the_first_non_empty_string_verbatim() {
        let delta = |payload: serde_json::Value| {
            let mut translator = EventTranslator::new();
            translator
                .translate(&event("agent:response", payload))
                .into_iter()
                .find_map(|chunk| match chunk {
                    OutputChunk::TextDelta { delta, .. } => Some(delta),
                    _ => None,
                })
        };
        assert_eq!(
            delta(json!({"output": "  ", "content": "other"})).as_deref(),
            Some("  \n\n")
        );
        assert_eq!(delta(json!({"output": "\n"})).as_deref(), Some("\n\n\n"));
        assert_eq!(
            delta(json!({"output": 42, "content": "text"})).as_deref(),
            Some("text\n\n")
        );
        assert_eq!(delta(json!({"output": 42})), None);
    }

    #[test]
    fn thinking_closes_text_and_emits_atomic_reasoning_span() {
        let mut translator = EventTranslator::new();
        translator.translate(&event("agent:response", json!({"output": "x"})));
        let text_id = translator
            .text_span()
            .active_id()
            .expect("open span")
            .to_string();

        let chunks = translator.translate(&event(
            "agent:thinking",
            json!({"thinking": "weighing options"}),
        ));
        assert_eq!(chunks.len(), 4);
        assert_eq!(chunks[0], OutputChunk::TextEnd { id: text_id });
        let reasoning_id = chunks[1].span_id().expect("id").to_string();
        assert_eq!(
            chunks[1..],
            [
                OutputChunk::ReasoningStart {
                    id: reasoning_id.clone()
                },
                OutputChunk::ReasoningDelta {
                    id: reasoning_id.clone(),
                    delta: "weighing options".into()
                },
                OutputChunk::ReasoningEnd { id: reasoning_id },
            ]
        );
        assert!(!translator.text_span().is_open());
    }

    #[test]
    fn thinking_without_text_names_the_agent() {
        let mut translator = EventTranslator::new();
        let chunks = translator.translate(&event("agent:thinking", json!({"agentId": "planner"})));
        assert!(matches!(
            &chunks[1],
            OutputChunk::ReasoningDelta { delta, .. } if delta == "planner is thinking..."
        ));
        let chunks = translator.translate(&event("agent:thinking", json!({})));
        assert!(matches!(
            &chunks[1],
            OutputChunk::ReasoningDelta { delta, .. } if delta == "agent is thinking..."
        ));
    }

    #[test]
    fn task_events_become_annotations() {
        let mut translator = EventTranslator::new();
        let created = translator.translate(&event("task:created", json!({"title": "Research"})));
        assert!(matches!(
            created.as_slice(),
            [OutputChunk::DataAnnotation { label, content }]
                if label == "task:created" && content == "Task created: Research"
        ));
        assert_eq!(
            only_annotation(translator.translate(&event(
                "task:started",
                json!({"task": {"id": 4}, "agentId": "coder"})
            ))),
            "Task started: 4 (coder)"
        );
        assert_eq!(
            only_annotation(translator.translate(&event("task:completed", json!({})))),
            "Task completed: task"
        );
    }

    #[test]
    fn failed_task_reports_error_or_fallback() {
        let mut translator = EventTranslator::new();
        let content = only_annotation(
            translator.translate(&event("task:failed", json!({"error": "timeout"}))),
        );
        assert!(content.contains("timeout"));

        let content = only_annotation(
            translator.translate(&event("task:failed", json!({"title": "Fetch", "error": 5}))),
        );
        assert_eq!(content, "Task failed: Fetch - unknown error");

        let content = only_annotation(translator.translate(&event(
            "task:failed",
            json!({"task": {"title": "Fetch", "error": {"message": "quota"}}}),
        )));
        assert_eq!(content, "Task failed: Fetch - quota");
    }

    #[test]
    fn goal_completed_opens_summarizes_closes_and_finishes() {
        let mut translator = EventTranslator::new();
        let chunks = translator.translate(&event(
            "goal:completed",
            json!({"tasks": 3, "completed": 2, "failed": 1}),
        ));
        let id = chunks[0].span_id().expect("id").to_string();
        assert_eq!(
            chunks,
            vec![
                OutputChunk::TextStart { id: id.clone() },
                OutputChunk::TextDelta {
                    id: id.clone(),
                    delta: "\n\n---\nGoal completed (2/3 tasks, 1 failed)\n".into()
                },
                OutputChunk::TextEnd { id },
                OutputChunk::Finish {
                    reason: "stop".into()
                },
            ]
        );
        assert!(translator.finish().is_none());
    }

    #[test]
    fn goal_summary_counts_fall_back_to_nested_summary_and_zero() {
        let mut translator = EventTranslator::new();
        let chunks = translator.translate(&event(
            "goal:completed",
            json!({"summary": {"totalTasks": 4, "completedTasks": [1, 2, 3]}}),
        ));
        assert!(matches!(
            &chunks[1],
            OutputChunk::TextDelta { delta, .. }
                if delta == "\n\n---\nGoal completed (3/4 tasks, 0 failed)\n"
        ));
    }

    #[test]
    fn engine_errors_close_text_and_emit_one_error() {
        let mut translator = EventTranslator::new();
        translator.translate(&event("agent:response", json!({"output": "partial"})));
        let chunks = translator.translate(&event(
            "loop:error",
            json!({"error": {"message": "agent crashed"}}),
        ));
        assert!(matches!(chunks[0], OutputChunk::TextEnd { .. }));
        assert_eq!(
            chunks[1],
            OutputChunk::Error {
                message: "agent crashed".into()
            }
        );
        let chunks = translator.translate(&event("agent:error", json!({"code": 1})));
        assert_eq!(
            chunks,
            vec![OutputChunk::Error {
                message: DEFAULT_ENGINE_ERROR.into()
            }]
        );
    }

    #[test]
    fn lifecycle_noise_and_unknown_events_emit_nothing() {
        let mut translator = EventTranslator::new();
        for name in [
            "loop:started",
            "loop:tick",
            "loop:stopped",
            "task:assigned",
            "goal:created",
            "agent:teleported",
        ] {
            assert!(translator.translate(&event(name, json!({"x": 1}))).is_empty());
        }
    }

    #[test]
    fn finish_is_only_emitted_by_goal_completed() {
        let mut translator = EventTranslator::new();
        let names = [
            "agent:thinking",
            "agent:response",
            "task:created",
            "task:started",
            "task:completed",
            "task:failed",
            "agent:error",
            "loop:error",
            "loop:tick",
        ];
        for name in names {
            let chunks = translator.translate(&event(name, json!({})));
            assert!(!chunks.iter().any(OutputChunk::is_finish), "{name}");
        }
    }
}
