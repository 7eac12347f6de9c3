//! The generation state machine.
//!
//! ```text
//! Idle ──submit──▶ Submitting ──ok──▶ Displaying ──reset──▶ Idle
//!   ▲                  │
//!   └──── Failed ◀─err─┘      (Failed accepts submit like Idle)
//! ```
//!
//! The workflow owns the draft and the result. Only one submission can be in
//! flight; while it is, attachments are frozen and further submits are ignored.

use crate::api::{GenerateError, GraphClient};
use crate::attachments::FileHandle;
use crate::export::{self, Export, ExportFormat};
use crate::request::{self, DraftInput, RequestPayload};
use crate::settings::GenerationSettings;
use serde_json::Value;
use uuid::Uuid;

const MISSING_HTML_MESSAGE: &str = "Response did not contain graph HTML";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorkflowError {
    #[error("Please enter text or upload files")]
    EmptyDraft,
}

/// A successful generation: the graph page plus the full response body.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationResult {
    pub html: String,
    pub raw: Value,
}

impl GenerationResult {
    /// Take `html`, falling back to `graph_html`. Empty strings count as absent.
    pub fn from_response(raw: Value) -> Option<Self> {
        let html = ["html", "graph_html"]
            .iter()
            .filter_map(|key| raw.get(*key).and_then(Value::as_str))
            .find(|s| !s.is_empty())?
            .to_string();
        Some(Self { html, raw })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum WorkflowState {
    Idle,
    Submitting,
    Displaying(GenerationResult),
    Failed(String),
}

impl WorkflowState {
    pub fn name(&self) -> &'static str {
        match self {
            WorkflowState::Idle => "idle",
            WorkflowState::Submitting => "submitting",
            WorkflowState::Displaying(_) => "displaying",
            WorkflowState::Failed(_) => "failed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Not accepted in the current state; nothing happened.
    Ignored,
    Displaying,
    Failed,
}

pub struct Workflow {
    draft: DraftInput,
    state: WorkflowState,
    notice: Option<String>,
    submission_id: Option<Uuid>,
}

impl Default for Workflow {
    fn default() -> Self {
        Self::new()
    }
}

impl Workflow {
    pub fn new() -> Self {
        Self {
            draft: DraftInput::default(),
            state: WorkflowState::Idle,
            notice: None,
            submission_id: None,
        }
    }

    pub fn state(&self) -> &WorkflowState {
        &self.state
    }

    pub fn draft(&self) -> &DraftInput {
        &self.draft
    }

    pub fn is_submitting(&self) -> bool {
        matches!(self.state, WorkflowState::Submitting)
    }

    pub fn result(&self) -> Option<&GenerationResult> {
        match &self.state {
            WorkflowState::Displaying(result) => Some(result),
            _ => None,
        }
    }

    /// The latest validation notice, otherwise the failure message.
    pub fn error(&self) -> Option<&str> {
        if let Some(notice) = self.notice.as_deref() {
            return Some(notice);
        }
        match &self.state {
            WorkflowState::Failed(message) => Some(message),
            _ => None,
        }
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.draft.text = text.into();
    }

    pub fn push_text(&mut self, text: &str) {
        self.draft.text.push_str(text);
    }

    /// Returns how many files were attached. Refused while submitting.
    pub fn add_files(&mut self, files: impl IntoIterator<Item = FileHandle>) -> usize {
        if self.is_submitting() {
            tracing::debug!("Ignoring attachment change while a submission is in flight");
            return 0;
        }
        self.draft.attachments.add(files)
    }

    /// Returns whether an attachment was removed. Refused while submitting.
    pub fn remove_attachment(&mut self, index: usize) -> bool {
        if self.is_submitting() {
            tracing::debug!("Ignoring attachment change while a submission is in flight");
            return false;
        }
        self.draft.attachments.remove_at(index).is_some()
    }

    /// Validate the draft and enter `Submitting`, returning the payload to send.
    ///
    /// `Ok(None)` means the call was ignored because the state does not accept
    /// a submit. An empty draft leaves the state untouched.
    pub fn begin_submit(
        &mut self,
        settings: &GenerationSettings,
    ) -> Result<Option<RequestPayload>, WorkflowError> {
        match self.state {
            WorkflowState::Idle | WorkflowState::Failed(_) => {}
            WorkflowState::Submitting | WorkflowState::Displaying(_) => {
                tracing::debug!(state = self.state.name(), "Submit ignored");
                return Ok(None);
            }
        }

        if !self.draft.has_content() {
            let err = WorkflowError::EmptyDraft;
            self.notice = Some(err.to_string());
            return Err(err);
        }

        let id = Uuid::new_v4();
        let payload = request::build(&self.draft, settings);
        self.notice = None;
        self.submission_id = Some(id);
        self.state = WorkflowState::Submitting;
        tracing::info!(
            submission_id = %id,
            text_chars = self.draft.text.chars().count(),
            attachments = self.draft.attachments.len(),
            "Submitting generation request"
        );
        Ok(Some(payload))
    }

    /// Apply the service's answer to an in-flight submission.
    pub fn finish_submit(&mut self, outcome: Result<Value, GenerateError>) -> SubmitOutcome {
        if !self.is_submitting() {
            return SubmitOutcome::Ignored;
        }
        let id = self.submission_id.take().unwrap_or_default();

        let outcome = match outcome {
            Ok(body) => {
                GenerationResult::from_response(body).ok_or_else(|| MISSING_HTML_MESSAGE.to_string())
            }
            Err(e) => Err(e.to_string()),
        };

        match outcome {
            Ok(result) => {
                tracing::info!(submission_id = %id, html_bytes = result.html.len(), "Graph generated");
                self.state = WorkflowState::Displaying(result);
                SubmitOutcome::Displaying
            }
            Err(message) => {
                tracing::error!(submission_id = %id, error = %message, "Graph generation failed");
                self.state = WorkflowState::Failed(message);
                SubmitOutcome::Failed
            }
        }
    }

    /// Build the request from the current draft, send it, and settle the state.
    pub async fn submit(
        &mut self,
        client: &GraphClient,
        settings: &GenerationSettings,
    ) -> Result<SubmitOutcome, WorkflowError> {
        let Some(payload) = self.begin_submit(settings)? else {
            return Ok(SubmitOutcome::Ignored);
        };
        let response = client.generate(payload).await;
        Ok(self.finish_submit(response))
    }

    /// Discard the result and the draft, returning to a blank `Idle`.
    /// Only valid while displaying a result.
    pub fn reset(&mut self) -> bool {
        if !matches!(self.state, WorkflowState::Displaying(_)) {
            return false;
        }
        self.draft.clear();
        self.notice = None;
        self.state = WorkflowState::Idle;
        tracing::debug!("Workflow reset");
        true
    }

    pub fn export(&self, format: ExportFormat) -> Option<Export> {
        export::export(self.result(), format)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Enter,
    Char(char),
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: Key,
    pub shift: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Submit,
    InsertNewline,
    None,
}

/// Enter submits; Shift+Enter inserts a line break.
pub fn key_action(event: KeyEvent) -> KeyAction {
    match event {
        KeyEvent {
            key: Key::Enter,
            shift: false,
        } => KeyAction::Submit,
        KeyEvent {
            key: Key::Enter,
            shift: true,
        } => KeyAction::InsertNewline,
        _ => KeyAction::None,
    }
}
