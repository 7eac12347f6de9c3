pub mod api;
pub mod attachments;
pub mod config;
pub mod db;
pub mod export;
pub mod request;
pub mod settings;
pub mod viewer;
pub mod workflow;

pub use api::{GenerateError, GraphClient};
pub use attachments::{Attachment, AttachmentManager, Extension, FileHandle};
pub use config::AppConfig;
pub use db::Database;
pub use export::{Export, ExportFormat};
pub use request::{DraftInput, RequestPayload};
pub use settings::{
    GenerationSettings, SettingsDraft, SettingsPanel, SettingsSnapshot, SettingsStore, Theme,
};
pub use workflow::{GenerationResult, SubmitOutcome, Workflow, WorkflowState};

/// Initialize tracing for the binary. Logs go to stderr; `RUST_LOG` overrides the `info` default.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
}
