//! Knowledge Navigator CLI: submit text and documents to the graph service,
//! export the result, and manage generation settings.
//!
//! Service location and data directory come from the environment (see
//! `AppConfig`); `--api-url` and `--data-dir` override them.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use knowledge_navigator::workflow::{key_action, Key, KeyAction, KeyEvent};
use knowledge_navigator::{
    viewer, AppConfig, Database, ExportFormat, FileHandle, GraphClient, SettingsPanel,
    SettingsSnapshot, SettingsStore, SubmitOutcome, Workflow, WorkflowState,
};
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Parser)]
#[command(
    name = "knowledge-navigator",
    about = "Generate knowledge graphs from text and documents"
)]
struct Cli {
    /// Graph service base URL
    #[arg(long, global = true)]
    api_url: Option<String>,
    /// Directory holding the settings database
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a graph once and export it
    Generate {
        /// Text to extract a graph from
        #[arg(long)]
        text: Option<String>,
        /// Documents to attach (txt, pdf, docx, csv)
        #[arg(long = "file")]
        files: Vec<PathBuf>,
        /// Directory to write exports into
        #[arg(long, default_value = ".")]
        out: PathBuf,
        /// Export formats: html, json (default html)
        #[arg(long = "format", value_parser = parse_format)]
        formats: Vec<ExportFormat>,
        /// Also write a sandboxed viewer page
        #[arg(long)]
        view: bool,
    },
    /// Show or change generation settings
    Settings {
        #[command(subcommand)]
        sub: SettingsCommands,
    },
    /// Show the display theme, or toggle it
    Theme {
        #[command(subcommand)]
        sub: Option<ThemeCommands>,
    },
    /// Line-based session: Enter submits, a trailing `\` continues the line
    Interactive {
        /// Default directory for exports and the viewer page
        #[arg(long, default_value = ".")]
        out: PathBuf,
    },
}

#[derive(Subcommand)]
enum SettingsCommands {
    /// Print current settings (API key masked)
    Show {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Update one or more settings and save them
    Set {
        #[arg(long)]
        api_key: Option<String>,
        #[arg(long)]
        base_url: Option<String>,
        #[arg(long)]
        model: Option<String>,
        #[arg(long)]
        temperature: Option<String>,
        #[arg(long)]
        chunk_size: Option<String>,
    },
}

#[derive(Subcommand)]
enum ThemeCommands {
    /// Switch between light and dark
    Toggle,
}

fn parse_format(s: &str) -> Result<ExportFormat, String> {
    s.parse()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    knowledge_navigator::init_tracing();
    let cli = Cli::parse();

    let mut config = AppConfig::from_env().context("Invalid configuration")?;
    if let Some(url) = cli.api_url {
        config.api_url = url.trim_end_matches('/').to_string();
    }
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }

    match cli.command {
        Commands::Generate {
            text,
            files,
            out,
            formats,
            view,
        } => generate(&config, text, &files, &out, formats, view).await,
        Commands::Settings { sub } => match sub {
            SettingsCommands::Show { json } => {
                let store = open_store_or_fallback(&config)?;
                if json {
                    println!("{}", serde_json::to_string_pretty(&store.snapshot())?);
                } else {
                    print_settings(&store.snapshot());
                }
                Ok(())
            }
            SettingsCommands::Set {
                api_key,
                base_url,
                model,
                temperature,
                chunk_size,
            } => {
                let store = open_store(&config)?;
                let mut panel = SettingsPanel::new(&store);
                let draft = panel.open();
                if let Some(v) = api_key {
                    draft.api_key = v;
                }
                if let Some(v) = base_url {
                    draft.base_url = v;
                }
                if let Some(v) = model {
                    draft.model_name = v;
                }
                if let Some(v) = temperature {
                    draft.temperature = v;
                }
                if let Some(v) = chunk_size {
                    draft.chunk_size = v;
                }
                panel.save().context("Failed to save settings")?;
                println!("Settings saved");
                print_settings(&store.snapshot());
                Ok(())
            }
        },
        Commands::Theme { sub } => {
            let store = open_store(&config)?;
            let theme = match sub {
                Some(ThemeCommands::Toggle) => store.toggle_theme().context("Failed to save theme")?,
                None => store.load_theme(),
            };
            println!("{}", theme);
            Ok(())
        }
        Commands::Interactive { out } => interactive(&config, &out).await,
    }
}

fn open_store(config: &AppConfig) -> anyhow::Result<SettingsStore> {
    let db = Database::new(&config.data_dir).with_context(|| {
        format!(
            "Failed to open settings storage in {}",
            config.data_dir.display()
        )
    })?;
    Ok(SettingsStore::new(db))
}

/// Reading settings never blocks generation: if storage cannot be opened,
/// continue with defaults held in memory.
fn open_store_or_fallback(config: &AppConfig) -> anyhow::Result<SettingsStore> {
    match open_store(config) {
        Ok(store) => Ok(store),
        Err(e) => {
            tracing::warn!(error = %e, "Settings storage unavailable, using defaults");
            let db = Database::open_in_memory().context("Failed to open in-memory settings")?;
            Ok(SettingsStore::new(db))
        }
    }
}

fn client(config: &AppConfig) -> anyhow::Result<GraphClient> {
    GraphClient::with_options(&config.api_url, &config.generate_path, config.timeout)
        .context("Failed to create HTTP client")
}

fn print_settings(snapshot: &SettingsSnapshot) {
    let settings = &snapshot.settings;
    println!("api_key:     {}", settings.api_key);
    println!("base_url:    {}", settings.base_url);
    println!("model_name:  {}", settings.model_name);
    println!("temperature: {}", settings.temperature);
    println!("chunk_size:  {}", settings.chunk_size);
    println!("theme:       {}", snapshot.theme);
}

fn read_files(paths: &[PathBuf]) -> anyhow::Result<Vec<FileHandle>> {
    paths
        .iter()
        .map(|path| {
            FileHandle::from_path(path).with_context(|| format!("Failed to read {}", path.display()))
        })
        .collect()
}

fn export_result(workflow: &Workflow, format: ExportFormat, dir: &Path) -> anyhow::Result<()> {
    let Some(export) = workflow.export(format) else {
        println!("No graph to export");
        return Ok(());
    };
    let path = export
        .write_into(dir)
        .with_context(|| format!("Failed to write {}", export.filename))?;
    println!("Saved {} ({})", path.display(), export.mime_type);
    Ok(())
}

fn write_viewer(workflow: &Workflow, store: &SettingsStore, dir: &Path) -> anyhow::Result<()> {
    let Some(result) = workflow.result() else {
        println!("No graph to view");
        return Ok(());
    };
    let path = viewer::write_page(result, store.load_theme(), dir)
        .context("Failed to write viewer page")?;
    println!("Viewer written to {}", path.display());
    Ok(())
}

async fn generate(
    config: &AppConfig,
    text: Option<String>,
    files: &[PathBuf],
    out: &Path,
    mut formats: Vec<ExportFormat>,
    view: bool,
) -> anyhow::Result<()> {
    let store = open_store_or_fallback(config)?;
    let settings = store.load();
    let client = client(config)?;

    let mut workflow = Workflow::new();
    if let Some(text) = text {
        workflow.set_text(text);
    }
    let kept = workflow.add_files(read_files(files)?);
    if kept < files.len() {
        println!(
            "Skipped {} file(s) with unsupported extensions",
            files.len() - kept
        );
    }

    if workflow.submit(&client, &settings).await? != SubmitOutcome::Displaying {
        bail!(workflow
            .error()
            .unwrap_or("Failed to generate knowledge graph")
            .to_string());
    }

    if formats.is_empty() {
        formats.push(ExportFormat::Html);
    }
    for format in formats {
        export_result(&workflow, format, out)?;
    }
    if view {
        write_viewer(&workflow, &store, out)?;
    }
    Ok(())
}

const HELP: &str = "\
Type text and press Enter to generate. End a line with \\ to continue on the next line.
Lines starting with : are commands; start a line with :: to type a literal :.
Commands:
  :attach PATH...        attach documents (txt, pdf, docx, csv)
  :remove N              remove attachment N
  :list                  show the draft
  :export html|json [DIR]
  :view [DIR]            write a sandboxed viewer page
  :reset                 start a new graph
  :settings              show settings
  :theme                 toggle light/dark
  :quit";

async fn interactive(config: &AppConfig, out: &Path) -> anyhow::Result<()> {
    let store = open_store_or_fallback(config)?;
    let client = client(config)?;
    let mut workflow = Workflow::new();
    println!("Knowledge Navigator (theme: {})", store.load_theme());
    println!("{}", HELP);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let text = match classify_line(&line) {
            Line::Command(command) => {
                let mut parts = command.split_whitespace();
                let name = parts.next().unwrap_or_default();
                let args: Vec<&str> = parts.collect();
                match run_command(name, &args, &mut workflow, &store, out) {
                    Ok(true) => continue,
                    Ok(false) => break,
                    Err(e) => {
                        println!("Error: {:#}", e);
                        continue;
                    }
                }
            }
            Line::Text(text) => text,
        };

        if workflow.result().is_some() {
            println!("A graph is displayed. Use :export, :view, or :reset to start over.");
            continue;
        }

        if apply_line(&mut workflow, text) == KeyAction::Submit {
            // Settings are read per submission so saved changes apply immediately.
            let settings = store.load();
            match workflow.submit(&client, &settings).await {
                Ok(SubmitOutcome::Displaying) => {
                    println!("Graph ready. Use :export html|json, :view, or :reset.")
                }
                Ok(SubmitOutcome::Failed) => {
                    println!(
                        "Error: {}. Your input was kept; press Enter to retry.",
                        workflow.error().unwrap_or("generation failed")
                    )
                }
                Ok(SubmitOutcome::Ignored) => {}
                Err(e) => println!("{}", e),
            }
        }
    }
    Ok(())
}

#[derive(Debug, PartialEq, Eq)]
enum Line<'a> {
    Command(&'a str),
    Text(&'a str),
}

/// `:name args` is a command; `::` escapes a leading colon.
fn classify_line(line: &str) -> Line<'_> {
    match line.trim_start().strip_prefix(':') {
        Some(rest) if rest.starts_with(':') => Line::Text(rest),
        Some(rest) => Line::Command(rest.trim()),
        None => Line::Text(line),
    }
}

/// Feed one typed line into the draft as if Enter was pressed.
/// A trailing `\` stands in for Shift+Enter.
fn apply_line(workflow: &mut Workflow, line: &str) -> KeyAction {
    let text = workflow.draft().text.as_str();
    if !text.is_empty() && !text.ends_with('\n') && !line.is_empty() {
        workflow.push_text("\n");
    }

    let action = key_action(KeyEvent {
        key: Key::Enter,
        shift: line.ends_with('\\'),
    });
    match action {
        KeyAction::InsertNewline => {
            workflow.push_text(line.trim_end_matches('\\'));
            workflow.push_text("\n");
        }
        KeyAction::Submit => workflow.push_text(line),
        KeyAction::None => {}
    }
    action
}

/// Parse the 1-based argument of `:remove` into a list index.
fn attachment_index(arg: Option<&str>) -> Option<usize> {
    arg?.parse::<usize>().ok()?.checked_sub(1)
}

/// Returns `false` when the session should end.
fn run_command(
    name: &str,
    args: &[&str],
    workflow: &mut Workflow,
    store: &SettingsStore,
    out: &Path,
) -> anyhow::Result<bool> {
    let dir_arg = |i: usize| args.get(i).map(PathBuf::from).unwrap_or_else(|| out.to_path_buf());

    match name {
        "attach" => {
            let paths: Vec<PathBuf> = args.iter().map(PathBuf::from).collect();
            let kept = workflow.add_files(read_files(&paths)?);
            println!("Attached {} of {} file(s)", kept, paths.len());
        }
        "remove" => {
            let index = attachment_index(args.first().copied()).context("Usage: :remove N")?;
            if !workflow.remove_attachment(index) {
                println!("No attachment {}", index + 1);
            }
        }
        "list" => print_draft(workflow),
        "export" => {
            let format: ExportFormat = args
                .first()
                .context("Usage: :export html|json [DIR]")?
                .parse()
                .map_err(anyhow::Error::msg)?;
            export_result(workflow, format, &dir_arg(1))?;
        }
        "view" => write_viewer(workflow, store, &dir_arg(0))?,
        "reset" => {
            if workflow.reset() {
                println!("Ready for a new graph");
            } else {
                println!("Nothing to reset");
            }
        }
        "settings" => print_settings(&store.snapshot()),
        "theme" => println!("Theme: {}", store.toggle_theme()?),
        "help" => println!("{}", HELP),
        "quit" | "q" | "exit" => return Ok(false),
        other => println!("Unknown command :{} (try :help)", other),
    }
    Ok(true)
}

fn print_draft(workflow: &Workflow) {
    let draft = workflow.draft();
    println!("State: {}", workflow.state().name());
    if let WorkflowState::Failed(message) = workflow.state() {
        println!("Last error: {}", message);
    }
    if draft.text.is_empty() {
        println!("Text: (empty)");
    } else {
        println!("Text:\n{}", draft.text);
    }
    for (i, attachment) in draft.attachments.attachments().iter().enumerate() {
        println!(
            "  {}. {} ({})",
            i + 1,
            attachment.name(),
            attachment.display_size()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use knowledge_navigator::{GenerateError, GenerationSettings};

    #[test]
    fn test_trailing_backslash_continues_then_enter_submits() {
        let mut workflow = Workflow::new();
        assert_eq!(apply_line(&mut workflow, "a\\"), KeyAction::InsertNewline);
        assert_eq!(workflow.draft().text, "a\n");
        assert_eq!(apply_line(&mut workflow, "b"), KeyAction::Submit);
        assert_eq!(workflow.draft().text, "a\nb");
    }

    #[test]
    fn test_lines_after_a_kept_draft_are_joined() {
        let mut workflow = Workflow::new();
        workflow.set_text("first");
        assert_eq!(apply_line(&mut workflow, "second"), KeyAction::Submit);
        assert_eq!(workflow.draft().text, "first\nsecond");
    }

    #[test]
    fn test_empty_line_after_failure_resubmits_kept_draft() {
        let settings = GenerationSettings::default();
        let mut workflow = Workflow::new();
        assert_eq!(apply_line(&mut workflow, "Alice met Bob"), KeyAction::Submit);
        workflow.begin_submit(&settings).unwrap();
        workflow.finish_submit(Err(GenerateError::Api {
            status: 502,
            message: String::new(),
        }));
        assert!(matches!(workflow.state(), WorkflowState::Failed(_)));

        assert_eq!(apply_line(&mut workflow, ""), KeyAction::Submit);
        assert_eq!(workflow.draft().text, "Alice met Bob");
        assert!(workflow.begin_submit(&settings).unwrap().is_some());
    }

    #[test]
    fn test_classify_line() {
        assert_eq!(classify_line(":attach a.txt"), Line::Command("attach a.txt"));
        assert_eq!(classify_line("  :quit  "), Line::Command("quit"));
        assert_eq!(classify_line("::note: keep"), Line::Text(":note: keep"));
        assert_eq!(classify_line("ratio 3:1"), Line::Text("ratio 3:1"));
        assert_eq!(classify_line(""), Line::Text(""));
    }

    #[test]
    fn test_escaped_colon_line_goes_into_draft() {
        let mut workflow = Workflow::new();
        let Line::Text(text) = classify_line("::Summary\\") else {
            panic!("expected text");
        };
        assert_eq!(apply_line(&mut workflow, text), KeyAction::InsertNewline);
        assert_eq!(workflow.draft().text, ":Summary\n");
    }

    #[test]
    fn test_attachment_index_is_one_based() {
        assert_eq!(attachment_index(Some("1")), Some(0));
        assert_eq!(attachment_index(Some("3")), Some(2));
        assert_eq!(attachment_index(Some("0")), None);
        assert_eq!(attachment_index(Some("x")), None);
        assert_eq!(attachment_index(None), None);
    }

    #[test]
    fn test_remove_command_uses_one_based_index() {
        let store = SettingsStore::new(Database::open_in_memory().unwrap());
        let out = tempfile::tempdir().unwrap();
        let mut workflow = Workflow::new();
        workflow.add_files([
            FileHandle::new("a.txt", b"a".to_vec()),
            FileHandle::new("b.txt", b"b".to_vec()),
        ]);

        assert!(run_command("remove", &["0"], &mut workflow, &store, out.path()).is_err());
        assert_eq!(workflow.draft().attachments.attachments().len(), 2);

        assert!(run_command("remove", &["1"], &mut workflow, &store, out.path()).unwrap());
        let names: Vec<&str> = workflow
            .draft()
            .attachments
            .attachments()
            .iter()
            .map(|a| a.name())
            .collect();
        assert_eq!(names, ["b.txt"]);
    }

    #[test]
    fn test_unusable_data_dir_falls_back_to_defaults() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let config = AppConfig {
            data_dir: file.path().join("sub"),
            ..AppConfig::default()
        };

        assert!(open_store(&config).is_err());
        let store = open_store_or_fallback(&config).unwrap();
        assert_eq!(store.load(), GenerationSettings::default());
    }
}
