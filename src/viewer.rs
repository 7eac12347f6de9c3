//! Standalone page that displays a generated graph.
//!
//! The graph HTML is placed in a sandboxed iframe's `srcdoc`, so its scripts
//! and styles run in their own document and cannot touch the surrounding page.

use crate::settings::Theme;
use crate::workflow::GenerationResult;
use maud::{html, Markup, DOCTYPE};
use std::path::{Path, PathBuf};

pub const VIEWER_FILE: &str = "knowledge_graph_view.html";

const STYLE: &str = "
html, body { margin: 0; height: 100%; font-family: system-ui, sans-serif; }
body { display: flex; flex-direction: column; }
body.light { background: #ffffff; color: #1f2937; }
body.dark { background: #111827; color: #f9fafb; }
header { padding: 1rem 1.5rem; border-bottom: 1px solid #e5e7eb; }
header h2 { margin: 0; font-size: 1.25rem; font-weight: 600; }
iframe { flex: 1; width: 100%; border: 0; }
";

pub fn render_page(result: &GenerationResult, theme: Theme) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { "Knowledge Graph" }
                style { (STYLE) }
            }
            body class=(theme.as_str()) {
                header {
                    h2 { "Knowledge Graph" }
                }
                iframe sandbox="allow-scripts" title="Knowledge Graph" srcdoc=(result.html) {}
            }
        }
    }
}

/// Write the viewer page into `dir` and return its path.
pub fn write_page(result: &GenerationResult, theme: Theme, dir: &Path) -> std::io::Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(VIEWER_FILE);
    std::fs::write(&path, render_page(result, theme).into_string())?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn result(html: &str) -> GenerationResult {
        GenerationResult {
            html: html.to_string(),
            raw: json!({ "html": html }),
        }
    }

    #[test]
    fn test_graph_is_sandboxed_and_escaped() {
        let page = render_page(&result(r#"<script>alert("x")</script>"#), Theme::Light).into_string();
        assert!(page.contains(r#"sandbox="allow-scripts""#));
        assert!(page.contains("srcdoc=\"&lt;script&gt;alert(&quot;x&quot;)&lt;/script&gt;\""));
        assert!(!page.contains("<script>"));
    }

    #[test]
    fn test_theme_class_applied() {
        let page = render_page(&result("<p>g</p>"), Theme::Dark).into_string();
        assert!(page.contains(r#"<body class="dark">"#));
    }

    #[test]
    fn test_write_page() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_page(&result("<p>g</p>"), Theme::Light, dir.path()).unwrap();
        assert!(path.ends_with(VIEWER_FILE));
        let written = std::fs::read_to_string(path).unwrap();
        assert!(written.starts_with("<!DOCTYPE html>"));
    }
}
