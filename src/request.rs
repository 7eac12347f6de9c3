use crate::attachments::{Attachment, AttachmentManager};
use crate::settings::GenerationSettings;
use bytes::Bytes;
use reqwest::multipart::{Form, Part};

/// The user's unsubmitted input.
#[derive(Debug, Clone, Default)]
pub struct DraftInput {
    pub text: String,
    pub attachments: AttachmentManager,
}

impl DraftInput {
    /// True when there is something to submit: non-blank text or at least one attachment.
    pub fn has_content(&self) -> bool {
        !self.text.trim().is_empty() || self.attachments.has_content()
    }

    pub fn clear(&mut self) {
        self.text.clear();
        self.attachments.clear();
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    File {
        file_name: String,
        mime_type: &'static str,
        content: Bytes,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct FormField {
    pub name: &'static str,
    pub value: FieldValue,
}

/// Multipart body for the generate endpoint, kept inspectable until it is sent.
#[derive(Debug, Clone, Default)]
pub struct RequestPayload {
    fields: Vec<FormField>,
}

impl RequestPayload {
    fn text(&mut self, name: &'static str, value: impl Into<String>) {
        self.fields.push(FormField {
            name,
            value: FieldValue::Text(value.into()),
        });
    }

    fn file(&mut self, attachment: &Attachment) {
        self.fields.push(FormField {
            name: "files",
            value: FieldValue::File {
                file_name: attachment.name().to_string(),
                mime_type: attachment.extension().mime_type(),
                content: attachment.content().clone(),
            },
        });
    }

    pub fn fields(&self) -> &[FormField] {
        &self.fields
    }

    /// Value of the first text field called `name`.
    pub fn text_value(&self, name: &str) -> Option<&str> {
        self.fields.iter().find_map(|f| match &f.value {
            FieldValue::Text(v) if f.name == name => Some(v.as_str()),
            _ => None,
        })
    }

    pub fn file_names(&self) -> Vec<&str> {
        self.fields
            .iter()
            .filter_map(|f| match &f.value {
                FieldValue::File { file_name, .. } => Some(file_name.as_str()),
                FieldValue::Text(_) => None,
            })
            .collect()
    }

    pub fn into_form(self) -> Result<Form, reqwest::Error> {
        let mut form = Form::new();
        for field in self.fields {
            form = match field.value {
                FieldValue::Text(value) => form.text(field.name, value),
                FieldValue::File {
                    file_name,
                    mime_type,
                    content,
                } => {
                    let length = content.len() as u64;
                    let part = Part::stream_with_length(content, length)
                        .file_name(file_name)
                        .mime_str(mime_type)?;
                    form.part(field.name, part)
                }
            };
        }
        Ok(form)
    }
}

/// Assemble the request body from the draft and the current settings.
///
/// Callers must check [`DraftInput::has_content`] first; an empty draft
/// produces a payload carrying only the settings fields.
pub fn build(draft: &DraftInput, settings: &GenerationSettings) -> RequestPayload {
    let mut payload = RequestPayload::default();
    payload.text("api_key", settings.api_key.as_str());
    payload.text("base_url", settings.base_url.as_str());
    payload.text("model_name", settings.model_name.as_str());
    payload.text("temperature", settings.temperature.to_string());
    payload.text("chunk_size", settings.chunk_size.to_string());

    if !draft.text.trim().is_empty() {
        payload.text("text", draft.text.as_str());
    }

    for attachment in draft.attachments.attachments() {
        payload.file(attachment);
    }
    payload
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attachments::FileHandle;

    fn settings() -> GenerationSettings {
        GenerationSettings {
            api_key: "key".into(),
            base_url: "http://llm".into(),
            model_name: "model".into(),
            temperature: 0.5,
            chunk_size: 1200,
        }
    }

    fn names(payload: &RequestPayload) -> Vec<&str> {
        payload.fields().iter().map(|f| f.name).collect()
    }

    #[test]
    fn test_settings_fields_as_strings() {
        let draft = DraftInput {
            text: "Alice knows Bob".into(),
            ..DraftInput::default()
        };
        let payload = build(&draft, &settings());
        assert_eq!(
            names(&payload),
            vec!["api_key", "base_url", "model_name", "temperature", "chunk_size", "text"]
        );
        assert_eq!(payload.text_value("temperature"), Some("0.5"));
        assert_eq!(payload.text_value("chunk_size"), Some("1200"));
        assert_eq!(payload.text_value("text"), Some("Alice knows Bob"));
    }

    #[test]
    fn test_default_settings_serialize_like_storage() {
        let draft = DraftInput {
            text: "x".into(),
            ..DraftInput::default()
        };
        let payload = build(&draft, &GenerationSettings::default());
        assert_eq!(payload.text_value("api_key"), Some(""));
        assert_eq!(payload.text_value("temperature"), Some("0"));
        assert_eq!(payload.text_value("chunk_size"), Some("4000"));
    }

    #[test]
    fn test_blank_text_omitted() {
        let mut draft = DraftInput {
            text: "  \n\t ".into(),
            ..DraftInput::default()
        };
        draft
            .attachments
            .add(vec![FileHandle::new("a.txt", b"a".to_vec())]);
        let payload = build(&draft, &settings());
        assert_eq!(payload.text_value("text"), None);
        assert_eq!(payload.file_names(), vec!["a.txt"]);
    }

    #[test]
    fn test_text_sent_untrimmed() {
        let draft = DraftInput {
            text: "  padded  ".into(),
            ..DraftInput::default()
        };
        let payload = build(&draft, &settings());
        assert_eq!(payload.text_value("text"), Some("  padded  "));
    }

    #[test]
    fn test_files_in_attachment_order() {
        let mut draft = DraftInput::default();
        draft.attachments.add(vec![
            FileHandle::new("z.pdf", b"%PDF".to_vec()),
            FileHandle::new("a.csv", b"a,b".to_vec()),
            FileHandle::new("m.docx", b"PK".to_vec()),
        ]);
        let payload = build(&draft, &settings());
        assert_eq!(payload.file_names(), vec!["z.pdf", "a.csv", "m.docx"]);

        let files: Vec<&FieldValue> = payload
            .fields()
            .iter()
            .filter(|f| f.name == "files")
            .map(|f| &f.value)
            .collect();
        assert_eq!(
            files[1],
            &FieldValue::File {
                file_name: "a.csv".into(),
                mime_type: "text/csv",
                content: Bytes::from_static(b"a,b"),
            }
        );
    }

    #[test]
    fn test_into_form_accepts_all_mime_types() {
        let mut draft = DraftInput::default();
        draft.attachments.add(vec![
            FileHandle::new("a.txt", b"t".to_vec()),
            FileHandle::new("b.pdf", b"p".to_vec()),
            FileHandle::new("c.docx", b"d".to_vec()),
            FileHandle::new("d.csv", b"c".to_vec()),
        ]);
        assert!(build(&draft, &settings()).into_form().is_ok());
    }

    #[test]
    fn test_draft_has_content() {
        let mut draft = DraftInput::default();
        assert!(!draft.has_content());
        draft.text = "   ".into();
        assert!(!draft.has_content());
        draft
            .attachments
            .add(vec![FileHandle::new("a.csv", b"x".to_vec())]);
        assert!(draft.has_content());
        draft.clear();
        assert!(draft.text.is_empty());
        assert!(!draft.has_content());
    }
}
