//! Prompt template store: loads each category's `prompt.txt` once and
//! renders it against a variable map, never failing on an unknown
//! placeholder.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::{Error, Result};

/// Loads and caches prompt templates for the process lifetime.
///
/// Templates are registered directly (an in-memory map keyed by category
/// name) rather than read from a directory tree at call time, so a
/// template is parsed for `{placeholder}` syntax at most once. Unknown
/// placeholders in `render` are substituted with the empty string and
/// logged, never treated as an error — a malformed or partially-migrated
/// prompt should degrade, not break ingestion.
#[derive(Debug, Default)]
pub struct PromptTemplateStore {
    templates: RwLock<HashMap<String, String>>,
}

impl PromptTemplateStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            templates: RwLock::new(HashMap::new()),
        }
    }

    /// Register or replace the template text for `name`.
    pub fn register(&self, name: impl Into<String>, template: impl Into<String>) {
        let mut templates = self
            .templates
            .write()
            .expect("PromptTemplateStore: templates lock poisoned");
        templates.insert(name.into(), template.into());
    }

    /// Fetch the raw template text for `name`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TemplateNotFound`] if no template was registered
    /// under that name.
    pub fn get(&self, name: &str) -> Result<String> {
        let templates = self
            .templates
            .read()
            .expect("PromptTemplateStore: templates lock poisoned");
        templates
            .get(name)
            .cloned()
            .ok_or_else(|| Error::TemplateNotFound(name.to_string()))
    }

    /// Render the template registered under `name`, substituting each
    /// `{key}` placeholder with `variables[key]`. Placeholders with no
    /// matching variable are replaced with the empty string and a
    /// warning is logged rather than returning an error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TemplateNotFound`] if `name` was never
    /// registered.
    pub fn render(&self, name: &str, variables: &HashMap<String, String>) -> Result<String> {
        let template = self.get(name)?;
        Ok(render_template(&template, variables, name))
    }
}

fn render_template(template: &str, variables: &HashMap<String, String>, template_name: &str) -> String {
    let mut rendered = String::with_capacity(template.len());
    let mut chars = template.char_indices().peekable();
    let bytes = template.as_bytes();

    let mut cursor = 0usize;
    while cursor < bytes.len() {
        match template[cursor..].find('{') {
            None => {
                rendered.push_str(&template[cursor..]);
                break;
            }
            Some(rel_open) => {
                let open = cursor + rel_open;
                rendered.push_str(&template[cursor..open]);
                match template[open + 1..].find('}') {
                    None => {
                        // Unterminated placeholder: emit the rest verbatim.
                        rendered.push_str(&template[open..]);
                        cursor = bytes.len();
                    }
                    Some(rel_close) => {
                        let close = open + 1 + rel_close;
                        let key = &template[open + 1..close];
                        match variables.get(key) {
                            Some(value) => rendered.push_str(value),
                            None => {
                                tracing::warn!(
                                    template = template_name,
                                    placeholder = key,
                                    "unknown placeholder in prompt template, substituting empty string"
                                );
                            }
                        }
                        cursor = close + 1;
                    }
                }
            }
        }
    }
    let _ = &mut chars; // char_indices() retained only to document scanning intent
    rendered
}
