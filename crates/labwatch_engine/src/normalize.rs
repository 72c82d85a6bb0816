use scraper::{ElementRef, Html, Selector};

/// Region of a lab report page that carries the report itself.
pub const DEFAULT_CONTENT_SELECTOR: &str = "form#form1";

/// Elements whose text is never rendered.
const INVISIBLE_ELEMENTS: &[&str] = &["script", "style", "template"];

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum NormalizeError {
    #[error("invalid content selector {selector:?}: {message}")]
    InvalidSelector { selector: String, message: String },
}

/// Reduces a page to its visible text so that markup-only edits hash equal.
///
/// The first element matching the content selector is used as the scope,
/// falling back to the whole document. Every text node inside the scope is
/// trimmed and empty pieces are dropped; script, style and template bodies
/// are skipped. The rest are concatenated.
#[derive(Debug, Clone)]
pub struct TextNormalizer {
    scope: Option<Selector>,
}

impl Default for TextNormalizer {
    fn default() -> Self {
        Self {
            scope: Selector::parse(DEFAULT_CONTENT_SELECTOR).ok(),
        }
    }
}

impl TextNormalizer {
    pub fn new(selector: &str) -> Result<Self, NormalizeError> {
        let scope = Selector::parse(selector).map_err(|err| NormalizeError::InvalidSelector {
            selector: selector.to_string(),
            message: err.to_string(),
        })?;
        Ok(Self { scope: Some(scope) })
    }

    /// Normalizer that always hashes the whole document.
    pub fn whole_document() -> Self {
        Self { scope: None }
    }

    pub fn normalize(&self, html: &str) -> String {
        let doc = Html::parse_document(html);
        let root = self
            .scope
            .as_ref()
            .and_then(|sel| doc.select(sel).next())
            .unwrap_or_else(|| doc.root_element());
        let mut text = String::new();
        for node in root.descendants() {
            let Some(piece) = node.value().as_text() else {
                continue;
            };
            let hidden = node
                .ancestors()
                .take_while(|ancestor| ancestor.id() != root.id())
                .filter_map(ElementRef::wrap)
                .any(|element| INVISIBLE_ELEMENTS.contains(&element.value().name()));
            let piece = piece.trim();
            if !hidden && !piece.is_empty() {
                text.push_str(piece);
            }
        }
        text
    }
}
