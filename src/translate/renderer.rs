// file: src/translate/renderer.rs
// description: deterministic word-wrap layout and PDF generation
// reference: https://docs.rs/lopdf

use crate::config::RenderConfig;
use crate::error::{PipelineError, Result};
use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, Stream, dictionary};
use tracing::debug;

/// Page geometry in PDF points, plus the fixed character wrap width.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageLayout {
    pub page_width: i64,
    pub page_height: i64,
    pub margin_x: i64,
    pub margin_top: i64,
    pub margin_bottom: i64,
    pub font_size: i64,
    pub line_height: i64,
    pub wrap_width: usize,
}

impl Default for PageLayout {
    /// US letter geometry: 612x792pt, text from y=750 down to y=40,
    /// Helvetica 12 on a 14pt baseline grid, 80-character wrap.
    fn default() -> Self {
        Self {
            page_width: 612,
            page_height: 792,
            margin_x: 40,
            margin_top: 750,
            margin_bottom: 40,
            font_size: 12,
            line_height: 14,
            wrap_width: 80,
        }
    }
}

impl From<&RenderConfig> for PageLayout {
    fn from(config: &RenderConfig) -> Self {
        Self {
            page_width: config.page_width,
            page_height: config.page_height,
            margin_x: config.margin_x,
            margin_top: config.margin_top,
            margin_bottom: config.margin_bottom,
            font_size: config.font_size,
            line_height: config.line_height,
            wrap_width: config.wrap_width,
        }
    }
}

impl PageLayout {
    /// Number of baselines that fit before the cursor would cross the
    /// bottom margin. The first line sits at `margin_top` and each further
    /// line `line_height` below it; a line at or below `margin_bottom`
    /// starts a new page.
    pub fn lines_per_page(&self) -> usize {
        (((self.margin_top - self.margin_bottom - 1) / self.line_height) + 1) as usize
    }
}

/// Word-wrap `content` at `width` characters. Input is split on explicit
/// line breaks first; each logical line is then greedily packed with whole
/// words, and words longer than `width` are hard-broken. Blank lines are
/// dropped, matching classic textwrap behavior.
pub fn wrap_text(content: &str, width: usize) -> Vec<String> {
    let mut wrapped = Vec::new();

    for logical in content.split('\n') {
        let mut current = String::new();

        for word in logical.split_whitespace() {
            let word_len = word.chars().count();

            if word_len > width {
                if !current.is_empty() {
                    wrapped.push(std::mem::take(&mut current));
                }
                let chars: Vec<char> = word.chars().collect();
                for piece in chars.chunks(width) {
                    wrapped.push(piece.iter().collect());
                }
                // A hard-broken tail shorter than the width could accept
                // more words, but keeping it as its own line keeps the
                // wrap idempotent.
                continue;
            }

            if current.is_empty() {
                current.push_str(word);
            } else if current.chars().count() + 1 + word_len <= width {
                current.push(' ');
                current.push_str(word);
            } else {
                wrapped.push(std::mem::take(&mut current));
                current.push_str(word);
            }
        }

        if !current.is_empty() {
            wrapped.push(current);
        }
    }

    wrapped
}

/// Renders wrapped text into a paginated PDF byte stream.
pub struct PdfRenderer {
    layout: PageLayout,
}

impl PdfRenderer {
    pub fn new(layout: PageLayout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &PageLayout {
        &self.layout
    }

    /// Lay out `content` top-to-bottom, starting a new page whenever the
    /// cursor reaches the bottom margin. Same input and layout always
    /// produce the same wrap and pagination decisions.
    pub fn render(&self, content: &str) -> Result<Vec<u8>> {
        let lines = wrap_text(content, self.layout.wrap_width);

        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let mut page_ids: Vec<Object> = Vec::new();
        let mut operations: Vec<Operation> = Vec::new();
        let mut y = self.layout.margin_top;

        for line in &lines {
            if y <= self.layout.margin_bottom {
                let page_id =
                    self.flush_page(&mut doc, pages_id, resources_id, &mut operations)?;
                page_ids.push(page_id.into());
                y = self.layout.margin_top;
            }

            operations.push(Operation::new("BT", vec![]));
            operations.push(Operation::new(
                "Tf",
                vec!["F1".into(), self.layout.font_size.into()],
            ));
            operations.push(Operation::new(
                "Td",
                vec![self.layout.margin_x.into(), y.into()],
            ));
            operations.push(Operation::new(
                "Tj",
                vec![Object::string_literal(line.as_str())],
            ));
            operations.push(Operation::new("ET", vec![]));

            y -= self.layout.line_height;
        }

        // Empty input still yields one blank page so the output is a
        // well-formed document.
        let page_id = self.flush_page(&mut doc, pages_id, resources_id, &mut operations)?;
        page_ids.push(page_id.into());

        let page_count = page_ids.len();
        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => page_ids,
            "Count" => page_count as i64,
        };
        doc.objects.insert(pages_id, Object::Dictionary(pages));

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes)
            .map_err(|e| PipelineError::Render(format!("cannot serialize pdf: {}", e)))?;

        debug!(
            "Rendered {} wrapped lines across {} page(s), {} bytes",
            lines.len(),
            page_count,
            bytes.len()
        );

        Ok(bytes)
    }

    fn flush_page(
        &self,
        doc: &mut Document,
        pages_id: lopdf::ObjectId,
        resources_id: lopdf::ObjectId,
        operations: &mut Vec<Operation>,
    ) -> Result<lopdf::ObjectId> {
        let content = Content {
            operations: std::mem::take(operations),
        };
        let encoded = content
            .encode()
            .map_err(|e| PipelineError::Render(format!("cannot encode content: {}", e)))?;
        let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));

        Ok(doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
            "MediaBox" => vec![
                0.into(),
                0.into(),
                self.layout.page_width.into(),
                self.layout.page_height.into(),
            ],
        }))
    }
}
