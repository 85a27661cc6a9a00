// Top-down text layout on A4 pages, written out as a minimal PDF.
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};

use crate::services::render::RenderError;

pub const PAGE_WIDTH: i64 = 595;
pub const PAGE_HEIGHT: i64 = 842;
pub const LEFT_MARGIN: i64 = 56;
pub const AMOUNT_COLUMN: i64 = 440;
const COLUMN_GUTTER: i64 = 12;

const TOP: i64 = 790;
const BOTTOM: i64 = 64;
const FOOTER_Y: i64 = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Font {
    Regular,
    Bold,
}

impl Font {
    fn resource_name(self) -> &'static [u8] {
        match self {
            Font::Regular => b"F1",
            Font::Bold => b"F2",
        }
    }
}

/// Keeps base-14 fonts happy: printable ASCII passes through, anything else
/// becomes `?` (control characters become spaces).
pub fn sanitize(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            ' '..='~' => c as u8,
            c if c.is_control() => b' ',
            _ => b'?',
        })
        .collect()
}

/// Rough Helvetica advance: half the font size per glyph.
fn approximate_width(text: &str, size: i64) -> i64 {
    text.chars().count() as i64 * size / 2
}

/// Splits `text` into lines no wider than `max_width` points at `size`. Breaks
/// on whitespace; a single word longer than a line is cut.
pub fn wrap(text: &str, size: i64, max_width: i64) -> Vec<String> {
    let max_chars = (max_width * 2 / size.max(1)).max(1) as usize;
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();
        while word.len() > max_chars {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            let rest = word.split_off(max_chars);
            lines.push(word.into_iter().collect());
            word = rest;
        }

        let needed = if current.is_empty() { word.len() } else { current.chars().count() + 1 + word.len() };
        if needed > max_chars {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.extend(word);
    }

    if !current.is_empty() || lines.is_empty() {
        lines.push(current);
    }
    lines
}

pub struct PageLayout {
    pages: Vec<Vec<Operation>>,
    cursor: i64,
}

impl PageLayout {
    pub fn new() -> Self {
        Self {
            pages: vec![Vec::new()],
            cursor: TOP,
        }
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Moves down one line of `size`, starting a new page when the bottom margin
    /// would be crossed. Returns the baseline.
    fn advance(&mut self, size: i64) -> i64 {
        let height = size + size / 2;
        if self.cursor - height < BOTTOM {
            self.pages.push(Vec::new());
            self.cursor = TOP;
        }
        self.cursor -= height;
        self.cursor
    }

    fn current_page(&mut self) -> &mut Vec<Operation> {
        let last = self.pages.len() - 1;
        &mut self.pages[last]
    }

    fn put(&mut self, font: Font, size: i64, x: i64, y: i64, text: &str) {
        let page = self.current_page();
        page.push(Operation::new("BT", vec![]));
        page.push(Operation::new(
            "Tf",
            vec![Object::Name(font.resource_name().to_vec()), Object::Integer(size)],
        ));
        page.push(Operation::new("Td", vec![Object::Integer(x), Object::Integer(y)]));
        page.push(Operation::new("Tj", vec![Object::string_literal(sanitize(text))]));
        page.push(Operation::new("ET", vec![]));
    }

    pub fn line(&mut self, font: Font, size: i64, text: &str) {
        for row in wrap(text, size, PAGE_WIDTH - 2 * LEFT_MARGIN) {
            let y = self.advance(size);
            self.put(font, size, LEFT_MARGIN, y, &row);
        }
    }

    pub fn centered(&mut self, font: Font, size: i64, text: &str) {
        let y = self.advance(size);
        let x = ((PAGE_WIDTH - approximate_width(text, size)) / 2).max(LEFT_MARGIN);
        self.put(font, size, x, y, text);
    }

    /// Label on the left, value in the amount column, same baseline. Either side
    /// wraps within its column.
    pub fn columns(&mut self, font: Font, size: i64, label: &str, value: &str) {
        let labels = wrap(label, size, AMOUNT_COLUMN - LEFT_MARGIN - COLUMN_GUTTER);
        let values = wrap(value, size, PAGE_WIDTH - LEFT_MARGIN - AMOUNT_COLUMN);
        for row in 0..labels.len().max(values.len()) {
            let y = self.advance(size);
            if let Some(text) = labels.get(row) {
                self.put(font, size, LEFT_MARGIN, y, text);
            }
            if let Some(text) = values.get(row) {
                self.put(font, size, AMOUNT_COLUMN, y, text);
            }
        }
    }

    pub fn gap(&mut self, points: i64) {
        if self.cursor - points < BOTTOM {
            self.pages.push(Vec::new());
            self.cursor = TOP;
        } else {
            self.cursor -= points;
        }
    }

    pub fn rule(&mut self) {
        self.gap(6);
        let y = self.cursor;
        let page = self.current_page();
        page.push(Operation::new("w", vec![Object::Integer(1)]));
        page.push(Operation::new("m", vec![Object::Integer(LEFT_MARGIN), Object::Integer(y)]));
        page.push(Operation::new(
            "l",
            vec![Object::Integer(PAGE_WIDTH - LEFT_MARGIN), Object::Integer(y)],
        ));
        page.push(Operation::new("S", vec![]));
        self.gap(6);
    }

    /// Serializes every page with a "Page i of n" footer. No document id or
    /// creation date is written, so equal layouts give equal bytes.
    pub fn finish(mut self) -> Result<Vec<u8>, RenderError> {
        let total = self.pages.len();
        for index in 0..total {
            let footer = format!("Page {} of {}", index + 1, total);
            let x = PAGE_WIDTH - LEFT_MARGIN - approximate_width(&footer, 9);
            let page = &mut self.pages[index];
            page.push(Operation::new("BT", vec![]));
            page.push(Operation::new("Tf", vec![Object::Name(b"F1".to_vec()), Object::Integer(9)]));
            page.push(Operation::new("Td", vec![Object::Integer(x), Object::Integer(FOOTER_Y)]));
            page.push(Operation::new("Tj", vec![Object::string_literal(footer)]));
            page.push(Operation::new("ET", vec![]));
        }

        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let regular_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
            "Encoding" => "WinAnsiEncoding",
        });
        let bold_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica-Bold",
            "Encoding" => "WinAnsiEncoding",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! {
                "F1" => regular_id,
                "F2" => bold_id,
            },
        });

        let mut kids = Vec::with_capacity(total);
        for operations in self.pages {
            let content = Content { operations }
                .encode()
                .map_err(|e| RenderError::Encoding(e.to_string()))?;
            let content_id = doc.add_object(Stream::new(dictionary! {}, content));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(Object::Reference(page_id));
        }

        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => Object::Array(kids),
            "Count" => Object::Integer(total as i64),
            "Resources" => resources_id,
            "MediaBox" => Object::Array(vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(PAGE_WIDTH),
                Object::Integer(PAGE_HEIGHT),
            ]),
        };
        doc.objects.insert(pages_id, Object::Dictionary(pages));

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes)?;
        Ok(bytes)
    }
}

impl Default for PageLayout {
    fn default() -> Self {
        Self::new()
    }
}
