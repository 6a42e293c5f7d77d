//! Reading back what the browser produced.

use std::path::{Path, PathBuf};

use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, ObjectId};

use crate::errors::AppError;

/// Text reaching less far down page 1 than this leaves a visible gap.
pub const CONTENT_FILL_THRESHOLD: f64 = 0.9;

/// Counts the pages of the PDF at `path`.
pub fn count_pages(path: &Path) -> Result<u32, AppError> {
    Ok(load(path)?.get_pages().len() as u32)
}

/// `count_pages` on the blocking pool.
pub async fn count_pages_blocking(path: PathBuf) -> Result<u32, AppError> {
    tokio::task::spawn_blocking(move || count_pages(&path))
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("spawn_blocking failed counting pages: {e}")))?
}

/// How far down page 1 the text reaches, as a fraction of the page height
/// measured from the top edge.
///
/// The lowest text baseline stands in for the bottom of the content. `None`
/// when page 1 shows no text at all.
pub fn content_fill(path: &Path) -> Result<Option<f64>, AppError> {
    let doc = load(path)?;
    let page_id = *doc
        .get_pages()
        .get(&1)
        .ok_or_else(|| AppError::Pdf(format!("{} has no pages", path.display())))?;

    let (bottom, top) = media_box_y(&doc, page_id);
    let height = top - bottom;
    if height <= 0.0 {
        return Err(AppError::Pdf(format!("{} has an empty MediaBox", path.display())));
    }

    let bytes = doc
        .get_page_content(page_id)
        .map_err(|e| AppError::Pdf(format!("failed to read page content of {}: {e}", path.display())))?;
    if bytes.is_empty() {
        return Ok(None);
    }
    let content = Content::decode(&bytes)
        .map_err(|e| AppError::Pdf(format!("failed to decode page content of {}: {e}", path.display())))?;

    Ok(lowest_text_y(&content.operations)
        .map(|y| f64::from(((top - y) / height).clamp(0.0, 1.0))))
}

/// `content_fill` on the blocking pool.
pub async fn content_fill_blocking(path: PathBuf) -> Result<Option<f64>, AppError> {
    tokio::task::spawn_blocking(move || content_fill(&path))
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("spawn_blocking failed measuring content: {e}")))?
}

fn load(path: &Path) -> Result<Document, AppError> {
    Document::load(path).map_err(|e| AppError::Pdf(format!("failed to load {}: {e}", path.display())))
}

/// Vertical extent of the page's MediaBox, inherited from parents if needed.
/// Falls back to US letter.
fn media_box_y(doc: &Document, mut id: ObjectId) -> (f32, f32) {
    while let Ok(dict) = doc.get_object(id).and_then(Object::as_dict) {
        if let Ok(arr) = dict.get(b"MediaBox").and_then(Object::as_array) {
            if let (Some(y0), Some(y1)) = (arr.get(1).and_then(number), arr.get(3).and_then(number)) {
                return (y0.min(y1), y0.max(y1));
            }
        }
        match dict.get(b"Parent").and_then(Object::as_reference) {
            Ok(parent) => id = parent,
            Err(_) => break,
        }
    }
    (0.0, 792.0)
}

// ────────────────────────────────────────────────────────────────────────────
// Text position tracking
// ────────────────────────────────────────────────────────────────────────────

/// Affine transform `[a b c d e f]` in PDF row-vector order.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Matrix {
    a: f32,
    b: f32,
    c: f32,
    d: f32,
    e: f32,
    f: f32,
}

impl Matrix {
    const IDENTITY: Self = Self {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        e: 0.0,
        f: 0.0,
    };

    fn translation(tx: f32, ty: f32) -> Self {
        Self {
            e: tx,
            f: ty,
            ..Self::IDENTITY
        }
    }

    /// `self` applied first, then `rhs`.
    fn concat(self, rhs: Self) -> Self {
        Self {
            a: self.a * rhs.a + self.b * rhs.c,
            b: self.a * rhs.b + self.b * rhs.d,
            c: self.c * rhs.a + self.d * rhs.c,
            d: self.c * rhs.b + self.d * rhs.d,
            e: self.e * rhs.a + self.f * rhs.c + rhs.e,
            f: self.e * rhs.b + self.f * rhs.d + rhs.f,
        }
    }

    /// Device-space y of this matrix's origin.
    fn origin_y(self) -> f32 {
        self.f
    }
}

/// Lowest device-space y at which any text-showing operator starts.
///
/// Tracks the CTM (`q`/`Q`/`cm`) and the text matrices (`BT`, `Tm`, `Td`,
/// `TD`, `TL`, `T*`). Glyph advances are horizontal and ignored. Text inside
/// form XObjects is not followed.
fn lowest_text_y(operations: &[Operation]) -> Option<f32> {
    let mut ctm = Matrix::IDENTITY;
    let mut saved: Vec<Matrix> = Vec::new();
    let mut text_matrix = Matrix::IDENTITY;
    let mut line_matrix = Matrix::IDENTITY;
    let mut leading = 0.0_f32;
    let mut lowest: Option<f32> = None;

    for op in operations {
        match op.operator.as_str() {
            "q" => saved.push(ctm),
            "Q" => {
                if let Some(prev) = saved.pop() {
                    ctm = prev;
                }
            }
            "cm" => {
                if let Some(m) = operand_matrix(op) {
                    ctm = m.concat(ctm);
                }
            }
            "BT" => {
                text_matrix = Matrix::IDENTITY;
                line_matrix = Matrix::IDENTITY;
            }
            "Tm" => {
                if let Some(m) = operand_matrix(op) {
                    text_matrix = m;
                    line_matrix = m;
                }
            }
            "TL" => {
                if let Some(tl) = operand(op, 0) {
                    leading = tl;
                }
            }
            "Td" | "TD" => {
                if let (Some(tx), Some(ty)) = (operand(op, 0), operand(op, 1)) {
                    if op.operator == "TD" {
                        leading = -ty;
                    }
                    line_matrix = Matrix::translation(tx, ty).concat(line_matrix);
                    text_matrix = line_matrix;
                }
            }
            "T*" | "'" | "\"" => {
                line_matrix = Matrix::translation(0.0, -leading).concat(line_matrix);
                text_matrix = line_matrix;
            }
            _ => {}
        }

        if matches!(op.operator.as_str(), "Tj" | "TJ" | "'" | "\"") {
            let y = text_matrix.concat(ctm).origin_y();
            lowest = Some(lowest.map_or(y, |low| low.min(y)));
        }
    }
    lowest
}

fn operand(op: &Operation, index: usize) -> Option<f32> {
    op.operands.get(index).and_then(number)
}

fn operand_matrix(op: &Operation) -> Option<Matrix> {
    Some(Matrix {
        a: operand(op, 0)?,
        b: operand(op, 1)?,
        c: operand(op, 2)?,
        d: operand(op, 3)?,
        e: operand(op, 4)?,
        f: operand(op, 5)?,
    })
}

fn number(obj: &Object) -> Option<f32> {
    obj.as_float()
        .ok()
        .or_else(|| obj.as_i64().ok().map(|v| v as f32))
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::path::Path;

    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Document, Object, Stream};

    /// Writes a blank PDF with `pages` US-letter pages.
    pub fn write_blank_pdf(path: &Path, pages: u32) {
        write_pdf(path, pages, None);
    }

    /// Writes a one-page US-letter PDF whose page content is `operations`.
    pub fn write_content_pdf(path: &Path, operations: Vec<Operation>) {
        write_pdf(path, 1, Some(operations));
    }

    /// `BT /F1 11 Tf <x> <y> Td (text) Tj ET`
    pub fn text_at(x: i64, y: i64, text: &str) -> Vec<Operation> {
        vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec![Object::Name(b"F1".to_vec()), Object::Integer(11)]),
            Operation::new("Td", vec![Object::Integer(x), Object::Integer(y)]),
            Operation::new("Tj", vec![Object::string_literal(text)]),
            Operation::new("ET", vec![]),
        ]
    }

    fn write_pdf(path: &Path, pages: u32, operations: Option<Vec<Operation>>) {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let contents_id = operations.map(|operations| {
            let bytes = Content { operations }.encode().unwrap();
            doc.add_object(Stream::new(dictionary! {}, bytes))
        });
        let kids: Vec<Object> = (0..pages)
            .map(|_| {
                let mut page = dictionary! {
                    "Type" => "Page",
                    "Parent" => pages_id,
                    "MediaBox" => vec![
                        Object::Integer(0),
                        Object::Integer(0),
                        Object::Integer(612),
                        Object::Integer(792),
                    ],
                };
                if let Some(id) = contents_id {
                    page.set("Contents", id);
                }
                Object::Reference(doc.add_object(page))
            })
            .collect();
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => pages as i64,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        doc.save(path).unwrap();
    }
}
