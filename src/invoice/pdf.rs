//! PDF rendering of page layouts with the built-in Helvetica faces.

use printpdf::{BuiltinFont, IndirectFontRef, Line, Mm, PdfDocument, Point};
use thiserror::Error;

use super::{Align, Element, PageLayout, Weight};
use crate::api::AppError;

const PT_TO_MM: f32 = 0.3528;
/// Average Helvetica glyph width as a fraction of the font size
const AVG_GLYPH_WIDTH: f32 = 0.5;

#[derive(Debug, Error)]
pub enum PdfError {
    #[error("PDF rendering failed: {0}")]
    Render(#[from] printpdf::Error),
}

impl From<PdfError> for AppError {
    fn from(err: PdfError) -> Self {
        tracing::error!(error = %err, "PDF rendering failed");
        AppError::internal("Failed to generate PDF")
    }
}

fn approx_width(text: &str, size: f32) -> f32 {
    text.chars().count() as f32 * size * AVG_GLYPH_WIDTH * PT_TO_MM
}

fn anchor(text: &str, x: f32, size: f32, align: Align) -> f32 {
    match align {
        Align::Left => x,
        Align::Center => x - approx_width(text, size) / 2.0,
        Align::Right => x - approx_width(text, size),
    }
}

/// Render every page of `layout` into a PDF document
pub fn render_pdf(layout: &PageLayout) -> Result<Vec<u8>, PdfError> {
    let (doc, first_page, first_layer) =
        PdfDocument::new(&layout.title, Mm(layout.width), Mm(layout.height), "Layer 1");
    let regular = doc.add_builtin_font(BuiltinFont::Helvetica)?;
    let bold = doc.add_builtin_font(BuiltinFont::HelveticaBold)?;

    for (index, elements) in layout.pages.iter().enumerate() {
        let (page, layer) = if index == 0 {
            (first_page, first_layer)
        } else {
            doc.add_page(Mm(layout.width), Mm(layout.height), "Layer 1")
        };
        let layer = doc.get_page(page).get_layer(layer);

        for element in elements {
            match element {
                Element::Text {
                    text,
                    x,
                    y,
                    size,
                    weight,
                    align,
                } => {
                    let font: &IndirectFontRef = match weight {
                        Weight::Regular => &regular,
                        Weight::Bold => &bold,
                    };
                    let x = anchor(text, *x, *size, *align).max(0.0);
                    layer.use_text(text.clone(), *size, Mm(x), Mm(*y), font);
                }
                Element::Rule { x1, x2, y } => {
                    layer.add_line(Line {
                        points: vec![
                            (Point::new(Mm(*x1), Mm(*y)), false),
                            (Point::new(Mm(*x2), Mm(*y)), false),
                        ],
                        is_closed: false,
                    });
                }
            }
        }
    }

    Ok(doc.save_to_bytes()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anchor_alignment() {
        assert_eq!(anchor("abcd", 50.0, 10.0, Align::Left), 50.0);
        let width = approx_width("abcd", 10.0);
        assert!((anchor("abcd", 50.0, 10.0, Align::Right) - (50.0 - width)).abs() < 1e-4);
        assert!((anchor("abcd", 50.0, 10.0, Align::Center) - (50.0 - width / 2.0)).abs() < 1e-4);
    }

    #[test]
    fn test_render_produces_pdf_bytes() {
        let layout = PageLayout {
            title: "Test".to_string(),
            width: 76.2,
            height: 50.8,
            pages: vec![
                vec![
                    Element::Text {
                        text: "Bill: INV-00001".to_string(),
                        x: 2.5,
                        y: 40.0,
                        size: 6.0,
                        weight: Weight::Bold,
                        align: Align::Left,
                    },
                    Element::Rule {
                        x1: 2.5,
                        x2: 70.0,
                        y: 38.0,
                    },
                ],
                vec![],
            ],
        };

        let bytes = render_pdf(&layout).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }
}
