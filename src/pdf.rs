//! PDF text extraction via a glyph-recording interpreter device.
//!
//! PDF text has no reliable Unicode mapping; `Glyph::as_unicode()` is
//! best-effort, and many documents omit explicit space characters,
//! encoding word gaps as glyph advances instead. Whitespace is therefore
//! inferred from glyph geometry.

use std::sync::Arc;

use hayro_interpret::font::Glyph;
use hayro_interpret::hayro_syntax::Pdf;
use hayro_interpret::util::PageExt;
use hayro_interpret::{
    interpret_page, BlendMode, ClipPath, Context, Device, GlyphDrawMode, Image,
    InterpreterSettings, Paint, PathDrawMode, SoftMask,
};
use kurbo::{Affine, Rect, Shape};

use crate::error::{FlowChatError, Result};

// Glyphs overlapping vertically by at least this ratio (of the smaller
// bbox height) count as the same line.
const SAME_LINE_OVERLAP_RATIO: f64 = 0.5;
// Horizontal gap above this ratio of the average bbox height implies a
// word break; height stands in for font size.
const GAP_TO_HEIGHT_RATIO: f64 = 0.25;

/// Extracts the text of every page; non-empty pages are joined with `\n`.
pub fn extract_text(data: &[u8]) -> Result<String> {
    let pdf = Pdf::new(Arc::new(data.to_vec()))
        .map_err(|e| FlowChatError::UnsupportedFormat(format!("PDF parse failed: {e:?}")))?;
    let settings = InterpreterSettings::default();

    let mut pages = Vec::new();
    for page in pdf.pages().iter() {
        let (width, height) = page.render_dimensions();
        let bbox = Rect::new(0.0, 0.0, width as f64, height as f64);
        let mut ctx = Context::new(
            page.initial_transform(true),
            bbox,
            page.xref(),
            settings.clone(),
        );
        let mut device = PageTextDevice::default();
        interpret_page(page, &mut ctx, &mut device);

        let text = device.into_text();
        if !text.trim().is_empty() {
            pages.push(text);
        }
    }
    Ok(pages.join("\n"))
}

#[derive(Debug, Clone)]
struct GlyphEvent {
    ch: Option<char>,
    bbox: Option<Rect>,
}

/// Records glyph events while a page is interpreted; paths, images, and
/// clipping are ignored.
#[derive(Debug, Default)]
struct PageTextDevice {
    glyphs: Vec<GlyphEvent>,
}

impl PageTextDevice {
    fn into_text(self) -> String {
        let mut out = String::new();
        let mut last_bbox: Option<Rect> = None;
        let mut last_was_whitespace = false;

        for glyph in &self.glyphs {
            if let (Some(prev), Some(cur)) = (last_bbox, glyph.bbox) {
                if on_same_line(prev, cur) {
                    let gap = cur.x0 - prev.x1;
                    // Negative/zero gaps happen with kerning or overlap.
                    if gap > 0.0 {
                        let avg_height = 0.5 * (prev.height() + cur.height());
                        if gap > GAP_TO_HEIGHT_RATIO * avg_height
                            && !out.is_empty()
                            && !last_was_whitespace
                        {
                            out.push(' ');
                            last_was_whitespace = true;
                        }
                    }
                } else if !out.is_empty() && !last_was_whitespace {
                    out.push('\n');
                    last_was_whitespace = true;
                }
            }

            if let Some(ch) = glyph.ch {
                out.push(ch);
                last_was_whitespace = ch == ' ' || ch == '\n';
            }

            if glyph.bbox.is_some() {
                last_bbox = glyph.bbox;
            }
        }

        out
    }
}

fn on_same_line(a: Rect, b: Rect) -> bool {
    let overlap = a.y1.min(b.y1) - a.y0.max(b.y0);
    if overlap <= 0.0 {
        return false;
    }
    let denom = a.height().min(b.height());
    // Degenerate bboxes fall back to "not same line".
    if denom <= 0.0 {
        return false;
    }
    (overlap / denom) >= SAME_LINE_OVERLAP_RATIO
}

impl<'a> Device<'a> for PageTextDevice {
    fn set_soft_mask(&mut self, _mask: Option<SoftMask<'a>>) {}

    fn set_blend_mode(&mut self, _blend_mode: BlendMode) {}

    fn draw_path(
        &mut self,
        _path: &kurbo::BezPath,
        _transform: Affine,
        _paint: &Paint<'a>,
        _draw_mode: &PathDrawMode,
    ) {
    }

    fn push_clip_path(&mut self, _clip_path: &ClipPath) {}

    fn push_transparency_group(
        &mut self,
        _opacity: f32,
        _mask: Option<SoftMask<'a>>,
        _blend_mode: BlendMode,
    ) {
    }

    fn draw_glyph(
        &mut self,
        glyph: &Glyph<'a>,
        transform: Affine,
        glyph_transform: Affine,
        _paint: &Paint<'a>,
        _draw_mode: &GlyphDrawMode,
    ) {
        // Outline glyphs get a page-space bbox so rotations and shears
        // survive; Type3 bboxes would require interpreting the glyph
        // program, so they contribute text without geometry.
        let bbox = match glyph {
            Glyph::Outline(outline) => {
                let path_in_page = transform * (glyph_transform * outline.outline());
                Some(path_in_page.bounding_box())
            }
            Glyph::Type3(_) => None,
        };

        self.glyphs.push(GlyphEvent {
            ch: glyph.as_unicode(),
            bbox,
        });
    }

    fn draw_image(&mut self, _image: Image<'a, '_>, _transform: Affine) {}

    fn pop_clip_path(&mut self) {}

    fn pop_transparency_group(&mut self) {}
}
