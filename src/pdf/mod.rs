//! # PDF Canvas
//!
//! A [`Canvas`] that writes a PDF file.
//!
//! This is a from-scratch PDF 1.7 writer. Drawing calls append operators to
//! the current page's content stream; [`Canvas::finish`] assigns object
//! numbers, compresses the streams and serializes everything.
//!
//! ## PDF Structure (simplified)
//!
//! ```text
//! %PDF-1.7            <- header
//! 1 0 obj ... endobj  <- catalog
//! 2 0 obj ... endobj  <- page tree
//! 3 0 obj ... endobj  <- fonts, images, content streams, pages
//! ...
//! xref                <- cross-reference table (byte offsets of each object)
//! trailer             <- points to the root object
//! %%EOF
//! ```
//!
//! ## Fonts
//!
//! Reports use the standard Helvetica and Helvetica-Bold faces as simple
//! Type1 references with WinAnsiEncoding. Nothing is embedded.

use std::fmt::Write as FmtWrite; // for write! on String
use std::io::Write as IoWrite; // for write! on Vec<u8>

use miniz_oxide::deflate::compress_to_vec_zlib;

use crate::canvas::{substitute_page_placeholders, Canvas, Rect, TextMeasure};
use crate::error::{CanvasError, FolioError};
use crate::font::StandardFont;
use crate::image_loader::{self, ImagePixelData, LoadedImage};
use crate::model::{ImageEntry, Metadata};
use crate::style::{Color, Paint, TextStyle};
use crate::text;

const FONTS: [StandardFont; 2] = [StandardFont::Helvetica, StandardFont::HelveticaBold];

struct PdfPage {
    width: f64,
    height: f64,
    content: String,
    /// Indices into `PdfCanvas::images` drawn on this page.
    images: Vec<usize>,
}

pub struct PdfCanvas {
    metadata: Metadata,
    pages: Vec<PdfPage>,
    images: Vec<LoadedImage>,
}

/// Tracks allocated PDF objects during writing.
struct PdfBuilder {
    objects: Vec<PdfObject>,
}

struct PdfObject {
    data: Vec<u8>,
}

impl PdfBuilder {
    fn new() -> Self {
        // 0 = placeholder (PDF objects are 1-indexed), 1 = Catalog, 2 = Pages
        Self {
            objects: (0..3).map(|_| PdfObject { data: Vec::new() }).collect(),
        }
    }

    fn push(&mut self, data: Vec<u8>) -> usize {
        self.objects.push(PdfObject { data });
        self.objects.len() - 1
    }

    fn push_stream(&mut self, dict_entries: &str, payload: &[u8]) -> usize {
        let mut data: Vec<u8> = Vec::new();
        let _ = write!(
            data,
            "<< {} /Length {} >>\nstream\n",
            dict_entries,
            payload.len()
        );
        data.extend_from_slice(payload);
        data.extend_from_slice(b"\nendstream");
        self.push(data)
    }
}

impl PdfCanvas {
    pub fn new(metadata: Metadata) -> Self {
        Self {
            metadata,
            pages: Vec::new(),
            images: Vec::new(),
        }
    }

    fn current_page(&mut self) -> Option<&mut PdfPage> {
        let page = self.pages.last_mut();
        if page.is_none() {
            log::warn!("draw call before the first page was dropped");
        }
        page
    }

    /// Write a single image as one or two XObjects. Returns the main one.
    fn write_image_xobject(builder: &mut PdfBuilder, image: &LoadedImage) -> usize {
        let size = format!(
            "/Type /XObject /Subtype /Image /Width {} /Height {} /BitsPerComponent 8",
            image.width_px, image.height_px
        );
        match &image.pixel_data {
            ImagePixelData::Jpeg { data, color_space } => builder.push_stream(
                &format!("{size} /ColorSpace /{} /Filter /DCTDecode", color_space.pdf_name()),
                data,
            ),
            ImagePixelData::Decoded { rgb, alpha } => {
                let smask = alpha.as_ref().map(|alpha| {
                    builder.push_stream(
                        &format!("{size} /ColorSpace /DeviceGray /Filter /FlateDecode"),
                        &compress_to_vec_zlib(alpha, 6),
                    )
                });
                let smask_ref = smask
                    .map(|id| format!(" /SMask {id} 0 R"))
                    .unwrap_or_default();
                builder.push_stream(
                    &format!("{size} /ColorSpace /DeviceRGB /Filter /FlateDecode{smask_ref}"),
                    &compress_to_vec_zlib(rgb, 6),
                )
            }
        }
    }

    fn write_info(&self, builder: &mut PdfBuilder) -> Option<usize> {
        let m = &self.metadata;
        if m.title.is_none() && m.author.is_none() && m.subject.is_none() {
            return None;
        }
        let mut info = String::from("<< ");
        if let Some(ref title) = m.title {
            let _ = write!(info, "/Title ({}) ", encode_text(title));
        }
        if let Some(ref author) = m.author {
            let _ = write!(info, "/Author ({}) ", encode_text(author));
        }
        if let Some(ref subject) = m.subject {
            let _ = write!(info, "/Subject ({}) ", encode_text(subject));
        }
        info.push_str("/Producer (Folio) /Creator (Folio) >>");
        Some(builder.push(info.into_bytes()))
    }

    /// Serialize all objects into the final PDF byte stream.
    fn serialize(builder: &PdfBuilder, info_obj_id: Option<usize>) -> Vec<u8> {
        let mut output: Vec<u8> = Vec::new();
        let mut offsets: Vec<usize> = vec![0; builder.objects.len()];

        output.extend_from_slice(b"%PDF-1.7\n");
        output.extend_from_slice(b"%\xe2\xe3\xcf\xd3\n");

        for (i, obj) in builder.objects.iter().enumerate().skip(1) {
            offsets[i] = output.len();
            let _ = write!(output, "{i} 0 obj\n");
            output.extend_from_slice(&obj.data);
            output.extend_from_slice(b"\nendobj\n\n");
        }

        let xref_offset = output.len();
        let _ = write!(output, "xref\n0 {}\n", builder.objects.len());
        let _ = write!(output, "0000000000 65535 f \n");
        for offset in &offsets[1..] {
            let _ = write!(output, "{offset:010} 00000 n \n");
        }

        let _ = write!(output, "trailer\n<< /Size {} /Root 1 0 R", builder.objects.len());
        if let Some(info_id) = info_obj_id {
            let _ = write!(output, " /Info {info_id} 0 R");
        }
        let _ = write!(output, " >>\nstartxref\n{xref_offset}\n%%EOF\n");

        output
    }
}

impl TextMeasure for PdfCanvas {
    fn measure_text(&self, text: &str, max_width: f64, style: &TextStyle) -> Vec<String> {
        text::wrap_standard(text, max_width, style)
    }

    fn text_width(&self, text: &str, style: &TextStyle) -> f64 {
        text::standard_width(text, style)
    }
}

impl Canvas for PdfCanvas {
    type Output = Vec<u8>;

    fn new_page(&mut self, width: f64, height: f64) {
        self.pages.push(PdfPage {
            width,
            height,
            content: String::new(),
            images: Vec::new(),
        });
    }

    fn draw_rect(&mut self, rect: Rect, paint: Paint) {
        let Some(page) = self.current_page() else {
            return;
        };
        let y = page.height - rect.y - rect.height;
        let s = &mut page.content;
        match paint {
            Paint::Fill(c) => {
                if c.a <= 0.0 {
                    return;
                }
                let _ = write!(s, "q\n{} rg\n", rgb(c));
                let _ = write!(s, "{:.2} {:.2} {:.2} {:.2} re\nf\nQ\n", rect.x, y, rect.width, rect.height);
            }
            Paint::Stroke { color, width } => {
                if width <= 0.0 {
                    return;
                }
                let _ = write!(s, "q\n{} RG\n{:.2} w\n", rgb(color), width);
                let _ = write!(s, "{:.2} {:.2} {:.2} {:.2} re\nS\nQ\n", rect.x, y, rect.width, rect.height);
            }
        }
    }

    fn draw_text(&mut self, lines: &[String], x: f64, y: f64, style: &TextStyle) {
        if lines.is_empty() {
            return;
        }
        let font = StandardFont::for_weight(style.weight).resource_name();
        let Some(page) = self.current_page() else {
            return;
        };
        let page_height = page.height;
        let s = &mut page.content;

        let _ = write!(s, "BT\n/{} {:.1} Tf\n{} rg\n", font, style.size, rgb(style.color));
        for (i, line) in lines.iter().enumerate() {
            // Baseline roughly centered in the line box
            let line_top = y + i as f64 * style.line_height;
            let baseline = line_top + style.line_height / 2.0 + style.size * 0.35;
            let _ = write!(
                s,
                "1 0 0 1 {:.2} {:.2} Tm\n({}) Tj\n",
                x,
                page_height - baseline,
                encode_text(line)
            );
        }
        let _ = write!(s, "ET\n");
    }

    fn draw_image(&mut self, image: &ImageEntry, rect: Rect) -> Result<(), CanvasError> {
        let loaded = image_loader::load_image(&image.data)?;
        let index = self.images.len();
        let page = self
            .pages
            .last_mut()
            .ok_or_else(|| CanvasError::Output("image drawn before the first page".to_string()))?;
        let y = page.height - rect.y - rect.height;
        let _ = write!(
            page.content,
            "q\n{:.4} 0 0 {:.4} {:.2} {:.2} cm\n/Im{} Do\nQ\n",
            rect.width, rect.height, rect.x, y, index
        );
        page.images.push(index);
        self.images.push(loaded);
        Ok(())
    }

    fn finish(self) -> Result<Vec<u8>, FolioError> {
        if self.pages.is_empty() {
            return Err(CanvasError::Output("document has no pages".to_string()).into());
        }
        let mut builder = PdfBuilder::new();

        let font_resources: String = FONTS
            .iter()
            .map(|font| {
                let id = builder.push(
                    format!(
                        "<< /Type /Font /Subtype /Type1 /BaseFont /{} /Encoding /WinAnsiEncoding >>",
                        font.pdf_name()
                    )
                    .into_bytes(),
                );
                format!("/{} {} 0 R", font.resource_name(), id)
            })
            .collect::<Vec<_>>()
            .join(" ");

        let image_ids: Vec<usize> = self
            .images
            .iter()
            .map(|image| Self::write_image_xobject(&mut builder, image))
            .collect();

        let total = self.pages.len();
        let mut page_obj_ids = Vec::with_capacity(total);
        for (idx, page) in self.pages.iter().enumerate() {
            let content = substitute_page_placeholders(&page.content, idx + 1, total);
            let compressed = compress_to_vec_zlib(content.as_bytes(), 6);
            let content_obj_id = builder.push_stream("/Filter /FlateDecode", &compressed);

            let mut resources = format!("/Font << {font_resources} >>");
            if !page.images.is_empty() {
                let xobjects = page
                    .images
                    .iter()
                    .map(|&i| format!("/Im{} {} 0 R", i, image_ids[i]))
                    .collect::<Vec<_>>()
                    .join(" ");
                let _ = write!(resources, " /XObject << {xobjects} >>");
            }

            let page_dict = format!(
                "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {:.2} {:.2}] \
                 /Contents {} 0 R /Resources << {} >> >>",
                page.width, page.height, content_obj_id, resources
            );
            page_obj_ids.push(builder.push(page_dict.into_bytes()));
        }

        builder.objects[1].data = b"<< /Type /Catalog /Pages 2 0 R >>".to_vec();
        let kids = page_obj_ids
            .iter()
            .map(|id| format!("{id} 0 R"))
            .collect::<Vec<_>>()
            .join(" ");
        builder.objects[2].data =
            format!("<< /Type /Pages /Kids [{}] /Count {} >>", kids, page_obj_ids.len()).into_bytes();

        let info_obj_id = self.write_info(&mut builder);
        let bytes = Self::serialize(&builder, info_obj_id);
        log::debug!("wrote PDF: {} pages, {} images, {} bytes", total, self.images.len(), bytes.len());
        Ok(bytes)
    }
}

fn rgb(c: Color) -> String {
    format!("{:.3} {:.3} {:.3}", c.r, c.g, c.b)
}

/// Encode text for a literal PDF string in WinAnsiEncoding. Unmappable
/// characters become `?`.
fn encode_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        let b = unicode_to_winansi(ch).unwrap_or(b'?');
        match b {
            b'\\' => out.push_str("\\\\"),
            b'(' => out.push_str("\\("),
            b')' => out.push_str("\\)"),
            0x20..=0x7E => out.push(b as char),
            _ => {
                let _ = write!(out, "\\{b:03o}");
            }
        }
    }
    out
}

/// Map a Unicode codepoint to a WinAnsiEncoding byte value.
///
/// WinAnsiEncoding is based on Windows-1252. Most codepoints in
/// 0x20..=0x7E and 0xA0..=0xFF map directly. The 0x80..=0x9F range
/// contains special mappings for smart quotes, bullets, dashes, etc.
fn unicode_to_winansi(ch: char) -> Option<u8> {
    let cp = ch as u32;
    if (0x20..=0x7E).contains(&cp) || (0xA0..=0xFF).contains(&cp) {
        return Some(cp as u8);
    }
    match cp {
        0x20AC => Some(0x80), // Euro sign
        0x201A => Some(0x82), // Single low-9 quotation mark
        0x0192 => Some(0x83), // Latin small letter f with hook
        0x201E => Some(0x84), // Double low-9 quotation mark
        0x2026 => Some(0x85), // Horizontal ellipsis
        0x2020 => Some(0x86), // Dagger
        0x2021 => Some(0x87), // Double dagger
        0x02C6 => Some(0x88), // Modifier letter circumflex accent
        0x2030 => Some(0x89), // Per mille sign
        0x0160 => Some(0x8A), // Latin capital letter S with caron
        0x2039 => Some(0x8B), // Single left-pointing angle quotation
        0x0152 => Some(0x8C), // Latin capital ligature OE
        0x017D => Some(0x8E), // Latin capital letter Z with caron
        0x2018 => Some(0x91), // Left single quotation mark
        0x2019 => Some(0x92), // Right single quotation mark
        0x201C => Some(0x93), // Left double quotation mark
        0x201D => Some(0x94), // Right double quotation mark
        0x2022 => Some(0x95), // Bullet
        0x2013 => Some(0x96), // En dash
        0x2014 => Some(0x97), // Em dash
        0x02DC => Some(0x98), // Small tilde
        0x2122 => Some(0x99), // Trade mark sign
        0x0161 => Some(0x9A), // Latin small letter s with caron
        0x203A => Some(0x9B), // Single right-pointing angle quotation
        0x0153 => Some(0x9C), // Latin small ligature oe
        0x017E => Some(0x9E), // Latin small letter z with caron
        0x0178 => Some(0x9F), // Latin capital letter Y with diaeresis
        _ => None,
    }
}
