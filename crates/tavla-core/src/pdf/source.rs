//! lopdf-backed page source.

use image::{imageops::FilterType, DynamicImage, ImageBuffer, Rgba, RgbaImage};
use lopdf::content::Content;
use lopdf::{Document, Object, ObjectId};
use tracing::{debug, trace, warn};

use super::{PageSource, TextRun};
use crate::error::PdfError;

/// Estimated glyph advance as a fraction of the font size.
///
/// Without per-font width tables this is the usual average for mixed
/// Hebrew/Latin text; widths only feed column-gap heuristics, so a
/// rough estimate is enough.
const AVG_GLYPH_ADVANCE: f32 = 0.5;

/// Page source backed by lopdf with a pdf-extract text probe.
pub struct LopdfSource {
    document: Document,
    raw_data: Vec<u8>,
}

impl LopdfSource {
    /// Load a PDF from memory.
    pub fn load(data: &[u8]) -> Result<Self, PdfError> {
        let mut doc = Document::load_mem(data).map_err(|e| PdfError::Parse(e.to_string()))?;

        let raw_data = if doc.is_encrypted() {
            if doc.decrypt("").is_err() {
                return Err(PdfError::Encrypted);
            }
            debug!("decrypted PDF with empty password");
            let mut decrypted = Vec::new();
            doc.save_to(&mut decrypted)
                .map_err(|e| PdfError::Parse(format!("failed to save decrypted PDF: {}", e)))?;
            decrypted
        } else {
            data.to_vec()
        };

        if doc.get_pages().is_empty() {
            return Err(PdfError::NoPages);
        }

        debug!("loaded PDF with {} pages", doc.get_pages().len());
        Ok(Self {
            document: doc,
            raw_data,
        })
    }

    /// Load a PDF from a file path.
    pub fn open(path: &std::path::Path) -> Result<Self, PdfError> {
        let data = std::fs::read(path).map_err(|e| PdfError::Parse(e.to_string()))?;
        Self::load(&data)
    }

    /// Whole-document plain text via pdf-extract.
    ///
    /// Covers encodings the positioned walker cannot map (CID-keyed
    /// fonts); surfaced as a CLI diagnostic, not part of extraction.
    pub fn full_text(&self) -> Result<String, PdfError> {
        pdf_extract::extract_text_from_mem(&self.raw_data)
            .map_err(|e| PdfError::TextExtraction(e.to_string()))
    }

    fn page_id(&self, page: u32) -> Result<ObjectId, PdfError> {
        self.document
            .get_pages()
            .get(&page)
            .copied()
            .ok_or(PdfError::InvalidPage(page))
    }

    /// Walk a page's content streams and collect positioned text runs.
    fn walk_text_operations(&self, page_id: ObjectId) -> Result<Vec<TextRun>, PdfError> {
        let content_data = self
            .document
            .get_page_content(page_id)
            .map_err(|e| PdfError::TextExtraction(e.to_string()))?;
        let content = Content::decode(&content_data)
            .map_err(|e| PdfError::TextExtraction(e.to_string()))?;

        Ok(collect_runs(&content))
    }

    /// First embedded image on a page, checking XObjects then the
    /// whole document.
    fn page_image(&self, page: u32) -> Result<DynamicImage, PdfError> {
        let page_id = self.page_id(page)?;

        if let Some(resources) = self.page_resources(page_id) {
            if let Ok(xobjects) = resources.get(b"XObject") {
                if let Ok((_, Object::Dictionary(xobj_dict))) =
                    self.document.dereference(xobjects)
                {
                    for (_name, obj_ref) in xobj_dict.iter() {
                        if let Ok((_, obj)) = self.document.dereference(obj_ref) {
                            if let Some(img) = self.image_from_object(obj) {
                                return Ok(img);
                            }
                        }
                    }
                }
            }
        }

        debug!("no XObject image on page {}, scanning all objects", page);
        let page_idx = (page - 1) as usize;
        let mut found = Vec::new();
        for (_id, object) in self.document.objects.iter() {
            if let Some(img) = self.image_from_object(object) {
                found.push(img);
            }
        }
        if page_idx < found.len() {
            return Ok(found.swap_remove(page_idx));
        }
        if let Some(first) = found.into_iter().next() {
            return Ok(first);
        }

        Err(PdfError::Render(format!(
            "no renderable image for page {}",
            page
        )))
    }
}

/// Fold a page's content operations into positioned text runs.
///
/// Simplified text-state tracking: translation components only.
/// Financial reports position with Tm/Td, which this covers. The `Tf`
/// size is kept separately so each `Tm` scales from it rather than
/// from the previous matrix.
fn collect_runs(content: &Content) -> Vec<TextRun> {
    let mut runs = Vec::new();

    let mut tf_size = 12.0f32;
    let mut font_size = 12.0f32;
    let mut leading = 0.0f32;
    let mut line_x = 0.0f32;
    let mut line_y = 0.0f32;
    let mut cur_x = 0.0f32;

    for op in &content.operations {
        match op.operator.as_str() {
            "BT" => {
                // Text matrix resets to identity at BT.
                font_size = tf_size;
                line_x = 0.0;
                line_y = 0.0;
                cur_x = 0.0;
            }
            "Tf" => {
                if let Some(size) = op.operands.get(1).and_then(as_f32) {
                    tf_size = size;
                    font_size = size;
                }
            }
            "TL" => {
                if let Some(l) = op.operands.first().and_then(as_f32) {
                    leading = l;
                }
            }
            "Tm" => {
                if op.operands.len() == 6 {
                    let e = as_f32(&op.operands[4]).unwrap_or(0.0);
                    let f = as_f32(&op.operands[5]).unwrap_or(0.0);
                    // Vertical scale folds into the effective font size.
                    font_size = match as_f32(&op.operands[3]) {
                        Some(d) if d.abs() > f32::EPSILON => tf_size * d.abs(),
                        _ => tf_size,
                    };
                    line_x = e;
                    line_y = f;
                    cur_x = e;
                }
            }
            "Td" => {
                if op.operands.len() == 2 {
                    line_x += as_f32(&op.operands[0]).unwrap_or(0.0);
                    line_y += as_f32(&op.operands[1]).unwrap_or(0.0);
                    cur_x = line_x;
                }
            }
            "TD" => {
                if op.operands.len() == 2 {
                    let tx = as_f32(&op.operands[0]).unwrap_or(0.0);
                    let ty = as_f32(&op.operands[1]).unwrap_or(0.0);
                    leading = -ty;
                    line_x += tx;
                    line_y += ty;
                    cur_x = line_x;
                }
            }
            "T*" => {
                line_y -= leading;
                cur_x = line_x;
            }
            "Tj" => {
                if let Some(text) = op.operands.first().and_then(decode_string) {
                    push_run(&mut runs, &text, &mut cur_x, line_y, font_size);
                }
            }
            "'" => {
                line_y -= leading;
                cur_x = line_x;
                if let Some(text) = op.operands.first().and_then(decode_string) {
                    push_run(&mut runs, &text, &mut cur_x, line_y, font_size);
                }
            }
            "\"" => {
                line_y -= leading;
                cur_x = line_x;
                if let Some(text) = op.operands.get(2).and_then(decode_string) {
                    push_run(&mut runs, &text, &mut cur_x, line_y, font_size);
                }
            }
            "TJ" => {
                if let Some(Object::Array(parts)) = op.operands.first() {
                    let mut text = String::new();
                    for part in parts {
                        match part {
                            Object::String(..) => {
                                if let Some(s) = decode_string(part) {
                                    text.push_str(&s);
                                }
                            }
                            // Large negative adjustments are inter-word
                            // gaps the font would otherwise swallow.
                            _ => {
                                if let Some(adj) = as_f32(part) {
                                    if adj < -100.0 {
                                        text.push(' ');
                                    }
                                }
                            }
                        }
                    }
                    push_run(&mut runs, &text, &mut cur_x, line_y, font_size);
                }
            }
            _ => {}
        }
    }

    runs
}

impl LopdfSource {
    fn image_from_object(&self, obj: &Object) -> Option<DynamicImage> {
        let Object::Stream(stream) = obj else {
            return None;
        };
        let dict = &stream.dict;

        let subtype = dict.get(b"Subtype").ok()?;
        if subtype.as_name().ok()? != b"Image" {
            return None;
        }

        let width = dict.get(b"Width").ok()?.as_i64().ok()? as u32;
        let height = dict.get(b"Height").ok()?.as_i64().ok()? as u32;
        trace!("found image object: {}x{}", width, height);

        let data = match stream.decompressed_content() {
            Ok(d) => d,
            Err(_) => stream.content.clone(),
        };

        if let Ok(filter) = dict.get(b"Filter") {
            let filter_name = match filter {
                Object::Name(name) => Some(name.as_slice()),
                Object::Array(arr) if !arr.is_empty() => {
                    arr.first().and_then(|o| o.as_name().ok())
                }
                _ => None,
            };

            match filter_name {
                Some(b"DCTDecode") => {
                    return image::load_from_memory_with_format(
                        &stream.content,
                        image::ImageFormat::Jpeg,
                    )
                    .ok();
                }
                Some(b"JPXDecode") | Some(b"CCITTFaxDecode") | Some(b"JBIG2Decode") => {
                    trace!("unsupported image filter, skipping");
                    return None;
                }
                _ => {}
            }
        }

        let color_space = dict
            .get(b"ColorSpace")
            .ok()
            .and_then(|o| match o {
                Object::Name(name) => Some(name.as_slice()),
                Object::Array(arr) => arr.first().and_then(|o| o.as_name().ok()),
                Object::Reference(r) => self
                    .document
                    .get_object(*r)
                    .ok()
                    .and_then(|o| o.as_name().ok()),
                _ => None,
            })
            .unwrap_or(b"DeviceRGB");

        let bits = dict
            .get(b"BitsPerComponent")
            .ok()
            .and_then(|o| o.as_i64().ok())
            .unwrap_or(8) as u8;

        raw_image(&data, width, height, color_space, bits)
    }

    fn page_resources(&self, page_id: ObjectId) -> Option<lopdf::Dictionary> {
        let mut node_id = page_id;
        loop {
            let Ok(Object::Dictionary(dict)) = self.document.get_object(node_id) else {
                return None;
            };
            if let Ok(resources) = dict.get(b"Resources") {
                if let Ok((_, Object::Dictionary(res_dict))) = self.document.dereference(resources)
                {
                    return Some(res_dict.clone());
                }
            }
            match dict.get(b"Parent") {
                Ok(Object::Reference(parent_id)) => node_id = *parent_id,
                _ => return None,
            }
        }
    }
}

impl PageSource for LopdfSource {
    fn page_count(&self) -> u32 {
        self.document.get_pages().len() as u32
    }

    fn text_runs(&self, page: u32) -> Result<Vec<TextRun>, PdfError> {
        let page_id = self.page_id(page)?;
        let runs = self.walk_text_operations(page_id)?;
        debug!("page {}: {} text runs", page, runs.len());
        Ok(runs)
    }

    fn render(&self, page: u32, scale: f32) -> Result<RgbaImage, PdfError> {
        let image = self.page_image(page)?;
        let image = if (scale - 1.0).abs() > f32::EPSILON {
            let w = ((image.width() as f32 * scale) as u32).max(1);
            let h = ((image.height() as f32 * scale) as u32).max(1);
            image.resize_exact(w, h, FilterType::Triangle)
        } else {
            image
        };
        Ok(image.to_rgba8())
    }
}

fn as_f32(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}

/// Decode a PDF string object to text.
///
/// UTF-16BE strings carry a BOM; everything else is treated as a
/// byte-per-char encoding. CID-keyed fonts need the pdf-extract probe.
fn decode_string(obj: &Object) -> Option<String> {
    let Object::String(bytes, _) = obj else {
        return None;
    };
    if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        let utf16: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|c| u16::from_be_bytes([c[0], c[1]]))
            .collect();
        return Some(String::from_utf16_lossy(&utf16));
    }
    Some(String::from_utf8_lossy(bytes).into_owned())
}

fn push_run(runs: &mut Vec<TextRun>, text: &str, cur_x: &mut f32, y: f32, font_size: f32) {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        *cur_x += AVG_GLYPH_ADVANCE * font_size * text.chars().count() as f32;
        return;
    }
    let width = AVG_GLYPH_ADVANCE * font_size * text.chars().count() as f32;
    runs.push(TextRun::new(trimmed, *cur_x, y, width, font_size));
    *cur_x += width;
}

fn raw_image(
    data: &[u8],
    width: u32,
    height: u32,
    color_space: &[u8],
    bits_per_component: u8,
) -> Option<DynamicImage> {
    if bits_per_component != 8 {
        trace!("unsupported bits per component: {}", bits_per_component);
        return None;
    }

    let expected_rgb = (width * height * 3) as usize;
    let expected_gray = (width * height) as usize;

    if (color_space == b"DeviceRGB" || color_space == b"RGB") && data.len() >= expected_rgb {
        let mut rgba = Vec::with_capacity((width * height * 4) as usize);
        for chunk in data[..expected_rgb].chunks(3) {
            rgba.extend_from_slice(chunk);
            rgba.push(255);
        }
        return ImageBuffer::<Rgba<u8>, _>::from_raw(width, height, rgba)
            .map(DynamicImage::ImageRgba8);
    }
    if (color_space == b"DeviceGray" || color_space == b"G") && data.len() >= expected_gray {
        let mut rgba = Vec::with_capacity((width * height * 4) as usize);
        for &gray in &data[..expected_gray] {
            rgba.extend_from_slice(&[gray, gray, gray, 255]);
        }
        return ImageBuffer::<Rgba<u8>, _>::from_raw(width, height, rgba)
            .map(DynamicImage::ImageRgba8);
    }

    warn!(
        "could not decode raw image: {} bytes, colorspace {:?}",
        data.len(),
        String::from_utf8_lossy(color_space)
    );
    None
}
