use crate::error::{ProcessError, Result};
use crate::pdf::document::OutputDocument;
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, StringFormat};
use tracing::{debug, instrument};

/// Resource name of the watermark font; unlikely to clash with page fonts.
const FONT_NAME: &str = "QuireWm";

/// US Letter, used when a page carries no usable MediaBox.
const DEFAULT_MEDIA_BOX: [f32; 4] = [0.0, 0.0, 612.0, 792.0];

/// Stamp `text` diagonally across every page of `output`.
///
/// Existing page content is wrapped in a save/restore pair so whatever
/// graphics state it leaves behind cannot leak into the overlay.
#[instrument(skip(output), fields(pages = output.page_count()))]
pub fn apply_watermark(output: &mut OutputDocument, text: &str, font_size: f32) -> Result<()> {
    if text.trim().is_empty() {
        return Err(ProcessError::validation("watermark text is required"));
    }

    let page_ids = output.page_ids();
    if page_ids.is_empty() {
        return Ok(());
    }

    let doc = output.document_mut();
    let font_id = doc.add_object(helvetica());
    let save_id = doc.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));

    for page_id in page_ids {
        let media_box = media_box(doc, page_id);
        let overlay = overlay_content(text, font_size, media_box)?;
        let overlay_id = doc.add_object(Stream::new(Dictionary::new(), overlay));

        register_font(doc, page_id, font_id)?;
        wrap_contents(doc, page_id, save_id, overlay_id)?;
    }

    debug!(text, "Watermark applied");
    Ok(())
}

fn helvetica() -> Dictionary {
    let mut font = Dictionary::new();
    font.set("Type", Object::Name(b"Font".to_vec()));
    font.set("Subtype", Object::Name(b"Type1".to_vec()));
    font.set("BaseFont", Object::Name(b"Helvetica".to_vec()));
    font.set("Encoding", Object::Name(b"WinAnsiEncoding".to_vec()));
    font
}

fn media_box(doc: &Document, page_id: ObjectId) -> [f32; 4] {
    let values: Option<Vec<f32>> = doc
        .get_dictionary(page_id)
        .and_then(|page| page.get(b"MediaBox"))
        .and_then(Object::as_array)
        .ok()
        .map(|items| items.iter().filter_map(|v| v.as_float().ok()).collect());

    match values.as_deref() {
        Some([x0, y0, x1, y1]) => [*x0, *y0, *x1, *y1],
        _ => DEFAULT_MEDIA_BOX,
    }
}

fn overlay_content(text: &str, font_size: f32, media_box: [f32; 4]) -> Result<Vec<u8>> {
    let [x0, y0, x1, y1] = media_box;
    let (cx, cy) = ((x0 + x1) / 2.0, (y0 + y1) / 2.0);

    // Helvetica averages about half an em per glyph
    let width = text.chars().count() as f32 * font_size * 0.5;
    let (sin, cos) = std::f32::consts::FRAC_PI_4.sin_cos();
    let tx = cx - cos * width / 2.0;
    let ty = cy - sin * width / 2.0;

    let encoded: Vec<u8> = text
        .chars()
        .map(|c| if (c as u32) < 256 { c as u8 } else { b'?' })
        .collect();

    let content = Content {
        operations: vec![
            Operation::new("Q", vec![]),
            Operation::new("q", vec![]),
            Operation::new("g", vec![Object::Real(0.75)]),
            Operation::new("BT", vec![]),
            Operation::new(
                "Tf",
                vec![Object::Name(FONT_NAME.as_bytes().to_vec()), Object::Real(font_size)],
            ),
            Operation::new(
                "Tm",
                vec![
                    Object::Real(cos),
                    Object::Real(sin),
                    Object::Real(-sin),
                    Object::Real(cos),
                    Object::Real(tx),
                    Object::Real(ty),
                ],
            ),
            Operation::new("Tj", vec![Object::String(encoded, StringFormat::Literal)]),
            Operation::new("ET", vec![]),
            Operation::new("Q", vec![]),
        ],
    };

    content
        .encode()
        .map_err(|e| ProcessError::Document(format!("failed to encode watermark: {}", e)))
}

fn register_font(doc: &mut Document, page_id: ObjectId, font_id: ObjectId) -> Result<()> {
    let resources_ref = match doc.get_dictionary(page_id).map(|page| page.get(b"Resources")) {
        Ok(Ok(Object::Reference(id))) => Some(*id),
        _ => None,
    };

    let resources = match resources_ref {
        Some(id) => doc.get_object_mut(id).and_then(Object::as_dict_mut),
        None => page_dict_mut(doc, page_id).and_then(|page| {
            if !matches!(page.get(b"Resources"), Ok(Object::Dictionary(_))) {
                page.set("Resources", Dictionary::new());
            }
            page.get_mut(b"Resources").and_then(Object::as_dict_mut)
        }),
    }
    .map_err(|e| ProcessError::Document(format!("page resources unavailable: {}", e)))?;

    let fonts_ref = match resources.get(b"Font") {
        Ok(Object::Reference(id)) => Some(*id),
        _ => None,
    };

    let fonts = match fonts_ref {
        Some(id) => doc.get_object_mut(id).and_then(Object::as_dict_mut),
        None => {
            if !matches!(resources.get(b"Font"), Ok(Object::Dictionary(_))) {
                resources.set("Font", Dictionary::new());
            }
            resources.get_mut(b"Font").and_then(Object::as_dict_mut)
        }
    }
    .map_err(|e| ProcessError::Document(format!("font resources unavailable: {}", e)))?;

    fonts.set(FONT_NAME, Object::Reference(font_id));
    Ok(())
}

fn wrap_contents(
    doc: &mut Document,
    page_id: ObjectId,
    save_id: ObjectId,
    overlay_id: ObjectId,
) -> Result<()> {
    let page = page_dict_mut(doc, page_id)
        .map_err(|e| ProcessError::Document(format!("cannot read page {:?}: {}", page_id, e)))?;

    let mut contents = vec![Object::Reference(save_id)];
    match page.get(b"Contents") {
        Ok(Object::Reference(id)) => contents.push(Object::Reference(*id)),
        Ok(Object::Array(items)) => contents.extend(items.iter().cloned()),
        _ => {}
    }
    contents.push(Object::Reference(overlay_id));

    page.set("Contents", Object::Array(contents));
    Ok(())
}

fn page_dict_mut(doc: &mut Document, page_id: ObjectId) -> lopdf::Result<&mut Dictionary> {
    doc.get_object_mut(page_id).and_then(Object::as_dict_mut)
}
