//! Slide-deck composition: one blank PPTX slide per sampled frame.
//!
//! A `.pptx` file is a ZIP package of OOXML parts. The package written here
//! is the smallest one PowerPoint, Keynote and LibreOffice all open: one
//! master, one blank layout, one theme, and a slide plus a media part per
//! frame. Every entry carries the same fixed timestamp, so composing the same
//! frames twice produces byte-identical files.
//!
//! Pictures sit at a fixed offset with a fixed width; the height follows the
//! frame's native aspect ratio, so the slide canvas is not filled.

use crate::error::Video2PdfError;
use crate::pipeline::compose::{commit_output, ensure_parent, temp_output_path};
use crate::progress::{ProgressCallback, Stage};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use quick_xml::Writer;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

/// English Metric Units per inch.
pub const EMU_PER_INCH: u64 = 914_400;
/// 10 in × 7.5 in, the default 4:3 slide.
pub const SLIDE_WIDTH_EMU: u64 = 10 * EMU_PER_INCH;
pub const SLIDE_HEIGHT_EMU: u64 = 7 * EMU_PER_INCH + EMU_PER_INCH / 2;
/// Picture offset from the top-left corner (0.5 in).
pub const PICTURE_OFFSET_EMU: u64 = EMU_PER_INCH / 2;
/// Picture width (9 in).
pub const PICTURE_WIDTH_EMU: u64 = 9 * EMU_PER_INCH;

const NS_A: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";
const NS_R: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const NS_P: &str = "http://schemas.openxmlformats.org/presentationml/2006/main";
const NS_PKG_REL: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
const NS_CONTENT_TYPES: &str = "http://schemas.openxmlformats.org/package/2006/content-types";
const REL: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const CT_PML: &str = "application/vnd.openxmlformats-officedocument.presentationml";
const CT_THEME: &str = "application/vnd.openxmlformats-officedocument.theme+xml";

/// Write `frames` to `output` as a PPTX deck. Returns the slide count.
pub fn compose_deck(
    frames: &[PathBuf],
    output: &Path,
    progress: Option<&ProgressCallback>,
) -> Result<usize, Video2PdfError> {
    if frames.is_empty() {
        let dir = output.parent().unwrap_or(Path::new(".")).to_path_buf();
        return Err(Video2PdfError::EmptySampleSet { dir });
    }

    ensure_parent(output)?;
    let tmp = temp_output_path(output);

    match write_deck(frames, &tmp, progress) {
        Ok(slides) => {
            commit_output(&tmp, output)?;
            info!("PPTX saved as {} ({} slides)", output.display(), slides);
            Ok(slides)
        }
        Err(e) => {
            let _ = std::fs::remove_file(&tmp);
            Err(e)
        }
    }
}

/// Picture height for a frame of `width`×`height` pixels at the fixed width.
pub fn picture_height_emu(width: u32, height: u32) -> u64 {
    if width == 0 {
        return 0;
    }
    PICTURE_WIDTH_EMU * height as u64 / width as u64
}

fn write_deck(
    frames: &[PathBuf],
    tmp: &Path,
    progress: Option<&ProgressCallback>,
) -> Result<usize, Video2PdfError> {
    let compose_err = |path: &Path, detail: String| Video2PdfError::Compose {
        path: path.to_path_buf(),
        detail,
    };
    let zip_err = |e: zip::result::ZipError| compose_err(tmp, format!("zip: {e}"));
    let io_err = |e: std::io::Error| compose_err(tmp, format!("write: {e}"));
    let xml_err = |e: quick_xml::Error| compose_err(tmp, format!("xml: {e}"));

    let file = File::create(tmp).map_err(|e| Video2PdfError::OutputWriteFailed {
        path: tmp.to_path_buf(),
        source: e,
    })?;
    let mut zip = ZipWriter::new(BufWriter::new(file));

    let xml = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(DateTime::default());
    let media = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Stored)
        .last_modified_time(DateTime::default());

    let n = frames.len();
    let parts = [
        ("[Content_Types].xml", content_types(n)),
        ("_rels/.rels", root_rels()),
        ("ppt/presentation.xml", presentation(n)),
        ("ppt/_rels/presentation.xml.rels", presentation_rels(n)),
        ("ppt/slideMasters/slideMaster1.xml", slide_master()),
        ("ppt/slideMasters/_rels/slideMaster1.xml.rels", slide_master_rels()),
        ("ppt/slideLayouts/slideLayout1.xml", slide_layout()),
        ("ppt/slideLayouts/_rels/slideLayout1.xml.rels", slide_layout_rels()),
        ("ppt/theme/theme1.xml", theme()),
    ];
    for (name, body) in parts {
        let body = body.map_err(xml_err)?;
        zip.start_file(name, xml).map_err(zip_err)?;
        zip.write_all(&body).map_err(io_err)?;
    }

    if let Some(cb) = progress {
        cb.on_stage_start(Stage::Compose, n);
        cb.on_progress(Stage::Compose, 0);
    }

    for (i, frame) in frames.iter().enumerate() {
        let number = i + 1;
        let (w, h) = image::image_dimensions(frame)
            .map_err(|e| compose_err(frame, format!("cannot read image: {e}")))?;
        let bytes = std::fs::read(frame)
            .map_err(|e| compose_err(frame, format!("cannot read image: {e}")))?;
        let descr = frame
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        zip.start_file(format!("ppt/media/image{number}.png"), media)
            .map_err(zip_err)?;
        zip.write_all(&bytes).map_err(io_err)?;

        zip.start_file(format!("ppt/slides/slide{number}.xml"), xml)
            .map_err(zip_err)?;
        let body = slide(number, &descr, picture_height_emu(w, h)).map_err(xml_err)?;
        zip.write_all(&body).map_err(io_err)?;

        zip.start_file(format!("ppt/slides/_rels/slide{number}.xml.rels"), xml)
            .map_err(zip_err)?;
        let body = slide_rels(number).map_err(xml_err)?;
        zip.write_all(&body).map_err(io_err)?;

        debug!("slide {} ← {} ({}x{})", number, frame.display(), w, h);
        if let Some(cb) = progress {
            cb.on_progress(Stage::Compose, number);
        }
    }

    let mut writer = zip.finish().map_err(zip_err)?;
    writer.flush().map_err(io_err)?;
    Ok(n)
}

// ── OOXML parts ──────────────────────────────────────────────────────────

type Xml = Writer<Vec<u8>>;
type XmlResult<T> = Result<T, quick_xml::Error>;

/// A writer positioned after the standalone XML declaration.
fn document() -> XmlResult<Xml> {
    let mut w = Writer::new(Vec::new());
    w.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))?;
    Ok(w)
}

fn open(w: &mut Xml, name: &str, attrs: &[(&str, &str)]) -> XmlResult<()> {
    let start = BytesStart::new(name).with_attributes(attrs.iter().copied());
    w.write_event(Event::Start(start))?;
    Ok(())
}

fn empty(w: &mut Xml, name: &str, attrs: &[(&str, &str)]) -> XmlResult<()> {
    let start = BytesStart::new(name).with_attributes(attrs.iter().copied());
    w.write_event(Event::Empty(start))?;
    Ok(())
}

fn close(w: &mut Xml, name: &str) -> XmlResult<()> {
    w.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

/// Namespaces shared by the presentation, master, layout and slide roots.
const PML_NAMESPACES: [(&str, &str); 3] =
    [("xmlns:a", NS_A), ("xmlns:r", NS_R), ("xmlns:p", NS_P)];

fn open_root(w: &mut Xml, name: &str, extra: &[(&str, &str)]) -> XmlResult<()> {
    let mut attrs: Vec<(&str, &str)> = PML_NAMESPACES.to_vec();
    attrs.extend_from_slice(extra);
    open(w, name, &attrs)
}

fn content_types(slides: usize) -> XmlResult<Vec<u8>> {
    let mut w = document()?;
    open(&mut w, "Types", &[("xmlns", NS_CONTENT_TYPES)])?;
    for (ext, ct) in [
        ("rels", "application/vnd.openxmlformats-package.relationships+xml"),
        ("xml", "application/xml"),
        ("png", "image/png"),
    ] {
        empty(&mut w, "Default", &[("Extension", ext), ("ContentType", ct)])?;
    }

    let mut overrides = vec![
        ("/ppt/presentation.xml".to_string(), format!("{CT_PML}.presentation.main+xml")),
        ("/ppt/slideMasters/slideMaster1.xml".into(), format!("{CT_PML}.slideMaster+xml")),
        ("/ppt/slideLayouts/slideLayout1.xml".into(), format!("{CT_PML}.slideLayout+xml")),
        ("/ppt/theme/theme1.xml".into(), CT_THEME.to_string()),
    ];
    for n in 1..=slides {
        overrides.push((format!("/ppt/slides/slide{n}.xml"), format!("{CT_PML}.slide+xml")));
    }
    for (part, ct) in &overrides {
        empty(
            &mut w,
            "Override",
            &[("PartName", part.as_str()), ("ContentType", ct.as_str())],
        )?;
    }

    close(&mut w, "Types")?;
    Ok(w.into_inner())
}

/// A relationships part. Each entry is `(id, kind, target)`; `kind` is
/// appended to the office-document relationship namespace.
fn relationships(rels: &[(String, &str, String)]) -> XmlResult<Vec<u8>> {
    let mut w = document()?;
    open(&mut w, "Relationships", &[("xmlns", NS_PKG_REL)])?;
    for (id, kind, target) in rels {
        let kind = format!("{REL}/{kind}");
        empty(
            &mut w,
            "Relationship",
            &[("Id", id.as_str()), ("Type", kind.as_str()), ("Target", target.as_str())],
        )?;
    }
    close(&mut w, "Relationships")?;
    Ok(w.into_inner())
}

fn rel(id: usize, kind: &str, target: impl Into<String>) -> (String, &str, String) {
    (format!("rId{id}"), kind, target.into())
}

fn root_rels() -> XmlResult<Vec<u8>> {
    relationships(&[rel(1, "officeDocument", "ppt/presentation.xml")])
}

/// Slide `n` (1-based) is relationship `rId{n + 2}` of the presentation;
/// rId1 is the master and rId2 the theme.
fn presentation(slides: usize) -> XmlResult<Vec<u8>> {
    let mut w = document()?;
    open_root(&mut w, "p:presentation", &[("saveSubsetFonts", "1")])?;

    open(&mut w, "p:sldMasterIdLst", &[])?;
    empty(&mut w, "p:sldMasterId", &[("id", "2147483648"), ("r:id", "rId1")])?;
    close(&mut w, "p:sldMasterIdLst")?;

    open(&mut w, "p:sldIdLst", &[])?;
    for n in 1..=slides {
        let id = (255 + n).to_string();
        let rid = format!("rId{}", n + 2);
        empty(&mut w, "p:sldId", &[("id", id.as_str()), ("r:id", rid.as_str())])?;
    }
    close(&mut w, "p:sldIdLst")?;

    let (cx, cy) = (SLIDE_WIDTH_EMU.to_string(), SLIDE_HEIGHT_EMU.to_string());
    let size = [("cx", cx.as_str()), ("cy", cy.as_str()), ("type", "screen4x3")];
    empty(&mut w, "p:sldSz", &size)?;
    empty(&mut w, "p:notesSz", &[("cx", cy.as_str()), ("cy", cx.as_str())])?;

    close(&mut w, "p:presentation")?;
    Ok(w.into_inner())
}

fn presentation_rels(slides: usize) -> XmlResult<Vec<u8>> {
    let mut rels = vec![
        rel(1, "slideMaster", "slideMasters/slideMaster1.xml"),
        rel(2, "theme", "theme/theme1.xml"),
    ];
    for n in 1..=slides {
        rels.push(rel(n + 2, "slide", format!("slides/slide{n}.xml")));
    }
    relationships(&rels)
}

/// Empty group-shape properties every shape tree starts with.
fn empty_group(w: &mut Xml) -> XmlResult<()> {
    open(w, "p:nvGrpSpPr", &[])?;
    empty(w, "p:cNvPr", &[("id", "1"), ("name", "")])?;
    empty(w, "p:cNvGrpSpPr", &[])?;
    empty(w, "p:nvPr", &[])?;
    close(w, "p:nvGrpSpPr")?;

    open(w, "p:grpSpPr", &[])?;
    open(w, "a:xfrm", &[])?;
    empty(w, "a:off", &[("x", "0"), ("y", "0")])?;
    empty(w, "a:ext", &[("cx", "0"), ("cy", "0")])?;
    empty(w, "a:chOff", &[("x", "0"), ("y", "0")])?;
    empty(w, "a:chExt", &[("cx", "0"), ("cy", "0")])?;
    close(w, "a:xfrm")?;
    close(w, "p:grpSpPr")
}

fn slide_master() -> XmlResult<Vec<u8>> {
    let mut w = document()?;
    open_root(&mut w, "p:sldMaster", &[])?;

    open(&mut w, "p:cSld", &[])?;
    open(&mut w, "p:bg", &[])?;
    open(&mut w, "p:bgRef", &[("idx", "1001")])?;
    empty(&mut w, "a:schemeClr", &[("val", "bg1")])?;
    close(&mut w, "p:bgRef")?;
    close(&mut w, "p:bg")?;
    open(&mut w, "p:spTree", &[])?;
    empty_group(&mut w)?;
    close(&mut w, "p:spTree")?;
    close(&mut w, "p:cSld")?;

    let mut clr_map = vec![("bg1", "lt1"), ("tx1", "dk1"), ("bg2", "lt2"), ("tx2", "dk2")];
    for accent in ["accent1", "accent2", "accent3", "accent4", "accent5", "accent6"] {
        clr_map.push((accent, accent));
    }
    clr_map.extend([("hlink", "hlink"), ("folHlink", "folHlink")]);
    empty(&mut w, "p:clrMap", &clr_map)?;

    open(&mut w, "p:sldLayoutIdLst", &[])?;
    empty(&mut w, "p:sldLayoutId", &[("id", "2147483649"), ("r:id", "rId1")])?;
    close(&mut w, "p:sldLayoutIdLst")?;

    open(&mut w, "p:txStyles", &[])?;
    for style in ["p:titleStyle", "p:bodyStyle", "p:otherStyle"] {
        empty(&mut w, style, &[])?;
    }
    close(&mut w, "p:txStyles")?;

    close(&mut w, "p:sldMaster")?;
    Ok(w.into_inner())
}

fn slide_master_rels() -> XmlResult<Vec<u8>> {
    relationships(&[
        rel(1, "slideLayout", "../slideLayouts/slideLayout1.xml"),
        rel(2, "theme", "../theme/theme1.xml"),
    ])
}

fn slide_layout() -> XmlResult<Vec<u8>> {
    let mut w = document()?;
    open_root(&mut w, "p:sldLayout", &[("type", "blank"), ("preserve", "1")])?;
    open(&mut w, "p:cSld", &[("name", "Blank")])?;
    open(&mut w, "p:spTree", &[])?;
    empty_group(&mut w)?;
    close(&mut w, "p:spTree")?;
    close(&mut w, "p:cSld")?;
    master_colors(&mut w)?;
    close(&mut w, "p:sldLayout")?;
    Ok(w.into_inner())
}

fn master_colors(w: &mut Xml) -> XmlResult<()> {
    open(w, "p:clrMapOvr", &[])?;
    empty(w, "a:masterClrMapping", &[])?;
    close(w, "p:clrMapOvr")
}

fn slide_layout_rels() -> XmlResult<Vec<u8>> {
    relationships(&[rel(1, "slideMaster", "../slideMasters/slideMaster1.xml")])
}

/// One slide holding one picture. `descr` is the picture's alt text.
fn slide(number: usize, descr: &str, height_emu: u64) -> XmlResult<Vec<u8>> {
    let mut w = document()?;
    open_root(&mut w, "p:sld", &[])?;
    open(&mut w, "p:cSld", &[])?;
    open(&mut w, "p:spTree", &[])?;
    empty_group(&mut w)?;

    open(&mut w, "p:pic", &[])?;
    open(&mut w, "p:nvPicPr", &[])?;
    let name = format!("Picture {number}");
    empty(&mut w, "p:cNvPr", &[("id", "2"), ("name", name.as_str()), ("descr", descr)])?;
    open(&mut w, "p:cNvPicPr", &[])?;
    empty(&mut w, "a:picLocks", &[("noChangeAspect", "1")])?;
    close(&mut w, "p:cNvPicPr")?;
    empty(&mut w, "p:nvPr", &[])?;
    close(&mut w, "p:nvPicPr")?;

    open(&mut w, "p:blipFill", &[])?;
    empty(&mut w, "a:blip", &[("r:embed", "rId2")])?;
    open(&mut w, "a:stretch", &[])?;
    empty(&mut w, "a:fillRect", &[])?;
    close(&mut w, "a:stretch")?;
    close(&mut w, "p:blipFill")?;

    let offset = PICTURE_OFFSET_EMU.to_string();
    let (cx, cy) = (PICTURE_WIDTH_EMU.to_string(), height_emu.to_string());
    open(&mut w, "p:spPr", &[])?;
    open(&mut w, "a:xfrm", &[])?;
    empty(&mut w, "a:off", &[("x", offset.as_str()), ("y", offset.as_str())])?;
    empty(&mut w, "a:ext", &[("cx", cx.as_str()), ("cy", cy.as_str())])?;
    close(&mut w, "a:xfrm")?;
    open(&mut w, "a:prstGeom", &[("prst", "rect")])?;
    empty(&mut w, "a:avLst", &[])?;
    close(&mut w, "a:prstGeom")?;
    close(&mut w, "p:spPr")?;
    close(&mut w, "p:pic")?;

    close(&mut w, "p:spTree")?;
    close(&mut w, "p:cSld")?;
    master_colors(&mut w)?;
    close(&mut w, "p:sld")?;
    Ok(w.into_inner())
}

fn slide_rels(number: usize) -> XmlResult<Vec<u8>> {
    relationships(&[
        rel(1, "slideLayout", "../slideLayouts/slideLayout1.xml"),
        rel(2, "image", format!("../media/image{number}.png")),
    ])
}

fn theme() -> XmlResult<Vec<u8>> {
    let mut w = document()?;
    open(&mut w, "a:theme", &[("xmlns:a", NS_A), ("name", "Office Theme")])?;
    open(&mut w, "a:themeElements", &[])?;

    open(&mut w, "a:clrScheme", &[("name", "Office")])?;
    for (slot, hex) in [
        ("a:dk1", "000000"),
        ("a:lt1", "FFFFFF"),
        ("a:dk2", "44546A"),
        ("a:lt2", "E7E6E6"),
        ("a:accent1", "4472C4"),
        ("a:accent2", "ED7D31"),
        ("a:accent3", "A5A5A5"),
        ("a:accent4", "FFC000"),
        ("a:accent5", "5B9BD5"),
        ("a:accent6", "70AD47"),
        ("a:hlink", "0563C1"),
        ("a:folHlink", "954F72"),
    ] {
        open(&mut w, slot, &[])?;
        empty(&mut w, "a:srgbClr", &[("val", hex)])?;
        close(&mut w, slot)?;
    }
    close(&mut w, "a:clrScheme")?;

    open(&mut w, "a:fontScheme", &[("name", "Office")])?;
    for (slot, face) in [("a:majorFont", "Calibri Light"), ("a:minorFont", "Calibri")] {
        open(&mut w, slot, &[])?;
        empty(&mut w, "a:latin", &[("typeface", face)])?;
        empty(&mut w, "a:ea", &[("typeface", "")])?;
        empty(&mut w, "a:cs", &[("typeface", "")])?;
        close(&mut w, slot)?;
    }
    close(&mut w, "a:fontScheme")?;

    let solid_fill = |w: &mut Xml| -> XmlResult<()> {
        open(w, "a:solidFill", &[])?;
        empty(w, "a:schemeClr", &[("val", "phClr")])?;
        close(w, "a:solidFill")
    };
    open(&mut w, "a:fmtScheme", &[("name", "Office")])?;
    open(&mut w, "a:fillStyleLst", &[])?;
    for _ in 0..3 {
        solid_fill(&mut w)?;
    }
    close(&mut w, "a:fillStyleLst")?;
    open(&mut w, "a:lnStyleLst", &[])?;
    for width in ["6350", "12700", "19050"] {
        open(&mut w, "a:ln", &[("w", width)])?;
        solid_fill(&mut w)?;
        close(&mut w, "a:ln")?;
    }
    close(&mut w, "a:lnStyleLst")?;
    open(&mut w, "a:effectStyleLst", &[])?;
    for _ in 0..3 {
        open(&mut w, "a:effectStyle", &[])?;
        empty(&mut w, "a:effectLst", &[])?;
        close(&mut w, "a:effectStyle")?;
    }
    close(&mut w, "a:effectStyleLst")?;
    open(&mut w, "a:bgFillStyleLst", &[])?;
    for _ in 0..3 {
        solid_fill(&mut w)?;
    }
    close(&mut w, "a:bgFillStyleLst")?;
    close(&mut w, "a:fmtScheme")?;

    close(&mut w, "a:themeElements")?;
    close(&mut w, "a:theme")?;
    Ok(w.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use std::io::Read;

    fn write_frames(dir: &Path, sizes: &[(u32, u32)]) -> Vec<PathBuf> {
        sizes
            .iter()
            .enumerate()
            .map(|(i, &(w, h))| {
                let path = dir.join(format!("frame_{i:04}.png"));
                RgbImage::from_pixel(w, h, Rgb([i as u8 * 40, 80, 160]))
                    .save(&path)
                    .unwrap();
                path
            })
            .collect()
    }

    fn read_entry(archive: &mut zip::ZipArchive<File>, name: &str) -> String {
        let mut s = String::new();
        archive
            .by_name(name)
            .unwrap_or_else(|_| panic!("missing {name}"))
            .read_to_string(&mut s)
            .unwrap();
        s
    }

    #[test]
    fn writes_one_slide_per_frame() {
        let dir = tempfile::tempdir().unwrap();
        let frames = write_frames(dir.path(), &[(32, 18), (32, 18), (32, 18)]);
        let out = dir.path().join("deck.pptx");

        let slides = compose_deck(&frames, &out, None).unwrap();
        assert_eq!(slides, 3);

        let mut archive = zip::ZipArchive::new(File::open(&out).unwrap()).unwrap();
        for n in 1..=3 {
            archive.by_name(&format!("ppt/slides/slide{n}.xml")).unwrap();
            archive.by_name(&format!("ppt/media/image{n}.png")).unwrap();
        }
        assert!(archive.by_name("ppt/slides/slide4.xml").is_err());

        let presentation = read_entry(&mut archive, "ppt/presentation.xml");
        assert_eq!(presentation.matches("<p:sldId ").count(), 3);
        let types = read_entry(&mut archive, "[Content_Types].xml");
        assert!(types.contains("/ppt/slides/slide3.xml"));
        let layout = read_entry(&mut archive, "ppt/slideLayouts/slideLayout1.xml");
        assert!(layout.contains(r#"type="blank""#));
    }

    #[test]
    fn picture_keeps_aspect_at_fixed_offset_and_width() {
        let dir = tempfile::tempdir().unwrap();
        let frames = write_frames(dir.path(), &[(64, 48)]);
        let out = dir.path().join("deck.pptx");
        compose_deck(&frames, &out, None).unwrap();

        let mut archive = zip::ZipArchive::new(File::open(&out).unwrap()).unwrap();
        let slide = read_entry(&mut archive, "ppt/slides/slide1.xml");
        assert!(slide.contains(r#"<a:off x="457200" y="457200"/>"#), "{slide}");
        assert!(slide.contains(r#"cx="8229600" cy="6172200""#), "{slide}");
    }

    #[test]
    fn picture_height_follows_aspect() {
        assert_eq!(picture_height_emu(1280, 720), 4_629_150);
        assert_eq!(picture_height_emu(4, 3), 6_172_200);
        assert_eq!(picture_height_emu(0, 3), 0);
    }

    #[test]
    fn recomposing_is_byte_identical() {
        let dir = tempfile::tempdir().unwrap();
        let frames = write_frames(dir.path(), &[(32, 18), (32, 18)]);
        let out = dir.path().join("deck.pptx");

        compose_deck(&frames, &out, None).unwrap();
        let first = std::fs::read(&out).unwrap();
        compose_deck(&frames, &out, None).unwrap();
        let second = std::fs::read(&out).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn empty_frame_list_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("deck.pptx");
        let err = compose_deck(&[], &out, None).unwrap_err();
        assert!(matches!(err, Video2PdfError::EmptySampleSet { .. }));
        assert!(!out.exists());
    }

    #[test]
    fn unreadable_frame_leaves_no_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let bogus = dir.path().join("frame_0000.png");
        std::fs::write(&bogus, b"not a png").unwrap();
        let out = dir.path().join("deck.pptx");

        let err = compose_deck(&[bogus], &out, None).unwrap_err();
        assert!(matches!(err, Video2PdfError::Compose { .. }), "{err}");
        assert!(!out.exists());
        assert!(!temp_output_path(&out).exists());
    }

    #[test]
    fn picture_description_is_escaped() {
        let dir = tempfile::tempdir().unwrap();
        let frame = dir.path().join(r#"a&b<"c">.png"#);
        RgbImage::from_pixel(16, 9, Rgb([0, 0, 0])).save(&frame).unwrap();
        let out = dir.path().join("deck.pptx");
        compose_deck(&[frame], &out, None).unwrap();

        let mut archive = zip::ZipArchive::new(File::open(&out).unwrap()).unwrap();
        let slide = read_entry(&mut archive, "ppt/slides/slide1.xml");
        assert!(
            slide.contains(r#"descr="a&amp;b&lt;&quot;c&quot;&gt;.png""#),
            "{slide}"
        );
        assert!(slide.starts_with(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><p:sld "#
        ));
    }

    #[test]
    fn package_parts_are_well_formed() {
        let dir = tempfile::tempdir().unwrap();
        let frames = write_frames(dir.path(), &[(32, 18), (32, 18)]);
        let out = dir.path().join("deck.pptx");
        compose_deck(&frames, &out, None).unwrap();

        let mut archive = zip::ZipArchive::new(File::open(&out).unwrap()).unwrap();
        let names: Vec<String> = archive
            .file_names()
            .filter(|n| n.ends_with(".xml") || n.ends_with(".rels"))
            .map(String::from)
            .collect();
        assert_eq!(names.len(), 9 + 2 * 2);
        for name in names {
            let body = read_entry(&mut archive, &name);
            let mut reader = quick_xml::Reader::from_str(&body);
            let mut depth = 0i32;
            loop {
                match reader.read_event() {
                    Ok(Event::Start(_)) => depth += 1,
                    Ok(Event::End(_)) => depth -= 1,
                    Ok(Event::Eof) => break,
                    Ok(_) => {}
                    Err(e) => panic!("{name}: {e}"),
                }
            }
            assert_eq!(depth, 0, "{name} is unbalanced");
        }
    }
}
