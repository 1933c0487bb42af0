//! Branded document generation.
//!
//! The document is laid out as up to three sections so each page group can
//! carry its own header and footer:
//!
//! 1. the cover page,
//! 2. the table of contents (only when entries were supplied),
//! 3. the content sections.
//!
//! Every group always gets its own header and footer part. Word would
//! otherwise inherit the previous group's parts, and a group without a
//! footer configuration must still show the default copyright line.

use chrono::{Datelike, Utc};
use std::io::{Cursor, Write};
use tracing::{info, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::media::{self, EmbeddedImage, ImageKind};
use super::model::{
    Brand, ContentSection, DocumentMetadata, DocumentRequest, FooterCell, FooterConfig,
    GeneratedDocument, HeaderAlignment, HeaderConfig, PageGroupLayout, SectionText, TocEntry,
};
use super::xml::{self, Align, NS_DECLARATIONS, Paragraph, Run, XML_DECLARATION};
use crate::error::{DocxError, Result};

// A4 portrait with one-inch margins, in twips.
const PAGE_WIDTH: u32 = 11906;
const PAGE_HEIGHT: u32 = 16838;
const MARGIN: u32 = 1440;
const TEXT_WIDTH: u32 = PAGE_WIDTH - 2 * MARGIN;

const TOC_INDENT_STEP: u32 = 440;
const EMU_PER_TWIP: u64 = 635;
const BODY_IMAGE_MAX_HEIGHT: u64 = 4_572_000;
const FOOTER_IMAGE_MAX_HEIGHT: u64 = 365_760;

const REL_OFFICE_DOCUMENT: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument";
const REL_CORE_PROPERTIES: &str =
    "http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties";
const REL_STYLES: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles";
const REL_HEADER: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/header";
const REL_FOOTER: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/footer";
const REL_IMAGE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/image";

const CT_DOCUMENT: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml";
const CT_STYLES: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml";
const CT_HEADER: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.header+xml";
const CT_FOOTER: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.footer+xml";
const CT_CORE_PROPERTIES: &str = "application/vnd.openxmlformats-package.core-properties+xml";

/// Filename offered for a generated document: the title with every
/// non-alphanumeric character replaced by `_`.
pub fn suggested_filename(title: &str) -> String {
    let stem: String = title
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();

    if stem.is_empty() {
        "document.docx".to_string()
    } else {
        format!("{stem}.docx")
    }
}

/// Renders `request` into a complete `.docx` package.
///
/// Invalid metadata fails the whole request. An image that cannot be
/// embedded is logged and left out; the rest of the document is still built.
pub fn generate_document(request: &DocumentRequest, brand: &Brand) -> Result<GeneratedDocument> {
    validate(request)?;

    let mut writer = DocumentWriter::new(brand);
    writer.write_cover(&request.metadata);
    writer.end_group(&request.layouts.cover, false);

    if !request.toc.is_empty() {
        writer.write_toc(&request.toc);
        writer.end_group(&request.layouts.toc, false);
    }

    for (index, section) in request.sections.iter().enumerate() {
        writer.write_section(index, section);
    }
    if request.sections.is_empty() {
        Paragraph::new().write(&mut writer.body);
    }
    writer.end_group(&request.layouts.content, true);

    let skipped_images = writer.skipped_images;
    let bytes = writer.finish(&request.metadata)?;

    info!(
        title = %request.metadata.title,
        sections = request.sections.len(),
        toc_entries = request.toc.len(),
        skipped_images,
        size = bytes.len(),
        "Generated document"
    );

    Ok(GeneratedDocument {
        filename: suggested_filename(&request.metadata.title),
        bytes,
    })
}

fn validate(request: &DocumentRequest) -> Result<()> {
    if request.metadata.title.trim().is_empty() {
        return Err(DocxError::InvalidMetadata(
            "document title is required".to_string(),
        ));
    }

    for entry in &request.toc {
        if entry.title.trim().is_empty() {
            return Err(DocxError::InvalidMetadata(
                "table of contents entry without a title".to_string(),
            ));
        }
        if !(1..=3).contains(&entry.level) {
            return Err(DocxError::InvalidMetadata(format!(
                "table of contents entry {:?} has level {}, expected 1-3",
                entry.title, entry.level
            )));
        }
    }

    Ok(())
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Splits body text on blank lines; single newlines stay inside a paragraph.
fn split_paragraphs(body: &str) -> Vec<String> {
    let mut paragraphs = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in body.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                paragraphs.push(current.join("\n"));
                current.clear();
            }
        } else {
            current.push(line.trim_end());
        }
    }
    if !current.is_empty() {
        paragraphs.push(current.join("\n"));
    }

    paragraphs
}

/// `**bold**` spans become bold runs; unbalanced markers are left as typed.
fn inline_runs(text: &str) -> Vec<Run> {
    let parts: Vec<&str> = text.split("**").collect();
    if parts.len() % 2 == 0 {
        return vec![Run::text(text)];
    }

    parts
        .iter()
        .enumerate()
        .filter(|(_, part)| !part.is_empty())
        .map(|(i, part)| Run::text(*part).bold_if(i % 2 == 1))
        .collect()
}

#[derive(Debug, Default)]
struct Relationships {
    entries: Vec<(String, &'static str, String)>,
}

impl Relationships {
    fn add(&mut self, kind: &'static str, target: impl Into<String>) -> String {
        let id = format!("rId{}", self.entries.len() + 1);
        self.entries.push((id.clone(), kind, target.into()));
        id
    }

    fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn to_xml(&self) -> String {
        let mut xml = format!(
            r#"{XML_DECLARATION}<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#
        );
        for (id, kind, target) in &self.entries {
            xml.push_str(&format!(
                r#"<Relationship Id="{id}" Type="{kind}" Target="{target}"/>"#
            ));
        }
        xml.push_str("</Relationships>");
        xml
    }
}

/// Accumulates the parts of the package while the body is written.
struct DocumentWriter<'a> {
    brand: &'a Brand,
    body: String,
    parts: Vec<(String, Vec<u8>)>,
    overrides: Vec<(String, &'static str)>,
    document_rels: Relationships,
    media_count: u32,
    drawing_count: u32,
    header_count: u32,
    footer_count: u32,
    skipped_images: u32,
}

impl<'a> DocumentWriter<'a> {
    fn new(brand: &'a Brand) -> Self {
        let mut document_rels = Relationships::default();
        document_rels.add(REL_STYLES, "styles.xml");

        Self {
            brand,
            body: String::new(),
            parts: Vec::new(),
            overrides: Vec::new(),
            document_rels,
            media_count: 0,
            drawing_count: 0,
            header_count: 0,
            footer_count: 0,
            skipped_images: 0,
        }
    }

    fn write_cover(&mut self, metadata: &DocumentMetadata) {
        let brand = self.brand;
        let out = &mut self.body;

        if metadata.confidential {
            Paragraph::new()
                .shading(brand.accent_color)
                .align(Align::Center)
                .spacing(0, 480)
                .run(Run::text("Confidential").bold().caps().size(20).color("FFFFFF"))
                .write(out);
        }

        Paragraph::new().spacing(2400, 0).write(out);

        if let Some(category) = non_blank(&metadata.category) {
            Paragraph::new()
                .spacing(0, 120)
                .run(Run::text(category).bold().caps().size(24).color(brand.accent_color))
                .write(out);
        }

        Paragraph::new()
            .style("Title")
            .spacing(0, 240)
            .run(Run::text(metadata.title.trim()))
            .write(out);

        if let Some(subtitle) = non_blank(&metadata.subtitle) {
            Paragraph::new()
                .spacing(0, 480)
                .run(Run::text(subtitle).size(32).color(brand.muted_color))
                .write(out);
        }

        let fields = metadata.cover_fields();
        if !fields.is_empty() {
            Paragraph::new()
                .border_bottom(brand.accent_color)
                .spacing(0, 240)
                .write(out);
            for (label, value) in fields {
                Paragraph::new()
                    .spacing(0, 80)
                    .run(Run::text(format!("{label}: ")).bold().size(20).color(brand.muted_color))
                    .run(Run::text(value).size(20))
                    .write(out);
            }
        }
    }

    fn write_toc(&mut self, entries: &[TocEntry]) {
        let brand = self.brand;
        let out = &mut self.body;

        Paragraph::new()
            .spacing(0, 360)
            .run(Run::text("Table of Contents").bold().size(36).color(brand.primary_color))
            .write(out);

        for entry in entries {
            let (size, bold, italic, color, before) = match entry.level {
                1 => (24, true, false, brand.primary_color, 160),
                2 => (22, false, false, brand.primary_color, 40),
                _ => (20, false, true, brand.muted_color, 40),
            };
            let styled = |run: Run| {
                let run = run.size(size).color(color).bold_if(bold);
                if italic { run.italic() } else { run }
            };
            let page = entry.page.map(|p| p.to_string()).unwrap_or_default();

            Paragraph::new()
                .dotted_tab(TEXT_WIDTH)
                .spacing(before, 40)
                .indent(u32::from(entry.level.saturating_sub(1)) * TOC_INDENT_STEP)
                .run(styled(Run::text(entry.title.trim())))
                .run(Run::tab())
                .run(styled(Run::text(page)))
                .write(out);
        }
    }

    fn write_section(&mut self, index: usize, section: &ContentSection) {
        match section {
            ContentSection::Heading(text) => {
                self.write_heading(text);
                self.write_body(&text.body);
            }
            ContentSection::Text { body } => self.write_body(body),
            ContentSection::TextImage {
                text,
                image,
                caption,
            } => {
                self.write_heading(text);
                self.write_body(&text.body);

                match media::decode_image(image) {
                    Ok(image) => {
                        let drawing = self.embed_in_document(&image);
                        Paragraph::new()
                            .align(Align::Center)
                            .keep_next()
                            .spacing(240, 80)
                            .run(Run::drawing(drawing))
                            .write(&mut self.body);
                        if let Some(caption) = non_blank(caption) {
                            Paragraph::new()
                                .style("Caption")
                                .run(Run::text(caption))
                                .write(&mut self.body);
                        }
                    }
                    Err(e) => {
                        self.skipped_images += 1;
                        warn!(section = index, "Skipping section image: {}", e);
                    }
                }
            }
        }
    }

    fn write_heading(&mut self, text: &SectionText) {
        let accent = self.brand.accent_color;
        let title = text.title.trim();
        let chapter = non_blank(&text.chapter);

        if !title.is_empty() || chapter.is_some() {
            let mut heading = Paragraph::new().style("Heading1").keep_next();
            if let Some(chapter) = chapter {
                heading = heading.run(Run::text(format!("{chapter}  ")).color(accent));
            }
            heading.run(Run::text(title).color(accent)).write(&mut self.body);
        }

        if let Some(subtitle) = non_blank(&text.subtitle) {
            Paragraph::new()
                .style("Heading2")
                .keep_next()
                .run(Run::text(subtitle).italic().color(self.brand.muted_color))
                .write(&mut self.body);
        }
    }

    fn write_body(&mut self, body: &str) {
        for paragraph in split_paragraphs(body) {
            Paragraph::new()
                .runs(inline_runs(&paragraph))
                .write(&mut self.body);
        }
    }

    /// Closes the current page group with its own header and footer.
    fn end_group(&mut self, layout: &PageGroupLayout, last: bool) {
        let header = self.add_header(layout.header.as_ref());
        let footer = self.add_footer(layout.footer.as_ref());
        let sect_pr = format!(
            concat!(
                r#"<w:sectPr><w:headerReference w:type="default" r:id="{header}"/>"#,
                r#"<w:footerReference w:type="default" r:id="{footer}"/>"#,
                r#"<w:type w:val="nextPage"/><w:pgSz w:w="{width}" w:h="{height}"/>"#,
                r#"<w:pgMar w:top="{margin}" w:right="{margin}" w:bottom="{margin}" w:left="{margin}" "#,
                r#"w:header="708" w:footer="708" w:gutter="0"/></w:sectPr>"#
            ),
            header = header,
            footer = footer,
            width = PAGE_WIDTH,
            height = PAGE_HEIGHT,
            margin = MARGIN,
        );

        if last {
            self.body.push_str(&sect_pr);
        } else {
            Paragraph::new().section_break(sect_pr).write(&mut self.body);
        }
    }

    fn add_header(&mut self, config: Option<&HeaderConfig>) -> String {
        self.header_count += 1;
        let name = format!("header{}.xml", self.header_count);

        let paragraph = match config {
            Some(config) => {
                let align = match config.alignment {
                    HeaderAlignment::Left => Align::Left,
                    HeaderAlignment::Center => Align::Center,
                    HeaderAlignment::Right => Align::Right,
                };
                let paragraph = Paragraph::new()
                    .align(align)
                    .spacing(0, 0)
                    .run(Run::text(config.text.trim()).size(18).color(self.brand.muted_color));
                if config.show_separator {
                    paragraph.border_bottom(self.brand.accent_color)
                } else {
                    paragraph
                }
            }
            None => Paragraph::new(),
        };

        let xml = format!(
            "{XML_DECLARATION}<w:hdr {NS_DECLARATIONS}>{}</w:hdr>",
            paragraph.to_xml()
        );
        self.add_xml_part(format!("word/{name}"), xml, CT_HEADER);
        self.document_rels.add(REL_HEADER, name)
    }

    fn add_footer(&mut self, config: Option<&FooterConfig>) -> String {
        self.footer_count += 1;
        let name = format!("footer{}.xml", self.footer_count);

        let mut rels = Relationships::default();
        let body = match config.filter(|c| !c.is_empty()) {
            Some(config) => self.configured_footer(config, &mut rels),
            None => self.default_footer(),
        };

        let xml = format!("{XML_DECLARATION}<w:ftr {NS_DECLARATIONS}>{body}</w:ftr>");
        self.add_xml_part(format!("word/{name}"), xml, CT_FOOTER);
        if !rels.is_empty() {
            self.parts
                .push((format!("word/_rels/{name}.rels"), rels.to_xml().into_bytes()));
        }
        self.document_rels.add(REL_FOOTER, name)
    }

    fn default_footer(&self) -> String {
        Paragraph::new()
            .align(Align::Center)
            .spacing(0, 0)
            .run(
                Run::text(format!(
                    "\u{a9} {} {}. All rights reserved.",
                    Utc::now().year(),
                    self.brand.company
                ))
                .size(16)
                .color(self.brand.muted_color),
            )
            .to_xml()
    }

    fn configured_footer(&mut self, config: &FooterConfig, rels: &mut Relationships) -> String {
        let mut xml = String::new();
        if config.show_separator {
            Paragraph::new()
                .border_top(self.brand.accent_color)
                .spacing(0, 0)
                .write(&mut xml);
        }

        let cells = [
            (config.left.as_ref(), Align::Left),
            (config.center.as_ref(), Align::Center),
            (config.right.as_ref(), Align::Right),
        ]
        .map(|(cell, align)| self.footer_cell(cell, align, rels));

        xml.push_str(&xml::layout_row(&cells, TEXT_WIDTH));
        // Word requires a paragraph after a trailing table.
        Paragraph::new().spacing(0, 0).write(&mut xml);
        xml
    }

    fn footer_cell(
        &mut self,
        cell: Option<&FooterCell>,
        align: Align,
        rels: &mut Relationships,
    ) -> Paragraph {
        let muted = self.brand.muted_color;
        let paragraph = Paragraph::new().align(align).spacing(0, 0);

        match cell {
            None => paragraph,
            Some(FooterCell::Text { text }) => {
                paragraph.run(Run::text(text.trim()).size(16).color(muted))
            }
            Some(FooterCell::PageNumber) => paragraph.runs(
                [
                    Run::text("Page "),
                    Run::field("PAGE"),
                    Run::text(" of "),
                    Run::field("NUMPAGES"),
                ]
                .map(|run| run.size(16).color(muted)),
            ),
            Some(FooterCell::Image { image }) => match media::decode_image(image) {
                Ok(image) => {
                    let target = self.store_media(&image);
                    let rel_id = rels.add(REL_IMAGE, target);
                    let max_width = u64::from(TEXT_WIDTH / 3) * EMU_PER_TWIP;
                    let drawing = self.drawing(&rel_id, &image, max_width, FOOTER_IMAGE_MAX_HEIGHT);
                    paragraph.run(Run::drawing(drawing))
                }
                Err(e) => {
                    self.skipped_images += 1;
                    warn!("Skipping footer image: {}", e);
                    paragraph
                }
            },
        }
    }

    fn embed_in_document(&mut self, image: &EmbeddedImage) -> String {
        let target = self.store_media(image);
        let rel_id = self.document_rels.add(REL_IMAGE, target);
        let max_width = u64::from(TEXT_WIDTH) * EMU_PER_TWIP;
        self.drawing(&rel_id, image, max_width, BODY_IMAGE_MAX_HEIGHT)
    }

    /// Stores the image bytes and returns its target relative to `word/`.
    fn store_media(&mut self, image: &EmbeddedImage) -> String {
        self.media_count += 1;
        let target = format!("media/image{}.{}", self.media_count, image.kind.extension());
        self.parts
            .push((format!("word/{target}"), image.bytes.clone()));
        target
    }

    fn drawing(&mut self, rel_id: &str, image: &EmbeddedImage, max_cx: u64, max_cy: u64) -> String {
        self.drawing_count += 1;
        let (cx, cy) = image.extent(max_cx, max_cy);
        xml::inline_drawing(
            rel_id,
            self.drawing_count,
            &format!("Picture {}", self.drawing_count),
            cx,
            cy,
        )
    }

    fn add_xml_part(&mut self, name: String, xml: String, content_type: &'static str) {
        self.overrides.push((format!("/{name}"), content_type));
        self.parts.push((name, xml.into_bytes()));
    }

    fn finish(mut self, metadata: &DocumentMetadata) -> Result<Vec<u8>> {
        let document = format!(
            "{XML_DECLARATION}<w:document {NS_DECLARATIONS}><w:body>{}</w:body></w:document>",
            self.body
        );
        let styles = styles_xml(self.brand);
        let core = core_properties_xml(metadata);
        self.add_xml_part("word/document.xml".to_string(), document, CT_DOCUMENT);
        self.add_xml_part("word/styles.xml".to_string(), styles, CT_STYLES);
        self.add_xml_part("docProps/core.xml".to_string(), core, CT_CORE_PROPERTIES);

        let mut package_rels = Relationships::default();
        package_rels.add(REL_OFFICE_DOCUMENT, "word/document.xml");
        package_rels.add(REL_CORE_PROPERTIES, "docProps/core.xml");

        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        write_part(&mut zip, "[Content_Types].xml", self.content_types_xml().as_bytes())?;
        write_part(&mut zip, "_rels/.rels", package_rels.to_xml().as_bytes())?;
        write_part(
            &mut zip,
            "word/_rels/document.xml.rels",
            self.document_rels.to_xml().as_bytes(),
        )?;
        for (name, bytes) in &self.parts {
            write_part(&mut zip, name, bytes)?;
        }

        Ok(zip.finish()?.into_inner())
    }

    fn content_types_xml(&self) -> String {
        let mut xml = format!(
            concat!(
                "{}",
                r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">"#,
                r#"<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>"#,
                r#"<Default Extension="xml" ContentType="application/xml"/>"#
            ),
            XML_DECLARATION
        );
        for kind in ImageKind::ALL {
            xml.push_str(&format!(
                r#"<Default Extension="{}" ContentType="{}"/>"#,
                kind.extension(),
                kind.content_type()
            ));
        }
        for (part, content_type) in &self.overrides {
            xml.push_str(&format!(
                r#"<Override PartName="{part}" ContentType="{content_type}"/>"#
            ));
        }
        xml.push_str("</Types>");
        xml
    }
}

fn write_part(zip: &mut ZipWriter<Cursor<Vec<u8>>>, name: &str, bytes: &[u8]) -> Result<()> {
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    zip.start_file(name, options)?;
    zip.write_all(bytes)?;
    Ok(())
}

fn styles_xml(brand: &Brand) -> String {
    format!(
        concat!(
            "{decl}<w:styles {ns}>",
            r#"<w:docDefaults><w:rPrDefault><w:rPr>"#,
            r#"<w:rFonts w:ascii="{font}" w:hAnsi="{font}" w:cs="{font}"/>"#,
            r#"<w:color w:val="{primary}"/><w:sz w:val="22"/><w:szCs w:val="22"/>"#,
            r#"</w:rPr></w:rPrDefault><w:pPrDefault><w:pPr>"#,
            r#"<w:spacing w:after="160" w:line="276" w:lineRule="auto"/>"#,
            r#"</w:pPr></w:pPrDefault></w:docDefaults>"#,
            r#"<w:style w:type="paragraph" w:default="1" w:styleId="Normal"><w:name w:val="Normal"/><w:qFormat/></w:style>"#,
            r#"<w:style w:type="paragraph" w:styleId="Title"><w:name w:val="Title"/><w:basedOn w:val="Normal"/>"#,
            r#"<w:next w:val="Normal"/><w:qFormat/><w:rPr><w:b/><w:color w:val="{primary}"/>"#,
            r#"<w:sz w:val="56"/><w:szCs w:val="56"/></w:rPr></w:style>"#,
            r#"<w:style w:type="paragraph" w:styleId="Heading1"><w:name w:val="heading 1"/><w:basedOn w:val="Normal"/>"#,
            r#"<w:next w:val="Normal"/><w:qFormat/><w:pPr><w:keepNext/><w:spacing w:before="360" w:after="120"/>"#,
            r#"<w:outlineLvl w:val="0"/></w:pPr><w:rPr><w:b/><w:color w:val="{accent}"/>"#,
            r#"<w:sz w:val="32"/><w:szCs w:val="32"/></w:rPr></w:style>"#,
            r#"<w:style w:type="paragraph" w:styleId="Heading2"><w:name w:val="heading 2"/><w:basedOn w:val="Normal"/>"#,
            r#"<w:next w:val="Normal"/><w:qFormat/><w:pPr><w:keepNext/><w:spacing w:before="120" w:after="120"/>"#,
            r#"<w:outlineLvl w:val="1"/></w:pPr><w:rPr><w:color w:val="{primary}"/>"#,
            r#"<w:sz w:val="26"/><w:szCs w:val="26"/></w:rPr></w:style>"#,
            r#"<w:style w:type="paragraph" w:styleId="Caption"><w:name w:val="caption"/><w:basedOn w:val="Normal"/>"#,
            r#"<w:qFormat/><w:pPr><w:jc w:val="center"/></w:pPr><w:rPr><w:i/><w:color w:val="{muted}"/>"#,
            r#"<w:sz w:val="18"/><w:szCs w:val="18"/></w:rPr></w:style>"#,
            "</w:styles>"
        ),
        decl = XML_DECLARATION,
        ns = NS_DECLARATIONS,
        font = brand.font,
        primary = brand.primary_color,
        accent = brand.accent_color,
        muted = brand.muted_color,
    )
}

fn core_properties_xml(metadata: &DocumentMetadata) -> String {
    let creator = non_blank(&metadata.author).unwrap_or_default();
    format!(
        concat!(
            "{decl}",
            r#"<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" "#,
            r#"xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:dcterms="http://purl.org/dc/terms/" "#,
            r#"xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">"#,
            "<dc:title>{title}</dc:title><dc:creator>{creator}</dc:creator>",
            r#"<dcterms:created xsi:type="dcterms:W3CDTF">{created}</dcterms:created>"#,
            "</cp:coreProperties>"
        ),
        decl = XML_DECLARATION,
        title = quick_xml::escape::escape(metadata.title.trim()),
        creator = quick_xml::escape::escape(creator),
        created = Utc::now().format("%Y-%m-%dT%H:%M:%SZ"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docx::fixtures::read_part;
    use crate::docx::media::tests::PNG_1X1_BASE64;
    use crate::docx::model::{ImageSource, PageLayouts};
    use crate::docx::{extract_body_paragraphs, extract_comments};

    fn request(title: &str) -> DocumentRequest {
        DocumentRequest {
            metadata: DocumentMetadata {
                title: title.to_string(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn heading(chapter: Option<&str>, title: &str, body: &str) -> ContentSection {
        ContentSection::Heading(SectionText {
            chapter: chapter.map(str::to_string),
            title: title.to_string(),
            subtitle: None,
            body: body.to_string(),
        })
    }

    fn text_image(title: &str, data: &str, caption: Option<&str>) -> ContentSection {
        ContentSection::TextImage {
            text: SectionText {
                title: title.to_string(),
                ..Default::default()
            },
            image: ImageSource::Inline {
                data: data.to_string(),
                mime_type: None,
            },
            caption: caption.map(str::to_string),
        }
    }

    #[test]
    fn test_suggested_filename() {
        assert_eq!(suggested_filename("Q3 Plan: Launch!"), "Q3_Plan__Launch_.docx");
        assert_eq!(suggested_filename("Brief"), "Brief.docx");
        assert_eq!(suggested_filename("   "), "document.docx");
    }

    #[test]
    fn test_rejects_missing_title() {
        let result = generate_document(&request("  "), &Brand::default());
        assert!(matches!(result, Err(DocxError::InvalidMetadata(_))));
    }

    #[test]
    fn test_rejects_out_of_range_toc_level() {
        let mut req = request("Plan");
        req.toc = vec![TocEntry {
            title: "Too deep".to_string(),
            level: 4,
            page: Some(3),
        }];
        let result = generate_document(&req, &Brand::default());
        assert!(matches!(result, Err(DocxError::InvalidMetadata(_))));
    }

    #[test]
    fn test_cover_omits_blank_metadata() {
        let mut req = request("Launch Plan");
        req.metadata.category = Some("Strategy".to_string());
        req.metadata.subtitle = Some("FY27".to_string());
        req.metadata.author = Some("Dana".to_string());
        req.metadata.version = Some("".to_string());
        req.metadata.confidential = true;

        let doc = generate_document(&req, &Brand::default()).unwrap();
        assert_eq!(doc.filename, "Launch_Plan.docx");

        let xml = read_part(&doc.bytes, "word/document.xml").unwrap();
        assert!(xml.contains("Confidential"));
        assert!(xml.contains("Strategy"));
        assert!(xml.contains("FY27"));
        assert!(xml.contains("Author: "));
        assert!(!xml.contains("Version: "));
        assert!(!xml.contains("Prepared For: "));

        let banner = xml.find("Confidential").unwrap();
        let category = xml.find("Strategy").unwrap();
        let title = xml.find("Launch Plan").unwrap();
        assert!(banner < category && category < title);
    }

    #[test]
    fn test_non_confidential_cover_has_no_banner() {
        let doc = generate_document(&request("Open Plan"), &Brand::default()).unwrap();
        let xml = read_part(&doc.bytes, "word/document.xml").unwrap();
        assert!(!xml.contains("Confidential"));
    }

    #[test]
    fn test_toc_levels_indent_with_dotted_leader() {
        let mut req = request("Plan");
        req.toc = vec![
            TocEntry { title: "Overview".to_string(), level: 1, page: Some(3) },
            TocEntry { title: "Goals".to_string(), level: 2, page: Some(4) },
            TocEntry { title: "Detail".to_string(), level: 3, page: None },
        ];

        let doc = generate_document(&req, &Brand::default()).unwrap();
        let xml = read_part(&doc.bytes, "word/document.xml").unwrap();
        assert!(xml.contains("Table of Contents"));
        assert_eq!(xml.matches(r#"w:leader="dot""#).count(), 3);
        assert!(xml.contains(r#"<w:ind w:left="0"/>"#));
        assert!(xml.contains(r#"<w:ind w:left="440"/>"#));
        assert!(xml.contains(r#"<w:ind w:left="880"/>"#));
        assert!(xml.contains(r#"<w:t xml:space="preserve">4</w:t>"#));

        // cover, toc and content each close their own section
        assert_eq!(xml.matches("<w:sectPr>").count(), 3);
    }

    #[test]
    fn test_no_toc_page_without_entries() {
        let doc = generate_document(&request("Plan"), &Brand::default()).unwrap();
        let xml = read_part(&doc.bytes, "word/document.xml").unwrap();
        assert!(!xml.contains("Table of Contents"));
        assert_eq!(xml.matches("<w:sectPr>").count(), 2);
    }

    #[test]
    fn test_heading_section_renders_chapter_and_paragraphs() {
        let mut req = request("Plan");
        req.sections = vec![heading(
            Some("01"),
            "Introduction",
            "First paragraph\nsame paragraph\n\n\nSecond **bold** paragraph",
        )];

        let doc = generate_document(&req, &Brand::default()).unwrap();
        let xml = read_part(&doc.bytes, "word/document.xml").unwrap();
        assert!(xml.contains(r#"<w:pStyle w:val="Heading1"/>"#));
        assert!(xml.contains("01  "));
        assert!(xml.contains(r#"<w:color w:val="E4572E"/></w:rPr><w:t xml:space="preserve">Introduction"#));

        let paragraphs = extract_body_paragraphs(&doc.bytes).unwrap();
        let start = paragraphs.iter().position(|p| p == "01  Introduction").unwrap();
        assert_eq!(
            &paragraphs[start + 1..],
            &["First paragraph\nsame paragraph", "Second bold paragraph"]
        );
        assert!(xml.contains(r#"<w:b/></w:rPr><w:t xml:space="preserve">bold</w:t>"#));
    }

    #[test]
    fn test_bad_image_is_skipped_not_fatal() {
        let mut req = request("Plan");
        req.sections = vec![
            text_image("Broken chart", "%%% not base64 %%%", Some("Figure 1")),
            heading(None, "After", "Still rendered"),
        ];

        let doc = generate_document(&req, &Brand::default()).unwrap();
        let xml = read_part(&doc.bytes, "word/document.xml").unwrap();
        assert!(xml.contains("Broken chart"));
        assert!(xml.contains("Still rendered"));
        assert!(!xml.contains("Figure 1"));
        assert!(!xml.contains("<w:drawing>"));
        assert!(read_part(&doc.bytes, "word/media/image1.png").is_none());
    }

    #[test]
    fn test_image_is_embedded_with_caption() {
        let mut req = request("Plan");
        req.sections = vec![text_image(
            "Chart",
            &format!("data:image/png;base64,{}", PNG_1X1_BASE64),
            Some("Figure 1"),
        )];

        let doc = generate_document(&req, &Brand::default()).unwrap();
        let xml = read_part(&doc.bytes, "word/document.xml").unwrap();
        assert!(xml.contains("<w:drawing>"));
        assert!(xml.contains(r#"<w:pStyle w:val="Caption"/>"#));

        let rels = read_part(&doc.bytes, "word/_rels/document.xml.rels").unwrap();
        assert!(rels.contains(r#"Target="media/image1.png""#));
        assert!(read_part(&doc.bytes, "word/media/image1.png").is_some());

        let types = read_part(&doc.bytes, "[Content_Types].xml").unwrap();
        assert!(types.contains(r#"<Default Extension="png" ContentType="image/png"/>"#));
    }

    #[test]
    fn test_missing_footer_config_uses_copyright_line() {
        let brand = Brand::new("Northwind");
        let doc = generate_document(&request("Plan"), &brand).unwrap();

        for footer in ["word/footer1.xml", "word/footer2.xml"] {
            let xml = read_part(&doc.bytes, footer).unwrap();
            assert!(xml.contains("Northwind. All rights reserved."), "{footer}");
        }
    }

    #[test]
    fn test_empty_footer_config_falls_back_to_default() {
        let mut req = request("Plan");
        req.layouts.content.footer = Some(FooterConfig {
            show_separator: true,
            ..Default::default()
        });

        let doc = generate_document(&req, &Brand::default()).unwrap();
        let xml = read_part(&doc.bytes, "word/footer2.xml").unwrap();
        assert!(xml.contains("All rights reserved."));
    }

    #[test]
    fn test_configured_footer_per_page_group() {
        let mut req = request("Plan");
        req.layouts = PageLayouts {
            cover: PageGroupLayout::default(),
            toc: PageGroupLayout::default(),
            content: PageGroupLayout {
                header: Some(HeaderConfig {
                    text: "Launch Plan".to_string(),
                    alignment: HeaderAlignment::Right,
                    show_separator: true,
                }),
                footer: Some(FooterConfig {
                    show_separator: true,
                    left: Some(FooterCell::Text { text: "Northwind".to_string() }),
                    center: Some(FooterCell::PageNumber),
                    right: Some(FooterCell::Image {
                        image: ImageSource::Inline {
                            data: PNG_1X1_BASE64.to_string(),
                            mime_type: Some("image/png".to_string()),
                        },
                    }),
                }),
            },
        };

        let doc = generate_document(&req, &Brand::default()).unwrap();

        let cover_footer = read_part(&doc.bytes, "word/footer1.xml").unwrap();
        assert!(cover_footer.contains("All rights reserved."));

        let footer = read_part(&doc.bytes, "word/footer2.xml").unwrap();
        assert!(footer.contains("<w:top "));
        assert!(footer.contains("Northwind"));
        assert!(footer.contains(r#"w:instr=" PAGE ""#));
        assert!(footer.contains(r#"w:instr=" NUMPAGES ""#));
        assert!(footer.contains("<w:drawing>"));
        assert!(!footer.contains("All rights reserved."));

        let footer_rels = read_part(&doc.bytes, "word/_rels/footer2.xml.rels").unwrap();
        assert!(footer_rels.contains("media/image1.png"));

        let header = read_part(&doc.bytes, "word/header2.xml").unwrap();
        assert!(header.contains("Launch Plan"));
        assert!(header.contains(r#"<w:jc w:val="right"/>"#));
    }

    #[test]
    fn test_generated_document_reads_back() {
        let mut req = request("Readable");
        req.sections = vec![ContentSection::Text {
            body: "Body text".to_string(),
        }];

        let doc = generate_document(&req, &Brand::default()).unwrap();
        let paragraphs = extract_body_paragraphs(&doc.bytes).unwrap();
        assert!(paragraphs.contains(&"Readable".to_string()));
        assert!(paragraphs.contains(&"Body text".to_string()));
        assert!(extract_comments(&doc.bytes).unwrap().is_empty());

        let core = read_part(&doc.bytes, "docProps/core.xml").unwrap();
        assert!(core.contains("<dc:title>Readable</dc:title>"));
    }

    #[test]
    fn test_inline_runs() {
        assert_eq!(inline_runs("a **b** c").len(), 3);
        assert_eq!(inline_runs("unbalanced ** marker").len(), 1);
        assert_eq!(split_paragraphs("\n\none\n\n\ntwo\nthree\n"), vec!["one", "two\nthree"]);
    }
}
