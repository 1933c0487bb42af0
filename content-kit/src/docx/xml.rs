//! WordprocessingML building blocks: runs, paragraphs, tables and drawings.
//!
//! Element order inside `w:rPr` / `w:pPr` follows the schema sequence;
//! Word refuses to open files that get it wrong.

use quick_xml::escape::escape;

pub(crate) const NS_DECLARATIONS: &str = concat!(
    r#"xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main" "#,
    r#"xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" "#,
    r#"xmlns:wp="http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing" "#,
    r#"xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" "#,
    r#"xmlns:pic="http://schemas.openxmlformats.org/drawingml/2006/picture""#
);

pub(crate) const XML_DECLARATION: &str =
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Align {
    Left,
    Center,
    Right,
}

impl Align {
    fn as_str(self) -> &'static str {
        match self {
            Align::Left => "left",
            Align::Center => "center",
            Align::Right => "right",
        }
    }
}

#[derive(Debug, Clone)]
enum RunKind {
    Text(String),
    Tab,
    Field(&'static str),
    Drawing(String),
}

/// A run of uniformly formatted content.
#[derive(Debug, Clone)]
pub(crate) struct Run {
    kind: RunKind,
    bold: bool,
    italic: bool,
    caps: bool,
    size: Option<u32>,
    color: Option<String>,
}

impl Run {
    fn new(kind: RunKind) -> Self {
        Self {
            kind,
            bold: false,
            italic: false,
            caps: false,
            size: None,
            color: None,
        }
    }

    /// Text run; embedded newlines become line breaks.
    pub(crate) fn text(text: impl Into<String>) -> Self {
        Self::new(RunKind::Text(text.into()))
    }

    pub(crate) fn tab() -> Self {
        Self::new(RunKind::Tab)
    }

    /// Simple field such as `PAGE` or `NUMPAGES`.
    pub(crate) fn field(instruction: &'static str) -> Self {
        Self::new(RunKind::Field(instruction))
    }

    pub(crate) fn drawing(xml: String) -> Self {
        Self::new(RunKind::Drawing(xml))
    }

    pub(crate) fn bold(mut self) -> Self {
        self.bold = true;
        self
    }

    pub(crate) fn bold_if(mut self, bold: bool) -> Self {
        self.bold = bold;
        self
    }

    pub(crate) fn italic(mut self) -> Self {
        self.italic = true;
        self
    }

    pub(crate) fn caps(mut self) -> Self {
        self.caps = true;
        self
    }

    /// Font size in half-points.
    pub(crate) fn size(mut self, half_points: u32) -> Self {
        self.size = Some(half_points);
        self
    }

    pub(crate) fn color(mut self, hex: &str) -> Self {
        self.color = Some(hex.trim_start_matches('#').to_string());
        self
    }

    fn properties(&self) -> String {
        let mut props = String::new();
        if self.bold {
            props.push_str("<w:b/>");
        }
        if self.italic {
            props.push_str("<w:i/>");
        }
        if self.caps {
            props.push_str("<w:caps/>");
        }
        if let Some(color) = &self.color {
            props.push_str(&format!(r#"<w:color w:val="{}"/>"#, escape(color)));
        }
        if let Some(size) = self.size {
            props.push_str(&format!(r#"<w:sz w:val="{size}"/><w:szCs w:val="{size}"/>"#));
        }
        if props.is_empty() {
            props
        } else {
            format!("<w:rPr>{props}</w:rPr>")
        }
    }

    fn write(&self, out: &mut String) {
        let props = self.properties();
        match &self.kind {
            RunKind::Text(text) => {
                out.push_str("<w:r>");
                out.push_str(&props);
                for (i, line) in text.split('\n').enumerate() {
                    if i > 0 {
                        out.push_str("<w:br/>");
                    }
                    out.push_str(r#"<w:t xml:space="preserve">"#);
                    out.push_str(&escape(line));
                    out.push_str("</w:t>");
                }
                out.push_str("</w:r>");
            }
            RunKind::Tab => {
                out.push_str(&format!("<w:r>{props}<w:tab/></w:r>"));
            }
            RunKind::Field(instruction) => {
                out.push_str(&format!(
                    r#"<w:fldSimple w:instr=" {instruction} "><w:r>{props}<w:t>1</w:t></w:r></w:fldSimple>"#
                ));
            }
            RunKind::Drawing(xml) => {
                out.push_str(&format!("<w:r>{props}{xml}</w:r>"));
            }
        }
    }
}

/// A paragraph with the handful of properties the brand templates use.
#[derive(Debug, Clone, Default)]
pub(crate) struct Paragraph {
    style: Option<&'static str>,
    keep_next: bool,
    border_top: Option<String>,
    border_bottom: Option<String>,
    shading: Option<String>,
    dotted_tab: Option<u32>,
    spacing: Option<(u32, u32)>,
    indent: Option<u32>,
    align: Option<Align>,
    section: Option<String>,
    runs: Vec<Run>,
}

impl Paragraph {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn style(mut self, style_id: &'static str) -> Self {
        self.style = Some(style_id);
        self
    }

    pub(crate) fn keep_next(mut self) -> Self {
        self.keep_next = true;
        self
    }

    pub(crate) fn border_top(mut self, color: &str) -> Self {
        self.border_top = Some(color.trim_start_matches('#').to_string());
        self
    }

    pub(crate) fn border_bottom(mut self, color: &str) -> Self {
        self.border_bottom = Some(color.trim_start_matches('#').to_string());
        self
    }

    pub(crate) fn shading(mut self, color: &str) -> Self {
        self.shading = Some(color.trim_start_matches('#').to_string());
        self
    }

    /// Right-aligned tab stop at `position` twips with a dotted leader.
    pub(crate) fn dotted_tab(mut self, position: u32) -> Self {
        self.dotted_tab = Some(position);
        self
    }

    /// Space before/after in twips.
    pub(crate) fn spacing(mut self, before: u32, after: u32) -> Self {
        self.spacing = Some((before, after));
        self
    }

    /// Left indent in twips.
    pub(crate) fn indent(mut self, twips: u32) -> Self {
        self.indent = Some(twips);
        self
    }

    pub(crate) fn align(mut self, align: Align) -> Self {
        self.align = Some(align);
        self
    }

    /// Ends the current section here; `sect_pr` is a complete `w:sectPr` element.
    pub(crate) fn section_break(mut self, sect_pr: String) -> Self {
        self.section = Some(sect_pr);
        self
    }

    pub(crate) fn run(mut self, run: Run) -> Self {
        self.runs.push(run);
        self
    }

    pub(crate) fn runs(mut self, runs: impl IntoIterator<Item = Run>) -> Self {
        self.runs.extend(runs);
        self
    }

    fn properties(&self) -> String {
        let mut props = String::new();
        if let Some(style) = self.style {
            props.push_str(&format!(r#"<w:pStyle w:val="{style}"/>"#));
        }
        if self.keep_next {
            props.push_str("<w:keepNext/>");
        }
        if self.border_top.is_some() || self.border_bottom.is_some() {
            props.push_str("<w:pBdr>");
            if let Some(color) = &self.border_top {
                props.push_str(&format!(
                    r#"<w:top w:val="single" w:sz="8" w:space="4" w:color="{}"/>"#,
                    escape(color)
                ));
            }
            if let Some(color) = &self.border_bottom {
                props.push_str(&format!(
                    r#"<w:bottom w:val="single" w:sz="12" w:space="4" w:color="{}"/>"#,
                    escape(color)
                ));
            }
            props.push_str("</w:pBdr>");
        }
        if let Some(color) = &self.shading {
            props.push_str(&format!(
                r#"<w:shd w:val="clear" w:color="auto" w:fill="{}"/>"#,
                escape(color)
            ));
        }
        if let Some(position) = self.dotted_tab {
            props.push_str(&format!(
                r#"<w:tabs><w:tab w:val="right" w:leader="dot" w:pos="{position}"/></w:tabs>"#
            ));
        }
        if let Some((before, after)) = self.spacing {
            props.push_str(&format!(r#"<w:spacing w:before="{before}" w:after="{after}"/>"#));
        }
        if let Some(indent) = self.indent {
            props.push_str(&format!(r#"<w:ind w:left="{indent}"/>"#));
        }
        if let Some(align) = self.align {
            props.push_str(&format!(r#"<w:jc w:val="{}"/>"#, align.as_str()));
        }
        if let Some(section) = &self.section {
            props.push_str(section);
        }
        if props.is_empty() {
            props
        } else {
            format!("<w:pPr>{props}</w:pPr>")
        }
    }

    pub(crate) fn write(&self, out: &mut String) {
        out.push_str("<w:p>");
        out.push_str(&self.properties());
        for run in &self.runs {
            run.write(out);
        }
        out.push_str("</w:p>");
    }

    pub(crate) fn to_xml(&self) -> String {
        let mut out = String::new();
        self.write(&mut out);
        out
    }
}

/// A borderless single-row table with equal-width cells.
pub(crate) fn layout_row(cells: &[Paragraph], total_width: u32) -> String {
    let count = u32::try_from(cells.len().max(1)).unwrap_or(1);
    let cell_width = total_width / count;

    let mut xml = String::from(
        r#"<w:tbl><w:tblPr><w:tblW w:w="5000" w:type="pct"/><w:tblLayout w:type="fixed"/></w:tblPr><w:tblGrid>"#,
    );
    for _ in cells {
        xml.push_str(&format!(r#"<w:gridCol w:w="{cell_width}"/>"#));
    }
    xml.push_str("</w:tblGrid><w:tr>");
    for cell in cells {
        xml.push_str(&format!(
            r#"<w:tc><w:tcPr><w:tcW w:w="{cell_width}" w:type="dxa"/></w:tcPr>"#
        ));
        cell.write(&mut xml);
        xml.push_str("</w:tc>");
    }
    xml.push_str("</w:tr></w:tbl>");
    xml
}

/// Inline picture referencing relationship `rel_id`, sized in EMU.
pub(crate) fn inline_drawing(rel_id: &str, doc_pr_id: u32, name: &str, cx: u64, cy: u64) -> String {
    let name = escape(name);
    format!(
        concat!(
            r#"<w:drawing><wp:inline distT="0" distB="0" distL="0" distR="0">"#,
            r#"<wp:extent cx="{cx}" cy="{cy}"/>"#,
            r#"<wp:docPr id="{id}" name="{name}"/>"#,
            r#"<wp:cNvGraphicFramePr><a:graphicFrameLocks noChangeAspect="1"/></wp:cNvGraphicFramePr>"#,
            r#"<a:graphic><a:graphicData uri="http://schemas.openxmlformats.org/drawingml/2006/picture">"#,
            r#"<pic:pic><pic:nvPicPr><pic:cNvPr id="{id}" name="{name}"/><pic:cNvPicPr/></pic:nvPicPr>"#,
            r#"<pic:blipFill><a:blip r:embed="{rel}"/><a:stretch><a:fillRect/></a:stretch></pic:blipFill>"#,
            r#"<pic:spPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="{cx}" cy="{cy}"/></a:xfrm>"#,
            r#"<a:prstGeom prst="rect"><a:avLst/></a:prstGeom></pic:spPr></pic:pic>"#,
            r#"</a:graphicData></a:graphic></wp:inline></w:drawing>"#
        ),
        cx = cx,
        cy = cy,
        id = doc_pr_id,
        name = name,
        rel = rel_id,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_escapes_and_breaks_lines() {
        let xml = Paragraph::new()
            .run(Run::text("a < b\nnext").bold().color("#FF0000"))
            .to_xml();
        assert_eq!(
            xml,
            concat!(
                r#"<w:p><w:r><w:rPr><w:b/><w:color w:val="FF0000"/></w:rPr>"#,
                r#"<w:t xml:space="preserve">a &lt; b</w:t><w:br/>"#,
                r#"<w:t xml:space="preserve">next</w:t></w:r></w:p>"#
            )
        );
    }

    #[test]
    fn test_paragraph_property_order() {
        let xml = Paragraph::new()
            .align(Align::Center)
            .indent(360)
            .spacing(120, 60)
            .dotted_tab(9000)
            .style("Heading1")
            .to_xml();
        let style = xml.find("w:pStyle").unwrap();
        let tabs = xml.find("w:tabs").unwrap();
        let spacing = xml.find("w:spacing").unwrap();
        let indent = xml.find("w:ind").unwrap();
        let jc = xml.find("w:jc").unwrap();
        assert!(style < tabs && tabs < spacing && spacing < indent && indent < jc);
    }

    #[test]
    fn test_layout_row_has_one_cell_per_paragraph() {
        let cells = vec![Paragraph::new(), Paragraph::new(), Paragraph::new()];
        let xml = layout_row(&cells, 9000);
        assert_eq!(xml.matches("<w:tc>").count(), 3);
        assert_eq!(xml.matches(r#"<w:gridCol w:w="3000"/>"#).count(), 3);
    }
}
