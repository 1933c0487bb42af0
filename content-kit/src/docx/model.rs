use serde::{Deserialize, Serialize};

/// Cover-page metadata. Empty optional values are left off the cover.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentMetadata {
    pub title: String,
    pub subtitle: Option<String>,
    pub category: Option<String>,
    pub prepared_for: Option<String>,
    pub version: Option<String>,
    pub author: Option<String>,
    pub date: Option<String>,
    pub confidential: bool,
}

impl DocumentMetadata {
    /// Label/value pairs shown on the cover, in display order, blanks removed.
    pub fn cover_fields(&self) -> Vec<(&'static str, &str)> {
        [
            ("Prepared For", self.prepared_for.as_deref()),
            ("Version", self.version.as_deref()),
            ("Author", self.author.as_deref()),
            ("Date", self.date.as_deref()),
        ]
        .into_iter()
        .filter_map(|(label, value)| {
            value
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(|v| (label, v))
        })
        .collect()
    }
}

/// One line of the table of contents. Page numbers are caller-supplied.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TocEntry {
    pub title: String,
    #[serde(default = "default_toc_level")]
    pub level: u8,
    #[serde(default)]
    pub page: Option<u32>,
}

fn default_toc_level() -> u8 {
    1
}

/// Where an image comes from.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ImageSource {
    /// Base64 payload, optionally as a `data:` URL.
    Inline {
        data: String,
        #[serde(default)]
        mime_type: Option<String>,
    },
    /// Must be fetched and turned into [`ImageSource::Inline`] before generation.
    Remote { url: String },
}

/// Heading block shared by heading and text-image sections.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SectionText {
    pub chapter: Option<String>,
    pub title: String,
    pub subtitle: Option<String>,
    pub body: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ContentSection {
    Heading(SectionText),
    Text {
        body: String,
    },
    TextImage {
        #[serde(flatten)]
        text: SectionText,
        image: ImageSource,
        #[serde(default)]
        caption: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeaderAlignment {
    Left,
    #[default]
    Center,
    Right,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeaderConfig {
    pub text: String,
    #[serde(default)]
    pub alignment: HeaderAlignment,
    #[serde(default)]
    pub show_separator: bool,
}

/// Content of one footer cell.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum FooterCell {
    Text { text: String },
    /// "Page X of Y".
    PageNumber,
    Image { image: ImageSource },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FooterConfig {
    pub show_separator: bool,
    pub left: Option<FooterCell>,
    pub center: Option<FooterCell>,
    pub right: Option<FooterCell>,
}

impl FooterConfig {
    pub fn is_empty(&self) -> bool {
        self.left.is_none() && self.center.is_none() && self.right.is_none()
    }
}

/// Header and footer for one page group.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PageGroupLayout {
    pub header: Option<HeaderConfig>,
    pub footer: Option<FooterConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PageLayouts {
    pub cover: PageGroupLayout,
    pub toc: PageGroupLayout,
    pub content: PageGroupLayout,
}

/// Everything needed to render a branded document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentRequest {
    pub metadata: DocumentMetadata,
    #[serde(default)]
    pub toc: Vec<TocEntry>,
    #[serde(default)]
    pub sections: Vec<ContentSection>,
    #[serde(default)]
    pub layouts: PageLayouts,
}

/// A rendered document and the filename to offer it under.
#[derive(Debug, Clone)]
pub struct GeneratedDocument {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// Fixed brand palette; only the company name varies per deployment.
#[derive(Debug, Clone)]
pub struct Brand {
    pub company: String,
    pub font: &'static str,
    pub primary_color: &'static str,
    pub accent_color: &'static str,
    pub muted_color: &'static str,
}

impl Brand {
    pub fn new(company: impl Into<String>) -> Self {
        Self {
            company: company.into(),
            ..Self::default()
        }
    }
}

impl Default for Brand {
    fn default() -> Self {
        Self {
            company: "Content Studio".to_string(),
            font: "Calibri",
            primary_color: "1F2A44",
            accent_color: "E4572E",
            muted_color: "6B7280",
        }
    }
}
