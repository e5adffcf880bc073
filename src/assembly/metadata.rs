//! Metadata extensions
//!
//! Descriptive fields are read from an object's Dublin Core record and
//! technical image fields from FITS sidecars (`<file>.fits.xml`). Extraction
//! looks up element text by local name; namespaces are ignored.

use crate::batch::FileDescriptor;
use regex::Regex;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Suffix of the technical metadata sidecar written next to each image.
pub const FITS_SIDECAR_SUFFIX: &str = ".fits.xml";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DescriptiveMetadata {
    pub title: Option<String>,
    pub description: Option<String>,
    pub date: Option<String>,
    pub identifier: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImageTechnicalMetadata {
    pub source: String,
    pub md5_checksum: Option<String>,
    pub image_height: Option<u64>,
    pub image_width: Option<u64>,
    pub bits_per_sample: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MetadataExtension {
    Descriptive(DescriptiveMetadata),
    ImageTechnical(ImageTechnicalMetadata),
}

/// Text of the first element named `local_name`, in any namespace.
pub fn element_text(document: &str, local_name: &str) -> Option<String> {
    let name = regex::escape(local_name);
    let pattern = format!(
        r"(?s)<(?:[A-Za-z_][\w.-]*:)?{name}(?:\s[^>]*)?>(.*?)</(?:[A-Za-z_][\w.-]*:)?{name}\s*>"
    );
    let re = Regex::new(&pattern).ok()?;
    let text = re.captures(document)?.get(1)?.as_str().trim();
    if text.is_empty() {
        None
    } else {
        Some(unescape(text))
    }
}

fn unescape(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

pub fn parse_descriptive(document: &str) -> DescriptiveMetadata {
    DescriptiveMetadata {
        title: element_text(document, "title"),
        description: element_text(document, "description"),
        date: element_text(document, "date"),
        identifier: element_text(document, "identifier"),
    }
}

pub fn parse_image_technical(source: &str, document: &str) -> ImageTechnicalMetadata {
    ImageTechnicalMetadata {
        source: source.to_string(),
        md5_checksum: element_text(document, "md5checksum"),
        image_height: element_text(document, "imageHeight").and_then(|v| v.parse().ok()),
        image_width: element_text(document, "imageWidth").and_then(|v| v.parse().ok()),
        bits_per_sample: element_text(document, "bitsPerSample"),
    }
}

/// Location of the FITS sidecar for `file_path`.
pub fn fits_sidecar_path(file_path: &Path) -> PathBuf {
    let mut name = file_path.as_os_str().to_os_string();
    name.push(FITS_SIDECAR_SUFFIX);
    PathBuf::from(name)
}

pub fn read_descriptive(member: &FileDescriptor) -> Result<DescriptiveMetadata, String> {
    std::fs::read_to_string(&member.file_path)
        .map(|doc| parse_descriptive(&doc))
        .map_err(|e| format!("{}: cannot read descriptive metadata: {}", member.canonical_path, e))
}

/// Technical metadata from the sidecar of `member`. A missing sidecar is an
/// error string for the caller to record as a warning.
pub fn read_image_technical(member: &FileDescriptor) -> Result<ImageTechnicalMetadata, String> {
    let sidecar = fits_sidecar_path(&member.file_path);
    std::fs::read_to_string(&sidecar)
        .map(|doc| parse_image_technical(&member.canonical_path, &doc))
        .map_err(|e| {
            format!(
                "{}: no technical metadata at {}: {}",
                member.canonical_path,
                sidecar.display(),
                e
            )
        })
}
