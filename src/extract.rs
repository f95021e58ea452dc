use std::path::Path;

use crate::error::{FlowChatError, Result};
use crate::pdf;

/// Pending text stored for uploads no extraction path recognizes. Still
/// sendable, so the agent sees that something arrived.
pub const UNSUPPORTED_PLACEHOLDER: &str = "[Unsupported file format]";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    Text,
    Csv,
    Pdf,
    Image,
}

impl UploadKind {
    pub fn from_filename(filename: &str) -> Option<Self> {
        let ext = Path::new(filename)
            .extension()?
            .to_str()?
            .to_ascii_lowercase();
        match ext.as_str() {
            "txt" => Some(Self::Text),
            "csv" => Some(Self::Csv),
            "pdf" => Some(Self::Pdf),
            "png" | "jpg" | "jpeg" => Some(Self::Image),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Csv => "csv",
            Self::Pdf => "pdf",
            Self::Image => "image",
        }
    }
}

/// Decodes an uploaded artifact into the text that will be transmitted.
/// Images have no extraction path; only their filename travels upstream.
pub fn extract_text(kind: UploadKind, data: &[u8]) -> Result<String> {
    match kind {
        UploadKind::Text => std::str::from_utf8(data)
            .map(str::to_string)
            .map_err(|e| unsupported(format!("text file is not valid UTF-8: {e}"))),
        UploadKind::Csv => normalize_csv(data),
        UploadKind::Pdf => pdf::extract_text(data),
        UploadKind::Image => Err(unsupported(
            "images carry no extractable text".to_string(),
        )),
    }
}

/// Parses and re-serializes the CSV so the agent receives a normalized
/// table regardless of the source's quoting or line endings.
fn normalize_csv(data: &[u8]) -> Result<String> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(data);
    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .from_writer(Vec::new());

    let headers = reader.headers().map_err(csv_err)?.clone();
    writer.write_record(&headers).map_err(csv_err)?;
    for record in reader.records() {
        let record = record.map_err(csv_err)?;
        writer.write_record(&record).map_err(csv_err)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| unsupported(format!("CSV write failed: {e}")))?;
    String::from_utf8(bytes).map_err(|e| unsupported(format!("CSV is not valid UTF-8: {e}")))
}

fn csv_err(err: csv::Error) -> FlowChatError {
    unsupported(format!("CSV parse failed: {err}"))
}

fn unsupported(detail: String) -> FlowChatError {
    FlowChatError::UnsupportedFormat(detail)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_known_extensions() {
        assert_eq!(UploadKind::from_filename("notes.txt"), Some(UploadKind::Text));
        assert_eq!(UploadKind::from_filename("orders.csv"), Some(UploadKind::Csv));
        assert_eq!(UploadKind::from_filename("manual.pdf"), Some(UploadKind::Pdf));
        assert_eq!(UploadKind::from_filename("cat.png"), Some(UploadKind::Image));
        assert_eq!(UploadKind::from_filename("cat.jpeg"), Some(UploadKind::Image));
    }

    #[test]
    fn classification_is_case_insensitive() {
        assert_eq!(UploadKind::from_filename("PHOTO.JPG"), Some(UploadKind::Image));
        assert_eq!(UploadKind::from_filename("Notes.TXT"), Some(UploadKind::Text));
    }

    #[test]
    fn unknown_extensions_are_unrecognized() {
        assert_eq!(UploadKind::from_filename("archive.zip"), None);
        assert_eq!(UploadKind::from_filename("README"), None);
    }

    #[test]
    fn txt_decodes_verbatim() {
        let text = extract_text(UploadKind::Text, b"Hello").unwrap();
        assert_eq!(text, "Hello");
    }

    #[test]
    fn invalid_utf8_txt_is_rejected() {
        let err = extract_text(UploadKind::Text, &[0xff, 0xfe, 0x00]).unwrap_err();
        assert!(matches!(err, FlowChatError::UnsupportedFormat(_)));
        assert!(err.to_string().contains("UTF-8"));
    }

    #[test]
    fn csv_is_normalized() {
        let text = extract_text(UploadKind::Csv, b"a,b\r\n\"1\",2\r\n").unwrap();
        assert_eq!(text, "a,b\n1,2\n");
    }

    #[test]
    fn csv_quotes_fields_that_need_it() {
        let text = extract_text(UploadKind::Csv, b"name,note\nAda,\"likes, commas\"\n").unwrap();
        assert_eq!(text, "name,note\nAda,\"likes, commas\"\n");
    }

    #[test]
    fn images_have_no_text_path() {
        let err = extract_text(UploadKind::Image, &[0x89, 0x50]).unwrap_err();
        assert!(matches!(err, FlowChatError::UnsupportedFormat(_)));
    }
}
