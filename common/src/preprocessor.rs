// File Preprocessor. Normalizes an artifact into a pair
// {text evidence, image evidence}: decode-and-normalize via the `image`
// crate, with a minimal internal scanner for PDF text layers and DOCX raw
// text (via `zip`) rather than a second heavyweight document parser
// dependency.

use crate::errors::PreprocessError;
use crate::models::ProcessedArtifact;
use async_trait::async_trait;
use image::ImageFormat;
use std::io::Cursor;

/// Seam for a real OCR engine (e.g. a `tesseract`-backed crate). OCR is
/// best-effort: failure degrades to image-only evidence, it never
/// aborts the pipeline.
#[async_trait]
pub trait OcrEngine: Send + Sync {
    async fn recognize(&self, png_bytes: &[u8]) -> Result<String, PreprocessError>;
}

/// Deterministic stand-in sufficient to drive the router and validator in
/// tests. Derives a short synthetic transcript from coarse pixel statistics
/// rather than performing real recognition.
pub struct StubOcrEngine;

#[async_trait]
impl OcrEngine for StubOcrEngine {
    async fn recognize(&self, png_bytes: &[u8]) -> Result<String, PreprocessError> {
        let image = image::load_from_memory_with_format(png_bytes, ImageFormat::Png)
            .map_err(|e| PreprocessError::Ocr(e.to_string()))?;
        let gray = image.to_luma8();
        let mean: f64 = if gray.is_empty() {
            0.0
        } else {
            gray.pixels().map(|p| p.0[0] as f64).sum::<f64>() / gray.pixels().len() as f64
        };
        // A stand-in transcript: dark, busy images ("low mean") are reported
        // as containing less recognizable text, which is enough signal for
        // the router's OCR-confidence heuristic downstream.
        Ok(format!("scanned document (mean_luma={:.1})", mean))
    }
}

/// Seam for a full-fidelity PDF text extractor. The shipped scanner only
/// needs to detect "negligible text layer".
pub trait DocumentTextExtractor: Send + Sync {
    fn extract_text(&self, bytes: &[u8]) -> Result<String, PreprocessError>;
}

/// Scans for literal text runs inside PDF content streams: sequences
/// between `BT`/`ET` markers and parenthesized string operands of `Tj`/`TJ`.
/// This is not a full PDF parser; it is sufficient to tell a text-layer PDF
/// from a scanned-image PDF.
pub struct MinimalPdfTextExtractor;

impl DocumentTextExtractor for MinimalPdfTextExtractor {
    fn extract_text(&self, bytes: &[u8]) -> Result<String, PreprocessError> {
        let content = String::from_utf8_lossy(bytes);
        let mut text = String::new();
        let mut chars = content.char_indices().peekable();
        while let Some((_, c)) = chars.next() {
            if c != '(' {
                continue;
            }
            let mut run = String::new();
            for (_, c2) in chars.by_ref() {
                if c2 == ')' {
                    break;
                }
                if c2 == '\\' {
                    continue;
                }
                run.push(c2);
            }
            if run.chars().any(|c| c.is_alphanumeric()) {
                text.push_str(&run);
                text.push(' ');
            }
        }
        Ok(text)
    }
}

async fn preprocess_image(
    blob: &[u8],
    ocr: &dyn OcrEngine,
) -> Result<(String, Vec<u8>), PreprocessError> {
    let decoded =
        image::load_from_memory(blob).map_err(|e| PreprocessError::ImageDecode(e.to_string()))?;

    let mut png_bytes = Vec::new();
    decoded
        .write_to(&mut Cursor::new(&mut png_bytes), ImageFormat::Png)
        .map_err(|e| PreprocessError::ImageDecode(e.to_string()))?;

    // OCR is best-effort: a failure degrades to image-only evidence rather
    // than aborting the pipeline.
    let text = match ocr.recognize(&png_bytes).await {
        Ok(text) => text,
        Err(e) => {
            tracing::warn!(error = %e, "OCR failed, degrading to image-only evidence");
            String::new()
        }
    };

    Ok((text, png_bytes))
}

fn preprocess_docx(blob: &[u8]) -> Result<String, PreprocessError> {
    let cursor = Cursor::new(blob);
    let mut archive =
        zip::ZipArchive::new(cursor).map_err(|e| PreprocessError::ImageDecode(e.to_string()))?;

    let mut document_xml = String::new();
    {
        let mut entry = archive
            .by_name("word/document.xml")
            .map_err(|e| PreprocessError::ImageDecode(format!("missing document.xml: {e}")))?;
        std::io::Read::read_to_string(&mut entry, &mut document_xml)
            .map_err(|e| PreprocessError::ImageDecode(e.to_string()))?;
    }

    // Strip XML tags, keeping the text nodes; sufficient for raw text
    // extraction without pulling in a full XML/DOCX parser.
    let mut text = String::new();
    let mut in_tag = false;
    for c in document_xml.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => text.push(c),
            _ => {}
        }
    }
    Ok(text)
}

pub async fn preprocess(
    blob: &[u8],
    mime: &str,
    name: &str,
    ocr: &dyn OcrEngine,
) -> Result<ProcessedArtifact, PreprocessError> {
    match mime {
        "image/png" | "image/jpeg" | "image/jpg" | "image/webp" | "image/bmp" => {
            let (text, image_bytes) = preprocess_image(blob, ocr).await?;
            Ok(ProcessedArtifact {
                name: name.to_string(),
                mime: mime.to_string(),
                text: Some(text),
                image_bytes: Some(image_bytes),
            })
        }
        "application/pdf" => {
            let extractor = MinimalPdfTextExtractor;
            let text = extractor.extract_text(blob)?;
            Ok(ProcessedArtifact {
                name: name.to_string(),
                mime: mime.to_string(),
                text: Some(text),
                // The raw bytes are forwarded so the Vision backend can
                // ingest the PDF directly.
                image_bytes: Some(blob.to_vec()),
            })
        }
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => {
            let text = preprocess_docx(blob)?;
            Ok(ProcessedArtifact {
                name: name.to_string(),
                mime: mime.to_string(),
                text: Some(text),
                image_bytes: None,
            })
        }
        other => Err(PreprocessError::UnsupportedType(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pdf_scanner_extracts_parenthesized_text() {
        let content = b"BT (Monday) Tj (09:00-09:30) Tj ET";
        let extractor = MinimalPdfTextExtractor;
        let text = extractor.extract_text(content).unwrap();
        assert!(text.contains("Monday"));
        assert!(text.contains("09:00-09:30"));
    }

    #[test]
    fn pdf_scanner_on_negligible_text_layer_returns_empty() {
        let content = b"%PDF-1.4\n1 0 obj << /Type /XObject >> endobj";
        let extractor = MinimalPdfTextExtractor;
        let text = extractor.extract_text(content).unwrap();
        assert!(text.trim().is_empty());
    }

    #[tokio::test]
    async fn unsupported_mime_is_rejected() {
        let ocr = StubOcrEngine;
        let result = preprocess(b"data", "application/zip", "f.zip", &ocr).await;
        assert!(matches!(result, Err(PreprocessError::UnsupportedType(_))));
    }
}
