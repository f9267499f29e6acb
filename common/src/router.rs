// Complexity Router. Scores the preprocessed artifact on
// five weighted heuristic factors and recommends a backend. Deterministic
// for a given input.

use crate::models::{ComplexityAssessment, ComplexityLevel, ProcessedArtifact, RecommendedBackend};

const WEIGHT_OCR_CONFIDENCE: f32 = 0.25;
const WEIGHT_HANDWRITING: f32 = 0.30;
const WEIGHT_LAYOUT: f32 = 0.15;
const WEIGHT_SCANNED_PDF: f32 = 0.05;
const WEIGHT_IMAGE_QUALITY: f32 = 0.05;

/// Low-OCR-confidence heuristic: punctuation ratio, single-character-token
/// ratio, and vowel-less-word ratio, each contributing evidence that the
/// transcript is noisy rather than clean text.
fn ocr_confidence_factor(text: &str) -> (f32, Option<&'static str>) {
    if text.trim().is_empty() {
        return (1.0, Some("no OCR text recovered"));
    }

    let total_chars = text.chars().count().max(1);
    let punctuation_ratio =
        text.chars().filter(|c| c.is_ascii_punctuation()).count() as f32 / total_chars as f32;

    let words: Vec<&str> = text.split_whitespace().collect();
    let word_count = words.len().max(1);
    let single_char_ratio =
        words.iter().filter(|w| w.chars().count() == 1).count() as f32 / word_count as f32;
    let vowelless_ratio = words
        .iter()
        .filter(|w| {
            w.chars().count() > 1 && !w.chars().any(|c| "aeiouAEIOU".contains(c))
        })
        .count() as f32
        / word_count as f32;

    let factor = (punctuation_ratio + single_char_ratio + vowelless_ratio) / 3.0;
    if factor > 0.4 {
        (
            factor.min(1.0),
            Some("low OCR confidence: high punctuation/fragment ratio"),
        )
    } else {
        (factor.min(1.0), None)
    }
}

/// Handwriting heuristic: inconsistent capitalization mid-word combined
/// with glyphs OCR commonly confuses (`|`, `~`, backtick).
fn handwriting_factor(text: &str) -> (f32, Option<&'static str>) {
    let confusable = text.chars().filter(|c| matches!(c, '|' | '~' | '`')).count();
    let inconsistent_caps = text
        .split_whitespace()
        .filter(|w| {
            let mut saw_lower_then_upper = false;
            let mut seen_lower = false;
            for c in w.chars() {
                if c.is_lowercase() {
                    seen_lower = true;
                } else if c.is_uppercase() && seen_lower {
                    saw_lower_then_upper = true;
                }
            }
            saw_lower_then_upper
        })
        .count();

    let word_count = text.split_whitespace().count().max(1);
    let factor = ((confusable as f32 / 20.0) + (inconsistent_caps as f32 / word_count as f32))
        .min(1.0);

    if factor > 0.3 {
        (factor, Some("handwriting indicators: confusable glyphs or erratic capitalization"))
    } else {
        (factor, None)
    }
}

/// Complex-layout heuristic: short average line length suggests a dense
/// grid rather than prose, which is harder for the structured backend.
fn layout_factor(text: &str) -> (f32, Option<&'static str>) {
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    if lines.is_empty() {
        return (0.0, None);
    }
    let avg_len: f32 =
        lines.iter().map(|l| l.chars().count() as f32).sum::<f32>() / lines.len() as f32;

    if avg_len < 15.0 {
        (1.0, Some("complex layout: short average line length"))
    } else if avg_len < 30.0 {
        (0.5, None)
    } else {
        (0.0, None)
    }
}

fn scanned_pdf_factor(mime: &str, text: &str) -> (f32, Option<&'static str>) {
    if mime == "application/pdf" && text.trim().len() < 20 {
        (1.0, Some("scanned PDF: negligible text layer"))
    } else {
        (0.0, None)
    }
}

/// Image-quality heuristic: mean run-length of identical
/// adjacent pixel rows, a crude blur/flatness signal computed over the
/// normalized PNG bytes when present.
fn image_quality_factor(image_bytes: Option<&[u8]>) -> (f32, Option<&'static str>) {
    let Some(bytes) = image_bytes else {
        return (0.0, None);
    };
    let Ok(decoded) = image::load_from_memory(bytes) else {
        return (0.0, None);
    };
    let gray = decoded.to_luma8();
    let (width, height) = gray.dimensions();
    if height < 2 {
        return (0.0, None);
    }

    let mut identical_rows = 0u32;
    for y in 1..height {
        let mut identical = true;
        for x in 0..width {
            if gray.get_pixel(x, y) != gray.get_pixel(x, y - 1) {
                identical = false;
                break;
            }
        }
        if identical {
            identical_rows += 1;
        }
    }

    let run_ratio = identical_rows as f32 / (height - 1) as f32;
    if run_ratio > 0.5 {
        (run_ratio, Some("image quality: high proportion of flat/repeated rows"))
    } else {
        (0.0, None)
    }
}

pub fn classify(artifact: &ProcessedArtifact) -> ComplexityAssessment {
    let text = artifact.text_or_empty();
    let mut reasons = Vec::new();

    let (ocr, ocr_reason) = ocr_confidence_factor(text);
    let (handwriting, handwriting_reason) = handwriting_factor(text);
    let (layout, layout_reason) = layout_factor(text);
    let (scanned_pdf, scanned_reason) = scanned_pdf_factor(&artifact.mime, text);
    let (image_quality, image_reason) = image_quality_factor(artifact.image_bytes.as_deref());

    for reason in [
        ocr_reason,
        handwriting_reason,
        layout_reason,
        scanned_reason,
        image_reason,
    ]
    .into_iter()
    .flatten()
    {
        reasons.push(reason.to_string());
    }

    let score = ocr * WEIGHT_OCR_CONFIDENCE
        + handwriting * WEIGHT_HANDWRITING
        + layout * WEIGHT_LAYOUT
        + scanned_pdf * WEIGHT_SCANNED_PDF
        + image_quality * WEIGHT_IMAGE_QUALITY;

    let level = if score < 0.30 {
        ComplexityLevel::Simple
    } else if score < 0.60 {
        ComplexityLevel::Medium
    } else {
        ComplexityLevel::Complex
    };

    let handwriting_present = handwriting > 0.3;
    let recommended = match level {
        ComplexityLevel::Simple if !handwriting_present => RecommendedBackend::Structured,
        ComplexityLevel::Medium if !handwriting_present => RecommendedBackend::Hybrid,
        _ => RecommendedBackend::Vision,
    };

    ComplexityAssessment {
        level,
        score,
        reasons,
        recommended,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn artifact(text: &str, mime: &str) -> ProcessedArtifact {
        ProcessedArtifact {
            name: "f".into(),
            mime: mime.into(),
            text: Some(text.into()),
            image_bytes: None,
        }
    }

    #[test]
    fn clean_typed_grid_is_simple_and_structured() {
        let text = "Monday 09:00-09:30 Maths\nTuesday 10:00-10:30 English\n";
        let assessment = classify(&artifact(text, "image/png"));
        assert_eq!(assessment.level, ComplexityLevel::Simple);
        assert_eq!(assessment.recommended, RecommendedBackend::Structured);
    }

    #[test]
    fn empty_text_is_complex_and_vision() {
        let assessment = classify(&artifact("", "image/png"));
        assert_eq!(assessment.level, ComplexityLevel::Complex);
        assert_eq!(assessment.recommended, RecommendedBackend::Vision);
    }

    #[test]
    fn scanned_pdf_with_no_text_layer_leans_complex() {
        let assessment = classify(&artifact("", "application/pdf"));
        assert!(assessment.reasons.iter().any(|r| r.contains("scanned PDF")));
    }
}
