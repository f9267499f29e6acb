// Extraction Orchestrator. Glues the Complexity Router,
// the three Extraction Backends, and the Timeline Validator into the single
// "classify -> extract -> (fallback) -> validate" algorithm a job runs
// through between being dequeued and stored.

use crate::config::PipelineConfig;
use crate::errors::ExtractorError;
use crate::extractors::{StructuredExtractor, VisionExtractor};
use crate::models::{
    ComplexityLevel, ExtractedTimetable, ExtractionMethod, JobMetadataHint, OrchestratorOutcome,
    ProcessedArtifact, RecommendedBackend,
};
use crate::router;
use crate::validator;
use std::sync::Arc;
use std::time::Instant;

pub struct Orchestrator {
    structured: Arc<dyn StructuredExtractor>,
    vision: Arc<dyn VisionExtractor>,
    config: PipelineConfig,
}

impl Orchestrator {
    pub fn new(
        structured: Arc<dyn StructuredExtractor>,
        vision: Arc<dyn VisionExtractor>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            structured,
            vision,
            config,
        }
    }

    /// Runs one job's artifact through the full extraction algorithm
    ///: classify, select a path, extract, fall back to vision once on
    /// failure if enabled, then validate when `validate_output` is set.
    #[tracing::instrument(skip_all)]
    pub async fn run(
        &self,
        artifact: &ProcessedArtifact,
        hint: &JobMetadataHint,
    ) -> Result<OrchestratorOutcome, ExtractorError> {
        let started = Instant::now();
        let assessment = router::classify(artifact);
        let method = self.select_method(assessment.recommended);

        let (mut data, method, complexity) = match self.run_method(method, artifact, hint).await {
            Ok(data) => (data, method, assessment.level),
            Err(err) if self.config.vision_fallback_enabled && method != ExtractionMethod::Vision => {
                tracing::warn!(
                    error = %err,
                    %method,
                    "extraction failed, retrying once with vision backend"
                );
                // A primary-extraction failure reclassifies the job as
                // complex regardless of what the router originally said.
                let mut fallback = self.vision.extract(artifact, hint, false).await?;
                fallback
                    .warnings
                    .push("primary extraction failed".to_string());
                (fallback, ExtractionMethod::VisionErrorFallback, ComplexityLevel::Complex)
            }
            Err(err) => return Err(err),
        };

        if self.config.validate_output {
            data = validator::validate(data);
        }

        Ok(OrchestratorOutcome {
            data,
            method,
            complexity,
            elapsed_ms: started.elapsed().as_millis() as u64,
        })
    }

    /// Maps the router's recommendation onto an actually-available method,
    /// respecting the `structured_enabled`/`hybrid_enabled` flags. Vision is
    /// never gated off; it is the backend of last resort.
    fn select_method(&self, recommended: RecommendedBackend) -> ExtractionMethod {
        match recommended {
            RecommendedBackend::Vision => ExtractionMethod::Vision,
            RecommendedBackend::Structured => {
                if self.config.structured_enabled {
                    ExtractionMethod::Structured
                } else if self.config.hybrid_enabled {
                    ExtractionMethod::Hybrid
                } else {
                    ExtractionMethod::Vision
                }
            }
            RecommendedBackend::Hybrid => {
                if self.config.hybrid_enabled {
                    ExtractionMethod::Hybrid
                } else if self.config.structured_enabled {
                    ExtractionMethod::Structured
                } else {
                    ExtractionMethod::Vision
                }
            }
        }
    }

    async fn run_method(
        &self,
        method: ExtractionMethod,
        artifact: &ProcessedArtifact,
        hint: &JobMetadataHint,
    ) -> Result<ExtractedTimetable, ExtractorError> {
        match method {
            ExtractionMethod::Structured => self.structured.extract(artifact, hint).await,
            ExtractionMethod::Vision | ExtractionMethod::VisionErrorFallback => {
                self.vision.extract(artifact, hint, false).await
            }
            ExtractionMethod::Hybrid => {
                let structured_result = self.structured.extract(artifact, hint).await?;
                match self.vision.extract(artifact, hint, true).await {
                    Ok(vision_result) => Ok(vision_result),
                    Err(err) => {
                        tracing::warn!(
                            error = %err,
                            "vision cross-check failed in hybrid mode, falling back to structured-only result"
                        );
                        Ok(structured_result)
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractors::{RegexStructuredExtractor, StubVisionExtractor};
    use async_trait::async_trait;

    fn artifact(text: &str) -> ProcessedArtifact {
        ProcessedArtifact {
            name: "f".into(),
            mime: "image/png".into(),
            text: Some(text.into()),
            image_bytes: None,
        }
    }

    #[tokio::test]
    async fn clean_text_runs_structured_path() {
        let orchestrator = Orchestrator::new(
            Arc::new(RegexStructuredExtractor),
            Arc::new(StubVisionExtractor),
            PipelineConfig::default(),
        );
        let text = "Monday 09:00-09:30 Maths\nTuesday 10:00-10:30 English\n";
        let outcome = orchestrator
            .run(&artifact(text), &JobMetadataHint::default())
            .await
            .unwrap();
        assert_eq!(outcome.method, ExtractionMethod::Structured);
    }

    #[tokio::test]
    async fn structured_failure_falls_back_to_vision_once() {
        struct FailingStructured;
        #[async_trait]
        impl StructuredExtractor for FailingStructured {
            async fn extract(
                &self,
                _artifact: &ProcessedArtifact,
                _hint: &JobMetadataHint,
            ) -> Result<ExtractedTimetable, ExtractorError> {
                Err(ExtractorError::Structured("simulated failure".into()))
            }
        }

        let orchestrator = Orchestrator::new(
            Arc::new(FailingStructured),
            Arc::new(StubVisionExtractor),
            PipelineConfig::default(),
        );
        let text = "Monday 09:00-09:30 Maths\n";
        let outcome = orchestrator
            .run(&artifact(text), &JobMetadataHint::default())
            .await
            .unwrap();
        assert_eq!(outcome.method, ExtractionMethod::VisionErrorFallback);
    }

    #[tokio::test]
    async fn disabling_fallback_propagates_the_error() {
        struct FailingStructured;
        #[async_trait]
        impl StructuredExtractor for FailingStructured {
            async fn extract(
                &self,
                _artifact: &ProcessedArtifact,
                _hint: &JobMetadataHint,
            ) -> Result<ExtractedTimetable, ExtractorError> {
                Err(ExtractorError::Structured("simulated failure".into()))
            }
        }

        let mut config = PipelineConfig::default();
        config.vision_fallback_enabled = false;
        let orchestrator = Orchestrator::new(
            Arc::new(FailingStructured),
            Arc::new(StubVisionExtractor),
            config,
        );
        let text = "Monday 09:00-09:30 Maths\n";
        let result = orchestrator
            .run(&artifact(text), &JobMetadataHint::default())
            .await;
        assert!(result.is_err());
    }
}
