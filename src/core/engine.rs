use crate::core::ReportPipeline;
use crate::domain::model::{FuelKind, GeneratedReport, ReportData};
use crate::utils::error::Result;
use crate::utils::monitor::SystemMonitor;

pub struct ReportEngine<P: ReportPipeline> {
    pipeline: P,
    monitor: SystemMonitor,
}

impl<P: ReportPipeline> ReportEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self::new_with_monitoring(pipeline, false)
    }

    pub fn new_with_monitoring(pipeline: P, monitor_enabled: bool) -> Self {
        Self {
            pipeline,
            monitor: SystemMonitor::new(monitor_enabled),
        }
    }

    pub async fn generate(&self, kind: FuelKind, data: &ReportData) -> Result<GeneratedReport> {
        let stem = report_stem(kind, data);
        tracing::info!(report = %stem, "generating report");
        self.monitor.log_stats("start");

        let template = self.pipeline.load_template(kind).await?;
        tracing::debug!(bytes = template.len(), "template loaded");

        let docx = self.pipeline.render(template, data).await?;
        tracing::debug!(bytes = docx.len(), "template rendered");
        self.monitor.log_stats("rendered");

        let pdf = self.pipeline.convert(docx, &stem).await?;
        self.monitor.log_stats("converted");
        tracing::info!(report = %stem, bytes = pdf.len(), "report ready");

        Ok(GeneratedReport {
            file_name: format!("{}.pdf", stem),
            pdf,
        })
    }
}

/// `<FUEL>_<NAME>_<NUMBER>`, reduced to characters safe in file names.
pub fn report_stem(kind: FuelKind, data: &ReportData) -> String {
    let parts = [
        kind.fuel_label(),
        data.get("NAME").unwrap_or("VESSEL"),
        data.get("NUMBER").unwrap_or("000000"),
    ];
    let joined = parts.join("_");

    let mut stem = String::with_capacity(joined.len());
    let mut last_was_sep = false;
    for ch in joined.chars() {
        if ch.is_alphanumeric() {
            stem.push(ch);
            last_was_sep = false;
        } else if !last_was_sep {
            stem.push('_');
            last_was_sep = true;
        }
    }
    stem.trim_matches('_').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::HfoGrade;
    use crate::utils::error::BotError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StagedPipeline {
        fail_convert: bool,
        calls: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl ReportPipeline for StagedPipeline {
        async fn load_template(&self, _kind: FuelKind) -> Result<Vec<u8>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(b"template".to_vec())
        }

        async fn render(&self, template: Vec<u8>, data: &ReportData) -> Result<Vec<u8>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut out = template;
            out.extend_from_slice(data.get("NAME").unwrap_or_default().as_bytes());
            Ok(out)
        }

        async fn convert(&self, docx: Vec<u8>, _stem: &str) -> Result<Vec<u8>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_convert {
                return Err(BotError::ConversionError {
                    message: "exit status 1".to_string(),
                });
            }
            Ok(docx)
        }
    }

    fn sample_data() -> ReportData {
        [("NAME", "SEA BREEZE"), ("NUMBER", "280525")]
            .into_iter()
            .collect()
    }

    #[test]
    fn test_report_stem() {
        assert_eq!(
            report_stem(FuelKind::Mdo, &sample_data()),
            "LSMGO_DMA_SEA_BREEZE_280525"
        );
        let odd: ReportData = [("NAME", "../M/V \"Ω\""), ("NUMBER", "123456")]
            .into_iter()
            .collect();
        assert_eq!(
            report_stem(FuelKind::Hfo(HfoGrade::Rmg380), &odd),
            "LSFO_RMG_380_M_V_Ω_123456"
        );
    }

    #[tokio::test]
    async fn test_generate_runs_all_stages() {
        let engine = ReportEngine::new(StagedPipeline {
            fail_convert: false,
            calls: AtomicUsize::new(0),
        });
        let report = engine.generate(FuelKind::Mdo, &sample_data()).await.unwrap();

        assert_eq!(report.file_name, "LSMGO_DMA_SEA_BREEZE_280525.pdf");
        assert_eq!(report.pdf, b"templateSEA BREEZE");
        assert_eq!(engine.pipeline.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_generate_propagates_stage_errors() {
        let engine = ReportEngine::new_with_monitoring(
            StagedPipeline {
                fail_convert: true,
                calls: AtomicUsize::new(0),
            },
            false,
        );
        let err = engine
            .generate(FuelKind::Mdo, &sample_data())
            .await
            .unwrap_err();
        assert!(matches!(err, BotError::ConversionError { .. }));
    }
}
