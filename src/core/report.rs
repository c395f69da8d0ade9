use crate::core::template::fill_docx;
use crate::core::{ConfigProvider, DocumentConverter, ReportPipeline, Storage};
use crate::domain::model::{FuelKind, ReportData};
use crate::utils::error::{BotError, Result};

/// Template -> filled `.docx` -> PDF.
pub struct DocxReportPipeline<S: Storage, D: DocumentConverter, C: ConfigProvider> {
    storage: S,
    converter: D,
    config: C,
}

impl<S: Storage, D: DocumentConverter, C: ConfigProvider> DocxReportPipeline<S, D, C> {
    pub fn new(storage: S, converter: D, config: C) -> Self {
        Self {
            storage,
            converter,
            config,
        }
    }
}

#[async_trait::async_trait]
impl<S: Storage, D: DocumentConverter, C: ConfigProvider> ReportPipeline
    for DocxReportPipeline<S, D, C>
{
    async fn load_template(&self, kind: FuelKind) -> Result<Vec<u8>> {
        let file = self.config.template_file(kind.family());
        tracing::debug!(template = file, "loading template");
        self.storage.read_file(file).await.map_err(|e| match e {
            BotError::IoError(io) if io.kind() == std::io::ErrorKind::NotFound => {
                BotError::TemplateError {
                    message: format!(
                        "template {} not found in {}",
                        file,
                        self.config.templates_dir()
                    ),
                }
            }
            other => other,
        })
    }

    async fn render(&self, template: Vec<u8>, data: &ReportData) -> Result<Vec<u8>> {
        let data = data.clone();
        // Inflating and rewriting the archive is CPU work; keep it off the reactor.
        tokio::task::spawn_blocking(move || fill_docx(&template, &data))
            .await
            .map_err(|e| BotError::TemplateError {
                message: format!("template worker failed: {}", e),
            })?
    }

    async fn convert(&self, docx: Vec<u8>, stem: &str) -> Result<Vec<u8>> {
        self.converter.convert(docx, stem).await
    }
}
