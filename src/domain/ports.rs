use crate::domain::model::{FuelFamily, FuelKind, Input, Keyboard, ReportData};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Duration;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn templates_dir(&self) -> &str;
    fn template_file(&self, family: FuelFamily) -> &str;
    fn converter_program(&self) -> &str;
    fn conversion_timeout(&self) -> Duration;
    fn max_concurrent_conversions(&self) -> usize;

    /// Parent of the per-conversion work directories; the system temp dir when unset.
    fn scratch_dir(&self) -> Option<&str> {
        None
    }

    fn template_path(&self, family: FuelFamily) -> PathBuf {
        PathBuf::from(self.templates_dir()).join(self.template_file(family))
    }
}

/// One chat message pulled from the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingMessage {
    pub update_id: i64,
    pub chat_id: i64,
    pub input: Input,
}

/// A poll result: the highest update id seen (messages may be fewer than
/// updates when some carry no chat message).
#[derive(Debug, Clone, Default)]
pub struct UpdateBatch {
    pub last_update_id: Option<i64>,
    pub messages: Vec<IncomingMessage>,
}

#[async_trait]
pub trait BotApi: Send + Sync {
    async fn get_updates(&self, offset: Option<i64>, timeout: Duration) -> Result<UpdateBatch>;
    async fn send_message(&self, chat_id: i64, text: &str, keyboard: Keyboard) -> Result<()>;
    async fn send_document(&self, chat_id: i64, file_name: &str, bytes: Vec<u8>) -> Result<()>;
}

#[async_trait]
pub trait DocumentConverter: Send + Sync {
    /// Converts `.docx` bytes to PDF bytes. `stem` names the intermediate files.
    async fn convert(&self, docx: Vec<u8>, stem: &str) -> Result<Vec<u8>>;
}

#[async_trait]
pub trait ReportPipeline: Send + Sync {
    async fn load_template(&self, kind: FuelKind) -> Result<Vec<u8>>;
    async fn render(&self, template: Vec<u8>, data: &ReportData) -> Result<Vec<u8>>;
    async fn convert(&self, docx: Vec<u8>, stem: &str) -> Result<Vec<u8>>;
}
