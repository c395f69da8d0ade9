pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;
pub use config::{BotConfig, TomlConfig};

pub use adapters::{
    libreoffice::LibreOfficeConverter, storage::LocalStorage, telegram::TelegramClient,
};
pub use core::{
    conversation::Conversation,
    dispatcher::{Dispatcher, DispatcherSettings},
    engine::ReportEngine,
    report::DocxReportPipeline,
};
pub use utils::error::{BotError, Result};
