pub mod conversation;
pub mod dispatcher;
pub mod engine;
pub mod fields;
pub mod messages;
pub mod report;
pub mod template;

pub use crate::domain::model::{FuelKind, GeneratedReport, ReportData};
pub use crate::domain::ports::{
    BotApi, ConfigProvider, DocumentConverter, ReportPipeline, Storage,
};
pub use crate::utils::error::Result;
