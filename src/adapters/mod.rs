// Adapters layer: concrete implementations of the domain ports for external
// systems (Bot API over HTTP, LibreOffice, local template storage).

pub mod libreoffice;
pub mod storage;
pub mod telegram;
