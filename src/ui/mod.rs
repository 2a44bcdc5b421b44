pub mod format;
pub mod report;
pub mod table;
