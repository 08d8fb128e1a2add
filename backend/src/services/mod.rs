pub mod drafts;
pub mod files;
pub mod merge;
pub mod validation;
