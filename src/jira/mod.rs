pub mod adf;
pub mod extractor;
pub mod field_detect;
pub mod field_value;
pub mod mapping;
pub mod search;

pub use extractor::JiraExtractor;
pub use mapping::ProjectMappingTable;
pub use search::SearchTarget;
