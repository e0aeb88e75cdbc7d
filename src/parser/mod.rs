pub mod changes;
pub mod document;

pub use changes::{load_change_records, parse_change_records};
pub use document::{
    load_document, load_split_documents, normalize_content, parse_document, render_document, save_document,
    split_file_version,
};
