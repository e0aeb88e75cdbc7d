pub mod change_record;
pub mod changelog;
pub mod config;
pub mod document;
pub mod exemption;
pub mod extension;
pub mod metadata;
pub mod version;

pub use change_record::{ChangeRecord, Severity};
pub use changelog::{Change, ChangeType, Changelog, ChangelogStore, Entry, PathEntry, VersionEntry};
pub use config::{ConfigurationError, OasplitConfig, OutputFormat};
pub use exemption::{load_exemptions, Exemption};
pub use extension::{ExtensionTypeError, Extensions};
pub use metadata::Metadata;
pub use version::{StabilityLevel, Version, VersionParseError};
