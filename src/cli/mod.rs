pub mod changelog;
pub mod exemptions;
pub mod merge;
pub mod split;
pub mod sunset;
pub mod versions;
