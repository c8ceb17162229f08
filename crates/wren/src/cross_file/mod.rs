//
// cross_file/mod.rs
//
// Cross-document awareness: module links, workspace scanning, and
// name resolution across the module graph
//

pub mod config;
pub mod content_provider;
pub mod path_resolve;
pub mod resolver;
pub mod revalidation;
pub mod scanner;
pub mod types;



pub use config::*;
pub use content_provider::*;
pub use resolver::*;
pub use revalidation::*;
pub use scanner::*;
pub use types::*;
