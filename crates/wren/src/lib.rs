//
// lib.rs
//
// Library root shared by the binary, benchmarks, and integration tests
//

pub mod backend;
pub mod builtins;
pub mod completion_context;
pub mod cross_file;
pub mod document;
pub mod document_store;
pub mod handlers;
pub mod parser_pool;
pub mod sassdoc;
pub mod state;
pub mod syntax;
// test_utils is available in test builds and when the `test-support` feature is enabled.
#[cfg(any(test, feature = "test-support"))]
pub mod test_utils;
pub mod utf16;
