/// Directory-backed document store.
pub mod fs;

pub use fs::FsDocumentStore;
