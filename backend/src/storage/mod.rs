pub mod temp_media;

pub use temp_media::{StorageError, TempMedia};
