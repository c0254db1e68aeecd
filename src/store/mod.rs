pub mod index_store;
pub mod models;
pub mod schema;

pub use index_store::{IndexStore, Posting, SongRecord};
pub use models::Song;
