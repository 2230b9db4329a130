pub mod model;
pub mod store;

pub use model::{Algorithm, Color, SCALE_DEFAULT, Settings};
pub use store::{JsonFileStore, MemoryStore, SettingsStore, load_settings};
