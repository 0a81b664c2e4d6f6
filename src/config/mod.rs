mod settings;

pub use settings::{FetchConfig, Settings};
