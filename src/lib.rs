pub mod app;

pub mod catalog;

pub mod records;

pub mod test_helpers;

pub type Result<T, E = anyhow::Error> = std::result::Result<T, E>;
