pub mod audio;
pub mod catalog;
pub mod config;
pub mod driver;
pub mod graphics;
pub mod notify;
pub mod player;

#[cfg(test)]
pub(crate) mod testing;
