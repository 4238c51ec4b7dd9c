pub mod saver;

pub use saver::DirectorySaver;
