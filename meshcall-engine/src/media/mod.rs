mod devices;
mod local_media;
mod synthetic;
mod track;

pub use devices::*;
pub use local_media::*;
pub use synthetic::*;
pub use track::*;
