//! Solar geometry: observation dates, the image selection record and the
//! heliographic coordinate transform used to place markers on the disk.

pub mod coords;
pub mod date;
pub mod selection;

pub use coords::LatLon;
pub use date::ImageDate;
pub use selection::ImageSelection;
