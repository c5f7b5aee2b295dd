pub mod gallery;
pub mod user;

pub use gallery::{GalleryItem, ImageUpload};
pub use user::{User, UserRecord};
