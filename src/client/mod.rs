//! Desktop-side access to the relay: HTTP calls, gallery state, thumbnails.

pub mod api;
pub mod gallery;
pub mod thumbnails;

pub use api::{RelayClient, object_name_from_url};
pub use gallery::{ActivityLog, Gallery, GalleryEvent, GalleryState, Toast, ToastKind, is_image_url};
pub use thumbnails::{THUMBNAIL_SIZE, Thumbnail, make_thumbnail};
