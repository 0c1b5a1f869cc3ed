//! Figures for classifier evaluation: confusion matrices and scored image galleries.

pub mod colormap;
pub mod confusion;
pub mod gallery;

pub use confusion::{render_confusion_matrix, ConfusionInput};
pub use gallery::{render_gallery, GalleryRecord, DEFAULT_LABELS};
