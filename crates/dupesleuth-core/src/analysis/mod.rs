/// Analysis modules — post-scan algorithms over finished fingerprints.

pub mod duplicates;
pub mod file_types;
pub mod similarity;

pub use duplicates::{find_duplicates, reclaimable_bytes, DuplicateGroup};
pub use file_types::{
    categorise_extension, categorise_path, is_image_path, waste_by_category, CategoryWaste,
    FileCategory,
};
pub use similarity::{find_near_duplicates, find_similar_images, ImagePair, SimilarPair};
