/// Extension-based file categorisation.
///
/// Used twice: the scanner asks [`is_image_path`] whether a file is worth a
/// perceptual hash, and reports break duplicate waste down by
/// [`FileCategory`].
use crate::analysis::DuplicateGroup;
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;

/// Broad file categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FileCategory {
    Documents,
    Images,
    Video,
    Audio,
    Archives,
    Code,
    Executables,
    System,
    Other,
}

impl FileCategory {
    pub fn label(self) -> &'static str {
        match self {
            Self::Documents => "Documents",
            Self::Images => "Images",
            Self::Video => "Video",
            Self::Audio => "Audio",
            Self::Archives => "Archives",
            Self::Code => "Code",
            Self::Executables => "Executables",
            Self::System => "System",
            Self::Other => "Other",
        }
    }
}

/// Wasted bytes attributable to one category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryWaste {
    pub category: FileCategory,
    pub wasted_bytes: u64,
    pub redundant_files: u64,
}

/// Longest extension worth matching; anything longer is `Other`.
const MAX_EXT_LEN: usize = 16;

/// Lowercase `ext` into `buf` without allocating. `None` when too long.
fn lowercase_ext<'a>(ext: &str, buf: &'a mut [u8; MAX_EXT_LEN]) -> Option<&'a str> {
    let bytes = ext.as_bytes();
    if bytes.len() > MAX_EXT_LEN {
        return None;
    }
    for (dest, &src) in buf.iter_mut().zip(bytes) {
        *dest = src.to_ascii_lowercase();
    }
    std::str::from_utf8(&buf[..bytes.len()]).ok()
}

/// Categorise a file extension (without the dot), case-insensitively.
pub fn categorise_extension(ext: &str) -> FileCategory {
    let mut buf = [0u8; MAX_EXT_LEN];
    let Some(lower) = lowercase_ext(ext, &mut buf) else {
        return FileCategory::Other;
    };

    match lower {
        "doc" | "docx" | "pdf" | "txt" | "rtf" | "odt" | "xls" | "xlsx" | "ppt" | "pptx"
        | "csv" | "md" | "epub" => FileCategory::Documents,
        "jpg" | "jpeg" | "png" | "gif" | "bmp" | "svg" | "webp" | "ico" | "tiff" | "tif"
        | "psd" | "raw" | "cr2" | "nef" | "heic" | "heif" => FileCategory::Images,
        "mp4" | "mkv" | "avi" | "mov" | "wmv" | "flv" | "webm" | "m4v" | "mpg" | "mpeg" | "3gp" => {
            FileCategory::Video
        }
        "mp3" | "wav" | "flac" | "aac" | "ogg" | "wma" | "m4a" | "opus" => FileCategory::Audio,
        "zip" | "rar" | "7z" | "tar" | "gz" | "bz2" | "xz" | "zst" | "cab" | "iso" | "dmg" => {
            FileCategory::Archives
        }
        "rs" | "py" | "js" | "ts" | "jsx" | "tsx" | "c" | "cpp" | "h" | "hpp" | "cs" | "java"
        | "go" | "rb" | "php" | "swift" | "kt" | "scala" | "html" | "css" | "scss" | "json"
        | "xml" | "yaml" | "yml" | "toml" | "sql" | "sh" | "bat" | "ps1" => FileCategory::Code,
        "exe" | "msi" | "dll" | "so" | "dylib" | "app" | "com" | "scr" => FileCategory::Executables,
        "sys" | "drv" | "inf" | "cat" | "log" | "etl" | "dat" | "reg" | "tmp" | "bak" => {
            FileCategory::System
        }
        _ => FileCategory::Other,
    }
}

pub fn categorise_path(path: &Path) -> FileCategory {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map_or(FileCategory::Other, categorise_extension)
}

/// `true` when `path` has an extension the perceptual hasher can decode.
///
/// Narrower than [`FileCategory::Images`]: vector, layered and camera-raw
/// formats are images but not raster formats the decoder understands.
pub fn is_image_path(path: &Path) -> bool {
    let Some(ext) = path.extension().and_then(|ext| ext.to_str()) else {
        return false;
    };
    let mut buf = [0u8; MAX_EXT_LEN];
    matches!(
        lowercase_ext(ext, &mut buf),
        Some("jpg" | "jpeg" | "png" | "gif" | "bmp" | "tif" | "tiff" | "webp")
    )
}

/// Break duplicate waste down by category, largest first.
pub fn waste_by_category(groups: &[DuplicateGroup]) -> Vec<CategoryWaste> {
    let mut map: HashMap<FileCategory, CategoryWaste> = HashMap::with_capacity(9);

    for group in groups {
        let Some(first) = group.paths.first() else {
            continue;
        };
        let category = categorise_path(first);
        let entry = map.entry(category).or_insert(CategoryWaste {
            category,
            wasted_bytes: 0,
            redundant_files: 0,
        });
        entry.wasted_bytes += group.wasted_bytes();
        entry.redundant_files += group.paths.len().saturating_sub(1) as u64;
    }

    let mut out: Vec<CategoryWaste> = map.into_values().collect();
    out.sort_by(|a, b| b.wasted_bytes.cmp(&a.wasted_bytes));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ChunkDigest;
    use std::path::PathBuf;

    #[test]
    fn categorise_known_extensions() {
        for ext in ["jpg", "jpeg", "png", "webp", "heic"] {
            assert_eq!(categorise_extension(ext), FileCategory::Images, ".{ext}");
        }
        for ext in ["rs", "py", "toml"] {
            assert_eq!(categorise_extension(ext), FileCategory::Code, ".{ext}");
        }
        assert_eq!(categorise_extension("zip"), FileCategory::Archives);
        assert_eq!(categorise_extension("xyz"), FileCategory::Other);
        assert_eq!(categorise_extension(""), FileCategory::Other);
    }

    #[test]
    fn matching_is_case_insensitive() {
        assert_eq!(categorise_extension("JPG"), FileCategory::Images);
        assert!(is_image_path(Path::new("Holiday/IMG_0001.JPEG")));
    }

    #[test]
    fn overlong_extension_is_other() {
        assert_eq!(
            categorise_extension("averyveryverylongextension"),
            FileCategory::Other
        );
    }

    #[test]
    fn image_detection_covers_decodable_formats_only() {
        assert!(is_image_path(Path::new("a.png")));
        assert!(is_image_path(Path::new("b.tif")));
        assert!(!is_image_path(Path::new("c.svg")));
        assert!(!is_image_path(Path::new("d.psd")));
        assert!(!is_image_path(Path::new("no_extension")));
    }

    #[test]
    fn waste_is_grouped_and_sorted() {
        let group = |size: u64, names: &[&str]| DuplicateGroup {
            size,
            digest: ChunkDigest::from_bytes([size as u8; 32]),
            paths: names.iter().map(PathBuf::from).collect(),
        };
        let groups = [
            group(10, &["a.rs", "b.rs"]),
            group(1_000, &["x.zip", "y.zip", "z.zip"]),
            group(5, &["c.rs", "d.rs"]),
        ];
        let waste = waste_by_category(&groups);
        assert_eq!(waste[0].category, FileCategory::Archives);
        assert_eq!(waste[0].wasted_bytes, 2_000);
        assert_eq!(waste[0].redundant_files, 2);
        assert_eq!(waste[1].category, FileCategory::Code);
        assert_eq!(waste[1].wasted_bytes, 15);
    }
}
