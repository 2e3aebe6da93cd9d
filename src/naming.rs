//! Storage key derivation.
//!
//! A storage key is `{path}/{filename}` normalized to `/`-separated segments
//! with no leading or trailing slash. Generated filenames look like
//! `1718035200123-k3x9qa.webp`: unix milliseconds, a six-character lowercase
//! alphanumeric suffix, and the extension of the final encoded format. A
//! caller-supplied stem is kept in front of that tag.
//!
//! ```
//! use canvas_ingest::naming::storage_key;
//!
//! assert_eq!(storage_key("/uploads//art/", "cat.webp"), "uploads/art/cat.webp");
//! assert_eq!(storage_key(r"a\..\b", "x.png"), "a/b/x.png");
//! ```

use rand::seq::IndexedRandom;
use std::time::{SystemTime, UNIX_EPOCH};

const SUFFIX_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
const SUFFIX_LEN: usize = 6;

/// `{unix_millis}-{suffix}`, unique per call in practice.
fn unique_tag() -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis())
        .unwrap_or_default();
    let mut rng = rand::rng();
    let suffix: String = (0..SUFFIX_LEN)
        .filter_map(|_| SUFFIX_ALPHABET.choose(&mut rng).map(|&b| b as char))
        .collect();
    format!("{millis}-{suffix}")
}

/// `{unix_millis}-{suffix}.{extension}`.
pub fn generate_filename(extension: &str) -> String {
    format!("{}.{extension}", unique_tag())
}

/// Filename for the stored object.
///
/// A caller-supplied name keeps its stem, followed by a generated tag so two
/// uploads with the same name never share a key: `sunset.jpg` becomes
/// `sunset-1718035200123-k3x9qa.webp`. The extension is always `extension`,
/// the one for the bytes actually stored. Without a usable name the tag alone
/// is used.
pub fn resolve_filename(requested: Option<&str>, extension: &str) -> String {
    let stem = requested
        .map(|name| name.rsplit(['/', '\\']).next().unwrap_or(name).trim())
        .map(|base| match base.rsplit_once('.') {
            Some((stem, _)) if !stem.is_empty() => stem,
            _ => base,
        })
        .filter(|stem| !stem.is_empty() && *stem != "." && *stem != "..");

    match stem {
        Some(stem) => format!("{stem}-{}.{extension}", unique_tag()),
        None => generate_filename(extension),
    }
}

/// Join `path` and `filename` into a normalized key.
pub fn storage_key(path: &str, filename: &str) -> String {
    path.split(['/', '\\'])
        .chain(filename.split(['/', '\\']))
        .map(str::trim)
        .filter(|segment| !matches!(*segment, "" | "." | ".."))
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_name_shape() {
        let name = generate_filename("webp");
        let (stem, ext) = name.rsplit_once('.').unwrap();
        assert_eq!(ext, "webp");

        let (millis, suffix) = stem.split_once('-').unwrap();
        assert!(millis.parse::<u128>().unwrap() > 1_600_000_000_000);
        assert_eq!(suffix.len(), 6);
        assert!(
            suffix
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        );
    }

    #[test]
    fn generated_names_differ() {
        let a = generate_filename("png");
        let b = generate_filename("png");
        let c = generate_filename("png");
        assert!(a != b || b != c);
    }

    /// Split `{stem}-{millis}-{suffix}.{ext}` into stem and extension.
    fn stem_and_ext(name: &str) -> (&str, &str) {
        let (rest, ext) = name.rsplit_once('.').unwrap();
        let (rest, suffix) = rest.rsplit_once('-').unwrap();
        let (stem, millis) = rest.rsplit_once('-').unwrap();
        assert_eq!(suffix.len(), 6, "{name}");
        assert!(millis.parse::<u128>().is_ok(), "{name}");
        (stem, ext)
    }

    #[test]
    fn resolve_keeps_stem_and_replaces_extension() {
        let cases = [
            ("sunset.jpg", "webp", "sunset"),
            ("a.b.png", "jpg", "a.b"),
            ("noext", "png", "noext"),
            (".hidden", "png", ".hidden"),
        ];
        for (requested, ext, stem) in cases {
            let name = resolve_filename(Some(requested), ext);
            assert_eq!(stem_and_ext(&name), (stem, ext), "{requested}");
        }
    }

    #[test]
    fn resolve_makes_repeated_names_distinct() {
        let names: Vec<String> = (0..5).map(|_| resolve_filename(Some("art.png"), "webp")).collect();
        for (i, a) in names.iter().enumerate() {
            assert!(a.starts_with("art-"), "{a}");
            for b in &names[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn resolve_strips_directories() {
        let name = resolve_filename(Some("../../etc/x.png"), "png");
        assert_eq!(stem_and_ext(&name), ("x", "png"));
        let name = resolve_filename(Some(r"C:\pics\y.gif"), "webp");
        assert_eq!(stem_and_ext(&name), ("y", "webp"));
    }

    #[test]
    fn resolve_generates_without_usable_name() {
        for requested in [None, Some(""), Some("   "), Some(".."), Some("dir/")] {
            let name = resolve_filename(requested, "avif");
            assert!(name.ends_with(".avif"), "{requested:?} -> {name}");
            assert!(name.contains('-'), "{requested:?} -> {name}");
        }
    }

    #[test]
    fn key_normalization() {
        assert_eq!(storage_key("uploads", "a.webp"), "uploads/a.webp");
        assert_eq!(storage_key("/uploads/", "a.webp"), "uploads/a.webp");
        assert_eq!(storage_key("", "a.webp"), "a.webp");
        assert_eq!(storage_key("a//b/./c", "d.png"), "a/b/c/d.png");
        assert_eq!(storage_key(r"a\b", "d.png"), "a/b/d.png");
        assert_eq!(storage_key("../../secret", "d.png"), "secret/d.png");
    }

    #[test]
    fn key_has_no_leading_or_trailing_slash() {
        for (path, name) in [("/", "x.png"), ("///a///", "x.png"), ("a", "/x.png/")] {
            let key = storage_key(path, name);
            assert!(!key.starts_with('/') && !key.ends_with('/'), "{key}");
        }
    }
}
