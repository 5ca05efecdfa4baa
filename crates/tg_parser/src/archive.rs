use std::ffi::OsStr;
use std::fs::{self, File};
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use tracing::warn;
use url::Url;
use zip::ZipArchive;

use crate::ParseError;

/// Raw bytes of one class entry and the path it was read from.
pub(crate) struct ClassEntry {
    pub(crate) path: String,
    pub(crate) bytes: Vec<u8>,
}

/// What a directory walk found: loose class files and nested archives.
#[derive(Default)]
pub(crate) struct DirectoryContents {
    pub(crate) classes: Vec<ClassEntry>,
    pub(crate) archives: Vec<PathBuf>,
}

pub(crate) fn is_archive(path: &Path) -> bool {
    path.extension()
        .and_then(OsStr::to_str)
        .map(|ext| matches_ignore_case(ext, &["jar", "zip", "jmod"]))
        .unwrap_or(false)
}

pub(crate) fn is_class_file(path: &Path) -> bool {
    path.extension()
        .and_then(OsStr::to_str)
        .map(|ext| ext.eq_ignore_ascii_case("class"))
        .unwrap_or(false)
}

fn matches_ignore_case(candidate: &str, values: &[&str]) -> bool {
    values
        .iter()
        .any(|value| candidate.eq_ignore_ascii_case(value))
}

/// Entries that never describe a type of the graph.
pub(crate) fn should_skip_entry(name: &str) -> bool {
    if name.starts_with("META-INF/") {
        return true;
    }
    if let Some(stripped) = name.strip_prefix("classes/") {
        return should_skip_entry(stripped);
    }
    name == "module-info.class" || name.ends_with("/module-info.class")
}

/// Archive entry paths a binary class name may be stored under, plain
/// layout first.
pub(crate) fn class_entry_names(class_name: &str) -> [String; 2] {
    let plain = format!("{}.class", tg_classfile::binary_to_internal(class_name));
    let jmod = format!("classes/{plain}");
    [plain, jmod]
}

pub(crate) fn archive_entry_path(archive: &Path, entry: &str) -> String {
    let mut display = archive.display().to_string();
    display.push('!');
    display.push('/');
    display.push_str(entry);
    display
}

pub(crate) fn open_archive(path: &Path) -> Result<ZipArchive<BufReader<File>>, ParseError> {
    let file = File::open(path).map_err(|source| ParseError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    ZipArchive::new(BufReader::new(file)).map_err(|source| ParseError::Zip {
        path: path.to_path_buf(),
        source,
    })
}

/// Reads every class entry of an archive, in entry order.
pub(crate) fn read_archive(path: &Path) -> Result<Vec<ClassEntry>, ParseError> {
    let mut archive = open_archive(path)?;
    let mut classes = Vec::new();
    for idx in 0..archive.len() {
        let mut entry = archive.by_index(idx).map_err(|source| ParseError::Zip {
            path: path.to_path_buf(),
            source,
        })?;
        if !entry.is_file() {
            continue;
        }
        let name = entry.name().to_string();
        if !name.ends_with(".class") || should_skip_entry(&name) {
            continue;
        }

        let mut bytes = Vec::with_capacity(entry.size() as usize);
        entry
            .read_to_end(&mut bytes)
            .map_err(|source| ParseError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        classes.push(ClassEntry {
            path: archive_entry_path(path, &name),
            bytes,
        });
    }
    Ok(classes)
}

/// Walks `root` recursively, reading loose class files and collecting the
/// archives it contains.
pub(crate) fn read_directory(root: &Path) -> Result<DirectoryContents, ParseError> {
    let mut contents = DirectoryContents::default();
    let mut dirs = vec![root.to_path_buf()];
    while let Some(dir) = dirs.pop() {
        let entries = fs::read_dir(&dir).map_err(|source| ParseError::Io {
            path: dir.clone(),
            source,
        })?;
        for entry in entries {
            let entry = entry.map_err(|source| ParseError::Io {
                path: dir.clone(),
                source,
            })?;
            let path = entry.path();
            let metadata = entry.metadata().map_err(|source| ParseError::Io {
                path: path.clone(),
                source,
            })?;
            if metadata.is_dir() {
                dirs.push(path);
                continue;
            }
            if is_archive(&path) {
                contents.archives.push(path);
                continue;
            }
            let skipped = path
                .file_name()
                .and_then(OsStr::to_str)
                .map(|name| name == "module-info.class")
                .unwrap_or(true);
            if is_class_file(&path) && !skipped {
                contents.classes.push(read_class_file(&path)?);
            }
        }
    }
    Ok(contents)
}

pub(crate) fn read_class_file(path: &Path) -> Result<ClassEntry, ParseError> {
    let bytes = fs::read(path).map_err(|source| ParseError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(ClassEntry {
        path: path.display().to_string(),
        bytes,
    })
}

/// `file:` URL of a directory or file. Failures are logged and yield `None`;
/// units found there are still visited, only without a location.
pub(crate) fn location_of(path: &Path) -> Option<Url> {
    let absolute = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    let url = if absolute.is_dir() {
        Url::from_directory_path(&absolute)
    } else {
        Url::from_file_path(&absolute)
    };
    match url {
        Ok(url) => Some(url),
        Err(()) => {
            warn!(path = %path.display(), "cannot express location as a URL, continuing without one");
            None
        }
    }
}

/// Splits classpath strings on the platform separator, dropping empty parts.
pub fn split_classpath(raw: &[String]) -> Vec<PathBuf> {
    let separator = if cfg!(windows) { ';' } else { ':' };
    raw.iter()
        .flat_map(|entry| entry.split(separator))
        .filter(|part| !part.trim().is_empty())
        .map(PathBuf::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognises_archives_and_class_files() {
        assert!(is_archive(Path::new("lib/guava.jar")));
        assert!(is_archive(Path::new("jmods/java.base.JMOD")));
        assert!(is_archive(Path::new("bundle.zip")));
        assert!(!is_archive(Path::new("Foo.class")));
        assert!(is_class_file(Path::new("a/b/Foo.CLASS")));
        assert!(!is_class_file(Path::new("a/b/Foo.java")));
    }

    #[test]
    fn skips_metadata_entries() {
        assert!(should_skip_entry("META-INF/versions/9/a/B.class"));
        assert!(should_skip_entry("module-info.class"));
        assert!(should_skip_entry("classes/module-info.class"));
        assert!(should_skip_entry("classes/META-INF/x.class"));
        assert!(!should_skip_entry("classes/java/lang/String.class"));
        assert!(!should_skip_entry("com/example/Foo.class"));
    }

    #[test]
    fn class_names_map_to_entry_paths() {
        let [plain, jmod] = class_entry_names("com.example.Outer$Inner");
        assert_eq!(plain, "com/example/Outer$Inner.class");
        assert_eq!(jmod, "classes/com/example/Outer$Inner.class");
        assert_eq!(
            archive_entry_path(Path::new("/tmp/app.jar"), &plain),
            "/tmp/app.jar!/com/example/Outer$Inner.class"
        );
    }

    #[test]
    fn splits_classpath_strings() {
        let separator = if cfg!(windows) { ";" } else { ":" };
        let raw = vec![
            format!("a.jar{separator}{separator}b"),
            "  ".to_string(),
            "c.jar".to_string(),
        ];
        assert_eq!(
            split_classpath(&raw),
            vec![PathBuf::from("a.jar"), PathBuf::from("b"), PathBuf::from("c.jar")]
        );
    }

    #[test]
    fn locations_are_file_urls() {
        let dir = tempfile::tempdir().expect("tempdir");
        let url = location_of(dir.path()).expect("directory url");
        assert_eq!(url.scheme(), "file");
        assert!(url.as_str().ends_with('/'));

        let file = dir.path().join("app.jar");
        fs::write(&file, b"").expect("write");
        let url = location_of(&file).expect("file url");
        assert!(url.as_str().ends_with("app.jar"));
    }
}
