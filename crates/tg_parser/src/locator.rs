use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use parking_lot::Mutex;
use tracing::{debug, warn};
use url::Url;
use zip::result::ZipError;
use zip::ZipArchive;

use crate::archive::{class_entry_names, is_archive, location_of, open_archive};

/// Class bytes found for a name, with where they came from.
#[derive(Debug, Clone)]
pub struct LocatedClass {
    pub bytes: Vec<u8>,
    pub location: Option<Url>,
}

/// Finds the class bytes of a binary name, e.g. `java.util.Map$Entry`.
pub trait ResourceLocator: Send + Sync {
    fn locate(&self, class_name: &str) -> Option<LocatedClass>;
}

type Archive = ZipArchive<BufReader<File>>;

enum ClasspathEntry {
    Directory {
        root: PathBuf,
        location: Option<Url>,
    },
    Archive {
        path: PathBuf,
        location: Option<Url>,
        // Opened on first lookup; `None` once opening has failed.
        archive: OnceLock<Option<Mutex<Archive>>>,
    },
}

/// Looks classes up in directories and archives, first match wins.
pub struct ClasspathLocator {
    entries: Vec<ClasspathEntry>,
}

impl ClasspathLocator {
    /// Entries that do not exist or are neither directories nor archives are
    /// ignored.
    pub fn new<I>(paths: I) -> Self
    where
        I: IntoIterator<Item = PathBuf>,
    {
        let entries = paths
            .into_iter()
            .filter_map(|path| {
                if path.is_dir() {
                    let location = location_of(&path);
                    Some(ClasspathEntry::Directory {
                        root: path,
                        location,
                    })
                } else if path.is_file() && is_archive(&path) {
                    let location = location_of(&path);
                    Some(ClasspathEntry::Archive {
                        path,
                        location,
                        archive: OnceLock::new(),
                    })
                } else {
                    debug!(path = %path.display(), "ignoring classpath entry");
                    None
                }
            })
            .collect();
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ResourceLocator for ClasspathLocator {
    fn locate(&self, class_name: &str) -> Option<LocatedClass> {
        let names = class_entry_names(class_name);
        self.entries.iter().find_map(|entry| match entry {
            ClasspathEntry::Directory { root, location } => {
                let bytes = std::fs::read(root.join(&names[0])).ok()?;
                Some(LocatedClass {
                    bytes,
                    location: location.clone(),
                })
            }
            ClasspathEntry::Archive {
                path,
                location,
                archive,
            } => {
                let archive = archive
                    .get_or_init(|| match open_archive(path) {
                        Ok(archive) => Some(Mutex::new(archive)),
                        Err(error) => {
                            warn!(%error, "classpath archive is unreadable, ignoring it");
                            None
                        }
                    })
                    .as_ref()?;
                let mut archive = archive.lock();
                let bytes = names
                    .iter()
                    .find_map(|name| read_entry(&mut archive, name, path))?;
                Some(LocatedClass {
                    bytes,
                    location: location.clone(),
                })
            }
        })
    }
}

fn read_entry(archive: &mut Archive, name: &str, path: &Path) -> Option<Vec<u8>> {
    let mut entry = match archive.by_name(name) {
        Ok(entry) => entry,
        Err(ZipError::FileNotFound) => return None,
        Err(error) => {
            warn!(path = %path.display(), entry = name, %error, "cannot read classpath entry");
            return None;
        }
    };
    let mut bytes = Vec::new();
    match entry.read_to_end(&mut bytes) {
        Ok(_) => Some(bytes),
        Err(error) => {
            warn!(path = %path.display(), entry = name, %error, "cannot read classpath entry");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    fn jar(path: &Path, entries: &[(&str, &[u8])]) {
        let mut writer = ZipWriter::new(File::create(path).expect("create jar"));
        for (name, bytes) in entries {
            writer
                .start_file(*name, SimpleFileOptions::default())
                .expect("start entry");
            writer.write_all(bytes).expect("write entry");
        }
        writer.finish().expect("finish jar");
    }

    #[test]
    fn locates_in_directories_and_archives_in_order() {
        let dir = tempfile::tempdir().expect("tempdir");
        let classes = dir.path().join("classes");
        std::fs::create_dir_all(classes.join("com/example")).expect("mkdir");
        std::fs::write(classes.join("com/example/Local.class"), b"local").expect("write");

        let library = dir.path().join("lib.jar");
        jar(
            &library,
            &[
                ("com/example/Local.class", &b"shadowed"[..]),
                ("com/example/Outer$Inner.class", &b"inner"[..]),
            ],
        );
        let jmod = dir.path().join("base.jmod");
        jar(&jmod, &[("classes/java/util/List.class", &b"list"[..])]);

        let locator = ClasspathLocator::new(vec![
            classes,
            library,
            jmod,
            dir.path().join("missing.jar"),
        ]);
        assert_eq!(locator.len(), 3);

        let local = locator.locate("com.example.Local").expect("local");
        assert_eq!(local.bytes, b"local");
        assert!(local.location.expect("location").as_str().ends_with("classes/"));

        let inner = locator.locate("com.example.Outer$Inner").expect("inner");
        assert_eq!(inner.bytes, b"inner");
        assert!(inner.location.expect("location").as_str().ends_with("lib.jar"));

        assert_eq!(locator.locate("java.util.List").expect("list").bytes, b"list");
        assert!(locator.locate("com.example.Absent").is_none());
    }

    #[test]
    fn unreadable_archives_are_ignored() {
        let dir = tempfile::tempdir().expect("tempdir");
        let broken = dir.path().join("broken.jar");
        std::fs::write(&broken, b"not a zip").expect("write");

        let locator = ClasspathLocator::new(vec![broken]);
        assert_eq!(locator.len(), 1);
        assert!(locator.locate("com.example.Anything").is_none());
        assert!(locator.locate("com.example.Anything").is_none());
    }
}
