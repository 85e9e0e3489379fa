use std::path::{Path, PathBuf};

use log::trace;

use crate::limits::SOURCE_EXTENSIONS;

/// Maps an import name to a source file.
pub trait ModuleResolver {
    fn resolve(&self, name: &str) -> Option<PathBuf>;
}

/// Looks modules up below a list of directories. `a.b` is `a/b.rmc` (or `a/b.renzmc`) in
/// the first directory that has it.
#[derive(Debug, Clone, Default)]
pub struct DirectoryResolver {
    roots: Vec<PathBuf>,
}

impl DirectoryResolver {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        DirectoryResolver {
            roots: vec![root.into()],
        }
    }

    pub fn add_search_path<P: Into<PathBuf>>(&mut self, path: P) {
        self.roots.push(path.into());
    }

    fn candidate(root: &Path, name: &str) -> Option<PathBuf> {
        let relative: PathBuf = name.split('.').collect();
        SOURCE_EXTENSIONS
            .iter()
            .map(|extension| root.join(&relative).with_extension(extension))
            .find(|path| path.is_file())
    }
}

impl ModuleResolver for DirectoryResolver {
    fn resolve(&self, name: &str) -> Option<PathBuf> {
        let found = self.roots.iter().find_map(|root| Self::candidate(root, name));
        trace!("modul '{}' -> {:?}", name, found);
        found
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;

    use crate::resolver::{DirectoryResolver, ModuleResolver};

    fn scratch(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("renzmc-resolver-{}-{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(dir.join("paket")).unwrap();
        dir
    }

    #[test]
    fn test_dotted_names_map_to_directories() {
        let dir = scratch("dotted");
        fs::write(dir.join("paket").join("alat.rmc"), "x itu 1").unwrap();
        fs::write(dir.join("lama.renzmc"), "y itu 2").unwrap();

        let resolver = DirectoryResolver::new(&dir);
        assert_eq!(resolver.resolve("paket.alat"), Some(dir.join("paket").join("alat.rmc")));
        assert_eq!(resolver.resolve("lama"), Some(dir.join("lama.renzmc")));
        assert_eq!(resolver.resolve("tidak_ada"), None);

        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn test_search_paths_are_tried_in_order() {
        let first = scratch("first");
        let second = scratch("second");
        fs::write(second.join("util.rmc"), "").unwrap();

        let mut resolver = DirectoryResolver::new(&first);
        assert_eq!(resolver.resolve("util"), None);
        resolver.add_search_path(&second);
        assert_eq!(resolver.resolve("util"), Some(second.join("util.rmc")));

        fs::remove_dir_all(first).unwrap();
        fs::remove_dir_all(second).unwrap();
    }
}
