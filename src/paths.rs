//! Install-path handling
//!
//! A Freelancer install is a directory tree rooted wherever the game was
//! unpacked. `EXE/freelancer.ini` is its inventory: it declares which
//! resource DLLs strings come from and which DATA inis define each part of
//! the world. Everything else the library touches is found through that
//! index.
//!
//! The game ran on case-insensitive file systems and its files reference
//! paths in whatever casing the original authors felt like, so every
//! lookup here resolves component-by-component, ignoring case.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::error::{Error, Result};
use crate::formats;

/// The resolved inventory of one install root.
#[derive(Debug)]
pub struct InstallDir {
    root: PathBuf,
    /// ini category (as declared in `freelancer.ini` `[Data]`) to paths.
    inis: Vec<(String, Vec<PathBuf>)>,
    /// resource DLL paths in slot order; slot 0 is always `resources.dll`.
    dlls: Vec<PathBuf>,
}

impl InstallDir {
    /// Read the inventory at `root/EXE/freelancer.ini` and build the index.
    ///
    /// Fails with [`Error::InstallPathMissing`] when the root does not
    /// exist or carries no inventory file; everything else is lenient.
    pub fn discover(root: &Path) -> Result<Self> {
        if !root.is_dir() {
            return Err(Error::InstallPathMissing(root.to_path_buf()));
        }
        let inventory = resolve_case(root, "EXE/freelancer.ini")
            .ok_or_else(|| Error::InstallPathMissing(root.to_path_buf()))?;
        let sections = formats::load(&inventory)?;

        // resources.dll is hard-coded as DLL slot 0; the [Resources] block
        // declares the rest in external-id order
        let mut dll_names = vec!["resources.dll".to_string()];
        for section in sections.iter().filter(|s| s.name == "resources") {
            dll_names.extend(
                section
                    .get_all("dll")
                    .filter_map(formats::Entry::as_str)
                    .map(str::to_string),
            );
        }

        let mut install = InstallDir {
            root: root.to_path_buf(),
            inis: Vec::new(),
            dlls: Vec::new(),
        };
        install.dlls = dll_names
            .iter()
            .map(|name| install.exe_path(name))
            .collect();

        // [Data] and [Freelancer] entries are `category = relative path`,
        // with repeated keys for multi-file categories
        for section in sections
            .iter()
            .filter(|s| s.name == "data" || s.name == "freelancer")
        {
            for entry in &section.entries {
                let Some(file) = entry.as_str() else {
                    continue;
                };
                let path = install.data_path(file);
                match install.inis.iter_mut().find(|(c, _)| *c == entry.key) {
                    Some((_, paths)) => paths.push(path),
                    None => install.inis.push((entry.key.clone(), vec![path])),
                }
            }
        }
        Ok(install)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The files declared for an inventory category (`universe`, `goods`,
    /// `markets`, `ships`, `equipment`, `initial_world`, ...).
    pub fn ini_paths(&self, category: &str) -> &[PathBuf] {
        self.inis
            .iter()
            .find(|(c, _)| c == category)
            .map(|(_, paths)| paths.as_slice())
            .unwrap_or_else(|| {
                warn!(category, "inventory declares no files for category");
                &[]
            })
    }

    /// Resource DLL paths in slot order.
    pub fn dll_paths(&self) -> &[PathBuf] {
        &self.dlls
    }

    /// An absolute path under `DATA/`, case-corrected where possible.
    pub fn data_path(&self, relative: &str) -> PathBuf {
        self.construct(&format!("DATA/{relative}"))
    }

    /// An absolute path under `EXE/`, case-corrected where possible.
    pub fn exe_path(&self, relative: &str) -> PathBuf {
        self.construct(&format!("EXE/{relative}"))
    }

    /// Resolve a root-relative path against the real file system casing.
    /// An unresolvable path falls back to the naive join so the caller
    /// reports a useful "file not found" instead of a silent drop.
    pub fn construct(&self, relative: &str) -> PathBuf {
        resolve_case(&self.root, relative)
            .unwrap_or_else(|| self.root.join(relative.replace('\\', "/")))
    }
}

/// Walk `relative` below `base` one component at a time, matching each
/// component case-insensitively against the directory listing. Returns
/// `None` when a component has no match.
pub fn resolve_case(base: &Path, relative: &str) -> Option<PathBuf> {
    let mut current = base.to_path_buf();
    for component in relative
        .replace('\\', "/")
        .split('/')
        .filter(|c| !c.is_empty() && *c != ".")
    {
        let direct = current.join(component);
        if direct.exists() {
            current = direct;
            continue;
        }
        let matched = fs::read_dir(&current).ok().and_then(|entries| {
            entries
                .filter_map(std::result::Result::ok)
                .map(|e| e.file_name())
                .find(|name| {
                    name.to_str()
                        .is_some_and(|n| n.eq_ignore_ascii_case(component))
                })
        })?;
        current = current.join(matched);
    }
    Some(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_resolve_case_insensitively() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("DATA/Universe")).unwrap();
        fs::write(dir.path().join("DATA/Universe/Universe.ini"), b"[x]\n").unwrap();

        let resolved = resolve_case(dir.path(), "data\\universe\\UNIVERSE.INI").unwrap();
        assert_eq!(resolved, dir.path().join("DATA/Universe/Universe.ini"));
        assert!(resolved.is_file());
    }

    #[test]
    fn test_resolve_case_missing_component() {
        let dir = tempdir().unwrap();
        assert!(resolve_case(dir.path(), "DATA/nope.ini").is_none());
    }

    #[test]
    fn test_discover_requires_inventory() {
        let dir = tempdir().unwrap();
        assert!(matches!(
            InstallDir::discover(dir.path()),
            Err(Error::InstallPathMissing(_))
        ));
        assert!(matches!(
            InstallDir::discover(&dir.path().join("missing")),
            Err(Error::InstallPathMissing(_))
        ));
    }

    #[test]
    fn test_discover_builds_index() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("EXE")).unwrap();
        fs::create_dir_all(dir.path().join("DATA/universe")).unwrap();
        fs::write(
            dir.path().join("EXE/freelancer.ini"),
            "[Resources]\ndll = InfoCards.dll\ndll = NameResources.dll\n\
             [Data]\nuniverse = universe\\universe.ini\nequipment = equipment\\a.ini\nequipment = equipment\\b.ini\n",
        )
        .unwrap();
        fs::write(dir.path().join("DATA/universe/universe.ini"), b"").unwrap();

        let install = InstallDir::discover(dir.path()).unwrap();
        let dlls: Vec<_> = install
            .dll_paths()
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(dlls, ["resources.dll", "InfoCards.dll", "NameResources.dll"]);
        assert_eq!(
            install.ini_paths("universe"),
            &[dir.path().join("DATA/universe/universe.ini")]
        );
        assert_eq!(install.ini_paths("equipment").len(), 2);
        assert!(install.ini_paths("made_up").is_empty());
    }
}
