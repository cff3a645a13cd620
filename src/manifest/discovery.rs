use std::path::{Path, PathBuf};

use crate::host::FileSystem;

/// Find the manifest closest to `start_dir`, searching it and then each
/// ancestor. Within one directory, `names` are tried in order.
pub fn find_manifest(fs: &dyn FileSystem, start_dir: &Path, names: &[String]) -> Option<PathBuf> {
    start_dir
        .ancestors()
        .filter(|dir| !dir.as_os_str().is_empty())
        .flat_map(|dir| names.iter().map(move |name| dir.join(name)))
        .find(|candidate| fs.is_file(candidate))
}
