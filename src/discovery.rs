use std::path::{Path, PathBuf};

use crate::error::DashError;

pub const DATABASE_EXTENSION: &str = "db";

/// `*.db` files directly inside `dir`, sorted by path. Subdirectories are
/// not searched.
pub fn find_database_files(dir: &Path) -> Result<Vec<PathBuf>, DashError> {
    let mut found = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file()
            && path
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case(DATABASE_EXTENSION))
        {
            found.push(path);
        }
    }
    found.sort();
    Ok(found)
}
