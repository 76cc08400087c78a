use std::fs;

use dbdash::discovery::find_database_files;

#[test]
fn finds_only_db_files_in_directory() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("sales.db"), b"").unwrap();
    fs::write(dir.path().join("ARCHIVE.DB"), b"").unwrap();
    fs::write(dir.path().join("notes.txt"), b"").unwrap();
    fs::write(dir.path().join("sales.db-journal"), b"").unwrap();
    fs::create_dir(dir.path().join("nested")).unwrap();
    fs::write(dir.path().join("nested").join("inner.db"), b"").unwrap();
    fs::create_dir(dir.path().join("folder.db")).unwrap();

    let found = find_database_files(dir.path()).unwrap();
    let names: Vec<String> = found
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["ARCHIVE.DB", "sales.db"]);
    assert!(found.iter().all(|p| p.starts_with(dir.path())));
}

#[test]
fn empty_directory_yields_nothing() {
    let dir = tempfile::tempdir().unwrap();
    assert!(find_database_files(dir.path()).unwrap().is_empty());
}

#[test]
fn missing_directory_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = find_database_files(&dir.path().join("absent")).unwrap_err();
    assert!(err.to_string().starts_with("io: "), "Got: {}", err);
}
