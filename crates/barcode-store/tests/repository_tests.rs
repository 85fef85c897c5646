use barcode_store::*;
use std::path::Path;
use tempfile::TempDir;

fn seed(repo: &dyn AssetRepository, root: &Path) {
    let active = root.join("active");
    repo.create(&[active.as_path()]).unwrap();
    repo.write(&active.join("b.png"), b"png-b").unwrap();
    repo.write(&active.join("a.PNG"), b"png-a").unwrap();
    repo.write(&active.join("c.jpg"), b"jpg-c").unwrap();
    repo.write(&active.join("doc.pdf"), b"%PDF").unwrap();
}

fn check_list_and_count(repo: &dyn AssetRepository, root: &Path) {
    seed(repo, root);
    let active = root.join("active");

    let images = repo.list(&active, &[".png", ".jpg", ".jpeg"]).unwrap();
    let names: Vec<_> = images
        .iter()
        .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
        .collect();
    assert_eq!(names, vec!["a.PNG", "b.png", "c.jpg"]);

    assert_eq!(repo.count(&active, ".png").unwrap(), 2);
    assert_eq!(repo.count(&active, ".pdf").unwrap(), 1);
    assert_eq!(repo.count(&active, ".xlsx").unwrap(), 0);
}

fn check_move(repo: &dyn AssetRepository, root: &Path) {
    seed(repo, root);
    let active = root.join("active");
    let used = root.join("used").join("pdfs");

    // Destination must exist first
    let err = repo.move_file(&active.join("doc.pdf"), &used).unwrap_err();
    assert!(matches!(err, StoreError::DestinationInvalid(_)));
    assert!(repo.is_file(&active.join("doc.pdf")));

    repo.create(&[used.as_path()]).unwrap();
    let moved = repo.move_file(&active.join("doc.pdf"), &used).unwrap();
    assert_eq!(moved, used.join("doc.pdf"));
    assert!(!repo.exists(&active.join("doc.pdf")));
    assert_eq!(repo.read(&moved).unwrap(), b"%PDF");

    let err = repo.move_file(&active.join("doc.pdf"), &used).unwrap_err();
    assert!(matches!(err, StoreError::SourceMissing(_)));
}

fn check_rename_delete(repo: &dyn AssetRepository, root: &Path) {
    seed(repo, root);
    let active = root.join("active");

    let renamed = repo.rename(&active.join("b.png"), "renamed.png").unwrap();
    assert_eq!(renamed, active.join("renamed.png"));
    assert!(repo.is_file(&renamed));
    assert!(matches!(
        repo.rename(&renamed, "../escape.png"),
        Err(StoreError::InvalidName(_))
    ));

    assert_eq!(repo.file_size(&renamed).unwrap(), 5);
    repo.delete(&renamed).unwrap();
    assert!(matches!(repo.delete(&renamed), Err(StoreError::NotFound(_))));

    assert!(matches!(
        repo.delete_dir(&active, false),
        Err(StoreError::DirectoryNotEmpty(_))
    ));
    repo.delete_dir(&active, true).unwrap();
    assert!(!repo.is_dir(&active));
}

#[test]
fn test_fs_list_and_count() {
    let dir = TempDir::new().unwrap();
    check_list_and_count(&FsRepository::new(), dir.path());
}

#[test]
fn test_fs_move() {
    let dir = TempDir::new().unwrap();
    check_move(&FsRepository::new(), dir.path());
}

#[test]
fn test_fs_rename_delete() {
    let dir = TempDir::new().unwrap();
    check_rename_delete(&FsRepository::new(), dir.path());
}

#[test]
fn test_memory_list_and_count() {
    check_list_and_count(&MemoryRepository::new(), Path::new("/data"));
}

#[test]
fn test_memory_move() {
    check_move(&MemoryRepository::new(), Path::new("/data"));
}

#[test]
fn test_memory_rename_delete() {
    check_rename_delete(&MemoryRepository::new(), Path::new("/data"));
}

#[test]
fn test_list_missing_directory() {
    let repo = MemoryRepository::new();
    let err = repo.list(Path::new("/nowhere"), &[".png"]).unwrap_err();
    assert!(matches!(err, StoreError::NotADirectory(_)));

    let dir = TempDir::new().unwrap();
    let err = FsRepository::new()
        .list(&dir.path().join("nowhere"), &[".png"])
        .unwrap_err();
    assert!(matches!(err, StoreError::NotADirectory(_)));
}

#[test]
fn test_memory_write_requires_parent() {
    let repo = MemoryRepository::new();
    assert!(repo.write(Path::new("/missing/file.png"), b"x").is_err());

    repo.create(&[Path::new("/missing")]).unwrap();
    repo.write(Path::new("/missing/file.png"), b"x").unwrap();
    assert!(repo.is_file(Path::new("/missing/file.png")));
}

#[test]
fn test_moves_from_many_threads() {
    let repo = std::sync::Arc::new(MemoryRepository::new());
    let src = Path::new("/src");
    let dest = Path::new("/dest");
    repo.create(&[src, dest]).unwrap();
    for i in 0..32 {
        repo.insert(src.join(format!("{i}.png")), vec![i as u8]);
    }

    let handles: Vec<_> = (0..32)
        .map(|i| {
            let repo = repo.clone();
            std::thread::spawn(move || {
                repo.move_file(&Path::new("/src").join(format!("{i}.png")), Path::new("/dest"))
                    .unwrap();
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(repo.count(dest, "png").unwrap(), 32);
    assert_eq!(repo.count(src, "png").unwrap(), 0);
}
