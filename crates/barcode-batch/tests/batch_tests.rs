use barcode_batch::*;
use barcode_store::{AssetRepository, FsRepository, MemoryRepository, StoreError};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use lopdf::{Dictionary, Document, Object, Stream};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use tokio::sync::mpsc;

fn create_test_pdf(num_pages: usize) -> Vec<u8> {
    let mut doc = Document::with_version("1.7");

    // Create page tree root ID
    let pages_id = doc.new_object_id();

    let mut kids = Vec::new();
    for _ in 0..num_pages {
        let content_id = doc.add_object(Stream::new(Dictionary::new(), b"q Q".to_vec()));

        let page_id = doc.add_object(Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Page".to_vec())),
            ("Parent", Object::Reference(pages_id)),
            (
                "MediaBox",
                Object::Array(vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Integer(600),
                    Object::Integer(800),
                ]),
            ),
            ("Resources", Object::Dictionary(Dictionary::new())),
            ("Contents", Object::Reference(content_id)),
        ]));
        kids.push(Object::Reference(page_id));
    }

    let pages_dict = Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Pages".to_vec())),
        ("Kids", Object::Array(kids)),
        ("Count", Object::Integer(num_pages as i64)),
    ]);
    doc.objects.insert(pages_id, Object::Dictionary(pages_dict));

    let catalog_id = doc.add_object(Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Catalog".to_vec())),
        ("Pages", Object::Reference(pages_id)),
    ]));
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}

fn create_test_png() -> Vec<u8> {
    let img = RgbImage::from_pixel(30, 10, Rgb([0, 0, 0]));
    let mut buf = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img)
        .write_to(&mut buf, ImageFormat::Png)
        .unwrap();
    buf.into_inner()
}

/// Memory-backed workspace with `pdfs` documents and `barcodes` images in
/// the active partitions.
fn seeded_workspace(pdfs: usize, barcodes: usize) -> (Arc<MemoryRepository>, WorkspaceLayout) {
    let repo = Arc::new(MemoryRepository::new());
    let layout = WorkspaceLayout::new("/data");
    layout.ensure_dirs(repo.as_ref()).unwrap();

    for i in 1..=pdfs {
        repo.insert(
            layout.active_pdfs.join(format!("doc{i}.pdf")),
            create_test_pdf(2),
        );
    }
    for i in 1..=barcodes {
        repo.insert(
            layout.active_barcodes.join(format!("code{i}.png")),
            create_test_png(),
        );
    }
    (repo, layout)
}

fn processor(repo: &Arc<MemoryRepository>, layout: &WorkspaceLayout) -> BatchProcessor {
    BatchProcessor::new(repo.clone(), layout.clone(), BatchOptions::default())
}

fn names(repo: &dyn AssetRepository, dir: &Path) -> Vec<String> {
    repo.list(dir, &["pdf", "png"])
        .unwrap()
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect()
}

#[tokio::test]
async fn test_surplus_barcodes_stay_active() {
    let (repo, layout) = seeded_workspace(3, 5);

    let result = processor(&repo, &layout)
        .run_active(Arc::new(NoopReporter))
        .await
        .unwrap();

    assert_eq!(result.processed, 3);
    assert_eq!(result.total, 3);
    assert!(result.is_clean());

    assert_eq!(
        names(repo.as_ref(), &layout.output),
        vec!["doc1_code1.pdf", "doc2_code2.pdf", "doc3_code3.pdf"]
    );
    assert_eq!(
        names(repo.as_ref(), &layout.active_barcodes),
        vec!["code4.png", "code5.png"]
    );
    assert!(names(repo.as_ref(), &layout.active_pdfs).is_empty());
    assert_eq!(names(repo.as_ref(), &layout.used_pdfs).len(), 3);
    assert_eq!(
        names(repo.as_ref(), &layout.used_barcodes),
        vec!["code1.png", "code2.png", "code3.png"]
    );
    assert_eq!(layout.free_barcodes(repo.as_ref()).unwrap(), 2);
}

#[tokio::test]
async fn test_failed_pair_is_not_archived() {
    let (repo, layout) = seeded_workspace(3, 3);
    let broken = layout.active_pdfs.join("doc2.pdf");
    repo.insert(&broken, b"not a pdf at all".to_vec());

    let result = processor(&repo, &layout)
        .run_active(Arc::new(NoopReporter))
        .await
        .unwrap();

    assert_eq!(result.processed, 2);
    assert_eq!(result.failed(), 1);
    assert_eq!(result.processed + result.failed(), result.total);

    let failure = &result.failures[0];
    assert_eq!(failure.pdf, broken);
    assert_eq!(failure.barcode, layout.active_barcodes.join("code2.png"));
    let message = failure.to_string();
    assert!(message.contains("doc2.pdf"));
    assert!(message.contains("code2.png"));

    assert_eq!(names(repo.as_ref(), &layout.active_pdfs), vec!["doc2.pdf"]);
    assert_eq!(
        names(repo.as_ref(), &layout.active_barcodes),
        vec!["code2.png"]
    );
    assert!(!repo.exists(&layout.output.join("doc2_code2.pdf")));
}

#[tokio::test]
async fn test_progress_updates_over_channel() {
    let (repo, layout) = seeded_workspace(4, 4);
    repo.insert(
        layout.active_barcodes.join("code3.png"),
        b"broken image".to_vec(),
    );
    let (tx, mut rx) = mpsc::unbounded_channel();

    let result = processor(&repo, &layout)
        .run_active(Arc::new(tx))
        .await
        .unwrap();

    let mut progress = Vec::new();
    let mut failed = Vec::new();
    while let Ok(update) = rx.try_recv() {
        match update {
            BatchUpdate::Progress { completed, total } => progress.push((completed, total)),
            BatchUpdate::Failed { failure } => failed.push(failure),
        }
    }

    assert_eq!(progress, vec![(1, 4), (2, 4), (3, 4), (4, 4)]);
    assert_eq!(failed, result.failures);
    assert_eq!(result.processed, 3);
}

/// Memory storage whose moves into `blocked` always fail.
struct BlockedDestination {
    inner: MemoryRepository,
    blocked: PathBuf,
}

impl AssetRepository for BlockedDestination {
    fn list(&self, dir: &Path, extensions: &[&str]) -> barcode_store::Result<Vec<PathBuf>> {
        self.inner.list(dir, extensions)
    }

    fn create(&self, dirs: &[&Path]) -> barcode_store::Result<()> {
        self.inner.create(dirs)
    }

    fn move_file(&self, src: &Path, dest_dir: &Path) -> barcode_store::Result<PathBuf> {
        if dest_dir == self.blocked {
            return Err(StoreError::DestinationInvalid(dest_dir.to_path_buf()));
        }
        self.inner.move_file(src, dest_dir)
    }

    fn rename(&self, path: &Path, new_name: &str) -> barcode_store::Result<PathBuf> {
        self.inner.rename(path, new_name)
    }

    fn delete(&self, path: &Path) -> barcode_store::Result<()> {
        self.inner.delete(path)
    }

    fn delete_dir(&self, path: &Path, force: bool) -> barcode_store::Result<()> {
        self.inner.delete_dir(path, force)
    }

    fn exists(&self, path: &Path) -> bool {
        self.inner.exists(path)
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.inner.is_dir(path)
    }

    fn is_file(&self, path: &Path) -> bool {
        self.inner.is_file(path)
    }

    fn read(&self, path: &Path) -> barcode_store::Result<Vec<u8>> {
        self.inner.read(path)
    }

    fn write(&self, path: &Path, bytes: &[u8]) -> barcode_store::Result<()> {
        self.inner.write(path, bytes)
    }

    fn file_size(&self, path: &Path) -> barcode_store::Result<u64> {
        self.inner.file_size(path)
    }
}

fn single_task(layout: &WorkspaceLayout) -> ProcessingTask {
    ProcessingTask {
        pdf: layout.active_pdfs.join("doc1.pdf"),
        barcode: layout.active_barcodes.join("code1.png"),
        output: layout.output.join("doc1_code1.pdf"),
    }
}

#[test]
fn test_missing_archive_dir_leaves_inputs_active() {
    let (repo, layout) = seeded_workspace(1, 1);
    repo.create(&[layout.used_pdfs.as_path()]).unwrap();
    let task = single_task(&layout);

    let err = process_task(repo.as_ref(), &task, &layout).unwrap_err();
    assert!(matches!(err, TaskError::ArchiveMissing(_)));

    assert!(repo.exists(&task.pdf));
    assert!(repo.exists(&task.barcode));
    assert!(names(repo.as_ref(), &layout.used_pdfs).is_empty());
    assert!(!repo.exists(&task.output));
}

#[test]
fn test_failed_barcode_archive_restores_document() {
    let (seeded, layout) = seeded_workspace(1, 1);
    seeded
        .create(&[layout.used_pdfs.as_path(), layout.used_barcodes.as_path()])
        .unwrap();
    let repo = BlockedDestination {
        inner: Arc::try_unwrap(seeded).ok().unwrap(),
        blocked: layout.used_barcodes.clone(),
    };
    let task = single_task(&layout);

    let err = process_task(&repo, &task, &layout).unwrap_err();
    assert!(matches!(err, TaskError::Archive(_)));

    assert!(repo.exists(&task.pdf));
    assert!(repo.exists(&task.barcode));
    assert!(names(&repo, &layout.used_pdfs).is_empty());
    assert!(names(&repo, &layout.used_barcodes).is_empty());
}

#[tokio::test]
async fn test_validation_touches_nothing() {
    let repo = Arc::new(MemoryRepository::new());
    let layout = WorkspaceLayout::new("/data");
    let batch = processor(&repo, &layout);

    let err = batch
        .run(
            Path::new("/nope"),
            Path::new("/codes"),
            Path::new("/out"),
            Arc::new(NoopReporter),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, BatchError::DirectoryNotFound(_)));
    assert!(!repo.exists(Path::new("/out")));
    assert!(!repo.exists(&layout.used_pdfs));

    let err = batch
        .run(
            Path::new(""),
            Path::new("/codes"),
            Path::new("/out"),
            Arc::new(NoopReporter),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, BatchError::MissingPdfDir));
}

#[tokio::test]
async fn test_empty_inputs_are_reported() {
    let (repo, layout) = seeded_workspace(2, 0);
    let err = processor(&repo, &layout)
        .run_active(Arc::new(NoopReporter))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        BatchError::EmptyInput {
            kind: AssetKind::Barcode,
            ..
        }
    ));

    let (repo, layout) = seeded_workspace(0, 2);
    let err = processor(&repo, &layout)
        .run_active(Arc::new(NoopReporter))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        BatchError::EmptyInput {
            kind: AssetKind::Pdf,
            ..
        }
    ));
    assert_eq!(names(repo.as_ref(), &layout.active_barcodes).len(), 2);
}

#[tokio::test]
async fn test_single_worker_on_disk() {
    let dir = TempDir::new().unwrap();
    let layout = WorkspaceLayout::new(dir.path());
    let fs = FsRepository::new();
    layout.ensure_dirs(&fs).unwrap();

    let pdf_dir = dir.path().join("incoming");
    std::fs::create_dir(&pdf_dir).unwrap();
    for name in ["b.pdf", "a.pdf"] {
        std::fs::write(pdf_dir.join(name), create_test_pdf(1)).unwrap();
    }
    for name in ["x.jpg", "w.png"] {
        let bytes = if name.ends_with(".jpg") {
            let mut buf = Cursor::new(Vec::new());
            DynamicImage::ImageRgb8(RgbImage::from_pixel(8, 8, Rgb([255, 0, 0])))
                .write_to(&mut buf, ImageFormat::Jpeg)
                .unwrap();
            buf.into_inner()
        } else {
            create_test_png()
        };
        std::fs::write(layout.active_barcodes.join(name), bytes).unwrap();
    }

    let options = BatchOptions {
        max_workers: 1,
        ..BatchOptions::default()
    };
    let batch = BatchProcessor::new(Arc::new(fs), layout.clone(), options);
    let result = batch
        .run(
            &pdf_dir,
            &layout.active_barcodes,
            &layout.output,
            Arc::new(NoopReporter),
        )
        .await
        .unwrap();

    assert_eq!(result.processed, 2);
    // listing order is by name on both sides
    assert!(layout.output.join("a_w.pdf").is_file());
    assert!(layout.output.join("b_x.pdf").is_file());
    assert!(layout.used_pdfs.join("a.pdf").is_file());
    assert!(layout.used_barcodes.join("x.jpg").is_file());
    assert_eq!(std::fs::read_dir(&pdf_dir).unwrap().count(), 0);
}

#[tokio::test]
async fn test_config_round_trip() {
    let dir = TempDir::new().unwrap();
    let path: PathBuf = dir.path().join("config.json");
    let config = AppConfig {
        base_dir: dir.path().join("data"),
        max_workers: 2,
        label_column: 5,
    };

    config.save(&path).await.unwrap();
    let loaded = AppConfig::load(&path).await.unwrap();
    assert_eq!(loaded, config);
    assert_eq!(loaded.layout().base, dir.path().join("data"));

    std::fs::write(&path, "{ not json").unwrap();
    assert!(matches!(
        AppConfig::load(&path).await,
        Err(BatchError::Config(_))
    ));
}
