//! Pairing and concurrent overlay of documents with barcodes

use crate::config::{BatchOptions, WorkspaceLayout};
use crate::progress::ProgressReporter;
use crate::types::*;
use barcode_overlay::{PdfDocument, insert_image};
use barcode_store::AssetRepository;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::{Id, JoinError, JoinSet};

pub const PDF_EXTENSIONS: &[&str] = &["pdf"];
pub const BARCODE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];

/// Barcode width as a fraction of page width
const WIDTH_DIVISOR: f32 = 5.0;
/// Barcode height as a fraction of page height
const HEIGHT_DIVISOR: f32 = 20.0;

/// Barcode rectangle `(x, y, width, height)` for a page of `page_size`,
/// anchored to the corner at `(W, H)`.
pub fn barcode_placement(page_size: (f32, f32)) -> (f32, f32, f32, f32) {
    let (page_width, page_height) = page_size;
    let width = page_width / WIDTH_DIVISOR;
    let height = page_height / HEIGHT_DIVISOR;
    (page_width - width, page_height - height, width, height)
}

/// `<pdf stem>_<barcode stem>.<pdf extension>` inside `output_dir`.
pub fn output_path(pdf: &Path, barcode: &Path, output_dir: &Path) -> PathBuf {
    let stem = |p: &Path| {
        p.file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    };
    let extension = pdf
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .unwrap_or_else(|| "pdf".to_string());
    output_dir.join(format!("{}_{}.{extension}", stem(pdf), stem(barcode)))
}

/// Pair documents with barcodes by position. Surplus on either side is left
/// out.
pub fn pair_assets(
    pdfs: &[PathBuf],
    barcodes: &[PathBuf],
    output_dir: &Path,
) -> Vec<ProcessingTask> {
    pdfs.iter()
        .zip(barcodes)
        .map(|(pdf, barcode)| ProcessingTask {
            pdf: pdf.clone(),
            barcode: barcode.clone(),
            output: output_path(pdf, barcode, output_dir),
        })
        .collect()
}

/// Overlay one pair and archive both inputs.
///
/// Archiving happens only after the output was written, and is all or
/// nothing: if the barcode cannot be archived the document is moved back.
///
/// # Arguments
/// * `repo` - Storage holding the inputs and receiving the output
/// * `task` - The pair to process
/// * `layout` - Supplies the `used` directories both inputs are moved into
pub fn process_task(
    repo: &dyn AssetRepository,
    task: &ProcessingTask,
    layout: &WorkspaceLayout,
) -> std::result::Result<PathBuf, TaskError> {
    for dir in [&layout.used_pdfs, &layout.used_barcodes] {
        if !repo.is_dir(dir) {
            return Err(TaskError::ArchiveMissing(dir.clone()));
        }
    }

    let doc = PdfDocument::open(repo, &task.pdf)?;
    let (x, y, width, height) = barcode_placement(doc.first_page_size()?);
    insert_image(
        repo,
        &doc,
        &task.barcode,
        &task.output,
        x,
        y,
        Some(width),
        Some(height),
    )?;

    let archived_pdf = repo.move_file(&task.pdf, &layout.used_pdfs)?;
    if let Err(e) = repo.move_file(&task.barcode, &layout.used_barcodes) {
        if let Some(origin) = task.pdf.parent() {
            if let Err(restore) = repo.move_file(&archived_pdf, origin) {
                log::error!(
                    "Could not restore {} to {}: {restore}",
                    archived_pdf.display(),
                    origin.display()
                );
            }
        }
        return Err(e.into());
    }
    log::debug!(
        "Archived {} and {}",
        task.pdf.display(),
        task.barcode.display()
    );
    Ok(task.output.clone())
}

/// Runs overlay tasks over a bounded pool of blocking workers.
#[derive(Clone)]
pub struct BatchProcessor {
    repo: Arc<dyn AssetRepository>,
    layout: WorkspaceLayout,
    options: BatchOptions,
}

impl BatchProcessor {
    pub fn new(
        repo: Arc<dyn AssetRepository>,
        layout: WorkspaceLayout,
        options: BatchOptions,
    ) -> Self {
        Self {
            repo,
            layout,
            options,
        }
    }

    pub fn layout(&self) -> &WorkspaceLayout {
        &self.layout
    }

    /// Validate inputs and build the task list. Touches nothing on failure.
    pub fn plan(
        &self,
        pdf_dir: &Path,
        barcode_dir: &Path,
        output_dir: &Path,
    ) -> Result<Vec<ProcessingTask>> {
        self.options.validate()?;
        if pdf_dir.as_os_str().is_empty() {
            return Err(BatchError::MissingPdfDir);
        }
        if output_dir.as_os_str().is_empty() {
            return Err(BatchError::MissingOutputDir);
        }
        for dir in [pdf_dir, barcode_dir] {
            if !self.repo.is_dir(dir) {
                return Err(BatchError::DirectoryNotFound(dir.to_path_buf()));
            }
        }

        let barcodes = self.repo.list(barcode_dir, BARCODE_EXTENSIONS)?;
        if barcodes.is_empty() {
            return Err(BatchError::EmptyInput {
                kind: AssetKind::Barcode,
                dir: barcode_dir.to_path_buf(),
            });
        }
        let pdfs = self.repo.list(pdf_dir, PDF_EXTENSIONS)?;
        if pdfs.is_empty() {
            return Err(BatchError::EmptyInput {
                kind: AssetKind::Pdf,
                dir: pdf_dir.to_path_buf(),
            });
        }

        if pdfs.len() != barcodes.len() {
            log::warn!(
                "{} PDFs and {} barcodes; only {} pairs will be processed",
                pdfs.len(),
                barcodes.len(),
                pdfs.len().min(barcodes.len())
            );
        }
        Ok(pair_assets(&pdfs, &barcodes, output_dir))
    }

    /// Overlay every pair from `pdf_dir` and `barcode_dir` into `output_dir`.
    ///
    /// Individual failures are collected in the result; only validation
    /// problems abort the batch.
    ///
    /// # Arguments
    /// * `pdf_dir` - Directory of documents, paired in name order
    /// * `barcode_dir` - Directory of barcode images, paired in name order
    /// * `output_dir` - Created if missing; receives `<pdf>_<barcode>.pdf`
    /// * `reporter` - Notified after every finished pair
    pub async fn run(
        &self,
        pdf_dir: &Path,
        barcode_dir: &Path,
        output_dir: &Path,
        reporter: Arc<dyn ProgressReporter>,
    ) -> Result<BatchResult> {
        let tasks = {
            let processor = self.clone();
            let (pdf_dir, barcode_dir, output_dir) = (
                pdf_dir.to_path_buf(),
                barcode_dir.to_path_buf(),
                output_dir.to_path_buf(),
            );
            tokio::task::spawn_blocking(move || {
                let tasks = processor.plan(&pdf_dir, &barcode_dir, &output_dir)?;
                processor.repo.create(&[
                    output_dir.as_path(),
                    processor.layout.used_pdfs.as_path(),
                    processor.layout.used_barcodes.as_path(),
                ])?;
                Ok::<_, BatchError>(tasks)
            })
            .await??
        };

        let total = tasks.len();
        log::info!(
            "Processing {total} pairs with {} workers",
            self.options.max_workers
        );

        let semaphore = Arc::new(Semaphore::new(self.options.max_workers));
        let mut set = JoinSet::new();
        let mut pending: HashMap<Id, ProcessingTask> = HashMap::new();
        let mut tally = Tally::new(total, reporter);

        for task in tasks {
            while let Some(joined) = set.try_join_next_with_id() {
                tally.record(joined, &mut pending);
            }

            let permit = semaphore.clone().acquire_owned().await?;
            let repo = self.repo.clone();
            let layout = self.layout.clone();
            let job = task.clone();
            let handle = set.spawn_blocking(move || {
                let _permit = permit;
                let outcome = process_task(repo.as_ref(), &job, &layout);
                (job, outcome)
            });
            pending.insert(handle.id(), task);
        }

        while let Some(joined) = set.join_next_with_id().await {
            tally.record(joined, &mut pending);
        }

        let result = tally.finish();
        log::info!(
            "Batch finished: {}/{} processed, {} failed",
            result.processed,
            result.total,
            result.failed()
        );
        Ok(result)
    }

    /// Pair the layout's active documents and barcodes into its output.
    pub async fn run_active(&self, reporter: Arc<dyn ProgressReporter>) -> Result<BatchResult> {
        let layout = self.layout.clone();
        self.run(
            &layout.active_pdfs,
            &layout.active_barcodes,
            &layout.output,
            reporter,
        )
        .await
    }
}

type Joined = std::result::Result<
    (Id, (ProcessingTask, std::result::Result<PathBuf, TaskError>)),
    JoinError,
>;

/// Single consumer of finished tasks.
struct Tally {
    total: usize,
    completed: usize,
    result: BatchResult,
    reporter: Arc<dyn ProgressReporter>,
}

impl Tally {
    fn new(total: usize, reporter: Arc<dyn ProgressReporter>) -> Self {
        Self {
            total,
            completed: 0,
            result: BatchResult {
                total,
                ..BatchResult::default()
            },
            reporter,
        }
    }

    fn record(&mut self, joined: Joined, pending: &mut HashMap<Id, ProcessingTask>) {
        let failure = match joined {
            Ok((id, (task, outcome))) => {
                pending.remove(&id);
                match outcome {
                    Ok(output) => {
                        log::info!("Created {}", output.display());
                        self.result.processed += 1;
                        None
                    }
                    Err(e) => Some(TaskFailure::new(&task, e.to_string())),
                }
            }
            Err(e) => pending
                .remove(&e.id())
                .map(|task| TaskFailure::new(&task, format!("worker crashed: {e}"))),
        };

        self.completed += 1;
        if let Some(failure) = failure {
            log::warn!("{failure}");
            self.reporter.on_error(&failure);
            self.result.failures.push(failure);
        }
        self.reporter.on_progress(self.completed, self.total);
    }

    fn finish(self) -> BatchResult {
        self.result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placement_anchors_to_far_corner() {
        let (x, y, w, h) = barcode_placement((600.0, 800.0));
        assert_eq!((w, h), (120.0, 40.0));
        assert_eq!((x, y), (480.0, 760.0));
    }

    #[test]
    fn output_name_joins_stems() {
        let out = output_path(
            Path::new("/in/report.pdf"),
            Path::new("/codes/ABC_1.png"),
            Path::new("/out"),
        );
        assert_eq!(out, Path::new("/out/report_ABC_1.pdf"));
    }

    #[test]
    fn pairing_truncates_to_shorter_side() {
        let pdfs: Vec<PathBuf> = ["a.pdf", "b.pdf", "c.pdf"].iter().map(PathBuf::from).collect();
        let codes: Vec<PathBuf> = ["1.png", "2.png", "3.png", "4.png", "5.png"]
            .iter()
            .map(PathBuf::from)
            .collect();

        let tasks = pair_assets(&pdfs, &codes, Path::new("out"));
        assert_eq!(tasks.len(), 3);
        assert_eq!(tasks[2].pdf, PathBuf::from("c.pdf"));
        assert_eq!(tasks[2].barcode, PathBuf::from("3.png"));
        assert_eq!(tasks[2].output, PathBuf::from("out/c_3.pdf"));
    }
}
