//! Batch cropping: skip-existing, bounded parallel workers, atomic writes, report.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use facecrop_core::pipeline::{DiscoveredFile, FileDiscovery};
use facecrop_core::{Config, CropOptions, CropProcessor, CropRecord, RecordStatus, ReportWriter};
use tokio::sync::Semaphore;

use super::{CropArgs, CropContext};

/// One source file and where its crop goes.
#[derive(Debug, Clone)]
struct CropJob {
    source: PathBuf,
    output: PathBuf,
}

/// Counts for the end-of-run summary.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct BatchSummary {
    pub succeeded: u64,
    pub failed: u64,
    pub skipped: u64,
    /// Cropped without any face passing the threshold
    pub no_face: u64,
    pub elapsed: Duration,
}

impl BatchSummary {
    pub fn total(&self) -> u64 {
        self.succeeded + self.failed + self.skipped
    }

    /// Processed images per second.
    pub fn rate(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            (self.succeeded + self.failed) as f64 / secs
        } else {
            0.0
        }
    }

    fn count(&mut self, record: &CropRecord) {
        match record.status {
            RecordStatus::Cropped => {
                self.succeeded += 1;
                if record.faces == Some(0) {
                    self.no_face += 1;
                }
            }
            RecordStatus::Failed => self.failed += 1,
            RecordStatus::Skipped => self.skipped += 1,
        }
    }
}

/// List the photos to crop, leaving out anything already under the output
/// directory when it sits inside the input directory.
pub(crate) fn discover_inputs(config: &Config, args: &CropArgs) -> Vec<DiscoveredFile> {
    FileDiscovery::new(config.processing.clone())
        .exclude(&args.output_dir)
        .discover(&args.input_dir)
}

/// Crop every discovered file into the output directory.
pub async fn run_batch(
    ctx: CropContext,
    args: &CropArgs,
    files: Vec<DiscoveredFile>,
) -> anyhow::Result<BatchSummary> {
    let start_time = Instant::now();
    let mut summary = BatchSummary::default();
    let mut records = Vec::with_capacity(files.len());

    let (pending, existing) = plan_jobs(&files, &args.output_dir, args.overwrite);
    if !existing.is_empty() {
        tracing::info!(
            "Found {} existing output(s) in {:?}",
            existing.len(),
            args.output_dir
        );
        tracing::info!("Use --overwrite to re-crop them");
        for job in existing {
            records.push(skipped_record(job));
        }
    }

    if pending.is_empty() {
        tracing::info!("No new images to crop");
    } else {
        tracing::info!("Cropping {} image(s)", pending.len());
        records.extend(crop_all(&ctx, pending).await);
    }

    for record in &records {
        summary.count(record);
    }
    summary.elapsed = start_time.elapsed();

    if let Some(report_path) = &args.report {
        records.sort_by(|a, b| a.file.cmp(&b.file));
        write_report(report_path, args, records)?;
        tracing::info!("Report written to {:?}", report_path);
    }

    print_summary(&summary);
    if summary.failed > 0 {
        tracing::warn!("{} image(s) failed; see the errors above", summary.failed);
    }
    tracing::info!("Done. Cropped photos are in {:?}", args.output_dir);

    Ok(summary)
}

/// Split files into jobs to run and jobs whose output already exists.
fn plan_jobs(
    files: &[DiscoveredFile],
    output_dir: &Path,
    overwrite: bool,
) -> (Vec<CropJob>, Vec<CropJob>) {
    files
        .iter()
        .map(|file| CropJob {
            source: file.path.clone(),
            output: output_dir.join(&file.relative),
        })
        .partition(|job| overwrite || !job.output.exists())
}

/// Run every job on the blocking pool, at most `ctx.workers` at a time.
///
/// Records come back in job order. A panicking job is reported as failed.
async fn crop_all(ctx: &CropContext, jobs: Vec<CropJob>) -> Vec<CropRecord> {
    let progress = create_progress_bar(jobs.len() as u64);
    let semaphore = Arc::new(Semaphore::new(ctx.workers.max(1)));
    let mut handles = Vec::with_capacity(jobs.len());

    for job in jobs {
        let Ok(permit) = semaphore.clone().acquire_owned().await else {
            break;
        };
        let processor = Arc::clone(&ctx.processor);
        let options = ctx.options.clone();
        let progress = progress.clone();
        let task_job = job.clone();

        let handle = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            let record = crop_one(&processor, &options, &task_job);
            progress.inc(1);
            let elapsed = progress.elapsed().as_secs_f64();
            if elapsed > 0.0 {
                progress.set_message(format!("{:.1} img/sec", progress.position() as f64 / elapsed));
            }
            record
        });
        handles.push((job, handle));
    }

    let mut records = Vec::with_capacity(handles.len());
    for (job, handle) in handles {
        match handle.await {
            Ok(record) => records.push(record),
            Err(e) => {
                tracing::error!("Failed: {:?} - worker panicked: {}", job.source, e);
                records.push(failed_record(job, format!("worker panicked: {e}")));
            }
        }
    }

    progress.finish_and_clear();
    records
}

/// Crop one file and write the result. Never leaves a partial output.
fn crop_one(processor: &CropProcessor, options: &CropOptions, job: &CropJob) -> CropRecord {
    let outcome = match processor.process_file(&job.source, options) {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::error!("Failed: {:?} - {}", job.source, e);
            return failed_record(job.clone(), e.to_string());
        }
    };

    if let Err(e) = write_atomically(&job.output, &outcome.bytes) {
        tracing::error!("Failed to write {:?}: {}", job.output, e);
        return failed_record(job.clone(), format!("write failed: {e}"));
    }

    tracing::debug!(
        "Cropped {:?} -> {:?} ({} face(s))",
        job.source,
        job.output,
        outcome.face_count
    );

    CropRecord {
        file: job.source.clone(),
        output: job.output.clone(),
        status: RecordStatus::Cropped,
        faces: Some(outcome.face_count),
        crop: Some(outcome.crop),
        width: Some(outcome.width),
        height: Some(outcome.height),
        orientation: Some(outcome.orientation.value() as u8),
        error: None,
    }
}

/// Write `bytes` to a hidden temp file beside `dest`, then rename it into place.
fn write_atomically(dest: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let parent = dest.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(parent)?;

    let name = dest
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    let tmp = parent.join(format!(".{name}.facecrop-tmp"));

    let result = std::fs::write(&tmp, bytes).and_then(|()| std::fs::rename(&tmp, dest));
    if result.is_err() {
        let _ = std::fs::remove_file(&tmp);
    }
    result
}

fn skipped_record(job: CropJob) -> CropRecord {
    CropRecord {
        file: job.source,
        output: job.output,
        status: RecordStatus::Skipped,
        faces: None,
        crop: None,
        width: None,
        height: None,
        orientation: None,
        error: None,
    }
}

fn failed_record(job: CropJob, error: String) -> CropRecord {
    CropRecord {
        status: RecordStatus::Failed,
        error: Some(error),
        ..skipped_record(job)
    }
}

fn write_report(path: &Path, args: &CropArgs, records: Vec<CropRecord>) -> anyhow::Result<()> {
    let file = File::create(path)?;
    let mut writer = ReportWriter::new(BufWriter::new(file), args.format.into());
    for record in records {
        writer.push(record)?;
    }
    writer.finish()?;
    Ok(())
}

/// Create a progress bar for batch cropping.
fn create_progress_bar(total: u64) -> indicatif::ProgressBar {
    use indicatif::{ProgressBar, ProgressStyle};

    let pb = ProgressBar::new(total);
    if let Ok(style) = ProgressStyle::default_bar().template(
        "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}",
    ) {
        pb.set_style(style.progress_chars("##-"));
    }
    pb.set_message("starting...");
    pb
}

/// Print a formatted summary table after batch cropping.
fn print_summary(summary: &BatchSummary) {
    eprintln!();
    eprintln!("  ====================================");
    eprintln!("               Summary");
    eprintln!("  ====================================");
    eprintln!("    Succeeded:    {:>8}", summary.succeeded);
    if summary.no_face > 0 {
        eprintln!("      No faces:   {:>8}", summary.no_face);
    }
    if summary.failed > 0 {
        eprintln!("    Failed:       {:>8}", summary.failed);
    }
    if summary.skipped > 0 {
        eprintln!("    Skipped:      {:>8}", summary.skipped);
    }
    eprintln!("  ------------------------------------");
    eprintln!("    Total:        {:>8}", summary.total());
    eprintln!("    Duration:     {:>7.1}s", summary.elapsed.as_secs_f64());
    eprintln!("    Rate:         {:>7.1} img/sec", summary.rate());
    eprintln!("  ====================================");
}
