//! Batch download of rendered slides.
//!
//! Exporting walks the deck one slide at a time: make it the active slide,
//! drop the selection so no overlay is captured, wait until the surface has
//! painted it, render, hand the file to a [`DownloadSink`] and pause before
//! the next one. A failed slide is reported and the batch carries on.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use carousel_core::{EditorSession, ImageSet, Plan, SlideDeck};
use tokio::sync::{watch, Mutex};

use crate::compositor::Compositor;
use crate::error::{RenderError, RenderResult};
use crate::export::{download_filename, Download, SlideExporter};

/// Destination for exported files.
#[async_trait]
pub trait DownloadSink: Send + Sync {
    /// Accept one file.
    async fn deliver(&self, download: Download) -> RenderResult<()>;
}

/// Keeps downloads in memory.
#[derive(Debug, Default)]
pub struct CollectingSink {
    downloads: Mutex<Vec<Download>>,
}

impl CollectingSink {
    /// Empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything delivered so far, in order.
    pub async fn downloads(&self) -> Vec<Download> {
        self.downloads.lock().await.clone()
    }

    /// Delivered file names, in order.
    pub async fn filenames(&self) -> Vec<String> {
        self.downloads
            .lock()
            .await
            .iter()
            .map(|d| d.filename.clone())
            .collect()
    }
}

#[async_trait]
impl DownloadSink for CollectingSink {
    async fn deliver(&self, download: Download) -> RenderResult<()> {
        self.downloads.lock().await.push(download);
        Ok(())
    }
}

/// Writes downloads into a directory, creating it on first use.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    /// Sink writing into `dir`.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Target directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl DownloadSink for DirectorySink {
    async fn deliver(&self, download: Download) -> RenderResult<()> {
        let bytes = download.asset.decode_bytes()?;
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.dir.join(&download.filename);
        tokio::fs::write(&path, bytes).await?;
        tracing::info!(path = %path.display(), "slide written");
        Ok(())
    }
}

/// Resolves once the editing surface has painted a slide.
#[async_trait]
pub trait RenderBarrier: Send + Sync {
    /// Wait for `slide_index` to be on screen.
    async fn wait_rendered(&self, slide_index: usize);
}

/// Waits a fixed delay.
#[derive(Debug, Clone, Copy)]
pub struct FixedDelayBarrier {
    delay: Duration,
}

impl FixedDelayBarrier {
    /// Barrier sleeping for `delay`.
    #[must_use]
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait]
impl RenderBarrier for FixedDelayBarrier {
    async fn wait_rendered(&self, _slide_index: usize) {
        tokio::time::sleep(self.delay).await;
    }
}

/// Sending half of a [`SignalBarrier`]; the surface calls
/// [`RenderSignal::rendered`] after each paint.
#[derive(Debug)]
pub struct RenderSignal {
    tx: watch::Sender<Option<usize>>,
}

impl RenderSignal {
    /// Report that `slide_index` is now painted.
    pub fn rendered(&self, slide_index: usize) {
        self.tx.send_replace(Some(slide_index));
    }
}

/// Waits for an explicit paint signal, falling back to a timeout.
#[derive(Debug, Clone)]
pub struct SignalBarrier {
    rx: watch::Receiver<Option<usize>>,
    timeout: Duration,
}

impl SignalBarrier {
    /// Linked signal and barrier. Waits longer than `timeout` give up and
    /// let the export proceed.
    #[must_use]
    pub fn channel(timeout: Duration) -> (RenderSignal, Self) {
        let (tx, rx) = watch::channel(None);
        (RenderSignal { tx }, Self { rx, timeout })
    }
}

#[async_trait]
impl RenderBarrier for SignalBarrier {
    async fn wait_rendered(&self, slide_index: usize) {
        let mut rx = self.rx.clone();
        let wait = rx.wait_for(|painted| *painted == Some(slide_index));
        let painted = tokio::time::timeout(self.timeout, wait)
            .await
            .map(|changed| changed.is_ok());
        match painted {
            Ok(true) => {}
            Ok(false) => tracing::warn!(slide_index, "render signal dropped, exporting anyway"),
            Err(_) => tracing::warn!(slide_index, "no render signal before timeout, exporting anyway"),
        }
    }
}

/// Outcome of a batch export.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportReport {
    /// Delivered file names, in order.
    pub delivered: Vec<String>,
    /// Slide index and error for every slide that failed.
    pub failed: Vec<(usize, String)>,
}

impl ExportReport {
    /// Whether every slide was delivered.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Drives slide-by-slide export into a sink.
pub struct ExportPipeline {
    exporter: SlideExporter,
    barrier: Box<dyn RenderBarrier>,
    sink: Arc<dyn DownloadSink>,
    throttle: Duration,
}

impl std::fmt::Debug for ExportPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExportPipeline")
            .field("exporter", &self.exporter)
            .field("throttle", &self.throttle)
            .finish_non_exhaustive()
    }
}

impl ExportPipeline {
    /// Pipeline using the exporter's configured settle and throttle delays.
    #[must_use]
    pub fn new(exporter: SlideExporter, sink: Arc<dyn DownloadSink>) -> Self {
        let config = exporter.config();
        let barrier = FixedDelayBarrier::new(Duration::from_millis(config.settle_delay_ms));
        let throttle = Duration::from_millis(config.throttle_ms);
        Self {
            exporter,
            barrier: Box::new(barrier),
            sink,
            throttle,
        }
    }

    /// Replace the render barrier.
    #[must_use]
    pub fn with_barrier(mut self, barrier: Box<dyn RenderBarrier>) -> Self {
        self.barrier = barrier;
        self
    }

    /// Export a single slide without touching any session state.
    ///
    /// # Errors
    ///
    /// Returns an error if the slide does not exist, rendering fails, or the
    /// sink rejects the file.
    pub async fn export_one(&self, deck: &SlideDeck, slide_index: usize) -> RenderResult<String> {
        let slide = deck
            .snapshot(slide_index)
            .ok_or(RenderError::SlideNotFound(slide_index))?;
        let download = self.exporter.export_slide(&slide)?;
        let filename = download.filename.clone();
        self.sink.deliver(download).await?;
        Ok(filename)
    }

    /// Export every slide of a session in order.
    ///
    /// Leaves the session on the last slide with nothing selected.
    pub async fn export_all(&self, session: &mut EditorSession) -> ExportReport {
        let mut report = ExportReport::default();
        let count = session.deck.len();

        for index in 0..count {
            session.switch_slide(index);
            self.barrier.wait_rendered(index).await;

            match self.export_one(&session.deck, index).await {
                Ok(filename) => {
                    tracing::info!(slide_index = index, %filename, "slide exported");
                    report.delivered.push(filename);
                }
                Err(e) => {
                    tracing::warn!(slide_index = index, error = %e, "slide export failed");
                    report.failed.push((index, e.to_string()));
                }
            }

            if index + 1 < count {
                tokio::time::sleep(self.throttle).await;
            }
        }

        report
    }

    /// Composite every plan page over its generated image and deliver the
    /// results. Pages without an image are drawn on the fallback fill.
    pub async fn composite_all(&self, compositor: &Compositor, plan: &Plan, images: &ImageSet) -> ExportReport {
        let mut report = ExportReport::default();
        let pages = plan.pages();

        for (index, page) in pages.iter().enumerate() {
            let Some(asset) = compositor.composite(page, images.get(page.page_number)) else {
                tracing::warn!(page = page.page_number, "composite produced no image");
                report.failed.push((index, format!("page {} could not be composited", page.page_number)));
                continue;
            };

            let download = Download {
                filename: download_filename(page.page_number),
                asset,
            };
            let filename = download.filename.clone();
            match self.sink.deliver(download).await {
                Ok(()) => report.delivered.push(filename),
                Err(e) => {
                    tracing::warn!(page = page.page_number, error = %e, "delivery failed");
                    report.failed.push((index, e.to_string()));
                }
            }

            if index + 1 < pages.len() {
                tokio::time::sleep(self.throttle).await;
            }
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::ExportConfig;
    use crate::raster::Rasterizer;
    use carousel_core::{ApproxMeasure, ImageAsset};

    fn quick_exporter() -> SlideExporter {
        SlideExporter::new(
            ExportConfig {
                scale: 0.25,
                settle_delay_ms: 1,
                throttle_ms: 1,
            },
            Rasterizer::new(),
        )
        .with_measure(Arc::new(ApproxMeasure))
    }

    #[tokio::test]
    async fn test_signal_barrier_resolves_on_matching_slide() {
        let (signal, barrier) = SignalBarrier::channel(Duration::from_secs(5));
        signal.rendered(2);
        tokio::time::timeout(Duration::from_secs(1), barrier.wait_rendered(2))
            .await
            .expect("barrier should resolve immediately");
    }

    #[tokio::test]
    async fn test_signal_barrier_times_out() {
        let (signal, barrier) = SignalBarrier::channel(Duration::from_millis(20));
        signal.rendered(0);
        tokio::time::timeout(Duration::from_secs(1), barrier.wait_rendered(4))
            .await
            .expect("timeout fallback should release the wait");
    }

    #[tokio::test]
    async fn test_signal_barrier_waits_for_later_signal() {
        let (signal, barrier) = SignalBarrier::channel(Duration::from_secs(5));
        let painter = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            signal.rendered(1);
            signal
        });
        tokio::time::timeout(Duration::from_secs(1), barrier.wait_rendered(1))
            .await
            .expect("signal should release the wait");
        painter.await.expect("painter task");
    }

    #[tokio::test]
    async fn test_export_one_unknown_slide() {
        let sink = Arc::new(CollectingSink::new());
        let pipeline = ExportPipeline::new(quick_exporter(), sink.clone());
        let deck = SlideDeck::new(Vec::new());
        let err = pipeline.export_one(&deck, 3).await.expect_err("no slide");
        assert!(matches!(err, RenderError::SlideNotFound(3)));
        assert!(sink.filenames().await.is_empty());
    }

    #[tokio::test]
    async fn test_directory_sink_rejects_malformed_asset() {
        let dir = tempfile::tempdir().expect("tempdir");
        let sink = DirectorySink::new(dir.path().join("out"));
        let bad = ImageAsset::from_data_url("data:image/png;base64,@@@").expect("data url");
        let result = sink
            .deliver(Download {
                filename: "x.png".to_string(),
                asset: bad,
            })
            .await;
        assert!(result.is_err());
    }

    #[test]
    fn test_report_completeness() {
        let mut report = ExportReport::default();
        assert!(report.is_complete());
        report.failed.push((1, "boom".to_string()));
        assert!(!report.is_complete());
    }
}
