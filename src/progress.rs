//! Progress-callback trait for conversion stage events.
//!
//! Inject an [`Arc<dyn ConversionProgressCallback>`] via
//! [`crate::config::ConversionConfigBuilder::progress_callback`] to receive
//! events as a conversion moves through its stages.
//!
//! Callers forward events wherever they like (a terminal spinner, a log, a
//! UI status line) without the library knowing how the host communicates.
//!
//! # Example
//!
//! ```rust
//! use horizon_convert::{ConversionProgressCallback, ConversionConfig, Format};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct BlockCounter {
//!     blocks: AtomicUsize,
//! }
//!
//! impl ConversionProgressCallback for BlockCounter {
//!     fn on_extracted(&self, blocks: usize) {
//!         self.blocks.store(blocks, Ordering::SeqCst);
//!     }
//! }
//!
//! let counter = Arc::new(BlockCounter { blocks: AtomicUsize::new(0) });
//!
//! let config = ConversionConfig::builder()
//!     .progress_callback(counter as Arc<dyn ConversionProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use crate::format::Format;
use std::sync::Arc;

/// Called by the conversion pipeline as it moves through its stages.
///
/// Implementations must be `Send + Sync`: independent conversions may run
/// concurrently and share one callback. All methods default to no-ops so
/// callers only override what they care about.
pub trait ConversionProgressCallback: Send + Sync {
    /// Called once the request has been validated, before extraction.
    fn on_conversion_start(&self, source: Format, target: Format, input_bytes: usize) {
        let _ = (source, target, input_bytes);
    }

    /// Called when text extraction finished.
    ///
    /// # Arguments
    /// * `blocks` — paragraphs or text blocks that will be written out
    fn on_extracted(&self, blocks: usize) {
        let _ = blocks;
    }

    /// Called when the target document has been fully assembled.
    fn on_conversion_complete(&self, output_bytes: usize) {
        let _ = output_bytes;
    }

    /// Called when the conversion fails at any stage.
    fn on_conversion_error(&self, error: &str) {
        let _ = error;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ConversionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ConversionConfig`].
pub type ProgressCallback = Arc<dyn ConversionProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct TrackingCallback {
        starts: AtomicUsize,
        blocks: AtomicUsize,
        output: AtomicUsize,
        errors: AtomicUsize,
    }

    impl ConversionProgressCallback for TrackingCallback {
        fn on_conversion_start(&self, _source: Format, _target: Format, _input_bytes: usize) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }

        fn on_extracted(&self, blocks: usize) {
            self.blocks.store(blocks, Ordering::SeqCst);
        }

        fn on_conversion_complete(&self, output_bytes: usize) {
            self.output.store(output_bytes, Ordering::SeqCst);
        }

        fn on_conversion_error(&self, _error: &str) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_conversion_start(Format::Pdf, Format::Txt, 10);
        cb.on_extracted(3);
        cb.on_conversion_complete(42);
        cb.on_conversion_error("boom");
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback {
            starts: AtomicUsize::new(0),
            blocks: AtomicUsize::new(0),
            output: AtomicUsize::new(0),
            errors: AtomicUsize::new(0),
        };

        tracker.on_conversion_start(Format::Docx, Format::Pdf, 1000);
        tracker.on_extracted(7);
        tracker.on_conversion_complete(2048);

        assert_eq!(tracker.starts.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.blocks.load(Ordering::SeqCst), 7);
        assert_eq!(tracker.output.load(Ordering::SeqCst), 2048);
        assert_eq!(tracker.errors.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: ProgressCallback = Arc::new(NoopProgressCallback);
        cb.on_conversion_start(Format::Pdf, Format::Docx, 1);
        cb.on_extracted(1);
    }
}
