//! Post-processing of model replies: markup parsing, length and format rules,
//! repetition detection and rewriting, violation bookkeeping, and timed display.

pub mod background;
pub mod compliance;
pub mod format_parser;
pub mod processor;
pub mod random;
pub mod rewriter;
pub mod segment;
pub mod sequencer;
pub mod similarity;

pub use background::{BackgroundError, BackgroundTasks, ComplianceReporter};
pub use compliance::{ComplianceMonitor, ComplianceStats, ViolationType};
pub use format_parser::{FormatParser, has_structured_format};
pub use processor::{ProcessOutcome, ResponseProcessor};
pub use random::{FixedRandom, RandomSource, SeededRandom, ThreadRandom};
pub use rewriter::ResponseRewriter;
pub use segment::{MessageSegment, MessageType, QuotedMessage, SegmentStatus, Sender};
pub use sequencer::{DisplaySink, MessageDisplaySequencer, SinkFuture};
pub use similarity::{SimilarityResult, detect_repetition, similarity};
