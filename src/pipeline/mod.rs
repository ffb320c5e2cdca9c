//! Pipeline stages for document conversion.
//!
//! Each submodule implements exactly one transformation step, so each can be
//! tested on its own and a format backend can change without touching the
//! others.
//!
//! ## Data Flow
//!
//! ```text
//!            ┌──▶ docx::read_paragraphs ──▶ clean_paragraph ──▶ pdf::render
//! validate ──┤
//!            └──▶ pdf::extract_pages ───▶ split_blocks ──┬──▶ assemble_text
//!                                                        └──▶ docx::write_document
//! ```
//!
//! 1. [`input`]    — resolve a user-supplied path or URL into an uploaded document
//! 2. [`validate`] — empty, size and signature checks before any parsing
//! 3. [`docx`]     — read paragraphs from, and write paragraphs to, DOCX packages
//! 4. [`pdf`]      — extract page text from, and lay text out into, PDF files
//!    (faces and metrics live in `font`)
//! 5. [`postprocess`] — deterministic cleanup of extracted text

pub mod docx;
pub(crate) mod font;
pub mod input;
pub mod pdf;
pub mod postprocess;
pub mod validate;
