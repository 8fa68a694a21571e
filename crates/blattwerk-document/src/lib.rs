// SPDX-License-Identifier: PMPL-1.0-or-later
//
// blattwerk-document — Derivative image processing and PDF composition.
//
// CORE CAPABILITIES:
// 1. Image primitives: decode, scale, append, JPEG re-encode with DPI
//    metadata carried over from the source (TIFF or JPEG).
// 2. Footer branding: pre-rendered template band plus per-page granular
//    identifiers.
// 3. PDF engineering: direct document assembly with `lopdf` — page images,
//    searchable OCR under-layer, outline tree, PDF/A output intent.

pub mod footer;
pub mod image;
pub mod pdf;

pub use footer::FooterRenderer;
pub use image::processor::ImageProcessor;
pub use pdf::composer::{ComposeResult, PdfComposer};
