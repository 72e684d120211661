// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF module: building overlay pages, assembling them into a document, and
// reading existing PDFs.

pub mod assembler;
pub mod reader;
pub mod writer;

pub use assembler::DocumentAssembler;
pub use reader::PdfReader;
pub use writer::{OverlayPageBuilder, PageFragment};
