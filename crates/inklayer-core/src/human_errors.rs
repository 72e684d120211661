// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable error messages and process exit statuses.
//
// Every error kind maps to plain English, a suggestion, and a distinct exit
// status. Only the outermost entry point acts on the exit status.

use crate::error::InklayerError;

/// Exit statuses, one per error kind.
pub mod exit_status {
    pub const GENERIC: u8 = 1;
    pub const UNSUPPORTED_INPUT: u8 = 2;
    pub const CONFIG: u8 = 3;
    pub const OCR_SERVICE: u8 = 4;
    pub const PAGE_COUNT_MISMATCH: u8 = 5;
    pub const GEOMETRY: u8 = 6;
    pub const DOCUMENT: u8 = 7;
}

/// A human-readable error with plain English message and actionable suggestion.
#[derive(Debug, Clone)]
pub struct HumanError {
    /// Plain English summary.
    pub message: String,
    /// What the user should try.
    pub suggestion: String,
    /// Whether running the same command again may succeed.
    pub retriable: bool,
    /// Process exit status for this error kind.
    pub exit_status: u8,
}

/// Convert an `InklayerError` into a `HumanError`.
pub fn humanize_error(err: &InklayerError) -> HumanError {
    match err {
        InklayerError::UnsupportedInputFormat(detail) => HumanError {
            message: "This type of file isn't supported.".into(),
            suggestion: format!(
                "Use a PDF, TIFF, JPEG, PNG, or BMP file. (Got: {detail})"
            ),
            retriable: false,
            exit_status: exit_status::UNSUPPORTED_INPUT,
        },

        InklayerError::ConfigLoad(detail) => HumanError {
            message: "The settings file couldn't be loaded.".into(),
            suggestion: format!(
                "Check that config.json exists and sets DOCUMENT_INTELLIGENCE_URL and DOCUMENT_INTELLIGENCE_KEY. ({detail})"
            ),
            retriable: false,
            exit_status: exit_status::CONFIG,
        },

        InklayerError::OcrService(detail) => humanize_ocr_error(detail),

        InklayerError::PageCountMismatch { images, ocr_pages } => HumanError {
            message: "The scan and the recognised text don't line up.".into(),
            suggestion: format!(
                "The file produced {images} page image(s) but text recognition returned {ocr_pages} page(s). Try re-saving the file and run again."
            ),
            retriable: false,
            exit_status: exit_status::PAGE_COUNT_MISMATCH,
        },

        InklayerError::GeometryDegenerate(detail) => HumanError {
            message: "A page has no usable size.".into(),
            suggestion: format!("The scan may be empty or damaged. ({detail})"),
            retriable: false,
            exit_status: exit_status::GEOMETRY,
        },

        InklayerError::PdfError(_) => HumanError {
            message: "There's a problem with this PDF file.".into(),
            suggestion: "The file may be damaged, or it may not contain scanned page images.".into(),
            retriable: false,
            exit_status: exit_status::DOCUMENT,
        },

        InklayerError::ImageError(_) => HumanError {
            message: "There's a problem with this image.".into(),
            suggestion: "The image may be damaged or in an unusual colour format. Try saving it as a PNG first.".into(),
            retriable: false,
            exit_status: exit_status::DOCUMENT,
        },

        InklayerError::Io(io_err) => {
            if io_err.kind() == std::io::ErrorKind::NotFound {
                HumanError {
                    message: "The file couldn't be found.".into(),
                    suggestion: "Check the path and try again.".into(),
                    retriable: false,
                    exit_status: exit_status::GENERIC,
                }
            } else if io_err.kind() == std::io::ErrorKind::PermissionDenied {
                HumanError {
                    message: "Permission was denied reading or writing a file.".into(),
                    suggestion: "Check the file and folder permissions.".into(),
                    retriable: false,
                    exit_status: exit_status::GENERIC,
                }
            } else {
                HumanError {
                    message: "There was a problem reading or writing a file.".into(),
                    suggestion: "Try again. If this keeps happening, the disk may be full.".into(),
                    retriable: true,
                    exit_status: exit_status::GENERIC,
                }
            }
        }
    }
}

/// Parse OCR service error details into human-readable messages.
fn humanize_ocr_error(detail: &str) -> HumanError {
    let lower = detail.to_ascii_lowercase();

    let (message, suggestion, retriable) = if lower.contains("timed out") {
        (
            "Text recognition took too long.",
            "The service may be busy. Try again, or raise ocr.timeout_secs in config.json.",
            true,
        )
    } else if lower.contains("401") || lower.contains("403") || lower.contains("unauthorized") {
        (
            "The text recognition service rejected the access key.",
            "Check DOCUMENT_INTELLIGENCE_KEY in config.json.",
            false,
        )
    } else if lower.contains("404") {
        (
            "The text recognition service address looks wrong.",
            "Check DOCUMENT_INTELLIGENCE_URL in config.json.",
            false,
        )
    } else if lower.contains("429") || lower.contains("throttl") {
        (
            "The text recognition service is rate limiting requests.",
            "Wait a minute, then try again.",
            true,
        )
    } else {
        (
            "Text recognition failed.",
            "Check your network connection and try again.",
            true,
        )
    };

    HumanError {
        message: message.into(),
        suggestion: format!("{suggestion} (Detail: {detail})"),
        retriable,
        exit_status: exit_status::OCR_SERVICE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn each_kind_has_a_distinct_status() {
        let statuses = [
            humanize_error(&InklayerError::UnsupportedInputFormat("a.docx".into())).exit_status,
            humanize_error(&InklayerError::ConfigLoad("missing".into())).exit_status,
            humanize_error(&InklayerError::OcrService("boom".into())).exit_status,
            humanize_error(&InklayerError::PageCountMismatch {
                images: 2,
                ocr_pages: 1,
            })
            .exit_status,
            humanize_error(&InklayerError::GeometryDegenerate("zero width".into())).exit_status,
        ];
        let mut sorted = statuses.to_vec();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), statuses.len());
        assert!(!statuses.contains(&0));
    }

    #[test]
    fn timeout_is_retriable() {
        let err = InklayerError::OcrService("analysis timed out after 300s".into());
        let human = humanize_error(&err);
        assert!(human.retriable);
        assert_eq!(human.exit_status, exit_status::OCR_SERVICE);
    }

    #[test]
    fn bad_key_is_not_retriable() {
        let err = InklayerError::OcrService("submit returned 401 Unauthorized".into());
        assert!(!humanize_error(&err).retriable);
    }

    #[test]
    fn mismatch_message_names_both_counts() {
        let human = humanize_error(&InklayerError::PageCountMismatch {
            images: 3,
            ocr_pages: 2,
        });
        assert!(human.suggestion.contains("3 page image"));
        assert!(human.suggestion.contains("2 page"));
    }
}
