// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The OCR service seam, and the timeout guard around a whole analysis.

use std::future::Future;
use std::time::Duration;

use inklayer_core::error::{InklayerError, Result};
use inklayer_core::{InputFormat, OcrDocument};
use tracing::{error, info, instrument};

/// Anything that can recognise the text of a whole document.
///
/// Implementations return pages in source order and words in reading order,
/// and never return a partial result as a success.
pub trait OcrService {
    fn analyze(
        &self,
        document: &[u8],
        format: InputFormat,
    ) -> impl Future<Output = Result<OcrDocument>> + Send;
}

/// Run `service.analyze` with an upper bound on its total duration.
///
/// On expiry the in-flight analysis is dropped and an
/// [`InklayerError::OcrService`] is returned.
#[instrument(skip(service, document), fields(bytes = document.len()))]
pub async fn analyze_with_timeout<S: OcrService + Sync>(
    service: &S,
    document: &[u8],
    format: InputFormat,
    limit: Duration,
) -> Result<OcrDocument> {
    match tokio::time::timeout(limit, service.analyze(document, format)).await {
        Ok(result) => {
            let result = result?;
            info!(
                pages = result.page_count(),
                words = result.word_count(),
                "OCR analysis complete"
            );
            Ok(result)
        }
        Err(_) => {
            error!(limit_secs = limit.as_secs_f64(), "OCR analysis timed out");
            Err(InklayerError::OcrService(format!(
                "analysis timed out after {:.1}s",
                limit.as_secs_f64()
            )))
        }
    }
}
