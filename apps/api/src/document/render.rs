//! PDF rasterization: every page of the uploaded document rendered to a PNG
//! for the page viewer, in document order.
//!
//! pdfium wraps the C++ pdfium library, which keeps thread-local state and
//! must not be called from async contexts, so all rendering runs inside
//! `spawn_blocking`.

use std::io::Cursor;

use bytes::Bytes;
use image::ImageFormat;
use pdfium_render::prelude::*;
use tracing::{debug, info};

use crate::errors::AppError;

/// Longest rendered edge in pixels. Matches the page viewer's maximum zoom,
/// so images are never upscaled client-side.
const RENDER_TARGET_WIDTH: i32 = 1000;

/// One rendered page.
#[derive(Debug, Clone)]
pub struct PageImage {
    pub png: Bytes,
    pub width: u32,
    pub height: u32,
}

/// Rasterizes every page of a PDF into PNGs.
pub async fn render_pages(data: Vec<u8>) -> Result<Vec<PageImage>, AppError> {
    let pages = tokio::task::spawn_blocking(move || render_pages_blocking(&data))
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("render task panicked: {e}")))??;

    info!("PDF pages extracted as images ({} pages)", pages.len());
    Ok(pages)
}

fn render_pages_blocking(data: &[u8]) -> Result<Vec<PageImage>, AppError> {
    let pdfium = Pdfium::default();

    let document = pdfium
        .load_pdf_from_byte_slice(data, None)
        .map_err(|e| AppError::Pdf(format!("could not open PDF: {e:?}")))?;

    let render_config = PdfRenderConfig::new()
        .set_target_width(RENDER_TARGET_WIDTH)
        .set_maximum_height(RENDER_TARGET_WIDTH);

    let mut pages = Vec::with_capacity(document.pages().len() as usize);

    for (index, page) in document.pages().iter().enumerate() {
        let bitmap = page
            .render_with_config(&render_config)
            .map_err(|e| AppError::Pdf(format!("could not render page {}: {e:?}", index + 1)))?;

        let image = bitmap.as_image();
        let (width, height) = (image.width(), image.height());

        let mut png = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
            .map_err(|e| AppError::Pdf(format!("could not encode page {}: {e}", index + 1)))?;

        debug!("Rendered page {} → {}x{} px", index + 1, width, height);

        pages.push(PageImage {
            png: Bytes::from(png),
            width,
            height,
        });
    }

    Ok(pages)
}
