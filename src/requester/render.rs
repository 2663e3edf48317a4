//! PDF rasterisation and image encoding for the vision requester.
//!
//! pdfium wraps a C++ library with thread-local state, so rendering runs in
//! `spawn_blocking`. Each page is capped at `max_pixels` on its longest
//! edge, encoded as PNG (lossless keeps text crisp for the model) and
//! wrapped as base64 `ImageData` with `detail: "high"`.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::ImageData;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::io::Cursor;
use std::sync::Arc;
use tracing::{debug, info};

/// Why the document could not be turned into page images.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RenderError {
    #[error("The PDF is password protected")]
    PasswordProtected,

    #[error("The PDF could not be opened: {0}")]
    Unreadable(String),

    #[error("The PDF has no pages")]
    NoPages,

    #[error("Page {page} could not be rendered: {detail}")]
    Page { page: usize, detail: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Render every page of `bytes` and encode it for the VLM.
pub async fn render_document(bytes: Arc<[u8]>, max_pixels: u32) -> Result<Vec<ImageData>, RenderError> {
    let images = tokio::task::spawn_blocking(move || render_blocking(&bytes, max_pixels))
        .await
        .map_err(|e| RenderError::Internal(format!("Render task panicked: {e}")))??;

    images
        .iter()
        .enumerate()
        .map(|(i, img)| {
            encode_page(img).map_err(|e| RenderError::Page {
                page: i + 1,
                detail: format!("Image encoding failed: {e}"),
            })
        })
        .collect()
}

fn render_blocking(bytes: &[u8], max_pixels: u32) -> Result<Vec<DynamicImage>, RenderError> {
    let pdfium = Pdfium::default();

    let document = pdfium.load_pdf_from_byte_slice(bytes, None).map_err(|e| {
        let detail = format!("{:?}", e);
        if detail.to_lowercase().contains("password") {
            RenderError::PasswordProtected
        } else {
            RenderError::Unreadable(detail)
        }
    })?;

    let pages = document.pages();
    let total = pages.len() as usize;
    if total == 0 {
        return Err(RenderError::NoPages);
    }
    info!("PDF loaded: {} pages", total);

    let render_config = PdfRenderConfig::new()
        .set_target_width(max_pixels as i32)
        .set_maximum_height(max_pixels as i32);

    let mut images = Vec::with_capacity(total);
    for (idx, page) in pages.iter().enumerate() {
        let bitmap = page
            .render_with_config(&render_config)
            .map_err(|e| RenderError::Page {
                page: idx + 1,
                detail: format!("{:?}", e),
            })?;
        let image = bitmap.as_image();
        debug!("Rendered page {} → {}x{} px", idx + 1, image.width(), image.height());
        images.push(image);
    }

    Ok(images)
}

/// Encode a rasterised page as a base64 PNG ready for the VLM API.
pub fn encode_page(img: &DynamicImage) -> Result<ImageData, image::ImageError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;

    let b64 = STANDARD.encode(&buf);
    debug!("Encoded image → {} bytes base64", b64.len());

    Ok(ImageData::new(b64, "image/png").with_detail("high"))
}
