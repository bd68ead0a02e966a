//! Pairing payload to scannable QR image.

use std::io::Cursor;

use anyhow::{Context, Result};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::{DynamicImage, GrayImage, ImageFormat, Luma};
use qrcode::QrCode;

use super::BaseCodeRenderer;

/// Pixels per QR module.
const MODULE_SIZE: u32 = 8;

/// Renders pairing payloads as PNG data URLs.
#[derive(Debug, Clone, Default)]
pub struct QrCodeRenderer;

impl QrCodeRenderer {
    pub fn new() -> Self {
        Self
    }

    pub fn render_image(&self, payload: &str) -> Result<GrayImage> {
        let code = QrCode::new(payload.as_bytes()).context("payload does not fit in a QR code")?;
        Ok(code
            .render::<Luma<u8>>()
            .module_dimensions(MODULE_SIZE, MODULE_SIZE)
            .build())
    }

    pub fn render_png(&self, payload: &str) -> Result<Vec<u8>> {
        let image = self.render_image(payload)?;
        let mut png = Vec::new();
        DynamicImage::ImageLuma8(image)
            .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
            .context("failed to encode QR code as PNG")?;
        Ok(png)
    }
}

#[async_trait]
impl BaseCodeRenderer for QrCodeRenderer {
    async fn encode_to_image(&self, payload: &str) -> Result<String> {
        let png = self.render_png(payload)?;
        Ok(format!("data:image/png;base64,{}", STANDARD.encode(png)))
    }
}
