//! Camera pixel formats to packed RGBA.

use anyhow::{Result, anyhow};
use rayon::prelude::*;
use yuv::{
    YuvBiPlanarImage, YuvConversionMode, YuvPackedImage, YuvRange, YuvStandardMatrix,
    yuv_nv12_to_rgba, yuyv422_to_rgba,
};
use zune_jpeg::{
    JpegDecoder,
    zune_core::{bytestream::ZCursor, colorspace::ColorSpace, options::DecoderOptions},
};

use crate::types::Frame;

/// Layout of a raw capture buffer, independent of the capture backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PixelLayout {
    Nv12,
    Yuyv,
    Mjpeg,
    Rgb,
    Bgr,
    Gray,
}

/// Decode one capture buffer into a [`Frame`].
///
/// `width`/`height` are the negotiated capture resolution; for MJPEG the
/// dimensions in the JPEG header win.
pub fn convert_to_frame(layout: PixelLayout, data: &[u8], width: u32, height: u32) -> Result<Frame> {
    let (rgba, width, height) = match layout {
        PixelLayout::Nv12 => (nv12_to_rgba(data, width, height)?, width, height),
        PixelLayout::Yuyv => (yuyv_to_rgba(data, width, height)?, width, height),
        PixelLayout::Mjpeg => mjpeg_to_rgba(data)?,
        PixelLayout::Rgb => (packed_to_rgba(data, width, height, 3, |px| [px[0], px[1], px[2]])?, width, height),
        PixelLayout::Bgr => (packed_to_rgba(data, width, height, 3, |px| [px[2], px[1], px[0]])?, width, height),
        PixelLayout::Gray => (packed_to_rgba(data, width, height, 1, |px| [px[0]; 3])?, width, height),
    };
    Ok(Frame::new(rgba, width, height))
}

fn check_len(label: &str, data: &[u8], expected: usize) -> Result<()> {
    if data.len() < expected {
        return Err(anyhow!(
            "{label} buffer too small: got {}, expected {expected}",
            data.len()
        ));
    }
    Ok(())
}

fn nv12_to_rgba(data: &[u8], width: u32, height: u32) -> Result<Vec<u8>> {
    let luma = width as usize * height as usize;
    let chroma = luma / 2;
    check_len("NV12", data, luma + chroma)?;

    let image = YuvBiPlanarImage {
        y_plane: &data[..luma],
        y_stride: width,
        uv_plane: &data[luma..luma + chroma],
        uv_stride: width,
        width,
        height,
    };
    let mut rgba = vec![0u8; luma * 4];
    yuv_nv12_to_rgba(
        &image,
        &mut rgba,
        width * 4,
        YuvRange::Full,
        YuvStandardMatrix::Bt709,
        YuvConversionMode::Balanced,
    )
    .map_err(|err| anyhow!("NV12 conversion failed: {err:?}"))?;
    Ok(rgba)
}

fn yuyv_to_rgba(data: &[u8], width: u32, height: u32) -> Result<Vec<u8>> {
    let pixels = width as usize * height as usize;
    check_len("YUYV", data, pixels * 2)?;

    let packed = YuvPackedImage {
        yuy: data,
        yuy_stride: width * 2,
        width,
        height,
    };
    let mut rgba = vec![0u8; pixels * 4];
    yuyv422_to_rgba(
        &packed,
        &mut rgba,
        width * 4,
        YuvRange::Full,
        YuvStandardMatrix::Bt709,
    )
    .map_err(|err| anyhow!("YUYV conversion failed: {err:?}"))?;
    Ok(rgba)
}

fn mjpeg_to_rgba(data: &[u8]) -> Result<(Vec<u8>, u32, u32)> {
    let options = DecoderOptions::default().jpeg_set_out_colorspace(ColorSpace::RGBA);
    let mut decoder = JpegDecoder::new_with_options(ZCursor::new(data), options);
    let rgba = decoder
        .decode()
        .map_err(|err| anyhow!("MJPEG decode failed: {err:?}"))?;
    let info = decoder
        .info()
        .ok_or_else(|| anyhow!("MJPEG decoder returned no image info"))?;

    let (width, height) = (info.width as u32, info.height as u32);
    let expected = width as usize * height as usize * 4;
    if rgba.len() < expected {
        return Err(anyhow!(
            "MJPEG decode produced {} bytes, expected {expected}",
            rgba.len()
        ));
    }
    Ok((rgba, width, height))
}

/// Expand `bytes_per_pixel`-wide pixels to opaque RGBA via `to_rgb`.
fn packed_to_rgba<F>(data: &[u8], width: u32, height: u32, bytes_per_pixel: usize, to_rgb: F) -> Result<Vec<u8>>
where
    F: Fn(&[u8]) -> [u8; 3] + Sync,
{
    let pixels = width as usize * height as usize;
    check_len("raw", data, pixels * bytes_per_pixel)?;

    let mut rgba = vec![0u8; pixels * 4];
    rgba.par_chunks_exact_mut(4)
        .zip(data.par_chunks_exact(bytes_per_pixel))
        .for_each(|(dst, src)| {
            let [r, g, b] = to_rgb(src);
            dst.copy_from_slice(&[r, g, b, 255]);
        });
    Ok(rgba)
}
