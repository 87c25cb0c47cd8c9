use std::{
    fs::{create_dir_all, File},
    io::{BufWriter, Write},
    path::PathBuf,
};

use crate::{
    colors::{render_rgb, VisualizationParams},
    error::{LbmError, Result},
    lattice_state::LatticeState,
};

/// Repeat every pixel `factor x factor` times.
pub fn upscale_rgb(rgb: &[u8], width: usize, height: usize, factor: usize) -> Vec<u8> {
    if factor <= 1 {
        return rgb.to_vec();
    }

    let out_width = width * factor;
    let mut out = Vec::with_capacity(rgb.len() * factor * factor);
    for y in 0..height {
        let row = &rgb[y * width * 3..(y + 1) * width * 3];
        let mut scaled_row = Vec::with_capacity(out_width * 3);
        for pixel in row.chunks_exact(3) {
            for _ in 0..factor {
                scaled_row.extend_from_slice(pixel);
            }
        }
        for _ in 0..factor {
            out.extend_from_slice(&scaled_row);
        }
    }
    out
}

/// Encode 8 bit RGB pixels as PNG.
pub fn write_png<W: Write>(writer: W, rgb: &[u8], width: usize, height: usize) -> Result<()> {
    if rgb.len() != width * height * 3 {
        return Err(LbmError::InvalidConfig(format!(
            "image buffer has {} bytes, expected {}x{}x3",
            rgb.len(),
            width,
            height
        )));
    }

    let mut encoder = png::Encoder::new(writer, width as u32, height as u32);
    encoder.set_color(png::ColorType::Rgb);
    encoder.set_depth(png::BitDepth::Eight);
    encoder.set_compression(png::Compression::Fast);
    let mut writer = encoder.write_header()?;
    writer.write_image_data(rgb)?;
    writer.finish()?;
    Ok(())
}

pub struct ImageExporter {
    folder: PathBuf,
    visualization_params: VisualizationParams,
    upscale: usize,
}

impl ImageExporter {
    pub fn new(
        folder: impl Into<PathBuf>,
        visualization_params: VisualizationParams,
        upscale: usize,
    ) -> Result<ImageExporter> {
        let folder = folder.into();
        create_dir_all(&folder)?;
        Ok(ImageExporter {
            folder,
            visualization_params,
            upscale: upscale.max(1),
        })
    }

    pub fn export_frame(&self, state: &LatticeState, frame: usize) -> Result<PathBuf> {
        let rgb = render_rgb(state, self.visualization_params);
        let rgb = upscale_rgb(&rgb, state.width(), state.height(), self.upscale);

        let path = self.folder.join(format!("frame_{:05}.png", frame));
        let file = BufWriter::new(File::create(&path)?);
        write_png(file, &rgb, state.width() * self.upscale, state.height() * self.upscale)?;
        Ok(path)
    }
}
