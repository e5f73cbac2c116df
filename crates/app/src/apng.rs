use std::{fs::File, io::BufReader, path::Path};

use tardis_core::{
    AnimationSequence, AssetKind, Frame, ImageDecoder, ImageHandle, Result, TardisError,
};

/// Decodes animated PNG files with the `png` crate.
///
/// Frame delays come from each `fcTL` chunk and the loop count from `acTL`.
/// Every frame is composited onto a full-size RGBA canvas, so a frame stored
/// as a small patch still yields the whole picture. A default image that is
/// not part of the animation gets a zero duration. Plain PNG files decode to a
/// single frame.
#[derive(Debug, Default, Clone, Copy)]
pub struct ApngDecoder;

impl ImageDecoder for ApngDecoder {
    fn decode(&self, path: &Path) -> Result<AnimationSequence> {
        let file = match File::open(path) {
            Ok(file) => file,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(TardisError::not_found(AssetKind::Animation, path));
            }
            Err(err) => return Err(err.into()),
        };

        let mut decoder = png::Decoder::new(BufReader::new(file));
        decoder.set_transformations(png::Transformations::EXPAND | png::Transformations::STRIP_16);
        let mut reader = decoder
            .read_info()
            .map_err(|err| TardisError::decode(path, err))?;

        let info = reader.info();
        let (width, height) = (info.width, info.height);
        let (animated, loop_count) = info
            .animation_control
            .as_ref()
            .map(|control| (control.num_frames as usize, control.num_plays))
            .unwrap_or((0, 0));
        let separate_default = animated > 0 && info.frame_control.is_none();
        let total = if animated == 0 {
            1
        } else {
            animated + usize::from(separate_default)
        };

        let stem = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or("frame");
        let mut canvas = Canvas::new(width, height);
        let mut frames = Vec::with_capacity(total);
        for index in 0..total {
            let mut buffer = vec![0; reader.output_buffer_size()];
            let output = reader
                .next_frame(&mut buffer)
                .map_err(|err| TardisError::decode(path, err))?;
            buffer.truncate(output.buffer_size());
            let patch = to_rgba(&buffer, output.color_type)
                .ok_or_else(|| TardisError::decode(path, "unsupported colour type"))?;
            let label = format!("{stem}#{index}");

            if animated == 0 || (index == 0 && separate_default) {
                frames.push(Frame::new(
                    ImageHandle::with_pixels(label, output.width, output.height, patch),
                    0,
                ));
                continue;
            }

            let Some(control) = reader.info().frame_control.as_ref() else {
                return Err(TardisError::decode(path, "animation frame without fcTL"));
            };
            let first = index == usize::from(separate_default);
            let dispose = match control.dispose_op {
                // nothing to go back to before the first frame
                png::DisposeOp::Previous if first => png::DisposeOp::Background,
                op => op,
            };
            let previous =
                matches!(dispose, png::DisposeOp::Previous).then(|| canvas.pixels.clone());

            let region = Region {
                x: control.x_offset,
                y: control.y_offset,
                width: output.width,
                height: output.height,
            };
            canvas.draw(&patch, region, control.blend_op);
            frames.push(Frame::new(
                ImageHandle::with_pixels(label, width, height, canvas.pixels.clone()),
                delay_ms(control.delay_num, control.delay_den),
            ));

            match dispose {
                png::DisposeOp::Background => canvas.clear(region),
                png::DisposeOp::Previous => {
                    if let Some(pixels) = previous {
                        canvas.pixels = pixels;
                    }
                }
                png::DisposeOp::None => {}
            }
        }

        AnimationSequence::new(frames, loop_count)
    }
}

/// Frame delay in milliseconds; a zero denominator means hundredths.
fn delay_ms(num: u16, den: u16) -> u32 {
    let den = match den {
        0 => 100,
        den => u32::from(den),
    };
    u32::from(num) * 1000 / den
}

/// Widens expanded 8-bit output to RGBA.
fn to_rgba(buffer: &[u8], color: png::ColorType) -> Option<Vec<u8>> {
    let pixels = match color {
        png::ColorType::Rgba => buffer.to_vec(),
        png::ColorType::Rgb => buffer
            .chunks_exact(3)
            .flat_map(|px| [px[0], px[1], px[2], 255])
            .collect(),
        png::ColorType::GrayscaleAlpha => buffer
            .chunks_exact(2)
            .flat_map(|px| [px[0], px[0], px[0], px[1]])
            .collect(),
        png::ColorType::Grayscale => buffer.iter().flat_map(|&g| [g, g, g, 255]).collect(),
        png::ColorType::Indexed => return None,
    };
    Some(pixels)
}

#[derive(Debug, Clone, Copy)]
struct Region {
    x: u32,
    y: u32,
    width: u32,
    height: u32,
}

/// Output buffer that animation frames are drawn onto, RGBA.
struct Canvas {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl Canvas {
    fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; width as usize * height as usize * 4],
        }
    }

    /// Byte ranges of each canvas row covered by `region`, paired with the
    /// matching row offset in the patch. Parts outside the canvas are cut.
    fn rows(&self, region: Region) -> impl Iterator<Item = (usize, usize, usize)> {
        let canvas_width = self.width as usize;
        let x_end = (region.x + region.width).min(self.width) as usize;
        let y_end = (region.y + region.height).min(self.height) as usize;
        let x = (region.x as usize).min(x_end);
        let patch_width = region.width as usize;
        (region.y as usize..y_end).map(move |row| {
            let start = (row * canvas_width + x) * 4;
            let patch_start = (row - region.y as usize) * patch_width * 4;
            (start, start + (x_end - x) * 4, patch_start)
        })
    }

    fn draw(&mut self, patch: &[u8], region: Region, blend: png::BlendOp) {
        for (start, end, patch_start) in self.rows(region).collect::<Vec<_>>() {
            let target = &mut self.pixels[start..end];
            let source = &patch[patch_start..patch_start + (end - start)];
            match blend {
                png::BlendOp::Source => target.copy_from_slice(source),
                png::BlendOp::Over => {
                    for (dst, src) in target.chunks_exact_mut(4).zip(source.chunks_exact(4)) {
                        blend_over(dst, src);
                    }
                }
            }
        }
    }

    fn clear(&mut self, region: Region) {
        for (start, end, _) in self.rows(region).collect::<Vec<_>>() {
            self.pixels[start..end].fill(0);
        }
    }
}

/// Straight-alpha "over" of one RGBA pixel.
fn blend_over(dst: &mut [u8], src: &[u8]) {
    let src_alpha = u32::from(src[3]);
    match src_alpha {
        0 => return,
        255 => {
            dst.copy_from_slice(src);
            return;
        }
        _ => {}
    }

    let dst_weight = u32::from(dst[3]) * (255 - src_alpha) / 255;
    let out_alpha = src_alpha + dst_weight;
    for channel in 0..3 {
        let mixed = u32::from(src[channel]) * src_alpha + u32::from(dst[channel]) * dst_weight;
        dst[channel] = (mixed / out_alpha) as u8;
    }
    dst[3] = out_alpha as u8;
}
