use image::imageops::{self, FilterType};
use image::{ImageBuffer, Rgb, RgbImage};

use super::error::DominoError;

type FrameView<'a> = ImageBuffer<Rgb<u8>, &'a [u8]>;

/// 帧数据结构
#[derive(Debug, Clone)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>, // RGB 格式
    pub timestamp_ms: u64,
    pub frame_number: u64,
}

impl Frame {
    pub fn new(width: u32, height: u32, data: Vec<u8>, timestamp_ms: u64, frame_number: u64) -> Self {
        Self {
            width,
            height,
            data,
            timestamp_ms,
            frame_number,
        }
    }

    pub fn from_rgba(
        width: u32,
        height: u32,
        rgba: &[u8],
        timestamp_ms: u64,
        frame_number: u64,
    ) -> Result<Self, DominoError> {
        let expected = width as usize * height as usize * 4;
        if rgba.len() != expected {
            return Err(DominoError::InvalidFrame(format!(
                "expected {} RGBA bytes for {}x{}, got {}",
                expected,
                width,
                height,
                rgba.len()
            )));
        }

        let mut rgb = Vec::with_capacity(width as usize * height as usize * 3);
        for chunk in rgba.chunks_exact(4) {
            rgb.extend_from_slice(&chunk[..3]);
        }
        Ok(Self::new(width, height, rgb, timestamp_ms, frame_number))
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Rejects empty frames and buffers whose length disagrees with the dimensions.
    pub fn validate(&self) -> Result<(), DominoError> {
        if self.width == 0 || self.height == 0 {
            return Err(DominoError::InvalidFrame(format!(
                "empty frame {}x{}",
                self.width, self.height
            )));
        }
        let expected = self.pixel_count() * 3;
        if self.data.len() != expected {
            return Err(DominoError::InvalidFrame(format!(
                "expected {} RGB bytes for {}x{}, got {}",
                expected,
                self.width,
                self.height,
                self.data.len()
            )));
        }
        Ok(())
    }

    fn view(&self) -> Result<FrameView<'_>, DominoError> {
        self.validate()?;
        ImageBuffer::from_raw(self.width, self.height, self.data.as_slice())
            .ok_or_else(|| DominoError::InvalidFrame("pixel buffer too small".into()))
    }

    /// Detector input: bilinear resize to `size`x`size`, scaled to [0, 1], batch of one.
    pub fn preprocess(&self, size: u32) -> Result<Tensor, DominoError> {
        let view = self.view()?;
        let resized = imageops::resize(&view, size, size, FilterType::Triangle);
        Ok(Tensor::from_rgb_image(&resized))
    }

    /// Copies a rectangle out of the frame, clipped to the frame bounds.
    pub fn crop(&self, x: u32, y: u32, width: u32, height: u32) -> Result<RgbImage, DominoError> {
        self.validate()?;
        let x_end = x.saturating_add(width).min(self.width);
        let y_end = y.saturating_add(height).min(self.height);

        if x >= x_end || y >= y_end {
            return Err(DominoError::EmptyRegion {
                x,
                y,
                width,
                height,
            });
        }

        let crop_width = x_end - x;
        let crop_height = y_end - y;
        let row_len = crop_width as usize * 3;
        let mut data = Vec::with_capacity(row_len * crop_height as usize);
        for row in y..y_end {
            let start = (row as usize * self.width as usize + x as usize) * 3;
            data.extend_from_slice(&self.data[start..start + row_len]);
        }

        RgbImage::from_raw(crop_width, crop_height, data)
            .ok_or_else(|| DominoError::InvalidFrame("crop buffer size mismatch".into()))
    }
}

/// 从原生层传递的原始帧数据 (YUV420 planes)
#[derive(Debug, Clone)]
pub struct YuvFrame {
    pub width: u32,
    pub height: u32,
    pub y_plane: Vec<u8>,
    pub u_plane: Vec<u8>,
    pub v_plane: Vec<u8>,
    pub timestamp_ms: u64,
    pub frame_number: u64,
}

impl YuvFrame {
    pub fn to_rgb(&self) -> Result<Frame, DominoError> {
        let w = self.width as usize;
        let h = self.height as usize;
        let chroma_len = w.div_ceil(2) * h.div_ceil(2);

        if self.y_plane.len() < w * h
            || self.u_plane.len() < chroma_len
            || self.v_plane.len() < chroma_len
        {
            return Err(DominoError::InvalidFrame(format!(
                "YUV planes too small for {}x{} (y={}, u={}, v={})",
                w,
                h,
                self.y_plane.len(),
                self.u_plane.len(),
                self.v_plane.len()
            )));
        }

        let chroma_width = w.div_ceil(2);
        let mut rgb_data = vec![0u8; w * h * 3];

        for y in 0..h {
            for x in 0..w {
                let y_idx = y * w + x;
                let uv_idx = (y / 2) * chroma_width + x / 2;

                let y_val = self.y_plane[y_idx] as f32;
                let u_val = self.u_plane[uv_idx] as f32 - 128.0;
                let v_val = self.v_plane[uv_idx] as f32 - 128.0;

                let rgb_idx = y_idx * 3;
                rgb_data[rgb_idx] = (y_val + 1.402 * v_val).clamp(0.0, 255.0) as u8;
                rgb_data[rgb_idx + 1] =
                    (y_val - 0.344136 * u_val - 0.714136 * v_val).clamp(0.0, 255.0) as u8;
                rgb_data[rgb_idx + 2] = (y_val + 1.772 * u_val).clamp(0.0, 255.0) as u8;
            }
        }

        Ok(Frame::new(
            self.width,
            self.height,
            rgb_data,
            self.timestamp_ms,
            self.frame_number,
        ))
    }
}

/// Dense NHWC f32 tensor handed to the inference models.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    pub shape: [usize; 4],
    pub data: Vec<f32>,
}

impl Tensor {
    pub fn from_rgb_image(image: &RgbImage) -> Self {
        let (width, height) = image.dimensions();
        let data = image.as_raw().iter().map(|&v| v as f32 / 255.0).collect();
        Self {
            shape: [1, height as usize, width as usize, 3],
            data,
        }
    }

    pub fn height(&self) -> usize {
        self.shape[1]
    }

    pub fn width(&self) -> usize {
        self.shape[2]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_frame(width: u32, height: u32, fill: u8) -> Frame {
        Frame::new(width, height, vec![fill; (width * height * 3) as usize], 0, 0)
    }

    #[test]
    fn test_frame_creation() {
        let frame = create_test_frame(100, 50, 255);
        assert_eq!(frame.pixel_count(), 5000);
        assert!(frame.validate().is_ok());
    }

    #[test]
    fn test_malformed_frame_rejected() {
        let frame = Frame::new(10, 10, vec![0u8; 50], 0, 0);
        assert!(matches!(frame.validate(), Err(DominoError::InvalidFrame(_))));
        assert!(frame.preprocess(320).is_err());

        let empty = Frame::new(0, 10, vec![], 0, 0);
        assert!(empty.validate().is_err());
    }

    #[test]
    fn test_preprocess_shape_and_range() {
        let frame = create_test_frame(640, 480, 255);
        let tensor = frame.preprocess(320).unwrap();

        assert_eq!(tensor.shape, [1, 320, 320, 3]);
        assert_eq!(tensor.data.len(), 320 * 320 * 3);
        assert!(tensor.data.iter().all(|&v| v > 0.99 && v <= 1.0));
    }

    #[test]
    fn test_preprocess_leaves_frame_untouched() {
        let mut frame = create_test_frame(32, 32, 0);
        frame.data[0] = 200;
        let before = frame.data.clone();

        let first = frame.preprocess(16).unwrap();
        let second = frame.preprocess(16).unwrap();

        assert_eq!(frame.data, before);
        assert_eq!(first, second);
    }

    #[test]
    fn test_crop_clips_to_bounds() {
        let frame = create_test_frame(20, 10, 10);
        let crop = frame.crop(15, 5, 10, 10).unwrap();
        assert_eq!(crop.dimensions(), (5, 5));

        let outside = frame.crop(20, 0, 5, 5);
        assert!(matches!(outside, Err(DominoError::EmptyRegion { .. })));

        let zero_width = frame.crop(2, 2, 0, 5);
        assert!(zero_width.is_err());
    }

    #[test]
    fn test_from_rgba_drops_alpha() {
        let rgba = vec![1u8, 2, 3, 255, 4, 5, 6, 255];
        let frame = Frame::from_rgba(2, 1, &rgba, 5, 1).unwrap();
        assert_eq!(frame.data, vec![1, 2, 3, 4, 5, 6]);
        assert!(Frame::from_rgba(3, 1, &rgba, 0, 0).is_err());
    }

    #[test]
    fn test_yuv_to_rgb() {
        let width = 64;
        let height = 64;
        let raw = YuvFrame {
            width,
            height,
            y_plane: vec![128u8; (width * height) as usize],
            u_plane: vec![128u8; (width * height / 4) as usize],
            v_plane: vec![128u8; (width * height / 4) as usize],
            timestamp_ms: 0,
            frame_number: 0,
        };

        let frame = raw.to_rgb().unwrap();
        assert_eq!(frame.data.len(), (width * height * 3) as usize);
        assert!(frame.data.iter().all(|&v| v == 128));
    }

    #[test]
    fn test_yuv_short_plane_rejected() {
        let raw = YuvFrame {
            width: 4,
            height: 4,
            y_plane: vec![0u8; 8],
            u_plane: vec![128u8; 4],
            v_plane: vec![128u8; 4],
            timestamp_ms: 0,
            frame_number: 0,
        };
        assert!(raw.to_rgb().is_err());
    }
}
