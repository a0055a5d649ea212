use std::{fs::File, io::{BufWriter, Write}, path::PathBuf};

use ndarray::Array2;

use crate::EncodingError;

/// Writes numbered RGB frames as binary PPM images.
pub struct FrameEncoder {
    /// The directory into which the frames will be placed.
    path: PathBuf,
    num_frames: u64,
    current_frame: u64,
}

impl FrameEncoder {
    pub fn new(path: PathBuf, num_frames: u64) -> Result<FrameEncoder, EncodingError> {
        std::fs::create_dir_all(&path)?;

        Ok(Self {
            path,
            num_frames,
            current_frame: 0,
        })
    }

    fn frame_path(&self, frame: u64) -> PathBuf {
        let max_digits = self.num_frames.saturating_sub(1).checked_ilog10().unwrap_or(0) + 1;
        self.path.join(format!("{frame:0width$}.ppm", width = max_digits as usize))
    }

    pub fn current_frame(&self) -> u64 {
        self.current_frame
    }

    /// Writes the next frame. `image` is indexed `[(row, column)]` with row 0 at the top.
    pub fn encode_frame(&mut self, image: &Array2<[u8; 3]>) -> Result<PathBuf, EncodingError> {
        let path = self.frame_path(self.current_frame);
        let mut writer = BufWriter::new(File::create(&path)?);
        let (height, width) = image.dim();

        write!(writer, "P6\n{width} {height}\n255\n")?;
        let bytes: Vec<u8> = image.iter().flatten().copied().collect();
        writer.write_all(&bytes)?;
        writer.flush()?;

        self.current_frame += 1;

        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frames_are_numbered_and_padded() {
        let dir = tempfile::tempdir().unwrap();
        let mut encoder = FrameEncoder::new(dir.path().join("frames"), 120).unwrap();
        let image = Array2::from_shape_fn((2, 3), |(r, c)| [r as u8, c as u8, 7]);

        let first = encoder.encode_frame(&image).unwrap();
        let second = encoder.encode_frame(&image).unwrap();

        assert_eq!(first.file_name().unwrap(), "000.ppm");
        assert_eq!(second.file_name().unwrap(), "001.ppm");
        assert_eq!(encoder.current_frame(), 2);

        let bytes = std::fs::read(first).unwrap();
        let header = b"P6\n3 2\n255\n";
        assert_eq!(&bytes[..header.len()], header);
        assert_eq!(&bytes[header.len()..], &[0, 0, 7, 0, 1, 7, 0, 2, 7, 1, 0, 7, 1, 1, 7, 1, 2, 7]);
    }
}
