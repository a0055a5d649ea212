use std::path::PathBuf;

use bitflags::bitflags;
use glam::Vec3;
use ndarray::{s, Array2, Array3};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use windtunnel_io::{ppm::FrameEncoder, EncodingError};
use windtunnel_lbm::domain::{CellFlag, Domain};

/// Frames per second of the recorded sequence.
pub const FPS: u64 = 60;

/// Q-criterion values above this mark a cell as part of a vortex.
const Q_THRESHOLD: f32 = 1e-6;

const BACKGROUND: [u8; 3] = [0, 0, 0];
const SURFACE: [u8; 3] = [160, 160, 160];
const VORTEX: [u8; 3] = [255, 255, 255];

/// A visualization layer as named in the configuration file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum VisMode {
    FlagSurface,
    Field,
    QCriterion,
}

bitflags! {
    /// Layers drawn into each recorded frame.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct VisModes: u8 {
        /// Solid cells.
        const FLAG_SURFACE = 1;
        /// Velocity magnitude.
        const FIELD = 1 << 1;
        /// Vortex cores.
        const Q_CRITERION = 1 << 2;
    }
}

impl From<VisMode> for VisModes {
    fn from(mode: VisMode) -> Self {
        match mode {
            VisMode::FlagSurface => VisModes::FLAG_SURFACE,
            VisMode::Field => VisModes::FIELD,
            VisMode::QCriterion => VisModes::Q_CRITERION,
        }
    }
}

impl FromIterator<VisMode> for VisModes {
    fn from_iter<I: IntoIterator<Item = VisMode>>(iter: I) -> Self {
        iter.into_iter().fold(VisModes::empty(), |modes, mode| modes | mode.into())
    }
}

/// Renders the `x = Nx / 2` slice of the domain to numbered PPM frames during a batch run.
pub struct FrameRecorder {
    encoder: FrameEncoder,
    modes: VisModes,
    interval: u64,
}

impl FrameRecorder {
    /// Spaces frames so that `horizon` steps play back in `video_seconds` at [`FPS`].
    pub fn new(
        path: PathBuf,
        horizon: u64,
        video_seconds: f32,
        modes: VisModes,
    ) -> Result<FrameRecorder, EncodingError> {
        let frames = (FPS as f32 * video_seconds).max(1.0) as u64;
        let interval = (horizon / frames).max(1);
        let encoder = FrameEncoder::new(path, horizon / interval + 1)?;

        Ok(Self { encoder, modes, interval })
    }

    pub fn interval(&self) -> u64 {
        self.interval
    }

    pub fn frames(&self) -> u64 {
        self.encoder.current_frame()
    }

    /// Whether a frame is due before the step taken at `t`.
    pub fn next_frame(&self, t: u64) -> bool {
        t % self.interval == 0
    }

    /// Renders and writes one frame. A frame that fails to write is logged and skipped.
    pub fn write_frame(&mut self, domain: &Domain) {
        let image = render_slice(domain, self.modes);

        match self.encoder.encode_frame(&image) {
            Ok(path) => debug!(path = %path.display(), "wrote frame"),
            Err(e) => warn!("skipping frame: {e}"),
        }
    }
}

/// Renders the `x = Nx / 2` plane with y across and z up.
pub fn render_slice(domain: &Domain, modes: VisModes) -> Array2<[u8; 3]> {
    let size = domain.size();
    let x = (size.x / 2) as usize;
    let (ny, nz) = (size.y as usize, size.z as usize);

    let flags = domain.flags.slice(s![x, .., ..]);
    let velocity = domain.velocity.slice(s![x, .., ..]);
    let max_speed = velocity.iter().fold(0.0f32, |m, u| m.max(u.length()));

    Array2::from_shape_fn((nz, ny), |(row, y)| {
        let z = nz - 1 - row;

        if modes.contains(VisModes::FLAG_SURFACE) && flags[(y, z)] == CellFlag::Solid {
            return SURFACE;
        }

        if modes.contains(VisModes::Q_CRITERION) && q_criterion(&domain.velocity, (x, y, z)) > Q_THRESHOLD {
            return VORTEX;
        }

        if modes.contains(VisModes::FIELD) && max_speed > 0.0 {
            return colormap(velocity[(y, z)].length() / max_speed);
        }

        BACKGROUND
    })
}

/// Blue to red ramp over `[0, 1]`.
fn colormap(v: f32) -> [u8; 3] {
    let v = v.clamp(0.0, 1.0);
    let c = Vec3::new(0.0, 0.2, 1.0).lerp(Vec3::new(1.0, 0.1, 0.0), v) * 255.0;
    [c.x as u8, c.y as u8, c.z as u8]
}

/// Second invariant of the velocity gradient, `(|Ω|² - |S|²) / 2`, from central differences.
/// Zero on the outermost layer of cells.
pub fn q_criterion(velocity: &Array3<Vec3>, (x, y, z): (usize, usize, usize)) -> f32 {
    let (nx, ny, nz) = velocity.dim();
    if x == 0 || y == 0 || z == 0 || x + 1 >= nx || y + 1 >= ny || z + 1 >= nz {
        return 0.0;
    }

    // Column j holds the derivative along axis j.
    let grad = [
        (velocity[(x + 1, y, z)] - velocity[(x - 1, y, z)]) * 0.5,
        (velocity[(x, y + 1, z)] - velocity[(x, y - 1, z)]) * 0.5,
        (velocity[(x, y, z + 1)] - velocity[(x, y, z - 1)]) * 0.5,
    ];

    let mut q = 0.0;
    for i in 0..3 {
        for j in 0..3 {
            let s = 0.5 * (grad[j][i] + grad[i][j]);
            let w = 0.5 * (grad[j][i] - grad[i][j]);
            q += w * w - s * s;
        }
    }

    0.5 * q
}

#[cfg(test)]
mod tests {
    use glam::UVec3;

    use super::*;

    #[test]
    fn test_modes_from_config_names() {
        let modes: VisModes = [VisMode::FlagSurface, VisMode::QCriterion].into_iter().collect();

        assert_eq!(modes, VisModes::FLAG_SURFACE | VisModes::Q_CRITERION);
        assert!(!modes.contains(VisModes::FIELD));
        assert_eq!(Vec::<VisMode>::new().into_iter().collect::<VisModes>(), VisModes::empty());
    }

    #[test]
    fn test_frame_spacing() {
        let dir = tempfile::tempdir().unwrap();

        let recorder = FrameRecorder::new(dir.path().join("a"), 6000, 10.0, VisModes::all()).unwrap();
        assert_eq!(recorder.interval(), 10);
        assert!(recorder.next_frame(0));
        assert!(recorder.next_frame(590));
        assert!(!recorder.next_frame(595));

        let short = FrameRecorder::new(dir.path().join("b"), 20, 10.0, VisModes::all()).unwrap();
        assert_eq!(short.interval(), 1);
    }

    #[test]
    fn test_slice_shows_solids_with_z_up() {
        let mut domain = Domain::new(UVec3::new(4, 3, 2));
        domain.flags[(2, 1, 0)] = CellFlag::Solid;
        domain.flags[(0, 0, 0)] = CellFlag::Solid;

        let image = render_slice(&domain, VisModes::FLAG_SURFACE);

        assert_eq!(image.dim(), (2, 3));
        assert_eq!(image[(1, 1)], SURFACE);
        assert_eq!(image[(1, 0)], BACKGROUND);
        assert_eq!(image[(0, 1)], BACKGROUND);
    }

    #[test]
    fn test_field_layer_scales_to_fastest_cell() {
        let mut domain = Domain::new(UVec3::new(2, 2, 1));
        domain.velocity[(1, 0, 0)] = Vec3::new(0.0, 0.1, 0.0);

        let image = render_slice(&domain, VisModes::FIELD);

        assert_eq!(image[(0, 0)], colormap(1.0));
        assert_eq!(image[(0, 1)], colormap(0.0));
    }

    #[test]
    fn test_q_criterion_sign() {
        let rotation = Array3::from_shape_fn((3, 3, 3), |(x, y, _)| {
            Vec3::new(-(y as f32 - 1.0), x as f32 - 1.0, 0.0)
        });
        let strain = Array3::from_shape_fn((3, 3, 3), |(x, y, _)| {
            Vec3::new(x as f32 - 1.0, -(y as f32 - 1.0), 0.0)
        });

        assert!(q_criterion(&rotation, (1, 1, 1)) > 0.0);
        assert!(q_criterion(&strain, (1, 1, 1)) < 0.0);
        assert_eq!(q_criterion(&rotation, (0, 1, 1)), 0.0);
    }

    #[test]
    fn test_writes_numbered_frames() {
        let dir = tempfile::tempdir().unwrap();
        let mut recorder = FrameRecorder::new(dir.path().to_path_buf(), 100, 1.0, VisModes::all()).unwrap();
        let domain = Domain::new(UVec3::new(4, 4, 4));

        recorder.write_frame(&domain);
        recorder.write_frame(&domain);

        assert_eq!(recorder.frames(), 2);
        assert!(dir.path().join("000.ppm").is_file());
        assert!(dir.path().join("001.ppm").is_file());
    }
}
