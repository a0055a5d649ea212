use std::{fs::File, io::{BufWriter, Write}, path::{Path, PathBuf}};

use glam::Vec3;
use ndarray::Array3;
use windtunnel_lbm::{domain::CellFlag, geometry::Mesh};

use crate::{as_bytes::AsBytes, EncodingError};

/// Writes grid fields and meshes as binary legacy VTK files.
///
/// Field files are named `<name>-<t>.vtk` with `t` zero-padded to the width of the largest step
/// the run can reach. Coordinates are written in metres.
pub struct VtkEncoder {
    /// The directory into which the files will be placed.
    path: PathBuf,
    /// Width of the zero-padded step number.
    digits: usize,
    /// Cell size, in metres.
    spacing: f32,
}

impl VtkEncoder {
    pub fn new(path: PathBuf, max_t: u64, spacing: f32) -> Result<VtkEncoder, EncodingError> {
        std::fs::create_dir_all(&path)?;

        Ok(Self {
            path,
            digits: (max_t.checked_ilog10().unwrap_or(0) + 1) as usize,
            spacing,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn field_path(&self, name: &str, t: u64) -> PathBuf {
        self.path.join(format!("{name}-{t:0width$}.vtk", width = self.digits))
    }

    /// Writes one field sampled at step `t`, with every value multiplied by `scale`.
    pub fn encode_field<A: VtkAttribute>(
        &self,
        name: &str,
        t: u64,
        field: &Array3<A>,
        scale: f32,
    ) -> Result<PathBuf, EncodingError> {
        let path = self.field_path(name, t);
        let mut writer = BufWriter::new(File::create(&path)?);
        let (nx, ny, nz) = field.dim();

        writeln!(writer, "# vtk DataFile Version 3.0")?;
        writeln!(writer, "{name} t={t}")?;
        writeln!(writer, "BINARY")?;
        writeln!(writer, "DATASET STRUCTURED_POINTS")?;
        writeln!(writer, "DIMENSIONS {nx} {ny} {nz}")?;
        writeln!(writer, "ORIGIN 0 0 0")?;
        writeln!(writer, "SPACING {0} {0} {0}", self.spacing)?;
        writeln!(writer, "POINT_DATA {}", field.len())?;
        writeln!(writer, "{}", A::declaration(name))?;

        // Legacy VTK wants x to vary fastest.
        let mut bytes = Vec::with_capacity(field.len() * A::WIDTH);
        for v in field.t().iter() {
            v.encode(scale, &mut bytes);
        }

        writer.write_all(&bytes)?;
        writeln!(writer)?;
        writer.flush()?;

        Ok(path)
    }

    /// Writes a triangle mesh given in lattice coordinates.
    pub fn encode_mesh(&self, name: &str, mesh: &Mesh) -> Result<PathBuf, EncodingError> {
        let path = self.path.join(format!("{name}.vtk"));
        let mut writer = BufWriter::new(File::create(&path)?);
        let n = mesh.len();

        writeln!(writer, "# vtk DataFile Version 3.0")?;
        writeln!(writer, "{name}")?;
        writeln!(writer, "BINARY")?;
        writeln!(writer, "DATASET POLYDATA")?;
        writeln!(writer, "POINTS {} float", 3 * n)?;

        let mut bytes = Vec::with_capacity(36 * n);
        for v in mesh.vertices() {
            bytes.extend_from_slice(&(v * self.spacing).write_be());
        }
        writer.write_all(&bytes)?;
        writeln!(writer)?;

        writeln!(writer, "POLYGONS {n} {}", 4 * n)?;

        let mut bytes = Vec::with_capacity(16 * n);
        for i in 0..n as i32 {
            for v in [3, 3 * i, 3 * i + 1, 3 * i + 2] {
                bytes.extend_from_slice(&v.write_be());
            }
        }
        writer.write_all(&bytes)?;
        writeln!(writer)?;
        writer.flush()?;

        Ok(path)
    }
}

/// A per-cell value that can be stored as VTK point data.
pub trait VtkAttribute {
    /// Encoded size of one value, in bytes.
    const WIDTH: usize;

    /// The attribute declaration line(s) that precede the data.
    fn declaration(name: &str) -> String;

    fn encode(&self, scale: f32, out: &mut Vec<u8>);
}

impl VtkAttribute for f32 {
    const WIDTH: usize = 4;

    fn declaration(name: &str) -> String {
        format!("SCALARS {name} float 1\nLOOKUP_TABLE default")
    }

    fn encode(&self, scale: f32, out: &mut Vec<u8>) {
        out.extend_from_slice(&(self * scale).write_be());
    }
}

impl VtkAttribute for Vec3 {
    const WIDTH: usize = 12;

    fn declaration(name: &str) -> String {
        format!("VECTORS {name} float")
    }

    fn encode(&self, scale: f32, out: &mut Vec<u8>) {
        out.extend_from_slice(&(*self * scale).write_be());
    }
}

impl VtkAttribute for CellFlag {
    const WIDTH: usize = 1;

    fn declaration(name: &str) -> String {
        format!("SCALARS {name} unsigned_char 1\nLOOKUP_TABLE default")
    }

    fn encode(&self, _scale: f32, out: &mut Vec<u8>) {
        out.extend_from_slice(&(*self as u8).write_be());
    }
}
