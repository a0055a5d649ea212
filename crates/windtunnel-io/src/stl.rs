use std::{fs::File, io::{BufRead, BufReader, Read}, path::{Path, PathBuf}};

use glam::Vec3;
use smallvec::SmallVec;
use tracing::debug;
use windtunnel_lbm::geometry::Mesh;

use crate::{as_bytes::AsBytes, DecodingError};

const HEADER_LEN: u64 = 80;
const TRIANGLE_LEN: u64 = 50;

/// Reads a binary or ASCII STL file.
///
/// The whole file is decoded before anything is returned, so a truncated or malformed file never
/// yields a partial mesh.
pub struct StlDecoder {
    path: PathBuf,
}

impl StlDecoder {
    pub fn new(path: impl Into<PathBuf>) -> StlDecoder {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_value<const N: usize, T: AsBytes<N>, R: Read>(reader: &mut R) -> Result<T, DecodingError> {
        let mut bytes = [0; N];
        reader.read_exact(&mut bytes)?;
        Ok(T::read_le(bytes))
    }

    pub fn decode(&self) -> Result<Mesh, DecodingError> {
        let file = File::open(&self.path)?;
        let len = file.metadata()?.len();
        let mut reader = BufReader::new(file);

        let mut header = [0; HEADER_LEN as usize];
        let binary = match reader.read_exact(&mut header) {
            Ok(()) => {
                let count = if len >= HEADER_LEN + 4 {
                    Some(Self::read_value::<4, u32, _>(&mut reader)?)
                } else {
                    None
                };

                match count {
                    Some(n) if len == HEADER_LEN + 4 + TRIANGLE_LEN * n as u64 => Some(n),
                    _ if header.starts_with(b"solid") => None,
                    Some(n) => return Err(DecodingError::Truncated { expected: n as u64, len }),
                    None => return Err(DecodingError::NotStl),
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => None,
            Err(e) => return Err(e.into()),
        };

        let mesh = match binary {
            Some(n) => Self::decode_binary(&mut reader, n)?,
            None => Self::decode_ascii(BufReader::new(File::open(&self.path)?))?,
        };

        if mesh.is_empty() {
            return Err(DecodingError::Empty);
        }

        if !mesh.vertices().all(|v| v.is_finite()) {
            return Err(DecodingError::NonFinite);
        }

        debug!(path = %self.path.display(), triangles = mesh.len(), binary = binary.is_some(), "decoded stl");

        Ok(mesh)
    }

    fn decode_binary<R: Read>(reader: &mut R, n: u32) -> Result<Mesh, DecodingError> {
        let mut triangles = Vec::with_capacity(n as usize);

        for _ in 0..n {
            let _normal = Self::read_value::<12, Vec3, _>(reader)?;
            let a = Self::read_value::<12, Vec3, _>(reader)?;
            let b = Self::read_value::<12, Vec3, _>(reader)?;
            let c = Self::read_value::<12, Vec3, _>(reader)?;
            let _attributes = Self::read_value::<2, u16, _>(reader)?;

            triangles.push([a, b, c]);
        }

        Ok(Mesh::new(triangles))
    }

    fn decode_ascii<R: BufRead>(reader: R) -> Result<Mesh, DecodingError> {
        let mut triangles = Vec::new();
        let mut facet: SmallVec<[Vec3; 3]> = SmallVec::new();
        let mut in_solid = false;

        for (i, line) in reader.lines().enumerate() {
            let line = line?;
            let mut words = line.split_whitespace();
            let line_nr = i + 1;

            match words.next() {
                Some("solid") => in_solid = true,
                Some("facet") => facet.clear(),
                Some("vertex") => {
                    let mut coord = [0.0; 3];
                    for c in &mut coord {
                        *c = words
                            .next()
                            .and_then(|w| w.parse().ok())
                            .ok_or(DecodingError::Syntax { line: line_nr })?;
                    }
                    facet.push(Vec3::from(coord));
                }
                Some("endfacet") => {
                    let [a, b, c] = facet[..] else {
                        return Err(DecodingError::FacetVertices { line: line_nr, count: facet.len() });
                    };
                    triangles.push([a, b, c]);
                }
                Some("outer" | "endloop" | "endsolid") | None => (),
                Some(_) => return Err(DecodingError::Syntax { line: line_nr }),
            }
        }

        if !in_solid {
            return Err(DecodingError::NotStl);
        }

        Ok(Mesh::new(triangles))
    }
}

/// Reads the STL file at `path`.
pub fn read_stl(path: impl AsRef<Path>) -> Result<Mesh, DecodingError> {
    StlDecoder::new(path.as_ref()).decode()
}
