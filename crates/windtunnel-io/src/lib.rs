use thiserror::Error;

pub mod as_bytes;
pub mod forces;
pub mod ppm;
pub mod stl;
pub mod vtk;

#[derive(Debug, Error)]
pub enum DecodingError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("not an STL file")]
    NotStl,
    #[error("binary STL declares {expected} triangles but the file is {len} bytes long")]
    Truncated { expected: u64, len: u64 },
    #[error("STL file contains no triangles")]
    Empty,
    #[error("STL file contains non-finite coordinates")]
    NonFinite,
    #[error("syntax error on line {line}")]
    Syntax { line: usize },
    #[error("facet ending on line {line} has {count} vertices instead of 3")]
    FacetVertices { line: usize, count: usize },
    #[error("missing or unexpected force log header")]
    Header,
}

#[derive(Debug, Error)]
pub enum EncodingError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
