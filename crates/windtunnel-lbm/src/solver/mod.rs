pub mod d3q19;

pub use d3q19::LbmD3Q19;
