// Library exports for fileconvert

pub mod chart;
pub mod csv_reader;
pub mod export;
pub mod graph;
pub mod palette;
pub mod session;
pub mod shell;

// Chart pipeline
pub mod ir;
pub mod resolve;
pub mod transform;
pub mod scale;
pub mod compiler;
