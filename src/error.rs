use thiserror::Error;

/// Top-level error type for the stellforge geometry engine.
#[derive(Debug, Error)]
pub enum StellforgeError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Geometry(#[from] GeometryError),

    #[error(transparent)]
    Topology(#[from] TopologyError),

    #[error(transparent)]
    Operation(#[from] OperationError),

    #[error(transparent)]
    Tessellation(#[from] TessellationError),

    #[error(transparent)]
    Export(#[from] ExportError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors detected while validating configuration, before any geometry is built.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required key '{0}'")]
    MissingKey(&'static str),

    #[error("equilibrium file '{path}' has extension '{extension}', expected netCDF ('.nc')")]
    BadExtension { path: String, extension: String },

    #[error("unknown component '{0}' in radial build")]
    UnknownComponent(String),

    #[error("'{component}' matrix is {rows}x{cols}, expected {expected_rows}x{expected_cols}")]
    MatrixDimensions {
        component: String,
        rows: usize,
        cols: usize,
        expected_rows: usize,
        expected_cols: usize,
    },

    #[error("negative thickness {value} for '{component}' at [{row}][{col}]")]
    NegativeThickness {
        component: String,
        row: usize,
        col: usize,
        value: f64,
    },

    #[error("unrecognized cross-section shape '{0}'")]
    UnknownCrossSection(String),

    #[error("invalid value for {key}: {reason}")]
    InvalidValue { key: &'static str, reason: String },
}

/// Errors related to geometric construction.
#[derive(Debug, Error)]
pub enum GeometryError {
    #[error("degenerate geometry: {0}")]
    Degenerate(String),

    #[error("zero-length vector")]
    ZeroVector,

    #[error("layer '{component}' self-intersects at toroidal angle {phi} rad")]
    SelfIntersection { component: String, phi: f64 },

    #[error("filament {index} retains only {points} points after sampling (at least 3 required)")]
    DegenerateFilament { index: usize, points: usize },

    #[error("flux surface query failed at (s={s}, theta={theta}, phi={phi}): {reason}")]
    FluxQuery {
        s: f64,
        theta: f64,
        phi: f64,
        reason: String,
    },
}

/// Errors related to topological operations.
#[derive(Debug, Error)]
pub enum TopologyError {
    #[error("entity not found: {0}")]
    EntityNotFound(String),

    #[error("wire is not closed")]
    WireNotClosed,

    #[error("invalid topology: {0}")]
    InvalidTopology(String),
}

/// Errors related to modelling operations.
#[derive(Debug, Error)]
pub enum OperationError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("operation failed: {0}")]
    Failed(String),
}

/// Errors related to tessellation.
#[derive(Debug, Error)]
pub enum TessellationError {
    #[error("tessellation failed: {0}")]
    Failed(String),
}

/// Errors raised by an export sink.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("component '{0}' has not been imported by the export sink")]
    NotImported(String),

    #[error("export sink failed: {0}")]
    Sink(String),
}

/// Convenience type alias for results using [`StellforgeError`].
pub type Result<T> = std::result::Result<T, StellforgeError>;
