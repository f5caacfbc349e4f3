use thiserror::Error;

/// An error found while constructing or validating a matrix expression.
///
/// Construction errors come out of [`Dense::new`](crate::Dense::new) and
/// friends; dimension errors come out of
/// [`Expr::validate`](crate::Expr::validate).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// The stride of a literal must be at least 1.
    #[error("invalid stride: {0}")]
    InvalidStride(usize),
    /// The stride of a literal must be at least its number of columns.
    #[error("invalid stride: {stride} < cols {cols}")]
    StrideLessThanCols { stride: usize, cols: usize },
    /// The backing buffer is too short to hold every addressable element.
    #[error("invalid data len: {got} < addressable {want}")]
    InvalidDataLen { got: usize, want: usize },
    /// The shape addresses more elements than fit in memory.
    #[error("matrix too large: {rows}x{cols} with stride {stride}")]
    TooLarge { rows: usize, cols: usize, stride: usize },
    /// A row of a row-by-row literal has a different length than the first.
    #[error("ragged rows: row {row} has {len} values, expected {cols}")]
    RaggedRows { row: usize, len: usize, cols: usize },
    /// Two operands of an elementwise operation have different shapes.
    #[error("dimension mismatch: ({r1}, {c1}) vs ({r2}, {c2})")]
    DimMismatch {
        r1: usize,
        c1: usize,
        r2: usize,
        c2: usize,
    },
    /// The columns of the left operand of a product differ from the rows of
    /// the right operand.
    #[error("inner dimension mismatch: {cols} vs {rows}")]
    InnerDimMismatch { cols: usize, rows: usize },
    /// The background evaluation of a future panicked.
    #[error("background evaluation failed: {0}")]
    Background(String),
}
