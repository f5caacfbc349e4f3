use std::fmt;

use crate::Error;

/// A dense, row-major matrix of `f64`.
///
/// This is the storage every expression eventually lowers to.
/// Element `(r, c)` lives at `data[r * stride + c]`; the `stride` may be
/// larger than `cols`, in which case the tail of each row is padding and is
/// never read.
///
/// A [`Dense`] is only ever created through a validating constructor, so
/// once you hold one its shape agrees with its buffer.
///
/// # Example
/// ```
/// use matexp::Dense;
///
/// let m = Dense::new(2, 2, 3, vec![1.0, 2.0, 0.0, 3.0, 4.0]).unwrap();
/// assert_eq!(m.at(1, 0), 3.0);
/// assert_eq!(m.to_vec(), vec![1.0, 2.0, 3.0, 4.0]);
///
/// assert!(Dense::new(2, 2, 1, vec![0.0; 4]).is_err());
/// ```
#[derive(Clone)]
pub struct Dense {
    rows: usize,
    cols: usize,
    stride: usize,
    data: Vec<f64>,
}

// None when the last element's index doesn't fit in a usize
fn addressable(rows: usize, cols: usize, stride: usize) -> Option<usize> {
    if rows == 0 || cols == 0 {
        Some(0)
    } else {
        (rows - 1).checked_mul(stride)?.checked_add(cols)
    }
}

impl Dense {
    /// Creates a literal from a row-major buffer with the given stride.
    pub fn new(rows: usize, cols: usize, stride: usize, data: Vec<f64>) -> Result<Self, Error> {
        if stride < 1 {
            return Err(Error::InvalidStride(stride));
        }
        if stride < cols {
            return Err(Error::StrideLessThanCols { stride, cols });
        }
        let want = addressable(rows, cols, stride).ok_or(Error::TooLarge { rows, cols, stride })?;
        if data.len() < want {
            return Err(Error::InvalidDataLen {
                got: data.len(),
                want,
            });
        }
        Ok(Dense {
            rows,
            cols,
            stride,
            data,
        })
    }

    /// Creates a compact literal (`stride == cols`).
    pub fn from_vec(rows: usize, cols: usize, data: Vec<f64>) -> Result<Self, Error> {
        Dense::new(rows, cols, cols.max(1), data)
    }

    /// Creates a literal from a list of rows, which must all be the same
    /// length.
    pub fn from_rows<R: AsRef<[f64]>>(rows: &[R]) -> Result<Self, Error> {
        let cols = rows.first().map_or(0, |r| r.as_ref().len());
        let mut data = Vec::with_capacity(rows.len() * cols);
        for (i, row) in rows.iter().enumerate() {
            let row = row.as_ref();
            if row.len() != cols {
                return Err(Error::RaggedRows {
                    row: i,
                    len: row.len(),
                    cols,
                });
            }
            data.extend_from_slice(row);
        }
        Dense::from_vec(rows.len(), cols, data)
    }

    /// Creates a literal by calling `f(r, c)` for every element.
    pub fn from_fn(rows: usize, cols: usize, mut f: impl FnMut(usize, usize) -> f64) -> Self {
        let mut data = Vec::with_capacity(rows * cols);
        for r in 0..rows {
            for c in 0..cols {
                data.push(f(r, c));
            }
        }
        Dense::compact(rows, cols, data)
    }

    /// A `rows` by `cols` matrix of zeros.
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Dense::compact(rows, cols, vec![0.0; rows * cols])
    }

    /// A `rows` by `cols` matrix of ones.
    pub fn ones(rows: usize, cols: usize) -> Self {
        Dense::compact(rows, cols, vec![1.0; rows * cols])
    }

    /// The `n` by `n` identity matrix.
    pub fn identity(n: usize) -> Self {
        Dense::from_fn(n, n, |r, c| if r == c { 1.0 } else { 0.0 })
    }

    // callers guarantee data.len() == rows * cols
    pub(crate) fn compact(rows: usize, cols: usize, data: Vec<f64>) -> Self {
        debug_assert_eq!(data.len(), rows * cols);
        Dense {
            rows,
            cols,
            stride: cols.max(1),
            data,
        }
    }

    /// Returns `(rows, cols)`.
    pub fn dims(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// Distance in the buffer between the starts of two consecutive rows.
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Returns true if the rows are packed with no padding.
    pub fn is_compact(&self) -> bool {
        self.stride == self.cols || self.rows <= 1 || self.cols == 0
    }

    fn index(&self, r: usize, c: usize) -> usize {
        assert!(
            r < self.rows && c < self.cols,
            "index ({}, {}) out of range for {}x{} matrix",
            r,
            c,
            self.rows,
            self.cols
        );
        r * self.stride + c
    }

    /// Returns the element at row `r`, column `c`.
    ///
    /// # Panics
    /// Panics if `(r, c)` is out of range.
    pub fn at(&self, r: usize, c: usize) -> f64 {
        self.data[self.index(r, c)]
    }

    /// Changes the element at row `r`, column `c`.
    ///
    /// # Panics
    /// Panics if `(r, c)` is out of range.
    pub fn set(&mut self, r: usize, c: usize, v: f64) {
        let i = self.index(r, c);
        self.data[i] = v;
    }

    /// The logical elements of row `r`.
    pub fn row(&self, r: usize) -> &[f64] {
        assert!(r < self.rows, "row {} out of range for {} rows", r, self.rows);
        if self.cols == 0 {
            return &[];
        }
        let start = r * self.stride;
        &self.data[start..start + self.cols]
    }

    /// Returns a copy of all elements in row-major order, without padding.
    pub fn to_vec(&self) -> Vec<f64> {
        if self.is_compact() {
            return self.data[..self.rows * self.cols].to_vec();
        }
        let mut v = Vec::with_capacity(self.rows * self.cols);
        for r in 0..self.rows {
            v.extend_from_slice(self.row(r));
        }
        v
    }

    /// Like [`to_vec`](Dense::to_vec), but reuses the buffer when it is
    /// already compact.
    pub fn into_vec(mut self) -> Vec<f64> {
        if self.is_compact() {
            self.data.truncate(self.rows * self.cols);
            self.data
        } else {
            self.to_vec()
        }
    }

    /// Applies `f` to every element.
    pub fn map_in_place(&mut self, mut f: impl FnMut(f64) -> f64) {
        if self.cols == 0 {
            return;
        }
        for r in 0..self.rows {
            let start = r * self.stride;
            for v in &mut self.data[start..start + self.cols] {
                *v = f(*v);
            }
        }
    }

    /// Combines two equally shaped row-major vectors elementwise into a new
    /// compact matrix, reusing the left buffer.
    pub(crate) fn zip_with(
        rows: usize,
        cols: usize,
        mut left: Vec<f64>,
        right: &[f64],
        f: impl Fn(f64, f64) -> f64,
    ) -> Self {
        for (l, &r) in left.iter_mut().zip(right) {
            *l = f(*l, r);
        }
        Dense::compact(rows, cols, left)
    }

    /// Returns the transpose.
    ///
    /// This is the naive index remap; every element is touched once.
    pub fn transpose(&self) -> Dense {
        let (rows, cols) = self.dims();
        let mut v = vec![0.0; rows * cols];
        for i in 0..rows {
            let row = self.row(i);
            for (j, &x) in row.iter().enumerate() {
                v[j * rows + i] = x;
            }
        }
        Dense::compact(cols, rows, v)
    }

    /// Generalized matrix multiply, `C = A·B`.
    ///
    /// # Panics
    /// Panics if the inner dimensions differ.
    pub fn gemm(a: &Dense, b: &Dense) -> Dense {
        let (m, k) = a.dims();
        let (k2, n) = b.dims();
        assert_eq!(k, k2, "gemm: inner dimension mismatch: {} vs {}", k, k2);
        let mut c = vec![0.0; m * n];
        for i in 0..m {
            let out = &mut c[i * n..(i + 1) * n];
            for (p, &aip) in a.row(i).iter().enumerate() {
                for (o, &bpj) in out.iter_mut().zip(b.row(p)) {
                    *o += aip * bpj;
                }
            }
        }
        Dense::compact(m, n, c)
    }
}

impl PartialEq for Dense {
    fn eq(&self, other: &Self) -> bool {
        self.dims() == other.dims() && (0..self.rows).all(|r| self.row(r) == other.row(r))
    }
}

impl fmt::Debug for Dense {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rows: Vec<&[f64]> = (0..self.rows).map(|r| self.row(r)).collect();
        f.debug_struct("Dense")
            .field("rows", &self.rows)
            .field("cols", &self.cols)
            .field("data", &rows)
            .finish()
    }
}
