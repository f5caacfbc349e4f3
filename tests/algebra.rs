use matexp::*;
use proptest::prelude::*;

fn small() -> impl Strategy<Value = f64> {
    (-1000i32..1000).prop_map(|n| n as f64 / 8.0)
}

fn dense(rows: usize, cols: usize) -> impl Strategy<Value = Dense> {
    proptest::collection::vec(small(), rows * cols).prop_map(move |data| Dense::from_vec(rows, cols, data).unwrap())
}

// two matrices of the same random shape
fn same_shape() -> impl Strategy<Value = (Dense, Dense)> {
    (1usize..6, 1usize..6).prop_flat_map(|(r, c)| (dense(r, c), dense(r, c)))
}

fn any_dense() -> impl Strategy<Value = Dense> {
    (1usize..6, 1usize..6).prop_flat_map(|(r, c)| dense(r, c))
}

fn elementwise(a: &Dense, b: &Dense, f: impl Fn(f64, f64) -> f64) -> Vec<f64> {
    a.to_vec().into_iter().zip(b.to_vec()).map(|(x, y)| f(x, y)).collect()
}

#[test]
fn scenario_dims_and_validation() {
    let a = Expr::literal(Dense::zeros(2, 3));
    let b = Expr::literal(Dense::zeros(3, 2));
    assert_eq!(a.mul(&b).dims(), (2, 2));
    assert!(a.mul(&b).validate().is_ok());
    let err = a.add(&b).validate().unwrap_err();
    assert_eq!(err, Error::DimMismatch { r1: 2, c1: 3, r2: 3, c2: 2 });
    assert_eq!(err.to_string(), "dimension mismatch: (2, 3) vs (3, 2)");
}

#[test]
fn construction_errors() {
    assert_eq!(Dense::new(2, 2, 0, vec![]), Err(Error::InvalidStride(0)));
    assert!(matches!(
        Dense::new(2, 3, 2, vec![0.0; 6]),
        Err(Error::StrideLessThanCols { stride: 2, cols: 3 })
    ));
    assert!(matches!(Dense::new(2, 2, 2, vec![0.0; 3]), Err(Error::InvalidDataLen { .. })));
    assert!(matches!(
        Dense::from_rows(&[vec![1.0, 2.0], vec![3.0]]),
        Err(Error::RaggedRows { row: 1, .. })
    ));

    // shapes whose last element can't be addressed
    assert_eq!(
        Dense::new(usize::MAX, 2, 2, vec![0.0; 4]),
        Err(Error::TooLarge { rows: usize::MAX, cols: 2, stride: 2 })
    );
    assert_eq!(
        Dense::new(usize::MAX / 2 + 2, 1, 2, vec![0.0]),
        Err(Error::TooLarge { rows: usize::MAX / 2 + 2, cols: 1, stride: 2 })
    );
    // large but addressable shapes still report the short buffer
    assert_eq!(
        Dense::new(usize::MAX / 4, 1, 1, vec![0.0]),
        Err(Error::InvalidDataLen { got: 1, want: usize::MAX / 4 })
    );
}

#[test]
fn strided_literals_evaluate_like_compact_ones() {
    // a 2x2 view with one padding column
    let strided = Expr::literal(Dense::new(2, 2, 3, vec![1.0, 2.0, 9.0, 3.0, 4.0, 9.0]).unwrap());
    let compact = Expr::literal(Dense::from_rows(&[[1.0, 2.0], [3.0, 4.0]]).unwrap());
    assert!(strided.equals(&compact));
    assert_eq!(strided.mul(&strided).eval().as_vector(), vec![7.0, 10.0, 15.0, 22.0]);
    assert_eq!(strided.t().eval().as_vector(), vec![1.0, 3.0, 2.0, 4.0]);
}

#[test]
fn literals_are_values() {
    let a = Expr::literal(Dense::ones(2, 2));
    let mut lit = a.eval();
    lit.set(0, 0, 5.0);
    assert_eq!(lit.at(0, 0), 5.0);
    assert_eq!(a.at(0, 0), 1.0);

    let copy = a.copy();
    assert!(!copy.same(&a));
    assert!(equals(&copy, &a));
}

proptest! {
    #[test]
    fn elementwise_ops_match_reference((a, b) in same_shape()) {
        let (ea, eb) = (Expr::literal(a.clone()), Expr::literal(b.clone()));
        prop_assert_eq!(ea.add(&eb).eval().as_vector(), elementwise(&a, &b, |x, y| x + y));
        prop_assert_eq!(ea.sub(&eb).eval().as_vector(), elementwise(&a, &b, |x, y| x - y));
        prop_assert_eq!(ea.mul_elem(&eb).eval().as_vector(), elementwise(&a, &b, |x, y| x * y));

        let quotient = ea.div_elem(&eb).eval().as_vector();
        for (q, want) in quotient.iter().zip(elementwise(&a, &b, |x, y| x / y)) {
            prop_assert!(q == &want || (q.is_nan() && want.is_nan()));
        }
    }

    #[test]
    fn transpose_is_an_involution(a in any_dense()) {
        let e = Expr::literal(a.clone());
        prop_assert_eq!(e.t().t().eval().into_dense(), a);
        let (r, c) = e.dims();
        prop_assert_eq!(e.t().dims(), (c, r));
    }

    #[test]
    fn product_dims((r, k, c) in (1usize..6, 1usize..6, 1usize..6), k2 in 1usize..6) {
        let a = Expr::literal(Dense::ones(r, k));
        let b = Expr::literal(Dense::ones(k, c));
        prop_assert_eq!(a.mul(&b).dims(), (r, c));
        prop_assert!(a.mul(&b).validate().is_ok());
        prop_assert_eq!(a.mul(&b).eval().as_vector(), vec![k as f64; r * c]);

        let bad = Expr::literal(Dense::ones(k2, c));
        if k2 != k {
            prop_assert_eq!(a.mul(&bad).validate(), Err(Error::InnerDimMismatch { cols: k, rows: k2 }));
        }
    }

    #[test]
    fn scaling_twice_multiplies_constants(a in any_dense(), x in small(), y in small()) {
        let e = Expr::literal(a);
        prop_assert_eq!(e.scale(x).scale(y).eval(), e.scale(x * y).eval());
    }

    #[test]
    fn at_agrees_with_eval((a, b) in same_shape(), s in small()) {
        let (ea, eb) = (Expr::literal(a), Expr::literal(b));
        let e = ea.add(&eb.scale(s)).mul(&ea.t());
        let lit = e.eval();
        let (rows, cols) = e.dims();
        for r in 0..rows {
            for c in 0..cols {
                prop_assert_eq!(e.at(r, c), lit.at(r, c));
            }
        }
    }
}
