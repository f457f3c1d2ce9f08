// SPDX: CC0-1.0

use limit_explorer::{
    dialect::{self, NUMERIC, SYMBOLIC, USER},
    eval,
    limit::{SeriesSolver, SymbolicLimitSolver, SymbolicResult},
    plot, Neighborhood, NeighborhoodErr,
};
use proptest::prelude::*;

fn arb_function() -> impl Strategy<Value = String> {
    let leaf = prop_oneof![
        Just(String::from("x")),
        (1u8..=3).prop_map(|n| n.to_string()),
        Just(String::from("pi")),
    ];

    leaf.prop_recursive(
        3,  // depth
        16, // size
        2,  // items per collection
        |inner| {
            prop_oneof![
                inner.clone().prop_map(|e| format!("-({e})")),
                (
                    prop_oneof![Just("sin"), Just("cos"), Just("tan"), Just("ln")],
                    inner.clone()
                )
                    .prop_map(|(fun, e)| format!("{fun}({e})")),
                (
                    inner.clone(),
                    prop_oneof![Just("+"), Just("-"), Just("*"), Just("/")],
                    inner.clone()
                )
                    .prop_map(|(l, op, r)| format!("({l}) {op} ({r})")),
                (inner, 0u8..4).prop_map(|(e, k)| format!("({e})^{k}")),
            ]
        },
    )
}

fn ops(text: &str, dialect: &dialect::Dialect) -> Vec<String> {
    dialect::compile(text, dialect)
        .unwrap()
        .ops()
        .map(ToString::to_string)
        .collect()
}

proptest! {
    #[test]
    fn samples_stay_in_the_window(
        point in prop_oneof![-1e6f64..1e6, -1e16f64..1e16],
        radius in 1e-3f64..10.0,
    ) {
        let nbhd = match Neighborhood::new(point, radius) {
            Ok(nbhd) => nbhd,
            Err(err) => {
                prop_assert_eq!(err, NeighborhoodErr::RadiusBelowPrecision);
                return Ok(());
            }
        };
        let xs = plot::sample_points(&nbhd);
        prop_assert_eq!(xs.len(), 1000);
        let (left, right) = xs.split_at(500);
        prop_assert!(left.iter().all(|x| *x < point));
        prop_assert!(right.iter().all(|x| *x > point));
        for x in &xs {
            prop_assert!(*x >= point - radius && *x <= point + radius);
        }
        // far from zero neighbouring samples may round together
        prop_assert!(xs.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn samples_are_distinct_near_zero(point in -1e6f64..1e6, radius in 1e-3f64..10.0) {
        let xs = plot::sample_points(&Neighborhood::new(point, radius).unwrap());
        prop_assert!(xs.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn dialects_compile_to_the_same_program(text in arb_function()) {
        let user = ops(&text, &USER);
        prop_assert_eq!(&user, &ops(&dialect::to_symbolic_dialect(&text), &SYMBOLIC));
        prop_assert_eq!(&user, &ops(&dialect::to_numeric_dialect(&text), &NUMERIC));
    }

    #[test]
    fn numeric_agrees_with_symbolic_at_regular_points(
        text in arb_function(),
        point in 0.1f64..2.0,
    ) {
        let prog = dialect::compile(&dialect::to_numeric_dialect(&text), &NUMERIC).unwrap();
        let numeric = eval::eval(&prog, &point, &mut Vec::new()).unwrap();
        // singular points and blow-ups say nothing about the dialects
        let symbolic = SeriesSolver.limit(&dialect::to_symbolic_dialect(&text), point);
        if let (true, SymbolicResult::Finite(val)) = (numeric.is_finite() && numeric.abs() < 1e6, symbolic) {
            prop_assert!(
                (val - numeric).abs() <= 1e-6 * numeric.abs().max(1.0),
                "{} at {}: symbolic {} vs numeric {}", text, point, val, numeric
            );
        }
    }
}
