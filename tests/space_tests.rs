//! End-to-end space behavior across both bundled backends.

use searchspace::prelude::*;
use searchspace::{both, contains, either, eq, gt, lt, ne};

const BACKENDS: [&str; 2] = ["random", "sobol"];

/// The reference space: a categorical optimizer with a quantized,
/// conditioned, forbidden-constrained learning rate under a dotted name.
fn populate(space: &Space) {
    let optim = space.categorical("optimizer", ["sgd", "adam"]).unwrap();
    let lr = space
        .loguniform("optimizer.lr", 1.0, 2.0)
        .unwrap()
        .quantization(0.01)
        .unwrap();
    lr.enable_if(either([eq(&optim, "adam"), eq(&optim, "sgd")]))
        .unwrap();
    lr.forbid_equal(1).unwrap();
}

#[test]
fn explicit_instantiate_then_sample() {
    for backend in BACKENDS {
        let space = Space::new();
        populate(&space);
        space.instantiate(backend).unwrap();
        let samples = space.sample(2).unwrap();
        assert_eq!(samples.len(), 2);
        // The serialized form must be valid JSON regardless of the binding.
        serde_json::to_string_pretty(&space.serialize().unwrap()).unwrap();
    }
}

#[test]
fn implicit_instantiate_on_first_sample() {
    for backend in BACKENDS {
        let space = Space::with_backend(backend);
        populate(&space);
        let samples = space.sample(2).unwrap();
        assert_eq!(samples.len(), 2);
    }
}

#[test]
fn end_to_end_scenario() {
    for backend in BACKENDS {
        let space = Space::with_backend(backend);
        populate(&space);
        for sample in space.sample(2).unwrap() {
            assert!(sample.contains_key("optimizer"));
            let lr = sample["optimizer.lr"].as_f64().unwrap();
            assert!((1.0..=2.0).contains(&lr));
            assert_ne!(lr, 1.0);
            let k = ((lr - 1.0) / 0.01).round();
            assert!((lr - (1.0 + k * 0.01)).abs() < 1e-9);
        }
    }
}

#[test]
fn normal_flag_grid() {
    for backend in BACKENDS {
        for discrete in [false, true] {
            for log in [false, true] {
                for quantization in [None, Some(0.01), Some(1.0)] {
                    let space = Space::with_backend(backend);
                    let mut dim = space.normal("a", 1.0, 2.0).unwrap();
                    if discrete {
                        dim = dim.discrete().unwrap();
                    }
                    if log {
                        dim = dim.log_scale().unwrap();
                    }
                    if let Some(q) = quantization {
                        dim = dim.quantization(q).unwrap();
                    }
                    let _ = dim;

                    match space.sample(1) {
                        Ok(samples) => {
                            assert!(!(backend == "sobol" && log));
                            assert_eq!(samples.len(), 1);
                        }
                        Err(Error::NotSupported { backend: b, .. }) => {
                            assert_eq!(b, "sobol");
                            assert!(log);
                        }
                        Err(other) => panic!("unexpected error: {other}"),
                    }
                }
            }
        }
    }
}

#[test]
fn uniform_flag_grid() {
    for backend in BACKENDS {
        let space = Space::with_backend(backend);
        let mut serial = 0;
        for discrete in [false, true] {
            for log in [false, true] {
                for quantization in [None, Some(0.01), Some(1.0)] {
                    let name = format!("a{serial}_{discrete}_{log}");
                    serial += 1;
                    let mut dim = space.uniform(&name, 1.0, 2.0).unwrap();
                    if discrete {
                        dim = dim.discrete().unwrap();
                    }
                    if log {
                        dim = dim.log_scale().unwrap();
                    }
                    if let Some(q) = quantization {
                        dim = dim.quantization(q).unwrap();
                    }
                    let _ = dim;
                }
            }
        }
        for sample in space.sample(5).unwrap() {
            for (_, value) in sample.iter() {
                let v = value.as_f64().unwrap();
                assert!((1.0..=2.0).contains(&v));
            }
        }
    }
}

#[test]
fn categorical_input_forms() {
    for backend in BACKENDS {
        let space = Space::with_backend(backend);
        space.categorical("cat", ["a", "b", "c"]).unwrap();
        space
            .categorical_weighted("caw", [("a", 0.2), ("b", 0.1), ("c", 0.7)])
            .unwrap();
        for sample in space.sample(50).unwrap() {
            for (_, value) in sample.iter() {
                let Value::Str(label) = value else {
                    panic!("expected a string label");
                };
                assert!(["a", "b", "c"].contains(&label.as_str()));
            }
        }
    }
}

#[test]
fn ordinal_support_is_backend_dependent() {
    let space = Space::new();
    space.ordinal("ord", ["a", "b", "c"]).unwrap();

    space.instantiate("random").unwrap();
    space.sample(3).unwrap();

    assert!(matches!(
        space.instantiate("sobol"),
        Err(Error::NotSupported {
            backend: "sobol",
            ..
        })
    ));
}

#[test]
fn log_normal_support_is_backend_dependent() {
    let space = Space::new();
    space.normal("a", 1.0, 2.0).unwrap().log_scale().unwrap();

    space.instantiate("random").unwrap();
    space.sample(3).unwrap();

    assert!(matches!(
        space.instantiate("sobol"),
        Err(Error::NotSupported {
            backend: "sobol",
            ..
        })
    ));
}

#[test]
fn subspace_dimensions_are_namespaced() {
    for backend in BACKENDS {
        let space = Space::with_backend(backend);
        space
            .normal("a", 1.0, 2.0)
            .unwrap()
            .quantization(0.01)
            .unwrap();
        let subspace = space.subspace("b").unwrap();
        subspace
            .normal("a", 1.0, 2.0)
            .unwrap()
            .quantization(0.01)
            .unwrap();

        for sample in space.sample(3).unwrap() {
            assert!(sample.contains_key("a"));
            assert!(sample.contains_key("b.a"));
        }
    }
}

#[test]
fn comparison_conditions() {
    let conditions: Vec<Box<dyn Fn(&Dim) -> Expr>> = vec![
        Box::new(|a| eq(a, 1.5)),
        Box::new(|a| ne(a, 1.5)),
        Box::new(|a| lt(a, 1.5)),
        Box::new(|a| gt(a, 1.5)),
    ];
    for condition in conditions {
        let space = Space::new();
        let a = space
            .normal("a", 1.0, 2.0)
            .unwrap()
            .quantization(0.01)
            .unwrap();
        let b = space
            .normal("b", 1.0, 2.0)
            .unwrap()
            .quantization(0.01)
            .unwrap();
        b.enable_if(condition(&a)).unwrap();
        for sample in space.sample(20).unwrap() {
            assert!(sample.contains_key("a"));
        }
    }
}

#[test]
fn membership_condition() {
    let space = Space::new();
    let a = space
        .normal("a", 1.0, 2.0)
        .unwrap()
        .quantization(0.01)
        .unwrap();
    let b = space
        .normal("b", 1.0, 2.0)
        .unwrap()
        .quantization(0.01)
        .unwrap();
    b.enable_if(contains(&a, [1.0, 1.5, 2.0])).unwrap();
    space.sample(20).unwrap();
}

#[test]
fn conjunction_condition() {
    let space = Space::new();
    let a = space
        .normal("a", 1.0, 2.0)
        .unwrap()
        .quantization(0.01)
        .unwrap();
    let b = space
        .normal("b", 1.0, 2.0)
        .unwrap()
        .quantization(0.01)
        .unwrap();
    b.enable_if(both([gt(&a, 1.0), lt(&a, 2.0)])).unwrap();
    // b is active exactly when a landed strictly inside its bounds.
    for sample in space.sample(50).unwrap() {
        let a_val = sample["a"].as_f64().unwrap();
        assert_eq!(
            sample.contains_key("b"),
            a_val > 1.0 && a_val < 2.0,
            "a = {a_val}"
        );
    }
}

#[test]
fn disjunction_condition() {
    let space = Space::new();
    let a = space
        .normal("a", 1.0, 2.0)
        .unwrap()
        .quantization(0.01)
        .unwrap();
    let b = space
        .normal("b", 1.0, 2.0)
        .unwrap()
        .quantization(0.01)
        .unwrap();
    b.enable_if(either([eq(&a, 1.0), ne(&a, 2.0)])).unwrap();
    space.sample(20).unwrap();
}

#[test]
fn forbid_equal_is_never_drawn() {
    let space = Space::new();
    let a = space
        .uniform("a", 1.0, 2.0)
        .unwrap()
        .quantization(0.01)
        .unwrap();
    a.forbid_equal(1).unwrap();
    for sample in space.sample(1000).unwrap() {
        assert_ne!(sample["a"].as_f64().unwrap(), 1.0);
    }
}

#[test]
fn forbid_in_is_never_drawn() {
    let space = Space::new();
    let a = space
        .uniform("a", 1.0, 2.0)
        .unwrap()
        .quantization(0.01)
        .unwrap();
    a.forbid_in([1, 2]).unwrap();
    for sample in space.sample(1000).unwrap() {
        let v = sample["a"].as_f64().unwrap();
        assert_ne!(v, 1.0);
        assert_ne!(v, 2.0);
    }
}

#[test]
fn forbidden_clauses_are_disjunctive() {
    let space = Space::new();
    let a = space
        .uniform("a", 1.0, 2.0)
        .unwrap()
        .quantization(0.01)
        .unwrap();
    a.forbid_equal(1).unwrap();
    a.forbid_in([1.5, 2.0]).unwrap();
    for sample in space.sample(1000).unwrap() {
        let v = sample["a"].as_f64().unwrap();
        assert!(v != 1.0 && v != 1.5 && v != 2.0);
    }
}

#[test]
fn exhausted_rejection_budget_is_an_error() {
    for backend in BACKENDS {
        let space = Space::with_backend(backend);
        let a = space
            .uniform("a", 1.0, 2.0)
            .unwrap()
            .quantization(1.0)
            .unwrap();
        a.forbid_in([1, 2]).unwrap();
        assert!(matches!(
            space.sample(1),
            Err(Error::SamplingExhausted { .. })
        ));
    }
}

#[test]
fn duplicate_names_are_configuration_errors() {
    let space = Space::new();
    space.uniform("a", 0.0, 1.0).unwrap();
    assert!(matches!(
        space.categorical("a", ["x"]),
        Err(Error::DuplicateName { .. })
    ));

    // Subspace-qualified collision.
    let sub = space.subspace("s").unwrap();
    sub.uniform("x", 0.0, 1.0).unwrap();
    assert!(matches!(
        space.uniform("s.x", 0.0, 1.0),
        Err(Error::DuplicateName { .. })
    ));
}

#[test]
fn condition_on_one_dimension_leaves_other_marginals_alone() {
    let mean_of_b = |conditioned: bool| {
        let space = Space::new();
        let gate = space.categorical("gate", ["on", "off"]).unwrap();
        space.uniform("b", 0.0, 1.0).unwrap();
        let c = space.uniform("c", 0.0, 1.0).unwrap();
        if conditioned {
            c.enable_if(eq(&gate, "on")).unwrap();
        }
        let draws = space.sample(2000).unwrap();
        let sum: f64 = draws.iter().map(|s| s["b"].as_f64().unwrap()).sum();
        sum / 2000.0
    };

    // The unconditioned dimension keeps its uniform marginal either way.
    assert!((mean_of_b(false) - 0.5).abs() < 0.05);
    assert!((mean_of_b(true) - 0.5).abs() < 0.05);
}

#[test]
fn weighted_categorical_respects_weights() {
    let space = Space::new();
    space
        .categorical_weighted("opt", [("rare", 0.05), ("common", 0.95)])
        .unwrap();
    let draws = space.sample(2000).unwrap();
    let rare = draws
        .iter()
        .filter(|s| s["opt"] == Value::Str("rare".into()))
        .count();
    // Expected ~100 of 2000; 300 is > 6 sigma away.
    assert!(rare < 300, "rare drawn {rare} times");
}

#[test]
fn fidelity_draws_the_full_budget() {
    for backend in BACKENDS {
        let space = Space::with_backend(backend);
        space.fidelity("epochs", 1, 300, 4).unwrap();
        for sample in space.sample(5).unwrap() {
            assert_eq!(sample["epochs"], Value::Int(300));
        }
    }
}

#[test]
fn discrete_uniform_draws_integers_in_bounds() {
    for backend in BACKENDS {
        let space = Space::with_backend(backend);
        space.uniform("n", 0.0, 10.0).unwrap().discrete().unwrap();
        for sample in space.sample(100).unwrap() {
            let Value::Int(v) = sample["n"] else {
                panic!("expected an integer draw");
            };
            assert!((0..=10).contains(&v));
        }
    }
}

#[test]
fn sobol_keeps_inactive_dimensions_present() {
    let space = Space::with_backend("sobol");
    let gate = space.categorical("gate", ["only"]).unwrap();
    let b = space.uniform("b", 0.0, 1.0).unwrap();
    b.enable_if(eq(&gate, "never")).unwrap();
    for sample in space.sample(8).unwrap() {
        assert!(sample.contains_key("b"));
    }
}

#[test]
fn random_omits_inactive_dimensions() {
    let space = Space::with_backend("random");
    let gate = space.categorical("gate", ["only"]).unwrap();
    let b = space.uniform("b", 0.0, 1.0).unwrap();
    b.enable_if(eq(&gate, "never")).unwrap();
    for sample in space.sample(8).unwrap() {
        assert!(!sample.contains_key("b"));
    }
}
