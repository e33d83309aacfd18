use hypograd::{finite_diff_grad, max_grad_error, Graph, GraphError, Node, Operation};
use rstest::rstest;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
fn polynomial() {
    init_logger();
    let graph = Graph::new();
    let x = graph.var(2.);
    let y = graph.var(7.);
    let c = graph.leaf(2.);

    // f(x, y) = (x + y + 2) * (y * y)
    let root = (x + y + c) * (y * y);
    assert_eq!(root.value(), 539.);

    let grads = root.backward().unwrap();
    assert!(!grads.contains(c.id()));
    let grad_x = grads.wrt(&x).unwrap();
    let grad_y = grads.wrt(&y).unwrap();
    assert_eq!(grad_x.value(), 49.);
    assert_eq!(grad_y.value(), 203.);

    let grads_grad_x = grad_x.backward().unwrap();
    assert_eq!(grads_grad_x.wrt(&x).unwrap().value(), 0.);
    assert_eq!(grads_grad_x.wrt(&y).unwrap().value(), 14.);

    let grads_grad_y = grad_y.backward().unwrap();
    assert_eq!(grads_grad_y.wrt(&y).unwrap().value(), 50.);
    assert_eq!(grads_grad_y.wrt(&x).unwrap().value(), 14.);
}

#[test]
fn ids_are_unique() {
    let graph = Graph::new();
    let x = graph.var(2.);
    let y = graph.var(7.);
    let root = (x + y) * (y * y);
    let grads = root.backward().unwrap();
    let grad_y = grads.wrt(&y).unwrap();
    let _ = grad_y.backward().unwrap();

    let mut ids = vec![x.id(), y.id(), root.id()];
    ids.extend(grads.iter().map(|(_, grad)| grad.id()));
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 2 + 1 + grads.len());
    assert!(graph.len() > ids.len());
}

#[test]
fn untracked_leaf_never_a_key() {
    let graph = Graph::new();
    let x = graph.var(3.);
    let c = graph.leaf(4.);
    let root = (x * c + c) * x;

    let grads = root.backward().unwrap();
    assert!(!grads.contains(c.id()));
    assert!(grads.iter().all(|(id, _)| id == x.id()));
    assert_eq!(grads.wrt(&c).unwrap().value(), 0.);

    let second = grads.wrt(&x).unwrap().backward().unwrap();
    assert!(!second.contains(c.id()));
    // d2/dx2 (c x^2 + c x) = 2c
    assert_eq!(second.value_wrt(&x), 8.);
}

#[rstest]
#[case(2., 3.)]
#[case(-1.5, 0.25)]
#[case(0., 10.)]
fn sum_and_product_rules(#[case] xv: f64, #[case] yv: f64) {
    let graph = Graph::new();
    let x = graph.var(xv);
    let y = graph.var(yv);

    let sum = graph.apply("+".parse::<Operation>().unwrap(), x, y).unwrap();
    let grads = sum.backward().unwrap();
    assert_eq!(grads.value_wrt(&x), 1.);
    assert_eq!(grads.value_wrt(&y), 1.);

    let product = graph.apply(Operation::Multiplication, x, y).unwrap();
    let grads = product.backward().unwrap();
    assert_eq!(grads.value_wrt(&x), yv);
    assert_eq!(grads.value_wrt(&y), xv);
}

#[test]
fn unsupported_operation_is_rejected() {
    let graph = Graph::new();
    let before = graph.len();
    let err = "-".parse::<Operation>().unwrap_err();
    assert_eq!(
        err,
        GraphError::UnsupportedOperation {
            op: "-".to_string()
        }
    );
    assert_eq!(graph.len(), before);
}

// f = (a b + c)(a + c)(b + 0.5)
fn model<'a>(graph: &'a Graph, v: &[f64]) -> ([Node<'a>; 3], Node<'a>) {
    let a = graph.var(v[0]);
    let b = graph.var(v[1]);
    let c = graph.var(v[2]);
    let half = graph.leaf(0.5);
    ([a, b, c], (a * b + c) * (a + c) * (b + half))
}

const POINT: [f64; 3] = [1.25, -0.75, 2.];

#[test]
fn gradients_match_finite_differences() {
    init_logger();
    let graph = Graph::new();
    let (vars, f) = model(&graph, &POINT);

    let grads = f.backward().unwrap();
    let exact: Vec<f64> = vars.iter().map(|v| grads.value_wrt(v)).collect();
    let forward: Vec<f64> = vars.iter().map(|v| f.derive(v)).collect();
    let numeric = finite_diff_grad(|v| model(&Graph::new(), v).1.value(), &POINT, 1e-6);

    assert!(max_grad_error(&exact, &numeric) < 1e-5);
    assert!(max_grad_error(&exact, &forward) < 1e-12);
}

#[test]
fn second_derivatives_match_finite_differences() {
    let graph = Graph::new();
    let (vars, f) = model(&graph, &POINT);
    let grads = f.backward().unwrap();

    for (i, wrt) in vars.iter().enumerate() {
        let hessian_row = grads.wrt(wrt).unwrap().backward().unwrap();
        let exact: Vec<f64> = vars.iter().map(|v| hessian_row.value_wrt(v)).collect();

        let numeric = finite_diff_grad(
            |v| {
                let graph = Graph::new();
                let (vs, f) = model(&graph, v);
                let grads = f.backward().unwrap();
                grads.value_wrt(&vs[i])
            },
            &POINT,
            1e-5,
        );
        assert!(
            max_grad_error(&exact, &numeric) < 1e-4,
            "row {i}: exact {exact:?}, numeric {numeric:?}"
        );
    }
}

#[test]
fn independent_graphs_on_threads() {
    let handles: Vec<_> = (0..4)
        .map(|i| {
            std::thread::spawn(move || {
                let graph = Graph::new();
                let x = graph.var(i as f64);
                let y = x * x;
                let grads = y.backward().unwrap();
                (grads.value_wrt(&x), x.id().index())
            })
        })
        .collect();
    for (i, handle) in handles.into_iter().enumerate() {
        let (grad, id) = handle.join().unwrap();
        assert_eq!(grad, 2. * i as f64);
        assert_eq!(id, 0);
    }
}
