use retiola::engine::activation::Activation;

#[test]
fn test_unit() {
    let act = Activation::Unit;
    assert_eq!(act.apply(-2.5), -2.5);
    assert_eq!(act.apply(7.0), 7.0);
    assert_eq!(act.derivative(-2.5), 1.0);
    assert_eq!(act.derivative(7.0), 1.0);
}

#[test]
fn test_sigmoid() {
    let act = Activation::Sigmoid;
    assert!((act.apply(0.0) - 0.5).abs() < 1e-12);
    assert!((act.derivative(0.0) - 0.25).abs() < 1e-12);

    // Symmetry: s(-x) = 1 - s(x)
    assert!((act.apply(-2.0) + act.apply(2.0) - 1.0).abs() < 1e-12);
}

#[test]
fn test_tanh() {
    let act = Activation::Tanh;
    assert!((act.apply(0.0) - 0.0).abs() < 1e-12);
    assert!((act.derivative(0.0) - 1.0).abs() < 1e-12);
}

#[test]
fn test_relu() {
    let act = Activation::Relu;
    assert_eq!(act.apply(-1.0), 0.0);
    assert_eq!(act.apply(1.0), 1.0);
    assert_eq!(act.derivative(-1.0), 0.0);
    assert_eq!(act.derivative(1.0), 1.0);
}

#[test]
fn test_softplus() {
    let act = Activation::Softplus;
    // softplus(0) = ln(2)
    assert!((act.apply(0.0) - std::f64::consts::LN_2).abs() < 1e-12);
    // The derivative of softplus is the sigmoid
    assert!((act.derivative(0.0) - 0.5).abs() < 1e-12);
    assert!((act.derivative(1.37) - Activation::Sigmoid.apply(1.37)).abs() < 1e-12);
    // Approaches identity for large inputs
    assert!((act.apply(10.0) - 10.0).abs() < 1e-4);
}
