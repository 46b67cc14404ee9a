//! Common test utilities for rpcalc integration tests

pub use rpcalc::Calculator;

/// Evaluate one input line on a fresh calculator and return the stack,
/// bottom to top.
pub fn eval(input: &str) -> Result<Vec<f64>, String> {
    let mut calc = Calculator::new();
    calc.submit(input).map_err(|e| e.to_string())?;
    Ok(calc.stack_values())
}

/// Evaluate and return the top of stack.
#[allow(dead_code)]
pub fn eval_top(input: &str) -> f64 {
    let stack = eval(input).unwrap();
    *stack.last().expect("stack is empty")
}
