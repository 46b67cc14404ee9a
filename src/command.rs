//! The reversible command abstraction and the built-in command set.
//!
//! A command executes forward against the operand stack and can reverse its
//! own effect exactly. Execution is all-or-nothing: operand count and domain
//! are validated against peeked values before anything is popped or pushed,
//! so a failing command leaves the stack untouched.
//!
//! `undo` restores the exact prior stack state from what the command captured
//! during `execute`. It is only ever invoked through the undo/redo engine,
//! which guarantees each undo matches a prior successful execute.

use thiserror::Error;

use crate::registry::{CommandRegistry, RegistryError};
use crate::stack::OperandStack;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CommandError {
    #[error("{0}: stack underflow ({1} operand(s) required)")]
    Underflow(String, usize),
    #[error("{0}: domain error: {1}")]
    Domain(String, String),
    #[error("plugin command '{0}' failed: {1}")]
    Plugin(String, String),
}

/// One invocable, reversible operation over the operand stack.
pub trait Command {
    /// Name used for registry lookup and history display.
    fn name(&self) -> &str;

    /// Perform the forward operation, capturing whatever is needed for
    /// exact reversal. Must leave the stack unmodified on failure.
    fn execute(&mut self, stack: &mut OperandStack) -> Result<(), CommandError>;

    /// Restore the stack to the state that existed immediately before the
    /// matching `execute` call.
    fn undo(&mut self, stack: &mut OperandStack);

    /// One-line usage text shown by front ends.
    fn help(&self) -> &str {
        ""
    }

    /// Name of the plugin that supplied this command, if any. Lets the
    /// histories evict a plugin's commands when it is unloaded.
    fn provenance(&self) -> Option<&str> {
        None
    }
}

// ========================================
// Number entry
// ========================================

/// Pushes a literal operand; undo pops it.
pub struct EnterNumber {
    value: f64,
    name: String,
}

impl EnterNumber {
    pub fn new(value: f64) -> Self {
        Self {
            value,
            name: value.to_string(),
        }
    }
}

impl Command for EnterNumber {
    fn name(&self) -> &str {
        &self.name
    }

    fn execute(&mut self, stack: &mut OperandStack) -> Result<(), CommandError> {
        stack.push(self.value);
        Ok(())
    }

    fn undo(&mut self, stack: &mut OperandStack) {
        let _ = stack.pop();
    }

    fn help(&self) -> &str {
        "push a number onto the stack"
    }
}

// ========================================
// Binary operations (pop two, push one)
// ========================================

type BinaryFn = fn(f64, f64) -> Result<f64, String>;

pub struct BinaryOp {
    name: &'static str,
    help: &'static str,
    op: BinaryFn,
    captured: Option<(f64, f64)>,
}

impl BinaryOp {
    pub fn new(name: &'static str, help: &'static str, op: BinaryFn) -> Self {
        Self {
            name,
            help,
            op,
            captured: None,
        }
    }
}

impl Command for BinaryOp {
    fn name(&self) -> &str {
        self.name
    }

    fn execute(&mut self, stack: &mut OperandStack) -> Result<(), CommandError> {
        let top = stack
            .snapshot(2)
            .map_err(|_| CommandError::Underflow(self.name.into(), 2))?;
        let (b, a) = (top[0], top[1]);
        let result = (self.op)(a, b).map_err(|why| CommandError::Domain(self.name.into(), why))?;
        let _ = stack.pop();
        let _ = stack.pop();
        stack.push(result);
        self.captured = Some((a, b));
        Ok(())
    }

    fn undo(&mut self, stack: &mut OperandStack) {
        if let Some((a, b)) = self.captured.take() {
            let _ = stack.pop();
            stack.push(a);
            stack.push(b);
        }
    }

    fn help(&self) -> &str {
        self.help
    }
}

// ========================================
// Unary operations (pop one, push one)
// ========================================

type UnaryFn = fn(f64) -> Result<f64, String>;

pub struct UnaryOp {
    name: &'static str,
    help: &'static str,
    op: UnaryFn,
    captured: Option<f64>,
}

impl UnaryOp {
    pub fn new(name: &'static str, help: &'static str, op: UnaryFn) -> Self {
        Self {
            name,
            help,
            op,
            captured: None,
        }
    }
}

impl Command for UnaryOp {
    fn name(&self) -> &str {
        self.name
    }

    fn execute(&mut self, stack: &mut OperandStack) -> Result<(), CommandError> {
        let x = stack
            .top()
            .map_err(|_| CommandError::Underflow(self.name.into(), 1))?;
        let result = (self.op)(x).map_err(|why| CommandError::Domain(self.name.into(), why))?;
        let _ = stack.pop();
        stack.push(result);
        self.captured = Some(x);
        Ok(())
    }

    fn undo(&mut self, stack: &mut OperandStack) {
        if let Some(x) = self.captured.take() {
            let _ = stack.pop();
            stack.push(x);
        }
    }

    fn help(&self) -> &str {
        self.help
    }
}

// ========================================
// Stack manipulators
// ========================================

/// Duplicate the top value; undo drops the copy.
pub struct Dup;

impl Command for Dup {
    fn name(&self) -> &str {
        "dup"
    }

    fn execute(&mut self, stack: &mut OperandStack) -> Result<(), CommandError> {
        let top = stack
            .top()
            .map_err(|_| CommandError::Underflow("dup".into(), 1))?;
        stack.push(top);
        Ok(())
    }

    fn undo(&mut self, stack: &mut OperandStack) {
        let _ = stack.pop();
    }

    fn help(&self) -> &str {
        "duplicate the top of the stack"
    }
}

/// Drop the top value; undo pushes it back.
pub struct DropTop {
    captured: Option<f64>,
}

impl DropTop {
    pub fn new() -> Self {
        Self { captured: None }
    }
}

impl Default for DropTop {
    fn default() -> Self {
        Self::new()
    }
}

impl Command for DropTop {
    fn name(&self) -> &str {
        "drop"
    }

    fn execute(&mut self, stack: &mut OperandStack) -> Result<(), CommandError> {
        let dropped = stack
            .pop()
            .map_err(|_| CommandError::Underflow("drop".into(), 1))?;
        self.captured = Some(dropped);
        Ok(())
    }

    fn undo(&mut self, stack: &mut OperandStack) {
        if let Some(value) = self.captured.take() {
            stack.push(value);
        }
    }

    fn help(&self) -> &str {
        "drop the top of the stack"
    }
}

/// Exchange the top two values; undo swaps them back.
pub struct SwapTopTwo;

impl Command for SwapTopTwo {
    fn name(&self) -> &str {
        "swap"
    }

    fn execute(&mut self, stack: &mut OperandStack) -> Result<(), CommandError> {
        stack
            .swap_top_two()
            .map_err(|_| CommandError::Underflow("swap".into(), 2))
    }

    fn undo(&mut self, stack: &mut OperandStack) {
        let _ = stack.swap_top_two();
    }

    fn help(&self) -> &str {
        "swap the top two stack values"
    }
}

/// Remove every value; undo restores the full snapshot.
pub struct Clear {
    captured: Vec<f64>,
}

impl Clear {
    pub fn new() -> Self {
        Self { captured: Vec::new() }
    }
}

impl Default for Clear {
    fn default() -> Self {
        Self::new()
    }
}

impl Command for Clear {
    fn name(&self) -> &str {
        "clear"
    }

    fn execute(&mut self, stack: &mut OperandStack) -> Result<(), CommandError> {
        self.captured = stack.clear();
        Ok(())
    }

    fn undo(&mut self, stack: &mut OperandStack) {
        for value in self.captured.drain(..) {
            stack.push(value);
        }
    }

    fn help(&self) -> &str {
        "clear the stack"
    }
}

// ========================================
// Built-in registration
// ========================================

fn add(a: f64, b: f64) -> Result<f64, String> {
    Ok(a + b)
}

fn subtract(a: f64, b: f64) -> Result<f64, String> {
    Ok(a - b)
}

fn multiply(a: f64, b: f64) -> Result<f64, String> {
    Ok(a * b)
}

fn divide(a: f64, b: f64) -> Result<f64, String> {
    if b == 0.0 {
        return Err("division by zero".into());
    }
    Ok(a / b)
}

fn power(a: f64, b: f64) -> Result<f64, String> {
    let result = a.powf(b);
    if result.is_nan() && !a.is_nan() && !b.is_nan() {
        return Err(format!("{a} cannot be raised to the power {b}"));
    }
    Ok(result)
}

/// y-th root of x, with y on top of the stack.
fn root(x: f64, y: f64) -> Result<f64, String> {
    if y == 0.0 {
        return Err("zeroth root is undefined".into());
    }
    let result = x.powf(1.0 / y);
    if result.is_nan() && !x.is_nan() && !y.is_nan() {
        return Err(format!("{y} root of {x} is undefined"));
    }
    Ok(result)
}

fn negate(x: f64) -> Result<f64, String> {
    Ok(-x)
}

fn square_root(x: f64) -> Result<f64, String> {
    if x < 0.0 {
        return Err("square root of a negative number".into());
    }
    Ok(x.sqrt())
}

fn sine(x: f64) -> Result<f64, String> {
    Ok(x.sin())
}

fn cosine(x: f64) -> Result<f64, String> {
    Ok(x.cos())
}

fn tangent(x: f64) -> Result<f64, String> {
    Ok(x.tan())
}

fn arcsine(x: f64) -> Result<f64, String> {
    if !(-1.0..=1.0).contains(&x) {
        return Err("arcsin requires an operand in [-1, 1]".into());
    }
    Ok(x.asin())
}

fn arccosine(x: f64) -> Result<f64, String> {
    if !(-1.0..=1.0).contains(&x) {
        return Err("arccos requires an operand in [-1, 1]".into());
    }
    Ok(x.acos())
}

fn arctangent(x: f64) -> Result<f64, String> {
    Ok(x.atan())
}

fn natural_log(x: f64) -> Result<f64, String> {
    if x <= 0.0 {
        return Err("logarithm of a non-positive number".into());
    }
    Ok(x.ln())
}

fn common_log(x: f64) -> Result<f64, String> {
    if x <= 0.0 {
        return Err("logarithm of a non-positive number".into());
    }
    Ok(x.log10())
}

fn exponential(x: f64) -> Result<f64, String> {
    Ok(x.exp())
}

/// Install the built-in command set into a registry.
pub fn register_builtins(registry: &mut CommandRegistry) -> Result<(), RegistryError> {
    let binaries: &[(&'static str, &'static str, BinaryFn)] = &[
        ("+", "add the top two stack values", add),
        ("-", "subtract the top value from the next", subtract),
        ("*", "multiply the top two stack values", multiply),
        ("/", "divide the second value by the top", divide),
        ("^", "raise the second value to the top value", power),
        ("root", "take the top-value-th root of the second value", root),
    ];
    for &(name, help, op) in binaries {
        registry.register(
            name,
            Box::new(move |_args| Box::new(BinaryOp::new(name, help, op))),
        )?;
    }

    let unaries: &[(&'static str, &'static str, UnaryFn)] = &[
        ("neg", "negate the top of the stack", negate),
        ("sqrt", "square root of the top of the stack", square_root),
        ("sin", "sine of the top of the stack (radians)", sine),
        ("cos", "cosine of the top of the stack (radians)", cosine),
        ("tan", "tangent of the top of the stack (radians)", tangent),
        ("arcsin", "inverse sine of the top of the stack", arcsine),
        ("arccos", "inverse cosine of the top of the stack", arccosine),
        ("arctan", "inverse tangent of the top of the stack", arctangent),
        ("ln", "natural logarithm of the top of the stack", natural_log),
        ("log", "base-10 logarithm of the top of the stack", common_log),
        ("exp", "e raised to the top of the stack", exponential),
    ];
    for &(name, help, op) in unaries {
        registry.register(
            name,
            Box::new(move |_args| Box::new(UnaryOp::new(name, help, op))),
        )?;
    }

    registry.register("dup", Box::new(|_args| Box::new(Dup)))?;
    registry.register("drop", Box::new(|_args| Box::new(DropTop::new())))?;
    registry.register("swap", Box::new(|_args| Box::new(SwapTopTwo)))?;
    registry.register("clear", Box::new(|_args| Box::new(Clear::new())))?;

    Ok(())
}
