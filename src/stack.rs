//! The operand stack shared by every command.
//!
//! Values are double precision floats. The stack is mutated only through
//! command execution and reversal; front ends observe it through registered
//! callbacks that fire synchronously after every mutation.

use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackError {
    #[error("operand stack underflow")]
    Underflow,
}

/// Callback invoked after every mutation with the top values, top first.
pub type StackObserver = Box<dyn FnMut(&[f64])>;

/// An ordered sequence of numeric operands with stack discipline.
pub struct OperandStack {
    values: Vec<f64>,
    observers: Vec<StackObserver>,
    /// How many top values each notification carries.
    display_depth: usize,
}

impl OperandStack {
    pub fn new() -> Self {
        Self {
            values: Vec::new(),
            observers: Vec::new(),
            display_depth: 4,
        }
    }

    /// Append a value to the top. Always succeeds.
    pub fn push(&mut self, value: f64) {
        self.values.push(value);
        self.notify();
    }

    /// Remove and return the top value.
    pub fn pop(&mut self) -> Result<f64, StackError> {
        let value = self.values.pop().ok_or(StackError::Underflow)?;
        self.notify();
        Ok(value)
    }

    /// Read the top value without removing it.
    pub fn top(&self) -> Result<f64, StackError> {
        self.values.last().copied().ok_or(StackError::Underflow)
    }

    pub fn size(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The top `n` values, top first, without removing them. Fails if fewer
    /// than `n` exist. Intended for display, not for command state capture.
    pub fn snapshot(&self, n: usize) -> Result<Vec<f64>, StackError> {
        if self.values.len() < n {
            return Err(StackError::Underflow);
        }
        Ok(self.values.iter().rev().take(n).copied().collect())
    }

    /// Like `snapshot` but returns as many values as exist, up to `n`.
    pub fn peek(&self, n: usize) -> Vec<f64> {
        self.values.iter().rev().take(n).copied().collect()
    }

    /// All values, bottom to top.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Exchange the top two values.
    pub fn swap_top_two(&mut self) -> Result<(), StackError> {
        let len = self.values.len();
        if len < 2 {
            return Err(StackError::Underflow);
        }
        self.values.swap(len - 1, len - 2);
        self.notify();
        Ok(())
    }

    /// Remove every value, returning the previous contents bottom to top.
    pub fn clear(&mut self) -> Vec<f64> {
        let drained = std::mem::take(&mut self.values);
        self.notify();
        drained
    }

    /// Register an observer. It fires synchronously after every mutation
    /// with the top `display_depth` values, top first.
    pub fn add_observer(&mut self, observer: StackObserver) {
        self.observers.push(observer);
    }

    pub fn set_display_depth(&mut self, depth: usize) {
        self.display_depth = depth;
    }

    fn notify(&mut self) {
        if self.observers.is_empty() {
            return;
        }
        let top: Vec<f64> = self
            .values
            .iter()
            .rev()
            .take(self.display_depth)
            .copied()
            .collect();
        for observer in &mut self.observers {
            observer(&top);
        }
    }
}

impl Default for OperandStack {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for OperandStack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperandStack")
            .field("values", &self.values)
            .field("observers", &self.observers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn push_pop_top() {
        let mut stack = OperandStack::new();
        stack.push(1.0);
        stack.push(2.0);
        assert_eq!(stack.top().unwrap(), 2.0);
        assert_eq!(stack.pop().unwrap(), 2.0);
        assert_eq!(stack.pop().unwrap(), 1.0);
        assert!(stack.is_empty());
    }

    #[test]
    fn pop_empty_underflows() {
        let mut stack = OperandStack::new();
        assert_eq!(stack.pop(), Err(StackError::Underflow));
        assert_eq!(stack.top(), Err(StackError::Underflow));
    }

    #[test]
    fn snapshot_is_top_first() {
        let mut stack = OperandStack::new();
        stack.push(1.0);
        stack.push(2.0);
        stack.push(3.0);
        assert_eq!(stack.snapshot(2).unwrap(), vec![3.0, 2.0]);
        assert_eq!(stack.snapshot(4), Err(StackError::Underflow));
        // snapshot does not mutate
        assert_eq!(stack.size(), 3);
    }

    #[test]
    fn swap_top_two_needs_two() {
        let mut stack = OperandStack::new();
        stack.push(1.0);
        assert_eq!(stack.swap_top_two(), Err(StackError::Underflow));
        stack.push(2.0);
        stack.swap_top_two().unwrap();
        assert_eq!(stack.values(), &[2.0, 1.0]);
    }

    #[test]
    fn observers_fire_after_each_mutation() {
        let seen: Rc<RefCell<Vec<Vec<f64>>>> = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);

        let mut stack = OperandStack::new();
        stack.set_display_depth(2);
        stack.add_observer(Box::new(move |top| sink.borrow_mut().push(top.to_vec())));

        stack.push(1.0);
        stack.push(2.0);
        stack.push(3.0);
        stack.pop().unwrap();

        let seen = seen.borrow();
        assert_eq!(seen.len(), 4);
        // depth-limited, top first
        assert_eq!(seen[2], vec![3.0, 2.0]);
        assert_eq!(seen[3], vec![2.0, 1.0]);
    }

    #[test]
    fn clear_returns_contents() {
        let mut stack = OperandStack::new();
        stack.push(1.0);
        stack.push(2.0);
        assert_eq!(stack.clear(), vec![1.0, 2.0]);
        assert!(stack.is_empty());
    }
}
