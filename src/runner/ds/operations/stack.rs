//! Re-entrancy depth of the engine on the current thread.
//!
//! Both realms of an environment run on one thread, so calls and proxy traps that bounce
//! between them share a single budget. Exceeding it raises the engine's own
//! `RangeError` instead of exhausting the native stack.

use std::cell::Cell;

use crate::runner::ds::error::JErrorType;

/// Nested calls and proxy traps allowed before `Maximum call stack size exceeded`.
pub const MAX_STACK_DEPTH: usize = 64;

thread_local! {
    static DEPTH: Cell<usize> = Cell::new(0);
}

/// One level of engine re-entrancy; the level is given back when the guard drops.
pub struct StackGuard {
    _private: (),
}
impl StackGuard {
    pub fn enter() -> Result<StackGuard, JErrorType> {
        DEPTH.with(|depth| {
            let next = depth.get() + 1;
            if next > MAX_STACK_DEPTH {
                return Err(JErrorType::RangeError(
                    "Maximum call stack size exceeded".to_string(),
                ));
            }
            depth.set(next);
            Ok(StackGuard { _private: () })
        })
    }
}
impl Drop for StackGuard {
    fn drop(&mut self) {
        DEPTH.with(|depth| depth.set(depth.get().saturating_sub(1)));
    }
}

/// Current nesting level on this thread.
pub fn current_depth() -> usize {
    DEPTH.with(|depth| depth.get())
}

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_guards_unwind() {
        let base = current_depth();
        {
            let _a = StackGuard::enter().unwrap();
            let _b = StackGuard::enter().unwrap();
            assert_eq!(current_depth(), base + 2);
        }
        assert_eq!(current_depth(), base);
    }

    #[test]
    fn test_limit_raises_range_error() {
        let mut guards = vec![];
        loop {
            match StackGuard::enter() {
                Ok(g) => guards.push(g),
                Err(e) => {
                    assert!(matches!(e, JErrorType::RangeError(_)));
                    break;
                }
            }
        }
        assert_eq!(current_depth(), MAX_STACK_DEPTH);
        drop(guards);
        assert_eq!(current_depth(), 0);
    }
}
