//! Detection of re-entrant service creation.
//!
//! Creating a service holds that service's creation lock for the duration of
//! its factory. A factory that, directly or through other services, asks for
//! the service being built would block on its own lock, so every creation is
//! first pushed on a thread-local stack and checked against it.

use std::cell::RefCell;

use crate::error::{DiError, DiResult};

thread_local! {
    static CREATION_STACK: RefCell<Vec<Frame>> = const { RefCell::new(Vec::new()) };
}

/// One service under creation. `key` identifies the descriptor itself, so
/// equally named services of different registries never collide.
struct Frame {
    key: usize,
    name: String,
}

/// RAII marker for a service under creation on the current thread.
pub(crate) struct CreationGuard {
    key: usize,
}

impl CreationGuard {
    /// Pushes the service identified by `key` on the stack, failing if it is
    /// already being created or nesting would exceed `max_depth`.
    ///
    /// The depth counts every creation nested on this thread, whichever
    /// registry it belongs to.
    pub(crate) fn enter(key: usize, name: &str, max_depth: usize) -> DiResult<Self> {
        CREATION_STACK.with(|stack| {
            let mut stack = stack.borrow_mut();

            if stack.iter().any(|frame| frame.key == key) {
                let mut path: Vec<String> = stack.iter().map(|frame| frame.name.clone()).collect();
                path.push(name.to_string());
                return Err(DiError::Circular(path));
            }

            if stack.len() >= max_depth {
                return Err(DiError::DepthExceeded(stack.len()));
            }

            stack.push(Frame {
                key,
                name: name.to_string(),
            });
            Ok(Self { key })
        })
    }
}

impl Drop for CreationGuard {
    fn drop(&mut self) {
        CREATION_STACK.with(|stack| {
            let mut stack = stack.borrow_mut();
            if let Some(last) = stack.pop() {
                debug_assert_eq!(last.key, self.key);
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_distinct_names_are_allowed() {
        let _a = CreationGuard::enter(1, "a", 8).unwrap();
        let _b = CreationGuard::enter(2, "b", 8).unwrap();
    }

    #[test]
    fn same_name_different_service_is_allowed() {
        let _outer = CreationGuard::enter(1, "svc", 8).unwrap();
        assert!(CreationGuard::enter(2, "svc", 8).is_ok());
    }

    #[test]
    fn reentry_reports_full_path() {
        let _a = CreationGuard::enter(1, "a", 8).unwrap();
        let _b = CreationGuard::enter(2, "b", 8).unwrap();
        match CreationGuard::enter(1, "a", 8) {
            Err(DiError::Circular(path)) => assert_eq!(path, vec!["a", "b", "a"]),
            _ => panic!("expected circular error"),
        }
    }

    #[test]
    fn guard_pops_on_drop() {
        {
            let _a = CreationGuard::enter(1, "a", 8).unwrap();
        }
        assert!(CreationGuard::enter(1, "a", 8).is_ok());
    }

    #[test]
    fn depth_limit() {
        let _a = CreationGuard::enter(1, "a", 1).unwrap();
        assert!(matches!(CreationGuard::enter(2, "b", 1), Err(DiError::DepthExceeded(1))));
    }
}
