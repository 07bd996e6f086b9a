use std::sync::{Arc, Mutex};

/// Reports a session id to the shared completed list when dropped.
///
/// Created at the top of every worker thread so the id is reported however
/// the session ends, a panic included.
pub(crate) struct CompletionGuard {
    id: u64,
    completed: Arc<Mutex<Vec<u64>>>,
}

impl CompletionGuard {
    pub(crate) fn new(id: u64, completed: Arc<Mutex<Vec<u64>>>) -> Self {
        Self { id, completed }
    }
}

impl Drop for CompletionGuard {
    fn drop(&mut self) {
        if let Ok(mut completed) = self.completed.lock() {
            completed.push(self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::CompletionGuard;

    #[test]
    fn guard_reports_on_drop_test() {
        let completed = Arc::new(Mutex::new(Vec::new()));

        {
            let _guard = CompletionGuard::new(7, Arc::clone(&completed));
            assert!(completed.lock().unwrap().is_empty());
        }

        assert_eq!(*completed.lock().unwrap(), vec![7]);
    }

    #[test]
    fn guard_reports_on_panic_test() {
        let completed = Arc::new(Mutex::new(Vec::new()));
        let inner = Arc::clone(&completed);

        let result = std::thread::spawn(move || {
            let _guard = CompletionGuard::new(3, inner);
            panic!("session blew up");
        })
        .join();

        assert!(result.is_err());
        assert_eq!(*completed.lock().unwrap(), vec![3]);
    }
}
