use std::sync::atomic::{AtomicUsize, Ordering};

/// RoundRobin hands out a fixed list of targets in cyclic order, one per call to `next`.
#[derive(Debug)]
pub struct RoundRobin<T> {
    targets: Vec<T>,
    cursor: AtomicUsize,
}

impl<T> RoundRobin<T> {
    /// `None` if there's nothing to rotate through.
    pub fn new(targets: Vec<T>) -> Option<Self> {
        if targets.is_empty() {
            return None;
        }

        Some(RoundRobin {
            targets,
            cursor: AtomicUsize::new(0),
        })
    }

    pub fn next(&self) -> &T {
        let n = self.targets.len();
        // The closure always returns Some, so this can't fail.
        let previous = self
            .cursor
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |cursor| Some((cursor + 1) % n))
            .unwrap_or_else(|cursor| cursor);

        &self.targets[previous]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Arc;

    #[test]
    fn cycles_in_spawn_order() {
        let rr = RoundRobin::new(vec![4001, 4002, 4003]).unwrap();

        let picked: Vec<u16> = (0..7).map(|_| *rr.next()).collect();

        assert_eq!(picked, vec![4001, 4002, 4003, 4001, 4002, 4003, 4001]);
    }

    #[test]
    fn each_target_gets_floor_or_ceil_share() {
        let n = 4;
        let m = 103;
        let rr = RoundRobin::new((0..n).collect::<Vec<usize>>()).unwrap();

        let mut counts = HashMap::new();
        for _ in 0..m {
            *counts.entry(*rr.next()).or_insert(0) += 1;
        }

        for target in 0..n {
            let count = counts[&target];
            assert!(count == m / n || count == m / n + 1, "target {} got {}", target, count);
        }
    }

    #[test]
    fn fair_under_concurrent_callers() {
        let rr = Arc::new(RoundRobin::new(vec![0usize, 1, 2]).unwrap());

        let handles: Vec<_> = (0..3)
            .map(|_| {
                let rr = rr.clone();
                std::thread::spawn(move || (0..300).map(|_| *rr.next()).collect::<Vec<_>>())
            })
            .collect();

        let mut counts = [0usize; 3];
        for handle in handles {
            for target in handle.join().unwrap() {
                counts[target] += 1;
            }
        }

        assert_eq!(counts, [300, 300, 300]);
    }

    #[test]
    fn empty_is_rejected() {
        assert!(RoundRobin::<u16>::new(vec![]).is_none());
    }
}
