//! Parallel map over independent work items.
//!
//! Carpet rows and parameter sweeps are embarrassingly parallel: every item is
//! evaluated by a pure function and the results are gathered in input order.
//! With `threads = None` the global rayon pool is used, otherwise a dedicated pool
//! with the requested number of workers is built for the call.

use rayon::ThreadPoolBuilder;
use rayon::prelude::*;

pub fn parallel_map<I, T, F>(
    items: &[I],
    threads: Option<usize>,
    f: F,
) -> Result<Vec<T>, rayon::ThreadPoolBuildError>
where
    I: Sync,
    T: Send,
    F: Fn(&I) -> T + Sync + Send,
{
    match threads {
        None => Ok(items.par_iter().map(&f).collect()),
        Some(n) => {
            let pool = ThreadPoolBuilder::new().num_threads(n.max(1)).build()?;
            Ok(pool.install(|| items.par_iter().map(&f).collect()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_is_preserved() {
        let items: Vec<usize> = (0..100).collect();
        let squares = parallel_map(&items, None, |i| i * i).unwrap();
        assert_eq!(squares.len(), 100);
        assert!(squares.iter().enumerate().all(|(i, s)| *s == i * i));

        let pooled = parallel_map(&items, Some(3), |i| i * i).unwrap();
        assert_eq!(pooled, squares);
    }
}
