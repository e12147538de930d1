//! Freelist object pool with scoped acquisition.
//!
//! A [`Pooled`] guard hands its value back to the pool when dropped, so every
//! exit path (including `?` early returns) releases exactly once.

use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::trace;

/// Clears an object back to its freshly-constructed state before reuse.
pub trait Reset {
    fn reset(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    /// Objects waiting in the freelist.
    pub idle: usize,
    /// Objects currently held by a [`Pooled`] guard.
    pub outstanding: usize,
    /// Objects constructed over the pool's lifetime.
    pub created: usize,
}

struct PoolInner<T> {
    name: &'static str,
    idle: Mutex<Vec<T>>,
    max_idle: usize,
    outstanding: AtomicUsize,
    created: AtomicUsize,
}

pub struct Pool<T> {
    inner: Arc<PoolInner<T>>,
}

impl<T: Reset + Default> Pool<T> {
    pub fn new(name: &'static str, max_idle: usize) -> Self {
        Self {
            inner: Arc::new(PoolInner {
                name,
                idle: Mutex::new(Vec::new()),
                max_idle,
                outstanding: AtomicUsize::new(0),
                created: AtomicUsize::new(0),
            }),
        }
    }

    pub fn acquire(&self) -> Pooled<T> {
        let recycled = self.inner.idle.lock().unwrap_or_else(PoisonError::into_inner).pop();
        let value = match recycled {
            Some(value) => value,
            None => {
                self.inner.created.fetch_add(1, Ordering::Relaxed);
                trace!(pool = self.inner.name, "Allocating pooled object");
                T::default()
            }
        };
        self.inner.outstanding.fetch_add(1, Ordering::AcqRel);
        Pooled { value: Some(value), pool: Arc::clone(&self.inner) }
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            idle: self.inner.idle.lock().unwrap_or_else(PoisonError::into_inner).len(),
            outstanding: self.inner.outstanding.load(Ordering::Acquire),
            created: self.inner.created.load(Ordering::Relaxed),
        }
    }
}

impl<T> Clone for Pool<T> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

impl<T> fmt::Debug for Pool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pool")
            .field("name", &self.inner.name)
            .field("max_idle", &self.inner.max_idle)
            .field("outstanding", &self.inner.outstanding.load(Ordering::Relaxed))
            .finish()
    }
}

/// Scoped handle on a pooled object. Dropping it resets the object and returns it.
pub struct Pooled<T: Reset> {
    value: Option<T>,
    pool: Arc<PoolInner<T>>,
}

impl<T: Reset> Deref for Pooled<T> {
    type Target = T;

    fn deref(&self) -> &T {
        // Only taken in Drop
        self.value.as_ref().unwrap_or_else(|| unreachable!("pooled value taken before drop"))
    }
}

impl<T: Reset> DerefMut for Pooled<T> {
    fn deref_mut(&mut self) -> &mut T {
        self.value.as_mut().unwrap_or_else(|| unreachable!("pooled value taken before drop"))
    }
}

impl<T: Reset> Drop for Pooled<T> {
    fn drop(&mut self) {
        let Some(mut value) = self.value.take() else { return };
        value.reset();
        self.pool.outstanding.fetch_sub(1, Ordering::AcqRel);

        let mut idle = self.pool.idle.lock().unwrap_or_else(PoisonError::into_inner);
        if idle.len() < self.pool.max_idle {
            idle.push(value);
        }
    }
}

impl<T: Reset + fmt::Debug> fmt::Debug for Pooled<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(value) => value.fmt(f),
            None => f.write_str("<released>"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default)]
    struct Buffer {
        data: Vec<u8>,
        uses: u32,
    }

    impl Reset for Buffer {
        fn reset(&mut self) {
            self.data.clear();
        }
    }

    #[test]
    fn test_acquire_release_counts() {
        let pool: Pool<Buffer> = Pool::new("buffers", 4);
        {
            let _a = pool.acquire();
            let _b = pool.acquire();
            let stats = pool.stats();
            assert_eq!(stats.outstanding, 2);
            assert_eq!(stats.created, 2);
            assert_eq!(stats.idle, 0);
        }
        let stats = pool.stats();
        assert_eq!(stats.outstanding, 0);
        assert_eq!(stats.idle, 2);
    }

    #[test]
    fn test_reuse_resets_state() {
        let pool: Pool<Buffer> = Pool::new("buffers", 4);
        {
            let mut buf = pool.acquire();
            buf.data.extend_from_slice(b"stale");
            buf.uses += 1;
        }
        let buf = pool.acquire();
        assert!(buf.data.is_empty());
        // Same allocation came back
        assert_eq!(buf.uses, 1);
        assert_eq!(pool.stats().created, 1);
    }

    #[test]
    fn test_max_idle_caps_freelist() {
        let pool: Pool<Buffer> = Pool::new("buffers", 1);
        let a = pool.acquire();
        let b = pool.acquire();
        drop(a);
        drop(b);
        assert_eq!(pool.stats().idle, 1);
        assert_eq!(pool.stats().outstanding, 0);
    }

    #[test]
    fn test_released_on_early_return() {
        fn fails(pool: &Pool<Buffer>) -> Result<(), String> {
            let _buf = pool.acquire();
            Err("boom".into())
        }
        let pool: Pool<Buffer> = Pool::new("buffers", 4);
        assert!(fails(&pool).is_err());
        assert_eq!(pool.stats().outstanding, 0);
    }

    #[test]
    fn test_concurrent_acquire_distinct_objects() {
        let pool: Pool<Buffer> = Pool::new("buffers", 16);
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let pool = pool.clone();
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        let mut buf = pool.acquire();
                        assert!(buf.data.is_empty());
                        buf.data.push(i);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        let stats = pool.stats();
        assert_eq!(stats.outstanding, 0);
        assert!(stats.created <= 8);
    }
}
