//! ConcurrencyGate: one writer, or any number of readers, never both.
//!
//! The gate is built from a binary semaphore (`write_mutex`) and a lock protecting the reader
//! counter (`reader_admission`). The first reader to arrive takes the write semaphore on behalf of
//! all readers and the last one to leave gives it back. Because the reader that releases the
//! semaphore is generally not the one that acquired it, `write_mutex` cannot be a plain
//! `std::sync::Mutex` (whose guard must be dropped by its owner).
//!
//! The gate favours readers: as long as at least one reader is inside, newly arriving readers are
//! admitted immediately, so a continuous stream of readers can starve a pending writer.
//!
//! The value itself sits in an `RwLock` that is only ever taken with `try_read`/`try_write` while
//! the semaphore is held. Under the protocol above those calls never contend; if one does, or the
//! lock was poisoned by a panicking writer, the access fails with `SimError::Gate`.

use crate::error::{Result, SimError};
use std::sync::{Condvar, Mutex, RwLock};

/// BinarySemaphore can be released by a different thread than the one that acquired it.
#[derive(Debug)]
struct BinarySemaphore {
    name: &'static str,
    taken: Mutex<bool>,
    freed: Condvar,
}

impl BinarySemaphore {
    fn new(name: &'static str) -> BinarySemaphore {
        BinarySemaphore {
            name,
            taken: Mutex::new(false),
            freed: Condvar::new(),
        }
    }

    fn acquire(&self) -> Result<()> {
        let mut taken = self.taken.lock().map_err(|_| SimError::Gate(self.name))?;
        while *taken {
            taken = self
                .freed
                .wait(taken)
                .map_err(|_| SimError::Gate(self.name))?;
        }
        *taken = true;
        Ok(())
    }

    fn release(&self) -> Result<()> {
        let mut taken = self.taken.lock().map_err(|_| SimError::Gate(self.name))?;
        *taken = false;
        self.freed.notify_one();
        Ok(())
    }
}

/// ConcurrencyGate owns the guarded value; it is only reachable inside `read` and `write`, so no
/// reference to it can outlive a critical section.
pub struct ConcurrencyGate<T> {
    write_mutex: BinarySemaphore,
    reader_admission: Mutex<usize>,
    data: RwLock<T>,
}

impl<T> ConcurrencyGate<T> {
    pub fn new(value: T) -> ConcurrencyGate<T> {
        ConcurrencyGate {
            write_mutex: BinarySemaphore::new("write_mutex"),
            reader_admission: Mutex::new(0),
            data: RwLock::new(value),
        }
    }

    /// read runs f with shared access. Other readers may run concurrently, writers may not.
    pub fn read<R>(&self, f: impl FnOnce(&T) -> R) -> Result<R> {
        self.acquire_read()?;
        let section = Section {
            gate: self,
            shared: true,
            released: false,
        };
        let data = self.data.try_read().map_err(|_| SimError::Gate("data"))?;
        let out = f(&data);
        drop(data);
        section.release()?;
        Ok(out)
    }

    /// write runs f with exclusive access.
    pub fn write<R>(&self, f: impl FnOnce(&mut T) -> R) -> Result<R> {
        self.write_mutex.acquire()?;
        let section = Section {
            gate: self,
            shared: false,
            released: false,
        };
        let mut data = self.data.try_write().map_err(|_| SimError::Gate("data"))?;
        let out = f(&mut data);
        drop(data);
        section.release()?;
        Ok(out)
    }

    /// into_inner returns the guarded value once no other thread can reach the gate any more.
    pub fn into_inner(self) -> Result<T> {
        self.data.into_inner().map_err(|_| SimError::Gate("data"))
    }

    fn acquire_read(&self) -> Result<()> {
        let mut readers = self
            .reader_admission
            .lock()
            .map_err(|_| SimError::Gate("reader_admission"))?;
        *readers += 1;
        if *readers == 1 {
            if let Err(err) = self.write_mutex.acquire() {
                *readers -= 1;
                return Err(err);
            }
        }
        Ok(())
    }

    fn release_read(&self) -> Result<()> {
        let mut readers = self
            .reader_admission
            .lock()
            .map_err(|_| SimError::Gate("reader_admission"))?;
        *readers -= 1;
        if *readers == 0 {
            self.write_mutex.release()?;
        }
        Ok(())
    }
}

/// Section releases the gate when the closure unwinds, so a panicking worker does not leave the
/// gate closed for everybody else.
struct Section<'a, T> {
    gate: &'a ConcurrencyGate<T>,
    shared: bool,
    released: bool,
}

impl<'a, T> Section<'a, T> {
    fn release(mut self) -> Result<()> {
        self.released = true;
        if self.shared {
            self.gate.release_read()
        } else {
            self.gate.write_mutex.release()
        }
    }
}

impl<'a, T> Drop for Section<'a, T> {
    fn drop(&mut self) {
        if !self.released {
            let _ = if self.shared {
                self.gate.release_read()
            } else {
                self.gate.write_mutex.release()
            };
        }
    }
}
