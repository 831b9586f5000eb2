//! Thin façade over the process group the transfer protocol runs in.
//!
//! The exchange engine only needs collective synchronization and its own
//! position in the group. `NoComm` is the serial group of one, `ThreadComm`
//! simulates a group with threads in one process (tests), and `MpiComm`
//! wraps an MPI communicator when the `mpi-support` feature is enabled.

use std::sync::{Arc, Barrier};

/// Process-group interface.
pub trait Communicator {
    /// Rank of the calling process in the group.
    fn rank(&self) -> usize;
    /// Number of processes in the group.
    fn size(&self) -> usize;
    /// Block until every member of the group has called `barrier`.
    fn barrier(&self);

    /// `true` on the coordinating rank.
    #[inline]
    fn is_root(&self) -> bool {
        self.rank() == 0
    }
}

/// Compile-time no-op comm for pure serial runs.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoComm;

impl Communicator for NoComm {
    fn rank(&self) -> usize {
        0
    }
    fn size(&self) -> usize {
        1
    }
    fn barrier(&self) {}
}

// --- ThreadComm: intra-process / multi-thread ---

/// One member of a thread-backed process group.
#[derive(Clone, Debug)]
pub struct ThreadComm {
    rank: usize,
    size: usize,
    barrier: Arc<Barrier>,
}

impl ThreadComm {
    /// Build a group of `size` members sharing one barrier; member `i` has rank `i`.
    pub fn group(size: usize) -> Vec<ThreadComm> {
        let size = size.max(1);
        let barrier = Arc::new(Barrier::new(size));
        (0..size)
            .map(|rank| ThreadComm {
                rank,
                size,
                barrier: Arc::clone(&barrier),
            })
            .collect()
    }
}

impl Communicator for ThreadComm {
    fn rank(&self) -> usize {
        self.rank
    }
    fn size(&self) -> usize {
        self.size
    }
    fn barrier(&self) {
        self.barrier.wait();
    }
}

// --- MPI backend (feature = "mpi-support") ---
#[cfg(feature = "mpi-support")]
mod mpi_backend {
    use super::Communicator;
    use crate::exchange_error::ExchangeError;
    use mpi::environment::Universe;
    use mpi::topology::SimpleCommunicator;
    use mpi::traits::*;

    /// MPI process group.
    pub struct MpiComm {
        world: SimpleCommunicator,
        rank: usize,
        size: usize,
        // Keeps MPI initialized for as long as the comm lives.
        _universe: Option<Universe>,
    }

    impl MpiComm {
        /// Initialize MPI and wrap `MPI_COMM_WORLD`.
        pub fn new() -> Result<Self, ExchangeError> {
            let universe = mpi::initialize().ok_or_else(|| {
                ExchangeError::Precondition("MPI was already initialized".to_string())
            })?;
            let world = universe.world();
            let mut comm = Self::from_communicator(world);
            comm._universe = Some(universe);
            Ok(comm)
        }

        /// Wrap an existing communicator (MPI stays owned by the caller).
        pub fn from_communicator(world: SimpleCommunicator) -> Self {
            let rank = world.rank() as usize;
            let size = world.size() as usize;
            Self {
                world,
                rank,
                size,
                _universe: None,
            }
        }
    }

    impl Communicator for MpiComm {
        fn rank(&self) -> usize {
            self.rank
        }
        fn size(&self) -> usize {
            self.size
        }
        fn barrier(&self) {
            self.world.barrier();
        }
    }
}

#[cfg(feature = "mpi-support")]
pub use mpi_backend::MpiComm;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn no_comm_is_a_group_of_one() {
        let comm = NoComm;
        comm.barrier();
        assert_eq!((comm.rank(), comm.size()), (0, 1));
        assert!(comm.is_root());
    }

    #[test]
    fn thread_group_barrier_orders_phases() {
        let counter = Arc::new(AtomicUsize::new(0));
        let handles: Vec<_> = ThreadComm::group(3)
            .into_iter()
            .map(|comm| {
                let counter = Arc::clone(&counter);
                std::thread::spawn(move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                    comm.barrier();
                    // Every member has incremented before anyone passes.
                    counter.load(Ordering::SeqCst)
                })
            })
            .collect();
        for h in handles {
            assert_eq!(h.join().unwrap(), 3);
        }
    }
}
