use std::sync::{Arc, Barrier, Mutex};

/// The MPI cartesian communicator's collective surface, reduced to the
/// three operations the File Assembler actually needs (SPEC_FULL.md §4.9):
/// rank/size, an exclusive prefix scan used to place each rank's byte
/// ocean, and a broadcast used to learn the total archive size from the
/// last rank. The grid's block ownership and halo exchange stay an
/// external collaborator; this trait only carries collective arithmetic.
pub trait Topology: Send + Sync {
    fn rank(&self) -> usize;
    fn size(&self) -> usize;

    /// Sum of `local` over all ranks with index strictly less than this
    /// rank's. Rank 0 always gets 0.
    fn exclusive_prefix_sum(&self, local: u64) -> u64;

    /// Every rank receives the value `root` contributed.
    fn broadcast(&self, value: u64, root: usize) -> u64;
}

/// The default, common-case topology: one process, rank 0 of 1. The
/// prefix sum and broadcast are trivial since there is nothing to
/// coordinate with.
#[derive(Debug, Default, Clone, Copy)]
pub struct SingleRankTopology;

impl Topology for SingleRankTopology {
    fn rank(&self) -> usize {
        0
    }

    fn size(&self) -> usize {
        1
    }

    fn exclusive_prefix_sum(&self, _local: u64) -> u64 {
        0
    }

    fn broadcast(&self, value: u64, _root: usize) -> u64 {
        value
    }
}

/// Shared state backing a group of [`RendezvousTopology`] handles that
/// simulate `n` MPI ranks as `n` threads inside one process. Used only by
/// the test suite to exercise the File Assembler's collective protocol
/// (SPEC_FULL.md P5, rank independence) without a running MPI job — no
/// MPI binding exists anywhere in the retrieved corpus to ground a real
/// one (DESIGN.md, Open Question 5).
struct RendezvousState {
    size: usize,
    prefix_barrier: Barrier,
    broadcast_barrier: Barrier,
    contributions: Mutex<Vec<u64>>,
    broadcast_value: Mutex<u64>,
}

/// One rank's handle into a [`RendezvousState`]. Every collective call
/// blocks until all `size` ranks have called the matching method —
/// standard MPI collective semantics.
pub struct RendezvousTopology {
    rank: usize,
    state: Arc<RendezvousState>,
}

impl RendezvousTopology {
    /// Build `n` topology handles sharing one rendezvous state, one per
    /// simulated rank.
    pub fn group(n: usize) -> Vec<RendezvousTopology> {
        let state = Arc::new(RendezvousState {
            size: n,
            prefix_barrier: Barrier::new(n),
            broadcast_barrier: Barrier::new(n),
            contributions: Mutex::new(vec![0; n]),
            broadcast_value: Mutex::new(0),
        });
        (0..n)
            .map(|rank| RendezvousTopology {
                rank,
                state: state.clone(),
            })
            .collect()
    }
}

impl Topology for RendezvousTopology {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.state.size
    }

    fn exclusive_prefix_sum(&self, local: u64) -> u64 {
        {
            let mut contributions = self.state.contributions.lock().unwrap();
            contributions[self.rank] = local;
        }
        self.state.prefix_barrier.wait();
        let contributions = self.state.contributions.lock().unwrap();
        contributions[..self.rank].iter().sum()
    }

    fn broadcast(&self, value: u64, root: usize) -> u64 {
        if self.rank == root {
            *self.state.broadcast_value.lock().unwrap() = value;
        }
        self.state.broadcast_barrier.wait();
        *self.state.broadcast_value.lock().unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn single_rank_is_trivial() {
        let t = SingleRankTopology;
        assert_eq!(t.rank(), 0);
        assert_eq!(t.size(), 1);
        assert_eq!(t.exclusive_prefix_sum(123), 0);
        assert_eq!(t.broadcast(77, 0), 77);
    }

    #[test]
    fn rendezvous_prefix_sum_matches_exclusive_scan() {
        let group = RendezvousTopology::group(4);
        let locals = [10u64, 20, 30, 40];
        let handles: Vec<_> = group
            .into_iter()
            .zip(locals)
            .map(|(t, local)| thread::spawn(move || t.exclusive_prefix_sum(local)))
            .collect();
        let results: Vec<u64> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(results, vec![0, 10, 30, 60]);
    }

    #[test]
    fn rendezvous_broadcast_delivers_roots_value() {
        let group = RendezvousTopology::group(3);
        let handles: Vec<_> = group
            .into_iter()
            .map(|t| thread::spawn(move || t.broadcast(999, 2)))
            .collect();
        for h in handles {
            assert_eq!(h.join().unwrap(), 999);
        }
    }
}
