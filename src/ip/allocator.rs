//! Address block allocation.
//!
//! The pool carves equally sized, aligned blocks out of the space that
//! follows a base address and keeps every handed-out block in an ordered
//! occupancy list so later requests never overlap earlier ones. Blocks are
//! never returned to the pool.

use std::net::Ipv4Addr;

use log::debug;
use rand::rngs::StdRng;
use rand::Rng;
use serde::Serialize;

use super::subnet::{Subnet, MAX_PREFIX, MIN_PREFIX};

/// Block offsets examined per request, starting at offset 1
pub const SEARCH_WINDOW: u64 = 1000;
/// Free candidates collected before a randomized pick
pub const RANDOM_CANDIDATES: usize = 10;
/// Largest jump (in free blocks) a randomized pick may take
pub const MAX_JUMP: usize = 5;

/// Errors that can occur during address allocation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PoolError {
    #[error("Invalid prefix length /{0} (expected 1..=30)")]
    InvalidPrefixLength(u8),

    #[error("No free /{prefix} block within {window} offsets of {base}")]
    PoolExhausted { prefix: u8, base: Ipv4Addr, window: u64 },
}

/// Source of the 1-based jump used by randomized allocation.
///
/// `next_jump(max)` must return a value in `1..=max`; anything else is clamped.
pub trait JumpSource {
    fn next_jump(&mut self, max: usize) -> usize;
}

impl JumpSource for StdRng {
    fn next_jump(&mut self, max: usize) -> usize {
        self.gen_range(1..=max)
    }
}

/// Replays a fixed sequence of jumps, cycling when it runs out
#[derive(Debug, Clone)]
pub struct FixedJumps {
    jumps: Vec<usize>,
    cursor: usize,
}

impl FixedJumps {
    pub fn new(jumps: Vec<usize>) -> Self {
        Self { jumps, cursor: 0 }
    }
}

impl JumpSource for FixedJumps {
    fn next_jump(&mut self, max: usize) -> usize {
        if self.jumps.is_empty() {
            return 1;
        }
        let jump = self.jumps[self.cursor % self.jumps.len()];
        self.cursor += 1;
        jump.clamp(1, max.max(1))
    }
}

/// Occupied block, as reported for diagnostics
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OccupiedRange {
    pub subnet: Subnet,
    pub start: Ipv4Addr,
    pub end: Ipv4Addr,
}

/// Non-overlapping subnet allocator rooted at a base address
#[derive(Debug, Clone)]
pub struct AddressPool {
    base: Ipv4Addr,
    /// Sorted by network address; pairwise disjoint
    occupied: Vec<Subnet>,
}

impl AddressPool {
    pub fn new(base: Ipv4Addr) -> Self {
        AddressPool {
            base,
            occupied: Vec::new(),
        }
    }

    pub fn base(&self) -> Ipv4Addr {
        self.base
    }

    /// Allocated blocks in address order
    pub fn occupied(&self) -> &[Subnet] {
        &self.occupied
    }

    /// Occupancy as inclusive address ranges, for display
    pub fn occupancy_report(&self) -> Vec<OccupiedRange> {
        self.occupied
            .iter()
            .map(|subnet| OccupiedRange {
                subnet: *subnet,
                start: subnet.network(),
                end: subnet.broadcast(),
            })
            .collect()
    }

    /// Allocate the first free block of the given prefix length
    pub fn allocate(&mut self, prefix: u8) -> Result<Subnet, PoolError> {
        Self::check_prefix(prefix)?;

        let chosen = self
            .candidates(prefix)
            .find(|candidate| self.is_free(candidate))
            .ok_or_else(|| self.exhausted(prefix))?;

        self.mark(chosen);
        debug!("Allocated {} (sequential)", chosen);
        Ok(chosen)
    }

    /// Allocate a block a few free steps past the first free one.
    ///
    /// Up to [`RANDOM_CANDIDATES`] free blocks are collected in scan order and
    /// the pick is made among the first `min(MAX_JUMP, found)` of them.
    pub fn allocate_randomized<J: JumpSource + ?Sized>(
        &mut self,
        prefix: u8,
        jumps: &mut J,
    ) -> Result<Subnet, PoolError> {
        Self::check_prefix(prefix)?;

        let free: Vec<Subnet> = self
            .candidates(prefix)
            .filter(|candidate| self.is_free(candidate))
            .take(RANDOM_CANDIDATES)
            .collect();

        if free.is_empty() {
            return Err(self.exhausted(prefix));
        }

        let max = MAX_JUMP.min(free.len());
        let jump = jumps.next_jump(max).clamp(1, max);
        let chosen = free[jump - 1];

        self.mark(chosen);
        debug!("Allocated {} (randomized, jump {} of {})", chosen, jump, max);
        Ok(chosen)
    }

    fn check_prefix(prefix: u8) -> Result<(), PoolError> {
        if (MIN_PREFIX..=MAX_PREFIX).contains(&prefix) {
            Ok(())
        } else {
            Err(PoolError::InvalidPrefixLength(prefix))
        }
    }

    fn exhausted(&self, prefix: u8) -> PoolError {
        PoolError::PoolExhausted {
            prefix,
            base: self.base(),
            window: SEARCH_WINDOW,
        }
    }

    /// Aligned blocks at offsets 1.. of the base, stopping at the top of the address space.
    /// Offset 0 is skipped so the block holding the base address itself is never handed out.
    fn candidates(&self, prefix: u8) -> impl Iterator<Item = Subnet> {
        let block = Subnet::new(self.base, prefix).ok();
        let size = block.map_or(0, |b| b.size());
        let aligned = block.map_or(0, |b| u64::from(u32::from(b.network())));
        (1..SEARCH_WINDOW)
            .take_while(move |_| block.is_some())
            .map(move |offset| aligned + offset * size)
            .take_while(move |start| start + size - 1 <= u64::from(u32::MAX))
            .filter_map(move |start| Subnet::new(Ipv4Addr::from(start as u32), prefix).ok())
    }

    fn is_free(&self, candidate: &Subnet) -> bool {
        let (start, end) = candidate.range();
        // Ranges are disjoint and sorted, so only the last one starting at or
        // before `end` can reach back into the candidate.
        let idx = self.occupied.partition_point(|s| s.range().0 <= end);
        match idx.checked_sub(1).map(|i| self.occupied[i].range().1) {
            Some(prev_end) => prev_end < start,
            None => true,
        }
    }

    fn mark(&mut self, subnet: Subnet) {
        let idx = self.occupied.partition_point(|s| s.range().0 < subnet.range().0);
        self.occupied.insert(idx, subnet);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn pool(base: &str) -> AddressPool {
        AddressPool::new(base.parse().unwrap())
    }

    fn assert_disjoint(subnets: &[Subnet]) {
        for (i, a) in subnets.iter().enumerate() {
            for b in &subnets[i + 1..] {
                assert!(!a.overlaps(b), "{} overlaps {}", a, b);
            }
        }
    }

    #[test]
    fn test_skips_base_block() {
        let mut pool = pool("10.0.0.0");
        let first = pool.allocate(30).unwrap();
        assert_eq!(first.to_string(), "10.0.0.4/30");
        let second = pool.allocate(30).unwrap();
        assert_eq!(second.to_string(), "10.0.0.8/30");
    }

    #[test]
    fn test_mixed_prefixes_do_not_overlap() {
        let mut pool = pool("10.0.0.0");
        let vlan = pool.allocate(24).unwrap();
        assert_eq!(vlan.to_string(), "10.0.1.0/24");
        let link = pool.allocate(30).unwrap();
        assert_eq!(link.to_string(), "10.0.0.4/30");
        let wide = pool.allocate(22).unwrap();
        assert_eq!(wide.to_string(), "10.0.4.0/22");
        let next_vlan = pool.allocate(24).unwrap();
        assert_eq!(next_vlan.to_string(), "10.0.2.0/24");
        assert_disjoint(pool.occupied());
    }

    #[test]
    fn test_unaligned_base_is_aligned_down() {
        let mut pool = pool("192.168.1.77");
        let net = pool.allocate(24).unwrap();
        assert_eq!(net.to_string(), "192.168.2.0/24");
        let link = pool.allocate(30).unwrap();
        assert_eq!(link.to_string(), "192.168.1.80/30");
    }

    #[test]
    fn test_sequential_is_deterministic() {
        let run = || {
            let mut pool = pool("172.16.0.0");
            [24, 30, 30, 23, 26, 30]
                .iter()
                .map(|p| pool.allocate(*p).unwrap())
                .collect::<Vec<_>>()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_invalid_prefix_rejected() {
        let mut pool = pool("10.0.0.0");
        assert_eq!(pool.allocate(31), Err(PoolError::InvalidPrefixLength(31)));
        assert_eq!(pool.allocate(0), Err(PoolError::InvalidPrefixLength(0)));
        let mut jumps = FixedJumps::new(vec![1]);
        assert_eq!(
            pool.allocate_randomized(32, &mut jumps),
            Err(PoolError::InvalidPrefixLength(32))
        );
        assert!(pool.occupied().is_empty());
    }

    #[test]
    fn test_exhaustion_leaves_pool_unchanged() {
        // Only one /1 fits after the base block
        let mut pool = pool("0.0.0.0");
        assert_eq!(pool.allocate(1).unwrap().to_string(), "128.0.0.0/1");
        let before = pool.occupied().to_vec();
        assert!(matches!(pool.allocate(1), Err(PoolError::PoolExhausted { prefix: 1, .. })));
        assert_eq!(pool.occupied(), before.as_slice());
    }

    #[test]
    fn test_window_is_bounded() {
        let mut pool = pool("10.0.0.0");
        for _ in 1..SEARCH_WINDOW {
            pool.allocate(30).unwrap();
        }
        assert!(matches!(pool.allocate(30), Err(PoolError::PoolExhausted { .. })));
    }

    #[test]
    fn test_randomized_jump_is_pinned() {
        let mut pool = pool("10.0.0.0");
        let mut jumps = FixedJumps::new(vec![3, 1, 5]);
        // Free /30s: .4 .8 .12 .16 ...; jump 3 picks .12
        assert_eq!(pool.allocate_randomized(30, &mut jumps).unwrap().to_string(), "10.0.0.12/30");
        // Free: .4 .8 .16 ...; jump 1 picks .4
        assert_eq!(pool.allocate_randomized(30, &mut jumps).unwrap().to_string(), "10.0.0.4/30");
        // Free: .8 .16 .20 .24 .28; jump 5 picks .28
        assert_eq!(pool.allocate_randomized(30, &mut jumps).unwrap().to_string(), "10.0.0.28/30");
    }

    #[test]
    fn test_randomized_jump_clamped_to_candidates() {
        // Two /2 blocks fit between the base block and the top of the space
        let mut pool = pool("64.0.0.0");
        pool.allocate(2).unwrap();
        pool.allocate(2).unwrap();
        let mut jumps = FixedJumps::new(vec![5]);
        assert!(matches!(
            pool.allocate_randomized(2, &mut jumps),
            Err(PoolError::PoolExhausted { .. })
        ));

        let mut pool = AddressPool::new("64.0.0.0".parse().unwrap());
        pool.allocate(2).unwrap();
        let picked = pool.allocate_randomized(2, &mut jumps).unwrap();
        assert_eq!(picked.to_string(), "192.0.0.0/2");
    }

    #[test]
    fn test_randomized_never_overlaps() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut pool = pool("10.0.0.0");
        let mut handed_out = Vec::new();
        for prefix in [24, 30, 30, 22, 28, 30, 24, 25, 30, 26] {
            handed_out.push(pool.allocate_randomized(prefix, &mut rng).unwrap());
            handed_out.push(pool.allocate(prefix).unwrap());
        }
        assert_disjoint(&handed_out);
        assert_eq!(pool.occupied().len(), handed_out.len());
    }

    #[test]
    fn test_randomized_same_seed_same_sequence() {
        let run = |seed| {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut pool = pool("10.0.0.0");
            (0..8)
                .map(|_| pool.allocate_randomized(24, &mut rng).unwrap())
                .collect::<Vec<_>>()
        };
        assert_eq!(run(7), run(7));
    }

    #[test]
    fn test_occupancy_report() {
        let mut pool = pool("10.0.0.0");
        pool.allocate(24).unwrap();
        pool.allocate(30).unwrap();
        let report = pool.occupancy_report();
        assert_eq!(report.len(), 2);
        assert_eq!(report[0].start, "10.0.0.4".parse::<Ipv4Addr>().unwrap());
        assert_eq!(report[0].end, "10.0.0.7".parse::<Ipv4Addr>().unwrap());
        assert_eq!(report[1].subnet.to_string(), "10.0.1.0/24");
    }
}
