// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Property tests: reuse decisions and single ownership of pool blocks.
//!
//! A shadow model of the free list predicts, for every acquisition, which
//! block the pool must hand out (or that it must allocate a new one).

use buffer_pool::{RawBuffer, RawBufferId, RawBufferPool, ReuseMargin};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    Acquire(usize),
    Release(usize),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0usize..2048).prop_map(Op::Acquire),
        any::<usize>().prop_map(Op::Release),
    ]
}

proptest! {
    #[test]
    fn prop_reuse_follows_first_fit_within_margin(
        margin in 0usize..256,
        ops in proptest::collection::vec(op(), 1..64),
    ) {
        let margin = ReuseMargin::from_bytes(margin);
        let pool = RawBufferPool::new(margin);

        let mut held: Vec<RawBuffer> = Vec::new();
        // Shadow free list in pool order: (id, capacity).
        let mut free: Vec<(RawBufferId, usize)> = Vec::new();
        let mut known: Vec<RawBufferId> = Vec::new();

        for op in ops {
            match op {
                Op::Acquire(size) => {
                    let expected = free
                        .iter()
                        .position(|&(_, cap)| margin.admits(cap, size));
                    let raw = pool.acquire(size);

                    match expected {
                        Some(pos) => {
                            let (id, cap) = free.remove(pos);
                            prop_assert_eq!(raw.id(), id);
                            prop_assert_eq!(raw.capacity(), cap);
                        }
                        None => {
                            prop_assert!(!known.contains(&raw.id()));
                            prop_assert_eq!(raw.capacity(), size);
                            known.push(raw.id());
                        }
                    }
                    prop_assert_eq!(raw.used_size(), size);
                    held.push(raw);
                }
                Op::Release(pick) => {
                    if held.is_empty() {
                        continue;
                    }
                    let raw = held.swap_remove(pick % held.len());
                    free.push((raw.id(), raw.capacity()));
                    prop_assert!(pool.release(raw).is_ok());
                }
            }
        }

        for raw in held {
            pool.release(raw).unwrap();
        }
    }

    #[test]
    fn prop_block_is_free_xor_active(
        sizes in proptest::collection::vec(1usize..512, 1..32),
        release_mask in proptest::collection::vec(any::<bool>(), 32),
    ) {
        let pool = RawBufferPool::new(ReuseMargin::from_bytes(128));
        let mut held = Vec::new();
        let mut ids = Vec::new();

        for (i, size) in sizes.iter().enumerate() {
            let raw = pool.acquire(*size);
            if !ids.contains(&raw.id()) {
                ids.push(raw.id());
            }
            if release_mask[i] {
                pool.release(raw).unwrap();
            } else {
                held.push(raw);
            }

            for id in &ids {
                prop_assert!(pool.is_free(*id) != pool.is_active(*id));
            }
        }

        prop_assert_eq!(pool.active_blocks(), held.len());
        prop_assert_eq!(pool.free_blocks() + held.len(), ids.len());

        for raw in held {
            pool.release(raw).unwrap();
        }
        prop_assert_eq!(pool.active_blocks(), 0);
    }
}
