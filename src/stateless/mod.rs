// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Bounds the rate and memory of unsolicited (Version Negotiation / Retry / Stateless
//! Reset) responses, and collapses duplicate requests from the same remote address into
//! at most one outstanding response.

use crate::{inet::SocketAddress, time::Timestamp};
use alloc::collections::VecDeque;
use std::{collections::HashMap, sync::Mutex};

/// The maximum number of stateless operations a single binding tracks at once.
pub const MAX_BINDING_STATELESS_OPERATIONS: usize = 4096;

/// How long a stateless operation is allowed to remain outstanding before it is aged out
/// and its slot reclaimed, regardless of whether the send completed.
pub const STATELESS_OP_EXPIRATION: core::time::Duration = core::time::Duration::from_secs(1);

/// An opaque handle identifying a live entry in the table. Stable for the lifetime of the
/// entry; reused only after the entry has been both released and aged out.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ContextId(u64);

struct Context {
    remote_address: SocketAddress,
    creation_time: Timestamp,
    is_processed: bool,
    is_expired: bool,
}

/// The stateless-operation table for a single binding.
///
/// Tracks at most one pending response per remote address and bounds the total number of
/// outstanding responses, so that an attacker replaying unmatched datagrams cannot grow
/// the binding's memory or send-rate without bound.
#[derive(Default)]
pub struct Table {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    contexts: HashMap<ContextId, Context>,
    by_remote: HashMap<SocketAddress, ContextId>,
    order: VecDeque<ContextId>,
    next_id: u64,
}

impl Inner {
    /// Walks the age-ordered queue from the head, expiring and dropping any entry past
    /// `STATELESS_OP_EXPIRATION_MS`. A still-processing entry is left for `release` to
    /// free once the send actually completes.
    fn age_out(&mut self, now: Timestamp) {
        while let Some(&id) = self.order.front() {
            let Some(context) = self.contexts.get(&id) else {
                self.order.pop_front();
                continue;
            };

            let age = now.saturating_duration_since(context.creation_time);
            if age < STATELESS_OP_EXPIRATION {
                break;
            }

            self.order.pop_front();
            let context = self.contexts.get_mut(&id).expect("checked above");
            context.is_expired = true;
            self.by_remote.remove(&context.remote_address);

            if context.is_processed {
                self.contexts.remove(&id);
            }
        }
    }
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ages out expired entries, rejects if the table is saturated or an entry already
    /// exists for `remote_address`, and otherwise admits a new pending operation.
    pub fn create(&self, remote_address: SocketAddress, now: Timestamp) -> Option<ContextId> {
        let mut inner = self.inner.lock().unwrap();
        inner.age_out(now);

        if inner.contexts.len() >= MAX_BINDING_STATELESS_OPERATIONS {
            return None;
        }

        if inner.by_remote.contains_key(&remote_address) {
            return None;
        }

        let id = ContextId(inner.next_id);
        inner.next_id += 1;

        inner.contexts.insert(
            id,
            Context {
                remote_address,
                creation_time: now,
                is_processed: false,
                is_expired: false,
            },
        );
        inner.by_remote.insert(remote_address, id);
        inner.order.push_back(id);

        Some(id)
    }

    /// Marks `id` as processed; frees it immediately if it had already aged out while the
    /// send was in flight, otherwise leaves it for the next `age_out` pass to reclaim.
    pub fn release(&self, id: ContextId) {
        let mut inner = self.inner.lock().unwrap();
        let Some(context) = inner.contexts.get_mut(&id) else {
            return;
        };
        context.is_processed = true;
        if context.is_expired {
            inner.contexts.remove(&id);
        }
    }

    /// The number of operations currently tracked, for tests and diagnostics.
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().contexts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inet::SocketAddressV4;

    fn addr(port: u16) -> SocketAddress {
        SocketAddressV4::new([127, 0, 0, 1], port).into()
    }

    fn now() -> Timestamp {
        unsafe { Timestamp::from_duration(core::time::Duration::from_secs(1)) }
    }

    #[test]
    fn admits_distinct_remotes() {
        let table = Table::new();
        let now = now();
        assert!(table.create(addr(1), now).is_some());
        assert!(table.create(addr(2), now).is_some());
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn rejects_duplicate_remote() {
        let table = Table::new();
        let now = now();
        assert!(table.create(addr(1), now).is_some());
        assert!(table.create(addr(1), now).is_none());
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn rejects_when_saturated() {
        let table = Table::new();
        let now = now();
        for port in 0..MAX_BINDING_STATELESS_OPERATIONS as u16 {
            assert!(table.create(addr(port), now).is_some());
        }
        assert!(table
            .create(addr(MAX_BINDING_STATELESS_OPERATIONS as u16), now)
            .is_none());
    }

    #[test]
    fn ages_out_after_expiration_and_readmits() {
        let table = Table::new();
        let now = now();
        let id = table.create(addr(1), now).unwrap();
        table.release(id);

        let later = now + STATELESS_OP_EXPIRATION + core::time::Duration::from_millis(1);
        assert!(table.create(addr(1), later).is_some());
    }
}
