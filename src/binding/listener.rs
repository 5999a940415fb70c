// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! A sorted set of listeners and the matcher that picks the right one for a brand-new
//! connection's (local address, ALPN list) pair.

use crate::inet::IpAddress;
use alloc::{sync::Arc, vec::Vec};
use std::sync::{atomic::{AtomicBool, Ordering}, RwLock};

/// Address family, ordered the way the registry sorts on it: IPv6 first, then IPv4,
/// then unspecified (listens on every family).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AddressFamily {
    Unspecified,
    V4,
    V6,
}

/// A reference-counted drain primitive: `acquire` fails once teardown has begun,
/// guaranteeing that by the time teardown completes no holder remains.
#[derive(Debug, Default)]
pub struct Rundown {
    torn_down: AtomicBool,
}

impl Rundown {
    pub fn acquire(&self) -> bool {
        !self.torn_down.load(Ordering::Acquire)
    }

    pub fn begin_teardown(&self) {
        self.torn_down.store(true, Ordering::Release);
    }
}

/// One registered listener. `local_address` is `None` for a wildcard listener that
/// accepts connections addressed to any local IP within `address_family`.
pub struct Listener {
    pub local_address: Option<IpAddress>,
    pub address_family: AddressFamily,
    pub alpn: Vec<u8>,
    rundown: Rundown,
}

impl Listener {
    pub fn new(local_address: Option<IpAddress>, address_family: AddressFamily, alpn: Vec<u8>) -> Self {
        Self {
            local_address,
            address_family,
            alpn,
            rundown: Rundown::default(),
        }
    }

    pub fn is_wildcard(&self) -> bool {
        self.local_address.is_none()
    }

    /// Sort key: `(family desc, wildcard asc)`. Ties broken by insertion order, which the
    /// registry preserves by scanning for the first strictly-greater entry.
    fn sort_key(&self) -> (core::cmp::Reverse<AddressFamily>, bool) {
        (core::cmp::Reverse(self.address_family), self.is_wildcard())
    }
}

/// Sorted set of listeners registered on a binding.
#[derive(Default)]
pub struct Registry {
    listeners: RwLock<Vec<Arc<Listener>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `listener` into the sorted list. Returns `false` without inserting if an
    /// exact `(family, wildcard, ip_if_specific, alpn)` duplicate is already present.
    pub fn register(&self, listener: Listener) -> Option<Arc<Listener>> {
        let listener = Arc::new(listener);
        let mut listeners = self.listeners.write().unwrap();

        let new_key = listener.sort_key();
        let mut insert_at = listeners.len();
        let mut found_insertion_point = false;

        for (index, existing) in listeners.iter().enumerate() {
            // no further same-family entries can follow once family decreases
            if listener.address_family != existing.address_family {
                if new_key.0 > existing.sort_key().0 {
                    if !found_insertion_point {
                        insert_at = index;
                        found_insertion_point = true;
                    }
                    break;
                }
                continue;
            }

            // within a family: specific addresses sort before wildcards, so a specific
            // listener can never match a duplicate further down a wildcard run
            if !listener.is_wildcard() && existing.is_wildcard() {
                if !found_insertion_point {
                    insert_at = index;
                    found_insertion_point = true;
                }
                break;
            }

            if listener.is_wildcard() != existing.is_wildcard() {
                continue;
            }

            let ip_matches = listener.address_family == AddressFamily::Unspecified
                || listener.local_address == existing.local_address;

            if ip_matches && listener.alpn == existing.alpn {
                return None;
            }

            if !found_insertion_point && new_key < existing.sort_key() {
                insert_at = index;
                found_insertion_point = true;
            }
        }

        listeners.insert(insert_at, listener.clone());
        Some(listener)
    }

    /// Removes `listener` from the registry by pointer identity and begins its teardown.
    pub fn unregister(&self, listener: &Arc<Listener>) {
        let mut listeners = self.listeners.write().unwrap();
        listeners.retain(|candidate| !Arc::ptr_eq(candidate, listener));
        listener.rundown.begin_teardown();
    }

    /// For each ALPN in the client's preference order, scans listeners in sorted order
    /// and returns the first that matches both local address and ALPN, with its rundown
    /// acquired. `alpn_list` is the length-prefixed ALPN list exactly as carried on the
    /// wire (one byte of length, then that many bytes, repeated).
    pub fn find_match(
        &self,
        local_address: &IpAddress,
        alpn_list: &[u8],
    ) -> Option<Arc<Listener>> {
        let listeners = self.listeners.read().unwrap();

        for alpn in AlpnIter::new(alpn_list) {
            for listener in listeners.iter() {
                if listener.address_family != AddressFamily::Unspecified {
                    let family_matches = family_of(local_address) == listener.address_family;
                    if !family_matches {
                        continue;
                    }
                    let address_matches = listener.is_wildcard()
                        || listener.local_address.as_ref() == Some(local_address);
                    if !address_matches {
                        continue;
                    }
                }

                if listener.alpn != alpn {
                    continue;
                }

                if listener.rundown.acquire() {
                    return Some(listener.clone());
                }
            }
        }

        None
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.read().unwrap().is_empty()
    }

    pub fn len(&self) -> usize {
        self.listeners.read().unwrap().len()
    }
}

fn family_of(address: &IpAddress) -> AddressFamily {
    match address {
        IpAddress::Ipv4(_) => AddressFamily::V4,
        IpAddress::Ipv6(_) => AddressFamily::V6,
    }
}

/// Iterates a length-prefixed ALPN list: one byte of length, then that many bytes,
/// repeated to the end of the buffer.
struct AlpnIter<'a> {
    remaining: &'a [u8],
}

impl<'a> AlpnIter<'a> {
    fn new(buffer: &'a [u8]) -> Self {
        Self { remaining: buffer }
    }
}

impl<'a> Iterator for AlpnIter<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<Self::Item> {
        let (&len, rest) = self.remaining.split_first()?;
        let len = len as usize;
        if rest.len() < len {
            return None;
        }
        let (entry, rest) = rest.split_at(len);
        self.remaining = rest;
        Some(entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inet::{IpV4Address, IpV6Address};

    fn alpn_list(entries: &[&[u8]]) -> Vec<u8> {
        let mut out = Vec::new();
        for entry in entries {
            out.push(entry.len() as u8);
            out.extend_from_slice(entry);
        }
        out
    }

    #[test]
    fn sorts_v6_before_v4_specific_before_v4_wildcard() {
        let registry = Registry::new();

        registry.register(Listener::new(None, AddressFamily::V4, b"h3".to_vec()));
        registry.register(Listener::new(
            Some(IpAddress::Ipv6(IpV6Address::new([
                0x20, 0x01, 0x0d, 0xb8, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1,
            ]))),
            AddressFamily::V6,
            b"h3".to_vec(),
        ));
        registry.register(Listener::new(
            Some(IpAddress::Ipv4(IpV4Address::new([10, 0, 0, 1]))),
            AddressFamily::V4,
            b"h3".to_vec(),
        ));

        let listeners = registry.listeners.read().unwrap();
        assert_eq!(listeners[0].address_family, AddressFamily::V6);
        assert_eq!(listeners[1].address_family, AddressFamily::V4);
        assert!(!listeners[1].is_wildcard());
        assert_eq!(listeners[2].address_family, AddressFamily::V4);
        assert!(listeners[2].is_wildcard());
    }

    #[test]
    fn rejects_exact_duplicate() {
        let registry = Registry::new();
        let ip = IpAddress::Ipv4(IpV4Address::new([10, 0, 0, 1]));

        assert!(registry
            .register(Listener::new(Some(ip), AddressFamily::V4, b"h3".to_vec()))
            .is_some());
        assert!(registry
            .register(Listener::new(Some(ip), AddressFamily::V4, b"h3".to_vec()))
            .is_none());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn matches_first_alpn_in_client_preference_order() {
        let registry = Registry::new();
        registry.register(Listener::new(None, AddressFamily::Unspecified, b"h3".to_vec()));
        registry.register(Listener::new(
            None,
            AddressFamily::Unspecified,
            b"http/1.1".to_vec(),
        ));

        let local = IpAddress::Ipv4(IpV4Address::new([127, 0, 0, 1]));
        let alpn = alpn_list(&[b"http/1.1", b"h3"]);

        let matched = registry.find_match(&local, &alpn).unwrap();
        assert_eq!(matched.alpn, b"http/1.1");
    }

    #[test]
    fn skips_torn_down_listener() {
        let registry = Registry::new();
        let listener = registry
            .register(Listener::new(None, AddressFamily::Unspecified, b"h3".to_vec()))
            .unwrap();
        registry.unregister(&listener);

        let local = IpAddress::Ipv4(IpV4Address::new([127, 0, 0, 1]));
        let alpn = alpn_list(&[b"h3"]);
        assert!(registry.find_match(&local, &alpn).is_none());
    }
}
