// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! The Binding: owns one UDP endpoint (a full four-tuple, or a local two-tuple in shared
//! mode), demultiplexes inbound datagrams to connections by destination connection id, and
//! answers unmatched datagrams with Version Negotiation, Retry, or Stateless Reset.
//!
//! The connection state machine, the datapath sockets, and the connection-id lookup table
//! are external collaborators reached through the [`Connection`], [`Datapath`], and
//! [`Lookup`] traits; this module owns only the demultiplexing and stateless-response
//! policy around them.

pub mod listener;

use crate::{
    connection,
    inet::SocketAddress,
    packet::{self, ProtectedPacket},
    preprocess::{self, Decision, Mode},
    random, response, stateless,
    time::Timestamp,
};
use alloc::{boxed::Box, sync::Arc, vec::Vec};
use s2n_codec::{DecoderBufferMut, Encoder, EncoderBuffer, EncoderValue};
use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Mutex,
};

/// Memory attributed to one in-flight handshake, charged to [`HANDSHAKE_MEMORY_USAGE`] for
/// the lifetime between `create_connection` and the connection leaving the handshake.
pub const CONN_HANDSHAKE_MEMORY_USAGE: usize = 16 * 1024;

/// Process-wide counter of memory attributed to in-flight handshakes across every Binding.
/// Retry gating re-evaluates the limit against this counter on every admission.
static HANDSHAKE_MEMORY_USAGE: AtomicUsize = AtomicUsize::new(0);

/// Upper bound on any single stateless response datagram this module builds.
const MAX_STATELESS_RESPONSE_LEN: usize = 1500;

/// One inbound datagram as handed to the Binding by the datapath, carrying the metadata
/// needed to route a reply back to where it came from.
pub struct InboundDatagram {
    pub remote_address: SocketAddress,
    pub local_address: SocketAddress,
    pub payload: Vec<u8>,
}

/// Why a connection is being torn down without ever reaching the application.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShutdownReason {
    /// Shut down without notifying the peer; used to unwind a connection that lost a race
    /// with another connection for the same source connection id, or that could not be
    /// attached to a binding that is shutting down.
    Silent,
}

/// A connection handle as seen by the Binding. The handshake/state machine itself is out
/// of scope; this is the narrow seam the Demultiplexer delivers datagrams through.
pub trait Connection: Send + Sync {
    /// Delivers one ordered subchain of datagrams, all sharing a destination connection id.
    fn queue_recv(&self, datagrams: Vec<InboundDatagram>);

    /// Notifies the connection that the peer's address became unreachable.
    fn queue_unreachable(&self, remote: SocketAddress);

    /// Requests that the connection shut down without involvement from the receive thread
    /// that discovered the need to, per the backup-operation pattern: the connection owns
    /// the one-shot slot and guarantees this is only ever actually acted on once.
    fn shutdown_async(&self, reason: ShutdownReason);
}

/// The connection-id keyed lookup table the Demultiplexer consults and maintains.
///
/// Out of scope: the actual hashing/partitioning scheme backing it.
pub trait Lookup: Send + Sync {
    fn find_by_dest_cid(&self, cid: &[u8]) -> Option<Arc<dyn Connection>>;
    fn find_by_remote_addr(&self, remote: &SocketAddress) -> Option<Arc<dyn Connection>>;

    /// Inserts `cid` for `connection`. On collision, returns the connection already
    /// occupying that id instead of inserting.
    fn add_source_cid(
        &self,
        cid: &[u8],
        connection: Arc<dyn Connection>,
    ) -> Result<(), Arc<dyn Connection>>;

    /// Re-balances the lookup table's internal partitioning now that a listener has been
    /// registered. Failure means the partitioning attempt itself failed, not that there was
    /// nothing to do.
    fn maximize_partitioning(&self) -> bool;
}

/// Constructs a brand-new connection from the datagram that justified creating one.
///
/// Out of scope: the handshake/state machine the connection goes on to run.
pub trait ConnectionFactory: Send + Sync {
    /// Returns the new connection and the initial source connection id it should be
    /// reachable under, or `None` if construction failed (logged and dropped by the
    /// caller).
    fn initialize(
        &self,
        initial_datagram: &InboundDatagram,
        valid_token: bool,
    ) -> Option<(Arc<dyn Connection>, connection::id::UnboundedId)>;
}

/// Sends a reply datagram from the Binding's side of the path back to a remote address.
///
/// Out of scope: the actual socket/platform send path.
pub trait Datapath: Send + Sync {
    fn send_from_to(&self, local: SocketAddress, remote: SocketAddress, payload: &[u8]);
}

/// One inbound packet's header fields, extracted once during preprocessing and carried
/// alongside its datagram for the rest of the demultiplex pipeline.
#[derive(Clone)]
struct DecodedHead {
    destination_connection_id: connection::id::UnboundedId,
    source_connection_id: Option<connection::id::UnboundedId>,
    is_handshake: bool,
    is_initial: bool,
    version: Option<u32>,
    /// `Some(bytes)` only for an Initial packet; empty bytes mean no token was presented.
    token: Option<Vec<u8>>,
}

enum PreprocessOutcome {
    Accept(DecodedHead),
    UnsupportedVersion {
        destination_connection_id: connection::id::UnboundedId,
        source_connection_id: connection::id::UnboundedId,
    },
    Reject {
        #[allow(dead_code)]
        reason: &'static str,
    },
}

/// The endpoint abstraction over one UDP socket: the Binding demultiplexes inbound
/// datagrams to connections and builds the three stateless replies QUIC requires.
pub struct Binding {
    mode: Mode,
    local_address: SocketAddress,
    #[allow(dead_code)]
    connected: bool,

    listeners: listener::Registry,
    lookup: Arc<dyn Lookup>,
    connection_factory: Arc<dyn ConnectionFactory>,
    datapath: Arc<dyn Datapath>,

    /// Every destination connection id on a shared binding must carry at least this many
    /// bytes; see [`connection::id::Validator`].
    connection_id_validator: usize,

    stateless_table: stateless::Table,
    handshake_connections: AtomicUsize,

    reset_token_generator: Mutex<response::reset::Generator>,
    retry_key: response::retry::RetryKey,
    random_reserved_version: u32,
    random_generator: Mutex<Box<dyn random::Generator>>,

    /// Absolute handshake-memory threshold above which new initials are redirected through
    /// Retry. Precomputed from `retry_memory_limit * total_memory / u16::MAX`.
    retry_memory_threshold: usize,

    ref_count: AtomicUsize,
    shutting_down: AtomicBool,
}

impl Binding {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        mode: Mode,
        local_address: SocketAddress,
        connected: bool,
        lookup: Arc<dyn Lookup>,
        connection_factory: Arc<dyn ConnectionFactory>,
        datapath: Arc<dyn Datapath>,
        connection_id_validator: usize,
        total_memory_bytes: usize,
        retry_memory_limit_numerator: u16,
        mut random_generator: Box<dyn random::Generator>,
    ) -> Self {
        let random_reserved_version = response::vn::random_reserved_version(&mut *random_generator);
        let retry_key = response::retry::RetryKey::new(&mut *random_generator);
        let reset_token_generator = response::reset::Generator::new(&mut *random_generator);

        let retry_memory_threshold = (retry_memory_limit_numerator as usize)
            .saturating_mul(total_memory_bytes)
            / (u16::MAX as usize);

        Self {
            mode,
            local_address,
            connected,
            listeners: listener::Registry::new(),
            lookup,
            connection_factory,
            datapath,
            connection_id_validator,
            stateless_table: stateless::Table::new(),
            handshake_connections: AtomicUsize::new(0),
            reset_token_generator: Mutex::new(reset_token_generator),
            retry_key,
            random_reserved_version,
            random_generator: Mutex::new(random_generator),
            retry_memory_threshold,
            ref_count: AtomicUsize::new(1),
            shutting_down: AtomicBool::new(false),
        }
    }

    pub fn listeners(&self) -> &listener::Registry {
        &self.listeners
    }

    /// Registers `listener`, then re-balances the lookup's partitioning if this was the
    /// first listener on the binding. If that re-balance fails the listener is unregistered
    /// and registration reports failure, per §4.1.
    pub fn register_listener(&self, listener: listener::Listener) -> Option<Arc<listener::Listener>> {
        let was_empty = self.listeners.is_empty();
        let registered = self.listeners.register(listener)?;

        if was_empty && !self.lookup.maximize_partitioning() {
            self.listeners.unregister(&registered);
            return None;
        }

        Some(registered)
    }

    pub fn handshake_connections(&self) -> usize {
        self.handshake_connections.load(Ordering::Acquire)
    }

    pub fn begin_shutdown(&self) {
        self.shutting_down.store(true, Ordering::Release);
    }

    /// Whether this binding's teardown invariants hold right now. Teardown itself is driven
    /// by the (out of scope) top-level library lifecycle.
    pub fn is_safe_to_teardown(&self) -> bool {
        self.handshake_connections.load(Ordering::Acquire) == 0
            && self.listeners.is_empty()
            && self.stateless_table.is_empty()
    }

    fn try_add_ref(&self) -> bool {
        if self.shutting_down.load(Ordering::Acquire) {
            return false;
        }
        self.ref_count.fetch_add(1, Ordering::AcqRel);
        true
    }

    fn release_ref(&self) {
        self.ref_count.fetch_sub(1, Ordering::AcqRel);
    }

    fn should_retry(&self) -> bool {
        HANDSHAKE_MEMORY_USAGE.load(Ordering::Relaxed) >= self.retry_memory_threshold
    }

    /// Validates version-independent invariants and the exclusive/shared mode rule for one
    /// datagram, extracting the header fields the rest of the pipeline needs. Borrows
    /// `datagram.payload` only for the duration of decode; everything returned is owned.
    fn preprocess_one(&self, datagram: &mut InboundDatagram) -> PreprocessOutcome {
        let remote_address = datagram.remote_address;
        let connection_info = connection::id::ConnectionInfo::new(&remote_address);
        let buffer = DecoderBufferMut::new(&mut datagram.payload);

        let decision = preprocess::preprocess(
            buffer,
            &connection_info,
            &self.connection_id_validator,
            self.mode,
            |version| version == response::vn::SUPPORTED_VERSION,
        );

        match decision {
            Decision::Accept(packet) => {
                let destination_connection_id =
                    connection::id::UnboundedId::try_from_bytes(packet.destination_connection_id())
                        .expect("destination CID length already validated by preprocess");
                let source_connection_id = packet
                    .source_connection_id()
                    .and_then(connection::id::UnboundedId::try_from_bytes);
                let is_handshake = !matches!(packet, ProtectedPacket::Short(_));
                let is_initial = matches!(packet, ProtectedPacket::Initial(_));
                let version = packet.version();
                let token = match &packet {
                    ProtectedPacket::Initial(initial) => Some(initial.token().to_vec()),
                    _ => None,
                };

                PreprocessOutcome::Accept(DecodedHead {
                    destination_connection_id,
                    source_connection_id,
                    is_handshake,
                    is_initial,
                    version,
                    token,
                })
            }
            Decision::UnsupportedVersion {
                destination_connection_id,
                source_connection_id,
            } => PreprocessOutcome::UnsupportedVersion {
                destination_connection_id,
                source_connection_id,
            },
            Decision::Reject { reason } => PreprocessOutcome::Reject { reason },
        }
    }

    /// Entry point for a batch of datagrams delivered together by the datapath. Splits the
    /// batch into per-destination-CID subchains (handshake packets ordered ahead of data
    /// packets within each) and delivers each as it completes.
    pub fn on_receive(&self, datagrams: Vec<InboundDatagram>, now: Timestamp) {
        let mut current_cid: Option<Vec<u8>> = None;
        let mut current_head: Option<DecodedHead> = None;
        let mut handshake_group: Vec<InboundDatagram> = Vec::new();
        let mut data_group: Vec<InboundDatagram> = Vec::new();

        for mut datagram in datagrams {
            match self.preprocess_one(&mut datagram) {
                PreprocessOutcome::Accept(head) => {
                    let is_new_subchain = match &current_cid {
                        Some(cid) => cid.as_slice() != head.destination_connection_id.as_bytes(),
                        None => false,
                    };

                    if is_new_subchain {
                        let finished_head = current_head
                            .take()
                            .expect("current_cid is only set alongside current_head");
                        self.deliver(drain_subchain(&mut handshake_group, &mut data_group), finished_head, now);
                    }

                    if current_cid.is_none() || is_new_subchain {
                        current_cid = Some(head.destination_connection_id.as_bytes().to_vec());
                        current_head = Some(head.clone());
                    } else if head.is_handshake && !current_head.as_ref().unwrap().is_handshake {
                        // a handshake packet arrived after a data-only head for the same id:
                        // promote it, so the delivered subchain's head is the handshake one
                        current_head = Some(head.clone());
                    }

                    if head.is_handshake {
                        handshake_group.push(datagram);
                    } else {
                        data_group.push(datagram);
                    }
                }
                PreprocessOutcome::UnsupportedVersion {
                    destination_connection_id,
                    source_connection_id,
                } => {
                    self.queue_version_negotiation(
                        &datagram,
                        &destination_connection_id,
                        &source_connection_id,
                        now,
                    );
                }
                PreprocessOutcome::Reject { reason } => {
                    tracing::debug!(reason, "dropping inbound datagram");
                }
            }
        }

        if let Some(head) = current_head {
            self.deliver(drain_subchain(&mut handshake_group, &mut data_group), head, now);
        }
    }

    /// Notifies whichever connection is reachable at `remote` that it became unreachable.
    pub fn on_unreachable(&self, remote: SocketAddress) {
        if let Some(connection) = self.lookup.find_by_remote_addr(&remote) {
            connection.queue_unreachable(remote);
        }
    }

    fn deliver(&self, datagrams: Vec<InboundDatagram>, head: DecodedHead, now: Timestamp) {
        if let Some(connection) = self.lookup.find_by_dest_cid(head.destination_connection_id.as_bytes()) {
            connection.queue_recv(datagrams);
            return;
        }

        let Some(first) = datagrams.first() else {
            return;
        };

        if !head.is_handshake {
            self.queue_stateless_reset(first, &head, now);
            return;
        }

        if self.listeners.is_empty() {
            tracing::debug!("dropping handshake datagram with no listener registered");
            return;
        }

        if head.version != Some(response::vn::SUPPORTED_VERSION) || !head.is_initial {
            tracing::debug!("dropping unmatched long-header datagram of non-initial type");
            return;
        }

        let valid_token = match head.token.as_deref() {
            Some(token) if !token.is_empty() => {
                match self.validate_retry_token(first, &head, token) {
                    Some(_original_destination_connection_id) => true,
                    None => {
                        tracing::debug!("Retry Token Addr Mismatch");
                        return;
                    }
                }
            }
            _ => false,
        };

        if self.should_retry() && !valid_token {
            self.queue_retry(first, &head, now);
            return;
        }

        self.create_connection(datagrams, &head, valid_token);
    }

    fn create_connection(&self, datagrams: Vec<InboundDatagram>, head: &DecodedHead, valid_token: bool) {
        let Some(first) = datagrams.first() else {
            return;
        };

        let Some((connection, initial_source_connection_id)) =
            self.connection_factory.initialize(first, valid_token)
        else {
            tracing::debug!(
                destination_connection_id = ?head.destination_connection_id,
                "failed to initialize connection"
            );
            return;
        };

        if !self.try_add_ref() {
            connection.shutdown_async(ShutdownReason::Silent);
            return;
        }

        self.handshake_connections.fetch_add(1, Ordering::AcqRel);
        HANDSHAKE_MEMORY_USAGE.fetch_add(CONN_HANDSHAKE_MEMORY_USAGE, Ordering::AcqRel);

        match self
            .lookup
            .add_source_cid(initial_source_connection_id.as_bytes(), connection.clone())
        {
            Ok(()) => connection.queue_recv(datagrams),
            Err(existing) => {
                // lost the race for this source connection id: unwind the new connection and
                // hand the datagrams to whichever connection actually won
                self.handshake_connections.fetch_sub(1, Ordering::AcqRel);
                HANDSHAKE_MEMORY_USAGE.fetch_sub(CONN_HANDSHAKE_MEMORY_USAGE, Ordering::AcqRel);
                self.release_ref();
                connection.shutdown_async(ShutdownReason::Silent);
                existing.queue_recv(datagrams);
            }
        }
    }

    fn validate_retry_token(
        &self,
        datagram: &InboundDatagram,
        head: &DecodedHead,
        token: &[u8],
    ) -> Option<connection::id::UnboundedId> {
        if token.len() != response::retry::TOKEN_LEN {
            return None;
        }
        self.retry_key.open(
            head.destination_connection_id.as_bytes(),
            &datagram.remote_address,
            token,
        )
    }

    fn queue_version_negotiation(
        &self,
        datagram: &InboundDatagram,
        destination_connection_id: &connection::id::UnboundedId,
        source_connection_id: &connection::id::UnboundedId,
        now: Timestamp,
    ) {
        if self.listeners.is_empty() {
            return;
        }

        let Some(context_id) = self.stateless_table.create(datagram.remote_address, now) else {
            return;
        };

        let mut buffer = [0u8; MAX_STATELESS_RESPONSE_LEN];
        let written = {
            let mut guard = self.random_generator.lock().unwrap();
            let random_generator: &mut dyn random::Generator = &mut **guard;
            response::vn::encode_packet(
                destination_connection_id.as_bytes(),
                source_connection_id.as_bytes(),
                self.random_reserved_version,
                random_generator,
                &mut buffer,
            )
        };

        if let Some(len) = written {
            self.datapath
                .send_from_to(datagram.local_address, datagram.remote_address, &buffer[..len]);
        }

        self.stateless_table.release(context_id);
    }

    fn queue_stateless_reset(&self, datagram: &InboundDatagram, head: &DecodedHead, now: Timestamp) {
        if self.mode == Mode::Exclusive {
            return;
        }

        let Some(context_id) = self.stateless_table.create(datagram.remote_address, now) else {
            return;
        };

        let key_phase = datagram
            .payload
            .first()
            .map(|byte| byte & 0b0000_0100 != 0)
            .unwrap_or(false);

        let mut buffer = [0u8; MAX_STATELESS_RESPONSE_LEN];
        let written = {
            let mut reset_generator = self.reset_token_generator.lock().unwrap();
            let mut rng_guard = self.random_generator.lock().unwrap();
            let random_generator: &mut dyn random::Generator = &mut **rng_guard;
            response::reset::encode_packet(
                &mut *reset_generator,
                head.destination_connection_id.as_bytes(),
                key_phase,
                datagram.payload.len(),
                random_generator,
                &mut buffer,
            )
        };

        if let Some(len) = written {
            self.datapath
                .send_from_to(datagram.local_address, datagram.remote_address, &buffer[..len]);
        }

        self.stateless_table.release(context_id);
    }

    fn queue_retry(&self, datagram: &InboundDatagram, head: &DecodedHead, now: Timestamp) {
        let Some(context_id) = self.stateless_table.create(datagram.remote_address, now) else {
            return;
        };

        let mut new_connection_id = [0u8; response::retry::MSQUIC_CONNECTION_ID_LENGTH];
        {
            let mut guard = self.random_generator.lock().unwrap();
            guard.public_random_fill(&mut new_connection_id);
        }

        let token = self.retry_key.seal(
            &new_connection_id,
            &datagram.remote_address,
            head.destination_connection_id.as_bytes(),
        );

        let empty = [];
        let client_source_connection_id = head
            .source_connection_id
            .as_ref()
            .map(connection::id::UnboundedId::as_bytes)
            .unwrap_or(&empty);

        let retry_packet = packet::retry::Retry::new(
            head.version.unwrap_or(response::vn::SUPPORTED_VERSION),
            client_source_connection_id,
            &new_connection_id,
            &token,
        );

        let mut buffer = [0u8; MAX_STATELESS_RESPONSE_LEN];
        let mut encoder = EncoderBuffer::new(&mut buffer);
        retry_packet.encode(&mut encoder);
        let len = encoder.len();

        self.datapath
            .send_from_to(datagram.local_address, datagram.remote_address, &buffer[..len]);
        self.stateless_table.release(context_id);
    }
}

fn drain_subchain(
    handshake_group: &mut Vec<InboundDatagram>,
    data_group: &mut Vec<InboundDatagram>,
) -> Vec<InboundDatagram> {
    let mut subchain = core::mem::take(handshake_group);
    subchain.append(data_group);
    subchain
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inet::SocketAddressV4;
    use std::{collections::HashMap, sync::Mutex as StdMutex};

    fn now() -> Timestamp {
        unsafe { Timestamp::from_duration(core::time::Duration::from_secs(1)) }
    }

    fn addr(port: u16) -> SocketAddress {
        SocketAddressV4::new([127, 0, 0, 1], port).into()
    }

    struct RecordingConnection {
        received: StdMutex<Vec<Vec<InboundDatagram>>>,
    }

    impl RecordingConnection {
        fn new() -> Self {
            Self {
                received: StdMutex::new(Vec::new()),
            }
        }
    }

    impl Connection for RecordingConnection {
        fn queue_recv(&self, datagrams: Vec<InboundDatagram>) {
            self.received.lock().unwrap().push(datagrams);
        }

        fn queue_unreachable(&self, _remote: SocketAddress) {}

        fn shutdown_async(&self, _reason: ShutdownReason) {}
    }

    #[derive(Default)]
    struct MapLookup {
        by_cid: StdMutex<HashMap<Vec<u8>, Arc<dyn Connection>>>,
    }

    impl MapLookup {
        fn insert(&self, cid: &[u8], connection: Arc<dyn Connection>) {
            self.by_cid.lock().unwrap().insert(cid.to_vec(), connection);
        }
    }

    impl Lookup for MapLookup {
        fn find_by_dest_cid(&self, cid: &[u8]) -> Option<Arc<dyn Connection>> {
            self.by_cid.lock().unwrap().get(cid).cloned()
        }

        fn find_by_remote_addr(&self, _remote: &SocketAddress) -> Option<Arc<dyn Connection>> {
            None
        }

        fn add_source_cid(
            &self,
            cid: &[u8],
            connection: Arc<dyn Connection>,
        ) -> Result<(), Arc<dyn Connection>> {
            let mut map = self.by_cid.lock().unwrap();
            if let Some(existing) = map.get(cid) {
                return Err(existing.clone());
            }
            map.insert(cid.to_vec(), connection);
            Ok(())
        }

        fn maximize_partitioning(&self) -> bool {
            true
        }
    }

    struct AlwaysCreateFactory;

    impl ConnectionFactory for AlwaysCreateFactory {
        fn initialize(
            &self,
            _initial_datagram: &InboundDatagram,
            _valid_token: bool,
        ) -> Option<(Arc<dyn Connection>, connection::id::UnboundedId)> {
            let id = connection::id::UnboundedId::try_from_bytes(&[7, 7, 7, 7, 7, 7, 7, 7]).unwrap();
            Some((Arc::new(RecordingConnection::new()), id))
        }
    }

    #[derive(Default)]
    struct RecordingDatapath {
        sent: StdMutex<Vec<(SocketAddress, SocketAddress, Vec<u8>)>>,
    }

    impl Datapath for RecordingDatapath {
        fn send_from_to(&self, local: SocketAddress, remote: SocketAddress, payload: &[u8]) {
            self.sent
                .lock()
                .unwrap()
                .push((local, remote, payload.to_vec()));
        }
    }

    /// Fixed destination connection id length this test suite's shared bindings validate
    /// short-header packets against (see `connection::id::Validator for usize`).
    const SHORT_HEADER_CID_LEN: usize = 8;

    fn shared_binding(
        lookup: Arc<dyn Lookup>,
        datapath: Arc<RecordingDatapath>,
    ) -> Binding {
        Binding::new(
            Mode::Shared,
            addr(443),
            false,
            lookup,
            Arc::new(AlwaysCreateFactory),
            datapath,
            SHORT_HEADER_CID_LEN,
            1 << 20,
            u16::MAX,
            Box::new(random::testing::Generator::default()),
        )
    }

    fn encode_long_header(version: u32, tag: u8, dcid: &[u8], scid: &[u8], token: &[u8]) -> Vec<u8> {
        struct Header<'a> {
            tag: u8,
            version: u32,
            dcid: &'a [u8],
            scid: &'a [u8],
            token: &'a [u8],
        }
        impl EncoderValue for Header<'_> {
            fn encode<E: Encoder>(&self, encoder: &mut E) {
                self.tag.encode(encoder);
                self.version.encode(encoder);
                (self.dcid.len() as u8).encode(encoder);
                self.dcid.encode(encoder);
                (self.scid.len() as u8).encode(encoder);
                self.scid.encode(encoder);
                (self.token.len() as u8).encode(encoder);
                self.token.encode(encoder);
                20u8.encode(encoder); // payload length varint
                0u8.encode(encoder); // 1-byte packet number
                encoder.write_repeated(32, 0);
            }
        }

        let header = Header {
            tag,
            version,
            dcid,
            scid,
            token,
        };
        let mut buffer = alloc::vec![0u8; 256];
        let mut encoder = EncoderBuffer::new(&mut buffer);
        header.encode(&mut encoder);
        let len = encoder.len();
        buffer.truncate(len);
        buffer
    }

    fn encode_short_header(dcid: &[u8; SHORT_HEADER_CID_LEN]) -> Vec<u8> {
        let mut bytes = alloc::vec![0b0100_0001u8];
        bytes.extend_from_slice(dcid);
        bytes.extend_from_slice(&[0u8; 40]);
        bytes
    }

    #[test]
    fn unknown_version_with_listener_sends_version_negotiation() {
        let lookup: Arc<dyn Lookup> = Arc::new(MapLookup::default());
        let datapath = Arc::new(RecordingDatapath::default());
        let binding = shared_binding(lookup, datapath.clone());
        binding
            .register_listener(listener::Listener::new(
                None,
                listener::AddressFamily::Unspecified,
                b"h3".to_vec(),
            ))
            .unwrap();

        let dcid = [0xA1, 0xA2, 0xA3, 0xA4, 0xA5, 0xA6, 0xA7, 0xA8];
        let scid = [0xB1, 0xB2];
        let payload = encode_long_header(0xdead_beef, 0b1100_0000, &dcid, &scid, &[]);

        let datagram = InboundDatagram {
            remote_address: addr(1),
            local_address: addr(443),
            payload,
        };

        binding.on_receive(alloc::vec![datagram], now());

        let sent = datapath.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        let (_, remote, bytes) = &sent[0];
        assert_eq!(*remote, addr(1));
        assert_eq!(bytes[0] & 0x80, 0x80);
        assert_eq!(bytes[5] as usize, scid.len());
        assert_eq!(&bytes[6..6 + scid.len()], &scid);
    }

    #[test]
    fn unknown_version_with_no_listener_is_dropped() {
        let lookup: Arc<dyn Lookup> = Arc::new(MapLookup::default());
        let datapath = Arc::new(RecordingDatapath::default());
        let binding = shared_binding(lookup, datapath.clone());

        let dcid = [0xA1; 8];
        let scid = [0xB1; 2];
        let payload = encode_long_header(0xdead_beef, 0b1100_0000, &dcid, &scid, &[]);
        let datagram = InboundDatagram {
            remote_address: addr(1),
            local_address: addr(443),
            payload,
        };

        binding.on_receive(alloc::vec![datagram], now());
        assert!(datapath.sent.lock().unwrap().is_empty());
    }

    #[test]
    fn cid_keyed_demultiplex_splits_by_destination_cid() {
        let lookup = Arc::new(MapLookup::default());
        let cx = Arc::new(RecordingConnection::new());
        let cy = Arc::new(RecordingConnection::new());
        let cid_x = *b"XXXXXXXX";
        let cid_y = *b"YYYYYYYY";
        lookup.insert(&cid_x, cx.clone());
        lookup.insert(&cid_y, cy.clone());

        let lookup_dyn: Arc<dyn Lookup> = lookup;
        let datapath = Arc::new(RecordingDatapath::default());
        let binding = shared_binding(lookup_dyn, datapath);

        let datagrams = alloc::vec![
            InboundDatagram {
                remote_address: addr(1),
                local_address: addr(443),
                payload: encode_short_header(&cid_x),
            },
            InboundDatagram {
                remote_address: addr(2),
                local_address: addr(443),
                payload: encode_short_header(&cid_y),
            },
            InboundDatagram {
                remote_address: addr(1),
                local_address: addr(443),
                payload: encode_short_header(&cid_x),
            },
        ];

        binding.on_receive(datagrams, now());

        let cx_received = cx.received.lock().unwrap();
        assert_eq!(cx_received.len(), 1);
        assert_eq!(cx_received[0].len(), 2);

        let cy_received = cy.received.lock().unwrap();
        assert_eq!(cy_received.len(), 1);
        assert_eq!(cy_received[0].len(), 1);
    }

    #[test]
    fn retry_gating_sends_retry_then_admits_replayed_token() {
        let lookup: Arc<dyn Lookup> = Arc::new(MapLookup::default());
        let datapath = Arc::new(RecordingDatapath::default());
        let binding = shared_binding(lookup, datapath.clone());
        binding
            .register_listener(listener::Listener::new(
                None,
                listener::AddressFamily::Unspecified,
                b"h3".to_vec(),
            ))
            .unwrap();

        HANDSHAKE_MEMORY_USAGE.store(usize::MAX, Ordering::SeqCst);

        let dcid = [0xAA; 8];
        let scid = [0xBB; 8];
        let payload = encode_long_header(
            response::vn::SUPPORTED_VERSION,
            0b1100_0000,
            &dcid,
            &scid,
            &[],
        );
        let datagram = InboundDatagram {
            remote_address: addr(9),
            local_address: addr(443),
            payload,
        };

        binding.on_receive(alloc::vec![datagram], now());

        let sent = datapath.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        // Retry wire layout: tag, version(4), dcid_len, dcid, scid_len, scid, token(rest).
        // The Retry's destination connection id is the client's original source
        // connection id (echoed back); its source connection id is the new, server-chosen
        // connection id the client must use as the destination CID of its next Initial.
        let (new_cid, token) = {
            let (_, _, bytes) = &sent[0];
            let mut offset = 1 + 4;
            let retry_dcid_len = bytes[offset] as usize;
            offset += 1 + retry_dcid_len;
            let retry_scid_len = bytes[offset] as usize;
            offset += 1;
            let new_cid = bytes[offset..offset + retry_scid_len].to_vec();
            offset += retry_scid_len;
            (new_cid, bytes[offset..].to_vec())
        };
        drop(sent);

        // client replays the token from the same remote address: new destination CID is the
        // server-chosen CID embedded in the retry we just observed
        let new_cid = new_cid.as_slice();

        let replay_payload = encode_long_header(
            response::vn::SUPPORTED_VERSION,
            0b1100_0000,
            new_cid,
            &scid,
            &token,
        );
        let replay = InboundDatagram {
            remote_address: addr(9),
            local_address: addr(443),
            payload: replay_payload,
        };

        binding.on_receive(alloc::vec![replay], now());

        // still exactly one send (the first Retry); the replay created a connection instead
        assert_eq!(datapath.sent.lock().unwrap().len(), 1);
        assert_eq!(binding.handshake_connections(), 1);

        HANDSHAKE_MEMORY_USAGE.store(0, Ordering::SeqCst);
    }

    #[test]
    fn unmatched_short_header_on_shared_binding_triggers_stateless_reset() {
        let lookup: Arc<dyn Lookup> = Arc::new(MapLookup::default());
        let datapath = Arc::new(RecordingDatapath::default());
        let binding = shared_binding(lookup, datapath.clone());

        let datagram = InboundDatagram {
            remote_address: addr(5),
            local_address: addr(443),
            payload: encode_short_header(&[1, 2, 3, 4, 5, 6, 7, 8]),
        };

        binding.on_receive(alloc::vec![datagram], now());
        assert_eq!(datapath.sent.lock().unwrap().len(), 1);
    }
}
