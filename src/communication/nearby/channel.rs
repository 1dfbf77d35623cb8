//! BLE control channel
//!
//! Owns the session registry, the UWB hardware and the connected-peer table
//! behind one [`BinaryLock`], and turns BLE events into session lifecycle
//! actions.
//!
//! # Execution contexts
//!
//! | Entry point                         | Context   | Lock acquisition        |
//! |-------------------------------------|-----------|-------------------------|
//! | `handle_connect`, `handle_disconnect` | interrupt | single attempt          |
//! | `handle_write`, local session API    | task      | bounded wait            |
//!
//! A `LockTimeout` fails only the current event. On a write the phone gets an
//! error record and must resend; the BLE connection is left alone. A
//! disconnect is queued instead and applied by the next task-context access.
//!
//! Callbacks run after the lock is released, so they may call back into the
//! channel.

use super::peers::{LinkState, PeerTable};
use super::tlv::{self, Command, Notification, RECORD_HEADER_LEN};
use crate::config::{NearbyConfig, MAX_PEERS};
use crate::core::traits::{BinaryLock, TimeSource};
use crate::platform::{
    error::UwbError,
    traits::{BleLink, GattLayout, PeerId, UwbHal, MAX_CHARACTERISTIC_LEN},
    Result,
};
use crate::session::config::{DeviceRole, DeviceType};
use crate::session::{MacAddress, Session, SessionRegistry, SessionType, MAX_SESSIONS};
use core::cell::RefCell;
use critical_section::Mutex;
use heapless::Vec;

/// Peer event callback
pub type PeerCallback = fn(PeerId);

/// Upper bound on session events raised by one write (one per record)
const MAX_EVENTS: usize = MAX_CHARACTERISTIC_LEN / RECORD_HEADER_LEN;

/// State guarded by the channel lock
#[derive(Debug)]
pub struct ChannelState<H, const N: usize> {
    pub registry: SessionRegistry<N>,
    pub hal: H,
    pub peers: PeerTable,
}

#[derive(Debug, Clone, Copy)]
enum Event {
    SessionStart(PeerId),
    SessionStop(PeerId),
}

type Events = Vec<Event, MAX_EVENTS>;

/// Applied deferred disconnects and the session each one stopped
type Settled = Vec<(PeerId, Option<u32>), MAX_PEERS>;

/// BLE-facing session orchestrator
///
/// Construct once at startup and share by reference between the BLE event
/// handlers and application tasks.
pub struct ControlChannel<H, T, const N: usize = MAX_SESSIONS> {
    state: BinaryLock<ChannelState<H, N>>,
    time: T,
    config: NearbyConfig,
    layout: GattLayout,
    /// Disconnects that arrived while the lock was held
    pending_disconnects: Mutex<RefCell<Vec<PeerId, MAX_PEERS>>>,
    on_connect: Option<PeerCallback>,
    on_disconnect: Option<PeerCallback>,
    on_session_start: Option<PeerCallback>,
    on_session_stop: Option<PeerCallback>,
}

impl<H: UwbHal, T: TimeSource, const N: usize> ControlChannel<H, T, N> {
    pub fn new(hal: H, time: T, config: NearbyConfig) -> Self {
        Self {
            state: BinaryLock::new(ChannelState {
                registry: SessionRegistry::new(),
                hal,
                peers: PeerTable::new(),
            }),
            time,
            config,
            layout: GattLayout::nearby(),
            pending_disconnects: Mutex::new(RefCell::new(Vec::new())),
            on_connect: None,
            on_disconnect: None,
            on_session_start: None,
            on_session_stop: None,
        }
    }

    /// Register the connect callback; replaces any previous one
    pub fn on_connect(&mut self, callback: PeerCallback) {
        self.on_connect = Some(callback);
    }

    /// Register the disconnect callback; replaces any previous one
    pub fn on_disconnect(&mut self, callback: PeerCallback) {
        self.on_disconnect = Some(callback);
    }

    /// Register the session-start callback; replaces any previous one
    pub fn on_session_start(&mut self, callback: PeerCallback) {
        self.on_session_start = Some(callback);
    }

    /// Register the session-stop callback; replaces any previous one
    pub fn on_session_stop(&mut self, callback: PeerCallback) {
        self.on_session_stop = Some(callback);
    }

    pub fn config(&self) -> &NearbyConfig {
        &self.config
    }

    /// GATT shape the BLE stack should expose
    pub fn layout(&self) -> &GattLayout {
        &self.layout
    }

    /// Publish the accessory configuration on the read-only characteristic
    pub fn begin<L: BleLink>(&self, link: &mut L) -> Result<()> {
        link.set_accessory_config(&self.config.accessory_config)?;
        crate::log_info!(
            "nearby: {} ready, {} byte accessory config",
            self.config.device_name.as_str(),
            self.config.accessory_config.len()
        );
        Ok(())
    }

    /// BLE connect event (interrupt context)
    ///
    /// A connect beyond the peer table capacity is logged and ignored.
    pub fn handle_connect(&self, peer: PeerId) -> Result<()> {
        self.cancel_deferred_disconnect(peer);
        let connected = self.state.with_isr(|state| state.peers.connect(peer))?;
        if let Err(e) = connected {
            crate::log_warn!("peer {}: connect ignored: {}", peer, e);
            return Err(e);
        }

        crate::log_info!("peer {} connected", peer);
        fire(self.on_connect, peer);
        Ok(())
    }

    /// BLE disconnect event (interrupt context)
    ///
    /// Stops the peer's active session and drops the association. The session
    /// stays registered; deleting it is a separate command.
    ///
    /// If the lock is busy the disconnect is queued and `LockTimeout` is
    /// returned. The next task-context access applies it before doing
    /// anything else, unless the peer connects again first.
    pub fn handle_disconnect(&self, peer: PeerId) -> Result<()> {
        let outcome = match self.state.with_isr(|state| disconnect_peer(state, peer)) {
            Ok(outcome) => outcome,
            Err(e) => {
                self.defer_disconnect(peer);
                return Err(e);
            }
        };

        let Some(stopped) = outcome else {
            crate::log_debug!("peer {}: disconnect for unknown peer", peer);
            return Err(UwbError::NotFound);
        };
        self.finish_disconnect(peer, stopped);
        Ok(())
    }

    fn defer_disconnect(&self, peer: PeerId) {
        let queued = critical_section::with(|cs| {
            let mut pending = self.pending_disconnects.borrow_ref_mut(cs);
            pending.contains(&peer) || pending.push(peer).is_ok()
        });
        if queued {
            crate::log_warn!("peer {}: lock busy, disconnect deferred", peer);
        } else {
            crate::log_error!("peer {}: lock busy, disconnect lost", peer);
        }
    }

    fn cancel_deferred_disconnect(&self, peer: PeerId) {
        critical_section::with(|cs| {
            self.pending_disconnects
                .borrow_ref_mut(cs)
                .retain(|&p| p != peer)
        });
    }

    /// Apply queued disconnects; runs under the lock in task context
    fn settle(&self, state: &mut ChannelState<H, N>) -> Settled {
        let pending = critical_section::with(|cs| {
            core::mem::take(&mut *self.pending_disconnects.borrow_ref_mut(cs))
        });

        let mut settled = Settled::new();
        for peer in pending {
            if let Some(stopped) = disconnect_peer(state, peer) {
                let _ = settled.push((peer, stopped));
            }
        }
        settled
    }

    fn finish_disconnect(&self, peer: PeerId, stopped: Option<u32>) {
        if let Some(id) = stopped {
            crate::log_info!("session {} stopped, peer {} gone", id, peer);
            fire(self.on_session_stop, peer);
        }
        crate::log_info!("peer {} disconnected", peer);
        fire(self.on_disconnect, peer);
    }

    /// Command characteristic write (task context)
    ///
    /// Records are handled in order. Unknown tags are skipped. A malformed
    /// record ends processing; records before it stay applied. Every failing
    /// command is answered with an error record, and the last failure is
    /// returned.
    pub fn handle_write<L: BleLink>(
        &self,
        peer: PeerId,
        data: &[u8],
        link: &mut L,
    ) -> Result<()> {
        let request = data.first().copied().unwrap_or(0);
        if data.len() > self.layout.command_rx.max_len {
            crate::log_warn!("peer {}: {} byte write too long", peer, data.len());
            reply_error(link, peer, request, UwbError::ProtocolDecodeError);
            return Err(UwbError::ProtocolDecodeError);
        }

        let mut events = Events::new();
        let mut settled = Settled::new();
        let status = match self.state.lock_task(&self.time, self.config.lock_timeout_ticks) {
            Ok(mut state) => {
                settled = self.settle(&mut state);
                self.process(&mut state, peer, data, link, &mut events)
            }
            Err(e) => {
                reply_error(link, peer, request, e);
                Err(e)
            }
        };

        for (gone, stopped) in settled {
            self.finish_disconnect(gone, stopped);
        }
        for event in events {
            match event {
                Event::SessionStart(p) => fire(self.on_session_start, p),
                Event::SessionStop(p) => fire(self.on_session_stop, p),
            }
        }
        status
    }

    fn process<L: BleLink>(
        &self,
        state: &mut ChannelState<H, N>,
        peer: PeerId,
        data: &[u8],
        link: &mut L,
        events: &mut Events,
    ) -> Result<()> {
        if state.peers.get(peer).is_none() {
            crate::log_warn!("peer {}: write from unknown peer", peer);
            reply_error(link, peer, data.first().copied().unwrap_or(0), UwbError::NotFound);
            return Err(UwbError::NotFound);
        }
        state.peers.set_state(peer, LinkState::Processing);

        let mut status = Ok(());
        for record in tlv::records(data) {
            let record = match record {
                Ok(record) => record,
                Err(e) => {
                    crate::log_warn!("peer {}: malformed record", peer);
                    reply_error(link, peer, 0, e);
                    status = Err(e);
                    break;
                }
            };
            let Some(command) = Command::from_tag(record.tag) else {
                crate::log_debug!("peer {}: skipping tag {:#x}", peer, record.tag);
                continue;
            };

            crate::log_debug!("peer {}: {:?}", peer, command);
            if let Err(e) = self.dispatch(state, peer, command, record.value, link, events) {
                crate::log_warn!("peer {}: {:?} failed: {}", peer, command, e);
                reply_error(link, peer, record.tag, e);
                status = Err(e);
            }
        }

        state.peers.set_state(peer, LinkState::Connected);
        status
    }

    fn dispatch<L: BleLink>(
        &self,
        state: &mut ChannelState<H, N>,
        peer: PeerId,
        command: Command,
        value: &[u8],
        link: &mut L,
        events: &mut Events,
    ) -> Result<()> {
        match command {
            Command::Initialize => {
                let msg = tlv::encode(
                    Notification::AccessoryConfigurationData as u8,
                    &self.config.accessory_config,
                )?;
                send(link, peer, &msg);
                Ok(())
            }
            Command::ConfigureAndStart => configure_and_start(state, peer, value, link, events),
            Command::Stop => {
                let id = state.peers.session_of(peer).ok_or(UwbError::NotFound)?;
                let status = stop_session(state, peer, id, link, events);
                state.peers.unbind(peer);
                status
            }
            Command::DeleteSession => {
                let id = if value.is_empty() {
                    state.peers.session_of(peer).ok_or(UwbError::NotFound)?
                } else {
                    tlv::read_u32_le(value)?
                };
                delete_session(state, peer, id, link, events)
            }
        }
    }

    /// Register a fresh session with `session`'s identity (task context)
    pub fn add_session(&self, session: &Session) -> Result<usize> {
        self.with_state(|state| state.registry.add(session))?
    }

    /// Register a configured session as-is (task context)
    pub fn adopt_session(&self, session: Session) -> Result<usize> {
        self.with_state(|state| state.registry.adopt(session))?
    }

    /// Unregister a session without touching the hardware (task context)
    pub fn remove_session(&self, id: u32) -> Result<Session> {
        self.with_state(|state| {
            let removed = state.registry.remove(id)?;
            state.peers.unbind_session(id);
            Ok(removed)
        })?
    }

    /// Run `f` on one registered session and the hardware (task context)
    ///
    /// The session reference does not outlive the call.
    pub fn with_session<F, R>(&self, id: u32, f: F) -> Result<R>
    where
        F: FnOnce(&mut Session, &mut H) -> R,
    {
        self.with_state(|state| {
            let ChannelState { registry, hal, .. } = state;
            registry
                .find_by_id_mut(id)
                .map(|session| f(session, hal))
                .ok_or(UwbError::NotFound)
        })?
    }

    /// Start every registered session; last failure wins (task context)
    pub fn start_all(&self) -> Result<()> {
        self.with_state(|state| state.registry.start_all(&mut state.hal))?
    }

    /// Stop every registered session; last failure wins (task context)
    pub fn stop_all(&self) -> Result<()> {
        self.with_state(|state| state.registry.stop_all(&mut state.hal))?
    }

    /// Drop every session without hardware teardown (task context)
    pub fn clear(&self) -> Result<()> {
        self.with_state(|state| {
            state.registry.clear();
            state.peers.unbind_all();
        })
    }

    pub fn session_count(&self) -> Result<usize> {
        self.with_state(|state| state.registry.len())
    }

    /// Session bound to `peer`, if any
    pub fn session_of(&self, peer: PeerId) -> Result<Option<u32>> {
        self.with_state(|state| state.peers.session_of(peer))
    }

    pub fn is_connected(&self, peer: PeerId) -> Result<bool> {
        self.with_state(|state| state.peers.get(peer).is_some())
    }

    /// Run `f` on the guarded state from task context
    ///
    /// Deferred disconnects are applied first.
    pub fn with_state<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&mut ChannelState<H, N>) -> R,
    {
        let (result, settled) =
            self.state
                .with_task(&self.time, self.config.lock_timeout_ticks, |state| {
                    let settled = self.settle(state);
                    (f(state), settled)
                })?;
        for (peer, stopped) in settled {
            self.finish_disconnect(peer, stopped);
        }
        Ok(result)
    }

    /// Run `f` on the guarded state from interrupt context
    pub fn with_state_isr<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&mut ChannelState<H, N>) -> R,
    {
        self.state.with_isr(f)
    }
}

/// Drop `peer` and stop its active session
///
/// `None` if the peer was not connected; otherwise the id of the session that
/// was stopped, if any.
fn disconnect_peer<H: UwbHal, const N: usize>(
    state: &mut ChannelState<H, N>,
    peer: PeerId,
) -> Option<Option<u32>> {
    let ChannelState {
        registry,
        hal,
        peers,
    } = state;
    let link = peers.disconnect(peer)?;

    let stopped = link
        .session
        .and_then(|id| registry.find_by_id_mut(id))
        .filter(|session| session.is_active())
        .and_then(|session| match session.stop(hal) {
            Ok(()) => Some(session.id()),
            Err(e) => {
                crate::log_warn!("session {}: stop on disconnect failed: {}", session.id(), e);
                None
            }
        });
    Some(stopped)
}

/// `session_id: u32 LE [, peer address]`
fn configure_and_start<H: UwbHal, L: BleLink, const N: usize>(
    state: &mut ChannelState<H, N>,
    peer: PeerId,
    value: &[u8],
    link: &mut L,
    events: &mut Events,
) -> Result<()> {
    let id = tlv::read_u32_le(value)?;
    let peer_address = match value.get(4..) {
        Some(rest) if !rest.is_empty() => {
            Some(MacAddress::from_slice(rest).ok_or(UwbError::ProtocolDecodeError)?)
        }
        _ => None,
    };

    if state.peers.peer_of(id).is_some_and(|owner| owner != peer) {
        return Err(UwbError::InvalidState);
    }
    if let Some(previous) = state.peers.session_of(peer).filter(|&p| p != id) {
        stop_session(state, peer, previous, link, events)?;
        state.peers.unbind(peer);
    }

    let created = !state.registry.contains(id);
    if created {
        state
            .registry
            .adopt(Session::with_identity(id, SessionType::Ranging))?;
    }
    if let Err(e) = bring_up(state, peer, id, peer_address) {
        if created {
            discard_session(state, id);
        }
        return Err(e);
    }

    crate::log_info!("session {} started for peer {}", id, peer);
    let _ = events.push(Event::SessionStart(peer));
    send(link, peer, &tlv::encode_session_event(Notification::UwbDidStart, id)?);
    Ok(())
}

/// Configure, initialize and start `id`, then bind it to `peer`
fn bring_up<H: UwbHal, const N: usize>(
    state: &mut ChannelState<H, N>,
    peer: PeerId,
    id: u32,
    peer_address: Option<MacAddress>,
) -> Result<()> {
    let ChannelState {
        registry,
        hal,
        peers,
    } = state;
    let session = registry.find_by_id_mut(id).ok_or(UwbError::NotFound)?;
    if session.is_active() {
        return Err(UwbError::InvalidState);
    }
    if session.is_initialized() {
        session.deinitialize(hal)?;
    }

    configure_for_phone(session, peer_address)?;
    session.initialize(hal)?;
    session.start(hal)?;
    peers.bind(peer, id)
}

/// Undo a registration made by a command that then failed
fn discard_session<H: UwbHal, const N: usize>(state: &mut ChannelState<H, N>, id: u32) {
    let Ok(mut session) = state.registry.remove(id) else {
        return;
    };
    state.peers.unbind_session(id);
    if session.is_active() {
        if let Err(e) = session.stop(&mut state.hal) {
            crate::log_warn!("session {}: stop after failed start: {}", id, e);
        }
    }
    if session.is_initialized() {
        if let Err(e) = session.deinitialize(&mut state.hal) {
            crate::log_warn!("session {}: deinit after failed start: {}", id, e);
        }
    }
    crate::log_debug!("session {} discarded", id);
}

/// Accessory side of a phone-initiated session
fn configure_for_phone(session: &mut Session, peer_address: Option<MacAddress>) -> Result<()> {
    session.ranging_params.device_role(DeviceRole::Responder)?;
    session.ranging_params.device_type(DeviceType::Controlee)?;
    session.apply_defaults()?;
    if let Some(address) = peer_address {
        session.app_params.destination_mac_address(address)?;
    }
    Ok(())
}

/// Stop `id` if it is running and tell `peer`
fn stop_session<H: UwbHal, L: BleLink, const N: usize>(
    state: &mut ChannelState<H, N>,
    peer: PeerId,
    id: u32,
    link: &mut L,
    events: &mut Events,
) -> Result<()> {
    let Some(session) = state.registry.find_by_id_mut(id) else {
        crate::log_debug!("session {} already gone", id);
        return Ok(());
    };
    if !session.is_active() {
        return Ok(());
    }
    session.stop(&mut state.hal)?;

    crate::log_info!("session {} stopped by peer {}", id, peer);
    let _ = events.push(Event::SessionStop(peer));
    send(link, peer, &tlv::encode_session_event(Notification::UwbDidStop, id)?);
    Ok(())
}

/// Unregister `id`, stopping and releasing its hardware session first
///
/// A failed teardown leaves the session registered so the command can be
/// retried.
fn delete_session<H: UwbHal, L: BleLink, const N: usize>(
    state: &mut ChannelState<H, N>,
    peer: PeerId,
    id: u32,
    link: &mut L,
    events: &mut Events,
) -> Result<()> {
    let owner = state.peers.peer_of(id).unwrap_or(peer);
    let session = state
        .registry
        .find_by_id_mut(id)
        .ok_or(UwbError::NotFound)?;

    if session.is_active() {
        session.stop(&mut state.hal)?;
        let _ = events.push(Event::SessionStop(owner));
        send(link, owner, &tlv::encode_session_event(Notification::UwbDidStop, id)?);
    }
    if session.is_initialized() {
        session.deinitialize(&mut state.hal)?;
    }

    state.registry.remove(id)?;
    state.peers.unbind_session(id);
    crate::log_info!("session {} deleted", id);
    Ok(())
}

fn fire(callback: Option<PeerCallback>, peer: PeerId) {
    if let Some(callback) = callback {
        callback(peer);
    }
}

fn send<L: BleLink>(link: &mut L, peer: PeerId, msg: &[u8]) {
    if let Err(e) = link.notify(peer, msg) {
        crate::log_warn!("peer {}: notify failed: {}", peer, e);
    }
}

fn reply_error<L: BleLink>(link: &mut L, peer: PeerId, request: u8, error: UwbError) {
    if let Ok(msg) = tlv::encode_error(request, error) {
        send(link, peer, &msg);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::traits::MockTime;
    use crate::platform::mock::{MockBleLink, MockUwbHal, UwbOp};
    use crate::session::config::AppConfigId;
    use core::sync::atomic::{AtomicUsize, Ordering};

    const PHONE: PeerId = PeerId([1, 2, 3, 4, 5, 6]);
    const OTHER: PeerId = PeerId([9; 6]);
    const BLOB: [u8; 4] = [0xDE, 0xAD, 0xBE, 0xEF];

    type Channel = ControlChannel<MockUwbHal, MockTime>;

    fn channel() -> Channel {
        let config = NearbyConfig::default().with_accessory_config(&BLOB).unwrap();
        ControlChannel::new(MockUwbHal::new(), MockTime::new(), config)
    }

    fn start_cmd(id: u32) -> std::vec::Vec<u8> {
        let mut cmd = vec![0x0B, 4];
        cmd.extend_from_slice(&id.to_le_bytes());
        cmd
    }

    fn started(channel: &Channel, link: &mut MockBleLink, id: u32) {
        channel.handle_connect(PHONE).unwrap();
        channel.handle_write(PHONE, &start_cmd(id), link).unwrap();
    }

    fn is_active(channel: &Channel, id: u32) -> bool {
        channel.with_session(id, |s, _| s.is_active()).unwrap()
    }

    #[test]
    fn test_begin_publishes_accessory_config() {
        let channel = channel();
        let mut link = MockBleLink::new();
        channel.begin(&mut link).unwrap();
        assert_eq!(link.accessory_config(), &BLOB);
    }

    #[test]
    fn test_initialize_replies_with_config_data() {
        let channel = channel();
        let mut link = MockBleLink::new();
        channel.handle_connect(PHONE).unwrap();

        channel.handle_write(PHONE, &[0x0A, 0x00], &mut link).unwrap();

        assert_eq!(
            link.notifications_to(PHONE),
            [&[0x01, 0x04, 0xDE, 0xAD, 0xBE, 0xEF][..]]
        );
    }

    #[test]
    fn test_configure_and_start() {
        static STARTS: AtomicUsize = AtomicUsize::new(0);
        fn on_start(peer: PeerId) {
            assert_eq!(peer, PHONE);
            STARTS.fetch_add(1, Ordering::SeqCst);
        }

        let mut channel = channel();
        channel.on_session_start(on_start);
        let mut link = MockBleLink::new();

        started(&channel, &mut link, 0x1234);

        assert!(is_active(&channel, 0x1234));
        assert_eq!(channel.session_of(PHONE), Ok(Some(0x1234)));
        assert_eq!(STARTS.load(Ordering::SeqCst), 1);
        assert_eq!(
            link.notifications_to(PHONE),
            [&[0x02, 0x04, 0x34, 0x12, 0x00, 0x00][..]]
        );
        let (inits, starts) = channel
            .with_state(|s| (s.hal.count(UwbOp::SessionInit), s.hal.count(UwbOp::StartRanging)))
            .unwrap();
        assert_eq!((inits, starts), (1, 1));
    }

    #[test]
    fn test_configure_with_peer_address() {
        let channel = channel();
        let mut link = MockBleLink::new();
        channel.handle_connect(PHONE).unwrap();

        let mut cmd = vec![0x0B, 6];
        cmd.extend_from_slice(&7u32.to_le_bytes());
        cmd.extend_from_slice(&[0xAB, 0xCD]);
        channel.handle_write(PHONE, &cmd, &mut link).unwrap();

        let address = channel
            .with_session(7, |s, _| {
                s.app_params
                    .get(AppConfigId::PeerAddress)
                    .and_then(|e| e.value.as_bytes().map(|b| b.to_vec()))
            })
            .unwrap();
        assert_eq!(address, Some(vec![0xAB, 0xCD]));
    }

    #[test]
    fn test_configure_with_bad_address_length() {
        let channel = channel();
        let mut link = MockBleLink::new();
        channel.handle_connect(PHONE).unwrap();

        let mut cmd = vec![0x0B, 7];
        cmd.extend_from_slice(&7u32.to_le_bytes());
        cmd.extend_from_slice(&[1, 2, 3]);

        assert_eq!(
            channel.handle_write(PHONE, &cmd, &mut link),
            Err(UwbError::ProtocolDecodeError)
        );
        assert_eq!(channel.session_count(), Ok(0));
        assert_eq!(
            link.notifications_to(PHONE),
            [&[0x7F, 0x02, 0x0B, UwbError::ProtocolDecodeError.code()][..]]
        );
    }

    #[test]
    fn test_start_failure_reports_error() {
        static STARTS: AtomicUsize = AtomicUsize::new(0);
        fn on_start(_: PeerId) {
            STARTS.fetch_add(1, Ordering::SeqCst);
        }

        let mut channel = channel();
        channel.on_session_start(on_start);
        channel
            .with_state(|s| s.hal.fail_on(UwbOp::StartRanging, UwbError::InvalidState))
            .unwrap();
        let mut link = MockBleLink::new();
        channel.handle_connect(PHONE).unwrap();

        assert_eq!(
            channel.handle_write(PHONE, &start_cmd(3), &mut link),
            Err(UwbError::InvalidState)
        );
        assert_eq!(STARTS.load(Ordering::SeqCst), 0);
        assert_eq!(channel.session_of(PHONE), Ok(None));
        assert_eq!(channel.session_count(), Ok(0));
        assert_eq!(channel.with_state(|s| s.hal.live_sessions()), Ok(0));
        assert!(channel.is_connected(PHONE).unwrap());
        assert_eq!(
            link.notifications_to(PHONE),
            [&[0x7F, 0x02, 0x0B, UwbError::InvalidState.code()][..]]
        );
    }

    #[test]
    fn test_stop_command() {
        static STOPS: AtomicUsize = AtomicUsize::new(0);
        fn on_stop(_: PeerId) {
            STOPS.fetch_add(1, Ordering::SeqCst);
        }

        let mut channel = channel();
        channel.on_session_stop(on_stop);
        let mut link = MockBleLink::new();
        started(&channel, &mut link, 5);
        link.clear_notifications();

        channel.handle_write(PHONE, &[0x0C, 0x00], &mut link).unwrap();

        assert!(!is_active(&channel, 5));
        assert_eq!(channel.session_of(PHONE), Ok(None));
        assert_eq!(channel.session_count(), Ok(1));
        assert_eq!(STOPS.load(Ordering::SeqCst), 1);
        assert_eq!(
            link.notifications_to(PHONE),
            [&[0x03, 0x04, 0x05, 0x00, 0x00, 0x00][..]]
        );

        assert_eq!(
            channel.handle_write(PHONE, &[0x0C, 0x00], &mut link),
            Err(UwbError::NotFound)
        );
    }

    #[test]
    fn test_disconnect_stops_session_and_keeps_it_registered() {
        static STOPS: AtomicUsize = AtomicUsize::new(0);
        static GONE: AtomicUsize = AtomicUsize::new(0);
        fn on_stop(_: PeerId) {
            STOPS.fetch_add(1, Ordering::SeqCst);
        }
        fn on_disconnect(_: PeerId) {
            GONE.fetch_add(1, Ordering::SeqCst);
        }

        let mut channel = channel();
        channel.on_session_stop(on_stop);
        channel.on_disconnect(on_disconnect);
        let mut link = MockBleLink::new();
        started(&channel, &mut link, 8);

        channel.handle_disconnect(PHONE).unwrap();

        assert!(!channel.is_connected(PHONE).unwrap());
        assert!(!is_active(&channel, 8));
        assert_eq!(channel.session_count(), Ok(1));
        assert_eq!(STOPS.load(Ordering::SeqCst), 1);
        assert_eq!(GONE.load(Ordering::SeqCst), 1);

        assert_eq!(channel.handle_disconnect(PHONE), Err(UwbError::NotFound));
        assert_eq!(GONE.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_restart_after_reconnect_reinitializes() {
        let channel = channel();
        let mut link = MockBleLink::new();
        started(&channel, &mut link, 8);
        channel.handle_disconnect(PHONE).unwrap();

        started(&channel, &mut link, 8);

        assert!(is_active(&channel, 8));
        let (deinits, live) = channel
            .with_state(|s| (s.hal.count(UwbOp::SessionDeinit), s.hal.live_sessions()))
            .unwrap();
        assert_eq!((deinits, live), (1, 1));
    }

    #[test]
    fn test_session_owned_by_other_peer() {
        let channel = channel();
        let mut link = MockBleLink::new();
        started(&channel, &mut link, 1);
        channel.handle_connect(OTHER).unwrap();

        assert_eq!(
            channel.handle_write(OTHER, &start_cmd(1), &mut link),
            Err(UwbError::InvalidState)
        );
        assert_eq!(channel.session_of(PHONE), Ok(Some(1)));
    }

    #[test]
    fn test_switching_session_stops_previous() {
        let channel = channel();
        let mut link = MockBleLink::new();
        started(&channel, &mut link, 1);

        channel.handle_write(PHONE, &start_cmd(2), &mut link).unwrap();

        assert!(!is_active(&channel, 1));
        assert!(is_active(&channel, 2));
        assert_eq!(channel.session_of(PHONE), Ok(Some(2)));
    }

    #[test]
    fn test_delete_bound_session() {
        let channel = channel();
        let mut link = MockBleLink::new();
        started(&channel, &mut link, 4);
        link.clear_notifications();

        channel.handle_write(PHONE, &[0x0D, 0x00], &mut link).unwrap();

        assert_eq!(channel.session_count(), Ok(0));
        assert_eq!(channel.session_of(PHONE), Ok(None));
        assert_eq!(channel.with_state(|s| s.hal.live_sessions()), Ok(0));
        assert_eq!(
            link.notifications_to(PHONE),
            [&[0x03, 0x04, 0x04, 0x00, 0x00, 0x00][..]]
        );
    }

    #[test]
    fn test_delete_by_id() {
        let channel = channel();
        let mut link = MockBleLink::new();
        channel.add_session(&Session::with_identity(11, SessionType::Ranging)).unwrap();
        channel.handle_connect(PHONE).unwrap();

        let mut cmd = vec![0x0D, 4];
        cmd.extend_from_slice(&11u32.to_le_bytes());
        channel.handle_write(PHONE, &cmd, &mut link).unwrap();
        assert_eq!(channel.session_count(), Ok(0));

        assert_eq!(
            channel.handle_write(PHONE, &cmd, &mut link),
            Err(UwbError::NotFound)
        );
    }

    #[test]
    fn test_unknown_tags_are_skipped() {
        let channel = channel();
        let mut link = MockBleLink::new();
        channel.handle_connect(PHONE).unwrap();

        channel
            .handle_write(PHONE, &[0x42, 0x01, 0xFF, 0x0A, 0x00], &mut link)
            .unwrap();

        assert_eq!(link.notifications_to(PHONE).len(), 1);
        assert_eq!(link.notifications_to(PHONE)[0][0], 0x01);
    }

    #[test]
    fn test_malformed_record_keeps_earlier_records() {
        let channel = channel();
        let mut link = MockBleLink::new();
        channel.handle_connect(PHONE).unwrap();

        assert_eq!(
            channel.handle_write(PHONE, &[0x0A, 0x00, 0x0B, 0x09, 0x01], &mut link),
            Err(UwbError::ProtocolDecodeError)
        );

        let sent = link.notifications_to(PHONE);
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0][0], 0x01);
        assert_eq!(sent[1], &[0x7F, 0x02, 0x00, UwbError::ProtocolDecodeError.code()]);
        assert_eq!(channel.session_count(), Ok(0));
        assert!(channel.is_connected(PHONE).unwrap());
    }

    #[test]
    fn test_oversized_write_rejected() {
        let channel = channel();
        let mut link = MockBleLink::new();
        channel.handle_connect(PHONE).unwrap();
        let data = [0u8; MAX_CHARACTERISTIC_LEN + 1];

        assert_eq!(
            channel.handle_write(PHONE, &data, &mut link),
            Err(UwbError::ProtocolDecodeError)
        );
    }

    #[test]
    fn test_write_from_unknown_peer() {
        let channel = channel();
        let mut link = MockBleLink::new();

        assert_eq!(
            channel.handle_write(OTHER, &[0x0A, 0x00], &mut link),
            Err(UwbError::NotFound)
        );
        assert_eq!(
            link.notifications_to(OTHER),
            [&[0x7F, 0x02, 0x0A, UwbError::NotFound.code()][..]]
        );
    }

    #[test]
    fn test_write_while_locked_times_out_and_keeps_connection() {
        let channel = channel();
        let mut link = MockBleLink::new();
        channel.handle_connect(PHONE).unwrap();

        let status = channel
            .with_state(|_| channel.handle_write(PHONE, &start_cmd(1), &mut link))
            .unwrap();

        assert_eq!(status, Err(UwbError::LockTimeout));
        assert_eq!(
            link.notifications_to(PHONE),
            [&[0x7F, 0x02, 0x0B, UwbError::LockTimeout.code()][..]]
        );
        assert!(channel.is_connected(PHONE).unwrap());

        // Resend succeeds once the lock is free
        channel.handle_write(PHONE, &start_cmd(1), &mut link).unwrap();
    }

    #[test]
    fn test_connect_while_locked_fails_immediately() {
        let channel = channel();
        let status = channel
            .with_state(|_| channel.handle_connect(PHONE))
            .unwrap();
        assert_eq!(status, Err(UwbError::LockTimeout));
        assert!(!channel.is_connected(PHONE).unwrap());
    }

    #[test]
    fn test_connect_beyond_capacity_is_ignored() {
        let channel = channel();
        for i in 0..crate::config::MAX_PEERS as u8 {
            channel.handle_connect(PeerId([i; 6])).unwrap();
        }
        assert_eq!(
            channel.handle_connect(PeerId([0xEE; 6])),
            Err(UwbError::CapacityExceeded)
        );
        assert!(!channel.is_connected(PeerId([0xEE; 6])).unwrap());
    }

    #[test]
    fn test_last_callback_registration_wins() {
        static FIRST: AtomicUsize = AtomicUsize::new(0);
        static SECOND: AtomicUsize = AtomicUsize::new(0);
        fn first(_: PeerId) {
            FIRST.fetch_add(1, Ordering::SeqCst);
        }
        fn second(_: PeerId) {
            SECOND.fetch_add(1, Ordering::SeqCst);
        }

        let mut channel = channel();
        channel.on_connect(first);
        channel.on_connect(second);
        channel.handle_connect(PHONE).unwrap();

        assert_eq!(FIRST.load(Ordering::SeqCst), 0);
        assert_eq!(SECOND.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_local_session_api() {
        let channel = channel();
        for id in 1..=3 {
            channel.add_session(&Session::with_identity(id, SessionType::Ranging)).unwrap();
            channel
                .with_session(id, |s, hal| s.initialize(hal))
                .unwrap()
                .unwrap();
        }
        assert_eq!(
            channel.add_session(&Session::with_identity(2, SessionType::Ranging)),
            Err(UwbError::DuplicateSession)
        );

        channel.start_all().unwrap();
        assert!((1..=3).all(|id| is_active(&channel, id)));
        channel.stop_all().unwrap();
        assert!((1..=3).all(|id| !is_active(&channel, id)));

        assert_eq!(channel.remove_session(2).map(|s| s.id()), Ok(2));
        assert!(matches!(channel.with_session(2, |_, _| ()), Err(UwbError::NotFound)));

        // Neither remove nor clear releases hardware sessions
        channel.clear().unwrap();
        assert_eq!(channel.session_count(), Ok(0));
        assert_eq!(channel.with_state(|s| s.hal.live_sessions()), Ok(3));
    }

    #[test]
    fn test_stop_on_stopped_session_releases_peer() {
        static STOPS: AtomicUsize = AtomicUsize::new(0);
        fn on_stop(_: PeerId) {
            STOPS.fetch_add(1, Ordering::SeqCst);
        }

        let mut channel = channel();
        channel.on_session_stop(on_stop);
        let mut link = MockBleLink::new();
        started(&channel, &mut link, 5);
        channel.stop_all().unwrap();
        link.clear_notifications();

        channel.handle_write(PHONE, &[0x0C, 0x00], &mut link).unwrap();

        assert_eq!(channel.session_of(PHONE), Ok(None));
        assert_eq!(channel.session_count(), Ok(1));
        assert_eq!(STOPS.load(Ordering::SeqCst), 0);
        assert!(link.notifications_to(PHONE).is_empty());
        assert_eq!(channel.with_state(|s| s.hal.count(UwbOp::StopRanging)), Ok(1));
    }

    #[test]
    fn test_stop_failure_still_releases_peer() {
        let channel = channel();
        let mut link = MockBleLink::new();
        started(&channel, &mut link, 5);
        channel
            .with_state(|s| s.hal.fail_on(UwbOp::StopRanging, UwbError::Hardware(0x21)))
            .unwrap();
        link.clear_notifications();

        assert_eq!(
            channel.handle_write(PHONE, &[0x0C, 0x00], &mut link),
            Err(UwbError::Hardware(0x21))
        );
        assert_eq!(channel.session_of(PHONE), Ok(None));
        assert!(is_active(&channel, 5));
        assert_eq!(
            link.notifications_to(PHONE),
            [&[0x7F, 0x02, 0x0C, UwbError::Hardware(0x21).code()][..]]
        );
    }

    #[test]
    fn test_delete_keeps_session_when_deinit_fails() {
        let channel = channel();
        let mut link = MockBleLink::new();
        started(&channel, &mut link, 4);
        channel
            .with_state(|s| s.hal.fail_on(UwbOp::SessionDeinit, UwbError::Hardware(0x42)))
            .unwrap();

        assert_eq!(
            channel.handle_write(PHONE, &[0x0D, 0x00], &mut link),
            Err(UwbError::Hardware(0x42))
        );
        assert_eq!(channel.session_count(), Ok(1));
        assert_eq!(channel.session_of(PHONE), Ok(Some(4)));
        assert!(channel.with_session(4, |s, _| s.is_initialized()).unwrap());
        assert_eq!(channel.with_state(|s| s.hal.live_sessions()), Ok(1));

        // Retry once the radio recovers
        channel.with_state(|s| s.hal.clear_failures()).unwrap();
        channel.handle_write(PHONE, &[0x0D, 0x00], &mut link).unwrap();
        assert_eq!(channel.session_count(), Ok(0));
        assert_eq!(channel.session_of(PHONE), Ok(None));
        assert_eq!(channel.with_state(|s| s.hal.live_sessions()), Ok(0));
    }

    #[test]
    fn test_failed_start_does_not_leave_sessions_behind() {
        let channel = channel();
        let mut link = MockBleLink::new();
        channel.handle_connect(PHONE).unwrap();
        channel
            .with_state(|s| s.hal.fail_on(UwbOp::SessionInit, UwbError::HardwareInitFailure))
            .unwrap();

        for id in 1..=(MAX_SESSIONS as u32 + 1) {
            assert_eq!(
                channel.handle_write(PHONE, &start_cmd(id), &mut link),
                Err(UwbError::HardwareInitFailure)
            );
        }
        assert_eq!(channel.session_count(), Ok(0));
        assert_eq!(channel.session_of(PHONE), Ok(None));
    }

    #[test]
    fn test_failed_start_keeps_existing_session() {
        let channel = channel();
        let mut link = MockBleLink::new();
        channel.add_session(&Session::with_identity(6, SessionType::Ranging)).unwrap();
        channel.handle_connect(PHONE).unwrap();
        channel
            .with_state(|s| s.hal.fail_on(UwbOp::SessionInit, UwbError::HardwareInitFailure))
            .unwrap();

        assert_eq!(
            channel.handle_write(PHONE, &start_cmd(6), &mut link),
            Err(UwbError::HardwareInitFailure)
        );
        assert_eq!(channel.session_count(), Ok(1));
    }

    #[test]
    fn test_disconnect_while_locked_is_applied_later() {
        static STOPS: AtomicUsize = AtomicUsize::new(0);
        static GONE: AtomicUsize = AtomicUsize::new(0);
        fn on_stop(_: PeerId) {
            STOPS.fetch_add(1, Ordering::SeqCst);
        }
        fn on_disconnect(_: PeerId) {
            GONE.fetch_add(1, Ordering::SeqCst);
        }

        let mut channel = channel();
        channel.on_session_stop(on_stop);
        channel.on_disconnect(on_disconnect);
        let mut link = MockBleLink::new();
        started(&channel, &mut link, 8);

        let status = channel
            .with_state(|_| channel.handle_disconnect(PHONE))
            .unwrap();
        assert_eq!(status, Err(UwbError::LockTimeout));
        assert_eq!(GONE.load(Ordering::SeqCst), 0);

        // The next task-context access applies it
        assert!(!channel.is_connected(PHONE).unwrap());
        assert!(!is_active(&channel, 8));
        assert_eq!(STOPS.load(Ordering::SeqCst), 1);
        assert_eq!(GONE.load(Ordering::SeqCst), 1);
        assert_eq!(channel.with_state(|s| s.peers.len()), Ok(0));
    }

    #[test]
    fn test_reconnect_cancels_deferred_disconnect() {
        let channel = channel();
        let mut link = MockBleLink::new();
        started(&channel, &mut link, 8);

        channel
            .with_state(|_| channel.handle_disconnect(PHONE))
            .unwrap()
            .unwrap_err();
        channel.handle_connect(PHONE).unwrap();

        assert!(channel.is_connected(PHONE).unwrap());
        assert_eq!(channel.session_of(PHONE), Ok(Some(8)));
        assert!(is_active(&channel, 8));
    }

    #[test]
    fn test_nearby_layout_exposed() {
        let channel = channel();
        assert_eq!(channel.layout(), &GattLayout::nearby());
        assert_eq!(channel.config().accessory_config.as_slice(), &BLOB);
    }
}
