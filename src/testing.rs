//! Host-side fakes for the ports
//!
//! Every fake shares its state through an `Rc` so a test can keep a handle
//! after moving the fake into a service. Calls that matter for ordering are
//! appended to a common [`EventLog`].

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::net::Ipv4Addr;
use std::rc::Rc;
use std::string::{String, ToString};
use std::vec::Vec;

use embedded_hal_async::delay::DelayNs;

use crate::config::{BrokerSettings, WifiCredentials};
use crate::domain::SpectralCounts;
use crate::ports::{
    BrokerError, BrokerPort, Clock, LinkError, LinkStatus, SpectralSensorConfig,
    SpectralSensorError, SpectralSensorPort, UpdateError, UpdatePort, WifiPort,
};

pub type EventLog = Rc<RefCell<Vec<&'static str>>>;

pub fn event_log() -> EventLog {
    Rc::new(RefCell::new(Vec::new()))
}

/// Counts that give a PPFD of exactly 0.8 with the default factors
pub const REFERENCE_COUNTS: [u16; 10] = [10, 12, 15, 18, 20, 19, 17, 14, 500, 80];

// ============================================================================
// Time
// ============================================================================

#[derive(Clone, Default)]
pub struct FakeClock {
    now: Rc<Cell<u32>>,
    unix: Rc<Cell<Option<u64>>>,
}

impl FakeClock {
    pub fn starting_at(ms: u32) -> Self {
        let clock = Self::default();
        clock.now.set(ms);
        clock
    }

    pub fn advance(&self, ms: u32) {
        self.now.set(self.now.get().wrapping_add(ms));
    }

    pub fn set_unix(&self, secs: Option<u64>) {
        self.unix.set(secs);
    }
}

impl Clock for FakeClock {
    fn uptime_ms(&self) -> u32 {
        self.now.get()
    }

    fn unix_time(&self) -> Option<u64> {
        self.unix.get()
    }
}

/// Delay that completes instantly and moves the fake clock forward
pub struct FakeDelay {
    clock: FakeClock,
    pub total_ms: Rc<Cell<u64>>,
}

impl FakeDelay {
    pub fn new(clock: &FakeClock) -> Self {
        Self {
            clock: clock.clone(),
            total_ms: Rc::new(Cell::new(0)),
        }
    }

    fn sleep(&mut self, ms: u32) {
        self.clock.advance(ms);
        self.total_ms.set(self.total_ms.get() + ms as u64);
    }
}

impl DelayNs for FakeDelay {
    async fn delay_ns(&mut self, ns: u32) {
        self.sleep(ns / 1_000_000);
    }

    async fn delay_us(&mut self, us: u32) {
        self.sleep(us / 1_000);
    }

    async fn delay_ms(&mut self, ms: u32) {
        self.sleep(ms);
    }
}

// ============================================================================
// Sensor
// ============================================================================

#[derive(Default)]
pub struct SensorState {
    /// Results handed out in order; once empty, reads succeed with `REFERENCE_COUNTS`
    pub script: VecDeque<Result<SpectralCounts, SpectralSensorError>>,
    pub reads: u32,
    pub configured: Option<SpectralSensorConfig>,
}

#[derive(Clone)]
pub struct MockSensor {
    pub state: Rc<RefCell<SensorState>>,
    log: EventLog,
}

impl MockSensor {
    pub fn new(log: &EventLog) -> Self {
        Self {
            state: Rc::default(),
            log: log.clone(),
        }
    }

    pub fn push(&self, result: Result<SpectralCounts, SpectralSensorError>) {
        self.state.borrow_mut().script.push_back(result);
    }

    pub fn reads(&self) -> u32 {
        self.state.borrow().reads
    }
}

impl SpectralSensorPort for MockSensor {
    async fn read_all_channels(&mut self) -> Result<SpectralCounts, SpectralSensorError> {
        self.log.borrow_mut().push("sensor.read");
        let mut state = self.state.borrow_mut();
        state.reads += 1;
        state
            .script
            .pop_front()
            .unwrap_or(Ok(SpectralCounts::from_array(REFERENCE_COUNTS)))
    }

    async fn configure(&mut self, config: SpectralSensorConfig) -> Result<(), SpectralSensorError> {
        self.state.borrow_mut().configured = Some(config);
        Ok(())
    }

    fn is_ready(&self) -> bool {
        true
    }
}

// ============================================================================
// Wi-Fi
// ============================================================================

pub struct WifiState {
    pub up: bool,
    /// Status polls after `begin` before the link reports up; `None` never connects
    pub polls_to_connect: Option<u32>,
    pending_polls: Option<u32>,
    /// Join requests that are accepted but never lead to a link
    pub ignored_begins: u32,
    pub begin_result: Result<(), LinkError>,
    pub begins: u32,
    pub disconnects: u32,
    pub status_polls: u32,
    pub last_ssid: Option<&'static str>,
}

impl Default for WifiState {
    fn default() -> Self {
        Self {
            up: false,
            polls_to_connect: Some(0),
            pending_polls: None,
            ignored_begins: 0,
            begin_result: Ok(()),
            begins: 0,
            disconnects: 0,
            status_polls: 0,
            last_ssid: None,
        }
    }
}

#[derive(Clone)]
pub struct MockWifi {
    pub state: Rc<RefCell<WifiState>>,
    log: EventLog,
}

impl MockWifi {
    pub fn new(log: &EventLog) -> Self {
        Self {
            state: Rc::default(),
            log: log.clone(),
        }
    }

    /// Start with the link already associated
    pub fn connected(log: &EventLog) -> Self {
        let wifi = Self::new(log);
        wifi.state.borrow_mut().up = true;
        wifi
    }

    pub fn drop_link(&self) {
        let mut state = self.state.borrow_mut();
        state.up = false;
        state.pending_polls = None;
    }

    /// Radio operations (begin + disconnect) issued so far
    pub fn radio_ops(&self) -> u32 {
        let state = self.state.borrow();
        state.begins + state.disconnects
    }
}

impl WifiPort for MockWifi {
    async fn begin(&mut self, credentials: &WifiCredentials) -> Result<(), LinkError> {
        self.log.borrow_mut().push("wifi.begin");
        let mut state = self.state.borrow_mut();
        state.begins += 1;
        state.last_ssid = Some(credentials.ssid);
        if state.ignored_begins > 0 {
            state.ignored_begins -= 1;
        } else if state.begin_result.is_ok() {
            state.pending_polls = state.polls_to_connect;
        }
        state.begin_result
    }

    async fn disconnect(&mut self) {
        self.log.borrow_mut().push("wifi.disconnect");
        let mut state = self.state.borrow_mut();
        state.disconnects += 1;
        state.up = false;
        state.pending_polls = None;
    }

    fn status(&mut self) -> LinkStatus {
        let mut state = self.state.borrow_mut();
        state.status_polls += 1;
        if state.up {
            return LinkStatus::Connected;
        }
        match state.pending_polls {
            Some(0) => {
                state.up = true;
                state.pending_polls = None;
                LinkStatus::Connected
            }
            Some(n) => {
                state.pending_polls = Some(n - 1);
                LinkStatus::Pending
            }
            None => LinkStatus::Disconnected,
        }
    }

    fn local_address(&self) -> Option<Ipv4Addr> {
        self.state
            .borrow()
            .up
            .then_some(Ipv4Addr::new(192, 168, 1, 42))
    }
}

// ============================================================================
// Broker
// ============================================================================

pub struct BrokerState {
    pub connected: bool,
    /// Results for successive connect attempts; once empty, connects succeed
    pub connect_script: VecDeque<Result<(), BrokerError>>,
    pub poll_result: Result<(), BrokerError>,
    pub publish_result: Result<(), BrokerError>,
    pub connects: u32,
    pub polls: u32,
    pub published: Vec<(String, Vec<u8>)>,
}

impl Default for BrokerState {
    fn default() -> Self {
        Self {
            connected: false,
            connect_script: VecDeque::new(),
            poll_result: Ok(()),
            publish_result: Ok(()),
            connects: 0,
            polls: 0,
            published: Vec::new(),
        }
    }
}

#[derive(Clone)]
pub struct MockBroker {
    pub state: Rc<RefCell<BrokerState>>,
    log: EventLog,
}

impl MockBroker {
    pub fn new(log: &EventLog) -> Self {
        Self {
            state: Rc::default(),
            log: log.clone(),
        }
    }

    pub fn connects(&self) -> u32 {
        self.state.borrow().connects
    }

    pub fn published(&self) -> Vec<(String, Vec<u8>)> {
        self.state.borrow().published.clone()
    }
}

impl BrokerPort for MockBroker {
    async fn connect(&mut self, _settings: &BrokerSettings) -> Result<(), BrokerError> {
        self.log.borrow_mut().push("broker.connect");
        let mut state = self.state.borrow_mut();
        state.connects += 1;
        let result = state.connect_script.pop_front().unwrap_or(Ok(()));
        state.connected = result.is_ok();
        result
    }

    fn is_connected(&self) -> bool {
        self.state.borrow().connected
    }

    async fn poll(&mut self) -> Result<(), BrokerError> {
        self.log.borrow_mut().push("broker.poll");
        let mut state = self.state.borrow_mut();
        state.polls += 1;
        if state.poll_result.is_err() {
            state.connected = false;
        }
        state.poll_result
    }

    async fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), BrokerError> {
        self.log.borrow_mut().push("broker.publish");
        let mut state = self.state.borrow_mut();
        state.published.push((topic.to_string(), payload.to_vec()));
        state.publish_result
    }
}

// ============================================================================
// Update listener
// ============================================================================

#[derive(Clone)]
pub struct MockUpdate {
    pub handled: Rc<Cell<u32>>,
    pub result: Result<(), UpdateError>,
    log: EventLog,
}

impl MockUpdate {
    pub fn new(log: &EventLog) -> Self {
        Self {
            handled: Rc::default(),
            result: Ok(()),
            log: log.clone(),
        }
    }
}

impl UpdatePort for MockUpdate {
    async fn handle(&mut self) -> Result<(), UpdateError> {
        self.log.borrow_mut().push("update.handle");
        self.handled.set(self.handled.get() + 1);
        self.result
    }
}
