//! Link manager - keeps the station associated
//!
//! Two entry points: [`LinkManager::bring_up`] blocks at boot until the
//! network is reachable, [`LinkManager::ensure_connected`] repairs a lost
//! link from the scheduler with a bounded wait.

use core::net::Ipv4Addr;

use embedded_hal_async::delay::DelayNs;

use crate::config::{TimingConfig, WifiCredentials};
use crate::ports::{period_elapsed, Clock, LinkError, LinkStatus, WifiPort};

/// Connection state owned by the link manager
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkState {
    Disconnected,
    Connecting,
    Connected,
}

pub struct LinkManager<W> {
    wifi: W,
    credentials: WifiCredentials,
    state: LinkState,
    timeout_ms: u32,
    poll_ms: u32,
    boot_poll_ms: u32,
    /// Successful re-joins since boot; each one invalidates open sockets
    rejoins: u32,
}

impl<W: WifiPort> LinkManager<W> {
    pub fn new(wifi: W, credentials: WifiCredentials, timing: &TimingConfig) -> Self {
        Self {
            wifi,
            credentials,
            state: LinkState::Disconnected,
            timeout_ms: timing.link_timeout_ms,
            poll_ms: timing.link_poll_ms,
            boot_poll_ms: timing.boot_poll_ms,
            rejoins: 0,
        }
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    /// Number of times [`ensure_connected`](Self::ensure_connected) re-joined
    /// the network
    pub fn rejoins(&self) -> u32 {
        self.rejoins
    }

    pub fn local_address(&self) -> Option<Ipv4Addr> {
        self.wifi.local_address()
    }

    /// Refresh the state from the radio and report whether the link is up
    pub fn is_connected(&mut self) -> bool {
        let up = self.wifi.status() == LinkStatus::Connected;
        match (self.state, up) {
            (LinkState::Connected, false) => {
                warn!("Wi-Fi link lost");
                self.state = LinkState::Disconnected;
            }
            (LinkState::Connected, true) => {}
            (_, true) => self.state = LinkState::Connected,
            (_, false) => {}
        }
        up
    }

    /// Join the network at boot, waiting as long as it takes
    ///
    /// The join request is re-issued after every timeout window that ends
    /// without a link.
    pub async fn bring_up<C: Clock, D: DelayNs>(&mut self, clock: &C, delay: &mut D) {
        info!("Connecting to Wi-Fi network {}", self.credentials.ssid);

        loop {
            self.state = LinkState::Connecting;
            if let Err(e) = self.wifi.begin(&self.credentials).await {
                warn!("Wi-Fi join request failed: {:?}", e);
            }

            let started = clock.uptime_ms();
            while !period_elapsed(started, clock.uptime_ms(), self.timeout_ms) {
                if self.wifi.status() == LinkStatus::Connected {
                    self.state = LinkState::Connected;
                    info!("Wi-Fi connected");
                    self.log_address();
                    return;
                }
                debug!("Waiting for Wi-Fi...");
                delay.delay_ms(self.boot_poll_ms).await;
            }

            warn!("Wi-Fi not up after {} ms, retrying join", self.timeout_ms);
        }
    }

    /// Make sure the link is up, reconnecting with a bounded wait if not
    ///
    /// Returns immediately without touching the radio when already
    /// connected. Otherwise drops the stale association, re-joins and polls
    /// until the link is up or the timeout passes. No retry on failure; the
    /// next call starts a fresh attempt.
    pub async fn ensure_connected<C: Clock, D: DelayNs>(
        &mut self,
        clock: &C,
        delay: &mut D,
    ) -> Result<(), LinkError> {
        if self.is_connected() {
            return Ok(());
        }

        warn!("Wi-Fi disconnected, reconnecting");
        self.state = LinkState::Connecting;
        self.wifi.disconnect().await;

        if let Err(e) = self.wifi.begin(&self.credentials).await {
            warn!("Wi-Fi join request failed: {:?}", e);
            self.state = LinkState::Disconnected;
            return Err(e);
        }

        let started = clock.uptime_ms();
        loop {
            if self.wifi.status() == LinkStatus::Connected {
                self.state = LinkState::Connected;
                self.rejoins = self.rejoins.wrapping_add(1);
                info!("Wi-Fi reconnected");
                self.log_address();
                return Ok(());
            }
            if period_elapsed(started, clock.uptime_ms(), self.timeout_ms) {
                self.state = LinkState::Disconnected;
                warn!("Wi-Fi reconnect timed out after {} ms", self.timeout_ms);
                return Err(LinkError::Timeout);
            }
            delay.delay_ms(self.poll_ms).await;
        }
    }

    fn log_address(&self) {
        match self.wifi.local_address() {
            Some(ip) => {
                let [a, b, c, d] = ip.octets();
                info!("IP address: {}.{}.{}.{}", a, b, c, d);
            }
            None => warn!("Link up but no IPv4 address yet"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{event_log, FakeClock, FakeDelay, MockWifi};
    use embassy_futures::block_on;

    const CREDS: WifiCredentials = WifiCredentials {
        ssid: "greenhouse",
        password: "hunter22",
    };

    fn manager(wifi: &MockWifi) -> LinkManager<MockWifi> {
        LinkManager::new(wifi.clone(), CREDS, &TimingConfig::standard())
    }

    #[test]
    fn test_connected_link_needs_no_radio_ops() {
        let log = event_log();
        let wifi = MockWifi::connected(&log);
        let mut link = manager(&wifi);
        let clock = FakeClock::starting_at(0);
        let mut delay = FakeDelay::new(&clock);

        assert_eq!(block_on(link.ensure_connected(&clock, &mut delay)), Ok(()));
        assert_eq!(block_on(link.ensure_connected(&clock, &mut delay)), Ok(()));

        assert_eq!(link.state(), LinkState::Connected);
        assert_eq!(link.rejoins(), 0);
        assert_eq!(wifi.radio_ops(), 0);
        assert_eq!(delay.total_ms.get(), 0);
    }

    #[test]
    fn test_reconnect_after_link_loss() {
        let log = event_log();
        let wifi = MockWifi::connected(&log);
        let mut link = manager(&wifi);
        let clock = FakeClock::starting_at(0);
        let mut delay = FakeDelay::new(&clock);

        assert!(link.is_connected());
        wifi.drop_link();
        wifi.state.borrow_mut().polls_to_connect = Some(3);

        assert_eq!(block_on(link.ensure_connected(&clock, &mut delay)), Ok(()));
        assert_eq!(link.state(), LinkState::Connected);
        assert_eq!(link.rejoins(), 1);
        assert_eq!(*log.borrow(), ["wifi.disconnect", "wifi.begin"]);
        // three pending polls, 500ms apart
        assert_eq!(delay.total_ms.get(), 1_500);
        assert_eq!(wifi.state.borrow().last_ssid, Some("greenhouse"));
    }

    #[test]
    fn test_reconnect_times_out() {
        let log = event_log();
        let wifi = MockWifi::new(&log);
        wifi.state.borrow_mut().polls_to_connect = None;
        let mut link = manager(&wifi);
        let clock = FakeClock::starting_at(0);
        let mut delay = FakeDelay::new(&clock);

        let result = block_on(link.ensure_connected(&clock, &mut delay));

        assert_eq!(result, Err(LinkError::Timeout));
        assert_eq!(link.state(), LinkState::Disconnected);
        assert_eq!(link.rejoins(), 0);
        assert_eq!(delay.total_ms.get(), 10_000);
        assert_eq!(wifi.state.borrow().begins, 1);
    }

    #[test]
    fn test_timeout_is_correct_across_wraparound() {
        let log = event_log();
        let wifi = MockWifi::new(&log);
        wifi.state.borrow_mut().polls_to_connect = None;
        let mut link = manager(&wifi);
        let clock = FakeClock::starting_at(u32::MAX - 2_000);
        let mut delay = FakeDelay::new(&clock);

        let result = block_on(link.ensure_connected(&clock, &mut delay));

        assert_eq!(result, Err(LinkError::Timeout));
        assert_eq!(delay.total_ms.get(), 10_000);
    }

    #[test]
    fn test_rejected_join_fails_fast() {
        let log = event_log();
        let wifi = MockWifi::new(&log);
        wifi.state.borrow_mut().begin_result = Err(LinkError::JoinFailed);
        let mut link = manager(&wifi);
        let clock = FakeClock::starting_at(0);
        let mut delay = FakeDelay::new(&clock);

        let result = block_on(link.ensure_connected(&clock, &mut delay));

        assert_eq!(result, Err(LinkError::JoinFailed));
        assert_eq!(link.state(), LinkState::Disconnected);
        assert_eq!(delay.total_ms.get(), 0);
    }

    #[test]
    fn test_bring_up_retries_until_connected() {
        let log = event_log();
        let wifi = MockWifi::new(&log);
        // first join goes nowhere for a whole window, second one succeeds
        wifi.state.borrow_mut().ignored_begins = 1;
        wifi.state.borrow_mut().polls_to_connect = Some(3);
        let mut link = manager(&wifi);
        let clock = FakeClock::starting_at(0);
        let mut delay = FakeDelay::new(&clock);

        block_on(link.bring_up(&clock, &mut delay));

        assert_eq!(link.state(), LinkState::Connected);
        assert_eq!(wifi.state.borrow().begins, 2);
        assert_eq!(clock.uptime_ms(), 13_000);
        assert_eq!(link.local_address(), Some(Ipv4Addr::new(192, 168, 1, 42)));
    }

    #[test]
    fn test_is_connected_detects_loss() {
        let log = event_log();
        let wifi = MockWifi::connected(&log);
        let mut link = manager(&wifi);

        assert!(link.is_connected());
        assert_eq!(link.state(), LinkState::Connected);

        wifi.drop_link();
        assert!(!link.is_connected());
        assert_eq!(link.state(), LinkState::Disconnected);
    }
}
