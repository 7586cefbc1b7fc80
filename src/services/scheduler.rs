//! Scheduler loop - the cooperative top level of the firmware
//!
//! One tick, in fixed order:
//!
//! ```text
//! update listener ─► link ensure ─► broker ensure (link up) ─► broker service
//!                                                                    │
//!                         acquisition period elapsed? ◄──────────────┘
//!                                    │ yes
//!              read ─► sample ─► encode ─► publish ─► log, reset timer
//! ```
//!
//! The broker and update listener are optional. Without a broker every
//! reading is logged and nothing is published. The broker session never
//! outlives the link: a lost or re-joined link drops it before it is
//! serviced or published on.

use embedded_hal_async::delay::DelayNs;

use crate::config::{BrokerSettings, DeviceConfig};
use crate::domain::{SensitivityFactors, SpectralCounts, SpectralSample, UtcTimestamp};
use crate::ports::{
    period_elapsed, BrokerError, BrokerPort, Clock, SpectralSensorError, SpectralSensorPort,
    UpdateError, UpdatePort, WifiPort,
};
use crate::services::broker::BrokerClient;
use crate::services::link::LinkManager;
use crate::telemetry::{self, EncodeError, MAX_PAYLOAD_SIZE};

/// What happened to one acquisition cycle
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CycleOutcome {
    /// Reading sent to the broker
    Published,
    /// The broker did not accept the message
    PublishFailed(BrokerError),
    /// A broker is configured but not connected; reading logged only
    BrokerOffline,
    /// No broker configured; reading logged only
    LoggedOnly,
    /// Acquisition failed; nothing was derived or published
    ReadFailed(SpectralSensorError),
    /// The sample did not fit the payload buffer
    EncodeFailed(EncodeError),
}

/// Summary of one scheduler tick
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TickReport {
    /// An update listener is attached and was serviced
    pub update_serviced: bool,
    /// The Wi-Fi link was up after the connectivity check
    pub link_up: bool,
    /// The broker session was up after the connectivity check
    pub broker_up: bool,
    /// `Some` when the acquisition period elapsed and a cycle ran
    pub cycle: Option<CycleOutcome>,
}

/// Stand-in for a collaborator the firmware runs without
pub struct Absent;

impl BrokerPort for Absent {
    async fn connect(&mut self, _settings: &BrokerSettings) -> Result<(), BrokerError> {
        Err(BrokerError::NotConnected)
    }

    fn is_connected(&self) -> bool {
        false
    }

    async fn poll(&mut self) -> Result<(), BrokerError> {
        Err(BrokerError::NotConnected)
    }

    async fn publish(&mut self, _topic: &str, _payload: &[u8]) -> Result<(), BrokerError> {
        Err(BrokerError::NotConnected)
    }
}

impl UpdatePort for Absent {
    async fn handle(&mut self) -> Result<(), UpdateError> {
        Ok(())
    }
}

/// Cooperative loop owning every collaborator and the acquisition timer
pub struct Scheduler<S, W, B, U, C, D> {
    sensor: S,
    link: LinkManager<W>,
    broker: Option<BrokerClient<B>>,
    updates: Option<U>,
    clock: C,
    delay: D,
    device: &'static str,
    sensitivity: SensitivityFactors,
    period_ms: u32,
    idle_ms: u32,
    last_acquisition_ms: u32,
}

impl<S, W, C, D> Scheduler<S, W, Absent, Absent, C, D>
where
    C: Clock,
{
    /// Logging-only scheduler; add collaborators with
    /// [`with_broker`](Scheduler::with_broker) and
    /// [`with_updates`](Scheduler::with_updates)
    ///
    /// The first acquisition happens one full period after construction.
    pub fn new(sensor: S, link: LinkManager<W>, clock: C, delay: D, config: &DeviceConfig) -> Self {
        let last_acquisition_ms = clock.uptime_ms();
        Self {
            sensor,
            link,
            broker: None,
            updates: None,
            clock,
            delay,
            device: config.hostname,
            sensitivity: config.sensitivity,
            period_ms: config.timing.acquisition_period_ms,
            idle_ms: config.timing.tick_idle_ms,
            last_acquisition_ms,
        }
    }
}

impl<S, W, B, U, C, D> Scheduler<S, W, B, U, C, D> {
    pub fn with_broker<B2>(self, broker: BrokerClient<B2>) -> Scheduler<S, W, B2, U, C, D> {
        Scheduler {
            sensor: self.sensor,
            link: self.link,
            broker: Some(broker),
            updates: self.updates,
            clock: self.clock,
            delay: self.delay,
            device: self.device,
            sensitivity: self.sensitivity,
            period_ms: self.period_ms,
            idle_ms: self.idle_ms,
            last_acquisition_ms: self.last_acquisition_ms,
        }
    }

    pub fn with_updates<U2>(self, updates: U2) -> Scheduler<S, W, B, U2, C, D> {
        Scheduler {
            sensor: self.sensor,
            link: self.link,
            broker: self.broker,
            updates: Some(updates),
            clock: self.clock,
            delay: self.delay,
            device: self.device,
            sensitivity: self.sensitivity,
            period_ms: self.period_ms,
            idle_ms: self.idle_ms,
            last_acquisition_ms: self.last_acquisition_ms,
        }
    }

    pub fn last_acquisition_ms(&self) -> u32 {
        self.last_acquisition_ms
    }
}

impl<S, W, B, U, C, D> Scheduler<S, W, B, U, C, D>
where
    S: SpectralSensorPort,
    W: WifiPort,
    B: BrokerPort,
    U: UpdatePort,
    C: Clock,
    D: DelayNs,
{
    /// Run forever: one tick, then the idle delay
    pub async fn run(&mut self) -> ! {
        info!("Scheduler running, acquisition every {} ms", self.period_ms);
        loop {
            self.tick().await;
            self.delay.delay_ms(self.idle_ms).await;
        }
    }

    /// Perform one pass of the loop
    pub async fn tick(&mut self) -> TickReport {
        let update_serviced = match self.updates.as_mut() {
            Some(updates) => {
                if let Err(e) = updates.handle().await {
                    warn!("Update listener error: {:?}", e);
                }
                true
            }
            None => false,
        };

        let rejoins = self.link.rejoins();
        let link_up = self
            .link
            .ensure_connected(&self.clock, &mut self.delay)
            .await
            .is_ok();
        let rejoined = self.link.rejoins() != rejoins;

        let broker_up = match self.broker.as_mut() {
            Some(broker) => {
                if !link_up || rejoined {
                    broker.invalidate();
                }
                if link_up && !broker.is_connected() {
                    // Connect failures are logged by the client
                    let _ = broker.ensure_connected(self.clock.uptime_ms()).await;
                }
                if broker.is_connected() {
                    let _ = broker.service().await;
                }
                broker.is_connected()
            }
            None => false,
        };

        let now = self.clock.uptime_ms();
        let cycle = if period_elapsed(self.last_acquisition_ms, now, self.period_ms) {
            let outcome = self.acquire().await;
            self.last_acquisition_ms = now;
            Some(outcome)
        } else {
            None
        };

        TickReport {
            update_serviced,
            link_up,
            broker_up,
            cycle,
        }
    }

    async fn acquire(&mut self) -> CycleOutcome {
        let counts = match self.sensor.read_all_channels().await {
            Ok(counts) => counts,
            Err(e) => {
                error!("Failed to read spectral channels: {:?}", e);
                return CycleOutcome::ReadFailed(e);
            }
        };

        let captured_at = UtcTimestamp::from_clock(self.clock.unix_time());
        let sample = SpectralSample::capture(counts, &self.sensitivity, captured_at);
        log_sample(&sample);

        let Some(broker) = self.broker.as_mut() else {
            return CycleOutcome::LoggedOnly;
        };
        if !broker.is_connected() {
            warn!("MQTT not connected, reading not published");
            return CycleOutcome::BrokerOffline;
        }

        let mut buf = [0u8; MAX_PAYLOAD_SIZE];
        let len = match telemetry::encode(&sample, self.device, &mut buf) {
            Ok(len) => len,
            Err(e) => {
                error!("Failed to encode reading: {:?}", e);
                return CycleOutcome::EncodeFailed(e);
            }
        };

        let topic = broker.topic();
        match broker.publish(topic, &buf[..len]).await {
            Ok(()) => {
                info!("Published {} bytes to {}", len, topic);
                CycleOutcome::Published
            }
            Err(e) => {
                warn!("Publish failed: {:?}", e);
                CycleOutcome::PublishFailed(e)
            }
        }
    }
}

fn log_sample(sample: &SpectralSample) {
    info!("--- Spectral reading ---");
    for (name, count) in SpectralCounts::CHANNEL_NAMES
        .iter()
        .zip(sample.counts.all_channels().iter())
    {
        info!("{}: {}", name, count);
    }
    info!("PPFD: {} umol/m2/s", sample.ppfd);
}
