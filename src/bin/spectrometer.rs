//! Wi-Fi Spectrometer Firmware
//!
//! Reads an AS7341 spectral sensor every five seconds, derives PPFD and
//! publishes each reading as JSON to an MQTT broker.
//!
//! # Hardware
//!
//! - Raspberry Pi Pico 2 W (RP2350 + CYW43439)
//! - AS7341 breakout connected via QWIIC/I2C (GPIO4=SDA, GPIO5=SCL)
//!
//! # Usage
//!
//! ```bash
//! WIFI_SSID=greenhouse WIFI_PASSWORD=... MQTT_HOST=192.168.1.20 \
//!     MQTT_USERNAME=spectro MQTT_PASSWORD=... cargo firmware
//! ```
//!
//! # Boot sequence
//!
//! 1. Radio and network stack up, join Wi-Fi (blocks until connected)
//! 2. AS7341 detection; a missing sensor resets the MCU after 3 s
//! 3. One SNTP query for wall-clock timestamps
//! 4. Scheduler loop: update listener, link, broker, acquisition

#![no_std]
#![no_main]

use cyw43_firmware::{CYW43_43439A0 as FIRMWARE, CYW43_43439A0_CLM as CLM};
use cyw43_pio::{PioSpi, DEFAULT_CLOCK_DIVIDER};
use defmt::*;
use embassy_executor::Spawner;
use embassy_net::tcp::TcpSocket;
use embassy_net::{Config as NetConfig, DhcpConfig, StackResources};
use embassy_rp::bind_interrupts;
use embassy_rp::block::ImageDef;
use embassy_rp::clocks::RoscRng;
use embassy_rp::gpio::{Level, Output};
use embassy_rp::i2c::{I2c, InterruptHandler as I2cInterruptHandler};
use embassy_rp::peripherals::{DMA_CH0, I2C0, PIO0};
use embassy_rp::pio::{InterruptHandler as PioInterruptHandler, Pio};
use embassy_sync::mutex::Mutex;
use embassy_time::{Delay, Duration, Timer};
use rand_core::RngCore;
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

use spectro::adapters::{
    sntp, As7341Adapter, Cyw43Link, EmbassyClock, IdleUpdateListener, MqttBroker, SharedSocket,
};
use spectro::config::DeviceConfig;
use spectro::services::{BrokerClient, LinkManager, Scheduler};

#[link_section = ".start_block"]
#[used]
pub static IMAGE_DEF: ImageDef = ImageDef::secure_exe();

// ============================================================================
// Configuration
// ============================================================================

/// Baked in from the build environment (see `spectro::config`)
static CONFIG: DeviceConfig = DeviceConfig::from_build_env();

const SENSOR_MISSING_RESET_DELAY: Duration = Duration::from_secs(3);

const TCP_BUFFER_SIZE: usize = 1024;
const MQTT_BUFFER_SIZE: usize = 1024;

// ============================================================================
// Interrupt Bindings
// ============================================================================

bind_interrupts!(struct Irqs {
    PIO0_IRQ_0 => PioInterruptHandler<PIO0>;
    I2C0_IRQ => I2cInterruptHandler<I2C0>;
});

// ============================================================================
// Driver Tasks
// ============================================================================

#[embassy_executor::task]
async fn cyw43_task(
    runner: cyw43::Runner<'static, Output<'static>, PioSpi<'static, PIO0, 0, DMA_CH0>>,
) -> ! {
    runner.run().await
}

#[embassy_executor::task]
async fn net_task(mut runner: embassy_net::Runner<'static, cyw43::NetDriver<'static>>) -> ! {
    runner.run().await
}

// ============================================================================
// Main
// ============================================================================

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("Wi-Fi spectrometer v{} starting", env!("CARGO_PKG_VERSION"));

    let config = CONFIG;
    if let Err(e) = config.validate() {
        defmt::panic!("Invalid build configuration: {:?}", e);
    }

    let p = embassy_rp::init(Default::default());
    let mut rng = RoscRng;

    // Radio
    let pwr = Output::new(p.PIN_23, Level::Low);
    let cs = Output::new(p.PIN_25, Level::High);
    let mut pio = Pio::new(p.PIO0, Irqs);
    let spi = PioSpi::new(
        &mut pio.common,
        pio.sm0,
        DEFAULT_CLOCK_DIVIDER,
        pio.irq0,
        cs,
        p.PIN_24,
        p.PIN_29,
        p.DMA_CH0,
    );

    static STATE: StaticCell<cyw43::State> = StaticCell::new();
    let state = STATE.init(cyw43::State::new());
    let (net_device, mut control, runner) = cyw43::new(state, pwr, spi, FIRMWARE).await;
    spawner.spawn(cyw43_task(runner).expect("cyw43 task"));

    control.init(CLM).await;
    control
        .set_power_management(cyw43::PowerManagementMode::PowerSave)
        .await;

    // Network stack, announcing the device hostname over DHCP.
    // `validate` bounds the hostname to the DHCP option length.
    let mut dhcp = DhcpConfig::default();
    dhcp.hostname = heapless::String::try_from(config.hostname).ok();

    static RESOURCES: StaticCell<StackResources<4>> = StaticCell::new();
    let (stack, net_runner) = embassy_net::new(
        net_device,
        NetConfig::dhcpv4(dhcp),
        RESOURCES.init(StackResources::new()),
        rng.next_u64(),
    );
    spawner.spawn(net_task(net_runner).expect("net task"));

    let mut clock = EmbassyClock::new();
    let mut delay = Delay;

    let mut link = LinkManager::new(Cyw43Link::new(control, stack), config.wifi, &config.timing);
    link.bring_up(&clock, &mut delay).await;
    info!("Hostname: {}", config.hostname);

    // Sensor
    let i2c = I2c::new_async(
        p.I2C0,
        p.PIN_5,
        p.PIN_4,
        Irqs,
        embassy_rp::i2c::Config::default(),
    );
    let mut sensor = As7341Adapter::new(i2c, Delay);
    if let Err(e) = sensor.init(config.sensor).await {
        error!("AS7341 not found ({:?}), restarting", e);
        Timer::after(SENSOR_MISSING_RESET_DELAY).await;
        cortex_m::peripheral::SCB::sys_reset();
    }
    info!(
        "AS7341 ready: gain index {} ({}x), ATIME {}, ASTEP {}, {} us integration",
        config.sensor.gain,
        config.sensor.gain_factor(),
        config.sensor.atime,
        config.sensor.astep,
        config.sensor.integration_time_us()
    );

    // Wall clock
    match sntp::query(stack, sntp::DEFAULT_NTP_SERVER).await {
        Ok(unix) => {
            clock.synchronize(unix);
            info!("Time synchronized: {} s since epoch", unix);
        }
        Err(e) => warn!("SNTP failed ({:?}), readings stamped with the epoch", e),
    }

    // Broker
    static TCP_RX: StaticCell<[u8; TCP_BUFFER_SIZE]> = StaticCell::new();
    static TCP_TX: StaticCell<[u8; TCP_BUFFER_SIZE]> = StaticCell::new();
    static SOCKET: StaticCell<SharedSocket> = StaticCell::new();
    static MQTT_TX: StaticCell<[u8; MQTT_BUFFER_SIZE]> = StaticCell::new();
    static MQTT_RX: StaticCell<[u8; MQTT_BUFFER_SIZE]> = StaticCell::new();

    let socket = TcpSocket::new(
        stack,
        TCP_RX.init([0; TCP_BUFFER_SIZE]),
        TCP_TX.init([0; TCP_BUFFER_SIZE]),
    );
    let socket = SOCKET.init(Mutex::new(socket));
    let mqtt = MqttBroker::new(
        stack,
        socket,
        &config.broker,
        MQTT_TX.init([0; MQTT_BUFFER_SIZE]),
        MQTT_RX.init([0; MQTT_BUFFER_SIZE]),
    );
    let broker = BrokerClient::new(mqtt, config.broker, config.timing.broker_backoff_ms);
    info!("Publishing to {}", config.broker.topic);

    let mut scheduler = Scheduler::new(sensor, link, clock, delay, &config)
        .with_broker(broker)
        .with_updates(IdleUpdateListener::new());

    scheduler.run().await
}
