//! rust-mqtt broker adapter
//!
//! The MQTT client lives for the whole program and talks through a TCP
//! socket that is shared behind a mutex, so a dropped session can be
//! re-established by reconnecting the socket and sending a fresh CONNECT
//! on the same client. Every broker round trip is bounded by a response
//! timeout so a silent broker cannot stall the caller.

use core::net::Ipv4Addr;

use embassy_net::dns::DnsQueryType;
use embassy_net::tcp::{self, TcpSocket};
use embassy_net::{IpAddress, Stack};
use embassy_sync::blocking_mutex::raw::NoopRawMutex;
use embassy_sync::mutex::Mutex;
use embassy_time::{with_timeout, Duration, Instant};
use embedded_io_async::{ErrorType, Read, Write};
use rust_mqtt::client::client::MqttClient;
use rust_mqtt::client::client_config::{ClientConfig, MqttVersion};
use rust_mqtt::packet::v5::publish_packet::QualityOfService;
use rust_mqtt::packet::v5::reason_codes::ReasonCode;
use rust_mqtt::utils::rng_generator::CountingRng;

use crate::config::BrokerSettings;
use crate::ports::{BrokerError, BrokerPort};

pub type SharedSocket = Mutex<NoopRawMutex, TcpSocket<'static>>;

const MAX_PROPERTIES: usize = 5;
const SOCKET_TIMEOUT: Duration = Duration::from_secs(10);
/// Longest wait for CONNACK or PINGRESP
const RESPONSE_TIMEOUT: Duration = Duration::from_secs(5);

/// embedded-io transport over the shared socket
pub struct SocketTransport {
    socket: &'static SharedSocket,
}

impl ErrorType for SocketTransport {
    type Error = tcp::Error;
}

impl Read for SocketTransport {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        self.socket.lock().await.read(buf).await
    }
}

impl Write for SocketTransport {
    async fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        self.socket.lock().await.write(buf).await
    }

    async fn flush(&mut self) -> Result<(), Self::Error> {
        self.socket.lock().await.flush().await
    }
}

pub struct MqttBroker {
    stack: Stack<'static>,
    socket: &'static SharedSocket,
    client: MqttClient<'static, SocketTransport, MAX_PROPERTIES, CountingRng>,
    connected: bool,
    ping_interval: Duration,
    last_ping: Instant,
}

impl MqttBroker {
    /// Build the client; nothing is sent until [`BrokerPort::connect`]
    pub fn new(
        stack: Stack<'static>,
        socket: &'static SharedSocket,
        settings: &BrokerSettings,
        write_buffer: &'static mut [u8],
        recv_buffer: &'static mut [u8],
    ) -> Self {
        let mut config = ClientConfig::new(MqttVersion::MQTTv5, CountingRng(20_000));
        config.add_client_id(settings.client_id);
        config.keep_alive = settings.keep_alive_secs;
        config.max_packet_size = write_buffer.len() as u32;
        if !settings.username.is_empty() {
            config.add_username(settings.username);
            if !settings.password.is_empty() {
                config.add_password(settings.password);
            }
        }

        let write_len = write_buffer.len();
        let recv_len = recv_buffer.len();
        let client = MqttClient::<_, MAX_PROPERTIES, _>::new(
            SocketTransport { socket },
            write_buffer,
            write_len,
            recv_buffer,
            recv_len,
            config,
        );

        Self {
            stack,
            socket,
            client,
            connected: false,
            ping_interval: Duration::from_secs((settings.keep_alive_secs as u64 / 2).max(1)),
            last_ping: Instant::now(),
        }
    }

    async fn resolve(&self, host: &str) -> Result<IpAddress, BrokerError> {
        if let Ok(ip) = host.parse::<Ipv4Addr>() {
            return Ok(IpAddress::Ipv4(ip));
        }

        let addrs = self
            .stack
            .dns_query(host, DnsQueryType::A)
            .await
            .map_err(|_| BrokerError::DnsFailed)?;
        addrs.first().copied().ok_or(BrokerError::DnsFailed)
    }

    async fn open_socket(&mut self, addr: IpAddress, port: u16) -> Result<(), BrokerError> {
        let mut socket = self.socket.lock().await;
        socket.abort();
        socket.set_timeout(Some(SOCKET_TIMEOUT));
        socket.connect((addr, port)).await.map_err(|_| {
            warn!("TCP connect to broker failed");
            BrokerError::TransportFailed
        })
    }

    async fn abort_socket(&mut self) {
        self.connected = false;
        self.socket.lock().await.abort();
    }
}

impl BrokerPort for MqttBroker {
    async fn connect(&mut self, settings: &BrokerSettings) -> Result<(), BrokerError> {
        self.connected = false;

        let addr = self.resolve(settings.host).await?;
        self.open_socket(addr, settings.port).await?;

        match with_timeout(RESPONSE_TIMEOUT, self.client.connect_to_broker()).await {
            Ok(Ok(())) => {}
            Ok(Err(code)) => {
                warn!("CONNACK refused: {}", reason_str(code));
                return Err(BrokerError::Rejected);
            }
            Err(_) => {
                warn!("No CONNACK within {} ms", RESPONSE_TIMEOUT.as_millis());
                self.abort_socket().await;
                return Err(BrokerError::TransportFailed);
            }
        }

        self.connected = true;
        self.last_ping = Instant::now();
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    async fn poll(&mut self) -> Result<(), BrokerError> {
        if !self.connected {
            return Err(BrokerError::NotConnected);
        }
        if Instant::now().duration_since(self.last_ping) < self.ping_interval {
            return Ok(());
        }

        match with_timeout(RESPONSE_TIMEOUT, self.client.send_ping()).await {
            Ok(Ok(())) => {
                self.last_ping = Instant::now();
                debug!("MQTT ping ok");
                Ok(())
            }
            Ok(Err(code)) => {
                warn!("MQTT ping failed: {}", reason_str(code));
                self.connected = false;
                Err(BrokerError::KeepAliveFailed)
            }
            Err(_) => {
                warn!("No PINGRESP within {} ms", RESPONSE_TIMEOUT.as_millis());
                self.abort_socket().await;
                Err(BrokerError::KeepAliveFailed)
            }
        }
    }

    async fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), BrokerError> {
        match self
            .client
            .send_message(topic, payload, QualityOfService::QoS0, false)
            .await
        {
            // QoS 0 has no acknowledgement; no subscribers is still delivered to the broker
            Ok(()) | Err(ReasonCode::NoMatchingSubscribers) => Ok(()),
            Err(ReasonCode::NetworkError) => {
                warn!("MQTT publish failed: network error");
                self.connected = false;
                Err(BrokerError::PublishFailed)
            }
            Err(code) => {
                warn!("MQTT publish refused: {}", reason_str(code));
                Err(BrokerError::PublishFailed)
            }
        }
    }
}

fn reason_str(code: ReasonCode) -> &'static str {
    match code {
        ReasonCode::UnspecifiedError => "unspecified error",
        ReasonCode::MalformedPacket => "malformed packet",
        ReasonCode::ProtocolError => "protocol error",
        ReasonCode::UnsupportedProtocolVersion => "unsupported protocol version",
        ReasonCode::ClientIdNotValid => "client id not valid",
        ReasonCode::BadUserNameOrPassword => "bad username or password",
        ReasonCode::NotAuthorized => "not authorized",
        ReasonCode::ServerUnavailable => "server unavailable",
        ReasonCode::ServerBusy => "server busy",
        ReasonCode::Banned => "banned",
        ReasonCode::TopicNameInvalid => "topic name invalid",
        ReasonCode::PacketTooLarge => "packet too large",
        ReasonCode::NetworkError => "network error",
        _ => "other",
    }
}
