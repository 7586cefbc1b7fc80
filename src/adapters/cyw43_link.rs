//! CYW43 Wi-Fi adapter
//!
//! Joins through the cyw43 control handle; link status comes from the
//! embassy-net stack, which only counts as connected once DHCP has handed
//! out an address.

use core::net::Ipv4Addr;

use cyw43::{Control, JoinOptions};
use embassy_net::Stack;

use crate::config::WifiCredentials;
use crate::ports::{LinkError, LinkStatus, WifiPort};

pub struct Cyw43Link {
    control: Control<'static>,
    stack: Stack<'static>,
}

impl Cyw43Link {
    pub fn new(control: Control<'static>, stack: Stack<'static>) -> Self {
        Self { control, stack }
    }

    /// Network stack, for sockets opened by other adapters
    pub fn stack(&self) -> Stack<'static> {
        self.stack
    }
}

impl WifiPort for Cyw43Link {
    async fn begin(&mut self, credentials: &WifiCredentials) -> Result<(), LinkError> {
        self.control
            .join(credentials.ssid, JoinOptions::new(credentials.password.as_bytes()))
            .await
            .map_err(|e| {
                warn!("cyw43 join failed, status {}", e.status);
                LinkError::JoinFailed
            })
    }

    async fn disconnect(&mut self) {
        self.control.leave().await;
    }

    fn status(&mut self) -> LinkStatus {
        match (self.stack.is_link_up(), self.stack.config_v4().is_some()) {
            (true, true) => LinkStatus::Connected,
            (true, false) => LinkStatus::Pending,
            _ => LinkStatus::Disconnected,
        }
    }

    fn local_address(&self) -> Option<Ipv4Addr> {
        self.stack.config_v4().map(|config| config.address.address())
    }
}
