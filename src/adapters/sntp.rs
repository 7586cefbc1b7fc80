//! SNTP time synchronization
//!
//! One query at boot gives the wall-clock offset used for payload
//! timestamps. Without it readings are stamped with the Unix epoch.

/// Seconds between the NTP epoch (1900) and the Unix epoch (1970)
pub const NTP_UNIX_OFFSET: u64 = 2_208_988_800;

pub const NTP_PACKET_LEN: usize = 48;
pub const NTP_PORT: u16 = 123;
pub const DEFAULT_NTP_SERVER: &str = "pool.ntp.org";

/// LI = 0, VN = 3, Mode = 3 (client)
const CLIENT_HEADER: u8 = 0x1B;
const MODE_SERVER: u8 = 4;
const TRANSMIT_TIMESTAMP: usize = 40;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SntpError {
    DnsFailed,
    SocketFailed,
    /// No reply within the timeout
    Timeout,
    /// Reply was short, not from a server, or a kiss-o'-death
    InvalidResponse,
}

/// Build a client request packet
pub const fn request_packet() -> [u8; NTP_PACKET_LEN] {
    let mut packet = [0u8; NTP_PACKET_LEN];
    packet[0] = CLIENT_HEADER;
    packet
}

/// Extract the server transmit time as Unix seconds
pub fn parse_response(packet: &[u8]) -> Result<u64, SntpError> {
    if packet.len() < NTP_PACKET_LEN {
        return Err(SntpError::InvalidResponse);
    }
    if packet[0] & 0x07 != MODE_SERVER {
        return Err(SntpError::InvalidResponse);
    }
    // stratum 0 marks a kiss-o'-death reply
    if packet[1] == 0 {
        return Err(SntpError::InvalidResponse);
    }

    let secs = u32::from_be_bytes([
        packet[TRANSMIT_TIMESTAMP],
        packet[TRANSMIT_TIMESTAMP + 1],
        packet[TRANSMIT_TIMESTAMP + 2],
        packet[TRANSMIT_TIMESTAMP + 3],
    ]) as u64;

    secs.checked_sub(NTP_UNIX_OFFSET)
        .ok_or(SntpError::InvalidResponse)
}

/// Ask `server` for the current time over UDP
#[cfg(feature = "rp")]
pub async fn query(stack: embassy_net::Stack<'_>, server: &str) -> Result<u64, SntpError> {
    use embassy_net::dns::DnsQueryType;
    use embassy_net::udp::{PacketMetadata, UdpSocket};
    use embassy_time::{with_timeout, Duration};

    let addrs = stack
        .dns_query(server, DnsQueryType::A)
        .await
        .map_err(|_| SntpError::DnsFailed)?;
    let addr = *addrs.first().ok_or(SntpError::DnsFailed)?;

    let mut rx_meta = [PacketMetadata::EMPTY; 2];
    let mut tx_meta = [PacketMetadata::EMPTY; 2];
    let mut rx_buf = [0u8; 128];
    let mut tx_buf = [0u8; 128];
    let mut socket = UdpSocket::new(stack, &mut rx_meta, &mut rx_buf, &mut tx_meta, &mut tx_buf);
    socket.bind(0).map_err(|_| SntpError::SocketFailed)?;

    socket
        .send_to(&request_packet(), (addr, NTP_PORT))
        .await
        .map_err(|_| SntpError::SocketFailed)?;

    let mut reply = [0u8; NTP_PACKET_LEN];
    let (len, _) = with_timeout(Duration::from_secs(5), socket.recv_from(&mut reply))
        .await
        .map_err(|_| SntpError::Timeout)?
        .map_err(|_| SntpError::SocketFailed)?;

    parse_response(&reply[..len])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reply(ntp_secs: u32) -> [u8; NTP_PACKET_LEN] {
        let mut packet = [0u8; NTP_PACKET_LEN];
        packet[0] = 0x24; // LI 0, VN 4, mode 4
        packet[1] = 2;
        packet[40..44].copy_from_slice(&ntp_secs.to_be_bytes());
        packet
    }

    #[test]
    fn test_request_header() {
        let packet = request_packet();
        assert_eq!(packet[0], 0x1B);
        assert!(packet[1..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_converts_ntp_to_unix() {
        let ntp = (NTP_UNIX_OFFSET + 1_700_000_000) as u32;
        assert_eq!(parse_response(&reply(ntp)), Ok(1_700_000_000));
        assert_eq!(parse_response(&reply(NTP_UNIX_OFFSET as u32)), Ok(0));
    }

    #[test]
    fn test_rejects_bad_replies() {
        assert_eq!(
            parse_response(&[0u8; 12]),
            Err(SntpError::InvalidResponse)
        );

        let mut client_echo = reply(3_900_000_000);
        client_echo[0] = 0x1B;
        assert_eq!(parse_response(&client_echo), Err(SntpError::InvalidResponse));

        let mut kod = reply(3_900_000_000);
        kod[1] = 0;
        assert_eq!(parse_response(&kod), Err(SntpError::InvalidResponse));

        assert_eq!(parse_response(&reply(1_000)), Err(SntpError::InvalidResponse));
    }
}
