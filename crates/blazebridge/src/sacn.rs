//! sACN (E1.31) receiver
//!
//! sACN (Streaming ACN) carries DMX512 over UDP multicast. Each universe
//! has its own group, `239.255.<universe hi>.<universe lo>`, on port 5568.
//!
//! Only data packets with the null start code are accepted; anything else
//! (sync, discovery, alternate start codes) is dropped.

use std::io;
use std::net::{Ipv4Addr, SocketAddr};
use std::ops::RangeInclusive;

use thiserror::Error;
use tokio::net::UdpSocket;
use tracing::{debug, info};

/// sACN UDP port
pub const SACN_PORT: u16 = 5568;

const ACN_PACKET_IDENTIFIER: [u8; 12] = [
    0x41, 0x53, 0x43, 0x2d, 0x45, 0x31, 0x2e, 0x31, 0x37, 0x00, 0x00, 0x00,
];
const VECTOR_ROOT_E131_DATA: u32 = 0x0000_0004;
const VECTOR_E131_DATA_PACKET: u32 = 0x0000_0002;
const VECTOR_DMP_SET_PROPERTY: u8 = 0x02;
const DMX_NULL_START_CODE: u8 = 0x00;

// Field offsets
const ROOT_VECTOR: usize = 18;
const FRAMING_VECTOR: usize = 40;
const PRIORITY: usize = 108;
const SEQUENCE: usize = 111;
const OPTIONS: usize = 112;
const UNIVERSE: usize = 113;
const DMP_VECTOR: usize = 117;
const PROPERTY_COUNT: usize = 123;
const START_CODE: usize = 125;
const DMX_DATA: usize = 126;

/// Options bit: preview data, not meant for live output
const OPTION_PREVIEW: u8 = 0x80;

/// Why a datagram was not accepted
#[derive(Error, Debug, PartialEq, Eq)]
pub enum PacketError {
    #[error("packet too short ({0} bytes)")]
    TooShort(usize),
    #[error("not an ACN packet")]
    NotAcn,
    #[error("unsupported vector {0:#x}")]
    UnsupportedVector(u32),
    #[error("unsupported start code {0:#04x}")]
    UnsupportedStartCode(u8),
    #[error("preview data")]
    Preview,
}

/// A decoded E1.31 data packet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataPacket<'a> {
    pub universe: u16,
    pub sequence: u8,
    pub priority: u8,
    /// DMX slots 1.. (start code excluded)
    pub data: &'a [u8],
}

fn read_u16(packet: &[u8], offset: usize) -> u16 {
    u16::from_be_bytes([packet[offset], packet[offset + 1]])
}

fn read_u32(packet: &[u8], offset: usize) -> u32 {
    u32::from_be_bytes([
        packet[offset],
        packet[offset + 1],
        packet[offset + 2],
        packet[offset + 3],
    ])
}

/// Parse one E1.31 data packet
pub fn parse_data_packet(packet: &[u8]) -> Result<DataPacket<'_>, PacketError> {
    if packet.len() < DMX_DATA {
        return Err(PacketError::TooShort(packet.len()));
    }
    if packet[4..16] != ACN_PACKET_IDENTIFIER {
        return Err(PacketError::NotAcn);
    }

    let root_vector = read_u32(packet, ROOT_VECTOR);
    if root_vector != VECTOR_ROOT_E131_DATA {
        return Err(PacketError::UnsupportedVector(root_vector));
    }
    let framing_vector = read_u32(packet, FRAMING_VECTOR);
    if framing_vector != VECTOR_E131_DATA_PACKET {
        return Err(PacketError::UnsupportedVector(framing_vector));
    }
    if packet[DMP_VECTOR] != VECTOR_DMP_SET_PROPERTY {
        return Err(PacketError::UnsupportedVector(packet[DMP_VECTOR] as u32));
    }
    if packet[OPTIONS] & OPTION_PREVIEW != 0 {
        return Err(PacketError::Preview);
    }
    if packet[START_CODE] != DMX_NULL_START_CODE {
        return Err(PacketError::UnsupportedStartCode(packet[START_CODE]));
    }

    // Property count includes the start code
    let slots = (read_u16(packet, PROPERTY_COUNT) as usize).saturating_sub(1);
    let end = (DMX_DATA + slots).min(packet.len());

    Ok(DataPacket {
        universe: read_u16(packet, UNIVERSE),
        sequence: packet[SEQUENCE],
        priority: packet[PRIORITY],
        data: &packet[DMX_DATA..end],
    })
}

/// Multicast group of a universe
pub fn multicast_group(universe: u16) -> Ipv4Addr {
    let [hi, lo] = universe.to_be_bytes();
    Ipv4Addr::new(239, 255, hi, lo)
}

/// Receives DMX data for a range of universes
pub struct SacnReceiver {
    socket: UdpSocket,
    buf: Vec<u8>,
}

impl SacnReceiver {
    /// Bind the sACN port and join the group of every universe in `universes`
    /// on `interface`
    pub async fn bind(interface: Ipv4Addr, universes: RangeInclusive<u16>) -> io::Result<Self> {
        let socket = UdpSocket::bind(SocketAddr::from((Ipv4Addr::UNSPECIFIED, SACN_PORT))).await?;

        for universe in universes.clone() {
            socket.join_multicast_v4(multicast_group(universe), interface)?;
        }

        info!(
            "sACN receiver listening on universes {}-{} via {}",
            universes.start(),
            universes.end(),
            interface
        );

        Ok(Self {
            socket,
            buf: vec![0u8; 1144],
        })
    }

    /// Wait for the next datagram. Returns `None` for anything that is not a
    /// usable data packet.
    pub async fn recv(&mut self) -> io::Result<Option<DataPacket<'_>>> {
        let (len, from) = self.socket.recv_from(&mut self.buf).await?;

        match parse_data_packet(&self.buf[..len]) {
            Ok(packet) => Ok(Some(packet)),
            Err(e) => {
                debug!("Dropping datagram from {}: {}", from, e);
                Ok(None)
            }
        }
    }
}
