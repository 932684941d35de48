use super::{AddressSlot, ProtocolType};
use crate::ensure;
use crate::protocol::ProbeError;

const PROXY_COMMAND: u8 = 0x21;
const VERSION_2: u8 = 0x2;

const TCP4: u8 = 0x11;
const UDP4: u8 = 0x12;
const TCP6: u8 = 0x21;
const UDP6: u8 = 0x22;

/// Reads a v2 block. `start` points at the command byte right after the
/// signature; the block length counts from the byte after the length field.
///
/// Returns the offset right after the block, or `None` while it is incomplete.
pub(super) fn read(
    data: &[u8],
    start: usize,
    capacity: usize,
    source: &mut AddressSlot,
    destination: &mut AddressSlot,
) -> Result<Option<usize>, ProbeError> {
    let Some(&[command, family, high, low]) = data.get(start..start + 4) else {
        return Ok(None);
    };

    ensure!(command >> 4 == VERSION_2, ProbeError::invalid_header("unsupported v2 version nibble"));

    let octets = usize::from(u16::from_be_bytes([high, low])) + 4;
    let end = start + octets;
    ensure!(end <= capacity, ProbeError::TooLarge { length: end, capacity });

    let Some(block) = data.get(start..end) else {
        return Ok(None);
    };

    if command == PROXY_COMMAND {
        read_addresses(block, start, family, source, destination)?;
    }

    Ok(Some(end))
}

fn read_addresses(
    block: &[u8],
    start: usize,
    family: u8,
    source: &mut AddressSlot,
    destination: &mut AddressSlot,
) -> Result<(), ProbeError> {
    let (protocol, width) = match family {
        TCP4 => (ProtocolType::Tcp4, 4),
        UDP4 => (ProtocolType::Udp4, 4),
        TCP6 => (ProtocolType::Tcp6, 16),
        UDP6 => (ProtocolType::Udp6, 16),
        _ => return Ok(()),
    };

    // source, destination, then the two ports
    let ports = 4 + 2 * width;
    ensure!(block.len() >= ports + 4, ProbeError::invalid_header("address block shorter than its family"));

    let source_port = u16::from_be_bytes([block[ports], block[ports + 1]]);
    let destination_port = u16::from_be_bytes([block[ports + 2], block[ports + 3]]);

    source.set(protocol, start + 4, width, source_port, true);
    destination.set(protocol, start + 4 + width, width, destination_port, true);
    Ok(())
}
