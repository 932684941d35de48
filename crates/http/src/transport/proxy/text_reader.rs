use super::{AddressSlot, ProtocolType};

/// Reads a v1 line, `PROXY <TCP4|TCP6|UNKNOWN> <src> <dst> <sport> <dport>\r\n`.
///
/// `start` points just past the `PROXY` signature. Returns the offset right
/// after the terminating CRLF, or `None` while the terminator is missing.
/// A line that does not follow the grammar is still skipped whole, its
/// endpoints stay unknown.
pub(super) fn read(
    data: &[u8],
    start: usize,
    source: &mut AddressSlot,
    destination: &mut AddressSlot,
) -> Option<usize> {
    let line_end = start + data.get(start..)?.windows(2).position(|window| window == b"\r\n")?;
    read_fields(data, start, line_end, source, destination);
    Some(line_end + 2)
}

fn read_fields(data: &[u8], start: usize, end: usize, source: &mut AddressSlot, destination: &mut AddressSlot) {
    let Some(line) = data[start..end].strip_prefix(b" ") else {
        return;
    };

    let mut fields = line.split(|byte| *byte == b' ').scan(start + 1, |offset, field| {
        let at = *offset;
        *offset += field.len() + 1;
        Some((at, field))
    });

    let protocol = match fields.next() {
        Some((_, b"TCP4")) => ProtocolType::Tcp4,
        Some((_, b"TCP6")) => ProtocolType::Tcp6,
        _ => return,
    };

    let (Some(src), Some(dst), Some((_, sport)), Some((_, dport))) =
        (fields.next(), fields.next(), fields.next(), fields.next())
    else {
        return;
    };

    let (Some(sport), Some(dport)) = (port(sport), port(dport)) else {
        return;
    };

    source.set(protocol, src.0, src.1.len(), sport, false);
    destination.set(protocol, dst.0, dst.1.len(), dport, false);
}

fn port(digits: &[u8]) -> Option<u16> {
    if digits.is_empty() {
        return None;
    }

    digits.iter().try_fold(0u16, |port, byte| {
        let digit = byte.checked_sub(b'0').filter(|digit| *digit < 10)?;
        port.checked_mul(10)?.checked_add(u16::from(digit))
    })
}
