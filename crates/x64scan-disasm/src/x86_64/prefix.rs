//! Legacy and REX prefix scanning.

use x64scan_core::{PrefixSet, RepeatKind, Rex, Segment};

use crate::cursor::ByteCursor;

/// Returns true for the eleven legacy prefix bytes.
pub fn is_legacy_prefix(byte: u8) -> bool {
    matches!(
        byte,
        0x26 | 0x2E | 0x36 | 0x3E | 0x64 | 0x65 | 0x66 | 0x67 | 0xF0 | 0xF2 | 0xF3
    )
}

/// Records one legacy prefix byte, overwriting the previous value of its group.
fn apply_legacy(prefixes: &mut PrefixSet, byte: u8) {
    match byte {
        0x66 => prefixes.operand_size = true,
        0x67 => prefixes.address_size = true,
        0xF0 => prefixes.lock = true,
        0xF2 => prefixes.repeat = RepeatKind::Repnz,
        0xF3 => prefixes.repeat = RepeatKind::Rep,
        0x26 => prefixes.segment = Some(Segment::ES),
        0x2E => prefixes.segment = Some(Segment::CS),
        0x36 => prefixes.segment = Some(Segment::SS),
        0x3E => prefixes.segment = Some(Segment::DS),
        0x64 => prefixes.segment = Some(Segment::FS),
        0x65 => prefixes.segment = Some(Segment::GS),
        _ => {}
    }
}

/// Consumes legacy prefixes and an optional REX byte.
///
/// Scanning stops right after a REX byte, so a prefix-shaped byte following
/// REX is left for the opcode stage. Never fails: running out of input just
/// ends the scan, and the opcode read reports the truncation.
pub fn scan_prefixes(cursor: &mut ByteCursor<'_>) -> PrefixSet {
    let mut prefixes = PrefixSet::default();

    while let Ok(byte) = cursor.peek() {
        let rex = Rex::is_rex(byte);
        if rex {
            prefixes.rex = Some(Rex::from_byte(byte));
        } else if is_legacy_prefix(byte) {
            apply_legacy(&mut prefixes, byte);
        } else {
            break;
        }
        if cursor.advance(1).is_err() || rex {
            break;
        }
    }

    prefixes
}
