//! Entry id and timestamp helpers.
//!
//! Store object ids are built from a 16-bit replica id and a 48-bit global counter whose
//! bytes are laid out big-endian in memory. The layout of the combined 64-bit id therefore
//! depends on the host byte order, which is fixed at compile time.

/// Seconds between 1601-01-01 and 1970-01-01.
const NT_EPOCH_OFFSET: i64 = 11_644_473_600;
const TICKS_PER_SECOND: u64 = 10_000_000;

/// Convert a counter value to its in-memory GC representation.
pub fn value_to_gc(value: u64) -> u64 {
    (value << 16).to_be()
}

pub fn gc_to_value(gc: u64) -> u64 {
    u64::from_be(gc) >> 16
}

/// Combine a replica id and a GC value into an entry id.
pub fn make_eid(replid: u16, gc: u64) -> u64 {
    let shift = if cfg!(target_endian = "big") { 0 } else { 16 };
    u64::from(replid) | (gc << shift)
}

pub fn make_eid_ex(replid: u16, value: u64) -> u64 {
    make_eid(replid, value_to_gc(value))
}

/// Convert an NT timestamp (100ns ticks since 1601) to unix seconds.
pub fn nx_time(nt: u64) -> i64 {
    (nt / TICKS_PER_SECOND) as i64 - NT_EPOCH_OFFSET
}

/// Convert unix seconds to an NT timestamp, clamping to the representable range.
pub fn nt_time(unix: i64) -> u64 {
    let secs = unix.saturating_add(NT_EPOCH_OFFSET).max(0) as u64;
    secs.saturating_mul(TICKS_PER_SECOND)
}

pub fn nt_now() -> u64 {
    nt_time(chrono::Utc::now().timestamp())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gc_value_inverse() {
        for value in [0, 1, 0x1234, 0xFFFF_FFFF_FFFF] {
            assert_eq!(gc_to_value(value_to_gc(value)), value);
        }
    }

    #[test]
    #[cfg(target_endian = "little")]
    fn public_folder_ids() {
        assert_eq!(make_eid_ex(1, 1), 0x0100_0000_0000_0001);
        assert_eq!(make_eid_ex(1, 2), 0x0200_0000_0000_0001);
        assert_eq!(value_to_gc(0x1234).to_ne_bytes(), [0, 0, 0, 0, 0x12, 0x34, 0, 0]);
    }

    #[test]
    fn nt_unix_conversion() {
        assert_eq!(nt_time(0), 116_444_736_000_000_000);
        assert_eq!(nx_time(116_444_736_000_000_000), 0);
        assert_eq!(nx_time(nt_time(1_600_000_000)), 1_600_000_000);
        assert_eq!(nt_time(-NT_EPOCH_OFFSET - 1), 0);
    }

    #[test]
    fn nt_time_saturates() {
        assert_eq!(nt_time(i64::MAX / 2), u64::MAX);
        assert_eq!(nt_time(i64::MAX), u64::MAX);
        assert_eq!(nt_time(i64::MIN), 0);
    }
}
