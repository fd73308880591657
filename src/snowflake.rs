use core::hash::Hash;

/// Bit layout of a snowflake id, most to least significant:
/// `timestamp | datacenter_id | worker_id | sequence`.
pub trait Snowflake:
    Copy + Clone + PartialOrd + Ord + PartialEq + Eq + Hash + std::fmt::Debug
{
    fn from_component_parts(
        timestamp_offset: u64,
        datacenter_id: u64,
        worker_id: u64,
        sequence: u64,
    ) -> Self;

    fn id(&self) -> u64;

    fn timestamp(&self) -> u64 {
        (self.id() >> Self::timestamp_shift()) & Self::timestamp_mask()
    }

    fn timestamp_with_epoch(&self, epoch: i64) -> i64 {
        (self.timestamp() as i64) + epoch
    }

    /// `None` if `epoch` pushes the result past `i64::MAX`.
    fn checked_timestamp_with_epoch(&self, epoch: i64) -> Option<i64> {
        (self.timestamp() as i64).checked_add(epoch)
    }

    fn datacenter_id(&self) -> u64 {
        (self.id() >> Self::datacenter_id_shift()) & Self::datacenter_id_mask()
    }

    fn worker_id(&self) -> u64 {
        (self.id() >> Self::worker_id_shift()) & Self::worker_id_mask()
    }

    fn sequence(&self) -> u64 {
        self.id() & Self::sequence_mask()
    }

    /// True when no bit outside the layout (including the sign bit) is set.
    fn is_valid(&self) -> bool {
        (self.id() & !Self::valid_mask()) == 0
    }

    fn timestamp_bits() -> u64;
    fn datacenter_id_bits() -> u64;
    fn worker_id_bits() -> u64;
    fn sequence_bits() -> u64;

    fn timestamp_mask() -> u64 {
        (1u64 << Self::timestamp_bits()) - 1
    }

    fn datacenter_id_mask() -> u64 {
        (1u64 << Self::datacenter_id_bits()) - 1
    }

    fn worker_id_mask() -> u64 {
        (1u64 << Self::worker_id_bits()) - 1
    }

    fn sequence_mask() -> u64 {
        (1u64 << Self::sequence_bits()) - 1
    }

    fn valid_mask() -> u64 {
        (Self::timestamp_mask() << Self::timestamp_shift())
            | (Self::datacenter_id_mask() << Self::datacenter_id_shift())
            | (Self::worker_id_mask() << Self::worker_id_shift())
            | Self::sequence_mask()
    }

    fn worker_id_shift() -> u64 {
        Self::sequence_bits()
    }

    fn datacenter_id_shift() -> u64 {
        Self::sequence_bits() + Self::worker_id_bits()
    }

    fn timestamp_shift() -> u64 {
        Self::sequence_bits() + Self::worker_id_bits() + Self::datacenter_id_bits()
    }

    fn max_timestamp() -> i64 {
        Self::timestamp_mask() as i64
    }

    fn max_worker_id() -> u64 {
        Self::worker_id_mask()
    }

    fn max_datacenter_id() -> u64 {
        Self::datacenter_id_mask()
    }

    fn max_sequence() -> u64 {
        Self::sequence_mask()
    }
}
