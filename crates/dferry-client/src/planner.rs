//! Chunk-size planning
//!
//! The chunk size is decided once per transfer from the total size and never
//! changes afterwards. Tiers are compared on whole MiB, largest first:
//!
//! | total ≥ | chunk |
//! |---|---|
//! | 500 MiB | 100 MiB |
//! | 250 MiB |  50 MiB |
//! | 100 MiB |  20 MiB |
//! | else    |   5 MiB |

pub const MIB: u64 = 1024 * 1024;

/// Map a total transfer size to its fixed chunk size.
pub fn plan_chunk_size(total_size: u64) -> u64 {
    let size_in_mib = total_size / MIB;
    if size_in_mib >= 500 {
        100 * MIB
    } else if size_in_mib >= 250 {
        50 * MIB
    } else if size_in_mib >= 100 {
        20 * MIB
    } else {
        5 * MIB
    }
}
