//! Shared constants for the probe and userspace
//!
//! Kernel ABI values are copied from the uapi headers so that neither side
//! needs libc.

// ============================================================================
// Table Sizes
// ============================================================================

/// Initial capacity of the per-process config table
pub const MAX_TRACED_PROCESSES: usize = 1024;

/// Initial capacity of the enter/exit correlation table
pub const MAX_HOOK_CONTEXTS: usize = 10240;

/// Initial capacity of the trace flow table
pub const MAX_TRACE_OBJECTS: usize = 10240;

/// Size of the buffer a regular file name is copied into.
/// One byte is reserved for the terminator, so names keep at most
/// `FILE_NAME_LEN_MAX - 1` bytes.
pub const FILE_NAME_LEN_MAX: usize = 64;

// ============================================================================
// File Modes (from linux/stat.h)
// ============================================================================

/// Mask of the file type bits in `i_mode`
pub const S_IFMT: u32 = 0o170000;

/// Socket
pub const S_IFSOCK: u32 = 0o140000;

/// Regular file
pub const S_IFREG: u32 = 0o100000;

/// Character device
pub const S_IFCHR: u32 = 0o020000;

/// FIFO / pipe
pub const S_IFIFO: u32 = 0o010000;

// ============================================================================
// Address Families (from linux/socket.h)
// ============================================================================

pub const AF_UNIX: u16 = 1;
pub const AF_INET: u16 = 2;
pub const AF_INET6: u16 = 10;

// ============================================================================
// Futex Operations (from linux/futex.h)
// ============================================================================

pub const FUTEX_WAIT: u32 = 0;
pub const FUTEX_LOCK_PI: u32 = 6;
pub const FUTEX_WAIT_BITSET: u32 = 9;
pub const FUTEX_WAIT_REQUEUE_PI: u32 = 11;
pub const FUTEX_LOCK_PI2: u32 = 13;

pub const FUTEX_PRIVATE_FLAG: u32 = 128;
pub const FUTEX_CLOCK_REALTIME: u32 = 256;

/// Strips the modifier flags from a futex op, leaving the command
pub const FUTEX_CMD_MASK: u32 = !(FUTEX_PRIVATE_FLAG | FUTEX_CLOCK_REALTIME);

/// Returns true for futex commands that block the caller
pub fn is_futex_wait_op(op: u32) -> bool {
    matches!(
        op & FUTEX_CMD_MASK,
        FUTEX_WAIT | FUTEX_WAIT_BITSET | FUTEX_WAIT_REQUEUE_PI | FUTEX_LOCK_PI | FUTEX_LOCK_PI2
    )
}

// ============================================================================
// Statistics Counter Indices
// ============================================================================

/// Raw enter observations seen by the dispatcher
pub const STAT_ENTER_EVENTS: u32 = 0;

/// Raw exit observations seen by the dispatcher
pub const STAT_EXIT_EVENTS: u32 = 1;

/// Invocation contexts written on enter
pub const STAT_CONTEXTS_STORED: u32 = 2;

/// Enters that replaced an unmatched context for the same key
pub const STAT_CONTEXTS_OVERWRITTEN: u32 = 3;

/// Exits of traced processes with no stored context
pub const STAT_UNMATCHED_EXITS: u32 = 4;

/// Events handed to the sink
pub const STAT_EVENTS_EMITTED: u32 = 5;

/// Events dropped by a disabled per-kind flag or a non-positive socket return
pub const STAT_EVENTS_SUPPRESSED: u32 = 6;

/// Descriptors the resolver could not describe
pub const STAT_UNRESOLVED_FDS: u32 = 7;

/// Socket events dropped for an unsupported address family
pub const STAT_UNSUPPORTED_FAMILY: u32 = 8;

/// Trace flows created on first touch
pub const STAT_TRACE_FLOWS_CREATED: u32 = 9;

/// Total number of statistics counters
pub const MAX_STATS: u32 = 10;
