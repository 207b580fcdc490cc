//! Trace id stitching
//!
//! A flow (one coroutine, or one thread when no coroutine is known) gets a
//! trace id the first time it touches a socket bound to the process'
//! listen port. Afterwards every write -> read transition on that port
//! starts a new exchange and bumps the id by one.

use crate::{helpers::ProbeHelpers, maps::TraceObjectMap, stats::Stats};
use dashmap::mapref::entry::Entry;
use hijack_common::{
    pack_trace_id, HookCtxKey, TraceObjectKey, TraceObjectValue, TracingConfig,
    STAT_TRACE_FLOWS_CREATED,
};

/// Trace id of the flow behind `key`, advanced for this call
///
/// Returns 0 when the process has no listen port or the flow has not been
/// established yet. The flow record stays locked for the whole
/// check-decide-update sequence.
pub fn fetch_trace_id<H: ProbeHelpers>(
    objects: &TraceObjectMap,
    helpers: &H,
    stats: &Stats,
    key: &HookCtxKey,
    cfg: &TracingConfig,
    local_port: u16,
) -> u64 {
    if cfg.listen_port == 0 {
        return 0;
    }

    let coid = helpers.ancestor_coroutine_id(key.tgid, key.pid);
    let flow_key = TraceObjectKey::new(key.tgid, key.pid, coid);
    let on_listen_port = cfg.listen_port == local_port;
    let is_current_read = key.func.is_read();

    let mut value = match objects.entry(flow_key) {
        Entry::Occupied(entry) => entry.into_ref(),
        Entry::Vacant(entry) => {
            if !on_listen_port {
                return 0;
            }

            let trace_id = pack_trace_id(
                flow_key.tgid,
                (flow_key.pid as u64).wrapping_add(flow_key.coid),
                helpers.current_cpu_id(),
                helpers.boot_time_ns(),
            );
            stats.increment(STAT_TRACE_FLOWS_CREATED);

            // The first call opens the exchange; it only records its direction.
            let value = entry.insert(TraceObjectValue {
                trace_id,
                last_socket_operation_is_read: is_current_read,
            });
            return value.trace_id;
        }
    };

    if !on_listen_port {
        return value.trace_id;
    }

    let is_last_write = !value.last_socket_operation_is_read;
    if is_last_write && is_current_read {
        value.trace_id = value.trace_id.wrapping_add(1);
    }
    value.last_socket_operation_is_read = is_current_read;

    value.trace_id
}
