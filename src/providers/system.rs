//! Host metrics from the running system.
//!
//! CPU, memory, load, uptime and interface byte counters come from `sysinfo`.
//! Interface addresses and link state come from `getifaddrs(3)`, which `sysinfo`
//! does not expose. Collection blocks, so it runs on the blocking thread pool.

use std::collections::{BTreeMap, HashMap};
use std::net::Ipv4Addr;
use std::sync::{Arc, Mutex, PoisonError};
use sysinfo::{Networks, System};
use tracing::{debug, trace};

use crate::provider::MetricsProvider;
use crate::types::{InterfaceMetrics, MetricsSnapshot, STATUS_ACTIVE, STATUS_NO_CARRIER};
use crate::{LcdError, Result};

struct Sampler {
    system: System,
    networks: Networks,
}

/// Collects metrics for the local host.
pub struct SystemMetrics {
    sampler: Arc<Mutex<Sampler>>,
    descriptions: Arc<BTreeMap<String, String>>,
}

impl SystemMetrics {
    pub fn new() -> Self {
        Self::with_descriptions(BTreeMap::new())
    }

    /// Attach operator descriptions (`igb0` → `WAN`) used to classify interfaces.
    pub fn with_descriptions(descriptions: BTreeMap<String, String>) -> Self {
        debug!("Creating system metrics sampler ({} described interfaces)", descriptions.len());
        let sampler = Sampler {
            system: System::new(),
            networks: Networks::new_with_refreshed_list(),
        };
        Self {
            sampler: Arc::new(Mutex::new(sampler)),
            descriptions: Arc::new(descriptions),
        }
    }

    fn collect(
        sampler: &Mutex<Sampler>,
        descriptions: &BTreeMap<String, String>,
    ) -> Result<MetricsSnapshot> {
        let mut sampler = sampler.lock().unwrap_or_else(PoisonError::into_inner);
        sampler.system.refresh_cpu_all();
        sampler.system.refresh_memory();
        sampler.networks.refresh();

        let addresses = interface_addresses()
            .map_err(|e| LcdError::metrics_failed_with_source("getifaddrs failed", Box::new(e)))?;

        let mut interfaces: Vec<InterfaceMetrics> = sampler
            .networks
            .iter()
            .filter(|(name, _)| !name.starts_with("lo"))
            .map(|(name, data)| {
                let link = addresses.get(name.as_str()).copied().unwrap_or_default();
                let status = if link.running {
                    STATUS_ACTIVE
                } else {
                    STATUS_NO_CARRIER
                };
                InterfaceMetrics {
                    name: name.clone(),
                    description: descriptions.get(name).cloned().unwrap_or_default(),
                    status: status.to_string(),
                    ip: link.ipv4.map(|ip| ip.to_string()).unwrap_or_default(),
                    rx_bytes: data.total_received(),
                    tx_bytes: data.total_transmitted(),
                }
            })
            .collect();
        interfaces.sort_by(|a, b| a.name.cmp(&b.name));

        let load = System::load_average();
        let snapshot = MetricsSnapshot {
            hostname: System::host_name().unwrap_or_default(),
            cpu: f64::from(sampler.system.global_cpu_usage()),
            mem_used: sampler.system.used_memory(),
            mem_total: sampler.system.total_memory(),
            load_avg: [load.one, load.five, load.fifteen],
            uptime_secs: System::uptime(),
            interfaces,
        };
        trace!("Collected metrics for {} interfaces", snapshot.interfaces.len());
        Ok(snapshot)
    }
}

impl Default for SystemMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl MetricsProvider for SystemMetrics {
    async fn get_metrics(&mut self) -> Result<MetricsSnapshot> {
        let sampler = Arc::clone(&self.sampler);
        let descriptions = Arc::clone(&self.descriptions);
        tokio::task::spawn_blocking(move || Self::collect(&sampler, &descriptions))
            .await
            .map_err(|e| {
                LcdError::metrics_failed_with_source("metrics collection task failed", Box::new(e))
            })?
    }
}

/// Address and link state for one interface.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct LinkInfo {
    ipv4: Option<Ipv4Addr>,
    /// Up with carrier
    running: bool,
}

#[cfg(unix)]
fn interface_addresses() -> std::io::Result<HashMap<String, LinkInfo>> {
    use std::ffi::CStr;

    let mut head: *mut libc::ifaddrs = std::ptr::null_mut();
    // SAFETY: head is a valid out-pointer; the list is released below.
    if unsafe { libc::getifaddrs(&mut head) } != 0 {
        return Err(std::io::Error::last_os_error());
    }

    let mut links: HashMap<String, LinkInfo> = HashMap::new();
    let mut cursor = head;
    while !cursor.is_null() {
        // SAFETY: cursor is a node of the list returned by getifaddrs, which is still live.
        let entry = unsafe { &*cursor };
        cursor = entry.ifa_next;
        if entry.ifa_name.is_null() {
            continue;
        }

        // SAFETY: ifa_name is a NUL-terminated string owned by the list.
        let name = unsafe { CStr::from_ptr(entry.ifa_name) }.to_string_lossy().into_owned();
        let flags = entry.ifa_flags as libc::c_int;
        let link = links.entry(name).or_default();
        link.running |= flags & libc::IFF_UP != 0 && flags & libc::IFF_RUNNING != 0;

        if link.ipv4.is_none() && !entry.ifa_addr.is_null() {
            // SAFETY: ifa_addr is non-null and points to a sockaddr owned by the list.
            let family = unsafe { (*entry.ifa_addr).sa_family };
            if libc::c_int::from(family) == libc::AF_INET {
                // SAFETY: AF_INET entries carry a sockaddr_in.
                let addr = unsafe { &*(entry.ifa_addr as *const libc::sockaddr_in) };
                link.ipv4 = Some(Ipv4Addr::from(u32::from_be(addr.sin_addr.s_addr)));
            }
        }
    }

    // SAFETY: head came from getifaddrs and is freed exactly once.
    unsafe { libc::freeifaddrs(head) };
    Ok(links)
}

#[cfg(not(unix))]
fn interface_addresses() -> std::io::Result<HashMap<String, LinkInfo>> {
    Ok(HashMap::new())
}
