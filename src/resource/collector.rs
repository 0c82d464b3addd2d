//! System statistics for `MSG.RSRC` messages.
//!
//! CPU and memory figures are moving averages over the last few samples;
//! disks and network ports are a snapshot taken when the message is built.

use std::collections::VecDeque;

use sysinfo::{Disks, Networks, System};
use tracing::trace;

use crate::message::Message;
use crate::utils::{GmsecError, Result};

pub const OPER_SYS_FIELD: &str = "OPER-SYS";

/// Prefixes of the numbered fields; cleared before each refill so a
/// vanished disk or port does not linger.
const INDEXED_PREFIXES: [&str; 3] = ["CPU.", "DISK.", "NET-PORT."];

const MB: u64 = 1024 * 1024;

/// How many samples a moving average spans, `average / sample`.
pub fn moving_samples(sample_interval: u16, average_interval: u16) -> Result<usize> {
    if sample_interval < 1 {
        return Err(GmsecError::illegal_argument(
            "A sample interval of zero was specified",
        ));
    }
    if average_interval < sample_interval {
        return Err(GmsecError::illegal_argument(
            "A moving average interval less than the sample interval was specified",
        ));
    }
    Ok(usize::from(average_interval / sample_interval))
}

/// The operating system, e.g. `Linux 22.04 Ubuntu`.
pub fn os_version() -> String {
    System::long_os_version().unwrap_or_else(|| std::env::consts::OS.to_string())
}

#[derive(Debug, Clone, Default, PartialEq)]
struct Sample {
    cpu_total: f32,
    cpus: Vec<f32>,
    mem_total: u64,
    mem_avail: u64,
    swap_total: u64,
    swap_free: u64,
}

pub struct ResourceCollector {
    system: System,
    disks: Disks,
    networks: Networks,
    samples: VecDeque<Sample>,
    window: usize,
}

impl ResourceCollector {
    /// A collector averaging over the last `window` samples (at least one).
    pub fn new(window: usize) -> Self {
        Self {
            system: System::new(),
            disks: Disks::new_with_refreshed_list(),
            networks: Networks::new_with_refreshed_list(),
            samples: VecDeque::new(),
            window: window.max(1),
        }
    }

    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    /// Takes a CPU and memory sample.
    pub fn sample(&mut self) {
        self.system.refresh_cpu();
        self.system.refresh_memory();

        let sample = Sample {
            cpu_total: self.system.global_cpu_info().cpu_usage(),
            cpus: self.system.cpus().iter().map(|cpu| cpu.cpu_usage()).collect(),
            mem_total: self.system.total_memory(),
            mem_avail: self.system.available_memory(),
            swap_total: self.system.total_swap(),
            swap_free: self.system.free_swap(),
        };
        trace!("Resource sample: {:?}", sample);

        self.samples.push_back(sample);
        while self.samples.len() > self.window {
            self.samples.pop_front();
        }
    }

    /// Fills `msg` with the averaged CPU and memory figures plus a disk and
    /// network snapshot. Takes a sample first if none was taken yet.
    pub fn add_to(&mut self, msg: &mut Message) -> Result<()> {
        if self.samples.is_empty() {
            self.sample();
        }
        clear_indexed_fields(msg);

        let avg = self.average();
        msg.add_field("NUM-OF-CPUS", count_u16(avg.cpus.len()))?;
        for (i, util) in avg.cpus.iter().enumerate() {
            msg.add_field(&format!("CPU.{}.UTIL", i + 1), *util)?;
        }
        msg.add_field("CPU.TOTAL.UTIL", avg.cpu_total)?;

        msg.add_field("MEM.UTIL", percent_used(avg.mem_total, avg.mem_avail))?;
        msg.add_field("MEM.PHYSICAL.TOTAL", avg.mem_total / MB)?;
        msg.add_field("MEM.PHYSICAL.AVAIL", avg.mem_avail / MB)?;
        msg.add_field("MEM.VIRTUAL.TOTAL", avg.swap_total / MB)?;
        msg.add_field("MEM.VIRTUAL.AVAIL", avg.swap_free / MB)?;

        self.add_disks(msg)?;
        self.add_network_ports(msg)
    }

    fn add_disks(&mut self, msg: &mut Message) -> Result<()> {
        self.disks.refresh();
        let disks = self.disks.list();

        msg.add_field("NUM-OF-DISKS", count_u16(disks.len()))?;
        for (i, disk) in disks.iter().enumerate() {
            let n = i + 1;
            let total = disk.total_space();
            msg.add_field(
                &format!("DISK.{n}.NAME"),
                disk.mount_point().to_string_lossy().into_owned(),
            )?;
            msg.add_field(&format!("DISK.{n}.SIZE"), total / MB)?;
            msg.add_field(
                &format!("DISK.{n}.UTIL"),
                percent_used(total, disk.available_space()),
            )?;
        }
        Ok(())
    }

    fn add_network_ports(&mut self, msg: &mut Message) -> Result<()> {
        self.networks.refresh();
        let mut ports: Vec<_> = self.networks.iter().collect();
        ports.sort_by(|a, b| a.0.cmp(b.0));

        msg.add_field("NUM-OF-NET-PORTS", count_u16(ports.len()))?;
        for (i, (name, data)) in ports.into_iter().enumerate() {
            let prefix = format!("NET-PORT.{}", i + 1);
            msg.add_field(&format!("{prefix}.NAME"), name.as_str())?;
            msg.add_field(&format!("{prefix}.EUI-ADR"), data.mac_address().to_string())?;
            msg.add_field(&format!("{prefix}.BYTES-SENT"), data.total_transmitted())?;
            msg.add_field(&format!("{prefix}.BYTES-RECEIVED"), data.total_received())?;
            msg.add_field(&format!("{prefix}.MSGS-SENT"), data.total_packets_transmitted())?;
            msg.add_field(&format!("{prefix}.MSGS-RECEIVED"), data.total_packets_received())?;
            msg.add_field(
                &format!("{prefix}.ERRORS"),
                data.total_errors_on_received() + data.total_errors_on_transmitted(),
            )?;
        }
        Ok(())
    }

    fn average(&self) -> Sample {
        average(&self.samples)
    }
}

fn average(samples: &VecDeque<Sample>) -> Sample {
    if samples.is_empty() {
        return Sample::default();
    }
    let cpu_count = samples.iter().map(|s| s.cpus.len()).min().unwrap_or(0);

    Sample {
        cpu_total: mean_f32(samples, |s| s.cpu_total),
        cpus: (0..cpu_count).map(|i| mean_f32(samples, |s| s.cpus[i])).collect(),
        mem_total: mean_u64(samples, |s| s.mem_total),
        mem_avail: mean_u64(samples, |s| s.mem_avail),
        swap_total: mean_u64(samples, |s| s.swap_total),
        swap_free: mean_u64(samples, |s| s.swap_free),
    }
}

fn mean_f32(samples: &VecDeque<Sample>, f: impl Fn(&Sample) -> f32) -> f32 {
    samples.iter().map(f).sum::<f32>() / samples.len() as f32
}

fn mean_u64(samples: &VecDeque<Sample>, f: impl Fn(&Sample) -> u64) -> u64 {
    samples.iter().map(f).sum::<u64>() / samples.len() as u64
}

fn percent_used(total: u64, available: u64) -> f32 {
    if total == 0 {
        return 0.0;
    }
    (total.saturating_sub(available) as f64 / total as f64 * 100.0) as f32
}

fn count_u16(count: usize) -> u16 {
    u16::try_from(count).unwrap_or(u16::MAX)
}

fn clear_indexed_fields(msg: &mut Message) {
    let stale: Vec<String> = msg
        .fields()
        .map(|field| field.name())
        .filter(|name| INDEXED_PREFIXES.iter().any(|prefix| name.starts_with(prefix)))
        .map(str::to_string)
        .collect();
    for name in stale {
        msg.clear_field(&name);
    }
}
