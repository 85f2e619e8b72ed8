//! Probing through the host's own tools: the `ping` binary and the kernel ARP table.
//!
//! Does not need raw sockets, so it works unprivileged. Each command runs with
//! `kill_on_drop`, so an abandoned probe does not leave a process behind.

use std::net::IpAddr;
use std::process::{Output, Stdio};
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::debug;

use lanwatch_common::config::PresenceConfig;
use lanwatch_common::error::ProbeError;
use lanwatch_common::network::mac;

use super::{ArpTable, NetworkProber};

#[cfg(target_os = "linux")]
const PROC_ARP_PATH: &str = "/proc/net/arp";

pub struct SystemProber {
    ping_timeout: Duration,
    helper_timeout: Duration,
}

impl SystemProber {
    pub fn new(cfg: &PresenceConfig) -> Self {
        Self {
            ping_timeout: cfg.ping_timeout,
            helper_timeout: cfg.helper_timeout,
        }
    }

    async fn run_ping(&self, target: &str) -> Result<Output, ProbeError> {
        if target.starts_with('-') || target.trim().is_empty() {
            return Err(ProbeError::execution(format!("refusing to ping '{target}'")));
        }
        let mut args: Vec<String> = ping_args(self.ping_timeout);
        args.push(target.to_string());
        // The OS-level wait covers the reply; name resolution gets the helper budget on top.
        run("ping", &args, self.ping_timeout + self.helper_timeout).await
    }
}

#[async_trait]
impl NetworkProber for SystemProber {
    async fn ping(&self, ip: IpAddr) -> Result<(), ProbeError> {
        let output = self.run_ping(&ip.to_string()).await?;
        if output.status.success() {
            Ok(())
        } else {
            Err(ProbeError::NoResponse)
        }
    }

    async fn ping_hostname(&self, hostname: &str) -> Result<IpAddr, ProbeError> {
        let output = self.run_ping(hostname).await?;
        if !output.status.success() {
            return Err(ProbeError::NoResponse);
        }
        let stdout = String::from_utf8_lossy(&output.stdout);
        let resolved = parse_ping_target(&stdout)
            .ok_or_else(|| ProbeError::unparseable("no address in ping header"))?;
        debug!(hostname, %resolved, "hostname resolved by ping");
        Ok(resolved)
    }

    async fn read_arp_table(&self) -> Result<ArpTable, ProbeError> {
        #[cfg(target_os = "linux")]
        {
            let read = timeout(self.helper_timeout, tokio::fs::read_to_string(PROC_ARP_PATH));
            match read.await {
                Ok(Ok(content)) => Ok(parse_proc_arp(&content)),
                Ok(Err(err)) => Err(ProbeError::execution(err)),
                Err(_elapsed) => Err(timed_out(self.helper_timeout)),
            }
        }
        #[cfg(not(target_os = "linux"))]
        {
            let args: Vec<String> = vec!["-a".to_string()];
            let output = run("arp", &args, self.helper_timeout).await?;
            Ok(parse_arp_output(&String::from_utf8_lossy(&output.stdout)))
        }
    }
}

async fn run(program: &str, args: &[String], limit: Duration) -> Result<Output, ProbeError> {
    let child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .output();

    match timeout(limit, child).await {
        Ok(Ok(output)) => Ok(output),
        Ok(Err(err)) => Err(ProbeError::execution(format!("{program}: {err}"))),
        Err(_elapsed) => Err(timed_out(limit)),
    }
}

fn timed_out(limit: Duration) -> ProbeError {
    ProbeError::Timeout {
        after_ms: u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
    }
}

#[cfg(target_os = "windows")]
fn ping_args(wait: Duration) -> Vec<String> {
    vec!["-n".into(), "1".into(), "-w".into(), wait.as_millis().max(1).to_string()]
}

#[cfg(target_os = "macos")]
fn ping_args(wait: Duration) -> Vec<String> {
    vec!["-c".into(), "1".into(), "-W".into(), wait.as_millis().max(1).to_string()]
}

#[cfg(not(any(target_os = "windows", target_os = "macos")))]
fn ping_args(wait: Duration) -> Vec<String> {
    let secs = wait.as_secs_f64().ceil().max(1.0);
    vec!["-c".into(), "1".into(), "-W".into(), format!("{secs:.0}")]
}

/// Extracts the address from a ping header such as `PING nas.lan (192.168.1.20) 56(84) bytes`
/// or `Pinging nas.lan [192.168.1.20] with 32 bytes`.
pub fn parse_ping_target(stdout: &str) -> Option<IpAddr> {
    let header = stdout
        .lines()
        .map(str::trim)
        .find(|line| line.starts_with("PING") || line.starts_with("Pinging"))?;

    header
        .split(|c: char| c.is_whitespace() || "()[]".contains(c))
        .skip(1)
        .find_map(|token| token.parse::<IpAddr>().ok())
}

/// Parses `/proc/net/arp`. Incomplete entries carry an all-zero MAC and are skipped.
pub fn parse_proc_arp(content: &str) -> ArpTable {
    content
        .lines()
        .skip(1)
        .filter_map(|line| {
            let columns: Vec<&str> = line.split_whitespace().collect();
            let ip: IpAddr = columns.first()?.parse().ok()?;
            let mac = mac::normalize(columns.get(3)?)?;
            Some((mac, ip))
        })
        .collect()
}

/// Parses `arp -a` in either the BSD/Linux form
/// (`host (192.168.1.1) at aa:bb:cc:dd:ee:ff [ether] on eth0`)
/// or the Windows form (`192.168.1.1   aa-bb-cc-dd-ee-ff   dynamic`).
pub fn parse_arp_output(stdout: &str) -> ArpTable {
    stdout
        .lines()
        .filter_map(|line| {
            let parts: Vec<&str> = line.split_whitespace().collect();
            let (ip_part, mac_part) = if parts.get(2) == Some(&"at") {
                (parts.get(1)?.trim_matches(|c| c == '(' || c == ')'), *parts.get(3)?)
            } else {
                (*parts.first()?, *parts.get(1)?)
            };
            let ip: IpAddr = ip_part.parse().ok()?;
            let mac = mac::normalize(mac_part)?;
            Some((mac, ip))
        })
        .collect()
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn ip(a: u8, b: u8, c: u8, d: u8) -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(a, b, c, d))
    }

    #[test]
    fn parse_ping_target_should_read_linux_header() {
        let out = "PING nas.lan (192.168.1.20) 56(84) bytes of data.\n64 bytes from 192.168.1.20: icmp_seq=1 ttl=64 time=0.4 ms\n";
        assert_eq!(parse_ping_target(out), Some(ip(192, 168, 1, 20)));
    }

    #[test]
    fn parse_ping_target_should_read_macos_header() {
        let out = "PING nas.local (10.0.0.7): 56 data bytes\n";
        assert_eq!(parse_ping_target(out), Some(ip(10, 0, 0, 7)));
    }

    #[test]
    fn parse_ping_target_should_read_windows_header() {
        let out = "\r\nPinging nas.lan [192.168.1.21] with 32 bytes of data:\r\nReply from 192.168.1.21";
        assert_eq!(parse_ping_target(out), Some(ip(192, 168, 1, 21)));
    }

    #[test]
    fn parse_ping_target_should_fail_without_header() {
        assert_eq!(parse_ping_target("ping: unknown host nas.lan"), None);
        assert_eq!(parse_ping_target(""), None);
    }

    #[test]
    fn parse_proc_arp_should_skip_header_and_incomplete_entries() {
        let content = "\
IP address       HW type     Flags       HW address            Mask     Device
192.168.1.1      0x1         0x2         aa:bb:cc:dd:ee:01     *        eth0
192.168.1.44     0x1         0x0         00:00:00:00:00:00     *        eth0
192.168.1.50     0x1         0x2         aa:bb:cc:dd:ee:32     *        wlan0
";
        let table = parse_proc_arp(content);
        assert_eq!(table.len(), 2);
        assert_eq!(table.get("AA:BB:CC:DD:EE:01"), Some(&ip(192, 168, 1, 1)));
        assert_eq!(table.get("AA:BB:CC:DD:EE:32"), Some(&ip(192, 168, 1, 50)));
    }

    #[test]
    fn parse_arp_output_should_read_bsd_format() {
        let out = "\
router.lan (192.168.1.1) at aa:bb:cc:dd:ee:1 [ether] on en0
? (192.168.1.77) at (incomplete) on en0
";
        let table = parse_arp_output(out);
        assert_eq!(table.len(), 1);
        assert_eq!(table.get("AA:BB:CC:DD:EE:01"), Some(&ip(192, 168, 1, 1)));
    }

    #[test]
    fn parse_arp_output_should_read_windows_format() {
        let out = "\
Interface: 192.168.1.5 --- 0x7
  Internet Address      Physical Address      Type
  192.168.1.1           aa-bb-cc-dd-ee-ff     dynamic
  192.168.1.255         ff-ff-ff-ff-ff-ff     static
";
        let table = parse_arp_output(out);
        assert_eq!(table.get("AA:BB:CC:DD:EE:FF"), Some(&ip(192, 168, 1, 1)));
        assert_eq!(table.get("FF:FF:FF:FF:FF:FF"), Some(&ip(192, 168, 1, 255)));
    }

    #[tokio::test]
    async fn ping_should_refuse_option_like_targets() {
        let prober = SystemProber::new(&PresenceConfig::default());
        let err = prober.ping_hostname("-f").await.unwrap_err();
        assert!(matches!(err, ProbeError::Execution { .. }));
    }
}
