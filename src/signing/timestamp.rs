//! Time claims from an NTP server.
//!
//! Release manifests and `TIMESTAMP.txt` record a time taken from an NTP
//! server (SNTP v3 client mode). When the server cannot be reached the
//! system clock is used instead and the failure is reported.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use std::fmt::Write as _;
use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use std::time::{Duration, Instant};

pub const DEFAULT_NTP_SERVER: &str = "time.google.com";
pub const NTP_PORT: u16 = 123;
pub const TIMESTAMP_FILE: &str = "TIMESTAMP.txt";
pub const NTP_TIMEOUT: Duration = Duration::from_secs(5);

/// Seconds from 1900-01-01 (NTP era 0) to 1970-01-01.
const NTP_UNIX_OFFSET: i64 = 2_208_988_800;
const PACKET_LEN: usize = 48;
/// LI 0, version 3, mode 3 (client).
const CLIENT_HEADER: u8 = 0x1b;

/// Fields of a server reply.
#[derive(Debug, Clone, PartialEq)]
pub struct NtpPacket {
    pub leap_indicator: u8,
    pub version: u8,
    pub stratum: u8,
    /// log2 seconds
    pub precision: i8,
    /// seconds
    pub root_delay: f64,
    pub transmit: DateTime<Utc>,
}

/// A successful query.
#[derive(Debug, Clone)]
pub struct NtpReading {
    pub server: String,
    pub address: SocketAddr,
    pub response: Duration,
    pub packet: NtpPacket,
}

#[derive(Debug, Clone)]
pub enum TimeSource {
    Ntp(NtpReading),
    /// System clock; `error` is set when an NTP query was attempted.
    System {
        server: Option<String>,
        error: Option<String>,
    },
}

/// A point in time and where it came from.
#[derive(Debug, Clone)]
pub struct TimeClaim {
    pub time: DateTime<Utc>,
    pub source: TimeSource,
}

/// Decode a 48-byte (or longer) server reply.
pub fn parse_response(packet: &[u8]) -> Result<NtpPacket> {
    if packet.len() < PACKET_LEN {
        bail!("NTP reply too short ({} bytes)", packet.len());
    }
    let word = |at: usize| {
        u32::from_be_bytes([packet[at], packet[at + 1], packet[at + 2], packet[at + 3]])
    };

    let mode = packet[0] & 0x7;
    if mode != 4 {
        bail!("NTP reply has mode {}, expected 4 (server)", mode);
    }
    let stratum = packet[1];
    if stratum == 0 {
        bail!("NTP server sent a kiss-of-death reply");
    }
    let seconds = word(40);
    if seconds == 0 {
        bail!("NTP reply has no transmit timestamp");
    }

    let fraction = word(44);
    let nanos = ((u64::from(fraction) * 1_000_000_000) >> 32) as u32;
    let unix = i64::from(seconds) - NTP_UNIX_OFFSET;
    let transmit = DateTime::from_timestamp(unix, nanos)
        .with_context(|| format!("NTP transmit time {} is out of range", seconds))?;

    Ok(NtpPacket {
        leap_indicator: packet[0] >> 6,
        version: (packet[0] >> 3) & 0x7,
        stratum,
        precision: packet[3] as i8,
        root_delay: f64::from(word(4)) / 65536.0,
        transmit,
    })
}

fn resolve(server: &str) -> Result<SocketAddr> {
    let with_port = if server.contains(':') {
        server.to_socket_addrs()
    } else {
        (server, NTP_PORT).to_socket_addrs()
    };
    with_port
        .with_context(|| format!("Cannot resolve {}", server))?
        .next()
        .with_context(|| format!("{} resolved to no addresses", server))
}

/// Ask `server` (`host` or `host:port`) for the time.
pub fn query_ntp(server: &str, timeout: Duration) -> Result<NtpReading> {
    let address = resolve(server)?;
    let bind = if address.is_ipv6() { "[::]:0" } else { "0.0.0.0:0" };
    let socket = UdpSocket::bind(bind).context("Cannot open UDP socket")?;
    socket.set_read_timeout(Some(timeout))?;
    socket
        .connect(address)
        .with_context(|| format!("Cannot reach {}", address))?;

    let mut request = [0u8; PACKET_LEN];
    request[0] = CLIENT_HEADER;

    let started = Instant::now();
    socket
        .send(&request)
        .with_context(|| format!("Failed to send NTP query to {}", address))?;
    let mut reply = [0u8; 512];
    let len = socket
        .recv(&mut reply)
        .with_context(|| format!("No NTP reply from {}", address))?;
    let response = started.elapsed();

    let packet = parse_response(&reply[..len])?;
    tracing::debug!(
        "ntp {} ({}): stratum {} in {:?}",
        server,
        address,
        packet.stratum,
        response
    );
    Ok(NtpReading {
        server: server.to_string(),
        address,
        response,
        packet,
    })
}

/// Time from `server`, or the system clock when `server` is `None` or the
/// query fails. A failed query prints a warning.
pub fn claim_time(server: Option<&str>, timeout: Duration) -> TimeClaim {
    let Some(server) = server else {
        return TimeClaim {
            time: Utc::now(),
            source: TimeSource::System {
                server: None,
                error: None,
            },
        };
    };

    match query_ntp(server, timeout) {
        Ok(reading) => TimeClaim {
            time: reading.packet.transmit,
            source: TimeSource::Ntp(reading),
        },
        Err(e) => {
            let error = format!("{:#}", e);
            tracing::warn!("ntp query to {} failed: {}", server, error);
            println!("  [WARN] NTP query to {} failed: {}", server, error);
            println!("  [WARN] Falling back to system time");
            TimeClaim {
                time: Utc::now(),
                source: TimeSource::System {
                    server: Some(server.to_string()),
                    error: Some(error),
                },
            }
        }
    }
}

impl TimeClaim {
    pub fn is_ntp(&self) -> bool {
        matches!(self.source, TimeSource::Ntp(_))
    }

    /// RFC 3339 in UTC with a `Z` suffix, whole seconds.
    pub fn rfc3339(&self) -> String {
        self.time.to_rfc3339_opts(SecondsFormat::Secs, true)
    }

    /// Text of `TIMESTAMP.txt`.
    pub fn report(&self) -> String {
        let t = self.time;
        let mut out = String::new();
        let _ = writeln!(out, "TIMESTAMP ARCHIVE FILE");
        let _ = writeln!(out, "Generated: {}", Utc::now().format("%Y-%m-%d %H:%M:%S UTC"));
        let _ = writeln!(out);
        let _ = writeln!(out, "=== NTP SERVER TELEMETRY ===");
        match &self.source {
            TimeSource::Ntp(reading) => {
                let p = &reading.packet;
                let _ = writeln!(out, "Server Hostname: {}", reading.server);
                let _ = writeln!(out, "Server IP Address: {}", reading.address.ip());
                let _ = writeln!(out, "Query Success: Yes");
                let _ = writeln!(
                    out,
                    "Response Time: {:.2} ms",
                    reading.response.as_secs_f64() * 1000.0
                );
                let _ = writeln!(out, "Stratum Level: {} (distance from reference clock)", p.stratum);
                let _ = writeln!(out, "Precision: {} (log2 seconds)", p.precision);
                let _ = writeln!(out, "Root Delay: {:.6} seconds", p.root_delay);
                let _ = writeln!(out, "NTP Version: {}", p.version);
                let _ = writeln!(out, "Leap Indicator: {}", p.leap_indicator);
            }
            TimeSource::System { server, error } => {
                let _ = writeln!(
                    out,
                    "Server Hostname: {}",
                    server.as_deref().unwrap_or("N/A (NTP disabled)")
                );
                let _ = writeln!(out, "Query Success: No (using system time)");
                if let Some(error) = error {
                    let _ = writeln!(out, "Error Details: {}", error);
                }
            }
        }
        let _ = writeln!(out);
        let _ = writeln!(out, "=== EPOCH FORMATS ===");
        let _ = writeln!(out, "Unix Epoch (seconds): {}", t.timestamp());
        let _ = writeln!(out, "Unix Epoch (milliseconds): {}", t.timestamp_millis());
        let _ = writeln!(out, "Unix Epoch (microseconds): {}", t.timestamp_micros());
        let _ = writeln!(out);
        let _ = writeln!(out, "=== HUMAN READABLE FORMATS ===");
        let _ = writeln!(out, "ISO 8601 Format: {}", t.to_rfc3339_opts(SecondsFormat::Micros, true));
        let _ = writeln!(out, "RFC 2822 Format: {}", t.format("%a, %d %b %Y %H:%M:%S +0000"));
        let _ = writeln!(out, "Standard Format: {}", t.format("%Y-%m-%d %H:%M:%S UTC"));
        let _ = writeln!(out, "Compact Format: {}", t.format("%Y%m%d_%H%M%S"));
        out
    }
}
