//! Uptime monitor scheduler and probe executors
//!
//! A single task ticks every 10 seconds, loads all non-paused monitors, and
//! dispatches one probe task per monitor. The due-check runs inside the
//! probe task, so the effective cadence is `max(interval, 10s)`. An
//! in-memory in-flight set keyed on monitor id keeps two probes from racing
//! on the same monitor.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use chrono::Utc;
use sqlx::SqlitePool;
use tokio::net::TcpStream;

use crate::db;
use crate::domain::{Monitor, MonitorCheck, MonitorStatus, MonitorType};

/// Scheduler wake-up cadence
pub const TICK_INTERVAL: Duration = Duration::from_secs(10);

/// Ports tried for ICMP-style reachability without raw sockets
const ICMP_FALLBACK_PORTS: [u16; 4] = [80, 443, 22, 8080];

/// Outcome of a single probe before persistence
#[derive(Debug, PartialEq, Eq)]
pub struct ProbeOutcome {
    pub status: MonitorStatus,
    pub status_code: i64,
    pub error_message: String,
}

impl ProbeOutcome {
    fn up() -> Self {
        Self {
            status: MonitorStatus::Up,
            status_code: 0,
            error_message: String::new(),
        }
    }

    fn down(error_message: impl Into<String>) -> Self {
        Self {
            status: MonitorStatus::Down,
            status_code: 0,
            error_message: error_message.into(),
        }
    }
}

/// Spawn the scheduler loop
pub fn spawn_monitor_scheduler(pool: SqlitePool) {
    tokio::spawn(run(pool));
}

async fn run(pool: SqlitePool) {
    tracing::info!("Starting uptime monitor scheduler");
    let client = reqwest::Client::new();
    let in_flight: Arc<Mutex<HashSet<String>>> = Arc::new(Mutex::new(HashSet::new()));
    let mut ticker = tokio::time::interval(TICK_INTERVAL);

    loop {
        ticker.tick().await;

        let monitors = match db::get_all_active_monitors(&pool).await {
            Ok(monitors) => monitors,
            Err(e) => {
                tracing::error!("Error fetching monitors: {}", e);
                continue;
            }
        };

        for monitor in monitors {
            // One probe per monitor at a time
            {
                let mut guard = in_flight.lock().unwrap_or_else(|e| e.into_inner());
                if !guard.insert(monitor.id.clone()) {
                    continue;
                }
            }

            let pool = pool.clone();
            let client = client.clone();
            let in_flight = Arc::clone(&in_flight);
            tokio::spawn(async move {
                let monitor_id = monitor.id.clone();
                process_monitor(&pool, &client, monitor).await;
                in_flight
                    .lock()
                    .unwrap_or_else(|e| e.into_inner())
                    .remove(&monitor_id);
            });
        }
    }
}

/// Run one probe if the monitor is due, record the check, and update the
/// monitor to match
async fn process_monitor(pool: &SqlitePool, client: &reqwest::Client, monitor: Monitor) {
    if !monitor.is_due(Utc::now()) {
        return;
    }

    let timeout = monitor.effective_timeout();
    let start = Instant::now();
    let outcome = execute_probe(client, &monitor, timeout).await;
    let elapsed_ms = start.elapsed().as_millis() as i64;

    let mut check = MonitorCheck::new(&monitor.id, outcome.status);
    check.response_time = elapsed_ms;
    check.status_code = outcome.status_code;
    check.error_message = outcome.error_message;

    if let Err(e) = db::insert_monitor_check(pool, &check).await {
        tracing::error!("Failed to insert check for monitor {}: {}", monitor.id, e);
    }
}

async fn execute_probe(
    client: &reqwest::Client,
    monitor: &Monitor,
    timeout: Duration,
) -> ProbeOutcome {
    match monitor.monitor_type {
        MonitorType::Http | MonitorType::Https => check_http(client, &monitor.url, timeout).await,
        MonitorType::Tcp => check_tcp(&monitor.url, timeout).await,
        MonitorType::Icmp => check_icmp(&monitor.url, timeout).await,
        MonitorType::Dns => check_dns(&monitor.url, timeout).await,
    }
}

/// GET the URL; up on any 2xx
async fn check_http(client: &reqwest::Client, url: &str, timeout: Duration) -> ProbeOutcome {
    match client.get(url).timeout(timeout).send().await {
        Ok(response) => {
            let code = response.status().as_u16() as i64;
            if response.status().is_success() {
                ProbeOutcome {
                    status: MonitorStatus::Up,
                    status_code: code,
                    error_message: String::new(),
                }
            } else {
                ProbeOutcome {
                    status: MonitorStatus::Down,
                    status_code: code,
                    error_message: response.status().to_string(),
                }
            }
        }
        Err(e) => ProbeOutcome::down(e.to_string()),
    }
}

/// Dial `host:port`; up when the connection is established
async fn check_tcp(target: &str, timeout: Duration) -> ProbeOutcome {
    match tokio::time::timeout(timeout, TcpStream::connect(target)).await {
        Ok(Ok(_)) => ProbeOutcome::up(),
        Ok(Err(e)) => ProbeOutcome::down(e.to_string()),
        Err(_) => ProbeOutcome::down("connection timed out"),
    }
}

/// ICMP needs raw sockets, so reachability is approximated by TCP dials on
/// a handful of common ports
async fn check_icmp(hostname: &str, timeout: Duration) -> ProbeOutcome {
    for port in ICMP_FALLBACK_PORTS {
        let target = format!("{}:{}", hostname, port);
        if let Ok(Ok(_)) = tokio::time::timeout(timeout, TcpStream::connect(&target)).await {
            return ProbeOutcome::up();
        }
    }
    ProbeOutcome::down("Host unreachable")
}

/// Resolve the hostname; up when at least one address comes back
async fn check_dns(hostname: &str, timeout: Duration) -> ProbeOutcome {
    let lookup = tokio::net::lookup_host((hostname, 0u16));
    match tokio::time::timeout(timeout, lookup).await {
        Ok(Ok(mut addrs)) => {
            if addrs.next().is_some() {
                ProbeOutcome::up()
            } else {
                ProbeOutcome::down("no addresses returned")
            }
        }
        Ok(Err(e)) => ProbeOutcome::down(e.to_string()),
        Err(_) => ProbeOutcome::down("lookup timed out"),
    }
}
