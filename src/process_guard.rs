//! Child process lifecycle management
//!
//! Provisioning tools (`apt-get`, `letsencrypt`, `openssl dhparam`) keep
//! mutating the system if they outlive us. Every child is therefore spawned
//! in its own process group with a parent-death signal, and its PID is kept
//! in a `ChildRegistry` until it exits.
//!
//! The registry is a plain value shared through `SharedRegistry`; `main`
//! creates one and hands clones to the process runner and the signal thread.

use nix::libc;
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Registry handle shared between the runner and the signal thread
pub type SharedRegistry = Arc<Mutex<ChildRegistry>>;

/// Tracks the process groups of running children
#[derive(Debug, Default)]
pub struct ChildRegistry {
    pids: HashSet<u32>,
}

impl ChildRegistry {
    pub fn shared() -> SharedRegistry {
        Arc::new(Mutex::new(Self::default()))
    }

    pub fn register(&mut self, pid: u32) {
        self.pids.insert(pid);
        tracing::debug!("Registered child process PID {}", pid);
    }

    pub fn unregister(&mut self, pid: u32) {
        self.pids.remove(&pid);
        tracing::debug!("Unregistered child process PID {}", pid);
    }

    pub fn count(&self) -> usize {
        self.pids.len()
    }

    /// SIGTERM every tracked group, SIGKILL whatever survives `grace_period`.
    pub fn terminate_all(&mut self, grace_period: Duration) {
        let pids: Vec<u32> = self.pids.drain().collect();
        if pids.is_empty() {
            return;
        }

        tracing::info!("Terminating {} child process(es)", pids.len());
        for &pid in &pids {
            terminate_group(pid, grace_period);
        }
    }
}

/// SIGTERM the process group led by `pgid`, then SIGKILL after `grace_period`.
pub fn terminate_group(pgid: u32, grace_period: Duration) {
    if let Err(e) = send_signal_to_group(pgid, Signal::SIGTERM) {
        tracing::debug!("SIGTERM to process group {} failed: {}", pgid, e);
        return;
    }

    let start = Instant::now();
    while start.elapsed() < grace_period {
        if !is_process_alive(pgid) {
            return;
        }
        std::thread::sleep(Duration::from_millis(50));
    }

    tracing::warn!("Process group {} ignored SIGTERM, sending SIGKILL", pgid);
    if let Err(e) = send_signal_to_group(pgid, Signal::SIGKILL) {
        tracing::error!("SIGKILL to process group {} failed: {}", pgid, e);
    }
}

fn send_signal_to_group(pgid: u32, signal: Signal) -> Result<(), nix::Error> {
    signal::kill(Pid::from_raw(-(pgid as i32)), signal)
}

/// Alive means the PID exists and is neither zombie nor dead
fn is_process_alive(pid: u32) -> bool {
    if signal::kill(Pid::from_raw(pid as i32), None).is_err() {
        return false;
    }

    match std::fs::read_to_string(format!("/proc/{}/stat", pid)) {
        Ok(stat) => stat
            .rsplit_once(')')
            .and_then(|(_, rest)| rest.split_whitespace().next())
            .is_some_and(|state| !matches!(state, "Z" | "X")),
        Err(_) => true,
    }
}

/// Terminate tracked children on SIGINT, SIGTERM or SIGHUP, then exit with
/// `128 + signal`.
pub fn init_signal_handlers(registry: SharedRegistry) -> Result<(), std::io::Error> {
    use signal_hook::consts::signal::{SIGHUP, SIGINT, SIGTERM};
    use signal_hook::iterator::Signals;

    let mut signals = Signals::new([SIGINT, SIGTERM, SIGHUP])?;

    std::thread::spawn(move || {
        if let Some(sig) = signals.forever().next() {
            tracing::info!("Received signal {}, stopping child processes", sig);
            if let Ok(mut registry) = registry.lock() {
                registry.terminate_all(Duration::from_secs(3));
            }
            std::process::exit(128 + sig);
        }
    });

    Ok(())
}

/// Extension trait for `std::process::Command` to set up process groups
pub trait CommandProcessGroup {
    /// Run the child as leader of a new process group that receives SIGTERM
    /// when this process dies.
    fn in_new_process_group(&mut self) -> &mut Self;
}

impl CommandProcessGroup for std::process::Command {
    fn in_new_process_group(&mut self) -> &mut Self {
        use std::os::unix::process::CommandExt;
        // SAFETY: the closure only calls async-signal-safe setpgid and prctl.
        unsafe {
            self.pre_exec(|| {
                nix::unistd::setpgid(Pid::from_raw(0), Pid::from_raw(0))
                    .map_err(std::io::Error::from)?;

                if libc::prctl(libc::PR_SET_PDEATHSIG, libc::SIGTERM) == -1 {
                    return Err(std::io::Error::last_os_error());
                }

                Ok(())
            });
        }
        self
    }
}
