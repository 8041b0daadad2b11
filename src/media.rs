use std::thread;
use std::time::Duration;

use anyhow::Result;
use crossbeam_channel::{unbounded, Receiver, Sender};
use url::Url;

use crate::debug::debug_log;
use crate::resolve::PageKind;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MediaError {
    #[error("decode failed: {0}")]
    Decode(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("unsupported media: {0}")]
    Unsupported(String),
}

/// Lifecycle notifications from a mounted media element. Fire-and-forget:
/// the card applies them when they arrive and never waits on them.
#[derive(Debug, Clone, PartialEq)]
pub enum MediaEvent {
    Loaded { width: f64, height: f64 },
    ReadyForDisplay,
    Error(MediaError),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub load_delay: Duration,
    pub workers: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            load_delay: Duration::from_millis(250),
            workers: 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountRequest {
    pub post_id: String,
    pub page_index: usize,
    pub kind: PageKind,
    pub url: String,
    pub generation: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    pub post_id: String,
    pub page_index: usize,
    pub generation: u64,
    pub event: MediaEvent,
}

struct Job {
    request: MountRequest,
}

/// Stand-in for the platform media subsystem: "loads" each mounted page on a
/// worker thread and reports lifecycle events back over a channel.
///
/// Intrinsic sizes come from a `#WIDTHxHEIGHT` URL fragment. Hosts ending in
/// `.invalid` fail with a network error and paths containing `corrupt` fail
/// to decode.
pub struct Host {
    jobs: Sender<Job>,
    stop: Sender<()>,
    events: Receiver<Delivery>,
    handles: Vec<thread::JoinHandle<()>>,
}

impl Host {
    pub fn new(cfg: Config) -> Result<Self> {
        let workers = if cfg.workers == 0 { 2 } else { cfg.workers };
        let (job_tx, job_rx) = unbounded::<Job>();
        let (stop_tx, stop_rx) = unbounded::<()>();
        let (event_tx, event_rx) = unbounded::<Delivery>();

        let mut handles = Vec::new();
        for _ in 0..workers {
            let rx_jobs = job_rx.clone();
            let rx_stop = stop_rx.clone();
            let tx_events = event_tx.clone();
            let delay = cfg.load_delay;
            handles.push(thread::spawn(move || {
                worker(rx_jobs, rx_stop, tx_events, delay)
            }));
        }

        Ok(Self {
            jobs: job_tx,
            stop: stop_tx,
            events: event_rx,
            handles,
        })
    }

    pub fn mount(&self, request: MountRequest) {
        debug_log(format!(
            "media: mount {} page {} gen {} {}",
            request.post_id, request.page_index, request.generation, request.url
        ));
        let _ = self.jobs.send(Job { request });
    }

    pub fn drain(&self) -> Vec<Delivery> {
        self.events.try_iter().collect()
    }

    fn shutdown(&mut self) {
        for _ in &self.handles {
            let _ = self.stop.send(());
        }
        while let Some(handle) = self.handles.pop() {
            let _ = handle.join();
        }
    }
}

impl Drop for Host {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn worker(jobs: Receiver<Job>, stop: Receiver<()>, events: Sender<Delivery>, delay: Duration) {
    loop {
        crossbeam_channel::select! {
            recv(stop) -> _ => break,
            recv(jobs) -> msg => {
                match msg {
                    Ok(job) => {
                        if !delay.is_zero() {
                            thread::sleep(delay);
                        }
                        for event in simulate_load(&job.request) {
                            let delivery = Delivery {
                                post_id: job.request.post_id.clone(),
                                page_index: job.request.page_index,
                                generation: job.request.generation,
                                event,
                            };
                            if events.send(delivery).is_err() {
                                return;
                            }
                        }
                    }
                    Err(_) => break,
                }
            }
        }
    }
}

pub fn simulate_load(request: &MountRequest) -> Vec<MediaEvent> {
    let url = match Url::parse(&request.url) {
        Ok(url) => url,
        Err(err) => {
            return vec![MediaEvent::Error(MediaError::Unsupported(format!(
                "{}: {err}",
                request.url
            )))]
        }
    };
    if !matches!(url.scheme(), "http" | "https" | "file") {
        return vec![MediaEvent::Error(MediaError::Unsupported(format!(
            "scheme {}",
            url.scheme()
        )))];
    }
    if url
        .host_str()
        .map(|host| host.ends_with(".invalid"))
        .unwrap_or(false)
    {
        return vec![MediaEvent::Error(MediaError::Network(format!(
            "unreachable host for {}",
            request.url
        )))];
    }
    if url.path().contains("corrupt") {
        return vec![MediaEvent::Error(MediaError::Decode(format!(
            "{} produced no frames",
            request.url
        )))];
    }

    let mut out = Vec::new();
    if let Some((width, height)) = url.fragment().and_then(parse_dimensions) {
        out.push(MediaEvent::Loaded { width, height });
    }
    out.push(MediaEvent::ReadyForDisplay);
    out
}

fn parse_dimensions(fragment: &str) -> Option<(f64, f64)> {
    let (w, h) = fragment.split_once('x')?;
    let width = w.trim().parse::<f64>().ok()?;
    let height = h.trim().parse::<f64>().ok()?;
    Some((width, height))
}
