//! The fixed-period loop that starts installed actions.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, error, info};

use crate::dispatcher::Dispatcher;
use crate::error::Result;

pub struct DrivingLoop {
    dispatcher: Arc<Dispatcher>,
    period: Duration,
}

impl DrivingLoop {
    pub fn new(dispatcher: Arc<Dispatcher>, period: Duration) -> Self {
        Self { dispatcher, period }
    }

    /// Tick until `shutdown` is set. Returns early only on a fatal dispatcher
    /// error.
    pub fn run(&self, shutdown: &AtomicBool) -> Result<()> {
        info!(period_ms = self.period.as_millis() as u64, "driving loop started");
        while !shutdown.load(Ordering::Acquire) {
            let tick = Instant::now();
            if let Err(e) = self.dispatcher.advance() {
                error!(error = %e, "fatal dispatcher error");
                return Err(e);
            }
            if let Some(rest) = self.period.checked_sub(tick.elapsed()) {
                thread::sleep(rest);
            } else {
                debug!(elapsed_ms = tick.elapsed().as_millis() as u64, "tick overran its period");
            }
        }
        info!("driving loop stopped");
        Ok(())
    }

    /// Run on a dedicated thread.
    pub fn spawn(self) -> std::io::Result<LoopHandle> {
        let shutdown = Arc::new(AtomicBool::new(false));
        let flag = shutdown.clone();
        let thread = thread::Builder::new()
            .name("stepper-driver".into())
            .spawn(move || self.run(&flag))?;
        Ok(LoopHandle { shutdown, thread })
    }
}

pub struct LoopHandle {
    shutdown: Arc<AtomicBool>,
    thread: JoinHandle<Result<()>>,
}

impl LoopHandle {
    /// The loop exited on its own, which only happens on a fatal error.
    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// Signal shutdown and wait for the current tick to finish.
    pub fn stop(self) -> Result<()> {
        self.shutdown.store(true, Ordering::Release);
        match self.thread.join() {
            Ok(result) => result,
            Err(_) => {
                error!("driving loop thread panicked");
                Ok(())
            }
        }
    }

    /// Stop the loop, then preempt whatever goal is still in flight. The loop
    /// is joined first so it cannot start an action after the preempt.
    pub fn shutdown(self, dispatcher: &Dispatcher) -> Result<()> {
        let stopped = self.stop();
        dispatcher.preempt();
        stopped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::tests::FakeHandle;
    use crate::builder::DefinitionBuilder;
    use crate::catalog::Catalog;
    use crate::remote::ExecutionHandle;
    use crate::types::{ActionState, SendStatus};
    use tempfile::TempDir;

    fn dispatcher(dir: &TempDir, handle: Arc<FakeHandle>) -> Arc<Dispatcher> {
        std::fs::write(
            dir.path().join("actions.yaml"),
            "actions:\n  - id: sit\n    file: sit.yaml\n    type: yaml\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("sit.yaml"), "steps:\n  - [base_auto]\n").unwrap();
        let builder = DefinitionBuilder::new(handle.clone(), Duration::from_secs(5));
        Arc::new(Dispatcher::new(
            Catalog::open(vec![dir.path().to_path_buf()]),
            Box::new(builder),
            handle,
        ))
    }

    #[test]
    fn loop_starts_sent_action() {
        let dir = TempDir::new().unwrap();
        let handle = Arc::new(FakeHandle::default());
        let d = dispatcher(&dir, handle.clone());

        let running = DrivingLoop::new(d.clone(), Duration::from_millis(5))
            .spawn()
            .unwrap();
        assert_eq!(d.send_action("sit"), SendStatus::Success);

        let deadline = Instant::now() + Duration::from_secs(5);
        while handle.submits() == 0 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        running.stop().unwrap();

        assert_eq!(handle.submits(), 1);
        assert_eq!(d.active().unwrap().state, ActionState::Running);
    }

    #[test]
    fn shutdown_leaves_no_goal_running() {
        let dir = TempDir::new().unwrap();
        let handle = Arc::new(FakeHandle::default());
        let d = dispatcher(&dir, handle.clone());

        let running = DrivingLoop::new(d.clone(), Duration::from_millis(5))
            .spawn()
            .unwrap();
        assert_eq!(d.send_action("sit"), SendStatus::Success);
        running.shutdown(&d).unwrap();

        // Whether or not the loop got to start it, nothing may be live now.
        let submits = handle.submits();
        thread::sleep(Duration::from_millis(60));
        assert_eq!(handle.submits(), submits);
        let status = handle.goal_status().unwrap();
        assert!(!status.is_some_and(|s| s.is_cancelable()), "{status:?}");
        assert_eq!(handle.cancels(), submits);
    }

    #[test]
    fn stop_returns_promptly() {
        let dir = TempDir::new().unwrap();
        let d = dispatcher(&dir, Arc::new(FakeHandle::default()));
        let running = DrivingLoop::new(d, Duration::from_millis(50)).spawn().unwrap();
        assert!(!running.is_finished());

        let started = Instant::now();
        running.stop().unwrap();
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn run_returns_when_flag_is_preset() {
        let dir = TempDir::new().unwrap();
        let d = dispatcher(&dir, Arc::new(FakeHandle::default()));
        let shutdown = AtomicBool::new(true);
        DrivingLoop::new(d, Duration::from_millis(10))
            .run(&shutdown)
            .unwrap();
    }
}
