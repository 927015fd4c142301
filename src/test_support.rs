use crate::locks::{BackendError, ClaimStatus, LockBackend, LockDescriptor};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{LazyLock, Mutex, MutexGuard};
use std::time::Instant;
use tempfile::TempDir;

static CWD_LOCK: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));

pub(crate) struct DirGuard {
    original: PathBuf,
    _lock: MutexGuard<'static, ()>,
}

impl DirGuard {
    pub(crate) fn new(new_dir: &Path) -> Self {
        // Changing the process current working directory is global and not thread-safe.
        // Lock it so tests don't race even if a #[serial] annotation is missed.
        let lock = CWD_LOCK.lock().unwrap_or_else(|poison| poison.into_inner());
        let original = std::env::current_dir().unwrap();
        std::env::set_current_dir(new_dir).unwrap();
        Self {
            original,
            _lock: lock,
        }
    }
}

impl Drop for DirGuard {
    fn drop(&mut self) {
        let _ = std::env::set_current_dir(&self.original);
    }
}

/// What a [`ScriptedBackend`] answers to one claim.
#[derive(Debug, Clone)]
pub(crate) enum Step {
    Claim,
    Conflict(Option<LockDescriptor>),
    Fail(String),
}

type ClaimHook = Box<dyn Fn(usize) + Send + Sync>;

/// In-memory backend that replays a fixed script of claim responses.
///
/// Once the script is exhausted every further claim gets `fallback`.
pub(crate) struct ScriptedBackend {
    script: Mutex<VecDeque<Step>>,
    fallback: Step,
    calls: Mutex<Vec<ClaimCall>>,
    abandoned: Mutex<Vec<String>>,
    in_flight: AtomicBool,
    on_claim: Option<ClaimHook>,
}

#[derive(Debug, Clone)]
pub(crate) struct ClaimCall {
    pub key: String,
    pub lock_id: String,
    pub at: Instant,
}

impl ScriptedBackend {
    pub(crate) fn always(step: Step) -> Self {
        Self::sequence(Vec::new(), step)
    }

    pub(crate) fn sequence(steps: Vec<Step>, fallback: Step) -> Self {
        Self {
            script: Mutex::new(steps.into()),
            fallback,
            calls: Mutex::new(Vec::new()),
            abandoned: Mutex::new(Vec::new()),
            in_flight: AtomicBool::new(false),
            on_claim: None,
        }
    }

    /// Run `hook` inside every claim with the 1-based call number.
    pub(crate) fn with_claim_hook<F>(mut self, hook: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.on_claim = Some(Box::new(hook));
        self
    }

    pub(crate) fn calls(&self) -> Vec<ClaimCall> {
        lock(&self.calls).clone()
    }

    pub(crate) fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }

    pub(crate) fn abandoned(&self) -> Vec<String> {
        lock(&self.abandoned).clone()
    }
}

impl LockBackend for ScriptedBackend {
    fn name(&self) -> &str {
        "scripted"
    }

    fn claim(&self, key: &str, descriptor: &LockDescriptor) -> Result<ClaimStatus, BackendError> {
        assert!(
            !self.in_flight.swap(true, Ordering::SeqCst),
            "overlapping claim calls"
        );

        let call_number = {
            let mut calls = lock(&self.calls);
            calls.push(ClaimCall {
                key: key.to_string(),
                lock_id: descriptor.id.clone(),
                at: Instant::now(),
            });
            calls.len()
        };

        if let Some(hook) = &self.on_claim {
            hook(call_number);
        }

        let step = lock(&self.script)
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());

        self.in_flight.store(false, Ordering::SeqCst);

        match step {
            Step::Claim => Ok(ClaimStatus::Claimed),
            Step::Conflict(holder) => Ok(ClaimStatus::Conflict(holder)),
            Step::Fail(message) => Err(BackendError::Other(message)),
        }
    }

    fn abandon(&self, _key: &str, descriptor: &LockDescriptor) -> Result<(), BackendError> {
        lock(&self.abandoned).push(descriptor.id.clone());
        Ok(())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poison| poison.into_inner())
}

/// A descriptor standing in for another process that holds the lock.
pub(crate) fn other_holder(who: &str) -> LockDescriptor {
    let mut holder = LockDescriptor::build("apply", "default.tfstate");
    holder.who = who.to_string();
    holder
}

/// Create a scratch configuration directory containing `statelock.yaml`.
pub(crate) fn create_config_dir(yaml: &str) -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    write_config(temp_dir.path(), yaml);
    temp_dir
}

pub(crate) fn write_config(dir: &Path, yaml: &str) {
    std::fs::write(dir.join(crate::config::CONFIG_FILE_NAME), yaml).unwrap();
}
