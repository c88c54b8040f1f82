use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use featuredag::errors::FeaturedagError;
use featuredag::exec::{StaticLoader, UnitRegistry};
use featuredag::isolate::{
    run_staged, BackendFuture, InstanceExit, InstanceId, IsolationBackend, StagingLayout,
};

/// What the fake "container" does once started.
#[derive(Debug, Clone)]
pub enum FakeBehaviour {
    /// Run the staged script in-process with the backend's registry, as a
    /// real container would.
    RunStaged,
    /// Exit with `code` without writing a result.
    Crash { code: i64 },
    /// Never exit.
    Hang,
    /// Write an unparseable result file and exit cleanly.
    CorruptResult,
    /// Fail before any instance exists.
    FailCreate,
    /// Create the instance, then fail to start it.
    FailStart,
    /// Create the instance, then never finish starting it.
    HangStart,
}

/// Everything the fake backend was asked to do.
#[derive(Debug, Default, Clone)]
pub struct FakeLog {
    pub staged: Vec<PathBuf>,
    pub created: Vec<InstanceId>,
    pub started: Vec<InstanceId>,
    pub removed: Vec<InstanceId>,
    pub detached: Vec<InstanceId>,
}

/// A fake isolation backend that:
/// - records staging directories and instance lifecycle calls
/// - simulates the container according to a [`FakeBehaviour`].
#[derive(Debug, Clone)]
pub struct FakeBackend {
    behaviour: FakeBehaviour,
    available: bool,
    registry: UnitRegistry,
    log: Arc<Mutex<FakeLog>>,
    instances: Arc<Mutex<HashMap<InstanceId, StagingLayout>>>,
}

impl FakeBackend {
    pub fn new(behaviour: FakeBehaviour, registry: UnitRegistry) -> Self {
        Self {
            behaviour,
            available: true,
            registry,
            log: Arc::new(Mutex::new(FakeLog::default())),
            instances: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::new(FakeBehaviour::RunStaged, UnitRegistry::new())
        }
    }

    /// Snapshot of the calls made so far.
    pub fn log(&self) -> FakeLog {
        self.log.lock().unwrap().clone()
    }
}

impl IsolationBackend for FakeBackend {
    fn name(&self) -> &str {
        "fake"
    }

    fn is_available(&self) -> BackendFuture<'_, bool> {
        let available = self.available;
        Box::pin(async move { Ok(available) })
    }

    fn create(&self, staging: &StagingLayout) -> BackendFuture<'_, InstanceId> {
        let staging = staging.clone();
        Box::pin(async move {
            self.log
                .lock()
                .unwrap()
                .staged
                .push(staging.root().to_path_buf());

            if matches!(self.behaviour, FakeBehaviour::FailCreate) {
                return Err(FeaturedagError::IsolatedExecution(
                    "fake backend refused to create an instance".to_string(),
                ));
            }

            let id = {
                let mut log = self.log.lock().unwrap();
                let id = InstanceId(format!("fake-{}", log.created.len()));
                log.created.push(id.clone());
                id
            };
            self.instances.lock().unwrap().insert(id.clone(), staging);
            Ok(id)
        })
    }

    fn start(&self, id: &InstanceId) -> BackendFuture<'_, ()> {
        let id = id.clone();
        Box::pin(async move {
            match self.behaviour {
                FakeBehaviour::FailStart => Err(FeaturedagError::IsolatedExecution(format!(
                    "fake backend could not start {id}"
                ))),
                FakeBehaviour::HangStart => std::future::pending().await,
                _ => {
                    self.log.lock().unwrap().started.push(id);
                    Ok(())
                }
            }
        })
    }

    fn wait(&self, id: &InstanceId) -> BackendFuture<'_, InstanceExit> {
        let id = id.clone();
        Box::pin(async move {
            let staging = self
                .instances
                .lock()
                .unwrap()
                .get(&id)
                .cloned()
                .ok_or_else(|| {
                    FeaturedagError::IsolatedExecution(format!("unknown instance {id}"))
                })?;

            match &self.behaviour {
                FakeBehaviour::RunStaged => {
                    let loader = StaticLoader::new(self.registry.clone());
                    run_staged(staging.root(), &loader).await?;
                    Ok(InstanceExit::default())
                }
                FakeBehaviour::Crash { code } => Ok(InstanceExit {
                    code: *code,
                    stdout: String::new(),
                    stderr: "Segmentation fault (core dumped)".to_string(),
                }),
                FakeBehaviour::Hang => std::future::pending().await,
                FakeBehaviour::CorruptResult => {
                    std::fs::write(staging.result_path(), b"{ not json")?;
                    Ok(InstanceExit::default())
                }
                FakeBehaviour::FailCreate
                | FakeBehaviour::FailStart
                | FakeBehaviour::HangStart => unreachable!("instance never started"),
            }
        })
    }

    fn remove(&self, id: &InstanceId) -> BackendFuture<'_, ()> {
        let id = id.clone();
        Box::pin(async move {
            self.instances.lock().unwrap().remove(&id);
            self.log.lock().unwrap().removed.push(id);
            Ok(())
        })
    }

    fn remove_detached(&self, id: &InstanceId) {
        self.instances.lock().unwrap().remove(id);
        self.log.lock().unwrap().detached.push(id.clone());
    }
}
