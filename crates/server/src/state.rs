use orchestra::Runtime;

/// Shared handler state; cheap to clone
#[derive(Clone)]
pub struct AppState {
    runtime: Runtime,
}

impl AppState {
    pub fn new(runtime: Runtime) -> Self {
        Self { runtime }
    }

    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }
}
