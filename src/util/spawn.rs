//! Local task spawner backed by the Leptos executor.

use futures::future::LocalFutureObj;
use futures::task::{LocalSpawn, SpawnError};

/// Spawns `!Send` futures onto the UI thread through `leptos::task`.
#[derive(Clone, Copy, Debug, Default)]
pub struct LeptosSpawner;

impl LocalSpawn for LeptosSpawner {
    fn spawn_local_obj(&self, future: LocalFutureObj<'static, ()>) -> Result<(), SpawnError> {
        leptos::task::spawn_local(future);
        Ok(())
    }
}
