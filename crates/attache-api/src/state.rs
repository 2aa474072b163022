//! Application state shared by all handlers.

use attache_lambda::LambdaPlugin;

use crate::job_queue::DispatchQueue;

#[derive(Clone)]
pub struct AppState {
    pub plugin: LambdaPlugin,
    pub dispatch_queue: DispatchQueue,
}

impl AppState {
    pub fn new(plugin: LambdaPlugin, dispatch_queue: DispatchQueue) -> Self {
        Self {
            plugin,
            dispatch_queue,
        }
    }
}
