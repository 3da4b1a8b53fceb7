//! Side-effect collaborators driven by the session
//!
//! Both calls are fire-and-forget: the session never waits for them and never
//! retries. Implementations that need I/O spawn their own task.

use std::sync::Arc;

/// Refreshes the "up next" queue after the playing track changes
pub trait QueueRefresher: Send + Sync {
    fn refresh(&self);
}

/// Makes the freshly ready device the platform's active playback target
pub trait DeviceActivator: Send + Sync {
    fn activate(&self, device_id: &str);
}

/// Collaborators handed to a session
#[derive(Clone, Default)]
pub struct Collaborators {
    pub queue: Option<Arc<dyn QueueRefresher>>,
    pub activator: Option<Arc<dyn DeviceActivator>>,
}

impl Collaborators {
    pub fn new(queue: Arc<dyn QueueRefresher>, activator: Arc<dyn DeviceActivator>) -> Self {
        Self {
            queue: Some(queue),
            activator: Some(activator),
        }
    }

    pub(crate) fn refresh_queue(&self) {
        if let Some(queue) = &self.queue {
            queue.refresh();
        }
    }

    pub(crate) fn activate_device(&self, device_id: &str) {
        if let Some(activator) = &self.activator {
            activator.activate(device_id);
        }
    }
}

impl<F> QueueRefresher for F
where
    F: Fn() + Send + Sync,
{
    fn refresh(&self) {
        self();
    }
}

impl<F> DeviceActivator for F
where
    F: Fn(&str) + Send + Sync,
{
    fn activate(&self, device_id: &str) {
        self(device_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[test]
    fn closures_act_as_collaborators() {
        let refreshes = Arc::new(AtomicUsize::new(0));
        let activated = Arc::new(Mutex::new(Vec::new()));

        let counter = refreshes.clone();
        let seen = activated.clone();
        let collaborators = Collaborators::new(
            Arc::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
            Arc::new(move |id: &str| seen.lock().unwrap().push(id.to_string())),
        );

        collaborators.refresh_queue();
        collaborators.activate_device("device-1");

        assert_eq!(refreshes.load(Ordering::SeqCst), 1);
        assert_eq!(*activated.lock().unwrap(), vec!["device-1".to_string()]);
    }

    #[test]
    fn missing_collaborators_are_skipped() {
        let collaborators = Collaborators::default();
        collaborators.refresh_queue();
        collaborators.activate_device("device-1");
    }
}
