use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use rand::Rng;

use super::handle::FormHandle;

/// Live form sessions, keyed by the opaque id kept in the visitor's cookie.
#[derive(Debug, Clone)]
pub struct FormRegistry {
    forms: Arc<RwLock<HashMap<String, Arc<FormHandle>>>>,
    reset_delay: Duration,
}

impl FormRegistry {
    pub fn new(reset_delay: Duration) -> Self {
        Self {
            forms: Arc::new(RwLock::new(HashMap::new())),
            reset_delay,
        }
    }

    pub fn get(&self, id: &str) -> Option<Arc<FormHandle>> {
        let forms = self.forms.read().ok()?;
        let handle = forms.get(id).cloned()?;
        handle.touch();
        Some(handle)
    }

    /// Return the form for `id`, or mount a fresh one under a new id.
    pub fn open(&self, id: Option<&str>) -> (String, Arc<FormHandle>) {
        if let Some(id) = id {
            if let Some(handle) = self.get(id) {
                return (id.to_string(), handle);
            }
        }

        let id = new_form_id();
        let handle = Arc::new(FormHandle::new(self.reset_delay));
        match self.forms.write() {
            Ok(mut forms) => {
                forms.insert(id.clone(), Arc::clone(&handle));
            }
            Err(_) => log::error!("Form registry lock poisoned, form {id} is not tracked"),
        }
        log::debug!("Mounted form {id}");
        (id, handle)
    }

    /// Tear a form down. Pending timers and decodes for it become no-ops.
    pub fn discard(&self, id: &str) -> bool {
        let removed = self
            .forms
            .write()
            .map(|mut forms| forms.remove(id).is_some())
            .unwrap_or(false);
        if removed {
            log::debug!("Discarded form {id}");
        }
        removed
    }

    /// Drop forms untouched for longer than `ttl`; returns how many went.
    pub fn sweep_idle(&self, ttl: Duration) -> usize {
        let Ok(mut forms) = self.forms.write() else {
            return 0;
        };
        let before = forms.len();
        forms.retain(|_, handle| handle.idle_for() <= ttl);
        before - forms.len()
    }

    pub fn len(&self) -> usize {
        self.forms.read().map(|forms| forms.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Periodically drop abandoned forms.
pub fn spawn_sweeper(registry: FormRegistry, ttl: Duration) {
    actix_web::rt::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(60));
        loop {
            interval.tick().await;
            let swept = registry.sweep_idle(ttl);
            if swept > 0 {
                log::info!("Discarded {swept} idle form session(s)");
            }
        }
    });
}

/// Random 16-byte hex id.
fn new_form_id() -> String {
    let mut rng = rand::rng();
    let bytes: [u8; 16] = rng.random();
    hex::encode(bytes)
}
