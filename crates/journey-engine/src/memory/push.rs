use super::lock;
use crate::platform::PushTokenSupplier;
use std::sync::{Arc, Mutex};

/// Push token supplier backed by a settable value.
#[derive(Clone, Default)]
pub struct StaticPushSupplier {
    token: Arc<Mutex<Option<String>>>,
}

impl StaticPushSupplier {
    pub fn new(token: Option<String>) -> Self {
        Self {
            token: Arc::new(Mutex::new(token)),
        }
    }

    pub fn set_token(&self, token: Option<String>) {
        *lock(&self.token) = token;
    }
}

impl PushTokenSupplier for StaticPushSupplier {
    fn current_token(&self) -> Option<String> {
        lock(&self.token).clone()
    }
}
