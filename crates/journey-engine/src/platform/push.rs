/// Supplies the device push token, once the host has obtained one.
pub trait PushTokenSupplier: Send + Sync {
    fn current_token(&self) -> Option<String>;
}
