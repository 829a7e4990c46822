// orderflow-server/src/services/mod.rs
pub mod email;

pub use email::{MailNotifier, MailTransport, SandboxMailTransport};
