mod event;
mod fingerprint;
mod store;

pub use event::{Alert, AlertFilter};
pub use fingerprint::{fingerprint, fingerprint_string};
pub use store::{AlertStore, Promotion};
