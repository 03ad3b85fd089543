// Library surface for the simulation binary and integration tests.
pub mod app;
pub mod element;
pub mod engine;
pub mod error;
pub mod host;
pub mod interceptor;
pub mod lifecycle;
pub mod logging;
pub mod rng;
pub mod round;
pub mod runtime;
pub mod session;
pub mod settings;
pub mod sim;
pub mod stats;

pub use app::AutoClicker;
pub use engine::Action;
pub use error::SettingsError;
pub use host::{Control, Host};
pub use lifecycle::{LifecycleState, Phase};
pub use session::{Session, SessionHandle};
pub use settings::{SettingField, SettingValue, Settings, SettingsStore};
