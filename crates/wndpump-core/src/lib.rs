pub mod affinity;
pub mod cancel;
pub mod config;
pub mod error;
pub mod handle;
pub mod log;
pub mod loopback;
pub mod native;
pub mod pump;
pub mod window;

pub use affinity::AffinityThread;
pub use cancel::CancelToken;
pub use config::{Config, RegistrationPolicy, WindowConfig};
pub use error::{PumpError, PumpResult};
pub use handle::{RetainedProcedure, WindowHandle};
pub use loopback::LoopbackService;
pub use native::{NativeError, NativeService, Registration, Retrieved, Signal};
pub use pump::{ExitReason, PumpState, RunReport};
pub use window::Window;
