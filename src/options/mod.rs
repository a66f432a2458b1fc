pub mod call;
pub mod option;
pub mod publish;
pub mod register;
pub mod subscription;

pub use call::CallOptions;
pub use option::{IntoWampDict, OptionBuilder, WampOption};
pub use publish::PublishOptions;
pub use register::RegisterOptions;
pub use subscription::SubscribeOptions;
