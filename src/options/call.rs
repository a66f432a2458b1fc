use crate::options::option::{OptionBuilder, WampOption};
use crate::{Arg, WampDict};

/// Base struct for storing WampDict value
pub struct CallOptionItem(Option<WampDict>);

impl CallOptionItem {
    /// Requests progressive call results from the callee
    pub fn with_receive_progress(&self, receive_progress: bool) -> Self {
        self.with_option(WampOption::CallOption(
            "receive_progress".to_owned(),
            Arg::Bool(receive_progress),
        ))
    }

    /// Sets a relative or absolute timeout after which the router cancels the call
    pub fn with_timeout(&self, timeout_ms: u64) -> Self {
        self.with_option(WampOption::CallOption(
            "timeout".to_owned(),
            Arg::UInt(timeout_ms),
        ))
    }
}

impl OptionBuilder for CallOptionItem {
    fn create(options: Option<WampDict>) -> Self {
        Self(options)
    }

    fn get_dict(&self) -> Option<WampDict> {
        self.0.clone()
    }
}

impl Default for CallOptionItem {
    fn default() -> Self {
        Self::empty()
    }
}

/// Alias for CallOptionItem
pub type CallOptions = CallOptionItem;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::option::IntoWampDict;

    #[test]
    fn chained_options_accumulate_into_one_dict() {
        let dict = CallOptions::new()
            .with_receive_progress(true)
            .with_timeout(5_000)
            .into_wamp_dict();

        assert_eq!(dict.get("receive_progress"), Some(&Arg::Bool(true)));
        assert_eq!(dict.get("timeout"), Some(&Arg::UInt(5_000)));
    }
}
