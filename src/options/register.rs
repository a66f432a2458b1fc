use crate::options::option::{OptionBuilder, WampOption};
use crate::{Arg, WampDict};

/// Base struct for storing WampDict value
pub struct RegisterOptionItem(Option<WampDict>);

impl RegisterOptionItem {
    /// Add an option for pattern matching the procedure uri of the registration
    pub fn with_match(&self, match_option: &str) -> Self {
        self.with_option(WampOption::RegisterOption(
            "match".to_owned(),
            Arg::String(match_option.to_owned()),
        ))
    }

    /// Sets the invocation policy used when more than one callee registers the same uri
    pub fn with_invoke(&self, invoke_policy: &str) -> Self {
        self.with_option(WampOption::RegisterOption(
            "invoke".to_owned(),
            Arg::String(invoke_policy.to_owned()),
        ))
    }
}

impl OptionBuilder for RegisterOptionItem {
    fn create(options: Option<WampDict>) -> Self {
        Self(options)
    }

    fn get_dict(&self) -> Option<WampDict> {
        self.0.clone()
    }
}

impl Default for RegisterOptionItem {
    fn default() -> Self {
        Self::empty()
    }
}

/// Alias for RegisterOptionItem
pub type RegisterOptions = RegisterOptionItem;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::option::IntoWampDict;

    #[test]
    fn chained_options_accumulate_into_one_dict() {
        let dict = RegisterOptions::new()
            .with_match("prefix")
            .with_invoke("roundrobin")
            .into_wamp_dict();

        assert_eq!(dict.get("match"), Some(&Arg::String("prefix".to_owned())));
        assert_eq!(
            dict.get("invoke"),
            Some(&Arg::String("roundrobin".to_owned()))
        );
    }
}
