use crate::options::option::{OptionBuilder, WampOption};
use crate::{Arg, WampDict};

/// Base struct for storing WampDict value
pub struct PublishOptionItem(Option<WampDict>);

impl PublishOptionItem {
    /// Requests a PUBLISHED acknowledgement (and publication id) from the router
    pub fn with_acknowledge(&self, acknowledge: bool) -> Self {
        self.with_option(WampOption::PublishOption(
            "acknowledge".to_owned(),
            Arg::Bool(acknowledge),
        ))
    }

    /// Excludes the publisher's own session from receiving the event
    pub fn with_exclude_me(&self, exclude_me: bool) -> Self {
        self.with_option(WampOption::PublishOption(
            "exclude_me".to_owned(),
            Arg::Bool(exclude_me),
        ))
    }
}

impl OptionBuilder for PublishOptionItem {
    fn create(options: Option<WampDict>) -> Self {
        Self(options)
    }

    fn get_dict(&self) -> Option<WampDict> {
        self.0.clone()
    }
}

impl Default for PublishOptionItem {
    fn default() -> Self {
        Self::empty()
    }
}

/// Alias for PublishOptionItem
pub type PublishOptions = PublishOptionItem;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::option::IntoWampDict;

    #[test]
    fn chained_options_accumulate_into_one_dict() {
        let dict = PublishOptions::new()
            .with_acknowledge(true)
            .with_exclude_me(false)
            .into_wamp_dict();

        assert_eq!(dict.get("acknowledge"), Some(&Arg::Bool(true)));
        assert_eq!(dict.get("exclude_me"), Some(&Arg::Bool(false)));
    }
}
