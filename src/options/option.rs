use crate::{
    Arg,
    WampDict,
    WampString,
};

#[derive(Debug, Clone)]
/// Options specific to roles for key/value pairs
pub enum WampOption<K, V> {
    /// A publisher role feature option
    PublishOption(K, V),
    /// A Subscriber role feature option
    SubscribeOption(K, V),
    /// A Caller role feature option
    CallOption(K, V),
    /// A Callee role feature option
    RegisterOption(K, V),
    /// An empty option
    None
}

/// Provides generic functionality for role options dictionary generation
pub trait OptionBuilder {

    /// Clones or creates a WampDict and inserts the key/value pair from the supplied WampOption
    /// 
    /// * `option` - The key/value pair to insert into the dictionary
    fn with_option(&self, option: WampOption<String, Arg>) -> Self where Self: OptionBuilder + Sized {
        let mut next_options = match &self.get_dict() {
            Some(opts) => opts.clone(),
            None => WampDict::new()
        };

        let (key, value) = match Self::validate_option(option.clone()) {
            Some(result) => result,
            None => panic!("Can't create invalid option {:?}", option)
        };

        next_options.insert(key, value);

        Self::create(Some(next_options.clone()))
    }

    // TODO: Actual validation per role here
    /// WIP (currently not functional)
    /// Validate that the option being passed in is relevant for the role, and that they type of the value is correct for the given key.
    /// 
    /// * `option` - The key/value pair to validate
    fn validate_option(option: WampOption<String, Arg>) -> Option<(WampString, Arg)> {
        match option {
            WampOption::PublishOption(key, value) => Some((key, value)),
            WampOption::SubscribeOption(key, value) => Some((key, value)),
            WampOption::RegisterOption(key, value) => Some((key, value)),
            WampOption::CallOption(key, value) => Some((key, value)),
            WampOption::None => None,
        }
    }
    
    /// Create a new empty builder - provided for convention
    fn new() -> Self where Self: OptionBuilder + Sized {
        Self::empty()
    }

    /// Create a new empty builder
    fn empty() -> Self where Self: OptionBuilder + Sized {
        Self::create(None)
    }

    /// Create an OptionBuilder using the provided WampDict
    /// Must implement
    fn create(options: Option<WampDict>) -> Self where Self: OptionBuilder + Sized;
    /// Return the current builder WampDict
    /// Must implement
    fn get_dict(&self) -> Option<WampDict>;

}

/// Converts something into the `WampDict` the session sends on the wire.
///
/// Implemented for `WampDict` itself (identity, for callers who still want
/// to build the dict by hand) and for every [`OptionBuilder`], so
/// `Client::subscribe`/`publish`/`register`/`call` can take either a raw
/// `WampDict` or a typed options builder (`SubscribeOptions`, `CallOptions`,
/// ...) interchangeably.
pub trait IntoWampDict {
    fn into_wamp_dict(self) -> WampDict;
}

impl IntoWampDict for WampDict {
    fn into_wamp_dict(self) -> WampDict {
        self
    }
}

impl<T: OptionBuilder> IntoWampDict for T {
    fn into_wamp_dict(self) -> WampDict {
        self.get_dict().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct DummyBuilder(Option<WampDict>);

    impl OptionBuilder for DummyBuilder {
        fn create(options: Option<WampDict>) -> Self {
            Self(options)
        }

        fn get_dict(&self) -> Option<WampDict> {
            self.0.clone()
        }
    }

    #[test]
    fn wamp_dict_converts_to_itself() {
        let mut dict = WampDict::new();
        dict.insert("k".to_owned(), Arg::Bool(true));
        assert_eq!(dict.clone().into_wamp_dict(), dict);
    }

    #[test]
    fn empty_builder_converts_to_empty_dict() {
        let builder = DummyBuilder::empty();
        assert_eq!(builder.into_wamp_dict(), WampDict::new());
    }

    #[test]
    fn populated_builder_converts_to_its_dict() {
        let builder = DummyBuilder::empty().with_option(WampOption::CallOption(
            "timeout".to_owned(),
            Arg::UInt(5),
        ));
        let mut expected = WampDict::new();
        expected.insert("timeout".to_owned(), Arg::UInt(5));
        assert_eq!(builder.into_wamp_dict(), expected);
    }
}
