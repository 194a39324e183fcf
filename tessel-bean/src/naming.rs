//! Property naming strategies.

use core::fmt;
use std::sync::Arc;

use heck::{
    ToKebabCase, ToLowerCamelCase, ToShoutySnakeCase, ToSnakeCase, ToTitleCase,
    ToUpperCamelCase,
};

/// Translates a declared property name into its serialized form.
pub trait PropertyNaming: Send + Sync {
    /// Translate `name`.
    fn translate(&self, name: &str) -> String;
}

impl<F> PropertyNaming for F
where
    F: Fn(&str) -> String + Send + Sync,
{
    fn translate(&self, name: &str) -> String {
        self(name)
    }
}

/// Built-in naming strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NamingStrategy {
    /// Name as declared.
    Identity,
    /// `fooBar`
    LowerCamelCase,
    /// `FooBar`
    UpperCamelCase,
    /// `Foo Bar`
    UpperCamelCaseWithSpaces,
    /// `foo_bar`
    SnakeCase,
    /// `FOO_BAR`
    ScreamingSnakeCase,
    /// `foo-bar`
    KebabCase,
    /// `foo.bar`
    LowerDotCase,
    /// `foobar`
    LowerCase,
    /// `FOOBAR`
    UpperCase,
}

impl NamingStrategy {
    /// Look a strategy up by its constant name (`SNAKE_CASE`, ...).
    pub fn for_name(name: &str) -> Option<Self> {
        Some(match name {
            "IDENTITY" => NamingStrategy::Identity,
            "LOWER_CAMEL_CASE" => NamingStrategy::LowerCamelCase,
            "UPPER_CAMEL_CASE" => NamingStrategy::UpperCamelCase,
            "UPPER_CAMEL_CASE_WITH_SPACES" => NamingStrategy::UpperCamelCaseWithSpaces,
            "SNAKE_CASE" => NamingStrategy::SnakeCase,
            "SCREAMING_SNAKE_CASE" => NamingStrategy::ScreamingSnakeCase,
            "KEBAB_CASE" => NamingStrategy::KebabCase,
            "LOWER_DOT_CASE" => NamingStrategy::LowerDotCase,
            "LOWER_CASE" => NamingStrategy::LowerCase,
            "UPPER_CASE" => NamingStrategy::UpperCase,
            _ => return None,
        })
    }

    /// The constant name accepted by [`NamingStrategy::for_name`].
    pub fn name(&self) -> &'static str {
        match self {
            NamingStrategy::Identity => "IDENTITY",
            NamingStrategy::LowerCamelCase => "LOWER_CAMEL_CASE",
            NamingStrategy::UpperCamelCase => "UPPER_CAMEL_CASE",
            NamingStrategy::UpperCamelCaseWithSpaces => "UPPER_CAMEL_CASE_WITH_SPACES",
            NamingStrategy::SnakeCase => "SNAKE_CASE",
            NamingStrategy::ScreamingSnakeCase => "SCREAMING_SNAKE_CASE",
            NamingStrategy::KebabCase => "KEBAB_CASE",
            NamingStrategy::LowerDotCase => "LOWER_DOT_CASE",
            NamingStrategy::LowerCase => "LOWER_CASE",
            NamingStrategy::UpperCase => "UPPER_CASE",
        }
    }

    /// Apply this strategy to a declared name.
    pub fn apply(&self, name: &str) -> String {
        match self {
            NamingStrategy::Identity => name.to_owned(),
            NamingStrategy::LowerCamelCase => name.to_lower_camel_case(),
            NamingStrategy::UpperCamelCase => name.to_upper_camel_case(),
            NamingStrategy::UpperCamelCaseWithSpaces => name.to_title_case(),
            NamingStrategy::SnakeCase => name.to_snake_case(),
            NamingStrategy::ScreamingSnakeCase => name.to_shouty_snake_case(),
            NamingStrategy::KebabCase => name.to_kebab_case(),
            NamingStrategy::LowerDotCase => name.to_snake_case().replace('_', "."),
            NamingStrategy::LowerCase => name.to_lowercase(),
            NamingStrategy::UpperCase => name.to_uppercase(),
        }
    }
}

impl PropertyNaming for NamingStrategy {
    fn translate(&self, name: &str) -> String {
        self.apply(name)
    }
}

impl fmt::Display for NamingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How a bean or property picks its naming strategy.
#[derive(Clone)]
pub enum Naming {
    /// A built-in strategy.
    Strategy(NamingStrategy),
    /// A strategy resolved by name through the registry.
    Named(String),
    /// A user supplied strategy.
    Custom(Arc<dyn PropertyNaming>),
}

impl fmt::Debug for Naming {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Naming::Strategy(s) => f.debug_tuple("Strategy").field(s).finish(),
            Naming::Named(name) => f.debug_tuple("Named").field(name).finish(),
            Naming::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

impl From<NamingStrategy> for Naming {
    fn from(strategy: NamingStrategy) -> Self {
        Naming::Strategy(strategy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessel_testhelpers::test;

    #[test]
    fn every_strategy_from_snake_case() {
        let cases = [
            (NamingStrategy::Identity, "first_name"),
            (NamingStrategy::LowerCamelCase, "firstName"),
            (NamingStrategy::UpperCamelCase, "FirstName"),
            (NamingStrategy::UpperCamelCaseWithSpaces, "First Name"),
            (NamingStrategy::SnakeCase, "first_name"),
            (NamingStrategy::ScreamingSnakeCase, "FIRST_NAME"),
            (NamingStrategy::KebabCase, "first-name"),
            (NamingStrategy::LowerDotCase, "first.name"),
            (NamingStrategy::LowerCase, "first_name"),
            (NamingStrategy::UpperCase, "FIRST_NAME"),
        ];
        for (strategy, expected) in cases {
            assert_eq!(strategy.apply("first_name"), expected, "{strategy}");
        }
    }

    #[test]
    fn camel_case_input() {
        assert_eq!(NamingStrategy::SnakeCase.apply("firstName"), "first_name");
        assert_eq!(NamingStrategy::KebabCase.apply("HTTPServer"), "http-server");
        assert_eq!(NamingStrategy::LowerDotCase.apply("address2Line"), "address2.line");
    }

    #[test]
    fn lookup_by_name() {
        for strategy in [
            NamingStrategy::Identity,
            NamingStrategy::UpperCamelCaseWithSpaces,
            NamingStrategy::LowerDotCase,
        ] {
            assert_eq!(NamingStrategy::for_name(strategy.name()), Some(strategy));
        }
        assert_eq!(NamingStrategy::for_name("TITLE_CASE"), None);
    }
}
