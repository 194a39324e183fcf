use core::any::Any;

/// When a property is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Include {
    /// Always written.
    Always,
    /// Skipped when null.
    NonNull,
    /// Skipped when null or absent (an empty `Option`).
    NonAbsent,
    /// Skipped when null, absent or empty (empty string, collection or map).
    #[default]
    NonEmpty,
    /// Never written.
    Never,
}

/// Hook that decides, per value, whether a property is written. Overrides
/// the inclusion policy when installed on a bean.
pub trait PropertyFilter: Send + Sync {
    /// Whether the property `name` of `bean` with `value` should be written.
    /// `value` is `None` for null.
    fn should_include(&self, bean: &dyn Any, name: &str, value: Option<&dyn Any>) -> bool;
}

impl<F> PropertyFilter for F
where
    F: Fn(&dyn Any, &str, Option<&dyn Any>) -> bool + Send + Sync,
{
    fn should_include(&self, bean: &dyn Any, name: &str, value: Option<&dyn Any>) -> bool {
        self(bean, name, value)
    }
}
