use tessel_core::{DEFAULT_MAXIMUM_DEPTH, Limits};

use crate::{Include, NamingStrategy};

/// Engine-wide defaults, resolved before any value is encoded or decoded.
///
/// ```
/// use tessel_bean::{Include, SerdeConfig};
///
/// let config = SerdeConfig::default()
///     .inclusion(Include::NonNull)
///     .ignore_unknown(false);
/// assert_eq!(config.maximum_nesting_depth, 1024);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerdeConfig {
    /// Deepest structure nesting accepted by encoders and decoders.
    pub maximum_nesting_depth: usize,
    /// Inclusion policy for properties that do not declare one.
    pub inclusion: Include,
    /// Whether undeclared keys are skipped instead of rejected.
    pub ignore_unknown: bool,
    /// Largest number of elements a list reserves room for at once.
    pub array_size_threshold: usize,
    /// Naming strategy for beans that do not declare one.
    pub naming_strategy: Option<NamingStrategy>,
    /// Whether keys match property names regardless of case.
    pub case_insensitive_properties: bool,
    /// The active view; properties restricted to other views are skipped.
    pub view: Option<String>,
}

impl Default for SerdeConfig {
    fn default() -> Self {
        Self {
            maximum_nesting_depth: DEFAULT_MAXIMUM_DEPTH,
            inclusion: Include::NonEmpty,
            ignore_unknown: true,
            array_size_threshold: 100,
            naming_strategy: None,
            case_insensitive_properties: false,
            view: None,
        }
    }
}

impl SerdeConfig {
    /// Set the maximum nesting depth.
    pub const fn maximum_nesting_depth(mut self, depth: usize) -> Self {
        self.maximum_nesting_depth = depth;
        self
    }

    /// Set the default inclusion policy.
    pub const fn inclusion(mut self, include: Include) -> Self {
        self.inclusion = include;
        self
    }

    /// Set whether unknown keys are ignored.
    pub const fn ignore_unknown(mut self, ignore: bool) -> Self {
        self.ignore_unknown = ignore;
        self
    }

    /// Set the list reservation threshold.
    pub const fn array_size_threshold(mut self, threshold: usize) -> Self {
        self.array_size_threshold = threshold;
        self
    }

    /// Set the default naming strategy.
    pub const fn naming_strategy(mut self, strategy: NamingStrategy) -> Self {
        self.naming_strategy = Some(strategy);
        self
    }

    /// Set case-insensitive property matching.
    pub const fn case_insensitive_properties(mut self, enabled: bool) -> Self {
        self.case_insensitive_properties = enabled;
        self
    }

    /// Activate a view.
    pub fn view(mut self, view: impl Into<String>) -> Self {
        self.view = Some(view.into());
        self
    }

    /// Fresh nesting limits for one operation.
    pub const fn limits(&self) -> Limits {
        Limits::new(self.maximum_nesting_depth)
    }
}
