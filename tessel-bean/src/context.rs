use core::ops::{Deref, DerefMut};

use crate::{Registry, SerdeConfig};
use crate::tracing_macros::trace;

/// Per-call state threaded through serializers.
///
/// Owns the stack of managed references currently being written, which back
/// references consult to break parent/child cycles.
pub struct EncoderContext<'r> {
    registry: &'r dyn Registry,
    view: Option<String>,
    managed_refs: Vec<String>,
}

impl<'r> EncoderContext<'r> {
    /// A context using the registry's configuration.
    pub fn new(registry: &'r dyn Registry) -> Self {
        Self {
            registry,
            view: registry.config().view.clone(),
            managed_refs: Vec::new(),
        }
    }

    /// Override the active view for this call.
    pub fn with_view(mut self, view: Option<String>) -> Self {
        self.view = view;
        self
    }

    /// The registry serializers are looked up in.
    pub fn registry(&self) -> &'r dyn Registry {
        self.registry
    }

    /// The engine configuration.
    pub fn config(&self) -> &'r SerdeConfig {
        self.registry.config()
    }

    /// The active view, if any.
    pub fn view(&self) -> Option<&str> {
        self.view.as_deref()
    }

    /// Run `f` with the managed reference `name` pushed. The reference is
    /// popped again however `f` exits, unwinding included.
    pub fn with_managed_ref<R>(&mut self, name: &str, f: impl FnOnce(&mut Self) -> R) -> R {
        trace!("push managed reference {name:?}");
        self.managed_refs.push(name.to_owned());
        let mut guard = ManagedRefGuard { context: self };
        f(&mut *guard)
    }

    /// Whether a back reference named `name` should be suppressed because
    /// its managed side is being written right now.
    pub fn resolve_back_ref(&self, name: &str) -> bool {
        self.managed_refs.iter().rev().any(|r| r == name)
    }

    /// Number of managed references currently pushed.
    pub fn managed_ref_depth(&self) -> usize {
        self.managed_refs.len()
    }
}

struct ManagedRefGuard<'a, 'r> {
    context: &'a mut EncoderContext<'r>,
}

impl<'r> Deref for ManagedRefGuard<'_, 'r> {
    type Target = EncoderContext<'r>;

    fn deref(&self) -> &Self::Target {
        self.context
    }
}

impl DerefMut for ManagedRefGuard<'_, '_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.context
    }
}

impl Drop for ManagedRefGuard<'_, '_> {
    fn drop(&mut self) {
        let _name = self.context.managed_refs.pop();
        trace!("pop managed reference {:?}", _name);
    }
}

/// Per-call state threaded through deserializers.
pub struct DecoderContext<'r> {
    registry: &'r dyn Registry,
    ignore_unknown: bool,
    case_insensitive: bool,
}

impl<'r> DecoderContext<'r> {
    /// A context using the registry's configuration.
    pub fn new(registry: &'r dyn Registry) -> Self {
        let config = registry.config();
        Self {
            registry,
            ignore_unknown: config.ignore_unknown,
            case_insensitive: config.case_insensitive_properties,
        }
    }

    /// Override the unknown property policy for this call.
    pub fn with_ignore_unknown(mut self, ignore: bool) -> Self {
        self.ignore_unknown = ignore;
        self
    }

    /// The registry deserializers are looked up in.
    pub fn registry(&self) -> &'r dyn Registry {
        self.registry
    }

    /// The engine configuration.
    pub fn config(&self) -> &'r SerdeConfig {
        self.registry.config()
    }

    /// Whether undeclared keys are skipped, unless a bean says otherwise.
    pub fn ignore_unknown(&self) -> bool {
        self.ignore_unknown
    }

    /// Whether keys match property names regardless of case.
    pub fn case_insensitive(&self) -> bool {
        self.case_insensitive
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DefaultRegistry;
    use tessel_testhelpers::test;

    #[test]
    fn managed_refs_pop_on_every_exit() {
        let registry = DefaultRegistry::new(SerdeConfig::default());
        let mut context = EncoderContext::new(&registry);

        let result: Result<(), &str> = context.with_managed_ref("parent", |ctx| {
            assert!(ctx.resolve_back_ref("parent"));
            assert!(!ctx.resolve_back_ref("other"));
            Err("boom")
        });
        assert!(result.is_err());
        assert_eq!(context.managed_ref_depth(), 0);

        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            context.with_managed_ref("parent", |_| panic!("inside"));
        }));
        assert!(outcome.is_err());
        assert_eq!(context.managed_ref_depth(), 0);
        assert!(!context.resolve_back_ref("parent"));
    }
}
