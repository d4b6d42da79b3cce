use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Type-loader / parsing context shared by a store and every document it creates.
///
/// Operations that build and auto-type new content must run inside the locale of
/// the document they target. Entering is done through [`Locale::enter`], which
/// returns a guard; dropping the guard exits the locale again, so the pairing holds
/// on every return path.
#[derive(Clone)]
pub struct Locale {
    inner: Arc<LocaleInner>,
}

struct LocaleInner {
    name: String,
    depth: AtomicUsize,
}

impl Locale {
    pub fn new(name: impl Into<String>) -> Self {
        Self { inner: Arc::new(LocaleInner { name: name.into(), depth: AtomicUsize::new(0) }) }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Enters the locale for the lifetime of the returned guard.
    pub fn enter(&self) -> LocaleGuard {
        let depth = self.inner.depth.fetch_add(1, Ordering::AcqRel) + 1;
        tracing::trace!(locale = %self.inner.name, depth, "enter locale");
        LocaleGuard { locale: self.clone() }
    }

    pub fn is_entered(&self) -> bool {
        self.depth() > 0
    }

    /// Number of guards currently alive for this locale.
    pub fn depth(&self) -> usize {
        self.inner.depth.load(Ordering::Acquire)
    }

    pub fn ptr_eq(&self, other: &Locale) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Default for Locale {
    fn default() -> Self {
        Self::new("default")
    }
}

impl fmt::Debug for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Locale").field("name", &self.inner.name).field("depth", &self.depth()).finish()
    }
}

/// Scope of an entered [`Locale`]; exits on drop.
#[must_use = "the locale is exited as soon as the guard is dropped"]
pub struct LocaleGuard {
    locale: Locale,
}

impl LocaleGuard {
    pub fn locale(&self) -> &Locale {
        &self.locale
    }
}

impl Drop for LocaleGuard {
    fn drop(&mut self) {
        let previous = self.locale.inner.depth.fetch_sub(1, Ordering::AcqRel);
        tracing::trace!(locale = %self.locale.inner.name, depth = previous - 1, "exit locale");
    }
}

impl fmt::Debug for LocaleGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("LocaleGuard").field(&self.locale.name()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn guards_nest_and_unwind() {
        let locale = Locale::new("test");
        assert!(!locale.is_entered());
        {
            let _outer = locale.enter();
            let inner = locale.enter();
            assert_eq!(locale.depth(), 2);
            drop(inner);
            assert_eq!(locale.depth(), 1);
        }
        assert_eq!(locale.depth(), 0);
    }

    #[rstest]
    fn clones_share_depth() {
        let locale = Locale::new("shared");
        let other = locale.clone();
        let _guard = locale.enter();
        assert!(other.is_entered());
        assert!(other.ptr_eq(&locale));
        assert!(!other.ptr_eq(&Locale::new("shared")));
    }
}
