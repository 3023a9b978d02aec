use std::collections::HashSet;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

/// Errors that can be grouped by kind for suppression
pub trait ErrorKind {
    type Kind: Eq + Hash + Send + Sync + 'static;

    fn kind(&self) -> Self::Kind;
}

/// Which probe errors count as "not ready yet" instead of ending the wait
pub struct Suppression<E> {
    matcher: Option<Arc<dyn Fn(&E) -> bool + Send + Sync>>,
}

impl<E> Suppression<E> {
    /// Suppress nothing: every probe error ends the wait
    pub fn none() -> Self {
        Self { matcher: None }
    }

    /// Suppress errors for which `pred` returns true
    pub fn when(pred: impl Fn(&E) -> bool + Send + Sync + 'static) -> Self {
        Self {
            matcher: Some(Arc::new(pred)),
        }
    }

    pub fn matches(&self, err: &E) -> bool {
        self.matcher.as_ref().is_some_and(|m| m(err))
    }
}

impl<E: ErrorKind> Suppression<E> {
    /// Suppress errors whose kind is in `kinds`
    pub fn kinds(kinds: impl IntoIterator<Item = E::Kind>) -> Self {
        let kinds: HashSet<E::Kind> = kinds.into_iter().collect();
        Self::when(move |e: &E| kinds.contains(&e.kind()))
    }
}

impl<E> Default for Suppression<E> {
    fn default() -> Self {
        Self::none()
    }
}

impl<E> Clone for Suppression<E> {
    fn clone(&self) -> Self {
        Self {
            matcher: self.matcher.clone(),
        }
    }
}

impl<E> fmt::Debug for Suppression<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Suppression")
            .field("active", &self.matcher.is_some())
            .finish()
    }
}
