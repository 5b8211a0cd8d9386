//! Pull based, single pass sequences that own the resources they read from.
//!
//! A [`LazySeq`] yields `Result<T>` items. Every transformation consumes the sequence and
//! returns a new one that carries the same resource scope, so releasing the derived sequence
//! releases whatever the original was reading from. Release happens exactly once, on the
//! first of:
//!
//!  * the last item has been pulled,
//!  * an item failed (errors are terminal, the sequence is fused afterwards),
//!  * [`LazySeq::close`] was called,
//!  * the sequence was dropped.
//!
//! Only `close` and exhaustion can report a failed release to the caller. When the release
//! happens in `Drop` the failure is logged instead.
use std::cell::RefCell;
use std::iter::{self, FusedIterator};
use std::rc::Rc;
use std::{fmt, io};

use tracing::warn;

use crate::error::{Error, Result};
use crate::scan::{Emitter, Scan};

/// The boxed item iterator underlying a sequence.
pub type Items<'a, T> = Box<dyn Iterator<Item = Result<T>> + 'a>;

/// A resource that must be released once its sequence is done.
pub trait Release {
    /// Release the resource. Called at most once.
    fn release(&mut self) -> io::Result<()>;
}

/// Adapts a closure into a [`Release`].
pub struct OnRelease<F>(pub F);

impl<F: FnMut() -> io::Result<()>> Release for OnRelease<F> {
    fn release(&mut self) -> io::Result<()> {
        (self.0)()
    }
}

/// A lazily produced sequence of fallible items.
pub struct LazySeq<'a, T> {
    items: Items<'a, T>,
    /// One element of lookahead filled by `has_next`.
    peeked: Option<Result<T>>,
    scope: Scope<'a>,
    done: bool,
}

/// The resources attached to a sequence and to everything derived from it.
#[derive(Default)]
struct Scope<'a> {
    resources: Vec<Box<dyn Release + 'a>>,
}

/// A resource shared between the pulling closure and the scope releasing it.
struct Shared<R>(Rc<RefCell<Option<R>>>);

impl<'a, T: 'a> LazySeq<'a, T> {
    /// A sequence over infallible items.
    pub fn new<I>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        I::IntoIter: 'a,
    {
        Self::fallible(items.into_iter().map(Ok))
    }

    /// A sequence over items that may fail.
    pub fn fallible<I>(items: I) -> Self
    where
        I: IntoIterator<Item = Result<T>>,
        I::IntoIter: 'a,
    {
        LazySeq::from_parts(items.into_iter(), Scope::default())
    }

    /// The sequence without any items.
    pub fn empty() -> Self {
        Self::new(iter::empty())
    }

    /// A sequence pulling its items out of `resource`.
    ///
    /// `pull` is called with the resource until it returns `None` or an error. The resource is
    /// released through the sequence scope, after which `pull` is never called again.
    pub fn from_resource<R, F>(resource: R, mut pull: F) -> Self
    where
        R: Release + 'a,
        F: FnMut(&mut R) -> Option<io::Result<T>> + 'a,
    {
        let slot = Rc::new(RefCell::new(Some(resource)));
        let reader = Rc::clone(&slot);
        let items = iter::from_fn(move || {
            let mut guard = reader.borrow_mut();
            let resource = guard.as_mut()?;
            pull(resource).map(|item| item.map_err(Error::Io))
        });

        let mut seq = Self::fallible(items);
        seq.scope.attach(Box::new(Shared(slot)));
        seq
    }

    fn from_parts(items: impl Iterator<Item = Result<T>> + 'a, scope: Scope<'a>) -> Self {
        LazySeq {
            items: Box::new(items),
            peeked: None,
            scope,
            done: false,
        }
    }

    fn into_parts(self) -> (Items<'a, T>, Scope<'a>) {
        let LazySeq {
            items,
            peeked,
            scope,
            done,
        } = self;

        let items: Items<'a, T> = match (done, peeked) {
            (true, peeked) => Box::new(peeked.into_iter()),
            (false, None) => items,
            (false, Some(first)) => Box::new(iter::once(first).chain(items)),
        };

        (items, scope)
    }

    /// Attach another resource, released together with the existing ones.
    pub fn with_release<R: Release + 'a>(mut self, resource: R) -> Self {
        self.scope.attach(Box::new(resource));
        self
    }

    /// Transform the item iterator while keeping the resource scope.
    ///
    /// All other adapters are built on this.
    pub fn pipe<U, I, F>(self, adapt: F) -> LazySeq<'a, U>
    where
        U: 'a,
        I: Iterator<Item = Result<U>> + 'a,
        F: FnOnce(Items<'a, T>) -> I,
    {
        let (items, scope) = self.into_parts();
        LazySeq::from_parts(adapt(items), scope)
    }

    pub fn map<U: 'a, F>(self, mut f: F) -> LazySeq<'a, U>
    where
        F: FnMut(T) -> U + 'a,
    {
        self.pipe(move |items| items.map(move |item| item.map(|t| f(t))))
    }

    /// Map with a fallible function. The first failure ends the sequence.
    pub fn try_map<U: 'a, F>(self, mut f: F) -> LazySeq<'a, U>
    where
        F: FnMut(T) -> Result<U> + 'a,
    {
        self.pipe(move |items| items.map(move |item| item.and_then(|t| f(t))))
    }

    pub fn filter<F>(self, mut keep: F) -> Self
    where
        F: FnMut(&T) -> bool + 'a,
    {
        self.pipe(move |items| {
            items.filter(move |item| match item {
                Ok(t) => keep(t),
                Err(_) => true,
            })
        })
    }

    /// Replace every item by the items of `f(item)`, in order.
    pub fn flat_map<U: 'a, J, F>(self, mut f: F) -> LazySeq<'a, U>
    where
        J: IntoIterator<Item = U>,
        J::IntoIter: 'a,
        F: FnMut(T) -> J + 'a,
    {
        self.pipe(move |items| {
            items.flat_map(move |item| {
                let (expanded, failed) = match item {
                    Ok(t) => (Some(f(t).into_iter()), None),
                    Err(err) => (None, Some(Err(err))),
                };
                expanded.into_iter().flatten().map(Ok).chain(failed)
            })
        })
    }

    /// At most the first `limit` items.
    pub fn take(self, limit: usize) -> Self {
        self.pipe(move |items| items.take(limit))
    }

    /// Drop the first `count` items. Errors are never skipped.
    pub fn skip(self, count: usize) -> Self {
        let mut remaining = count;
        self.pipe(move |items| {
            items.filter(move |item| match item {
                Ok(_) if remaining > 0 => {
                    remaining -= 1;
                    false
                }
                _ => true,
            })
        })
    }

    /// The items of `self` followed by those of `other`. Both scopes are kept.
    pub fn chain(self, other: LazySeq<'a, T>) -> Self {
        let (items, mut scope) = self.into_parts();
        let (rest, other_scope) = other.into_parts();
        scope.merge(other_scope);
        LazySeq::from_parts(items.chain(rest), scope)
    }

    /// Pairs of items, ending with the shorter sequence. Both scopes are kept.
    pub fn zip<U: 'a>(self, other: LazySeq<'a, U>) -> LazySeq<'a, (T, U)> {
        let (items, mut scope) = self.into_parts();
        let (others, other_scope) = other.into_parts();
        scope.merge(other_scope);
        let pairs = items
            .zip(others)
            .map(|(t, u)| -> Result<(T, U)> { Ok((t?, u?)) });
        LazySeq::from_parts(pairs, scope)
    }

    pub fn inspect<F>(self, mut f: F) -> Self
    where
        F: FnMut(&T) + 'a,
    {
        self.pipe(move |items| {
            items.inspect(move |item| {
                if let Ok(t) = item {
                    f(t)
                }
            })
        })
    }

    /// Run a state machine over the items that emits any number of outputs per input.
    ///
    /// `step` receives the state, the next item, whether that item is the last one and the
    /// emitter for outputs. It returns the state for the next item. A failing step ends the
    /// sequence after the outputs emitted before the failure.
    pub fn scan<S, U, F>(self, init: S, step: F) -> LazySeq<'a, U>
    where
        S: 'a,
        U: 'a,
        F: FnMut(S, T, bool, &mut Emitter<U>) -> Result<S> + 'a,
    {
        self.pipe(move |items| Scan::new(items, init, step))
    }

    /// Consume all items. The sequence is released before returning.
    pub fn fold<B, F>(mut self, init: B, mut f: F) -> Result<B>
    where
        F: FnMut(B, T) -> B,
    {
        let mut acc = init;
        for item in &mut self {
            acc = f(acc, item?);
        }
        self.close()?;
        Ok(acc)
    }

    pub fn count_items(self) -> Result<usize> {
        self.fold(0, |count, _| count + 1)
    }

    pub fn to_vec(self) -> Result<Vec<T>> {
        self.fold(Vec::new(), |mut all, item| {
            all.push(item);
            all
        })
    }

    /// Expose the sequence to async code.
    ///
    /// Items are still produced synchronously when polled.
    #[cfg(feature = "async")]
    pub fn into_stream(self) -> futures::stream::Iter<Self> {
        futures::stream::iter(self)
    }
}

impl<'a, T> LazySeq<'a, T> {
    /// Whether another item (possibly an error) can be pulled.
    pub fn has_next(&mut self) -> bool {
        if self.peeked.is_none() {
            self.peeked = self.advance();
        }
        self.peeked.is_some()
    }

    /// Pull the next item, failing with [`Error::Exhausted`] past the end.
    pub fn pull(&mut self) -> Result<T> {
        self.next().unwrap_or_else(|| Err(Error::Exhausted))
    }

    /// Stop consuming and release the resources now.
    pub fn close(mut self) -> Result<()> {
        self.done = true;
        self.peeked = None;
        self.scope.release()
    }

    /// Whether all resources have been released.
    pub fn is_released(&self) -> bool {
        self.scope.resources.is_empty()
    }

    fn advance(&mut self) -> Option<Result<T>> {
        if self.done {
            return None;
        }

        match self.items.next() {
            Some(Ok(item)) => Some(Ok(item)),
            Some(Err(err)) => {
                self.done = true;
                if let Err(release) = self.scope.release() {
                    warn!(error = %release, "release failed after a sequence error");
                }
                Some(Err(err))
            }
            None => {
                self.done = true;
                self.scope.release().err().map(Err)
            }
        }
    }
}

impl<T> Iterator for LazySeq<'_, T> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Result<T>> {
        match self.peeked.take() {
            Some(item) => Some(item),
            None => self.advance(),
        }
    }
}

impl<T> FusedIterator for LazySeq<'_, T> {}

impl<T> fmt::Debug for LazySeq<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazySeq")
            .field("resources", &self.scope.resources.len())
            .field("peeked", &self.peeked.is_some())
            .field("done", &self.done)
            .finish()
    }
}

impl<'a> Scope<'a> {
    fn attach(&mut self, resource: Box<dyn Release + 'a>) {
        self.resources.push(resource);
    }

    fn merge(&mut self, mut other: Scope<'a>) {
        self.resources.append(&mut other.resources);
    }

    /// Release the most recently attached resource first. Every resource is attempted, the
    /// first failure is returned.
    fn release(&mut self) -> Result<()> {
        let mut first = None;
        while let Some(mut resource) = self.resources.pop() {
            if let Err(err) = resource.release() {
                match first {
                    None => first = Some(err),
                    Some(_) => warn!(error = %err, "additional release failure"),
                }
            }
        }

        match first {
            Some(err) => Err(Error::Release(err)),
            None => Ok(()),
        }
    }
}

impl Drop for Scope<'_> {
    fn drop(&mut self) {
        if let Err(err) = self.release() {
            warn!(error = %err, "release failed while dropping a sequence");
        }
    }
}

impl<R: Release> Release for Shared<R> {
    fn release(&mut self) -> io::Result<()> {
        let taken = self.0.borrow_mut().take();
        match taken {
            Some(mut resource) => resource.release(),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{LazySeq, OnRelease};
    use crate::error::Error;
    use std::cell::Cell;
    use std::io;

    fn counted(released: &Cell<u32>) -> OnRelease<impl FnMut() -> io::Result<()> + '_> {
        OnRelease(move || {
            released.set(released.get() + 1);
            Ok(())
        })
    }

    #[test]
    fn algebra_keeps_order() {
        let items = LazySeq::new(1..=10)
            .filter(|x| x % 2 == 0)
            .map(|x| x * 10)
            .flat_map(|x| vec![x, x + 1])
            .skip(1)
            .take(4)
            .to_vec()
            .unwrap();
        assert_eq!(items, [21, 40, 41, 60]);
    }

    #[test]
    fn pull_past_end_is_an_error() {
        let mut seq = LazySeq::new(vec![7]);
        assert!(seq.has_next());
        assert!(seq.has_next());
        assert_eq!(seq.pull().unwrap(), 7);
        assert!(!seq.has_next());
        assert!(matches!(seq.pull(), Err(Error::Exhausted)));
    }

    #[test]
    fn released_once_after_exhaustion() {
        let released = Cell::new(0);
        {
            let mut seq = LazySeq::new(0..3).with_release(counted(&released)).map(|x| x + 1);
            assert_eq!(seq.by_ref().count(), 3);
            assert_eq!(released.get(), 1);
            assert!(seq.is_released());
        }
        assert_eq!(released.get(), 1);
    }

    #[test]
    fn released_on_drop() {
        let released = Cell::new(0);
        let mut seq = LazySeq::new(0..).with_release(counted(&released)).take(100);
        assert_eq!(seq.next().unwrap().unwrap(), 0);
        drop(seq);
        assert_eq!(released.get(), 1);
    }

    #[test]
    fn error_is_terminal() {
        let released = Cell::new(0);
        let items = vec![Ok(1), Err(Error::Truncated), Ok(2)];
        let mut seq = LazySeq::fallible(items).with_release(counted(&released));
        assert_eq!(seq.next().unwrap().unwrap(), 1);
        assert!(matches!(seq.next(), Some(Err(Error::Truncated))));
        assert_eq!(released.get(), 1);
        assert!(seq.next().is_none());
    }

    #[test]
    fn skip_never_hides_errors() {
        let items = vec![Err(Error::Truncated), Ok(1)];
        let result = LazySeq::fallible(items).skip(1).to_vec();
        assert!(matches!(result, Err(Error::Truncated)));
    }

    #[test]
    fn scan_sees_last_flag() {
        let pairs = LazySeq::new(1..=5)
            .scan(0, |sum, x, last, out| {
                let sum = sum + x;
                if x % 2 == 0 || last {
                    out.emit(sum);
                }
                Ok(sum)
            })
            .to_vec()
            .unwrap();
        assert_eq!(pairs, [3, 10, 15]);
    }

    #[test]
    fn zip_merges_scopes() {
        let left = Cell::new(0);
        let right = Cell::new(0);
        let pairs = LazySeq::new("ab".chars())
            .with_release(counted(&left))
            .zip(LazySeq::new(0..).with_release(counted(&right)))
            .to_vec()
            .unwrap();
        assert_eq!(pairs, [('a', 0), ('b', 1)]);
        assert_eq!((left.get(), right.get()), (1, 1));
    }
}
