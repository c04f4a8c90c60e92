//! Abstract operations executed by [`Handler`]s.
//!
//! Storage operations are parametrized with the stored type, optionally
//! wrapped into a [`By`] selector, e.g. `Select<By<Option<Lease>, Id>>`
//! reads a lease by its ID, while `Update<By<Overdue, Date>>` marks every
//! overdue installment due before a date.

use std::marker::PhantomData;

use crate::Handler;

/// Operation reading stored values.
#[derive(Clone, Copy, Debug)]
pub struct Select<T>(pub T);

/// Operation storing a new value.
#[derive(Clone, Copy, Debug)]
pub struct Insert<T>(pub T);

/// Operation overwriting a stored value.
#[derive(Clone, Copy, Debug)]
pub struct Update<T>(pub T);

/// Operation removing stored values.
#[derive(Clone, Copy, Debug)]
pub struct Delete<T>(pub T);

/// Operation acquiring an exclusive lock on a stored value until the end of
/// the current transaction.
#[derive(Clone, Copy, Debug)]
pub struct Lock<T>(pub T);

/// Operation beginning a transaction.
///
/// Beginning a transaction inside another one joins the outer transaction.
#[derive(Clone, Copy, Debug)]
pub struct Transact;

/// Handle of a transaction begun with [`Transact`].
///
/// Dropping it without a [`Commit`] discards every change made through it.
pub type Transacted<T> = <T as Handler<Transact>>::Ok;

/// Operation making changes of a transaction permanent.
#[derive(Clone, Copy, Debug)]
pub struct Commit;

/// Operation spawning a long-running background job.
#[derive(Clone, Copy, Debug)]
pub struct Start<T>(pub T);

/// Operation running a single round of a background job.
#[derive(Clone, Copy, Debug)]
pub struct Perform<T>(pub T);

/// Operation handing a message over to its recipient.
#[derive(Clone, Copy, Debug)]
pub struct Deliver<T>(pub T);

/// Selector of a `W`hat by a `B`y key.
#[derive(Clone, Copy, Debug)]
pub struct By<W, B> {
    /// Type of the selected value.
    _what: PhantomData<W>,

    /// Key to select by.
    by: B,
}

impl<W, B> By<W, B> {
    /// Creates a new [`By`] selector with the provided key.
    #[must_use]
    pub fn new(by: B) -> Self {
        Self {
            _what: PhantomData,
            by,
        }
    }

    /// Consumes this [`By`] selector returning its key.
    #[must_use]
    pub fn into_inner(self) -> B {
        self.by
    }
}
