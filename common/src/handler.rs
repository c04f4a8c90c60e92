//! [`Handler`] abstraction.

use std::future::Future;

/// Asynchronous executor of an operation of type `Args`.
///
/// Use cases, read queries, background jobs, storage operations and message
/// sinks all implement this single trait, each for its own argument types,
/// so a concrete storage only has to implement the operations a use case
/// actually requires.
///
/// The returned [`Future`] is not required to be [`Send`], as the whole
/// service runs on a single-threaded executor.
pub trait Handler<Args = ()> {
    /// Successful outcome of the operation.
    type Ok;

    /// Failure of the operation.
    type Err;

    /// Executes the operation with the provided `args`.
    fn execute(
        &self,
        args: Args,
    ) -> impl Future<Output = Result<Self::Ok, Self::Err>>;
}
