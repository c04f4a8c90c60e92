//! [`Background`] runner of [`Task`] loops.

use std::{
    error::Error,
    future::{Future, IntoFuture},
};

use futures::{
    future::{self, LocalBoxFuture},
    FutureExt as _, TryFutureExt as _,
};
use tokio::task;
use tracing as log;

#[cfg(doc)]
use crate::Task;

/// Boxed error of a stopped [`Task`] loop.
type BoxError = Box<dyn Error + 'static>;

/// Set of [`Task`] loops driven on the current thread.
///
/// Spawned loops make no progress until this [`Background`] is awaited.
/// Awaiting resolves once every loop stops, or as soon as any of them fails.
#[derive(Debug, Default)]
pub struct Background {
    /// Local set the loops are spawned onto.
    set: task::LocalSet,

    /// Names and handles of the spawned loops.
    handles: Vec<(&'static str, task::JoinHandle<Result<(), BoxError>>)>,
}

impl Background {
    /// Spawns the provided [`Task`] loop under the provided `name`.
    pub fn spawn<F, E>(&mut self, name: &'static str, future: F)
    where
        F: Future<Output = Result<(), E>> + 'static,
        E: Error + 'static,
    {
        log::debug!("spawning `{name}` background task");
        let handle = self
            .set
            .spawn_local(future.map_err(|e| BoxError::from(e)));
        self.handles.push((name, handle));
    }
}

impl IntoFuture for Background {
    type Output = Result<(), BoxError>;
    type IntoFuture = LocalBoxFuture<'static, Self::Output>;

    fn into_future(self) -> Self::IntoFuture {
        let Self { set, handles } = self;
        let loops = future::try_join_all(handles.into_iter().map(
            |(name, handle)| {
                handle.map(move |res| {
                    let res = res.map_err(BoxError::from).and_then(|r| r);
                    match &res {
                        Ok(()) => log::info!("`{name}` background task stopped"),
                        Err(e) => {
                            log::error!("`{name}` background task failed: {e}");
                        }
                    }
                    res
                })
            },
        ))
        .map_ok(drop);
        async move { set.run_until(loops).await }.boxed_local()
    }
}
